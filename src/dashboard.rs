use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::domain::{ApiStatus, Bank, BankId, BankStatus, Progress, Record, Severity};
use crate::notify::{Notification, NotificationQueue};
use crate::registry::{BankConfigurations, SourceRegistry};
use crate::selection::SelectionSet;
use crate::store::ResultStore;

pub type SharedDashboard = Arc<Mutex<Dashboard>>;

pub fn lock(state: &Mutex<Dashboard>) -> MutexGuard<'_, Dashboard> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Status, records and progress change only through the crate-internal
/// writers used by `App`.
#[derive(Debug)]
pub struct Dashboard {
    registry: SourceRegistry,
    selection: SelectionSet,
    statuses: BTreeMap<BankId, BankStatus>,
    results: ResultStore,
    progress: Progress,
    progress_reset_at: Option<Instant>,
    notifications: NotificationQueue,
    api_status: ApiStatus,
    pass_in_flight: bool,
}

impl Dashboard {
    pub fn new(notification_ttl: Duration) -> Self {
        Self {
            registry: SourceRegistry::with_defaults(),
            selection: SelectionSet::new(),
            statuses: BTreeMap::new(),
            results: ResultStore::new(),
            progress: Progress::idle(),
            progress_reset_at: None,
            notifications: NotificationQueue::new(notification_ttl),
            api_status: ApiStatus::default(),
            pass_in_flight: false,
        }
    }

    pub fn shared(self) -> SharedDashboard {
        Arc::new(Mutex::new(self))
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn banks(&self) -> impl Iterator<Item = &Bank> {
        self.registry.banks()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn toggle(&mut self, id: &BankId) -> bool {
        if !self.registry.contains(id) {
            return false;
        }
        self.selection.toggle(id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn status(&self, id: &BankId) -> BankStatus {
        self.statuses.get(id).copied().unwrap_or_default()
    }

    pub fn statuses(&self) -> &BTreeMap<BankId, BankStatus> {
        &self.statuses
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    pub fn records(&self, id: &BankId) -> Option<&[Record]> {
        self.results.get(id)
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn api_status(&self) -> ApiStatus {
        self.api_status
    }

    pub fn is_pass_in_flight(&self) -> bool {
        self.pass_in_flight
    }

    pub fn notifications(&self, now: Instant) -> impl Iterator<Item = &Notification> {
        self.notifications.visible(now)
    }

    pub fn notification_queue(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn notify(&mut self, text: impl Into<String>, severity: Severity, now: Instant) -> u64 {
        self.notifications.push(text, severity, now)
    }

    pub fn tick(&mut self, now: Instant) {
        self.notifications.sweep(now);
        if self.progress_reset_at.is_some_and(|deadline| now >= deadline) {
            self.progress = Progress::idle();
            self.progress_reset_at = None;
        }
    }

    pub fn status_text(&self, id: &BankId) -> String {
        match self.status(id) {
            BankStatus::Loading => "Fetching...".to_string(),
            BankStatus::Success => match self.results.get(id) {
                Some(rows) => format!("Fetched {} records", rows.len()),
                None => "Ready to fetch".to_string(),
            },
            BankStatus::Error => "Failed to fetch".to_string(),
            BankStatus::Idle => "Ready to fetch".to_string(),
        }
    }

    pub(crate) fn replace_registry(&mut self, response: BankConfigurations) -> bool {
        self.registry.replace_from(response)
    }

    pub(crate) fn set_api_status(&mut self, status: ApiStatus) {
        self.api_status = status;
    }

    pub(crate) fn try_begin_pass(&mut self, total: usize) -> bool {
        if self.pass_in_flight {
            return false;
        }
        self.pass_in_flight = true;
        self.progress = Progress { current: 0, total };
        self.progress_reset_at = None;
        true
    }

    pub(crate) fn end_pass(&mut self, reset_at: Option<Instant>) {
        self.pass_in_flight = false;
        if reset_at.is_some() {
            self.progress_reset_at = reset_at;
        }
    }

    pub(crate) fn set_status(&mut self, id: &BankId, status: BankStatus) {
        if self.registry.contains(id) || self.statuses.contains_key(id) {
            self.statuses.insert(id.clone(), status);
        }
    }

    pub(crate) fn store_records(&mut self, id: &BankId, records: Vec<Record>) {
        if self.registry.contains(id) || self.results.get(id).is_some() {
            self.results.record(id.clone(), records);
        }
    }

    pub(crate) fn advance_progress(&mut self, completed: usize) {
        self.progress.current = completed.min(self.progress.total);
    }

    pub(crate) fn clear_results(&mut self) {
        self.results.clear();
        self.statuses.clear();
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(crate::notify::DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_ignores_unregistered_banks() {
        let mut dashboard = Dashboard::default();
        assert!(!dashboard.toggle(&"BOC".parse().unwrap()));
        assert!(dashboard.toggle(&"HDFC".parse().unwrap()));
        assert_eq!(dashboard.selection().len(), 1);
    }

    #[test]
    fn status_never_created_for_unknown_bank() {
        let mut dashboard = Dashboard::default();
        dashboard.set_status(&"BOC".parse().unwrap(), BankStatus::Loading);
        assert!(dashboard.statuses().is_empty());
    }

    #[test]
    fn progress_resets_after_settle_deadline() {
        let now = Instant::now();
        let mut dashboard = Dashboard::default();
        assert!(dashboard.try_begin_pass(2));
        assert!(!dashboard.try_begin_pass(1));
        dashboard.advance_progress(2);
        dashboard.end_pass(Some(now + Duration::from_secs(1)));

        dashboard.tick(now + Duration::from_millis(999));
        assert_eq!(dashboard.progress(), Progress { current: 2, total: 2 });
        dashboard.tick(now + Duration::from_secs(1));
        assert_eq!(dashboard.progress(), Progress::idle());
    }

    #[test]
    fn status_text_follows_status() {
        let mut dashboard = Dashboard::default();
        let nsb: BankId = "NSB".parse().unwrap();
        assert_eq!(dashboard.status_text(&nsb), "Ready to fetch");
        dashboard.set_status(&nsb, BankStatus::Loading);
        assert_eq!(dashboard.status_text(&nsb), "Fetching...");
        dashboard.store_records(&nsb, vec![Record::new(), Record::new()]);
        dashboard.set_status(&nsb, BankStatus::Success);
        assert_eq!(dashboard.status_text(&nsb), "Fetched 2 records");
        dashboard.set_status(&nsb, BankStatus::Error);
        assert_eq!(dashboard.status_text(&nsb), "Failed to fetch");
    }
}
