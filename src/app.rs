use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, warn};

use crate::api::BankApi;
use crate::clock::Clock;
use crate::config::Timings;
use crate::dashboard::{Dashboard, SharedDashboard, lock};
use crate::domain::{ApiStatus, BankId, BankStatus, Severity};
use crate::error::FdError;

#[derive(Debug, Clone, Serialize)]
pub struct BanksResult {
    pub api_status: ApiStatus,
    pub from_backend: bool,
    pub banks: Vec<BankEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankEntry {
    pub id: String,
    pub url: Option<String>,
    pub domain: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub items: Vec<PassItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassItem {
    pub bank: String,
    pub status: BankStatus,
    pub records: Option<usize>,
    pub message: Option<String>,
}

impl PassReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &PassItem> {
        self.items
            .iter()
            .filter(|item| item.status == BankStatus::Success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &PassItem> {
        self.items
            .iter()
            .filter(|item| item.status == BankStatus::Error)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub path: String,
    pub filename: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "backend", content = "message", rename_all = "snake_case")]
pub enum ClearBackend {
    Confirmed,
    Refused(String),
    Unreachable(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearResult {
    pub cleared: bool,
    pub backend: ClearBackend,
}

#[derive(Debug, Clone, Copy)]
pub enum ProgressSinkKind {
    Fetch,
    Export,
    Clear,
    Banks,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<A: BankApi, C: Clock> {
    api: A,
    clock: C,
    timings: Timings,
    export_dir: Utf8PathBuf,
    state: SharedDashboard,
}

impl<A: BankApi, C: Clock> App<A, C> {
    pub fn new(api: A, clock: C, timings: Timings, export_dir: Utf8PathBuf) -> Self {
        let state = Dashboard::new(timings.notification_ttl).shared();
        Self {
            api,
            clock,
            timings,
            export_dir,
            state,
        }
    }

    pub fn state(&self) -> SharedDashboard {
        self.state.clone()
    }

    pub fn export_dir(&self) -> &Utf8Path {
        &self.export_dir
    }

    pub fn tick(&self) {
        let now = self.clock.now();
        lock(&self.state).tick(now);
    }

    pub fn toggle(&self, id: &BankId) -> bool {
        lock(&self.state).toggle(id)
    }

    pub fn notify(&self, text: impl Into<String>, severity: Severity) -> u64 {
        let now = self.clock.now();
        lock(&self.state).notify(text, severity, now)
    }

    pub fn load_registry(&self, sink: &dyn ProgressSink) -> BanksResult {
        sink.event(ProgressEvent {
            message: "banks.request".to_string(),
            elapsed: None,
        });
        let response = self.api.list_banks();
        let mut state = lock(&self.state);
        let from_backend = match response {
            Ok(configurations) => {
                state.set_api_status(ApiStatus::Connected);
                state.replace_registry(configurations)
            }
            Err(err) => {
                warn!(error = %err, "bank list unavailable, keeping defaults");
                state.set_api_status(ApiStatus::Disconnected);
                false
            }
        };
        info!(banks = state.registry().len(), from_backend, "bank registry ready");
        sink.event(ProgressEvent {
            message: format!("banks.ready count={}", state.registry().len()),
            elapsed: None,
        });
        BanksResult {
            api_status: state.api_status(),
            from_backend,
            banks: state
                .banks()
                .map(|bank| BankEntry {
                    id: bank.id.to_string(),
                    url: bank.url.clone(),
                    domain: bank.domain(),
                })
                .collect(),
        }
    }

    pub fn fetch_selected(&self, sink: &dyn ProgressSink) -> Result<PassReport, FdError> {
        let selected = lock(&self.state).selection().members();
        self.run_fetch_pass(&selected, sink)
    }

    /// Fetches `selected` one bank at a time. A failing bank never stops the
    /// pass and never touches records stored by an earlier pass.
    pub fn run_fetch_pass(
        &self,
        selected: &[BankId],
        sink: &dyn ProgressSink,
    ) -> Result<PassReport, FdError> {
        let banks = self.admit_pass(selected)?;
        let total = banks.len();
        let _slot = PassSlot {
            state: &*self.state,
        };
        info!(total, "fetch pass started");
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; fetching {total} bank(s)"),
            elapsed: None,
        });

        let pass_started = Instant::now();
        let mut items = Vec::with_capacity(total);
        for (index, id) in banks.iter().enumerate() {
            lock(&self.state).set_status(id, BankStatus::Loading);
            sink.event(ProgressEvent {
                message: format!("bank.request {id}"),
                elapsed: None,
            });

            let started = Instant::now();
            let response = self.api.fetch_bank(id);
            let latency = started.elapsed();
            let now = self.clock.now();

            let item = {
                let mut state = lock(&self.state);
                let item = match response {
                    Ok(response) if response.is_success() => {
                        let count = response.data.len();
                        state.set_status(id, BankStatus::Success);
                        state.store_records(id, response.data);
                        state.notify(
                            format!("Successfully fetched {id} rates ({count} records)"),
                            Severity::Success,
                            now,
                        );
                        info!(bank = %id, records = count, "bank fetched");
                        PassItem {
                            bank: id.to_string(),
                            status: BankStatus::Success,
                            records: Some(count),
                            message: None,
                        }
                    }
                    Ok(response) => {
                        let message = match (response.message, response.status.as_str()) {
                            (Some(message), _) => message,
                            (None, "") => "no message from backend".to_string(),
                            (None, status) => format!("status {status}"),
                        };
                        state.set_status(id, BankStatus::Error);
                        state.notify(
                            format!("Failed to fetch {id}: {message}"),
                            Severity::Error,
                            now,
                        );
                        warn!(bank = %id, %message, "backend reported fetch failure");
                        PassItem {
                            bank: id.to_string(),
                            status: BankStatus::Error,
                            records: None,
                            message: Some(message),
                        }
                    }
                    Err(err) => {
                        state.set_status(id, BankStatus::Error);
                        state.notify(
                            format!("Error fetching {id}: {err}"),
                            Severity::Error,
                            now,
                        );
                        warn!(bank = %id, error = %err, "bank request failed");
                        PassItem {
                            bank: id.to_string(),
                            status: BankStatus::Error,
                            records: None,
                            message: Some(err.to_string()),
                        }
                    }
                };
                state.advance_progress(index + 1);
                item
            };

            sink.event(ProgressEvent {
                message: format!(
                    "bank.response {id} {} latency_ms={}",
                    item.status,
                    latency.as_millis()
                ),
                elapsed: Some(latency),
            });
            items.push(item);

            if index + 1 < total {
                self.clock.sleep(self.timings.pacing);
            }
        }

        let reset_at = self.clock.now() + self.timings.settle;
        lock(&self.state).end_pass(Some(reset_at));
        let report = PassReport { items };
        info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            "fetch pass finished"
        );
        sink.event(ProgressEvent {
            message: "phase=Done; fetch pass finished".to_string(),
            elapsed: Some(pass_started.elapsed()),
        });
        Ok(report)
    }

    pub fn export(&self, sink: &dyn ProgressSink) -> Result<ExportResult, FdError> {
        if lock(&self.state).results().is_empty() {
            self.notify(
                "No data to export. Please fetch some bank rates first.",
                Severity::Error,
            );
            return Err(FdError::NothingToExport);
        }

        sink.event(ProgressEvent {
            message: "phase=Export; requesting spreadsheet".to_string(),
            elapsed: None,
        });
        let outcome = self.api.export().and_then(|payload| {
            let path = crate::fs_util::write_bytes_atomic(
                &self.export_dir,
                &payload.filename,
                &payload.bytes,
            )?;
            Ok(ExportResult {
                path: path.to_string(),
                filename: payload.filename,
                bytes: payload.bytes.len(),
            })
        });

        match outcome {
            Ok(result) => {
                info!(path = %result.path, bytes = result.bytes, "export written");
                self.notify("Excel file downloaded successfully!", Severity::Success);
                sink.event(ProgressEvent {
                    message: format!("export.saved {}", result.path),
                    elapsed: None,
                });
                Ok(result)
            }
            Err(err) => {
                warn!(error = %err, "export failed");
                let text = match &err {
                    FdError::Status { message, .. } => format!("Export failed: {message}"),
                    other => format!("Export error: {other}"),
                };
                self.notify(text, Severity::Error);
                Err(err)
            }
        }
    }

    pub fn clear(&self, sink: &dyn ProgressSink) -> ClearResult {
        sink.event(ProgressEvent {
            message: "phase=Clear; clearing fetched data".to_string(),
            elapsed: None,
        });
        let backend = match self.api.clear() {
            Ok(()) => ClearBackend::Confirmed,
            Err(FdError::Status { message, .. }) => ClearBackend::Refused(message),
            Err(err) => ClearBackend::Unreachable(err.to_string()),
        };

        let now = self.clock.now();
        let mut state = lock(&self.state);
        state.clear_results();
        match &backend {
            ClearBackend::Confirmed => {
                state.notify("All data cleared successfully", Severity::Success, now);
            }
            ClearBackend::Refused(message) => {
                warn!(%message, "backend refused clear");
                state.notify(
                    format!("Clear failed on server: {message}. Data cleared locally"),
                    Severity::Error,
                    now,
                );
            }
            ClearBackend::Unreachable(error) => {
                warn!(%error, "backend unreachable during clear");
                state.notify(
                    "Data cleared locally (API may be unavailable)",
                    Severity::Success,
                    now,
                );
            }
        }
        info!(?backend, "local data cleared");
        ClearResult {
            cleared: true,
            backend,
        }
    }

    fn admit_pass(&self, selected: &[BankId]) -> Result<Vec<BankId>, FdError> {
        let now = self.clock.now();
        let mut state = lock(&self.state);
        if selected.is_empty() {
            state.notify("Please select at least one bank", Severity::Error, now);
            return Err(FdError::EmptySelection);
        }

        let mut banks = Vec::with_capacity(selected.len());
        let mut unknown = Vec::new();
        for id in selected {
            if state.registry().contains(id) {
                if !banks.contains(id) {
                    banks.push(id.clone());
                }
            } else {
                unknown.push(id.to_string());
            }
        }
        if !unknown.is_empty() {
            state.notify(
                format!("Skipping unknown bank(s): {}", unknown.join(", ")),
                Severity::Error,
                now,
            );
        }
        if banks.is_empty() {
            return Err(FdError::UnknownBank(unknown.join(", ")));
        }

        if !state.try_begin_pass(banks.len()) {
            state.notify("A fetch is already in progress", Severity::Error, now);
            return Err(FdError::PassInProgress);
        }
        Ok(banks)
    }
}

struct PassSlot<'a> {
    state: &'a std::sync::Mutex<Dashboard>,
}

impl Drop for PassSlot<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        if state.is_pass_in_flight() {
            state.end_pass(None);
        }
    }
}
