use std::time::{Duration, Instant};

use serde_json::json;

use bank_fd_rates::domain::{BankId, Record, Severity};
use bank_fd_rates::notify::NotificationQueue;
use bank_fd_rates::registry::SourceRegistry;
use bank_fd_rates::selection::SelectionSet;
use bank_fd_rates::store::ResultStore;

fn rate_row(term: &str, rate: f64) -> Record {
    let mut record = Record::new();
    record.insert("term".to_string(), json!(term));
    record.insert("rate".to_string(), json!(rate));
    record
}

#[test]
fn result_store_keeps_banks_apart() {
    let mut store = ResultStore::new();
    let hdfc: BankId = "HDFC".parse().unwrap();
    let nsb: BankId = "NSB".parse().unwrap();
    store.record(hdfc.clone(), vec![rate_row("1Y", 11.0), rate_row("2Y", 11.5)]);
    store.record(nsb.clone(), vec![rate_row("1Y", 9.5)]);

    assert_eq!(store.get(&hdfc).unwrap().len(), 2);
    assert_eq!(store.get(&nsb).unwrap()[0]["rate"], json!(9.5));
    assert_eq!(store.all_ids().into_iter().collect::<Vec<_>>(), vec![hdfc, nsb]);
    assert_eq!(store.total_records(), 3);
}

#[test]
fn selection_order_is_stable_across_toggles() {
    let registry = SourceRegistry::with_defaults();
    let mut selection = SelectionSet::new();
    let mut ids: Vec<BankId> = registry.ids().cloned().collect();
    ids.reverse();
    for id in &ids {
        selection.toggle(id);
    }
    selection.toggle(&"NSB".parse().unwrap());

    let members: Vec<_> = selection.members().iter().map(BankId::to_string).collect();
    assert_eq!(members, vec!["HDFC", "RDB", "SDB", "SMIB"]);
}

#[test]
fn notifications_survive_until_their_own_deadline() {
    let start = Instant::now();
    let mut queue = NotificationQueue::new(Duration::from_secs(5));
    let early = queue.push("Successfully fetched HDFC rates (3 records)", Severity::Success, start);
    for offset in 1..4 {
        queue.push(
            "Failed to fetch NSB: timeout",
            Severity::Error,
            start + Duration::from_secs(offset),
        );
    }

    let later = start + Duration::from_secs(5) + Duration::from_millis(1);
    assert_eq!(queue.visible(later).count(), 3);
    assert!(queue.visible(later).all(|n| n.id != early));
    queue.sweep(later);
    assert_eq!(queue.len(), 3);
}
