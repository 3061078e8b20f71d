use assert_matches::assert_matches;

use bank_fd_rates::domain::{Bank, BankId, BankStatus, Progress};
use bank_fd_rates::error::FdError;

#[test]
fn parse_bank_id_valid() {
    let id: BankId = "SMIB".parse().unwrap();
    assert_eq!(id.as_str(), "SMIB");
    assert_eq!(id.to_string(), "SMIB");
}

#[test]
fn parse_bank_id_invalid() {
    let err = "HDFC NSB".parse::<BankId>().unwrap_err();
    assert_matches!(err, FdError::InvalidBankId(_));
}

#[test]
fn bank_without_url_has_empty_domain() {
    let bank = Bank::new("RDB".parse().unwrap(), None);
    assert_eq!(bank.domain(), "");
}

#[test]
fn status_defaults_to_idle() {
    assert_eq!(BankStatus::default(), BankStatus::Idle);
    assert!(!BankStatus::Loading.is_terminal());
    assert!(BankStatus::Success.is_terminal());
    assert!(BankStatus::Error.is_terminal());
}

#[test]
fn status_serializes_lowercase() {
    let json = serde_json::to_string(&BankStatus::Success).unwrap();
    assert_eq!(json, "\"success\"");
}

#[test]
fn progress_complete_only_at_total() {
    let mut progress = Progress {
        current: 0,
        total: 2,
    };
    assert!(progress.is_active());
    assert!(!progress.is_complete());
    progress.current = 2;
    assert!(progress.is_complete());
    assert_eq!(progress.percent(), 100);
    assert!(!Progress::idle().is_active());
}
