use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FdError;

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BankId(String);

impl BankId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BankId {
    type Err = FdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        // Identifiers end up as a path segment of `/fetch/{id}`.
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
        if !is_valid {
            return Err(FdError::InvalidBankId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bank {
    pub id: BankId,
    pub url: Option<String>,
}

impl Bank {
    pub fn new(id: BankId, url: Option<String>) -> Self {
        Self { id, url }
    }

    pub fn domain(&self) -> String {
        self.url
            .as_deref()
            .and_then(|url| Url::parse(url).ok())
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl BankStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BankStatus::Success | BankStatus::Error)
    }
}

impl fmt::Display for BankStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankStatus::Idle => write!(f, "idle"),
            BankStatus::Loading => write!(f, "loading"),
            BankStatus::Success => write!(f, "success"),
            BankStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.total > 0
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.current == self.total
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.current * 100) / self.total).min(100) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    #[default]
    Connected,
    Disconnected,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_bank_id_trims() {
        let id: BankId = " HDFC ".parse().unwrap();
        assert_eq!(id.as_str(), "HDFC");
    }

    #[test]
    fn parse_bank_id_rejects_path_characters() {
        let err = "HDFC/../x".parse::<BankId>().unwrap_err();
        assert_matches!(err, FdError::InvalidBankId(_));
        assert_matches!("".parse::<BankId>(), Err(FdError::InvalidBankId(_)));
    }

    #[test]
    fn bank_domain_from_url() {
        let bank = Bank::new("NSB".parse().unwrap(), Some("https://www.nsb.lk".to_string()));
        assert_eq!(bank.domain(), "www.nsb.lk");
        let bare = Bank::new("X".parse().unwrap(), Some("not a url".to_string()));
        assert_eq!(bare.domain(), "");
    }

    #[test]
    fn progress_percent() {
        let progress = Progress {
            current: 1,
            total: 3,
        };
        assert_eq!(progress.percent(), 33);
        assert!(!progress.is_complete());
        assert_eq!(Progress::idle().percent(), 0);
    }
}
