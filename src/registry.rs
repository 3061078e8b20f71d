use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use crate::domain::{Bank, BankId};

const DEFAULT_BANKS: &[(&str, &str)] = &[
    ("HDFC", "https://www.hdfc.lk"),
    ("NSB", "https://www.nsb.lk"),
    ("RDB", "https://www.rdb.lk"),
    ("SDB", "https://www.sdb.lk"),
    ("SMIB", "https://www.smib.lk"),
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BankConfigurations {
    #[serde(default)]
    pub configurations: Option<BTreeMap<String, BankConfig>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BankConfig {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SourceRegistry {
    banks: BTreeMap<BankId, Bank>,
}

impl SourceRegistry {
    pub fn with_defaults() -> Self {
        let banks = DEFAULT_BANKS
            .iter()
            .filter_map(|(id, url)| {
                let id: BankId = id.parse().ok()?;
                Some((id.clone(), Bank::new(id, Some(url.to_string()))))
            })
            .collect();
        Self { banks }
    }

    /// A response without `configurations` keeps the current set. Returns
    /// whether the registry was replaced.
    pub fn replace_from(&mut self, response: BankConfigurations) -> bool {
        let Some(configurations) = response.configurations else {
            return false;
        };
        let mut banks = BTreeMap::new();
        for (key, config) in configurations {
            match key.parse::<BankId>() {
                Ok(id) => {
                    banks.insert(id.clone(), Bank::new(id, config.url));
                }
                Err(err) => warn!(bank = %key, error = %err, "skipping bank configuration"),
            }
        }
        self.banks = banks;
        true
    }

    pub fn contains(&self, id: &BankId) -> bool {
        self.banks.contains_key(id)
    }

    pub fn get(&self, id: &BankId) -> Option<&Bank> {
        self.banks.get(id)
    }

    pub fn banks(&self) -> impl Iterator<Item = &Bank> {
        self.banks.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &BankId> {
        self.banks.keys()
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_five_banks() {
        let registry = SourceRegistry::with_defaults();
        assert_eq!(registry.len(), 5);
        let hdfc: BankId = "HDFC".parse().unwrap();
        assert_eq!(registry.get(&hdfc).unwrap().domain(), "www.hdfc.lk");
    }

    #[test]
    fn replace_keeps_defaults_without_configurations() {
        let mut registry = SourceRegistry::with_defaults();
        assert!(!registry.replace_from(BankConfigurations::default()));
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn replace_skips_invalid_keys() {
        let mut registry = SourceRegistry::with_defaults();
        let response: BankConfigurations = serde_json::from_str(
            r#"{"configurations": {"BOC": {"url": "https://www.boc.lk"}, "bad id": {}}}"#,
        )
        .unwrap();
        assert!(registry.replace_from(response));
        let ids: Vec<_> = registry.ids().map(BankId::as_str).collect();
        assert_eq!(ids, vec!["BOC"]);
    }
}
