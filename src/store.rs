use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{BankId, Record};

#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    records: BTreeMap<BankId, Vec<Record>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: BankId, records: Vec<Record>) {
        self.records.insert(id, records);
    }

    pub fn get(&self, id: &BankId) -> Option<&[Record]> {
        self.records.get(id).map(Vec::as_slice)
    }

    pub fn all_ids(&self) -> BTreeSet<BankId> {
        self.records.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BankId, &[Record])> {
        self.records.iter().map(|(id, rows)| (id, rows.as_slice()))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_records(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }
}
