use std::collections::BTreeSet;

use crate::domain::BankId;

#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    members: BTreeSet<BankId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: &BankId) -> bool {
        if self.members.remove(id) {
            false
        } else {
            self.members.insert(id.clone());
            true
        }
    }

    pub fn contains(&self, id: &BankId) -> bool {
        self.members.contains(id)
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn members(&self) -> Vec<BankId> {
        self.members.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_membership() {
        let mut selection = SelectionSet::new();
        let nsb: BankId = "NSB".parse().unwrap();
        assert!(selection.toggle(&nsb));
        assert!(selection.contains(&nsb));
        assert!(!selection.toggle(&nsb));
        assert!(selection.is_empty());
    }

    #[test]
    fn members_are_sorted() {
        let mut selection = SelectionSet::new();
        for id in ["SMIB", "HDFC", "NSB"] {
            selection.toggle(&id.parse().unwrap());
        }
        let members: Vec<_> = selection.members().iter().map(|id| id.to_string()).collect();
        assert_eq!(members, vec!["HDFC", "NSB", "SMIB"]);
        selection.clear();
        assert_eq!(selection.len(), 0);
    }
}
