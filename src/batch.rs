//! Per-item outcomes for best-effort batch operations.
//!
//! Batch operations (tree copy, merge, the remove-* family) attempt every
//! item and collect `(path, outcome)` pairs instead of folding straight to a
//! boolean, so callers and tests can see exactly which items failed.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Ok,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<(PathBuf, ItemOutcome)>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ok(&mut self, path: impl Into<PathBuf>) {
        self.items.push((path.into(), ItemOutcome::Ok));
    }

    pub fn record_failure(&mut self, path: impl Into<PathBuf>, why: impl ToString) {
        self.items
            .push((path.into(), ItemOutcome::Failed(why.to_string())));
    }

    pub fn absorb(&mut self, other: BatchReport) {
        self.items.extend(other.items);
    }

    /// Aggregate success flag: true when no item failed.
    pub fn all_ok(&self) -> bool {
        self.items
            .iter()
            .all(|(_, o)| matches!(o, ItemOutcome::Ok))
    }

    /// Number of items that succeeded.
    pub fn succeeded(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, o)| matches!(o, ItemOutcome::Ok))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &str)> {
        self.items.iter().filter_map(|(p, o)| match o {
            ItemOutcome::Failed(why) => Some((p, why.as_str())),
            ItemOutcome::Ok => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_mixed_outcomes() {
        let mut report = BatchReport::new();
        report.record_ok("/a");
        report.record_failure("/b", "permission denied");
        report.record_ok("/c");

        assert!(!report.all_ok());
        assert_eq!(report.succeeded(), 2);
        let fails: Vec<_> = report.failures().collect();
        assert_eq!(fails.len(), 1);
        assert_eq!(fails[0].0, &PathBuf::from("/b"));
    }

    #[test]
    fn empty_report_is_ok() {
        let report = BatchReport::new();
        assert!(report.all_ok());
        assert_eq!(report.succeeded(), 0);
    }
}
