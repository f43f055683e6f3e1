//! Saved daily records.

use chrono::NaiveDate;
use serde::Serialize;

use crate::activity::ActivityRecord;
use crate::calculator::EmissionsBreakdown;

/// One saved day: inputs plus the breakdown computed when it was saved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    /// Calendar day the record describes.
    pub date: NaiveDate,
    /// Quantities entered for the day.
    pub inputs: ActivityRecord,
    /// Emissions computed from `inputs`.
    pub breakdown: EmissionsBreakdown,
}

impl HistoryRecord {
    /// Create a record.
    #[must_use]
    pub fn new(date: NaiveDate, inputs: ActivityRecord, breakdown: EmissionsBreakdown) -> Self {
        Self {
            date,
            inputs,
            breakdown,
        }
    }

    /// Grand total for the day.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.breakdown.total()
    }
}

/// What [`History::upsert`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No record existed for the date.
    Inserted,
    /// An existing record for the date was overwritten.
    Replaced,
}

/// Chronologically ordered records, at most one per date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct History {
    records: Vec<HistoryRecord>,
}

impl History {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from records in any order.
    ///
    /// Later records win when two share a date.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = HistoryRecord>) -> Self {
        let mut history = Self::new();
        for record in records {
            history.upsert(record);
        }
        history
    }

    /// Insert a record, overwriting any record for the same date.
    pub fn upsert(&mut self, record: HistoryRecord) -> SaveOutcome {
        match self.records.binary_search_by_key(&record.date, |r| r.date) {
            Ok(index) => {
                self.records[index] = record;
                SaveOutcome::Replaced
            }
            Err(index) => {
                self.records.insert(index, record);
                SaveOutcome::Inserted
            }
        }
    }

    /// Record for an exact date.
    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&HistoryRecord> {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|index| &self.records[index])
    }

    /// All records dated on or before `date`, oldest first.
    #[must_use]
    pub fn on_or_before(&self, date: NaiveDate) -> &[HistoryRecord] {
        let end = self.records.partition_point(|r| r.date <= date);
        &self.records[..end]
    }

    /// All records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, HistoryRecord> {
        self.records.iter()
    }

    /// The newest record.
    #[must_use]
    pub fn latest(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing was saved yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a HistoryRecord;
    type IntoIter = std::slice::Iter<'a, HistoryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{day, energy};
    use super::*;

    #[test]
    fn test_upsert_keeps_chronological_order() {
        let mut history = History::new();
        history.upsert(energy(day(2025, 1, 3), 3.0));
        history.upsert(energy(day(2025, 1, 1), 1.0));
        history.upsert(energy(day(2025, 1, 2), 2.0));

        let dates: Vec<_> = history.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(2025, 1, 1), day(2025, 1, 2), day(2025, 1, 3)]);
    }

    #[test]
    fn test_upsert_overwrites_same_date() {
        let mut history = History::new();
        assert_eq!(
            history.upsert(energy(day(2025, 1, 1), 1.0)),
            SaveOutcome::Inserted
        );
        assert_eq!(
            history.upsert(energy(day(2025, 1, 1), 9.0)),
            SaveOutcome::Replaced
        );
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(day(2025, 1, 1)).unwrap().total(), 9.0);
    }

    #[test]
    fn test_on_or_before() {
        let history = History::from_records([
            energy(day(2025, 1, 1), 1.0),
            energy(day(2025, 1, 5), 5.0),
            energy(day(2025, 1, 9), 9.0),
        ]);
        assert_eq!(history.on_or_before(day(2024, 12, 31)).len(), 0);
        assert_eq!(history.on_or_before(day(2025, 1, 5)).len(), 2);
        assert_eq!(history.on_or_before(day(2025, 1, 6)).len(), 2);
        assert_eq!(history.on_or_before(day(2030, 1, 1)).len(), 3);
    }

    #[test]
    fn test_from_records_last_wins() {
        let history =
            History::from_records([energy(day(2025, 1, 1), 1.0), energy(day(2025, 1, 1), 2.0)]);
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().total(), 2.0);
    }

    #[test]
    fn test_get_missing_date() {
        let history = History::from_records([energy(day(2025, 1, 1), 1.0)]);
        assert!(history.get(day(2025, 1, 2)).is_none());
    }
}
