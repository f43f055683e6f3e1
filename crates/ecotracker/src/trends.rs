//! Trend aggregation over saved history.
//!
//! Everything here is computed relative to a reference date: records dated
//! after it are invisible. Sparse or empty history never fails; missing
//! values surface as `None` or [`Change::NotAvailable`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::activity::Category;
use crate::history::{History, HistoryRecord};

/// Default number of records in the trailing window.
pub const DEFAULT_WINDOW_DAYS: usize = 7;

/// Records per period when comparing the last week with the one before.
const PERIOD_RECORDS: usize = 7;

/// A percentage change, or the reason there is none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Change {
    /// `(latest - previous) / previous * 100`.
    Percent(f64),
    /// No previous value, or a change away from zero.
    NotAvailable,
}

impl Change {
    /// The percentage, if available.
    #[must_use]
    pub fn as_percent(&self) -> Option<f64> {
        match self {
            Self::Percent(p) => Some(*p),
            Self::NotAvailable => None,
        }
    }

    /// True if the change could not be computed.
    #[must_use]
    pub fn is_not_available(&self) -> bool {
        matches!(self, Self::NotAvailable)
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{p:+.2}%"),
            Self::NotAvailable => write!(f, "N/A"),
        }
    }
}

impl Serialize for Change {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Percent(p) => serializer.serialize_some(p),
            Self::NotAvailable => serializer.serialize_none(),
        }
    }
}

/// Percentage change from `previous` to `latest`.
///
/// No previous value gives [`Change::NotAvailable`]. A previous value of zero
/// gives 0 % when the latest is also zero and [`Change::NotAvailable`]
/// otherwise.
#[must_use]
pub fn percentage_change(previous: Option<f64>, latest: f64) -> Change {
    match previous {
        None => Change::NotAvailable,
        Some(prev) if prev == 0.0 => {
            if latest == 0.0 {
                Change::Percent(0.0)
            } else {
                Change::NotAvailable
            }
        }
        Some(prev) => Change::Percent((latest - prev) / prev * 100.0),
    }
}

/// A day's grand total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DatedTotal {
    /// The day.
    pub date: NaiveDate,
    /// kg CO₂e.
    pub total: f64,
}

impl From<&HistoryRecord> for DatedTotal {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            date: record.date,
            total: record.total(),
        }
    }
}

/// The last few records up to a reference date.
///
/// Borrowed from the history; [`iter`](Self::iter) can be called any number
/// of times and each call walks the same records oldest first.
#[derive(Debug, Clone, Copy)]
pub struct TrailingWindow<'h> {
    records: &'h [HistoryRecord],
}

impl<'h> TrailingWindow<'h> {
    /// `(date, total)` pairs, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + 'h {
        let records: &'h [HistoryRecord] = self.records;
        records.iter().map(|r| (r.date, r.total()))
    }

    /// Number of records in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there is no history up to the reference date.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The underlying records.
    #[must_use]
    pub fn records(&self) -> &'h [HistoryRecord] {
        self.records
    }

    /// Daily values of one category, oldest first.
    #[must_use]
    pub fn category_series(&self, category: Category) -> Vec<f64> {
        self.records
            .iter()
            .map(|r| r.breakdown.category(category))
            .collect()
    }

    /// Mean per category, or `None` for an empty window.
    #[must_use]
    pub fn category_averages(&self) -> Option<BTreeMap<Category, f64>> {
        if self.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.records.len() as f64;
        Some(
            Category::ALL
                .iter()
                .map(|c| (*c, self.category_series(*c).iter().sum::<f64>() / count))
                .collect(),
        )
    }

    /// Mean grand total, or `None` for an empty window.
    #[must_use]
    pub fn mean_total(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.records.len() as f64;
        Some(self.iter().map(|(_, total)| total).sum::<f64>() / count)
    }
}

impl<'h> IntoIterator for &TrailingWindow<'h> {
    type Item = (NaiveDate, f64);
    type IntoIter = Box<dyn Iterator<Item = (NaiveDate, f64)> + 'h>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Sum over the most recent week of records compared with the week before.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodDelta {
    /// Sum over the last seven records.
    pub last_total: f64,
    /// Sum over the seven records before those; zero if history is shorter.
    pub previous_total: f64,
    /// Change between the two sums.
    pub change: Change,
}

/// Achievement shown after logging a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    /// Any history exists.
    Consistency,
    /// Today's total is under the low-impact threshold.
    LowImpactDay,
    /// At least three consecutive days logged.
    ThreeDayStreak,
    /// At least seven consecutive days logged.
    SevenDayStreak,
    /// Today is more than 10 % below the trailing average.
    BetterThanAverage,
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Consistency => write!(f, "📅 Consistency: entries logged"),
            Self::LowImpactDay => write!(f, "🌿 Low impact day"),
            Self::ThreeDayStreak => write!(f, "🔥 3-day streak"),
            Self::SevenDayStreak => write!(f, "🏆 7-day streak"),
            Self::BetterThanAverage => write!(f, "📈 10% better than trailing average"),
        }
    }
}

/// Everything the trend views show for one reference date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    /// Date the report was computed for.
    pub reference_date: NaiveDate,
    /// Most recent record on or before the reference date.
    pub latest: Option<DatedTotal>,
    /// The record right before `latest`, however many days earlier.
    pub previous: Option<DatedTotal>,
    /// Change from `previous` to `latest`.
    pub change: Change,
    /// Consecutive logged days ending at the reference date.
    pub streak_days: u32,
    /// Trailing window totals, oldest first.
    pub window: Vec<DatedTotal>,
    /// Per-category means over the window.
    pub category_averages: Option<BTreeMap<Category, f64>>,
}

impl TrendReport {
    /// True when no record exists up to the reference date.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }
}

/// Computes trends over a borrowed [`History`].
#[derive(Debug, Clone, Copy)]
pub struct TrendAggregator<'h> {
    history: &'h History,
    window_days: usize,
}

impl<'h> TrendAggregator<'h> {
    /// Create an aggregator. A zero window is treated as one record.
    #[must_use]
    pub fn new(history: &'h History, window_days: usize) -> Self {
        Self {
            history,
            window_days: window_days.max(1),
        }
    }

    /// Build the full report for `reference`.
    #[must_use]
    pub fn report(&self, reference: NaiveDate) -> TrendReport {
        let visible = self.history.on_or_before(reference);
        let latest = visible.last().map(DatedTotal::from);
        let previous = visible
            .len()
            .checked_sub(2)
            .map(|i| DatedTotal::from(&visible[i]));
        let change = match latest {
            Some(latest) => percentage_change(previous.map(|p| p.total), latest.total),
            None => Change::NotAvailable,
        };
        let window = self.window(reference);

        TrendReport {
            reference_date: reference,
            latest,
            previous,
            change,
            streak_days: self.streak_days(reference),
            window: window
                .iter()
                .map(|(date, total)| DatedTotal { date, total })
                .collect(),
            category_averages: window.category_averages(),
        }
    }

    /// The most recent record strictly before `date`.
    #[must_use]
    pub fn previous_before(&self, date: NaiveDate) -> Option<DatedTotal> {
        date.pred_opt()
            .and_then(|day| self.history.on_or_before(day).last())
            .map(DatedTotal::from)
    }

    /// At most `window_days` records up to `reference`.
    #[must_use]
    pub fn window(&self, reference: NaiveDate) -> TrailingWindow<'h> {
        let visible = self.history.on_or_before(reference);
        let start = visible.len().saturating_sub(self.window_days);
        TrailingWindow {
            records: &visible[start..],
        }
    }

    /// Consecutive calendar days with a record, ending at `reference`.
    #[must_use]
    pub fn streak_days(&self, reference: NaiveDate) -> u32 {
        let mut streak = 0;
        let mut day = Some(reference);
        while let Some(current) = day {
            if self.history.get(current).is_none() {
                break;
            }
            streak += 1;
            day = current.pred_opt();
        }
        streak
    }

    /// Last seven records of a category against the seven before them.
    ///
    /// `None` with fewer than two records up to `reference`.
    #[must_use]
    pub fn period_delta(&self, category: Category, reference: NaiveDate) -> Option<PeriodDelta> {
        let visible = self.history.on_or_before(reference);
        if visible.len() < 2 {
            return None;
        }
        let split = visible.len().saturating_sub(PERIOD_RECORDS);
        let sum = |records: &[HistoryRecord]| -> f64 {
            records.iter().map(|r| r.breakdown.category(category)).sum()
        };

        let last_total = sum(&visible[split..]);
        let previous_total = if visible.len() >= 2 * PERIOD_RECORDS {
            sum(&visible[split - PERIOD_RECORDS..split])
        } else {
            0.0
        };
        Some(PeriodDelta {
            last_total,
            previous_total,
            change: percentage_change(Some(previous_total), last_total),
        })
    }

    /// Badges earned by `today_total` on `reference`.
    #[must_use]
    pub fn badges(
        &self,
        today_total: f64,
        reference: NaiveDate,
        low_impact_threshold_kg: f64,
    ) -> Vec<Badge> {
        let mut badges = Vec::new();
        let streak = self.streak_days(reference);

        if !self.history.is_empty() {
            badges.push(Badge::Consistency);
        }
        if today_total < low_impact_threshold_kg {
            badges.push(Badge::LowImpactDay);
        }
        if streak >= 3 {
            badges.push(Badge::ThreeDayStreak);
        }
        if streak >= 7 {
            badges.push(Badge::SevenDayStreak);
        }
        if let Some(mean) = self.window(reference).mean_total() {
            if mean > 0.0 && today_total < 0.9 * mean {
                badges.push(Badge::BetterThanAverage);
            }
        }
        badges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::fixtures::{day, energy, record};

    fn daily_history(totals: &[f64]) -> History {
        let start = day(2025, 1, 1);
        History::from_records(totals.iter().enumerate().map(|(i, total)| {
            let offset = chrono::Days::new(u64::try_from(i).unwrap());
            energy(start.checked_add_days(offset).unwrap(), *total)
        }))
    }

    #[test]
    fn test_change_identical_totals_is_zero() {
        assert_eq!(percentage_change(Some(12.5), 12.5), Change::Percent(0.0));
        assert_eq!(percentage_change(Some(0.0), 0.0), Change::Percent(0.0));
    }

    #[test]
    fn test_change_from_zero_is_not_available() {
        let change = percentage_change(Some(0.0), 4.0);
        assert!(change.is_not_available());
        assert_eq!(change.to_string(), "N/A");
    }

    #[test]
    fn test_change_without_previous() {
        assert_eq!(percentage_change(None, 4.0), Change::NotAvailable);
    }

    #[test]
    fn test_change_percent() {
        assert_eq!(percentage_change(Some(10.0), 15.0), Change::Percent(50.0));
        assert_eq!(percentage_change(Some(10.0), 5.0).to_string(), "-50.00%");
    }

    #[test]
    fn test_change_serializes_as_nullable_number() {
        assert_eq!(serde_json::to_string(&Change::Percent(5.0)).unwrap(), "5.0");
        assert_eq!(serde_json::to_string(&Change::NotAvailable).unwrap(), "null");
    }

    #[test]
    fn test_empty_history_reports_no_data() {
        let history = History::new();
        let report = TrendAggregator::new(&history, 7).report(day(2025, 1, 1));
        assert!(report.is_empty());
        assert!(report.previous.is_none());
        assert!(report.change.is_not_available());
        assert!(report.window.is_empty());
        assert!(report.category_averages.is_none());
        assert_eq!(report.streak_days, 0);
    }

    #[test]
    fn test_single_record_change_is_not_available() {
        let history = daily_history(&[5.0]);
        let report = TrendAggregator::new(&history, 7).report(day(2025, 1, 1));
        assert_eq!(report.latest.unwrap().total, 5.0);
        assert!(report.change.is_not_available());
    }

    #[test]
    fn test_previous_skips_gaps() {
        let history = History::from_records([
            energy(day(2025, 1, 1), 10.0),
            energy(day(2025, 1, 5), 15.0),
        ]);
        let report = TrendAggregator::new(&history, 7).report(day(2025, 1, 9));
        assert_eq!(report.latest.unwrap().date, day(2025, 1, 5));
        assert_eq!(report.previous.unwrap().date, day(2025, 1, 1));
        assert_eq!(report.change, Change::Percent(50.0));
    }

    #[test]
    fn test_records_after_reference_are_ignored() {
        let history = daily_history(&[1.0, 2.0, 3.0]);
        let report = TrendAggregator::new(&history, 7).report(day(2025, 1, 2));
        assert_eq!(report.latest.unwrap().total, 2.0);
        assert_eq!(report.window.len(), 2);
    }

    #[test]
    fn test_window_length_is_capped() {
        for count in [0usize, 1, 3, 7, 10] {
            let totals: Vec<f64> = (0..count).map(|i| i as f64).collect();
            let history = daily_history(&totals);
            let window = TrendAggregator::new(&history, 7).window(day(2025, 12, 31));
            assert_eq!(window.len(), count.min(7));
            assert_eq!(window.iter().count(), count.min(7));
        }
    }

    #[test]
    fn test_window_is_restartable_and_ordered() {
        let history = daily_history(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let window = TrendAggregator::new(&history, 7).window(day(2025, 12, 31));

        let first: Vec<_> = window.iter().map(|(_, t)| t).collect();
        let second: Vec<_> = (&window).into_iter().map(|(_, t)| t).collect();
        assert_eq!(first, vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_category_averages() {
        let history = History::from_records([
            record(day(2025, 1, 1), Category::Energy, 2.0),
            record(day(2025, 1, 2), Category::Meals, 4.0),
        ]);
        let averages = TrendAggregator::new(&history, 7)
            .window(day(2025, 1, 2))
            .category_averages()
            .unwrap();
        assert_eq!(averages[&Category::Energy], 1.0);
        assert_eq!(averages[&Category::Transport], 0.0);
        assert_eq!(averages[&Category::Meals], 2.0);
    }

    #[test]
    fn test_streak_counts_consecutive_days() {
        let history = History::from_records([
            energy(day(2025, 1, 1), 1.0),
            energy(day(2025, 1, 3), 1.0),
            energy(day(2025, 1, 4), 1.0),
            energy(day(2025, 1, 5), 1.0),
        ]);
        let aggregator = TrendAggregator::new(&history, 7);
        assert_eq!(aggregator.streak_days(day(2025, 1, 5)), 3);
        assert_eq!(aggregator.streak_days(day(2025, 1, 1)), 1);
        assert_eq!(aggregator.streak_days(day(2025, 1, 2)), 0);
    }

    #[test]
    fn test_previous_before() {
        let history = daily_history(&[1.0, 2.0]);
        let aggregator = TrendAggregator::new(&history, 7);
        assert_eq!(aggregator.previous_before(day(2025, 1, 2)).unwrap().total, 1.0);
        assert!(aggregator.previous_before(day(2025, 1, 1)).is_none());
    }

    #[test]
    fn test_period_delta_short_history() {
        let history = daily_history(&[1.0]);
        let aggregator = TrendAggregator::new(&history, 7);
        assert!(aggregator
            .period_delta(Category::Energy, day(2025, 12, 31))
            .is_none());

        let history = daily_history(&[1.0, 2.0, 3.0]);
        let delta = TrendAggregator::new(&history, 7)
            .period_delta(Category::Energy, day(2025, 12, 31))
            .unwrap();
        assert_eq!(delta.last_total, 6.0);
        assert_eq!(delta.previous_total, 0.0);
        assert!(delta.change.is_not_available());
    }

    #[test]
    fn test_period_delta_two_full_weeks() {
        let mut totals = vec![1.0; 7];
        totals.extend(vec![2.0; 7]);
        let history = daily_history(&totals);
        let delta = TrendAggregator::new(&history, 7)
            .period_delta(Category::Energy, day(2025, 12, 31))
            .unwrap();
        assert_eq!(delta.last_total, 14.0);
        assert_eq!(delta.previous_total, 7.0);
        assert_eq!(delta.change, Change::Percent(100.0));
    }

    #[test]
    fn test_badges() {
        let history = daily_history(&[30.0; 7]);
        let badges = TrendAggregator::new(&history, 7).badges(10.0, day(2025, 1, 7), 20.0);
        assert_eq!(
            badges,
            vec![
                Badge::Consistency,
                Badge::LowImpactDay,
                Badge::ThreeDayStreak,
                Badge::SevenDayStreak,
                Badge::BetterThanAverage,
            ]
        );
    }

    #[test]
    fn test_unsaved_day_earns_no_history_badges() {
        let history = History::new();
        let badges = TrendAggregator::new(&history, 7).badges(0.0, day(2025, 1, 1), 20.0);
        assert_eq!(badges, vec![Badge::LowImpactDay]);

        // Two saved days before an unsaved reference day do not make a streak
        let history = daily_history(&[30.0, 30.0]);
        let aggregator = TrendAggregator::new(&history, 7);
        assert_eq!(aggregator.streak_days(day(2025, 1, 3)), 0);
        let badges = aggregator.badges(50.0, day(2025, 1, 3), 20.0);
        assert_eq!(badges, vec![Badge::Consistency]);
    }

    #[test]
    fn test_no_badges_for_empty_history_and_high_total() {
        let history = History::new();
        let badges = TrendAggregator::new(&history, 7).badges(50.0, day(2025, 1, 1), 20.0);
        assert!(badges.is_empty());
    }
}
