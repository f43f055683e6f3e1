//! Emissions calculation.
//!
//! [`calculate`] is a pure function of an [`ActivityRecord`] and a
//! [`CoefficientTable`]. Summation always runs in [`Activity::ALL`] order and
//! then [`Category::ALL`] order, so identical inputs give bit-identical totals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::activity::{Activity, ActivityRecord, Category};
use crate::coefficients::CoefficientTable;
use crate::error::{Error, Result};

/// Per-category and total kg CO₂e for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionsBreakdown {
    categories: BTreeMap<Category, f64>,
    total: f64,
}

impl Default for EmissionsBreakdown {
    fn default() -> Self {
        Self::from_categories(Category::ALL.map(|category| (category, 0.0)))
    }
}

impl EmissionsBreakdown {
    /// Build a breakdown from category sums; the total is their sum.
    ///
    /// Categories left out read as zero.
    #[must_use]
    pub fn from_categories(sums: impl IntoIterator<Item = (Category, f64)>) -> Self {
        let mut categories: BTreeMap<Category, f64> =
            Category::ALL.iter().map(|c| (*c, 0.0)).collect();
        for (category, sum) in sums {
            categories.insert(category, sum);
        }
        let total = Category::ALL.iter().map(|c| categories[c]).sum();
        Self { categories, total }
    }

    /// Sum for one category.
    #[must_use]
    pub fn category(&self, category: Category) -> f64 {
        self.categories.get(&category).copied().unwrap_or(0.0)
    }

    /// Grand total.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Iterate over `(category, sum)` in [`Category::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.categories.iter().map(|(c, v)| (*c, *v))
    }

    /// The highest-emitting category, or `None` when nothing was emitted.
    ///
    /// Ties go to the category listed first.
    #[must_use]
    pub fn dominant(&self) -> Option<Category> {
        if self.is_zero() {
            return None;
        }
        self.iter()
            .fold(None::<(Category, f64)>, |best, (category, value)| match best {
                Some((_, best_value)) if best_value >= value => best,
                _ => Some((category, value)),
            })
            .map(|(category, _)| category)
    }

    /// True if every category is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, value)| value == 0.0)
    }
}

/// One activity's share of the day's emissions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActivityEmission {
    /// The activity.
    pub activity: Activity,
    /// Entered quantity.
    pub quantity: f64,
    /// quantity × factor.
    pub kg_co2e: f64,
}

/// Compute the emissions breakdown for a record.
///
/// Unknown keys contribute nothing.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] naming every key with a negative or
/// non-finite quantity. Nothing is summed in that case.
pub fn calculate(record: &ActivityRecord, table: &CoefficientTable) -> Result<EmissionsBreakdown> {
    validate(record)?;

    let mut sums: BTreeMap<Category, f64> = BTreeMap::new();
    for activity in Activity::ALL {
        let contribution = contribution(record, table, activity);
        *sums.entry(activity.category()).or_insert(0.0) += contribution;
    }
    Ok(EmissionsBreakdown::from_categories(sums))
}

/// Per-activity contributions, largest first, omitting zeros.
///
/// # Errors
///
/// Same validation as [`calculate`].
pub fn per_activity(
    record: &ActivityRecord,
    table: &CoefficientTable,
) -> Result<Vec<ActivityEmission>> {
    validate(record)?;

    let mut rows: Vec<ActivityEmission> = Activity::ALL
        .into_iter()
        .map(|activity| ActivityEmission {
            activity,
            quantity: record.quantity(activity),
            kg_co2e: contribution(record, table, activity),
        })
        .filter(|row| row.kg_co2e > 0.0)
        .collect();
    rows.sort_by(|a, b| b.kg_co2e.total_cmp(&a.kg_co2e));
    Ok(rows)
}

/// Format a kg CO₂e value for display.
#[must_use]
pub fn format_emissions(kg: f64) -> String {
    format!("{kg:.2} kg CO₂")
}

fn validate(record: &ActivityRecord) -> Result<()> {
    let invalid = record.invalid_fields();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(Error::invalid_input(invalid))
    }
}

fn contribution(record: &ActivityRecord, table: &CoefficientTable, activity: Activity) -> f64 {
    table
        .factor(activity)
        .map_or(0.0, |factor| record.quantity(activity) * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_factor_table() -> CoefficientTable {
        CoefficientTable::from_factors([(Activity::ElectricityKwh, 0.5), (Activity::BusKm, 0.1)])
            .unwrap()
    }

    #[test]
    fn test_worked_example() {
        let record = ActivityRecord::new()
            .with("electricity_kwh", 10.0)
            .with("bus_km", 5.0);
        let breakdown = calculate(&record, &two_factor_table()).unwrap();

        assert_eq!(breakdown.category(Category::Energy), 5.0);
        assert_eq!(breakdown.category(Category::Transport), 0.5);
        assert_eq!(breakdown.category(Category::Meals), 0.0);
        assert_eq!(breakdown.total(), 5.5);
    }

    #[test]
    fn test_empty_record_is_zero() {
        let breakdown = calculate(&ActivityRecord::new(), &CoefficientTable::standard()).unwrap();
        for category in Category::ALL {
            assert_eq!(breakdown.category(category), 0.0);
        }
        assert_eq!(breakdown.total(), 0.0);
        assert!(breakdown.is_zero());
        assert_eq!(breakdown.dominant(), None);
    }

    #[test]
    fn test_unknown_keys_contribute_nothing() {
        let record = ActivityRecord::new()
            .with("teleport_km", 1000.0)
            .with("unicorn_rides", 3.0);
        let breakdown = calculate(&record, &CoefficientTable::standard()).unwrap();
        assert_eq!(breakdown.total(), 0.0);
    }

    #[test]
    fn test_activity_without_factor_contributes_nothing() {
        let record = ActivityRecord::new().with("meat_kg", 1.0);
        let breakdown = calculate(&record, &two_factor_table()).unwrap();
        assert_eq!(breakdown.total(), 0.0);
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let record = ActivityRecord::new()
            .with("electricity_kwh", 10.0)
            .with("bus_km", -5.0);
        let err = calculate(&record, &CoefficientTable::standard()).unwrap_err();
        match err {
            Error::InvalidInput { keys } => assert_eq!(keys, vec!["bus_km".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_unknown_key_is_rejected_too() {
        let record = ActivityRecord::new().with("teleport_km", -1.0);
        assert!(calculate(&record, &CoefficientTable::standard())
            .unwrap_err()
            .is_invalid_input());
    }

    #[test]
    fn test_total_equals_sum_of_categories() {
        let record = ActivityRecord::new()
            .with("electricity_kwh", 6.0)
            .with("natural_gas_m3", 1.2)
            .with("hot_water_liter", 60.0)
            .with("bus_km", 10.0)
            .with("petrol_liter", 2.5)
            .with("meat_kg", 0.15)
            .with("dairy_kg", 0.3)
            .with("vegetarian_kg", 0.2);
        let table = CoefficientTable::standard();
        let breakdown = calculate(&record, &table).unwrap();

        let category_sum: f64 = Category::ALL.iter().map(|c| breakdown.category(*c)).sum();
        assert_eq!(breakdown.total(), category_sum);

        let activity_sum: f64 = Activity::ALL
            .iter()
            .map(|a| record.quantity(*a) * table.factor(*a).unwrap())
            .sum();
        assert!((breakdown.total() - activity_sum).abs() < 1e-9);
    }

    #[test]
    fn test_calculation_is_deterministic() {
        let record = ActivityRecord::new()
            .with("flight_short_km", 600.0)
            .with("train_km", 20.0)
            .with("electricity_kwh", 6.0)
            .with("meat_kg", 0.25);
        let table = CoefficientTable::standard();
        let first = calculate(&record, &table).unwrap();
        let second = calculate(&record.clone(), &table).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total().to_bits(), second.total().to_bits());
    }

    #[test]
    fn test_dominant_category() {
        let record = ActivityRecord::new()
            .with("electricity_kwh", 1.0)
            .with("bus_km", 50.0);
        let breakdown = calculate(&record, &two_factor_table()).unwrap();
        assert_eq!(breakdown.dominant(), Some(Category::Transport));
    }

    #[test]
    fn test_per_activity_sorted_and_nonzero() {
        let record = ActivityRecord::new()
            .with("electricity_kwh", 10.0)
            .with("bus_km", 5.0)
            .with("bicycle_km", 8.0);
        let rows = per_activity(&record, &CoefficientTable::standard()).unwrap();
        let activities: Vec<_> = rows.iter().map(|r| r.activity).collect();
        assert_eq!(activities, vec![Activity::ElectricityKwh, Activity::BusKm]);
        assert!(rows[0].kg_co2e >= rows[1].kg_co2e);
    }

    #[test]
    fn test_from_categories_fills_missing() {
        let breakdown = EmissionsBreakdown::from_categories([(Category::Meals, 2.0)]);
        assert_eq!(breakdown.category(Category::Energy), 0.0);
        assert_eq!(breakdown.total(), 2.0);
        assert_eq!(breakdown.iter().count(), 3);
    }

    #[test]
    fn test_format_emissions() {
        assert_eq!(format_emissions(5.5), "5.50 kg CO₂");
    }
}
