//! Emission factors per activity.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::activity::Activity;
use crate::error::{Error, Result};

/// Built-in factors in kg CO₂e per input unit.
const STANDARD_FACTORS: [(Activity, f64); 20] = [
    (Activity::ElectricityKwh, 0.233),
    (Activity::NaturalGasM3, 2.03),
    (Activity::HotWaterLiter, 0.0065),
    (Activity::ColdWaterLiter, 0.000_344),
    (Activity::DistrictHeatingKwh, 0.16),
    (Activity::PropaneLiter, 1.51),
    (Activity::FuelOilLiter, 2.52),
    (Activity::PetrolLiter, 2.31),
    (Activity::DieselLiter, 2.68),
    (Activity::BusKm, 0.105),
    (Activity::TrainKm, 0.041),
    (Activity::BicycleKm, 0.0),
    (Activity::FlightShortKm, 0.158),
    (Activity::FlightLongKm, 0.15),
    (Activity::MeatKg, 27.0),
    (Activity::ChickenKg, 6.9),
    (Activity::EggsKg, 4.8),
    (Activity::DairyKg, 1.9),
    (Activity::VegetarianKg, 2.0),
    (Activity::VeganKg, 1.5),
];

/// Immutable activity → factor table.
///
/// Built once at startup (built-ins plus config overrides) and shared by
/// reference afterwards; there is no way to mutate a table in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CoefficientTable {
    factors: BTreeMap<Activity, f64>,
}

impl Default for CoefficientTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl CoefficientTable {
    /// The built-in table.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            factors: STANDARD_FACTORS.into_iter().collect(),
        }
    }

    /// Build a table from explicit entries. Activities left out have no factor.
    ///
    /// # Errors
    ///
    /// Returns an error if any factor is negative or not finite.
    pub fn from_factors(entries: impl IntoIterator<Item = (Activity, f64)>) -> Result<Self> {
        let factors: BTreeMap<Activity, f64> = entries.into_iter().collect();
        for (activity, factor) in &factors {
            check_factor(activity.key(), *factor)?;
        }
        Ok(Self { factors })
    }

    /// Return a copy of this table with `overrides` applied.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown activity keys or for
    /// negative/non-finite factors.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, f64>) -> Result<Self> {
        let mut factors = self.factors.clone();
        for (key, factor) in overrides {
            let activity: Activity = key.parse().map_err(|_| {
                Error::config_validation(format!("unknown activity in [factors]: {key}"))
            })?;
            check_factor(key, *factor)?;
            factors.insert(activity, *factor);
        }
        Ok(Self { factors })
    }

    /// Factor for a recognized activity.
    #[must_use]
    pub fn factor(&self, activity: Activity) -> Option<f64> {
        self.factors.get(&activity).copied()
    }

    /// Factor for a raw input key; `None` for unknown keys.
    #[must_use]
    pub fn factor_for_key(&self, key: &str) -> Option<f64> {
        key.parse::<Activity>()
            .ok()
            .and_then(|activity| self.factor(activity))
    }

    /// Iterate over `(activity, factor)` in [`Activity::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Activity, f64)> + '_ {
        self.factors.iter().map(|(a, f)| (*a, *f))
    }

    /// Number of activities with a factor.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// True if no activity has a factor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

fn check_factor(key: &str, factor: f64) -> Result<()> {
    if factor.is_finite() && factor >= 0.0 {
        Ok(())
    } else {
        Err(Error::config_validation(format!(
            "factor for {key} must be a finite number >= 0, got {factor}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_covers_every_activity() {
        let table = CoefficientTable::standard();
        assert_eq!(table.len(), Activity::ALL.len());
        for activity in Activity::ALL {
            assert!(table.factor(activity).is_some(), "missing {activity}");
        }
    }

    #[test]
    fn test_iter_follows_activity_order() {
        let table = CoefficientTable::standard();
        let order: Vec<_> = table.iter().map(|(a, _)| a).collect();
        assert_eq!(order, Activity::ALL.to_vec());
    }

    #[test]
    fn test_factor_for_key() {
        let table = CoefficientTable::standard();
        assert_eq!(table.factor_for_key("bicycle_km"), Some(0.0));
        assert_eq!(table.factor_for_key("teleport_km"), None);
    }

    #[test]
    fn test_with_overrides() {
        let base = CoefficientTable::standard();
        let overrides = BTreeMap::from([("electricity_kwh".to_string(), 0.5)]);
        let table = base.with_overrides(&overrides).unwrap();
        assert_eq!(table.factor(Activity::ElectricityKwh), Some(0.5));
        assert_eq!(table.factor(Activity::BusKm), base.factor(Activity::BusKm));
        // The base table is untouched
        assert_eq!(base.factor(Activity::ElectricityKwh), Some(0.233));
    }

    #[test]
    fn test_overrides_reject_unknown_key() {
        let overrides = BTreeMap::from([("teleport_km".to_string(), 1.0)]);
        let err = CoefficientTable::standard()
            .with_overrides(&overrides)
            .unwrap_err();
        assert!(err.to_string().contains("teleport_km"));
    }

    #[test]
    fn test_overrides_reject_negative_factor() {
        let overrides = BTreeMap::from([("bus_km".to_string(), -0.1)]);
        assert!(CoefficientTable::standard()
            .with_overrides(&overrides)
            .is_err());
    }

    #[test]
    fn test_from_factors_partial_table() {
        let table =
            CoefficientTable::from_factors([(Activity::ElectricityKwh, 0.5), (Activity::BusKm, 0.1)])
                .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.factor(Activity::MeatKg), None);
        assert!(CoefficientTable::from_factors([(Activity::BusKm, f64::INFINITY)]).is_err());
    }
}
