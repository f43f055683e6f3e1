//! Activity keys, categories and per-day activity records.
//!
//! An [`ActivityRecord`] is deliberately loose: it maps arbitrary string
//! keys to quantities so that unknown keys can flow through untouched. The
//! recognized keys are enumerated by [`Activity`], each assigned to exactly
//! one [`Category`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Emission category shown in summaries and trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Household energy and water.
    Energy,
    /// Fuel, public transport and flights.
    Transport,
    /// Food.
    Meals,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 3] = [Self::Energy, Self::Transport, Self::Meals];

    /// Snake-case key used in files and JSON.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Transport => "transport",
            Self::Meals => "meals",
        }
    }

    /// Emoji shown next to the category in terminal output.
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Energy => "⚡",
            Self::Transport => "🚗",
            Self::Meals => "🥗",
        }
    }

    /// Activities belonging to this category, in fixed order.
    pub fn activities(self) -> impl Iterator<Item = Activity> {
        Activity::ALL
            .into_iter()
            .filter(move |activity| activity.category() == self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Energy => "Energy",
            Self::Transport => "Transport",
            Self::Meals => "Meals",
        };
        f.pad(name)
    }
}

/// A recognized activity with a known unit and category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Grid electricity, kWh.
    ElectricityKwh,
    /// Natural gas, m³.
    NaturalGasM3,
    /// Heated water, liters.
    HotWaterLiter,
    /// Tap water, liters.
    ColdWaterLiter,
    /// District heating, kWh.
    DistrictHeatingKwh,
    /// Propane, liters.
    PropaneLiter,
    /// Heating oil, liters.
    FuelOilLiter,
    /// Petrol burned, liters.
    PetrolLiter,
    /// Diesel burned, liters.
    DieselLiter,
    /// Bus travel, km.
    BusKm,
    /// Rail travel, km.
    TrainKm,
    /// Cycling, km.
    BicycleKm,
    /// Short-haul flight, km.
    FlightShortKm,
    /// Long-haul flight, km.
    FlightLongKm,
    /// Red meat, kg.
    MeatKg,
    /// Poultry, kg.
    ChickenKg,
    /// Eggs, kg.
    EggsKg,
    /// Dairy, kg.
    DairyKg,
    /// Vegetarian meals, kg.
    VegetarianKg,
    /// Vegan meals, kg.
    VeganKg,
}

impl Activity {
    /// Every recognized activity. This order fixes summation and file columns.
    pub const ALL: [Activity; 20] = [
        Self::ElectricityKwh,
        Self::NaturalGasM3,
        Self::HotWaterLiter,
        Self::ColdWaterLiter,
        Self::DistrictHeatingKwh,
        Self::PropaneLiter,
        Self::FuelOilLiter,
        Self::PetrolLiter,
        Self::DieselLiter,
        Self::BusKm,
        Self::TrainKm,
        Self::BicycleKm,
        Self::FlightShortKm,
        Self::FlightLongKm,
        Self::MeatKg,
        Self::ChickenKg,
        Self::EggsKg,
        Self::DairyKg,
        Self::VegetarianKg,
        Self::VeganKg,
    ];

    /// The input key, e.g. `electricity_kwh`.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::ElectricityKwh => "electricity_kwh",
            Self::NaturalGasM3 => "natural_gas_m3",
            Self::HotWaterLiter => "hot_water_liter",
            Self::ColdWaterLiter => "cold_water_liter",
            Self::DistrictHeatingKwh => "district_heating_kwh",
            Self::PropaneLiter => "propane_liter",
            Self::FuelOilLiter => "fuel_oil_liter",
            Self::PetrolLiter => "petrol_liter",
            Self::DieselLiter => "diesel_liter",
            Self::BusKm => "bus_km",
            Self::TrainKm => "train_km",
            Self::BicycleKm => "bicycle_km",
            Self::FlightShortKm => "flight_short_km",
            Self::FlightLongKm => "flight_long_km",
            Self::MeatKg => "meat_kg",
            Self::ChickenKg => "chicken_kg",
            Self::EggsKg => "eggs_kg",
            Self::DairyKg => "dairy_kg",
            Self::VegetarianKg => "vegetarian_kg",
            Self::VeganKg => "vegan_kg",
        }
    }

    /// The category this activity counts toward.
    #[must_use]
    pub fn category(self) -> Category {
        match self {
            Self::ElectricityKwh
            | Self::NaturalGasM3
            | Self::HotWaterLiter
            | Self::ColdWaterLiter
            | Self::DistrictHeatingKwh
            | Self::PropaneLiter
            | Self::FuelOilLiter => Category::Energy,
            Self::PetrolLiter
            | Self::DieselLiter
            | Self::BusKm
            | Self::TrainKm
            | Self::BicycleKm
            | Self::FlightShortKm
            | Self::FlightLongKm => Category::Transport,
            Self::MeatKg
            | Self::ChickenKg
            | Self::EggsKg
            | Self::DairyKg
            | Self::VegetarianKg
            | Self::VeganKg => Category::Meals,
        }
    }

    /// Short human label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::ElectricityKwh => "Electricity",
            Self::NaturalGasM3 => "Gas",
            Self::HotWaterLiter => "Hot water",
            Self::ColdWaterLiter => "Cold water",
            Self::DistrictHeatingKwh => "District heat",
            Self::PropaneLiter => "Propane",
            Self::FuelOilLiter => "Fuel oil",
            Self::PetrolLiter => "Petrol",
            Self::DieselLiter => "Diesel",
            Self::BusKm => "Bus",
            Self::TrainKm => "Train",
            Self::BicycleKm => "Bike",
            Self::FlightShortKm => "Short flight",
            Self::FlightLongKm => "Long flight",
            Self::MeatKg => "Meat",
            Self::ChickenKg => "Chicken",
            Self::EggsKg => "Eggs",
            Self::DairyKg => "Dairy",
            Self::VegetarianKg => "Veg",
            Self::VeganKg => "Vegan",
        }
    }

    /// Unit of the input quantity.
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Self::ElectricityKwh | Self::DistrictHeatingKwh => "kWh",
            Self::NaturalGasM3 => "m³",
            Self::HotWaterLiter
            | Self::ColdWaterLiter
            | Self::PropaneLiter
            | Self::FuelOilLiter
            | Self::PetrolLiter
            | Self::DieselLiter => "L",
            Self::BusKm
            | Self::TrainKm
            | Self::BicycleKm
            | Self::FlightShortKm
            | Self::FlightLongKm => "km",
            Self::MeatKg
            | Self::ChickenKg
            | Self::EggsKg
            | Self::DairyKg
            | Self::VegetarianKg
            | Self::VeganKg => "kg",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Activity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|activity| activity.key() == s)
            .ok_or_else(|| Error::ActivityParse {
                raw: s.to_string(),
                message: "unknown activity key".to_string(),
            })
    }
}

/// Quantities entered for one day, keyed by activity key.
///
/// Absent keys read as zero. Keys that are not recognized activities are
/// kept but never contribute to emissions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityRecord {
    quantities: BTreeMap<String, f64>,
}

impl ActivityRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a quantity, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, quantity: f64) {
        self.quantities.insert(key.into(), quantity);
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, quantity: f64) -> Self {
        self.set(key, quantity);
        self
    }

    /// Quantity for `key`, zero when absent.
    #[must_use]
    pub fn get(&self, key: &str) -> f64 {
        self.quantities.get(key).copied().unwrap_or(0.0)
    }

    /// Quantity for a recognized activity, zero when absent.
    #[must_use]
    pub fn quantity(&self, activity: Activity) -> f64 {
        self.get(activity.key())
    }

    /// Copy every entry of `other` over this record.
    pub fn merge(&mut self, other: &ActivityRecord) {
        for (key, quantity) in other.iter() {
            self.set(key, quantity);
        }
    }

    /// Iterate over `(key, quantity)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.quantities.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of explicitly set keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    /// True if no key was set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Keys whose quantity is negative or not a finite number.
    #[must_use]
    pub fn invalid_fields(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, quantity)| !quantity.is_finite() || *quantity < 0.0)
            .map(|(key, _)| key)
            .collect()
    }

    /// True if at least one recognized activity has a quantity above zero.
    ///
    /// Unknown keys never count, since they contribute nothing to emissions.
    #[must_use]
    pub fn has_meaningful_input(&self) -> bool {
        Activity::ALL
            .iter()
            .any(|activity| self.quantity(*activity) > 0.0)
    }

    /// True when inputs are all valid and at least one is meaningful.
    #[must_use]
    pub fn should_generate_tip(&self) -> bool {
        self.invalid_fields().is_empty() && self.has_meaningful_input()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ActivityRecord {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        let mut record = Self::new();
        for (key, quantity) in iter {
            record.set(key, quantity);
        }
        record
    }
}

/// Parse a `key=value` argument into a key and quantity.
///
/// The key is not checked against [`Activity`]; unknown keys are allowed
/// and later ignored by the calculator.
///
/// # Errors
///
/// Returns [`Error::ActivityParse`] if the `=` is missing, the key is empty,
/// or the value is not a number.
pub fn parse_assignment(raw: &str) -> Result<(String, f64)> {
    let parse_err = |message: &str| Error::ActivityParse {
        raw: raw.to_string(),
        message: message.to_string(),
    };

    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| parse_err("expected key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(parse_err("empty key"));
    }
    let quantity: f64 = value
        .trim()
        .parse()
        .map_err(|_| parse_err("value is not a number"))?;
    Ok((key.to_string(), quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_activities() {
        assert_eq!(Category::Energy.activities().count(), 7);
        assert_eq!(Category::Transport.activities().count(), 7);
        assert_eq!(Category::Meals.activities().count(), 6);
    }

    #[test]
    fn test_activity_keys_are_unique() {
        let mut keys: Vec<_> = Activity::ALL.iter().map(|a| a.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), Activity::ALL.len());
    }

    #[test]
    fn test_activity_from_str() {
        assert_eq!("bus_km".parse::<Activity>().unwrap(), Activity::BusKm);
        assert!("teleport_km".parse::<Activity>().is_err());
    }

    #[test]
    fn test_activity_serde_matches_key() {
        for activity in Activity::ALL {
            let json = serde_json::to_string(&activity).unwrap();
            assert_eq!(json, format!("\"{}\"", activity.key()));
        }
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Energy.to_string(), "Energy");
        assert_eq!(Category::Meals.key(), "meals");
    }

    #[test]
    fn test_record_defaults_to_zero() {
        let record = ActivityRecord::new();
        assert_eq!(record.get("electricity_kwh"), 0.0);
        assert_eq!(record.quantity(Activity::MeatKg), 0.0);
        assert!(record.is_empty());
    }

    #[test]
    fn test_record_merge_overwrites() {
        let mut base = ActivityRecord::new().with("bus_km", 5.0).with("meat_kg", 0.2);
        let overrides = ActivityRecord::new().with("bus_km", 12.0);
        base.merge(&overrides);
        assert_eq!(base.get("bus_km"), 12.0);
        assert_eq!(base.get("meat_kg"), 0.2);
    }

    #[test]
    fn test_invalid_fields() {
        let record = ActivityRecord::new()
            .with("bus_km", -1.0)
            .with("meat_kg", f64::NAN)
            .with("train_km", 3.0);
        assert_eq!(record.invalid_fields(), vec!["bus_km", "meat_kg"]);
    }

    #[test]
    fn test_meaningful_input() {
        let zeros = ActivityRecord::new().with("bus_km", 0.0);
        assert!(!zeros.has_meaningful_input());
        assert!(!zeros.should_generate_tip());

        let some = zeros.clone().with("train_km", 1.0);
        assert!(some.should_generate_tip());

        let invalid = some.with("meat_kg", -0.5);
        assert!(invalid.has_meaningful_input());
        assert!(!invalid.should_generate_tip());
    }

    #[test]
    fn test_unknown_keys_are_not_meaningful() {
        let record = ActivityRecord::new()
            .with("teleport_km", 5.0)
            .with("bus_km", 0.0);
        assert!(!record.has_meaningful_input());
        assert!(!record.should_generate_tip());

        let record = record.with("bus_km", 2.0);
        assert!(record.has_meaningful_input());
    }

    #[test]
    fn test_record_from_iter() {
        let record: ActivityRecord = [("bus_km", 1.0), ("train_km", 2.0)].into_iter().collect();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("train_km"), 2.0);
    }

    #[test]
    fn test_record_serializes_as_map() {
        let record = ActivityRecord::new().with("bus_km", 10.0);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"bus_km":10.0}"#);
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("bus_km=12.5").unwrap(),
            ("bus_km".to_string(), 12.5)
        );
        assert_eq!(
            parse_assignment(" meat_kg = 0.2 ").unwrap(),
            ("meat_kg".to_string(), 0.2)
        );
        // Negative values parse; the calculator rejects them
        assert_eq!(parse_assignment("bus_km=-3").unwrap().1, -3.0);
    }

    #[test]
    fn test_parse_assignment_errors() {
        assert!(parse_assignment("bus_km").is_err());
        assert!(parse_assignment("=3").is_err());
        assert!(parse_assignment("bus_km=lots").is_err());
    }
}
