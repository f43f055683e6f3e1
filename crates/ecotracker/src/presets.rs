//! Canned input scenarios and input resolution.
//!
//! A day's inputs are resolved exactly once per invocation from three layers,
//! later layers winning key by key: configured defaults, an optional
//! [`Preset`], and explicit values from the command line.

use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activity::ActivityRecord;

/// A named scenario that fills in typical quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// A representative mixed day.
    Demo,
    /// Public transport and cycling only.
    NoCarDay,
    /// Plant-based meals.
    VegetarianDay,
    /// A short-haul flight plus a train leg.
    BusinessTrip,
}

impl Preset {
    /// Quantities the preset sets. Keys it leaves out are untouched.
    #[must_use]
    pub fn values(self) -> &'static [(&'static str, f64)] {
        match self {
            Self::Demo => &[
                ("electricity_kwh", 8.0),
                ("natural_gas_m3", 1.2),
                ("hot_water_liter", 60.0),
                ("bus_km", 10.0),
                ("train_km", 0.0),
                ("petrol_liter", 2.5),
                ("meat_kg", 0.15),
                ("dairy_kg", 0.3),
                ("vegetarian_kg", 0.2),
            ],
            Self::NoCarDay => &[
                ("petrol_liter", 0.0),
                ("diesel_liter", 0.0),
                ("bus_km", 12.0),
                ("train_km", 6.0),
                ("bicycle_km", 5.0),
            ],
            Self::VegetarianDay => &[
                ("meat_kg", 0.0),
                ("chicken_kg", 0.0),
                ("vegetarian_kg", 0.6),
                ("vegan_kg", 0.2),
                ("dairy_kg", 0.25),
            ],
            Self::BusinessTrip => &[
                ("flight_short_km", 600.0),
                ("train_km", 20.0),
                ("electricity_kwh", 6.0),
                ("meat_kg", 0.25),
            ],
        }
    }

    /// The preset as a record.
    #[must_use]
    pub fn record(self) -> ActivityRecord {
        self.values().iter().copied().collect()
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Demo => write!(f, "demo"),
            Self::NoCarDay => write!(f, "no-car-day"),
            Self::VegetarianDay => write!(f, "vegetarian-day"),
            Self::BusinessTrip => write!(f, "business-trip"),
        }
    }
}

/// The layers that make up one day's inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputPlan {
    /// Baseline quantities from configuration.
    pub defaults: BTreeMap<String, f64>,
    /// Optional scenario applied over the defaults.
    pub preset: Option<Preset>,
    /// Explicit values, applied last.
    pub overrides: Vec<(String, f64)>,
}

impl InputPlan {
    /// Start from configured defaults.
    #[must_use]
    pub fn new(defaults: BTreeMap<String, f64>) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    /// Apply a preset.
    #[must_use]
    pub fn with_preset(mut self, preset: Option<Preset>) -> Self {
        self.preset = preset;
        self
    }

    /// Apply explicit values.
    #[must_use]
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (String, f64)>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    /// True if neither a preset nor explicit values were given.
    #[must_use]
    pub fn has_user_input(&self) -> bool {
        self.preset.is_some() || !self.overrides.is_empty()
    }

    /// Collapse the layers into one record.
    #[must_use]
    pub fn resolve(&self) -> ActivityRecord {
        let mut record: ActivityRecord = self
            .defaults
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        if let Some(preset) = self.preset {
            debug!("Applying preset {preset}");
            record.merge(&preset.record());
        }
        for (key, quantity) in &self.overrides {
            record.set(key.clone(), *quantity);
        }
        record
    }
}
