//! Plain-text summary of a day's inputs.

use crate::activity::{Activity, ActivityRecord, Category};

/// Shown when nothing positive was entered.
pub const EMPTY_SUMMARY: &str = "No activities logged yet.";

/// Compact one-line summary of the positive inputs, grouped by category.
///
/// Quantities use one decimal for fuel and energy, whole numbers for
/// distances and water, and two decimals for food.
#[must_use]
pub fn format_summary(record: &ActivityRecord) -> String {
    let parts: Vec<String> = Category::ALL
        .iter()
        .flat_map(|category| category.activities())
        .filter_map(|activity| {
            let quantity = record.quantity(activity);
            (quantity.is_finite() && quantity > 0.0).then(|| format_part(activity, quantity))
        })
        .collect();

    if parts.is_empty() {
        EMPTY_SUMMARY.to_string()
    } else {
        parts.join(" | ")
    }
}

fn format_part(activity: Activity, quantity: f64) -> String {
    let label = activity.label();
    let unit = activity.unit();
    let precision = match activity.category() {
        Category::Meals => 2,
        _ if unit == "km"
            || matches!(activity, Activity::HotWaterLiter | Activity::ColdWaterLiter) =>
        {
            0
        }
        _ => 1,
    };
    format!("{label}: {quantity:.precision$} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        assert_eq!(format_summary(&ActivityRecord::new()), EMPTY_SUMMARY);
        let zeros = ActivityRecord::new().with("bus_km", 0.0);
        assert_eq!(format_summary(&zeros), EMPTY_SUMMARY);
    }

    #[test]
    fn test_summary_formats_units() {
        let record = ActivityRecord::new()
            .with("petrol_liter", 2.5)
            .with("bus_km", 10.0)
            .with("hot_water_liter", 60.0)
            .with("meat_kg", 0.15);
        assert_eq!(
            format_summary(&record),
            "Hot water: 60 L | Petrol: 2.5 L | Bus: 10 km | Meat: 0.15 kg"
        );
    }

    #[test]
    fn test_summary_ignores_unknown_and_negative() {
        let record = ActivityRecord::new()
            .with("teleport_km", 5.0)
            .with("train_km", -2.0)
            .with("electricity_kwh", 6.0);
        assert_eq!(format_summary(&record), "Electricity: 6.0 kWh");
    }
}
