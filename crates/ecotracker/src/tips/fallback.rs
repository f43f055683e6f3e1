//! Built-in tips used when the tip service is unavailable.

use chrono::Datelike;

use super::{Tip, TipRequest};
use crate::activity::Category;

const ENERGY_TIPS: &[&str] = &[
    "Lower your thermostat by one degree and switch devices fully off instead of standby.",
    "Run the washing machine and dishwasher only when full, and wash at 30°C.",
    "Take shorter showers: hot water is one of the biggest household energy users.",
    "Swap remaining bulbs for LEDs and turn lights off in empty rooms.",
];

const TRANSPORT_TIPS: &[&str] = &[
    "Replace one short car trip with walking or cycling tomorrow.",
    "Combine errands into a single trip, or take the bus for your commute.",
    "For trips under 700 km, the train usually beats flying on CO₂ by a wide margin.",
    "Keep tyres properly inflated and drive smoothly to cut fuel use.",
];

const MEALS_TIPS: &[&str] = &[
    "Try a plant-based lunch tomorrow: beans and lentils have a fraction of beef's footprint.",
    "Swap red meat for chicken or eggs once this week.",
    "Plan meals ahead to avoid food waste, which carries all the emissions of growing it.",
    "Choose seasonal, local vegetables when you can.",
];

const GENERAL_TIPS: &[&str] = &[
    "Log your activities daily: tracking is the first step to reducing your footprint.",
    "Pick one habit to change this week and watch your trend line.",
    "Small daily changes add up: aim to beat your 7-day average tomorrow.",
];

fn tips_for(category: Option<Category>) -> &'static [&'static str] {
    match category {
        Some(Category::Energy) => ENERGY_TIPS,
        Some(Category::Transport) => TRANSPORT_TIPS,
        Some(Category::Meals) => MEALS_TIPS,
        None => GENERAL_TIPS,
    }
}

/// Pick a built-in tip for the dominant category.
///
/// The choice depends only on the category and the date, so the same day
/// always gets the same tip.
#[must_use]
pub fn fallback_tip(request: &TipRequest) -> Tip {
    let tips = tips_for(request.breakdown.dominant());
    let index = request.date.ordinal0() as usize % tips.len();
    Tip::fallback(tips[index])
}
