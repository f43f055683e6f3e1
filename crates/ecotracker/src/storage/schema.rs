//! Column layout of the history file.
//!
//! One row per day:
//! `date, <activity keys in Activity::ALL order>, energy_kg, transport_kg, meals_kg, total_kg`.

use crate::activity::{Activity, Category};

/// Date column, formatted `YYYY-MM-DD`.
pub const DATE_COLUMN: &str = "date";

/// Grand total column.
pub const TOTAL_COLUMN: &str = "total_kg";

/// Date format used in the date column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column name holding a category sum.
#[must_use]
pub fn category_column(category: Category) -> &'static str {
    match category {
        Category::Energy => "energy_kg",
        Category::Transport => "transport_kg",
        Category::Meals => "meals_kg",
    }
}

/// Full header row in write order.
#[must_use]
pub fn header() -> Vec<&'static str> {
    std::iter::once(DATE_COLUMN)
        .chain(Activity::ALL.iter().map(|a| a.key()))
        .chain(Category::ALL.iter().map(|c| category_column(*c)))
        .chain(std::iter::once(TOTAL_COLUMN))
        .collect()
}
