//! PDF summary reports.
//!
//! [`ReportPayload`] gathers everything printed on a report; [`PdfExporter`]
//! turns it into PDF bytes.

mod pdf;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::activity::Category;
use crate::calculator::{per_activity, ActivityEmission, EmissionsBreakdown};
use crate::coefficients::CoefficientTable;
use crate::config::ReportConfig;
use crate::error::{Error, Result};
use crate::history::{History, HistoryRecord};
use crate::summary::format_summary;
use crate::tips::Tip;
use crate::trends::{Change, DatedTotal, TrendAggregator};

pub use pdf::PdfExporter;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Parse `#RRGGBB`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidColor`] for anything else.
    pub fn from_hex(value: &str) -> Result<Self> {
        let invalid = || Error::InvalidColor(value.to_string());
        let hex = value.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Channels scaled to `0.0..=1.0`.
    #[must_use]
    pub fn unit(&self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }
}

/// Colors used on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorScheme {
    /// Title, badge, bars and sparklines.
    pub primary: Rgb,
    /// Body text.
    pub text: Rgb,
    /// Chart panels.
    pub chart_background: Rgb,
}

impl ColorScheme {
    /// Parse all three colors from hex strings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidColor`] for the first malformed value.
    pub fn from_hex(primary: &str, text: &str, chart_background: &str) -> Result<Self> {
        Ok(Self {
            primary: Rgb::from_hex(primary)?,
            text: Rgb::from_hex(text)?,
            chart_background: Rgb::from_hex(chart_background)?,
        })
    }
}

/// Page margins in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margins {
    /// Left and right.
    pub side: f32,
    /// Top.
    pub top: f32,
    /// Bottom.
    pub bottom: f32,
}

impl Margins {
    /// Margins from centimeters.
    #[must_use]
    pub fn from_cm(side: f32, top: f32, bottom: f32) -> Self {
        Self {
            side: side * 10.0,
            top: top * 10.0,
            bottom: bottom * 10.0,
        }
    }
}

/// Headline numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KeyMetrics {
    /// The day's total.
    pub total: f64,
    /// Change from the previous record.
    pub change: Change,
    /// Consecutive logged days ending at the report date.
    pub streak_days: u32,
    /// Mean total over the trailing window.
    pub window_average: Option<f64>,
}

/// Everything printed on a report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportPayload {
    /// Title line.
    pub title: String,
    /// Report date.
    pub date: NaiveDate,
    /// Colors.
    pub colors: ColorScheme,
    /// The day's emissions.
    pub breakdown: EmissionsBreakdown,
    /// Non-zero activity contributions, largest first.
    pub per_activity: Vec<ActivityEmission>,
    /// Trailing window totals, oldest first.
    pub window: Vec<DatedTotal>,
    /// Per-category values over the window, oldest first. Empty when
    /// sparklines are disabled.
    pub category_series: BTreeMap<Category, Vec<f64>>,
    /// Headline numbers.
    pub metrics: KeyMetrics,
    /// One-line input summary.
    pub summary: String,
    /// Tip to print, if any.
    pub tip: Option<Tip>,
    /// Encoded PNG or JPEG logo.
    #[serde(skip)]
    pub logo: Option<Vec<u8>>,
    /// Footer text; `None` hides the footer.
    pub footer: Option<String>,
    /// Page margins.
    pub margins: Margins,
}

impl ReportPayload {
    /// Assemble the payload for `day` from history and configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured color is malformed or the day's
    /// inputs are invalid.
    pub fn assemble(
        config: &ReportConfig,
        day: &HistoryRecord,
        history: &History,
        table: &CoefficientTable,
        window_days: usize,
    ) -> Result<Self> {
        let colors = ColorScheme::from_hex(
            &config.primary_color,
            &config.text_color,
            &config.chart_background,
        )?;
        let aggregator = TrendAggregator::new(history, window_days);
        let trend = aggregator.report(day.date);
        let window = aggregator.window(day.date);

        let category_series = if config.include_sparklines {
            Category::ALL
                .iter()
                .map(|category| (*category, window.category_series(*category)))
                .collect()
        } else {
            BTreeMap::new()
        };

        let change = match aggregator.previous_before(day.date) {
            Some(previous) => crate::trends::percentage_change(Some(previous.total), day.total()),
            None => Change::NotAvailable,
        };

        Ok(Self {
            title: config.title.clone(),
            date: day.date,
            colors,
            breakdown: day.breakdown.clone(),
            per_activity: per_activity(&day.inputs, table)?,
            window: trend.window,
            category_series,
            metrics: KeyMetrics {
                total: day.total(),
                change,
                streak_days: trend.streak_days,
                window_average: window.mean_total(),
            },
            summary: format_summary(&day.inputs),
            tip: None,
            logo: config.logo_path.as_deref().and_then(load_logo),
            footer: config
                .include_footer
                .then(|| config.footer_text.clone()),
            margins: Margins::from_cm(
                config.side_margin_cm,
                config.top_margin_cm,
                config.bottom_margin_cm,
            ),
        })
    }

    /// Replace the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Attach a tip.
    #[must_use]
    pub fn with_tip(mut self, tip: Option<Tip>) -> Self {
        self.tip = tip;
        self
    }
}

/// Read a logo file. Missing or unreadable files give `None`.
#[must_use]
pub fn load_logo(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.is_empty() => {
            warn!("Logo {} is empty, using badge", path.display());
            None
        }
        Ok(bytes) => {
            debug!("Loaded logo {} ({} bytes)", path.display(), bytes.len());
            Some(bytes)
        }
        Err(e) => {
            warn!("Cannot read logo {}: {e}, using badge", path.display());
            None
        }
    }
}
