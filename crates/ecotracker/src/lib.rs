//! `ecotracker` - Personal sustainability tracking
//!
//! This library turns daily activity quantities (energy, transport, meals)
//! into CO₂-equivalent estimates, keeps one record per day in a CSV history,
//! computes trends over that history, and produces eco tips and PDF reports.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod activity;
pub mod calculator;
pub mod cli;
pub mod coefficients;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod presets;
pub mod report;
pub mod storage;
pub mod summary;
pub mod tips;
pub mod trends;

pub use activity::{Activity, ActivityRecord, Category};
pub use calculator::{calculate, EmissionsBreakdown};
pub use coefficients::CoefficientTable;
pub use config::Config;
pub use error::{Error, Result};
pub use history::{History, HistoryRecord, SaveOutcome};
pub use logging::init_logging;
pub use storage::HistoryStore;
pub use tips::{Tip, TipGenerator, TipSource};
pub use trends::{Change, TrendAggregator, TrendReport};
