//! Eco tip generation.
//!
//! A [`TipGenerator`] asks a [`TipProvider`] for a personalized tip and
//! falls back to a canned tip whenever the provider is missing, slow, or
//! broken. Generation itself never fails: the caller always receives a
//! [`Tip`] tagged with where it came from.

mod fallback;
mod openai;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::activity::ActivityRecord;
use crate::calculator::{format_emissions, EmissionsBreakdown};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::summary::format_summary;

pub use fallback::fallback_tip;
pub use openai::OpenAiTipProvider;

/// Longest tip text kept from a provider, in characters.
const MAX_TIP_CHARS: usize = 400;

/// Where a tip came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipSource {
    /// Produced by the tip service.
    Generated,
    /// Chosen from the built-in list.
    Fallback,
}

impl fmt::Display for TipSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated => write!(f, "generated"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// A tip and its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    /// Tip text.
    pub text: String,
    /// Where the text came from.
    pub source: TipSource,
}

impl Tip {
    /// A tip from the service.
    #[must_use]
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: TipSource::Generated,
        }
    }

    /// A built-in tip.
    #[must_use]
    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: TipSource::Fallback,
        }
    }

    /// True if the tip came from the built-in list.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == TipSource::Fallback
    }
}

/// Everything a provider may use to personalize a tip.
#[derive(Debug, Clone)]
pub struct TipRequest {
    /// Day the tip is for.
    pub date: NaiveDate,
    /// The day's inputs.
    pub record: ActivityRecord,
    /// The day's emissions.
    pub breakdown: EmissionsBreakdown,
}

impl TipRequest {
    /// Bundle a day's data.
    #[must_use]
    pub fn new(date: NaiveDate, record: ActivityRecord, breakdown: EmissionsBreakdown) -> Self {
        Self {
            date,
            record,
            breakdown,
        }
    }

    /// Prompt text sent to a language model.
    #[must_use]
    pub fn prompt(&self) -> String {
        let mut prompt = format!(
            "Today's activities: {}.\nEstimated footprint: {} total",
            format_summary(&self.record),
            format_emissions(self.breakdown.total()),
        );
        for (category, kg) in self.breakdown.iter() {
            prompt.push_str(&format!(", {} {}", category.key(), format_emissions(kg)));
        }
        prompt.push_str(".\n");
        if let Some(dominant) = self.breakdown.dominant() {
            prompt.push_str(&format!("The largest source is {}.\n", dominant.key()));
        }
        prompt.push_str(
            "Give one short, practical, encouraging tip (at most two sentences) \
             to reduce tomorrow's footprint.",
        );
        prompt
    }
}

/// A source of personalized tips.
#[async_trait]
pub trait TipProvider: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Fetch a tip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExternalService`] if the service fails or answers
    /// with something unusable.
    async fn fetch(&self, request: &TipRequest) -> Result<String>;
}

/// Produces a tip for a day, falling back when the provider can't.
pub struct TipGenerator {
    provider: Option<Box<dyn TipProvider>>,
    timeout: Duration,
    max_retries: u32,
}

impl fmt::Debug for TipGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TipGenerator")
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl TipGenerator {
    /// Generator with a provider.
    #[must_use]
    pub fn new(provider: Box<dyn TipProvider>, timeout: Duration, max_retries: u32) -> Self {
        Self {
            provider: Some(provider),
            timeout,
            max_retries,
        }
    }

    /// Generator that only ever returns built-in tips.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            provider: None,
            timeout: Duration::ZERO,
            max_retries: 0,
        }
    }

    /// Build from configuration. Without an API key, or with tips
    /// disabled, the generator is offline.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        if !config.tips.enabled {
            debug!("Tip service disabled in configuration");
            return Self::offline();
        }
        match config.api_key() {
            Some(key) => Self::new(
                Box::new(OpenAiTipProvider::new(
                    &config.tips.endpoint,
                    &config.tips.model,
                    key,
                )),
                config.tip_timeout(),
                config.tips.max_retries,
            ),
            None => {
                debug!("No API key configured, using built-in tips");
                Self::offline()
            }
        }
    }

    /// True if a provider is configured.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.provider.is_some()
    }

    /// Produce a tip. Never fails.
    pub async fn generate(&self, request: &TipRequest) -> Tip {
        let Some(provider) = self.provider.as_deref() else {
            return fallback_tip(request);
        };
        if !request.record.should_generate_tip() {
            debug!("Input too sparse for a personalized tip");
            return fallback_tip(request);
        }

        match self.fetch_with_retries(provider, request).await {
            Ok(text) => Tip::generated(text),
            Err(e) => {
                warn!("Falling back to built-in tip: {e}");
                fallback_tip(request)
            }
        }
    }

    async fn fetch_with_retries(
        &self,
        provider: &dyn TipProvider,
        request: &TipRequest,
    ) -> Result<String> {
        let attempts = self.max_retries.saturating_add(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let outcome = match tokio::time::timeout(self.timeout, provider.fetch(request)).await {
                Ok(result) => result.and_then(|text| clean_tip(provider.name(), &text)),
                Err(_) => Err(Error::external_service(
                    provider.name(),
                    format!("timed out after {:?}", self.timeout),
                )),
            };
            match outcome {
                Ok(text) => return Ok(text),
                Err(e) => {
                    debug!("Tip attempt {attempt}/{attempts} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::external_service(provider.name(), "no attempts made")))
    }
}

/// Trim a provider answer and reject empty ones.
fn clean_tip(service: &'static str, raw: &str) -> Result<String> {
    let text = raw.trim().trim_matches('"').trim();
    if text.is_empty() {
        return Err(Error::external_service(service, "empty tip"));
    }
    Ok(text.chars().take(MAX_TIP_CHARS).collect())
}
