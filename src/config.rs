//! File-based configuration.
//!
//! Settings live in a TOML file, by default `review-budget.toml` in the
//! platform config directory. Every field is optional; a missing file means
//! defaults everywhere.
//!
//! ```toml
//! model = "gemini-2.5-pro"
//!
//! [analysis]
//! prompt_overhead = 2000
//! safety_margin_factor = 0.1
//! context_maintenance_factor = 0.2
//! force_single_pass = false
//!
//! [[models]]
//! id = "in-house-coder"
//! provider = "openrouter"
//! context_window = 64000
//! output_limit = 8192
//!
//! [pricing.in-house-coder]
//! input_per_million = 0.5
//! output_per_million = 1.5
//!
//! [pricing.long-context-model]
//! input_per_million = 1.25
//! output_per_million = 10.0
//! threshold = 200000
//! above_input_per_million = 2.5
//! above_output_per_million = 15.0
//! ```

use crate::analyzer::{
    AnalysisOptions, DEFAULT_CONTEXT_MAINTENANCE_FACTOR, DEFAULT_PROMPT_OVERHEAD,
    DEFAULT_SAFETY_MARGIN_FACTOR,
};
use crate::error::{BudgetError, BudgetResult};
use crate::models::{ModelProfile, ProfileResolver, Provider};
use crate::pricing::{Pricing, PricingCatalog, Rates};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Model used when neither the config nor the caller names one.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "review-budget.toml";

/// Analysis settings from the `[analysis]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisSettings {
    /// Prompt scaffolding tokens per request.
    pub prompt_overhead: usize,
    /// Per-chunk reserve for resent context.
    pub context_maintenance_factor: f64,
    /// Single-pass safety reserve.
    pub safety_margin_factor: f64,
    /// Always plan a single pass.
    pub force_single_pass: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            prompt_overhead: DEFAULT_PROMPT_OVERHEAD,
            context_maintenance_factor: DEFAULT_CONTEXT_MAINTENANCE_FACTOR,
            safety_margin_factor: DEFAULT_SAFETY_MARGIN_FACTOR,
            force_single_pass: false,
        }
    }
}

/// An extra registry entry from a `[[models]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelEntry {
    /// Exact model identifier.
    pub id: String,
    /// Provider family.
    #[serde(default = "unknown_provider")]
    pub provider: Provider,
    /// Context window in tokens.
    pub context_window: usize,
    /// Output limit in tokens.
    pub output_limit: usize,
}

fn unknown_provider() -> Provider {
    Provider::Unknown
}

/// A price schedule from a `[pricing.<model>]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PricingEntry {
    /// USD per million input tokens (below the threshold, if tiered).
    pub input_per_million: f64,
    /// USD per million output tokens (below the threshold, if tiered).
    pub output_per_million: f64,
    /// Tokens per request billed at the base rates.
    pub threshold: Option<usize>,
    /// USD per million input tokens past the threshold.
    pub above_input_per_million: Option<f64>,
    /// USD per million output tokens past the threshold.
    pub above_output_per_million: Option<f64>,
}

impl PricingEntry {
    /// Converts the entry into a [`Pricing`] schedule.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::InvalidPricing`] for negative rates or a
    /// partially specified tier.
    pub fn to_pricing(&self, model: &str) -> BudgetResult<Pricing> {
        let rates = [
            Some(self.input_per_million),
            Some(self.output_per_million),
            self.above_input_per_million,
            self.above_output_per_million,
        ];
        if rates.iter().flatten().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(BudgetError::invalid_pricing(
                model,
                "rates must be finite and non-negative",
            ));
        }

        let below = Rates::new(self.input_per_million, self.output_per_million);
        match (
            self.threshold,
            self.above_input_per_million,
            self.above_output_per_million,
        ) {
            (None, None, None) => Ok(Pricing::Flat(below)),
            (Some(threshold), Some(above_input), Some(above_output)) => Ok(Pricing::Tiered {
                threshold,
                below,
                above: Rates::new(above_input, above_output),
            }),
            _ => Err(BudgetError::invalid_pricing(
                model,
                "tiered pricing needs threshold, above_input_per_million \
                 and above_output_per_million",
            )),
        }
    }
}

/// Top-level config file contents.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BudgetConfig {
    /// Default model identifier.
    pub model: Option<String>,
    /// Analysis settings.
    pub analysis: AnalysisSettings,
    /// Extra model profiles.
    pub models: Vec<ModelEntry>,
    /// Pricing overrides keyed by model identifier.
    pub pricing: BTreeMap<String, PricingEntry>,
}

impl BudgetConfig {
    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text does not match the schema.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads a config file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if a pricing entry is inconsistent.
    pub fn from_file(path: &Path) -> BudgetResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| BudgetError::config_io(path, e))?;
        let config =
            Self::from_toml_str(&content).map_err(|e| BudgetError::config_parse(path, e))?;
        config.pricing_catalog()?;
        tracing::debug!(
            path = %path.display(),
            models = config.models.len(),
            pricing_overrides = config.pricing.len(),
            "Loaded config file"
        );
        Ok(config)
    }

    /// Returns the default config path.
    ///
    /// Returns `None` if the platform config directory cannot be determined.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "review-budget", "review-budget")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads from the default path, or returns defaults if there is none.
    ///
    /// # Errors
    ///
    /// Same as [`from_file`](Self::from_file).
    pub fn load_default() -> BudgetResult<Self> {
        match Self::default_config_path() {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// The model to plan for: the override, then the file, then [`DEFAULT_MODEL`].
    #[must_use]
    pub fn model_id(&self, model_override: Option<&str>) -> String {
        model_override
            .map(str::to_string)
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    /// Builds analysis options from the file settings.
    #[must_use]
    pub fn analysis_options(&self, model_override: Option<&str>) -> AnalysisOptions {
        AnalysisOptions::new(self.model_id(model_override))
            .with_prompt_overhead(self.analysis.prompt_overhead)
            .with_context_maintenance_factor(self.analysis.context_maintenance_factor)
            .with_safety_margin_factor(self.analysis.safety_margin_factor)
            .with_force_single_pass(self.analysis.force_single_pass)
    }

    /// Builds a resolver with `[[models]]` entries layered over the built-ins.
    #[must_use]
    pub fn profile_resolver(&self) -> ProfileResolver {
        self.models
            .iter()
            .fold(ProfileResolver::default(), |resolver, entry| {
                resolver.with_known_model(
                    entry.id.clone(),
                    ModelProfile::new(entry.provider, entry.context_window, entry.output_limit),
                )
            })
    }

    /// Builds a pricing catalog with `[pricing]` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::InvalidPricing`] for an inconsistent entry.
    pub fn pricing_catalog(&self) -> BudgetResult<PricingCatalog> {
        let mut catalog = PricingCatalog::new();
        for (model, entry) in &self.pricing {
            catalog.set_model_pricing(model.clone(), entry.to_pricing(model)?);
        }
        Ok(catalog)
    }
}
