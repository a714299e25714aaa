//! Centralized error types for review-budget.
//!
//! Only configuration problems surface as errors. Degraded inputs (unknown
//! models, missing pricing, oversized files) are reported as warnings on the
//! analysis result or the usage report instead.
//!
//! # Example
//!
//! ```
//! use review_budget::error::{BudgetError, BudgetResult};
//!
//! fn check_factor(value: f64) -> BudgetResult<()> {
//!     if !(0.0..1.0).contains(&value) {
//!         return Err(BudgetError::invalid_factor("safety_margin_factor", value));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_factor(1.5).unwrap_err();
//! assert!(err.is_configuration_error());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `BudgetError`.
pub type BudgetResult<T> = Result<T, BudgetError>;

/// Centralized error type for review-budget.
#[derive(Debug, Error)]
pub enum BudgetError {
    // ============== Analysis Configuration Errors ==============
    /// The resolved context window cannot hold any tokens.
    #[error("model '{model}' resolved to a non-positive context window ({context_window})")]
    InvalidContextWindow {
        /// The model identifier that was resolved.
        model: String,
        /// The offending context window size.
        context_window: usize,
    },

    /// A reserve factor is negative, not finite, or would leave no usable window.
    #[error("{name} must be in the range [0.0, 1.0), got {value}")]
    InvalidFactor {
        /// Name of the factor option.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// File tokens plus prompt overhead cannot be represented.
    #[error("token total for model '{model}' overflows (prompt overhead {prompt_overhead})")]
    TokenOverflow {
        /// The model the analysis was planned for.
        model: String,
        /// The configured prompt overhead.
        prompt_overhead: usize,
    },

    // ============== Config File Errors ==============
    /// The config file exists but could not be read.
    #[error("failed to read config file {}", path.display())]
    ConfigIo {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for `BudgetConfig`.
    #[error("failed to parse config file {}", path.display())]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A pricing entry in the config is inconsistent.
    #[error("invalid pricing for model '{model}': {message}")]
    InvalidPricing {
        /// Model the pricing entry belongs to.
        model: String,
        /// Description of the problem.
        message: String,
    },
}

// ============== Constructor Methods ==============

impl BudgetError {
    /// Creates an invalid context window error.
    #[must_use]
    pub fn invalid_context_window(model: impl Into<String>, context_window: usize) -> Self {
        Self::InvalidContextWindow {
            model: model.into(),
            context_window,
        }
    }

    /// Creates an invalid factor error.
    #[must_use]
    pub fn invalid_factor(name: &'static str, value: f64) -> Self {
        Self::InvalidFactor { name, value }
    }

    /// Creates a token overflow error.
    #[must_use]
    pub fn token_overflow(model: impl Into<String>, prompt_overhead: usize) -> Self {
        Self::TokenOverflow {
            model: model.into(),
            prompt_overhead,
        }
    }

    /// Creates a config read error.
    #[must_use]
    pub fn config_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigIo {
            path: path.into(),
            source,
        }
    }

    /// Creates a config parse error.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ConfigParse {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid pricing error.
    #[must_use]
    pub fn invalid_pricing(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPricing {
            model: model.into(),
            message: message.into(),
        }
    }

    // ============== Classification ==============

    /// Returns `true` for errors that reject analysis options before any
    /// chunking is attempted.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidContextWindow { .. }
                | Self::InvalidFactor { .. }
                | Self::TokenOverflow { .. }
        )
    }

    /// Returns `true` for errors raised while loading the config file.
    #[must_use]
    pub fn is_config_file_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigIo { .. } | Self::ConfigParse { .. } | Self::InvalidPricing { .. }
        )
    }
}
