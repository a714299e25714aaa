//! Model pricing and cost calculation.
//!
//! Prices are expressed per million tokens, separately for input and output.
//! A model is priced either at a [`Pricing::Flat`] rate or on a
//! [`Pricing::Tiered`] schedule where tokens past a threshold within a single
//! request are billed at a higher rate.
//!
//! The usage tracker talks to pricing through the [`PricingResolver`] trait.
//! A resolver returns `None` when it has no data for a model; callers must
//! carry that through instead of treating it as free.
//!
//! # Example
//!
//! ```
//! use review_budget::pricing::{Pricing, PricingCatalog, PricingResolver, Rates};
//!
//! let catalog = PricingCatalog::default()
//!     .with_model_pricing("in-house-model", Pricing::Flat(Rates::new(1.0, 2.0)));
//!
//! let cost = catalog.estimate_cost("in-house-model", 1_000_000, 500_000);
//! assert_eq!(cost, Some(2.0));
//! assert_eq!(catalog.estimate_cost("never-heard-of-it", 10, 10), None);
//! ```

use crate::models::bare_model_name;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

/// Input and output prices in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rates {
    /// Cost per million input tokens in USD.
    pub input_per_million: f64,
    /// Cost per million output tokens in USD.
    pub output_per_million: f64,
}

impl Rates {
    /// Creates new rates.
    #[must_use]
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Calculates the cost for given token counts.
    #[must_use]
    pub fn calculate_cost(&self, input_tokens: usize, output_tokens: usize) -> f64 {
        let input_cost = (input_tokens as f64 / TOKENS_PER_MILLION) * self.input_per_million;
        let output_cost = (output_tokens as f64 / TOKENS_PER_MILLION) * self.output_per_million;
        input_cost + output_cost
    }
}

/// Price schedule for a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Pricing {
    /// Every token is billed at the same rate.
    Flat(Rates),
    /// Up to `threshold` tokens per direction are billed at `below`, the
    /// remainder at `above`. Applied per request, never across a session.
    Tiered {
        /// Token count where the higher rate starts.
        threshold: usize,
        /// Rates for the first `threshold` tokens.
        below: Rates,
        /// Rates for tokens past the threshold.
        above: Rates,
    },
}

impl Pricing {
    /// Calculates the cost of a single request.
    #[must_use]
    pub fn calculate_cost(&self, input_tokens: usize, output_tokens: usize) -> f64 {
        match self {
            Self::Flat(rates) => rates.calculate_cost(input_tokens, output_tokens),
            Self::Tiered {
                threshold,
                below,
                above,
            } => {
                let input_low = input_tokens.min(*threshold);
                let output_low = output_tokens.min(*threshold);
                below.calculate_cost(input_low, output_low)
                    + above.calculate_cost(input_tokens - input_low, output_tokens - output_low)
            }
        }
    }
}

/// Resolves the cost of a request against a model.
///
/// Returns `None` when no pricing data exists for the model.
pub trait PricingResolver {
    /// Estimates the USD cost of sending `input_tokens` and receiving
    /// `output_tokens` from `model_id`.
    fn estimate_cost(&self, model_id: &str, input_tokens: usize, output_tokens: usize)
        -> Option<f64>;
}

impl<F> PricingResolver for F
where
    F: Fn(&str, usize, usize) -> Option<f64>,
{
    fn estimate_cost(
        &self,
        model_id: &str,
        input_tokens: usize,
        output_tokens: usize,
    ) -> Option<f64> {
        self(model_id, input_tokens, output_tokens)
    }
}

/// Default pricing for known models.
fn default_model_pricing() -> HashMap<&'static str, Pricing> {
    let mut pricing = HashMap::new();

    // Claude Opus: $15/1M input, $75/1M output
    pricing.insert("claude-opus-4-1-20250805", Pricing::Flat(Rates::new(15.0, 75.0)));
    pricing.insert("claude-opus-4-20250514", Pricing::Flat(Rates::new(15.0, 75.0)));
    pricing.insert("claude-3-opus-20240229", Pricing::Flat(Rates::new(15.0, 75.0)));

    // Claude Sonnet: $3/1M input, $15/1M output
    pricing.insert("claude-sonnet-4-20250514", Pricing::Flat(Rates::new(3.0, 15.0)));
    pricing.insert("claude-3-7-sonnet-20250219", Pricing::Flat(Rates::new(3.0, 15.0)));
    pricing.insert("claude-3-5-sonnet-20241022", Pricing::Flat(Rates::new(3.0, 15.0)));

    // Claude Haiku
    pricing.insert("claude-3-5-haiku-20241022", Pricing::Flat(Rates::new(0.8, 4.0)));
    pricing.insert("claude-3-haiku-20240307", Pricing::Flat(Rates::new(0.25, 1.25)));

    // OpenAI
    pricing.insert("gpt-4o", Pricing::Flat(Rates::new(2.5, 10.0)));
    pricing.insert("gpt-4o-mini", Pricing::Flat(Rates::new(0.15, 0.6)));
    pricing.insert("gpt-4.1", Pricing::Flat(Rates::new(2.0, 8.0)));
    pricing.insert("gpt-4.1-mini", Pricing::Flat(Rates::new(0.4, 1.6)));
    pricing.insert("o3", Pricing::Flat(Rates::new(2.0, 8.0)));
    pricing.insert("o4-mini", Pricing::Flat(Rates::new(1.1, 4.4)));

    // Gemini Pro models double their rates past the long-context threshold
    pricing.insert(
        "gemini-2.5-pro",
        Pricing::Tiered {
            threshold: 200_000,
            below: Rates::new(1.25, 10.0),
            above: Rates::new(2.5, 15.0),
        },
    );
    pricing.insert(
        "gemini-1.5-pro",
        Pricing::Tiered {
            threshold: 128_000,
            below: Rates::new(1.25, 5.0),
            above: Rates::new(2.5, 10.0),
        },
    );
    pricing.insert(
        "gemini-1.5-flash",
        Pricing::Tiered {
            threshold: 128_000,
            below: Rates::new(0.075, 0.3),
            above: Rates::new(0.15, 0.6),
        },
    );
    pricing.insert("gemini-2.5-flash", Pricing::Flat(Rates::new(0.3, 2.5)));
    pricing.insert("gemini-2.0-flash", Pricing::Flat(Rates::new(0.1, 0.4)));

    pricing
}

static BUILTIN_PRICING: Lazy<HashMap<&'static str, Pricing>> = Lazy::new(default_model_pricing);

/// Pricing catalog backed by the built-in table plus custom overrides.
#[derive(Debug, Clone, Default)]
pub struct PricingCatalog {
    /// Custom model pricing overrides.
    custom_pricing: HashMap<String, Pricing>,
}

impl PricingCatalog {
    /// Creates a catalog with only the built-in prices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets custom pricing for a model, taking precedence over built-ins.
    #[must_use]
    pub fn with_model_pricing(mut self, model: impl Into<String>, pricing: Pricing) -> Self {
        self.set_model_pricing(model, pricing);
        self
    }

    /// Sets custom pricing for a model.
    pub fn set_model_pricing(&mut self, model: impl Into<String>, pricing: Pricing) {
        self.custom_pricing.insert(model.into(), pricing);
    }

    /// Looks up the price schedule for a model.
    ///
    /// Tries the full identifier, then the name without a provider prefix.
    #[must_use]
    pub fn pricing_for(&self, model_id: &str) -> Option<Pricing> {
        let bare = bare_model_name(model_id);
        [model_id, bare].into_iter().find_map(|id| {
            self.custom_pricing
                .get(id)
                .or_else(|| BUILTIN_PRICING.get(id))
                .copied()
        })
    }
}

impl PricingResolver for PricingCatalog {
    fn estimate_cost(
        &self,
        model_id: &str,
        input_tokens: usize,
        output_tokens: usize,
    ) -> Option<f64> {
        self.pricing_for(model_id)
            .map(|pricing| pricing.calculate_cost(input_tokens, output_tokens))
    }
}
