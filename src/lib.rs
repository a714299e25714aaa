//! review-budget - token budgeting for LLM code reviews
//!
//! Estimates how many tokens a set of files will consume, decides whether
//! they fit in a single request to a given model, splits them into ordered
//! passes when they do not, and accounts for the tokens and cost actually
//! spent across a multi-pass review.
//!
//! This library exposes the core types for embedding in a review
//! orchestrator; the `review-budget` binary is a thin diagnostic front end.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod models;
pub mod pricing;
pub mod tokens;
pub mod usage;

// Re-export core types for convenient access
pub use analyzer::{AnalysisOptions, AnalysisResult, FileUnit, TokenAnalyzer};
pub use config::BudgetConfig;
pub use error::{BudgetError, BudgetResult};
pub use models::{ModelProfile, ProfileResolver};
pub use pricing::{PricingCatalog, PricingResolver};
pub use tokens::{HeuristicTokenizer, Tokenizer};
pub use usage::UsageTracker;
