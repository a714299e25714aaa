//! Token analysis and pass planning.
//!
//! [`TokenAnalyzer::analyze`] answers two questions about a submission: how
//! many tokens it will consume, and, if it does not fit in one request, how
//! it should be split into an ordered sequence of passes.
//!
//! Two independent reserves are held back from the model's context window:
//!
//! - the **safety margin** decides whether the whole submission fits in a
//!   single pass (`floor(window * (1 - safety_margin_factor))`);
//! - the **context maintenance** reserve sizes each chunk when splitting
//!   (`floor(window * (1 - context_maintenance_factor))`), since every pass
//!   of a multi-pass review resends accumulated context.
//!
//! Analysis is pure: given the same files, options, and tokenizer it always
//! yields the same plan.
//!
//! # Example
//!
//! ```
//! use review_budget::analyzer::{AnalysisOptions, FileUnit, TokenAnalyzer};
//! use review_budget::tokens::HeuristicTokenizer;
//!
//! let analyzer = TokenAnalyzer::new(HeuristicTokenizer);
//! let files = vec![FileUnit::new("src/lib.rs", "pub fn answer() -> u32 { 42 }")];
//!
//! let result = analyzer
//!     .analyze(&files, &AnalysisOptions::new("claude-sonnet-4-20250514"))
//!     .unwrap();
//! assert!(!result.exceeds_context_window);
//! assert_eq!(result.estimated_passes_needed, 1);
//! ```

pub mod chunking;

pub use chunking::{pack_chunks, single_chunk, ChunkingRecommendation, FileChunk};

use crate::error::{BudgetError, BudgetResult};
use crate::models::{ProfileResolver, Resolution};
use crate::tokens::{HeuristicTokenizer, Tokenizer};
use serde::{Deserialize, Serialize};

/// Default prompt scaffolding added on top of file tokens.
pub const DEFAULT_PROMPT_OVERHEAD: usize = 1_500;

/// Default per-chunk reserve for resent context.
pub const DEFAULT_CONTEXT_MAINTENANCE_FACTOR: f64 = 0.15;

/// Default single-pass safety reserve.
pub const DEFAULT_SAFETY_MARGIN_FACTOR: f64 = 0.1;

/// A file submitted for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUnit {
    /// Path identifying the file.
    pub path: String,
    /// Path relative to the review root, if known.
    pub relative_path: Option<String>,
    /// Raw text content.
    pub content: String,
}

impl FileUnit {
    /// Creates a file unit without a relative path.
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            relative_path: None,
            content: content.into(),
        }
    }

    /// Sets the relative path.
    #[must_use]
    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }
}

/// Token measurements for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizedFile {
    /// Path identifying the file.
    pub path: String,
    /// Path relative to the review root, if known.
    pub relative_path: Option<String>,
    /// Tokens the file consumes.
    pub token_count: usize,
    /// Content length in bytes.
    pub size_in_bytes: usize,
    /// `token_count / size_in_bytes`, or 0 for empty files.
    pub tokens_per_byte: f64,
}

/// Options controlling an analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    /// Model the submission is planned for.
    pub model_id: String,
    /// Tokens of prompt scaffolding added once per request.
    pub prompt_overhead: usize,
    /// Fraction of the window reserved per chunk for resent context.
    pub context_maintenance_factor: f64,
    /// Fraction of the window held back from the single-pass decision.
    pub safety_margin_factor: f64,
    /// Plan a single pass even if the submission does not fit.
    pub force_single_pass: bool,
}

impl AnalysisOptions {
    /// Creates options with defaults for everything but the model.
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            prompt_overhead: DEFAULT_PROMPT_OVERHEAD,
            context_maintenance_factor: DEFAULT_CONTEXT_MAINTENANCE_FACTOR,
            safety_margin_factor: DEFAULT_SAFETY_MARGIN_FACTOR,
            force_single_pass: false,
        }
    }

    /// Sets the prompt overhead.
    #[must_use]
    pub fn with_prompt_overhead(mut self, tokens: usize) -> Self {
        self.prompt_overhead = tokens;
        self
    }

    /// Sets the context maintenance factor.
    #[must_use]
    pub fn with_context_maintenance_factor(mut self, factor: f64) -> Self {
        self.context_maintenance_factor = factor;
        self
    }

    /// Sets the safety margin factor.
    #[must_use]
    pub fn with_safety_margin_factor(mut self, factor: f64) -> Self {
        self.safety_margin_factor = factor;
        self
    }

    /// Forces a single pass.
    #[must_use]
    pub fn with_force_single_pass(mut self, force: bool) -> Self {
        self.force_single_pass = force;
        self
    }

    /// Validates the reserve factors.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::InvalidFactor`] if a factor is negative, not
    /// finite, or `>= 1.0`.
    pub fn validate(&self) -> BudgetResult<()> {
        check_factor("safety_margin_factor", self.safety_margin_factor)?;
        check_factor(
            "context_maintenance_factor",
            self.context_maintenance_factor,
        )?;
        Ok(())
    }
}

fn check_factor(name: &'static str, value: f64) -> BudgetResult<()> {
    if !value.is_finite() || !(0.0..1.0).contains(&value) {
        return Err(BudgetError::invalid_factor(name, value));
    }
    Ok(())
}

/// `floor(window * (1 - factor))`.
#[must_use]
pub fn reserve_window(context_window: usize, factor: f64) -> usize {
    (context_window as f64 * (1.0 - factor)).floor() as usize
}

/// Everything known about a submission after analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Model the plan was computed for.
    pub model_id: String,
    /// Which resolution layer produced the context window.
    pub resolution: Resolution,
    /// Per-file measurements, in input order.
    pub files: Vec<TokenizedFile>,
    /// Sum of all file token counts.
    pub total_tokens: usize,
    /// Sum of all file sizes.
    pub total_size_in_bytes: usize,
    /// `total_tokens / total_size_in_bytes`, or 0 when there is no content.
    pub average_tokens_per_byte: f64,
    /// Number of files analyzed.
    pub file_count: usize,
    /// Prompt scaffolding tokens.
    pub prompt_overhead_tokens: usize,
    /// `total_tokens + prompt_overhead_tokens`.
    pub estimated_total_tokens: usize,
    /// Raw context window of the model.
    pub context_window_size: usize,
    /// Output limit of the model.
    pub output_limit: usize,
    /// Window left after the safety margin.
    pub effective_context_window_size: usize,
    /// Per-chunk capacity, set only when chunking was performed.
    pub effective_chunk_size: Option<usize>,
    /// `estimated_total_tokens > effective_context_window_size`.
    pub exceeds_context_window: bool,
    /// Number of chunks in the recommendation.
    pub estimated_passes_needed: usize,
    /// The pass plan.
    pub chunking_recommendation: ChunkingRecommendation,
}

impl AnalysisResult {
    /// Format as a short log-friendly string.
    #[must_use]
    pub fn to_log_string(&self) -> String {
        format!(
            "{} files, ~{} tokens ({} with overhead) of {} effective, {} pass(es)",
            self.file_count,
            self.total_tokens,
            self.estimated_total_tokens,
            self.effective_context_window_size,
            self.estimated_passes_needed,
        )
    }
}

/// Computes token totals and pass plans.
#[derive(Debug, Clone)]
pub struct TokenAnalyzer<T = HeuristicTokenizer> {
    resolver: ProfileResolver,
    tokenizer: T,
}

impl Default for TokenAnalyzer<HeuristicTokenizer> {
    fn default() -> Self {
        Self::new(HeuristicTokenizer)
    }
}

impl<T: Tokenizer> TokenAnalyzer<T> {
    /// Creates an analyzer with the built-in model profiles.
    #[must_use]
    pub fn new(tokenizer: T) -> Self {
        Self {
            resolver: ProfileResolver::default(),
            tokenizer,
        }
    }

    /// Replaces the profile resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ProfileResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Returns the profile resolver.
    #[must_use]
    pub fn resolver(&self) -> &ProfileResolver {
        &self.resolver
    }

    /// Analyzes a submission and recommends a pass plan.
    ///
    /// # Errors
    ///
    /// Fails fast, before any chunking, if a reserve factor is out of range
    /// or the model's context window leaves no usable room. Token totals
    /// that overflow `usize` are rejected the same way. Degraded inputs
    /// (unknown model, oversized files, zero token counts) never fail; they
    /// are reported in [`ChunkingRecommendation::warnings`].
    pub fn analyze(
        &self,
        files: &[FileUnit],
        options: &AnalysisOptions,
    ) -> BudgetResult<AnalysisResult> {
        options.validate()?;

        let (profile, resolution) = self.resolver.resolve_with_source(&options.model_id);
        let context_window = profile.context_window;
        let effective_context_window_size =
            reserve_window(context_window, options.safety_margin_factor);
        let chunk_capacity = reserve_window(context_window, options.context_maintenance_factor);
        if effective_context_window_size == 0 || chunk_capacity == 0 {
            return Err(BudgetError::invalid_context_window(
                &options.model_id,
                context_window,
            ));
        }

        let mut warnings = Vec::new();
        if resolution == Resolution::Fallback {
            warnings.push(format!(
                "Model '{}' is not recognized; assuming a {} token context window",
                options.model_id, context_window
            ));
        }

        let tokenized: Vec<TokenizedFile> = files
            .iter()
            .map(|file| self.tokenize_file(file, &options.model_id, &mut warnings))
            .collect();

        let estimated_total_tokens = tokenized
            .iter()
            .try_fold(options.prompt_overhead, |acc, f| acc.checked_add(f.token_count))
            .ok_or_else(|| {
                BudgetError::token_overflow(&options.model_id, options.prompt_overhead)
            })?;
        let total_tokens = estimated_total_tokens - options.prompt_overhead;
        let total_size_in_bytes: usize = tokenized.iter().map(|f| f.size_in_bytes).sum();
        let exceeds_context_window = estimated_total_tokens > effective_context_window_size;

        let (chunking_recommended, chunks, summary, effective_chunk_size) =
            if options.force_single_pass || !exceeds_context_window {
                let summary = if exceeds_context_window {
                    tracing::warn!(
                        estimated_total_tokens,
                        effective_context_window_size,
                        "Single pass forced although content exceeds the context window"
                    );
                    warnings.push(format!(
                        "Single pass forced: {estimated_total_tokens} estimated tokens exceed \
                         the effective context window of {effective_context_window_size}; \
                         the model may reject the request"
                    ));
                    "Single-pass review forced by configuration".to_string()
                } else if options.force_single_pass {
                    "Single-pass review forced by configuration".to_string()
                } else {
                    format!(
                        "Content fits within the context window \
                         ({estimated_total_tokens} of {effective_context_window_size} tokens)"
                    )
                };
                (false, vec![single_chunk(&tokenized)], summary, None)
            } else {
                let packed = pack_chunks(&tokenized, chunk_capacity);
                for file in &packed.oversized {
                    warnings.push(format!(
                        "File {} ({} tokens) exceeds the chunk capacity of {} tokens \
                         and was placed alone; the model may reject it",
                        file.path, file.token_count, chunk_capacity
                    ));
                }
                let summary = format!(
                    "Content exceeds the context window ({estimated_total_tokens} > \
                     {effective_context_window_size} tokens); split into {} chunks of at \
                     most {chunk_capacity} tokens",
                    packed.chunks.len()
                );
                (true, packed.chunks, summary, Some(chunk_capacity))
            };

        let reason = if warnings.is_empty() {
            summary
        } else {
            format!("{summary}. Warnings: {}", warnings.join("; "))
        };

        let result = AnalysisResult {
            model_id: options.model_id.clone(),
            resolution,
            file_count: tokenized.len(),
            files: tokenized,
            total_tokens,
            total_size_in_bytes,
            average_tokens_per_byte: ratio(total_tokens, total_size_in_bytes),
            prompt_overhead_tokens: options.prompt_overhead,
            estimated_total_tokens,
            context_window_size: context_window,
            output_limit: profile.output_limit,
            effective_context_window_size,
            effective_chunk_size,
            exceeds_context_window,
            estimated_passes_needed: chunks.len(),
            chunking_recommendation: ChunkingRecommendation {
                chunking_recommended,
                chunks,
                reason,
                warnings,
            },
        };

        tracing::debug!(
            model = %options.model_id,
            plan = %result.to_log_string(),
            "Analysis complete"
        );
        Ok(result)
    }

    fn tokenize_file(
        &self,
        file: &FileUnit,
        model_id: &str,
        warnings: &mut Vec<String>,
    ) -> TokenizedFile {
        let size_in_bytes = file.content.len();
        let mut token_count = self.tokenizer.count_tokens(&file.content, model_id);

        if token_count == 0 && !file.content.is_empty() {
            token_count = HeuristicTokenizer::estimate(&file.content);
            tracing::warn!(
                path = %file.path,
                fallback_tokens = token_count,
                "Tokenizer returned 0 tokens for non-empty content"
            );
            warnings.push(format!(
                "Tokenizer returned 0 tokens for {}; using a heuristic estimate of {} tokens",
                file.path, token_count
            ));
        }

        TokenizedFile {
            path: file.path.clone(),
            relative_path: file.relative_path.clone(),
            token_count,
            size_in_bytes,
            tokens_per_byte: ratio(token_count, size_in_bytes),
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
