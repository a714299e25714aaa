//! Multi-pass token usage tracking.
//!
//! A [`UsageTracker`] lives for one review session. The orchestrator runs
//! passes one at a time and reports each through the tracker:
//!
//! ```text
//! NotStarted -> start_pass -> record_token_usage* -> complete_pass
//! ```
//!
//! Usage only ever accumulates while a pass is open. Tokens recorded before
//! an aborted pass stay in the record, so a cancelled review still reports
//! what it actually spent. After [`UsageTracker::stop`] the tracker is inert:
//! mutation calls log a warning and return a zeroed record instead of
//! failing, since late callbacks can arrive during shutdown.
//!
//! # Example
//!
//! ```
//! use review_budget::pricing::PricingCatalog;
//! use review_budget::tokens::HeuristicTokenizer;
//! use review_budget::usage::UsageTracker;
//!
//! let mut tracker =
//!     UsageTracker::new("claude-sonnet-4-20250514", HeuristicTokenizer, PricingCatalog::new());
//!
//! tracker.start_pass(1, vec!["src/lib.rs".into()], false);
//! tracker.record_token_usage("review this file", "looks good", None);
//! tracker.complete_pass(None);
//!
//! let usage = tracker.stop();
//! assert_eq!(usage.pass_count, 1);
//! assert!(usage.total_estimated_cost.is_some());
//! ```

pub mod report;

pub use report::UsageReport;

use crate::pricing::{PricingCatalog, PricingResolver};
use crate::tokens::{HeuristicTokenizer, Tokenizer};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

/// Token and cost usage of one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassUsage {
    /// 1-based pass number.
    pub pass_number: usize,
    /// Input tokens sent during the pass.
    pub input_tokens: usize,
    /// Output tokens received during the pass.
    pub output_tokens: usize,
    /// `input_tokens + output_tokens`.
    pub total_tokens: usize,
    /// Accumulated cost in USD; `None` until a priced call is recorded.
    pub estimated_cost: Option<f64>,
    /// Wall-clock time from pass start to the latest completion signal.
    pub elapsed_ms: u64,
    /// Files sent in this pass.
    pub files: Vec<String>,
    /// Whether this pass synthesizes earlier passes.
    pub is_consolidation: bool,
}

impl PassUsage {
    /// Creates a zeroed record.
    #[must_use]
    pub fn zeroed(pass_number: usize) -> Self {
        Self {
            pass_number,
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            estimated_cost: None,
            elapsed_ms: 0,
            files: Vec::new(),
            is_consolidation: false,
        }
    }
}

/// Totals across every pass of a session. Computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedUsage {
    /// Every recorded pass, ordered by pass number.
    pub passes: Vec<PassUsage>,
    /// Number of recorded passes.
    pub pass_count: usize,
    /// Sum of input tokens.
    pub total_input_tokens: usize,
    /// Sum of output tokens.
    pub total_output_tokens: usize,
    /// Sum of all tokens.
    pub total_tokens: usize,
    /// Sum of priced pass costs; `None` if no pass was priced.
    pub total_estimated_cost: Option<f64>,
    /// Sum of pass elapsed times.
    pub total_elapsed_ms: u64,
    /// Distinct files across all passes.
    pub unique_file_count: usize,
    /// `total_tokens / unique_file_count`, or 0 with no files.
    pub average_tokens_per_file: f64,
    /// Whether any recorded call had no pricing data.
    pub unpriced_usage: bool,
}

/// Real-time throughput figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatistics {
    /// Pass currently in progress (0 before any pass).
    pub current_pass: usize,
    /// Number of recorded passes.
    pub pass_count: usize,
    /// Tokens recorded in the current pass.
    pub current_pass_tokens: usize,
    /// Tokens recorded across the session.
    pub total_tokens: usize,
    /// Current pass tokens per second.
    pub current_token_rate: f64,
    /// Session tokens per second since the tracker was created.
    pub average_token_rate: f64,
    /// Milliseconds since the tracker was created.
    pub elapsed_ms: u64,
}

/// Tokens per second, or 0 when either side is zero.
#[must_use]
pub fn token_rate(tokens: usize, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if tokens == 0 || seconds <= 0.0 {
        return 0.0;
    }
    tokens as f64 / seconds
}

#[derive(Debug)]
struct PassRecord {
    usage: PassUsage,
    started_at: Instant,
    completed: bool,
    unpriced: bool,
}

impl PassRecord {
    fn open(usage: PassUsage) -> Self {
        Self {
            usage,
            started_at: Instant::now(),
            completed: false,
            unpriced: false,
        }
    }
}

/// Records token usage across the passes of one review session.
#[derive(Debug)]
pub struct UsageTracker<T = HeuristicTokenizer, P = PricingCatalog> {
    /// Model every pass is sent to.
    model_id: String,
    tokenizer: T,
    pricing: P,
    /// Pass records keyed by pass number.
    passes: BTreeMap<usize, PassRecord>,
    current_pass: usize,
    created_at: Instant,
    stopped_at: Option<Instant>,
}

impl<T: Tokenizer, P: PricingResolver> UsageTracker<T, P> {
    /// Creates a tracker for a session against `model_id`.
    #[must_use]
    pub fn new(model_id: impl Into<String>, tokenizer: T, pricing: P) -> Self {
        Self {
            model_id: model_id.into(),
            tokenizer,
            pricing,
            passes: BTreeMap::new(),
            current_pass: 0,
            created_at: Instant::now(),
            stopped_at: None,
        }
    }

    /// Returns the model identifier.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Returns the pass currently in progress (0 before any pass).
    #[must_use]
    pub fn current_pass(&self) -> usize {
        self.current_pass
    }

    /// Returns whether [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped_at.is_some()
    }

    /// Starts pass `pass_number` and makes it current.
    ///
    /// Restarting an existing pass number reopens its record: the clock,
    /// file list and consolidation flag start over, while tokens and cost
    /// already recorded for it are kept.
    pub fn start_pass(
        &mut self,
        pass_number: usize,
        files: Vec<String>,
        is_consolidation: bool,
    ) -> PassUsage {
        if self.reject_if_stopped("start_pass") {
            return PassUsage::zeroed(pass_number);
        }
        if pass_number == 0 {
            tracing::warn!("Pass numbers start at 1, ignoring start_pass(0)");
            return PassUsage::zeroed(0);
        }

        let mut record = PassRecord::open(PassUsage {
            files,
            is_consolidation,
            ..PassUsage::zeroed(pass_number)
        });
        if let Some(previous) = self.passes.remove(&pass_number) {
            tracing::warn!(
                pass = pass_number,
                total_tokens = previous.usage.total_tokens,
                "Restarting pass, keeping recorded usage"
            );
            record.usage.input_tokens = previous.usage.input_tokens;
            record.usage.output_tokens = previous.usage.output_tokens;
            record.usage.total_tokens = previous.usage.total_tokens;
            record.usage.estimated_cost = previous.usage.estimated_cost;
            record.unpriced = previous.unpriced;
        }

        let usage = record.usage.clone();
        tracing::debug!(
            pass = pass_number,
            files = usage.files.len(),
            is_consolidation,
            "Pass started"
        );
        self.passes.insert(pass_number, record);
        self.current_pass = pass_number;
        usage
    }

    /// Starts a consolidation pass after the highest recorded pass.
    ///
    /// `files` names the artifacts of earlier passes being synthesized.
    pub fn start_consolidation_pass(&mut self, files: Vec<String>) -> PassUsage {
        let next = self.passes.keys().next_back().map_or(1, |last| last + 1);
        self.start_pass(next, files, true)
    }

    /// Tokenizes both texts and adds them to a pass.
    ///
    /// `pass_number` defaults to the current pass, or pass 1 before any pass
    /// has started. Any pass may be targeted explicitly, which lets callers
    /// backfill usage for an earlier pass; a pass that was never started is
    /// created with zeroed fields. `Some(0)` is not a pass number and is
    /// ignored with a warning.
    pub fn record_token_usage(
        &mut self,
        input_text: &str,
        output_text: &str,
        pass_number: Option<usize>,
    ) -> PassUsage {
        if self.reject_if_stopped("record_token_usage") {
            return PassUsage::zeroed(pass_number.unwrap_or(self.current_pass));
        }
        let input_tokens = self.tokenizer.count_tokens(input_text, &self.model_id);
        let output_tokens = self.tokenizer.count_tokens(output_text, &self.model_id);
        self.record_token_counts(input_tokens, output_tokens, pass_number)
    }

    /// Adds already-known token counts to a pass.
    ///
    /// Same targeting rules as [`record_token_usage`](Self::record_token_usage).
    pub fn record_token_counts(
        &mut self,
        input_tokens: usize,
        output_tokens: usize,
        pass_number: Option<usize>,
    ) -> PassUsage {
        if self.reject_if_stopped("record_token_counts") {
            return PassUsage::zeroed(pass_number.unwrap_or(self.current_pass));
        }

        let target = match pass_number {
            Some(0) => {
                tracing::warn!("Pass numbers start at 1, ignoring usage recorded for pass 0");
                return PassUsage::zeroed(0);
            }
            Some(n) => n,
            None => self.current_pass.max(1),
        };
        if self.current_pass == 0 {
            self.current_pass = target;
        }

        let cost = self
            .pricing
            .estimate_cost(&self.model_id, input_tokens, output_tokens);

        let record = self.passes.entry(target).or_insert_with(|| {
            tracing::warn!(pass = target, "Recording usage for a pass that was never started");
            PassRecord::open(PassUsage::zeroed(target))
        });

        let usage = &mut record.usage;
        usage.input_tokens = usage.input_tokens.saturating_add(input_tokens);
        usage.output_tokens = usage.output_tokens.saturating_add(output_tokens);
        usage.total_tokens = usage.input_tokens.saturating_add(usage.output_tokens);
        match cost {
            Some(delta) => {
                usage.estimated_cost = Some(usage.estimated_cost.unwrap_or(0.0) + delta);
            }
            None => {
                if !record.unpriced {
                    tracing::warn!(
                        model = %self.model_id,
                        pass = target,
                        "No pricing data for model, cost not recorded"
                    );
                }
                record.unpriced = true;
            }
        }

        record.usage.clone()
    }

    /// Stamps the elapsed time of a pass, defaulting to the current one.
    ///
    /// May be called more than once; each call re-measures from pass start.
    pub fn complete_pass(&mut self, pass_number: Option<usize>) -> PassUsage {
        let target = pass_number.unwrap_or(self.current_pass);
        if self.reject_if_stopped("complete_pass") {
            return PassUsage::zeroed(target);
        }

        let Some(record) = self.passes.get_mut(&target) else {
            tracing::warn!(pass = target, "Cannot complete a pass that was never started");
            return PassUsage::zeroed(target);
        };

        record.usage.elapsed_ms = duration_ms(record.started_at.elapsed());
        record.completed = true;
        tracing::debug!(
            pass = target,
            total_tokens = record.usage.total_tokens,
            elapsed_ms = record.usage.elapsed_ms,
            "Pass completed"
        );
        record.usage.clone()
    }

    /// Returns the stored record for a pass.
    #[must_use]
    pub fn pass_token_usage(&self, pass_number: usize) -> Option<&PassUsage> {
        self.passes.get(&pass_number).map(|r| &r.usage)
    }

    /// Sums every recorded pass.
    #[must_use]
    pub fn consolidated_token_usage(&self) -> ConsolidatedUsage {
        let passes: Vec<PassUsage> = self.passes.values().map(|r| r.usage.clone()).collect();

        let total_input_tokens = passes.iter().map(|p| p.input_tokens).sum();
        let total_output_tokens = passes.iter().map(|p| p.output_tokens).sum();
        let total_tokens: usize = passes.iter().map(|p| p.total_tokens).sum();
        let total_estimated_cost = passes
            .iter()
            .filter_map(|p| p.estimated_cost)
            .fold(None, |acc: Option<f64>, cost| Some(acc.unwrap_or(0.0) + cost));
        let total_elapsed_ms = passes.iter().map(|p| p.elapsed_ms).sum();

        let unique_file_count = passes
            .iter()
            .flat_map(|p| p.files.iter())
            .collect::<HashSet<_>>()
            .len();
        let average_tokens_per_file = if unique_file_count == 0 {
            0.0
        } else {
            total_tokens as f64 / unique_file_count as f64
        };

        ConsolidatedUsage {
            pass_count: passes.len(),
            passes,
            total_input_tokens,
            total_output_tokens,
            total_tokens,
            total_estimated_cost,
            total_elapsed_ms,
            unique_file_count,
            average_tokens_per_file,
            unpriced_usage: self.passes.values().any(|r| r.unpriced),
        }
    }

    /// Derives current and session-wide token rates.
    #[must_use]
    pub fn token_statistics(&self) -> TokenStatistics {
        let now = self.stopped_at.unwrap_or_else(Instant::now);
        let session_elapsed = now.saturating_duration_since(self.created_at);
        let total_tokens = self.passes.values().map(|r| r.usage.total_tokens).sum();

        let (current_pass_tokens, current_elapsed) = match self.passes.get(&self.current_pass) {
            Some(record) if record.completed => (
                record.usage.total_tokens,
                Duration::from_millis(record.usage.elapsed_ms),
            ),
            Some(record) => (
                record.usage.total_tokens,
                now.saturating_duration_since(record.started_at),
            ),
            None => (0, Duration::ZERO),
        };

        TokenStatistics {
            current_pass: self.current_pass,
            pass_count: self.passes.len(),
            current_pass_tokens,
            total_tokens,
            current_token_rate: token_rate(current_pass_tokens, current_elapsed),
            average_token_rate: token_rate(total_tokens, session_elapsed),
            elapsed_ms: duration_ms(session_elapsed),
        }
    }

    /// Collects the report data for the session.
    #[must_use]
    pub fn usage_report(&self) -> UsageReport {
        UsageReport::new(
            self.model_id.clone(),
            self.consolidated_token_usage(),
            self.token_statistics(),
        )
    }

    /// Renders the session's usage report as text.
    #[must_use]
    pub fn generate_token_usage_report(&self) -> String {
        self.usage_report().to_string()
    }

    /// Freezes the tracker and returns the final totals.
    ///
    /// Later calls return the same totals.
    pub fn stop(&mut self) -> ConsolidatedUsage {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(Instant::now());
            tracing::debug!(passes = self.passes.len(), "Usage tracker stopped");
        }
        self.consolidated_token_usage()
    }

    fn reject_if_stopped(&self, operation: &'static str) -> bool {
        if self.is_stopped() {
            tracing::warn!(operation, "Usage tracker already stopped, ignoring call");
            return true;
        }
        false
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
