//! Usage report data and its text rendering.
//!
//! The tracker supplies the numbers; output formatting beyond this plain
//! text table is up to the caller, which can serialize [`UsageReport`]
//! directly instead.

use super::{ConsolidatedUsage, PassUsage, TokenStatistics};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Everything needed to render a session's usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    /// Model the session ran against.
    pub model_id: String,
    /// Consolidated totals and per-pass records.
    pub usage: ConsolidatedUsage,
    /// Throughput figures at report time.
    pub statistics: TokenStatistics,
}

impl UsageReport {
    /// Creates a report from its parts.
    #[must_use]
    pub fn new(
        model_id: impl Into<String>,
        usage: ConsolidatedUsage,
        statistics: TokenStatistics,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            usage,
            statistics,
        }
    }
}

/// Formats a count with thousands separators. Example: `1234567` -> `"1,234,567"`.
#[must_use]
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats an optional cost, spelling out missing pricing.
#[must_use]
pub fn format_cost(cost: Option<f64>) -> String {
    match cost {
        Some(cost) => format!("${cost:.4}"),
        None => "n/a".to_string(),
    }
}

fn format_elapsed(ms: u64) -> String {
    humantime::format_duration(Duration::from_millis(ms)).to_string()
}

fn pass_kind(pass: &PassUsage) -> &'static str {
    if pass.is_consolidation {
        "consolidation"
    } else {
        "review"
    }
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let usage = &self.usage;
        let consolidation_passes = usage.passes.iter().filter(|p| p.is_consolidation).count();

        writeln!(f, "Token Usage Report")?;
        writeln!(f, "==================")?;
        writeln!(f, "Model: {}", self.model_id)?;
        writeln!(
            f,
            "Passes: {} ({} consolidation)",
            usage.pass_count, consolidation_passes
        )?;
        writeln!(f, "Input tokens: {}", format_count(usage.total_input_tokens))?;
        writeln!(f, "Output tokens: {}", format_count(usage.total_output_tokens))?;
        writeln!(f, "Total tokens: {}", format_count(usage.total_tokens))?;
        writeln!(
            f,
            "Estimated cost: {}",
            format_cost(usage.total_estimated_cost)
        )?;
        writeln!(f, "Unique files: {}", usage.unique_file_count)?;
        writeln!(
            f,
            "Average tokens per file: {:.1}",
            usage.average_tokens_per_file
        )?;
        writeln!(f, "Elapsed: {}", format_elapsed(usage.total_elapsed_ms))?;
        if usage.unpriced_usage {
            writeln!(
                f,
                "Warning: no pricing data for some usage; cost totals exclude it"
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Per-pass usage")?;
        writeln!(
            f,
            "| Pass | Kind | Files | Input | Output | Total | Cost | Elapsed |"
        )?;
        writeln!(
            f,
            "|------|------|-------|-------|--------|-------|------|---------|"
        )?;
        for pass in &usage.passes {
            writeln!(
                f,
                "| {} | {} | {} | {} | {} | {} | {} | {} |",
                pass.pass_number,
                pass_kind(pass),
                pass.files.len(),
                format_count(pass.input_tokens),
                format_count(pass.output_tokens),
                format_count(pass.total_tokens),
                format_cost(pass.estimated_cost),
                format_elapsed(pass.elapsed_ms),
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Rates")?;
        writeln!(
            f,
            "Current pass ({}): {:.1} tokens/s",
            self.statistics.current_pass, self.statistics.current_token_rate
        )?;
        write!(
            f,
            "Session average: {:.1} tokens/s",
            self.statistics.average_token_rate
        )
    }
}
