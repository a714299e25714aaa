//! Unit tests for multi-pass usage tracking.

use crate::common::{word_tokens, FnTokenizer};
use review_budget::pricing::{Pricing, PricingCatalog, Rates};
use review_budget::usage::{PassUsage, UsageTracker};
use tracing_test::traced_test;

const PRICED_MODEL: &str = "priced-model";

/// $1 per million input, $2 per million output.
fn catalog() -> PricingCatalog {
    PricingCatalog::new().with_model_pricing(PRICED_MODEL, Pricing::Flat(Rates::new(1.0, 2.0)))
}

fn tracker() -> UsageTracker<FnTokenizer, PricingCatalog> {
    UsageTracker::new(PRICED_MODEL, word_tokens as FnTokenizer, catalog())
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

// =============================================================================
// Pass lifecycle
// =============================================================================

#[test]
fn test_pass_lifecycle() {
    let mut t = tracker();
    let started = t.start_pass(1, vec!["a.rs".into(), "b.rs".into()], false);
    assert_eq!(started.total_tokens, 0);
    assert_eq!(started.estimated_cost, None);

    t.record_token_counts(1_000, 200, None);
    let completed = t.complete_pass(None);

    assert_eq!(completed.pass_number, 1);
    assert_eq!(completed.input_tokens, 1_000);
    assert_eq!(completed.output_tokens, 200);
    assert_eq!(completed.total_tokens, 1_200);
    assert!(approx_eq(completed.estimated_cost.unwrap(), 0.0014));
    assert_eq!(t.pass_token_usage(1), Some(&completed));
}

#[test]
fn test_complete_pass_is_repeatable() {
    let mut t = tracker();
    t.start_pass(1, vec![], false);
    t.record_token_counts(10, 10, None);
    let first = t.complete_pass(None);
    let second = t.complete_pass(Some(1));
    assert_eq!(first.total_tokens, second.total_tokens);
    assert!(second.elapsed_ms >= first.elapsed_ms);
}

#[test]
#[traced_test]
fn test_restart_keeps_recorded_spend() {
    let mut t = tracker();
    t.start_pass(1, vec!["a.rs".into()], false);
    t.record_token_counts(1_000_000, 0, None);
    t.complete_pass(None);

    let restarted = t.start_pass(1, vec!["b.rs".into()], false);
    assert_eq!(restarted.input_tokens, 1_000_000);
    assert_eq!(restarted.files, vec!["b.rs"]);
    assert_eq!(restarted.elapsed_ms, 0);
    assert!(logs_contain("Restarting pass"));

    t.record_token_counts(0, 500_000, None);
    let usage = t.consolidated_token_usage();
    assert_eq!(usage.pass_count, 1);
    assert_eq!(usage.total_input_tokens, 1_000_000);
    assert_eq!(usage.total_output_tokens, 500_000);
    assert!(approx_eq(usage.total_estimated_cost.unwrap(), 2.0));
}

#[test]
fn test_restart_keeps_unpriced_flag() {
    let mut t = UsageTracker::new("unpriced-model", word_tokens as FnTokenizer, catalog());
    t.start_pass(1, vec![], false);
    t.record_token_counts(10, 10, None);
    t.start_pass(1, vec![], false);

    let usage = t.consolidated_token_usage();
    assert!(usage.unpriced_usage);
    assert_eq!(usage.total_tokens, 20);
}

// =============================================================================
// Explicit pass targeting
// =============================================================================

#[test]
fn test_record_into_earlier_pass() {
    let mut t = tracker();
    t.start_pass(1, vec![], false);
    t.start_pass(2, vec![], false);
    t.record_token_usage("late reply for pass one", "ok", Some(1));

    assert_eq!(t.current_pass(), 2);
    assert_eq!(t.pass_token_usage(1).unwrap().input_tokens, 5);
    assert_eq!(t.pass_token_usage(2).unwrap().total_tokens, 0);
}

#[test]
#[traced_test]
fn test_record_into_unstarted_pass_creates_it() {
    let mut t = tracker();
    let usage = t.record_token_counts(7, 3, Some(4));
    assert_eq!(usage.pass_number, 4);
    assert_eq!(usage.total_tokens, 10);
    assert!(usage.files.is_empty());
    assert!(!usage.is_consolidation);
    assert_eq!(t.consolidated_token_usage().pass_count, 1);
    assert!(logs_contain("never started"));
}

#[test]
#[traced_test]
fn test_record_into_pass_zero_is_ignored() {
    let mut t = tracker();
    let usage = t.record_token_counts(100, 100, Some(0));

    assert_eq!(usage, PassUsage::zeroed(0));
    assert_eq!(t.current_pass(), 0);
    assert_eq!(t.consolidated_token_usage().pass_count, 0);
    assert!(logs_contain("ignoring usage recorded for pass 0"));

    t.start_pass(1, vec![], false);
    t.record_token_usage("one two", "three", Some(0));
    assert_eq!(t.pass_token_usage(1).unwrap().total_tokens, 0);
}

#[test]
fn test_untargeted_usage_before_any_pass_goes_to_pass_one() {
    let mut t = tracker();
    let usage = t.record_token_counts(5, 5, None);
    assert_eq!(usage.pass_number, 1);
    assert_eq!(t.current_pass(), 1);
}

#[test]
fn test_consolidation_follows_highest_pass() {
    let mut t = tracker();
    t.start_pass(1, vec!["a.rs".into()], false);
    t.start_pass(3, vec!["b.rs".into()], false);
    let usage = t.start_consolidation_pass(vec!["pass-1.md".into(), "pass-3.md".into()]);
    assert_eq!(usage.pass_number, 4);
    assert!(usage.is_consolidation);
    assert_eq!(t.current_pass(), 4);
}

#[test]
fn test_consolidation_on_empty_tracker_is_pass_one() {
    let mut t = tracker();
    assert_eq!(t.start_consolidation_pass(vec![]).pass_number, 1);
}

// =============================================================================
// Pricing
// =============================================================================

#[test]
#[traced_test]
fn test_unpriced_model_keeps_cost_absent() {
    let mut t = UsageTracker::new("mystery-llm", word_tokens as FnTokenizer, PricingCatalog::new());
    t.start_pass(1, vec![], false);
    t.record_token_counts(100, 100, None);
    t.record_token_counts(100, 100, None);

    let usage = t.consolidated_token_usage();
    assert_eq!(usage.total_tokens, 400);
    assert_eq!(usage.total_estimated_cost, None);
    assert!(usage.unpriced_usage);
    assert!(logs_contain("No pricing data"));

    let report = t.generate_token_usage_report();
    assert!(report.contains("Estimated cost: n/a"));
    assert!(report.contains("Warning: no pricing data"));
}

#[test]
fn test_closure_pricing_resolver() {
    let pricing = |_: &str, input: usize, output: usize| Some((input + output) as f64);
    let mut t = UsageTracker::new("any", word_tokens as FnTokenizer, pricing);
    t.record_token_counts(2, 3, None);
    t.record_token_counts(1, 0, None);
    assert_eq!(t.consolidated_token_usage().total_estimated_cost, Some(6.0));
}

// =============================================================================
// Consolidation and statistics
// =============================================================================

#[test]
fn test_unique_files_across_passes() {
    let mut t = tracker();
    t.start_pass(1, vec!["a.rs".into(), "b.rs".into()], false);
    t.record_token_counts(300, 0, None);
    t.start_pass(2, vec!["b.rs".into(), "c.rs".into()], false);
    t.record_token_counts(300, 0, None);

    let usage = t.consolidated_token_usage();
    assert_eq!(usage.pass_count, 2);
    assert_eq!(usage.unique_file_count, 3);
    assert_eq!(usage.average_tokens_per_file, 200.0);
}

#[test]
fn test_statistics_are_finite() {
    let mut t = tracker();
    t.start_pass(1, vec![], false);
    let stats = t.token_statistics();
    assert_eq!(stats.current_pass_tokens, 0);
    assert_eq!(stats.current_token_rate, 0.0);
    assert!(stats.average_token_rate.is_finite());

    t.record_token_counts(1_000, 0, None);
    let stats = t.token_statistics();
    assert_eq!(stats.total_tokens, 1_000);
    assert!(stats.current_token_rate.is_finite());
    assert!(stats.current_token_rate >= 0.0);
}

// =============================================================================
// Stop
// =============================================================================

#[test]
#[traced_test]
fn test_stop_makes_tracker_inert() {
    let mut t = tracker();
    t.start_pass(1, vec!["a.rs".into()], false);
    t.record_token_counts(100, 50, None);
    t.complete_pass(None);
    let final_usage = t.stop();

    assert_eq!(t.start_pass(2, vec![], false), PassUsage::zeroed(2));
    assert_eq!(t.record_token_usage("late", "callback", None), PassUsage::zeroed(1));
    assert_eq!(t.record_token_counts(9, 9, Some(1)), PassUsage::zeroed(1));
    assert_eq!(t.complete_pass(None), PassUsage::zeroed(1));

    assert!(t.is_stopped());
    assert_eq!(t.consolidated_token_usage(), final_usage);
    assert_eq!(t.stop(), final_usage);
    assert!(logs_contain("Usage tracker already stopped"));
}

#[test]
fn test_statistics_freeze_after_stop() {
    let mut t = tracker();
    t.record_token_counts(100, 0, None);
    t.stop();
    let first = t.token_statistics();
    std::thread::sleep(std::time::Duration::from_millis(5));
    assert_eq!(t.token_statistics(), first);
}
