//! Property tests for pass planning and pricing.

use crate::common::{resolver_with_window, TEST_MODEL};
use proptest::prelude::*;
use review_budget::analyzer::{reserve_window, AnalysisOptions, FileUnit, TokenAnalyzer};
use review_budget::pricing::{Pricing, Rates};

/// Tokenizer that reads the token count written in the content.
fn declared_tokens(text: &str, _model: &str) -> usize {
    text.parse().unwrap_or(0)
}

type DeclaredTokenizer = fn(&str, &str) -> usize;

fn files_from(sizes: &[usize]) -> Vec<FileUnit> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, size)| FileUnit::new(format!("file{i}.rs"), size.to_string()))
        .collect()
}

fn analyzer(context_window: usize) -> TokenAnalyzer<DeclaredTokenizer> {
    TokenAnalyzer::new(declared_tokens as DeclaredTokenizer)
        .with_resolver(resolver_with_window(context_window))
}

fn options(overhead: usize, safety: f64, maintenance: f64) -> AnalysisOptions {
    AnalysisOptions::new(TEST_MODEL)
        .with_prompt_overhead(overhead)
        .with_safety_margin_factor(safety)
        .with_context_maintenance_factor(maintenance)
}

proptest! {
    #[test]
    fn test_every_file_lands_in_exactly_one_chunk(
        sizes in prop::collection::vec(1usize..3_000, 0..30),
        window in 100usize..10_000,
        overhead in 0usize..500,
        safety in 0.0f64..0.9,
        maintenance in 0.0f64..0.9,
    ) {
        let files = files_from(&sizes);
        let result = analyzer(window)
            .analyze(&files, &options(overhead, safety, maintenance))
            .unwrap();

        let mut placed: Vec<String> = result
            .chunking_recommendation
            .chunks
            .iter()
            .flat_map(|c| c.files.iter().cloned())
            .collect();
        placed.sort();
        let mut expected: Vec<String> = files.iter().map(|f| f.path.clone()).collect();
        expected.sort();
        prop_assert_eq!(placed, expected);
    }

    #[test]
    fn test_chunks_respect_capacity_unless_single_oversized_file(
        sizes in prop::collection::vec(1usize..3_000, 1..30),
        window in 100usize..10_000,
        maintenance in 0.0f64..0.9,
    ) {
        let files = files_from(&sizes);
        let result = analyzer(window)
            .analyze(&files, &options(0, 0.1, maintenance))
            .unwrap();
        let capacity = reserve_window(window, maintenance);

        if result.chunking_recommendation.chunking_recommended {
            prop_assert_eq!(result.effective_chunk_size, Some(capacity));
            for chunk in &result.chunking_recommendation.chunks {
                prop_assert!(
                    chunk.estimated_token_count <= capacity || chunk.files.len() == 1,
                    "chunk {} holds {} tokens over capacity {}",
                    chunk.priority,
                    chunk.estimated_token_count,
                    capacity
                );
            }
        }
    }

    #[test]
    fn test_fitting_submission_is_single_chunk(
        sizes in prop::collection::vec(1usize..200, 0..20),
        window in 5_000usize..10_000,
    ) {
        let files = files_from(&sizes);
        let result = analyzer(window)
            .analyze(&files, &options(100, 0.1, 0.15))
            .unwrap();

        prop_assert!(result.estimated_total_tokens <= result.effective_context_window_size);
        prop_assert!(!result.exceeds_context_window);
        prop_assert_eq!(result.chunking_recommendation.chunks.len(), 1);
        prop_assert_eq!(result.estimated_passes_needed, 1);
    }

    #[test]
    fn test_priorities_are_sequential_and_match_pass_count(
        sizes in prop::collection::vec(1usize..3_000, 0..30),
        window in 100usize..10_000,
    ) {
        let files = files_from(&sizes);
        let result = analyzer(window)
            .analyze(&files, &options(0, 0.1, 0.15))
            .unwrap();

        let priorities: Vec<usize> = result
            .chunking_recommendation
            .chunks
            .iter()
            .map(|c| c.priority)
            .collect();
        let expected: Vec<usize> = (1..=priorities.len()).collect();
        prop_assert_eq!(priorities, expected);
        prop_assert_eq!(
            result.estimated_passes_needed,
            result.chunking_recommendation.chunks.len()
        );
        prop_assert_eq!(
            result.exceeds_context_window,
            result.estimated_total_tokens > result.effective_context_window_size
        );
    }

    #[test]
    fn test_analysis_is_deterministic(
        sizes in prop::collection::vec(1usize..3_000, 0..20),
        window in 100usize..10_000,
    ) {
        let files = files_from(&sizes);
        let analyzer = analyzer(window);
        let opts = options(50, 0.1, 0.15);
        prop_assert_eq!(
            analyzer.analyze(&files, &opts).unwrap(),
            analyzer.analyze(&files, &opts).unwrap()
        );
    }

    #[test]
    fn test_tiered_cost_splits_at_threshold(
        threshold in 1usize..1_000_000,
        extra in 1usize..1_000_000,
        low in 0.0f64..100.0,
        high in 0.0f64..100.0,
    ) {
        let pricing = Pricing::Tiered {
            threshold,
            below: Rates::new(low, 0.0),
            above: Rates::new(high, 0.0),
        };
        let n = threshold + extra;
        let expected = (threshold as f64 * low + extra as f64 * high) / 1e6;
        let cost = pricing.calculate_cost(n, 0);
        prop_assert!((cost - expected).abs() <= 1e-9 * expected.max(1.0));
    }
}
