//! Unit tests for config file loading.

use crate::common::TestContext;
use review_budget::config::{BudgetConfig, DEFAULT_MODEL};
use review_budget::error::BudgetError;
use review_budget::models::{Provider, Resolution};
use review_budget::pricing::{Pricing, PricingResolver};

const FULL_CONFIG: &str = r#"
model = "in-house-coder"

[analysis]
prompt_overhead = 2000
safety_margin_factor = 0.2
context_maintenance_factor = 0.25
force_single_pass = true

[[models]]
id = "in-house-coder"
provider = "openrouter"
context_window = 64000
output_limit = 8192

[pricing.in-house-coder]
input_per_million = 0.5
output_per_million = 1.5

[pricing.long-context-model]
input_per_million = 1.0
output_per_million = 4.0
threshold = 100000
above_input_per_million = 2.0
above_output_per_million = 8.0
"#;

#[test]
fn test_missing_file_yields_defaults() {
    let ctx = TestContext::new();
    let config = BudgetConfig::from_file(&ctx.path().join("absent.toml")).unwrap();
    assert_eq!(config, BudgetConfig::default());
    assert_eq!(config.model_id(None), DEFAULT_MODEL);
}

#[test]
fn test_full_config_round_trip_into_components() {
    let ctx = TestContext::new();
    let path = ctx.create_file("review-budget.toml", FULL_CONFIG);
    let config = BudgetConfig::from_file(&path).unwrap();

    let options = config.analysis_options(None);
    assert_eq!(options.model_id, "in-house-coder");
    assert_eq!(options.prompt_overhead, 2_000);
    assert_eq!(options.safety_margin_factor, 0.2);
    assert_eq!(options.context_maintenance_factor, 0.25);
    assert!(options.force_single_pass);

    let resolver = config.profile_resolver();
    let (profile, source) = resolver.resolve_with_source("in-house-coder");
    assert_eq!(source, Resolution::Exact);
    assert_eq!(profile.provider, Provider::OpenRouter);
    assert_eq!(profile.context_window, 64_000);
    // Built-in entries survive the layering.
    assert_eq!(resolver.resolve("gpt-4o").context_window, 128_000);

    let catalog = config.pricing_catalog().unwrap();
    assert_eq!(catalog.estimate_cost("in-house-coder", 1_000_000, 0), Some(0.5));
    assert!(matches!(
        catalog.pricing_for("long-context-model"),
        Some(Pricing::Tiered {
            threshold: 100_000,
            ..
        })
    ));
}

#[test]
fn test_provider_defaults_to_unknown() {
    let config = BudgetConfig::from_toml_str(
        "[[models]]\nid = \"x\"\ncontext_window = 10\noutput_limit = 1\n",
    )
    .unwrap();
    assert_eq!(config.models[0].provider, Provider::Unknown);
}

#[test]
fn test_malformed_file_is_parse_error() {
    let ctx = TestContext::new();
    let path = ctx.create_file("bad.toml", "model = [unterminated");
    let err = BudgetConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, BudgetError::ConfigParse { .. }));
    assert!(err.is_config_file_error());
    assert!(err.to_string().contains("bad.toml"));
}

#[test]
fn test_incomplete_tier_rejected_on_load() {
    let ctx = TestContext::new();
    let path = ctx.create_file(
        "tiers.toml",
        "[pricing.m]\ninput_per_million = 1.0\noutput_per_million = 2.0\nthreshold = 10\n",
    );
    let err = BudgetConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, BudgetError::InvalidPricing { ref model, .. } if model == "m"));
}

#[test]
fn test_directory_path_is_io_error() {
    let ctx = TestContext::new();
    let err = BudgetConfig::from_file(&ctx.path()).unwrap_err();
    assert!(matches!(err, BudgetError::ConfigIo { .. }));
}

#[test]
fn test_default_config_path_file_name() {
    if let Some(path) = BudgetConfig::default_config_path() {
        assert!(path.ends_with("review-budget.toml"));
    }
}
