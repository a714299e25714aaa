//! review-budget - plan the token budget of a code review

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

use review_budget::analyzer::{FileUnit, TokenAnalyzer};
use review_budget::config::BudgetConfig;
use review_budget::pricing::PricingResolver;
use review_budget::tokens::HeuristicTokenizer;

#[derive(Parser, Debug)]
#[command(name = "review-budget")]
#[command(about = "Estimate tokens and plan review passes for a set of files")]
#[command(version)]
struct Args {
    /// Files or directories to analyze.
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Model to plan for (overrides the config file)
    #[arg(short, long, env = "REVIEW_BUDGET_MODEL")]
    model: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Prompt scaffolding tokens per request
    #[arg(long)]
    prompt_overhead: Option<usize>,

    /// Fraction of the window held back from the single-pass decision
    #[arg(long)]
    safety_margin: Option<f64>,

    /// Fraction of the window reserved per chunk for resent context
    #[arg(long)]
    context_maintenance: Option<f64>,

    /// Plan a single pass even if the files do not fit
    #[arg(long)]
    single_pass: bool,

    /// Print the full analysis as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        "review_budget=debug"
    } else {
        "review_budget=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = match &args.config {
        Some(path) => BudgetConfig::from_file(path),
        None => BudgetConfig::load_default(),
    }
    .context("Failed to load configuration")?;

    let mut options = config.analysis_options(args.model.as_deref());
    if let Some(tokens) = args.prompt_overhead {
        options = options.with_prompt_overhead(tokens);
    }
    if let Some(factor) = args.safety_margin {
        options = options.with_safety_margin_factor(factor);
    }
    if let Some(factor) = args.context_maintenance {
        options = options.with_context_maintenance_factor(factor);
    }
    if args.single_pass {
        options = options.with_force_single_pass(true);
    }

    let files = collect_files(&args.paths)?;
    tracing::debug!(files = files.len(), model = %options.model_id, "Collected files");

    let analyzer = TokenAnalyzer::new(HeuristicTokenizer).with_resolver(config.profile_resolver());
    let result = analyzer
        .analyze(&files, &options)
        .context("Analysis rejected the options")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let pricing = config.pricing_catalog()?;
    println!("Model: {} ({:?})", result.model_id, result.resolution);
    println!("{}", result.to_log_string());
    println!("{}", result.chunking_recommendation.reason);
    for chunk in &result.chunking_recommendation.chunks {
        let input_tokens = chunk.estimated_token_count + result.prompt_overhead_tokens;
        let cost = pricing
            .estimate_cost(&result.model_id, input_tokens, 0)
            .map_or_else(|| "n/a".to_string(), |c| format!("${c:.4}"));
        println!(
            "  pass {}: {} files, {} tokens, input cost {}",
            chunk.priority,
            chunk.files.len(),
            chunk.estimated_token_count,
            cost
        );
    }

    Ok(())
}

/// Walks the given paths and reads every UTF-8 file.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<FileUnit>> {
    let mut files = Vec::new();
    for root in paths {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(file) = read_file(root, entry.path())? {
                files.push(file);
            }
        }
    }
    Ok(files)
}

fn read_file(root: &Path, path: &Path) -> Result<Option<FileUnit>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let Ok(content) = String::from_utf8(bytes) else {
        tracing::warn!(path = %path.display(), "Skipping non-UTF-8 file");
        return Ok(None);
    };

    let mut file = FileUnit::new(path.display().to_string(), content);
    if let Ok(relative) = path.strip_prefix(root) {
        if !relative.as_os_str().is_empty() {
            file = file.with_relative_path(relative.display().to_string());
        }
    }
    Ok(Some(file))
}
