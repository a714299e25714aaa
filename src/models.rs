//! Model context profile resolution.
//!
//! Maps a model identifier to the context window and output limit used for
//! budgeting. Resolution never fails; it walks three layers and stops at the
//! first hit:
//!
//! 1. **Exact** match against the registry of known model identifiers.
//! 2. **Family** match against an ordered list of naming-convention rules
//!    (e.g. every `gemini-*` model shares a published window).
//! 3. **Fallback** to a global default, logged as a warning.
//!
//! The built-in tables are constructed once on first use and never mutated.
//! Tests and config files supply alternate tables through
//! [`ProfileResolver::new`] and [`ProfileResolver::with_known_model`].
//!
//! # Example
//!
//! ```
//! use review_budget::models::{ProfileResolver, Provider, Resolution};
//!
//! let resolver = ProfileResolver::default();
//!
//! let (profile, source) = resolver.resolve_with_source("gemini-2.5-pro");
//! assert_eq!(source, Resolution::Exact);
//! assert_eq!(profile.provider, Provider::Google);
//!
//! // Unknown Claude releases still resolve through the family rule.
//! let (_, source) = resolver.resolve_with_source("anthropic/claude-next-preview");
//! assert!(matches!(source, Resolution::Family(_)));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Context window used when nothing else matches.
pub const DEFAULT_CONTEXT_WINDOW: usize = 100_000;

/// Output limit used when nothing else matches.
pub const DEFAULT_OUTPUT_LIMIT: usize = 4_096;

/// Model provider families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Anthropic Claude models.
    Anthropic,
    /// OpenAI GPT and o-series models.
    OpenAI,
    /// Google Gemini models.
    Google,
    /// Models routed through OpenRouter.
    OpenRouter,
    /// Provider could not be determined.
    Unknown,
}

/// Token capacity of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelProfile {
    /// The provider family.
    pub provider: Provider,
    /// Maximum tokens accepted in one request (input + output).
    pub context_window: usize,
    /// Maximum tokens the model produces in one response.
    pub output_limit: usize,
}

impl ModelProfile {
    /// Creates a new model profile.
    #[must_use]
    pub const fn new(provider: Provider, context_window: usize, output_limit: usize) -> Self {
        Self {
            provider,
            context_window,
            output_limit,
        }
    }

    /// The global fallback profile.
    #[must_use]
    pub const fn fallback() -> Self {
        Self::new(Provider::Unknown, DEFAULT_CONTEXT_WINDOW, DEFAULT_OUTPUT_LIMIT)
    }
}

/// Which resolution layer produced a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "rule", rename_all = "lowercase")]
pub enum Resolution {
    /// Exact registry hit.
    Exact,
    /// Matched the named family rule.
    Family(String),
    /// No match; the global default was used.
    Fallback,
}

/// How a family rule recognizes a model name.
#[derive(Debug, Clone)]
pub enum FamilyMatcher {
    /// Bare name starts with the given lowercase prefix.
    Prefix(String),
    /// Bare name contains the given lowercase fragment.
    Contains(String),
    /// Bare name matches the regular expression.
    Pattern(Regex),
}

impl FamilyMatcher {
    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Prefix(prefix) => name.starts_with(prefix.as_str()),
            Self::Contains(fragment) => name.contains(fragment.as_str()),
            Self::Pattern(regex) => regex.is_match(name),
        }
    }
}

/// A naming-convention rule yielding a family-level default profile.
#[derive(Debug, Clone)]
pub struct FamilyRule {
    /// Rule name, reported in [`Resolution::Family`].
    pub name: String,
    /// How the rule recognizes a model.
    pub matcher: FamilyMatcher,
    /// Profile shared by every model in the family.
    pub profile: ModelProfile,
}

impl FamilyRule {
    /// Creates a new family rule.
    #[must_use]
    pub fn new(name: impl Into<String>, matcher: FamilyMatcher, profile: ModelProfile) -> Self {
        Self {
            name: name.into(),
            matcher,
            profile,
        }
    }
}

const CLAUDE_WINDOW: usize = 200_000;
const GEMINI_WINDOW: usize = 1_048_576;
const GPT41_WINDOW: usize = 1_047_576;

/// Known model identifiers with published limits.
const KNOWN_MODELS: &[(&str, ModelProfile)] = &[
    // Anthropic
    ("claude-opus-4-1-20250805", ModelProfile::new(Provider::Anthropic, CLAUDE_WINDOW, 32_000)),
    ("claude-opus-4-20250514", ModelProfile::new(Provider::Anthropic, CLAUDE_WINDOW, 32_000)),
    ("claude-sonnet-4-20250514", ModelProfile::new(Provider::Anthropic, CLAUDE_WINDOW, 64_000)),
    ("claude-3-7-sonnet-20250219", ModelProfile::new(Provider::Anthropic, CLAUDE_WINDOW, 64_000)),
    ("claude-3-5-sonnet-20241022", ModelProfile::new(Provider::Anthropic, CLAUDE_WINDOW, 8_192)),
    ("claude-3-5-haiku-20241022", ModelProfile::new(Provider::Anthropic, CLAUDE_WINDOW, 8_192)),
    ("claude-3-opus-20240229", ModelProfile::new(Provider::Anthropic, CLAUDE_WINDOW, 4_096)),
    ("claude-3-haiku-20240307", ModelProfile::new(Provider::Anthropic, CLAUDE_WINDOW, 4_096)),
    // OpenAI
    ("gpt-4o", ModelProfile::new(Provider::OpenAI, 128_000, 16_384)),
    ("gpt-4o-mini", ModelProfile::new(Provider::OpenAI, 128_000, 16_384)),
    ("gpt-4.1", ModelProfile::new(Provider::OpenAI, GPT41_WINDOW, 32_768)),
    ("gpt-4.1-mini", ModelProfile::new(Provider::OpenAI, GPT41_WINDOW, 32_768)),
    ("gpt-4-turbo", ModelProfile::new(Provider::OpenAI, 128_000, 4_096)),
    ("o3", ModelProfile::new(Provider::OpenAI, 200_000, 100_000)),
    ("o4-mini", ModelProfile::new(Provider::OpenAI, 200_000, 100_000)),
    // Google
    ("gemini-2.5-pro", ModelProfile::new(Provider::Google, GEMINI_WINDOW, 65_536)),
    ("gemini-2.5-flash", ModelProfile::new(Provider::Google, GEMINI_WINDOW, 65_536)),
    ("gemini-2.0-flash", ModelProfile::new(Provider::Google, GEMINI_WINDOW, 8_192)),
    ("gemini-1.5-pro", ModelProfile::new(Provider::Google, 2_097_152, 8_192)),
    ("gemini-1.5-flash", ModelProfile::new(Provider::Google, GEMINI_WINDOW, 8_192)),
];

/// Family rules in evaluation order. More specific prefixes come first.
static FAMILY_RULES: Lazy<Vec<FamilyRule>> = Lazy::new(|| {
    vec![
        FamilyRule::new(
            "claude",
            FamilyMatcher::Contains("claude".into()),
            ModelProfile::new(Provider::Anthropic, CLAUDE_WINDOW, 8_192),
        ),
        FamilyRule::new(
            "gemini",
            FamilyMatcher::Contains("gemini".into()),
            ModelProfile::new(Provider::Google, GEMINI_WINDOW, 8_192),
        ),
        FamilyRule::new(
            "gpt-4.1",
            FamilyMatcher::Prefix("gpt-4.1".into()),
            ModelProfile::new(Provider::OpenAI, GPT41_WINDOW, 32_768),
        ),
        FamilyRule::new(
            "gpt-4o",
            FamilyMatcher::Prefix("gpt-4o".into()),
            ModelProfile::new(Provider::OpenAI, 128_000, 16_384),
        ),
        FamilyRule::new(
            "openai-reasoning",
            FamilyMatcher::Pattern(
                Regex::new(r"^o\d+(-mini|-pro)?(-\d{4}-\d{2}-\d{2})?$")
                    .expect("reasoning model regex should compile"),
            ),
            ModelProfile::new(Provider::OpenAI, 200_000, 100_000),
        ),
        FamilyRule::new(
            "gpt-4",
            FamilyMatcher::Prefix("gpt-4".into()),
            ModelProfile::new(Provider::OpenAI, 128_000, 4_096),
        ),
        FamilyRule::new(
            "gpt-3.5",
            FamilyMatcher::Prefix("gpt-3.5".into()),
            ModelProfile::new(Provider::OpenAI, 16_385, 4_096),
        ),
    ]
});

static BUILTIN: Lazy<ProfileResolver> = Lazy::new(|| {
    ProfileResolver::new(
        KNOWN_MODELS
            .iter()
            .map(|(id, profile)| ((*id).to_string(), *profile)),
        FAMILY_RULES.to_vec(),
        ModelProfile::fallback(),
    )
});

/// Strips a provider prefix such as `anthropic/` or `gemini:` from an id.
#[must_use]
pub fn bare_model_name(model_id: &str) -> &str {
    model_id
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or(model_id)
}

/// Resolves model identifiers to [`ModelProfile`]s.
#[derive(Debug, Clone)]
pub struct ProfileResolver {
    /// Exact-match registry.
    known: HashMap<String, ModelProfile>,
    /// Ordered family rules.
    rules: Vec<FamilyRule>,
    /// Last-resort profile.
    fallback: ModelProfile,
}

impl Default for ProfileResolver {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

impl ProfileResolver {
    /// Creates a resolver from explicit tables.
    #[must_use]
    pub fn new(
        known: impl IntoIterator<Item = (String, ModelProfile)>,
        rules: Vec<FamilyRule>,
        fallback: ModelProfile,
    ) -> Self {
        Self {
            known: known.into_iter().collect(),
            rules,
            fallback,
        }
    }

    /// Returns the shared resolver backed by the built-in tables.
    #[must_use]
    pub fn builtin() -> &'static ProfileResolver {
        &BUILTIN
    }

    /// Adds or replaces an exact-match registry entry.
    #[must_use]
    pub fn with_known_model(mut self, model_id: impl Into<String>, profile: ModelProfile) -> Self {
        self.known.insert(model_id.into(), profile);
        self
    }

    /// Replaces the fallback profile.
    #[must_use]
    pub fn with_fallback(mut self, fallback: ModelProfile) -> Self {
        self.fallback = fallback;
        self
    }

    /// Resolves a model identifier. Never fails.
    #[must_use]
    pub fn resolve(&self, model_id: &str) -> ModelProfile {
        self.resolve_with_source(model_id).0
    }

    /// Resolves a model identifier and reports which layer matched.
    #[must_use]
    pub fn resolve_with_source(&self, model_id: &str) -> (ModelProfile, Resolution) {
        let bare = bare_model_name(model_id);

        if let Some(profile) = self.known.get(model_id).or_else(|| self.known.get(bare)) {
            tracing::debug!(model = %model_id, "Resolved model profile from registry");
            return (*profile, Resolution::Exact);
        }

        let normalized = bare.to_lowercase();
        if let Some(rule) = self.rules.iter().find(|r| r.matcher.matches(&normalized)) {
            tracing::debug!(
                model = %model_id,
                rule = %rule.name,
                context_window = rule.profile.context_window,
                "Resolved model profile from family rule"
            );
            return (rule.profile, Resolution::Family(rule.name.clone()));
        }

        tracing::warn!(
            model = %model_id,
            context_window = self.fallback.context_window,
            "Unknown model, using default context window"
        );
        (self.fallback, Resolution::Fallback)
    }
}
