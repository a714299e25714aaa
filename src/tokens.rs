//! Token counting interface.
//!
//! The analyzer and the usage tracker never tokenize text themselves. They
//! call a [`Tokenizer`], which maps text plus a model identifier to a token
//! count. Any `Fn(&str, &str) -> usize` closure is a tokenizer, so callers
//! can plug in an exact BPE encoder without wrapping it in a type.
//!
//! [`HeuristicTokenizer`] is the built-in fallback. It uses the heuristic of
//! ~4 bytes per token, which is close enough for English text and code and
//! rounds up so it never reports zero for non-empty input.
//!
//! # Example
//!
//! ```rust
//! use review_budget::tokens::{HeuristicTokenizer, Tokenizer};
//!
//! let tokenizer = HeuristicTokenizer;
//! assert_eq!(tokenizer.count_tokens("", "claude-sonnet-4"), 0);
//! assert_eq!(tokenizer.count_tokens("Hello", "claude-sonnet-4"), 2);
//!
//! // Closures work too.
//! let words = |text: &str, _model: &str| text.split_whitespace().count();
//! assert_eq!(words.count_tokens("fn main() {}", "any"), 3);
//! ```

/// Maps text to a token count for a given model.
///
/// Implementations must be deterministic and total: arbitrary input,
/// including malformed or binary-looking text, yields a best-effort count
/// rather than a panic.
pub trait Tokenizer {
    /// Counts the tokens `text` would consume when sent to `model_id`.
    fn count_tokens(&self, text: &str, model_id: &str) -> usize;
}

impl<F> Tokenizer for F
where
    F: Fn(&str, &str) -> usize,
{
    fn count_tokens(&self, text: &str, model_id: &str) -> usize {
        self(text, model_id)
    }
}

/// Bytes per token assumed by [`HeuristicTokenizer`].
pub const HEURISTIC_BYTES_PER_TOKEN: usize = 4;

/// Model-agnostic estimate of ~4 bytes per token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeuristicTokenizer;

impl HeuristicTokenizer {
    /// Estimates token count for a string.
    ///
    /// Uses byte length for consistency with Unicode, and ceiling division so
    /// the estimate is never below the true count for typical text.
    #[must_use]
    pub fn estimate(text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        text.len().div_ceil(HEURISTIC_BYTES_PER_TOKEN)
    }
}

impl Tokenizer for HeuristicTokenizer {
    fn count_tokens(&self, text: &str, _model_id: &str) -> usize {
        Self::estimate(text)
    }
}
