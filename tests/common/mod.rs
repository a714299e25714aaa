//! Common test utilities and fixtures for review-budget.
//!
//! This module provides shared test infrastructure including:
//! - A temp-dir test context for config files
//! - Deterministic tokenizers and file fixtures

#![allow(dead_code)]

use review_budget::analyzer::FileUnit;
use review_budget::models::{ModelProfile, ProfileResolver, Provider};
use std::path::PathBuf;

/// Model registered by [`resolver_with_window`].
pub const TEST_MODEL: &str = "test-model";

/// Test context providing common setup for integration tests.
pub struct TestContext {
    /// Temporary directory for test file operations.
    pub temp_dir: tempfile::TempDir,
}

impl TestContext {
    /// Creates a new test context with a temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            temp_dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    /// Returns the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// Creates a file in the temporary directory with the given content.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        std::fs::write(&path, content).expect("failed to write file");
        path
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokenizer where every character is one token.
pub fn char_tokens(text: &str, _model: &str) -> usize {
    text.chars().count()
}

/// Tokenizer where every whitespace-separated word is one token.
pub fn word_tokens(text: &str, _model: &str) -> usize {
    text.split_whitespace().count()
}

/// Function-pointer type of the fixture tokenizers.
pub type FnTokenizer = fn(&str, &str) -> usize;

/// Resolver that knows only [`TEST_MODEL`] with the given window.
pub fn resolver_with_window(context_window: usize) -> ProfileResolver {
    ProfileResolver::new(
        [(
            TEST_MODEL.to_string(),
            ModelProfile::new(Provider::Anthropic, context_window, 4_096),
        )],
        Vec::new(),
        ModelProfile::fallback(),
    )
}

/// A file whose content is `tokens` characters, so [`char_tokens`] counts it
/// as exactly `tokens`.
pub fn sized_file(path: &str, tokens: usize) -> FileUnit {
    FileUnit::new(path, "x".repeat(tokens))
}
