//! Approximate token counting.
//!
//! The budget fitter treats this counter as the sole truth for token
//! counts, so the only hard requirements are determinism and speed:
//! a single pass over Unicode word bounds, no allocation per call.
//! Accuracy tracks the usual ~4-characters-per-word-token rule for prose
//! and roughly one token per punctuation pair for code.

use unicode_segmentation::UnicodeSegmentation;

/// Identifier of the counting scheme, recorded in the store's meta table.
///
/// Budgets computed under one fingerprint must never be mixed with counts
/// from another; the store refuses to open an index written with a
/// different fingerprint without a re-index.
pub const MODEL_FINGERPRINT: &str = "approx-wordbound-v1";

/// Approximate token counter.
///
/// Constructed once at program entry and passed by reference through the
/// pipeline; tests construct their own.
///
/// # Examples
///
/// ```
/// use contextkit::token::Tokenizer;
///
/// let tokenizer = Tokenizer::new();
/// assert_eq!(tokenizer.count(""), 0);
/// assert!(tokenizer.count("fn main() {}") >= 3);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer;

impl Tokenizer {
    /// Creates a new tokenizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns the approximate token count for `text`.
    ///
    /// `count("") == 0`. Word segments count one token per four characters
    /// (rounded up), punctuation runs one per two characters; whitespace is
    /// free. Linear in the input length.
    #[must_use]
    pub fn count(&self, text: &str) -> usize {
        let mut tokens = 0usize;
        for segment in text.split_word_bounds() {
            let mut chars = segment.chars();
            let Some(first) = chars.next() else { continue };
            if first.is_whitespace() {
                continue;
            }
            let len = 1 + chars.count();
            if first.is_alphanumeric() || first == '_' {
                tokens += len.div_ceil(4);
            } else {
                tokens += len.div_ceil(2);
            }
        }
        tokens
    }
}
