//! Text classification.

/// Check whether a string carries content worth translating.
///
/// Returns true when the text contains at least one ASCII letter or digit.
/// Whitespace, bullets, arrows and other symbol-only runs are left alone.
pub fn is_meaningful(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphanumeric())
}
