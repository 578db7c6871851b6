//! Font size adjustment after translation.
//!
//! Translated text rarely has the same length as the source. The run's font
//! size is scaled by the ratio of the shorter to the longer text so the
//! translation stays roughly inside its box. No font metrics are involved.

/// Smallest font size (points) the adjuster will produce.
pub const MIN_FONT_SIZE: f64 = 10.0;

/// Largest font size (points) the adjuster will produce.
pub const MAX_FONT_SIZE: f64 = 400.0;

/// Compute the new font size of a run after its text changed.
///
/// Returns `None` when the run has no explicit size.
pub fn adjust_font_size(original: &str, translated: &str, size: Option<f64>) -> Option<f64> {
    let size = size?;

    let original_len = original.chars().count();
    let translated_len = translated.chars().count();
    let longer = original_len.max(translated_len);
    if longer == 0 {
        return Some(clamp_font_size(size));
    }

    let shorter = original_len.min(translated_len);
    Some(clamp_font_size(size * shorter as f64 / longer as f64))
}

fn clamp_font_size(size: f64) -> f64 {
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_size_is_noop() {
        assert_eq!(adjust_font_size("Hello", "Bonjour tout le monde", None), None);
    }

    #[test]
    fn test_scales_by_length_ratio() {
        // 11 chars vs 10 chars
        let size = adjust_font_size("Hello World", "Hola Mundo", Some(44.0)).unwrap();
        assert!((size - 40.0).abs() < 1e-9);

        // Same ratio whichever side is longer
        let size = adjust_font_size("Hola Mundo", "Hello World", Some(44.0)).unwrap();
        assert!((size - 40.0).abs() < 1e-9);

        // Equal lengths keep the size
        assert_eq!(adjust_font_size("abcd", "wxyz", Some(24.0)), Some(24.0));
    }

    #[test]
    fn test_clamped_to_valid_range() {
        assert_eq!(
            adjust_font_size("a", "a much longer translation", Some(18.0)),
            Some(MIN_FONT_SIZE)
        );
        assert_eq!(adjust_font_size("abc", "abc", Some(1000.0)), Some(MAX_FONT_SIZE));
        assert_eq!(adjust_font_size("", "", Some(4.0)), Some(MIN_FONT_SIZE));
        assert_eq!(adjust_font_size("abc", "", Some(24.0)), Some(MIN_FONT_SIZE));
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // "café" is 4 chars, 5 bytes
        assert_eq!(adjust_font_size("cafe", "café", Some(20.0)), Some(20.0));
    }

    #[test]
    fn test_always_within_range() {
        let texts = ["", "a", "Hello", "Hello World", "Bonjour à tous les amis"];
        for size in [1.0, 10.0, 18.0, 72.0, 399.0, 5000.0] {
            for a in texts {
                for b in texts {
                    let adjusted = adjust_font_size(a, b, Some(size)).unwrap();
                    assert!((MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&adjusted));
                }
            }
        }
    }
}
