//! Greedy word wrap for plain-text fields.
//!
//! Text is split on single spaces and packed onto lines until the next word
//! would overflow the box width. The number of lines is capped by the box
//! height; words past the cap are dropped without any overflow marker.
//!
//! Plain text always uses a line height of `font_size * 1.2`, whatever the
//! field's `lineHeightMultiplier` says. That multiplier belongs to the
//! markup path only.

use crate::font::TextMeasure;

/// Fixed line height multiplier for plain text.
pub const PLAIN_LINE_HEIGHT: f32 = 1.2;

pub fn line_height(font_size: f32) -> f32 {
    font_size * PLAIN_LINE_HEIGHT
}

/// How many lines of `font_size` text fit in `max_height`.
pub fn max_lines(font_size: f32, max_height: f32) -> usize {
    let lh = line_height(font_size);
    if !(lh > 0.0) || !(max_height > 0.0) {
        return 0;
    }
    (max_height / lh).floor() as usize
}

/// Wrap `text` into lines no wider than `max_width` (unless a single word is
/// wider on its own) and no more than fit in `max_height`.
pub fn wrap(
    text: &str,
    measure: &dyn TextMeasure,
    font_size: f32,
    max_width: f32,
    max_height: f32,
) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let max_lines = max_lines(font_size, max_height);
    if max_lines == 0 {
        return Vec::new();
    }

    let mut words = text.split(' ');
    let mut current = words.next().unwrap_or_default().to_string();
    let mut lines = Vec::new();

    for word in words {
        if lines.len() >= max_lines {
            break;
        }
        let candidate = format!("{} {}", current, word);
        if measure.measure(&candidate, font_size) > max_width && !current.is_empty() {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }

    if lines.len() < max_lines {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// Every character is `ratio * font_size` wide.
    struct Mono(f32);

    impl TextMeasure for Mono {
        fn measure(&self, text: &str, font_size: f32) -> f32 {
            text.chars().count() as f32 * self.0 * font_size
        }
    }

    #[test]
    fn test_empty_and_whitespace_yield_nothing() {
        let m = Mono(0.5);
        assert!(wrap("", &m, 24.0, 100.0, 100.0).is_empty());
        assert!(wrap("   ", &m, 24.0, 100.0, 100.0).is_empty());
        assert!(wrap("\t\n", &m, 24.0, 100.0, 100.0).is_empty());
    }

    #[test]
    fn test_fits_on_one_line() {
        let m = Mono(0.5);
        assert_eq!(wrap("hello world", &m, 10.0, 1000.0, 100.0), vec!["hello world"]);
    }

    #[test]
    fn test_breaks_greedily() {
        // 10px per char at size 20
        let m = Mono(0.5);
        let lines = wrap("aaa bbb ccc ddd", &m, 20.0, 75.0, 1000.0);
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn test_long_word_keeps_own_line() {
        let m = Mono(0.5);
        let lines = wrap("a verylongword b", &m, 20.0, 50.0, 1000.0);
        assert_eq!(lines, vec!["a", "verylongword", "b"]);
    }

    #[test]
    fn test_line_cap_drops_remaining_words() {
        let m = Mono(0.5);
        // line height 24, box height 50 -> 2 lines
        let lines = wrap("one two three four five", &m, 20.0, 40.0, 50.0);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_box_shorter_than_one_line() {
        let m = Mono(0.5);
        assert!(wrap("hello", &m, 24.0, 1000.0, 20.0).is_empty());
    }

    #[test]
    fn test_reference_example_two_of_four_lines() {
        // 800x600 background, box {10,10,80,20}% -> 640x120 px; size 24 -> 28.8 line height.
        assert_eq!(max_lines(24.0, 120.0), 4);
        let m = Mono(0.5);
        // 12px per char: a 25-char word is 300px, so only two fit on a 640px line.
        let word = "a".repeat(25);
        let text = format!("{} {} {}", word, word, word);
        let lines = wrap(&text, &m, 24.0, 640.0, 120.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("{} {}", word, word));
        assert_eq!(lines[1], word);
    }

    #[test]
    fn test_double_spaces_are_kept() {
        let m = Mono(0.5);
        assert_eq!(wrap("a  b", &m, 10.0, 1000.0, 100.0), vec!["a  b"]);
    }

    proptest! {
        #[test]
        fn prop_lines_fit_width(
            words in proptest::collection::vec("[a-z]{1,8}", 1..40),
            font_size in 8.0f32..48.0,
            extra in 0.0f32..400.0,
        ) {
            let m = Mono(0.5);
            let widest = words.iter().map(|w| m.measure(w, font_size)).fold(0.0, f32::max);
            let max_width = widest + extra;
            let text = words.join(" ");
            for line in wrap(&text, &m, font_size, max_width, 10_000.0) {
                prop_assert!(m.measure(&line, font_size) <= max_width);
            }
        }

        #[test]
        fn prop_line_count_capped(
            words in proptest::collection::vec("[a-z]{1,8}", 0..60),
            font_size in 4.0f32..64.0,
            max_width in 1.0f32..500.0,
            max_height in 0.0f32..400.0,
        ) {
            let m = Mono(0.5);
            let lines = wrap(&words.join(" "), &m, font_size, max_width, max_height);
            let cap = (max_height / (font_size * 1.2)).floor() as usize;
            prop_assert!(lines.len() <= cap);
        }

        #[test]
        fn prop_wrap_is_deterministic(
            text in "[a-z ]{0,120}",
            max_width in 10.0f32..300.0,
        ) {
            let m = Mono(0.6);
            prop_assert_eq!(
                wrap(&text, &m, 16.0, max_width, 500.0),
                wrap(&text, &m, 16.0, max_width, 500.0)
            );
        }

        #[test]
        fn prop_no_words_invented(
            words in proptest::collection::vec("[a-z]{1,6}", 1..30),
            max_width in 10.0f32..200.0,
        ) {
            let m = Mono(0.5);
            let text = words.join(" ");
            let lines = wrap(&text, &m, 12.0, max_width, 10_000.0);
            let rejoined = lines.join(" ");
            prop_assert!(text.starts_with(&rejoined));
        }
    }
}
