//! Markup stripping, word counting and the approximate content differ.

use crate::chapter::ContentDiff;
use regex::Regex;
use std::sync::LazyLock;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern compiles"));

/// Remove every `<...>` tag. No markup-aware parsing; entities are left as-is.
pub fn strip_markup(html: &str) -> String {
    TAG_PATTERN.replace_all(html, "").into_owned()
}

/// Whitespace-separated tokens, empty tokens discarded.
pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Number of words in markup-bearing content.
pub fn word_count(content: &str) -> usize {
    words(&strip_markup(content)).len()
}

/// Word-count delta between two contents.
///
/// This is a length-delta approximation, not a sequence diff: rewriting every
/// word while keeping the count yields `{added: 0, removed: 0}`.
pub fn diff(old_content: &str, new_content: &str) -> ContentDiff {
    let old_words = word_count(old_content);
    let new_words = word_count(new_content);
    ContentDiff {
        added: new_words.saturating_sub(old_words),
        removed: old_words.saturating_sub(new_words),
    }
}

/// Positional character similarity of two contents, as a rounded percentage.
///
/// Counts the positions below the shorter length where both plain texts carry
/// the same character, divided by the longer length. Two empty texts are 100.
pub fn similarity(old_content: &str, new_content: &str) -> u8 {
    let old_text: Vec<char> = strip_markup(old_content).chars().collect();
    let new_text: Vec<char> = strip_markup(new_content).chars().collect();

    let total = old_text.len().max(new_text.len());
    if total == 0 {
        return 100;
    }

    let matches = old_text
        .iter()
        .zip(new_text.iter())
        .filter(|(a, b)| a == b)
        .count();

    ((matches as f64 / total as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_markup_removes_tags() {
        assert_eq!(
            strip_markup("<p>Hello <strong>world</strong></p>"),
            "Hello world"
        );
        assert_eq!(strip_markup("no tags"), "no tags");
    }

    #[test]
    fn word_count_ignores_markup_and_extra_whitespace() {
        assert_eq!(word_count("<p>  one   two</p><p>three </p>"), 3);
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("<p></p>"), 0);
    }

    #[test]
    fn diff_is_length_delta_only() {
        let d = diff("<p>one two three</p>", "<p>one two four five</p>");
        assert_eq!(d, ContentDiff { added: 1, removed: 0 });
    }

    #[test]
    fn diff_reports_removed_words() {
        let d = diff("a b c d e", "a b");
        assert_eq!(d, ContentDiff { added: 0, removed: 3 });
    }

    #[test]
    fn diff_rewrite_with_same_count_is_zero() {
        let d = diff("alpha beta gamma", "delta epsilon zeta");
        assert_eq!(d, ContentDiff::default());
    }

    #[test]
    fn diff_from_empty_content() {
        assert_eq!(diff("", "<p>two words</p>"), ContentDiff { added: 2, removed: 0 });
    }

    #[test]
    fn similarity_of_empty_texts_is_full() {
        assert_eq!(similarity("", "<p></p>"), 100);
    }

    #[test]
    fn similarity_is_positional() {
        assert_eq!(similarity("<p>abcd</p>", "abcd"), 100);
        assert_eq!(similarity("abcd", "abxx"), 50);
        // shifted by one character: nothing lines up
        assert_eq!(similarity("abcd", "xabcd"), 0);
    }
}
