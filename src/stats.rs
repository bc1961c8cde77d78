//! Document statistics for the status bar.

use serde::Serialize;

/// Average silent reading speed used for the time estimate.
pub const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Maximal runs of non-whitespace.
    pub words: usize,
    /// Unicode scalar values.
    pub characters: usize,
    pub lines: usize,
    pub reading_minutes: usize,
}

/// Count words, characters and lines in one pass.
pub fn count(text: &str) -> Stats {
    let mut words = 0;
    let mut characters = 0;
    let mut newlines = 0;
    let mut in_word = false;
    for ch in text.chars() {
        characters += 1;
        if ch == '\n' {
            newlines += 1;
        }
        if ch.is_whitespace() {
            in_word = false;
        } else if !in_word {
            in_word = true;
            words += 1;
        }
    }
    Stats {
        words,
        characters,
        lines: if text.is_empty() { 0 } else { newlines + 1 },
        reading_minutes: words.div_ceil(WORDS_PER_MINUTE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        assert_eq!(count(""), Stats::default());
    }

    #[test]
    fn test_words_are_whitespace_separated_runs() {
        let stats = count("  hello,   world!\n\tagain ");
        assert_eq!(stats.words, 3);
        assert_eq!(stats.lines, 2);
    }

    #[test]
    fn test_characters_count_scalars_not_bytes() {
        let stats = count("héllo 世界");
        assert_eq!(stats.characters, 8);
        assert_eq!(stats.words, 2);
    }

    #[test]
    fn test_reading_time_rounds_up() {
        let text = "word ".repeat(201);
        assert_eq!(count(&text).reading_minutes, 2);
        assert_eq!(count("one").reading_minutes, 1);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn words_match_split_whitespace(text in "\\PC{0,200}") {
                let stats = count(&text);
                prop_assert_eq!(stats.words, text.split_whitespace().count());
                prop_assert_eq!(stats.characters, text.chars().count());
            }

            #[test]
            fn concatenation_never_loses_words(a in "[a-z ]{0,40}", b in "[a-z ]{0,40}") {
                let joined = format!("{a} {b}");
                prop_assert_eq!(count(&joined).words, count(&a).words + count(&b).words);
            }
        }
    }
}
