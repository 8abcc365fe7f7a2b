//! Thresholds and word lists behind the SEO heuristics.

pub const MAX_TITLE_CHARS: usize = 500;

pub const SHORT_CONTENT_WORDS: usize = 300;

pub const TOP_KEYWORD_LIMIT: usize = 10;

/// Tokens of this many characters or fewer never count as keywords.
pub const MAX_IGNORED_KEYWORD_CHARS: usize = 3;

/// Sentences must be longer than this to take part in duplicate detection.
pub const MIN_SENTENCE_CHARS: usize = 20;

pub const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

pub const IDEAL_TITLE_CHARS: std::ops::RangeInclusive<usize> = 50..=60;

pub const IDEAL_META_DESCRIPTION_CHARS: std::ops::RangeInclusive<usize> = 120..=160;

pub mod friendliness {
    pub const IDEAL_TITLE: i32 = 15;
    pub const ANY_TITLE: i32 = 5;
    pub const IDEAL_META: i32 = 15;
    pub const ANY_META: i32 = 5;
    pub const SINGLE_H1: i32 = 20;
    pub const MULTIPLE_H1: i32 = 5;
    pub const SEVERAL_H2: i32 = 10;
    pub const ONE_H2: i32 = 5;
    pub const VIEWPORT: i32 = 10;
    pub const LONG_CONTENT_WORDS: usize = 500;
    pub const LONG_CONTENT: i32 = 15;
    pub const MEDIUM_CONTENT: i32 = 10;
    pub const SHORT_CONTENT: i32 = 5;
    pub const ALL_ALT: i32 = 10;
    pub const FEW_MISSING_ALT_BELOW: usize = 3;
    pub const FEW_MISSING_ALT: i32 = 5;
    pub const LOW_DUPLICATE_BELOW: f64 = 10.0;
    pub const LOW_DUPLICATE: i32 = 10;
    pub const SOME_DUPLICATE_BELOW: f64 = 20.0;
    pub const SOME_DUPLICATE: i32 = 5;
}

pub mod quality {
    pub const RICH_CONTENT_WORDS: usize = 800;
    pub const RICH_CONTENT: i32 = 25;
    pub const LONG_CONTENT_WORDS: usize = 500;
    pub const LONG_CONTENT: i32 = 20;
    pub const MEDIUM_CONTENT: i32 = 15;
    pub const SHORT_CONTENT: i32 = 5;
    pub const SINGLE_H1: i32 = 15;
    pub const SEVERAL_H2: i32 = 15;
    pub const ONE_H2: i32 = 10;
    pub const DUPLICATE_TIERS: [(f64, i32); 3] = [(5.0, 20), (15.0, 10), (25.0, 5)];
    pub const MISSING_ALT_TIERS: [(usize, i32); 2] = [(3, 10), (6, 5)];
    pub const ALL_ALT: i32 = 15;
    pub const HAS_KEYWORDS: i32 = 10;
}

pub mod google {
    pub const START: i32 = 100;
    pub const MISSING_TITLE: i32 = 20;
    pub const MISSING_META_DESCRIPTION: i32 = 15;
    pub const MISSING_H1: i32 = 20;
    pub const PER_MISSING_ALT: i32 = 3;
    pub const MAX_MISSING_ALT: i32 = 25;
    pub const SHORT_CONTENT: i32 = 20;
    pub const HIGH_DUPLICATE_ABOVE: f64 = 30.0;
    pub const HIGH_DUPLICATE: i32 = 15;
    pub const MISSING_VIEWPORT: i32 = 10;
}

pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
    "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down",
    "during", "each", "few", "for", "from", "further", "had", "has", "have", "having", "he",
    "her", "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in",
    "into", "is", "it", "its", "itself", "just", "may", "me", "might", "more", "most",
    "must", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only",
    "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "shall", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
    "yourself", "yourselves",
];

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_words_are_sorted_and_unique() {
        for pair in STOP_WORDS.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn stop_word_lookup() {
        assert!(is_stop_word("the"));
        assert!(is_stop_word("with"));
        assert!(is_stop_word("themselves"));
        assert!(!is_stop_word("monitoring"));
    }
}
