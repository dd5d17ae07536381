// Text Signal Extraction
// Lexical statistics over plain text from any source (native, PDF layer, OCR)

use crate::models::TextFeatures;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Closed English stopword baseline. Tokens in this set are excluded from the
/// top-5 repetition share and counted for the stopword ratio.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "then", "else", "when", "while",
    "of", "at", "by", "for", "with", "about", "against", "between", "into",
    "through", "during", "before", "after", "above", "below", "to", "from", "up",
    "down", "in", "out", "on", "off", "over", "under", "again", "further", "once",
    "here", "there", "all", "any", "both", "each", "few", "more", "most", "other",
    "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "can", "will", "just", "should", "now", "is", "are", "was",
    "were", "be", "been", "being", "have", "has", "had", "do", "does", "did",
    "it", "its", "this", "that", "these", "those", "i", "you", "he", "she",
    "we", "they", "his", "her", "their", "as", "what", "which", "who", "whom",
];

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z0-9']+").unwrap())
}

fn stopword_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Compute lexical statistics for a body of text.
/// Empty or word-free input yields all-zero features, never a division fault.
pub fn extract_text_features(text: &str) -> TextFeatures {
    let char_count = text.chars().count();
    if char_count == 0 {
        return TextFeatures::default();
    }

    let lower = text.to_lowercase();
    let words: Vec<&str> = word_re().find_iter(&lower).map(|m| m.as_str()).collect();
    let word_count = words.len();
    if word_count == 0 {
        return TextFeatures {
            char_count,
            punct_ratio: punct_ratio(text, char_count),
            digit_ratio: digit_ratio(text, char_count),
            ..Default::default()
        };
    }

    // Type-Token Ratio
    let unique: HashSet<&str> = words.iter().copied().collect();
    let ttr = unique.len() as f64 / word_count as f64;

    // Average sentence length in words
    let sentences = split_sentences(text);
    let avg_sentence_len = if sentences.is_empty() {
        word_count as f64
    } else {
        word_count as f64 / sentences.len() as f64
    };

    // Share of total tokens taken by the 5 most frequent non-stopword tokens
    let stopwords = stopword_set();
    let mut freq: HashMap<&str, usize> = HashMap::new();
    let mut stopword_count = 0usize;
    for w in &words {
        if stopwords.contains(w) {
            stopword_count += 1;
        } else {
            *freq.entry(w).or_insert(0) += 1;
        }
    }
    let mut counts: Vec<usize> = freq.values().copied().collect();
    counts.sort_unstable_by(|a, b| b.cmp(a));
    let top5: usize = counts.iter().take(5).sum();
    let repetition_top5_share = top5 as f64 / word_count as f64;

    let stopword_ratio = stopword_count as f64 / word_count as f64;

    TextFeatures {
        ttr,
        avg_sentence_len,
        repetition_top5_share,
        stopword_ratio,
        digit_ratio: digit_ratio(text, char_count),
        punct_ratio: punct_ratio(text, char_count),
        word_count,
        char_count,
    }
}

fn digit_ratio(text: &str, char_count: usize) -> f64 {
    let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
    digits as f64 / char_count as f64
}

fn punct_ratio(text: &str, char_count: usize) -> f64 {
    let punct = text.chars().filter(|c| c.is_ascii_punctuation()).count();
    punct as f64 / char_count as f64
}

/// Split on terminal punctuation runs; fragments without terminators count as
/// one sentence.
fn split_sentences(text: &str) -> Vec<String> {
    text.split(|c| matches!(c, '.' | '!' | '?'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
