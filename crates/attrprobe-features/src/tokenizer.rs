//! Word tokenization and mode-dependent filtering

use crate::stopwords::StopwordSet;
use attrprobe_core::Mode;

/// Strip surrounding ASCII punctuation, then lower-case
pub fn normalize_token(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase()
}

/// Split on whitespace and normalise every token, keeping empties
fn raw_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(normalize_token)
}

/// Tokens that carry topical content: non-empty, not stopwords, not honorifics
pub fn content_tokens(text: &str, stopwords: &StopwordSet) -> Vec<String> {
    raw_tokens(text)
        .filter(|t| !t.is_empty() && !stopwords.excludes_from_content(t))
        .collect()
}

/// Tokens that are function words (members of the stopword list)
pub fn function_word_tokens(text: &str, stopwords: &StopwordSet) -> Vec<String> {
    raw_tokens(text)
        .filter(|t| stopwords.is_stopword(t))
        .collect()
}

/// Tokenize `text` under the filtering policy of `mode`
pub fn tokenize(text: &str, mode: Mode, stopwords: &StopwordSet) -> Vec<String> {
    match mode {
        Mode::Content => content_tokens(text, stopwords),
        Mode::FunctionWords => function_word_tokens(text, stopwords),
    }
}
