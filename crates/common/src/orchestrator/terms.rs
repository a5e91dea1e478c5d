//! Question term extraction for graph lookups

use std::collections::HashSet;

const MIN_TERM_CHARS: usize = 3;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been",
    "in", "on", "at", "to", "for", "of", "with", "by", "from",
    "and", "or", "but", "not", "this", "that", "these", "those",
    "it", "its", "as", "do", "does", "did", "has", "have", "had",
    "can", "could", "will", "would", "should", "may", "might",
    "what", "which", "who", "whom", "whose", "where", "when", "why", "how",
    "there", "their", "about", "into", "any", "all", "some", "tell", "me",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word.to_lowercase().as_str())
}

/// Candidate node names in a question: words of at least three characters
/// that are not stop words, first occurrence wins, at most `max_terms`
pub fn question_terms(question: &str, max_terms: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    question
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .map(|w| w.trim_matches('-'))
        .filter(|w| w.chars().count() >= MIN_TERM_CHARS && !is_stop_word(w))
        .filter(|w| seen.insert(w.to_lowercase()))
        .take(max_terms)
        .map(str::to_string)
        .collect()
}
