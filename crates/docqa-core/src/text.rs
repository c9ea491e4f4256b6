//! Small text helpers shared by the hashing embedder, the validator and the
//! offline generator: term extraction and sentence splitting.

use std::collections::BTreeSet;

/// Function words that carry no grounding signal.
const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
    "been", "being", "but", "by", "can", "could", "did", "do", "does", "for", "from", "had",
    "has", "have", "he", "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "me",
    "my", "no", "not", "of", "on", "or", "our", "she", "so", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "those", "to", "was", "we", "were",
    "what", "when", "where", "which", "who", "why", "will", "with", "would", "you", "your",
];

pub fn is_stopword(term: &str) -> bool {
    STOPWORDS.binary_search(&term).is_ok()
}

/// Lowercased alphanumeric tokens, in order, stopwords included.
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Lowercased tokens minus stopwords, in order of appearance (duplicates kept).
pub fn content_tokens(text: &str) -> Vec<String> {
    tokens(text).into_iter().filter(|t| !is_stopword(t)).collect()
}

/// Distinct content terms of `text`.
pub fn content_terms(text: &str) -> BTreeSet<String> {
    content_tokens(text).into_iter().collect()
}

/// Fraction of `needle`'s content terms that also occur in `haystack`.
///
/// Returns 0.0 when `needle` has no content terms.
pub fn term_coverage(needle: &BTreeSet<String>, haystack: &BTreeSet<String>) -> f32 {
    if needle.is_empty() {
        return 0.0;
    }
    let hits = needle.intersection(haystack).count();
    hits as f32 / needle.len() as f32
}

/// Split a single line into sentences on `.`, `!` or `?` followed by
/// whitespace or end of input. Decimal points such as `1.5` do not split.
pub fn split_sentences(line: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = line.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = match chars.peek() {
            None => true,
            Some((_, next)) => next.is_whitespace(),
        };
        if at_boundary {
            let end = i + c.len_utf8();
            let sentence = line[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }
    let tail = line[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Keep at most `max_chars` characters of `text`, cutting on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwords_are_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn sentences_split_on_terminal_punctuation_only() {
        let s = split_sentences("Fees are 1.5 percent. Refunds take 14 days! Why? Because");
        assert_eq!(s, vec!["Fees are 1.5 percent.", "Refunds take 14 days!", "Why?", "Because"]);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
