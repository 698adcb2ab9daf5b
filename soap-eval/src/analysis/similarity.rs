//! Set and sequence similarity primitives

use std::collections::HashSet;
use std::hash::Hash;

use super::text::{normalize, token_set, tokenize};

/// Fraction of phrase tokens that must occur for a bag-of-words match
pub const DEFAULT_FUZZY_TOKEN_THRESHOLD: f64 = 0.7;

/// `|A ∩ B| / |A ∪ B|`, with two empty sets counting as full agreement.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Length of the longest common subsequence of two token sequences.
pub fn lcs_length<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Two rows over the shorter sequence
    let (short, long) = if a.len() < b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];

    for item in long {
        for j in 1..=short.len() {
            curr[j] = if *item == short[j - 1] {
                prev[j - 1] + 1
            } else {
                prev[j].max(curr[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// ROUGE-L F1 between a reference and a candidate text.
///
/// Zero when either side has no tokens.
pub fn rouge_l(reference: &str, candidate: &str) -> f64 {
    let ref_tokens = tokenize(reference);
    let cand_tokens = tokenize(candidate);
    if ref_tokens.is_empty() || cand_tokens.is_empty() {
        return 0.0;
    }

    let lcs = lcs_length(&ref_tokens, &cand_tokens) as f64;
    let precision = lcs / cand_tokens.len() as f64;
    let recall = lcs / ref_tokens.len() as f64;

    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Jaccard similarity of the token sets of two texts.
pub fn word_overlap(a: &str, b: &str) -> f64 {
    jaccard(&token_set(a), &token_set(b))
}

/// Does `haystack` mention `phrase`?
///
/// True on a verbatim match of the normalized phrase, otherwise when at least
/// `threshold` of the phrase's tokens occur anywhere in the haystack. A phrase
/// with no tokens never matches.
pub fn fuzzy_contains(haystack: &str, phrase: &str, threshold: f64) -> bool {
    let phrase_norm = normalize(phrase);
    if phrase_norm.is_empty() {
        return false;
    }

    let haystack_norm = normalize(haystack);
    if haystack_norm.contains(&phrase_norm) {
        return true;
    }

    let phrase_tokens: Vec<&str> = phrase_norm.split(' ').collect();
    let haystack_tokens: HashSet<&str> = haystack_norm.split(' ').collect();
    let found = phrase_tokens
        .iter()
        .filter(|t| haystack_tokens.contains(*t))
        .count();

    found as f64 / phrase_tokens.len() as f64 >= threshold
}
