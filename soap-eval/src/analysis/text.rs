//! Text normalization and tokenization

use std::collections::HashSet;

/// Lower-case, replace everything outside `[a-z0-9]` and whitespace with a
/// space, collapse whitespace runs and trim.
pub fn normalize(text: &str) -> String {
    let replaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize, then split into tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Distinct tokens of a text.
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  BP: 120/80,  HR 72bpm! "), "bp 120 80 hr 72bpm");
        assert_eq!(normalize("Temp 38.5°C"), "temp 38 5 c");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("\t\n"), "");
    }

    #[test]
    fn test_normalize_non_ascii_letters_become_spaces() {
        assert_eq!(normalize("café au lait"), "caf au lait");
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Denies fever; no cough."), vec!["denies", "fever", "no", "cough"]);
        assert!(tokenize("...").is_empty());
    }

    #[test]
    fn test_tokenize_stable_on_own_output() {
        let tokens = tokenize("Pt c/o SOB & chest-pain x2/7");
        assert_eq!(tokenize(&tokens.join(" ")), tokens);
    }

    #[test]
    fn test_token_set_dedupes() {
        let set = token_set("pain, pain and more pain");
        assert_eq!(set.len(), 3);
        assert!(set.contains("pain"));
    }
}
