// ============================================================
// Layer 4 — Word Tokenizer
// ============================================================
// Splits raw sentence text into normalised word tokens.
// This is the single tokenization path in the system: the
// indexer fits its dictionary on these tokens, instances are
// indexed with them, and scoring tokenises the same way, so
// vocabulary stays consistent across every phase.
//
// Normalisation:
//   1. split on whitespace
//   2. lowercase each token
//   3. strip non-alphanumeric characters from both edges
//      ("Good!" → "good", "(March)" → "march")
//   4. drop tokens that become empty
//
// Tokens that are pure punctuation vanish entirely, which is
// what the dictionary fitting expects.

/// Whitespace word tokenizer with lowercase and edge-punctuation
/// normalisation. Stateless, so cloning is free.
#[derive(Debug, Clone, Default)]
pub struct WordTokenizer;

impl WordTokenizer {
    pub fn new() -> Self {
        Self
    }

    /// Split `text` into normalised word tokens.
    pub fn words(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(|w| {
                w.to_lowercase()
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_string()
            })
            .filter(|w| !w.is_empty())
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_splits() {
        let tok = WordTokenizer::new();
        assert_eq!(tok.words("Cats chase Mice"), vec!["cats", "chase", "mice"]);
    }

    #[test]
    fn test_strips_edge_punctuation() {
        let tok = WordTokenizer::new();
        assert_eq!(
            tok.words("Good! (Really) \"quoted\" end."),
            vec!["good", "really", "quoted", "end"]
        );
    }

    #[test]
    fn test_inner_punctuation_is_kept() {
        // Only the edges are trimmed; "don't" keeps its apostrophe.
        let tok = WordTokenizer::new();
        assert_eq!(tok.words("don't stop"), vec!["don't", "stop"]);
    }

    #[test]
    fn test_pure_punctuation_tokens_vanish() {
        let tok = WordTokenizer::new();
        assert_eq!(tok.words("yes - no -- ?"), vec!["yes", "no"]);
    }

    #[test]
    fn test_empty_text() {
        let tok = WordTokenizer::new();
        assert!(tok.words("   ").is_empty());
    }
}
