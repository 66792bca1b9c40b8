// ============================================================
// Layer 4 — Data Indexer
// ============================================================
// The word-to-index dictionary shared by a solver and its
// pretrainer. Index 0 and 1 are reserved:
//
//   [PAD] = 0   fills unused positions in padded arrays
//   [UNK] = 1   stands in for any word the dictionary missed
//
// Fitting is EXTEND-ONLY. A word that already has an index
// keeps it forever; new words are appended after the current
// end of the dictionary. That invariant is what allows a
// pretrainer to fit additional vocabulary from its own files
// without invalidating indices the main training data will
// use later.
//
// New words are appended most-frequent first (ties broken
// alphabetically) so dictionary order is deterministic for a
// given corpus.

use std::collections::HashMap;

use crate::data::tokenizer::WordTokenizer;
use crate::domain::error::{SolverError, SolverResult};

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const PAD_INDEX: usize = 0;
pub const UNK_INDEX: usize = 1;

/// Extendable word dictionary with reserved padding and
/// unknown-word entries.
#[derive(Debug, Clone)]
pub struct DataIndexer {
    word_to_index: HashMap<String, usize>,
    index_to_word: Vec<String>,
}

impl DataIndexer {
    pub fn new() -> Self {
        let mut indexer = Self {
            word_to_index: HashMap::new(),
            index_to_word: Vec::new(),
        };
        indexer.add_word(PAD_TOKEN.to_string());
        indexer.add_word(UNK_TOKEN.to_string());
        indexer
    }

    /// Rebuild an indexer from (word, index) pairs, e.g. a persisted
    /// vocabulary file. The pairs must cover exactly 0..n with the
    /// reserved tokens in their fixed slots.
    pub fn from_entries(mut entries: Vec<(String, usize)>) -> SolverResult<Self> {
        entries.sort_by_key(|(_, index)| *index);
        let mut index_to_word = Vec::with_capacity(entries.len());
        let mut word_to_index = HashMap::with_capacity(entries.len());
        for (expected, (word, index)) in entries.into_iter().enumerate() {
            if index != expected {
                return Err(SolverError::configuration(format!(
                    "vocabulary indices must be contiguous: expected {expected}, found {index}"
                )));
            }
            word_to_index.insert(word.clone(), index);
            index_to_word.push(word);
        }
        let indexer = Self { word_to_index, index_to_word };
        if indexer.word_for(PAD_INDEX) != Some(PAD_TOKEN)
            || indexer.word_for(UNK_INDEX) != Some(UNK_TOKEN)
        {
            return Err(SolverError::configuration(
                "vocabulary is missing its reserved [PAD]/[UNK] entries",
            ));
        }
        Ok(indexer)
    }

    /// Extend the dictionary with words observed in `texts`.
    ///
    /// Known words keep their indices. New words with at least
    /// `min_count` occurrences are appended most-frequent first.
    pub fn fit_word_dictionary(
        &mut self,
        texts:     &[String],
        min_count: usize,
        tokenizer: &WordTokenizer,
    ) {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in tokenizer.words(text) {
                *counts.entry(word).or_insert(0) += 1;
            }
        }

        let mut fresh: Vec<(String, usize)> = counts
            .into_iter()
            .filter(|(word, count)| *count >= min_count && !self.word_to_index.contains_key(word))
            .collect();
        fresh.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let before = self.vocab_size();
        for (word, _) in fresh {
            self.add_word(word);
        }
        tracing::debug!(
            "Dictionary fit: {} words before, {} after",
            before,
            self.vocab_size(),
        );
    }

    /// Add one word, returning its index. Existing words keep theirs.
    pub fn add_word(&mut self, word: String) -> usize {
        if let Some(&index) = self.word_to_index.get(&word) {
            return index;
        }
        let index = self.index_to_word.len();
        self.word_to_index.insert(word.clone(), index);
        self.index_to_word.push(word);
        index
    }

    /// Index of `word`, or [UNK] if it was never fit.
    pub fn index_word(&self, word: &str) -> usize {
        self.word_to_index.get(word).copied().unwrap_or(UNK_INDEX)
    }

    pub fn is_known(&self, word: &str) -> bool {
        self.word_to_index.contains_key(word)
    }

    pub fn word_for(&self, index: usize) -> Option<&str> {
        self.index_to_word.get(index).map(|w| w.as_str())
    }

    pub fn vocab_size(&self) -> usize {
        self.index_to_word.len()
    }

    /// (word, index) pairs in index order, for persistence.
    pub fn entries(&self) -> impl Iterator<Item = (&str, usize)> {
        self.index_to_word
            .iter()
            .enumerate()
            .map(|(index, word)| (word.as_str(), index))
    }
}

impl Default for DataIndexer {
    fn default() -> Self {
        Self::new()
    }
}
