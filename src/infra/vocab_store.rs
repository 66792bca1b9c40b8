// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists the fitted word dictionary next to the checkpoints,
// as a HuggingFace-format tokenizer JSON (WordLevel model). The
// scorer loads it back to index words exactly the way training
// did; the file also works directly with the tokenizers crate,
// so the dictionary is inspectable with standard tooling.
//
// In tokenizers 0.15, train_from_files requires Trainer::Model
// to equal ModelWrapper, which does not fit a dictionary that
// was fitted elsewhere. So the JSON is built manually and
// loaded back through Tokenizer::from_file, which also
// validates the format on every save.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokenizers::Tokenizer;

use crate::data::indexer::{DataIndexer, PAD_INDEX, UNK_INDEX};

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("vocabulary.json")
    }

    /// Write the indexer's dictionary as a tokenizer JSON.
    pub fn save(&self, indexer: &DataIndexer) -> Result<()> {
        std::fs::create_dir_all(&self.dir).ok();

        // ── Step 1: WordLevel vocab straight from the indexer ─────────────────
        let mut vocab = serde_json::Map::new();
        for (word, index) in indexer.entries() {
            vocab.insert(word.to_string(), serde_json::json!(index));
        }

        // ── Step 2: Tokenizer JSON in HuggingFace format ──────────────────────
        // This format is what Tokenizer::from_file() expects.
        // Lowercase + Whitespace mirror what WordTokenizer does
        // to text before indexing.
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": PAD_INDEX, "content": "[PAD]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": UNK_INDEX, "content": "[UNK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": {
                "type": "Lowercase"
            },
            "pre_tokenizer": {
                "type": "Whitespace"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))?;

        // Load back once so a malformed dictionary fails the
        // save, not a later score run.
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Saved vocabulary does not load: {e}"))?;

        tracing::info!(
            "Vocabulary saved: {} words to '{}'",
            indexer.vocab_size(),
            path.display(),
        );
        Ok(())
    }

    /// Load the dictionary back into a DataIndexer.
    pub fn load(&self) -> Result<DataIndexer> {
        let path = self.path();
        let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
            anyhow::anyhow!(
                "Cannot load vocabulary from '{}': {}. \
                 Make sure you have run 'train' first.",
                path.display(),
                e
            )
        })?;

        let entries: Vec<(String, usize)> = tokenizer
            .get_vocab(true)
            .into_iter()
            .map(|(word, index)| (word, index as usize))
            .collect();
        Ok(DataIndexer::from_entries(entries)?)
    }
}
