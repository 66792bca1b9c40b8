// ============================================================
// Layer 5 — Scorer
// ============================================================
// Loads a trained solver from its checkpoint directory and
// scores sentences without the training stack: rebuild the
// model architecture from the saved config, restore the saved
// vocabulary, restore the weights, run forward passes on the
// inner backend (no autodiff overhead, dropout inert).

use anyhow::Result;
use burn::prelude::*;
use burn::tensor::activation::softmax;

use crate::data::{
    indexer::DataIndexer,
    instance::{pad_background, pad_word_sequence},
    tokenizer::WordTokenizer,
};
use crate::domain::max_lengths::MaxLengths;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::memory_network::MemoryNetworkModel;
use crate::ml::trainer::{
    memory_network_model_config, true_false_model_config, MyInnerBackend, SolverKind,
};
use crate::ml::true_false::TrueFalseModel;

enum ScorerModel {
    TrueFalse(TrueFalseModel<MyInnerBackend>),
    MemoryNetwork(MemoryNetworkModel<MyInnerBackend>),
}

/// One sentence's verdict: the predicted label and the model's
/// probability for "true".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub label:            bool,
    pub true_probability: f32,
}

pub struct Scorer {
    model:     ScorerModel,
    tokenizer: WordTokenizer,
    indexer:   DataIndexer,
    lengths:   MaxLengths,
    device:    burn::backend::ndarray::NdArrayDevice,
}

impl Scorer {
    /// Rebuild the trained solver's model from a checkpoint
    /// directory: config, vocabulary, then weights.
    pub fn from_checkpoint(checkpoints: &CheckpointManager, vocab: &VocabStore) -> Result<Self> {
        let device  = burn::backend::ndarray::NdArrayDevice::default();
        let config  = checkpoints.load_config()?;
        let indexer = vocab.load()?;
        let lengths = MaxLengths::new(config.max_sentence_length, config.max_knowledge_length);

        let model = match config.solver {
            SolverKind::TrueFalse => {
                let mut model_config = true_false_model_config(&config, indexer.vocab_size());
                // Dropout is inert on the inner backend anyway;
                // zero keeps the intent visible.
                model_config.dropout = 0.0;
                let model = model_config.init::<MyInnerBackend>(&device);
                ScorerModel::TrueFalse(checkpoints.load_model(model, &device)?)
            }
            SolverKind::MemoryNetwork => {
                let mut model_config =
                    memory_network_model_config(&config, indexer.vocab_size());
                model_config.dropout = 0.0;
                let model = model_config.init::<MyInnerBackend>(&device);
                ScorerModel::MemoryNetwork(checkpoints.load_model(model, &device)?)
            }
        };
        tracing::info!("Model loaded from checkpoint ({:?})", config.solver);

        Ok(Self { model, tokenizer: WordTokenizer::new(), indexer, lengths, device })
    }

    pub fn kind(&self) -> SolverKind {
        match self.model {
            ScorerModel::TrueFalse(_)     => SolverKind::TrueFalse,
            ScorerModel::MemoryNetwork(_) => SolverKind::MemoryNetwork,
        }
    }

    /// Score one sentence, with background sentences for the
    /// memory network (ignored by the true/false model).
    pub fn score(&self, sentence: &str, background: &[String]) -> Result<Verdict> {
        let tokens = self.sentence_tensor(sentence);

        let logits = match &self.model {
            ScorerModel::TrueFalse(model) => model.forward(tokens),
            ScorerModel::MemoryNetwork(model) => {
                model.forward(tokens, self.background_tensor(background))
            }
        };

        let probabilities: Vec<f32> = softmax(logits, 1)
            .reshape([2])
            .into_data()
            .convert::<f32>()
            .value;
        let true_probability = probabilities[1];

        Ok(Verdict { label: true_probability >= 0.5, true_probability })
    }

    fn sentence_tensor(&self, sentence: &str) -> Tensor<MyInnerBackend, 2, Int> {
        let indices: Vec<usize> = self
            .tokenizer
            .words(sentence)
            .iter()
            .map(|word| self.indexer.index_word(word))
            .collect();
        let padded = pad_word_sequence(indices, self.lengths.sentence);
        let flat: Vec<i32> = padded.iter().map(|&x| x as i32).collect();
        Tensor::<MyInnerBackend, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([1, self.lengths.sentence])
    }

    fn background_tensor(&self, background: &[String]) -> Tensor<MyInnerBackend, 3, Int> {
        let rows: Vec<Vec<usize>> = background
            .iter()
            .map(|sentence| {
                self.tokenizer
                    .words(sentence)
                    .iter()
                    .map(|word| self.indexer.index_word(word))
                    .collect()
            })
            .collect();
        let padded = pad_background(rows, self.lengths.background, self.lengths.sentence);
        let flat: Vec<i32> = padded
            .iter()
            .flatten()
            .map(|&x| x as i32)
            .collect();
        Tensor::<MyInnerBackend, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([1, self.lengths.background, self.lengths.sentence])
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::ml::encoder::EncoderKind;
    use crate::ml::selector::SelectorKind;

    fn fitted_indexer() -> DataIndexer {
        let mut indexer = DataIndexer::new();
        indexer.fit_word_dictionary(
            &["cats chase mice".to_string(), "dogs bark loudly".to_string()],
            1,
            &WordTokenizer::new(),
        );
        indexer
    }

    fn tiny_config(solver: SolverKind) -> TrainConfig {
        TrainConfig {
            solver,
            encoder: EncoderKind::Bow,
            selector: SelectorKind::DotProduct,
            embedding_size: 4,
            max_sentence_length: 5,
            max_knowledge_length: 2,
            ..TrainConfig::default()
        }
    }

    fn save_artifacts(dir: &tempfile::TempDir, config: &TrainConfig, indexer: &DataIndexer) {
        let path = dir.path().to_string_lossy().into_owned();
        let checkpoints = CheckpointManager::new(path.clone());
        checkpoints.save_config(config).unwrap();
        VocabStore::new(path).save(indexer).unwrap();

        let device = Default::default();
        match config.solver {
            SolverKind::TrueFalse => {
                let model = true_false_model_config(config, indexer.vocab_size())
                    .init::<MyInnerBackend>(&device);
                checkpoints.save_model(&model, 1).unwrap();
            }
            SolverKind::MemoryNetwork => {
                let model = memory_network_model_config(config, indexer.vocab_size())
                    .init::<MyInnerBackend>(&device);
                checkpoints.save_model(&model, 1).unwrap();
            }
        }
    }

    #[test]
    fn test_true_false_scoring_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config  = tiny_config(SolverKind::TrueFalse);
        let indexer = fitted_indexer();
        save_artifacts(&dir, &config, &indexer);

        let path = dir.path().to_string_lossy().into_owned();
        let scorer =
            Scorer::from_checkpoint(&CheckpointManager::new(path.clone()), &VocabStore::new(path))
                .unwrap();
        assert_eq!(scorer.kind(), SolverKind::TrueFalse);

        let verdict = scorer.score("cats chase mice", &[]).unwrap();
        assert!(verdict.true_probability >= 0.0 && verdict.true_probability <= 1.0);
        assert_eq!(verdict.label, verdict.true_probability >= 0.5);
    }

    #[test]
    fn test_memory_network_scoring_uses_background() {
        let dir = tempfile::tempdir().unwrap();
        let config  = tiny_config(SolverKind::MemoryNetwork);
        let indexer = fitted_indexer();
        save_artifacts(&dir, &config, &indexer);

        let path = dir.path().to_string_lossy().into_owned();
        let scorer =
            Scorer::from_checkpoint(&CheckpointManager::new(path.clone()), &VocabStore::new(path))
                .unwrap();

        let background = vec!["cats chase mice".to_string(), "dogs bark".to_string()];
        let verdict = scorer.score("cats chase mice", &background).unwrap();
        assert!(verdict.true_probability.is_finite());
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().into_owned();
        let result =
            Scorer::from_checkpoint(&CheckpointManager::new(path.clone()), &VocabStore::new(path));
        assert!(result.is_err());
    }
}
