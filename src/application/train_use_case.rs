// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Build the solver            (Layer 5 - ml)
//   Step 2: Fit the word dictionary     (Layer 5 - ml)
//   Step 3: Attention pretraining       (Layer 5 - ml, optional)
//   Step 4: Save config + vocabulary    (Layer 6 - infra)
//   Step 5: Run training loop           (Layer 5 - ml)
//
// Reference: Rust Book §17 (Trait Objects)
//            Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    vocab_store::VocabStore,
};
use crate::ml::encoder::EncoderKind;
use crate::ml::pretrainer::AttentionPretrainer;
use crate::ml::selector::SelectorKind;
use crate::ml::trainer::{build_solver, SolverKind};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved to disk and reloaded for scoring.
// The #[derive(Serialize, Deserialize)] macros from serde handle
// reading/writing this struct to JSON automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub solver:                     SolverKind,
    pub train_file:                 String,
    pub validation_file:            Option<String>,
    pub background_file:            Option<String>,
    pub validation_background_file: Option<String>,
    pub pretrain_file:              Option<String>,
    pub pretrain_background_file:   Option<String>,
    pub checkpoint_dir:             String,
    pub max_sentence_length:        usize,
    pub max_knowledge_length:       usize,
    pub embedding_size:             usize,
    pub encoder:                    EncoderKind,
    pub encoder_hidden_size:        usize,
    pub selector:                   SelectorKind,
    pub selector_hidden_size:       usize,
    pub hard_selection:             bool,
    pub memory_hops:                usize,
    pub dropout:                    f64,
    pub batch_size:                 usize,
    pub epochs:                     usize,
    pub pretrain_epochs:            usize,
    pub lr:                         f64,
    pub train_fraction:             f64,
    pub min_word_count:             usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            solver:                     SolverKind::TrueFalse,
            train_file:                 "data/train.tsv".to_string(),
            validation_file:            None,
            background_file:            None,
            validation_background_file: None,
            pretrain_file:              None,
            pretrain_background_file:   None,
            checkpoint_dir:             "checkpoints".to_string(),
            max_sentence_length:        50,
            max_knowledge_length:       10,
            embedding_size:             50,
            encoder:                    EncoderKind::Bow,
            encoder_hidden_size:        50,
            selector:                   SelectorKind::DotProduct,
            selector_hidden_size:       50,
            hard_selection:             false,
            memory_hops:                1,
            dropout:                    0.2,
            batch_size:                 32,
            epochs:                     10,
            pretrain_epochs:            5,
            lr:                         1e-3,
            train_fraction:             0.8,
            min_word_count:             1,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    /// Create a new TrainUseCase with the given configuration
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Build the solver ──────────────────────────────────────────
        // build_solver validates the config (a memory network without
        // a background file is rejected here, before any file I/O)
        tracing::info!("Building {:?} solver", cfg.solver);
        let mut solver = build_solver(cfg)?;

        // ── Step 2: Fit the word dictionary ───────────────────────────────────
        // The vocabulary comes from the training files; the embedding
        // table is sized from it when the model is first built
        solver.fit_data_indexer()?;
        tracing::info!("Vocabulary: {} words", solver.data_indexer().vocab_size());

        // ── Step 3: Attention pretraining (optional) ──────────────────────────
        // A scope around the solver: hard selection is forced off while
        // the pretrainer runs and restored when the scope ends, whatever
        // the exit path. The pretraining corpus extends the vocabulary,
        // so this runs before the dictionary is saved.
        if cfg.pretrain_file.is_some() {
            let mut scope = AttentionPretrainer::new(solver.as_mut())?;
            let final_loss = scope.pretrain()?;
            tracing::info!("Pretraining finished, attention_loss={final_loss:.4}");
        }

        // ── Step 4: Save config + vocabulary ──────────────────────────────────
        // The scorer needs both to rebuild the model architecture and
        // to index new sentences the same way training did
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir);
        checkpoints.save_config(cfg)?;
        VocabStore::new(&cfg.checkpoint_dir).save(solver.data_indexer())?;

        // ── Step 5: Run training loop ─────────────────────────────────────────
        let mut metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;
        solver.train(&checkpoints, &mut metrics)?;

        Ok(())
    }
}
