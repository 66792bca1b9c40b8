// ============================================================
// Layer 5 — Attention Pretrainer
// ============================================================
// Trains the memory network's attention stage directly, before
// end-to-end training, on examples that say WHICH background
// sentence is the right one. The signal is a labeled background
// file; the model is a truncated memory network that stops at
// the first knowledge selector's attention weights.
//
// Lifecycle, around one borrowed MemoryNetworkSolver:
//
//   new()        capability + file checks, then save the
//                solver's hard_selection flag and force it off.
//                Hard selection is not differentiable, so the
//                attention stage can only pretrain soft.
//   pretrain()   extend the vocabulary from the pretraining
//                files, build the attention samples in file
//                order, train AttentionModel, install the
//                trained stage back into the full model.
//   drop         restore the saved hard_selection value, on the
//                config and every selector layer. Runs on every
//                exit path, early errors included.
//
// The pretrainer holds `&mut` on the solver for its whole
// lifetime, so nothing else can observe or race the forced
// flag; mid-pretraining reads go through `solver()`.
//
// Reference: Burn Book §5, Sukhbaatar et al. (2015)

use std::path::Path;

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    nn::{Dropout, DropoutConfig, Embedding},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::AttentionBatcher,
    dataset::{read_instances, read_labeled_background, AttentionDataset, AttentionSample},
    instance::LabeledBackgroundInstance,
};
use crate::domain::error::{SolverError, SolverResult};
use crate::ml::encoder::{encode_background, encode_sentences, SentenceEncoder};
use crate::ml::memory_network::merge_with_background;
use crate::ml::selector::KnowledgeSelector;
use crate::ml::trainer::{MemoryNetworkSolver, TextTrainer};

// ─── AttentionModel ───────────────────────────────────────────────────────────

/// The truncated model: the full memory network's stages up to
/// and including the first knowledge selector, with the
/// attention weights as the only output.
#[derive(Module, Debug)]
pub struct AttentionModel<B: Backend> {
    embedding: Embedding<B>,
    encoder:   SentenceEncoder<B>,
    dropout:   Dropout,
    selector:  KnowledgeSelector<B>,
}

impl<B: Backend> AttentionModel<B> {
    /// Shapes: questions [B, S], background [B, K, S] →
    /// attention [B, K+1], question slot first.
    pub fn forward(
        &self,
        questions:  Tensor<B, 2, Int>,
        background: Tensor<B, 3, Int>,
    ) -> Tensor<B, 2> {
        let question_encoded = encode_sentences(&self.embedding, &self.encoder, questions);
        let background_encoded = encode_background(&self.embedding, &self.encoder, background);
        let merged = merge_with_background(question_encoded, background_encoded);
        self.selector.forward(self.dropout.forward(merged))
    }

    pub fn forward_loss(
        &self,
        questions:  Tensor<B, 2, Int>,
        background: Tensor<B, 3, Int>,
        targets:    Tensor<B, 2>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let attention = self.forward(questions, background);
        let loss = attention_loss(attention.clone(), targets);
        (loss, attention)
    }
}

/// Cross entropy between the predicted attention rows and the
/// target distributions. Targets are soft, so this is written
/// out rather than borrowed from the class-index loss.
fn attention_loss<B: Backend>(attention: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    // Soft attention keeps every slot positive; the clamp only
    // guards against float underflow in log.
    let log_attention = attention.clamp_min(1e-7).log();
    (-(targets * log_attention).sum_dim(1)).mean()
}

// ─── AttentionPretrainer ──────────────────────────────────────────────────────

/// Scope guard around one pretraining run. While this value
/// lives, the solver's hard_selection flag reads as disabled;
/// the previous value comes back when it drops.
pub struct AttentionPretrainer<'a, B: AutodiffBackend> {
    solver:                   &'a mut MemoryNetworkSolver<B>,
    saved_hard_selection:     bool,
    pretrain_file:            String,
    pretrain_background_file: String,
}

impl<'a, B: AutodiffBackend> AttentionPretrainer<'a, B> {
    /// Wrap a solver for pretraining. Fails, without touching the
    /// solver's state, when the solver has no background
    /// knowledge selection or the pretraining files are not
    /// configured.
    pub fn new(trainer: &'a mut dyn TextTrainer<B>) -> SolverResult<Self> {
        let solver = trainer.as_memory_network_mut().ok_or_else(|| {
            SolverError::configuration(
                "attention pretraining requires a solver with background knowledge selection",
            )
        })?;

        let pretrain_file = solver.config().pretrain_file.clone().ok_or_else(|| {
            SolverError::configuration("attention pretraining requires --pretrain-file")
        })?;
        let pretrain_background_file =
            solver.config().pretrain_background_file.clone().ok_or_else(|| {
                SolverError::configuration(
                    "attention pretraining requires --pretrain-background-file",
                )
            })?;

        // All checks passed; from here on the solver is ours.
        let saved_hard_selection = solver.hard_selection();
        solver.set_hard_selection(false);
        tracing::info!(
            "Attention pretraining scope opened (hard_selection {} -> off)",
            saved_hard_selection,
        );

        Ok(Self {
            solver,
            saved_hard_selection,
            pretrain_file,
            pretrain_background_file,
        })
    }

    /// The wrapped solver, for reads while the scope is open.
    pub fn solver(&self) -> &MemoryNetworkSolver<B> {
        self.solver
    }

    /// Extend the solver's word dictionary with the words of the
    /// pretraining corpus (question text and background
    /// sentences). Has to run before the solver's model is first
    /// built, so the embedding table covers these words.
    pub fn fit_data_indexer(&mut self) -> SolverResult<()> {
        let instances = self.read_files()?;
        let tokenizer = self.solver.tokenizer();
        let min_count = self.solver.config().min_word_count;

        let mut texts: Vec<String> = Vec::with_capacity(instances.len());
        for instance in &instances {
            texts.push(instance.text().to_string());
            texts.extend(instance.background().iter().cloned());
        }
        self.solver
            .indexer_mut()
            .fit_word_dictionary(&texts, min_count, &tokenizer);
        tracing::info!(
            "Dictionary extended from pretraining files: {} words",
            self.solver.data_indexer().vocab_size(),
        );
        Ok(())
    }

    /// Index and pad the pretraining corpus into attention
    /// samples, preserving file order.
    pub fn load_dataset(&self) -> SolverResult<Vec<AttentionSample>> {
        let instances = self.read_files()?;
        let tokenizer = self.solver.tokenizer();
        let lengths   = self.solver.max_lengths();
        Ok(instances
            .iter()
            .map(|instance| {
                AttentionSample::from_instance(
                    instance,
                    self.solver.data_indexer(),
                    &tokenizer,
                    lengths,
                )
            })
            .collect())
    }

    /// Run the whole pretraining phase and install the trained
    /// stage into the solver's model. Returns the final average
    /// attention loss.
    pub fn pretrain(&mut self) -> Result<f64> {
        self.fit_data_indexer()?;
        let samples = self.load_dataset()?;
        tracing::info!("Loaded {} attention pretraining examples", samples.len());

        let device = self.solver.device();
        let config = self.solver.config().clone();

        let (embedding, encoder, selector) = self.solver.model_mut().attention_stage();
        let mut model = AttentionModel {
            embedding,
            encoder,
            dropout: DropoutConfig::new(config.dropout).init(),
            selector,
        };

        let mut optim = AdamConfig::new().with_epsilon(1e-8).init();
        // No shuffle: sample order stays the file order.
        let loader = DataLoaderBuilder::new(AttentionBatcher::<B>::new(device))
            .batch_size(config.batch_size)
            .num_workers(1)
            .build(AttentionDataset::new(samples));

        let mut final_loss = f64::NAN;
        for epoch in 1..=config.pretrain_epochs {
            let mut loss_sum = 0.0f64;
            let mut batches  = 0usize;

            for batch in loader.iter() {
                let (loss, _) =
                    model.forward_loss(batch.questions, batch.background, batch.targets);
                loss_sum += loss.clone().into_scalar().elem::<f64>();
                batches  += 1;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(config.lr, model, grads);
            }

            final_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
            println!(
                "Pretrain {:>3}/{} | attention_loss={:.4}",
                epoch, config.pretrain_epochs, final_loss,
            );
        }

        let AttentionModel { embedding, encoder, selector, .. } = model;
        self.solver
            .model_mut()
            .install_attention_stage(embedding, encoder, selector);
        tracing::info!("Attention stage installed into the full model");
        Ok(final_loss)
    }

    fn read_files(&self) -> SolverResult<Vec<LabeledBackgroundInstance>> {
        let instances = read_instances(Path::new(&self.pretrain_file))?;
        read_labeled_background(Path::new(&self.pretrain_background_file), instances)
    }
}

impl<'a, B: AutodiffBackend> Drop for AttentionPretrainer<'a, B> {
    fn drop(&mut self) {
        // The restore has to happen on every exit path, early
        // errors included, which is the reason it lives here and
        // not at the end of pretrain().
        self.solver.set_hard_selection(self.saved_hard_selection);
        tracing::info!(
            "Attention pretraining scope closed (hard_selection restored to {})",
            self.saved_hard_selection,
        );
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::ml::encoder::EncoderKind;
    use crate::ml::selector::SelectorKind;
    use crate::ml::trainer::{build_solver, MemoryNetworkSolver, MyBackend, SolverKind};
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{content}").unwrap();
        path.to_string_lossy().into_owned()
    }

    /// Memory network config over a tiny corpus with aligned
    /// pretraining files: 3 examples, 2 background slots each.
    fn pretraining_config(dir: &tempfile::TempDir) -> TrainConfig {
        let train = write_file(dir, "train.tsv", "1\tcats chase mice\t1\n2\tdogs fly\t0\n");
        let background =
            write_file(dir, "bg.tsv", "1\tcats hunt\tmice hide\n2\tdogs bark\tbirds fly\n");
        let pretrain = write_file(
            dir,
            "pretrain.tsv",
            "1\tcats chase mice\t1\n2\tdogs chase cats\t0\n3\tmice fear cats\t1\n",
        );
        let pretrain_background = write_file(
            dir,
            "pretrain_bg.tsv",
            "1\t0\tcats hunt mice\tthe moon is rock\n\
             2\t1\tthe sun is hot\tdogs prowl at night\n\
             3\t0,1\tmice hide well\tcats prowl\n",
        );
        TrainConfig {
            solver: SolverKind::MemoryNetwork,
            train_file: train,
            background_file: Some(background),
            pretrain_file: Some(pretrain),
            pretrain_background_file: Some(pretrain_background),
            encoder: EncoderKind::Bow,
            selector: SelectorKind::DotProduct,
            embedding_size: 4,
            max_sentence_length: 5,
            max_knowledge_length: 2,
            memory_hops: 2,
            hard_selection: true,
            pretrain_epochs: 1,
            batch_size: 2,
            ..TrainConfig::default()
        }
    }

    fn solver(config: TrainConfig) -> MemoryNetworkSolver<MyBackend> {
        MemoryNetworkSolver::new(config, burn::backend::ndarray::NdArrayDevice::default())
    }

    #[test]
    fn test_rejects_solver_without_background_knowledge() {
        let mut plain = build_solver(&TrainConfig::default()).unwrap();
        let err = AttentionPretrainer::new(plain.as_mut()).err().unwrap();
        assert!(matches!(err, SolverError::Configuration(_)));
    }

    #[test]
    fn test_missing_pretrain_files_fail_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = pretraining_config(&dir);
        config.pretrain_file = None;
        let mut solver = solver(config);

        let err = AttentionPretrainer::new(&mut solver).err().unwrap();
        assert!(matches!(err, SolverError::Configuration(_)));
        // The flag was never saved or forced.
        assert!(solver.hard_selection());
    }

    #[test]
    fn test_hard_selection_forced_off_then_restored() {
        let dir = tempfile::tempdir().unwrap();
        let mut solver = solver(pretraining_config(&dir));
        solver.fit_data_indexer().unwrap();

        {
            let mut scope = AttentionPretrainer::new(&mut solver).unwrap();
            // Reads as disabled for the whole scope.
            assert!(!scope.solver().hard_selection());
            scope.pretrain().unwrap();
            assert!(!scope.solver().hard_selection());
        }

        // Restored on the config and on every selector layer.
        assert!(solver.hard_selection());
        assert_eq!(
            solver.model().unwrap().hard_selection_flags(),
            vec![true, true],
        );
    }

    #[test]
    fn test_dropping_without_pretraining_still_restores() {
        let dir = tempfile::tempdir().unwrap();
        let mut solver = solver(pretraining_config(&dir));

        {
            let scope = AttentionPretrainer::new(&mut solver).unwrap();
            assert!(!scope.solver().hard_selection());
        }
        assert!(solver.hard_selection());
    }

    #[test]
    fn test_error_during_pretraining_still_restores() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = pretraining_config(&dir);
        // Background entries that match no pretraining instance.
        config.pretrain_background_file = Some(write_file(
            &dir,
            "misaligned.tsv",
            "8\t0\tstray one\tstray two\n9\t1\tstray three\tstray four\n",
        ));
        let mut solver = solver(config);
        solver.fit_data_indexer().unwrap();

        {
            let mut scope = AttentionPretrainer::new(&mut solver).unwrap();
            assert!(scope.pretrain().is_err());
        }
        assert!(solver.hard_selection());
    }

    #[test]
    fn test_load_dataset_preserves_order_and_distributions() {
        let dir = tempfile::tempdir().unwrap();
        let mut solver = solver(pretraining_config(&dir));

        let mut scope = AttentionPretrainer::new(&mut solver).unwrap();
        scope.fit_data_indexer().unwrap();
        let samples = scope.load_dataset().unwrap();

        assert_eq!(samples.len(), 3);
        for sample in &samples {
            // Question slot + one per background slot.
            assert_eq!(sample.target.len(), 3);
            assert!(sample.target.iter().all(|&w| w >= 0.0));
            let total: f32 = sample.target.iter().sum();
            assert!((total - 1.0).abs() < 1e-6);
        }
        // File order: correct slots 0, 1, then 0 and 1 together,
        // shifted by one for the question slot.
        assert_eq!(samples[0].target, vec![0.0, 1.0, 0.0]);
        assert_eq!(samples[1].target, vec![0.0, 0.0, 1.0]);
        assert_eq!(samples[2].target, vec![0.0, 0.5, 0.5]);
    }

    #[test]
    fn test_fit_makes_pretraining_words_resolvable() {
        let dir = tempfile::tempdir().unwrap();
        let mut solver = solver(pretraining_config(&dir));
        solver.fit_data_indexer().unwrap();
        // Only appears in the pretraining background file.
        assert!(!solver.data_indexer().is_known("prowl"));

        let mut scope = AttentionPretrainer::new(&mut solver).unwrap();
        scope.fit_data_indexer().unwrap();
        assert!(scope.solver().data_indexer().is_known("prowl"));
        assert!(scope.solver().data_indexer().is_known("fear"));
    }

    #[test]
    fn test_attention_model_output_is_one_slot_per_background_plus_question() {
        let dir = tempfile::tempdir().unwrap();
        let mut solver = solver(pretraining_config(&dir));
        solver.fit_data_indexer().unwrap();

        let device = solver.device();
        let (embedding, encoder, selector) = solver.model_mut().attention_stage();
        let model = AttentionModel {
            embedding,
            encoder,
            dropout: DropoutConfig::new(0.0).init(),
            selector,
        };

        let questions = Tensor::<MyBackend, 1, Int>::from_ints(
            [0, 2, 3, 0, 4, 5].as_slice(),
            &device,
        )
        .reshape([2, 3]);
        let background = Tensor::<MyBackend, 1, Int>::from_ints(
            [2, 3, 4, 5, 6, 7, 2, 3, 4, 5, 6, 7].as_slice(),
            &device,
        )
        .reshape([2, 2, 3]);

        let attention = model.forward(questions, background);
        // Two background slots → three output positions.
        assert_eq!(attention.dims(), [2, 3]);

        let rows: Vec<f32> = attention
            .reshape([6])
            .into_data()
            .convert::<f32>()
            .value;
        for row in rows.chunks(3) {
            let total: f32 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_attention_loss_of_known_rows() {
        let device = Default::default();
        let attention = Tensor::<MyBackend, 1>::from_floats([0.5, 0.5].as_slice(), &device)
            .reshape([1, 2]);
        let targets = Tensor::<MyBackend, 1>::from_floats([1.0, 0.0].as_slice(), &device)
            .reshape([1, 2]);

        let loss: f32 = attention_loss(attention, targets).into_scalar().elem::<f32>();
        assert!((loss - 0.5f32.ln().abs()).abs() < 1e-5);
    }

    #[test]
    fn test_pretrain_returns_finite_loss() {
        let dir = tempfile::tempdir().unwrap();
        let mut solver = solver(pretraining_config(&dir));
        solver.fit_data_indexer().unwrap();

        let mut scope = AttentionPretrainer::new(&mut solver).unwrap();
        let loss = scope.pretrain().unwrap();
        assert!(loss.is_finite());
    }
}
