// ============================================================
// Layer 5 — Solvers and Training Loops
// ============================================================
// The two solvers behind the `train` command, behind one trait:
//
//   TrueFalseSolver      sentence in, true/false out
//   MemoryNetworkSolver  sentence + background in, true/false out
//
// Both own their training config, word indexer, and (lazily
// built) model, and run the same epoch loop shape: train on the
// autodiff backend, validate on the inner backend, checkpoint
// every epoch. The attention pretrainer reaches the memory
// network solver through the TextTrainer capability accessor
// instead of downcasting.
//
// Key Burn 0.13 insight:
//   - Training uses MyBackend (Autodiff<NdArray>) for gradients
//   - model.valid() returns the model on MyInnerBackend (NdArray)
//   - Validation batcher must also use MyInnerBackend
//   - argmax(1) returns [batch,1] so we flatten before .equal()
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::path::Path;

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{MemoryBatcher, SentenceBatcher},
    dataset::{
        read_background, read_instances, MemoryDataset, MemorySample, SentenceDataset,
        SentenceSample,
    },
    indexer::DataIndexer,
    instance::{BackgroundInstance, TextInstance},
    splitter::split_train_val,
    tokenizer::WordTokenizer,
};
use crate::domain::error::{SolverError, SolverResult};
use crate::domain::max_lengths::MaxLengths;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::encoder::SentenceEncoderConfig;
use crate::ml::memory_network::{MemoryNetworkConfig, MemoryNetworkModel};
use crate::ml::selector::KnowledgeSelectorParams;
use crate::ml::true_false::{TrueFalseConfig, TrueFalseModel};

pub type MyBackend      = burn::backend::Autodiff<burn::backend::NdArray>;
pub type MyInnerBackend = burn::backend::NdArray;

// ─── Solver kind ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    TrueFalse,
    MemoryNetwork,
}

// ─── TextTrainer trait ────────────────────────────────────────────────────────

/// What every solver offers the application layer. Object safe,
/// so the use case can hold a Box<dyn TextTrainer> picked from
/// config at runtime.
pub trait TextTrainer<B: AutodiffBackend> {
    fn kind(&self) -> SolverKind;

    /// Build the word dictionary from the training files. Must
    /// run before the first model access, because the embedding
    /// table is sized from the fitted vocabulary.
    fn fit_data_indexer(&mut self) -> SolverResult<()>;

    fn data_indexer(&self) -> &DataIndexer;

    /// Run the full epoch loop, checkpointing every epoch.
    fn train(&mut self, checkpoints: &CheckpointManager, metrics: &mut MetricsLogger)
        -> Result<()>;

    /// Capability accessor: Some only for solvers whose model
    /// selects over background knowledge. The attention
    /// pretrainer refuses solvers that return None here.
    fn as_memory_network_mut(&mut self) -> Option<&mut MemoryNetworkSolver<B>> {
        None
    }
}

/// Model architecture for the true/false solver, derived from
/// the training config and the fitted vocabulary size. The
/// scorer uses the same mapping to rebuild the model that a
/// checkpoint was saved from.
pub fn true_false_model_config(config: &TrainConfig, vocab_size: usize) -> TrueFalseConfig {
    TrueFalseConfig::new(
        vocab_size,
        SentenceEncoderConfig::new(
            config.encoder,
            config.embedding_size,
            config.encoder_hidden_size,
        ),
    )
    .with_dropout(config.dropout)
}

/// Model architecture for the memory network solver, same deal.
pub fn memory_network_model_config(config: &TrainConfig, vocab_size: usize) -> MemoryNetworkConfig {
    MemoryNetworkConfig::new(
        vocab_size,
        SentenceEncoderConfig::new(
            config.encoder,
            config.embedding_size,
            config.encoder_hidden_size,
        ),
        KnowledgeSelectorParams {
            kind:           config.selector,
            hidden_size:    config.selector_hidden_size,
            hard_selection: config.hard_selection,
        },
    )
    .with_memory_hops(config.memory_hops)
    .with_dropout(config.dropout)
}

/// Pick and construct the solver named by the config.
pub fn build_solver(config: &TrainConfig) -> SolverResult<Box<dyn TextTrainer<MyBackend>>> {
    let device = burn::backend::ndarray::NdArrayDevice::default();
    match config.solver {
        SolverKind::TrueFalse => Ok(Box::new(TrueFalseSolver::new(config.clone(), device))),
        SolverKind::MemoryNetwork => {
            if config.background_file.is_none() {
                return Err(SolverError::configuration(
                    "the memory_network solver requires --background-file",
                ));
            }
            Ok(Box::new(MemoryNetworkSolver::new(config.clone(), device)))
        }
    }
}

// ─── TrueFalseSolver ──────────────────────────────────────────────────────────

/// Baseline solver: classify single sentences as true or false,
/// no background knowledge involved.
pub struct TrueFalseSolver<B: AutodiffBackend> {
    config:    TrainConfig,
    device:    B::Device,
    tokenizer: WordTokenizer,
    indexer:   DataIndexer,
    model:     Option<TrueFalseModel<B>>,
}

impl<B: AutodiffBackend> TrueFalseSolver<B> {
    pub fn new(config: TrainConfig, device: B::Device) -> Self {
        Self {
            config,
            device,
            tokenizer: WordTokenizer::new(),
            indexer:   DataIndexer::new(),
            model:     None,
        }
    }

    fn max_lengths(&self) -> MaxLengths {
        MaxLengths::new(self.config.max_sentence_length, self.config.max_knowledge_length)
    }

    fn model_mut(&mut self) -> &mut TrueFalseModel<B> {
        let model_config = true_false_model_config(&self.config, self.indexer.vocab_size());
        let device = self.device.clone();
        self.model.get_or_insert_with(|| model_config.init(&device))
    }

    fn samples(&self, path: &Path, instances: &[TextInstance]) -> SolverResult<Vec<SentenceSample>> {
        instances
            .iter()
            .map(|instance| {
                SentenceSample::from_instance(
                    instance,
                    &self.indexer,
                    &self.tokenizer,
                    self.max_lengths(),
                )
                .map_err(|detail| SolverError::data_format(path, detail))
            })
            .collect()
    }

    /// Training and validation samples: a separate validation
    /// file when configured, otherwise a random split.
    fn load_datasets(&self) -> SolverResult<(SentenceDataset, SentenceDataset)> {
        let train_path = Path::new(&self.config.train_file);
        let train_samples = self.samples(train_path, &read_instances(train_path)?)?;

        let (train, val) = match &self.config.validation_file {
            Some(file) => {
                let val_path = Path::new(file);
                let val = self.samples(val_path, &read_instances(val_path)?)?;
                (train_samples, val)
            }
            None => split_train_val(train_samples, self.config.train_fraction),
        };
        Ok((SentenceDataset::new(train), SentenceDataset::new(val)))
    }
}

impl<B: AutodiffBackend> TextTrainer<B> for TrueFalseSolver<B> {
    fn kind(&self) -> SolverKind {
        SolverKind::TrueFalse
    }

    fn fit_data_indexer(&mut self) -> SolverResult<()> {
        let instances = read_instances(Path::new(&self.config.train_file))?;
        let texts: Vec<String> = instances.iter().map(|i| i.text.clone()).collect();
        self.indexer
            .fit_word_dictionary(&texts, self.config.min_word_count, &self.tokenizer);
        tracing::info!("Fitted word dictionary: {} words", self.indexer.vocab_size());
        Ok(())
    }

    fn data_indexer(&self) -> &DataIndexer {
        &self.indexer
    }

    fn train(
        &mut self,
        checkpoints: &CheckpointManager,
        metrics:     &mut MetricsLogger,
    ) -> Result<()> {
        let (train_dataset, val_dataset) = self.load_datasets()?;
        let device = self.device.clone();
        let config = self.config.clone();
        // Train a clone; the solver keeps its model only once the
        // whole loop has succeeded.
        let mut model = self.model_mut().clone();

        let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

        let train_loader = DataLoaderBuilder::new(SentenceBatcher::<B>::new(device.clone()))
            .batch_size(config.batch_size)
            .shuffle(42)
            .num_workers(1)
            .build(train_dataset);
        let val_loader =
            DataLoaderBuilder::new(SentenceBatcher::<B::InnerBackend>::new(device.clone()))
                .batch_size(config.batch_size)
                .num_workers(1)
                .build(val_dataset);

        let mut best_val_loss = f64::INFINITY;
        let mut best_epoch    = 0usize;

        for epoch in 1..=config.epochs {
            // ── Training phase ────────────────────────────────────────────────
            let mut train_loss_sum = 0.0f64;
            let mut train_batches  = 0usize;

            for batch in train_loader.iter() {
                let (loss, _) = model.forward_loss(batch.tokens, batch.labels);
                train_loss_sum += loss.clone().into_scalar().elem::<f64>();
                train_batches  += 1;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(config.lr, model, grads);
            }
            let avg_train_loss = average(train_loss_sum, train_batches);

            // ── Validation phase ──────────────────────────────────────────────
            let model_valid = model.valid();
            let mut val_loss_sum = 0.0f64;
            let mut val_batches  = 0usize;
            let mut correct      = 0usize;
            let mut total        = 0usize;

            for batch in val_loader.iter() {
                let (loss, logits) = model_valid.forward_loss(batch.tokens, batch.labels.clone());
                val_loss_sum += loss.into_scalar().elem::<f64>();
                val_batches  += 1;

                total   += batch.labels.dims()[0];
                correct += count_correct(logits, batch.labels);
            }
            let avg_val_loss = average(val_loss_sum, val_batches);
            let accuracy     = if total > 0 { correct as f64 / total as f64 } else { 0.0 };

            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}%",
                epoch, config.epochs, avg_train_loss, avg_val_loss, accuracy * 100.0,
            );

            let epoch_metrics = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, accuracy);
            if epoch_metrics.is_improvement(best_val_loss) {
                best_val_loss = epoch_metrics.val_loss;
                best_epoch    = epoch;
            }
            checkpoints.save_model(&model, epoch)?;
            metrics.log(&epoch_metrics)?;
        }

        self.model = Some(model);
        if best_epoch > 0 {
            tracing::info!("Best epoch: {} (val_loss={:.4})", best_epoch, best_val_loss);
        }
        tracing::info!("Training complete!");
        Ok(())
    }
}

// ─── MemoryNetworkSolver ──────────────────────────────────────────────────────

/// Background-aware solver. Beyond the TextTrainer surface it
/// exposes the knobs the attention pretrainer works with: the
/// lazily built model, the shared hard-selection flag, and the
/// indexer for extending the vocabulary with pretraining text.
pub struct MemoryNetworkSolver<B: AutodiffBackend> {
    config:    TrainConfig,
    device:    B::Device,
    tokenizer: WordTokenizer,
    indexer:   DataIndexer,
    model:     Option<MemoryNetworkModel<B>>,
}

impl<B: AutodiffBackend> MemoryNetworkSolver<B> {
    pub fn new(config: TrainConfig, device: B::Device) -> Self {
        Self {
            config,
            device,
            tokenizer: WordTokenizer::new(),
            indexer:   DataIndexer::new(),
            model:     None,
        }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn device(&self) -> B::Device {
        self.device.clone()
    }

    pub fn tokenizer(&self) -> WordTokenizer {
        self.tokenizer.clone()
    }

    pub fn indexer_mut(&mut self) -> &mut DataIndexer {
        &mut self.indexer
    }

    pub fn max_lengths(&self) -> MaxLengths {
        MaxLengths::new(self.config.max_sentence_length, self.config.max_knowledge_length)
    }

    /// The solver's model, built on first access. The embedding
    /// table is sized from the vocabulary at that moment, so all
    /// dictionary fitting has to happen first.
    pub fn model_mut(&mut self) -> &mut MemoryNetworkModel<B> {
        let model_config = memory_network_model_config(&self.config, self.indexer.vocab_size());
        let device = self.device.clone();
        self.model.get_or_insert_with(|| model_config.init(&device))
    }

    pub fn model(&self) -> Option<&MemoryNetworkModel<B>> {
        self.model.as_ref()
    }

    /// The shared hard-selection flag, read from the config.
    pub fn hard_selection(&self) -> bool {
        self.config.hard_selection
    }

    /// Set hard selection on the config AND on every selector
    /// layer of the model, if one is built. Keeping the two in
    /// lockstep is what the pretrainer's save/force/restore
    /// dance relies on.
    pub fn set_hard_selection(&mut self, hard_selection: bool) {
        self.config.hard_selection = hard_selection;
        if let Some(model) = &mut self.model {
            model.set_hard_selection(hard_selection);
        }
    }

    fn background_file(&self) -> SolverResult<&str> {
        self.config.background_file.as_deref().ok_or_else(|| {
            SolverError::configuration("the memory_network solver requires --background-file")
        })
    }

    fn samples(
        &self,
        path:      &Path,
        instances: &[BackgroundInstance],
    ) -> SolverResult<Vec<MemorySample>> {
        instances
            .iter()
            .map(|instance| {
                MemorySample::from_instance(
                    instance,
                    &self.indexer,
                    &self.tokenizer,
                    self.max_lengths(),
                )
                .map_err(|detail| SolverError::data_format(path, detail))
            })
            .collect()
    }

    fn read_joined(&self, train_file: &str, background_file: &str)
        -> SolverResult<Vec<BackgroundInstance>>
    {
        let instances = read_instances(Path::new(train_file))?;
        read_background(Path::new(background_file), instances)
    }

    fn load_datasets(&self) -> SolverResult<(MemoryDataset, MemoryDataset)> {
        let background_file = self.background_file()?.to_string();
        let train_joined = self.read_joined(&self.config.train_file, &background_file)?;
        let train_samples = self.samples(Path::new(&self.config.train_file), &train_joined)?;

        let (train, val) = match &self.config.validation_file {
            Some(file) => {
                let val_background = self.config.validation_background_file.as_deref().ok_or_else(
                    || {
                        SolverError::configuration(
                            "--validation-file needs --validation-background-file \
                             for the memory_network solver",
                        )
                    },
                )?;
                let val_joined = self.read_joined(file, val_background)?;
                let val = self.samples(Path::new(file), &val_joined)?;
                (train_samples, val)
            }
            None => split_train_val(train_samples, self.config.train_fraction),
        };
        Ok((MemoryDataset::new(train), MemoryDataset::new(val)))
    }
}

impl<B: AutodiffBackend> TextTrainer<B> for MemoryNetworkSolver<B> {
    fn kind(&self) -> SolverKind {
        SolverKind::MemoryNetwork
    }

    fn fit_data_indexer(&mut self) -> SolverResult<()> {
        let background_file = self.background_file()?.to_string();
        let joined = self.read_joined(&self.config.train_file, &background_file)?;

        let mut texts: Vec<String> = Vec::with_capacity(joined.len());
        for instance in &joined {
            texts.push(instance.text().to_string());
            texts.extend(instance.background.iter().cloned());
        }
        self.indexer
            .fit_word_dictionary(&texts, self.config.min_word_count, &self.tokenizer);
        tracing::info!("Fitted word dictionary: {} words", self.indexer.vocab_size());
        Ok(())
    }

    fn data_indexer(&self) -> &DataIndexer {
        &self.indexer
    }

    fn train(
        &mut self,
        checkpoints: &CheckpointManager,
        metrics:     &mut MetricsLogger,
    ) -> Result<()> {
        let (train_dataset, val_dataset) = self.load_datasets()?;
        let device = self.device.clone();
        let config = self.config.clone();
        let mut model = self.model_mut().clone();

        let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

        let train_loader = DataLoaderBuilder::new(MemoryBatcher::<B>::new(device.clone()))
            .batch_size(config.batch_size)
            .shuffle(42)
            .num_workers(1)
            .build(train_dataset);
        let val_loader =
            DataLoaderBuilder::new(MemoryBatcher::<B::InnerBackend>::new(device.clone()))
                .batch_size(config.batch_size)
                .num_workers(1)
                .build(val_dataset);

        let mut best_val_loss = f64::INFINITY;
        let mut best_epoch    = 0usize;

        for epoch in 1..=config.epochs {
            // ── Training phase ────────────────────────────────────────────────
            let mut train_loss_sum = 0.0f64;
            let mut train_batches  = 0usize;

            for batch in train_loader.iter() {
                let (loss, _) =
                    model.forward_loss(batch.questions, batch.background, batch.labels);
                train_loss_sum += loss.clone().into_scalar().elem::<f64>();
                train_batches  += 1;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(config.lr, model, grads);
            }
            let avg_train_loss = average(train_loss_sum, train_batches);

            // ── Validation phase ──────────────────────────────────────────────
            let model_valid = model.valid();
            let mut val_loss_sum = 0.0f64;
            let mut val_batches  = 0usize;
            let mut correct      = 0usize;
            let mut total        = 0usize;

            for batch in val_loader.iter() {
                let (loss, logits) = model_valid.forward_loss(
                    batch.questions,
                    batch.background,
                    batch.labels.clone(),
                );
                val_loss_sum += loss.into_scalar().elem::<f64>();
                val_batches  += 1;

                total   += batch.labels.dims()[0];
                correct += count_correct(logits, batch.labels);
            }
            let avg_val_loss = average(val_loss_sum, val_batches);
            let accuracy     = if total > 0 { correct as f64 / total as f64 } else { 0.0 };

            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}%",
                epoch, config.epochs, avg_train_loss, avg_val_loss, accuracy * 100.0,
            );

            let epoch_metrics = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, accuracy);
            if epoch_metrics.is_improvement(best_val_loss) {
                best_val_loss = epoch_metrics.val_loss;
                best_epoch    = epoch;
            }
            checkpoints.save_model(&model, epoch)?;
            metrics.log(&epoch_metrics)?;
        }

        self.model = Some(model);
        if best_epoch > 0 {
            tracing::info!("Best epoch: {} (val_loss={:.4})", best_epoch, best_val_loss);
        }
        tracing::info!("Training complete!");
        Ok(())
    }

    fn as_memory_network_mut(&mut self) -> Option<&mut MemoryNetworkSolver<B>> {
        Some(self)
    }
}

// ─── Loop helpers ─────────────────────────────────────────────────────────────

fn average(sum: f64, batches: usize) -> f64 {
    if batches > 0 { sum / batches as f64 } else { f64::NAN }
}

/// Count correct predictions in one batch.
/// argmax(1) returns shape [batch, 1] — flatten to [batch]
/// before comparing with the labels which are [batch].
fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = predicted.equal(labels).int().sum().into_scalar().elem::<i64>();
    correct as usize
}
