// ============================================================
// Layer 4 — Batchers
// ============================================================
// Implements Burn's Batcher trait to convert sample Vecs into
// backend tensors, one batcher per sample kind:
//
//   SentenceBatcher   [N] sentences         → tokens [N, S], labels [N]
//   MemoryBatcher     [N] question+bg sets  → questions [N, S],
//                                             background [N, K, S], labels [N]
//   AttentionBatcher  [N] pretraining exs   → questions [N, S],
//                                             background [N, K, S],
//                                             targets [N, K+1]
//
// How batching works here:
//   All sequences are already padded to the same lengths when the
//   samples are built, so each batcher just flattens the ids into
//   one long Vec and reshapes:
//   [s1_t1, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]
//   Background sets flatten one level deeper and reshape to
//   [N, K, S].
//
// Attention targets are float distributions, not class ids, so
// they go through Tensor::from_floats instead of from_ints.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::{AttentionSample, MemorySample, SentenceSample};

// ─── SentenceBatcher ──────────────────────────────────────────────────────────

/// A batch of labeled sentences ready for the true/false model.
#[derive(Debug, Clone)]
pub struct SentenceBatch<B: Backend> {
    /// Word index sequences — shape: [batch_size, sentence_len]
    pub tokens: Tensor<B, 2, Int>,

    /// True/false labels — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct SentenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SentenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SentenceSample, SentenceBatch<B>> for SentenceBatcher<B> {
    fn batch(&self, items: Vec<SentenceSample>) -> SentenceBatch<B> {
        let batch_size = items.len();
        // All sequences have the same length (pre-padded)
        let seq_len    = items[0].tokens.len();

        let token_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.tokens.iter().map(|&x| x as i32))
            .collect();

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        SentenceBatch {
            tokens: Tensor::<B, 1, Int>::from_ints(token_flat.as_slice(), &self.device)
                .reshape([batch_size, seq_len]),
            labels: Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device),
        }
    }
}

// ─── MemoryBatcher ────────────────────────────────────────────────────────────

/// A batch of questions with their background sets, for the
/// memory network model.
#[derive(Debug, Clone)]
pub struct MemoryBatch<B: Backend> {
    /// Question word indices — shape: [batch_size, sentence_len]
    pub questions: Tensor<B, 2, Int>,

    /// Background word indices — shape: [batch_size, background_len, sentence_len]
    pub background: Tensor<B, 3, Int>,

    /// True/false labels — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct MemoryBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> MemoryBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<MemorySample, MemoryBatch<B>> for MemoryBatcher<B> {
    fn batch(&self, items: Vec<MemorySample>) -> MemoryBatch<B> {
        let batch_size = items.len();
        let seq_len    = items[0].question.len();
        let slots      = items[0].background.len();

        let question_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.question.iter().map(|&x| x as i32))
            .collect();

        // Background flattens one level deeper: sample → row → token
        let background_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.background.iter().flatten().map(|&x| x as i32))
            .collect();

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        MemoryBatch {
            questions: Tensor::<B, 1, Int>::from_ints(question_flat.as_slice(), &self.device)
                .reshape([batch_size, seq_len]),
            background: Tensor::<B, 1, Int>::from_ints(background_flat.as_slice(), &self.device)
                .reshape([batch_size, slots, seq_len]),
            labels: Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device),
        }
    }
}

// ─── AttentionBatcher ─────────────────────────────────────────────────────────

/// A batch of attention pretraining examples. Targets are soft
/// distributions over background + 1 slots, question slot first.
#[derive(Debug, Clone)]
pub struct AttentionBatch<B: Backend> {
    /// Question word indices — shape: [batch_size, sentence_len]
    pub questions: Tensor<B, 2, Int>,

    /// Background word indices — shape: [batch_size, background_len, sentence_len]
    pub background: Tensor<B, 3, Int>,

    /// Target attention distributions — shape: [batch_size, background_len + 1]
    pub targets: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct AttentionBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> AttentionBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<AttentionSample, AttentionBatch<B>> for AttentionBatcher<B> {
    fn batch(&self, items: Vec<AttentionSample>) -> AttentionBatch<B> {
        let batch_size = items.len();
        let seq_len    = items[0].question.len();
        let slots      = items[0].background.len();
        let target_len = items[0].target.len();

        let question_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.question.iter().map(|&x| x as i32))
            .collect();

        let background_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.background.iter().flatten().map(|&x| x as i32))
            .collect();

        let target_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.target.iter().copied())
            .collect();

        AttentionBatch {
            questions: Tensor::<B, 1, Int>::from_ints(question_flat.as_slice(), &self.device)
                .reshape([batch_size, seq_len]),
            background: Tensor::<B, 1, Int>::from_ints(background_flat.as_slice(), &self.device)
                .reshape([batch_size, slots, seq_len]),
            targets: Tensor::<B, 1>::from_floats(target_flat.as_slice(), &self.device)
                .reshape([batch_size, target_len]),
        }
    }
}
