// ============================================================
// Layer 5 — Memory Network Model
// ============================================================
// The background-aware solver's model. Answers true/false for a
// question given a set of background sentences, following the
// End-to-End Memory Networks recipe (Sukhbaatar et al., 2015)
// with the question included as slot 0 of the attention.
//
// Graph, per memory hop:
//   question [B, S], background [B, K, S]
//     → embed + encode                      q [B, D], bg [B, K, D]
//     → merge, question slot first          [B, K+1, D]
//     → dropout
//     → knowledge selector                  attention [B, K+1]
//     → weighted sum of the merged slots    attended [B, D]
//     → memory = memory + attended
// then:
//   entailment on [question; memory]        logits [B, 2]
//
// Each hop owns its selector layer. The attention pretrainer
// trains the embedding, the encoder, and the FIRST selector on
// labeled attention targets, then installs them here; later
// hops keep their fresh weights.

use burn::{
    nn::{
        loss::CrossEntropyLossConfig, Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear,
        LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::encoder::{
    encode_background, encode_sentences, SentenceEncoder, SentenceEncoderConfig,
};
use crate::ml::selector::{KnowledgeSelector, KnowledgeSelectorConfig, KnowledgeSelectorParams};

#[derive(Config, Debug)]
pub struct MemoryNetworkConfig {
    pub vocab_size: usize,
    pub encoder:    SentenceEncoderConfig,
    pub selector:   KnowledgeSelectorParams,
    #[config(default = 1)]
    pub memory_hops: usize,
    #[config(default = 0.2)]
    pub dropout: f64,
}

#[derive(Module, Debug)]
pub struct MemoryNetworkModel<B: Backend> {
    embedding:     Embedding<B>,
    encoder:       SentenceEncoder<B>,
    selectors:     Vec<KnowledgeSelector<B>>,
    dropout:       Dropout,
    entail_hidden: Linear<B>,
    entail_out:    Linear<B>,
}

impl MemoryNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MemoryNetworkModel<B> {
        let embedding =
            EmbeddingConfig::new(self.vocab_size, self.encoder.embedding_size).init(device);
        let encoder = self.encoder.init(device);
        let d = encoder.output_size();

        let selectors = (0..self.memory_hops.max(1))
            .map(|_| KnowledgeSelectorConfig::new(self.selector, d).init(device))
            .collect();

        MemoryNetworkModel {
            embedding,
            encoder,
            selectors,
            dropout:       DropoutConfig::new(self.dropout).init(),
            entail_hidden: LinearConfig::new(d * 2, d).init(device),
            entail_out:    LinearConfig::new(d, 2).init(device),
        }
    }
}

impl<B: Backend> MemoryNetworkModel<B> {
    /// Shapes: questions [B, S], background [B, K, S] → logits [B, 2].
    pub fn forward(
        &self,
        questions:  Tensor<B, 2, Int>,
        background: Tensor<B, 3, Int>,
    ) -> Tensor<B, 2> {
        let question_encoded = encode_sentences(&self.embedding, &self.encoder, questions);
        let background_encoded = encode_background(&self.embedding, &self.encoder, background);

        let mut memory = question_encoded.clone();
        for selector in &self.selectors {
            let merged = merge_with_background(memory.clone(), background_encoded.clone());
            // Attention is computed on the regularized tensor, the
            // weighted sum runs over the clean one.
            let attention = selector.forward(self.dropout.forward(merged.clone()));

            let [b, slots, d] = merged.dims();
            let attended = (merged * attention.reshape([b, slots, 1]).expand([b, slots, d]))
                .sum_dim(1)
                .reshape([b, d]);
            memory = memory + attended;
        }

        let features = Tensor::cat(vec![question_encoded, memory], 1);
        let hidden = relu(self.entail_hidden.forward(self.dropout.forward(features)));
        self.entail_out.forward(hidden)
    }

    pub fn forward_loss(
        &self,
        questions:  Tensor<B, 2, Int>,
        background: Tensor<B, 3, Int>,
        labels:     Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(questions, background);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels);
        (loss, logits)
    }

    /// Flip hard selection on every selector layer at once.
    pub fn set_hard_selection(&mut self, hard_selection: bool) {
        for selector in &mut self.selectors {
            selector.set_hard_selection(hard_selection);
        }
    }

    /// Current hard-selection flag of each selector layer, in hop
    /// order.
    pub fn hard_selection_flags(&self) -> Vec<bool> {
        self.selectors.iter().map(KnowledgeSelector::hard_selection).collect()
    }

    /// Clones of the shared prefix modules: embedding, encoder,
    /// and the first hop's selector. The pretrainer starts from
    /// these so earlier training is never thrown away.
    pub fn attention_stage(
        &self,
    ) -> (Embedding<B>, SentenceEncoder<B>, KnowledgeSelector<B>) {
        (
            self.embedding.clone(),
            self.encoder.clone(),
            self.selectors[0].clone(),
        )
    }

    /// Adopt pretrained weights for the shared prefix: embedding,
    /// encoder, and the first hop's selector. Later hops keep
    /// their existing weights.
    pub fn install_attention_stage(
        &mut self,
        embedding: Embedding<B>,
        encoder:   SentenceEncoder<B>,
        selector:  KnowledgeSelector<B>,
    ) {
        self.embedding = embedding;
        self.encoder   = encoder;
        if let Some(first) = self.selectors.first_mut() {
            *first = selector;
        }
    }
}

/// Concatenate the question encoding, as slot 0, in front of the
/// background encodings.
///
/// Shapes: question [B, D], background [B, K, D] → [B, K+1, D].
pub fn merge_with_background<B: Backend>(
    question:   Tensor<B, 2>,
    background: Tensor<B, 3>,
) -> Tensor<B, 3> {
    let [b, d] = question.dims();
    Tensor::cat(vec![question.reshape([b, 1, d]), background], 1)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::encoder::EncoderKind;
    use crate::ml::selector::SelectorKind;

    type TestBackend = burn::backend::NdArray;

    fn config(memory_hops: usize, hard_selection: bool) -> MemoryNetworkConfig {
        MemoryNetworkConfig::new(
            30,
            SentenceEncoderConfig::new(EncoderKind::Bow, 4, 4),
            KnowledgeSelectorParams {
                kind: SelectorKind::DotProduct,
                hidden_size: 4,
                hard_selection,
            },
        )
        .with_memory_hops(memory_hops)
    }

    #[test]
    fn test_merge_puts_question_in_slot_zero() {
        let device = Default::default();
        let question = Tensor::<TestBackend, 1>::from_floats([7.0, 8.0].as_slice(), &device)
            .reshape([1, 2]);
        let background = Tensor::<TestBackend, 1>::from_floats(
            [1.0, 2.0, 3.0, 4.0].as_slice(),
            &device,
        )
        .reshape([1, 2, 2]);

        let merged = merge_with_background(question, background);
        assert_eq!(merged.dims(), [1, 3, 2]);
        let flat: Vec<f32> = merged.reshape([6]).into_data().convert::<f32>().value;
        assert_eq!(flat, vec![7.0, 8.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_forward_logit_shape_with_two_hops() {
        let device = Default::default();
        let model = config(2, false).init::<TestBackend>(&device);

        let questions = Tensor::<TestBackend, 1, Int>::from_ints(
            [0, 3, 5, 0, 2, 9].as_slice(),
            &device,
        )
        .reshape([2, 3]);
        let background = Tensor::<TestBackend, 1, Int>::from_ints(
            [1, 2, 3, 4, 5, 6, 7, 8, 9, 1, 0, 0].as_slice(),
            &device,
        )
        .reshape([2, 2, 3]);

        assert_eq!(model.forward(questions, background).dims(), [2, 2]);
    }

    #[test]
    fn test_set_hard_selection_reaches_every_layer() {
        let device = Default::default();
        let mut model = config(3, true).init::<TestBackend>(&device);
        assert_eq!(model.hard_selection_flags(), vec![true, true, true]);

        model.set_hard_selection(false);
        assert_eq!(model.hard_selection_flags(), vec![false, false, false]);
    }

    #[test]
    fn test_install_attention_stage_replaces_first_selector_only() {
        let device = Default::default();
        let mut model = config(2, true).init::<TestBackend>(&device);

        let donor = config(1, false).init::<TestBackend>(&device);
        let (embedding, encoder) = (donor.embedding, donor.encoder);
        let selector = donor.selectors.into_iter().next().unwrap();

        model.install_attention_stage(embedding, encoder, selector);
        // The installed layer carries its own flag until the owner
        // restores it; the second hop is untouched.
        assert_eq!(model.hard_selection_flags(), vec![false, true]);
    }
}
