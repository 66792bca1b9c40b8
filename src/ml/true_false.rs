// ============================================================
// Layer 5 — True/False Sentence Model
// ============================================================
// The baseline solver's model: decide whether a single sentence
// is true or false, with no background knowledge involved.
//
// Graph:
//   tokens [B, S]
//     → embed + encode              [B, D]   (shared stages)
//     → dropout
//     → projector + relu            [B, D/2]
//     → classifier                  [B, 2]   logits
//
// Training uses cross-entropy against the 0/1 labels. The model
// exists mostly as the simplest end of the solver family; the
// memory network reuses the same embedding and encoder stages.
//
// Reference: Burn Book §5 (Modules)

use burn::{
    nn::{
        loss::CrossEntropyLossConfig, Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear,
        LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::encoder::{encode_sentences, SentenceEncoder, SentenceEncoderConfig};

#[derive(Config, Debug)]
pub struct TrueFalseConfig {
    pub vocab_size: usize,
    pub encoder:    SentenceEncoderConfig,
    #[config(default = 0.2)]
    pub dropout:    f64,
}

#[derive(Module, Debug)]
pub struct TrueFalseModel<B: Backend> {
    embedding:  Embedding<B>,
    encoder:    SentenceEncoder<B>,
    dropout:    Dropout,
    projector:  Linear<B>,
    classifier: Linear<B>,
}

impl TrueFalseConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TrueFalseModel<B> {
        let embedding =
            EmbeddingConfig::new(self.vocab_size, self.encoder.embedding_size).init(device);
        let encoder = self.encoder.init(device);
        let hidden  = (encoder.output_size() / 2).max(1);

        TrueFalseModel {
            embedding,
            projector:  LinearConfig::new(encoder.output_size(), hidden).init(device),
            classifier: LinearConfig::new(hidden, 2).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            encoder,
        }
    }
}

impl<B: Backend> TrueFalseModel<B> {
    /// Shapes: tokens [B, S] → logits [B, 2].
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let encoded = encode_sentences(&self.embedding, &self.encoder, tokens);
        let hidden  = relu(self.projector.forward(self.dropout.forward(encoded)));
        self.classifier.forward(hidden)
    }

    /// Forward pass plus cross-entropy loss, for the train loop.
    pub fn forward_loss(
        &self,
        tokens: Tensor<B, 2, Int>,
        labels: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(tokens);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels);
        (loss, logits)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::encoder::EncoderKind;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_forward_logit_shape() {
        let device = Default::default();
        let model = TrueFalseConfig::new(
            20,
            SentenceEncoderConfig::new(EncoderKind::Bow, 6, 6),
        )
        .init::<TestBackend>(&device);

        let tokens = Tensor::<TestBackend, 1, Int>::from_ints(
            [0, 3, 5, 0, 0, 7].as_slice(),
            &device,
        )
        .reshape([2, 3]);

        assert_eq!(model.forward(tokens).dims(), [2, 2]);
    }

    #[test]
    fn test_forward_loss_is_finite_scalar() {
        let device = Default::default();
        let model = TrueFalseConfig::new(
            20,
            SentenceEncoderConfig::new(EncoderKind::Bow, 6, 6),
        )
        .init::<TestBackend>(&device);

        let tokens = Tensor::<TestBackend, 1, Int>::from_ints([3, 5, 7, 2].as_slice(), &device)
            .reshape([2, 2]);
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([1, 0].as_slice(), &device);

        let (loss, logits) = model.forward_loss(tokens, labels);
        assert_eq!(logits.dims(), [2, 2]);
        let value: f32 = loss.into_scalar();
        assert!(value.is_finite());
    }
}
