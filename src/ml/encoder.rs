// ============================================================
// Layer 5 — Sentence Encoders
// ============================================================
// Turns padded word-index sequences into fixed-size sentence
// vectors. Two encoder kinds, selected by config:
//
//   bow   Masked mean of the word embeddings. No parameters of
//         its own, output size = embedding size.
//   lstm  Final hidden state of an LSTM over the embeddings,
//         output size = hidden size.
//
// Sequences are LEFT-padded, so for the LSTM the last timestep
// is always the real final word and no mask juggling is needed
// to read off the final state. The BOW mean masks padding
// explicitly.
//
// The free functions below are the named stages every model in
// this crate is composed from. The pretrainer rebuilds a prefix
// of the memory network from these same stages, which is what
// keeps its graph and the full model's graph in sync.
//
// Reference: Burn Book §5 (Modules)

use burn::{
    nn::{Embedding, Lstm, LstmConfig},
    prelude::*,
};

// ─── Encoder kind ─────────────────────────────────────────────────────────────

/// Which sentence encoder to build. Serialized into the training
/// config, so spelled in snake_case on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    Bow,
    Lstm,
}

// ─── SentenceEncoder ──────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct SentenceEncoderConfig {
    pub kind:           EncoderKind,
    pub embedding_size: usize,
    pub hidden_size:    usize,
}

/// Sentence encoder module. `lstm` is None for the BOW kind,
/// which keeps the module tree identical across checkpoints of
/// the same configuration.
#[derive(Module, Debug)]
pub struct SentenceEncoder<B: Backend> {
    lstm:        Option<Lstm<B>>,
    output_size: usize,
}

impl SentenceEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SentenceEncoder<B> {
        let lstm = match self.kind {
            EncoderKind::Bow  => None,
            EncoderKind::Lstm => {
                Some(LstmConfig::new(self.embedding_size, self.hidden_size, true).init(device))
            }
        };
        let output_size = match self.kind {
            EncoderKind::Bow  => self.embedding_size,
            EncoderKind::Lstm => self.hidden_size,
        };
        SentenceEncoder { lstm, output_size }
    }
}

impl<B: Backend> SentenceEncoder<B> {
    /// Size of the sentence vectors this encoder produces.
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Encode embedded sentences.
    ///
    /// Shapes: embedded [N, S, E], mask [N, S] → output [N, D]
    /// where D is `output_size()`.
    pub fn forward(&self, embedded: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 2> {
        match &self.lstm {
            None => {
                // Masked mean: zero out padding embeddings, then
                // divide by the real word count per sentence.
                let [n, s, e] = embedded.dims();
                let mask3  = mask.clone().reshape([n, s, 1]);
                let summed = (embedded * mask3.expand([n, s, e]))
                    .sum_dim(1)
                    .reshape([n, e]);
                let counts = mask.sum_dim(1).reshape([n, 1]).clamp_min(1.0);
                summed / counts.expand([n, e])
            }
            Some(lstm) => {
                let (_cells, hidden) = lstm.forward(embedded, None);
                // Left padding puts the final word at the last
                // timestep, so slicing it off gives the final state.
                let [n, s, h] = hidden.dims();
                hidden.slice([0..n, (s - 1)..s, 0..h]).reshape([n, h])
            }
        }
    }
}

// ─── Shared model stages ──────────────────────────────────────────────────────

/// Stage 1: look up embeddings and derive the padding mask.
///
/// Shapes: tokens [N, S] → (embedded [N, S, E], mask [N, S]).
/// Padding is word index 0; the mask is 1.0 for real words.
pub fn embed_and_mask<B: Backend>(
    embedding: &Embedding<B>,
    tokens:    Tensor<B, 2, Int>,
) -> (Tensor<B, 3>, Tensor<B, 2>) {
    let mask = tokens.clone().equal_elem(0).bool_not().float();
    let embedded = embedding.forward(tokens);
    (embedded, mask)
}

/// Stage 2: embed and encode a batch of sentences.
///
/// Shapes: tokens [N, S] → encoded [N, D].
pub fn encode_sentences<B: Backend>(
    embedding: &Embedding<B>,
    encoder:   &SentenceEncoder<B>,
    tokens:    Tensor<B, 2, Int>,
) -> Tensor<B, 2> {
    let (embedded, mask) = embed_and_mask(embedding, tokens);
    encoder.forward(embedded, mask)
}

/// Stage 2, background variant: encode every background sentence
/// of every sample with the same encoder weights.
///
/// Shapes: background [B, K, S] → encoded [B, K, D].
pub fn encode_background<B: Backend>(
    embedding:  &Embedding<B>,
    encoder:    &SentenceEncoder<B>,
    background: Tensor<B, 3, Int>,
) -> Tensor<B, 3> {
    let [b, k, s] = background.dims();
    let encoded = encode_sentences(embedding, encoder, background.reshape([b * k, s]));
    encoded.reshape([b, k, encoder.output_size()])
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::nn::EmbeddingConfig;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_bow_is_masked_mean() {
        let device  = Default::default();
        let encoder = SentenceEncoderConfig::new(EncoderKind::Bow, 2, 4)
            .init::<TestBackend>(&device);

        // One sentence, three positions, last one padding.
        let embedded = Tensor::<TestBackend, 1>::from_floats(
            [1.0, 2.0, 3.0, 4.0, 9.0, 9.0].as_slice(),
            &device,
        )
        .reshape([1, 3, 2]);
        let mask = Tensor::<TestBackend, 1>::from_floats([1.0, 1.0, 0.0].as_slice(), &device)
            .reshape([1, 3]);

        let out: Vec<f32> = encoder
            .forward(embedded, mask)
            .reshape([2])
            .into_data()
            .convert::<f32>()
            .value;
        assert_eq!(out, vec![2.0, 3.0]);
        assert_eq!(encoder.output_size(), 2);
    }

    #[test]
    fn test_bow_all_padding_does_not_divide_by_zero() {
        let device  = Default::default();
        let encoder = SentenceEncoderConfig::new(EncoderKind::Bow, 2, 4)
            .init::<TestBackend>(&device);

        let embedded = Tensor::<TestBackend, 1>::from_floats([0.0; 4].as_slice(), &device)
            .reshape([1, 2, 2]);
        let mask = Tensor::<TestBackend, 1>::from_floats([0.0, 0.0].as_slice(), &device)
            .reshape([1, 2]);

        let out: Vec<f32> = encoder
            .forward(embedded, mask)
            .reshape([2])
            .into_data()
            .convert::<f32>()
            .value;
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_lstm_output_shape() {
        let device  = Default::default();
        let encoder = SentenceEncoderConfig::new(EncoderKind::Lstm, 3, 5)
            .init::<TestBackend>(&device);
        assert_eq!(encoder.output_size(), 5);

        let embedded = Tensor::<TestBackend, 3>::zeros([2, 4, 3], &device);
        let mask     = Tensor::<TestBackend, 2>::ones([2, 4], &device);
        assert_eq!(encoder.forward(embedded, mask).dims(), [2, 5]);
    }

    #[test]
    fn test_embed_and_mask_marks_padding() {
        let device    = Default::default();
        let embedding = EmbeddingConfig::new(10, 3).init::<TestBackend>(&device);
        let tokens    = Tensor::<TestBackend, 1, Int>::from_ints([0, 0, 4, 7].as_slice(), &device)
            .reshape([1, 4]);

        let (embedded, mask) = embed_and_mask(&embedding, tokens);
        assert_eq!(embedded.dims(), [1, 4, 3]);
        let mask_row: Vec<f32> = mask.reshape([4]).into_data().convert::<f32>().value;
        assert_eq!(mask_row, vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_encode_background_shape() {
        let device    = Default::default();
        let embedding = EmbeddingConfig::new(10, 3).init::<TestBackend>(&device);
        let encoder   = SentenceEncoderConfig::new(EncoderKind::Bow, 3, 4)
            .init::<TestBackend>(&device);

        let background = Tensor::<TestBackend, 1, Int>::from_ints(
            [1, 2, 3, 4, 5, 6, 7, 8, 9, 1, 2, 3].as_slice(),
            &device,
        )
        .reshape([2, 3, 2]);

        assert_eq!(encode_background(&embedding, &encoder, background).dims(), [2, 3, 3]);
    }
}
