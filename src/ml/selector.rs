// ============================================================
// Layer 5 — Knowledge Selectors
// ============================================================
// Scores each slot of a merged question+background tensor
// against the question and turns the scores into attention
// weights. Input [B, K+1, D] with the question at slot 0,
// output [B, K+1] rows that sum to 1 (soft) or are one-hot
// (hard selection).
//
// Two scorers, selected by config:
//
//   dot_product    score_j = question · slot_j, no parameters.
//                  This is the p = softmax(u · m_i) step of
//                  End-to-End Memory Networks (Sukhbaatar et
//                  al., 2015).
//   parameterized  score_j = w2 · tanh(W1 [question; slot_j]),
//                  a small learned scorer over each pair.
//
// Hard selection replaces the softmax with a one-hot argmax
// mask. The mask is built from integer comparisons, so no
// gradient flows through the selection itself; the selected
// background encoding still receives gradients downstream.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

// ─── Selector kind and shared parameters ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    DotProduct,
    Parameterized,
}

/// The selector knobs that live in the shared training config.
/// `hard_selection` sits here because the attention pretrainer
/// forces it off for the length of pretraining and restores the
/// saved value afterwards.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KnowledgeSelectorParams {
    pub kind:           SelectorKind,
    pub hidden_size:    usize,
    pub hard_selection: bool,
}

// ─── KnowledgeSelector ────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct KnowledgeSelectorConfig {
    pub params:        KnowledgeSelectorParams,
    pub encoding_size: usize,
}

/// One selector layer. The scoring Linears are None for the
/// dot_product kind. `hard_selection` is a plain module constant
/// and can be flipped on a built model.
#[derive(Module, Debug)]
pub struct KnowledgeSelector<B: Backend> {
    score_hidden:   Option<Linear<B>>,
    score_out:      Option<Linear<B>>,
    hard_selection: bool,
}

impl KnowledgeSelectorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> KnowledgeSelector<B> {
        let (score_hidden, score_out) = match self.params.kind {
            SelectorKind::DotProduct    => (None, None),
            SelectorKind::Parameterized => (
                Some(
                    LinearConfig::new(self.encoding_size * 2, self.params.hidden_size)
                        .init(device),
                ),
                Some(LinearConfig::new(self.params.hidden_size, 1).init(device)),
            ),
        };
        KnowledgeSelector {
            score_hidden,
            score_out,
            hard_selection: self.params.hard_selection,
        }
    }
}

impl<B: Backend> KnowledgeSelector<B> {
    pub fn hard_selection(&self) -> bool {
        self.hard_selection
    }

    pub fn set_hard_selection(&mut self, hard_selection: bool) {
        self.hard_selection = hard_selection;
    }

    /// Shapes: merged [B, K+1, D] (question at slot 0) →
    /// attention [B, K+1].
    pub fn forward(&self, merged: Tensor<B, 3>) -> Tensor<B, 2> {
        let scores = self.scores(merged);
        if self.hard_selection {
            one_hot_argmax(scores)
        } else {
            softmax(scores, 1)
        }
    }

    fn scores(&self, merged: Tensor<B, 3>) -> Tensor<B, 2> {
        let [b, slots, d] = merged.dims();
        let question = merged.clone().slice([0..b, 0..1, 0..d]);

        match (&self.score_hidden, &self.score_out) {
            (Some(hidden), Some(out)) => {
                // [question; slot_j] along the feature axis, scored
                // pairwise by the two Linears.
                let paired = Tensor::cat(
                    vec![question.expand([b, slots, d]), merged],
                    2,
                );
                out.forward(hidden.forward(paired).tanh()).reshape([b, slots])
            }
            _ => (merged * question.expand([b, slots, d]))
                .sum_dim(2)
                .reshape([b, slots]),
        }
    }
}

/// One-hot rows marking each row's argmax.
fn one_hot_argmax<B: Backend>(scores: Tensor<B, 2>) -> Tensor<B, 2> {
    let [b, slots] = scores.dims();
    let device  = scores.device();
    let max_idx = scores.argmax(1);
    let positions = Tensor::<B, 1, Int>::arange(0..slots as i64, &device)
        .reshape([1, slots])
        .expand([b, slots]);
    positions.equal(max_idx.expand([b, slots])).float()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn merged_fixture(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3> {
        // question = [1, 0], slot1 = [0, 1], slot2 = [2, 0]
        // dot scores: [1, 0, 2]
        Tensor::<TestBackend, 1>::from_floats(
            [1.0, 0.0, 0.0, 1.0, 2.0, 0.0].as_slice(),
            device,
        )
        .reshape([1, 3, 2])
    }

    fn selector(kind: SelectorKind, hard_selection: bool) -> KnowledgeSelector<TestBackend> {
        let params = KnowledgeSelectorParams { kind, hidden_size: 5, hard_selection };
        KnowledgeSelectorConfig::new(params, 2).init(&Default::default())
    }

    #[test]
    fn test_dot_product_soft_attention_sums_to_one() {
        let device = Default::default();
        let attention = selector(SelectorKind::DotProduct, false).forward(merged_fixture(&device));
        assert_eq!(attention.dims(), [1, 3]);

        let row: Vec<f32> = attention.reshape([3]).into_data().convert::<f32>().value;
        let total: f32 = row.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        // Highest dot score is slot 2.
        assert!(row[2] > row[0] && row[0] > row[1]);
    }

    #[test]
    fn test_dot_product_hard_attention_is_one_hot() {
        let device = Default::default();
        let attention = selector(SelectorKind::DotProduct, true).forward(merged_fixture(&device));
        let row: Vec<f32> = attention.reshape([3]).into_data().convert::<f32>().value;
        assert_eq!(row, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_set_hard_selection_flips_behavior() {
        let device = Default::default();
        let mut layer = selector(SelectorKind::DotProduct, true);
        assert!(layer.hard_selection());

        layer.set_hard_selection(false);
        assert!(!layer.hard_selection());
        let row: Vec<f32> = layer
            .forward(merged_fixture(&device))
            .reshape([3])
            .into_data()
            .convert::<f32>()
            .value;
        // Soft rows keep every slot strictly positive.
        assert!(row.iter().all(|&w| w > 0.0 && w < 1.0));
    }

    #[test]
    fn test_parameterized_attention_shape() {
        let device = Default::default();
        let merged = Tensor::<TestBackend, 3>::zeros([2, 4, 2], &device);
        let attention = selector(SelectorKind::Parameterized, false).forward(merged);
        assert_eq!(attention.dims(), [2, 4]);

        let rows: Vec<f32> = attention.reshape([8]).into_data().convert::<f32>().value;
        let first: f32 = rows[..4].iter().sum();
        assert!((first - 1.0).abs() < 1e-5);
    }
}
