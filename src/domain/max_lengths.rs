// ============================================================
// Layer 3 — MaxLengths Domain Type
// ============================================================
// The padding contract shared by a solver and its pretrainer.
// Every word sequence is padded or truncated to `sentence`
// positions, and every background set to `background` rows,
// so all tensors in one run have identical shapes.
//
// A pretrainer never invents its own lengths: it copies these
// from the solver it wraps, which is what keeps pretraining
// arrays and full-training arrays shape-compatible.

/// Fixed array dimensions for one training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxLengths {
    /// Number of word positions per sentence.
    pub sentence: usize,

    /// Number of background sentences kept per instance.
    pub background: usize,
}

impl MaxLengths {
    pub fn new(sentence: usize, background: usize) -> Self {
        Self { sentence, background }
    }

    /// Slot count of a merged question-plus-background sequence:
    /// one question slot followed by one slot per background sentence.
    pub fn merged_slots(&self) -> usize {
        self.background + 1
    }
}
