// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Randomly shuffles samples and splits them into two sets:
//   - Training set:   used to update model weights
//   - Validation set: used to measure performance on unseen data
//
// Only used when no separate validation file is configured. The
// split happens at the sample level, after instances are joined
// with their background sets, so a question and its background
// always land on the same side of the split.
//
// Why shuffle before splitting?
//   Train files are usually grouped (all sentences from one
//   source first, then the next). Without shuffling, the
//   validation set would only contain the tail of the file.
//
// Split ratio: 80% training, 20% validation (configurable)
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom
// which is the standard unbiased shuffle algorithm.
//
// Reference: rand crate documentation

use rand::seq::SliceRandom;

/// Randomly shuffle `samples` and split into (train, validation).
///
/// # Arguments
/// * `samples`        - All available samples (consumed by this function)
/// * `train_fraction` - Proportion for training, e.g. 0.8 = 80%
///
/// # Returns
/// A tuple (train_samples, val_samples)
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64) -> (Vec<T>, Vec<T>) {
    let mut rng = rand::thread_rng();

    // Fisher-Yates shuffle — every permutation is equally likely
    samples.shuffle(&mut rng);

    // e.g. 100 samples * 0.8 = 80 → first 80 are training
    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;

    // Clamp to valid range to avoid panics on tiny datasets
    let split_at = split_at.min(total);

    // split_off(n) removes elements [n..] from the Vec and returns them
    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation ({}% / {}%)",
        samples.len(),
        val.len(),
        (samples.len() * 100) / total.max(1),
        (val.len()     * 100) / total.max(1),
    );

    (samples, val)
}
