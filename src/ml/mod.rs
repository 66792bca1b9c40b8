// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly — only this one.
//
// Why isolate Burn code here?
//   - If Burn's API changes, we only update this layer
//   - Other layers are testable without a GPU
//   - The model architecture is clearly separated from
//     data loading and application logic
//
// What's in this layer:
//
//   encoder.rs        — Sentence encoders (bag-of-words, LSTM)
//                       shared by every solver, plus the
//                       embed/encode stage functions models
//                       are composed from
//
//   selector.rs       — The knowledge selector: scores the
//                       question+background slots into an
//                       attention distribution (soft or hard)
//
//   true_false.rs     — Baseline solver model: encode the
//                       sentence, classify true/false
//
//   memory_network.rs — Memory network solver model: encode,
//                       merge question with background,
//                       attend, update memory per hop,
//                       entailment head
//
//   trainer.rs        — Solver construction and the training
//                       loop: forward pass, loss, backward
//                       pass, optimiser step, checkpointing
//
//   pretrainer.rs     — Attention pretraining: trains the
//                       memory network's first selector on
//                       labeled background relevance before
//                       the main training run
//
//   scorer.rs         — Loads a checkpoint and scores new
//                       sentences
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Sukhbaatar et al. (2015) End-To-End Memory Networks

/// Sentence encoders and the shared embed/encode stages
pub mod encoder;

/// Knowledge selector — attention over question+background slots
pub mod selector;

/// Baseline true/false sentence classifier
pub mod true_false;

/// Memory network solver model
pub mod memory_network;

/// Solver construction and the full training loop
pub mod trainer;

/// Attention pretraining for the memory network's selector
pub mod pretrainer;

/// Scoring engine — loads a checkpoint and classifies sentences
pub mod scorer;
