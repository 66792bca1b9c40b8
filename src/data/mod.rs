// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from tab-separated text files
// all the way to backend-ready tensor batches.
//
// The pipeline flows in this order:
//
//   .tsv files
//       │
//       ▼
//   TextInstance       → one parsed line (text, label, index)
//       │
//       ▼
//   read_background    → joins instances with background files
//       │
//       ▼
//   WordTokenizer      → splits text into normalised words
//       │
//       ▼
//   DataIndexer        → converts words to index numbers
//       │
//       ▼
//   *Dataset           → implements Burn's Dataset trait
//       │
//       ▼
//   *Batcher           → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader         → feeds batches to the training loop
//
// Each module is responsible for exactly one step.
// This makes each step independently testable and replaceable.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Splits text into lowercased, punctuation-stripped words
pub mod tokenizer;

/// Maps words to stable indices, with reserved padding/unknown slots
pub mod indexer;

/// Parsed file lines: instances, background sets, attention labels
pub mod instance;

/// File readers plus Burn's Dataset trait for all sample kinds
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
