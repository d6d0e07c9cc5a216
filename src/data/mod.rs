// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from the annotation file and the
// raw feature dumps on disk all the way to GPU-ready tensor
// batches.
//
// The pipeline flows in this order:
//
//   captions.json + features/*.bin
//       │
//       ▼
//   CorpusLoader      → reads annotations, decodes feature files,
//                       cleans caption text
//       │
//       ▼
//   Vocabulary        → words become token ids (Layer 6 store)
//       │
//       ▼
//   CaptionDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   CaptionBatcher    → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Each module is responsible for exactly one step.
// This makes each step independently testable and replaceable.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Reads captions.json and raw little-endian f32 feature files
pub mod loader;

/// Implements Burn's Dataset trait for caption samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
