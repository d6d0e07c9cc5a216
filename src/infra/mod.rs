// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles all cross-cutting concerns that don't belong in
// any specific business layer:
//
//   checkpoint.rs  — Saving and loading training snapshots
//                    Uses Burn's CompactRecorder to serialise
//                    the model record AND the Adam optimizer
//                    record, so an interrupted run resumes with
//                    its momentum intact. Also saves/loads
//                    TrainConfig as JSON so inference can
//                    rebuild the exact architecture.
//
//   vocab_store.rs — Vocabulary persistence
//                    Builds a word-level vocabulary from the
//                    caption corpus if none exists, or loads a
//                    previously saved one. Ensures the same
//                    token↔id mapping is used for training and
//                    generation.
//
//   metrics.rs     — Training metrics logging
//                    Writes epoch-level metrics (losses, epoch
//                    wall-clock) to a CSV file for later
//                    analysis and loss-curve plotting.
//
// Why is this a separate layer?
//   These concerns are used by multiple other layers but
//   don't belong to any one of them. Keeping them here:
//   - Prevents duplication across layers
//   - Makes it easy to swap implementations
//     (e.g. swap file checkpoints for S3 cloud storage)
//   - Keeps other layers focused on their core logic
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model + optimizer checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary building, saving, and loading
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
