// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly — only this one
// (and the data layer, for its Dataset/Batcher impls).
//
// Why isolate Burn code here?
//   - If Burn's API changes, we only update this layer
//   - Other layers are testable without a GPU
//   - The model architecture is clearly separated from
//     data loading and application logic
//
// What's in this layer:
//
//   cell.rs      — The recurrent cell abstraction
//                  RecurrentState (hidden/cell pair) and the
//                  RecurrentCell trait with its single LSTM
//                  implementation (input / forget / cell /
//                  output gates built from two Linear layers)
//
//   encoder.rs   — The feature encoder
//                  Flattens a pre-extracted CNN feature map and
//                  projects it into the token embedding space
//                  (affine layer + ELU)
//
//   decoder.rs   — The caption decoder
//                  Token embedding table, one recurrent cell,
//                  and the two affine heads that turn the cell
//                  output into vocabulary logits, one step at
//                  a time
//
//   model.rs     — CaptionModel: encoder + decoder bundled as
//                  one module so a single optimizer updates
//                  both jointly and checkpoints cover both
//
//   trainer.rs   — The training loop
//                  Teacher-forced unrolling over caption
//                  positions, masked cross-entropy, backward
//                  pass, Adam update, validation pass, and
//                  checkpoint saving
//
//   generator.rs — The inference engine
//                  Loads a checkpoint and decodes captions
//                  autoregressively, sampling each token from
//                  the softmax distribution
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vinyals et al. (2015) Show and Tell
//            Hochreiter & Schmidhuber (1997) LSTM

/// Recurrent state and the LSTM cell behind the decoder
pub mod cell;

/// Image feature → embedding projection
pub mod encoder;

/// Stateful per-step caption decoder
pub mod decoder;

/// Encoder + decoder bundled into one trainable module
pub mod model;

/// Teacher-forced training loop with validation and checkpointing
pub mod trainer;

/// Autoregressive caption generation from a checkpoint
pub mod generator;
