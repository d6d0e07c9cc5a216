// ============================================================
// Layer 5 — Caption Model
// ============================================================
// Encoder and decoder bundled into one Burn module. Bundling
// matters for two reasons:
//
//   1. One backward pass computes gradients for both halves
//      jointly, and one optimizer updates them together —
//      the image projection learns from the same loss signal
//      as the language model.
//   2. Checkpoints cover the whole parameter set in a single
//      record, so training and inference can never load
//      mismatched encoder/decoder pairs.
//
// The shared `embedding_dim` config value is what makes image
// embeddings and token embeddings interchangeable as decoder
// inputs — both projections are sized from the same field.
//
// Reference: Burn Book §3 (Building Blocks)

use burn::prelude::*;

use crate::ml::decoder::{CaptionDecoder, CaptionDecoderConfig};
use crate::ml::encoder::{FeatureEncoder, FeatureEncoderConfig};

#[derive(Config, Debug)]
pub struct CaptionModelConfig {
    pub vocab_size:    usize,
    pub feature_len:   usize,
    pub embedding_dim: usize,
    pub units:         usize,
}

impl CaptionModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CaptionModel<B> {
        CaptionModel {
            encoder: FeatureEncoderConfig::new(self.feature_len, self.embedding_dim)
                .init(device),
            decoder: CaptionDecoderConfig::new(self.vocab_size, self.embedding_dim, self.units)
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct CaptionModel<B: Backend> {
    pub encoder: FeatureEncoder<B>,
    pub decoder: CaptionDecoder<B>,
}
