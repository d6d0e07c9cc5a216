// ============================================================
// Layer 5 — Caption Decoder
// ============================================================
// The stateful half of the model. One call to step() advances
// the caption by exactly one token position:
//
//   input [batch, embedding_dim] ─┐
//                                 ├─ LstmCell ── fc1 ── fc2 ──→ logits [batch, vocab]
//   state [batch, units] ×2 ──────┘     │
//                                       └──→ new state
//
// The decoder never applies softmax — logits leave here raw and
// are normalized downstream (cross-entropy in training, the
// sampling distribution in generation).
//
// Inputs come from two sources that share embedding_dim and are
// therefore interchangeable: the embedding table (for tokens)
// and the feature encoder (for the image, at step 0 only).
//
// Reference: Vinyals et al. (2015) Show and Tell
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::ml::cell::{LstmCell, LstmCellConfig, RecurrentCell, RecurrentState};

#[derive(Config, Debug)]
pub struct CaptionDecoderConfig {
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    pub units:         usize,
}

impl CaptionDecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CaptionDecoder<B> {
        CaptionDecoder {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device),
            cell:      LstmCellConfig::new(self.embedding_dim, self.units).init(device),
            fc1:       LinearConfig::new(self.units, self.units).init(device),
            fc2:       LinearConfig::new(self.units, self.vocab_size).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct CaptionDecoder<B: Backend> {
    embedding: Embedding<B>,
    cell:      LstmCell<B>,
    fc1:       Linear<B>,
    fc2:       Linear<B>,
}

impl<B: Backend> CaptionDecoder<B> {
    /// All-zero hidden/cell state for a new decoding episode.
    pub fn reset_state(&self, batch_size: usize, device: &B::Device) -> RecurrentState<B> {
        self.cell.reset_state(batch_size, device)
    }

    /// Look up dense vectors for a batch of token ids.
    /// token_ids: [batch] → [batch, embedding_dim]
    pub fn embed(&self, token_ids: Tensor<B, 1, Int>) -> Tensor<B, 2> {
        // Embedding wants a [batch, seq] index tensor; wrap the single
        // position and unwrap it again afterwards.
        self.embedding
            .forward(token_ids.unsqueeze_dim(1))
            .squeeze_dim(1)
    }

    /// Advance one token position.
    /// input: [batch, embedding_dim] → (logits [batch, vocab_size], new state)
    pub fn step(
        &self,
        input: Tensor<B, 2>,
        state: RecurrentState<B>,
    ) -> (Tensor<B, 2>, RecurrentState<B>) {
        let (output, state) = self.cell.step(input, state);
        let x = self.fc1.forward(output);
        (self.fc2.forward(x), state)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    const VOCAB: usize = 20;

    fn decoder() -> CaptionDecoder<B> {
        CaptionDecoderConfig::new(VOCAB, 8, 12).init(&Default::default())
    }

    #[test]
    fn test_embed_shape() {
        let device = Default::default();
        let ids = Tensor::<B, 1, Int>::from_ints([1, 4, 7].as_slice(), &device);
        let embedded = decoder().embed(ids);
        assert_eq!(embedded.dims(), [3, 8]);
    }

    #[test]
    fn test_step_produces_vocab_logits() {
        let device = Default::default();
        let dec = decoder();
        let state = dec.reset_state(3, &device);
        let input = Tensor::<B, 2>::ones([3, 8], &device);

        let (logits, state) = dec.step(input, state);
        assert_eq!(logits.dims(), [3, VOCAB]);
        assert_eq!(state.hidden.dims(), [3, 12]);

        let values: Vec<f32> = logits.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_sequential_state_changes_logits() {
        // Same input, evolving state: the second step must not
        // repeat the first step's logits.
        let device = Default::default();
        let dec = decoder();
        let input = Tensor::<B, 2>::ones([1, 8], &device);

        let state = dec.reset_state(1, &device);
        let (logits1, state) = dec.step(input.clone(), state);
        let (logits2, _) = dec.step(input, state);

        let a: Vec<f32> = logits1.into_data().to_vec().unwrap();
        let b: Vec<f32> = logits2.into_data().to_vec().unwrap();
        assert_ne!(a, b);
    }
}
