// ============================================================
// Layer 5 — Caption Generator
// ============================================================
// Autoregressive decoding: where training feeds ground truth,
// generation feeds the model its own previous output.
//
//   1. zero RecurrentState for a batch of one
//   2. encode the feature, run one decoder step to fold image
//      context into the state (logits discarded, exactly as in
//      training)
//   3. start from the <start> embedding
//   4. step → sample a token from the softmax distribution →
//      append → feed its embedding back in, until <end> is
//      sampled or max_length steps have run
//
// Sampling is a categorical draw, NOT argmax: repeated calls
// produce different captions for the same image, which is the
// point. The random source is an explicit parameter so callers
// can seed it and reproduce a draw exactly.
//
// Reference: Vinyals et al. (2015) Show and Tell
//            Burn Book §3 (Building Blocks)

use anyhow::Result;
use burn::{prelude::*, tensor::activation};
use rand::Rng;

use crate::domain::caption::{END_ID, START_ID};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{CaptionModel, CaptionModelConfig};

type InferBackend = burn::backend::Wgpu;

pub struct CaptionGenerator<B: Backend> {
    model:      CaptionModel<B>,
    max_length: usize,
    device:     B::Device,
}

impl CaptionGenerator<InferBackend> {
    /// Rebuild the model architecture from the saved training config
    /// and load the latest checkpoint's weights into it.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        let cfg = ckpt_manager.load_config()?;
        let model_cfg = CaptionModelConfig::new(
            cfg.vocab_size,
            cfg.feature_regions * cfg.feature_channels,
            cfg.embedding_dim,
            cfg.units,
        );
        let model: CaptionModel<InferBackend> = model_cfg.init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(model, cfg.max_caption_len, device))
    }
}

impl<B: Backend> CaptionGenerator<B> {
    pub fn new(model: CaptionModel<B>, max_length: usize, device: B::Device) -> Self {
        Self { model, max_length, device }
    }

    /// Decode one caption for a single image feature tensor
    /// ([1, regions, channels]). Returns the raw token id sequence,
    /// always beginning with <start>; nothing follows <end>.
    ///
    /// Each call is a fresh episode: new zero state, no memory of
    /// previous captions.
    pub fn generate<R: Rng>(&self, feature: Tensor<B, 3>, rng: &mut R) -> Result<Vec<u32>> {
        let mut state = self.model.decoder.reset_state(1, &self.device);

        // Fold image context into the state; this step's logits have
        // no token to predict and are discarded
        let image_embedding = self.model.encoder.forward(feature);
        let (_, folded) = self.model.decoder.step(image_embedding, state);
        state = folded;

        let mut tokens = vec![START_ID];
        let start = Tensor::<B, 1, Int>::from_ints([START_ID as i32].as_slice(), &self.device);
        let mut input = self.model.decoder.embed(start);

        for _ in 0..self.max_length {
            let (logits, next_state) = self.model.decoder.step(input, state);
            state = next_state;

            let token = sample_token(logits, rng)?;
            tokens.push(token);

            if token == END_ID {
                break;
            }

            let ids = Tensor::<B, 1, Int>::from_ints([token as i32].as_slice(), &self.device);
            input = self.model.decoder.embed(ids);
        }

        Ok(tokens)
    }
}

/// Draw one token id from the categorical distribution implied by a
/// [1, vocab_size] logits row: softmax, then walk the CDF against a
/// single uniform draw.
fn sample_token<B: Backend, R: Rng>(logits: Tensor<B, 2>, rng: &mut R) -> Result<u32> {
    let probs: Vec<f32> = activation::softmax(logits, 1)
        .into_data()
        .to_vec()
        .map_err(|e| anyhow::anyhow!("cannot read sampling probabilities: {e:?}"))?;

    let mut r: f32 = rng.gen();
    for (id, p) in probs.iter().enumerate() {
        r -= p;
        if r <= 0.0 {
            return Ok(id as u32);
        }
    }

    // Float round-off can leave a sliver of probability unclaimed;
    // it belongs to the last entry
    Ok((probs.len() - 1) as u32)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    type B = burn::backend::NdArray;

    const VOCAB: usize = 12;
    const MAX_LENGTH: usize = 10;

    fn generator() -> CaptionGenerator<B> {
        let device = Default::default();
        let model = CaptionModelConfig::new(VOCAB, 2 * 3, 6, 8).init(&device);
        CaptionGenerator::new(model, MAX_LENGTH, device)
    }

    fn feature() -> Tensor<B, 3> {
        Tensor::ones([1, 2, 3], &Default::default())
    }

    #[test]
    fn test_caption_starts_with_start_token() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(7);
        let tokens = gen.generate(feature(), &mut rng).unwrap();
        assert_eq!(tokens[0], START_ID);
    }

    #[test]
    fn test_caption_length_is_bounded() {
        let gen = generator();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let tokens = gen.generate(feature(), &mut rng).unwrap();
            // <start> plus at most MAX_LENGTH sampled tokens
            assert!(tokens.len() <= MAX_LENGTH + 1);
            assert!(!tokens.is_empty());
        }
    }

    #[test]
    fn test_nothing_follows_end_token() {
        let gen = generator();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let tokens = gen.generate(feature(), &mut rng).unwrap();
            if let Some(pos) = tokens.iter().position(|&t| t == END_ID) {
                assert_eq!(pos, tokens.len() - 1);
            }
        }
    }

    #[test]
    fn test_fixed_seed_reproduces_the_same_caption() {
        let gen = generator();

        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let a = gen.generate(feature(), &mut rng_a).unwrap();
        let b = gen.generate(feature(), &mut rng_b).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_sampled_ids_stay_inside_the_vocabulary() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(3);
        let tokens = gen.generate(feature(), &mut rng).unwrap();
        assert!(tokens.iter().all(|&t| (t as usize) < VOCAB));
    }

    #[test]
    fn test_sample_token_respects_a_peaked_distribution() {
        // One logit overwhelms the rest: every draw must pick it
        let device = Default::default();
        let mut row = vec![0.0f32; VOCAB];
        row[5] = 50.0;
        let logits = Tensor::<B, 1>::from_floats(row.as_slice(), &device).reshape([1, VOCAB]);

        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..10 {
            assert_eq!(sample_token(logits.clone(), &mut rng).unwrap(), 5);
        }
    }
}
