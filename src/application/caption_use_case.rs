// ============================================================
// Layer 2 — Caption Use Case
// ============================================================
// The inference workflow: load the saved vocabulary and the
// latest checkpoint, read one feature file, and sample one or
// more captions from the decoder.
//
// Sampling is stochastic, so asking for several captions of the
// same image gives a spread of phrasings. Passing a seed pins
// the random source and makes the output reproducible.

use anyhow::{bail, Result};
use burn::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::data::loader::read_feature_file;
use crate::domain::caption::{END_ID, PAD_ID, START_ID};
use crate::domain::traits::Captioner;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::generator::CaptionGenerator;

type InferBackend = burn::backend::Wgpu;

pub struct CaptionUseCase {
    vocabulary: Tokenizer,
    generator:  CaptionGenerator<InferBackend>,
    regions:    usize,
    channels:   usize,
    seed:       Option<u64>,
}

impl CaptionUseCase {
    pub fn new(checkpoint_dir: String, seed: Option<u64>) -> Result<Self> {
        let vocab_store = VocabStore::new(&checkpoint_dir);
        let vocabulary  = vocab_store.load()?;
        let ckpt        = CheckpointManager::new(&checkpoint_dir);
        let cfg         = ckpt.load_config()?;
        let generator   = CaptionGenerator::from_checkpoint(&ckpt)?;
        Ok(Self {
            vocabulary,
            generator,
            regions:  cfg.feature_regions,
            channels: cfg.feature_channels,
            seed,
        })
    }

    /// Sample `count` captions for one feature file.
    /// All draws share one random source, so a fixed seed pins the
    /// whole batch of captions, not just the first.
    pub fn captions(&self, feature_path: &str, count: usize) -> Result<Vec<String>> {
        if count == 0 {
            bail!("caption count must be at least 1");
        }

        let values = read_feature_file(Path::new(feature_path), self.regions * self.channels)?;

        let device = burn::backend::wgpu::WgpuDevice::default();
        let feature = Tensor::<InferBackend, 1>::from_floats(values.as_slice(), &device)
            .reshape([1, self.regions, self.channels]);

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };

        let mut rendered = Vec::with_capacity(count);
        for _ in 0..count {
            let ids = self.generator.generate(feature.clone(), &mut rng)?;
            rendered.push(render_caption(&self.vocabulary, &ids)?);
        }
        Ok(rendered)
    }
}

impl Captioner for CaptionUseCase {
    fn caption(&self, feature_path: &str) -> Result<String> {
        let mut captions = self.captions(feature_path, 1)?;
        Ok(captions.remove(0))
    }
}

/// Map generated ids back to words. Every id must resolve — a miss
/// means vocabulary and checkpoint are out of sync, which is fatal.
/// The structural tokens (<start>, <end>, <pad>) are dropped from
/// the rendered text; <unk> stays visible as an honest placeholder.
fn render_caption(vocabulary: &Tokenizer, ids: &[u32]) -> Result<String> {
    let mut words = Vec::with_capacity(ids.len());

    for &id in ids {
        let token = vocabulary
            .id_to_token(id)
            .ok_or_else(|| anyhow::anyhow!("generated id {id} is not in the vocabulary"))?;

        if id != START_ID && id != END_ID && id != PAD_ID {
            words.push(token);
        }
    }

    Ok(words.join(" "))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::caption::UNK_ID;

    fn vocabulary() -> Tokenizer {
        let dir = std::env::temp_dir().join("image-captioner-caption-uc-test");
        let _ = std::fs::remove_dir_all(&dir);
        let texts = vec!["a man riding a horse".to_string()];
        VocabStore::new(dir.to_string_lossy().to_string())
            .load_or_build(&texts, 100)
            .unwrap()
    }

    #[test]
    fn test_render_strips_structural_tokens() {
        let vocab = vocabulary();
        let man = vocab.token_to_id("man").unwrap();
        let horse = vocab.token_to_id("horse").unwrap();

        let text = render_caption(&vocab, &[START_ID, man, horse, END_ID]).unwrap();
        assert_eq!(text, "man horse");
    }

    #[test]
    fn test_render_keeps_unknown_placeholder() {
        let vocab = vocabulary();
        let text = render_caption(&vocab, &[START_ID, UNK_ID, END_ID]).unwrap();
        assert_eq!(text, "<unk>");
    }

    #[test]
    fn test_render_fails_on_out_of_vocabulary_id() {
        let vocab = vocabulary();
        assert!(render_caption(&vocab, &[START_ID, 9999, END_ID]).is_err());
    }
}
