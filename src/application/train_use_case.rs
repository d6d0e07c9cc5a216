// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load caption annotations   (Layer 4 - data)
//   Step 2: Clean caption text         (Layer 4 - data)
//   Step 3: Build / load vocabulary    (Layer 6 - infra)
//   Step 4: Tokenize + pad captions,
//           pair with image features   (Layer 4 - data)
//   Step 5: Split train/val by IMAGE   (here)
//   Step 6: Build Burn datasets        (Layer 4 - data)
//   Step 7: Save config                (Layer 6 - infra)
//   Step 8: Run training loop          (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::data::{
    dataset::{CaptionDataset, CaptionSample},
    loader::{clean_caption, CorpusLoader},
};
use crate::domain::caption::{Caption, END_ID, PAD_ID, START_ID};
use crate::domain::traits::AnnotationSource;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved to disk and reloaded for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:         String,
    pub checkpoint_dir:   String,
    pub batch_size:       usize,
    pub epochs:           usize,
    pub lr:               f64,
    pub embedding_dim:    usize,
    pub units:            usize,
    pub vocab_size:       usize,
    pub feature_regions:  usize,
    pub feature_channels: usize,
    pub max_caption_len:  usize,
    pub checkpoint_every: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:         "data".to_string(),
            checkpoint_dir:   "checkpoints".to_string(),
            batch_size:       64,
            epochs:           40,
            lr:               1e-3,
            embedding_dim:    512,
            units:            512,
            vocab_size:       5000,
            feature_regions:  64,
            feature_channels: 2048,
            max_caption_len:  30,
            checkpoint_every: 5,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        if cfg.max_caption_len < 2 {
            bail!(
                "max_caption_len must be at least 2 (<start> + <end>), got {}",
                cfg.max_caption_len
            );
        }

        // ── Step 1: Load caption annotations ──────────────────────────────────
        tracing::info!("Loading caption annotations from '{}'", cfg.data_dir);
        let loader = CorpusLoader::new(&cfg.data_dir, cfg.feature_regions, cfg.feature_channels);
        let annotations = loader.load_all()?;
        if annotations.is_empty() {
            bail!("no annotations found in '{}'", cfg.data_dir);
        }

        // ── Step 2: Clean caption text ────────────────────────────────────────
        // The vocabulary is built from exactly the text we will
        // tokenize, so cleaning happens once, here
        let cleaned: Vec<(String, String)> = annotations
            .iter()
            .map(|a| (a.image.clone(), clean_caption(&a.caption)))
            .collect();

        // ── Step 3: Build / load vocabulary ───────────────────────────────────
        let texts: Vec<String> = cleaned.iter().map(|(_, text)| text.clone()).collect();
        let vocab_store = VocabStore::new(&cfg.checkpoint_dir);
        let vocabulary = vocab_store.load_or_build(&texts, cfg.vocab_size)?;

        // ── Step 4: Tokenize captions and pair them with features ─────────────
        // Grouped per image: the feature file is read once per image
        // and shared by all of that image's captions
        let groups = build_image_groups(&cleaned, &loader, &vocabulary, cfg.max_caption_len)?;
        let total: usize = groups.iter().map(|g| g.len()).sum();
        tracing::info!("Built {} samples across {} images", total, groups.len());

        // ── Step 5: Train/validation split, 80/20 over images ─────────────────
        // Splitting by image (not by sample) keeps every caption of a
        // validation image out of the training set
        let (train_samples, val_samples) = split_by_image(groups, 0.8);
        tracing::info!(
            "Split: {} train samples, {} validation samples",
            train_samples.len(),
            val_samples.len()
        );

        // ── Step 6: Build Burn datasets ───────────────────────────────────────
        let train_dataset = CaptionDataset::new(train_samples);
        let val_dataset   = CaptionDataset::new(val_samples);

        // ── Step 7: Save config for inference ─────────────────────────────────
        // The caption command needs the architecture to rebuild the model
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;

        // ── Step 8: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, train_dataset, val_dataset, ckpt_manager)?;

        Ok(())
    }
}

// ─── Sample construction ──────────────────────────────────────────────────────
/// One group per image, holding a sample for each of its captions.
fn build_image_groups(
    cleaned:    &[(String, String)],
    loader:     &CorpusLoader,
    vocabulary: &Tokenizer,
    max_len:    usize,
) -> Result<Vec<Vec<CaptionSample>>> {
    // Group caption texts per image, preserving first-seen order
    let mut order: Vec<String> = Vec::new();
    let mut by_image: std::collections::HashMap<String, Vec<String>> =
        std::collections::HashMap::new();

    for (image, text) in cleaned {
        let entry = by_image.entry(image.clone()).or_default();
        if entry.is_empty() {
            order.push(image.clone());
        }
        entry.push(text.clone());
    }

    let mut groups = Vec::with_capacity(order.len());
    for image in &order {
        let feature = loader.load_feature(image)?;

        let mut samples = Vec::new();
        for text in &by_image[image] {
            let caption = encode_caption(vocabulary, text, max_len)?;
            samples.push(CaptionSample {
                feature: feature.clone(),
                caption,
            });
        }
        groups.push(samples);
    }

    Ok(groups)
}

/// Turn cleaned caption text into a padded id sequence:
/// <start> words... <end> <pad>... — truncating long captions so
/// <end> always survives.
fn encode_caption(vocabulary: &Tokenizer, text: &str, max_len: usize) -> Result<Caption> {
    let encoding = vocabulary
        .encode(text, false)
        .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

    let mut word_ids: Vec<u32> = encoding.get_ids().to_vec();
    word_ids.truncate(max_len - 2);

    let mut ids = Vec::with_capacity(max_len);
    ids.push(START_ID);
    ids.extend(word_ids);
    ids.push(END_ID);
    while ids.len() < max_len {
        ids.push(PAD_ID);
    }

    Caption::new(ids)
}

/// Shuffle image groups and split them, then flatten to samples.
fn split_by_image(
    mut groups:     Vec<Vec<CaptionSample>>,
    train_fraction: f64,
) -> (Vec<CaptionSample>, Vec<CaptionSample>) {
    use rand::seq::SliceRandom;

    let mut rng = rand::thread_rng();
    groups.shuffle(&mut rng);

    let total    = groups.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.min(total);

    let val_groups = groups.split_off(split_at);

    let train: Vec<CaptionSample> = groups.into_iter().flatten().collect();
    let val:   Vec<CaptionSample> = val_groups.into_iter().flatten().collect();

    (train, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::vocab_store::VocabStore;

    fn vocabulary() -> Tokenizer {
        let dir = std::env::temp_dir().join("image-captioner-train-uc-test");
        let _ = std::fs::remove_dir_all(&dir);
        let texts = vec!["a man riding a horse".to_string()];
        VocabStore::new(dir.to_string_lossy().to_string())
            .load_or_build(&texts, 100)
            .unwrap()
    }

    #[test]
    fn test_encode_caption_wraps_and_pads() {
        let vocab = vocabulary();
        let caption = encode_caption(&vocab, "a man", 8).unwrap();

        let ids = caption.ids();
        assert_eq!(ids.len(), 8);
        assert_eq!(ids[0], START_ID);
        assert_eq!(ids[3], END_ID);
        assert!(ids[4..].iter().all(|&id| id == PAD_ID));
    }

    #[test]
    fn test_encode_caption_truncates_but_keeps_end() {
        let vocab = vocabulary();
        let caption = encode_caption(&vocab, "a man riding a horse", 4).unwrap();

        let ids = caption.ids();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], START_ID);
        assert_eq!(ids[3], END_ID);
        // fully occupied: no padding at all
        assert_eq!(caption.token_count(), 4);
    }

    #[test]
    fn test_split_by_image_keeps_groups_whole() {
        let group = |n: usize, w: u32| -> Vec<CaptionSample> {
            (0..n)
                .map(|_| CaptionSample {
                    feature: vec![w as f32],
                    caption: Caption::new(vec![START_ID, w, END_ID]).unwrap(),
                })
                .collect()
        };

        // 10 images with 3 captions each
        let groups: Vec<_> = (0..10).map(|i| group(3, 10 + i)).collect();
        let (train, val) = split_by_image(groups, 0.8);

        assert_eq!(train.len(), 24);
        assert_eq!(val.len(), 6);

        // No image may appear on both sides — features encode the
        // image id, so the two sets must be disjoint
        let train_images: std::collections::HashSet<u32> =
            train.iter().map(|s| s.feature[0] as u32).collect();
        let val_images: std::collections::HashSet<u32> =
            val.iter().map(|s| s.feature[0] as u32).collect();
        assert!(train_images.is_disjoint(&val_images));
    }

    #[test]
    fn test_split_by_image_handles_empty_input() {
        let (train, val) = split_by_image(Vec::new(), 0.8);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }
}
