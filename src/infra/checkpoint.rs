// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores training snapshots using Burn's
// CompactRecorder.
//
// What gets saved per checkpoint epoch:
//   1. Model weights  (model_epoch_{n}.mpk.gz) — encoder and
//      decoder parameters in one record
//   2. Optimizer state (optim_epoch_{n}.mpk.gz) — Adam's first
//      and second moment estimates
//   3. latest_epoch.json — which epoch was last saved
//   4. train_config.json — model architecture + hyperparameters
//
// Why save the optimizer too?
//   Adam's per-parameter moments take several epochs to warm up.
//   A resumed run that reset them would spend its first epochs
//   re-learning the step sizes; restoring them makes resumption
//   seamless.
//
// Why save the config separately?
//   When loading for inference we need the exact architecture
//   (embedding_dim, units, vocab_size, feature shape) to rebuild
//   the model before the weights can be loaded into it.
//
// Burn's CompactRecorder:
//   - Serialises records to MessagePack format
//   - Compresses with gzip for smaller file size
//   - Type-safe: loading fails if the architecture doesn't match
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::CaptionModel;

/// Manages saving and loading of training snapshots.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Self {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Save one snapshot: model weights, optimizer state, and the
    /// latest-epoch pointer. Called between epochs only — never
    /// while a step is in flight.
    pub fn save_step<B, O>(
        &self,
        model: &CaptionModel<B>,
        optim: &O,
        epoch: usize,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<CaptionModel<B>, B>,
    {
        let model_path = self.dir.join(format!("model_epoch_{epoch}"));
        CompactRecorder::new()
            .record(model.clone().into_record(), model_path.clone())
            .with_context(|| {
                format!("Failed to save model checkpoint to '{}'", model_path.display())
            })?;

        let optim_path = self.dir.join(format!("optim_epoch_{epoch}"));
        CompactRecorder::new()
            .record(optim.to_record(), optim_path.clone())
            .with_context(|| {
                format!("Failed to save optimizer state to '{}'", optim_path.display())
            })?;

        // The pointer is written last so a crash mid-save can never
        // leave it referring to a half-written snapshot
        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load model weights from the latest saved checkpoint.
    ///
    /// The model parameter must have the correct architecture
    /// (matching the saved checkpoint) or loading will fail.
    pub fn load_model<B: Backend>(
        &self,
        model:  CaptionModel<B>,
        device: &B::Device,
    ) -> Result<CaptionModel<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;

        Ok(model.load_record(record))
    }

    /// Load the optimizer state that matches the latest checkpoint.
    pub fn load_optimizer<B, O>(&self, optim: O, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        O: Optimizer<CaptionModel<B>, B>,
    {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("optim_epoch_{epoch}"));

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load optimizer state '{}'", path.display())
            })?;

        Ok(optim.load_record(record))
    }

    /// Save the training configuration to JSON.
    ///
    /// Must be called before training starts so the caption command
    /// can reconstruct the exact model architecture later.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration from JSON.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'caption'.",
                    path.display()
                )
            })?;

        Ok(serde_json::from_str(&json)?)
    }

    /// Read latest_epoch.json and return the epoch number.
    /// Returns an error if training hasn't been run yet.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");

        let s = fs::read_to_string(&path)
            .with_context(|| "Cannot find 'latest_epoch.json'. Have you run 'train' first?")?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
