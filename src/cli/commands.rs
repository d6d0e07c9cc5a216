// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `caption`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the captioning model on a feature + annotation corpus
    Train(TrainArgs),

    /// Generate captions for a feature file using a trained checkpoint
    Caption(CaptionArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding captions.json and the features/ subdirectory
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Directory to save model checkpoints and the vocabulary
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of samples processed together in one forward pass
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 40)]
    pub epochs: usize,

    /// How fast the model learns — too high causes instability,
    /// too low causes slow convergence
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Width of the shared embedding space — image projections and
    /// token embeddings both land here
    #[arg(long, default_value_t = 512)]
    pub embedding_dim: usize,

    /// Width of the recurrent hidden and cell state vectors
    #[arg(long, default_value_t = 512)]
    pub units: usize,

    /// Total vocabulary entries, including the four reserved tokens
    #[arg(long, default_value_t = 5000)]
    pub vocab_size: usize,

    /// Spatial positions per feature map (8x8 grid from the backbone)
    #[arg(long, default_value_t = 64)]
    pub feature_regions: usize,

    /// Channels per spatial position in the feature map
    #[arg(long, default_value_t = 2048)]
    pub feature_channels: usize,

    /// Fixed caption length after padding; longer captions are
    /// truncated (the <end> token always survives)
    #[arg(long, default_value_t = 30)]
    pub max_caption_len: usize,

    /// Save a checkpoint every N epochs (the final epoch always saves)
    #[arg(long, default_value_t = 5)]
    pub checkpoint_every: usize,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:         a.data_dir,
            checkpoint_dir:   a.checkpoint_dir,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            lr:               a.lr,
            embedding_dim:    a.embedding_dim,
            units:            a.units,
            vocab_size:       a.vocab_size,
            feature_regions:  a.feature_regions,
            feature_channels: a.feature_channels,
            max_caption_len:  a.max_caption_len,
            checkpoint_every: a.checkpoint_every,
        }
    }
}

/// All arguments for the `caption` command
#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Path to the feature file (.bin) of the image to caption
    #[arg(long)]
    pub feature: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// How many captions to sample for this image
    #[arg(long, default_value_t = 1)]
    pub samples: usize,

    /// Seed for the sampling random source — fixing it makes the
    /// generated captions reproducible
    #[arg(long)]
    pub seed: Option<u64>,
}
