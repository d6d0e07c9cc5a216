// ============================================================
// Layer 4 — Caption Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<CaptionSample>
// into GPU-ready tensors.
//
// How batching works here:
//   Input:  Vec of N CaptionSamples, features of regions*channels
//           values, captions padded to the same length
//   Output: CaptionBatch with
//             features: [N, regions, channels]
//             targets:  [N, max_caption_len]
//
//   We flatten everything into one long Vec, then reshape —
//   padding already happened upstream, so every row has the
//   same width.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::CaptionSample;

// ─── CaptionBatch ─────────────────────────────────────────────────────────────
/// A batch of caption samples ready for the model forward pass.
/// All tensors have batch_size as their first dimension.
///
/// B is the Burn Backend (e.g. Wgpu, NdArray) —
/// generic so the same batcher works on any device.
#[derive(Debug, Clone)]
pub struct CaptionBatch<B: Backend> {
    /// Image feature maps — shape: [batch_size, regions, channels]
    pub features: Tensor<B, 3>,

    /// Ground-truth caption ids — shape: [batch_size, max_caption_len]
    /// Each row begins with <start>; the tail is <pad>
    pub targets: Tensor<B, 2, Int>,
}

// ─── CaptionBatcher ───────────────────────────────────────────────────────────
/// Holds the target device plus the feature map geometry so the
/// flat per-sample Vec can be folded back into [regions, channels].
#[derive(Clone, Debug)]
pub struct CaptionBatcher<B: Backend> {
    pub device:   B::Device,
    pub regions:  usize,
    pub channels: usize,
}

impl<B: Backend> CaptionBatcher<B> {
    pub fn new(device: B::Device, regions: usize, channels: usize) -> Self {
        Self { device, regions, channels }
    }
}

impl<B: Backend> Batcher<B, CaptionSample, CaptionBatch<B>> for CaptionBatcher<B> {
    fn batch(&self, items: Vec<CaptionSample>, _device: &B::Device) -> CaptionBatch<B> {
        let batch_size = items.len();
        // All captions are pre-padded to the same length upstream
        let max_len = items[0].caption.len();

        let feature_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.feature.iter().copied())
            .collect();

        // Burn's Int tensors take i32 — ids are well below i32::MAX
        let target_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.caption.ids().iter().map(|&id| id as i32))
            .collect();

        let features = Tensor::<B, 1>::from_floats(feature_flat.as_slice(), &self.device)
            .reshape([batch_size, self.regions, self.channels]);

        let targets = Tensor::<B, 1, Int>::from_ints(target_flat.as_slice(), &self.device)
            .reshape([batch_size, max_len]);

        CaptionBatch { features, targets }
    }
}
