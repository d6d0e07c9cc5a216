use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::caption::Caption;

/// One training sample: an image's feature values paired with one of
/// its tokenized, padded captions. Images with several captions
/// contribute several samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionSample {
    /// Flattened feature map (regions * channels values)
    pub feature: Vec<f32>,
    /// Padded token id sequence, starting with <start>
    pub caption: Caption,
}

pub struct CaptionDataset {
    samples: Vec<CaptionSample>,
}

impl CaptionDataset {
    pub fn new(samples: Vec<CaptionSample>) -> Self {
        Self { samples }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Dataset<CaptionSample> for CaptionDataset {
    fn get(&self, index: usize) -> Option<CaptionSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
