// ============================================================
// Layer 5 — Feature Encoder
// ============================================================
// Projects a pre-extracted CNN feature map into the decoder's
// embedding space. The heavy lifting (the CNN itself) happened
// offline; this is only
//
//   [batch, regions, channels] → flatten → Linear → ELU
//                              → [batch, embedding_dim]
//
// so that the image lands in the same vector space as the token
// embeddings and can be fed to the decoder as its first input.
// No normalization, no dropout — deterministic given the
// learned weights.
//
// Reference: Vinyals et al. (2015) Show and Tell
//            Clevert et al. (2016) ELU

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

#[derive(Config, Debug)]
pub struct FeatureEncoderConfig {
    /// Flattened input width: regions * channels of the feature map
    pub feature_len:   usize,
    /// Output width — must match the decoder's token embedding width
    pub embedding_dim: usize,
}

impl FeatureEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeatureEncoder<B> {
        FeatureEncoder {
            fc: LinearConfig::new(self.feature_len, self.embedding_dim).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct FeatureEncoder<B: Backend> {
    fc: Linear<B>,
}

impl<B: Backend> FeatureEncoder<B> {
    /// features: [batch, regions, channels] → embedding: [batch, embedding_dim]
    pub fn forward(&self, features: Tensor<B, 3>) -> Tensor<B, 2> {
        let flat = features.flatten::<2>(1, 2);
        elu(self.fc.forward(flat))
    }
}

/// elu(x) = x for x > 0, exp(x) - 1 otherwise (α = 1).
/// Composed from clamps so both branches stay tensor-wide:
/// the positive half-wave plus the exponential negative half-wave.
fn elu<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    x.clone().clamp_min(0.0) + (x.clamp_max(0.0).exp() - 1.0)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    #[test]
    fn test_output_has_embedding_dim_components() {
        let device = Default::default();
        let encoder = FeatureEncoderConfig::new(4 * 6, 32).init::<B>(&device);
        let features = Tensor::<B, 3>::ones([2, 4, 6], &device);

        let embedding = encoder.forward(features);
        assert_eq!(embedding.dims(), [2, 32]);

        let values: Vec<f32> = embedding.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_elu_positive_is_identity() {
        let device = Default::default();
        let x = Tensor::<B, 2>::from_floats([[0.5, 2.0, 7.25]], &device);
        let y: Vec<f32> = elu(x).into_data().to_vec().unwrap();
        assert_eq!(y, vec![0.5, 2.0, 7.25]);
    }

    #[test]
    fn test_elu_negative_stays_above_minus_one() {
        let device = Default::default();
        let x = Tensor::<B, 2>::from_floats([[-0.5, -2.0, -50.0]], &device);
        let y: Vec<f32> = elu(x).into_data().to_vec().unwrap();
        for (v, x) in y.iter().zip([-0.5f32, -2.0, -50.0]) {
            assert!(*v > -1.0);
            assert!((v - (x.exp() - 1.0)).abs() < 1e-6);
        }
    }
}
