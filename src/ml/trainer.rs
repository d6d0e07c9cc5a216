// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Teacher-forced training over caption batches using Burn's
// DataLoader and Adam.
//
// One train_step call is one gradient update:
//
//   1. zero RecurrentState for the batch
//   2. encode the image features, run ONE decoder step with the
//      image embedding — its logits are discarded, the step only
//      folds image context into the recurrent state
//   3. feed the <start> embedding, then unroll over positions
//      1..max_len computing masked cross-entropy against the
//      ground-truth token at each position
//   4. teacher forcing: the next input is always the embedding
//      of the ground-truth token, never the model's own argmax
//   5. backward on the SUMMED loss, one Adam update over encoder
//      and decoder parameters jointly
//
// Key Burn 0.20 insight (same as every Burn training loop):
//   - Training uses TrainBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on ValidBackend (Wgpu)
//   - The validation batcher must also use ValidBackend
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam
//            Williams & Zipser (1989) teacher forcing

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{activation, backend::AutodiffBackend},
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::CaptionBatcher, dataset::CaptionDataset};
use crate::domain::caption::{PAD_ID, START_ID};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{CaptionModel, CaptionModelConfig};

type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
type ValidBackend = burn::backend::Wgpu;

/// Both loss views of one training step: the summed loss drives
/// the backward pass, the averaged one (summed / max_len) is what
/// gets logged and aggregated per epoch.
#[derive(Debug, Clone, Copy)]
pub struct StepLoss {
    pub summed:   f64,
    pub averaged: f64,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: CaptionDataset,
    val_dataset:   CaptionDataset,
    ckpt_manager:  CheckpointManager,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = CaptionModelConfig::new(
        cfg.vocab_size,
        cfg.feature_regions * cfg.feature_channels,
        cfg.embedding_dim,
        cfg.units,
    );
    let mut model: CaptionModel<TrainBackend> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: embedding_dim={}, units={}, vocab_size={}",
        cfg.embedding_dim, cfg.units, cfg.vocab_size,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim_cfg = AdamConfig::new().with_epsilon(1e-8);
    let mut optim = optim_cfg.init();

    // ── Resume from the latest checkpoint, if there is one ────────────────────
    // Captions are cheap to re-batch but epochs are not: picking up
    // model AND optimizer state lets an interrupted run continue as
    // if nothing happened.
    let mut start_epoch = 0usize;
    if let Ok(epoch) = ckpt_manager.latest_epoch() {
        model = ckpt_manager.load_model(model, &device)?;
        optim = ckpt_manager.load_optimizer(optim, &device)?;
        start_epoch = epoch;
        tracing::info!("Resuming training from checkpoint at epoch {}", epoch);
    }

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = CaptionBatcher::<TrainBackend>::new(
        device.clone(), cfg.feature_regions, cfg.feature_channels,
    );
    let train_loader = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(42)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let val_batcher = CaptionBatcher::<ValidBackend>::new(
        device.clone(), cfg.feature_regions, cfg.feature_channels,
    );
    let val_loader = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in (start_epoch + 1)..=cfg.epochs {
        let epoch_start = std::time::Instant::now();

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for (batch_idx, batch) in train_loader.iter().enumerate() {
            let (updated, loss) =
                train_step(model, &mut optim, cfg.lr, batch.features, batch.targets)?;
            model = updated;

            if !loss.summed.is_finite() {
                bail!(
                    "loss became non-finite ({}) at epoch {} batch {} — aborting",
                    loss.summed, epoch, batch_idx,
                );
            }

            train_loss_sum += loss.averaged;
            train_batches  += 1;

            if batch_idx % 100 == 0 {
                tracing::info!(
                    "Epoch {} Batch {} Loss {:.4}",
                    epoch, batch_idx, loss.averaged,
                );
            }
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → CaptionModel<ValidBackend>; same teacher-forced
        // unroll, no gradients, no parameter updates
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;

        for batch in val_loader.iter() {
            let max_len = batch.targets.dims()[1];
            let loss = forward_loss(&model_valid, batch.features, batch.targets)?;
            let summed: f64 = loss.into_scalar().elem::<f64>();
            val_loss_sum += summed / max_len as f64;
            val_batches  += 1;
        }

        let avg_val_loss = if val_batches > 0 {
            val_loss_sum / val_batches as f64
        } else { f64::NAN };

        let seconds = epoch_start.elapsed().as_secs_f64();

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | {:.1}s",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss, seconds,
        );

        metrics.log(&EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, seconds))?;

        // Snapshots happen only here, between epochs — never mid-step
        if epoch % cfg.checkpoint_every == 0 || epoch == cfg.epochs {
            ckpt_manager.save_step(&model, &optim, epoch)?;
            tracing::info!("Checkpoint saved for epoch {}", epoch);
        }
    }

    tracing::info!("Training complete!");
    Ok(())
}

/// One gradient update: forward (teacher-forced unroll), backward on
/// the summed loss, Adam step over all parameters jointly.
///
/// Takes the model by value and returns the updated one — Burn
/// optimizers consume and rebuild the module.
pub fn train_step<B: AutodiffBackend, O: Optimizer<CaptionModel<B>, B>>(
    model:    CaptionModel<B>,
    optim:    &mut O,
    lr:       f64,
    features: Tensor<B, 3>,
    targets:  Tensor<B, 2, Int>,
) -> Result<(CaptionModel<B>, StepLoss)> {
    let max_len = targets.dims()[1];

    let summed = forward_loss(&model, features, targets)?;
    let summed_value: f64 = summed.clone().into_scalar().elem::<f64>();
    let averaged = summed_value / max_len as f64;

    // Backward pass + Adam update — gradients of the SUMMED loss
    let grads = summed.backward();
    let grads = GradientsParams::from_grads(grads, &model);
    let model = optim.step(lr, model, grads);

    Ok((model, StepLoss { summed: summed_value, averaged }))
}

/// Teacher-forced forward pass. Returns the summed loss tensor so
/// training can backward through it; validation reads it as a scalar.
///
/// Pure in the model parameters: identical inputs and identical
/// parameters always produce the identical loss, because the unroll
/// feeds ground-truth tokens only — never the model's own output.
pub fn forward_loss<B: Backend>(
    model:    &CaptionModel<B>,
    features: Tensor<B, 3>,
    targets:  Tensor<B, 2, Int>,
) -> Result<Tensor<B, 1>> {
    let [batch_size, max_len] = targets.dims();
    if max_len <= 1 {
        bail!("caption batch is degenerate: max length {max_len} leaves no positions to supervise");
    }

    let device = features.device();

    // Fresh zero state per call — captions are unrelated from image
    // to image, so nothing carries over between batches
    let mut state = model.decoder.reset_state(batch_size, &device);

    // Fold the image into the recurrent state. The logits of this
    // step have no target token and are discarded.
    let image_embedding = model.encoder.forward(features);
    let (_, folded) = model.decoder.step(image_embedding, state);
    state = folded;

    // Position 0 of every caption is <start>
    let start_ids = Tensor::<B, 1, Int>::full([batch_size], START_ID as i32, &device);
    let mut input = model.decoder.embed(start_ids);

    let mut loss = Tensor::<B, 1>::zeros([1], &device);

    for i in 1..max_len {
        let (logits, next_state) = model.decoder.step(input, state);
        state = next_state;

        let target_i: Tensor<B, 1, Int> = targets
            .clone()
            .slice([0..batch_size, i..i + 1])
            .squeeze_dim(1);

        loss = loss + masked_cross_entropy(logits, target_i.clone());

        // Teacher forcing: feed the ground-truth token, not the prediction
        input = model.decoder.embed(target_i);
    }

    Ok(loss)
}

/// Cross-entropy over one timestep with padding masked out.
///
/// Padding rows contribute exactly zero to the numerator but still
/// count in the batch mean, so an all-padding timestep yields an
/// exact 0.0 rather than 0/0.
pub fn masked_cross_entropy<B: Backend>(
    logits:  Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
) -> Tensor<B, 1> {
    let log_probs = activation::log_softmax(logits, 1);

    // Pick each row's log-probability of its target id: [batch]
    let nll: Tensor<B, 1> = log_probs
        .gather(1, targets.clone().unsqueeze_dim(1))
        .squeeze_dim(1)
        .neg();

    let mask = targets.not_equal_elem(PAD_ID as i32).float();

    (nll * mask).mean()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::CaptionModelConfig;
    use burn::optim::AdamConfig;

    type B = burn::backend::NdArray;
    type AB = burn::backend::Autodiff<burn::backend::NdArray>;

    const VOCAB: usize = 12;

    fn tiny_model<Back: Backend>(device: &Back::Device) -> CaptionModel<Back> {
        CaptionModelConfig::new(VOCAB, 2 * 3, 6, 8).init(device)
    }

    fn feature_batch<Back: Backend>(batch: usize, device: &Back::Device) -> Tensor<Back, 3> {
        Tensor::ones([batch, 2, 3], device)
    }

    fn target_batch<Back: Backend>(
        rows: &[[i32; 5]],
        device: &Back::Device,
    ) -> Tensor<Back, 2, Int> {
        let flat: Vec<i32> = rows.iter().flatten().copied().collect();
        Tensor::<Back, 1, Int>::from_ints(flat.as_slice(), device).reshape([rows.len(), 5])
    }

    #[test]
    fn test_masked_loss_is_exactly_zero_for_all_padding() {
        let device = Default::default();
        // Arbitrary logits — masking must zero the loss regardless
        let logits = Tensor::<B, 2>::from_floats(
            [[3.0, -2.0, 9.0, 0.5], [0.0, 1.0, 2.0, 3.0]],
            &device,
        );
        let targets = Tensor::<B, 1, Int>::from_ints([0, 0].as_slice(), &device);

        let loss: f32 = masked_cross_entropy(logits, targets).into_scalar().elem();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn test_masked_loss_halves_when_one_of_two_rows_is_padding() {
        let device = Default::default();
        let logits = Tensor::<B, 2>::from_floats(
            [[0.3, 1.2, -0.7, 2.0], [0.3, 1.2, -0.7, 2.0]],
            &device,
        );

        let both = Tensor::<B, 1, Int>::from_ints([2, 2].as_slice(), &device);
        let one_padded = Tensor::<B, 1, Int>::from_ints([2, 0].as_slice(), &device);

        let full: f32 = masked_cross_entropy(logits.clone(), both).into_scalar().elem();
        let half: f32 = masked_cross_entropy(logits, one_padded).into_scalar().elem();

        // Identical rows: masking one of two must exactly halve the mean
        assert!((half * 2.0 - full).abs() < 1e-6);
    }

    #[test]
    fn test_forward_loss_rejects_degenerate_captions() {
        let device = Default::default();
        let model = tiny_model::<B>(&device);
        let features = feature_batch(1, &device);
        let targets = Tensor::<B, 1, Int>::from_ints([1].as_slice(), &device).reshape([1, 1]);

        assert!(forward_loss(&model, features, targets).is_err());
    }

    #[test]
    fn test_forward_loss_is_deterministic_given_parameters() {
        // Teacher forcing never feeds predictions back in, so two runs
        // over the same inputs and parameters agree exactly.
        let device = Default::default();
        let model = tiny_model::<B>(&device);
        let targets = [[1, 5, 6, 2, 0], [1, 7, 2, 0, 0]];

        let a: f32 = forward_loss(
            &model,
            feature_batch(2, &device),
            target_batch(&targets, &device),
        )
        .unwrap()
        .into_scalar()
        .elem();

        let b: f32 = forward_loss(
            &model,
            feature_batch(2, &device),
            target_batch(&targets, &device),
        )
        .unwrap()
        .into_scalar()
        .elem();

        assert_eq!(a, b);
    }

    #[test]
    fn test_train_step_updates_model_and_reports_both_losses() {
        let device = Default::default();
        let mut model = tiny_model::<AB>(&device);
        let mut optim = AdamConfig::new().init();
        let targets = [[1, 5, 6, 2, 0], [1, 7, 2, 0, 0]];

        let mut first = f64::NAN;
        let mut last = f64::NAN;
        for step in 0..10 {
            let (updated, loss) = train_step(
                model,
                &mut optim,
                1e-2,
                feature_batch(2, &device),
                target_batch(&targets, &device),
            )
            .unwrap();
            model = updated;

            assert!(loss.summed.is_finite());
            assert!((loss.averaged - loss.summed / 5.0).abs() < 1e-9);
            if step == 0 { first = loss.averaged; }
            last = loss.averaged;
        }

        // Ten Adam steps on the same tiny batch must reduce the loss
        assert!(last < first);
    }
}
