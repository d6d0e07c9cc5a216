// ============================================================
// Layer 5 — Recurrent Cell
// ============================================================
// The decoder's memory. A RecurrentCell consumes one timestep's
// input vector and the state left behind by the previous step,
// and returns its output together with the updated state.
//
// The trait keeps TrainingLoop/InferenceLoop independent of the
// gating maths: any cell that can "step one timestep given
// state" slots in. The single implementation is a standard LSTM
// cell — four gates, two state vectors:
//
//   i = σ(W_i·x + U_i·h)      input gate
//   f = σ(W_f·x + U_f·h)      forget gate
//   g = tanh(W_g·x + U_g·h)   candidate cell
//   o = σ(W_o·x + U_o·h)      output gate
//   c' = f ⊙ c + i ⊙ g
//   h' = o ⊙ tanh(c')
//
// All four input projections live in one Linear of width
// 4*units (and likewise for the hidden projections), computed
// in a single matmul and sliced apart afterwards.
//
// Reference: Hochreiter & Schmidhuber (1997) LSTM
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation,
};

// ─── RecurrentState ───────────────────────────────────────────────────────────
/// The hidden/cell tensor pair carried between decode steps.
///
/// Owned by exactly one decoding episode: zeroed at the start,
/// threaded strictly sequentially (step N+1 needs the state
/// returned by step N), and dropped when the episode ends.
#[derive(Debug, Clone)]
pub struct RecurrentState<B: Backend> {
    /// Short-term output state — shape: [batch_size, units]
    pub hidden: Tensor<B, 2>,

    /// Long-term cell state — shape: [batch_size, units]
    pub cell: Tensor<B, 2>,
}

// ─── RecurrentCell ────────────────────────────────────────────────────────────
/// One-timestep recurrence. Implementations must keep every
/// per-step tensor shape-aligned on the batch dimension.
pub trait RecurrentCell<B: Backend> {
    /// Width of the hidden and cell state vectors.
    fn units(&self) -> usize;

    /// A fresh all-zero state for a batch of the given size.
    fn reset_state(&self, batch_size: usize, device: &B::Device) -> RecurrentState<B>;

    /// Advance one timestep.
    /// input: [batch_size, d_input] → (output [batch_size, units], new state)
    fn step(&self, input: Tensor<B, 2>, state: RecurrentState<B>)
        -> (Tensor<B, 2>, RecurrentState<B>);
}

// ─── LstmCell ─────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct LstmCellConfig {
    pub d_input: usize,
    pub units:   usize,
}

impl LstmCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmCell<B> {
        LstmCell {
            // One projection per source, each covering all four gates.
            // The bias lives on the input projection only — adding a
            // second bias on the hidden projection would be redundant.
            input_gates:  LinearConfig::new(self.d_input, 4 * self.units).init(device),
            hidden_gates: LinearConfig::new(self.units, 4 * self.units)
                .with_bias(false)
                .init(device),
            units: self.units,
        }
    }
}

#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    input_gates:  Linear<B>,
    hidden_gates: Linear<B>,
    units:        usize,
}

impl<B: Backend> RecurrentCell<B> for LstmCell<B> {
    fn units(&self) -> usize {
        self.units
    }

    fn reset_state(&self, batch_size: usize, device: &B::Device) -> RecurrentState<B> {
        RecurrentState {
            hidden: Tensor::zeros([batch_size, self.units], device),
            cell:   Tensor::zeros([batch_size, self.units], device),
        }
    }

    fn step(
        &self,
        input: Tensor<B, 2>,
        state: RecurrentState<B>,
    ) -> (Tensor<B, 2>, RecurrentState<B>) {
        let [batch_size, _] = input.dims();
        let u = self.units;

        // [batch, 4*units] — i | f | g | o, in that order
        let gates = self.input_gates.forward(input) + self.hidden_gates.forward(state.hidden);

        let i = activation::sigmoid(gates.clone().slice([0..batch_size, 0..u]));
        let f = activation::sigmoid(gates.clone().slice([0..batch_size, u..2 * u]));
        let g = gates.clone().slice([0..batch_size, 2 * u..3 * u]).tanh();
        let o = activation::sigmoid(gates.slice([0..batch_size, 3 * u..4 * u]));

        let cell = f * state.cell + i * g;
        let hidden = o * cell.clone().tanh();

        (hidden.clone(), RecurrentState { hidden, cell })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    fn cell(d_input: usize, units: usize) -> LstmCell<B> {
        LstmCellConfig::new(d_input, units).init(&Default::default())
    }

    #[test]
    fn test_reset_state_is_zero() {
        let c = cell(8, 16);
        let state = c.reset_state(3, &Default::default());
        assert_eq!(state.hidden.dims(), [3, 16]);
        assert_eq!(state.cell.dims(), [3, 16]);

        let h: Vec<f32> = state.hidden.into_data().to_vec().unwrap();
        let s: Vec<f32> = state.cell.into_data().to_vec().unwrap();
        assert!(h.iter().all(|&v| v == 0.0));
        assert!(s.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_step_shapes_align_on_batch() {
        let c = cell(8, 16);
        let device = Default::default();
        let state = c.reset_state(5, &device);
        let input = Tensor::<B, 2>::ones([5, 8], &device);

        let (output, state) = c.step(input, state);
        assert_eq!(output.dims(), [5, 16]);
        assert_eq!(state.hidden.dims(), [5, 16]);
        assert_eq!(state.cell.dims(), [5, 16]);
    }

    #[test]
    fn test_state_threads_between_steps() {
        // Feeding the same input twice must produce different outputs,
        // because the second step sees the state the first one wrote.
        let c = cell(4, 8);
        let device = Default::default();
        let input = Tensor::<B, 2>::ones([1, 4], &device);

        let state = c.reset_state(1, &device);
        let (out1, state) = c.step(input.clone(), state);
        let (out2, _) = c.step(input, state);

        let a: Vec<f32> = out1.into_data().to_vec().unwrap();
        let b: Vec<f32> = out2.into_data().to_vec().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_output_equals_new_hidden_state() {
        let c = cell(4, 8);
        let device = Default::default();
        let state = c.reset_state(2, &device);
        let input = Tensor::<B, 2>::ones([2, 4], &device);

        let (output, state) = c.step(input, state);
        let out: Vec<f32> = output.into_data().to_vec().unwrap();
        let hid: Vec<f32> = state.hidden.into_data().to_vec().unwrap();
        assert_eq!(out, hid);
    }
}
