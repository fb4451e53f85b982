// ============================================================
// Layer 5 — Residue Combiner
// ============================================================
// Folds N same-shaped activations into one:
//
//   out = x_1 + ... + x_N + MLP(cat(x_1, ..., x_N))
//   out = out_normer(out)            (when the hook is set)
//
// The concatenation makes the combiner order-sensitive: swapping
// two inputs changes which MLP weights see which layer.

use burn::{
    nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{gelu, sigmoid},
};

use crate::domain::mode::RunMode;
use crate::ml::dropout;
use crate::ml::traits::Combine;

#[derive(Config, Debug)]
pub struct ResidueCombinerConfig {
    /// Feature size of every input.
    pub isize: usize,
    /// Number of inputs combined per call.
    pub num_inputs: usize,
    /// Hidden size of the MLP; `4 * isize` when unset.
    pub hsize: Option<usize>,
    #[config(default = 0.0)]
    pub dropout: f64,
    /// GeLU instead of Sigmoid inside the MLP.
    #[config(default = false)]
    pub use_gelu: bool,
}

impl ResidueCombinerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResidueCombiner<B> {
        let hsize = self.hsize.unwrap_or(self.isize * 4);
        ResidueCombiner {
            linear_in:  LinearConfig::new(self.isize * self.num_inputs, hsize).init(device),
            linear_out: LinearConfig::new(hsize, self.isize).with_bias(false).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            out_normer: Some(LayerNormConfig::new(self.isize).init(device)),
            num_inputs: self.num_inputs,
            use_gelu:   self.use_gelu,
        }
    }
}

#[derive(Module, Debug)]
pub struct ResidueCombiner<B: Backend> {
    pub linear_in:  Linear<B>,
    pub linear_out: Linear<B>,
    pub dropout:    Dropout,
    /// Output normalisation hook, replaceable after construction.
    pub out_normer: Option<LayerNorm<B>>,
    pub num_inputs: usize,
    pub use_gelu:   bool,
}

impl<B: Backend> ResidueCombiner<B> {
    pub fn set_out_normer(&mut self, normer: Option<LayerNorm<B>>) {
        self.out_normer = normer;
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }
}

impl<B: Backend> Combine<B> for ResidueCombiner<B> {
    fn combine(&self, inputs: Vec<Tensor<B, 3>>, mode: RunMode) -> Tensor<B, 3> {
        // [batch, seq, isize, N] summed over N
        let residue = Tensor::stack::<4>(inputs.clone(), 3)
            .sum_dim(3)
            .squeeze_dim::<3>(3);

        let hidden = self.linear_in.forward(Tensor::cat(inputs, 2));
        let hidden = if self.use_gelu { gelu(hidden) } else { sigmoid(hidden) };
        let hidden = dropout(&self.dropout, hidden, mode);
        let out    = dropout(&self.dropout, self.linear_out.forward(hidden), mode) + residue;

        match &self.out_normer {
            Some(normer) => normer.forward(out),
            None         => out,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray;

    fn inputs(n: usize, device: &<B as Backend>::Device) -> Vec<Tensor<B, 3>> {
        (0..n)
            .map(|_| Tensor::<B, 3>::random([2, 3, 4], Distribution::Normal(0.0, 1.0), device))
            .collect()
    }

    #[test]
    fn test_combine_preserves_shape() {
        let device   = Default::default();
        let combiner = ResidueCombinerConfig::new(4, 3).init::<B>(&device);
        let out      = combiner.combine(inputs(3, &device), RunMode::Eval);
        assert_eq!(out.dims(), [2, 3, 4]);
    }

    #[test]
    fn test_input_order_matters() {
        let device   = Default::default();
        let combiner = ResidueCombinerConfig::new(4, 2).init::<B>(&device);
        let xs       = inputs(2, &device);
        let reversed = vec![xs[1].clone(), xs[0].clone()];

        let a = combiner.combine(xs, RunMode::Eval).into_data().to_vec::<f32>().unwrap();
        let b = combiner.combine(reversed, RunMode::Eval).into_data().to_vec::<f32>().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_out_normer_hook_can_be_removed() {
        let device       = Default::default();
        let mut combiner = ResidueCombinerConfig::new(4, 2).init::<B>(&device);
        assert!(combiner.out_normer.is_some());

        combiner.set_out_normer(None);
        let out = combiner.combine(inputs(2, &device), RunMode::Eval);
        assert_eq!(out.dims(), [2, 3, 4]);
        assert_eq!(combiner.num_inputs(), 2);
    }
}
