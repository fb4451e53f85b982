// ============================================================
// Layer 5 — Layer-to-Decoder-Layer Transform
// ============================================================
// Remaps an ordered list of L+1 per-layer tensors (the initial
// state followed by every encoder layer's output) into one tensor
// indexed by decoder layer:
//
//   [x_0, ..., x_L]              each [batch, seq, isize]
//        │ stack on a new trailing axis
//        ▼
//   [batch, seq, isize, L+1]
//        │ flatten leading axes
//        ▼
//   [batch*seq*isize, L+1] × softmax_0(W) [L+1, T]
//        │
//        ▼
//   [batch, seq, isize, T]
//
// Column t of softmax_0(W) is a probability distribution over the
// source layers: decoder layer t sees a convex combination of them.

use burn::{
    module::Param,
    nn::Dropout,
    prelude::*,
    tensor::{activation::softmax, Distribution},
};

use crate::domain::mode::RunMode;
use crate::ml::dropout;

/// Learned `[num_layer + 1, num_layer_dec]` weights, uniform in
/// `±sqrt(2 / (num_layer + num_layer_dec + 1))`.
pub fn init_layer_weights<B: Backend>(
    num_layer:     usize,
    num_layer_dec: usize,
    device:        &B::Device,
) -> Param<Tensor<B, 2>> {
    let bound = (2.0 / (num_layer + num_layer_dec + 1) as f64).sqrt();
    Param::from_tensor(Tensor::random(
        [num_layer + 1, num_layer_dec],
        Distribution::Uniform(-bound, bound),
        device,
    ))
}

/// Column-normalised layer weights: softmax over the source-layer axis.
pub fn layer_weights<B: Backend>(
    weight: Tensor<B, 2>,
    drop:   Option<&Dropout>,
    mode:   RunMode,
) -> Tensor<B, 2> {
    let weight = match drop {
        Some(drop) => dropout(drop, weight, mode),
        None       => weight,
    };
    softmax(weight, 0)
}

/// Combine `layers` (each `[batch, seq, isize]`) with `weight`
/// `[layers.len(), T]` into `[batch, seq, isize, T]`.
pub fn transform<B: Backend>(
    layers: Vec<Tensor<B, 3>>,
    weight: Tensor<B, 2>,
    drop:   Option<&Dropout>,
    mode:   RunMode,
) -> Tensor<B, 4> {
    let stacked = Tensor::stack::<4>(layers, 3);
    let [batch, seq, isize, sources] = stacked.dims();

    let weights = layer_weights(weight, drop, mode);
    let targets = weights.dims()[1];

    stacked
        .reshape([batch * seq * isize, sources])
        .matmul(weights)
        .reshape([batch, seq, isize, targets])
}
