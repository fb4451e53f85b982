// ============================================================
// Layer 5 — Layer Capabilities
// ============================================================
// Two small traits decouple the hierarchy from the concrete
// layers it is made of:
//
//   UnitLayer — anything with the encoder-layer contract
//               [batch, seq, isize] -> [batch, seq, isize]
//               A Layer-Group satisfies it too, which is what
//               lets the Composite Layer nest groups as units.
//
//   Combine   — folds an ordered list of same-shaped tensors
//               into one. Order mirrors layer execution order.

use burn::prelude::*;

use crate::domain::mode::RunMode;

/// Same-shape sequence layer: `[batch, seq, isize] -> [batch, seq, isize]`.
///
/// `mask` is the `[batch, seq]` padding mask (`true` on padding).
pub trait UnitLayer<B: Backend> {
    fn forward(
        &self,
        input: Tensor<B, 3>,
        mask:  Option<&Tensor<B, 2, Bool>>,
        mode:  RunMode,
    ) -> Tensor<B, 3>;
}

/// Aggregates an ordered list of same-shaped tensors into one tensor of that shape.
pub trait Combine<B: Backend> {
    fn combine(&self, inputs: Vec<Tensor<B, 3>>, mode: RunMode) -> Tensor<B, 3>;
}
