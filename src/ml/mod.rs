// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn-specific code lives in this layer.
//
//   noise.rs        — Gaussian / Uniform noisers, scalar or per-vector
//   feed_forward.rs — LayerNorm → [Noiser] → MLP → residual
//   combiner.rs     — ResidueCombiner, folds N activations into one
//   traits.rs       — UnitLayer / Combine capabilities
//   unit.rs         — EncoderLayerUnit (self-attn + FF), CrossAttn
//   hierarchy.rs    — Layer-Group, Flat stack, Composite Layer
//   base_encoder.rs — Embedder + plain flat encoder
//   agg_encoder.rs  — hierarchical encoder + weight transplant
//   transform.rs    — softmax-weighted layer → decoder-layer remap
//   sc_encoder.rs   — layer-weighted (TA) and self-critical encoders
//
// Every forward pass takes an explicit RunMode; nothing in this
// layer reads an ambient training flag.

pub mod noise;
pub mod feed_forward;
pub mod combiner;
pub mod traits;
pub mod unit;
pub mod hierarchy;
pub mod base_encoder;
pub mod agg_encoder;
pub mod transform;
pub mod sc_encoder;

use burn::{nn::Dropout, prelude::*};

use crate::domain::mode::RunMode;

/// The conventional mode for a backend: `Train` when it records
/// gradients (an `Autodiff<_>` backend), `Eval` otherwise.
pub fn run_mode<B: Backend>() -> RunMode {
    if B::ad_enabled() { RunMode::Train } else { RunMode::Eval }
}

/// Apply `drop` only while training.
pub(crate) fn dropout<B: Backend, const D: usize>(
    drop:  &Dropout,
    input: Tensor<B, D>,
    mode:  RunMode,
) -> Tensor<B, D> {
    if mode.is_train() { drop.forward(input) } else { input }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    #[test]
    fn test_run_mode_follows_autodiff() {
        assert_eq!(run_mode::<NdArray>(), RunMode::Eval);
        assert_eq!(run_mode::<Autodiff<NdArray>>(), RunMode::Train);
    }
}
