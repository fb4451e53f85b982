// ============================================================
// Layer 5 — Noise-aware Position-wise Feed-Forward
// ============================================================
//
//   x ──► LayerNorm ──► [Noiser] ──► Linear ─► act ─► Dropout ─► Linear ─► Dropout ──► + ──► out
//   │                     │                                                            ▲
//   │                     └──────────── (norm_residue = true) ─────────────────────────┤
//   └─────────────────────────────────── (norm_residue = false) ───────────────────────┘
//
// The noiser sits strictly between normalisation and the transform:
// the normalisation statistics are never disturbed, only the
// distribution the transform sees during training.

use burn::{
    nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{gelu, relu},
};

use crate::domain::mode::RunMode;
use crate::ml::dropout;
use crate::ml::noise::{Noise, Noiser};

#[derive(Config, Debug)]
pub struct PositionwiseFfConfig {
    /// Input / output feature size.
    pub isize: usize,
    /// Hidden size; `4 * isize` when unset.
    pub hsize: Option<usize>,
    #[config(default = 0.0)]
    pub dropout: f64,
    /// Residual from the normalised input instead of the raw input.
    #[config(default = false)]
    pub norm_residue: bool,
    /// GeLU instead of ReLU.
    #[config(default = false)]
    pub use_gelu: bool,
    /// Noise power; no noiser when unset.
    pub power: Option<f64>,
}

impl PositionwiseFfConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PositionwiseFf<B> {
        let hsize = self.hsize.unwrap_or(self.isize * 4);
        PositionwiseFf {
            normer:       LayerNormConfig::new(self.isize).init(device),
            linear_in:    LinearConfig::new(self.isize, hsize).init(device),
            linear_out:   LinearConfig::new(hsize, self.isize).init(device),
            dropout:      DropoutConfig::new(self.dropout).init(),
            noiser:       self.power.map(Noiser::new),
            norm_residue: self.norm_residue,
            use_gelu:     self.use_gelu,
        }
    }
}

#[derive(Module, Debug)]
pub struct PositionwiseFf<B: Backend> {
    pub normer:       LayerNorm<B>,
    pub linear_in:    Linear<B>,
    pub linear_out:   Linear<B>,
    pub dropout:      Dropout,
    pub noiser:       Option<Noiser>,
    pub norm_residue: bool,
    pub use_gelu:     bool,
}

impl<B: Backend> PositionwiseFf<B> {
    /// x: [batch, seq, isize], mask: [batch, seq, 1] (true on padding)
    pub fn forward(
        &self,
        x:    Tensor<B, 3>,
        mask: Option<Tensor<B, 3, Bool>>,
        mode: RunMode,
    ) -> Tensor<B, 3> {
        let mut normed = self.normer.forward(x.clone());
        if let Some(noiser) = &self.noiser {
            normed = noiser.noise(normed, mask, mode);
        }

        let hidden = self.linear_in.forward(normed.clone());
        let hidden = if self.use_gelu { gelu(hidden) } else { relu(hidden) };
        let hidden = dropout(&self.dropout, hidden, mode);
        let out    = dropout(&self.dropout, self.linear_out.forward(hidden), mode);

        out + if self.norm_residue { normed } else { x }
    }
}
