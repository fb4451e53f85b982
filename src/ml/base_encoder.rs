// ============================================================
// Layer 5 — Embedder and Base Encoder
// ============================================================
// The plain encoder every other encoder in this crate builds on:
//
//   token ids [batch, seq]
//       │
//       ▼
//   wemb(ids) * sqrt(isize) + pemb(positions)     (Embedder)
//       │
//       ▼
//   Dropout
//       │
//       ▼
//   unit layer 1 → unit layer 2 → ... → unit layer N
//       │
//       ▼
//   [out_normer]                                  (optional)
//
// Token id 0 is <pad>; `pad_mask` derives the padding mask from it.

use burn::{
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig},
    prelude::*,
};

use crate::domain::mode::RunMode;
use crate::ml::dropout;
use crate::ml::hierarchy::chain;
use crate::ml::unit::{EncoderLayerUnit, EncoderLayerUnitConfig};

/// Id of the padding token.
pub const PAD_ID: i64 = 0;

/// `[batch, seq]` mask, `true` where `ids` is padding.
pub fn pad_mask<B: Backend>(ids: &Tensor<B, 2, Int>) -> Tensor<B, 2, Bool> {
    ids.clone().equal_elem(PAD_ID)
}

#[derive(Config, Debug)]
pub struct EmbedderConfig {
    pub isize: usize,
    /// Vocabulary size.
    pub nwd: usize,
    /// Maximum sequence length (size of the position table).
    #[config(default = 512)]
    pub xseql: usize,
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl EmbedderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Embedder<B> {
        Embedder {
            wemb:  EmbeddingConfig::new(self.nwd, self.isize).init(device),
            pemb:  EmbeddingConfig::new(self.xseql, self.isize).init(device),
            drop:  (self.dropout > 0.0).then(|| DropoutConfig::new(self.dropout).init()),
            isize: self.isize,
        }
    }
}

/// Token embedding, learned positional embedding and input dropout.
#[derive(Module, Debug)]
pub struct Embedder<B: Backend> {
    pub wemb:  Embedding<B>,
    pub pemb:  Embedding<B>,
    pub drop:  Option<Dropout>,
    pub isize: usize,
}

impl<B: Backend> Embedder<B> {
    /// ids: [batch, seq] → [batch, seq, isize]
    pub fn forward(&self, ids: Tensor<B, 2, Int>, mode: RunMode) -> Tensor<B, 3> {
        let [batch_size, seq_len] = ids.dims();
        let device = ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);

        let out = self.wemb.forward(ids).mul_scalar((self.isize as f64).sqrt())
            + self.pemb.forward(positions);

        match &self.drop {
            Some(drop) => dropout(drop, out, mode),
            None       => out,
        }
    }
}

// ─── BaseEncoder ──────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct BaseEncoderConfig {
    pub isize: usize,
    pub nwd: usize,
    pub num_layer: usize,
    pub fhsize: Option<usize>,
    #[config(default = 0.0)]
    pub dropout: f64,
    #[config(default = 0.0)]
    pub attn_drop: f64,
    #[config(default = 8)]
    pub num_head: usize,
    #[config(default = 512)]
    pub xseql: usize,
    #[config(default = true)]
    pub norm_output: bool,
    /// Unit-layer residuals taken from the normalised input.
    #[config(default = false)]
    pub norm_residue: bool,
    pub power: Option<f64>,
}

impl BaseEncoderConfig {
    pub fn unit(&self) -> EncoderLayerUnitConfig {
        EncoderLayerUnitConfig::new(self.isize)
            .with_fhsize(self.fhsize)
            .with_dropout(self.dropout)
            .with_attn_drop(self.attn_drop)
            .with_num_head(self.num_head)
            .with_norm_residue(self.norm_residue)
            .with_power(self.power)
    }

    pub fn embedder(&self) -> EmbedderConfig {
        EmbedderConfig::new(self.isize, self.nwd)
            .with_xseql(self.xseql)
            .with_dropout(self.dropout)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> BaseEncoder<B> {
        let unit = self.unit();
        BaseEncoder {
            embedder:   self.embedder().init(device),
            nets:       (0..self.num_layer).map(|_| unit.init(device)).collect(),
            out_normer: self.norm_output.then(|| LayerNormConfig::new(self.isize).init(device)),
        }
    }
}

/// Flat list of unit layers over an embedding stage.
#[derive(Module, Debug)]
pub struct BaseEncoder<B: Backend> {
    pub embedder:   Embedder<B>,
    pub nets:       Vec<EncoderLayerUnit<B>>,
    pub out_normer: Option<LayerNorm<B>>,
}

impl<B: Backend> BaseEncoder<B> {
    /// ids: [batch, seq], mask: [batch, seq] → [batch, seq, isize]
    pub fn forward(
        &self,
        ids:  Tensor<B, 2, Int>,
        mask: Option<&Tensor<B, 2, Bool>>,
        mode: RunMode,
    ) -> Tensor<B, 3> {
        let out = self.embedder.forward(ids, mode);
        let out = chain(&self.nets, out, mask, mode);

        match &self.out_normer {
            Some(normer) => normer.forward(out),
            None         => out,
        }
    }

    pub fn num_layer(&self) -> usize {
        self.nets.len()
    }
}
