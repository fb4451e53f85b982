// ============================================================
// Layer 5 — Unit Layer and Cross Attention
// ============================================================
// EncoderLayerUnit is the smallest composable block of every
// encoder in this crate: pre-norm self-attention followed by the
// noise-aware feed-forward block.
//
//   x ─► LayerNorm ─► SelfAttn ─► Dropout ─► + x ─► PositionwiseFf ─► out
//
// CrossAttn reduces a sequence to one query-conditioned vector
// per batch element (used by the self-critical encoder).

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig, LayerNorm, LayerNormConfig,
    },
    prelude::*,
};

use crate::domain::mode::RunMode;
use crate::ml::dropout;
use crate::ml::feed_forward::{PositionwiseFf, PositionwiseFfConfig};
use crate::ml::traits::UnitLayer;

#[derive(Config, Debug)]
pub struct EncoderLayerUnitConfig {
    /// Model dimension.
    pub isize: usize,
    /// Feed-forward hidden size; `4 * isize` when unset.
    pub fhsize: Option<usize>,
    #[config(default = 0.0)]
    pub dropout: f64,
    /// Dropout inside the attention weights.
    #[config(default = 0.0)]
    pub attn_drop: f64,
    #[config(default = 8)]
    pub num_head: usize,
    #[config(default = false)]
    pub norm_residue: bool,
    /// Noise power for the feed-forward noiser.
    pub power: Option<f64>,
}

impl EncoderLayerUnitConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EncoderLayerUnit<B> {
        let attn = MultiHeadAttentionConfig::new(self.isize, self.num_head)
            .with_dropout(self.attn_drop)
            .init(device);
        let ff = PositionwiseFfConfig::new(self.isize)
            .with_hsize(self.fhsize)
            .with_dropout(self.dropout)
            .with_norm_residue(self.norm_residue)
            .with_power(self.power)
            .init(device);

        EncoderLayerUnit {
            attn,
            ff,
            layer_normer: LayerNormConfig::new(self.isize).init(device),
            dropout:      DropoutConfig::new(self.dropout).init(),
            norm_residue: self.norm_residue,
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderLayerUnit<B: Backend> {
    pub attn:         MultiHeadAttention<B>,
    pub ff:           PositionwiseFf<B>,
    pub layer_normer: LayerNorm<B>,
    pub dropout:      Dropout,
    pub norm_residue: bool,
}

impl<B: Backend> UnitLayer<B> for EncoderLayerUnit<B> {
    fn forward(
        &self,
        input: Tensor<B, 3>,
        mask:  Option<&Tensor<B, 2, Bool>>,
        mode:  RunMode,
    ) -> Tensor<B, 3> {
        let normed = self.layer_normer.forward(input.clone());

        let mut attn_input = MhaInput::self_attn(normed.clone());
        if let Some(mask) = mask {
            attn_input = attn_input.mask_pad(mask.clone());
        }
        let context = dropout(&self.dropout, self.attn.forward(attn_input).context, mode);
        let context = context + if self.norm_residue { normed } else { input };

        // the noiser needs the mask broadcastable against [batch, seq, isize]
        let ff_mask = mask.map(|m| m.clone().unsqueeze_dim::<3>(2));
        self.ff.forward(context, ff_mask, mode)
    }
}

// ─── CrossAttn ────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct CrossAttnConfig {
    pub isize: usize,
    #[config(default = 8)]
    pub num_head: usize,
    #[config(default = 0.0)]
    pub attn_drop: f64,
}

impl CrossAttnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CrossAttn<B> {
        CrossAttn {
            attn: MultiHeadAttentionConfig::new(self.isize, self.num_head)
                .with_dropout(self.attn_drop)
                .init(device),
        }
    }
}

/// Attention of a short query sequence over a key/value sequence.
#[derive(Module, Debug)]
pub struct CrossAttn<B: Backend> {
    pub attn: MultiHeadAttention<B>,
}

impl<B: Backend> CrossAttn<B> {
    /// query: [batch, q, isize], keyvalue: [batch, seq, isize], mask: [batch, seq]
    /// → [batch, q, isize]
    pub fn forward(
        &self,
        query:    Tensor<B, 3>,
        keyvalue: Tensor<B, 3>,
        mask:     Option<&Tensor<B, 2, Bool>>,
    ) -> Tensor<B, 3> {
        let mut input = MhaInput::new(query, keyvalue.clone(), keyvalue);
        if let Some(mask) = mask {
            input = input.mask_pad(mask.clone());
        }
        self.attn.forward(input).context
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray;

    fn pad_mask(device: &<B as Backend>::Device) -> Tensor<B, 2, Bool> {
        Tensor::<B, 2, Bool>::from_bool(
            TensorData::from([[false, false, false, true], [false, false, false, false]]),
            device,
        )
    }

    #[test]
    fn test_unit_layer_preserves_shape() {
        let device = Default::default();
        let layer  = EncoderLayerUnitConfig::new(16)
            .with_num_head(4)
            .with_power(Some(0.1))
            .init::<B>(&device);
        let x    = Tensor::<B, 3>::random([2, 4, 16], Distribution::Normal(0.0, 1.0), &device);
        let mask = pad_mask(&device);

        assert_eq!(layer.forward(x.clone(), Some(&mask), RunMode::Train).dims(), [2, 4, 16]);
        assert_eq!(layer.forward(x, None, RunMode::Eval).dims(), [2, 4, 16]);
    }

    #[test]
    fn test_cross_attention_returns_one_vector_per_query() {
        let device = Default::default();
        let attn   = CrossAttnConfig::new(16).with_num_head(4).init::<B>(&device);
        let query  = Tensor::<B, 3>::random([2, 1, 16], Distribution::Normal(0.0, 1.0), &device);
        let kv     = Tensor::<B, 3>::random([2, 4, 16], Distribution::Normal(0.0, 1.0), &device);
        let mask   = pad_mask(&device);

        assert_eq!(attn.forward(query, kv, Some(&mask)).dims(), [2, 1, 16]);
    }
}
