// ============================================================
// Layer 5 — Layer-weighted (TA) and Self-Critical (SC) Encoders
// ============================================================
// TaEncoder: a flat encoder that, instead of returning its last
// layer, returns one learned mixture of all layer states per
// decoder layer:
//
//   outs = [norm(emb), layer_1, ..., layer_L]
//   out  = transform(outs, tattn_w)                [b, s, isize, T]
//
// ScEncoder adds a second track. A pooled global query h0 (max over
// the sequence, padding excluded) attends over every layer's output,
// giving one summary vector per layer:
//
//   hl = [h0, attn_1(h0, layer_1), ..., attn_L(h0, layer_L)]
//   hl = transform(hl, sc_tattn_w)                 [b, 1, isize, T]
//
// Both weight matrices are [L+1, T] and are softmax-normalised over
// the source-layer axis inside `transform`.

use burn::{
    module::Param,
    nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig},
    prelude::*,
};

use crate::domain::mode::RunMode;
use crate::ml::base_encoder::{Embedder, EmbedderConfig};
use crate::ml::traits::UnitLayer;
use crate::ml::transform::{init_layer_weights, transform};
use crate::ml::unit::{CrossAttn, CrossAttnConfig, EncoderLayerUnit, EncoderLayerUnitConfig};

#[derive(Config, Debug)]
pub struct ScEncoderConfig {
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
    /// Number of decoder layers the outputs are indexed by.
    #[config(default = 6)]
    pub num_layer_dec: usize,
    pub power: Option<f64>,
}

impl ScEncoderConfig {
    pub fn unit(&self) -> EncoderLayerUnitConfig {
        EncoderLayerUnitConfig::new(self.isize)
            .with_fhsize(self.fhsize)
            .with_dropout(self.dropout)
            .with_attn_drop(self.attn_drop)
            .with_num_head(self.num_head)
            .with_norm_residue(self.norm_residue)
            .with_power(self.power)
    }

    fn weight_drop(&self) -> Option<Dropout> {
        (self.dropout > 0.0).then(|| DropoutConfig::new(self.dropout).init())
    }

    pub fn init_ta<B: Backend>(&self, device: &B::Device) -> TaEncoder<B> {
        let unit = self.unit();
        TaEncoder {
            embedder: EmbedderConfig::new(self.isize, self.nwd)
                .with_xseql(self.xseql)
                .with_dropout(self.dropout)
                .init(device),
            nets:       (0..self.num_layer).map(|_| unit.init(device)).collect(),
            out_normer: self.norm_output.then(|| LayerNormConfig::new(self.isize).init(device)),
            tattn_w:    init_layer_weights(self.num_layer, self.num_layer_dec, device),
            tattn_drop: self.weight_drop(),
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ScEncoder<B> {
        let attn = CrossAttnConfig::new(self.isize)
            .with_num_head(self.num_head)
            .with_attn_drop(self.attn_drop);

        ScEncoder {
            ta:            self.init_ta(device),
            attns:         (0..self.num_layer).map(|_| attn.init(device)).collect(),
            sc_tattn_w:    init_layer_weights(self.num_layer, self.num_layer_dec, device),
            sc_tattn_drop: self.weight_drop(),
        }
    }
}

// ─── TaEncoder ────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct TaEncoder<B: Backend> {
    pub embedder:   Embedder<B>,
    pub nets:       Vec<EncoderLayerUnit<B>>,
    pub out_normer: Option<LayerNorm<B>>,
    /// [num_layer + 1, num_layer_dec]
    pub tattn_w:    Param<Tensor<B, 2>>,
    pub tattn_drop: Option<Dropout>,
}

impl<B: Backend> TaEncoder<B> {
    /// Embedded (and normalised) input: the layer-0 state.
    pub fn embed(&self, ids: Tensor<B, 2, Int>, mode: RunMode) -> Tensor<B, 3> {
        let out = self.embedder.forward(ids, mode);
        match &self.out_normer {
            Some(normer) => normer.forward(out),
            None         => out,
        }
    }

    /// ids: [batch, seq] → [batch, seq, isize, num_layer_dec]
    pub fn forward(
        &self,
        ids:  Tensor<B, 2, Int>,
        mask: Option<&Tensor<B, 2, Bool>>,
        mode: RunMode,
    ) -> Tensor<B, 4> {
        let mut out  = self.embed(ids, mode);
        let mut outs = Vec::with_capacity(self.nets.len() + 1);
        outs.push(out.clone());

        for net in &self.nets {
            out = net.forward(out, mask, mode);
            outs.push(out.clone());
        }

        transform(outs, self.tattn_w.val(), self.tattn_drop.as_ref(), mode)
    }

    pub fn num_layer_dec(&self) -> usize {
        self.tattn_w.val().dims()[1]
    }
}

// ─── ScEncoder ────────────────────────────────────────────────────────────────

/// Per-decoder-layer encoder states plus per-decoder-layer
/// cross-attention summaries.
pub struct ScOutput<B: Backend> {
    /// [batch, seq, isize, num_layer_dec]
    pub out: Tensor<B, 4>,
    /// [batch, 1, isize, num_layer_dec]
    pub hl:  Tensor<B, 4>,
}

#[derive(Module, Debug)]
pub struct ScEncoder<B: Backend> {
    pub ta:            TaEncoder<B>,
    /// One cross attention per encoder layer.
    pub attns:         Vec<CrossAttn<B>>,
    /// [num_layer + 1, num_layer_dec]
    pub sc_tattn_w:    Param<Tensor<B, 2>>,
    pub sc_tattn_drop: Option<Dropout>,
}

/// Max over the sequence axis; padding positions are set to -inf
/// first so they never win. [batch, seq, isize] → [batch, 1, isize]
pub fn pooled_query<B: Backend>(
    out:  Tensor<B, 3>,
    mask: Option<&Tensor<B, 2, Bool>>,
) -> Tensor<B, 3> {
    match mask {
        None => out.max_dim(1),
        Some(mask) => {
            let dims = out.dims();
            // [batch, seq] → [batch, seq, 1] → [batch, seq, isize]
            let mask = mask.clone().unsqueeze_dim::<3>(2).expand(dims);
            out.mask_fill(mask, f32::NEG_INFINITY).max_dim(1)
        }
    }
}

impl<B: Backend> ScEncoder<B> {
    pub fn forward(
        &self,
        ids:  Tensor<B, 2, Int>,
        mask: Option<&Tensor<B, 2, Bool>>,
        mode: RunMode,
    ) -> ScOutput<B> {
        let ta = &self.ta;

        let mut out = ta.embed(ids, mode);
        let h0      = pooled_query(out.clone(), mask);

        let mut outs = Vec::with_capacity(ta.nets.len() + 1);
        let mut hl   = Vec::with_capacity(ta.nets.len() + 1);
        outs.push(out.clone());
        hl.push(h0.clone());

        for (net, attn) in ta.nets.iter().zip(&self.attns) {
            out = net.forward(out, mask, mode);
            outs.push(out.clone());
            hl.push(attn.forward(h0.clone(), out.clone(), mask));
        }

        ScOutput {
            out: transform(outs, ta.tattn_w.val(), ta.tattn_drop.as_ref(), mode),
            hl:  transform(hl, self.sc_tattn_w.val(), self.sc_tattn_drop.as_ref(), mode),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::base_encoder::pad_mask;
    use burn::backend::NdArray;

    type B = NdArray;

    fn config() -> ScEncoderConfig {
        ScEncoderConfig::new(8, 30, 3)
            .with_num_head(2)
            .with_xseql(16)
            .with_num_layer_dec(4)
    }

    fn ids(device: &<B as Backend>::Device) -> Tensor<B, 2, Int> {
        Tensor::<B, 2, Int>::from_ints([[3, 7, 11, 0, 0, 0], [1, 2, 3, 4, 5, 6]], device)
    }

    #[test]
    fn test_ta_encoder_output_is_indexed_by_decoder_layer() {
        let device  = Default::default();
        let encoder = config().init_ta::<B>(&device);
        let ids     = ids(&device);
        let mask    = pad_mask(&ids);

        assert_eq!(encoder.tattn_w.val().dims(), [4, 4]);
        assert_eq!(encoder.num_layer_dec(), 4);
        assert_eq!(encoder.forward(ids, Some(&mask), RunMode::Eval).dims(), [2, 6, 8, 4]);
    }

    #[test]
    fn test_sc_encoder_output_shapes() {
        let device  = Default::default();
        let encoder = config().with_power(Some(0.1)).with_dropout(0.1).init::<B>(&device);
        let ids     = ids(&device);
        let mask    = pad_mask(&ids);

        assert_eq!(encoder.attns.len(), 3);
        assert_eq!(encoder.sc_tattn_w.val().dims(), [4, 4]);

        let output = encoder.forward(ids.clone(), Some(&mask), RunMode::Train);
        assert_eq!(output.out.dims(), [2, 6, 8, 4]);
        assert_eq!(output.hl.dims(), [2, 1, 8, 4]);

        let output = encoder.forward(ids, None, RunMode::Eval);
        assert_eq!(output.hl.dims(), [2, 1, 8, 4]);
    }

    // Source/decoder slice k of a [batch, seq, isize, T] output.
    fn decoder_layer(t: Tensor<B, 4>, k: usize) -> Tensor<B, 3> {
        t.narrow(3, k, 1).squeeze_dim::<3>(3)
    }

    fn max_abs_diff(a: Tensor<B, 3>, b: Tensor<B, 3>) -> f32 {
        (a - b).abs().max().into_scalar().elem::<f32>()
    }

    #[test]
    fn test_layer_weights_select_tracks_independently() {
        let device      = Default::default();
        let mut encoder = config().with_num_layer_dec(2).init::<B>(&device);
        let ids         = ids(&device);
        let mask        = pad_mask(&ids);

        // after the softmax each column is one-hot over the 4 sources
        // decoder 0 ← embedding, decoder 1 ← last layer
        let first_last = [[80.0, -80.0], [-80.0, -80.0], [-80.0, -80.0], [-80.0, 80.0]];
        // decoder 0 ← last layer, decoder 1 ← pooled query
        let last_first = [[-80.0, 80.0], [-80.0, -80.0], [-80.0, -80.0], [80.0, -80.0]];
        encoder.ta.tattn_w = Param::from_tensor(Tensor::<B, 2>::from_floats(first_last, &device));
        encoder.sc_tattn_w = Param::from_tensor(Tensor::<B, 2>::from_floats(last_first, &device));

        let output = encoder.forward(ids.clone(), Some(&mask), RunMode::Eval);

        let emb  = encoder.ta.embed(ids.clone(), RunMode::Eval);
        let h0   = pooled_query(emb.clone(), Some(&mask));
        let last = crate::ml::hierarchy::chain(&encoder.ta.nets, emb.clone(), Some(&mask), RunMode::Eval);

        assert!(max_abs_diff(decoder_layer(output.out.clone(), 0), emb) < 1e-4);
        assert!(max_abs_diff(decoder_layer(output.out.clone(), 1), last) < 1e-4);
        assert!(max_abs_diff(decoder_layer(output.hl.clone(), 1), h0.clone()) < 1e-4);
        // hl's last source is the last layer's cross attention, not h0
        assert!(max_abs_diff(decoder_layer(output.hl, 0), h0) > 1e-4);

        // the TA track alone uses the same weights
        let ta_out = encoder.ta.forward(ids, Some(&mask), RunMode::Eval);
        assert!(max_abs_diff(decoder_layer(ta_out, 0), decoder_layer(output.out, 0)) < 1e-6);
    }

    #[test]
    fn test_pooled_query_ignores_padding() {
        let device = Default::default();
        // the padded position holds the largest values
        let out = Tensor::<B, 3>::from_floats(
            [[[1.0, 5.0], [3.0, 2.0], [100.0, 100.0]]],
            &device,
        );
        let mask = Tensor::<B, 2, Bool>::from_bool(TensorData::from([[false, false, true]]), &device);

        let pooled = pooled_query(out.clone(), Some(&mask));
        assert_eq!(pooled.dims(), [1, 1, 2]);
        assert_eq!(pooled.into_data().to_vec::<f32>().unwrap(), vec![3.0, 5.0]);

        let unmasked = pooled_query(out, None).into_data().to_vec::<f32>().unwrap();
        assert_eq!(unmasked, vec![100.0, 100.0]);
    }
}
