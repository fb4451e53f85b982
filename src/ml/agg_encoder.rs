// ============================================================
// Layer 5 — Hierarchical (layer-graph) Encoder
// ============================================================
//
//   ids ─► Embedder ─► EncoderLayer ─► EncoderLayerStack ─► [out_normer]
//                      (num_sub groups      (num_layer -
//                       × num_unit units)    num_sub*num_unit units)
//
// `load_base` rebuilds this encoder from a trained flat BaseEncoder:
// the flat layer list is cut positionally by LayerPartition, so the
// first num_unit layers form group 0, the next num_unit group 1,
// and so on, with whatever is left becoming the Flat stack.
//
// Ownership: the base encoder is moved in. Its layers end up in
// exactly one place, so the two models can never drift apart or
// alias each other; clone the base first to keep an independent copy.
// The one deliberate tie is the composite combiner's output norm,
// which is the encoder's output norm (same parameters), as in the
// layout this encoder is transplanted from.

use anyhow::{ensure, Result};
use burn::{nn::LayerNorm, nn::LayerNormConfig, prelude::*};

use crate::domain::mode::RunMode;
use crate::domain::partition::LayerPartition;
use crate::ml::base_encoder::{BaseEncoder, Embedder, EmbedderConfig};
use crate::ml::hierarchy::{EncoderLayer, EncoderLayerStack};
use crate::ml::traits::UnitLayer;
use crate::ml::unit::EncoderLayerUnitConfig;

#[derive(Config, Debug)]
pub struct EncoderConfig {
    /// Model dimension.
    pub isize: usize,
    /// Vocabulary size.
    pub nwd: usize,
    /// Total number of unit layers (grouped + flat).
    pub num_layer: usize,
    /// Feed-forward hidden size; `4 * isize` when unset.
    pub fhsize: Option<usize>,
    #[config(default = 0.0)]
    pub dropout: f64,
    #[config(default = 0.0)]
    pub attn_drop: f64,
    #[config(default = 8)]
    pub num_head: usize,
    #[config(default = 512)]
    pub xseql: usize,
    #[config(default = false)]
    pub norm_output: bool,
    /// Unit-layer residuals taken from the normalised input.
    #[config(default = false)]
    pub norm_residue: bool,
    /// Layer-Groups inside the Composite Layer.
    #[config(default = 1)]
    pub num_sub: usize,
    /// Unit layers per Layer-Group.
    #[config(default = 1)]
    pub num_unit: usize,
    /// Noise power for the feed-forward noisers.
    pub power: Option<f64>,
}

impl EncoderConfig {
    pub fn partition(&self) -> LayerPartition {
        LayerPartition::new(self.num_layer, self.num_sub, self.num_unit)
    }

    pub fn validate(&self) -> Result<()> {
        self.partition().validate()
    }

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

    /// Build the encoder. The depth contract is checked by `validate`;
    /// an over-full grouping here simply leaves the Flat stack empty.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let unit      = self.unit();
        let partition = self.partition();

        let composite = EncoderLayer::new(&unit, self.num_sub, self.num_unit, device);
        let tail      = EncoderLayerStack::new(&unit, partition.tail_len(), device);

        tracing::debug!("Encoder layout: {}", partition);

        Encoder {
            embedder:   self.embedder().init(device),
            composite,
            tail,
            out_normer: self.norm_output.then(|| LayerNormConfig::new(self.isize).init(device)),
        }
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub embedder:   Embedder<B>,
    pub composite:  EncoderLayer<B>,
    pub tail:       EncoderLayerStack<B>,
    pub out_normer: Option<LayerNorm<B>>,
}

impl<B: Backend> Encoder<B> {
    /// ids: [batch, seq], mask: [batch, seq] (true on padding) → [batch, seq, isize]
    pub fn forward(
        &self,
        ids:  Tensor<B, 2, Int>,
        mask: Option<&Tensor<B, 2, Bool>>,
        mode: RunMode,
    ) -> Tensor<B, 3> {
        let out = self.embedder.forward(ids, mode);
        let out = self.composite.forward(out, mask, mode);
        let out = self.tail.forward(out, mask, mode);

        match &self.out_normer {
            Some(normer) => normer.forward(out),
            None         => out,
        }
    }

    /// Unit layers traversed per forward pass.
    pub fn num_layer(&self) -> usize {
        self.composite.num_units() + self.tail.nets.len()
    }

    /// The positional layout this encoder was built with.
    pub fn partition(&self) -> LayerPartition {
        let num_unit = self.composite.nets.first().map_or(0, |group| group.nets.len());
        LayerPartition::new(self.num_layer(), self.composite.nets.len(), num_unit)
    }

    /// Take over the embeddings, unit layers and output norm of a flat
    /// base encoder. Group combiners keep their own (fresh) weights.
    pub fn load_base(mut self, base: BaseEncoder<B>) -> Result<Self> {
        let partition = self.partition();
        ensure!(
            self.composite.nets.iter().all(|group| group.nets.len() == partition.num_unit()),
            "Layer-Groups of unequal size cannot be filled positionally",
        );
        ensure!(
            base.num_layer() == partition.num_layer(),
            "base encoder has {} layers, expected {} ({})",
            base.num_layer(),
            partition.num_layer(),
            partition,
        );

        let BaseEncoder { embedder, nets, out_normer } = base;
        let (groups, tail) = partition.split(nets)?;

        for (group, units) in self.composite.nets.iter_mut().zip(groups) {
            group.nets = units;
        }
        self.tail.nets = tail;
        self.embedder  = embedder;

        if self.out_normer.is_some() {
            self.out_normer = out_normer.clone();
        }
        self.composite.combiner.set_out_normer(out_normer);

        tracing::info!("Transplanted {} base layers as {}", partition.num_layer(), partition);
        Ok(self)
    }
}
