// ============================================================
// Layer 2 — ModelSpec
// ============================================================
// One serialisable description of an encoder, shared by every
// subcommand. It is what `init-config` writes, what `inspect` and
// `probe` read, and it converts into the Burn configs of the three
// encoder architectures:
//
//   Arch::Base → BaseEncoderConfig   (flat stack)
//   Arch::Agg  → EncoderConfig       (Composite Layer + Flat stack)
//   Arch::Sc   → ScEncoderConfig     (layer-weighted, self-critical)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::partition::LayerPartition;
use crate::ml::agg_encoder::EncoderConfig;
use crate::ml::base_encoder::BaseEncoderConfig;
use crate::ml::sc_encoder::ScEncoderConfig;

/// Which encoder to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Base,
    Agg,
    Sc,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arch::Base => "base",
            Arch::Agg  => "agg",
            Arch::Sc   => "sc",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub arch:          Arch,
    pub isize:         usize,
    pub nwd:           usize,
    pub num_layer:     usize,
    pub fhsize:        Option<usize>,
    pub dropout:       f64,
    pub attn_drop:     f64,
    pub num_head:      usize,
    pub xseql:         usize,
    pub norm_output:   bool,
    #[serde(default)]
    pub norm_residue:  bool,
    pub num_sub:       usize,
    pub num_unit:      usize,
    pub num_layer_dec: usize,
    pub power:         Option<f64>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            arch:          Arch::Agg,
            isize:         64,
            nwd:           1000,
            num_layer:     6,
            fhsize:        None,
            dropout:       0.1,
            attn_drop:     0.0,
            num_head:      4,
            xseql:         128,
            norm_output:   true,
            norm_residue:  false,
            num_sub:       2,
            num_unit:      2,
            num_layer_dec: 6,
            power:         Some(0.1),
        }
    }
}

impl ModelSpec {
    /// Reject specs no encoder can be built from.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.isize > 0, "isize must be positive");
        ensure!(self.nwd >= 2, "vocabulary needs at least <pad> and one token, got nwd={}", self.nwd);
        ensure!(
            self.num_head > 0 && self.isize % self.num_head == 0,
            "isize={} is not divisible by num_head={}",
            self.isize,
            self.num_head,
        );
        ensure!((0.0..1.0).contains(&self.dropout), "dropout must be in [0, 1), got {}", self.dropout);
        ensure!((0.0..1.0).contains(&self.attn_drop), "attn_drop must be in [0, 1), got {}", self.attn_drop);
        if let Some(power) = self.power {
            ensure!(power >= 0.0, "noise power must be non-negative, got {power}");
        }

        match self.arch {
            Arch::Agg => self.partition().validate(),
            Arch::Sc  => {
                ensure!(self.num_layer_dec > 0, "num_layer_dec must be positive");
                Ok(())
            }
            Arch::Base => Ok(()),
        }
    }

    pub fn partition(&self) -> LayerPartition {
        LayerPartition::new(self.num_layer, self.num_sub, self.num_unit)
    }

    pub fn base_config(&self) -> BaseEncoderConfig {
        BaseEncoderConfig::new(self.isize, self.nwd, self.num_layer)
            .with_fhsize(self.fhsize)
            .with_dropout(self.dropout)
            .with_attn_drop(self.attn_drop)
            .with_num_head(self.num_head)
            .with_xseql(self.xseql)
            .with_norm_output(self.norm_output)
            .with_norm_residue(self.norm_residue)
            .with_power(self.power)
    }

    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig::new(self.isize, self.nwd, self.num_layer)
            .with_fhsize(self.fhsize)
            .with_dropout(self.dropout)
            .with_attn_drop(self.attn_drop)
            .with_num_head(self.num_head)
            .with_xseql(self.xseql)
            .with_norm_output(self.norm_output)
            .with_norm_residue(self.norm_residue)
            .with_num_sub(self.num_sub)
            .with_num_unit(self.num_unit)
            .with_power(self.power)
    }

    pub fn sc_config(&self) -> ScEncoderConfig {
        ScEncoderConfig::new(self.isize, self.nwd, self.num_layer)
            .with_fhsize(self.fhsize)
            .with_dropout(self.dropout)
            .with_attn_drop(self.attn_drop)
            .with_num_head(self.num_head)
            .with_xseql(self.xseql)
            .with_norm_output(self.norm_output)
            .with_norm_residue(self.norm_residue)
            .with_num_layer_dec(self.num_layer_dec)
            .with_power(self.power)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ModelSpec::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_heads_and_grouping() {
        let spec = ModelSpec { num_head: 5, ..ModelSpec::default() };
        assert!(spec.validate().is_err());

        // 3 groups of 3 need 9 layers
        let spec = ModelSpec { num_sub: 3, num_unit: 3, ..ModelSpec::default() };
        assert!(spec.validate().is_err());

        // the same grouping is irrelevant for a flat encoder
        let spec = ModelSpec { arch: Arch::Base, num_sub: 3, num_unit: 3, ..ModelSpec::default() };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_configs_carry_the_spec() {
        let spec = ModelSpec {
            num_sub: 3,
            num_unit: 1,
            power: None,
            norm_residue: true,
            ..ModelSpec::default()
        };

        let agg = spec.encoder_config();
        assert_eq!((agg.num_sub, agg.num_unit, agg.num_layer), (3, 1, 6));
        assert!(agg.power.is_none());
        assert!(agg.unit().norm_residue);

        let sc = spec.sc_config();
        assert_eq!(sc.num_layer_dec, 6);
        assert!(sc.unit().norm_residue);
        assert_eq!(spec.base_config().num_head, 4);
        assert!(spec.base_config().unit().norm_residue);
    }

    #[test]
    fn test_norm_residue_defaults_off_in_older_files() {
        let mut json = serde_json::to_value(ModelSpec::default()).unwrap();
        json.as_object_mut().unwrap().remove("norm_residue");
        let spec: ModelSpec = serde_json::from_value(json).unwrap();
        assert!(!spec.norm_residue);
    }

    #[test]
    fn test_arch_serialises_lowercase() {
        let json = serde_json::to_string(&Arch::Sc).unwrap();
        assert_eq!(json, "\"sc\"");
        assert_eq!(Arch::Agg.to_string(), "agg");
    }
}
