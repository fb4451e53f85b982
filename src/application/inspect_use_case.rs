// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Builds the encoder a ModelSpec describes on the CPU backend and
// summarises its structure without running it.

use anyhow::Result;
use burn::{backend::NdArray, module::Module};

use crate::application::model_spec::{Arch, ModelSpec};

/// Structural summary of one encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub arch:       Arch,
    pub num_params: usize,
    /// Unit layers traversed per forward pass.
    pub depth:      usize,
    pub layout:     String,
}

pub struct InspectUseCase {
    spec: ModelSpec,
}

impl InspectUseCase {
    pub fn new(spec: ModelSpec) -> Self {
        Self { spec }
    }

    pub fn execute(&self) -> Result<Inspection> {
        let spec = &self.spec;
        spec.validate()?;

        let device = Default::default();
        let inspection = match spec.arch {
            Arch::Base => {
                let encoder = spec.base_config().init::<NdArray>(&device);
                Inspection {
                    arch:       spec.arch,
                    num_params: encoder.num_params(),
                    depth:      encoder.num_layer(),
                    layout:     format!("flat x{}", encoder.num_layer()),
                }
            }
            Arch::Agg => {
                let encoder = spec.encoder_config().init::<NdArray>(&device);
                Inspection {
                    arch:       spec.arch,
                    num_params: encoder.num_params(),
                    depth:      encoder.num_layer(),
                    layout:     encoder.partition().to_string(),
                }
            }
            Arch::Sc => {
                let encoder = spec.sc_config().init::<NdArray>(&device);
                Inspection {
                    arch:       spec.arch,
                    num_params: encoder.num_params(),
                    depth:      encoder.ta.nets.len(),
                    layout:     format!(
                        "flat x{} -> {} decoder layers",
                        encoder.ta.nets.len(),
                        encoder.ta.num_layer_dec(),
                    ),
                }
            }
        };

        tracing::debug!("Inspected {:?}", inspection);
        Ok(inspection)
    }
}
