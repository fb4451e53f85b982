// ============================================================
// Layer 2 — ProbeUseCase
// ============================================================
// Builds the encoder a ModelSpec describes, pushes one random
// padded batch through it and reports what came out:
//
//   Step 1: Pick the backend       (ndarray | wgpu, optionally Autodiff)
//   Step 2: Sample a batch         (Layer 4 - data)
//   Step 3: Build the encoder      (Layer 5 - ml), optionally by
//                                  transplanting a fresh flat encoder
//   Step 4: Forward pass           in the requested RunMode
//   Step 5: Noise calibration      realised ||noise|| / ||x|| of the
//                                  feed-forward noiser
//   Step 6: Append to the report   (Layer 6 - infra)

use anyhow::Result;
use burn::{
    backend::{Autodiff, NdArray, Wgpu},
    prelude::*,
    tensor::Distribution,
};
use rand::{rngs::StdRng, SeedableRng};
use std::time::Instant;

use crate::application::model_spec::{Arch, ModelSpec};
use crate::data::batcher::{random_sequences, TokenBatcher};
use crate::domain::mode::RunMode;
use crate::infra::report::{ProbeReport, ReportLogger};
use crate::ml::noise::{Noise, Noiser};
use crate::ml::run_mode;

/// Tensor backend to probe on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    Ndarray,
    Wgpu,
}

impl BackendKind {
    fn name(self, autodiff: bool) -> String {
        let inner = match self {
            BackendKind::Ndarray => "ndarray",
            BackendKind::Wgpu    => "wgpu",
        };
        if autodiff { format!("autodiff-{inner}") } else { inner.to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub batch:      usize,
    pub seq_len:    usize,
    pub backend:    BackendKind,
    /// Wrap the backend in `Autodiff`.
    pub autodiff:   bool,
    /// Defaults to the backend's conventional mode (Train under Autodiff).
    pub mode:       Option<RunMode>,
    /// For `agg`: build a flat encoder first and transplant it.
    pub from_base:  bool,
    pub seed:       u64,
    pub report_dir: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            batch:      4,
            seq_len:    16,
            backend:    BackendKind::Ndarray,
            autodiff:   false,
            mode:       None,
            from_base:  false,
            seed:       42,
            report_dir: None,
        }
    }
}

pub struct ProbeUseCase {
    spec:   ModelSpec,
    config: ProbeConfig,
}

impl ProbeUseCase {
    pub fn new(spec: ModelSpec, config: ProbeConfig) -> Self {
        Self { spec, config }
    }

    pub fn execute(&self) -> Result<ProbeReport> {
        self.spec.validate()?;

        let report = match (self.config.backend, self.config.autodiff) {
            (BackendKind::Ndarray, false) => self.probe::<NdArray>(&Default::default()),
            (BackendKind::Ndarray, true)  => self.probe::<Autodiff<NdArray>>(&Default::default()),
            (BackendKind::Wgpu, false)    => self.probe::<Wgpu>(&Default::default()),
            (BackendKind::Wgpu, true)     => self.probe::<Autodiff<Wgpu>>(&Default::default()),
        }?;

        if let Some(dir) = &self.config.report_dir {
            ReportLogger::new(dir)?.log(&report)?;
        }
        Ok(report)
    }

    fn probe<B: Backend>(&self, device: &B::Device) -> Result<ProbeReport> {
        let spec = &self.spec;
        let cfg  = &self.config;
        let mode = cfg.mode.unwrap_or_else(run_mode::<B>);

        // ── Step 2: Random padded batch ──────────────────────────────────────
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let seqs    = random_sequences(&mut rng, cfg.batch, cfg.seq_len.min(spec.xseql), spec.nwd);
        let batch   = TokenBatcher::<B>::new(device.clone()).batch(seqs);
        let ids     = batch.input_ids;
        let mask    = Some(&batch.mask);

        tracing::info!(
            "Probing {} encoder on {} ({} mode), input {:?}",
            spec.arch,
            cfg.backend.name(cfg.autodiff),
            mode,
            ids.dims(),
        );

        // ── Steps 3-4: Build and run ─────────────────────────────────────────
        let start = Instant::now();
        let out_shape: Vec<usize> = match spec.arch {
            Arch::Base => {
                let encoder = spec.base_config().init::<B>(device);
                encoder.forward(ids, mask, mode).dims().to_vec()
            }
            Arch::Agg => {
                let encoder = spec.encoder_config().init::<B>(device);
                let encoder = if cfg.from_base {
                    encoder.load_base(spec.base_config().init::<B>(device))?
                } else {
                    encoder
                };
                tracing::info!("Layout: {}", encoder.partition());
                encoder.forward(ids, mask, mode).dims().to_vec()
            }
            Arch::Sc => {
                let encoder = spec.sc_config().init::<B>(device);
                let output  = encoder.forward(ids, mask, mode);
                tracing::info!("Per-layer summaries: {:?}", output.hl.dims());
                output.out.dims().to_vec()
            }
        };
        let millis = start.elapsed().as_millis();
        tracing::info!("Output {:?} in {} ms", out_shape, millis);

        // ── Step 5: Noise calibration ────────────────────────────────────────
        let noise_ratio = match spec.power {
            Some(power) => noise_ratio::<B>(power, [cfg.batch, cfg.seq_len, spec.isize], mode, device),
            None        => 0.0,
        };
        tracing::info!("Realised noise ratio {:.4} (power {:?})", noise_ratio, spec.power);

        Ok(ProbeReport {
            arch:        spec.arch.to_string(),
            backend:     cfg.backend.name(cfg.autodiff),
            mode:        mode.to_string(),
            batch:       cfg.batch,
            seq_len:     cfg.seq_len,
            num_layer:   spec.num_layer,
            out_shape,
            noise_ratio,
            millis,
        })
    }
}

/// Mean over feature vectors of `||noised - x|| / ||x||` for the
/// feed-forward noiser on standard-normal activations of shape `dims`.
pub fn noise_ratio<B: Backend>(
    power:  f64,
    dims:   [usize; 3],
    mode:   RunMode,
    device: &B::Device,
) -> f64 {
    let x      = Tensor::<B, 3>::random(dims, Distribution::Normal(0.0, 1.0), device);
    let noised = Noiser::new(power).noise(x.clone(), None, mode);

    let delta = (noised - x.clone()).powf_scalar(2.0).sum_dim(2).sqrt();
    let norm  = x.powf_scalar(2.0).sum_dim(2).sqrt();

    delta.div(norm).mean().into_scalar().elem::<f64>()
}
