// ============================================================
// Layer 5 — Noisers
// ============================================================
// Training-time perturbation of activations, calibrated to a
// fraction `power` of the local signal magnitude.
//
//   GausNoiser / UniNoiser        one scalar scale for the whole
//                                 tensor: mean |x| * power
//                                 (padding excluded when masked)
//
//   GausNoiserVec / UniNoiserVec  one scale per feature vector:
//                                 ||x|| / ||noise|| * power along
//                                 `dim`, so the realised noise has
//                                 exactly `power` times the norm of
//                                 the signal it is added to
//
// All noisers are the identity in RunMode::Eval.
// Scales are computed on detached input: no gradient flows
// through the magnitude estimate.

use burn::{
    prelude::*,
    tensor::Distribution,
};

use crate::domain::mode::RunMode;

/// The noiser used by the feed-forward block.
pub type Noiser = UniNoiserVec;

/// Default numerical floor of the per-vector noisers.
pub const DEFAULT_EPS: f64 = 1e-6;

/// A training-only perturbation of an activation tensor.
///
/// `mask` has the rank of `input` with size 1 on the feature axis,
/// e.g. `[batch, seq, 1]`, and is `true` on padding positions.
pub trait Noise {
    fn noise<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
        mask:  Option<Tensor<B, D, Bool>>,
        mode:  RunMode,
    ) -> Tensor<B, D>;
}

// ─── Scalar scale ─────────────────────────────────────────────────────────────
// Without a mask: mean |x|.
// With a mask:    L1(x with padding zeroed) / (unmasked positions * features),
//                 so padding cannot dilute the estimate.
// Returns None when every position is padding (the estimate is 0/0).
fn scalar_scale<B: Backend, const D: usize>(
    input: &Tensor<B, D>,
    mask:  Option<&Tensor<B, D, Bool>>,
    power: f64,
) -> Option<f64> {
    let data = input.clone().detach();

    match mask {
        None => {
            let mean_abs: f64 = data.abs().mean().into_scalar().elem::<f64>();
            Some(mean_abs * power)
        }
        Some(mask) => {
            let features = input.dims()[D - 1] as f64;
            let unmasked: f64 = mask
                .clone()
                .bool_not()
                .int()
                .sum()
                .into_scalar()
                .elem::<f64>();

            if unmasked == 0.0 {
                return None;
            }

            let l1: f64 = data
                .mask_fill(mask.clone().expand(input.dims()), 0.0)
                .abs()
                .sum()
                .into_scalar()
                .elem::<f64>();

            Some(l1 * power / (unmasked * features))
        }
    }
}

// ─── Per-vector scale ─────────────────────────────────────────────────────────
// ||x||₂ / (||noise||₂ + eps) * power along `dim`, keeping the reduced axis.
fn vector_scale<B: Backend, const D: usize>(
    input: &Tensor<B, D>,
    noise: &Tensor<B, D>,
    dim:   usize,
    power: f64,
    eps:   f64,
) -> Tensor<B, D> {
    let signal_norm = l2_norm(input.clone().detach(), dim);
    let noise_norm  = l2_norm(noise.clone(), dim);

    signal_norm.div(noise_norm.add_scalar(eps)).mul_scalar(power)
}

fn l2_norm<B: Backend, const D: usize>(x: Tensor<B, D>, dim: usize) -> Tensor<B, D> {
    x.powf_scalar(2.0).sum_dim(dim).sqrt()
}

fn resolve_dim<const D: usize>(dim: Option<usize>) -> usize {
    dim.unwrap_or(D - 1)
}

// ─── GausNoiser ───────────────────────────────────────────────────────────────
/// Gaussian noise with one scale for the whole tensor.
#[derive(Module, Clone, Debug)]
pub struct GausNoiser {
    pub power: f64,
}

impl GausNoiser {
    pub fn new(power: f64) -> Self {
        Self { power }
    }

    /// The noise standard deviation that would be used for `input`.
    pub fn scale<B: Backend, const D: usize>(
        &self,
        input: &Tensor<B, D>,
        mask:  Option<&Tensor<B, D, Bool>>,
    ) -> Option<f64> {
        scalar_scale(input, mask, self.power)
    }
}

impl Noise for GausNoiser {
    fn noise<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
        mask:  Option<Tensor<B, D, Bool>>,
        mode:  RunMode,
    ) -> Tensor<B, D> {
        if !mode.is_train() {
            return input;
        }
        let Some(scale) = self.scale(&input, mask.as_ref()) else {
            tracing::debug!("GausNoiser: every position is padding, input left unperturbed");
            return input;
        };

        let noise = Tensor::<B, D>::random(input.shape(), Distribution::Normal(0.0, 1.0), &input.device());
        noise.mul_scalar(scale) + input
    }
}

// ─── UniNoiser ────────────────────────────────────────────────────────────────
/// Uniform noise in `[-scale, scale]` with one scale for the whole tensor.
#[derive(Module, Clone, Debug)]
pub struct UniNoiser {
    pub power: f64,
}

impl UniNoiser {
    pub fn new(power: f64) -> Self {
        Self { power }
    }

    /// Half-width of the uniform range that would be used for `input`.
    pub fn scale<B: Backend, const D: usize>(
        &self,
        input: &Tensor<B, D>,
        mask:  Option<&Tensor<B, D, Bool>>,
    ) -> Option<f64> {
        scalar_scale(input, mask, self.power)
    }
}

impl Noise for UniNoiser {
    fn noise<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
        mask:  Option<Tensor<B, D, Bool>>,
        mode:  RunMode,
    ) -> Tensor<B, D> {
        if !mode.is_train() {
            return input;
        }
        let Some(scale) = self.scale(&input, mask.as_ref()) else {
            tracing::debug!("UniNoiser: every position is padding, input left unperturbed");
            return input;
        };

        // U(-1, 1) * scale == U(-scale, scale), and stays valid when scale == 0
        let noise = Tensor::<B, D>::random(input.shape(), Distribution::Uniform(-1.0, 1.0), &input.device());
        noise.mul_scalar(scale) + input
    }
}

// ─── GausNoiserVec ────────────────────────────────────────────────────────────
/// Gaussian noise rescaled per vector along `dim` (last axis when `None`).
#[derive(Module, Clone, Debug)]
pub struct GausNoiserVec {
    pub power: f64,
    pub dim:   Option<usize>,
    pub eps:   f64,
}

impl GausNoiserVec {
    pub fn new(power: f64) -> Self {
        Self { power, dim: None, eps: DEFAULT_EPS }
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = Some(dim);
        self
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }
}

impl Noise for GausNoiserVec {
    fn noise<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
        _mask: Option<Tensor<B, D, Bool>>,
        mode:  RunMode,
    ) -> Tensor<B, D> {
        if !mode.is_train() {
            return input;
        }
        let noise = Tensor::<B, D>::random(input.shape(), Distribution::Normal(0.0, 1.0), &input.device());
        let scale = vector_scale(&input, &noise, resolve_dim::<D>(self.dim), self.power, self.eps);

        noise.mul(scale) + input
    }
}

// ─── UniNoiserVec ─────────────────────────────────────────────────────────────
/// Uniform noise rescaled per vector along `dim` (last axis when `None`).
#[derive(Module, Clone, Debug)]
pub struct UniNoiserVec {
    pub power: f64,
    pub dim:   Option<usize>,
    pub eps:   f64,
}

impl UniNoiserVec {
    pub fn new(power: f64) -> Self {
        Self { power, dim: None, eps: DEFAULT_EPS }
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = Some(dim);
        self
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }
}

impl Noise for UniNoiserVec {
    fn noise<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
        _mask: Option<Tensor<B, D, Bool>>,
        mode:  RunMode,
    ) -> Tensor<B, D> {
        if !mode.is_train() {
            return input;
        }
        let noise = Tensor::<B, D>::random(input.shape(), Distribution::Uniform(-1.0, 1.0), &input.device());
        let scale = vector_scale(&input, &noise, resolve_dim::<D>(self.dim), self.power, self.eps);

        noise.mul(scale) + input
    }
}
