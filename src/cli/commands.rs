// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands `init-config`, `inspect` and
// `probe`, and all their configurable flags.

use clap::{Args, Subcommand};

use crate::application::model_spec::Arch;
use crate::application::probe_use_case::{BackendKind, ProbeConfig};
use crate::domain::mode::RunMode;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a model spec JSON file
    InitConfig(InitConfigArgs),

    /// Build the encoder from a spec and summarise its structure
    Inspect(InspectArgs),

    /// Run one forward pass on a random padded batch
    Probe(ProbeArgs),
}

#[derive(Args, Debug)]
pub struct InitConfigArgs {
    /// Where to write the spec
    #[arg(long, default_value = "model.json")]
    pub path: String,

    /// Encoder architecture
    #[arg(long, value_enum, default_value_t = Arch::Agg)]
    pub arch: Arch,

    /// Model dimension
    #[arg(long, default_value_t = 64)]
    pub isize: usize,

    /// Vocabulary size (token 0 is <pad>)
    #[arg(long, default_value_t = 1000)]
    pub nwd: usize,

    /// Total number of unit layers
    #[arg(long, default_value_t = 6)]
    pub num_layer: usize,

    /// Attention heads; isize must be divisible by this
    #[arg(long, default_value_t = 4)]
    pub num_head: usize,

    /// Layer-Groups in the Composite Layer (agg only)
    #[arg(long, default_value_t = 2)]
    pub num_sub: usize,

    /// Unit layers per Layer-Group (agg only)
    #[arg(long, default_value_t = 2)]
    pub num_unit: usize,

    /// Decoder layers the outputs are indexed by (sc only)
    #[arg(long, default_value_t = 6)]
    pub num_layer_dec: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Take unit-layer residuals from the normalised input
    #[arg(long)]
    pub norm_residue: bool,

    /// Noise power of the feed-forward noisers; omit to disable noising
    #[arg(long)]
    pub power: Option<f64>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(long, default_value = "model.json")]
    pub config: String,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[arg(long, default_value = "model.json")]
    pub config: String,

    #[arg(long, default_value_t = 4)]
    pub batch: usize,

    /// Longest sampled sequence; clipped to the position table
    #[arg(long, default_value_t = 16)]
    pub seq_len: usize,

    /// Forward mode; defaults to train under --autodiff, eval otherwise
    #[arg(long, value_enum)]
    pub mode: Option<RunMode>,

    #[arg(long, value_enum, default_value_t = BackendKind::Ndarray)]
    pub backend: BackendKind,

    /// Wrap the backend in Autodiff
    #[arg(long)]
    pub autodiff: bool,

    /// Build the agg encoder by transplanting a flat encoder
    #[arg(long)]
    pub from_base: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Append the result to <dir>/probes.csv
    #[arg(long)]
    pub report_dir: Option<String>,
}

/// The boundary between Layer 1 and Layer 2: the application layer
/// never sees clap types.
impl From<ProbeArgs> for ProbeConfig {
    fn from(a: ProbeArgs) -> Self {
        ProbeConfig {
            batch:      a.batch,
            seq_len:    a.seq_len,
            backend:    a.backend,
            autodiff:   a.autodiff,
            mode:       a.mode,
            from_base:  a.from_base,
            seed:       a.seed,
            report_dir: a.report_dir,
        }
    }
}
