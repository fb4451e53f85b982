// ============================================================
// Layer 3 — RunMode
// ============================================================
// Noisers and dropout only act while training. Instead of reading
// an ambient "is training" flag, every forward pass is handed a
// RunMode, so the same module value can be probed in both modes.

use serde::{Deserialize, Serialize};

/// Whether a forward pass is part of training or of inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Stochastic units (noisers, dropout) are active.
    Train,
    /// Deterministic forward pass: noisers are the identity.
    #[default]
    Eval,
}

impl RunMode {
    pub fn is_train(self) -> bool {
        matches!(self, RunMode::Train)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Train => write!(f, "train"),
            RunMode::Eval  => write!(f, "eval"),
        }
    }
}
