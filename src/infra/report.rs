// ============================================================
// Layer 6 — Probe Report Logger
// ============================================================
// Appends one row per `probe` run to a CSV file so runs with
// different specs, modes and backends can be compared later.
//
// Example CSV output:
//   arch,backend,mode,batch,seq_len,num_layer,out_shape,noise_ratio,millis
//   agg,ndarray,train,4,16,6,4x16x64,0.100000,38
//   sc,ndarray,eval,4,16,6,4x16x64x6,0.000000,51
//
// noise_ratio is ||noised - x|| / ||x|| per feature vector,
// averaged; it should sit at the configured power in train mode
// and at exactly 0 in eval mode.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "arch,backend,mode,batch,seq_len,num_layer,out_shape,noise_ratio,millis";

/// Outcome of one probe run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub arch:        String,
    pub backend:     String,
    pub mode:        String,
    pub batch:       usize,
    pub seq_len:     usize,
    pub num_layer:   usize,
    pub out_shape:   Vec<usize>,
    pub noise_ratio: f64,
    pub millis:      u128,
}

impl ProbeReport {
    /// `4x16x64` style rendering of the output shape.
    pub fn shape_string(&self) -> String {
        self.out_shape
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join("x")
    }

    fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{:.6},{}",
            self.arch,
            self.backend,
            self.mode,
            self.batch,
            self.seq_len,
            self.num_layer,
            self.shape_string(),
            self.noise_ratio,
            self.millis,
        )
    }
}

/// Logs probe reports to `<dir>/probes.csv`.
pub struct ReportLogger {
    csv_path: PathBuf,
}

impl ReportLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create report directory '{}'", dir.display()))?;

        let csv_path = dir.join("probes.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created report CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, report: &ProbeReport) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{}", report.csv_row())?;
        tracing::debug!("Logged {} probe to '{}'", report.arch, self.csv_path.display());
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
