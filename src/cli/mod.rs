// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses command line arguments with clap and delegates all work
// to Layer 2 (application). This is the only layer that prints.
//
//   init-config — write a ModelSpec JSON file
//   inspect     — parameter count and layer layout of a spec
//   probe       — one forward pass, output shapes, noise calibration

pub mod commands;

use anyhow::{bail, Result};
use clap::Parser;
use commands::{Commands, InitConfigArgs, InspectArgs, ProbeArgs};

use crate::application::{
    inspect_use_case::InspectUseCase,
    model_spec::ModelSpec,
    probe_use_case::ProbeUseCase,
};
use crate::infra::config_store::ConfigStore;

#[derive(Parser, Debug)]
#[command(
    name = "lgraph-encoder",
    version,
    about = "Build, inspect and probe hierarchical and self-critical transformer encoders."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::InitConfig(args) => run_init_config(args),
            Commands::Inspect(args)    => run_inspect(args),
            Commands::Probe(args)      => run_probe(args),
        }
    }
}

fn run_init_config(args: InitConfigArgs) -> Result<()> {
    let store = ConfigStore::new(&args.path);
    if store.path().exists() && !args.force {
        bail!("'{}' already exists; pass --force to overwrite", store.path().display());
    }

    let spec = ModelSpec {
        arch:          args.arch,
        isize:         args.isize,
        nwd:           args.nwd,
        num_layer:     args.num_layer,
        num_head:      args.num_head,
        num_sub:       args.num_sub,
        num_unit:      args.num_unit,
        num_layer_dec: args.num_layer_dec,
        dropout:       args.dropout,
        norm_residue:  args.norm_residue,
        power:         args.power,
        ..ModelSpec::default()
    };
    spec.validate()?;
    store.save(&spec)?;

    println!("Wrote {} spec to '{}'", spec.arch, store.path().display());
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let spec       = ConfigStore::new(&args.config).load()?;
    let inspection = InspectUseCase::new(spec).execute()?;

    println!("arch:       {}", inspection.arch);
    println!("depth:      {}", inspection.depth);
    println!("layout:     {}", inspection.layout);
    println!("parameters: {}", inspection.num_params);
    Ok(())
}

fn run_probe(args: ProbeArgs) -> Result<()> {
    let spec   = ConfigStore::new(&args.config).load()?;
    let report = ProbeUseCase::new(spec, args.into()).execute()?;

    println!(
        "{} on {} ({}): output {} | noise ratio {:.4} | {} ms",
        report.arch,
        report.backend,
        report.mode,
        report.shape_string(),
        report.noise_ratio,
        report.millis,
    );
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::model_spec::Arch;
    use crate::domain::mode::RunMode;

    #[test]
    fn test_parse_probe_flags() {
        let cli = Cli::try_parse_from([
            "lgraph-encoder", "probe", "--mode", "train", "--autodiff", "--from-base",
        ])
        .unwrap();

        let Commands::Probe(args) = cli.command else { panic!("expected probe") };
        assert_eq!(args.mode, Some(RunMode::Train));
        assert!(args.autodiff && args.from_base);
        assert_eq!(args.config, "model.json");
    }

    #[test]
    fn test_init_config_then_inspect() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json").to_string_lossy().into_owned();

        let init = |extra: &[&str]| {
            let mut argv: Vec<String> = [
                "lgraph-encoder", "init-config", "--path", path.as_str(),
                "--arch", "sc", "--isize", "16", "--num-head", "2", "--norm-residue",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect();
            argv.extend(extra.iter().map(|s| s.to_string()));
            Cli::try_parse_from(argv).unwrap().run()
        };

        init(&[]).unwrap();
        // refuses to clobber without --force
        assert!(init(&[]).is_err());
        init(&["--force"]).unwrap();

        let spec = ConfigStore::new(&path).load().unwrap();
        assert_eq!(spec.arch, Arch::Sc);
        assert_eq!(spec.isize, 16);
        assert!(spec.norm_residue);

        Cli::try_parse_from(["lgraph-encoder", "inspect", "--config", path.as_str()])
            .unwrap()
            .run()
            .unwrap();
    }
}
