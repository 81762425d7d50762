use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use finchar::characterize::{
    buffer_load_sweep, buffer_transient, cgg_vs_vg, id_vs_vd, id_vs_vg, InverterCell,
};
use finchar::config::{Engine, FincharConfig};
use finchar::export::{to_json_string, write_json_file, ToTable};
use finchar::verification::simulation::Simulator;
use ngspice::Ngspice;
use serde::Serialize;
use xyce::Xyce;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Run FinFET and buffer characterization sweeps through an external SPICE engine"
)]
pub struct Args {
    /// The TOML configuration file.
    #[arg(short, long, default_value = "finchar.toml")]
    pub config: PathBuf,
    /// Overrides the configured work directory.
    #[arg(short, long)]
    pub work_dir: Option<PathBuf>,
    /// Write results to this file instead of standard output.
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,
    /// Emit JSON instead of CSV.
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Gate capacitance versus gate voltage.
    Cgg,
    /// Drain current versus drain voltage, one curve per gate bias.
    Idvd,
    /// Drain current versus gate voltage, one curve per drain bias.
    Idvg,
    /// Transient response of the four-stage inverter buffer.
    Tran {
        /// The cell used for every stage.
        #[arg(long, default_value = "invd8")]
        cell: InverterCell,
        /// Equivalent load capacitance in farads. Repeat to sweep several loads.
        #[arg(long = "ceq", required = true)]
        c_eq: Vec<f64>,
    },
    /// Validate the configuration and report missing files.
    Check,
}

/// Loads the configuration named by `args`, applying command line overrides.
pub fn load_config(args: &Args) -> anyhow::Result<FincharConfig> {
    let mut cfg = FincharConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config {:?}", args.config))?;
    if let Some(ref dir) = args.work_dir {
        cfg.sweep.work_dir = Some(dir.clone());
    }
    Ok(cfg)
}

/// Instantiates the engine selected by `cfg`.
pub fn simulator(cfg: &FincharConfig) -> finchar::error::Result<Arc<dyn Simulator>> {
    let opts = cfg.simulator_opts();
    let simulator: Arc<dyn Simulator> = match cfg.simulator.engine {
        Engine::Ngspice => Arc::new(Ngspice::new(opts)?),
        Engine::Xyce => Arc::new(Xyce::new(opts)?),
    };
    Ok(simulator)
}

pub fn run(args: &Args) -> anyhow::Result<()> {
    let cfg = load_config(args)?;
    let runner = cfg.runner(simulator(&cfg)?)?;
    match args.command {
        Command::Check => check(&cfg, &mut std::io::stdout()),
        Command::Cgg => {
            let curve = cgg_vs_vg(&runner, &cfg.cgg_params()?)?;
            if curve.is_empty() {
                log::warn!("no gate bias simulated successfully");
            }
            emit(&curve, args)
        }
        Command::Idvd => emit(&id_vs_vd(&runner, &cfg.idvd_params()?)?, args),
        Command::Idvg => emit(&id_vs_vg(&runner, &cfg.idvg_params()?)?, args),
        Command::Tran { cell, ref c_eq } => {
            let params = cfg.buffer_params(cell)?;
            if let [c_eq] = c_eq.as_slice() {
                let trace = buffer_transient(&runner, &params, *c_eq)?;
                match trace.delay(params.vdd) {
                    Some(delay) => log::info!("50% delay: {delay:e} s"),
                    None => log::warn!("output never crossed vdd/2"),
                }
                emit(&trace, args)
            } else {
                emit(&buffer_load_sweep(&runner, &params, c_eq)?, args)
            }
        }
    }
}

/// Reports on `cfg`, failing if any file it references is missing.
pub fn check(cfg: &FincharConfig, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(
        out,
        "engine: {:?} ({})",
        cfg.simulator.engine,
        cfg.simulator
            .command
            .as_deref()
            .unwrap_or_else(|| Path::new(cfg.simulator.engine.program()))
            .display()
    )?;
    writeln!(
        out,
        "temp: {} tnom: {} failure policy: {:?}",
        cfg.options.temp, cfg.options.tnom, cfg.sweep.failure_policy
    )?;

    let missing = cfg.missing_files();
    for path in missing.iter() {
        writeln!(out, "missing: {}", path.display())?;
    }
    if !missing.is_empty() {
        bail!("{} referenced file(s) not found", missing.len());
    }
    Ok(())
}

fn emit<T: ToTable + Serialize>(value: &T, args: &Args) -> anyhow::Result<()> {
    match (&args.output, args.json) {
        (Some(path), true) => write_json_file(value, path)?,
        (Some(path), false) => value.to_table().write_csv_file(path)?,
        (None, true) => println!("{}", to_json_string(value)?),
        (None, false) => print!("{}", value.to_table().to_csv_string()?),
    }
    if let Some(ref path) = args.output {
        log::info!("wrote {path:?}");
    }
    Ok(())
}
