//! A [`Simulator`] backed by Sandia's Xyce.
//!
//! Serial builds are invoked as `Xyce -r rawspice.raw netlist.cir`; when
//! [`SimulatorOpts::mpi_procs`] is set, the run is wrapped in
//! `mpirun -np <procs>`.

use std::path::PathBuf;
use std::process::Command;

use finchar::deps::arcstr;
use finchar::error::{with_err_context, ErrorContext, Result};
use finchar::verification::simulation::{
    Save, SimInput, SimOpts, SimOutput, Simulator, SimulatorOpts,
};
use ngspice::output;
use templates::NetlistCtx;

pub(crate) mod templates;

pub const RAWFILE_NAME: &str = "rawspice.raw";
pub const LOG_NAME: &str = "xyce.log";
pub const MPIRUN: &str = "mpirun";

pub struct Xyce {
    opts: SimulatorOpts,
}

impl Xyce {
    fn program(&self) -> PathBuf {
        self.opts
            .command
            .clone()
            .unwrap_or_else(|| PathBuf::from("Xyce"))
    }

    /// The command line for simulating `netlist`, writing results to `rawfile`.
    pub(crate) fn command(&self, netlist: &std::path::Path, rawfile: &std::path::Path) -> Command {
        let mut cmd = match self.opts.mpi_procs {
            Some(n) if n > 1 => {
                let mut cmd = Command::new(MPIRUN);
                cmd.arg("-np").arg(n.to_string()).arg(self.program());
                cmd
            }
            _ => Command::new(self.program()),
        };
        cmd.arg("-r")
            .arg(rawfile)
            .args(&self.opts.flags)
            .arg(netlist);
        cmd
    }
}

impl Simulator for Xyce {
    fn new(opts: SimulatorOpts) -> Result<Self>
    where
        Self: Sized,
    {
        Ok(Self { opts })
    }

    fn simulate(&self, input: SimInput) -> Result<SimOutput> {
        finchar::io::create_dir_all(&input.work_dir)?;

        if let Save::Signals(_) = input.save {
            log::debug!("xyce writes every signal to the rawfile; ignoring save list");
        }

        let includes = input.circuit.include_strings();
        let elements = input.circuit.spice_lines();
        let directives = get_directives(&input.opts);
        let analyses: Vec<String> = input.analyses.iter().map(ngspice::analysis_line).collect();
        let path = NetlistCtx {
            title: input.circuit.title(),
            includes: &includes,
            elements: &elements,
            directives: &directives,
            analyses: &analyses,
        }
        .write(&input.work_dir)?;

        let rawpath = input.work_dir.join(RAWFILE_NAME);
        finchar::io::remove_stale(&rawpath)?;

        let mut cmd = self.command(&path, &rawpath);
        log::debug!("running {cmd:?}");
        let out = with_err_context(cmd.current_dir(&input.work_dir).output(), || {
            ErrorContext::Task(arcstr::format!("running {}", self.program().display()))
        })?;
        output::write_log(input.work_dir.join(LOG_NAME), &out)?;

        if !out.status.success() || !rawpath.exists() {
            return Err(output::classify_failure(&out));
        }

        output::read_rawfile(&input, &rawpath)
    }

    fn name(&self) -> &'static str {
        "xyce"
    }
}

/// Xyce groups options by package, e.g. `.options device temp=27`.
///
/// Entries of [`SimOpts::other`] may name their package as `package.key`;
/// bare keys go to the `device` package.
pub(crate) fn get_directives(opts: &SimOpts) -> Vec<String> {
    let mut packages: Vec<(String, Vec<String>)> = Vec::new();
    let mut push = |package: &str, pair: String| {
        match packages.iter_mut().find(|(p, _)| p == package) {
            Some((_, pairs)) => pairs.push(pair),
            None => packages.push((package.to_string(), vec![pair])),
        }
    };

    if let Some(t) = opts.temp {
        push("device", format!("temp={t}"));
    }
    if let Some(t) = opts.tnom {
        push("device", format!("tnom={t}"));
    }
    if let Some(gmin) = opts.gmin {
        push("device", format!("gmin={gmin}"));
    }
    if let Some(reltol) = opts.reltol {
        push("timeint", format!("reltol={reltol}"));
    }
    let mut other: Vec<_> = opts.other.iter().collect();
    other.sort();
    for (key, value) in other {
        let (package, key) = key.split_once('.').unwrap_or(("device", key.as_str()));
        push(package, format!("{key}={value}"));
    }

    packages
        .into_iter()
        .map(|(package, pairs)| format!(".options {package} {}", pairs.join(" ")))
        .collect()
}
