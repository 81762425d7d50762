use std::path::PathBuf;
use std::process::Command;

use finchar::deps::arcstr;
use finchar::error::{with_err_context, ErrorContext, Result};
use finchar::verification::simulation::{
    Analysis, Save, SimInput, SimOpts, SimOutput, Simulator, SimulatorOpts, SweepMode,
};
use templates::{render_netlist, NetlistCtx};

pub mod output;
pub(crate) mod templates;

pub const RAWFILE_NAME: &str = "rawspice.raw";
pub const LOG_NAME: &str = "ngspice.log";

pub struct Ngspice {
    opts: SimulatorOpts,
}

impl Ngspice {
    fn program(&self) -> PathBuf {
        self.opts
            .command
            .clone()
            .unwrap_or_else(|| PathBuf::from("ngspice"))
    }
}

impl Simulator for Ngspice {
    fn new(opts: SimulatorOpts) -> Result<Self>
    where
        Self: Sized,
    {
        if opts.mpi_procs.is_some() {
            log::warn!("ngspice does not support MPI; ignoring `mpi_procs`");
        }
        Ok(Self { opts })
    }

    fn simulate(&self, input: SimInput) -> Result<SimOutput> {
        finchar::io::create_dir_all(&input.work_dir)?;

        let includes = input.circuit.include_strings();
        let elements = input.circuit.spice_lines();
        let directives = get_directives(&input);
        let analyses = get_analyses(&input.analyses);
        let ctx = NetlistCtx {
            title: input.circuit.title(),
            includes: &includes,
            elements: &elements,
            directives: &directives,
            analyses: &analyses,
        };
        let path = render_netlist(&ctx, &input.work_dir)?;
        let rawpath = input.work_dir.join(RAWFILE_NAME);
        finchar::io::remove_stale(&rawpath)?;

        let program = self.program();
        log::debug!("running {program:?} on {path:?}");
        let out = with_err_context(
            Command::new(&program)
                .arg("-n")
                .arg("-b")
                .arg("-r")
                .arg(&rawpath)
                .args(&self.opts.flags)
                .arg(&path)
                .current_dir(&input.work_dir)
                .output(),
            || ErrorContext::Task(arcstr::format!("running {}", program.display())),
        )?;
        output::write_log(input.work_dir.join(LOG_NAME), &out)?;

        // ngspice in batch mode can exit cleanly after an aborted analysis,
        // leaving no rawfile behind.
        if !out.status.success() || !rawpath.exists() {
            return Err(output::classify_failure(&out));
        }

        output::read_rawfile(&input, &rawpath)
    }

    fn name(&self) -> &'static str {
        "ngspice"
    }
}

pub(crate) fn get_analyses(input: &[Analysis]) -> Vec<String> {
    input.iter().map(analysis_line).collect()
}

pub(crate) fn get_directives(input: &SimInput) -> Vec<String> {
    let mut directives = Vec::new();
    if let Save::Signals(ref signals) = input.save {
        if !signals.is_empty() {
            directives.push(format!(".save {}", signals.join(" ")));
        }
    }
    if let Some(t) = input.opts.temp {
        directives.push(format!(".temp {t}"));
    }
    let options = option_pairs(&input.opts);
    if !options.is_empty() {
        directives.push(format!(".options {}", options.join(" ")));
    }
    directives
}

fn option_pairs(opts: &SimOpts) -> Vec<String> {
    let mut options = Vec::new();
    if let Some(t) = opts.tnom {
        options.push(format!("tnom={t}"));
    }
    if let Some(gmin) = opts.gmin {
        options.push(format!("gmin={gmin}"));
    }
    if let Some(reltol) = opts.reltol {
        options.push(format!("reltol={reltol}"));
    }
    let mut other: Vec<_> = opts.other.iter().collect();
    other.sort();
    options.extend(other.into_iter().map(|(k, v)| format!("{k}={v}")));
    options
}

/// The SPICE card for `input`. Xyce accepts the same syntax.
pub fn analysis_line(input: &Analysis) -> String {
    match input {
        Analysis::Op(_) => String::from(".op"),
        Analysis::Tran(a) => format!(".tran {} {} {}", a.step, a.stop, a.start),
        Analysis::Ac(a) => format!(
            ".ac {} {} {} {}",
            fmt_sweep_mode(a.sweep),
            a.points,
            a.fstart,
            a.fstop
        ),
        Analysis::Dc(a) => format!(".dc {} {} {} {}", a.sweep, a.start, a.stop, a.step),
    }
}

pub(crate) fn fmt_sweep_mode(mode: SweepMode) -> &'static str {
    match mode {
        SweepMode::Dec => "dec",
        SweepMode::Oct => "oct",
        SweepMode::Lin => "lin",
    }
}
