//! TOML configuration for simulator selection, tool paths and sweep options.
//!
//! ```toml
//! [simulator]
//! engine = "xyce"
//! command = "/opt/xyce/bin/Xyce"
//! mpi_procs = 4
//!
//! [options]
//! temp = 27.0
//! tnom = 27.0
//! reltol = 1e-4
//!
//! [options.extra]
//! "timeint.method" = "gear"
//!
//! [device]
//! modelcard = "netlists/test_modelcard.nmos_xyce"
//!
//! [sweep]
//! work_dir = "build/sim"
//! failure_policy = "continue"
//! ```
//!
//! Relative paths in a file loaded with [`FincharConfig::from_file`] are
//! resolved against the directory containing that file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::characterize::{
    BufferParams, CggParams, IdVdParams, IdVgParams, InverterCell, DEFAULT_TEMP,
};
use crate::error::{with_err_context, ErrorContext, ErrorSource, FincharError, Result};
use crate::sweep::{FailurePolicy, SweepRunner};
use crate::verification::simulation::{SimOpts, Simulator, SimulatorOpts};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FincharConfig {
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub options: OptionsConfig,
    #[serde(default)]
    pub device: Option<DeviceConfig>,
    #[serde(default)]
    pub buffer: Option<BufferConfig>,
    #[serde(default)]
    pub sweep: SweepConfig,
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Ngspice,
    #[default]
    Xyce,
}

impl Engine {
    /// The executable looked up on `PATH` when no command is configured.
    pub fn program(&self) -> &'static str {
        match self {
            Self::Ngspice => "ngspice",
            Self::Xyce => "Xyce",
        }
    }
}

impl FromStr for Engine {
    type Err = ErrorSource;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ngspice" => Ok(Self::Ngspice),
            "xyce" => Ok(Self::Xyce),
            _ => Err(ErrorSource::InvalidArgs(format!("unknown engine: {s}"))),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub engine: Engine,
    pub command: Option<PathBuf>,
    pub mpi_procs: Option<usize>,
    #[serde(default)]
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsConfig {
    #[serde(default = "default_temp")]
    pub temp: f64,
    #[serde(default = "default_temp")]
    pub tnom: f64,
    pub gmin: Option<f64>,
    pub reltol: Option<f64>,
    /// Passed through to the engine's options line. Xyce keys may be
    /// qualified with their package, as in `timeint.method`.
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

fn default_temp() -> f64 {
    DEFAULT_TEMP
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            temp: DEFAULT_TEMP,
            tnom: DEFAULT_TEMP,
            gmin: None,
            reltol: None,
            extra: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// SPICE file defining the `nFinFet` subcircuit.
    pub modelcard: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferConfig {
    pub nmos_model: PathBuf,
    pub pmos_model: PathBuf,
    pub invd8: PathBuf,
    pub invd1: PathBuf,
    #[serde(default = "default_vdd")]
    pub vdd: f64,
}

fn default_vdd() -> f64 {
    0.7
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    pub work_dir: Option<PathBuf>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl FromStr for FincharConfig {
    type Err = FincharError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl FincharConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = crate::io::read_to_string(path)?;
        let mut config = with_err_context(Self::from_str(&contents), || {
            ErrorContext::ReadFile(path.to_path_buf())
        })?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Makes every relative path in this config relative to `base` instead.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(ref mut device) = self.device {
            resolve(&mut device.modelcard);
        }
        if let Some(ref mut buffer) = self.buffer {
            resolve(&mut buffer.nmos_model);
            resolve(&mut buffer.pmos_model);
            resolve(&mut buffer.invd8);
            resolve(&mut buffer.invd1);
        }
        if let Some(ref mut dir) = self.sweep.work_dir {
            resolve(dir);
        }
        // A bare program name is looked up on PATH, so only paths with a
        // directory component are rebased.
        if let Some(ref mut command) = self.simulator.command {
            if command.components().count() > 1 {
                resolve(command);
            }
        }
    }

    pub fn simulator_opts(&self) -> SimulatorOpts {
        SimulatorOpts {
            command: self.simulator.command.clone(),
            mpi_procs: self.simulator.mpi_procs,
            flags: self.simulator.flags.clone(),
        }
    }

    pub fn sim_opts(&self) -> SimOpts {
        SimOpts {
            temp: Some(self.options.temp),
            tnom: Some(self.options.tnom),
            gmin: self.options.gmin,
            reltol: self.options.reltol,
            other: self.options.extra.clone(),
        }
    }

    /// A runner for `simulator` with this config's options, work directory and
    /// failure policy.
    pub fn runner(&self, simulator: Arc<dyn Simulator>) -> Result<SweepRunner> {
        let mut builder = SweepRunner::builder();
        builder
            .shared_simulator(simulator)
            .opts(self.sim_opts())
            .policy(self.sweep.failure_policy);
        if let Some(ref dir) = self.sweep.work_dir {
            builder.work_dir(dir);
        }
        builder.build()
    }

    fn device(&self) -> Result<&DeviceConfig> {
        self.device
            .as_ref()
            .ok_or_else(|| ErrorSource::InvalidArgs("missing [device] section".into()).into())
    }

    fn buffer(&self) -> Result<&BufferConfig> {
        self.buffer
            .as_ref()
            .ok_or_else(|| ErrorSource::InvalidArgs("missing [buffer] section".into()).into())
    }

    pub fn cgg_params(&self) -> Result<CggParams> {
        CggParams::builder()
            .modelcard(self.device()?.modelcard.clone())
            .temp(self.options.temp)
            .build()
            .map_err(|e| ErrorSource::InvalidArgs(e.to_string()).into())
    }

    pub fn idvd_params(&self) -> Result<IdVdParams> {
        let mut params = IdVdParams::new(self.device()?.modelcard.clone());
        params.temp = self.options.temp;
        Ok(params)
    }

    pub fn idvg_params(&self) -> Result<IdVgParams> {
        let mut params = IdVgParams::new(self.device()?.modelcard.clone());
        params.temp = self.options.temp;
        Ok(params)
    }

    pub fn buffer_params(&self, cell: InverterCell) -> Result<BufferParams> {
        let b = self.buffer()?;
        let mut params = BufferParams::new(
            b.nmos_model.clone(),
            b.pmos_model.clone(),
            b.invd8.clone(),
            b.invd1.clone(),
        )
        .with_cell(cell);
        params.vdd = b.vdd;
        params.temp = self.options.temp;
        Ok(params)
    }

    /// Paths this config refers to that do not exist.
    pub fn missing_files(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(ref device) = self.device {
            paths.push(&device.modelcard);
        }
        if let Some(ref b) = self.buffer {
            paths.extend([&b.nmos_model, &b.pmos_model, &b.invd8, &b.invd1]);
        }
        if let Some(ref command) = self.simulator.command {
            if command.components().count() > 1 {
                paths.push(command);
            }
        }
        paths
            .into_iter()
            .filter(|p| !p.exists())
            .cloned()
            .collect()
    }
}
