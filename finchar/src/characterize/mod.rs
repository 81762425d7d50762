//! Characterization presets for a single FinFET and for inverter-chain buffers.
//!
//! Each preset owns a fixed topology and implements [`Sweep`](crate::sweep::Sweep).
//! The convenience functions ([`cgg_vs_vg`], [`id_vs_vd`], [`id_vs_vg`],
//! [`buffer_transient`], [`buffer_load_sweep`]) run a preset on a [`SweepRunner`](crate::sweep::SweepRunner)
//! and collect the surviving points into a result type.

use serde::{Deserialize, Serialize};

use crate::circuit::{Circuit, Instance, Vsource, GROUND};
use crate::error::{ErrorSource, Result};
use crate::post;
use crate::units::SiValue;
use crate::verification::simulation::{names, DcAnalysis, DcData};

pub mod buffer;
pub mod cgg;
pub mod idvd;
pub mod idvg;

pub use buffer::{
    buffer_load_sweep, buffer_transient, BufferParams, BufferSweep, BufferTraces, InverterCell,
    TranTrace,
};
pub use cgg::{cgg_vs_vg, CggCurve, CggParams, CggParamsBuilder, CggSweep};
pub use idvd::{id_vs_vd, IdVdCurves, IdVdParams, IdVdSweep};
pub use idvg::{id_vs_vg, IdVgCurves, IdVgParams, IdVgSweep};

/// The subcircuit name the device modelcard defines.
pub const DEVICE_SUBCKT: &str = "nFinFet";

/// Default simulation and nominal temperature, in degrees Celsius.
pub const DEFAULT_TEMP: f64 = 27.0;

/// Outer bias values for the drain-current families, in volts.
pub const DEFAULT_OUTER_BIASES: [f64; 5] = [1.2, 1.0, 0.75, 0.375, 0.05];

pub(crate) const DRAIN: &str = "drain";
pub(crate) const GATE: &str = "gate";
pub(crate) const DRAIN_SOURCE: &str = "Vd";
pub(crate) const GATE_SOURCE: &str = "Vg";

/// A simulator-native DC sweep range, stop inclusive.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcRange {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl Default for DcRange {
    fn default() -> Self {
        Self {
            start: 0.0,
            stop: 1.2,
            step: 0.05,
        }
    }
}

impl DcRange {
    pub fn analysis(&self, source: &str) -> DcAnalysis {
        DcAnalysis {
            sweep: source.to_string(),
            start: self.start,
            stop: self.stop,
            step: self.step,
        }
    }

    pub fn points(&self) -> Result<Vec<f64>> {
        self.analysis("").points()
    }
}

/// Drain current of one inner DC sweep, at a fixed outer bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasCurve {
    /// The outer bias, in volts.
    pub bias: f64,
    /// Drain current in microamperes, one entry per inner sweep value.
    pub id_ua: Vec<f64>,
}

/// A [`BiasCurve`] together with its elementwise base-10 logarithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogBiasCurve {
    pub bias: f64,
    pub id_ua: Vec<f64>,
    /// `log10(id_ua)`: `-inf` where the current is zero, `NaN` where negative.
    #[serde(with = "crate::export::non_finite")]
    pub log_id: Vec<f64>,
}

impl From<BiasCurve> for LogBiasCurve {
    fn from(value: BiasCurve) -> Self {
        let log_id = post::log10(&value.id_ua);
        Self {
            bias: value.bias,
            id_ua: value.id_ua,
            log_id,
        }
    }
}

/// The drain/gate bias topology shared by the drain-current sweeps:
/// `Vd` drives `drain`, `Vg` drives `gate`, source and bulk are grounded.
pub(crate) fn finfet_dc_circuit(title: &str, modelcard: &std::path::Path) -> Circuit {
    let mut circuit = Circuit::new(title);
    circuit
        .include(modelcard)
        .add(Vsource::dc(DRAIN_SOURCE, DRAIN, GROUND, SiValue::zero()))
        .add(Vsource::dc(GATE_SOURCE, GATE, GROUND, SiValue::zero()))
        .add(Instance::new(
            "n",
            DEVICE_SUBCKT,
            [DRAIN, GATE, GROUND, GROUND],
        ));
    circuit
}

/// Drain current, in microamperes, along a DC sweep.
///
/// If the engine reported the swept variable, its length must match `expected`.
pub(crate) fn drain_current_curve(dc: &DcData, expected: usize) -> Result<Vec<f64>> {
    let id = dc.try_signal(&names::current(DRAIN_SOURCE))?;
    if let Some(sweep) = dc.sweep() {
        if sweep.len() != id.len() {
            return Err(ErrorSource::RawfileParsing(format!(
                "sweep has {} points but drain current has {}",
                sweep.len(),
                id.len()
            ))
            .into());
        }
    }
    if id.len() != expected {
        return Err(ErrorSource::RawfileParsing(format!(
            "expected {expected} DC sweep points, got {}",
            id.len()
        ))
        .into());
    }
    Ok(post::drain_currents_ua(&id.values))
}
