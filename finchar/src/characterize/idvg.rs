//! Transfer characteristics: drain current versus gate voltage, one curve per
//! drain bias, with log-scale current for subthreshold inspection.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{
    drain_current_curve, finfet_dc_circuit, BiasCurve, DcRange, LogBiasCurve,
    DEFAULT_OUTER_BIASES, DEFAULT_TEMP, DRAIN_SOURCE, GATE_SOURCE,
};
use crate::circuit::Circuit;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::sweep::{Sweep, SweepRunner};
use crate::units::SiValue;
use crate::verification::simulation::context::{PostSimCtx, PreSimCtx};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdVgParams {
    pub modelcard: PathBuf,
    /// Outer drain biases, in volts.
    pub drain_biases: Vec<f64>,
    /// Inner gate voltage sweep.
    pub gate: DcRange,
    pub temp: f64,
}

impl IdVgParams {
    pub fn new(modelcard: impl Into<PathBuf>) -> Self {
        Self {
            modelcard: modelcard.into(),
            drain_biases: DEFAULT_OUTER_BIASES.to_vec(),
            gate: DcRange::default(),
            temp: DEFAULT_TEMP,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdVgCurves {
    /// Gate voltage, in volts.
    pub vg: Vec<f64>,
    /// One curve per surviving drain bias, in sweep order.
    pub curves: Vec<LogBiasCurve>,
}

pub struct IdVgSweep {
    circuit: Circuit,
    gate: DcRange,
    temp: f64,
}

impl IdVgSweep {
    pub fn new(params: &IdVgParams) -> Self {
        Self {
            circuit: finfet_dc_circuit("finfet id-vg", &params.modelcard),
            gate: params.gate,
            temp: params.temp,
        }
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }
}

impl Sweep for IdVgSweep {
    type Point = f64;
    type Output = BiasCurve;

    fn name(&self) -> ArcStr {
        arcstr::literal!("idvg")
    }

    fn setup(&self, vd: &f64, ctx: &mut PreSimCtx) -> Result<()> {
        ctx.set_circuit(self.circuit.with_dc(DRAIN_SOURCE, SiValue::volts(*vd))?)
            .set_temp(self.temp)
            .set_tnom(self.temp)
            .add_analysis(self.gate.analysis(GATE_SOURCE));
        Ok(())
    }

    fn measure(&self, vd: &f64, ctx: &PostSimCtx) -> Result<BiasCurve> {
        // The drain supply carries the drain current whichever source is swept.
        let id_ua = drain_current_curve(ctx.dc(0)?, self.gate.points()?.len())?;
        Ok(BiasCurve { bias: *vd, id_ua })
    }
}

/// Runs a gate voltage sweep at each drain bias.
///
/// `log_id` is computed per surviving curve, so it stays aligned with `id_ua`.
pub fn id_vs_vg(runner: &SweepRunner, params: &IdVgParams) -> Result<IdVgCurves> {
    let vg = params.gate.points()?;
    let sweep = IdVgSweep::new(params);
    let outcome = runner.run(&sweep, params.drain_biases.iter().copied())?;
    Ok(IdVgCurves {
        vg,
        curves: outcome.values().into_iter().map(LogBiasCurve::from).collect(),
    })
}
