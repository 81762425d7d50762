//! Output characteristics: drain current versus drain voltage, one curve per
//! gate bias.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{
    drain_current_curve, finfet_dc_circuit, BiasCurve, DcRange, DEFAULT_OUTER_BIASES,
    DEFAULT_TEMP, DRAIN_SOURCE, GATE_SOURCE,
};
use crate::circuit::Circuit;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::sweep::{Sweep, SweepRunner};
use crate::units::SiValue;
use crate::verification::simulation::context::{PostSimCtx, PreSimCtx};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdVdParams {
    pub modelcard: PathBuf,
    /// Outer gate biases, in volts. One curve per entry.
    pub gate_biases: Vec<f64>,
    /// Inner drain voltage sweep.
    pub drain: DcRange,
    pub temp: f64,
}

impl IdVdParams {
    pub fn new(modelcard: impl Into<PathBuf>) -> Self {
        Self {
            modelcard: modelcard.into(),
            gate_biases: DEFAULT_OUTER_BIASES.to_vec(),
            drain: DcRange::default(),
            temp: DEFAULT_TEMP,
        }
    }
}

/// Drain current families over a shared drain voltage axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdVdCurves {
    /// Drain voltage, in volts.
    pub vd: Vec<f64>,
    /// One curve per surviving gate bias, in sweep order.
    pub curves: Vec<BiasCurve>,
}

pub struct IdVdSweep {
    circuit: Circuit,
    drain: DcRange,
    temp: f64,
}

impl IdVdSweep {
    pub fn new(params: &IdVdParams) -> Self {
        Self {
            circuit: finfet_dc_circuit("finfet id-vd", &params.modelcard),
            drain: params.drain,
            temp: params.temp,
        }
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }
}

impl Sweep for IdVdSweep {
    type Point = f64;
    type Output = BiasCurve;

    fn name(&self) -> ArcStr {
        arcstr::literal!("idvd")
    }

    fn setup(&self, vg: &f64, ctx: &mut PreSimCtx) -> Result<()> {
        ctx.set_circuit(self.circuit.with_dc(GATE_SOURCE, SiValue::volts(*vg))?)
            .set_temp(self.temp)
            .set_tnom(self.temp)
            .add_analysis(self.drain.analysis(DRAIN_SOURCE));
        Ok(())
    }

    fn measure(&self, vg: &f64, ctx: &PostSimCtx) -> Result<BiasCurve> {
        let id_ua = drain_current_curve(ctx.dc(0)?, self.drain.points()?.len())?;
        Ok(BiasCurve { bias: *vg, id_ua })
    }
}

/// Runs a drain voltage sweep at each gate bias.
///
/// Gate biases whose simulation fails are left out of `curves`.
pub fn id_vs_vd(runner: &SweepRunner, params: &IdVdParams) -> Result<IdVdCurves> {
    let vd = params.drain.points()?;
    let sweep = IdVdSweep::new(params);
    let outcome = runner.run(&sweep, params.gate_biases.iter().copied())?;
    Ok(IdVdCurves {
        vd,
        curves: outcome.values(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::simulation::{Analysis, DcAnalysis};

    #[test]
    fn setup_fixes_gate_and_sweeps_drain() {
        let params = IdVdParams::new("model.nmos");
        let sweep = IdVdSweep::new(&params);
        let mut ctx = PreSimCtx::new("/tmp/idvd", Default::default());
        sweep.setup(&0.75, &mut ctx).unwrap();
        let input = ctx.into_inner();

        assert_eq!(input.circuit.source("Vg").unwrap().dc, SiValue::volts(0.75));
        assert_eq!(input.circuit.source("Vd").unwrap().dc, SiValue::zero());
        assert_eq!(
            input.analyses,
            vec![Analysis::Dc(DcAnalysis {
                sweep: "Vd".into(),
                start: 0.0,
                stop: 1.2,
                step: 0.05,
            })]
        );
    }

    #[test]
    fn default_outer_biases() {
        let params = IdVdParams::new("model.nmos");
        assert_eq!(params.gate_biases, vec![1.2, 1.0, 0.75, 0.375, 0.05]);
        assert_eq!(params.temp, 27.0);
    }
}
