//! Gate capacitance versus gate bias.
//!
//! A small sinusoidal source sits in series with a DC gate bias. At each bias
//! point a single-frequency AC analysis gives the gate voltage and source
//! current phasors, from which `Cgg = 1 / (2π·f·Im(Vg / Ig))`.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use super::{DEFAULT_TEMP, DEVICE_SUBCKT, GATE};
use crate::circuit::{Circuit, Instance, Sine, Vsource, GROUND};
use crate::deps::arcstr::ArcStr;
use crate::deps::num_complex::Complex64;
use crate::error::{ErrorSource, Result};
use crate::post;
use crate::sweep::{Sweep, SweepOutcome, SweepRunner};
use crate::units::{SiPrefix, SiValue};
use crate::verification::simulation::context::{PostSimCtx, PreSimCtx};
use crate::verification::simulation::{names, AcAnalysis, AcData};

/// Default test frequency, in hertz.
pub const DEFAULT_FREQUENCY: f64 = 10e3;

const AC_SOURCE: &str = "Vac";
const BIAS_SOURCE: &str = "Vdc";
const BIAS_NODE: &str = "1";

/// Gate biases from -1.4 V to 1.4 V in 50 mV steps, rounded to 10 mV.
pub fn default_gate_biases() -> Vec<f64> {
    post::linspace(-1.4, 1.4, 57)
        .into_iter()
        .map(|v| post::round_to(v, 2))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct CggParams {
    /// SPICE file defining the [`DEVICE_SUBCKT`] subcircuit.
    #[builder(setter(into))]
    pub modelcard: PathBuf,
    /// AC analysis frequency, in hertz.
    #[builder(default = "DEFAULT_FREQUENCY")]
    pub frequency: f64,
    /// Gate bias points, in volts.
    #[builder(default = "default_gate_biases()")]
    pub biases: Vec<f64>,
    /// Small-signal magnitude and sine amplitude of the gate stimulus, in volts.
    #[builder(default = "0.1")]
    pub stimulus: f64,
    #[builder(default = "DEFAULT_TEMP")]
    pub temp: f64,
}

impl CggParams {
    #[inline]
    pub fn builder() -> CggParamsBuilder {
        CggParamsBuilder::default()
    }
}

/// Gate capacitance at each surviving bias point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CggCurve {
    /// Gate bias, in volts.
    pub vg: Vec<f64>,
    /// Gate capacitance, in farads. Index-aligned with `vg`.
    #[serde(with = "crate::export::non_finite")]
    pub cgg: Vec<f64>,
}

impl CggCurve {
    pub fn len(&self) -> usize {
        self.vg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vg.is_empty()
    }

    pub fn cgg_ff(&self) -> Vec<f64> {
        self.cgg
            .iter()
            .copied()
            .map(post::farads_to_femtofarads)
            .collect()
    }
}

pub struct CggSweep {
    circuit: Circuit,
    frequency: f64,
    temp: f64,
}

impl CggSweep {
    pub fn new(params: &CggParams) -> Self {
        let stimulus = SiValue::volts(params.stimulus);
        let mut circuit = Circuit::new("finfet cgg");
        circuit
            .include(&params.modelcard)
            .add(Vsource::sine(
                "ac",
                GATE,
                BIAS_NODE,
                stimulus,
                Sine {
                    offset: SiValue::zero(),
                    amplitude: stimulus,
                    freq: SiValue::new(1, SiPrefix::Kilo),
                    delay: SiValue::zero(),
                    damping: SiValue::zero(),
                },
            ))
            .add(Instance::new(
                "n",
                DEVICE_SUBCKT,
                [GROUND, GATE, GROUND, GROUND],
            ))
            .add(Vsource::dc("dc", BIAS_NODE, GROUND, SiValue::zero()));
        Self {
            circuit,
            frequency: params.frequency,
            temp: params.temp,
        }
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }
}

fn first_phasor(ac: &AcData, name: &str) -> Result<Complex64> {
    ac.try_signal(name)?
        .get(0)
        .ok_or_else(|| ErrorSource::RawfileParsing(format!("{name} has no AC points")).into())
}

impl Sweep for CggSweep {
    type Point = f64;
    type Output = f64;

    fn name(&self) -> ArcStr {
        arcstr::literal!("cgg")
    }

    fn setup(&self, vg: &f64, ctx: &mut PreSimCtx) -> Result<()> {
        ctx.set_circuit(self.circuit.with_dc(BIAS_SOURCE, SiValue::volts(*vg))?)
            .set_temp(self.temp)
            .set_tnom(self.temp)
            .add_analysis(AcAnalysis::single(self.frequency));
        Ok(())
    }

    fn measure(&self, _vg: &f64, ctx: &PostSimCtx) -> Result<f64> {
        let ac = ctx.ac(0)?;
        let v = first_phasor(ac, &names::voltage(GATE))?;
        let i = first_phasor(ac, &names::current(AC_SOURCE))?;
        let freq = ac.freq.get(0).unwrap_or(self.frequency);
        Ok(post::capacitance(v, i, freq))
    }
}

impl From<SweepOutcome<f64, f64>> for CggCurve {
    fn from(value: SweepOutcome<f64, f64>) -> Self {
        let (vg, cgg) = value.unzip();
        Self { vg, cgg }
    }
}

/// Sweeps the gate bias and returns `Cgg` at every point that simulated.
pub fn cgg_vs_vg(runner: &SweepRunner, params: &CggParams) -> Result<CggCurve> {
    let sweep = CggSweep::new(params);
    let outcome = runner.run(&sweep, params.biases.iter().copied())?;
    Ok(outcome.into())
}
