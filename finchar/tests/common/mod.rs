#![allow(dead_code)]

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex};

use finchar::circuit::{Circuit, Element};
use finchar::deps::num_complex::Complex64;
use finchar::error::{ErrorSource, Result};
use finchar::sweep::{FailurePolicy, SweepRunner};
use finchar::units::SiValue;
use finchar::verification::simulation::{
    names, AcAnalysis, AcData, Analysis, AnalysisData, ComplexSignal, DcAnalysis, DcData,
    Quantity, RealSignal, SimInput, SimOutput, Simulator, SimulatorOpts, TranAnalysis, TranData,
};

pub const VT: f64 = 0.3;
pub const K: f64 = 1e-4;

/// Gate capacitance of the stand-in device, in farads.
pub fn model_cgg(vg: f64) -> f64 {
    1e-16 * (1.5 + (vg / 0.3).tanh())
}

/// Drain current of the stand-in device, in amperes.
pub fn model_id(vg: f64, vd: f64) -> f64 {
    let overdrive = (vg - VT).max(0.0);
    let sub = 1e-9 * ((vg - VT).min(0.0) / 0.03).exp();
    (K * overdrive * overdrive + sub) * (1.0 - (-vd / 0.1).exp())
}

/// A simulator double that evaluates closed-form device and buffer models
/// instead of running an engine.
#[derive(Default)]
pub struct FakeEngine {
    fail_when: Vec<(String, SiValue)>,
    requests: Mutex<Vec<SimInput>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with a convergence error whenever `element` has `value`.
    pub fn fail_when(mut self, element: &str, value: SiValue) -> Self {
        self.fail_when.push((element.to_string(), value));
        self
    }

    pub fn requests(&self) -> Vec<SimInput> {
        self.requests.lock().unwrap().clone()
    }

    fn should_fail(&self, circuit: &Circuit) -> bool {
        self.fail_when
            .iter()
            .any(|(name, value)| match circuit.element(name) {
                Some(Element::Vsource(v)) => v.dc == *value,
                Some(Element::Capacitor(c)) => c.value == *value,
                _ => false,
            })
    }

    fn dc_of(circuit: &Circuit, name: &str) -> Result<f64> {
        Ok(circuit
            .source(name)
            .ok_or_else(|| ErrorSource::SourceNotFound(name.into()))?
            .dc
            .to_f64())
    }

    fn ac(&self, circuit: &Circuit, ac: &AcAnalysis) -> Result<AnalysisData> {
        let vg = Self::dc_of(circuit, "Vdc")?;
        let f = ac.fstart;
        let v = Complex64::new(0.1, 0.0);
        let i = -Complex64::new(0.0, 2.0 * PI * f * model_cgg(vg)) * v;
        let complex = |c: Complex64, quantity: Quantity| ComplexSignal {
            real: vec![c.re],
            imag: vec![c.im],
            quantity,
        };
        Ok(AcData {
            data: HashMap::from([
                (names::voltage("gate"), complex(v, Quantity::Voltage)),
                (names::current("Vac"), complex(i, Quantity::Current)),
            ]),
            freq: RealSignal {
                values: vec![f],
                quantity: Quantity::Frequency,
            },
        }
        .into())
    }

    fn dc(&self, circuit: &Circuit, dc: &DcAnalysis) -> Result<AnalysisData> {
        let sweep = dc.points()?;
        let id: Vec<f64> = if dc.sweep.eq_ignore_ascii_case("Vd") {
            let vg = Self::dc_of(circuit, "Vg")?;
            sweep.iter().map(|&vd| -model_id(vg, vd)).collect()
        } else {
            let vd = Self::dc_of(circuit, "Vd")?;
            sweep.iter().map(|&vg| -model_id(vg, vd)).collect()
        };
        Ok(DcData {
            data: HashMap::from([
                (
                    names::SWEEP.to_string(),
                    RealSignal {
                        values: sweep,
                        quantity: Quantity::Voltage,
                    },
                ),
                (
                    names::current("Vd"),
                    RealSignal {
                        values: id,
                        quantity: Quantity::Current,
                    },
                ),
            ]),
        }
        .into())
    }

    fn tran(&self, circuit: &Circuit, tran: &TranAnalysis) -> Result<AnalysisData> {
        let vdd = Self::dc_of(circuit, "VDD")?;
        let c_eq = match circuit.element("Ceq") {
            Some(Element::Capacitor(c)) => c.value.to_f64(),
            _ => return Err(ErrorSource::SourceNotFound("Ceq".into()).into()),
        };
        let (t_in, t_out) = (0.1e-9, 0.12e-9);
        let tau = 5e-12 + c_eq * 1e4;

        let n = (tran.stop / tran.step).round() as usize + 1;
        let time: Vec<f64> = (0..n).map(|i| i as f64 * tran.step).collect();
        let input: Vec<f64> = time
            .iter()
            .map(|&t| if t > t_in { vdd } else { 0.0 })
            .collect();
        let out: Vec<f64> = time
            .iter()
            .map(|&t| {
                if t > t_out {
                    vdd * (1.0 - (-(t - t_out) / tau).exp())
                } else {
                    0.0
                }
            })
            .collect();
        let real = |values: Vec<f64>, quantity: Quantity| RealSignal { values, quantity };
        Ok(TranData {
            data: HashMap::from([
                (names::voltage("IN"), real(input, Quantity::Voltage)),
                (names::voltage("OUT"), real(out, Quantity::Voltage)),
            ]),
            time: real(time, Quantity::Time),
        }
        .into())
    }
}

impl Simulator for FakeEngine {
    fn new(_opts: SimulatorOpts) -> Result<Self> {
        Ok(Self::default())
    }

    fn simulate(&self, input: SimInput) -> Result<SimOutput> {
        self.requests.lock().unwrap().push(input.clone());

        if self.should_fail(&input.circuit) {
            return Err(ErrorSource::Convergence("timestep too small".into()).into());
        }

        let data = input
            .analyses
            .iter()
            .map(|an| match an {
                Analysis::Ac(ac) => self.ac(&input.circuit, ac),
                Analysis::Dc(dc) => self.dc(&input.circuit, dc),
                Analysis::Tran(tran) => self.tran(&input.circuit, tran),
                Analysis::Op(_) => Ok(AnalysisData::Other),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SimOutput { data })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub fn runner(engine: Arc<FakeEngine>) -> SweepRunner {
    runner_with_policy(engine, FailurePolicy::Continue)
}

pub fn runner_with_policy(engine: Arc<FakeEngine>, policy: FailurePolicy) -> SweepRunner {
    SweepRunner::builder()
        .shared_simulator(engine)
        .temp(27.0)
        .tnom(27.0)
        .policy(policy)
        .build()
        .unwrap()
}
