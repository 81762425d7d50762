//! Transient response of a four-stage inverter buffer driving a lumped load.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::DEFAULT_TEMP;
use crate::circuit::{Capacitor, Circuit, Instance, Pulse, Vsource, GROUND};
use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorSource, Result};
use crate::sweep::{Sweep, SweepRunner};
use crate::units::{SiPrefix, SiValue};
use crate::verification::simulation::context::{PostSimCtx, PreSimCtx};
use crate::verification::simulation::waveform::{Transition, Waveform};
use crate::verification::simulation::{names, Save, TranAnalysis};

const INPUT: &str = "IN";
const OUTPUT: &str = "OUT";
const VDD: &str = "VDD";
const VSS: &str = "VSS";
const LOAD: &str = "Ceq";

/// The standard cell used for every stage of the buffer.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InverterCell {
    #[default]
    Invd8,
    Invd1,
}

impl InverterCell {
    /// The subcircuit name defined by the cell's netlist.
    pub fn subckt(&self) -> &'static str {
        match self {
            Self::Invd8 => "INVD8",
            Self::Invd1 => "INVD1",
        }
    }
}

impl std::str::FromStr for InverterCell {
    type Err = ErrorSource;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "invd8" => Ok(Self::Invd8),
            "invd1" => Ok(Self::Invd1),
            _ => Err(ErrorSource::InvalidArgs(format!("unknown inverter cell: {s}"))),
        }
    }
}

/// Netlists for the buffer testbench. All four are included whichever cell
/// is instantiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferParams {
    pub nmos_model: PathBuf,
    pub pmos_model: PathBuf,
    pub invd8: PathBuf,
    pub invd1: PathBuf,
    pub cell: InverterCell,
    /// Supply voltage, in volts.
    pub vdd: f64,
    /// Transient stop time, in seconds.
    pub stop: f64,
    /// Transient step, in seconds.
    pub step: f64,
    pub temp: f64,
}

impl BufferParams {
    pub fn new(
        nmos_model: impl Into<PathBuf>,
        pmos_model: impl Into<PathBuf>,
        invd8: impl Into<PathBuf>,
        invd1: impl Into<PathBuf>,
    ) -> Self {
        Self {
            nmos_model: nmos_model.into(),
            pmos_model: pmos_model.into(),
            invd8: invd8.into(),
            invd1: invd1.into(),
            cell: InverterCell::default(),
            vdd: 0.7,
            stop: 0.3e-9,
            step: 1e-12,
            temp: DEFAULT_TEMP,
        }
    }

    pub fn with_cell(mut self, cell: InverterCell) -> Self {
        self.cell = cell;
        self
    }
}

/// The output node voltage over time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranTrace {
    /// Simulator timesteps, in seconds.
    pub time: Vec<f64>,
    /// `v(out)`, in volts. Index-aligned with `time`.
    pub out: Vec<f64>,
    /// `v(in)`, when the engine saved it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<f64>>,
}

impl TranTrace {
    /// `None` if `out` and `time` differ in length.
    pub fn output(&self) -> Option<Waveform<'_>> {
        Waveform::new(&self.time, &self.out)
    }

    /// Time from the first 50% crossing of the input to the next 50% crossing
    /// of the output.
    ///
    /// `None` if either crossing is missing, the input was not saved, or
    /// `vdd` is not a positive supply.
    pub fn delay(&self, vdd: f64) -> Option<f64> {
        if !is_supply(vdd) {
            return None;
        }
        let half = vdd / 2.0;
        let input = Waveform::new(&self.time, self.input.as_ref()?)?;
        let t_in = input.edges(half).next()?.t();
        let t_out = self.output()?.edge_after(t_in, half)?.t();
        Some(t_out - t_in)
    }

    /// 20%-80% output transitions.
    pub fn transition_times(&self, vdd: f64) -> Vec<Transition> {
        match self.output() {
            Some(out) if is_supply(vdd) => out.transitions(0.2 * vdd, 0.8 * vdd),
            _ => Vec::new(),
        }
    }
}

fn is_supply(vdd: f64) -> bool {
    vdd.is_finite() && vdd > 0.0
}

pub struct BufferSweep {
    circuit: Circuit,
    tran: TranAnalysis,
    temp: f64,
}

impl BufferSweep {
    pub fn new(params: &BufferParams) -> Self {
        let cell = params.cell.subckt();
        let mut circuit = Circuit::new(format!("{} buffer", cell.to_lowercase()));
        circuit
            .include(&params.nmos_model)
            .include(&params.pmos_model)
            .include(&params.invd8)
            .include(&params.invd1)
            .add(Vsource::dc("DD", VDD, GROUND, SiValue::volts(params.vdd)))
            .add(Vsource::dc("SS", VSS, GROUND, SiValue::zero()));

        let stages = [(INPUT, "N1"), ("N1", "OUT1"), ("OUT1", "N2"), ("N2", OUTPUT)];
        for (i, (a, y)) in stages.into_iter().enumerate() {
            circuit.add(Instance::new(
                format!("INV{}", i + 1),
                cell,
                [a, VDD, VSS, y],
            ));
        }

        circuit
            .add(Capacitor::new(LOAD, OUTPUT, GROUND, SiValue::zero()))
            .add(Vsource::pulse(
                INPUT,
                INPUT,
                GROUND,
                Pulse {
                    v1: SiValue::zero(),
                    v2: SiValue::volts(params.vdd),
                    td: SiValue::new(100, SiPrefix::Pico),
                    tr: SiValue::new(1, SiPrefix::Pico),
                    tf: SiValue::new(1, SiPrefix::Pico),
                    pw: SiValue::new(1, SiPrefix::Nano),
                    period: SiValue::new(2, SiPrefix::Nano),
                },
            ))
            .add(Capacitor::new(
                "LOAD",
                OUTPUT,
                GROUND,
                SiValue::farads(1e-24),
            ));

        Self {
            circuit,
            tran: TranAnalysis {
                stop: params.stop,
                step: params.step,
                start: 0.0,
            },
            temp: params.temp,
        }
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }
}

impl Sweep for BufferSweep {
    /// Equivalent load capacitance, in farads.
    type Point = f64;
    type Output = TranTrace;

    fn name(&self) -> ArcStr {
        arcstr::literal!("buffer")
    }

    fn setup(&self, c_eq: &f64, ctx: &mut PreSimCtx) -> Result<()> {
        ctx.set_circuit(
            self.circuit
                .with_capacitance(LOAD, SiValue::farads(*c_eq))?,
        )
        .set_temp(self.temp)
        .set_tnom(self.temp)
        .save(Save::Signals(vec![
            names::voltage(INPUT),
            names::voltage(OUTPUT),
        ]))
        .add_analysis(self.tran.clone());
        Ok(())
    }

    fn measure(&self, _c_eq: &f64, ctx: &PostSimCtx) -> Result<TranTrace> {
        let tran = ctx.tran(0)?;
        let out = tran.try_signal(&names::voltage(OUTPUT))?;
        if out.len() != tran.time.len() {
            return Err(ErrorSource::RawfileParsing(format!(
                "{} output samples for {} timesteps",
                out.len(),
                tran.time.len()
            ))
            .into());
        }
        Ok(TranTrace {
            time: tran.time.values.clone(),
            out: out.values.clone(),
            input: tran
                .signal(&names::voltage(INPUT))
                .map(|s| s.values.clone()),
        })
    }
}

/// Simulates the buffer once with load `c_eq` (farads).
///
/// Unlike the bias sweeps, a failed simulation is returned as an error.
pub fn buffer_transient(
    runner: &SweepRunner,
    params: &BufferParams,
    c_eq: f64,
) -> Result<TranTrace> {
    let sweep = BufferSweep::new(params);
    let outcome = runner.run(&sweep, [c_eq])?;
    outcome
        .into_result()?
        .pop()
        .map(|(_, trace)| trace)
        .ok_or_else(|| ErrorSource::Internal("buffer sweep returned no points".into()).into())
}

/// Transient traces for each load that simulated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferTraces {
    /// Equivalent load capacitance, in farads.
    pub c_eq: Vec<f64>,
    /// Index-aligned with `c_eq`.
    pub traces: Vec<TranTrace>,
}

/// Simulates the buffer at each load in `c_eqs`, skipping loads that fail.
pub fn buffer_load_sweep(
    runner: &SweepRunner,
    params: &BufferParams,
    c_eqs: &[f64],
) -> Result<BufferTraces> {
    let sweep = BufferSweep::new(params);
    let (c_eq, traces) = runner.run(&sweep, c_eqs.iter().copied())?.unzip();
    Ok(BufferTraces { c_eq, traces })
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    fn params() -> BufferParams {
        BufferParams::new("nmos.sp", "pmos.sp", "INVD8.sp", "INVD1.sp")
    }

    #[test]
    fn invd8_topology() {
        let sweep = BufferSweep::new(&params());
        assert_eq!(sweep.circuit().includes().len(), 4);
        assert_eq!(
            sweep.circuit().spice_lines(),
            vec![
                "VDD VDD 0 DC 700000u",
                "VSS VSS 0 DC 0",
                "XINV1 IN VDD VSS N1 INVD8",
                "XINV2 N1 VDD VSS OUT1 INVD8",
                "XINV3 OUT1 VDD VSS N2 INVD8",
                "XINV4 N2 VDD VSS OUT INVD8",
                "Ceq OUT 0 0",
                "VIN IN 0 DC 0 PULSE(0 700000u 100p 1p 1p 1n 2n)",
                "CLOAD OUT 0 1e-24",
            ]
        );
    }

    #[test]
    fn invd1_uses_invd1_cells() {
        let sweep = BufferSweep::new(&params().with_cell(InverterCell::Invd1));
        let lines = sweep.circuit().spice_lines();
        assert_eq!(lines[2], "XINV1 IN VDD VSS N1 INVD1");
        assert_eq!(lines[5], "XINV4 N2 VDD VSS OUT INVD1");
        // Both cell netlists are still included.
        assert_eq!(sweep.circuit().includes().len(), 4);
    }

    #[test]
    fn setup_applies_load() {
        let sweep = BufferSweep::new(&params());
        let mut ctx = PreSimCtx::new("/tmp/buffer", Default::default());
        sweep.setup(&2e-15, &mut ctx).unwrap();
        let input = ctx.into_inner();
        assert_eq!(
            input.circuit.element("Ceq").unwrap().spice_line(),
            "Ceq OUT 0 2000000000e-24"
        );
        assert_eq!(input.analyses.len(), 1);
        assert_eq!(
            input.save,
            Save::Signals(vec!["v(in)".to_string(), "v(out)".to_string()])
        );
    }

    #[test]
    fn cell_names_parse() {
        assert_eq!("INVD1".parse::<InverterCell>().unwrap(), InverterCell::Invd1);
        assert_eq!("invd8".parse::<InverterCell>().unwrap(), InverterCell::Invd8);
        assert!("invd4".parse::<InverterCell>().is_err());
    }

    fn trace() -> TranTrace {
        TranTrace {
            time: vec![0., 1., 2., 3., 4., 5.],
            out: vec![0., 0., 0., 0., 1., 1.],
            input: Some(vec![0., 0., 1., 1., 1., 1.]),
        }
    }

    #[test]
    fn propagation_delay() {
        assert_float_eq!(trace().delay(1.0).unwrap(), 2.0, abs <= 1e-12);

        let mut t = trace();
        t.input = None;
        assert!(t.delay(1.0).is_none());
    }

    #[test]
    fn malformed_traces_measure_nothing() {
        let t = trace();
        for vdd in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(t.delay(vdd).is_none());
            assert!(t.transition_times(vdd).is_empty());
        }

        let mut t = trace();
        t.input = Some(vec![0., 1.]);
        assert!(t.delay(1.0).is_none());

        let mut t = trace();
        t.out.pop();
        assert!(t.output().is_none());
        assert!(t.delay(1.0).is_none());
        assert!(t.transition_times(1.0).is_empty());
    }

    #[test]
    fn output_transitions() {
        let transitions = trace().transition_times(1.0);
        assert_eq!(transitions.len(), 1);
        assert!(transitions[0].dir().is_rising());
        assert_float_eq!(transitions[0].duration(), 1.0, abs <= 1e-12);
    }
}
