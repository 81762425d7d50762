use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::*;
use crate::circuit::{Circuit, Vsource, GROUND};
use crate::units::SiValue;
use crate::verification::simulation::{
    names, AnalysisData, OpAnalysis, OpData, Quantity, ScalarSignal, SimInput, SimOutput,
    SimulatorOpts,
};

/// Doubles the bias on `Vb`, unless the bias is one it has been told to reject.
#[derive(Default)]
struct ScriptedSimulator {
    reject: Vec<SiValue>,
    seen: Mutex<Vec<Circuit>>,
}

impl ScriptedSimulator {
    fn rejecting(values: &[f64]) -> Self {
        Self {
            reject: values.iter().copied().map(SiValue::volts).collect(),
            ..Default::default()
        }
    }

    fn seen(&self) -> Vec<Circuit> {
        self.seen.lock().unwrap().clone()
    }
}

impl Simulator for ScriptedSimulator {
    fn new(_opts: SimulatorOpts) -> Result<Self> {
        Ok(Self::default())
    }

    fn simulate(&self, input: SimInput) -> Result<SimOutput> {
        assert!(input.work_dir.is_dir());
        self.seen.lock().unwrap().push(input.circuit.clone());

        let bias = input
            .circuit
            .source("Vb")
            .ok_or_else(|| ErrorSource::SourceNotFound("Vb".into()))?
            .dc;
        if self.reject.contains(&bias) {
            return Err(ErrorSource::Convergence(format!("no convergence at {bias}")).into());
        }

        let data = HashMap::from([(
            names::voltage("b"),
            ScalarSignal {
                value: 2.0 * bias.to_f64(),
                quantity: Quantity::Voltage,
            },
        )]);
        Ok(SimOutput {
            data: vec![AnalysisData::Op(OpData { data })],
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct BiasSweep {
    circuit: Circuit,
    signal: String,
}

impl BiasSweep {
    fn new() -> Self {
        let mut circuit = Circuit::new("bias");
        circuit.add(Vsource::dc("b", "b", GROUND, SiValue::zero()));
        Self {
            circuit,
            signal: names::voltage("b"),
        }
    }
}

impl Sweep for BiasSweep {
    type Point = f64;
    type Output = f64;

    fn name(&self) -> ArcStr {
        arcstr::literal!("bias")
    }

    fn setup(&self, point: &f64, ctx: &mut PreSimCtx) -> Result<()> {
        ctx.set_circuit(self.circuit.with_dc("Vb", SiValue::volts(*point))?)
            .add_analysis(OpAnalysis::new());
        Ok(())
    }

    fn measure(&self, _point: &f64, ctx: &PostSimCtx) -> Result<f64> {
        let op = ctx.analysis(0)?.try_op()?;
        let sig = op
            .data
            .get(&self.signal)
            .ok_or_else(|| ErrorSource::SignalNotFound(self.signal.clone()))?;
        Ok(sig.value)
    }
}

fn runner(sim: Arc<ScriptedSimulator>, policy: FailurePolicy) -> SweepRunner {
    SweepRunner::builder()
        .shared_simulator(sim)
        .temp(27.0)
        .tnom(27.0)
        .policy(policy)
        .build()
        .unwrap()
}

const POINTS: [f64; 10] = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];

#[test]
fn failed_points_are_skipped_in_order() {
    let sim = Arc::new(ScriptedSimulator::rejecting(&[0.2, 0.7]));
    let outcome = runner(sim, FailurePolicy::Continue)
        .run(&BiasSweep::new(), POINTS)
        .unwrap();

    assert_eq!(outcome.total(), 10);
    assert_eq!(outcome.num_attempted(), 10);
    assert_eq!(outcome.num_succeeded(), 8);
    assert_eq!(outcome.num_failed(), 2);
    assert!(!outcome.aborted());

    let failed: Vec<usize> = outcome.failures().map(|(i, _, _)| i).collect();
    assert_eq!(failed, vec![2, 7]);

    let succeeded: Vec<f64> = outcome.successes().map(|(p, _)| *p).collect();
    assert_eq!(succeeded.len(), 8);
    assert!(!succeeded.contains(&0.2));

    let (inputs, outputs) = outcome.unzip();
    assert_eq!(inputs, vec![0.0, 0.1, 0.3, 0.4, 0.5, 0.6, 0.8, 0.9]);
    for (v, out) in inputs.iter().zip(outputs.iter()) {
        assert!((out - 2.0 * v).abs() < 1e-9);
    }
}

#[test]
fn all_points_failing_yields_empty_outcome() {
    let sim = Arc::new(ScriptedSimulator::rejecting(&POINTS));
    let outcome = runner(sim, FailurePolicy::Continue)
        .run(&BiasSweep::new(), POINTS)
        .unwrap();

    assert_eq!(outcome.num_succeeded(), 0);
    assert_eq!(outcome.num_failed(), 10);
    assert!(outcome.values().is_empty());
}

#[test]
fn empty_sweep() {
    let sim = Arc::new(ScriptedSimulator::default());
    let outcome = runner(sim.clone(), FailurePolicy::Continue)
        .run(&BiasSweep::new(), Vec::<f64>::new())
        .unwrap();
    assert_eq!(outcome.total(), 0);
    assert!(sim.seen().is_empty());
}

#[test]
fn abort_policy_stops_at_first_failure() {
    let sim = Arc::new(ScriptedSimulator::rejecting(&[0.3, 0.5]));
    let outcome = runner(sim.clone(), FailurePolicy::AbortOnFirst)
        .run(&BiasSweep::new(), POINTS)
        .unwrap();

    assert!(outcome.aborted());
    assert_eq!(outcome.num_attempted(), 4);
    assert_eq!(outcome.num_succeeded(), 3);
    assert_eq!(sim.seen().len(), 4);
    assert_eq!(
        outcome.summary(),
        "bias: 3 of 10 points succeeded (1 failed, 6 not attempted)"
    );
}

#[test]
fn each_point_gets_its_own_circuit() {
    let sim = Arc::new(ScriptedSimulator::default());
    let sweep = BiasSweep::new();
    let outcome = runner(sim.clone(), FailurePolicy::Continue)
        .run(&sweep, [0.1, 0.2, 0.3])
        .unwrap();

    let seen: Vec<SiValue> = sim
        .seen()
        .iter()
        .map(|c| c.source("Vb").unwrap().dc)
        .collect();
    assert_eq!(
        seen,
        vec![SiValue::volts(0.1), SiValue::volts(0.2), SiValue::volts(0.3)]
    );

    // The sweep's own circuit is never modified.
    assert_eq!(sweep.circuit.source("Vb").unwrap().dc, SiValue::zero());

    // Earlier results are not affected by later points.
    let values = outcome.values();
    assert!((values[0] - 0.2).abs() < 1e-9);
    assert!((values[2] - 0.6).abs() < 1e-9);
}

#[test]
fn measurement_errors_are_point_failures() {
    let sim = Arc::new(ScriptedSimulator::default());
    let mut sweep = BiasSweep::new();
    sweep.signal = names::voltage("missing");
    let outcome = runner(sim, FailurePolicy::Continue)
        .run(&sweep, [0.1, 0.2])
        .unwrap();

    assert_eq!(outcome.num_failed(), 2);
    for (_, _, err) in outcome.failures() {
        assert!(matches!(err.source(), ErrorSource::SignalNotFound(_)));
        assert!(!err.is_simulation_failure());
    }
}

#[test]
fn failures_carry_point_context() {
    let sim = Arc::new(ScriptedSimulator::rejecting(&[0.2]));
    let outcome = runner(sim, FailurePolicy::Continue)
        .run(&BiasSweep::new(), [0.1, 0.2, 0.3])
        .unwrap();

    let err = outcome.into_result().unwrap_err();
    assert!(err.is_simulation_failure());
    assert!(matches!(err.source(), ErrorSource::Convergence(_)));
    assert!(matches!(
        err.context(),
        [ErrorContext::SweepPoint { index: 1, .. }]
    ));
    assert_eq!(err.sweep_point(), Some(1));
}

#[test]
fn work_dirs_are_per_point() {
    let dir = TempDir::new("finchar_sweep").unwrap();
    let sim = Arc::new(ScriptedSimulator::default());
    let runner = SweepRunner::builder()
        .shared_simulator(sim)
        .work_dir(dir.path())
        .build()
        .unwrap();
    runner.run(&BiasSweep::new(), [0.1, 0.2]).unwrap();

    assert!(dir.path().join("bias/point_000").is_dir());
    assert!(dir.path().join("bias/point_001").is_dir());
}

#[test]
fn runner_requires_simulator() {
    let err = SweepRunner::builder().build().err().unwrap();
    assert!(matches!(err.source(), ErrorSource::ToolNotSpecified));
}
