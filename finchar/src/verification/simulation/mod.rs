use std::collections::HashMap;
use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use self::waveform::Waveform;
use crate::circuit::Circuit;
use crate::deps::num_complex::Complex64;
use crate::error::{ErrorSource, Result};

pub mod context;
pub mod names;
pub mod waveform;

/// Everything a simulator needs for a single invocation.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimInput {
    pub work_dir: PathBuf,
    pub opts: SimOpts,
    pub circuit: Circuit,
    pub save: Save,
    pub analyses: Vec<Analysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimOutput {
    /// One entry per requested analysis, in request order.
    pub data: Vec<AnalysisData>,
}

impl SimOutput {
    pub fn analysis(&self, idx: usize) -> Result<&AnalysisData> {
        self.data
            .get(idx)
            .ok_or_else(|| ErrorSource::MissingAnalysis(idx).into())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimOpts {
    /// Simulation temperature, in degrees Celsius.
    pub temp: Option<f64>,
    /// The temperature at which model parameters were measured, in degrees Celsius.
    pub tnom: Option<f64>,
    pub gmin: Option<f64>,
    pub reltol: Option<f64>,
    pub other: HashMap<String, String>,
}

/// Which signals the engine writes to its rawfile.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub enum Save {
    #[default]
    All,
    Signals(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Analysis {
    Op(OpAnalysis),
    Dc(DcAnalysis),
    Tran(TranAnalysis),
    Ac(AcAnalysis),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AnalysisType {
    Op,
    Dc,
    Tran,
    Ac,
    Other,
}

#[derive(Debug, Default, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub struct OpAnalysis {}

impl OpAnalysis {
    #[inline]
    pub fn new() -> Self {
        Self {}
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpData {
    /// All saved signals.
    pub data: HashMap<String, ScalarSignal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranData {
    /// All saved signals, not including time.
    pub data: HashMap<String, RealSignal>,
    pub time: RealSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcData {
    /// All saved signals, not including frequency.
    pub data: HashMap<String, ComplexSignal>,
    pub freq: RealSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcData {
    /// All saved signals, including the swept variable as [`names::SWEEP`].
    pub data: HashMap<String, RealSignal>,
}

/// The most values a single [`DcAnalysis`] may visit.
pub const MAX_DC_POINTS: usize = 1_000_000;

/// A simulator-native DC sweep of a single source.
///
/// This produces a full curve from one simulator invocation.
#[derive(Debug, Clone, Builder, PartialEq, Serialize, Deserialize)]
pub struct DcAnalysis {
    /// The name of the source or parameter to sweep.
    #[builder(setter(into))]
    pub sweep: String,
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl DcAnalysis {
    #[inline]
    pub fn builder() -> DcAnalysisBuilder {
        DcAnalysisBuilder::default()
    }

    /// The sweep values the simulator will visit, stop inclusive.
    ///
    /// A zero step, or one pointing away from `stop`, visits `start` only.
    /// Ranges of more than [`MAX_DC_POINTS`] values are rejected.
    pub fn points(&self) -> Result<Vec<f64>> {
        let steps = (self.stop - self.start) / self.step;
        if self.step == 0.0 || steps < 0.0 {
            return Ok(vec![self.start]);
        }
        if !steps.is_finite() || steps.round() >= MAX_DC_POINTS as f64 {
            return Err(ErrorSource::InvalidArgs(format!(
                "DC sweep of {} from {} to {} in steps of {} has too many points",
                self.sweep, self.start, self.stop, self.step
            ))
            .into());
        }
        let n = steps.round() as usize + 1;
        Ok((0..n).map(|i| self.start + i as f64 * self.step).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct TranAnalysis {
    pub stop: f64,
    pub step: f64,
    #[builder(default)]
    pub start: f64,
}

impl TranAnalysis {
    #[inline]
    pub fn builder() -> TranAnalysisBuilder {
        TranAnalysisBuilder::default()
    }
}

#[derive(Debug, Clone, Builder, PartialEq, Serialize, Deserialize)]
pub struct AcAnalysis {
    pub fstart: f64,
    pub fstop: f64,
    pub points: usize,
    pub sweep: SweepMode,
}

impl AcAnalysis {
    #[inline]
    pub fn builder() -> AcAnalysisBuilder {
        AcAnalysisBuilder::default()
    }

    /// An AC analysis at exactly one frequency.
    pub fn single(freq: f64) -> Self {
        Self {
            fstart: freq,
            fstop: freq,
            points: 1,
            sweep: SweepMode::Dec,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarSignal {
    pub value: f64,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealSignal {
    pub values: Vec<f64>,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexSignal {
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Quantity {
    Voltage,
    Current,
    Frequency,
    Time,
    Temperature,
    Unknown,
}

impl Quantity {
    /// Parses the unit column of a rawfile variable listing.
    pub fn from_rawfile_unit(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "voltage" => Quantity::Voltage,
            "current" => Quantity::Current,
            "frequency" => Quantity::Frequency,
            "time" => Quantity::Time,
            "temp" | "temp-sweep" | "temperature" => Quantity::Temperature,
            _ => Quantity::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum SweepMode {
    Dec,
    Oct,
    Lin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalysisData {
    Op(OpData),
    Tran(TranData),
    Ac(AcData),
    Dc(DcData),
    Other,
}

impl AnalysisData {
    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            Self::Op(_) => AnalysisType::Op,
            Self::Tran(_) => AnalysisType::Tran,
            Self::Ac(_) => AnalysisType::Ac,
            Self::Dc(_) => AnalysisType::Dc,
            Self::Other => AnalysisType::Other,
        }
    }

    fn mismatch(&self, expected: AnalysisType) -> ErrorSource {
        ErrorSource::AnalysisMismatch {
            expected,
            found: self.analysis_type(),
        }
    }
}

/// Generates the accessor and `From` impl for each [`AnalysisData`] variant.
macro_rules! data_accessors {
    ($($variant:ident($data:ty) => $try_get:ident;)+) => {
        impl AnalysisData {
            $(
                #[doc = concat!(
                    "The `", stringify!($variant), "` results, or `AnalysisMismatch`.",
                )]
                pub fn $try_get(&self) -> Result<&$data> {
                    match self {
                        Self::$variant(x) => Ok(x),
                        _ => Err(self.mismatch(AnalysisType::$variant).into()),
                    }
                }
            )+
        }

        $(
            impl From<$data> for AnalysisData {
                fn from(value: $data) -> Self {
                    Self::$variant(value)
                }
            }
        )+
    };
}

data_accessors! {
    Op(OpData) => try_op;
    Tran(TranData) => try_tran;
    Ac(AcData) => try_ac;
    Dc(DcData) => try_dc;
}

/// Engine-independent options for constructing a [`Simulator`].
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorOpts {
    /// Path to the simulator executable.
    ///
    /// If unset, the engine's program name is looked up on `PATH`.
    pub command: Option<PathBuf>,
    /// Number of MPI processes for engines with a parallel build.
    pub mpi_procs: Option<usize>,
    /// Extra command line flags.
    pub flags: Vec<String>,
}

/// An external circuit simulator.
///
/// Implementations block until the simulator process exits.
pub trait Simulator {
    fn new(opts: SimulatorOpts) -> Result<Self>
    where
        Self: Sized;
    fn simulate(&self, input: SimInput) -> Result<SimOutput>;
    fn name(&self) -> &'static str;
}

impl Analysis {
    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            Analysis::Op(_) => AnalysisType::Op,
            Analysis::Tran(_) => AnalysisType::Tran,
            Analysis::Ac(_) => AnalysisType::Ac,
            Analysis::Dc(_) => AnalysisType::Dc,
        }
    }
}

macro_rules! analysis_from {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        $(
            impl From<$ty> for Analysis {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )+
    };
}

analysis_from!(
    Op(OpAnalysis),
    Dc(DcAnalysis),
    Tran(TranAnalysis),
    Ac(AcAnalysis),
);

impl RealSignal {
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied()
    }
}

impl std::ops::Index<usize> for RealSignal {
    type Output = f64;
    fn index(&self, index: usize) -> &Self::Output {
        self.values.index(index)
    }
}

impl ComplexSignal {
    #[inline]
    pub fn len(&self) -> usize {
        self.real.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<Complex64> {
        Some(Complex64::new(*self.real.get(idx)?, *self.imag.get(idx)?))
    }

    pub fn to_complex(&self) -> Vec<Complex64> {
        self.real
            .iter()
            .zip(self.imag.iter())
            .map(|(&re, &im)| Complex64::new(re, im))
            .collect()
    }
}

fn not_found(name: &str) -> ErrorSource {
    ErrorSource::SignalNotFound(name.to_string())
}

impl TranData {
    pub fn signal(&self, name: &str) -> Option<&RealSignal> {
        self.data.get(name)
    }

    pub fn try_signal(&self, name: &str) -> Result<&RealSignal> {
        Ok(self.signal(name).ok_or_else(|| not_found(name))?)
    }

    pub fn waveform(&self, name: &str) -> Option<Waveform<'_>> {
        let x = self.data.get(name)?;
        Waveform::from_signal(&self.time, x)
    }
}

impl AcData {
    pub fn signal(&self, name: &str) -> Option<&ComplexSignal> {
        self.data.get(name)
    }

    pub fn try_signal(&self, name: &str) -> Result<&ComplexSignal> {
        Ok(self.signal(name).ok_or_else(|| not_found(name))?)
    }
}

impl DcData {
    pub fn signal(&self, name: &str) -> Option<&RealSignal> {
        self.data.get(name)
    }

    pub fn try_signal(&self, name: &str) -> Result<&RealSignal> {
        Ok(self.signal(name).ok_or_else(|| not_found(name))?)
    }

    /// The values of the swept variable, if the simulator reported them.
    pub fn sweep(&self) -> Option<&RealSignal> {
        self.data.get(names::SWEEP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_sweep_points_include_stop() {
        let dc = DcAnalysis::builder()
            .sweep("Vd")
            .start(0.0)
            .stop(1.2)
            .step(0.05)
            .build()
            .unwrap();
        let points = dc.points().unwrap();
        assert_eq!(points.len(), 25);
        assert_eq!(points[0], 0.0);
        assert!((points[24] - 1.2).abs() < 1e-12);
    }

    #[test]
    fn degenerate_dc_sweep_has_one_point() {
        let dc = DcAnalysis {
            sweep: "Vd".into(),
            start: 0.3,
            stop: 0.0,
            step: 0.1,
        };
        assert_eq!(dc.points().unwrap(), vec![0.3]);
    }

    #[test]
    fn oversized_dc_sweep_is_rejected() {
        let mut dc = DcAnalysis {
            sweep: "Vd".into(),
            start: 0.0,
            stop: 1.2,
            step: 1e-300,
        };
        assert!(matches!(
            dc.points().unwrap_err().source(),
            ErrorSource::InvalidArgs(_)
        ));
        dc.step = f64::NAN;
        assert!(dc.points().is_err());
        dc.step = 1.2 / (MAX_DC_POINTS - 1) as f64;
        assert_eq!(dc.points().unwrap().len(), MAX_DC_POINTS);
    }

    #[test]
    fn analysis_accessors_report_mismatch() {
        let data = AnalysisData::Dc(DcData {
            data: HashMap::new(),
        });
        let err = data.try_ac().unwrap_err();
        assert!(matches!(
            err.source(),
            ErrorSource::AnalysisMismatch {
                expected: AnalysisType::Ac,
                found: AnalysisType::Dc
            }
        ));
        assert!(data.try_dc().is_ok());
    }

    #[test]
    fn missing_analysis_is_an_error() {
        let out = SimOutput { data: vec![] };
        assert!(matches!(
            out.analysis(0).unwrap_err().source(),
            ErrorSource::MissingAnalysis(0)
        ));
    }

    #[test]
    fn complex_signal_values() {
        let sig = ComplexSignal {
            real: vec![1.0, 2.0],
            imag: vec![-1.0, 0.5],
            quantity: Quantity::Current,
        };
        assert_eq!(sig.get(1), Some(Complex64::new(2.0, 0.5)));
        assert_eq!(sig.get(2), None);
        assert_eq!(sig.to_complex().len(), 2);
    }

    #[test]
    fn tran_waveform_lookup() {
        let tran = TranData {
            time: RealSignal {
                values: vec![0.0, 1e-12, 2e-12],
                quantity: Quantity::Time,
            },
            data: HashMap::from([(
                names::voltage("out"),
                RealSignal {
                    values: vec![0.0, 0.4, 0.8],
                    quantity: Quantity::Voltage,
                },
            )]),
        };
        let out = tran.waveform(&names::voltage("out")).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.last_x(), Some(0.8));
        assert!(tran.waveform(&names::voltage("in")).is_none());
        assert!(tran.try_signal(&names::voltage("in")).is_err());
    }

    #[test]
    fn rawfile_units() {
        assert_eq!(Quantity::from_rawfile_unit("voltage"), Quantity::Voltage);
        assert_eq!(Quantity::from_rawfile_unit(" Current "), Quantity::Current);
        assert_eq!(Quantity::from_rawfile_unit("notype"), Quantity::Unknown);
    }
}
