use std::fmt::{Debug, Display};
use std::path::PathBuf;

use thiserror::Error;

use crate::deps::arcstr::ArcStr;
use crate::verification::simulation::AnalysisType;

pub type Result<T> = std::result::Result<T, FincharError>;

pub struct FincharError {
    pub(crate) source: ErrorSource,
    pub(crate) context: Vec<ErrorContext>,
}

impl FincharError {
    pub fn source(&self) -> &ErrorSource {
        &self.source
    }

    pub fn context(&self) -> &[ErrorContext] {
        &self.context
    }

    /// The innermost sweep point this error was attributed to, if any.
    pub fn sweep_point(&self) -> Option<usize> {
        self.context.iter().find_map(|ctx| match ctx {
            ErrorContext::SweepPoint { index, .. } => Some(*index),
            _ => None,
        })
    }
}

impl std::error::Error for FincharError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl Display for FincharError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)?;
        for item in self.context.iter() {
            write!(f, "\n\twhile {}", item)?;
        }
        Ok(())
    }
}

impl Debug for FincharError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FincharError")
            .field("source", &self.source)
            .field("context", &self.context)
            .finish()
    }
}

impl<T> From<T> for FincharError
where
    T: Into<ErrorSource>,
{
    fn from(value: T) -> Self {
        Self {
            source: value.into(),
            context: Vec::new(),
        }
    }
}

impl FincharError {
    /// Records what was being done when the error occurred. Outermost last.
    pub fn with_context(mut self, ctx: impl Into<ErrorContext>) -> Self {
        self.context.push(ctx.into());
        self
    }

    /// Whether the simulator itself rejected or failed to solve the circuit,
    /// as opposed to an I/O or measurement problem on this side of the boundary.
    pub fn is_simulation_failure(&self) -> bool {
        matches!(
            self.source,
            ErrorSource::SimulatorFailed { .. } | ErrorSource::Convergence(_)
        )
    }
}

#[inline]
pub fn with_err_context<T, E, C>(result: std::result::Result<T, E>, ctx: C) -> Result<T>
where
    C: FnOnce() -> ErrorContext,
    E: Into<FincharError>,
{
    result.map_err(|err| err.into().with_context(ctx()))
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorContext {
    CreateDir(PathBuf),
    CreateFile(PathBuf),
    ReadFile(PathBuf),
    RemoveFile(PathBuf),
    SweepPoint { index: usize, point: ArcStr },
    Task(ArcStr),
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorContext::*;
        match self {
            CreateDir(path) => write!(f, "creating directory {path:?}"),
            CreateFile(path) => write!(f, "creating file {path:?}"),
            ReadFile(path) => write!(f, "reading file {path:?}"),
            RemoveFile(path) => write!(f, "removing file {path:?}"),
            SweepPoint { index, point } => write!(f, "simulating sweep point {index} ({point})"),
            Task(task) => write!(f, "{task}"),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorSource {
    #[error("internal error: {0}")]
    Internal(String),

    #[error("simulator exited with {status}: {message}")]
    SimulatorFailed { status: String, message: String },

    #[error("simulator failed to converge: {0}")]
    Convergence(String),

    #[error("failed to parse simulator output: {0}")]
    RawfileParsing(String),

    #[error("signal not found in simulation output: {0}")]
    SignalNotFound(String),

    #[error("expected {expected:?} analysis data, got {found:?}")]
    AnalysisMismatch {
        expected: AnalysisType,
        found: AnalysisType,
    },

    #[error("missing data for analysis {0}")]
    MissingAnalysis(usize),

    #[error("no such source in circuit: {0}")]
    SourceNotFound(ArcStr),

    #[error("no simulator specified")]
    ToolNotSpecified,

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing TOML: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("error parsing JSON: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("error writing CSV: {0}")]
    Csv(#[from] csv::Error),
}
