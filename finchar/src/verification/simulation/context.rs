use std::path::{Path, PathBuf};

use super::{
    AcData, Analysis, AnalysisData, DcData, Save, SimInput, SimOpts, SimOutput, TranData,
};
use crate::circuit::Circuit;
use crate::error::Result;

/// Builds the [`SimInput`] for one simulator invocation.
pub struct PreSimCtx {
    pub(crate) input: SimInput,
}

/// Gives measurement code access to one simulator invocation's results.
pub struct PostSimCtx {
    pub(crate) output: SimOutput,
}

impl PreSimCtx {
    #[inline]
    pub fn new(work_dir: impl Into<PathBuf>, opts: SimOpts) -> Self {
        Self {
            input: SimInput {
                work_dir: work_dir.into(),
                opts,
                ..Default::default()
            },
        }
    }

    pub fn set_circuit(&mut self, circuit: Circuit) -> &mut Self {
        self.input.circuit = circuit;
        self
    }

    pub fn add_analysis(&mut self, analysis: impl Into<Analysis>) -> &mut Self {
        self.input.analyses.push(analysis.into());
        self
    }

    pub fn save(&mut self, save: Save) -> &mut Self {
        self.input.save = save;
        self
    }

    pub fn set_temp(&mut self, temp: f64) -> &mut Self {
        self.input.opts.temp = Some(temp);
        self
    }

    pub fn set_tnom(&mut self, tnom: f64) -> &mut Self {
        self.input.opts.tnom = Some(tnom);
        self
    }

    #[inline]
    pub fn work_dir(&self) -> &Path {
        &self.input.work_dir
    }

    #[inline]
    pub fn inner(&self) -> &SimInput {
        &self.input
    }

    #[inline]
    pub fn into_inner(self) -> SimInput {
        self.input
    }
}

impl PostSimCtx {
    #[inline]
    pub fn new(output: SimOutput) -> Self {
        Self { output }
    }

    #[inline]
    pub fn output(&self) -> &SimOutput {
        &self.output
    }

    pub fn analysis(&self, idx: usize) -> Result<&AnalysisData> {
        self.output.analysis(idx)
    }

    pub fn ac(&self, idx: usize) -> Result<&AcData> {
        self.analysis(idx)?.try_ac()
    }

    pub fn dc(&self, idx: usize) -> Result<&DcData> {
        self.analysis(idx)?.try_dc()
    }

    pub fn tran(&self, idx: usize) -> Result<&TranData> {
        self.analysis(idx)?.try_tran()
    }
}
