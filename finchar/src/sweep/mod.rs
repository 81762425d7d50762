//! Sequential parameter sweeps over an external simulator.
//!
//! A [`Sweep`] describes a fixed topology and turns each sweep point into a
//! fresh simulation request. The [`SweepRunner`] invokes the simulator once per
//! point, in order, and records a typed [`PointOutcome`] for every point it
//! attempts. What happens after a failed point is decided by the runner's
//! [`FailurePolicy`].

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempdir::TempDir;

use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorContext, ErrorSource, FincharError, Result};
use crate::log::{self, Log};
use crate::verification::simulation::context::{PostSimCtx, PreSimCtx};
use crate::verification::simulation::{SimOpts, Simulator};

#[cfg(test)]
mod tests;

/// A fixed circuit and measurement, evaluated at a sequence of points.
pub trait Sweep {
    /// One value (or tuple of values) of the independent variable(s).
    type Point: Clone + Debug;
    /// What [`Sweep::measure`] extracts from one successful simulation.
    type Output;

    /// A short name, used for logging and for the sweep's working directory.
    fn name(&self) -> ArcStr;

    /// Builds the simulation request for `point`.
    ///
    /// Implementations derive a new circuit for each point rather than
    /// modifying shared state.
    fn setup(&self, point: &Self::Point, ctx: &mut PreSimCtx) -> Result<()>;

    /// Extracts and post-processes the results of simulating `point`.
    fn measure(&self, point: &Self::Point, ctx: &PostSimCtx) -> Result<Self::Output>;
}

/// What to do after a sweep point fails.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and move on to the next point.
    #[default]
    Continue,
    /// Stop at the first failure. Remaining points are not simulated.
    #[serde(alias = "abort")]
    AbortOnFirst,
}

/// The result of simulating and measuring a single sweep point.
#[derive(Debug)]
pub struct PointOutcome<P, T> {
    /// Position of the point in the configured sequence.
    pub index: usize,
    pub point: P,
    pub result: Result<T>,
}

impl<P, T> PointOutcome<P, T> {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Every attempted point of a sweep, in sweep order.
#[derive(Debug)]
pub struct SweepOutcome<P, T> {
    name: ArcStr,
    outcomes: Vec<PointOutcome<P, T>>,
    total: usize,
}

impl<P, T> SweepOutcome<P, T> {
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    pub fn outcomes(&self) -> &[PointOutcome<P, T>] {
        &self.outcomes
    }

    /// The number of configured points, whether or not they were attempted.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn num_attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn num_succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn num_failed(&self) -> usize {
        self.num_attempted() - self.num_succeeded()
    }

    /// Whether some configured points were never attempted.
    pub fn aborted(&self) -> bool {
        self.num_attempted() < self.total
    }

    /// Successful points and their outputs, in sweep order.
    pub fn successes(&self) -> impl Iterator<Item = (&P, &T)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|v| (&o.point, v)))
    }

    /// Failed points and their errors, in sweep order.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &P, &FincharError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.index, &o.point, e)))
    }

    /// Outputs of the successful points, in sweep order.
    pub fn values(self) -> Vec<T> {
        self.unzip().1
    }

    /// Splits successful points into index-aligned inputs and outputs.
    pub fn unzip(self) -> (Vec<P>, Vec<T>) {
        self.outcomes
            .into_iter()
            .filter_map(|o| o.result.ok().map(|v| (o.point, v)))
            .unzip()
    }

    /// Escalates the first failure, if any.
    pub fn into_result(self) -> Result<Vec<(P, T)>> {
        let mut out = Vec::with_capacity(self.outcomes.len());
        for o in self.outcomes {
            out.push((o.point, o.result?));
        }
        Ok(out)
    }
}

impl<P, T> Log for SweepOutcome<P, T> {
    fn summary(&self) -> String {
        format!(
            "{}: {} of {} points succeeded ({} failed, {} not attempted)",
            self.name,
            self.num_succeeded(),
            self.total,
            self.num_failed(),
            self.total - self.num_attempted()
        )
    }
}

/// Runs [`Sweep`]s against a configured simulator.
pub struct SweepRunner {
    simulator: Arc<dyn Simulator>,
    work_dir: Option<PathBuf>,
    opts: SimOpts,
    policy: FailurePolicy,
}

#[derive(Default)]
pub struct SweepRunnerBuilder {
    simulator: Option<Arc<dyn Simulator>>,
    work_dir: Option<PathBuf>,
    opts: SimOpts,
    policy: FailurePolicy,
}

impl SweepRunner {
    #[inline]
    pub fn builder() -> SweepRunnerBuilder {
        SweepRunnerBuilder::default()
    }

    pub fn simulator(&self) -> &Arc<dyn Simulator> {
        &self.simulator
    }

    pub fn opts(&self) -> &SimOpts {
        &self.opts
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Simulates `sweep` at each of `points`, in order.
    ///
    /// Point failures are recorded in the returned [`SweepOutcome`], never
    /// returned as `Err`. An `Err` means the sweep could not start at all.
    pub fn run<S, I>(&self, sweep: &S, points: I) -> Result<SweepOutcome<S::Point, S::Output>>
    where
        S: Sweep,
        I: IntoIterator<Item = S::Point>,
    {
        let points: Vec<S::Point> = points.into_iter().collect();
        let name = sweep.name();

        let (root, _tmp) = match self.work_dir {
            Some(ref dir) => (dir.join(name.as_str()), None),
            None => {
                let tmp = TempDir::new("finchar")?;
                (tmp.path().join(name.as_str()), Some(tmp))
            }
        };

        log::info!(
            "{name}: sweeping {} points with {} in {root:?}",
            points.len(),
            self.simulator.name()
        );

        let total = points.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, point) in points.into_iter().enumerate() {
            let work_dir = root.join(format!("point_{index:03}"));
            log::debug!("{name}: simulating point {index} ({point:?})");

            let result = self.run_point(sweep, &point, &work_dir).map_err(|e| {
                e.with_context(ErrorContext::SweepPoint {
                    index,
                    point: arcstr::format!("{point:?}"),
                })
            });

            let failed = if let Err(ref e) = result {
                log::warn!("{name}: error at {point:?}: {}", e.source());
                true
            } else {
                false
            };

            outcomes.push(PointOutcome {
                index,
                point,
                result,
            });

            if failed && self.policy == FailurePolicy::AbortOnFirst {
                log::warn!("{name}: aborting after failure at point {index}");
                break;
            }
        }

        let outcome = SweepOutcome {
            name,
            outcomes,
            total,
        };
        outcome.log();
        Ok(outcome)
    }

    fn run_point<S>(&self, sweep: &S, point: &S::Point, work_dir: &Path) -> Result<S::Output>
    where
        S: Sweep,
    {
        crate::io::create_dir_all(work_dir)?;
        let mut ctx = PreSimCtx::new(work_dir, self.opts.clone());
        sweep.setup(point, &mut ctx)?;
        let output = self.simulator.simulate(ctx.into_inner())?;
        sweep.measure(point, &PostSimCtx::new(output))
    }
}

impl SweepRunnerBuilder {
    pub fn simulator<T>(&mut self, simulator: T) -> &mut Self
    where
        T: Simulator + 'static,
    {
        self.simulator = Some(Arc::new(simulator));
        self
    }

    /// Uses an already shared simulator, e.g. one selected at run time.
    pub fn shared_simulator(&mut self, simulator: Arc<dyn Simulator>) -> &mut Self {
        self.simulator = Some(simulator);
        self
    }

    /// Root directory for simulator inputs and outputs.
    ///
    /// Each sweep writes into `<work_dir>/<sweep name>/point_NNN`. Without a
    /// work directory, a temporary directory is used and removed afterwards.
    pub fn work_dir(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.work_dir = Some(path.into());
        self
    }

    pub fn opts(&mut self, opts: SimOpts) -> &mut Self {
        self.opts = opts;
        self
    }

    pub fn temp(&mut self, temp: f64) -> &mut Self {
        self.opts.temp = Some(temp);
        self
    }

    pub fn tnom(&mut self, tnom: f64) -> &mut Self {
        self.opts.tnom = Some(tnom);
        self
    }

    pub fn policy(&mut self, policy: FailurePolicy) -> &mut Self {
        self.policy = policy;
        self
    }

    pub fn build(&self) -> Result<SweepRunner> {
        Ok(SweepRunner {
            simulator: self
                .simulator
                .clone()
                .ok_or(ErrorSource::ToolNotSpecified)?,
            work_dir: self.work_dir.clone(),
            opts: self.opts.clone(),
            policy: self.policy,
        })
    }
}
