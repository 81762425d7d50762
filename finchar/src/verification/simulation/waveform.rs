//! Threshold measurements on transient waveforms.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::RealSignal;

/// A waveform borrowed from index-aligned time and value slices.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Waveform<'a> {
    t: &'a [f64],
    x: &'a [f64],
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum EdgeDir {
    Falling,
    Rising,
}

/// A crossing of a single threshold, linearly interpolated between samples.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    t: f64,
    dir: EdgeDir,
}

/// A full swing between a low and a high threshold.
///
/// Starts at the last sample at the old level and ends at the first sample
/// at the new level.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    start_t: f64,
    end_t: f64,
    dir: EdgeDir,
}

impl<'a> Waveform<'a> {
    /// Returns `None` if `t` and `x` differ in length.
    pub fn new(t: &'a [f64], x: &'a [f64]) -> Option<Self> {
        (t.len() == x.len()).then_some(Self { t, x })
    }

    pub fn from_signal(time: &'a RealSignal, value: &'a RealSignal) -> Option<Self> {
        Self::new(&time.values, &value.values)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.t.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn last_x(&self) -> Option<f64> {
        self.x.last().copied()
    }

    /// Every crossing of `threshold`, in time order.
    pub fn edges(&self, threshold: f64) -> impl Iterator<Item = Edge> + 'a {
        self.edges_from(0, threshold)
    }

    /// The first crossing of `threshold` at or after time `t`.
    pub fn edge_after(&self, t: f64, threshold: f64) -> Option<Edge> {
        let start = index_at_or_before(self.t, t).unwrap_or(0);
        self.edges_from(start, threshold).find(|edge| edge.t >= t)
    }

    fn edges_from(&self, start: usize, threshold: f64) -> impl Iterator<Item = Edge> + 'a {
        let (t, x) = (self.t, self.x);
        (start..t.len().saturating_sub(1)).filter_map(move |i| {
            let (above0, above1) = (x[i] > threshold, x[i + 1] > threshold);
            if above0 == above1 {
                return None;
            }
            let frac = (threshold - x[i]) / (x[i + 1] - x[i]);
            Some(Edge {
                t: t[i] + frac * (t[i + 1] - t[i]),
                dir: if above1 {
                    EdgeDir::Rising
                } else {
                    EdgeDir::Falling
                },
            })
        })
    }

    /// Swings between `low` and `high`, ignoring excursions that return to
    /// the level they started from.
    ///
    /// Empty unless `high > low`.
    pub fn transitions(&self, low: f64, high: f64) -> Vec<Transition> {
        let mut out = Vec::new();
        if !(high > low) {
            return out;
        }
        // Level and time of the latest sample at or beyond a threshold.
        let mut settled: Option<(EdgeDir, f64)> = None;
        for (&t, &x) in self.t.iter().zip(self.x) {
            let level = if x >= high {
                EdgeDir::Rising
            } else if x <= low {
                EdgeDir::Falling
            } else {
                continue;
            };
            if let Some((prev, start_t)) = settled {
                if prev != level {
                    out.push(Transition {
                        start_t,
                        end_t: t,
                        dir: level,
                    });
                }
            }
            settled = Some((level, t));
        }
        out
    }
}

impl EdgeDir {
    #[inline]
    pub fn is_rising(&self) -> bool {
        matches!(self, EdgeDir::Rising)
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        matches!(self, EdgeDir::Falling)
    }
}

impl Edge {
    #[inline]
    pub fn t(&self) -> f64 {
        self.t
    }

    #[inline]
    pub fn dir(&self) -> EdgeDir {
        self.dir
    }
}

impl Transition {
    #[inline]
    pub fn dir(&self) -> EdgeDir {
        self.dir
    }

    #[inline]
    pub fn start_time(&self) -> f64 {
        self.start_t
    }

    #[inline]
    pub fn end_time(&self) -> f64 {
        self.end_t
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.end_t - self.start_t
    }
}

/// Index of the latest value at or before `target` in sorted `data`.
pub(crate) fn index_at_or_before(data: &[f64], target: f64) -> Option<usize> {
    data.partition_point(|x| x.total_cmp(&target) != Ordering::Greater)
        .checked_sub(1)
}
