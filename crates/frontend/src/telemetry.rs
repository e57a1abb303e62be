//! Observability boundaries.
//!
//! The pipeline never logs or measures directly. Diagnostics and warnings go
//! through a [`LoggingSink`], per-unit phase timings through a [`MetricsSink`];
//! both default to cheap implementations an embedder can swap out.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sable_toolchain::{Diagnostic, WorkQueue};

/// Pipeline phase a timing sample was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Parse,
    Attribute,
    Map,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Parse => "parse",
            Step::Attribute => "attribute",
            Step::Map => "map",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

/// One timed unit of pipeline work.
#[derive(Debug, Clone)]
pub struct TimingSample {
    pub step: Step,
    pub unit: String,
    pub outcome: Outcome,
    /// Tag naming the failure class when `outcome` is [`Outcome::Error`].
    pub error_kind: Option<String>,
    pub duration: Duration,
}

pub trait MetricsSink: Send + Sync {
    fn record(&self, sample: TimingSample);
}

pub trait LoggingSink: Send + Sync {
    /// A compiler diagnostic surfaced by the pipeline.
    fn diagnostic(&self, diag: &Diagnostic);

    /// An internal pipeline warning, optionally carrying its cause.
    fn warning(&self, message: &str, cause: Option<&dyn std::error::Error>);
}

/// Discards every sample.
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record(&self, _sample: TimingSample) {}
}

/// Routes everything through the `log` facade at warn level.
pub struct LogFacadeSink;

impl LoggingSink for LogFacadeSink {
    fn diagnostic(&self, diag: &Diagnostic) {
        log::warn!("{diag}");
    }

    fn warning(&self, message: &str, cause: Option<&dyn std::error::Error>) {
        match cause {
            Some(cause) => log::warn!("{message}: {cause}"),
            None => log::warn!("{message}"),
        }
    }
}

/// Captures samples in memory. Useful for testing an embedding.
#[derive(Default)]
pub struct RecordingMetrics {
    samples: Mutex<Vec<TimingSample>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<TimingSample> {
        self.samples.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn record(&self, sample: TimingSample) {
        self.samples.lock().unwrap().push(sample);
    }
}

/// Captures log lines in memory. Useful for testing an embedding.
#[derive(Default)]
pub struct RecordingLog {
    lines: Mutex<Vec<String>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl LoggingSink for RecordingLog {
    fn diagnostic(&self, diag: &Diagnostic) {
        self.lines.lock().unwrap().push(diag.to_string());
    }

    fn warning(&self, message: &str, cause: Option<&dyn std::error::Error>) {
        let line = match cause {
            Some(cause) => format!("{message}: {cause}"),
            None => message.to_owned(),
        };
        self.lines.lock().unwrap().push(line);
    }
}

/// Work queue that times each pulled unit.
///
/// A unit's clock starts when attribution pulls it and stops when the next
/// unit is pulled (or on [`TimedTodo::finish`]), so the sample covers exactly
/// the work done on that unit's behalf.
pub struct TimedTodo<'a> {
    inner: VecDeque<String>,
    metrics: &'a dyn MetricsSink,
    pending: Option<(String, Instant)>,
}

impl<'a> TimedTodo<'a> {
    pub fn new(inner: VecDeque<String>, metrics: &'a dyn MetricsSink) -> Self {
        TimedTodo {
            inner,
            metrics,
            pending: None,
        }
    }

    fn flush(&mut self) {
        if let Some((unit, start)) = self.pending.take() {
            self.metrics.record(TimingSample {
                step: Step::Attribute,
                unit,
                outcome: Outcome::Success,
                error_kind: None,
                duration: start.elapsed(),
            });
        }
    }

    /// Record the last in-flight sample. Dropping without calling this loses
    /// the final unit's timing.
    pub fn finish(mut self) {
        self.flush();
    }
}

impl WorkQueue for TimedTodo<'_> {
    fn pull(&mut self) -> Option<String> {
        self.flush();
        let next = self.inner.pop_front();
        if let Some(unit) = &next {
            self.pending = Some((unit.clone(), Instant::now()));
        }
        next
    }
}
