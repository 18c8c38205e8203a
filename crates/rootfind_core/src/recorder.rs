//! Per-iteration history shared by all methods.

use serde::{Serialize, Serializer};
use std::fmt;

/// Convergence metric of one iteration.
///
/// Serialized as `"N/A"` on the first iteration and as a plain number after.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorMetric {
    NotAvailable,
    /// Relative error between successive iterates, in percent.
    Percent(f64),
}

impl ErrorMetric {
    /// `|new - old| / |new| * 100`, or the sentinel on the first iteration.
    ///
    /// A zero `new` after a non-zero `old` counts as 100%; two zeros as 0%.
    pub fn relative(iteration: usize, new: f64, old: f64) -> Self {
        if iteration <= 1 {
            return Self::NotAvailable;
        }
        if new != 0.0 {
            Self::Percent(((new - old) / new).abs() * 100.0)
        } else if old != 0.0 {
            Self::Percent(100.0)
        } else {
            Self::Percent(0.0)
        }
    }

    /// Zero on later iterations, the sentinel on the first.
    pub fn exact(iteration: usize) -> Self {
        if iteration <= 1 {
            Self::NotAvailable
        } else {
            Self::Percent(0.0)
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Self::NotAvailable => None,
            Self::Percent(value) => Some(*value),
        }
    }

    pub fn is_within(&self, tolerance: f64) -> bool {
        self.percent().is_some_and(|value| value <= tolerance)
    }
}

impl fmt::Display for ErrorMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAvailable => f.write_str("N/A"),
            Self::Percent(value) => write!(f, "{value:.6}%"),
        }
    }
}

impl Serialize for ErrorMetric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::NotAvailable => serializer.serialize_str("N/A"),
            Self::Percent(value) => serializer.serialize_f64(*value),
        }
    }
}

/// Snapshot of one iteration, with the fields each method reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IterationRecord {
    Bisection {
        iteration: usize,
        xl: f64,
        xr: f64,
        xm: f64,
        fxm: f64,
        error: ErrorMetric,
    },
    FalsePosition {
        iteration: usize,
        xl: f64,
        xr: f64,
        x1: f64,
        fx1: f64,
        error: ErrorMetric,
    },
    NewtonRaphson {
        iteration: usize,
        xi: f64,
        fxi: f64,
        #[serde(rename = "fPrimeXi")]
        dfxi: f64,
        xi_new: f64,
        error: ErrorMetric,
    },
    Secant {
        iteration: usize,
        xi_minus_1: f64,
        xi: f64,
        f_xi_minus_1: f64,
        f_xi: f64,
        xi_plus_1: f64,
        error: ErrorMetric,
    },
    OnePoint {
        iteration: usize,
        xi: f64,
        xi_plus_1: f64,
        error: ErrorMetric,
    },
    Graphical {
        iteration: usize,
        /// 1-based position of the sample in the whole scan.
        sample: usize,
        x: f64,
        fx: f64,
    },
}

impl IterationRecord {
    pub fn iteration(&self) -> usize {
        match self {
            Self::Bisection { iteration, .. }
            | Self::FalsePosition { iteration, .. }
            | Self::NewtonRaphson { iteration, .. }
            | Self::Secant { iteration, .. }
            | Self::OnePoint { iteration, .. }
            | Self::Graphical { iteration, .. } => *iteration,
        }
    }

    /// The error metric, or `None` for records that carry no metric.
    pub fn error(&self) -> Option<ErrorMetric> {
        match self {
            Self::Bisection { error, .. }
            | Self::FalsePosition { error, .. }
            | Self::NewtonRaphson { error, .. }
            | Self::Secant { error, .. }
            | Self::OnePoint { error, .. } => Some(*error),
            Self::Graphical { .. } => None,
        }
    }

    /// The estimate this iteration produced.
    pub fn estimate(&self) -> f64 {
        match self {
            Self::Bisection { xm, .. } => *xm,
            Self::FalsePosition { x1, .. } => *x1,
            Self::NewtonRaphson { xi_new, .. } => *xi_new,
            Self::Secant { xi_plus_1, .. } => *xi_plus_1,
            Self::OnePoint { xi_plus_1, .. } => *xi_plus_1,
            Self::Graphical { x, .. } => *x,
        }
    }
}

/// Upper bound on records reserved up front; the cap itself may be far larger.
const MAX_RESERVED_RECORDS: usize = 1024;

/// Append-only, ordered iteration history for a single solve.
#[derive(Debug, Clone, Default)]
pub struct IterationRecorder {
    records: Vec<IterationRecord>,
}

impl IterationRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves room for `capacity` records, up to [`MAX_RESERVED_RECORDS`].
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity.min(MAX_RESERVED_RECORDS)),
        }
    }

    /// Index the next recorded iteration must carry.
    pub fn next_iteration(&self) -> usize {
        self.records.len() + 1
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&mut self, record: IterationRecord) {
        debug_assert_eq!(record.iteration(), self.next_iteration());
        self.records.push(record);
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.records.last()
    }

    pub fn last_error(&self) -> Option<ErrorMetric> {
        self.last().and_then(IterationRecord::error)
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<IterationRecord> {
        self.records
    }
}
