//! Root-finding methods and the pieces they share: settings, results,
//! input validation and timing.

pub mod bisection;
pub mod false_position;
pub mod graphical;
pub mod newton_raphson;
pub mod one_point;
pub mod secant;

pub use bisection::Bisection;
pub use false_position::FalsePosition;
pub use graphical::{GraphicalScan, GraphicalSettings};
pub use newton_raphson::{DerivativeSource, NewtonRaphson};
pub use one_point::OnePointIteration;
pub use secant::Secant;

use crate::equation_engine::Equation;
use crate::error::{NonConvergenceWarning, RootFindingError};
use crate::plot::PlotSample;
use crate::recorder::{IterationRecord, IterationRecorder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Denominators and derivatives below this magnitude abort the solve.
pub const DEGENERATE_THRESHOLD: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    Bisection,
    FalsePosition,
    NewtonRaphson,
    Secant,
    OnePoint,
    Graphical,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Bisection,
        Method::FalsePosition,
        Method::NewtonRaphson,
        Method::Secant,
        Method::OnePoint,
        Method::Graphical,
    ];

    /// URL-friendly identifier, e.g. `false-position`.
    pub fn slug(self) -> &'static str {
        match self {
            Method::Bisection => "bisection",
            Method::FalsePosition => "false-position",
            Method::NewtonRaphson => "newton-raphson",
            Method::Secant => "secant",
            Method::OnePoint => "one-point",
            Method::Graphical => "graphical",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Bisection => "Bisection",
            Method::FalsePosition => "False Position",
            Method::NewtonRaphson => "Newton-Raphson",
            Method::Secant => "Secant",
            Method::OnePoint => "One-Point Iteration",
            Method::Graphical => "Graphical",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = RootFindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.slug() == s)
            .ok_or_else(|| RootFindingError::invalid_input(format!("unknown method \"{s}\"")))
    }
}

/// Stopping controls for the iterative methods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveSettings {
    /// Relative error between successive iterates, in percent.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SolveSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SolveSettings {
    pub fn new(tolerance: f64, max_iterations: usize) -> Result<Self, RootFindingError> {
        let settings = Self {
            tolerance,
            max_iterations,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), RootFindingError> {
        if self.tolerance.is_nan() {
            return Err(RootFindingError::invalid_input("error tolerance must be a number"));
        }
        if self.tolerance <= 0.0 {
            return Err(RootFindingError::invalid_input("error tolerance must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(RootFindingError::invalid_input(
                "max_iterations must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Outcome of a successful solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResult {
    pub root: f64,
    pub iterations: Vec<IterationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_data: Option<Vec<PlotSample>>,
    pub execution_time_ms: f64,
    /// `false` when the iteration cap was exhausted before the tolerance was met.
    pub converged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl SolveResult {
    /// Packages a finished loop. A non-converged run carries a
    /// [`NonConvergenceWarning`] message.
    pub(crate) fn finish(
        method: Method,
        root: f64,
        recorder: IterationRecorder,
        converged: bool,
        settings: &SolveSettings,
        stopwatch: &Stopwatch,
    ) -> Self {
        let warning = (!converged).then(|| {
            NonConvergenceWarning {
                method: method.name(),
                max_iterations: settings.max_iterations,
                last_error: recorder
                    .last_error()
                    .map_or_else(|| "N/A".to_string(), |error| error.to_string()),
            }
            .to_string()
        });
        Self {
            root,
            iterations: recorder.into_records(),
            plot_data: None,
            execution_time_ms: stopwatch.elapsed_ms(),
            converged,
            warning,
        }
    }
}

/// Monotonic timer reporting elapsed milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    start: std::time::Instant,
    #[cfg(target_arch = "wasm32")]
    start: f64,
}

impl Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn start() -> Self {
        Self {
            start: js_sys::Date::now(),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    #[cfg(target_arch = "wasm32")]
    pub fn elapsed_ms(&self) -> f64 {
        (js_sys::Date::now() - self.start).max(0.0)
    }
}

/// Rejects NaN and infinite parameters.
pub(crate) fn require_finite(name: &str, value: f64) -> Result<f64, RootFindingError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RootFindingError::invalid_input(format!(
            "{name} must be a finite number, got {value}"
        )))
    }
}

pub(crate) fn require_interval(xl: f64, xr: f64) -> Result<(), RootFindingError> {
    require_finite("xl", xl)?;
    require_finite("xr", xr)?;
    if xl >= xr {
        return Err(RootFindingError::invalid_input(
            "invalid interval: xl must be less than xr",
        ));
    }
    Ok(())
}

/// Evaluates both bracket endpoints and checks for a strict sign change.
pub(crate) fn bracket_values(
    equation: &Equation,
    xl: f64,
    xr: f64,
) -> Result<(f64, f64), RootFindingError> {
    let fxl = equation.eval_scalar(xl);
    let fxr = equation.eval_scalar(xr);
    if !fxl.is_finite() || !fxr.is_finite() || !opposite_signs(fxl, fxr) {
        return Err(RootFindingError::Bracket { xl, xr, fxl, fxr });
    }
    Ok((fxl, fxr))
}

/// True when `a` and `b` are non-zero with different signs.
pub(crate) fn opposite_signs(a: f64, b: f64) -> bool {
    (a < 0.0 && b > 0.0) || (a > 0.0 && b < 0.0)
}

/// Which side of a bracket an update point replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BracketUpdate {
    /// `f(point)` is exactly zero.
    Exact,
    ReplaceLower,
    ReplaceUpper,
}

impl BracketUpdate {
    /// Replaces whichever endpoint shares the sign of `f_point`, comparing
    /// against the lower endpoint's value `fxl`.
    pub(crate) fn decide(f_point: f64, fxl: f64) -> Self {
        if f_point == 0.0 || fxl == 0.0 {
            Self::Exact
        } else if opposite_signs(f_point, fxl) {
            Self::ReplaceUpper
        } else {
            Self::ReplaceLower
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::SolveResult;
    use crate::error::RootFindingError;
    use crate::recorder::ErrorMetric;

    pub const CUBIC: &str = "x^3 - x - 2";
    pub const CUBIC_ROOT: f64 = 1.521_379_706_804_568;

    pub fn assert_err_contains<T: std::fmt::Debug>(
        result: Result<T, RootFindingError>,
        needle: &str,
    ) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    /// Checks the history invariants every iterative method shares.
    pub fn assert_history_shape(result: &SolveResult, max_iterations: usize) {
        assert!(!result.iterations.is_empty());
        assert!(result.iterations.len() <= max_iterations);
        for (index, record) in result.iterations.iter().enumerate() {
            assert_eq!(record.iteration(), index + 1);
            let error = record.error().expect("iterative records carry an error metric");
            if index == 0 {
                assert_eq!(error, ErrorMetric::NotAvailable);
            } else {
                let value = error.percent().expect("later iterations carry a number");
                assert!(value >= 0.0);
            }
        }
        assert!(result.execution_time_ms >= 0.0);
    }
}
