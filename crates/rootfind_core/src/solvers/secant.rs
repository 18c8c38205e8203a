use super::{require_finite, Method, SolveResult, SolveSettings, Stopwatch, DEGENERATE_THRESHOLD};
use crate::equation_engine::Equation;
use crate::error::RootFindingError;
use crate::recorder::{ErrorMetric, IterationRecord, IterationRecorder};
use crate::traits::RootFinder;

/// Newton's update with the derivative replaced by the slope through the
/// two most recent points. No bracketing is required.
#[derive(Debug, Clone)]
pub struct Secant {
    equation: Equation,
    x0: f64,
    x1: f64,
    settings: SolveSettings,
}

impl Secant {
    pub fn new(
        equation: Equation,
        x0: f64,
        x1: f64,
        settings: SolveSettings,
    ) -> Result<Self, RootFindingError> {
        require_finite("x0", x0)?;
        require_finite("x1", x1)?;
        settings.validate()?;
        Ok(Self {
            equation,
            x0,
            x1,
            settings,
        })
    }
}

impl RootFinder for Secant {
    fn method(&self) -> Method {
        Method::Secant
    }

    fn equation(&self) -> &Equation {
        &self.equation
    }

    fn solve(&self) -> Result<SolveResult, RootFindingError> {
        let stopwatch = Stopwatch::start();
        let mut xi_minus_1 = self.x0;
        let mut xi = self.x1;
        let mut f_xi_minus_1 = self.equation.evaluate(xi_minus_1)?;
        let mut converged = false;
        let mut recorder = IterationRecorder::with_capacity(self.settings.max_iterations);

        while recorder.len() < self.settings.max_iterations {
            let iteration = recorder.next_iteration();
            let f_xi = self.equation.evaluate(xi)?;
            let denominator = f_xi - f_xi_minus_1;
            if denominator.abs() < DEGENERATE_THRESHOLD {
                return Err(RootFindingError::DegenerateCase {
                    method: Method::Secant.name(),
                    iteration,
                    reason: format!(
                        "f(xi) - f(xi-1) = {denominator:e} is too close to zero \
                         (f({xi:.6}) = {f_xi:e}, f({xi_minus_1:.6}) = {f_xi_minus_1:e})"
                    ),
                });
            }

            let xi_plus_1 = xi - f_xi * (xi - xi_minus_1) / denominator;
            if !xi_plus_1.is_finite() {
                return Err(RootFindingError::Evaluation {
                    function: "x_next".into(),
                    x: xi,
                    value: xi_plus_1,
                });
            }
            let error = ErrorMetric::relative(iteration, xi_plus_1, xi);
            recorder.record(IterationRecord::Secant {
                iteration,
                xi_minus_1,
                xi,
                f_xi_minus_1,
                f_xi,
                xi_plus_1,
                error,
            });

            xi_minus_1 = xi;
            f_xi_minus_1 = f_xi;
            xi = xi_plus_1;

            if error.is_within(self.settings.tolerance) {
                converged = true;
                break;
            }
        }

        Ok(SolveResult::finish(
            Method::Secant,
            xi,
            recorder,
            converged,
            &self.settings,
            &stopwatch,
        ))
    }

    fn plot_range(&self, root: f64) -> (f64, f64) {
        (
            self.x0.min(self.x1).min(root) - 1.0,
            self.x0.max(self.x1).max(root) + 1.0,
        )
    }
}
