use super::{
    bracket_values, require_interval, BracketUpdate, Method, SolveResult, SolveSettings, Stopwatch,
    DEGENERATE_THRESHOLD,
};
use crate::equation_engine::Equation;
use crate::error::RootFindingError;
use crate::recorder::{ErrorMetric, IterationRecord, IterationRecorder};
use crate::traits::RootFinder;

/// Regula falsi: the bracket is cut where the secant through both endpoints
/// crosses zero.
#[derive(Debug, Clone)]
pub struct FalsePosition {
    equation: Equation,
    xl: f64,
    xr: f64,
    settings: SolveSettings,
}

impl FalsePosition {
    pub fn new(
        equation: Equation,
        xl: f64,
        xr: f64,
        settings: SolveSettings,
    ) -> Result<Self, RootFindingError> {
        require_interval(xl, xr)?;
        settings.validate()?;
        Ok(Self {
            equation,
            xl,
            xr,
            settings,
        })
    }
}

impl RootFinder for FalsePosition {
    fn method(&self) -> Method {
        Method::FalsePosition
    }

    fn equation(&self) -> &Equation {
        &self.equation
    }

    fn solve(&self) -> Result<SolveResult, RootFindingError> {
        let stopwatch = Stopwatch::start();
        let (mut fxl, mut fxr) = bracket_values(&self.equation, self.xl, self.xr)?;

        let mut xl = self.xl;
        let mut xr = self.xr;
        let mut x1 = f64::NAN;
        let mut converged = false;
        let mut recorder = IterationRecorder::with_capacity(self.settings.max_iterations);

        while recorder.len() < self.settings.max_iterations {
            let iteration = recorder.next_iteration();
            let denominator = fxr - fxl;
            if denominator.abs() < DEGENERATE_THRESHOLD {
                return Err(RootFindingError::DegenerateCase {
                    method: Method::FalsePosition.name(),
                    iteration,
                    reason: format!(
                        "f(xr) - f(xl) = {denominator:e} is too close to zero to divide by"
                    ),
                });
            }

            let previous = x1;
            // Rounding can push the interpolated point just outside the bracket.
            x1 = ((xl * fxr - xr * fxl) / denominator).clamp(xl, xr);
            let fx1 = self.equation.evaluate(x1)?;

            let update = BracketUpdate::decide(fx1, fxl);
            let error = match update {
                BracketUpdate::Exact => ErrorMetric::exact(iteration),
                _ => ErrorMetric::relative(iteration, x1, previous),
            };
            recorder.record(IterationRecord::FalsePosition {
                iteration,
                xl,
                xr,
                x1,
                fx1,
                error,
            });

            match update {
                BracketUpdate::Exact => {
                    converged = true;
                    break;
                }
                BracketUpdate::ReplaceUpper => {
                    xr = x1;
                    fxr = fx1;
                }
                BracketUpdate::ReplaceLower => {
                    xl = x1;
                    fxl = fx1;
                }
            }
            if error.is_within(self.settings.tolerance) {
                converged = true;
                break;
            }
        }

        Ok(SolveResult::finish(
            Method::FalsePosition,
            x1,
            recorder,
            converged,
            &self.settings,
            &stopwatch,
        ))
    }

    fn plot_range(&self, _root: f64) -> (f64, f64) {
        (self.xl - 1.0, self.xr + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::test_support::{assert_err_contains, assert_history_shape, CUBIC, CUBIC_ROOT};

    fn false_position(text: &str, xl: f64, xr: f64, tolerance: f64) -> FalsePosition {
        let equation = Equation::compile(text).expect("equation should compile");
        let settings = SolveSettings::new(tolerance, 100).expect("settings should be valid");
        FalsePosition::new(equation, xl, xr, settings).expect("false position should build")
    }

    #[test]
    fn converges_on_cubic_with_shrinking_bracket() {
        let result = false_position(CUBIC, 1.0, 2.0, 0.0001)
            .solve()
            .expect("false position should solve");
        assert!(result.converged);
        assert!((result.root - CUBIC_ROOT).abs() < 1e-4, "root {}", result.root);
        assert_history_shape(&result, 100);

        let mut width = f64::INFINITY;
        for record in &result.iterations {
            let IterationRecord::FalsePosition { xl, xr, x1, .. } = *record else {
                panic!("unexpected record {record:?}");
            };
            assert!(xl < xr);
            assert!(xl >= 1.0 && xr <= 2.0);
            assert!(xl <= x1 && x1 <= xr);
            assert!(xr - xl <= width);
            width = xr - xl;
        }
    }

    #[test]
    fn first_step_matches_interpolation() {
        let result = false_position(CUBIC, 1.0, 2.0, 0.0001)
            .solve()
            .expect("false position should solve");
        // f(1) = -2, f(2) = 4, so x1 = (1*4 - 2*(-2)) / 6.
        let expected = 8.0 / 6.0;
        assert!((result.iterations[0].estimate() - expected).abs() < 1e-12);
    }

    #[test]
    fn linear_function_hits_root_exactly() {
        let result = false_position("2*x - 3", 0.0, 4.0, 0.0001)
            .solve()
            .expect("false position should solve");
        assert!(result.converged);
        assert_eq!(result.iterations.len(), 1);
        assert_eq!(result.root, 1.5);
    }

    #[test]
    fn same_sign_bracket_fails() {
        assert_err_contains(
            false_position("x^2 - 4", 3.0, 5.0, 0.01).solve(),
            "opposite signs",
        );
    }

    #[test]
    fn flat_secant_is_degenerate() {
        // f(xl) and f(xr) differ by less than the threshold.
        let result = false_position("1e-12 * (x - 0.5)", 0.0, 1.0, 0.01).solve();
        assert!(matches!(
            result,
            Err(RootFindingError::DegenerateCase { iteration: 1, .. })
        ));
    }
}
