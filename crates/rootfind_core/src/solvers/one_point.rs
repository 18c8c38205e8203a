use super::{require_finite, Method, SolveResult, SolveSettings, Stopwatch};
use crate::equation_engine::Equation;
use crate::error::RootFindingError;
use crate::recorder::{ErrorMetric, IterationRecord, IterationRecorder};
use crate::traits::RootFinder;

/// Fixed-point iteration `x_{i+1} = g(x_i)`.
///
/// The equation is `g`, not `f`: a root of `f` is found by rewriting
/// `f(x) = 0` as `x = g(x)`. Plots show `g`.
#[derive(Debug, Clone)]
pub struct OnePointIteration {
    g: Equation,
    x0: f64,
    settings: SolveSettings,
}

impl OnePointIteration {
    pub fn new(g: Equation, x0: f64, settings: SolveSettings) -> Result<Self, RootFindingError> {
        require_finite("x0", x0)?;
        settings.validate()?;
        Ok(Self {
            g: g.named("g"),
            x0,
            settings,
        })
    }
}

impl RootFinder for OnePointIteration {
    fn method(&self) -> Method {
        Method::OnePoint
    }

    fn equation(&self) -> &Equation {
        &self.g
    }

    fn solve(&self) -> Result<SolveResult, RootFindingError> {
        let stopwatch = Stopwatch::start();
        let mut xi = self.x0;
        let mut converged = false;
        let mut recorder = IterationRecorder::with_capacity(self.settings.max_iterations);

        while recorder.len() < self.settings.max_iterations {
            let iteration = recorder.next_iteration();
            let xi_plus_1 = self.g.evaluate(xi)?;
            let error = ErrorMetric::relative(iteration, xi_plus_1, xi);
            recorder.record(IterationRecord::OnePoint {
                iteration,
                xi,
                xi_plus_1,
                error,
            });
            xi = xi_plus_1;

            if error.is_within(self.settings.tolerance) {
                converged = true;
                break;
            }
        }

        Ok(SolveResult::finish(
            Method::OnePoint,
            xi,
            recorder,
            converged,
            &self.settings,
            &stopwatch,
        ))
    }

    fn plot_range(&self, root: f64) -> (f64, f64) {
        (self.x0.min(root) - 1.0, self.x0.max(root) + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::test_support::{assert_err_contains, assert_history_shape, CUBIC_ROOT};

    fn one_point(text: &str, x0: f64, tolerance: f64, cap: usize) -> OnePointIteration {
        let g = Equation::compile(text).expect("equation should compile");
        let settings = SolveSettings::new(tolerance, cap).expect("settings should be valid");
        OnePointIteration::new(g, x0, settings).expect("one-point should build")
    }

    #[test]
    fn converges_on_cube_root_rewrite() {
        // x^3 - x - 2 = 0 rewritten as x = (x + 2)^(1/3).
        let result = one_point("(x + 2)^(1/3)", 1.0, 0.0001, 100)
            .solve()
            .expect("one-point should solve");
        assert!(result.converged);
        assert!((result.root - CUBIC_ROOT).abs() < 1e-5, "root {}", result.root);
        assert_history_shape(&result, 100);
    }

    #[test]
    fn each_step_feeds_the_next() {
        let result = one_point("cos(x)", 1.0, 0.0001, 100)
            .solve()
            .expect("one-point should solve");
        for pair in result.iterations.windows(2) {
            let IterationRecord::OnePoint { xi, .. } = pair[1] else {
                panic!("unexpected record {:?}", pair[1]);
            };
            assert_eq!(pair[0].estimate(), xi);
        }
        assert!((result.root - 0.739_085_133).abs() < 1e-5);
    }

    #[test]
    fn divergence_is_reported() {
        // g(x) = x^3 - 2 pushes every iterate further from the fixed point.
        match one_point("x^3 - 2", 2.0, 0.0001, 100).solve() {
            Ok(result) => assert!(!result.converged),
            Err(err) => assert!(matches!(err, RootFindingError::Evaluation { .. })),
        }
    }

    #[test]
    fn cap_reached_returns_last_iterate() {
        let result = one_point("x + 1", 0.0, 0.0001, 4)
            .solve()
            .expect("one-point should solve");
        assert!(!result.converged);
        assert_eq!(result.root, 4.0);
        assert_eq!(result.iterations.len(), 4);
    }

    #[test]
    fn evaluation_errors_name_g() {
        assert_err_contains(one_point("sqrt(x)", -4.0, 0.0001, 100).solve(), "g(-4)");
    }
}
