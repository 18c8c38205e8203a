use super::{opposite_signs, require_interval, Method, SolveResult, Stopwatch};
use crate::equation_engine::Equation;
use crate::error::RootFindingError;
use crate::recorder::IterationRecord;
use crate::traits::RootFinder;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphicalSettings {
    /// Distance between consecutive samples.
    pub step: f64,
    /// Number of trailing samples returned with the result.
    pub window: usize,
    /// Upper bound on the number of samples a scan may take.
    pub max_samples: usize,
}

impl Default for GraphicalSettings {
    fn default() -> Self {
        Self {
            step: 1e-5,
            window: 10,
            max_samples: 10_000_000,
        }
    }
}

impl GraphicalSettings {
    pub fn validate(&self) -> Result<(), RootFindingError> {
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(RootFindingError::invalid_input(format!(
                "step must be a positive number, got {}",
                self.step
            )));
        }
        if self.window == 0 {
            return Err(RootFindingError::invalid_input(
                "window must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Brute-force scan of `[xl, xr]` for the first sign change between
/// adjacent samples.
#[derive(Debug, Clone)]
pub struct GraphicalScan {
    equation: Equation,
    xl: f64,
    xr: f64,
    settings: GraphicalSettings,
}

impl GraphicalScan {
    pub fn new(
        equation: Equation,
        xl: f64,
        xr: f64,
        settings: GraphicalSettings,
    ) -> Result<Self, RootFindingError> {
        require_interval(xl, xr)?;
        settings.validate()?;

        let samples = sample_count(xl, xr, settings.step);
        if samples > settings.max_samples as f64 {
            return Err(RootFindingError::invalid_input(format!(
                "[{xl}, {xr}] with step {} needs {samples} samples, more than the limit of {}",
                settings.step, settings.max_samples
            )));
        }
        Ok(Self {
            equation,
            xl,
            xr,
            settings,
        })
    }

    fn sample_at(&self, k: usize) -> f64 {
        round_significant(self.xl + k as f64 * self.settings.step)
    }
}

/// Samples needed to cover `[xl, xr]`, counting both ends.
fn sample_count(xl: f64, xr: f64, step: f64) -> f64 {
    ((xr - xl) / step).floor() + 1.0
}

/// Rounds to 15 significant digits so accumulated steps land on tidy values
/// (`0.30000000000000004` becomes `0.3`).
///
/// Only scales by exact powers of ten (up to `1e22`), so the division or
/// multiplication back is correctly rounded. Magnitudes outside that range
/// are returned as is.
fn round_significant(x: f64) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let digits = 14 - x.abs().log10().floor() as i32;
    let rounded = match digits {
        0..=22 => {
            let scale = 10f64.powi(digits);
            (x * scale).round() / scale
        }
        -22..=-1 => {
            let scale = 10f64.powi(-digits);
            (x / scale).round() * scale
        }
        _ => x,
    };
    if rounded.is_finite() {
        rounded
    } else {
        x
    }
}

impl RootFinder for GraphicalScan {
    fn method(&self) -> Method {
        Method::Graphical
    }

    fn equation(&self) -> &Equation {
        &self.equation
    }

    fn solve(&self) -> Result<SolveResult, RootFindingError> {
        let stopwatch = Stopwatch::start();
        let window = self.settings.window;
        let mut trail: VecDeque<(usize, f64, f64)> = VecDeque::with_capacity(window);
        let mut previous: Option<(f64, f64)> = None;

        // One extra index so an endpoint lost to floor() rounding is still tried.
        let last = sample_count(self.xl, self.xr, self.settings.step) as usize;
        for k in 0..=last {
            let x = self.sample_at(k);
            if x > self.xr {
                break;
            }
            let fx = self.equation.eval_scalar(x);
            if !fx.is_finite() {
                previous = None;
                continue;
            }

            if trail.len() == window {
                trail.pop_front();
            }
            trail.push_back((k + 1, x, fx));

            if let Some((prev_x, prev_fx)) = previous {
                if prev_fx == 0.0 || fx == 0.0 || opposite_signs(prev_fx, fx) {
                    let root = if prev_fx.abs() < fx.abs() { prev_x } else { x };
                    let iterations = trail
                        .into_iter()
                        .enumerate()
                        .map(|(index, (sample, x, fx))| IterationRecord::Graphical {
                            iteration: index + 1,
                            sample,
                            x,
                            fx,
                        })
                        .collect();
                    return Ok(SolveResult {
                        root,
                        iterations,
                        plot_data: None,
                        execution_time_ms: stopwatch.elapsed_ms(),
                        converged: true,
                        warning: None,
                    });
                }
            }
            previous = Some((x, fx));
        }

        Err(RootFindingError::NotFound {
            xl: self.xl,
            xr: self.xr,
            step: self.settings.step,
        })
    }

    fn plot_range(&self, _root: f64) -> (f64, f64) {
        (self.xl, self.xr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::test_support::assert_err_contains;

    fn scan(text: &str, xl: f64, xr: f64, step: f64) -> GraphicalScan {
        let equation = Equation::compile(text).expect("equation should compile");
        let settings = GraphicalSettings {
            step,
            ..GraphicalSettings::default()
        };
        GraphicalScan::new(equation, xl, xr, settings).expect("scan should build")
    }

    #[test]
    fn finds_sign_change_near_two() {
        let result = scan("x^2 - 4", 0.0, 5.0, 0.01)
            .solve()
            .expect("scan should find a root");
        assert!(result.converged);
        assert!((result.root - 2.0).abs() < 0.01, "root {}", result.root);
        assert_eq!(result.iterations.len(), 10);
    }

    #[test]
    fn window_is_renumbered_with_global_ordinals() {
        let result = scan("x^2 - 4", 0.0, 5.0, 0.01)
            .solve()
            .expect("scan should find a root");
        for (index, record) in result.iterations.iter().enumerate() {
            let IterationRecord::Graphical { iteration, sample, x, .. } = *record else {
                panic!("unexpected record {record:?}");
            };
            assert_eq!(iteration, index + 1);
            assert!((x - (sample - 1) as f64 * 0.01).abs() < 1e-9);
        }
        assert_eq!(result.iterations.last().map(IterationRecord::estimate), Some(2.0));
    }

    #[test]
    fn samples_are_rounded() {
        assert_eq!(round_significant(0.1 + 0.2), 0.3);
        assert_eq!(round_significant(-1.0), -1.0);
        assert_eq!(round_significant(0.0), 0.0);
        assert!(round_significant(f64::NAN).is_nan());
        assert_eq!(round_significant(1e300), 1e300);
    }

    #[test]
    fn rounding_matches_decimal_formatting() {
        let formatted = |x: f64| -> f64 { format!("{x:.14e}").parse().expect("formatted float") };
        for k in -2000..2000 {
            let x = k as f64 * 0.01;
            assert_eq!(round_significant(x), formatted(x), "k = {k}");
            let x = -1.0 + k as f64 * 0.001;
            assert_eq!(round_significant(x), formatted(x), "k = {k}");
        }
        for x in [123456.78901234567, 9.999999999999999, 0.09999999999999999, 3.0e-7 + 1e-22] {
            assert_eq!(round_significant(x), formatted(x), "x = {x}");
        }
    }

    #[test]
    fn earlier_sample_wins_only_when_strictly_closer() {
        // f(0.9) = -0.1 and f(1.2) = 0.2: the earlier sample is closer.
        let result = scan("x - 1", 0.0, 2.0, 0.3)
            .solve()
            .expect("scan should find a root");
        assert!((result.root - 0.9).abs() < 1e-12);

        // f(1.5) = -0.5 and f(2.5) = 0.5 tie, so the later sample is chosen.
        let result = scan("x - 2", 0.5, 3.0, 1.0)
            .solve()
            .expect("scan should find a root");
        assert_eq!(result.root, 2.5);
    }

    #[test]
    fn short_scan_keeps_every_sample() {
        let result = scan("x - 0.22", 0.0, 1.0, 0.1)
            .solve()
            .expect("scan should find a root");
        assert_eq!(result.iterations.len(), 4);
        assert!((result.root - 0.2).abs() < 1e-12);
    }

    #[test]
    fn no_sign_change_is_not_found() {
        let result = scan("x^2 - 4", 3.0, 5.0, 0.01).solve();
        assert!(matches!(result, Err(RootFindingError::NotFound { .. })));
    }

    #[test]
    fn non_finite_samples_break_adjacency() {
        // 1/x flips sign across the pole at 0, which is not a root.
        let result = scan("1/x", -1.0, 1.0, 0.5).solve();
        assert!(matches!(result, Err(RootFindingError::NotFound { .. })));
    }

    #[test]
    fn rejects_oversized_scans_and_bad_steps() {
        let equation = Equation::compile("x").expect("equation should compile");
        let settings = GraphicalSettings {
            step: 1e-9,
            ..GraphicalSettings::default()
        };
        assert_err_contains(
            GraphicalScan::new(equation.clone(), 0.0, 100.0, settings),
            "more than the limit",
        );
        let settings = GraphicalSettings {
            step: 0.0,
            ..GraphicalSettings::default()
        };
        assert_err_contains(
            GraphicalScan::new(equation, 0.0, 1.0, settings),
            "step must be a positive number",
        );
    }
}
