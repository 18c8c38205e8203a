use super::{
    bracket_values, require_interval, BracketUpdate, Method, SolveResult, SolveSettings, Stopwatch,
};
use crate::equation_engine::Equation;
use crate::error::RootFindingError;
use crate::recorder::{ErrorMetric, IterationRecord, IterationRecorder};
use crate::traits::RootFinder;

/// Interval halving on a sign-changing bracket `[xl, xr]`.
#[derive(Debug, Clone)]
pub struct Bisection {
    equation: Equation,
    xl: f64,
    xr: f64,
    settings: SolveSettings,
}

impl Bisection {
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

impl RootFinder for Bisection {
    fn method(&self) -> Method {
        Method::Bisection
    }

    fn equation(&self) -> &Equation {
        &self.equation
    }

    fn solve(&self) -> Result<SolveResult, RootFindingError> {
        let stopwatch = Stopwatch::start();
        let (mut fxl, _) = bracket_values(&self.equation, self.xl, self.xr)?;

        let mut xl = self.xl;
        let mut xr = self.xr;
        let mut xm = f64::NAN;
        let mut converged = false;
        let mut recorder = IterationRecorder::with_capacity(self.settings.max_iterations);

        while recorder.len() < self.settings.max_iterations {
            let iteration = recorder.next_iteration();
            let previous = xm;
            xm = (xl + xr) / 2.0;
            let fxm = self.equation.evaluate(xm)?;

            let update = BracketUpdate::decide(fxm, fxl);
            let error = match update {
                BracketUpdate::Exact => ErrorMetric::exact(iteration),
                _ => ErrorMetric::relative(iteration, xm, previous),
            };
            recorder.record(IterationRecord::Bisection {
                iteration,
                xl,
                xr,
                xm,
                fxm,
                error,
            });

            match update {
                BracketUpdate::Exact => {
                    converged = true;
                    break;
                }
                BracketUpdate::ReplaceUpper => xr = xm,
                BracketUpdate::ReplaceLower => {
                    xl = xm;
                    fxl = fxm;
                }
            }
            if error.is_within(self.settings.tolerance) {
                converged = true;
                break;
            }
        }

        Ok(SolveResult::finish(
            Method::Bisection,
            xm,
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
