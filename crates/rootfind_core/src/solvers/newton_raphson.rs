use super::{require_finite, Method, SolveResult, SolveSettings, Stopwatch, DEGENERATE_THRESHOLD};
use crate::equation_engine::Equation;
use crate::error::RootFindingError;
use crate::recorder::{ErrorMetric, IterationRecord, IterationRecorder};
use crate::traits::RootFinder;

/// Where Newton-Raphson gets `f'(x)` from.
#[derive(Debug, Clone, Default)]
pub enum DerivativeSource {
    /// Forward-mode differentiation of `f` itself.
    #[default]
    Automatic,
    /// A separately compiled expression for `f'`.
    Expression(Equation),
}

impl DerivativeSource {
    /// Compiles `text` as an explicit derivative, named `f'` in error messages.
    pub fn expression(text: &str) -> Result<Self, RootFindingError> {
        Ok(Self::Expression(Equation::compile(text)?.named("f'")))
    }

    fn evaluate(&self, equation: &Equation, x: f64) -> Result<f64, RootFindingError> {
        match self {
            Self::Automatic => equation.derivative(x),
            Self::Expression(derivative) => derivative.evaluate(x),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewtonRaphson {
    equation: Equation,
    derivative: DerivativeSource,
    x0: f64,
    settings: SolveSettings,
}

impl NewtonRaphson {
    pub fn new(
        equation: Equation,
        x0: f64,
        settings: SolveSettings,
    ) -> Result<Self, RootFindingError> {
        require_finite("x0", x0)?;
        settings.validate()?;
        Ok(Self {
            equation,
            derivative: DerivativeSource::Automatic,
            x0,
            settings,
        })
    }

    pub fn with_derivative(mut self, derivative: DerivativeSource) -> Self {
        self.derivative = derivative;
        self
    }
}

impl RootFinder for NewtonRaphson {
    fn method(&self) -> Method {
        Method::NewtonRaphson
    }

    fn equation(&self) -> &Equation {
        &self.equation
    }

    fn solve(&self) -> Result<SolveResult, RootFindingError> {
        let stopwatch = Stopwatch::start();
        let mut xi = self.x0;
        let mut converged = false;
        let mut recorder = IterationRecorder::with_capacity(self.settings.max_iterations);

        while recorder.len() < self.settings.max_iterations {
            let iteration = recorder.next_iteration();
            let fxi = self.equation.evaluate(xi)?;
            let dfxi = self.derivative.evaluate(&self.equation, xi)?;
            if dfxi.abs() < DEGENERATE_THRESHOLD {
                return Err(RootFindingError::DegenerateCase {
                    method: Method::NewtonRaphson.name(),
                    iteration,
                    reason: format!("derivative f'({xi:.6}) = {dfxi:e} is too close to zero"),
                });
            }

            let xi_new = xi - fxi / dfxi;
            if !xi_new.is_finite() {
                return Err(RootFindingError::Evaluation {
                    function: "x_new".into(),
                    x: xi,
                    value: xi_new,
                });
            }
            let error = ErrorMetric::relative(iteration, xi_new, xi);
            recorder.record(IterationRecord::NewtonRaphson {
                iteration,
                xi,
                fxi,
                dfxi,
                xi_new,
                error,
            });
            xi = xi_new;

            if error.is_within(self.settings.tolerance) {
                converged = true;
                break;
            }
        }

        Ok(SolveResult::finish(
            Method::NewtonRaphson,
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
