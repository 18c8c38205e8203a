//! Error taxonomy shared by every root-finding method.

use crate::equation_engine::CompileError;
use thiserror::Error;

/// Fatal conditions that abort a solve. No partial result accompanies them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RootFindingError {
    /// Non-numeric or out-of-domain parameters; no iteration was attempted.
    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Invalid equation input \"{equation}\": {source}")]
    Compile {
        equation: String,
        #[source]
        source: CompileError,
    },

    #[error("{function}({x}) evaluated to a non-finite value ({value}). Check the equation.")]
    Evaluation { function: String, x: f64, value: f64 },

    /// The bracket endpoints do not straddle a sign change.
    #[error("f(xl) and f(xr) must have opposite signs: f({xl}) = {fxl}, f({xr}) = {fxr}")]
    Bracket { xl: f64, xr: f64, fxl: f64, fxr: f64 },

    /// A near-zero denominator or derivative at the given iteration.
    #[error("{method} stopped at iteration {iteration}: {reason}")]
    DegenerateCase {
        method: &'static str,
        iteration: usize,
        reason: String,
    },

    #[error("No sign change found on [{xl}, {xr}] with step {step}. Widen the interval or reduce the step.")]
    NotFound { xl: f64, xr: f64, step: f64 },
}

impl RootFindingError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InputValidation(message.into())
    }
}

/// Iteration cap reached before the tolerance was met.
///
/// Not fatal: the best estimate and full history are still returned and this
/// message is attached to the result.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{method} reached the iteration cap ({max_iterations}) without converging; last error {last_error}")]
pub struct NonConvergenceWarning {
    pub method: &'static str,
    pub max_iterations: usize,
    pub last_error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = RootFindingError::Bracket {
            xl: 3.0,
            xr: 5.0,
            fxl: 5.0,
            fxr: 21.0,
        };
        assert_eq!(
            err.to_string(),
            "f(xl) and f(xr) must have opposite signs: f(3) = 5, f(5) = 21"
        );

        let err = RootFindingError::Compile {
            equation: "x +".into(),
            source: CompileError::UnexpectedEnd,
        };
        assert_eq!(
            err.to_string(),
            "Invalid equation input \"x +\": unexpected end of equation"
        );
    }

    #[test]
    fn warning_names_method_and_cap() {
        let warning = NonConvergenceWarning {
            method: "Bisection",
            max_iterations: 3,
            last_error: "12.5%".into(),
        };
        let message = warning.to_string();
        assert!(message.contains("Bisection"));
        assert!(message.contains("(3)"));
        assert!(message.contains("12.5%"));
    }
}
