//! Request model shared by the HTTP and WASM transports.
//!
//! Request bodies are JSON objects whose numeric fields may arrive either as
//! JSON numbers or as numeric strings (form inputs). A request is parsed,
//! turned into the matching [`RootFinder`], solved, and paired with the
//! [`CalculationRecord`] that should be persisted.

use crate::equation_engine::Equation;
use crate::error::RootFindingError;
use crate::persistence::{timestamp_ms, CalculationRecord};
use crate::solvers::{
    Bisection, DerivativeSource, FalsePosition, GraphicalScan, GraphicalSettings, Method,
    NewtonRaphson, OnePointIteration, Secant, SolveResult, SolveSettings,
};
use crate::traits::RootFinder;
use serde::Deserialize;

/// A number sent as a JSON number or as a string such as `"1.5"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Number(f64),
    Text(String),
}

impl NumericField {
    pub fn parse(&self, name: &str) -> Result<f64, RootFindingError> {
        let value = match self {
            Self::Number(value) => *value,
            Self::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                RootFindingError::invalid_input(format!("{name} must be a number, got \"{text}\""))
            })?,
        };
        if value.is_nan() {
            return Err(RootFindingError::invalid_input(format!("{name} must be a number")));
        }
        Ok(value)
    }

    /// Parses a positive whole count such as an iteration cap.
    pub fn parse_count(&self, name: &str) -> Result<usize, RootFindingError> {
        let value = self.parse(name)?;
        if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
            return Err(RootFindingError::invalid_input(format!(
                "{name} must be a positive whole number, got {value}"
            )));
        }
        Ok(value as usize)
    }
}

/// Body for bisection and false position.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketRequest {
    pub equation: String,
    pub xl: NumericField,
    pub xr: NumericField,
    pub error: NumericField,
    #[serde(default)]
    pub max_iterations: Option<NumericField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewtonRequest {
    pub equation: String,
    pub x0: NumericField,
    pub error: NumericField,
    /// Explicit `f'(x)`; differentiated automatically when absent.
    #[serde(default)]
    pub derivative: Option<String>,
    #[serde(default)]
    pub max_iterations: Option<NumericField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecantRequest {
    pub equation: String,
    pub x0: NumericField,
    pub x1: NumericField,
    pub error: NumericField,
    #[serde(default)]
    pub max_iterations: Option<NumericField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnePointRequest {
    #[serde(alias = "equation")]
    pub g_equation: String,
    pub x0: NumericField,
    pub error: NumericField,
    #[serde(default)]
    pub max_iterations: Option<NumericField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphicalRequest {
    pub equation: String,
    #[serde(alias = "start")]
    pub xl: NumericField,
    #[serde(alias = "end")]
    pub xr: NumericField,
    #[serde(default, alias = "fineStep")]
    pub step: Option<NumericField>,
}

/// A parsed request, tagged by method.
#[derive(Debug, Clone)]
pub enum SolveRequest {
    Bisection(BracketRequest),
    FalsePosition(BracketRequest),
    NewtonRaphson(NewtonRequest),
    Secant(SecantRequest),
    OnePoint(OnePointRequest),
    Graphical(GraphicalRequest),
}

fn from_body<T: for<'de> Deserialize<'de>>(body: serde_json::Value) -> Result<T, RootFindingError> {
    serde_json::from_value(body).map_err(|err| RootFindingError::invalid_input(err.to_string()))
}

fn settings(
    error: &NumericField,
    max_iterations: Option<&NumericField>,
    default_max_iterations: usize,
) -> Result<SolveSettings, RootFindingError> {
    let tolerance = error.parse("error")?;
    let max_iterations = match max_iterations {
        Some(field) => field.parse_count("maxIterations")?,
        None => default_max_iterations,
    };
    SolveSettings::new(tolerance, max_iterations)
}

impl SolveRequest {
    pub fn from_json(method: Method, body: serde_json::Value) -> Result<Self, RootFindingError> {
        Ok(match method {
            Method::Bisection => Self::Bisection(from_body(body)?),
            Method::FalsePosition => Self::FalsePosition(from_body(body)?),
            Method::NewtonRaphson => Self::NewtonRaphson(from_body(body)?),
            Method::Secant => Self::Secant(from_body(body)?),
            Method::OnePoint => Self::OnePoint(from_body(body)?),
            Method::Graphical => Self::Graphical(from_body(body)?),
        })
    }

    pub fn method(&self) -> Method {
        match self {
            Self::Bisection(_) => Method::Bisection,
            Self::FalsePosition(_) => Method::FalsePosition,
            Self::NewtonRaphson(_) => Method::NewtonRaphson,
            Self::Secant(_) => Method::Secant,
            Self::OnePoint(_) => Method::OnePoint,
            Self::Graphical(_) => Method::Graphical,
        }
    }

    /// The equation text the method iterates on.
    pub fn equation(&self) -> &str {
        match self {
            Self::Bisection(req) | Self::FalsePosition(req) => &req.equation,
            Self::NewtonRaphson(req) => &req.equation,
            Self::Secant(req) => &req.equation,
            Self::OnePoint(req) => &req.g_equation,
            Self::Graphical(req) => &req.equation,
        }
    }

    /// Validates every field and builds the engine.
    ///
    /// `default_max_iterations` applies when the request leaves `maxIterations` out.
    pub fn build(
        &self,
        default_max_iterations: usize,
    ) -> Result<Box<dyn RootFinder>, RootFindingError> {
        let equation = Equation::compile(self.equation())?;
        Ok(match self {
            Self::Bisection(req) | Self::FalsePosition(req) => {
                let xl = req.xl.parse("xl")?;
                let xr = req.xr.parse("xr")?;
                let settings = settings(
                    &req.error,
                    req.max_iterations.as_ref(),
                    default_max_iterations,
                )?;
                if matches!(self, Self::Bisection(_)) {
                    Box::new(Bisection::new(equation, xl, xr, settings)?)
                } else {
                    Box::new(FalsePosition::new(equation, xl, xr, settings)?)
                }
            }
            Self::NewtonRaphson(req) => {
                let x0 = req.x0.parse("x0")?;
                let settings = settings(
                    &req.error,
                    req.max_iterations.as_ref(),
                    default_max_iterations,
                )?;
                let derivative = match req.derivative.as_deref().map(str::trim) {
                    Some(text) if !text.is_empty() => DerivativeSource::expression(text)?,
                    _ => DerivativeSource::Automatic,
                };
                Box::new(NewtonRaphson::new(equation, x0, settings)?.with_derivative(derivative))
            }
            Self::Secant(req) => {
                let x0 = req.x0.parse("x0")?;
                let x1 = req.x1.parse("x1")?;
                let settings = settings(
                    &req.error,
                    req.max_iterations.as_ref(),
                    default_max_iterations,
                )?;
                Box::new(Secant::new(equation, x0, x1, settings)?)
            }
            Self::OnePoint(req) => {
                let x0 = req.x0.parse("x0")?;
                let settings = settings(
                    &req.error,
                    req.max_iterations.as_ref(),
                    default_max_iterations,
                )?;
                Box::new(OnePointIteration::new(equation, x0, settings)?)
            }
            Self::Graphical(req) => {
                let xl = req.xl.parse("xl")?;
                let xr = req.xr.parse("xr")?;
                let mut settings = GraphicalSettings::default();
                if let Some(step) = &req.step {
                    settings.step = step.parse("step")?;
                }
                Box::new(GraphicalScan::new(equation, xl, xr, settings)?)
            }
        })
    }
}

/// A solved request and the record to persist for it.
#[derive(Debug, Clone)]
pub struct Calculation {
    pub result: SolveResult,
    pub record: CalculationRecord,
}

/// Parses `body` for `method`, solves with plot data attached, and builds the
/// persistence record. Plot points that could not be evaluated go to `on_skip`.
pub fn calculate(
    method: Method,
    body: serde_json::Value,
    default_max_iterations: usize,
    on_skip: &mut dyn FnMut(f64, &RootFindingError),
) -> Result<Calculation, RootFindingError> {
    let request = SolveRequest::from_json(method, body.clone())?;
    let finder = request.build(default_max_iterations)?;
    let result = finder.solve_with_plot(on_skip)?;
    let record = CalculationRecord {
        method,
        equation: request.equation().to_string(),
        input_params: body,
        calculated_root: result.root,
        execution_time_ms: result.execution_time_ms,
        timestamp: timestamp_ms(),
    };
    Ok(Calculation { result, record })
}
