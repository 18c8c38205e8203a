//! One-shot solves driven by the same request bodies the HTTP API accepts.

use rootfind_core::api::{calculate, Calculation};
use rootfind_core::solvers::{Method, SolveResult, DEFAULT_MAX_ITERATIONS};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// Parses `method` and solves `body`. Skipped plot points are dropped silently;
/// the browser has no log to write them to.
pub(crate) fn solve_json(method: &str, body: serde_json::Value) -> Result<SolveResult, String> {
    let method = method.parse::<Method>().map_err(|e| e.to_string())?;
    calculate(method, body, DEFAULT_MAX_ITERATIONS, &mut |_, _| {})
        .map(|Calculation { result, .. }| result)
        .map_err(|e| e.to_string())
}

/// Solves a request object such as `{equation, xl, xr, error}` with the named
/// method (`"bisection"`, `"newton-raphson"`, ...).
#[wasm_bindgen]
pub fn solve(method: &str, request: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let body: serde_json::Value = from_value(request)
        .map_err(|e| JsValue::from_str(&format!("Invalid request: {}", e)))?;
    let result = solve_json(method, body).map_err(|e| JsValue::from_str(&e))?;
    to_value(&result).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Method slugs accepted by [`solve`].
#[wasm_bindgen]
pub fn methods() -> Vec<String> {
    Method::ALL
        .iter()
        .map(|method| method.slug().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn solves_by_slug() {
        let result = solve_json(
            "secant",
            json!({ "equation": "x^3 - x - 2", "x0": "1", "x1": "2", "error": "0.0001" }),
        )
        .expect("secant should solve");
        assert!(result.converged);
        assert!((result.root - 1.52138).abs() < 1e-4);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = solve_json("brent", json!({})).expect_err("unknown method should fail");
        assert!(err.contains("unknown method"));
    }

    #[test]
    fn lists_every_method() {
        let slugs = methods();
        assert_eq!(slugs.len(), 6);
        assert!(slugs.contains(&"one-point".to_string()));
    }
}
