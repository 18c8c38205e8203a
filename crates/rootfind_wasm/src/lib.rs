//! Browser bindings for `rootfind_core`.
//!
//! Errors cross the boundary as plain JS strings.

mod equation;
mod solve;

pub use equation::WasmEquation;
pub use solve::{methods, solve};

use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

/// Returns `undefined` when `text` compiles, or the error message otherwise.
#[wasm_bindgen]
pub fn check_equation(text: &str) -> Option<String> {
    equation::equation_error(text)
}

/// Samples `text` on `[start, end]` into `[{x, y}, ...]` for charting.
#[wasm_bindgen]
pub fn sample_plot(text: &str, start: f64, end: f64, steps: u32) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let samples = equation::plot_samples(text, start, end, steps as usize)
        .map_err(|e| JsValue::from_str(&e))?;
    to_value(&samples).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_equation_passes_valid_input() {
        assert_eq!(check_equation("sin(x) - x/2"), None);
        assert!(check_equation("foo(x)").is_some());
    }

    #[test]
    fn equation_evaluates_natively() {
        let equation = WasmEquation::new("x^3 - x - 2")
            .ok()
            .expect("equation should compile");
        assert_eq!(equation.text(), "x^3 - x - 2");
        assert_eq!(equation.evaluate(2.0).ok(), Some(4.0));
        assert_eq!(equation.derivative(2.0).ok(), Some(11.0));
        assert_eq!(equation.evaluate(-1.0).ok(), Some(-2.0));
    }
}
