//! Compiled equation handle for live previews in the browser.

use rootfind_core::equation_engine::Equation;
use rootfind_core::plot::{sample_plot, PlotSample};
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmEquation {
    equation: Equation,
}

#[wasm_bindgen]
impl WasmEquation {
    #[wasm_bindgen(constructor)]
    pub fn new(text: &str) -> Result<WasmEquation, JsValue> {
        console_error_panic_hook::set_once();
        let equation = Equation::compile(text).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmEquation { equation })
    }

    pub fn text(&self) -> String {
        self.equation.text().to_string()
    }

    pub fn evaluate(&self, x: f64) -> Result<f64, JsValue> {
        self.equation
            .evaluate(x)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn derivative(&self, x: f64) -> Result<f64, JsValue> {
        self.equation
            .derivative(x)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Returns `[{x, y}, ...]` over `[start, end]`, skipping undefined points.
    pub fn sample(&self, start: f64, end: f64, steps: u32) -> Result<JsValue, JsValue> {
        let samples = sample_plot(&self.equation, start, end, steps as usize);
        to_value(&samples).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

/// Checks that `text` compiles; returns the compile error message otherwise.
pub(crate) fn equation_error(text: &str) -> Option<String> {
    Equation::compile(text).err().map(|e| e.to_string())
}

pub(crate) fn plot_samples(
    text: &str,
    start: f64,
    end: f64,
    steps: usize,
) -> Result<Vec<PlotSample>, String> {
    let equation = Equation::compile(text).map_err(|e| e.to_string())?;
    Ok(sample_plot(&equation, start, end, steps))
}
