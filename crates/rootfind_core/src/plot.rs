use crate::equation_engine::Equation;
use crate::error::RootFindingError;
use serde::{Deserialize, Serialize};

/// Default number of intervals sampled for a plot.
pub const DEFAULT_PLOT_STEPS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotSample {
    pub x: f64,
    pub y: f64,
}

/// Samples `equation` at `steps + 1` evenly spaced points on `[start, end]`.
///
/// Points whose value is non-finite are dropped.
pub fn sample_plot(equation: &Equation, start: f64, end: f64, steps: usize) -> Vec<PlotSample> {
    sample_plot_with(equation, start, end, steps, |_, _| {})
}

/// Like [`sample_plot`], reporting every dropped point to `on_skip`.
pub fn sample_plot_with<F>(
    equation: &Equation,
    start: f64,
    end: f64,
    steps: usize,
    mut on_skip: F,
) -> Vec<PlotSample>
where
    F: FnMut(f64, &RootFindingError),
{
    if !start.is_finite() || !end.is_finite() {
        return Vec::new();
    }
    let steps = steps.max(1);
    let step_size = (end - start) / steps as f64;

    let mut samples = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let x = start + i as f64 * step_size;
        match equation.evaluate(x) {
            Ok(y) => samples.push(PlotSample { x, y }),
            Err(err) => on_skip(x, &err),
        }
    }
    samples
}
