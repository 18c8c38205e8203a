use crate::equation_engine::Equation;
use crate::error::RootFindingError;
use crate::plot::{sample_plot_with, PlotSample, DEFAULT_PLOT_STEPS};
use crate::solvers::{Method, SolveResult};
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars by the equation VM.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Common shape of every root-finding method.
///
/// Implementors validate their inputs at construction, so a value of an
/// implementing type is always ready to `solve`. Solving never mutates the
/// finder: repeated calls own independent histories.
pub trait RootFinder: Send + Sync {
    fn method(&self) -> Method;

    /// The compiled function the method iterates on (`g` for one-point).
    fn equation(&self) -> &Equation;

    fn solve(&self) -> Result<SolveResult, RootFindingError>;

    /// Interval to plot once `root` is known.
    fn plot_range(&self, root: f64) -> (f64, f64);

    fn evaluate(&self, x: f64) -> Result<f64, RootFindingError> {
        self.equation().evaluate(x)
    }

    fn sample_plot(&self, start: f64, end: f64, steps: usize) -> Vec<PlotSample> {
        sample_plot_with(self.equation(), start, end, steps, |_, _| {})
    }

    /// Solves, then samples the function over [`RootFinder::plot_range`].
    /// Plot points that fail to evaluate are reported to `on_skip` and dropped.
    fn solve_with_plot(
        &self,
        on_skip: &mut dyn FnMut(f64, &RootFindingError),
    ) -> Result<SolveResult, RootFindingError> {
        let mut result = self.solve()?;
        let (start, end) = self.plot_range(result.root);
        result.plot_data = Some(sample_plot_with(
            self.equation(),
            start,
            end,
            DEFAULT_PLOT_STEPS,
            |x, err| on_skip(x, err),
        ));
        Ok(result)
    }
}
