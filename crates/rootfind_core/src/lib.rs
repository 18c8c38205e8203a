pub mod api;
pub mod autodiff;
pub mod equation_engine;
pub mod error;
pub mod persistence;
pub mod plot;
pub mod recorder;
pub mod solvers;
/// The `rootfind_core` crate provides the numerical engine behind the rootfind
/// server and browser bridge. Equations are compiled once and evaluated either
/// on `f64` or on Dual numbers for exact derivatives.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `RootFinder` (the shared method contract).
/// - **Equation Engine**: A custom bytecode VM for evaluating user-defined equations efficiently.
/// - **Solvers**: Bisection, False Position, Newton-Raphson, Secant, One-Point iteration and a graphical scan.
/// - **Recorder / Plot**: Per-iteration history and function samples for charting.
/// - **Api / Persistence**: Request parsing shared by the transports, and the calculation log.
pub mod traits;

pub use error::RootFindingError;
pub use solvers::{Method, SolveResult, SolveSettings};
pub use traits::RootFinder;
