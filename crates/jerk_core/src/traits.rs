use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in the integrated system.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {
    /// Converts an `f64` literal into the scalar type.
    ///
    /// Every `Float` implementor can represent an `f64` literal (possibly
    /// rounded), so this never fails for the types we integrate with.
    fn lit(value: f64) -> Self {
        Self::from_f64(value).unwrap_or_else(Self::nan)
    }
}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Represents a first-order system of ordinary differential equations.
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// t: current time
    /// x: current state
    /// out: buffer to write dx/dt into
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// A trait for solvers that can step a system forward by a fixed amount.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// state: current state (updated after step)
    /// dt: step size
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}

/// Solvers with an embedded error estimate, used for adaptive step-size control.
pub trait EmbeddedSteppable<T: Scalar>: Steppable<T> {
    /// Order of the lower-order solution of the embedded pair. The step-size
    /// controller scales with `err^(-1 / (order + 1))`.
    fn error_order(&self) -> usize;

    /// Attempts a step of size `dt` from `(t, state)` without committing it.
    ///
    /// The candidate solution is written to `proposal` and the local error
    /// estimate (same units as the state) to `error`. The caller decides
    /// whether to accept the step.
    fn attempt(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        proposal: &mut [T],
        error: &mut [T],
    );
}
