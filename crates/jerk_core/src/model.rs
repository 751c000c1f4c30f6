//! The third-order linear equation `y''' = b·t − a·y'`.
//!
//! The system is usually described as a driven, damped oscillator, but note
//! that there is no term proportional to `y` itself: the only coupling is
//! through the velocity. The equation is integrated exactly as written.

use crate::traits::{DynamicalSystem, Scalar};
use serde::Serialize;

/// Number of state components: position, velocity, acceleration.
pub const STATE_DIM: usize = 3;

/// Coefficients of the equation. `a` multiplies the velocity, `b` the
/// forcing time term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JerkParams {
    pub a: f64,
    pub b: f64,
}

impl Default for JerkParams {
    fn default() -> Self {
        Self { a: 4.0, b: 1.0 }
    }
}

/// Maps `(y, y', y'')` at time `t` to `(y', y'', y''')`.
pub fn derivative<T: Scalar>(state: &[T; STATE_DIM], t: T, params: JerkParams) -> [T; STATE_DIM] {
    let a = T::lit(params.a);
    let b = T::lit(params.b);
    [state[1], state[2], b * t - a * state[1]]
}

/// The equation packaged as a [`DynamicalSystem`] so the generic steppers can
/// drive it.
#[derive(Debug, Clone, Copy, Default)]
pub struct JerkSystem {
    pub params: JerkParams,
}

impl JerkSystem {
    pub fn new(params: JerkParams) -> Self {
        Self { params }
    }
}

impl<T: Scalar> DynamicalSystem<T> for JerkSystem {
    fn dimension(&self) -> usize {
        STATE_DIM
    }

    fn apply(&self, t: T, x: &[T], out: &mut [T]) {
        let rates = derivative(&[x[0], x[1], x[2]], t, self.params);
        out[..STATE_DIM].copy_from_slice(&rates);
    }
}
