pub mod config;
pub mod error;
pub mod grid;
pub mod integrate;
pub mod model;
pub mod solvers;
pub mod trajectory;
/// The `jerk_core` crate integrates the third-order equation `y''' = b·t − a·y'`
/// and exposes the sampled trajectory to front ends.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` (ODE right-hand sides), `Steppable` / `EmbeddedSteppable` (Solvers).
/// - **Model**: The derivative function and its parameter pair.
/// - **Solvers**: Explicit Runge-Kutta steppers (RK4, Tsit5 with an embedded error estimate).
/// - **Integrate**: `odeint`, adaptive sampling of a solution on a time grid.
pub mod traits;

pub use config::SimulationConfig;
pub use error::IntegrationError;
pub use integrate::{odeint, IntegratorSettings, Method};
pub use model::{derivative, JerkParams, JerkSystem};
pub use trajectory::{Component, IntegrationStats, Trajectory};
