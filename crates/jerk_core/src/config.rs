use crate::error::IntegrationError;
use crate::grid::linspace;
use crate::integrate::{odeint, IntegratorSettings};
use crate::model::{JerkParams, JerkSystem, STATE_DIM};
use crate::trajectory::Trajectory;
use serde::Serialize;

/// Everything that defines one run of the equation.
///
/// The defaults are the fixed run constants: `a = 4`, `b = 1`, starting from
/// rest with unit acceleration, sampled 1000 times over `[0, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationConfig {
    pub params: JerkParams,
    /// Position, velocity and acceleration at `t_start`.
    pub initial_state: [f64; STATE_DIM],
    pub t_start: f64,
    pub t_end: f64,
    pub samples: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            params: JerkParams::default(),
            initial_state: [0.0, 0.0, 1.0],
            t_start: 0.0,
            t_end: 10.0,
            samples: 1000,
        }
    }
}

impl SimulationConfig {
    pub fn time_grid(&self) -> Result<Vec<f64>, IntegrationError> {
        linspace(self.t_start, self.t_end, self.samples)
    }

    pub fn system(&self) -> JerkSystem {
        JerkSystem::new(self.params)
    }

    /// Builds the grid and integrates over it.
    pub fn run(&self, settings: &IntegratorSettings) -> Result<Trajectory, IntegrationError> {
        let grid = self.time_grid()?;
        log::debug!(
            "integrating with a = {}, b = {} from {:?}",
            self.params.a,
            self.params.b,
            self.initial_state
        );
        odeint(&self.system(), &self.initial_state, &grid, settings)
    }
}
