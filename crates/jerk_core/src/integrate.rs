//! Sampling a system's solution on a time grid.
//!
//! [`odeint`] advances the state from the first grid time and records it at
//! every grid time. The adaptive path never steps past the next grid time,
//! so each recorded row is an actual integrator node and no interpolation
//! is involved.

use crate::error::IntegrationError;
use crate::grid;
use crate::solvers::{Tsit5, RK4};
use crate::trajectory::{IntegrationStats, Trajectory};
use crate::traits::{DynamicalSystem, EmbeddedSteppable, Steppable};
use serde::Serialize;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;

/// Which stepper drives the integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Method {
    /// Adaptive Tsitouras 5(4) with error control.
    Tsit5,
    /// Classic RK4 with a fixed number of equal steps per grid interval.
    Rk4 { substeps: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntegratorSettings {
    pub method: Method,
    pub rtol: f64,
    pub atol: f64,
    /// Initial step; estimated from the problem when `None`.
    pub first_step: Option<f64>,
    pub max_step: Option<f64>,
    /// Attempted steps allowed between two consecutive grid times.
    pub max_steps_per_interval: usize,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            method: Method::Tsit5,
            rtol: 1.49012e-8,
            atol: 1.49012e-8,
            first_step: None,
            max_step: None,
            max_steps_per_interval: 500,
        }
    }
}

impl IntegratorSettings {
    fn validate(&self) -> Result<(), IntegrationError> {
        let positive = |name: &'static str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(IntegrationError::InvalidSetting { name, value })
            }
        };
        positive("rtol", self.rtol)?;
        positive("atol", self.atol)?;
        if let Some(h) = self.first_step {
            positive("first_step", h)?;
        }
        if let Some(h) = self.max_step {
            positive("max_step", h)?;
        }
        if self.max_steps_per_interval == 0 {
            return Err(IntegrationError::InvalidSetting {
                name: "max_steps_per_interval",
                value: 0.0,
            });
        }
        if let Method::Rk4 { substeps: 0 } = self.method {
            return Err(IntegrationError::InvalidSetting {
                name: "substeps",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Integrates `system` from `init` at `grid[0]` and samples it at every
/// grid time.
///
/// Row 0 of the result is `init` itself. The grid must be non-decreasing;
/// repeated times repeat the previous row.
pub fn odeint<S>(
    system: &S,
    init: &[f64],
    grid: &[f64],
    settings: &IntegratorSettings,
) -> Result<Trajectory, IntegrationError>
where
    S: DynamicalSystem<f64>,
{
    grid::validate(grid)?;
    settings.validate()?;

    let dim = system.dimension();
    if init.len() != dim {
        return Err(IntegrationError::DimensionMismatch {
            expected: dim,
            got: init.len(),
        });
    }
    if let Some((index, &value)) = init.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(IntegrationError::NonFiniteInput { index, value });
    }

    let mut rows = Vec::with_capacity(grid.len() * dim);
    rows.extend_from_slice(init);

    let mut stats = IntegrationStats::default();
    if grid.len() > 1 {
        let mut state = init.to_vec();
        match settings.method {
            Method::Tsit5 => {
                let mut adaptive = Adaptive::new(system, settings, dim);
                adaptive.run(grid, &mut state, &mut rows, &mut stats)?
            }
            Method::Rk4 { substeps } => {
                run_fixed(system, substeps, grid, &mut state, &mut rows, &mut stats)?
            }
        }
    }

    log::debug!(
        "odeint finished: {} samples, {} rhs evaluations, {} accepted / {} rejected steps",
        grid.len(),
        stats.rhs_evals,
        stats.accepted_steps,
        stats.rejected_steps
    );

    Ok(Trajectory::from_rows(grid.to_vec(), dim, &rows, stats))
}

fn run_fixed<S: DynamicalSystem<f64>>(
    system: &S,
    substeps: usize,
    grid: &[f64],
    state: &mut [f64],
    rows: &mut Vec<f64>,
    stats: &mut IntegrationStats,
) -> Result<(), IntegrationError> {
    let mut stepper = RK4::new(state.len());
    for pair in grid.windows(2) {
        let (start, target) = (pair[0], pair[1]);
        if target > start {
            let dt = (target - start) / substeps as f64;
            let mut t = start;
            for _ in 0..substeps {
                stepper.step(system, &mut t, state, dt);
            }
            stats.rhs_evals += 4 * substeps;
            stats.accepted_steps += substeps;
            if state.iter().any(|v| !v.is_finite()) {
                return Err(IntegrationError::NonFiniteState { t: target });
            }
        }
        rows.extend_from_slice(state);
    }
    Ok(())
}

/// Weighted RMS norm with per-component scale `atol + rtol * max(|a|, |b|)`.
fn error_norm(error: &[f64], a: &[f64], b: &[f64], rtol: f64, atol: f64) -> f64 {
    let sum: f64 = error
        .iter()
        .zip(a.iter().zip(b))
        .map(|(e, (x, y))| {
            let sk = atol + rtol * x.abs().max(y.abs());
            (e / sk) * (e / sk)
        })
        .sum();
    (sum / error.len() as f64).sqrt()
}

fn rms(dim: usize, value: impl Fn(usize) -> f64) -> f64 {
    ((0..dim).map(|i| value(i).powi(2)).sum::<f64>() / dim as f64).sqrt()
}

/// Smallest step that still moves `t` in floating point.
fn step_floor(t: f64, target: f64) -> f64 {
    16.0 * f64::EPSILON * t.abs().max(target.abs())
}

struct Adaptive<'a, S> {
    system: &'a S,
    settings: &'a IntegratorSettings,
    stepper: Tsit5<f64>,
    proposal: Vec<f64>,
    error: Vec<f64>,
}

impl<'a, S: DynamicalSystem<f64>> Adaptive<'a, S> {
    fn new(system: &'a S, settings: &'a IntegratorSettings, dim: usize) -> Self {
        Self {
            system,
            settings,
            stepper: Tsit5::new(dim),
            proposal: vec![0.0; dim],
            error: vec![0.0; dim],
        }
    }

    fn run(
        &mut self,
        grid: &[f64],
        state: &mut [f64],
        rows: &mut Vec<f64>,
        stats: &mut IntegrationStats,
    ) -> Result<(), IntegrationError> {
        let span = grid[grid.len() - 1] - grid[0];
        let mut t = grid[0];
        let mut h = match self.settings.first_step {
            Some(h) => h,
            None => self.initial_step(t, state, span, stats)?,
        };
        if let Some(max_step) = self.settings.max_step {
            h = h.min(max_step);
        }

        for &target in &grid[1..] {
            let mut attempts = 0usize;
            while t < target {
                if attempts >= self.settings.max_steps_per_interval {
                    return Err(IntegrationError::TooMuchWork {
                        steps: attempts,
                        t,
                        target,
                    });
                }
                attempts += 1;
                h = self.advance(&mut t, target, h, state, stats)?;
            }
            rows.extend_from_slice(state);
        }
        Ok(())
    }

    /// One attempted step towards `target`. Returns the next step size.
    fn advance(
        &mut self,
        t: &mut f64,
        target: f64,
        h: f64,
        state: &mut [f64],
        stats: &mut IntegrationStats,
    ) -> Result<f64, IntegrationError> {
        let remaining = target - *t;
        let limit = self.settings.max_step.unwrap_or(f64::INFINITY);
        let mut dt = h.min(limit);
        // Stretch steps that would stop just short of the grid time, as long
        // as the stretched step still respects `max_step`.
        let clipped = 1.01 * dt >= remaining && remaining <= limit;
        if clipped {
            dt = remaining;
        } else if dt < step_floor(*t, target) {
            // A clipped step lands on `target` exactly, so only free steps
            // can stall.
            return Err(IntegrationError::StepSizeUnderflow { t: *t, h: dt });
        }

        self.stepper.attempt(
            self.system,
            *t,
            state,
            dt,
            &mut self.proposal,
            &mut self.error,
        );
        stats.rhs_evals += 7;

        let err = error_norm(
            &self.error,
            state,
            &self.proposal,
            self.settings.rtol,
            self.settings.atol,
        );
        let exponent = -1.0 / (self.stepper.error_order() + 1) as f64;

        if err.is_finite() && err <= 1.0 {
            if self.proposal.iter().any(|v| !v.is_finite()) {
                return Err(IntegrationError::NonFiniteState { t: *t + dt });
            }
            *t = if clipped { target } else { *t + dt };
            state.copy_from_slice(&self.proposal);
            stats.accepted_steps += 1;

            let factor = if err == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * err.powf(exponent)).clamp(MIN_FACTOR, MAX_FACTOR)
            };
            // Clipping to the grid never shrinks the running step size.
            Ok(if clipped { h.max(dt * factor) } else { dt * factor })
        } else {
            stats.rejected_steps += 1;
            let factor = if err.is_finite() {
                (SAFETY * err.powf(exponent)).max(MIN_FACTOR)
            } else {
                MIN_FACTOR
            };
            log::trace!("rejected step at t = {}: dt = {:e}, err = {:e}", *t, dt, err);
            Ok(dt * factor.min(1.0))
        }
    }

    /// Hairer-Wanner starting step estimate.
    fn initial_step(
        &mut self,
        t0: f64,
        y0: &[f64],
        span: f64,
        stats: &mut IntegrationStats,
    ) -> Result<f64, IntegrationError> {
        let (rtol, atol) = (self.settings.rtol, self.settings.atol);
        let dim = y0.len();
        let scale: Vec<f64> = y0.iter().map(|y| atol + rtol * y.abs()).collect();

        let mut f0 = vec![0.0; dim];
        self.system.apply(t0, y0, &mut f0);
        stats.rhs_evals += 1;
        if f0.iter().any(|v| !v.is_finite()) {
            return Err(IntegrationError::NonFiniteState { t: t0 });
        }

        let d0 = rms(dim, |i| y0[i] / scale[i]);
        let d1 = rms(dim, |i| f0[i] / scale[i]);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        let h0 = h0.min(span);

        let y1: Vec<f64> = (0..dim).map(|i| y0[i] + h0 * f0[i]).collect();
        let mut f1 = vec![0.0; dim];
        self.system.apply(t0 + h0, &y1, &mut f1);
        stats.rhs_evals += 1;

        let d2 = rms(dim, |i| (f1[i] - f0[i]) / scale[i]) / h0;
        let order = (self.stepper.error_order() + 1) as f64;
        let d12 = d1.max(d2);
        let h1 = if !d12.is_finite() || d12 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d12).powf(1.0 / order)
        };

        let h = (100.0 * h0).min(h1).min(span);
        log::debug!("initial step estimate {h:e} (d0 = {d0:e}, d1 = {d1:e}, d2 = {d2:e})");
        Ok(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::linspace;
    use crate::model::{JerkParams, JerkSystem};

    /// Closed form of `y''' = b t - a y'` from `[0, 0, 1]` for `a > 0`.
    fn exact(t: f64, params: JerkParams) -> [f64; 3] {
        let JerkParams { a, b } = params;
        let omega = a.sqrt();
        let c = (1.0 - b / a) / omega;
        [
            c * (1.0 - (omega * t).cos()) / omega + b * t * t / (2.0 * a),
            c * (omega * t).sin() + b / a * t,
            c * omega * (omega * t).cos() + b / a,
        ]
    }

    fn default_run(settings: &IntegratorSettings) -> Trajectory {
        let grid = linspace(0.0, 10.0, 1000).expect("grid should build");
        odeint(&JerkSystem::default(), &[0.0, 0.0, 1.0], &grid, settings)
            .expect("integration should succeed")
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T, IntegrationError>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    struct Blowup;

    impl DynamicalSystem<f64> for Blowup {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, _x: &[f64], out: &mut [f64]) {
            out[0] = f64::NAN;
        }
    }

    #[test]
    fn default_run_has_expected_shape_and_first_row() {
        let traj = default_run(&IntegratorSettings::default());
        assert_eq!(traj.shape(), (1000, 3));
        assert_eq!(traj.row(0), vec![0.0, 0.0, 1.0]);
        assert_eq!(traj.times()[999], 10.0);
        assert!(traj.stats.accepted_steps >= 999);
    }

    #[test]
    fn default_run_matches_closed_form() {
        let traj = default_run(&IntegratorSettings::default());
        let params = JerkParams::default();
        for (i, &t) in traj.times().iter().enumerate() {
            let expected = exact(t, params);
            let row = traj.row(i);
            for j in 0..3 {
                assert!(
                    (row[j] - expected[j]).abs() < 1e-6,
                    "component {j} at t = {t}: got {}, expected {}",
                    row[j],
                    expected[j]
                );
            }
        }
    }

    #[test]
    fn rk4_agrees_with_tsit5() {
        let adaptive = default_run(&IntegratorSettings::default());
        let fixed = default_run(&IntegratorSettings {
            method: Method::Rk4 { substeps: 4 },
            ..IntegratorSettings::default()
        });
        let diff = (adaptive.table() - fixed.table()).amax();
        assert!(diff < 1e-6, "max difference {diff}");
        assert_eq!(fixed.stats.rhs_evals, 999 * 16);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let settings = IntegratorSettings::default();
        assert_eq!(default_run(&settings), default_run(&settings));
    }

    #[test]
    fn single_point_grid_returns_initial_state() {
        let traj = odeint(
            &JerkSystem::default(),
            &[0.0, 0.0, 1.0],
            &[0.0],
            &IntegratorSettings::default(),
        )
        .expect("single point should succeed");
        assert_eq!(traj.shape(), (1, 3));
        assert_eq!(traj.row(0), vec![0.0, 0.0, 1.0]);
        assert_eq!(traj.stats, IntegrationStats::default());
    }

    #[test]
    fn repeated_grid_times_repeat_rows() {
        let traj = odeint(
            &JerkSystem::default(),
            &[0.0, 0.0, 1.0],
            &[0.0, 0.0, 0.5, 0.5],
            &IntegratorSettings::default(),
        )
        .expect("integration should succeed");
        assert_eq!(traj.row(0), traj.row(1));
        assert_eq!(traj.row(2), traj.row(3));
        assert_ne!(traj.row(1), traj.row(2));
    }

    #[test]
    fn decreasing_grid_is_rejected() {
        let result = odeint(
            &JerkSystem::default(),
            &[0.0, 0.0, 1.0],
            &[0.0, 1.0, 0.5],
            &IntegratorSettings::default(),
        );
        assert!(matches!(
            result,
            Err(IntegrationError::NonMonotonicGrid { index: 2, .. })
        ));
    }

    #[test]
    fn rejects_invalid_inputs() {
        let system = JerkSystem::default();
        let grid = [0.0, 1.0];
        let settings = IntegratorSettings::default();
        assert_err_contains(odeint(&system, &[0.0, 1.0], &grid, &settings), "expects 3");
        assert_err_contains(
            odeint(&system, &[0.0, f64::NAN, 1.0], &grid, &settings),
            "component 1",
        );
        assert_err_contains(odeint(&system, &[0.0, 0.0, 1.0], &[], &settings), "empty");
        assert_err_contains(
            odeint(
                &system,
                &[0.0, 0.0, 1.0],
                &grid,
                &IntegratorSettings {
                    rtol: -1.0,
                    ..settings
                },
            ),
            "rtol",
        );
        assert_err_contains(
            odeint(
                &system,
                &[0.0, 0.0, 1.0],
                &grid,
                &IntegratorSettings {
                    method: Method::Rk4 { substeps: 0 },
                    ..settings
                },
            ),
            "substeps",
        );
    }

    #[test]
    fn step_budget_is_enforced_per_interval() {
        let settings = IntegratorSettings {
            first_step: Some(1e-9),
            max_steps_per_interval: 1,
            ..IntegratorSettings::default()
        };
        let result = odeint(&JerkSystem::default(), &[0.0, 0.0, 1.0], &[0.0, 1.0], &settings);
        assert!(matches!(
            result,
            Err(IntegrationError::TooMuchWork { steps: 1, .. })
        ));
    }

    #[test]
    fn max_step_bounds_accepted_steps() {
        let settings = IntegratorSettings {
            max_step: Some(0.05),
            ..IntegratorSettings::default()
        };
        let traj = odeint(&JerkSystem::default(), &[0.0, 0.0, 1.0], &[0.0, 1.0], &settings)
            .expect("integration should succeed");
        assert!(traj.stats.accepted_steps >= 20);
    }

    #[test]
    fn max_step_is_never_exceeded_when_landing_on_grid() {
        let settings = IntegratorSettings {
            rtol: 1e-3,
            atol: 1e-3,
            first_step: Some(1.0),
            max_step: Some(0.1),
            ..IntegratorSettings::default()
        };
        let traj = odeint(
            &JerkSystem::default(),
            &[0.0, 0.0, 1.0],
            &[0.0, 0.1005],
            &settings,
        )
        .expect("integration should succeed");
        // 0.1005 is within the 1% stretch of 0.1 but longer than max_step.
        assert_eq!(traj.stats.accepted_steps, 2);
        assert_eq!(traj.stats.rejected_steps, 0);
    }

    #[test]
    fn closely_spaced_grid_times_are_reached() {
        let grid: Vec<f64> = (0..5).map(|i| 1e6 + i as f64 * 1e-9).collect();
        let traj = odeint(
            &JerkSystem::default(),
            &[0.0, 0.0, 1.0],
            &grid,
            &IntegratorSettings::default(),
        )
        .expect("sub-ulp-scale spacing should integrate");
        assert_eq!(traj.shape(), (5, 3));
        assert!(traj.table().iter().all(|v| v.is_finite()));

        let grid = [0.0, 1.0, 1.0 + 2.0 * f64::EPSILON];
        let traj = odeint(
            &JerkSystem::default(),
            &[0.0, 0.0, 1.0],
            &grid,
            &IntegratorSettings::default(),
        )
        .expect("adjacent floating point times should integrate");
        let (last, before) = (traj.row(2), traj.row(1));
        for j in 0..3 {
            assert!((last[j] - before[j]).abs() < 1e-12);
        }
    }

    #[test]
    fn non_finite_rhs_is_reported() {
        assert_err_contains(
            odeint(&Blowup, &[1.0], &[0.0, 1.0], &IntegratorSettings::default()),
            "non-finite",
        );
        assert_err_contains(
            odeint(
                &Blowup,
                &[1.0],
                &[0.0, 1.0],
                &IntegratorSettings {
                    method: Method::Rk4 { substeps: 2 },
                    ..IntegratorSettings::default()
                },
            ),
            "non-finite",
        );
    }

    #[test]
    fn error_norm_weights_by_magnitude() {
        let norm = error_norm(&[1e-3, 0.0], &[1.0, 0.0], &[2.0, 0.0], 1e-3, 1e-12);
        // First component: 1e-3 / (1e-12 + 2e-3) ~= 0.5, second is zero.
        assert!((norm - (0.25f64 / 2.0).sqrt()).abs() < 1e-6);
    }
}
