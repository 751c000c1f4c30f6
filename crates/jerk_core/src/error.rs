use thiserror::Error;

/// Reasons an integration run can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("time grid is invalid: {0}")]
    InvalidGrid(String),
    #[error("time grid must be non-decreasing, but t[{index}] = {next} follows {prev}")]
    NonMonotonicGrid { index: usize, prev: f64, next: f64 },
    #[error("initial state has {got} components, system expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("initial state component {index} is not finite ({value})")]
    NonFiniteInput { index: usize, value: f64 },
    #[error("integrator setting {name} must be positive and finite (got {value})")]
    InvalidSetting { name: &'static str, value: f64 },
    #[error("excess work: {steps} steps taken before reaching t = {target} (stuck at t = {t})")]
    TooMuchWork { steps: usize, t: f64, target: f64 },
    #[error("step size {h:e} underflowed at t = {t}; the problem may be stiff")]
    StepSizeUnderflow { t: f64, h: f64 },
    #[error("state became non-finite at t = {t}")]
    NonFiniteState { t: f64 },
}
