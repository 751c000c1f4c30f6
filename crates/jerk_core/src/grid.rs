//! Time grid construction and validation.

use crate::error::IntegrationError;

/// `num` evenly spaced samples over `[start, stop]`, both ends included.
///
/// A single sample yields `[start]`. The last sample is pinned to `stop` so
/// the endpoint does not drift with rounding.
pub fn linspace(start: f64, stop: f64, num: usize) -> Result<Vec<f64>, IntegrationError> {
    if num == 0 {
        return Err(IntegrationError::InvalidGrid(
            "at least one sample is required".into(),
        ));
    }
    if !start.is_finite() || !stop.is_finite() {
        return Err(IntegrationError::InvalidGrid(format!(
            "bounds must be finite (got {start} to {stop})"
        )));
    }
    if num == 1 {
        return Ok(vec![start]);
    }

    let step = (stop - start) / (num - 1) as f64;
    let mut grid: Vec<f64> = (0..num).map(|i| start + step * i as f64).collect();
    grid[num - 1] = stop;
    Ok(grid)
}

/// Checks that the grid is non-empty, finite and non-decreasing.
pub fn validate(grid: &[f64]) -> Result<(), IntegrationError> {
    if grid.is_empty() {
        return Err(IntegrationError::InvalidGrid("grid is empty".into()));
    }
    if let Some((index, value)) = grid.iter().enumerate().find(|(_, t)| !t.is_finite()) {
        return Err(IntegrationError::InvalidGrid(format!(
            "t[{index}] = {value} is not finite"
        )));
    }
    for (index, pair) in grid.windows(2).enumerate() {
        if pair[1] < pair[0] {
            return Err(IntegrationError::NonMonotonicGrid {
                index: index + 1,
                prev: pair[0],
                next: pair[1],
            });
        }
    }
    log::debug!(
        "time grid ok: {} samples over [{}, {}]",
        grid.len(),
        grid[0],
        grid[grid.len() - 1]
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_both_endpoints() {
        let grid = linspace(0.0, 10.0, 1000).expect("grid should build");
        assert_eq!(grid.len(), 1000);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[999], 10.0);
        let spacing = 10.0 / 999.0;
        assert!((grid[1] - spacing).abs() < 1e-15);
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn linspace_single_sample_is_start() {
        assert_eq!(linspace(0.0, 10.0, 1).expect("grid should build"), vec![0.0]);
    }

    #[test]
    fn linspace_rejects_empty_and_non_finite() {
        assert!(matches!(
            linspace(0.0, 1.0, 0),
            Err(IntegrationError::InvalidGrid(_))
        ));
        assert!(matches!(
            linspace(0.0, f64::INFINITY, 5),
            Err(IntegrationError::InvalidGrid(_))
        ));
    }

    #[test]
    fn validate_accepts_repeated_samples() {
        assert!(validate(&[0.0, 0.5, 0.5, 1.0]).is_ok());
    }

    #[test]
    fn validate_reports_first_decrease() {
        let err = validate(&[0.0, 1.0, 0.5, 2.0]).expect_err("decreasing grid");
        assert_eq!(
            err,
            IntegrationError::NonMonotonicGrid {
                index: 2,
                prev: 1.0,
                next: 0.5
            }
        );
    }

    #[test]
    fn validate_rejects_nan() {
        let err = validate(&[0.0, f64::NAN]).expect_err("nan in grid");
        assert!(format!("{err}").contains("not finite"));
    }
}
