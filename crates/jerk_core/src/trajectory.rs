use nalgebra::DMatrix;
use serde::Serialize;
use std::fmt;

/// Counters collected while integrating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationStats {
    /// Right-hand side evaluations.
    pub rhs_evals: usize,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
}

/// Column indices of the trajectory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Position = 0,
    Velocity = 1,
    Acceleration = 2,
}

impl Component {
    pub const ALL: [Component; 3] = [
        Component::Position,
        Component::Velocity,
        Component::Acceleration,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// The sampled solution: one row per grid time, one column per state
/// component.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Vec<f64>,
    table: DMatrix<f64>,
    pub stats: IntegrationStats,
}

impl Trajectory {
    /// Builds a trajectory from row-major state samples.
    ///
    /// `rows` must hold `times.len()` rows of `dim` values each.
    pub(crate) fn from_rows(
        times: Vec<f64>,
        dim: usize,
        rows: &[f64],
        stats: IntegrationStats,
    ) -> Self {
        debug_assert_eq!(rows.len(), times.len() * dim);
        let table = DMatrix::from_row_slice(times.len(), dim, rows);
        Self {
            times,
            table,
            stats,
        }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn table(&self) -> &DMatrix<f64> {
        &self.table
    }

    /// `(rows, columns)` of the table.
    pub fn shape(&self) -> (usize, usize) {
        self.table.shape()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// State vector at sample `i`.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.table.row(i).iter().copied().collect()
    }

    /// One component over the whole grid.
    pub fn column(&self, component: Component) -> Vec<f64> {
        self.table.column(component.index()).iter().copied().collect()
    }

    /// `(t, value)` pairs for one component, ready for plotting.
    pub fn series(&self, component: Component) -> impl Iterator<Item = (f64, f64)> + '_ {
        let j = component.index();
        self.times
            .iter()
            .enumerate()
            .map(move |(i, &t)| (t, self.table[(i, j)]))
    }

    /// Smallest and largest value of a component, or `None` for an empty
    /// trajectory.
    pub fn range(&self, component: Component) -> Option<(f64, f64)> {
        let column = self.table.column(component.index());
        column.iter().copied().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// Prints every row, one per line, bracketed like a matrix literal.
impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols) = self.table.shape();
        if rows == 0 {
            return write!(f, "[]");
        }
        for i in 0..rows {
            write!(f, "{}", if i == 0 { "[[" } else { " [" })?;
            for j in 0..cols {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:>15.8e}", self.table[(i, j)])?;
            }
            if i + 1 == rows {
                write!(f, "]]")?;
            } else {
                writeln!(f, "]")?;
            }
        }
        Ok(())
    }
}
