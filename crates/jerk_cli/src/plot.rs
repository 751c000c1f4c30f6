//! Rendering of the three trajectory plots.

use anyhow::{Context, Result};
use jerk_core::{Component, Trajectory};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImageFormat {
    Svg,
    Png,
}

impl ImageFormat {
    fn extension(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub out_dir: PathBuf,
    pub format: ImageFormat,
    /// Width and height in pixels.
    pub size: (u32, u32),
}

/// Labels for one component's plot.
#[derive(Debug, Clone, Copy)]
pub struct PlotSpec {
    pub component: Component,
    pub file_stem: &'static str,
    pub title: &'static str,
    pub y_label: &'static str,
}

pub const X_LABEL: &str = "Time(s)";

pub const PLOTS: [PlotSpec; 3] = [
    PlotSpec {
        component: Component::Position,
        file_stem: "position",
        title: "ODE solver Solution: Displacement",
        y_label: "Position(cm)",
    },
    PlotSpec {
        component: Component::Velocity,
        file_stem: "velocity",
        title: "ODE solver Solution: Velocity",
        y_label: "Velocity(cm/s)",
    },
    PlotSpec {
        component: Component::Acceleration,
        file_stem: "acceleration",
        title: "ODE solver Solution: Acceleration",
        y_label: "Acceleration(cm/s²)",
    },
];

/// Renders every plot in [`PLOTS`] into `config.out_dir`, returning the
/// written paths in order.
pub fn render_all(trajectory: &Trajectory, config: &PlotConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&config.out_dir).with_context(|| {
        format!(
            "failed to create plot directory {}",
            config.out_dir.display()
        )
    })?;

    PLOTS
        .iter()
        .map(|spec| {
            let path = config
                .out_dir
                .join(format!("{}.{}", spec.file_stem, config.format.extension()));
            render(trajectory, spec, &path, config)
                .with_context(|| format!("failed to render {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

fn render(
    trajectory: &Trajectory,
    spec: &PlotSpec,
    path: &Path,
    config: &PlotConfig,
) -> Result<()> {
    match config.format {
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, config.size).into_drawing_area();
            draw(root, trajectory, spec)
        }
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, config.size).into_drawing_area();
            draw(root, trajectory, spec)
        }
    }
}

fn draw<DB>(root: DrawingArea<DB, Shift>, trajectory: &Trajectory, spec: &PlotSpec) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (t_lo, t_hi) = time_bounds(trajectory.times()).context("trajectory has no samples")?;
    let (lo, hi) = trajectory
        .range(spec.component)
        .map(|(lo, hi)| padded(lo, hi))
        .context("trajectory has no samples")?;

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(spec.title, ("sans-serif", 24))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(t_lo..t_hi, lo..hi)?;

    chart
        .configure_mesh()
        .x_desc(X_LABEL)
        .y_desc(spec.y_label)
        .draw()?;
    chart.draw_series(LineSeries::new(
        trajectory.series(spec.component),
        BLUE.stroke_width(2),
    ))?;
    root.present()?;
    Ok(())
}

fn time_bounds(times: &[f64]) -> Option<(f64, f64)> {
    let (first, last) = (*times.first()?, *times.last()?);
    Some(if last > first {
        (first, last)
    } else {
        (first - 0.5, first + 0.5)
    })
}

/// Widens `[lo, hi]` by 5% on each side so the curve does not touch the
/// frame. A flat series gets a unit-sized band.
fn padded(lo: f64, hi: f64) -> (f64, f64) {
    let span = hi - lo;
    if span > 0.0 {
        (lo - 0.05 * span, hi + 0.05 * span)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}
