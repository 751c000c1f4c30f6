//! Integrates `y''' = b·t − a·y'` with the fixed run constants, renders the
//! position, velocity and acceleration plots, then prints the full
//! trajectory table to stdout.

mod plot;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use jerk_core::{IntegratorSettings, Method, SimulationConfig};
use plot::{ImageFormat, PlotConfig};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    /// Adaptive Tsitouras 5(4).
    Tsit5,
    /// Fixed-step RK4.
    Rk4,
}

#[derive(Debug, Parser)]
#[command(name = "jerk", version, about = "Integrate and plot a third-order linear ODE")]
struct Cli {
    /// Directory the plot images are written to.
    #[arg(long, default_value = "plots")]
    out_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = ImageFormat::Svg)]
    format: ImageFormat,

    /// Image size as WIDTHxHEIGHT in pixels.
    #[arg(long, default_value = "800x600", value_parser = parse_size)]
    size: (u32, u32),

    /// Skip rendering and only print the table.
    #[arg(long)]
    no_plots: bool,

    #[arg(long, value_enum, default_value_t = MethodArg::Tsit5)]
    method: MethodArg,

    /// RK4 steps per grid interval.
    #[arg(long, default_value_t = 4)]
    substeps: usize,
}

impl Cli {
    fn settings(&self) -> IntegratorSettings {
        let method = match self.method {
            MethodArg::Tsit5 => Method::Tsit5,
            MethodArg::Rk4 => Method::Rk4 {
                substeps: self.substeps,
            },
        };
        IntegratorSettings {
            method,
            ..IntegratorSettings::default()
        }
    }

    fn plot_config(&self) -> PlotConfig {
        PlotConfig {
            out_dir: self.out_dir.clone(),
            format: self.format,
            size: self.size,
        }
    }
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("invalid dimension {s:?} in {value:?}"))
    };
    Ok((parse(w)?, parse(h)?))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = SimulationConfig::default();
    let settings = cli.settings();
    log::info!(
        "integrating y''' = {}·t − {}·y' from {:?} over [{}, {}] with {} samples ({:?})",
        config.params.b,
        config.params.a,
        config.initial_state,
        config.t_start,
        config.t_end,
        config.samples,
        settings.method
    );

    let trajectory = config.run(&settings).context("integration failed")?;
    let stats = trajectory.stats;
    log::info!(
        "integrated {} samples: {} rhs evaluations, {} accepted / {} rejected steps",
        trajectory.len(),
        stats.rhs_evals,
        stats.accepted_steps,
        stats.rejected_steps
    );

    if cli.no_plots {
        log::info!("plot rendering skipped");
    } else {
        for path in plot::render_all(&trajectory, &cli.plot_config())? {
            log::info!("wrote {}", path.display());
        }
    }

    println!("{trajectory}");
    Ok(())
}
