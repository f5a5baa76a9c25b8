//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs logging (except for the TUI, which owns the terminal)
//! - runs the fit pipeline
//! - prints reports/plots and writes optional exports

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, FitArgs, PlotArgs};
use crate::domain::RunConfig;
use crate::error::{AppError, EXIT_INSUFFICIENT_DATA};
use crate::fit::MIN_VARIANCE_SAMPLES;

pub mod pipeline;

/// Entry point for the `setpoint` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `setpoint` and `setpoint --preset bimodal` behave like `setpoint tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    if !matches!(cli.command, Command::Tui(_)) {
        init_tracing();
    }

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Trend(args) => handle_trend(args),
        Command::Plot(args) => handle_plot(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second install (e.g. from a test harness) is not an error for us.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.series, &run.selection)
    );

    if config.plot {
        let plot = crate::plot::render_density_plot(
            &run.density,
            &run.series.values,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    write_exports(&config, &run)
}

fn handle_trend(args: FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    if run.series.values.len() < MIN_VARIANCE_SAMPLES {
        return Err(AppError::new(
            EXIT_INSUFFICIENT_DATA,
            format!(
                "A trend needs at least {MIN_VARIANCE_SAMPLES} values, got {}.",
                run.series.values.len()
            ),
        ));
    }

    println!(
        "{}",
        crate::report::format_trend_table(&run.series.values, &run.trend)
    );

    if config.plot {
        let plot = crate::plot::render_trend_plot(
            &run.series.values,
            &run.trend,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    write_exports(&config, &run)
}

fn write_exports(config: &RunConfig, run: &pipeline::RunOutput) -> Result<(), AppError> {
    if let Some(path) = &config.export_trend {
        crate::io::write_trend_csv(path, &run.series.values, &run.trend)?;
        debug!(path = %path.display(), "wrote trend CSV");
    }
    if let Some(path) = &config.export_fit {
        let fit = crate::io::build_fit_file(&run.series.values, &run.selection, &run.density, &run.trend);
        crate::io::write_fit_json(path, &fit)?;
        debug!(path = %path.display(), "wrote fit JSON");
    }
    Ok(())
}

fn handle_tui(args: FitArgs) -> Result<(), AppError> {
    crate::tui::run(run_config_from_args(&args))
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let fit = crate::io::read_fit_json(&args.fit)?;
    if fit.values.is_empty() {
        return Err(AppError::new(
            EXIT_INSUFFICIENT_DATA,
            format!("Fit file '{}' contains no values.", args.fit.display()),
        ));
    }

    let plot = crate::plot::render_density_plot_from_fit_file(&fit, args.width, args.height);
    println!(
        "{} fit of {} values (k={}, {})",
        fit.tool,
        fit.values.len(),
        fit.best.model.component_count,
        fit.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("{plot}");
    Ok(())
}

pub fn run_config_from_args(args: &FitArgs) -> RunConfig {
    RunConfig {
        values: args.values.clone(),
        values_file: args.file.clone(),
        preset: args.preset,
        sample_count: args.count,
        seed: args.seed,
        excursion_prob: args.excursion_prob,
        collapse: args.collapse,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_fit: args.export_fit.clone(),
        export_trend: args.export_trend.clone(),
    }
}

/// Rewrite argv so `setpoint` defaults to `setpoint tui`.
///
/// Rules:
/// - `setpoint`                       -> `setpoint tui`
/// - `setpoint --preset bimodal ...`  -> `setpoint tui --preset bimodal ...`
/// - `setpoint --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "trend" | "plot" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_tui() {
        assert_eq!(rewrite_args(argv(&["setpoint"])), argv(&["setpoint", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["setpoint", "--seed", "7"])),
            argv(&["setpoint", "tui", "--seed", "7"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(argv(&["setpoint", "fit"])), argv(&["setpoint", "fit"]));
        assert_eq!(rewrite_args(argv(&["setpoint", "--help"])), argv(&["setpoint", "--help"]));
    }

    #[test]
    fn config_mirrors_flags() {
        let cli = crate::cli::Cli::parse_from(["setpoint", "fit", "--values", "6,7", "--no-plot", "-n", "10"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = run_config_from_args(&args);
        assert_eq!(config.values.as_deref(), Some("6,7"));
        assert_eq!(config.sample_count, 10);
        assert!(!config.plot);
    }
}
