use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use liftrs::config::AppConfig;
use liftrs::dataset::{ModelDataset, PhaseEncoder};
use liftrs::error::LiftRsError;
use liftrs::export::{self, csv as csv_export, json as json_export};
use liftrs::forecast::{ForecastReport, ScenarioForecaster};
use liftrs::import::ImportManager;
use liftrs::logging::{init_logging, LogFormat};
use liftrs::models::{filter_exercise, FatiguePhase, LiftDayRow, ScenarioMode, SetRecord};
use liftrs::pipeline::{FatiguePipeline, PipelineOutput};
use liftrs::validation::{missingness, phase_coverage};

/// liftrs - Strength Training Fatigue Analysis CLI
///
/// Turns a Strong app export into per-exercise stress, EWMA fatigue,
/// fatigue phases and scenario forecasts.
#[derive(Parser)]
#[command(name = "liftrs")]
#[command(version)]
#[command(about = "Strength training fatigue analysis CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format (pretty, json, compact)
    #[arg(long, value_name = "FORMAT", global = true)]
    log_format: Option<LogFormat>,

    /// Also write JSON logs to this file
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write every stage artifact
    Run {
        /// Strong CSV export or a directory of exports
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory for the stage tables
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Show fatigue phase runs for matching exercises
    Phases {
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Substring of the exercise name, e.g. "bench press"
        #[arg(short, long)]
        exercise: String,
    },

    /// Forecast EWMA fatigue under a training scenario
    Forecast {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        exercise: String,

        /// Scenario (maintain, reduce, deload)
        #[arg(short, long, default_value = "deload")]
        mode: ScenarioMode,

        /// Days to project (default from config)
        #[arg(long)]
        horizon: Option<u32>,

        /// Recovery threshold (default: quantile of the EWMA history)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build the regression feature matrix for one exercise
    Dataset {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        exercise: String,

        /// Phase left out of the dummy encoding
        #[arg(short, long, default_value = "accumulating")]
        baseline: String,

        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Report missing values and phase-run coverage
    Validate {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        exercise: String,
    },

    /// Manage the configuration file
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Tabled)]
struct PhaseRunDisplay {
    #[tabled(rename = "Exercise")]
    exercise: String,
    #[tabled(rename = "Run")]
    run_index: u32,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "End")]
    end: String,
    #[tabled(rename = "Days")]
    calendar_days: i64,
    #[tabled(rename = "Sessions")]
    sessions: u32,
    #[tabled(rename = "Mean EWMA")]
    mean_ewma: String,
}

#[derive(Tabled)]
struct ForecastDisplay {
    #[tabled(rename = "Day")]
    day_ahead: u32,
    #[tabled(rename = "Assumed Stress")]
    assumed_stress: String,
    #[tabled(rename = "Forecast EWMA")]
    forecasted_ewma: String,
}

#[derive(Tabled)]
struct MissingnessDisplay {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Missing %")]
    missing_pct: String,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        let message = match err.downcast_ref::<LiftRsError>() {
            Some(lift_err) => lift_err.user_message(),
            None => format!("{:#}", err),
        };
        eprintln!("{} {}", "Error:".red().bold(), message);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match (&cli.command, cli.config.as_deref()) {
        (Commands::Config { init: true, .. }, Some(path)) if !path.exists() => AppConfig::default(),
        (_, path) => AppConfig::load_or_default(path)?,
    };

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    if cli.log_file.is_some() {
        log_config.file_path = cli.log_file.clone();
    }
    init_logging(&log_config)?;

    match cli.command {
        Commands::Run { input, output_dir } => {
            let input = input.unwrap_or_else(|| config.paths.input.clone());
            let output_dir = output_dir.unwrap_or_else(|| config.paths.output_dir.clone());
            run_pipeline(&config, &input, &output_dir)
        }
        Commands::Phases { input, exercise } => {
            let (_, output) = load_and_enrich(&config, input)?;
            show_phases(&output, &exercise)
        }
        Commands::Forecast {
            input,
            exercise,
            mode,
            horizon,
            threshold,
            json,
            output,
        } => {
            let (_, pipeline_output) = load_and_enrich(&config, input)?;
            let horizon = horizon.unwrap_or(config.forecast.horizon);
            let reports = forecast_exercise(
                &config,
                &pipeline_output.lift_days,
                &exercise,
                mode,
                horizon,
                threshold,
            )?;

            if let Some(path) = &output {
                json_export::export_json(&reports, path)?;
                println!("{} {}", "✓ Wrote forecast to".green(), path.display());
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else if output.is_none() {
                show_forecasts(&reports);
            }
            Ok(())
        }
        Commands::Dataset {
            input,
            exercise,
            baseline,
            output,
        } => {
            let (_, pipeline_output) = load_and_enrich(&config, input)?;
            let encoder = PhaseEncoder::from_baseline_name(&baseline)?;
            let Some(dataset) = ModelDataset::build(&pipeline_output.lift_days, &exercise, &encoder)
            else {
                bail!("No lift days match exercise '{}'", exercise);
            };

            csv_export::export_model_dataset(&dataset, &output)?;
            println!(
                "{} {} rows ({} dropped) to {}",
                "✓ Wrote".green(),
                dataset.len(),
                dataset.dropped_rows,
                output.display()
            );
            println!("  Features: {}", dataset.columns.join(", "));
            println!("  Target:   {}", ModelDataset::TARGET);
            Ok(())
        }
        Commands::Validate { input, exercise } => {
            let (_, output) = load_and_enrich(&config, input)?;
            validate_exercise(&output, &exercise)
        }
        Commands::Config { init, show } => {
            manage_config(&config, cli.config.as_deref(), init, show)
        }
    }
}

fn load_and_enrich(
    config: &AppConfig,
    input: Option<PathBuf>,
) -> Result<(Vec<SetRecord>, PipelineOutput)> {
    let input = input.unwrap_or_else(|| config.paths.input.clone());
    let sets = ImportManager::new().import_path(&input)?;
    let pipeline = FatiguePipeline::with_config(config.pipeline.clone())?;
    let output = pipeline.run(&sets)?;
    Ok((sets, output))
}

fn run_pipeline(config: &AppConfig, input: &Path, output_dir: &Path) -> Result<()> {
    println!("{}", "Running fatigue pipeline...".green().bold());

    let (sets, output) = load_and_enrich(config, Some(input.to_path_buf()))?;
    let written = export::export_all(&sets, &output, &config.pipeline.stress_windows, output_dir)
        .with_context(|| format!("Failed to write artifacts to {}", output_dir.display()))?;

    let exercises = output
        .lift_days
        .chunk_by(|a, b| a.exercise == b.exercise)
        .count();

    println!("  Sets:        {}", sets.len());
    println!("  Exercises:   {}", exercises);
    println!("  Lift days:   {}", output.lift_days.len());
    println!("  Phase runs:  {}", output.phase_runs.len());
    println!("  Train dates: {}", output.global_daily.len());

    for phase in FatiguePhase::ALL {
        let count = output
            .lift_days
            .iter()
            .filter(|r| r.fatigue_phase() == Some(phase))
            .count();
        println!("  {:<12} {}", format!("{}:", phase), colorize_phase(phase, &count.to_string()));
    }

    println!("{}", "✓ Artifacts written".green());
    for path in [
        &written.sets,
        &written.lift_days,
        &written.phase_runs,
        &written.global_daily,
    ] {
        println!("  {}", path.display());
    }
    Ok(())
}

fn colorize_phase(phase: FatiguePhase, text: &str) -> ColoredString {
    match phase {
        FatiguePhase::Accumulating => text.red(),
        FatiguePhase::Recovering => text.green(),
        FatiguePhase::Stable => text.yellow(),
    }
}

fn show_phases(output: &PipelineOutput, pattern: &str) -> Result<()> {
    let needle = pattern.trim().to_lowercase();
    let runs: Vec<PhaseRunDisplay> = output
        .phase_runs
        .iter()
        .filter(|run| run.exercise.contains(&needle))
        .map(|run| PhaseRunDisplay {
            exercise: run.exercise.clone(),
            run_index: run.run_index,
            phase: run.phase.to_string(),
            start: run.start_date.to_string(),
            end: run.end_date.to_string(),
            calendar_days: run.calendar_days,
            sessions: run.session_count,
            mean_ewma: format!("{:.1}", run.mean_ewma_stress),
        })
        .collect();

    if runs.is_empty() {
        bail!("No lift days match exercise '{}'", pattern);
    }

    println!("{}", format!("Fatigue phases for '{}'", pattern).cyan().bold());
    println!("{}", Table::new(runs).with(Style::rounded()));
    Ok(())
}

/// Histories of each exercise matching `pattern`, in date order
fn exercise_histories<'a>(
    rows: &'a [LiftDayRow],
    pattern: &str,
) -> Option<Vec<Vec<&'a LiftDayRow>>> {
    let mut matched = filter_exercise(rows, pattern)?;
    matched.sort_by(|a, b| a.exercise.cmp(&b.exercise).then(a.date.cmp(&b.date)));
    Some(
        matched
            .chunk_by(|a, b| a.exercise == b.exercise)
            .map(<[&LiftDayRow]>::to_vec)
            .collect(),
    )
}

fn forecast_exercise(
    config: &AppConfig,
    rows: &[LiftDayRow],
    pattern: &str,
    mode: ScenarioMode,
    horizon: u32,
    threshold: Option<f64>,
) -> Result<Vec<ForecastReport>> {
    let Some(histories) = exercise_histories(rows, pattern) else {
        bail!("No lift days match exercise '{}'", pattern);
    };

    let forecaster = ScenarioForecaster::with_config(config.forecast.clone())?;
    let mut reports = Vec::new();

    for history in histories {
        let Some(forecast) = forecaster.forecast_history(&history, mode, horizon)? else {
            continue;
        };
        let threshold = threshold.or_else(|| forecaster.recovery_threshold(&history));
        reports.push(ForecastReport::new(
            &history[0].exercise,
            mode,
            threshold,
            forecast,
        ));
    }

    Ok(reports)
}

fn show_forecasts(reports: &[ForecastReport]) {
    for report in reports {
        println!(
            "{}",
            format!("{} forecast for '{}'", report.scenario, report.exercise)
                .cyan()
                .bold()
        );

        let rows: Vec<ForecastDisplay> = report
            .forecast
            .iter()
            .map(|row| ForecastDisplay {
                day_ahead: row.day_ahead,
                assumed_stress: format!("{:.1}", row.assumed_stress),
                forecasted_ewma: format!("{:.1}", row.forecasted_ewma),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));

        match (report.recovery_threshold, report.days_until_recovery) {
            (Some(threshold), Some(days)) => println!(
                "  Recovers below {:.1} in {} day(s)",
                threshold,
                days.to_string().green().bold()
            ),
            (Some(threshold), None) => println!(
                "  {} below {:.1} within {} day(s)",
                "Does not recover".yellow(),
                threshold,
                report.horizon
            ),
            (None, _) => println!("  {}", "No recovery threshold available".yellow()),
        }
        println!();
    }
}

fn validate_exercise(output: &PipelineOutput, pattern: &str) -> Result<()> {
    println!("{}", "Missing values".cyan().bold());
    let rows: Vec<MissingnessDisplay> = missingness(&output.lift_days)
        .into_iter()
        .map(|m| MissingnessDisplay {
            column: m.column,
            missing_pct: format!("{:.1}", m.missing_pct),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));

    let Some(reports) = phase_coverage(&output.lift_days, &output.phase_runs, pattern) else {
        bail!("No lift days match exercise '{}'", pattern);
    };

    println!("{}", format!("Phase coverage for '{}'", pattern).cyan().bold());
    let mut complete = true;
    for report in &reports {
        let status = if report.is_complete() {
            "✓".green()
        } else {
            complete = false;
            "✗".red()
        };
        println!(
            "  {} {}: {} runs, {}/{} lift days covered, {} double counted",
            status,
            report.exercise,
            report.runs.len(),
            report.covered,
            report.lift_days,
            report.double_counted
        );
    }

    if !complete {
        return Err(LiftRsError::Validation(format!(
            "phase runs do not cover every lift day of '{}'",
            pattern
        ))
        .into());
    }
    Ok(())
}

fn manage_config(config: &AppConfig, path: Option<&Path>, init: bool, show: bool) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_config_path);

    if init {
        if path.exists() {
            println!("{} {}", "Config already exists:".yellow(), path.display());
        } else {
            AppConfig::default().save_to_file(&path)?;
            println!("{} {}", "✓ Wrote default config to".green(), path.display());
        }
    }

    if show || !init {
        println!("{}", format!("# {}", path.display()).dimmed());
        println!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}
