#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use showerfit::config::ExperimentConfig;
use showerfit::driver;
use showerfit::shower::LabelPolicy;
use showerfit::shower::prepare::{TankSelection, prepare};
use showerfit::validate::report::{cross_validation_line, search_lines};

#[derive(Args)]
pub struct PrepareArgs {
    /// Tab-separated tank hits (run, event, energy, zenith, particle_type, lateral_distance, ...)
    #[arg(value_name = "TANK_SIGNALS")]
    pub tank_signals: PathBuf,

    /// Per-event shower records
    #[arg(long, default_value = "./data/NN_data.tsv")]
    pub output: PathBuf,

    /// Per-run averaged shower records
    #[arg(long, default_value = "./data/NN_data_avg.tsv")]
    pub averaged_output: PathBuf,

    /// Minimum tank distance from the shower axis, in metres
    #[arg(long, default_value = "400")]
    pub cut_distance: f64,
}

#[derive(Args)]
pub struct ExperimentArgs {
    /// Experiment configuration (.toml); defaults are used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Shower record file, overriding the configured path
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Number of cross-validation folds
    #[arg(long, value_name = "K")]
    pub folds: Option<usize>,

    /// Map unrecognised particle labels to iron instead of rejecting the file
    #[arg(long)]
    pub permissive_labels: bool,
}

impl ExperimentArgs {
    fn resolve(&self) -> Result<ExperimentConfig, Box<dyn std::error::Error>> {
        let mut config = ExperimentConfig::load_or_default(self.config.as_deref())?;
        if let Some(path) = &self.data {
            config.data.path = path.clone();
        }
        if let Some(folds) = self.folds {
            config.cross_validation.n_splits = folds;
        }
        if self.permissive_labels {
            config.data.label_policy = LabelPolicy::Permissive;
        }
        Ok(config)
    }
}

#[derive(Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,

    /// Sample grid points instead of evaluating the full cross product
    #[arg(long)]
    pub randomized: bool,

    /// Number of grid points to sample with --randomized
    #[arg(long, value_name = "N", requires = "randomized")]
    pub n_iter: Option<usize>,

    /// Worker threads (default: one per core)
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,
}

fn run_prepare(args: PrepareArgs) -> Result<(), Box<dyn std::error::Error>> {
    let selection = TankSelection {
        cut_distance: args.cut_distance,
        ..TankSelection::default()
    };
    println!("Reducing tank signals from: {}", args.tank_signals.display());
    let report = prepare(
        &args.tank_signals,
        &args.output,
        &args.averaged_output,
        &selection,
    )?;
    println!(
        "Reduced {} tank hits into {} showers across {} runs",
        report.hits, report.showers, report.runs
    );
    println!("Showers saved to: {}", args.output.display());
    println!("Run averages saved to: {}", args.averaged_output.display());
    Ok(())
}

fn run_evaluate(args: ExperimentArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.resolve()?;
    let dataset = driver::load_dataset(&config)?;
    println!(
        "Loaded {} showers, {} pass the cuts",
        dataset.loaded,
        dataset.len()
    );

    let cv = driver::evaluate_dataset(&dataset, &config)?;
    println!("{}", cross_validation_line(&cv));
    Ok(())
}

fn run_search(args: SearchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = args.experiment.resolve()?;
    if args.randomized {
        config.search.randomized = true;
    }
    if let Some(n_iter) = args.n_iter {
        config.search.n_iter = n_iter;
    }
    if args.jobs.is_some() {
        config.search.n_jobs = args.jobs;
    }

    let dataset = driver::load_dataset(&config)?;
    println!(
        "Loaded {} showers, {} pass the cuts",
        dataset.loaded,
        dataset.len()
    );

    let outcome = driver::search_dataset(&dataset, &config)?;
    for line in search_lines(&outcome) {
        println!("{line}");
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "showerfit",
    about = "Air-shower muon-signal regression with k-fold validation",
    long_about = "Filters cosmic-ray air-shower records by energy and zenith angle, \
                  trains a small feed-forward network to predict the muon signal, \
                  and evaluates it with k-fold cross-validation or a hyperparameter search."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce per-tank signals into shower record files
    #[command(about = "Reduce tank signals (outputs: NN_data.tsv, NN_data_avg.tsv)")]
    Prepare(PrepareArgs),

    /// Cross-validate the standardization + network pipeline
    #[command(about = "Cross-validate the regression pipeline")]
    Evaluate(ExperimentArgs),

    /// Search batch size and epoch count
    #[command(about = "Grid or randomized search over training hyperparameters")]
    Search(SearchArgs),

    /// Display version and build information
    #[command(about = "Display version and build information")]
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Prepare(args)) => run_prepare(args),
        Some(Commands::Evaluate(args)) => run_evaluate(args),
        Some(Commands::Search(args)) => run_search(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => {
            if let Err(e) = Cli::command().print_help() {
                eprintln!("Error: {e}");
            }
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Format seconds into a human-readable duration like "2.4 hours ago"
fn format_duration_ago(seconds: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    if seconds < MINUTE {
        format!("{} seconds ago", seconds)
    } else if seconds < HOUR {
        format!("{:.1} minutes ago", seconds as f64 / MINUTE as f64)
    } else if seconds < DAY {
        format!("{:.1} hours ago", seconds as f64 / HOUR as f64)
    } else {
        format!("{:.1} days ago", seconds as f64 / DAY as f64)
    }
}

fn print_version_info() {
    let version = env!("CARGO_PKG_VERSION");
    let build_timestamp: u64 = env!("SHOWERFIT_BUILD_TIMESTAMP").parse().unwrap_or(0);

    println!("showerfit {}", version);

    if build_timestamp > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if now > build_timestamp {
            println!("Built: {}", format_duration_ago(now - build_timestamp));
        } else {
            println!("Built: just now");
        }
    }
}
