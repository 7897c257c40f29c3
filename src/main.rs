use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use u_timetable::{CandidateGenerator, SchedulerConfig, SchedulingProblem, StrictScheduler};

#[derive(Parser)]
#[command(
    name = "u-timetable",
    about = "Strict-constraint class timetabling",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a timetable for a problem file.
    ///
    /// Candidates are generated from operating hours when the problem
    /// carries none.
    Solve {
        /// Problem file (JSON)
        #[arg(short, long)]
        input: PathBuf,
        /// Engine configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Attach per level, branch, coach, day and hour counts
        #[arg(long)]
        breakdown: bool,
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the generated candidate pool for a problem file
    Candidates {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "u_timetable=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            input,
            config,
            breakdown,
            output,
        } => solve(&input, config.as_deref(), breakdown, output.as_deref()),
        Commands::Candidates { input, output } => {
            let problem = load_problem(&input)?;
            let pool = CandidateGenerator::new(&problem).generate();
            info!(candidates = pool.len(), "candidate pool generated");
            emit(&pool, output.as_deref())
        }
    }
}

fn solve(
    input: &Path,
    config: Option<&Path>,
    breakdown: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let mut problem = load_problem(input)?;
    let mut config = match config {
        Some(path) => load_config(path)?,
        None => SchedulerConfig::default(),
    };
    if breakdown {
        config.search.detailed_breakdown = true;
    }

    if problem.candidates.is_empty() {
        let pool = CandidateGenerator::new(&problem).generate();
        info!(candidates = pool.len(), "no candidates supplied; generated pool");
        problem.candidates = pool;
    }

    let scheduler = StrictScheduler::new(problem, config)?;
    let outcome = scheduler.run();
    info!(
        selection = %outcome.chosen_by,
        iterations = outcome.iterations,
        coverage = outcome.result.coverage(),
        classes = outcome.result.schedule.len(),
        "run finished"
    );
    emit(&outcome.result, output)
}

fn load_problem(path: &Path) -> anyhow::Result<SchedulingProblem> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read problem file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse problem file {}", path.display()))
}

fn load_config(path: &Path) -> anyhow::Result<SchedulerConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    SchedulerConfig::from_toml_str(&text)
        .with_context(|| format!("invalid config file {}", path.display()))
}

fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
