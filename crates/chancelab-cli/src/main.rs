mod commands;

use std::path::PathBuf;

use chancelab_core::IntentionTag;
use clap::{ArgAction, Parser, Subcommand};

use commands::Output;

#[derive(Parser)]
#[command(
    name = "chancelab",
    about = "Statistical analysis of chance-deviation trial streams",
    version = chancelab_core::VERSION
)]
struct Cli {
    /// Analysis parameters as a JSON file (missing fields take binomial defaults).
    #[arg(long, global = true)]
    params: Option<PathBuf>,

    /// Print pretty JSON instead of the text summary.
    #[arg(long, global = true)]
    json: bool,

    /// Also write the JSON result to this path.
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Z-score, effect size, cumulative deviation, network and device variance
    Analyze {
        /// Trial file: a JSON array of trials or {"trials": [...]}.
        input: PathBuf,

        /// Include every cumulative point in JSON output.
        #[arg(long)]
        points: bool,
    },

    /// Run the randomness validation battery
    Validate {
        /// Trial file: a JSON array of trials or {"trials": [...]}.
        input: PathBuf,
    },

    /// Compare a calibration run against the stored baseline
    Calibrate {
        /// Baseline calibration trials.
        #[arg(long)]
        baseline: PathBuf,

        /// Current calibration trials.
        #[arg(long)]
        current: PathBuf,
    },

    /// Fit a linear trend to windowed means and flag maintenance
    Drift {
        /// Trial file: a JSON array of trials or {"trials": [...]}.
        input: PathBuf,

        /// Window length in days.
        #[arg(long, default_value = "7")]
        period_days: f64,
    },

    /// Test intention-tagged trials against neutral control trials
    Compare {
        /// Trial file: a JSON array of trials or {"trials": [...]}.
        input: PathBuf,

        /// Intention group compared against neutral trials.
        #[arg(long, default_value = "positive")]
        intention_tag: IntentionTag,
    },

    /// Per-session summaries with fixed- and random-effects meta-analysis
    Sessions {
        /// Trial file: a JSON array of trials or {"trials": [...]}.
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), commands::CliError> {
    let params = commands::load_params(cli.params.as_deref())?;
    let out = Output {
        json: cli.json,
        path: cli.output,
    };

    match cli.command {
        Commands::Analyze { input, points } => {
            commands::analyze::run(&input, &params, points, &out)
        }
        Commands::Validate { input } => commands::validate::run(&input, &params, &out),
        Commands::Calibrate { baseline, current } => {
            commands::calibrate::run(&baseline, &current, &params, &out)
        }
        Commands::Drift { input, period_days } => {
            commands::drift::run(&input, period_days, &params, &out)
        }
        Commands::Compare {
            input,
            intention_tag,
        } => commands::compare::run(&input, intention_tag, &params, &out),
        Commands::Sessions { input } => commands::sessions::run(&input, &params, &out),
    }
}
