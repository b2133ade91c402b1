use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod csv_out;
mod error;
mod game_record;
mod harvest;
mod history;
mod match_data;
mod pipeline;
mod retry;
mod riot_api;
mod stats;
mod team_split;

use crate::config::{
    DEFAULT_CONFIG_PATH, DEFAULT_MAX_AGE_DAYS, DEFAULT_REGION, DEFAULT_SEARCH_DEPTH,
    QUEUE_NORMAL_DRAFT, QUEUE_RANKED_SOLO, Region, RiotId,
};
use crate::game_record::MatchOutcome;
use crate::harvest::HarvestArgs;
use crate::history::{HistoryWindow, recency_cutoff};
use crate::retry::{DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use crate::riot_api::{DEFAULT_MAX_REQS_PER_2MIN, MatchSource, RiotClient};

#[derive(Parser, Debug)]
#[command(
    name = "riot-match-stats",
    about = "Builds per-player form statistics for League of Legends matches",
    version
)]
struct Cli {
    /// TOML file holding `api_key`, used when RIOT_API_KEY is unset
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Platform routing value (euw1, na1, kr, ...)
    #[arg(long, global = true, default_value = DEFAULT_REGION)]
    region: String,

    /// Request budget per two minutes for the API key
    #[arg(long = "max-req-per-2min", global = true, default_value_t = DEFAULT_MAX_REQS_PER_2MIN)]
    max_req_per_2min: usize,

    /// Attempts per request before giving up
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enrich a list of match ids into a semicolon-separated training file
    Build {
        /// Text file with one match id per line
        #[arg(long)]
        input: PathBuf,

        /// Output CSV (default: output_<unix-seconds>.csv)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Past matches analyzed per player
        #[arg(long, default_value_t = DEFAULT_SEARCH_DEPTH)]
        search_depth: usize,

        /// Only past matches started within this many days count
        #[arg(long, default_value_t = DEFAULT_MAX_AGE_DAYS)]
        max_age_days: i64,

        #[arg(long, default_value_t = QUEUE_RANKED_SOLO)]
        queue: u32,
    },

    /// Collect match ids around a seed player and append them to a file
    Harvest {
        /// Seed Riot ID, gameName#tagLine
        #[arg(long)]
        seed: String,

        /// Recent matches listed per player
        #[arg(long, default_value_t = 1)]
        count: usize,

        #[arg(long, default_value_t = DEFAULT_MAX_AGE_DAYS)]
        max_age_days: i64,

        #[arg(long, default_value_t = QUEUE_NORMAL_DRAFT)]
        queue: u32,

        #[arg(long, default_value = "manymatches.txt")]
        output: PathBuf,
    },

    /// Split a ten-player training file into one row per team
    SplitTeams {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "new.csv")]
        output: PathBuf,
    },

    /// Parse a ten-player training file back and report its contents
    Inspect {
        #[arg(long)]
        input: PathBuf,
    },

    /// Print the PUUID of a Riot ID
    Puuid {
        #[arg(long = "game-name")]
        game_name: String,

        #[arg(long = "tag-line")]
        tag_line: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run(cli) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

fn connect(cli: &Cli) -> Result<RiotClient> {
    let api_key = config::load_api_key(&cli.config)?;
    let region = Region::parse(&cli.region)?;
    RiotClient::new(
        &api_key,
        region,
        RetryPolicy::new(cli.max_attempts),
        cli.max_req_per_2min,
    )
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Build {
            input,
            output,
            search_depth,
            max_age_days,
            queue,
        } => {
            let client = connect(&cli)?;
            let now = Utc::now();
            let window = HistoryWindow::new(*search_depth, *queue, *max_age_days, now);
            let output = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("output_{}.csv", now.timestamp())));

            let match_ids = pipeline::read_match_ids(input)?;
            info!("{} match ids read from {}", match_ids.len(), input.display());

            let summary = pipeline::build_training_data(&client, &window, &match_ids, &output)?;
            println!(
                "Wrote {} rows to {} ({} undetermined, {} failed)",
                summary.written,
                output.display(),
                summary.undetermined,
                summary.failed.len()
            );
            for id in &summary.failed {
                println!("failed: {}", id);
            }
        }
        Command::Harvest {
            seed,
            count,
            max_age_days,
            queue,
            output,
        } => {
            let client = connect(&cli)?;
            let args = HarvestArgs {
                seed: RiotId::parse(seed)?,
                matches_per_player: *count,
                queue: *queue,
                recency_cutoff: recency_cutoff(*max_age_days, Utc::now()),
                out_file: output.clone(),
            };

            let summary = harvest::run_harvest(&client, &args)?;
            println!(
                "Appended {} match ids from {} players to {}",
                summary.match_ids,
                summary.players,
                output.display()
            );
        }
        Command::SplitTeams { input, output } => {
            let summary = team_split::split_teams_file(input, output)?;
            println!(
                "Wrote {} team rows to {} ({} undetermined matches dropped)",
                summary.team_rows,
                output.display(),
                summary.dropped_undetermined
            );
        }
        Command::Inspect { input } => {
            let records = csv_out::read_game_records(input)?;
            let undetermined = records
                .iter()
                .filter(|r| r.outcome == MatchOutcome::Undetermined)
                .count();
            let without_history: usize = records
                .iter()
                .map(|r| r.players.iter().filter(|p| p.history.is_none()).count())
                .sum();
            println!(
                "{} rows, {} undetermined, {} player slots without history",
                records.len(),
                undetermined,
                without_history
            );
        }
        Command::Puuid {
            game_name,
            tag_line,
        } => {
            let client = connect(&cli)?;
            println!("{}", client.puuid_by_riot_id(game_name, tag_line)?);
        }
    }

    Ok(())
}
