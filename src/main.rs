mod api;
mod cli;
mod config;
mod db;
mod error;
mod models;
mod services;
mod utils;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{
    ExportFormat, GamePredictionFilter, GamePredictionInput, PlayerPredictionFilter, PlayerPredictionInput,
    PredictionKind,
};
use crate::services::{ExportRequest, PredictionStore};

#[derive(Parser)]
#[command(name = "pluto")]
#[command(about = "Append-only store for NBA game and player predictions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Overrides PORT from the environment
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create the prediction tables if they are missing
    InitDb,
    /// Drop and recreate every prediction table
    ResetDb {
        #[arg(long)]
        yes: bool,
    },
    /// Load a sample slate of predictions into an empty database
    Seed,
    /// Record a game winner prediction
    RecordGame {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        #[arg(long)]
        winner: String,
        #[arg(long)]
        home_pct: f64,
        #[arg(long)]
        away_pct: f64,
    },
    /// Record a player stat prediction
    RecordPlayer(RecordPlayerArgs),
    /// List stored predictions, oldest first
    List {
        /// game or player
        kind: PredictionKind,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Record the actual winner of a predicted game
    OutcomeGame {
        id: i64,
        #[arg(long)]
        winner: String,
    },
    /// Record the actual stat value for a player prediction
    OutcomePlayer {
        id: i64,
        #[arg(long)]
        value: f64,
    },
    /// Score predictions that have recorded outcomes
    Evaluate {
        /// game or player
        kind: PredictionKind,
        #[arg(long)]
        prediction_type: Option<String>,
    },
    /// Export predictions as CSV or JSON
    Export {
        /// game or player
        kind: PredictionKind,
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Args)]
struct RecordPlayerArgs {
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    player: String,
    #[arg(long)]
    team: String,
    #[arg(long)]
    opponent: String,
    /// points, rebounds, assists, ...
    #[arg(long = "type")]
    prediction_type: String,
    #[arg(long)]
    value: f64,
    #[arg(long)]
    low: Option<f64>,
    #[arg(long)]
    high: Option<f64>,
    #[arg(long)]
    confidence: Option<f64>,
    #[arg(long)]
    explanation: Option<String>,
    #[arg(long)]
    prop_line: Option<f64>,
    /// over or under
    #[arg(long)]
    prop_pick: Option<String>,
    #[arg(long)]
    prop_reason: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    prompt_version: Option<String>,
}

impl From<RecordPlayerArgs> for PlayerPredictionInput {
    fn from(args: RecordPlayerArgs) -> Self {
        Self {
            game_date: Some(args.date),
            player_name: Some(args.player),
            team: Some(args.team),
            opposing_team: Some(args.opponent),
            prediction_type: Some(args.prediction_type),
            predicted_value: Some(args.value),
            range_low: args.low,
            range_high: args.high,
            confidence: args.confidence,
            explanation: args.explanation,
            prop_line: args.prop_line,
            prop_pick: args.prop_pick,
            prop_reason: args.prop_reason,
            model_name: args.model,
            prompt_version: args.prompt_version,
        }
    }
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    game_date: Option<NaiveDate>,
    /// Game listings match home or away
    #[arg(long)]
    team: Option<String>,
    #[arg(long)]
    winner: Option<String>,
    #[arg(long)]
    player: Option<String>,
    #[arg(long)]
    opponent: Option<String>,
    #[arg(long = "type")]
    prediction_type: Option<String>,
    /// RFC 3339 timestamp, inclusive
    #[arg(long)]
    since: Option<DateTime<Utc>>,
    /// RFC 3339 timestamp, inclusive
    #[arg(long)]
    until: Option<DateTime<Utc>>,
    #[arg(short, long)]
    limit: Option<usize>,
}

impl FilterArgs {
    fn game_filter(&self) -> GamePredictionFilter {
        GamePredictionFilter {
            game_date: self.game_date,
            team: self.team.clone(),
            predicted_winner: self.winner.clone(),
            since: self.since,
            until: self.until,
            limit: self.limit,
        }
    }

    fn player_filter(&self) -> PlayerPredictionFilter {
        PlayerPredictionFilter {
            game_date: self.game_date,
            player_name: self.player.clone(),
            team: self.team.clone(),
            opposing_team: self.opponent.clone(),
            prediction_type: self.prediction_type.clone(),
            since: self.since,
            until: self.until,
            limit: self.limit,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();
    let config = Config::from_env();

    // RUST_LOG wins over LOG_LEVEL
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let cli = Cli::parse();

    let pool = db::create_pool(&config.database_url).await?;
    db::init_database_with_pool(&pool).await?;
    let store = PredictionStore::new(pool.clone());

    match cli.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(config.port);
            tracing::info!("Starting Pluto API server on port {}", port);
            api::serve(store, port).await?;
        }
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            cli::init_db(&pool).await?;
        }
        Some(Commands::ResetDb { yes }) => {
            cli::reset_db(&pool, yes).await?;
        }
        Some(Commands::Seed) => {
            cli::seed(&store).await?;
        }
        Some(Commands::RecordGame {
            date,
            home,
            away,
            winner,
            home_pct,
            away_pct,
        }) => {
            let input = GamePredictionInput {
                game_date: Some(date),
                home_team: Some(home),
                away_team: Some(away),
                predicted_winner: Some(winner),
                home_team_win_percentage: Some(home_pct),
                opposing_team_win_percentage: Some(away_pct),
            };
            cli::record_game(&store, input).await?;
        }
        Some(Commands::RecordPlayer(args)) => {
            cli::record_player(&store, args.into()).await?;
        }
        Some(Commands::List { kind, filters }) => match kind {
            PredictionKind::Game => cli::list_games(&store, &filters.game_filter()).await?,
            PredictionKind::Player => cli::list_players(&store, &filters.player_filter()).await?,
        },
        Some(Commands::OutcomeGame { id, winner }) => {
            cli::record_game_outcome(&store, id, winner).await?;
        }
        Some(Commands::OutcomePlayer { id, value }) => {
            cli::record_player_outcome(&store, id, value).await?;
        }
        Some(Commands::Evaluate { kind, prediction_type }) => match kind {
            PredictionKind::Game => cli::evaluate_games(&store).await?,
            PredictionKind::Player => cli::evaluate_players(&store, prediction_type.as_deref()).await?,
        },
        Some(Commands::Export {
            kind,
            format,
            out,
            filters,
        }) => {
            let request = ExportRequest {
                kind,
                format,
                game_filter: filters.game_filter(),
                player_filter: filters.player_filter(),
            };
            cli::export(&store, request, out).await?;
        }
        None => {
            // Default to serving
            tracing::info!("Starting Pluto API server on port {}", config.port);
            api::serve(store, config.port).await?;
        }
    }

    Ok(())
}
