//! Yahoo Fantasy Basketball stats backfill
//!
//! One-off / occasional bulk loader: walks a league's players day by day
//! through a season and upserts every played game into `player_game_logs`.
//! Safe to re-run; dates already stored are skipped.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use yahoo_stats_backfill::config::Config;
use yahoo_stats_backfill::error::ConfigError;
use yahoo_stats_backfill::season::SeasonTable;
use yahoo_stats_backfill::signals::Interrupt;
use yahoo_stats_backfill::store::{GameLogStore, MemoryGameLogStore, PgGameLogStore};
use yahoo_stats_backfill::yahoo::YahooClient;
use yahoo_stats_backfill::{Backfiller, SeasonRunner};

#[derive(Parser)]
#[command(name = "stats-backfill")]
#[command(about = "Backfill Yahoo Fantasy per-game player stats into Postgres", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backfill one season of game logs for every player in a league
    Backfill {
        /// Yahoo league id (falls back to YAHOO_LEAGUE_ID)
        league_id: Option<String>,
        /// Season label, see `seasons`
        #[arg(default_value = "2024-25")]
        season: String,
        /// Only process the first N players of the league
        max_players: Option<usize>,
        /// Fetch everything but keep results in memory instead of Postgres
        #[arg(long)]
        dry_run: bool,
    },
    /// List the leagues of the authenticated Yahoo user
    Leagues,
    /// Show the known seasons and their date ranges
    Seasons,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("yahoo_stats_backfill=info".parse()?)
                .add_directive("stats_backfill=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Seasons => {
            for (label, window) in SeasonTable::builtin().iter() {
                println!("{}  {} to {}", label, window.start, window.end);
            }
            Ok(())
        }
        Commands::Leagues => {
            let config = load_config()?;
            list_leagues(&config).await
        }
        Commands::Backfill {
            league_id,
            season,
            max_players,
            dry_run,
        } => {
            let config = load_config()?;
            let league_id = league_id
                .filter(|id| !id.trim().is_empty())
                .or_else(|| config.league_id.clone())
                .ok_or(ConfigError::MissingLeagueId)?;
            if !dry_run {
                config.require_database_url()?;
            }
            backfill(&config, &league_id, &season, max_players, dry_run).await
        }
    }
}

fn load_config() -> Result<Config> {
    Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        anyhow::Error::new(e).context("missing or invalid configuration; check your .env file")
    })
}

async fn backfill(
    config: &Config,
    league_id: &str,
    season: &str,
    max_players: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    println!("\n============================================================");
    println!("Yahoo Fantasy Basketball stats backfill");
    println!("============================================================\n");

    // Before the database connect, whose retries can take half a minute
    let window = config.seasons.resolve(season)?;
    info!("Season {}: {} to {}", season, window.start, window.end);

    let league_key = config.league_key(league_id);
    let yahoo = YahooClient::new(&config.yahoo_access_token, config.http_timeout)
        .context("Failed to create HTTP client")?;

    let store: Box<dyn GameLogStore> = if dry_run {
        info!("Dry run: game logs are kept in memory only");
        Box::new(MemoryGameLogStore::new())
    } else {
        let url = config.require_database_url()?;
        Box::new(
            PgGameLogStore::connect(url, 5)
                .await
                .context("Failed to connect to database")?,
        )
    };

    info!("Initialized backfill for {}", league_key);

    let interrupt = Interrupt::listen();
    let backfiller = Backfiller::new(&yahoo, store.as_ref())
        .with_pacer(config.pacer())
        .with_policy(config.existing_dates_policy)
        .with_interrupt(interrupt);
    let runner = SeasonRunner::new(&yahoo, backfiller, &config.seasons);

    let totals = runner.run(&league_key, season, max_players).await?;
    if totals.interrupted {
        println!("Interrupted by user; everything saved so far is kept.");
    }

    Ok(())
}

async fn list_leagues(config: &Config) -> Result<()> {
    println!("\n============================================================");
    println!("Yahoo Fantasy Basketball - leagues");
    println!("============================================================\n");

    let yahoo = YahooClient::new(&config.yahoo_access_token, config.http_timeout)
        .context("Failed to create HTTP client")?;
    let leagues = yahoo
        .user_leagues(&config.game_key)
        .await
        .context("Failed to fetch user leagues")?;

    let Some(first) = leagues.first() else {
        bail!("No {} leagues found for this account", config.game_key);
    };

    println!("Found {} league(s):\n", leagues.len());
    for (i, league) in leagues.iter().enumerate() {
        println!("[{}] {}", i + 1, league.name);
        println!("    League Key: {}", league.league_key);
        println!("    League ID: {}", league.league_id);
        match league.num_teams {
            Some(n) => println!("    Teams: {}", n),
            None => println!("    Teams: N/A"),
        }
        println!();
    }

    println!("============================================================");
    println!("Use this League ID: {}", first.league_id);
    println!("============================================================\n");
    println!("Now you can run:");
    println!("  stats-backfill backfill {} 2024-25 5\n", first.league_id);

    Ok(())
}
