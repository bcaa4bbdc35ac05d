use std::env;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::error::ConfigError;
use crate::existing::ExistingDatesPolicy;
use crate::pacing::{Pacer, DEFAULT_REQUEST_DELAY};
use crate::season::SeasonTable;

/// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Only the backfill command writes, so only it requires this
    pub database_url: Option<String>,
    pub yahoo_access_token: String,
    pub game_key: String,
    /// Fallback when the command line omits the league id
    pub league_id: Option<String>,
    pub request_delay: Duration,
    /// Switches pacing from a fixed delay to a token bucket
    pub max_calls_per_minute: Option<NonZeroU32>,
    pub existing_dates_policy: ExistingDatesPolicy,
    pub http_timeout: Duration,
    pub seasons: SeasonTable,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = optional(&lookup, "DATABASE_URL")?;

        let yahoo_access_token = match lookup("YAHOO_ACCESS_TOKEN") {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            Some(_) => return Err(ConfigError::Empty("YAHOO_ACCESS_TOKEN")),
            None => match lookup("YAHOO_TOKEN_FILE") {
                Some(path) if !path.trim().is_empty() => read_token_file(path.trim())?,
                _ => return Err(ConfigError::Missing("YAHOO_ACCESS_TOKEN")),
            },
        };
        reject_placeholder("YAHOO_ACCESS_TOKEN", &yahoo_access_token)?;

        let request_delay = match parsed::<u64>(&lookup, "BACKFILL_REQUEST_DELAY_MS")? {
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_REQUEST_DELAY,
        };

        let existing_dates_policy = match lookup("BACKFILL_EXISTING_DATES_POLICY") {
            Some(v) if !v.trim().is_empty() => v.parse::<ExistingDatesPolicy>().map_err(|_| ConfigError::Invalid {
                var: "BACKFILL_EXISTING_DATES_POLICY",
                value: v.clone(),
            })?,
            _ => ExistingDatesPolicy::default(),
        };

        Ok(Self {
            database_url,
            yahoo_access_token,
            game_key: lookup("YAHOO_GAME_KEY")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "nba".to_string()),
            league_id: lookup("YAHOO_LEAGUE_ID").filter(|v| !v.trim().is_empty()),
            request_delay,
            max_calls_per_minute: parsed(&lookup, "BACKFILL_MAX_CALLS_PER_MINUTE")?,
            existing_dates_policy,
            http_timeout: Duration::from_secs(parsed(&lookup, "HTTP_TIMEOUT_SECONDS")?.unwrap_or(30)),
            seasons: SeasonTable::builtin(),
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    /// `{game_key}.l.{league_id}`
    pub fn league_key(&self, league_id: &str) -> String {
        format!("{}.l.{}", self.game_key, league_id)
    }

    pub fn pacer(&self) -> Pacer {
        match self.max_calls_per_minute {
            Some(calls) => Pacer::per_minute(calls),
            None => Pacer::fixed(self.request_delay),
        }
    }
}

fn optional<F>(lookup: &F, var: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(v) if !v.trim().is_empty() => {
            reject_placeholder(var, &v)?;
            Ok(Some(v))
        }
        Some(_) => Err(ConfigError::Empty(var)),
        None => Ok(None),
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        Some(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value: v }),
        _ => Ok(None),
    }
}

/// Prevent accidental use of sample/placeholder values
fn reject_placeholder(var: &'static str, value: &str) -> Result<(), ConfigError> {
    let lower = value.trim().to_lowercase();
    if lower.contains("change_me") || lower.contains("your_") || lower.starts_with("sample") {
        return Err(ConfigError::Placeholder(var));
    }
    Ok(())
}

fn read_token_file(path: &str) -> Result<String, ConfigError> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| ConfigError::TokenFile {
            path: path.to_string(),
            source,
        })
}
