//! Yahoo Fantasy Sports v2 API client.
//!
//! Yahoo's JSON encodes collections as objects keyed "0".."n" (plus a
//! "count"), and resources as nested arrays of single-key fragments. The
//! helpers below flatten both shapes before anything is read out of them.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::models::{LeagueSummary, Player};
use crate::source::{RawStat, RosterSource, StatsSource};

pub const DEFAULT_BASE_URL: &str = "https://fantasysports.yahooapis.com/fantasy/v2";

/// Yahoo caps league player listings at 25 per request.
const PAGE_SIZE: usize = 25;

pub struct YahooClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl YahooClient {
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(2)
            .build()?;

        Ok(Self {
            http,
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json(&self, path: &str) -> Result<Value, SourceError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("format", "json")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::Status { status, body });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Leagues the token's owner belongs to for `game_key` (e.g. "nba").
    pub async fn user_leagues(&self, game_key: &str) -> Result<Vec<LeagueSummary>, SourceError> {
        let path = format!("users;use_login=1/games;game_keys={}/leagues", game_key);
        let body = self.get_json(&path).await?;
        parse_user_leagues(&body)
    }
}

#[async_trait]
impl StatsSource for YahooClient {
    async fn player_stats_by_date(
        &self,
        player_key: &str,
        date: NaiveDate,
    ) -> Result<Option<Vec<RawStat>>, SourceError> {
        let path = format!(
            "player/{}/stats;type=date;date={}",
            player_key,
            date.format("%Y-%m-%d")
        );
        let body = self.get_json(&path).await?;
        parse_player_stats(&body)
    }
}

#[async_trait]
impl RosterSource for YahooClient {
    async fn league_players(&self, league_key: &str) -> Result<Vec<Player>, SourceError> {
        let mut players = Vec::new();
        let mut start = 0;

        loop {
            let path = format!(
                "league/{}/players;start={};count={}",
                league_key, start, PAGE_SIZE
            );
            let body = self.get_json(&path).await?;
            let page = parse_league_players(&body)?;
            let page_len = page.len();
            players.extend(page);

            if page_len < PAGE_SIZE {
                break;
            }
            start += PAGE_SIZE;
        }

        info!("Fetched {} players for league {}", players.len(), league_key);
        Ok(players)
    }
}

/// Items of a Yahoo collection, in index order. Plain arrays pass through.
fn collection(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => {
            let mut indexed: Vec<(usize, &Value)> = map
                .iter()
                .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
                .collect();
            indexed.sort_by_key(|(i, _)| *i);
            indexed.into_iter().map(|(_, v)| v).collect()
        }
        _ => Vec::new(),
    }
}

/// Merge a resource's fragment arrays into a single object.
fn merge_fragments(value: &Value) -> Map<String, Value> {
    let mut merged = Map::new();
    merge_into(value, &mut merged);
    merged
}

fn merge_into(value: &Value, merged: &mut Map<String, Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                merge_into(item, merged);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                merged.insert(k.clone(), v.clone());
            }
        }
        _ => {}
    }
}

/// Strings and numbers as text; anything else is absent.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn content<'v>(body: &'v Value, resource: &str) -> Result<&'v Value, SourceError> {
    body.get("fantasy_content")
        .and_then(|c| c.get(resource))
        .ok_or_else(|| SourceError::Shape(format!("missing fantasy_content.{}", resource)))
}

/// Stats of a `player/{key}/stats;type=date` response. `None` when the
/// response carries no `player_stats` block.
pub fn parse_player_stats(body: &Value) -> Result<Option<Vec<RawStat>>, SourceError> {
    let player = merge_fragments(content(body, "player")?);
    let Some(player_stats) = player.get("player_stats") else {
        return Ok(None);
    };

    let stats = player_stats
        .get("stats")
        .map(collection)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| {
            let stat = entry.get("stat")?;
            Some(RawStat {
                stat_id: text(stat.get("stat_id")?)?,
                value: text(stat.get("value")?)?,
            })
        })
        .collect();

    Ok(Some(stats))
}

/// Players of one `league/{key}/players` page
pub fn parse_league_players(body: &Value) -> Result<Vec<Player>, SourceError> {
    let league = merge_fragments(content(body, "league")?);
    let Some(players) = league.get("players") else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for item in collection(players) {
        let Some(fragments) = item.get("player") else {
            continue;
        };
        let player = merge_fragments(fragments);

        let Some(key) = player.get("player_key").and_then(text) else {
            continue;
        };
        let name = player
            .get("name")
            .and_then(|n| n.get("full"))
            .and_then(text)
            .unwrap_or_else(|| key.clone());
        let team = player
            .get("editorial_team_abbr")
            .and_then(text)
            .unwrap_or_else(|| "UNK".to_string());
        let positions = player
            .get("eligible_positions")
            .map(eligible_positions)
            .unwrap_or_default();

        out.push(Player {
            key,
            name,
            team,
            positions,
        });
    }

    Ok(out)
}

fn eligible_positions(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|p| p.get("position").and_then(text))
            .collect(),
        Value::Object(_) => value.get("position").and_then(text).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Leagues of a `users;use_login=1/games/leagues` response
pub fn parse_user_leagues(body: &Value) -> Result<Vec<LeagueSummary>, SourceError> {
    let mut leagues = Vec::new();

    for user in collection(content(body, "users")?) {
        let Some(user) = user.get("user") else {
            continue;
        };
        let user = merge_fragments(user);
        let Some(games) = user.get("games") else {
            continue;
        };

        for game in collection(games) {
            let Some(game) = game.get("game") else {
                continue;
            };
            let game = merge_fragments(game);
            let Some(game_leagues) = game.get("leagues") else {
                continue;
            };

            for league in collection(game_leagues) {
                let Some(league) = league.get("league") else {
                    continue;
                };
                let league = merge_fragments(league);
                let (Some(league_key), Some(league_id)) = (
                    league.get("league_key").and_then(text),
                    league.get("league_id").and_then(text),
                ) else {
                    continue;
                };

                leagues.push(LeagueSummary {
                    league_key,
                    league_id,
                    name: league.get("name").and_then(text).unwrap_or_default(),
                    num_teams: league
                        .get("num_teams")
                        .and_then(text)
                        .and_then(|n| n.parse().ok()),
                });
            }
        }
    }

    Ok(leagues)
}
