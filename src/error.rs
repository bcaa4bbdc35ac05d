use thiserror::Error;

/// Startup configuration problems. All of these are fatal and are reported
/// before any backfill work begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{0} is set but empty")]
    Empty(&'static str),

    #[error("{0} appears to be a placeholder value; replace it with a real one")]
    Placeholder(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("failed to read token file {path}: {source}")]
    TokenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no league id given (pass it as an argument or set YAHOO_LEAGUE_ID)")]
    MissingLeagueId,
}

/// Failures talking to the remote fantasy API.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected response shape: {0}")]
    Shape(String),
}

impl SourceError {
    /// 401/403: the token was rejected, so every later call will fail too.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            SourceError::Status { status, .. }
                if *status == reqwest::StatusCode::UNAUTHORIZED
                    || *status == reqwest::StatusCode::FORBIDDEN
        )
    }
}

/// Failures reading from or writing to the game log store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that abort a whole season run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("unknown season {label:?} (known: {known})")]
    UnknownSeason { label: String, known: String },

    #[error("failed to fetch league players for {league_key}: {source}")]
    Roster {
        league_key: String,
        #[source]
        source: SourceError,
    },

    #[error("league {0} has no players")]
    EmptyRoster(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn status(code: StatusCode) -> SourceError {
        SourceError::Status {
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn rejected_token_is_an_auth_failure() {
        assert!(status(StatusCode::UNAUTHORIZED).is_auth_failure());
        assert!(status(StatusCode::FORBIDDEN).is_auth_failure());
        assert!(!status(StatusCode::NOT_FOUND).is_auth_failure());
        assert!(!status(StatusCode::INTERNAL_SERVER_ERROR).is_auth_failure());
        assert!(!SourceError::Shape("missing fantasy_content".to_string()).is_auth_failure());
    }
}
