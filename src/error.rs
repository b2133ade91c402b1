use std::time::Duration;

use thiserror::Error;

/// Failure of a single Riot API call, classified by how the caller should react.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("service unavailable (status {status})")]
    ServiceUnavailable { status: u16 },

    #[error("unexpected response status {status}")]
    Unclassified { status: u16 },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Maps a non-success HTTP status onto the taxonomy.
    pub fn from_status(status: u16, url: &str, retry_after: Option<Duration>) -> Self {
        match status {
            429 => FetchError::RateLimited {
                retry_after: retry_after.unwrap_or(Duration::from_secs(10)),
            },
            404 => FetchError::NotFound {
                url: url.to_string(),
            },
            503 => FetchError::ServiceUnavailable { status },
            _ => FetchError::Unclassified { status },
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FetchError::NotFound { .. } | FetchError::Decode(_) | FetchError::Exhausted { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            FetchError::NotFound { .. } => true,
            FetchError::Exhausted { last, .. } => last.is_not_found(),
            _ => false,
        }
    }

    /// Missing, or still failing once retries ran out. A single past match in
    /// this state is dropped from the history instead of failing the row.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            FetchError::NotFound { .. } | FetchError::Exhausted { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum MatchDataError {
    #[error("match {match_id} has {found} participants, expected {expected}")]
    ParticipantCount {
        match_id: String,
        found: usize,
        expected: usize,
    },

    #[error("player {puuid} does not appear in match {match_id}")]
    ParticipantMissing { match_id: String, puuid: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API key: set RIOT_API_KEY or api_key in {path}")]
    MissingApiKey { path: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("unknown platform region `{0}`")]
    UnknownRegion(String),

    #[error("invalid Riot ID `{0}`, expected gameName#tagLine")]
    InvalidRiotId(String),
}
