use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::Region;
use crate::error::FetchError;
use crate::match_data::MatchDto;
use crate::retry::RetryPolicy;

pub const DEFAULT_MAX_REQS_PER_2MIN: usize = 80;
const DEFAULT_MAX_REQS_PER_SEC: usize = 20;

#[derive(Deserialize)]
pub struct AccountResponse {
    pub puuid: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChampionMasteryResponse {
    champion_points: i64,
}

/// Filters for the match-id listing of one player. Times are Unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchIdQuery {
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub queue: Option<u32>,
    pub count: usize,
}

impl MatchIdQuery {
    fn to_query_string(&self) -> String {
        let mut params = vec!["start=0".to_string(), format!("count={}", self.count)];
        if let Some(start) = self.start_time {
            params.push(format!("startTime={}", start));
        }
        if let Some(end) = self.end_time {
            params.push(format!("endTime={}", end));
        }
        if let Some(queue) = self.queue {
            params.push(format!("queue={}", queue));
        }
        params.join("&")
    }
}

/// The remote calls the enrichment and harvesting steps depend on.
pub trait MatchSource {
    fn puuid_by_riot_id(&self, game_name: &str, tag_line: &str) -> Result<String, FetchError>;

    fn match_ids_by_puuid(&self, puuid: &str, query: &MatchIdQuery)
    -> Result<Vec<String>, FetchError>;

    fn match_by_id(&self, match_id: &str) -> Result<MatchDto, FetchError>;

    /// Mastery points of `puuid` on `champion_id`; 0 if the champion was never played.
    fn champion_mastery(&self, puuid: &str, champion_id: i64) -> Result<i64, FetchError>;
}

fn build_headers(api_key: &str) -> Result<HeaderMap, reqwest::header::InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.insert("X-Riot-Token", HeaderValue::from_str(api_key)?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(headers)
}

pub struct RiotClient {
    client: Client,
    headers: HeaderMap,
    region: Region,
    retry: RetryPolicy,
    limiter: Mutex<RateLimiter>,
}

impl RiotClient {
    pub fn new(
        api_key: &str,
        region: Region,
        retry: RetryPolicy,
        max_reqs_per_2min: usize,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::new(),
            headers: build_headers(api_key)?,
            region,
            retry,
            limiter: Mutex::new(RateLimiter::new(
                max_reqs_per_2min,
                DEFAULT_MAX_REQS_PER_SEC,
            )),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        self.retry.run(|| {
            let response = self.send_once(url)?;
            let body = response.bytes()?;
            Ok(serde_json::from_slice(&body)?)
        })
    }

    fn send_once(&self, url: &str) -> Result<Response, FetchError> {
        self.wait_rate_limit();

        debug!(url, "GET");
        let response = self.client.get(url).headers(self.headers.clone()).send()?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let err = FetchError::from_status(status.as_u16(), url, parse_retry_after(&response));
        match &err {
            FetchError::RateLimited { .. } => {
                warn!("rate limited by remote, waiting for retry-after window")
            }
            FetchError::NotFound { .. } => warn!(url, "not found"),
            FetchError::ServiceUnavailable { .. } => warn!(url, "service unavailable"),
            _ => warn!(url, status = status.as_u16(), "unexpected response"),
        }
        Err(err)
    }

    fn wait_rate_limit(&self) {
        let mut guard = self
            .limiter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.wait();
    }
}

impl MatchSource for RiotClient {
    fn puuid_by_riot_id(&self, game_name: &str, tag_line: &str) -> Result<String, FetchError> {
        let url = format!(
            "{}/riot/account/v1/accounts/by-riot-id/{}/{}",
            self.region.regional_base_url(),
            game_name,
            tag_line
        );

        let account: AccountResponse = self.get_json(&url)?;
        Ok(account.puuid)
    }

    fn match_ids_by_puuid(
        &self,
        puuid: &str,
        query: &MatchIdQuery,
    ) -> Result<Vec<String>, FetchError> {
        let url = format!(
            "{}/lol/match/v5/matches/by-puuid/{}/ids?{}",
            self.region.regional_base_url(),
            puuid,
            query.to_query_string()
        );

        self.get_json(&url)
    }

    fn match_by_id(&self, match_id: &str) -> Result<MatchDto, FetchError> {
        let url = format!(
            "{}/lol/match/v5/matches/{}",
            self.region.regional_base_url(),
            match_id
        );

        self.get_json(&url)
    }

    fn champion_mastery(&self, puuid: &str, champion_id: i64) -> Result<i64, FetchError> {
        let url = format!(
            "{}/lol/champion-mastery/v4/champion-masteries/by-puuid/{}/by-champion/{}",
            self.region.platform_base_url(),
            puuid,
            champion_id
        );

        mastery_points(self.get_json(&url))
    }
}

/// A 404 means the player never played the champion.
fn mastery_points(
    response: Result<ChampionMasteryResponse, FetchError>,
) -> Result<i64, FetchError> {
    match response {
        Ok(mastery) => Ok(mastery.champion_points),
        Err(err) if err.is_not_found() => Ok(0),
        Err(err) => Err(err),
    }
}

/// Sliding-window limiter over the per-second and per-two-minute budgets of a
/// Riot API key.
pub struct RateLimiter {
    max_reqs_per_2min: usize,
    max_reqs_per_sec: usize,
    timestamps_2min: VecDeque<Instant>,
    timestamps_1s: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_reqs_per_2min: usize, max_reqs_per_sec: usize) -> Self {
        Self {
            max_reqs_per_2min: max_reqs_per_2min.max(1),
            max_reqs_per_sec: max_reqs_per_sec.max(1),
            timestamps_2min: VecDeque::new(),
            timestamps_1s: VecDeque::new(),
        }
    }

    pub fn wait(&mut self) {
        loop {
            let now = Instant::now();
            match self.delay_needed(now) {
                Some(duration) => sleep(duration),
                None => {
                    self.timestamps_1s.push_back(now);
                    self.timestamps_2min.push_back(now);
                    break;
                }
            }
        }
    }

    /// How long a request issued at `now` must wait, if at all.
    fn delay_needed(&mut self, now: Instant) -> Option<Duration> {
        self.prune(now);

        if self.timestamps_1s.len() >= self.max_reqs_per_sec {
            if let Some(oldest) = self.timestamps_1s.front() {
                let elapsed = now.duration_since(*oldest);
                if elapsed < Duration::from_secs(1) {
                    return Some(Duration::from_secs(1) - elapsed);
                }
            }
        }

        if self.timestamps_2min.len() >= self.max_reqs_per_2min {
            if let Some(oldest) = self.timestamps_2min.front() {
                let elapsed = now.duration_since(*oldest);
                if elapsed < Duration::from_secs(120) {
                    return Some(Duration::from_secs(120) - elapsed);
                }
            }
        }

        None
    }

    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.timestamps_1s.front() {
            if now.duration_since(*front) > Duration::from_secs(1) {
                self.timestamps_1s.pop_front();
            } else {
                break;
            }
        }

        while let Some(front) = self.timestamps_2min.front() {
            if now.duration_since(*front) > Duration::from_secs(120) {
                self.timestamps_2min.pop_front();
            } else {
                break;
            }
        }
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}
