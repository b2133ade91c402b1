use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::match_data::{Match, Participant, PastMatchOutcome, extract_outcome_for};
use crate::riot_api::{MatchIdQuery, MatchSource};
use crate::stats::{PlayerStatBlock, aggregate};

/// Which past matches count as a player's recent form.
#[derive(Debug, Clone, Copy)]
pub struct HistoryWindow {
    pub search_depth: usize,
    pub queue: u32,
    /// Oldest match start considered, Unix seconds.
    pub recency_cutoff: i64,
}

/// Unix seconds `max_age_days` before `now`.
pub fn recency_cutoff(max_age_days: i64, now: DateTime<Utc>) -> i64 {
    (now - Duration::days(max_age_days)).timestamp()
}

impl HistoryWindow {
    pub fn new(search_depth: usize, queue: u32, max_age_days: i64, now: DateTime<Utc>) -> Self {
        Self {
            search_depth,
            queue,
            recency_cutoff: recency_cutoff(max_age_days, now),
        }
    }

    /// Query for matches that ended before `current` started.
    pub fn query_before(&self, current: &Match) -> MatchIdQuery {
        MatchIdQuery {
            start_time: Some(self.recency_cutoff),
            end_time: Some(current.created_at_secs()),
            queue: Some(self.queue),
            count: self.search_depth,
        }
    }
}

/// Recent outcomes of `puuid`, most recent first, excluding `current`.
/// Past matches that are missing, keep failing after retries, or do not contain
/// the player are skipped. A failing match-id listing is returned as an error.
pub fn past_outcomes<S: MatchSource>(
    source: &S,
    window: &HistoryWindow,
    current: &Match,
    puuid: &str,
) -> Result<Vec<PastMatchOutcome>, FetchError> {
    let ids: Vec<String> = source
        .match_ids_by_puuid(puuid, &window.query_before(current))?
        .into_iter()
        .filter(|id| *id != current.id)
        .collect();

    let total = ids.len();
    let mut outcomes = Vec::with_capacity(total);

    for (idx, match_id) in ids.iter().enumerate() {
        debug!("[{}/{}] fetching past match {}", idx + 1, total, match_id);

        let dto = match source.match_by_id(match_id) {
            Ok(dto) => dto,
            Err(err) if err.is_unavailable() => {
                warn!(match_id, "past match unavailable, skipping: {err}");
                continue;
            }
            Err(err) => return Err(err),
        };

        match extract_outcome_for(&dto, puuid) {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => warn!("{err}, skipping"),
        }
    }

    Ok(outcomes)
}

/// Builds the stat block of one participant of `current`. Mastery is fetched
/// whether or not any history exists.
pub fn analyze_participant<S: MatchSource>(
    source: &S,
    window: &HistoryWindow,
    current: &Match,
    participant: &Participant,
) -> Result<PlayerStatBlock, FetchError> {
    let history = past_outcomes(source, window, current, &participant.puuid)?;
    if history.is_empty() {
        debug!(puuid = %participant.puuid, "no past matches in window");
    }

    let champion_mastery = source.champion_mastery(&participant.puuid, participant.champion_id)?;

    Ok(PlayerStatBlock {
        history: aggregate(&history, participant.champion_id),
        champion_mastery,
    })
}
