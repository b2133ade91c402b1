use serde::Deserialize;

use crate::error::MatchDataError;

pub const PLAYERS_PER_MATCH: usize = 10;
pub const PLAYERS_PER_TEAM: usize = 5;

// Subset of the match-v5 payload this crate reads.

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDto {
    pub metadata: MetadataDto,
    pub info: InfoDto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDto {
    pub match_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoDto {
    /// Milliseconds since the Unix epoch.
    pub game_creation: i64,
    pub participants: Vec<ParticipantDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub puuid: String,
    pub champion_id: i64,
    pub win: bool,
    #[serde(default)]
    pub kills: i64,
    #[serde(default)]
    pub deaths: i64,
    #[serde(default)]
    pub assists: i64,
    #[serde(default)]
    pub challenges: Option<ChallengesDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengesDto {
    pub kda: Option<f64>,
}

impl ParticipantDto {
    pub fn kda(&self) -> f64 {
        self.challenges
            .as_ref()
            .and_then(|c| c.kda)
            .unwrap_or_else(|| (self.kills + self.assists) as f64 / self.deaths.max(1) as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub puuid: String,
    pub champion_id: i64,
    pub win: bool,
}

/// A fetched match reduced to what the enrichment needs. Participants keep the
/// API's positional order: 1-5 are side A, 6-10 side B.
#[derive(Debug, Clone)]
pub struct Match {
    pub id: String,
    pub created_at_ms: i64,
    pub participants: Vec<Participant>,
}

impl Match {
    pub fn created_at_secs(&self) -> i64 {
        self.created_at_ms / 1000
    }
}

/// One of the player's previous games, as seen by the statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct PastMatchOutcome {
    pub champion_id: i64,
    pub kda: f64,
    pub win: bool,
}

pub fn extract_match(dto: &MatchDto) -> Result<Match, MatchDataError> {
    let found = dto.info.participants.len();
    if found != PLAYERS_PER_MATCH {
        return Err(MatchDataError::ParticipantCount {
            match_id: dto.metadata.match_id.clone(),
            found,
            expected: PLAYERS_PER_MATCH,
        });
    }

    Ok(Match {
        id: dto.metadata.match_id.clone(),
        created_at_ms: dto.info.game_creation,
        participants: dto
            .info
            .participants
            .iter()
            .map(|p| Participant {
                puuid: p.puuid.clone(),
                champion_id: p.champion_id,
                win: p.win,
            })
            .collect(),
    })
}

pub fn extract_outcome_for(dto: &MatchDto, puuid: &str) -> Result<PastMatchOutcome, MatchDataError> {
    dto.info
        .participants
        .iter()
        .find(|p| p.puuid == puuid)
        .map(|p| PastMatchOutcome {
            champion_id: p.champion_id,
            kda: p.kda(),
            win: p.win,
        })
        .ok_or_else(|| MatchDataError::ParticipantMissing {
            match_id: dto.metadata.match_id.clone(),
            puuid: puuid.to_string(),
        })
}

pub fn participant_puuids(dto: &MatchDto) -> impl Iterator<Item = &str> {
    dto.info.participants.iter().map(|p| p.puuid.as_str())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn parses_match_v5_payload() {
        let raw = r#"{
            "metadata": {"matchId": "EUW1_1", "participants": ["a"]},
            "info": {
                "gameCreation": 1700000000123,
                "queueId": 420,
                "participants": [
                    {"puuid": "a", "championId": 103, "win": true, "kills": 3, "deaths": 0,
                     "assists": 5, "challenges": {"kda": 8.0}},
                    {"puuid": "b", "championId": 64, "win": false, "kills": 2, "deaths": 4,
                     "assists": 6}
                ]
            }
        }"#;
        let dto: MatchDto = serde_json::from_str(raw).unwrap();
        assert_eq!(dto.metadata.match_id, "EUW1_1");
        assert_eq!(dto.info.participants[0].kda(), 8.0);
        assert_eq!(dto.info.participants[1].kda(), 2.0);
    }

    #[test]
    fn kda_without_deaths_uses_one() {
        let mut p = participant("x", 1, true, None);
        p.deaths = 0;
        assert_eq!(p.kda(), 10.0);
    }

    #[test]
    fn extract_keeps_positional_order() {
        let dto = ten_player_match("EUW1_9", 1_700_000_000_999, true);
        let m = extract_match(&dto).unwrap();
        assert_eq!(m.participants.len(), 10);
        assert_eq!(m.participants[0].puuid, "p1");
        assert_eq!(m.participants[9].puuid, "p10");
        assert!(m.participants[4].win);
        assert!(!m.participants[5].win);
        assert_eq!(m.created_at_secs(), 1_700_000_000);
    }

    #[test]
    fn rejects_wrong_participant_count() {
        let mut dto = ten_player_match("EUW1_9", 0, true);
        dto.info.participants.pop();
        assert!(matches!(
            extract_match(&dto),
            Err(MatchDataError::ParticipantCount { found: 9, .. })
        ));
    }

    #[test]
    fn outcome_for_participant() {
        let dto = ten_player_match("EUW1_9", 0, false);
        let outcome = extract_outcome_for(&dto, "p7").unwrap();
        assert_eq!(outcome.champion_id, 7);
        assert!(outcome.win);
        assert!(extract_outcome_for(&dto, "nobody").is_err());
    }
}
