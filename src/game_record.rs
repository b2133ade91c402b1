use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use csv::StringRecord;

use crate::match_data::{PLAYERS_PER_MATCH, PLAYERS_PER_TEAM, Participant};
use crate::stats::{HistoryStats, PlayerStatBlock};

/// Written in place of every history-derived value when a player has no past matches.
pub const NO_DATA: &str = "EMPTY";
pub const UNDETERMINED_LABEL: &str = "ERR";

pub const PLAYER_ATTRIBUTES: [&str; 7] = [
    "winrate",
    "champ_winrate",
    "avgKda",
    "champ_avgKda",
    "streak",
    "consistency",
    "champMastery",
];

/// Which side won, from the point of view of the wide row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Players 1-5 won. Label `0`.
    SideA,
    /// Players 6-10 won. Label `1`.
    SideB,
    /// Both sides carry the same win flag. Label `ERR`.
    Undetermined,
}

impl MatchOutcome {
    /// Compares the last player of side A with the first player of side B.
    pub fn determine(participants: &[Participant]) -> Self {
        let (Some(last_a), Some(first_b)) = (
            participants.get(PLAYERS_PER_TEAM - 1),
            participants.get(PLAYERS_PER_TEAM),
        ) else {
            return MatchOutcome::Undetermined;
        };

        match (last_a.win, first_b.win) {
            (true, false) => MatchOutcome::SideA,
            (false, true) => MatchOutcome::SideB,
            _ => MatchOutcome::Undetermined,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchOutcome::SideA => "0",
            MatchOutcome::SideB => "1",
            MatchOutcome::Undetermined => UNDETERMINED_LABEL,
        }
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MatchOutcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "0" => Ok(MatchOutcome::SideA),
            "1" => Ok(MatchOutcome::SideB),
            UNDETERMINED_LABEL => Ok(MatchOutcome::Undetermined),
            other => Err(anyhow!("unknown outcome label `{other}`")),
        }
    }
}

/// One output row: a match, the stat blocks of its ten players in positional
/// order, and the outcome label.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub match_id: String,
    pub players: Vec<PlayerStatBlock>,
    pub outcome: MatchOutcome,
}

pub fn player_columns(position: usize) -> impl Iterator<Item = String> {
    PLAYER_ATTRIBUTES
        .iter()
        .map(move |attr| format!("summoner_{position}_{attr}"))
}

pub fn header(players: usize) -> Vec<String> {
    let mut columns = vec!["id".to_string()];
    for position in 1..=players {
        columns.extend(player_columns(position));
    }
    columns.push("win".to_string());
    columns
}

/// KDA as a float literal; whole values keep their `.0`.
fn kda_field(kda: f64) -> String {
    if kda.fract() == 0.0 {
        format!("{kda:.1}")
    } else {
        kda.to_string()
    }
}

fn block_fields(block: &PlayerStatBlock) -> [String; 7] {
    let mastery = block.champion_mastery.to_string();
    match &block.history {
        Some(h) => [
            h.winrate.to_string(),
            h.champ_winrate.to_string(),
            kda_field(h.avg_kda),
            kda_field(h.champ_avg_kda),
            h.streak.to_string(),
            h.consistency.to_string(),
            mastery,
        ],
        None => [
            NO_DATA.to_string(),
            NO_DATA.to_string(),
            NO_DATA.to_string(),
            NO_DATA.to_string(),
            NO_DATA.to_string(),
            NO_DATA.to_string(),
            mastery,
        ],
    }
}

fn parse_block(fields: &[&str]) -> Result<PlayerStatBlock> {
    let [winrate, champ_winrate, avg_kda, champ_avg_kda, streak, consistency, mastery] = fields
    else {
        bail!("expected {} fields, got {}", PLAYER_ATTRIBUTES.len(), fields.len());
    };

    let champion_mastery = mastery.parse::<i64>().context("champMastery")?;
    let history_fields = [winrate, champ_winrate, avg_kda, champ_avg_kda, streak, consistency];

    if history_fields.iter().all(|f| **f == NO_DATA) {
        return Ok(PlayerStatBlock {
            history: None,
            champion_mastery,
        });
    }

    Ok(PlayerStatBlock {
        history: Some(HistoryStats {
            winrate: winrate.parse::<u32>().context("winrate")?,
            champ_winrate: champ_winrate.parse::<u32>().context("champ_winrate")?,
            avg_kda: avg_kda.parse::<f64>().context("avgKda")?,
            champ_avg_kda: champ_avg_kda.parse::<f64>().context("champ_avgKda")?,
            streak: streak.parse::<i32>().context("streak")?,
            consistency: consistency.parse::<u32>().context("consistency")?,
        }),
        champion_mastery,
    })
}

impl GameRecord {
    pub fn to_csv_record(&self) -> StringRecord {
        let mut record = StringRecord::new();
        record.push_field(&self.match_id);
        for block in &self.players {
            for field in block_fields(block) {
                record.push_field(&field);
            }
        }
        record.push_field(self.outcome.label());
        record
    }

    /// Inverse of [`GameRecord::to_csv_record`] for a ten-player row.
    pub fn from_csv_record(record: &StringRecord) -> Result<Self> {
        let width = PLAYER_ATTRIBUTES.len();
        let expected = 2 + PLAYERS_PER_MATCH * width;
        if record.len() != expected {
            bail!("row has {} fields, expected {}", record.len(), expected);
        }

        let fields: Vec<&str> = record.iter().collect();
        let match_id = fields[0].to_string();
        let players = fields[1..expected - 1]
            .chunks(width)
            .enumerate()
            .map(|(idx, chunk)| {
                parse_block(chunk)
                    .with_context(|| format!("match {match_id}, summoner {}", idx + 1))
            })
            .collect::<Result<Vec<_>>>()?;
        let outcome = fields[expected - 1].parse::<MatchOutcome>()?;

        Ok(Self {
            match_id,
            players,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(win: bool) -> Participant {
        Participant {
            puuid: "x".into(),
            champion_id: 1,
            win,
        }
    }

    fn side_flags(last_a: bool, first_b: bool) -> Vec<Participant> {
        let mut ps: Vec<Participant> = (0..10).map(|i| player(i < 5)).collect();
        ps[4] = player(last_a);
        ps[5] = player(first_b);
        ps
    }

    fn sample_block(seed: u32) -> PlayerStatBlock {
        PlayerStatBlock {
            history: Some(HistoryStats {
                winrate: 50 + seed,
                champ_winrate: 100,
                avg_kda: 2.667,
                champ_avg_kda: 3.5,
                streak: -2,
                consistency: 33,
            }),
            champion_mastery: 41_234,
        }
    }

    #[test]
    fn outcome_from_boundary_players() {
        assert_eq!(MatchOutcome::determine(&side_flags(true, false)), MatchOutcome::SideA);
        assert_eq!(MatchOutcome::determine(&side_flags(false, true)), MatchOutcome::SideB);
        assert_eq!(
            MatchOutcome::determine(&side_flags(true, true)),
            MatchOutcome::Undetermined
        );
        assert_eq!(
            MatchOutcome::determine(&side_flags(false, false)),
            MatchOutcome::Undetermined
        );
        assert_eq!(MatchOutcome::SideA.label(), "0");
        assert_eq!(MatchOutcome::Undetermined.to_string(), "ERR");
    }

    #[test]
    fn header_layout() {
        let h = header(10);
        assert_eq!(h.len(), 72);
        assert_eq!(h[0], "id");
        assert_eq!(h[1], "summoner_1_winrate");
        assert_eq!(h[7], "summoner_1_champMastery");
        assert_eq!(h[70], "summoner_10_champMastery");
        assert_eq!(h[71], "win");
    }

    #[test]
    fn empty_history_renders_sentinel() {
        let record = GameRecord {
            match_id: "EUW1_1".into(),
            players: vec![
                PlayerStatBlock {
                    history: None,
                    champion_mastery: 900,
                };
                10
            ],
            outcome: MatchOutcome::Undetermined,
        }
        .to_csv_record();

        assert_eq!(&record[1], "EMPTY");
        assert_eq!(&record[6], "EMPTY");
        assert_eq!(&record[7], "900");
        assert_eq!(&record[71], "ERR");
    }

    #[test]
    fn whole_kda_keeps_decimal_point() {
        let mut block = sample_block(0);
        if let Some(h) = block.history.as_mut() {
            h.avg_kda = 3.0;
        }
        let record = GameRecord {
            match_id: "EUW1_2".into(),
            players: vec![block; 10],
            outcome: MatchOutcome::SideA,
        }
        .to_csv_record();

        assert_eq!(&record[3], "3.0");
        assert_eq!(&record[4], "3.5");
        assert_eq!(kda_field(2.667), "2.667");
    }

    #[test]
    fn written_row_parses_back() {
        let mut players: Vec<PlayerStatBlock> = (0..10).map(sample_block).collect();
        players[3] = PlayerStatBlock {
            history: None,
            champion_mastery: 0,
        };
        let original = GameRecord {
            match_id: "EUW1_6543".into(),
            players,
            outcome: MatchOutcome::SideB,
        };

        let parsed = GameRecord::from_csv_record(&original.to_csv_record()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn rejects_short_rows() {
        let record = StringRecord::from(vec!["id", "1", "0"]);
        assert!(GameRecord::from_csv_record(&record).is_err());
    }
}
