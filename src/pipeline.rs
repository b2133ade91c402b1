use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::csv_out::GameRecordWriter;
use crate::game_record::{GameRecord, MatchOutcome};
use crate::history::{HistoryWindow, analyze_participant};
use crate::match_data::extract_match;
use crate::riot_api::MatchSource;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub written: usize,
    pub undetermined: usize,
    pub failed: Vec<String>,
}

/// Match ids from a text file, one per line, blank lines ignored.
pub fn read_match_ids(path: &Path) -> Result<Vec<String>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Fetches one match and enriches each of its ten players with their history.
pub fn analyze_match<S: MatchSource>(
    source: &S,
    window: &HistoryWindow,
    match_id: &str,
) -> Result<GameRecord> {
    let dto = source
        .match_by_id(match_id)
        .with_context(|| format!("fetching match {match_id}"))?;
    let current = extract_match(&dto)?;

    let total = current.participants.len();
    let mut players = Vec::with_capacity(total);
    for (idx, participant) in current.participants.iter().enumerate() {
        debug!("[{}/{}] analyzing summoner", idx + 1, total);
        let block = analyze_participant(source, window, &current, participant)
            .with_context(|| format!("analyzing summoner {} of {match_id}", idx + 1))?;
        players.push(block);
    }

    Ok(GameRecord {
        match_id: current.id.clone(),
        players,
        outcome: MatchOutcome::determine(&current.participants),
    })
}

/// Enriches every id in order and writes one row per match. A match that
/// cannot be analyzed is logged and left out; the run carries on.
pub fn build_training_data<S: MatchSource>(
    source: &S,
    window: &HistoryWindow,
    match_ids: &[String],
    output: &Path,
) -> Result<BuildSummary> {
    let mut writer = GameRecordWriter::create(output)?;
    let mut summary = BuildSummary::default();
    let total = match_ids.len();

    for (idx, match_id) in match_ids.iter().enumerate() {
        info!("[{}/{}] [{}] analyzing match", idx + 1, total, match_id);

        let record = match analyze_match(source, window, match_id) {
            Ok(record) => record,
            Err(err) => {
                error!("[{}] dropped: {:#}", match_id, err);
                summary.failed.push(match_id.clone());
                continue;
            }
        };

        if record.outcome == MatchOutcome::Undetermined {
            info!("[{}] both sides share the same win flag, labelled ERR", match_id);
            summary.undetermined += 1;
        }

        writer.write(&record)?;
        info!("[{}] added to {}", match_id, output.display());
    }

    summary.written = writer.rows();
    Ok(summary)
}
