use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use csv::StringRecord;
use tracing::{info, warn};

use crate::csv_out::{semicolon_reader, semicolon_writer};
use crate::game_record::{MatchOutcome, header, player_columns};
use crate::match_data::{PLAYERS_PER_MATCH, PLAYERS_PER_TEAM};

/// Column positions of a ten-player file.
#[derive(Debug, Clone)]
pub struct WideLayout {
    id: usize,
    win: usize,
    side_a: Vec<usize>,
    side_b: Vec<usize>,
}

impl WideLayout {
    pub fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| anyhow!("missing column `{name}`"))
        };
        let columns = |positions: std::ops::RangeInclusive<usize>| {
            positions
                .flat_map(player_columns)
                .map(|name| find(name.as_str()))
                .collect::<Result<Vec<_>>>()
        };

        Ok(Self {
            id: find("id")?,
            win: find("win")?,
            side_a: columns(1..=PLAYERS_PER_TEAM)?,
            side_b: columns(PLAYERS_PER_TEAM + 1..=PLAYERS_PER_MATCH)?,
        })
    }
}

/// One side of a match; `win` is relative to that side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRow {
    pub id: String,
    pub fields: Vec<String>,
    pub win: u8,
}

impl TeamRow {
    fn to_record(&self) -> StringRecord {
        let mut record = StringRecord::new();
        record.push_field(&self.id);
        for field in &self.fields {
            record.push_field(field);
        }
        record.push_field(&self.win.to_string());
        record
    }
}

fn side(record: &StringRecord, columns: &[usize]) -> Result<Vec<String>> {
    columns
        .iter()
        .map(|&idx| {
            record
                .get(idx)
                .map(str::to_string)
                .ok_or_else(|| anyhow!("row is missing column {idx}"))
        })
        .collect()
}

/// Splits a wide row into its `_A` and `_B` rows. Undetermined rows yield `None`.
pub fn split_row(layout: &WideLayout, record: &StringRecord) -> Result<Option<[TeamRow; 2]>> {
    let id = record
        .get(layout.id)
        .ok_or_else(|| anyhow!("row is missing the id column"))?;
    let label = record
        .get(layout.win)
        .ok_or_else(|| anyhow!("row {id} is missing the win column"))?;
    let outcome = label
        .parse::<MatchOutcome>()
        .with_context(|| format!("row {id}"))?;

    let (a_win, b_win) = match outcome {
        MatchOutcome::SideA => (1, 0),
        MatchOutcome::SideB => (0, 1),
        MatchOutcome::Undetermined => return Ok(None),
    };

    Ok(Some([
        TeamRow {
            id: format!("{id}_A"),
            fields: side(record, &layout.side_a)?,
            win: a_win,
        },
        TeamRow {
            id: format!("{id}_B"),
            fields: side(record, &layout.side_b)?,
            win: b_win,
        },
    ]))
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SplitSummary {
    pub matches: usize,
    pub dropped_undetermined: usize,
    pub rejected: usize,
    pub team_rows: usize,
}

/// Splits every row of `input`, sorted by id. Rows with a label other than
/// `0`, `1` or `ERR` are skipped with a warning.
pub fn split_rows(
    headers: &StringRecord,
    records: impl IntoIterator<Item = StringRecord>,
) -> Result<(Vec<TeamRow>, SplitSummary)> {
    let layout = WideLayout::from_headers(headers)?;
    let mut summary = SplitSummary::default();
    let mut rows = Vec::new();

    for record in records {
        summary.matches += 1;
        match split_row(&layout, &record) {
            Ok(Some(pair)) => rows.extend(pair),
            Ok(None) => summary.dropped_undetermined += 1,
            Err(err) => {
                warn!("skipping row: {:#}", err);
                summary.rejected += 1;
            }
        }
    }

    rows.sort_by(|a, b| a.id.cmp(&b.id));
    summary.team_rows = rows.len();
    Ok((rows, summary))
}

pub fn split_teams_file(input: &Path, output: &Path) -> Result<SplitSummary> {
    let mut reader = semicolon_reader(input)?;
    let headers = reader.headers()?.clone();
    let records = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("reading {}", input.display()))?;

    let (rows, summary) = split_rows(&headers, records)?;
    if summary.matches > 0 && summary.rejected == summary.matches {
        bail!("no row of {} has a usable win label", input.display());
    }

    let mut writer = semicolon_writer(output)?;
    writer.write_record(header(PLAYERS_PER_TEAM))?;
    for row in &rows {
        writer.write_record(&row.to_record())?;
    }
    writer.flush()?;

    info!(
        "split {} matches into {} team rows ({} undetermined dropped, {} rejected)",
        summary.matches, summary.team_rows, summary.dropped_undetermined, summary.rejected
    );
    Ok(summary)
}
