use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Writer, WriterBuilder};

use crate::game_record::{GameRecord, header};
use crate::match_data::PLAYERS_PER_MATCH;

pub const DELIMITER: u8 = b';';

pub fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    Ok(())
}

pub fn semicolon_writer(path: &Path) -> Result<Writer<File>> {
    create_parent_dir(path)?;
    WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_path(path)
        .with_context(|| format!("opening {} for writing", path.display()))
}

pub fn semicolon_reader(path: &Path) -> Result<csv::Reader<File>> {
    ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))
}

/// Writes game records to one file, truncating it on open. The header goes out
/// with the first row and every row is flushed as soon as it is written.
pub struct GameRecordWriter {
    writer: Writer<File>,
    header_written: bool,
    rows: usize,
}

impl GameRecordWriter {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: semicolon_writer(path)?,
            header_written: false,
            rows: 0,
        })
    }

    pub fn write(&mut self, record: &GameRecord) -> Result<()> {
        if !self.header_written {
            self.writer.write_record(header(record.players.len()))?;
            self.header_written = true;
        }

        self.writer.write_record(&record.to_csv_record())?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

pub fn read_game_records(path: &Path) -> Result<Vec<GameRecord>> {
    let mut reader = semicolon_reader(path)?;
    let expected: StringRecord = header(PLAYERS_PER_MATCH).into_iter().collect();
    if reader.headers()? != &expected {
        anyhow::bail!("{} does not have the ten-player header", path.display());
    }

    reader
        .records()
        .map(|record| GameRecord::from_csv_record(&record?))
        .collect()
}
