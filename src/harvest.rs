use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::RiotId;
use crate::csv_out::create_parent_dir;
use crate::match_data::participant_puuids;
use crate::riot_api::{MatchIdQuery, MatchSource};

#[derive(Debug, Clone)]
pub struct HarvestArgs {
    pub seed: RiotId,
    /// Past matches listed per player; the result grows roughly with its square.
    pub matches_per_player: usize,
    pub queue: u32,
    /// Oldest match start considered, Unix seconds.
    pub recency_cutoff: i64,
    pub out_file: PathBuf,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestSummary {
    pub players: usize,
    pub match_ids: usize,
}

/// Pushes `value` unless already seen, keeping first-seen order.
fn push_unique(value: &str, seen: &mut HashSet<String>, out: &mut Vec<String>) {
    if seen.insert(value.to_string()) {
        out.push(value.to_string());
    }
}

impl HarvestArgs {
    fn query(&self) -> MatchIdQuery {
        MatchIdQuery {
            start_time: Some(self.recency_cutoff),
            end_time: None,
            queue: Some(self.queue),
            count: self.matches_per_player,
        }
    }
}

/// The seed player plus everyone who shared one of the seed's recent matches,
/// deduplicated in first-seen order.
pub fn collect_players<S: MatchSource>(source: &S, args: &HarvestArgs) -> Result<Vec<String>> {
    let seed_puuid = source
        .puuid_by_riot_id(&args.seed.game_name, &args.seed.tag_line)
        .with_context(|| {
            format!(
                "resolving seed {}#{}",
                args.seed.game_name, args.seed.tag_line
            )
        })?;
    let seed_matches = source
        .match_ids_by_puuid(&seed_puuid, &args.query())
        .context("listing seed matches")?;
    info!("seed has {} recent matches", seed_matches.len());

    let mut seen = HashSet::new();
    let mut players = Vec::new();
    for match_id in &seed_matches {
        let dto = match source.match_by_id(match_id) {
            Ok(dto) => dto,
            Err(err) if err.is_not_found() => {
                warn!(match_id, "seed match not found, skipping");
                continue;
            }
            Err(err) => return Err(err).with_context(|| format!("fetching match {match_id}")),
        };
        for puuid in participant_puuids(&dto) {
            push_unique(puuid, &mut seen, &mut players);
        }
    }

    Ok(players)
}

/// Union of every player's recent match ids, deduplicated within this run.
pub fn collect_match_ids<S: MatchSource>(
    source: &S,
    args: &HarvestArgs,
    players: &[String],
) -> Result<Vec<String>> {
    let query = args.query();
    let mut seen = HashSet::new();
    let mut match_ids = Vec::new();

    for (idx, puuid) in players.iter().enumerate() {
        debug!("[{}/{}] listing matches", idx + 1, players.len());
        let ids = source
            .match_ids_by_puuid(puuid, &query)
            .with_context(|| format!("listing matches of {puuid}"))?;
        for id in &ids {
            push_unique(id, &mut seen, &mut match_ids);
        }
    }

    Ok(match_ids)
}

/// Appends ids to `path`, one per line. Existing content is kept.
pub fn append_match_ids(path: &Path, match_ids: &[String]) -> Result<()> {
    create_parent_dir(path)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {} for append", path.display()))?;

    let mut writer = BufWriter::new(file);
    for id in match_ids {
        writeln!(writer, "{id}")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn run_harvest<S: MatchSource>(source: &S, args: &HarvestArgs) -> Result<HarvestSummary> {
    let players = collect_players(source, args)?;
    info!("collected {} distinct players", players.len());

    let match_ids = collect_match_ids(source, args, &players)?;
    append_match_ids(&args.out_file, &match_ids)?;
    info!(
        "appended {} match ids to {}",
        match_ids.len(),
        args.out_file.display()
    );

    Ok(HarvestSummary {
        players: players.len(),
        match_ids: match_ids.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::fake::FakeSource;
    use crate::match_data::fixtures::ten_player_match;
    use std::fs;

    fn args(out_file: PathBuf) -> HarvestArgs {
        HarvestArgs {
            seed: RiotId::parse("Seed#EUW").unwrap(),
            matches_per_player: 2,
            queue: 400,
            recency_cutoff: 1_700_000_000,
            out_file,
        }
    }

    fn source() -> FakeSource {
        let mut source = FakeSource::default();
        source.accounts.insert("Seed#EUW".into(), "p1".into());
        // Both seed matches feature p1..p10, so only ten distinct players exist.
        source.add_match(ten_player_match("M1", 0, true));
        source.add_match(ten_player_match("M2", 0, false));
        source.match_ids.insert("p1".into(), vec!["M1".into(), "M2".into(), "M9".into()]);
        source.match_ids.insert("p2".into(), vec!["M2".into(), "M3".into()]);
        source.match_ids.insert("p7".into(), vec!["M4".into()]);
        source
    }

    #[test]
    fn expands_seed_to_co_participants() {
        let src = source();
        let a = args(PathBuf::from("unused"));
        let players = collect_players(&src, &a).unwrap();
        assert_eq!(players.len(), 10);
        assert_eq!(players[0], "p1");

        let ids = collect_match_ids(&src, &a, &players).unwrap();
        assert_eq!(ids, vec!["M1", "M2", "M3", "M4"]);

        let queries = src.queries.borrow();
        assert!(queries.iter().all(|(_, q)| q.queue == Some(400)
            && q.count == 2
            && q.start_time == Some(1_700_000_000)
            && q.end_time.is_none()));
    }

    #[test]
    fn missing_seed_match_is_skipped() {
        let mut src = source();
        src.match_ids.insert("p1".into(), vec!["M9".into(), "M1".into()]);

        let players = collect_players(&src, &args(PathBuf::from("unused"))).unwrap();
        assert_eq!(players.len(), 10);
        assert_eq!(players[0], "p1");
    }

    #[test]
    fn unknown_seed_fails() {
        let src = FakeSource::default();
        assert!(collect_players(&src, &args(PathBuf::from("unused"))).is_err());
    }

    #[test]
    fn appends_across_runs() {
        let tmp = std::env::temp_dir().join("riot_match_stats_harvest");
        let _ = fs::remove_dir_all(&tmp);
        let out = tmp.join("manymatches.txt");

        let src = source();
        let summary = run_harvest(&src, &args(out.clone())).unwrap();
        assert_eq!(
            summary,
            HarvestSummary {
                players: 10,
                match_ids: 4
            }
        );
        run_harvest(&src, &args(out.clone())).unwrap();

        let text = fs::read_to_string(&out).unwrap();
        assert_eq!(text.lines().count(), 8);
        assert!(text.starts_with("M1\nM2\nM3\nM4\nM1\n"));

        let _ = fs::remove_dir_all(&tmp);
    }
}
