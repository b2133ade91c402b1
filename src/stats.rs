use crate::match_data::PastMatchOutcome;

/// Statistics derived from a non-empty window of past matches.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStats {
    pub winrate: u32,
    pub champ_winrate: u32,
    pub avg_kda: f64,
    pub champ_avg_kda: f64,
    /// Positive for an active win streak, negative for a loss streak.
    pub streak: i32,
    /// Share of the window played on the current champion, in percent.
    pub consistency: u32,
}

/// Per-player block of a game record. `history` is `None` when the player had no
/// past matches in the window, which is kept apart from a genuine zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatBlock {
    pub history: Option<HistoryStats>,
    pub champion_mastery: i64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct WinLossTally {
    pub wins: u32,
    pub losses: u32,
    pub champ_wins: u32,
    pub champ_losses: u32,
    pub kda: Vec<f64>,
    pub champ_kda: Vec<f64>,
}

pub fn tally(history: &[PastMatchOutcome], champion_id: i64) -> WinLossTally {
    let mut t = WinLossTally::default();

    for game in history {
        let on_champion = game.champion_id == champion_id;
        if game.win {
            t.wins += 1;
            if on_champion {
                t.champ_wins += 1;
            }
        } else {
            t.losses += 1;
            if on_champion {
                t.champ_losses += 1;
            }
        }

        t.kda.push(game.kda);
        if on_champion {
            t.champ_kda.push(game.kda);
        }
    }

    t
}

/// Integer percentage; 0 when there are no games.
pub fn win_rate(wins: u32, losses: u32) -> u32 {
    let total = (wins + losses).max(1) as f64;
    (100.0 * wins as f64 / total).round_ties_even() as u32
}

/// Mean after discarding values outside two population standard deviations,
/// rounded to three decimals. Falls back to the untrimmed list when trimming
/// would drop everything, so `[x]` yields `x`.
pub fn trimmed_average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();

    let trimmed: Vec<f64> = values
        .iter()
        .copied()
        .filter(|&v| v > mean - 2.0 * sd && v < mean + 2.0 * sd)
        .collect();
    let kept = if trimmed.is_empty() { values } else { &trimmed[..] };

    round3(kept.iter().sum::<f64>() / kept.len() as f64)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round_ties_even() / 1000.0
}

/// Latest unbroken run of equal outcomes, most recent game first.
pub fn count_streak(history: &[PastMatchOutcome]) -> i32 {
    let Some(first) = history.first() else {
        return 0;
    };

    let run = history.iter().take_while(|g| g.win == first.win).count() as i32;
    if first.win { run } else { -run }
}

pub fn consistency(t: &WinLossTally) -> u32 {
    let total = (t.wins + t.losses).max(1) as f64;
    (100.0 * (t.champ_wins + t.champ_losses) as f64 / total).round_ties_even() as u32
}

/// Champion-specific KDA, or the overall KDA when the champion was not played in
/// the window.
pub fn champ_avg_kda(t: &WinLossTally, avg_kda: f64) -> f64 {
    if t.champ_kda.is_empty() {
        avg_kda
    } else {
        trimmed_average(&t.champ_kda)
    }
}

/// Returns `None` for an empty history.
pub fn aggregate(history: &[PastMatchOutcome], champion_id: i64) -> Option<HistoryStats> {
    if history.is_empty() {
        return None;
    }

    let t = tally(history, champion_id);
    let avg_kda = trimmed_average(&t.kda);

    Some(HistoryStats {
        winrate: win_rate(t.wins, t.losses),
        champ_winrate: win_rate(t.champ_wins, t.champ_losses),
        avg_kda,
        champ_avg_kda: champ_avg_kda(&t, avg_kda),
        streak: count_streak(history),
        consistency: consistency(&t),
    })
}
