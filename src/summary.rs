use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{Evaluation, PhysicalTest, Player, WellnessEntry};

/// Per-player totals, keyed by player id. Names are attached later by [`Roster`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSummary {
    pub player_id: String,
    pub matches: u32,
    pub minutes: u32,
    pub goals: u32,
    pub assists: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub rating_avg: Option<f64>,
}

impl PlayerSummary {
    pub fn goals_per_match(&self) -> f64 {
        per_match(self.goals, self.matches)
    }

    pub fn assists_per_match(&self) -> f64 {
        per_match(self.assists, self.matches)
    }

    pub fn minutes_per_match(&self) -> f64 {
        per_match(self.minutes, self.matches)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WellnessSummary {
    pub player_id: String,
    pub entries: u32,
    pub sleep: f64,
    pub fatigue: f64,
    pub soreness: f64,
    pub stress: f64,
    pub mood: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalBest {
    pub player_id: String,
    pub test: String,
    pub unit: String,
    pub best: f64,
    pub date: String,
    pub attempts: u32,
}

/// Resolves player ids to display names at presentation time.
pub struct Roster<'a> {
    by_id: HashMap<&'a str, &'a Player>,
}

impl<'a> Roster<'a> {
    pub fn new(players: &'a [Player]) -> Self {
        Self {
            by_id: players.iter().map(|p| (p.id.as_str(), p)).collect(),
        }
    }

    pub fn get(&self, player_id: &str) -> Option<&'a Player> {
        self.by_id.get(player_id).copied()
    }

    /// Unknown ids fall back to the id itself so nothing disappears from a report.
    pub fn display_name(&self, player_id: &str) -> String {
        self.get(player_id)
            .map(|p| p.display_name())
            .unwrap_or_else(|| player_id.to_string())
    }

    pub fn jersey(&self, player_id: &str) -> Option<u32> {
        self.get(player_id).and_then(|p| p.jersey_number)
    }

    /// Sort key: display name, then id to keep namesakes apart deterministically.
    pub fn sort_key(&self, player_id: &str) -> (String, String) {
        (
            self.display_name(player_id).to_lowercase(),
            player_id.to_string(),
        )
    }
}

#[derive(Default)]
struct EvalAcc {
    matches: HashSet<String>,
    minutes: u32,
    goals: u32,
    assists: u32,
    yellow: u32,
    red: u32,
    rating_sum: f64,
    rated: u32,
}

pub fn summarize_evaluations(rows: &[Evaluation]) -> Vec<PlayerSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut acc: HashMap<&str, EvalAcc> = HashMap::new();
    for row in rows {
        let entry = acc.entry(row.player_id.as_str()).or_insert_with(|| {
            order.push(row.player_id.as_str());
            EvalAcc::default()
        });
        entry.matches.insert(row.match_id.clone());
        entry.minutes = entry.minutes.saturating_add(row.minutes);
        entry.goals = entry.goals.saturating_add(row.goals);
        entry.assists = entry.assists.saturating_add(row.assists);
        entry.yellow = entry.yellow.saturating_add(row.yellow_cards);
        entry.red = entry.red.saturating_add(row.red_cards);
        if let Some(rating) = row.rating {
            entry.rating_sum += rating;
            entry.rated += 1;
        }
    }

    order
        .into_iter()
        .filter_map(|id| {
            let a = acc.remove(id)?;
            Some(PlayerSummary {
                player_id: id.to_string(),
                matches: a.matches.len() as u32,
                minutes: a.minutes,
                goals: a.goals,
                assists: a.assists,
                yellow_cards: a.yellow,
                red_cards: a.red,
                rating_avg: (a.rated > 0).then(|| a.rating_sum / f64::from(a.rated)),
            })
        })
        .collect()
}

pub fn summarize_wellness(rows: &[WellnessEntry]) -> Vec<WellnessSummary> {
    let mut grouped: BTreeMap<&str, Vec<&WellnessEntry>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.player_id.as_str()).or_default().push(row);
    }
    grouped
        .into_iter()
        .map(|(player_id, entries)| {
            let n = entries.len() as f64;
            let avg = |f: fn(&WellnessEntry) -> u8| {
                entries.iter().map(|e| f64::from(f(e))).sum::<f64>() / n
            };
            WellnessSummary {
                player_id: player_id.to_string(),
                entries: entries.len() as u32,
                sleep: avg(|e| e.sleep),
                fatigue: avg(|e| e.fatigue),
                soreness: avg(|e| e.soreness),
                stress: avg(|e| e.stress),
                mood: avg(|e| e.mood),
            }
        })
        .collect()
}

/// Best mark per player and test. Ties keep the earliest date.
pub fn best_physical_marks(rows: &[PhysicalTest]) -> Vec<PhysicalBest> {
    let mut best: BTreeMap<(&str, String), PhysicalBest> = BTreeMap::new();
    for row in rows {
        let key = (row.player_id.as_str(), row.test.to_lowercase());
        match best.get_mut(&key) {
            Some(current) => {
                current.attempts += 1;
                let better = if row.lower_is_better {
                    row.value < current.best
                } else {
                    row.value > current.best
                };
                let tie_earlier = row.value == current.best && row.date < current.date;
                if better || tie_earlier {
                    current.best = row.value;
                    current.date = row.date.clone();
                }
            }
            None => {
                best.insert(
                    key,
                    PhysicalBest {
                        player_id: row.player_id.clone(),
                        test: row.test.clone(),
                        unit: row.unit.clone(),
                        best: row.value,
                        date: row.date.clone(),
                        attempts: 1,
                    },
                );
            }
        }
    }
    best.into_values().collect()
}

pub fn format_avg(value: f64) -> String {
    format!("{value:.2}")
}

fn per_match(total: u32, matches: u32) -> f64 {
    if matches == 0 {
        return 0.0;
    }
    f64::from(total) / f64::from(matches)
}
