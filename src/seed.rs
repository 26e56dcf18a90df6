//! Demo data for a fresh database: one club, a squad, a few fixtures with lineups,
//! evaluations and some wellness, physical and medical history.

use anyhow::{Result, anyhow};
use chrono::{Duration as ChronoDuration, NaiveDate};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::formation::{self, Formation};
use crate::lineup::LineupState;
use crate::model::{
    Evaluation, Match, MedicalKind, MedicalRecord, MedicalStatus, Organization, PhysicalTest,
    Player, PositionCategory, Venue, WellnessEntry,
};
use crate::store::{Precondition, SaveOutcome, Store};
use crate::theme::Theme;

const SQUAD: &[(&str, u32, PositionCategory)] = &[
    ("Iker Sala", 1, PositionCategory::Goalkeeper),
    ("Pau Ferrer", 13, PositionCategory::Goalkeeper),
    ("Dani Ortega", 2, PositionCategory::Defender),
    ("Marc Soler", 3, PositionCategory::Defender),
    ("Hugo Prieto", 4, PositionCategory::Defender),
    ("Alex Vidal", 5, PositionCategory::Defender),
    ("Nico Serra", 15, PositionCategory::Defender),
    ("Ana Ruiz", 6, PositionCategory::Midfielder),
    ("Leo Campos", 8, PositionCategory::Midfielder),
    ("Bruno Gil", 10, PositionCategory::Midfielder),
    ("Eric Mora", 14, PositionCategory::Midfielder),
    ("Sergi Roca", 16, PositionCategory::Midfielder),
    ("Lucas Vega", 7, PositionCategory::Forward),
    ("Izan Costa", 9, PositionCategory::Forward),
    ("Teo Blanco", 11, PositionCategory::Forward),
    ("Gael Pons", 17, PositionCategory::Forward),
];

const OPPONENTS: &[&str] = &[
    "CF Atlètic Vila",
    "UD Montsant",
    "CE Riera",
    "Racing Llevant",
    "AE Pinar",
    "SD Castell",
];

const PHYSICAL_TESTS: &[(&str, &str, bool, f64, f64)] = &[
    ("Sprint 30m", "s", true, 4.0, 4.8),
    ("CMJ", "cm", false, 32.0, 48.0),
    ("Yo-Yo IR1", "m", false, 1200.0, 2200.0),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub players: usize,
    pub matches: usize,
    pub lineups: usize,
    pub evaluations: usize,
    pub wellness: usize,
    pub physical: usize,
    pub medical: usize,
}

pub fn seed_demo<R: Rng>(
    store: &Store,
    org_id: &str,
    start: NaiveDate,
    rng: &mut R,
) -> Result<SeedSummary> {
    store.upsert_organization(&Organization {
        id: org_id.to_string(),
        name: "Club Demo".to_string(),
        theme: Theme::default(),
    })?;
    let category = store.add_category(org_id, "Juvenil A")?;

    let mut summary = SeedSummary::default();
    let mut squad = Vec::with_capacity(SQUAD.len());
    for (name, number, position) in SQUAD {
        let player = store.save_player(
            org_id,
            &Player {
                id: String::new(),
                organization_id: org_id.to_string(),
                category_id: Some(category.id.clone()),
                name: name.to_string(),
                jersey_number: Some(*number),
                position: Some(*position),
                deleted: false,
            },
        )?;
        squad.push(player);
    }
    summary.players = squad.len();

    let presets = formation::presets();
    for (round, opponent) in OPPONENTS.iter().enumerate() {
        let day = start + ChronoDuration::days(7 * round as i64);
        let played = round + 2 < OPPONENTS.len();
        let fixture = store.save_match(
            org_id,
            &Match {
                id: String::new(),
                organization_id: org_id.to_string(),
                category_id: Some(category.id.clone()),
                opponent: opponent.to_string(),
                kickoff: format!("{} 11:00", day.format("%Y-%m-%d")),
                venue: if round % 2 == 0 { Venue::Home } else { Venue::Away },
                competition: Some("Liga".to_string()),
                goals_for: played.then(|| rng.gen_range(0..4)),
                goals_against: played.then(|| rng.gen_range(0..3)),
            },
        )?;
        summary.matches += 1;

        let shape = presets
            .choose(rng)
            .cloned()
            .unwrap_or_else(Formation::default);
        let lineup = random_lineup(&fixture.id, &shape, &squad, rng)?;
        match store.save_lineup(org_id, "seed", &lineup.to_record(), &Precondition::Any)? {
            SaveOutcome::Saved { .. } => summary.lineups += 1,
            SaveOutcome::Conflict { .. } => {
                return Err(anyhow!("unexpected lineup conflict for {}", fixture.id));
            }
        }

        if !played {
            continue;
        }
        for player_id in lineup.positions().values() {
            store.add_evaluation(
                org_id,
                &Evaluation {
                    id: String::new(),
                    match_id: fixture.id.clone(),
                    player_id: player_id.clone(),
                    minutes: *[90, 90, 90, 75, 60].choose(rng).unwrap_or(&90),
                    goals: u32::from(rng.gen_bool(0.15)),
                    assists: u32::from(rng.gen_bool(0.12)),
                    yellow_cards: u32::from(rng.gen_bool(0.1)),
                    red_cards: 0,
                    rating: Some(f64::from(rng.gen_range(50..=90u32)) / 10.0),
                    notes: String::new(),
                },
            )?;
            summary.evaluations += 1;
        }
    }

    for player in &squad {
        for offset in 0..5 {
            let date = start + ChronoDuration::days(offset);
            store.add_wellness(
                org_id,
                &WellnessEntry {
                    id: String::new(),
                    player_id: player.id.clone(),
                    date: date.format("%Y-%m-%d").to_string(),
                    sleep: rng.gen_range(2..=5),
                    fatigue: rng.gen_range(1..=4),
                    soreness: rng.gen_range(1..=4),
                    stress: rng.gen_range(1..=3),
                    mood: rng.gen_range(3..=5),
                    notes: String::new(),
                },
            )?;
            summary.wellness += 1;
        }
        for (test, unit, lower_is_better, lo, hi) in PHYSICAL_TESTS {
            for attempt in 0..2 {
                let date = start + ChronoDuration::days(14 * attempt);
                let value = rng.gen_range(*lo..*hi);
                store.add_physical_test(
                    org_id,
                    &PhysicalTest {
                        id: String::new(),
                        player_id: player.id.clone(),
                        date: date.format("%Y-%m-%d").to_string(),
                        test: test.to_string(),
                        value: (value * 100.0).round() / 100.0,
                        unit: unit.to_string(),
                        lower_is_better: *lower_is_better,
                    },
                )?;
                summary.physical += 1;
            }
        }
    }

    if let Some(injured) = squad.choose(rng) {
        store.add_medical_record(
            org_id,
            &MedicalRecord {
                id: String::new(),
                player_id: injured.id.clone(),
                kind: MedicalKind::Injury,
                description: "Sobrecarga en isquiotibiales".to_string(),
                started_on: start.format("%Y-%m-%d").to_string(),
                expected_return: Some(
                    (start + ChronoDuration::days(21))
                        .format("%Y-%m-%d")
                        .to_string(),
                ),
                status: MedicalStatus::Active,
            },
        )?;
        summary.medical += 1;
    }

    log::info!(
        "seeded {}: {} players, {} matches, {} evaluations",
        org_id,
        summary.players,
        summary.matches,
        summary.evaluations
    );
    Ok(summary)
}

/// Keepers go in goal, everyone else fills the outfield in shuffled order; leftovers go to
/// the bench except one who is left out.
fn random_lineup<R: Rng>(
    match_id: &str,
    shape: &Formation,
    squad: &[Player],
    rng: &mut R,
) -> Result<LineupState> {
    let mut lineup = LineupState::new(match_id);
    lineup.set_formation(&shape.to_string())?;

    let mut keepers: Vec<&Player> = squad
        .iter()
        .filter(|p| p.position == Some(PositionCategory::Goalkeeper))
        .collect();
    let mut outfield: Vec<&Player> = squad
        .iter()
        .filter(|p| p.position != Some(PositionCategory::Goalkeeper))
        .collect();
    keepers.shuffle(rng);
    outfield.shuffle(rng);

    let mut rest = Vec::new();
    let mut outfield_iter = outfield.into_iter();
    for slot in shape.layout() {
        let pick = if slot.is_goalkeeper() {
            keepers.pop()
        } else {
            outfield_iter.next()
        };
        if let Some(player) = pick {
            lineup.assign_to_slot(&slot.label, &player.id)?;
        }
    }
    rest.extend(keepers);
    rest.extend(outfield_iter);

    if let Some((left_out, bench)) = rest.split_last() {
        for player in bench {
            lineup.toggle_bench(&player.id);
        }
        lineup.toggle_not_called(&left_out.id);
    }
    Ok(lineup)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn demo_lineups_are_complete_and_consistent() {
        let store = Store::open_in_memory().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let start = NaiveDate::from_ymd_opt(2025, 9, 6).unwrap();
        let summary = seed_demo(&store, "demo", start, &mut rng).unwrap();
        assert_eq!(summary.players, SQUAD.len());
        assert_eq!(summary.lineups, OPPONENTS.len());
        assert_eq!(summary.medical, 1);

        for m in store.matches("demo").unwrap() {
            let stored = store.load_lineup("demo", &m.id).unwrap().unwrap();
            let state = LineupState::from_record(&stored.record).unwrap();
            assert_eq!(state.positions().len(), 11);
            assert!(state.duplicates().is_empty());
            assert_eq!(
                state.positions().len() + state.bench().len() + state.not_called().len(),
                SQUAD.len()
            );
        }
    }
}
