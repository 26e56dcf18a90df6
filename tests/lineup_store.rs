use std::collections::BTreeMap;

use clubdesk::lineup::{LineupRecord, Substitution};
use clubdesk::model::{
    Evaluation, Match, MedicalKind, MedicalRecord, MedicalStatus, Organization, Player, Venue,
    WellnessEntry,
};
use clubdesk::store::{Precondition, SaveOutcome, Store};
use clubdesk::theme::Theme;

fn store_with_match(org: &str, match_id: &str) -> Store {
    let store = Store::open_in_memory().unwrap();
    add_org_and_match(&store, org, match_id);
    store
}

fn add_org_and_match(store: &Store, org: &str, match_id: &str) {
    store
        .upsert_organization(&Organization {
            id: org.to_string(),
            name: org.to_uppercase(),
            theme: Theme::default(),
        })
        .unwrap();
    store
        .save_match(
            org,
            &Match {
                id: match_id.to_string(),
                organization_id: org.to_string(),
                category_id: None,
                opponent: "Rival".to_string(),
                kickoff: "2025-09-06 11:00".to_string(),
                venue: Venue::Home,
                competition: None,
                goals_for: None,
                goals_against: None,
            },
        )
        .unwrap();
}

fn m1_record() -> LineupRecord {
    let mut positions = BTreeMap::new();
    positions.insert("GK".to_string(), "p1".to_string());
    positions.insert("DEF1".to_string(), "p2".to_string());
    LineupRecord {
        match_id: "m1".to_string(),
        formation: "4-3-3".to_string(),
        positions,
        substitutes: vec!["p12".to_string()],
        not_called: vec!["p20".to_string()],
        substitutions: vec![Substitution {
            player_in: "p12".to_string(),
            player_out: "p2".to_string(),
            minute: "60".to_string(),
        }],
        match_comments: "ok".to_string(),
    }
}

fn saved_etag(outcome: SaveOutcome) -> String {
    match outcome {
        SaveOutcome::Saved { etag } => etag,
        SaveOutcome::Conflict { .. } => panic!("expected save, got {outcome:?}"),
    }
}

#[test]
fn saved_lineup_reloads_identically() {
    let store = store_with_match("org-a", "m1");
    let record = m1_record();
    let etag = saved_etag(
        store
            .save_lineup("org-a", "coach", &record, &Precondition::Any)
            .unwrap(),
    );

    let loaded = store.load_lineup("org-a", "m1").unwrap().unwrap();
    assert_eq!(loaded.record, record);
    assert_eq!(loaded.etag, etag);
    assert_eq!(loaded.updated_by, "coach");
}

#[test]
fn missing_lineup_is_none() {
    let store = store_with_match("org-a", "m1");
    assert!(store.load_lineup("org-a", "m1").unwrap().is_none());
}

#[test]
fn stale_etag_is_rejected_without_writing() {
    let store = store_with_match("org-a", "m1");
    let first = saved_etag(
        store
            .save_lineup("org-a", "u1", &m1_record(), &Precondition::IfAbsent)
            .unwrap(),
    );

    let mut newer = m1_record();
    newer.match_comments = "second".to_string();
    let second = saved_etag(
        store
            .save_lineup("org-a", "u2", &newer, &Precondition::IfMatch(first.clone()))
            .unwrap(),
    );
    assert_ne!(first, second);

    let mut stale = m1_record();
    stale.match_comments = "stale".to_string();
    let outcome = store
        .save_lineup("org-a", "u1", &stale, &Precondition::IfMatch(first))
        .unwrap();
    assert_eq!(
        outcome,
        SaveOutcome::Conflict {
            current_etag: Some(second.clone())
        }
    );

    let loaded = store.load_lineup("org-a", "m1").unwrap().unwrap();
    assert_eq!(loaded.record.match_comments, "second");
    assert_eq!(loaded.etag, second);
}

#[test]
fn create_only_save_conflicts_with_existing_row() {
    let store = store_with_match("org-a", "m1");
    saved_etag(
        store
            .save_lineup("org-a", "u1", &m1_record(), &Precondition::IfAbsent)
            .unwrap(),
    );
    let outcome = store
        .save_lineup("org-a", "u2", &m1_record(), &Precondition::IfAbsent)
        .unwrap();
    assert!(matches!(outcome, SaveOutcome::Conflict { current_etag: Some(_) }));
}

#[test]
fn lineups_are_scoped_per_organization() {
    let store = store_with_match("org-a", "m1");
    add_org_and_match(&store, "org-b", "m1-b");
    saved_etag(
        store
            .save_lineup("org-a", "u1", &m1_record(), &Precondition::Any)
            .unwrap(),
    );

    assert!(store.load_lineup("org-b", "m1").unwrap().is_none());
    // org-b cannot write a lineup for a match it does not own.
    assert!(
        store
            .save_lineup("org-b", "u9", &m1_record(), &Precondition::Any)
            .is_err()
    );
    assert!(!store.delete_lineup("org-b", "m1").unwrap());
    assert!(store.load_lineup("org-a", "m1").unwrap().is_some());
}

#[test]
fn players_cannot_be_taken_over_by_another_organization() {
    let store = store_with_match("org-a", "m1");
    let player = store
        .save_player(
            "org-a",
            &Player {
                id: "p1".to_string(),
                organization_id: "org-a".to_string(),
                category_id: None,
                name: "  Ana  ".to_string(),
                jersey_number: Some(9),
                position: None,
                deleted: false,
            },
        )
        .unwrap();
    assert_eq!(player.name, "Ana");

    let mut hijack = player.clone();
    hijack.name = "Mallory".to_string();
    assert!(store.save_player("org-b", &hijack).is_err());
    assert!(store.player("org-b", "p1").unwrap().is_none());
    assert_eq!(store.player("org-a", "p1").unwrap().unwrap().name, "Ana");
}

#[test]
fn soft_deleted_players_stay_resolvable() {
    let store = store_with_match("org-a", "m1");
    store
        .save_player(
            "org-a",
            &Player {
                id: "p1".to_string(),
                organization_id: "org-a".to_string(),
                category_id: None,
                name: "Luis".to_string(),
                jersey_number: None,
                position: None,
                deleted: false,
            },
        )
        .unwrap();
    assert!(store.soft_delete_player("org-a", "p1").unwrap());
    assert!(store.players("org-a", false).unwrap().is_empty());
    let all = store.players("org-a", true).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].display_name(), "Luis (baja)");
}

#[test]
fn wellness_is_one_entry_per_player_and_day() {
    let store = store_with_match("org-a", "m1");
    store
        .save_player(
            "org-a",
            &Player {
                id: "p1".to_string(),
                organization_id: "org-a".to_string(),
                category_id: None,
                name: "Ana".to_string(),
                jersey_number: None,
                position: None,
                deleted: false,
            },
        )
        .unwrap();
    let mut entry = WellnessEntry {
        id: String::new(),
        player_id: "p1".to_string(),
        date: "2025-03-01".to_string(),
        sleep: 4,
        fatigue: 2,
        soreness: 2,
        stress: 1,
        mood: 5,
        notes: String::new(),
    };
    store.add_wellness("org-a", &entry).unwrap();
    entry.sleep = 2;
    store.add_wellness("org-a", &entry).unwrap();

    let rows = store.wellness("org-a", Some("p1")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sleep, 2);

    entry.mood = 6;
    assert!(store.add_wellness("org-a", &entry).is_err());
    entry.mood = 3;
    entry.date = "2025-02-30".to_string();
    assert!(store.add_wellness("org-a", &entry).is_err());
}

fn store_with_player(org: &str, player_id: &str) -> Store {
    let store = store_with_match(org, "m1");
    store
        .save_player(
            org,
            &Player {
                id: player_id.to_string(),
                organization_id: org.to_string(),
                category_id: None,
                name: "Ana".to_string(),
                jersey_number: None,
                position: None,
                deleted: false,
            },
        )
        .unwrap();
    store
}

#[test]
fn padded_dates_land_on_the_same_day() {
    let store = store_with_player("org-a", "p1");
    let mut entry = WellnessEntry {
        id: String::new(),
        player_id: "p1".to_string(),
        date: " 2025-03-01".to_string(),
        sleep: 4,
        fatigue: 2,
        soreness: 2,
        stress: 1,
        mood: 5,
        notes: String::new(),
    };
    let first = store.add_wellness("org-a", &entry).unwrap();
    assert_eq!(first.date, "2025-03-01");
    entry.date = "2025-03-01".to_string();
    entry.mood = 3;
    store.add_wellness("org-a", &entry).unwrap();

    let rows = store.wellness("org-a", Some("p1")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date, "2025-03-01");
    assert_eq!(rows[0].mood, 3);

    let record = store
        .add_medical_record(
            "org-a",
            &MedicalRecord {
                id: String::new(),
                player_id: "p1".to_string(),
                kind: MedicalKind::Injury,
                description: "Esguince".to_string(),
                started_on: "2025-03-02 ".to_string(),
                expected_return: Some(" 2025-03-20".to_string()),
                status: MedicalStatus::Active,
            },
        )
        .unwrap();
    assert_eq!(record.started_on, "2025-03-02");
    assert_eq!(record.expected_return.as_deref(), Some("2025-03-20"));
}

#[test]
fn implausible_evaluations_are_rejected() {
    let store = store_with_player("org-a", "p1");
    let mut eval = Evaluation {
        id: String::new(),
        match_id: "m1".to_string(),
        player_id: "p1".to_string(),
        minutes: 90,
        goals: 2,
        assists: 1,
        yellow_cards: 1,
        red_cards: 0,
        rating: Some(8.0),
        notes: String::new(),
    };
    store.add_evaluation("org-a", &eval).unwrap();

    eval.minutes = u32::MAX;
    assert!(store.add_evaluation("org-a", &eval).is_err());
    eval.minutes = 90;
    eval.yellow_cards = 3;
    assert!(store.add_evaluation("org-a", &eval).is_err());
    eval.yellow_cards = 0;
    eval.red_cards = 2;
    assert!(store.add_evaluation("org-a", &eval).is_err());

    assert_eq!(store.evaluations("org-a", None, None).unwrap().len(), 1);
}

#[test]
fn active_injuries_leave_out_illnesses() {
    let store = store_with_player("org-a", "p1");
    let record = |kind: MedicalKind, description: &str| MedicalRecord {
        id: String::new(),
        player_id: "p1".to_string(),
        kind,
        description: description.to_string(),
        started_on: "2025-03-01".to_string(),
        expected_return: None,
        status: MedicalStatus::Active,
    };
    let injury = store
        .add_medical_record("org-a", &record(MedicalKind::Injury, "Rotura fibrilar"))
        .unwrap();
    store
        .add_medical_record("org-a", &record(MedicalKind::Illness, "Gripe"))
        .unwrap();

    let injuries = store.active_injuries("org-a").unwrap();
    assert_eq!(injuries.len(), 1);
    assert_eq!(injuries[0].id, injury.id);
    assert_eq!(store.active_medical_records("org-a").unwrap().len(), 2);
    assert_eq!(
        store
            .medical_record("org-a", &injury.id)
            .unwrap()
            .map(|r| r.kind),
        Some(MedicalKind::Injury)
    );
}
