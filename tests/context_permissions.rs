use std::collections::HashMap;
use std::fs;
use std::path::Path;

use clubdesk::context::{AppContext, Session};
use clubdesk::model::{Evaluation, Match, Organization, Player, Venue, WellnessEntry};
use clubdesk::notify::NoticeLevel;
use clubdesk::permissions::{AccessLevel, Claims, Role, Section};
use clubdesk::store::{SaveOutcome, Store};
use clubdesk::theme::Theme;

fn session(role: Role, access: &[(&str, &str)], categories: &[&str]) -> Session {
    Session {
        user_id: "u1".to_string(),
        email: "coach@club.test".to_string(),
        organization_id: "org-a".to_string(),
        claims: Claims {
            role,
            access: access
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            coach_categories: categories.iter().map(|c| c.to_string()).collect(),
        },
    }
}

fn seeded_store(path: Option<&Path>) -> Store {
    let store = match path {
        Some(path) => Store::open(path).unwrap(),
        None => Store::open_in_memory().unwrap(),
    };
    store
        .upsert_organization(&Organization {
            id: "org-a".to_string(),
            name: "Club A".to_string(),
            theme: Theme::new("#112233", "#ffffff", "#ffcc00").unwrap(),
        })
        .unwrap();
    store
        .save_match(
            "org-a",
            &Match {
                id: "m1".to_string(),
                organization_id: "org-a".to_string(),
                category_id: Some("cat-u19".to_string()),
                opponent: "Rival".to_string(),
                kickoff: "2025-09-06 11:00".to_string(),
                venue: Venue::Away,
                competition: None,
                goals_for: None,
                goals_against: None,
            },
        )
        .unwrap();
    store
        .save_player(
            "org-a",
            &Player {
                id: "p1".to_string(),
                organization_id: "org-a".to_string(),
                category_id: Some("cat-u19".to_string()),
                name: "Ana".to_string(),
                jersey_number: Some(1),
                position: None,
                deleted: false,
            },
        )
        .unwrap();
    store
}

#[test]
fn initialize_loads_theme_and_teardown_returns_notices() {
    let store = seeded_store(None);
    let mut ctx = AppContext::with_store(store, session(Role::Admin, &[], &[]), 50).unwrap();
    assert_eq!(ctx.theme().primary, "#112233");
    assert_eq!(ctx.organization().name, "Club A");

    ctx.notices_mut().info("hello");
    let pending = ctx.teardown().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].text, "hello");
}

#[test]
fn unknown_organization_falls_back_to_default_theme() {
    let store = Store::open_in_memory().unwrap();
    let ctx = AppContext::with_store(store, session(Role::Admin, &[], &[]), 50).unwrap();
    assert_eq!(ctx.theme(), &Theme::default());
    assert_eq!(ctx.notices().len(), 1);
}

#[test]
fn closed_section_redirects_with_a_warning() {
    let store = seeded_store(None);
    let mut ctx = AppContext::with_store(
        store,
        session(Role::Staff, &[("medical", "view"), ("wellness", "edit")], &[]),
        50,
    )
    .unwrap();

    let err = ctx
        .require(Section::Lineups, AccessLevel::View)
        .unwrap_err()
        .to_string();
    assert!(err.contains("medical"), "{err}");
    let last = ctx.notices().iter().last().unwrap();
    assert_eq!(last.level, NoticeLevel::Warn);

    assert!(ctx.require(Section::Wellness, AccessLevel::Edit).is_ok());
    assert!(ctx.require(Section::Medical, AccessLevel::Edit).is_err());
    assert!(ctx.require(Section::Dashboard, AccessLevel::View).is_ok());
}

#[test]
fn coach_edits_lineups_only_for_own_category() {
    let store = seeded_store(None);
    let mut coach = AppContext::with_store(
        store,
        session(Role::Coach, &[("lineups", "view")], &["cat-u19"]),
        50,
    )
    .unwrap();

    let mut draft = coach.open_lineup("m1").unwrap();
    assert!(draft.etag.is_none());
    draft.state.assign_to_slot("GK", "p1").unwrap();
    assert!(matches!(
        coach.save_lineup(&mut draft).unwrap(),
        SaveOutcome::Saved { .. }
    ));
    assert!(coach.require(Section::Lineups, AccessLevel::Edit).is_err());
    assert!(
        coach
            .require_in(Section::Lineups, Some("cat-u19"), AccessLevel::Edit)
            .is_ok()
    );
    assert!(
        coach
            .require_in(Section::Medical, Some("cat-u19"), AccessLevel::Edit)
            .is_err()
    );
}

#[test]
fn coach_records_tracking_data_for_own_category() {
    let store = seeded_store(None);
    let mut coach =
        AppContext::with_store(store, session(Role::Coach, &[], &["cat-u19"]), 50).unwrap();

    assert!(coach.require(Section::Evaluations, AccessLevel::Edit).is_err());
    coach
        .require_for_match(Section::Evaluations, "m1", AccessLevel::Edit)
        .unwrap();
    let saved = coach
        .store()
        .add_evaluation(
            "org-a",
            &Evaluation {
                id: String::new(),
                match_id: "m1".to_string(),
                player_id: "p1".to_string(),
                minutes: 90,
                goals: 1,
                assists: 0,
                yellow_cards: 0,
                red_cards: 0,
                rating: Some(7.5),
                notes: String::new(),
            },
        )
        .unwrap();
    assert!(!saved.id.is_empty());

    coach
        .require_for_player(Section::Wellness, "p1", AccessLevel::Edit)
        .unwrap();
    coach
        .store()
        .add_wellness(
            "org-a",
            &WellnessEntry {
                id: String::new(),
                player_id: "p1".to_string(),
                date: "2025-09-05".to_string(),
                sleep: 4,
                fatigue: 2,
                soreness: 2,
                stress: 1,
                mood: 4,
                notes: String::new(),
            },
        )
        .unwrap();
    coach
        .require_for_player(Section::Medical, "p1", AccessLevel::View)
        .unwrap();
    assert!(
        coach
            .require_for_player(Section::Medical, "p1", AccessLevel::Edit)
            .is_err()
    );
    assert!(
        coach
            .require_for_player(Section::Wellness, "ghost", AccessLevel::Edit)
            .is_err()
    );
}

#[test]
fn concurrent_editors_do_not_overwrite_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("club.sqlite");
    let first_store = seeded_store(Some(&db));
    let second_store = Store::open(&db).unwrap();

    let mut alice = AppContext::with_store(first_store, session(Role::Admin, &[], &[]), 50).unwrap();
    let mut bob = AppContext::with_store(second_store, session(Role::Admin, &[], &[]), 50).unwrap();

    let mut a = alice.open_lineup("m1").unwrap();
    let mut b = bob.open_lineup("m1").unwrap();

    a.state.assign_to_slot("GK", "p1").unwrap();
    assert!(matches!(
        alice.save_lineup(&mut a).unwrap(),
        SaveOutcome::Saved { .. }
    ));

    b.state.set_comments("bob was here");
    assert!(matches!(
        bob.save_lineup(&mut b).unwrap(),
        SaveOutcome::Conflict { current_etag: Some(_) }
    ));

    let mut reloaded = bob.open_lineup("m1").unwrap();
    assert_eq!(
        reloaded.state.positions().get("GK").map(String::as_str),
        Some("p1")
    );
    reloaded.state.set_comments("bob was here");
    assert!(matches!(
        bob.save_lineup(&mut reloaded).unwrap(),
        SaveOutcome::Saved { .. }
    ));

    let again = alice.open_lineup("m1").unwrap();
    assert_eq!(again.state.comments(), "bob was here");
    assert_eq!(again.state.positions().len(), 1);
}

#[test]
fn session_file_is_validated() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("session.json");
    fs::write(
        &good,
        r#"{"user_id":"u1","email":"a@b.c","organization_id":"org-a",
            "claims":{"role":"coach","access":{"lineups":"write"},"coach_categories":["c1"]}}"#,
    )
    .unwrap();
    let loaded = Session::load(&good).unwrap();
    assert_eq!(loaded.claims.role, Role::Coach);
    assert_eq!(loaded.claims.access.get("lineups").map(String::as_str), Some("write"));

    let bad = dir.path().join("bad.json");
    fs::write(&bad, r#"{"user_id":"","email":"","organization_id":"org-a"}"#).unwrap();
    assert!(Session::load(&bad).is_err());
    assert!(Session::load(&dir.path().join("missing.json")).is_err());
}
