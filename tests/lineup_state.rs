use clubdesk::lineup::{
    Bucket, DragPayload, DragSource, DropOutcome, DropTarget, LineupError, LineupState,
};
use clubdesk::model::Player;

fn player(id: &str) -> Player {
    Player {
        id: id.to_string(),
        organization_id: "org".to_string(),
        category_id: None,
        name: id.to_uppercase(),
        jersey_number: None,
        position: None,
        deleted: false,
    }
}

fn drag(id: &str, source: DragSource) -> DragPayload {
    DragPayload {
        player_id: id.to_string(),
        source,
    }
}

#[test]
fn placed_reports_each_bucket() {
    let mut state = LineupState::new("m1");
    state.assign_to_slot("GK", "p1").unwrap();
    state.toggle_bench("p2");
    state.toggle_not_called("p3");

    assert!(state.is_player_placed("p1"));
    assert!(state.is_player_placed("p2"));
    assert!(state.is_player_placed("p3"));
    assert!(!state.is_player_placed("p4"));

    let roster = vec![player("p1"), player("p2"), player("p3"), player("p4")];
    let free: Vec<&str> = state
        .available_players(&roster)
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(free, vec!["p4"]);
}

#[test]
fn invalid_formations_leave_state_untouched() {
    let mut state = LineupState::new("m1");
    state.assign_to_slot("MID2", "p1").unwrap();
    let before = state.clone();
    for raw in ["4-3", "4-4-3", "a-b-c", ""] {
        assert!(state.set_formation(raw).is_err(), "{raw}");
        assert_eq!(state, before);
    }
    assert_eq!(state.formation().to_string(), "4-3-3");
}

#[test]
fn formation_change_carries_players() {
    let mut state = LineupState::new("m1");
    state.assign_to_slot("GK", "keeper").unwrap();
    state.assign_to_slot("MID2", "pivot").unwrap();
    state.set_formation("4-4-2").unwrap();
    assert_eq!(state.positions().get("GK").map(String::as_str), Some("keeper"));
    assert_eq!(state.positions().get("MID2").map(String::as_str), Some("pivot"));
}

#[test]
fn unknown_slot_is_rejected() {
    let mut state = LineupState::new("m1");
    let err = state.assign_to_slot("AMF1", "p1").unwrap_err();
    assert!(matches!(err, LineupError::UnknownSlot { .. }));
}

#[test]
fn drop_onto_empty_slot_moves_from_bench() {
    let mut state = LineupState::new("m1");
    state.toggle_bench("p1");
    let outcome = state
        .drop_player(&drag("p1", DragSource::Bench), &DropTarget::Slot("FWD1".into()))
        .unwrap();
    assert_eq!(outcome, DropOutcome::Moved);
    assert_eq!(state.slot_of("p1"), Some("FWD1"));
    assert!(state.bench().is_empty());
    assert!(state.duplicates().is_empty());
}

#[test]
fn drop_between_slots_swaps_occupants() {
    let mut state = LineupState::new("m1");
    state.assign_to_slot("DEF1", "a").unwrap();
    state.assign_to_slot("DEF2", "b").unwrap();
    let outcome = state
        .drop_player(&drag("a", DragSource::Field), &DropTarget::Slot("DEF2".into()))
        .unwrap();
    assert_eq!(
        outcome,
        DropOutcome::Swapped {
            displaced: "b".to_string(),
            to: Bucket::Slot("DEF1".to_string()),
        }
    );
    assert_eq!(state.slot_of("a"), Some("DEF2"));
    assert_eq!(state.slot_of("b"), Some("DEF1"));
}

#[test]
fn drop_from_bench_onto_occupied_slot_benches_the_occupant() {
    let mut state = LineupState::new("m1");
    state.assign_to_slot("FWD2", "starter").unwrap();
    state.toggle_bench("sub");
    let outcome = state
        .drop_player(&drag("sub", DragSource::Bench), &DropTarget::Slot("FWD2".into()))
        .unwrap();
    assert_eq!(
        outcome,
        DropOutcome::Swapped {
            displaced: "starter".to_string(),
            to: Bucket::Bench,
        }
    );
    assert_eq!(state.bench(), ["starter".to_string()]);
    assert!(state.duplicates().is_empty());
}

#[test]
fn drop_from_not_called_list_clears_it() {
    let mut state = LineupState::new("m1");
    state.toggle_not_called("p9");
    state
        .drop_player(&drag("p9", DragSource::Roster), &DropTarget::Bench)
        .unwrap();
    assert!(state.not_called().is_empty());
    assert_eq!(state.bench(), ["p9".to_string()]);
}

#[test]
fn substitutions_need_every_field() {
    let mut state = LineupState::new("m1");
    assert_eq!(
        state.add_substitution("p1", " ", "60"),
        Err(LineupError::MissingField("player going out"))
    );
    assert_eq!(
        state.add_substitution("p1", "p2", ""),
        Err(LineupError::MissingField("minute"))
    );
    state.add_substitution(" p1 ", "p2", "60").unwrap();
    assert_eq!(state.substitutions()[0].player_in, "p1");
    assert!(state.remove_substitution(3).is_err());
    assert_eq!(state.remove_substitution(0).unwrap().minute, "60");
}

#[test]
fn record_round_trip_keeps_everything() {
    let mut state = LineupState::new("m1");
    state.set_formation("4-2-3-1").unwrap();
    state.assign_to_slot("GK", "p1").unwrap();
    state.assign_to_slot("AMF2", "p10").unwrap();
    state.toggle_bench("p12");
    state.toggle_not_called("p20");
    state.add_substitution("p12", "p10", "70").unwrap();
    state.set_comments("Buen partido");

    let record = state.to_record();
    assert_eq!(record.formation, "4-2-3-1");
    let back = LineupState::from_record(&record).unwrap();
    assert_eq!(back, state);
}
