use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::formation::{Formation, FormationError, remap_positions};
use crate::model::Player;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineupError {
    #[error(transparent)]
    Formation(#[from] FormationError),
    #[error("slot {slot} does not exist in formation {formation}")]
    UnknownSlot { slot: String, formation: String },
    #[error("substitution needs a {0}")]
    MissingField(&'static str),
    #[error("no substitution at index {index} (have {len})")]
    SubstitutionIndex { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    #[serde(rename = "playerIn")]
    pub player_in: String,
    #[serde(rename = "playerOut")]
    pub player_out: String,
    pub minute: String,
}

/// The persisted shape of one match lineup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupRecord {
    pub match_id: String,
    pub formation: String,
    #[serde(default)]
    pub positions: BTreeMap<String, String>,
    #[serde(default)]
    pub substitutes: Vec<String>,
    #[serde(default)]
    pub not_called: Vec<String>,
    #[serde(default)]
    pub substitutions: Vec<Substitution>,
    #[serde(default)]
    pub match_comments: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragSource {
    Field,
    Bench,
    /// Picked from the roster list rather than from the board.
    Roster,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    pub player_id: String,
    pub source: DragSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Bench,
    Slot(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bucket {
    Slot(String),
    Bench,
    NotCalled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Unchanged,
    Moved,
    /// The previous occupant of the destination slot was moved to `to`.
    Swapped { displaced: String, to: Bucket },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineupState {
    match_id: String,
    formation: Formation,
    positions: BTreeMap<String, String>,
    bench: Vec<String>,
    not_called: Vec<String>,
    substitutions: Vec<Substitution>,
    comments: String,
}

impl LineupState {
    pub fn new(match_id: impl Into<String>) -> Self {
        Self {
            match_id: match_id.into(),
            formation: Formation::default(),
            positions: BTreeMap::new(),
            bench: Vec::new(),
            not_called: Vec::new(),
            substitutions: Vec::new(),
            comments: String::new(),
        }
    }

    pub fn from_record(record: &LineupRecord) -> Result<Self, LineupError> {
        let formation = Formation::parse(&record.formation)?;
        Ok(Self {
            match_id: record.match_id.clone(),
            formation,
            positions: record.positions.clone(),
            bench: dedup(&record.substitutes),
            not_called: dedup(&record.not_called),
            substitutions: record.substitutions.clone(),
            comments: record.match_comments.clone(),
        })
    }

    pub fn to_record(&self) -> LineupRecord {
        LineupRecord {
            match_id: self.match_id.clone(),
            formation: self.formation.to_string(),
            positions: self.positions.clone(),
            substitutes: self.bench.clone(),
            not_called: self.not_called.clone(),
            substitutions: self.substitutions.clone(),
            match_comments: self.comments.clone(),
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn formation(&self) -> &Formation {
        &self.formation
    }

    pub fn positions(&self) -> &BTreeMap<String, String> {
        &self.positions
    }

    pub fn bench(&self) -> &[String] {
        &self.bench
    }

    pub fn not_called(&self) -> &[String] {
        &self.not_called
    }

    pub fn substitutions(&self) -> &[Substitution] {
        &self.substitutions
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }

    /// Switch formations, carrying assignments over positionally. An invalid descriptor
    /// leaves the lineup untouched.
    pub fn set_formation(&mut self, raw: &str) -> Result<(), LineupError> {
        let next = Formation::parse(raw)?;
        self.positions = remap_positions(&self.formation, &next, &self.positions);
        self.formation = next;
        Ok(())
    }

    /// Overwrites whoever holds `slot`. The player is not removed from any other bucket.
    pub fn assign_to_slot(&mut self, slot: &str, player_id: &str) -> Result<(), LineupError> {
        self.ensure_slot(slot)?;
        self.positions
            .insert(slot.to_string(), player_id.to_string());
        Ok(())
    }

    pub fn clear_slot(&mut self, slot: &str) -> Option<String> {
        self.positions.remove(slot)
    }

    pub fn slot_of(&self, player_id: &str) -> Option<&str> {
        self.positions
            .iter()
            .find(|(_, p)| p.as_str() == player_id)
            .map(|(slot, _)| slot.as_str())
    }

    /// Returns true when the player ends up on the bench.
    pub fn toggle_bench(&mut self, player_id: &str) -> bool {
        toggle(&mut self.bench, player_id)
    }

    /// Returns true when the player ends up in the not-called list.
    pub fn toggle_not_called(&mut self, player_id: &str) -> bool {
        toggle(&mut self.not_called, player_id)
    }

    pub fn is_player_placed(&self, player_id: &str) -> bool {
        self.positions.values().any(|p| p == player_id)
            || self.bench.iter().any(|p| p == player_id)
            || self.not_called.iter().any(|p| p == player_id)
    }

    /// Roster entries still free for the selection lists.
    pub fn available_players<'a>(&self, roster: &'a [Player]) -> Vec<&'a Player> {
        roster
            .iter()
            .filter(|p| !p.deleted && !self.is_player_placed(&p.id))
            .collect()
    }

    pub fn add_substitution(
        &mut self,
        player_in: &str,
        player_out: &str,
        minute: &str,
    ) -> Result<(), LineupError> {
        let player_in = player_in.trim();
        let player_out = player_out.trim();
        let minute = minute.trim();
        if player_in.is_empty() {
            return Err(LineupError::MissingField("player coming in"));
        }
        if player_out.is_empty() {
            return Err(LineupError::MissingField("player going out"));
        }
        if minute.is_empty() {
            return Err(LineupError::MissingField("minute"));
        }
        self.substitutions.push(Substitution {
            player_in: player_in.to_string(),
            player_out: player_out.to_string(),
            minute: minute.to_string(),
        });
        Ok(())
    }

    pub fn remove_substitution(&mut self, index: usize) -> Result<Substitution, LineupError> {
        if index >= self.substitutions.len() {
            return Err(LineupError::SubstitutionIndex {
                index,
                len: self.substitutions.len(),
            });
        }
        Ok(self.substitutions.remove(index))
    }

    pub fn set_comments(&mut self, text: impl Into<String>) {
        self.comments = text.into();
    }

    /// Apply a drag-and-drop gesture.
    ///
    /// The dragged player leaves every bucket before landing, so a drop can never book a
    /// player twice. Dropping onto an occupied slot swaps: the previous occupant takes the
    /// dragged player's old slot when the drag started on the field, otherwise the bench.
    pub fn drop_player(
        &mut self,
        payload: &DragPayload,
        target: &DropTarget,
    ) -> Result<DropOutcome, LineupError> {
        let player = payload.player_id.as_str();
        match target {
            DropTarget::Bench => {
                if self.bench.iter().any(|p| p == player) && self.slot_of(player).is_none() {
                    return Ok(DropOutcome::Unchanged);
                }
                self.evict(player);
                self.bench.push(player.to_string());
                Ok(DropOutcome::Moved)
            }
            DropTarget::Slot(slot) => {
                self.ensure_slot(slot)?;
                let old_slot = self.slot_of(player).map(str::to_string);
                if old_slot.as_deref() == Some(slot.as_str()) {
                    return Ok(DropOutcome::Unchanged);
                }
                let displaced = self.positions.get(slot).cloned();
                self.evict(player);
                self.positions.insert(slot.clone(), player.to_string());

                let Some(displaced) = displaced else {
                    return Ok(DropOutcome::Moved);
                };
                let to = match (payload.source, old_slot) {
                    (DragSource::Field, Some(old)) => {
                        self.positions.insert(old.clone(), displaced.clone());
                        Bucket::Slot(old)
                    }
                    _ => {
                        if !self.bench.contains(&displaced) {
                            self.bench.push(displaced.clone());
                        }
                        Bucket::Bench
                    }
                };
                Ok(DropOutcome::Swapped { displaced, to })
            }
        }
    }

    /// Player ids booked in more than one place, e.g. in records written by older clients.
    pub fn duplicates(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        let all = self
            .positions
            .values()
            .chain(self.bench.iter())
            .chain(self.not_called.iter());
        for id in all {
            if !seen.insert(id.as_str()) && !dupes.contains(id) {
                dupes.push(id.clone());
            }
        }
        dupes
    }

    fn evict(&mut self, player_id: &str) {
        self.positions.retain(|_, p| p != player_id);
        self.bench.retain(|p| p != player_id);
        self.not_called.retain(|p| p != player_id);
    }

    fn ensure_slot(&self, slot: &str) -> Result<(), LineupError> {
        if self.formation.has_slot(slot) {
            return Ok(());
        }
        Err(LineupError::UnknownSlot {
            slot: slot.to_string(),
            formation: self.formation.to_string(),
        })
    }
}

fn toggle(list: &mut Vec<String>, player_id: &str) -> bool {
    if let Some(idx) = list.iter().position(|p| p == player_id) {
        list.remove(idx);
        false
    } else {
        list.push(player_id.to_string());
        true
    }
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
