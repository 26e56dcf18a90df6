use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const OUTFIELD_PLAYERS: u32 = 10;
pub const GOALKEEPER_SLOT: &str = "GK";

const GOALKEEPER_TOP: f64 = 85.0;
const GOALKEEPER_LEFT: f64 = 50.0;

const THREE_LINE_TOPS: [f64; 3] = [70.0, 50.0, 25.0];
const THREE_LINE_PREFIXES: [&str; 3] = ["DEF", "MID", "FWD"];
const FOUR_LINE_TOPS: [f64; 4] = [70.0, 55.0, 40.0, 20.0];
const FOUR_LINE_PREFIXES: [&str; 4] = ["DEF", "DMF", "AMF", "FWD"];

const PRESET_FORMATIONS: &[&str] = &[
    "4-4-2", "4-3-3", "3-5-2", "3-4-3", "5-3-2", "5-4-1", "4-5-1", "4-2-3-1", "4-1-4-1",
    "3-4-2-1", "4-3-2-1", "4-4-1-1",
];

static FORMATION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+-\d+-\d+(-\d+)?$").expect("formation pattern compiles"));

static PRESETS: Lazy<Vec<Formation>> = Lazy::new(|| {
    PRESET_FORMATIONS
        .iter()
        .filter_map(|raw| Formation::parse(raw).ok())
        .collect()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormationError {
    #[error("formation {0:?} must look like 4-3-3 or 4-2-3-1")]
    Pattern(String),
    #[error("formation {0:?} has a line without players")]
    EmptyLine(String),
    #[error("formation {raw:?} places {sum} outfield players, expected 10")]
    Sum { raw: String, sum: u32 },
}

/// Outfield line sizes from back to front. The goalkeeper is implicit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Formation {
    lines: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSlot {
    pub label: String,
    /// 0 for the goalkeeper, 1.. for outfield lines from back to front.
    pub line: usize,
    pub top: f64,
    pub left: f64,
}

impl PositionSlot {
    pub fn is_goalkeeper(&self) -> bool {
        self.line == 0
    }
}

impl Default for Formation {
    fn default() -> Self {
        Self {
            lines: vec![4, 3, 3],
        }
    }
}

impl fmt::Display for Formation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .lines
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>();
        f.write_str(&parts.join("-"))
    }
}

impl std::str::FromStr for Formation {
    type Err = FormationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Formation {
    pub fn parse(raw: &str) -> Result<Self, FormationError> {
        let trimmed = raw.trim();
        if !FORMATION_PATTERN.is_match(trimmed) {
            return Err(FormationError::Pattern(raw.to_string()));
        }
        let mut lines = Vec::with_capacity(4);
        for part in trimmed.split('-') {
            // Digits only at this point; overflow is the only way parsing can fail.
            let n = part
                .parse::<u32>()
                .map_err(|_| FormationError::Pattern(raw.to_string()))?;
            if n == 0 {
                return Err(FormationError::EmptyLine(raw.to_string()));
            }
            lines.push(n);
        }
        let sum = lines.iter().try_fold(0u32, |acc, n| acc.checked_add(*n));
        match sum {
            Some(OUTFIELD_PLAYERS) => Ok(Self { lines }),
            Some(sum) => Err(FormationError::Sum {
                raw: raw.to_string(),
                sum,
            }),
            None => Err(FormationError::Pattern(raw.to_string())),
        }
    }

    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    pub fn lines(&self) -> &[u32] {
        &self.lines
    }

    pub fn outfield_count(&self) -> usize {
        self.lines.iter().map(|n| *n as usize).sum()
    }

    /// Slots in emission order: goalkeeper first, then each line from back to front.
    pub fn layout(&self) -> Vec<PositionSlot> {
        let (tops, prefixes): (&[f64], &[&str]) = if self.lines.len() == 4 {
            (&FOUR_LINE_TOPS, &FOUR_LINE_PREFIXES)
        } else {
            (&THREE_LINE_TOPS, &THREE_LINE_PREFIXES)
        };

        let mut slots = Vec::with_capacity(1 + self.outfield_count());
        slots.push(PositionSlot {
            label: GOALKEEPER_SLOT.to_string(),
            line: 0,
            top: GOALKEEPER_TOP,
            left: GOALKEEPER_LEFT,
        });
        for (line_idx, count) in self.lines.iter().enumerate() {
            let (Some(top), Some(prefix)) = (tops.get(line_idx), prefixes.get(line_idx)) else {
                continue;
            };
            slots.extend(line_slots(*count, *top, prefix, line_idx + 1));
        }
        slots
    }

    pub fn slot_labels(&self) -> Vec<String> {
        self.layout().into_iter().map(|s| s.label).collect()
    }

    pub fn has_slot(&self, label: &str) -> bool {
        self.layout().iter().any(|s| s.label == label)
    }
}

fn line_slots(count: u32, top: f64, prefix: &str, line: usize) -> Vec<PositionSlot> {
    let spacing = 100.0 / f64::from(count + 1);
    (0..count)
        .map(|i| PositionSlot {
            label: format!("{prefix}{}", i + 1),
            line,
            top,
            left: spacing * f64::from(i + 1),
        })
        .collect()
}

pub fn presets() -> &'static [Formation] {
    &PRESETS
}

/// Carry assignments across a formation change.
///
/// The goalkeeper keeps the `GK` slot. Outfield occupants move by position in the
/// layout order (old outfield slot k -> new outfield slot k), not by label; whatever
/// does not fit in the new formation is dropped.
pub fn remap_positions(
    old: &Formation,
    new: &Formation,
    positions: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let Some(keeper) = positions.get(GOALKEEPER_SLOT) {
        out.insert(GOALKEEPER_SLOT.to_string(), keeper.clone());
    }

    let old_slots = old.layout();
    let new_slots = new.layout();
    let old_outfield = old_slots.iter().filter(|s| !s.is_goalkeeper());
    let new_outfield = new_slots.iter().filter(|s| !s.is_goalkeeper());
    for (from, to) in old_outfield.zip(new_outfield) {
        if let Some(player) = positions.get(&from.label) {
            out.insert(to.label.clone(), player.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_bad_shapes() {
        assert!(matches!(
            Formation::parse("4-3"),
            Err(FormationError::Pattern(_))
        ));
        assert!(matches!(
            Formation::parse("4-4-3"),
            Err(FormationError::Sum { sum: 11, .. })
        ));
        assert!(matches!(
            Formation::parse("a-b-c"),
            Err(FormationError::Pattern(_))
        ));
        assert!(matches!(
            Formation::parse("0-5-5"),
            Err(FormationError::EmptyLine(_))
        ));
        assert!(matches!(
            Formation::parse("4-2-2-1-1"),
            Err(FormationError::Pattern(_))
        ));
        assert!(matches!(
            Formation::parse("99999999999-1-1"),
            Err(FormationError::Pattern(_))
        ));
    }

    #[test]
    fn parse_trims_and_round_trips_display() {
        let f = Formation::parse(" 4-2-3-1 ").unwrap();
        assert_eq!(f.lines(), &[4, 2, 3, 1]);
        assert_eq!(f.to_string(), "4-2-3-1");
    }

    #[test]
    fn four_line_labels_use_pivot_prefixes() {
        let f = Formation::parse("4-2-3-1").unwrap();
        assert_eq!(
            f.slot_labels(),
            vec![
                "GK", "DEF1", "DEF2", "DEF3", "DEF4", "DMF1", "DMF2", "AMF1", "AMF2", "AMF3",
                "FWD1"
            ]
        );
    }

    #[test]
    fn single_player_line_is_centered() {
        let f = Formation::parse("4-5-1").unwrap();
        let striker = f.layout().into_iter().find(|s| s.label == "FWD1").unwrap();
        assert!((striker.left - 50.0).abs() < 1e-9);
    }

    #[test]
    fn presets_are_all_valid() {
        assert_eq!(presets().len(), PRESET_FORMATIONS.len());
        for f in presets() {
            assert_eq!(f.layout().len(), 11);
        }
    }

    #[test]
    fn remap_drops_stale_labels() {
        let old = Formation::parse("4-4-2").unwrap();
        let new = Formation::parse("4-3-3").unwrap();
        let mut positions = BTreeMap::new();
        positions.insert("AMF1".to_string(), "ghost".to_string());
        positions.insert("FWD2".to_string(), "p9".to_string());
        let out = remap_positions(&old, &new, &positions);
        // 4-4-2 FWD2 is outfield index 9, which is FWD3 in 4-3-3.
        assert_eq!(out.get("FWD3").map(String::as_str), Some("p9"));
        assert!(!out.values().any(|p| p == "ghost"));
    }
}
