use serde::{Deserialize, Serialize};

use crate::theme::Theme;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub theme: Theme,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub organization_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionCategory {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub organization_id: String,
    pub category_id: Option<String>,
    pub name: String,
    pub jersey_number: Option<u32>,
    pub position: Option<PositionCategory>,
    /// Soft-deleted players stay around so old lineups and evaluations still resolve.
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Home,
    Away,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub organization_id: String,
    pub category_id: Option<String>,
    pub opponent: String,
    pub kickoff: String,
    pub venue: Venue,
    pub competition: Option<String>,
    pub goals_for: Option<u32>,
    pub goals_against: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: String,
    pub match_id: String,
    pub player_id: String,
    pub minutes: u32,
    pub goals: u32,
    pub assists: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub rating: Option<f64>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessEntry {
    pub id: String,
    pub player_id: String,
    pub date: String,
    pub sleep: u8,
    pub fatigue: u8,
    pub soreness: u8,
    pub stress: u8,
    pub mood: u8,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalTest {
    pub id: String,
    pub player_id: String,
    pub date: String,
    pub test: String,
    pub value: f64,
    pub unit: String,
    pub lower_is_better: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicalKind {
    Injury,
    Illness,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicalStatus {
    Active,
    Recovered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: String,
    pub player_id: String,
    pub kind: MedicalKind,
    pub description: String,
    pub started_on: String,
    pub expected_return: Option<String>,
    pub status: MedicalStatus,
}

impl Player {
    pub fn display_name(&self) -> String {
        if self.deleted {
            format!("{} (baja)", self.name)
        } else {
            self.name.clone()
        }
    }
}

impl PositionCategory {
    pub fn key(self) -> &'static str {
        match self {
            PositionCategory::Goalkeeper => "goalkeeper",
            PositionCategory::Defender => "defender",
            PositionCategory::Midfielder => "midfielder",
            PositionCategory::Forward => "forward",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim().to_lowercase();
        if s == "gk" || s.contains("goalkeeper") || s.contains("keeper") || s.contains("portero") {
            return Some(PositionCategory::Goalkeeper);
        }
        if s == "df" || s.contains("defender") || s.contains("back") || s.contains("defensa") {
            return Some(PositionCategory::Defender);
        }
        if s == "mf" || s.contains("midfield") || s.contains("medio") {
            return Some(PositionCategory::Midfielder);
        }
        if s == "fw"
            || s.contains("forward")
            || s.contains("striker")
            || s.contains("wing")
            || s.contains("delantero")
        {
            return Some(PositionCategory::Forward);
        }
        None
    }
}

impl Venue {
    pub fn key(self) -> &'static str {
        match self {
            Venue::Home => "home",
            Venue::Away => "away",
            Venue::Neutral => "neutral",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "home" | "local" => Some(Venue::Home),
            "away" | "visitante" => Some(Venue::Away),
            "neutral" => Some(Venue::Neutral),
            _ => None,
        }
    }
}

impl MedicalKind {
    pub fn key(self) -> &'static str {
        match self {
            MedicalKind::Injury => "injury",
            MedicalKind::Illness => "illness",
            MedicalKind::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "injury" => Some(MedicalKind::Injury),
            "illness" => Some(MedicalKind::Illness),
            "other" => Some(MedicalKind::Other),
            _ => None,
        }
    }
}

impl MedicalStatus {
    pub fn key(self) -> &'static str {
        match self {
            MedicalStatus::Active => "active",
            MedicalStatus::Recovered => "recovered",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(MedicalStatus::Active),
            "recovered" => Some(MedicalStatus::Recovered),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PositionCategory;

    #[test]
    fn position_category_from_text() {
        assert_eq!(
            PositionCategory::parse("Goalkeeper"),
            Some(PositionCategory::Goalkeeper)
        );
        assert_eq!(
            PositionCategory::parse("centre-back"),
            Some(PositionCategory::Defender)
        );
        assert_eq!(
            PositionCategory::parse("Delantero"),
            Some(PositionCategory::Forward)
        );
        assert_eq!(PositionCategory::parse("coach"), None);
    }
}
