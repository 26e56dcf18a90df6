//! Advisory, client-side access checks.
//!
//! Storage never consults this module; it only decides what the command surface offers
//! and where a user lands when a section is closed to them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Dashboard,
    Players,
    Matches,
    Lineups,
    Evaluations,
    Medical,
    Wellness,
    Physical,
    Exports,
    Settings,
}

pub const ALL_SECTIONS: [Section; 10] = [
    Section::Dashboard,
    Section::Players,
    Section::Matches,
    Section::Lineups,
    Section::Evaluations,
    Section::Medical,
    Section::Wellness,
    Section::Physical,
    Section::Exports,
    Section::Settings,
];

const COACH_EDIT_SECTIONS: [Section; 6] = [
    Section::Players,
    Section::Matches,
    Section::Lineups,
    Section::Evaluations,
    Section::Wellness,
    Section::Physical,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AccessLevel {
    #[default]
    None,
    View,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Coach,
    #[default]
    Staff,
}

/// Custom claims attached to the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Claims {
    #[serde(default)]
    pub role: Role,
    /// Raw per-section access strings as stored on the user, e.g. `{"lineups": "edit"}`.
    #[serde(default)]
    pub access: HashMap<String, String>,
    /// Category ids this user coaches.
    #[serde(default)]
    pub coach_categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Allow,
    Redirect { to: Section },
}

#[derive(Debug, Clone)]
pub struct PermissionResolver {
    role: Role,
    levels: HashMap<Section, AccessLevel>,
    coach_categories: Vec<String>,
}

impl Section {
    pub fn key(self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Players => "players",
            Section::Matches => "matches",
            Section::Lineups => "lineups",
            Section::Evaluations => "evaluations",
            Section::Medical => "medical",
            Section::Wellness => "wellness",
            Section::Physical => "physical",
            Section::Exports => "exports",
            Section::Settings => "settings",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase();
        ALL_SECTIONS.into_iter().find(|s| s.key() == key)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl AccessLevel {
    /// Unknown strings resolve to `None` rather than failing.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "edit" | "write" => AccessLevel::Edit,
            "view" | "read" => AccessLevel::View,
            _ => AccessLevel::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AccessLevel::None => "none",
            AccessLevel::View => "view",
            AccessLevel::Edit => "edit",
        }
    }
}

impl PermissionResolver {
    pub fn from_claims(claims: &Claims) -> Self {
        let mut levels = HashMap::new();
        for (key, raw) in &claims.access {
            let Some(section) = Section::from_key(key) else {
                continue;
            };
            levels.insert(section, AccessLevel::parse(raw));
        }
        Self {
            role: claims.role,
            levels,
            coach_categories: claims.coach_categories.clone(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn level(&self, section: Section) -> AccessLevel {
        if self.role == Role::Admin {
            return AccessLevel::Edit;
        }
        let stored = self.levels.get(&section).copied().unwrap_or_default();
        if section == Section::Dashboard {
            return stored.max(AccessLevel::View);
        }
        stored
    }

    /// Like [`level`](Self::level), raised by the coach override when the user coaches
    /// `category`.
    pub fn level_for_category(&self, section: Section, category: Option<&str>) -> AccessLevel {
        let base = self.level(section);
        let Some(category) = category else {
            return base;
        };
        if self.role != Role::Coach || !self.coaches(category) {
            return base;
        }
        let raised = if COACH_EDIT_SECTIONS.contains(&section) {
            AccessLevel::Edit
        } else if section == Section::Medical {
            AccessLevel::View
        } else {
            AccessLevel::None
        };
        base.max(raised)
    }

    pub fn coaches(&self, category: &str) -> bool {
        self.coach_categories.iter().any(|c| c == category)
    }

    pub fn can_view(&self, section: Section) -> bool {
        self.level(section) >= AccessLevel::View
    }

    pub fn can_edit(&self, section: Section) -> bool {
        self.level(section) >= AccessLevel::Edit
    }

    pub fn can_edit_in(&self, section: Section, category: Option<&str>) -> bool {
        self.level_for_category(section, category) >= AccessLevel::Edit
    }

    pub fn gate(&self, section: Section, needed: AccessLevel) -> Gate {
        self.gate_in(section, None, needed)
    }

    pub fn gate_in(&self, section: Section, category: Option<&str>, needed: AccessLevel) -> Gate {
        if self.level_for_category(section, category) >= needed {
            return Gate::Allow;
        }
        Gate::Redirect {
            to: self.first_viewable(Some(section)),
        }
    }

    /// First viewable section in menu order.
    pub fn landing_section(&self) -> Section {
        self.first_viewable(None)
    }

    /// Skips the refused section; the dashboard is the last resort.
    fn first_viewable(&self, skip: Option<Section>) -> Section {
        ALL_SECTIONS
            .into_iter()
            .find(|s| *s != Section::Dashboard && Some(*s) != skip && self.can_view(*s))
            .unwrap_or(Section::Dashboard)
    }
}
