//! Explicit application context: who is signed in, which organization they act for,
//! how it is themed, and what they may do. Built once per run and torn down at the end.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::lineup::LineupState;
use crate::model::Organization;
use crate::notify::{Notice, Notices};
use crate::permissions::{AccessLevel, Claims, Gate, PermissionResolver, Section};
use crate::store::{Precondition, SaveOutcome, Store};
use crate::theme::Theme;

/// What the authentication collaborator hands over after sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub organization_id: String,
    #[serde(default)]
    pub claims: Claims,
}

impl Session {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read session file {}", path.display()))?;
        let session = serde_json::from_str::<Session>(&raw).context("invalid session json")?;
        if session.user_id.trim().is_empty() || session.organization_id.trim().is_empty() {
            return Err(anyhow!("session is missing a user or organization id"));
        }
        Ok(session)
    }
}

/// A lineup being edited together with the version it was loaded at.
#[derive(Debug, Clone)]
pub struct LineupDraft {
    pub state: LineupState,
    /// `None` when nothing was stored for the match yet.
    pub etag: Option<String>,
}

pub struct AppContext {
    session: Session,
    permissions: PermissionResolver,
    organization: Organization,
    store: Store,
    notices: Notices,
}

impl AppContext {
    pub fn initialize(settings: &Settings, session: Session) -> Result<Self> {
        let store = Store::open(&settings.db_path)?;
        Self::with_store(store, session, settings.notice_limit)
    }

    pub fn with_store(store: Store, session: Session, notice_limit: usize) -> Result<Self> {
        let mut notices = Notices::new(notice_limit);
        let organization = match store.organization(&session.organization_id)? {
            Some(org) => org,
            None => {
                notices.warn(format!(
                    "Organization {} is not set up; using the default theme",
                    session.organization_id
                ));
                Organization {
                    id: session.organization_id.clone(),
                    name: session.organization_id.clone(),
                    theme: Theme::default(),
                }
            }
        };
        let permissions = PermissionResolver::from_claims(&session.claims);
        log::debug!(
            "context ready for {} in {}",
            session.email,
            organization.name
        );
        Ok(Self {
            session,
            permissions,
            organization,
            store,
            notices,
        })
    }

    /// Closes the store and hands back whatever notices were not shown yet.
    pub fn teardown(mut self) -> Result<Vec<Notice>> {
        let pending = self.notices.drain();
        self.store.close()?;
        Ok(pending)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn org_id(&self) -> &str {
        &self.session.organization_id
    }

    pub fn user_id(&self) -> &str {
        &self.session.user_id
    }

    pub fn organization(&self) -> &Organization {
        &self.organization
    }

    pub fn theme(&self) -> &Theme {
        &self.organization.theme
    }

    pub fn permissions(&self) -> &PermissionResolver {
        &self.permissions
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut Notices {
        &mut self.notices
    }

    /// Re-reads the organization row, e.g. after the theme was edited.
    pub fn refresh_organization(&mut self) -> Result<()> {
        if let Some(org) = self.store.organization(self.org_id())? {
            self.organization = org;
        }
        Ok(())
    }

    pub fn require(&mut self, section: Section, needed: AccessLevel) -> Result<()> {
        self.require_in(section, None, needed)
    }

    pub fn require_in(
        &mut self,
        section: Section,
        category: Option<&str>,
        needed: AccessLevel,
    ) -> Result<()> {
        match self.permissions.gate_in(section, category, needed) {
            Gate::Allow => Ok(()),
            Gate::Redirect { to } => {
                let msg = format!(
                    "{section} needs {} access; try {to} instead",
                    needed.label()
                );
                self.notices.warn(msg.clone());
                Err(anyhow!(msg))
            }
        }
    }

    pub fn open_lineup(&mut self, match_id: &str) -> Result<LineupDraft> {
        self.require_for_match(Section::Lineups, match_id, AccessLevel::View)?;

        let Some(stored) = self.store.load_lineup(self.org_id(), match_id)? else {
            self.notices
                .info(format!("No lineup saved yet for match {match_id}"));
            return Ok(LineupDraft {
                state: LineupState::new(match_id),
                etag: None,
            });
        };
        let state = LineupState::from_record(&stored.record)?;
        let dupes = state.duplicates();
        if !dupes.is_empty() {
            self.notices.warn(format!(
                "Lineup for match {match_id} books players twice: {}",
                dupes.join(", ")
            ));
        }
        Ok(LineupDraft {
            state,
            etag: Some(stored.etag),
        })
    }

    /// Saves the draft against the version it was loaded at. On success the draft picks up
    /// the new etag; on conflict nothing is written and the draft is left as is.
    pub fn save_lineup(&mut self, draft: &mut LineupDraft) -> Result<SaveOutcome> {
        let match_id = draft.state.match_id().to_string();
        self.require_for_match(Section::Lineups, &match_id, AccessLevel::Edit)?;

        let precondition = match &draft.etag {
            Some(tag) => Precondition::IfMatch(tag.clone()),
            None => Precondition::IfAbsent,
        };
        let record = draft.state.to_record();
        let outcome =
            self.store
                .save_lineup(self.org_id(), self.user_id(), &record, &precondition)?;
        match &outcome {
            SaveOutcome::Saved { etag } => {
                draft.etag = Some(etag.clone());
                self.notices
                    .info(format!("Lineup saved for match {match_id}"));
            }
            SaveOutcome::Conflict { .. } => {
                self.notices.warn(format!(
                    "Lineup for match {match_id} was changed by someone else; reload before saving"
                ));
            }
        }
        Ok(outcome)
    }

    /// Gate an action on a match, so a coach of the match's category gets the override.
    pub fn require_for_match(
        &mut self,
        section: Section,
        match_id: &str,
        needed: AccessLevel,
    ) -> Result<()> {
        let category = self.match_category(match_id)?;
        self.require_in(section, category.as_deref(), needed)
    }

    /// Gate an action on a player, using the player's category.
    pub fn require_for_player(
        &mut self,
        section: Section,
        player_id: &str,
        needed: AccessLevel,
    ) -> Result<()> {
        let category = self.player_category(player_id)?;
        self.require_in(section, category.as_deref(), needed)
    }

    pub fn match_category(&self, match_id: &str) -> Result<Option<String>> {
        let m = self
            .store
            .match_by_id(self.org_id(), match_id)?
            .ok_or_else(|| anyhow!("match {match_id} not found"))?;
        Ok(m.category_id)
    }

    pub fn player_category(&self, player_id: &str) -> Result<Option<String>> {
        let p = self
            .store
            .player(self.org_id(), player_id)?
            .ok_or_else(|| anyhow!("player {player_id} not found"))?;
        Ok(p.category_id)
    }
}
