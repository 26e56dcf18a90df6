use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::lineup::{LineupRecord, Substitution};
use crate::model::{Category, Match, Organization, Player, PositionCategory, Venue};
use crate::theme::Theme;

/// Tenant-scoped persistence. Every read and write is filtered by organization id.
pub struct Store {
    pub(crate) conn: Connection,
    path: Option<PathBuf>,
}

/// Write precondition for a lineup save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Last write wins.
    Any,
    /// Only create; fail if a lineup already exists for the match.
    IfAbsent,
    /// Only overwrite the version the caller loaded. A lineup that was deleted meanwhile
    /// is recreated.
    IfMatch(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { etag: String },
    Conflict { current_etag: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLineup {
    pub record: LineupRecord,
    pub etag: String,
    pub updated_at: String,
    pub updated_by: String,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db dir {}", parent.display()))?;
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        log::debug!("opened store at {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, err)| anyhow!("close sqlite db: {err}"))
    }

    pub fn upsert_organization(&self, org: &Organization) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO organizations (id, name, theme_primary, theme_secondary, theme_accent, logo_url, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    theme_primary = excluded.theme_primary,
                    theme_secondary = excluded.theme_secondary,
                    theme_accent = excluded.theme_accent,
                    logo_url = excluded.logo_url,
                    updated_at = excluded.updated_at
                "#,
                params![
                    org.id,
                    org.name,
                    org.theme.primary,
                    org.theme.secondary,
                    org.theme.accent,
                    org.theme.logo_url,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("upsert organization")?;
        Ok(())
    }

    pub fn organization(&self, org_id: &str) -> Result<Option<Organization>> {
        self.conn
            .query_row(
                "SELECT id, name, theme_primary, theme_secondary, theme_accent, logo_url
                 FROM organizations WHERE id = ?1",
                params![org_id],
                |row| {
                    Ok(Organization {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        theme: Theme {
                            primary: row.get(2)?,
                            secondary: row.get(3)?,
                            accent: row.get(4)?,
                            logo_url: row.get(5)?,
                        },
                    })
                },
            )
            .optional()
            .context("query organization")
    }

    pub fn add_category(&self, org_id: &str, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("category name is empty"));
        }
        let category = Category {
            id: new_id(),
            organization_id: org_id.to_string(),
            name: name.to_string(),
        };
        self.conn
            .execute(
                "INSERT INTO categories (id, organization_id, name) VALUES (?1, ?2, ?3)",
                params![category.id, category.organization_id, category.name],
            )
            .with_context(|| format!("insert category {name}"))?;
        Ok(category)
    }

    pub fn categories(&self, org_id: &str) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, organization_id, name FROM categories
                 WHERE organization_id = ?1 ORDER BY name ASC",
            )
            .context("prepare categories query")?;
        let rows = stmt
            .query_map(params![org_id], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    organization_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })
            .context("query categories")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode category row")?);
        }
        Ok(out)
    }

    /// Inserts or updates a player; an empty id gets a fresh one.
    pub fn save_player(&self, org_id: &str, player: &Player) -> Result<Player> {
        if player.name.trim().is_empty() {
            return Err(anyhow!("player name is empty"));
        }
        let mut stored = player.clone();
        stored.organization_id = org_id.to_string();
        stored.name = stored.name.trim().to_string();
        if stored.id.is_empty() {
            stored.id = new_id();
        }
        let changed = self
            .conn
            .execute(
                r#"
                INSERT INTO players (id, organization_id, category_id, name, jersey_number, position, deleted, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    category_id = excluded.category_id,
                    name = excluded.name,
                    jersey_number = excluded.jersey_number,
                    position = excluded.position,
                    deleted = excluded.deleted,
                    updated_at = excluded.updated_at
                WHERE players.organization_id = excluded.organization_id
                "#,
                params![
                    stored.id,
                    stored.organization_id,
                    stored.category_id,
                    stored.name,
                    stored.jersey_number,
                    stored.position.map(|p| p.key()),
                    bool_to_i64(stored.deleted),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("upsert player")?;
        if changed == 0 {
            return Err(anyhow!("player {} belongs to another organization", stored.id));
        }
        Ok(stored)
    }

    pub fn player(&self, org_id: &str, player_id: &str) -> Result<Option<Player>> {
        self.conn
            .query_row(
                "SELECT id, organization_id, category_id, name, jersey_number, position, deleted
                 FROM players WHERE organization_id = ?1 AND id = ?2",
                params![org_id, player_id],
                player_from_row,
            )
            .optional()
            .context("query player")
    }

    pub fn players(&self, org_id: &str, include_deleted: bool) -> Result<Vec<Player>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, organization_id, category_id, name, jersey_number, position, deleted
                 FROM players
                 WHERE organization_id = ?1 AND (?2 = 1 OR deleted = 0)
                 ORDER BY name ASC, id ASC",
            )
            .context("prepare players query")?;
        let rows = stmt
            .query_map(params![org_id, bool_to_i64(include_deleted)], player_from_row)
            .context("query players")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode player row")?);
        }
        Ok(out)
    }

    /// Marks the player deleted; the row stays as a shadow record. Returns false when no
    /// such player exists in the organization.
    pub fn soft_delete_player(&self, org_id: &str, player_id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE players SET deleted = 1, updated_at = ?3
                 WHERE organization_id = ?1 AND id = ?2",
                params![org_id, player_id, Utc::now().to_rfc3339()],
            )
            .context("soft delete player")?;
        Ok(changed > 0)
    }

    pub fn save_match(&self, org_id: &str, m: &Match) -> Result<Match> {
        if m.opponent.trim().is_empty() {
            return Err(anyhow!("match opponent is empty"));
        }
        let mut stored = m.clone();
        stored.organization_id = org_id.to_string();
        stored.opponent = stored.opponent.trim().to_string();
        if stored.id.is_empty() {
            stored.id = new_id();
        }
        let changed = self
            .conn
            .execute(
                r#"
                INSERT INTO matches (id, organization_id, category_id, opponent, kickoff, venue, competition, goals_for, goals_against, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(id) DO UPDATE SET
                    category_id = excluded.category_id,
                    opponent = excluded.opponent,
                    kickoff = excluded.kickoff,
                    venue = excluded.venue,
                    competition = excluded.competition,
                    goals_for = excluded.goals_for,
                    goals_against = excluded.goals_against,
                    updated_at = excluded.updated_at
                WHERE matches.organization_id = excluded.organization_id
                "#,
                params![
                    stored.id,
                    stored.organization_id,
                    stored.category_id,
                    stored.opponent,
                    stored.kickoff,
                    stored.venue.key(),
                    stored.competition,
                    stored.goals_for,
                    stored.goals_against,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("upsert match")?;
        if changed == 0 {
            return Err(anyhow!("match {} belongs to another organization", stored.id));
        }
        Ok(stored)
    }

    pub fn set_match_result(
        &self,
        org_id: &str,
        match_id: &str,
        goals_for: u32,
        goals_against: u32,
    ) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE matches SET goals_for = ?3, goals_against = ?4, updated_at = ?5
                 WHERE organization_id = ?1 AND id = ?2",
                params![
                    org_id,
                    match_id,
                    goals_for,
                    goals_against,
                    Utc::now().to_rfc3339()
                ],
            )
            .context("update match result")?;
        Ok(changed > 0)
    }

    pub fn match_by_id(&self, org_id: &str, match_id: &str) -> Result<Option<Match>> {
        self.conn
            .query_row(
                "SELECT id, organization_id, category_id, opponent, kickoff, venue, competition, goals_for, goals_against
                 FROM matches WHERE organization_id = ?1 AND id = ?2",
                params![org_id, match_id],
                match_from_row,
            )
            .optional()
            .context("query match")
    }

    pub fn matches(&self, org_id: &str) -> Result<Vec<Match>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, organization_id, category_id, opponent, kickoff, venue, competition, goals_for, goals_against
                 FROM matches WHERE organization_id = ?1
                 ORDER BY kickoff ASC, id ASC",
            )
            .context("prepare matches query")?;
        let rows = stmt
            .query_map(params![org_id], match_from_row)
            .context("query matches")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode match row")?);
        }
        Ok(out)
    }

    pub fn load_lineup(&self, org_id: &str, match_id: &str) -> Result<Option<StoredLineup>> {
        let row = self
            .conn
            .query_row(
                "SELECT match_id, formation, positions_json, substitutes_json, not_called_json,
                        substitutions_json, match_comments, etag, updated_at, updated_by
                 FROM lineups WHERE organization_id = ?1 AND match_id = ?2",
                params![org_id, match_id],
                |row| {
                    Ok(RawLineupRow {
                        match_id: row.get(0)?,
                        formation: row.get(1)?,
                        positions_json: row.get(2)?,
                        substitutes_json: row.get(3)?,
                        not_called_json: row.get(4)?,
                        substitutions_json: row.get(5)?,
                        match_comments: row.get(6)?,
                        etag: row.get(7)?,
                        updated_at: row.get(8)?,
                        updated_by: row.get(9)?,
                    })
                },
            )
            .optional()
            .context("query lineup")?;
        let Some(raw) = row else {
            return Ok(None);
        };
        raw.decode().map(Some)
    }

    /// One atomic insert-or-update keyed by (organization, match). The precondition is part
    /// of the same statement, so there is no window between the check and the write.
    pub fn save_lineup(
        &self,
        org_id: &str,
        user_id: &str,
        record: &LineupRecord,
        precondition: &Precondition,
    ) -> Result<SaveOutcome> {
        if self.match_by_id(org_id, &record.match_id)?.is_none() {
            return Err(anyhow!("match {} not found", record.match_id));
        }

        let positions_json =
            serde_json::to_string(&record.positions).context("serialize lineup positions")?;
        let substitutes_json =
            serde_json::to_string(&record.substitutes).context("serialize lineup bench")?;
        let not_called_json =
            serde_json::to_string(&record.not_called).context("serialize lineup not called")?;
        let substitutions_json = serde_json::to_string(&record.substitutions)
            .context("serialize lineup substitutions")?;
        let payload = serde_json::to_string(record).context("serialize lineup payload")?;
        let etag = new_etag(&payload);

        let (mode, expected) = match precondition {
            Precondition::Any => ("any", None),
            Precondition::IfAbsent => ("absent", None),
            Precondition::IfMatch(tag) => ("match", Some(tag.as_str())),
        };

        let changed = self
            .conn
            .execute(
                r#"
                INSERT INTO lineups (
                    organization_id, match_id, formation, positions_json, substitutes_json,
                    not_called_json, substitutions_json, match_comments, etag, updated_at, updated_by
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(organization_id, match_id) DO UPDATE SET
                    formation = excluded.formation,
                    positions_json = excluded.positions_json,
                    substitutes_json = excluded.substitutes_json,
                    not_called_json = excluded.not_called_json,
                    substitutions_json = excluded.substitutions_json,
                    match_comments = excluded.match_comments,
                    etag = excluded.etag,
                    updated_at = excluded.updated_at,
                    updated_by = excluded.updated_by
                WHERE ?12 = 'any' OR (?12 = 'match' AND lineups.etag = ?13)
                "#,
                params![
                    org_id,
                    record.match_id,
                    record.formation,
                    positions_json,
                    substitutes_json,
                    not_called_json,
                    substitutions_json,
                    record.match_comments,
                    etag,
                    Utc::now().to_rfc3339(),
                    user_id,
                    mode,
                    expected,
                ],
            )
            .context("upsert lineup")?;

        if changed == 0 {
            let current_etag = self.lineup_etag(org_id, &record.match_id)?;
            log::warn!(
                "lineup save for match {} rejected: stored version changed",
                record.match_id
            );
            return Ok(SaveOutcome::Conflict { current_etag });
        }
        log::info!("lineup saved for match {} by {user_id}", record.match_id);
        Ok(SaveOutcome::Saved { etag })
    }

    pub fn delete_lineup(&self, org_id: &str, match_id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM lineups WHERE organization_id = ?1 AND match_id = ?2",
                params![org_id, match_id],
            )
            .context("delete lineup")?;
        Ok(changed > 0)
    }

    fn lineup_etag(&self, org_id: &str, match_id: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT etag FROM lineups WHERE organization_id = ?1 AND match_id = ?2",
                params![org_id, match_id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("query lineup etag")
    }
}

struct RawLineupRow {
    match_id: String,
    formation: String,
    positions_json: String,
    substitutes_json: String,
    not_called_json: String,
    substitutions_json: String,
    match_comments: String,
    etag: String,
    updated_at: String,
    updated_by: String,
}

impl RawLineupRow {
    fn decode(self) -> Result<StoredLineup> {
        let positions = serde_json::from_str::<BTreeMap<String, String>>(&self.positions_json)
            .context("invalid lineup positions json")?;
        let substitutes = serde_json::from_str::<Vec<String>>(&self.substitutes_json)
            .context("invalid lineup bench json")?;
        let not_called = serde_json::from_str::<Vec<String>>(&self.not_called_json)
            .context("invalid lineup not called json")?;
        let substitutions = serde_json::from_str::<Vec<Substitution>>(&self.substitutions_json)
            .context("invalid lineup substitutions json")?;
        Ok(StoredLineup {
            record: LineupRecord {
                match_id: self.match_id,
                formation: self.formation,
                positions,
                substitutes,
                not_called,
                substitutions,
                match_comments: self.match_comments,
            },
            etag: self.etag,
            updated_at: self.updated_at,
            updated_by: self.updated_by,
        })
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;

        CREATE TABLE IF NOT EXISTS organizations (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            theme_primary TEXT NOT NULL,
            theme_secondary TEXT NOT NULL,
            theme_accent TEXT NOT NULL,
            logo_url TEXT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            name TEXT NOT NULL,
            UNIQUE (organization_id, name)
        );

        CREATE TABLE IF NOT EXISTS players (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            category_id TEXT NULL,
            name TEXT NOT NULL,
            jersey_number INTEGER NULL,
            position TEXT NULL,
            deleted INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_players_org ON players(organization_id);

        CREATE TABLE IF NOT EXISTS matches (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            category_id TEXT NULL,
            opponent TEXT NOT NULL,
            kickoff TEXT NOT NULL,
            venue TEXT NOT NULL,
            competition TEXT NULL,
            goals_for INTEGER NULL,
            goals_against INTEGER NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_org ON matches(organization_id, kickoff);

        CREATE TABLE IF NOT EXISTS lineups (
            organization_id TEXT NOT NULL,
            match_id TEXT NOT NULL,
            formation TEXT NOT NULL,
            positions_json TEXT NOT NULL,
            substitutes_json TEXT NOT NULL,
            not_called_json TEXT NOT NULL,
            substitutions_json TEXT NOT NULL,
            match_comments TEXT NOT NULL,
            etag TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            updated_by TEXT NOT NULL,
            PRIMARY KEY (organization_id, match_id)
        );

        CREATE TABLE IF NOT EXISTS evaluations (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            match_id TEXT NOT NULL,
            player_id TEXT NOT NULL,
            minutes INTEGER NOT NULL,
            goals INTEGER NOT NULL,
            assists INTEGER NOT NULL,
            yellow_cards INTEGER NOT NULL,
            red_cards INTEGER NOT NULL,
            rating REAL NULL,
            notes TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_evaluations_org ON evaluations(organization_id, player_id);

        CREATE TABLE IF NOT EXISTS wellness (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            player_id TEXT NOT NULL,
            date TEXT NOT NULL,
            sleep INTEGER NOT NULL,
            fatigue INTEGER NOT NULL,
            soreness INTEGER NOT NULL,
            stress INTEGER NOT NULL,
            mood INTEGER NOT NULL,
            notes TEXT NOT NULL,
            UNIQUE (organization_id, player_id, date)
        );

        CREATE TABLE IF NOT EXISTS physical_tests (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            player_id TEXT NOT NULL,
            date TEXT NOT NULL,
            test TEXT NOT NULL,
            value REAL NOT NULL,
            unit TEXT NOT NULL,
            lower_is_better INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_physical_org ON physical_tests(organization_id, player_id);

        CREATE TABLE IF NOT EXISTS medical_records (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            player_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            description TEXT NOT NULL,
            started_on TEXT NOT NULL,
            expected_return TEXT NULL,
            status TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn new_etag(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    let digest = hasher.finalize();
    URL_SAFE_NO_PAD.encode(&digest[..16])
}

fn player_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Player> {
    let position: Option<String> = row.get(5)?;
    Ok(Player {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        category_id: row.get(2)?,
        name: row.get(3)?,
        jersey_number: row.get(4)?,
        position: position.as_deref().and_then(PositionCategory::parse),
        deleted: row.get::<_, i64>(6)? != 0,
    })
}

fn match_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Match> {
    let venue: String = row.get(5)?;
    Ok(Match {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        category_id: row.get(2)?,
        opponent: row.get(3)?,
        kickoff: row.get(4)?,
        venue: Venue::parse(&venue).unwrap_or(Venue::Neutral),
        competition: row.get(6)?,
        goals_for: row.get(7)?,
        goals_against: row.get(8)?,
    })
}

pub(crate) fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::new_etag;

    #[test]
    fn etags_differ_for_identical_payloads() {
        let a = new_etag("{}");
        let b = new_etag("{}");
        assert_ne!(a, b);
        assert_eq!(a.len(), 22);
    }
}
