//! Evaluations, wellness questionnaires, physical tests and medical records.

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use rusqlite::params;

use crate::model::{
    Evaluation, MedicalKind, MedicalRecord, MedicalStatus, PhysicalTest, WellnessEntry,
};
use crate::store::{Store, bool_to_i64, new_id};

const WELLNESS_MIN: u8 = 1;
const WELLNESS_MAX: u8 = 5;
const RATING_MAX: f64 = 10.0;
const MINUTES_MAX: u32 = 130;
const GOALS_MAX: u32 = 20;
const YELLOW_MAX: u32 = 2;
const RED_MAX: u32 = 1;

impl Store {
    pub fn add_evaluation(&self, org_id: &str, eval: &Evaluation) -> Result<Evaluation> {
        self.ensure_player(org_id, &eval.player_id)?;
        if self.match_by_id(org_id, &eval.match_id)?.is_none() {
            return Err(anyhow!("match {} not found", eval.match_id));
        }
        if let Some(rating) = eval.rating
            && !(0.0..=RATING_MAX).contains(&rating)
        {
            return Err(anyhow!("rating {rating} outside 0-10"));
        }
        for (label, value, max) in [
            ("minutes", eval.minutes, MINUTES_MAX),
            ("goals", eval.goals, GOALS_MAX),
            ("assists", eval.assists, GOALS_MAX),
            ("yellow cards", eval.yellow_cards, YELLOW_MAX),
            ("red cards", eval.red_cards, RED_MAX),
        ] {
            if value > max {
                return Err(anyhow!("{label} must be at most {max}, got {value}"));
            }
        }

        let mut stored = eval.clone();
        if stored.id.is_empty() {
            stored.id = new_id();
        }
        self.conn
            .execute(
                r#"
                INSERT INTO evaluations (
                    id, organization_id, match_id, player_id, minutes, goals, assists,
                    yellow_cards, red_cards, rating, notes, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
                params![
                    stored.id,
                    org_id,
                    stored.match_id,
                    stored.player_id,
                    stored.minutes,
                    stored.goals,
                    stored.assists,
                    stored.yellow_cards,
                    stored.red_cards,
                    stored.rating,
                    stored.notes,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("insert evaluation")?;
        Ok(stored)
    }

    /// Evaluations of the organization, optionally narrowed to one match and/or player.
    pub fn evaluations(
        &self,
        org_id: &str,
        match_id: Option<&str>,
        player_id: Option<&str>,
    ) -> Result<Vec<Evaluation>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, match_id, player_id, minutes, goals, assists, yellow_cards, red_cards, rating, notes
                FROM evaluations
                WHERE organization_id = ?1
                  AND (?2 IS NULL OR match_id = ?2)
                  AND (?3 IS NULL OR player_id = ?3)
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .context("prepare evaluations query")?;
        let rows = stmt
            .query_map(params![org_id, match_id, player_id], |row| {
                Ok(Evaluation {
                    id: row.get(0)?,
                    match_id: row.get(1)?,
                    player_id: row.get(2)?,
                    minutes: row.get(3)?,
                    goals: row.get(4)?,
                    assists: row.get(5)?,
                    yellow_cards: row.get(6)?,
                    red_cards: row.get(7)?,
                    rating: row.get(8)?,
                    notes: row.get(9)?,
                })
            })
            .context("query evaluations")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode evaluation row")?);
        }
        Ok(out)
    }

    /// One questionnaire per player and day; a second entry for the same day replaces
    /// the first.
    pub fn add_wellness(&self, org_id: &str, entry: &WellnessEntry) -> Result<WellnessEntry> {
        self.ensure_player(org_id, &entry.player_id)?;
        let date = iso_date(&entry.date)?;
        for (label, value) in [
            ("sleep", entry.sleep),
            ("fatigue", entry.fatigue),
            ("soreness", entry.soreness),
            ("stress", entry.stress),
            ("mood", entry.mood),
        ] {
            if !(WELLNESS_MIN..=WELLNESS_MAX).contains(&value) {
                return Err(anyhow!("{label} must be between 1 and 5, got {value}"));
            }
        }

        let mut stored = entry.clone();
        stored.date = date;
        if stored.id.is_empty() {
            stored.id = new_id();
        }
        self.conn
            .execute(
                r#"
                INSERT INTO wellness (id, organization_id, player_id, date, sleep, fatigue, soreness, stress, mood, notes)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(organization_id, player_id, date) DO UPDATE SET
                    sleep = excluded.sleep,
                    fatigue = excluded.fatigue,
                    soreness = excluded.soreness,
                    stress = excluded.stress,
                    mood = excluded.mood,
                    notes = excluded.notes
                "#,
                params![
                    stored.id,
                    org_id,
                    stored.player_id,
                    stored.date,
                    stored.sleep,
                    stored.fatigue,
                    stored.soreness,
                    stored.stress,
                    stored.mood,
                    stored.notes,
                ],
            )
            .context("upsert wellness entry")?;
        // On replacement the surviving row keeps its original id.
        stored.id = self
            .conn
            .query_row(
                "SELECT id FROM wellness WHERE organization_id = ?1 AND player_id = ?2 AND date = ?3",
                params![org_id, stored.player_id, stored.date],
                |row| row.get(0),
            )
            .context("query wellness id")?;
        Ok(stored)
    }

    pub fn wellness(&self, org_id: &str, player_id: Option<&str>) -> Result<Vec<WellnessEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, player_id, date, sleep, fatigue, soreness, stress, mood, notes
                FROM wellness
                WHERE organization_id = ?1 AND (?2 IS NULL OR player_id = ?2)
                ORDER BY date ASC, player_id ASC
                "#,
            )
            .context("prepare wellness query")?;
        let rows = stmt
            .query_map(params![org_id, player_id], |row| {
                Ok(WellnessEntry {
                    id: row.get(0)?,
                    player_id: row.get(1)?,
                    date: row.get(2)?,
                    sleep: row.get(3)?,
                    fatigue: row.get(4)?,
                    soreness: row.get(5)?,
                    stress: row.get(6)?,
                    mood: row.get(7)?,
                    notes: row.get(8)?,
                })
            })
            .context("query wellness")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode wellness row")?);
        }
        Ok(out)
    }

    pub fn add_physical_test(&self, org_id: &str, test: &PhysicalTest) -> Result<PhysicalTest> {
        self.ensure_player(org_id, &test.player_id)?;
        let date = iso_date(&test.date)?;
        if test.test.trim().is_empty() {
            return Err(anyhow!("physical test name is empty"));
        }
        if !test.value.is_finite() {
            return Err(anyhow!("physical test value must be a number"));
        }

        let mut stored = test.clone();
        stored.date = date;
        stored.test = stored.test.trim().to_string();
        if stored.id.is_empty() {
            stored.id = new_id();
        }
        self.conn
            .execute(
                r#"
                INSERT INTO physical_tests (id, organization_id, player_id, date, test, value, unit, lower_is_better)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    stored.id,
                    org_id,
                    stored.player_id,
                    stored.date,
                    stored.test,
                    stored.value,
                    stored.unit,
                    bool_to_i64(stored.lower_is_better),
                ],
            )
            .context("insert physical test")?;
        Ok(stored)
    }

    pub fn physical_tests(&self, org_id: &str, player_id: Option<&str>) -> Result<Vec<PhysicalTest>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, player_id, date, test, value, unit, lower_is_better
                FROM physical_tests
                WHERE organization_id = ?1 AND (?2 IS NULL OR player_id = ?2)
                ORDER BY date ASC, test ASC, id ASC
                "#,
            )
            .context("prepare physical tests query")?;
        let rows = stmt
            .query_map(params![org_id, player_id], |row| {
                Ok(PhysicalTest {
                    id: row.get(0)?,
                    player_id: row.get(1)?,
                    date: row.get(2)?,
                    test: row.get(3)?,
                    value: row.get(4)?,
                    unit: row.get(5)?,
                    lower_is_better: row.get::<_, i64>(6)? != 0,
                })
            })
            .context("query physical tests")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode physical test row")?);
        }
        Ok(out)
    }

    pub fn add_medical_record(&self, org_id: &str, record: &MedicalRecord) -> Result<MedicalRecord> {
        self.ensure_player(org_id, &record.player_id)?;
        let started_on = iso_date(&record.started_on)?;
        let expected_return = record.expected_return.as_deref().map(iso_date).transpose()?;
        if record.description.trim().is_empty() {
            return Err(anyhow!("medical record needs a description"));
        }

        let mut stored = record.clone();
        stored.started_on = started_on;
        stored.expected_return = expected_return;
        if stored.id.is_empty() {
            stored.id = new_id();
        }
        self.conn
            .execute(
                r#"
                INSERT INTO medical_records (id, organization_id, player_id, kind, description, started_on, expected_return, status, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    stored.id,
                    org_id,
                    stored.player_id,
                    stored.kind.key(),
                    stored.description,
                    stored.started_on,
                    stored.expected_return,
                    stored.status.key(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("insert medical record")?;
        Ok(stored)
    }

    pub fn set_medical_status(
        &self,
        org_id: &str,
        record_id: &str,
        status: MedicalStatus,
    ) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE medical_records SET status = ?3, updated_at = ?4
                 WHERE organization_id = ?1 AND id = ?2",
                params![org_id, record_id, status.key(), Utc::now().to_rfc3339()],
            )
            .context("update medical status")?;
        Ok(changed > 0)
    }

    pub fn medical_records(
        &self,
        org_id: &str,
        player_id: Option<&str>,
    ) -> Result<Vec<MedicalRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, player_id, kind, description, started_on, expected_return, status
                FROM medical_records
                WHERE organization_id = ?1 AND (?2 IS NULL OR player_id = ?2)
                ORDER BY started_on DESC, id ASC
                "#,
            )
            .context("prepare medical records query")?;
        let rows = stmt
            .query_map(params![org_id, player_id], |row| {
                let kind: String = row.get(2)?;
                let status: String = row.get(6)?;
                Ok(MedicalRecord {
                    id: row.get(0)?,
                    player_id: row.get(1)?,
                    kind: MedicalKind::parse(&kind).unwrap_or(MedicalKind::Other),
                    description: row.get(3)?,
                    started_on: row.get(4)?,
                    expected_return: row.get(5)?,
                    status: MedicalStatus::parse(&status).unwrap_or(MedicalStatus::Active),
                })
            })
            .context("query medical records")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode medical record row")?);
        }
        Ok(out)
    }

    pub fn medical_record(&self, org_id: &str, record_id: &str) -> Result<Option<MedicalRecord>> {
        Ok(self
            .medical_records(org_id, None)?
            .into_iter()
            .find(|r| r.id == record_id))
    }

    /// Every open record: injuries, illnesses and the rest.
    pub fn active_medical_records(&self, org_id: &str) -> Result<Vec<MedicalRecord>> {
        Ok(self
            .medical_records(org_id, None)?
            .into_iter()
            .filter(|r| r.status == MedicalStatus::Active)
            .collect())
    }

    pub fn active_injuries(&self, org_id: &str) -> Result<Vec<MedicalRecord>> {
        Ok(self
            .active_medical_records(org_id)?
            .into_iter()
            .filter(|r| r.kind == MedicalKind::Injury)
            .collect())
    }

    fn ensure_player(&self, org_id: &str, player_id: &str) -> Result<()> {
        match self.player(org_id, player_id)? {
            Some(_) => Ok(()),
            None => Err(anyhow!("player {player_id} not found")),
        }
    }
}

pub fn validate_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("date {raw:?} must be YYYY-MM-DD"))
}

/// Canonical `YYYY-MM-DD` form, the only one written to the database.
fn iso_date(raw: &str) -> Result<String> {
    Ok(validate_date(raw)?.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::{iso_date, validate_date};

    #[test]
    fn dates_must_be_iso() {
        assert!(validate_date("2025-03-01").is_ok());
        assert!(validate_date("01/03/2025").is_err());
        assert!(validate_date("2025-02-30").is_err());
    }

    #[test]
    fn stored_dates_are_canonical() {
        assert_eq!(iso_date(" 2025-03-01 ").unwrap(), "2025-03-01");
    }
}
