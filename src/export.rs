use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};

use crate::model::{Category, Evaluation, Match, MedicalRecord, PhysicalTest, Player, WellnessEntry};
use crate::summary::{
    Roster, best_physical_marks, format_avg, summarize_evaluations, summarize_wellness,
};
use crate::theme::Theme;

pub const EVALUATION_SUMMARY_HEADERS: [&str; 9] = [
    "Jugador",
    "Partidos",
    "Minutos",
    "Goles",
    "Asistencias",
    "Amarillas",
    "Rojas",
    "Valoración Media",
    "Promedio Goles por Partido",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    /// Sheet or page name with the number of data rows written to it.
    pub sections: Vec<(String, usize)>,
}

impl ExportReport {
    pub fn rows(&self) -> usize {
        self.sections.iter().map(|(_, n)| n).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Written(ExportReport),
    /// Nothing to export; no file was created.
    Empty { reason: String },
}

struct Sheet {
    name: &'static str,
    rows: Vec<Vec<String>>,
    widths: &'static [f64],
}

pub fn export_roster_workbook(
    path: &Path,
    theme: &Theme,
    players: &[Player],
    categories: &[Category],
    injuries: &[MedicalRecord],
) -> Result<ExportOutcome> {
    if players.is_empty() {
        return Ok(empty("no players in the roster"));
    }
    let rows = roster_rows(players, categories, injuries);
    write_workbook(
        path,
        theme,
        vec![Sheet {
            name: "Plantilla",
            rows,
            widths: &[28.0, 8.0, 14.0, 18.0, 10.0, 36.0],
        }],
    )
}

pub fn export_evaluations_workbook(
    path: &Path,
    theme: &Theme,
    players: &[Player],
    matches: &[Match],
    evaluations: &[Evaluation],
) -> Result<ExportOutcome> {
    if evaluations.is_empty() {
        return Ok(empty("no evaluations recorded"));
    }
    let roster = Roster::new(players);
    let by_match: HashMap<&str, &Match> = matches.iter().map(|m| (m.id.as_str(), m)).collect();

    let mut raw = vec![header(&[
        "Fecha",
        "Rival",
        "Jugador",
        "Minutos",
        "Goles",
        "Asistencias",
        "Amarillas",
        "Rojas",
        "Valoración",
        "Notas",
    ])];
    for e in evaluations {
        let (date, opponent) = by_match
            .get(e.match_id.as_str())
            .map(|m| (m.kickoff.clone(), m.opponent.clone()))
            .unwrap_or_else(|| (String::new(), e.match_id.clone()));
        raw.push(vec![
            date,
            opponent,
            roster.display_name(&e.player_id),
            e.minutes.to_string(),
            e.goals.to_string(),
            e.assists.to_string(),
            e.yellow_cards.to_string(),
            e.red_cards.to_string(),
            e.rating.map(|r| format!("{r:.1}")).unwrap_or_default(),
            e.notes.clone(),
        ]);
    }

    write_workbook(
        path,
        theme,
        vec![
            Sheet {
                name: "Evaluaciones",
                rows: raw,
                widths: &[12.0, 24.0, 28.0, 9.0, 7.0, 11.0, 10.0, 7.0, 11.0, 40.0],
            },
            Sheet {
                name: "Resumen",
                rows: evaluation_summary_rows(&roster, evaluations),
                widths: &[28.0, 9.0, 9.0, 7.0, 11.0, 10.0, 7.0, 16.0, 26.0],
            },
        ],
    )
}

pub fn export_performance_workbook(
    path: &Path,
    theme: &Theme,
    players: &[Player],
    wellness: &[WellnessEntry],
    physical: &[PhysicalTest],
) -> Result<ExportOutcome> {
    if wellness.is_empty() && physical.is_empty() {
        return Ok(empty("no wellness or physical data recorded"));
    }
    let roster = Roster::new(players);

    let mut wellness_rows = vec![header(&[
        "Jugador", "Fecha", "Sueño", "Fatiga", "Dolor", "Estrés", "Ánimo", "Notas",
    ])];
    for w in wellness {
        wellness_rows.push(vec![
            roster.display_name(&w.player_id),
            w.date.clone(),
            w.sleep.to_string(),
            w.fatigue.to_string(),
            w.soreness.to_string(),
            w.stress.to_string(),
            w.mood.to_string(),
            w.notes.clone(),
        ]);
    }

    let mut wellness_summary = summarize_wellness(wellness);
    wellness_summary.sort_by_key(|s| roster.sort_key(&s.player_id));
    let mut wellness_summary_rows = vec![header(&[
        "Jugador", "Registros", "Sueño", "Fatiga", "Dolor", "Estrés", "Ánimo",
    ])];
    for s in &wellness_summary {
        wellness_summary_rows.push(vec![
            roster.display_name(&s.player_id),
            s.entries.to_string(),
            format_avg(s.sleep),
            format_avg(s.fatigue),
            format_avg(s.soreness),
            format_avg(s.stress),
            format_avg(s.mood),
        ]);
    }

    let mut physical_rows = vec![header(&["Jugador", "Fecha", "Prueba", "Valor", "Unidad"])];
    for t in physical {
        physical_rows.push(vec![
            roster.display_name(&t.player_id),
            t.date.clone(),
            t.test.clone(),
            format_avg(t.value),
            t.unit.clone(),
        ]);
    }

    let mut best = best_physical_marks(physical);
    best.sort_by_key(|b| (roster.sort_key(&b.player_id), b.test.to_lowercase()));
    let mut best_rows = vec![header(&[
        "Jugador",
        "Prueba",
        "Mejor Marca",
        "Unidad",
        "Fecha",
        "Intentos",
    ])];
    for b in &best {
        best_rows.push(vec![
            roster.display_name(&b.player_id),
            b.test.clone(),
            format_avg(b.best),
            b.unit.clone(),
            b.date.clone(),
            b.attempts.to_string(),
        ]);
    }

    write_workbook(
        path,
        theme,
        vec![
            Sheet {
                name: "Wellness",
                rows: wellness_rows,
                widths: &[28.0, 12.0, 8.0, 8.0, 8.0, 8.0, 8.0, 40.0],
            },
            Sheet {
                name: "WellnessResumen",
                rows: wellness_summary_rows,
                widths: &[28.0, 10.0, 8.0, 8.0, 8.0, 8.0, 8.0],
            },
            Sheet {
                name: "Fisico",
                rows: physical_rows,
                widths: &[28.0, 12.0, 22.0, 10.0, 8.0],
            },
            Sheet {
                name: "FisicoMejores",
                rows: best_rows,
                widths: &[28.0, 22.0, 12.0, 8.0, 12.0, 9.0],
            },
        ],
    )
}

/// The "Resumen" sheet: one row per player id, sorted by display name.
pub fn evaluation_summary_rows(roster: &Roster<'_>, evaluations: &[Evaluation]) -> Vec<Vec<String>> {
    let mut summary = summarize_evaluations(evaluations);
    summary.sort_by_key(|s| roster.sort_key(&s.player_id));

    let mut rows = vec![header(&EVALUATION_SUMMARY_HEADERS)];
    for s in &summary {
        rows.push(vec![
            roster.display_name(&s.player_id),
            s.matches.to_string(),
            s.minutes.to_string(),
            s.goals.to_string(),
            s.assists.to_string(),
            s.yellow_cards.to_string(),
            s.red_cards.to_string(),
            s.rating_avg.map(format_avg).unwrap_or_default(),
            format_avg(s.goals_per_match()),
        ]);
    }
    rows
}

pub fn roster_rows(
    players: &[Player],
    categories: &[Category],
    injuries: &[MedicalRecord],
) -> Vec<Vec<String>> {
    let category_names: HashMap<&str, &str> = categories
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();
    let mut injured: HashMap<&str, Vec<&str>> = HashMap::new();
    for record in injuries {
        injured
            .entry(record.player_id.as_str())
            .or_default()
            .push(record.description.as_str());
    }

    let roster = Roster::new(players);
    let mut sorted: Vec<&Player> = players.iter().collect();
    sorted.sort_by_key(|p| (p.jersey_number.unwrap_or(u32::MAX), roster.sort_key(&p.id)));

    let mut rows = vec![header(&[
        "Jugador",
        "Dorsal",
        "Posición",
        "Categoría",
        "Estado",
        "Lesión Activa",
    ])];
    for p in sorted {
        rows.push(vec![
            p.name.clone(),
            p.jersey_number.map(|n| n.to_string()).unwrap_or_default(),
            p.position.map(|pos| pos.key().to_string()).unwrap_or_default(),
            p.category_id
                .as_deref()
                .and_then(|id| category_names.get(id).copied())
                .unwrap_or_default()
                .to_string(),
            if p.deleted { "Baja" } else { "Activo" }.to_string(),
            injured
                .get(p.id.as_str())
                .map(|list| list.join("; "))
                .unwrap_or_default(),
        ]);
    }
    rows
}

fn write_workbook(path: &Path, theme: &Theme, sheets: Vec<Sheet>) -> Result<ExportOutcome> {
    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(theme.primary_u32()));

    let mut workbook = Workbook::new();
    let mut sections = Vec::with_capacity(sheets.len());
    for sheet in &sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name)?;
        for (col, width) in sheet.widths.iter().enumerate() {
            worksheet.set_column_width(col as u16, *width)?;
        }
        write_rows(worksheet, &sheet.rows, &header_format)?;
        sections.push((
            sheet.name.to_string(),
            sheet.rows.len().saturating_sub(1),
        ));
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    log::info!("wrote {} ({} sheets)", path.display(), sections.len());

    Ok(ExportOutcome::Written(ExportReport {
        path: path.to_path_buf(),
        sections,
    }))
}

/// First row is the header and gets the themed format.
fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>], header: &Format) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            let written = if row_idx == 0 {
                worksheet.write_string_with_format(r, c, value, header)
            } else {
                worksheet.write_string(r, c, value)
            };
            written.with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

fn header(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

fn empty(reason: &str) -> ExportOutcome {
    ExportOutcome::Empty {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(player: &str, match_id: &str, goals: u32) -> Evaluation {
        Evaluation {
            id: String::new(),
            match_id: match_id.to_string(),
            player_id: player.to_string(),
            minutes: 90,
            goals,
            assists: 0,
            yellow_cards: 0,
            red_cards: 0,
            rating: None,
            notes: String::new(),
        }
    }

    fn player(id: &str, name: &str) -> Player {
        Player {
            id: id.to_string(),
            organization_id: "org".to_string(),
            category_id: None,
            name: name.to_string(),
            jersey_number: None,
            position: None,
            deleted: false,
        }
    }

    #[test]
    fn summary_row_for_three_matches() {
        let players = vec![player("p1", "Ana")];
        let roster = Roster::new(&players);
        let rows = evaluation_summary_rows(
            &roster,
            &[eval("p1", "m1", 1), eval("p1", "m2", 0), eval("p1", "m3", 2)],
        );
        assert_eq!(rows[0], header(&EVALUATION_SUMMARY_HEADERS));
        assert_eq!(rows[1][0], "Ana");
        assert_eq!(rows[1][1], "3");
        assert_eq!(rows[1][3], "3");
        assert_eq!(rows[1][8], "1.00");
    }

    #[test]
    fn roster_rows_mark_deleted_and_injured() {
        let mut gone = player("p2", "Luis");
        gone.deleted = true;
        let mut nine = player("p1", "Ana");
        nine.jersey_number = Some(9);
        let injury = MedicalRecord {
            id: "r1".to_string(),
            player_id: "p1".to_string(),
            kind: crate::model::MedicalKind::Injury,
            description: "Esguince".to_string(),
            started_on: "2025-03-01".to_string(),
            expected_return: None,
            status: crate::model::MedicalStatus::Active,
        };
        let rows = roster_rows(&[gone, nine], &[], &[injury]);
        assert_eq!(rows[1][0], "Ana");
        assert_eq!(rows[1][5], "Esguince");
        assert_eq!(rows[2][4], "Baja");
    }
}
