use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use printpdf::{
    BuiltinFont, Color, Line, LinePoint, Mm, Op, PaintMode, PdfDocument, PdfPage, PdfSaveOptions,
    Point, Polygon, PolygonRing, Pt, Rgb, TextItem, WindingOrder,
};

use crate::export::{ExportOutcome, ExportReport};
use crate::formation::{Formation, PositionSlot};
use crate::lineup::LineupRecord;
use crate::model::{Match, Player};
use crate::summary::Roster;
use crate::theme::Theme;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;

const PITCH_LEFT: f32 = MARGIN;
const PITCH_RIGHT: f32 = PAGE_WIDTH - MARGIN;
const PITCH_BOTTOM: f32 = 25.0;
const PITCH_TOP: f32 = 262.0;

const LINE_HEIGHT: f32 = 6.5;
const TEXT_TOP: f32 = PAGE_HEIGHT - MARGIN - 12.0;
const COMMENT_WRAP: usize = 88;

const GRASS: Rgb = Rgb {
    r: 0.16,
    g: 0.52,
    b: 0.25,
    icc_profile: None,
};
const CHALK: Rgb = Rgb {
    r: 1.0,
    g: 1.0,
    b: 1.0,
    icc_profile: None,
};
const INK: Rgb = Rgb {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    icc_profile: None,
};
const MUTED: Rgb = Rgb {
    r: 0.85,
    g: 0.85,
    b: 0.85,
    icc_profile: None,
};

/// One line of the text summary.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryLine {
    Heading(String),
    Item(String),
    Blank,
}

/// Page-space position (mm) for a layout slot. `top` 0 is the opponent's goal line.
pub fn pitch_point(slot: &PositionSlot) -> (f32, f32) {
    let x = PITCH_LEFT + (PITCH_RIGHT - PITCH_LEFT) * (slot.left as f32 / 100.0);
    let y = PITCH_TOP - (PITCH_TOP - PITCH_BOTTOM) * (slot.top as f32 / 100.0);
    (x, y)
}

pub fn lines_per_page() -> usize {
    ((TEXT_TOP - MARGIN) / LINE_HEIGHT) as usize
}

pub fn export_lineup_pdf(
    path: &Path,
    theme: &Theme,
    club: &str,
    fixture: &Match,
    players: &[Player],
    record: &LineupRecord,
) -> Result<ExportOutcome> {
    if record.positions.is_empty() && record.substitutes.is_empty() && record.not_called.is_empty()
    {
        return Ok(ExportOutcome::Empty {
            reason: format!("lineup for match {} has nobody in it", fixture.id),
        });
    }
    let formation = Formation::parse(&record.formation)?;
    let roster = Roster::new(players);
    let title = format!("{club} vs {} ({})", fixture.opponent, fixture.kickoff);

    let mut sections = Vec::new();
    let mut pages = Vec::new();

    let (pitch_ops, placed) = pitch_page(theme, &title, &formation, &roster, record);
    pages.push(PdfPage::new(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), pitch_ops));
    sections.push(("Campo".to_string(), placed));

    let lines = summary_lines(&formation, &roster, record);
    let per_page = lines_per_page().max(1);
    for (idx, chunk) in lines.chunks(per_page).enumerate() {
        let mut page = PageOps::default();
        page.text(
            MARGIN,
            PAGE_HEIGHT - MARGIN,
            11.0,
            BuiltinFont::HelveticaBold,
            &format!("{title} - resumen {}", idx + 1),
            theme.primary_rgb(),
        );
        let mut y = TEXT_TOP;
        for line in chunk {
            match line {
                SummaryLine::Heading(text) => {
                    page.text(MARGIN, y, 12.0, BuiltinFont::HelveticaBold, text, theme.primary_rgb())
                }
                SummaryLine::Item(text) => page.text(
                    MARGIN + 4.0,
                    y,
                    10.0,
                    BuiltinFont::Helvetica,
                    text,
                    (INK.r, INK.g, INK.b),
                ),
                SummaryLine::Blank => {}
            }
            y -= LINE_HEIGHT;
        }
        pages.push(PdfPage::new(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), page.into_ops()));
        sections.push((format!("Resumen {}", idx + 1), chunk.len()));
    }

    let mut doc = PdfDocument::new(&title);
    doc.with_pages(pages);
    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        log::debug!("pdf export produced {} warnings", warnings.len());
    }
    fs::write(path, bytes).with_context(|| format!("failed writing pdf to {}", path.display()))?;
    log::info!("wrote {} ({} pages)", path.display(), sections.len());

    Ok(ExportOutcome::Written(ExportReport {
        path: path.to_path_buf(),
        sections,
    }))
}

/// Starting XI in layout order, then bench, not called, substitutions and comments.
pub fn summary_lines(
    formation: &Formation,
    roster: &Roster<'_>,
    record: &LineupRecord,
) -> Vec<SummaryLine> {
    let player_label = |id: &str| match roster.jersey(id) {
        Some(n) => format!("#{n} {}", roster.display_name(id)),
        None => roster.display_name(id),
    };

    let mut lines = vec![SummaryLine::Heading(format!("Titulares ({formation})"))];
    for slot in formation.layout() {
        let who = record
            .positions
            .get(&slot.label)
            .map(|id| player_label(id))
            .unwrap_or_else(|| "-".to_string());
        lines.push(SummaryLine::Item(format!("{:<5} {who}", slot.label)));
    }

    push_group(&mut lines, "Suplentes", &record.substitutes, &player_label);
    push_group(&mut lines, "No convocados", &record.not_called, &player_label);

    lines.push(SummaryLine::Blank);
    lines.push(SummaryLine::Heading("Cambios".to_string()));
    if record.substitutions.is_empty() {
        lines.push(SummaryLine::Item("Sin cambios".to_string()));
    }
    for sub in &record.substitutions {
        lines.push(SummaryLine::Item(format!(
            "{}'  >> {}  << {}",
            sub.minute,
            player_label(&sub.player_in),
            player_label(&sub.player_out)
        )));
    }

    let comments = record.match_comments.trim();
    if !comments.is_empty() {
        lines.push(SummaryLine::Blank);
        lines.push(SummaryLine::Heading("Comentarios".to_string()));
        for paragraph in comments.lines() {
            for wrapped in wrap(paragraph, COMMENT_WRAP) {
                lines.push(SummaryLine::Item(wrapped));
            }
        }
    }
    lines
}

fn push_group(
    lines: &mut Vec<SummaryLine>,
    heading: &str,
    ids: &[String],
    label: &impl Fn(&str) -> String,
) {
    lines.push(SummaryLine::Blank);
    lines.push(SummaryLine::Heading(format!("{heading} ({})", ids.len())));
    for id in ids {
        lines.push(SummaryLine::Item(label(id)));
    }
}

fn pitch_page(
    theme: &Theme,
    title: &str,
    formation: &Formation,
    roster: &Roster<'_>,
    record: &LineupRecord,
) -> (Vec<Op>, usize) {
    let mut page = PageOps::default();
    page.text(
        MARGIN,
        PAGE_HEIGHT - MARGIN,
        14.0,
        BuiltinFont::HelveticaBold,
        title,
        theme.primary_rgb(),
    );
    page.text(
        MARGIN,
        PAGE_HEIGHT - MARGIN - 7.0,
        10.0,
        BuiltinFont::Helvetica,
        &format!("Formación {formation}"),
        (INK.r, INK.g, INK.b),
    );

    page.fill_rect(PITCH_LEFT, PITCH_BOTTOM, PITCH_RIGHT, PITCH_TOP, GRASS);
    page.stroke(CHALK, 0.8);
    page.rect(PITCH_LEFT, PITCH_BOTTOM, PITCH_RIGHT, PITCH_TOP);
    let mid_y = (PITCH_TOP + PITCH_BOTTOM) / 2.0;
    page.line(PITCH_LEFT, mid_y, PITCH_RIGHT, mid_y);

    let width = PITCH_RIGHT - PITCH_LEFT;
    let depth = (PITCH_TOP - PITCH_BOTTOM) * 0.16;
    let box_left = PITCH_LEFT + width * 0.25;
    let box_right = PITCH_RIGHT - width * 0.25;
    page.rect(box_left, PITCH_TOP - depth, box_right, PITCH_TOP);
    page.rect(box_left, PITCH_BOTTOM, box_right, PITCH_BOTTOM + depth);

    let mut placed = 0;
    for slot in formation.layout() {
        let (x, y) = pitch_point(&slot);
        match record.positions.get(&slot.label) {
            Some(id) => {
                placed += 1;
                page.fill_rect(x - 3.5, y - 3.5, x + 3.5, y + 3.5, to_rgb(theme.accent_rgb()));
                let number = roster
                    .jersey(id)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| slot.label.clone());
                page.text(
                    x - 2.5,
                    y - 1.2,
                    8.0,
                    BuiltinFont::HelveticaBold,
                    &number,
                    (INK.r, INK.g, INK.b),
                );
                let name = roster.display_name(id);
                page.text(
                    x - name.chars().count() as f32 * 0.8,
                    y - 8.0,
                    8.0,
                    BuiltinFont::Helvetica,
                    &name,
                    (CHALK.r, CHALK.g, CHALK.b),
                );
            }
            None => page.text(
                x - 3.0,
                y - 1.2,
                8.0,
                BuiltinFont::Helvetica,
                &slot.label,
                (MUTED.r, MUTED.g, MUTED.b),
            ),
        }
    }
    (page.into_ops(), placed)
}

#[derive(Default)]
struct PageOps {
    ops: Vec<Op>,
}

impl PageOps {
    fn into_ops(self) -> Vec<Op> {
        self.ops
    }

    fn text(&mut self, x: f32, y: f32, size: f32, font: BuiltinFont, text: &str, rgb: (f32, f32, f32)) {
        self.ops.push(Op::SetFillColor {
            col: Color::Rgb(to_rgb(rgb)),
        });
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetTextCursor {
            pos: Point::new(Mm(x), Mm(y)),
        });
        self.ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(size),
            font,
        });
        self.ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_string())],
            font,
        });
        self.ops.push(Op::EndTextSection);
    }

    fn stroke(&mut self, col: Rgb, thickness: f32) {
        self.ops.push(Op::SetOutlineColor {
            col: Color::Rgb(col),
        });
        self.ops.push(Op::SetOutlineThickness { pt: Pt(thickness) });
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.ops.push(Op::DrawLine {
            line: Line {
                points: vec![point(x1, y1), point(x2, y2)],
                is_closed: false,
            },
        });
    }

    fn rect(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.ops.push(Op::DrawLine {
            line: Line {
                points: corners(x1, y1, x2, y2),
                is_closed: true,
            },
        });
    }

    fn fill_rect(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, col: Rgb) {
        self.ops.push(Op::SetFillColor {
            col: Color::Rgb(col),
        });
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: corners(x1, y1, x2, y2),
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point::new(Mm(x), Mm(y)),
        bezier: false,
    }
}

fn corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<LinePoint> {
    vec![point(x1, y1), point(x2, y1), point(x2, y2), point(x1, y2)]
}

fn to_rgb((r, g, b): (f32, f32, f32)) -> Rgb {
    Rgb {
        r,
        g,
        b,
        icc_profile: None,
    }
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goalkeeper_sits_near_own_goal() {
        let formation = Formation::parse("4-3-3").unwrap();
        let layout = formation.layout();
        let (gx, gy) = pitch_point(&layout[0]);
        assert!((gx - PAGE_WIDTH / 2.0).abs() < 0.01);
        let (_, fy) = pitch_point(layout.last().unwrap());
        assert!(gy < fy);
    }

    #[test]
    fn wrap_keeps_words_whole() {
        let lines = wrap("uno dos tres cuatro", 8);
        assert_eq!(lines, vec!["uno dos", "tres", "cuatro"]);
    }
}
