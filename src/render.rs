use crate::{sheet::Row, state::ViewState};
use serde::Serialize;

pub const PLACEHOLDER: &str = "—";
pub const EMPTY_MESSAGE: &str = "No chapters match your filters.";
pub const SELECT_PROMPT: &str = "Select a row to see details.";
pub const NO_LN_MAPPING: &str = "No LN mapping for this chapter.";
pub const NO_DUPLICATES: &str = "No duplicates in this series.";
pub const NO_NOTES: &str = "No notes.";

pub const TABLE_HEADERS: [&str; 7] = ["#", "Volume", "Title", "Format", "LN Vol", "LN Title", ""];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLine {
    Chapter(ChapterLine),
    Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterLine {
    pub row_id: usize,
    pub seq: String,
    pub volume: String,
    pub title: String,
    pub title_badge: Option<usize>,
    pub format: String,
    pub ln_volume: String,
    pub ln_title: String,
    pub ln_badge: Option<usize>,
    pub selected: bool,
}

pub fn badge_label(count: usize) -> String {
    format!("×{count}")
}

fn badge(count: usize) -> Option<usize> {
    (count > 1).then_some(count)
}

fn or_placeholder(value: Option<&str>) -> String {
    value.unwrap_or(PLACEHOLDER).to_string()
}

pub fn table_lines(state: &ViewState) -> Vec<TableLine> {
    let view = state.view();
    let lines: Vec<TableLine> = state
        .visible_rows()
        .map(|(row_id, row)| {
            TableLine::Chapter(ChapterLine {
                row_id,
                seq: row.seq.clone(),
                volume: row.volume.clone(),
                title: row.title.clone(),
                title_badge: badge(view.manga_count(row)),
                format: row.format1.clone(),
                ln_volume: or_placeholder(row.ln_volume()),
                ln_title: or_placeholder(row.ln_title()),
                ln_badge: badge(view.ln_count(row)),
                selected: state.selected() == Some(row_id),
            })
        })
        .collect();
    if lines.is_empty() {
        return vec![TableLine::Empty(EMPTY_MESSAGE)];
    }
    lines
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailPanel {
    Placeholder,
    Chapter(ChapterDetail),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LnReference {
    pub volume: String,
    pub seq: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDetail {
    pub series: String,
    pub volume: String,
    pub seq: String,
    pub title: String,
    pub ln: Option<LnReference>,
    pub formats: String,
    pub duplicates: Vec<String>,
    pub notes: String,
}

pub fn detail_panel(state: &ViewState) -> DetailPanel {
    let Some(row) = state.selected_row() else {
        return DetailPanel::Placeholder;
    };
    let view = state.view();
    DetailPanel::Chapter(chapter_detail(row, view.manga_count(row), view.ln_count(row)))
}

fn chapter_detail(row: &Row, manga_count: usize, ln_count: usize) -> ChapterDetail {
    let text = |value: &str| {
        if value.trim().is_empty() {
            PLACEHOLDER.to_string()
        } else {
            value.to_string()
        }
    };

    let ln = row.ln_title().map(|title| LnReference {
        volume: or_placeholder(row.ln_volume()),
        seq: or_placeholder(row.ln_seq()),
        title: title.to_string(),
    });

    let mut duplicates = Vec::new();
    if manga_count > 1 {
        duplicates.push(format!(
            "Manga title appears {manga_count} times in this series."
        ));
    }
    if ln_count > 1 {
        duplicates.push(format!("LN title appears {ln_count} times in this series."));
    }
    if duplicates.is_empty() {
        duplicates.push(NO_DUPLICATES.to_string());
    }

    ChapterDetail {
        series: row.series_label().to_string(),
        volume: text(&row.volume),
        seq: text(&row.seq),
        title: text(&row.title),
        ln,
        formats: format!("{} → {}", text(&row.format1), text(&row.format2)),
        duplicates,
        notes: row.notes().unwrap_or(NO_NOTES).to_string(),
    }
}

impl ChapterDetail {
    pub fn to_text(&self) -> String {
        let mut out = vec![
            format!("Series: {}", self.series),
            format!("Manga: vol {} · #{} · {}", self.volume, self.seq, self.title),
        ];
        match &self.ln {
            Some(ln) => out.push(format!("LN: vol {} · #{} · {}", ln.volume, ln.seq, ln.title)),
            None => out.push(format!("LN: {NO_LN_MAPPING}")),
        }
        out.push(format!("Format: {}", self.formats));
        out.extend(self.duplicates.iter().map(|line| format!("Duplicates: {line}")));
        out.push(format!("Notes: {}", self.notes));
        out.join("\n")
    }
}

/// Plain-text table with aligned columns, used by `--print`.
pub fn plain_table(lines: &[TableLine]) -> String {
    let mut grid: Vec<Vec<String>> = vec![TABLE_HEADERS[..6].iter().map(|h| h.to_string()).collect()];
    for line in lines {
        match line {
            TableLine::Empty(message) => {
                let header = grid.remove(0);
                let mut out = render_grid(&[header]);
                out.push('\n');
                out.push_str(message);
                return out;
            }
            TableLine::Chapter(chapter) => grid.push(vec![
                chapter.seq.clone(),
                chapter.volume.clone(),
                with_badge(&chapter.title, chapter.title_badge),
                chapter.format.clone(),
                chapter.ln_volume.clone(),
                with_badge(&chapter.ln_title, chapter.ln_badge),
            ]),
        }
    }
    render_grid(&grid)
}

fn with_badge(text: &str, badge: Option<usize>) -> String {
    match badge {
        Some(count) => format!("{text} [{}]", badge_label(count)),
        None => text.to_string(),
    }
}

fn render_grid(grid: &[Vec<String>]) -> String {
    let columns = grid.first().map(Vec::len).unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            grid.iter()
                .map(|cells| cells[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();
    grid.iter()
        .map(|cells| {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| {
                    let pad = width.saturating_sub(cell.chars().count());
                    format!("{cell}{}", " ".repeat(pad))
                })
                .collect();
            padded.join("  ").trim_end().to_string()
        })
        .collect::<Vec<String>>()
        .join("\n")
}
