use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const UNKNOWN_SERIES: &str = "Unknown series";

pub const COL_FRANCHISE: &str = "Franchise (series)";
pub const COL_FORMAT1: &str = "Content format 1";
pub const COL_VOLUME: &str = "volume/season";
pub const COL_SEQ: &str = "sequence number";
pub const COL_TITLE: &str = "title (chapter, not official title, just like \"chapter 2\")";
pub const COL_FORMAT2: &str = "Content format 2";
pub const COL_LN_VOLUME: &str = "LN volume";
pub const COL_LN_SEQ: &str = "LN sequence number";
pub const COL_LN_TITLE: &str = "LN title";
pub const COL_NOTES: &str = "notes";

/// Every header the sheet is expected to carry, in sheet order.
pub const COLUMNS: [&str; 10] = [
    COL_FRANCHISE,
    COL_FORMAT1,
    COL_VOLUME,
    COL_SEQ,
    COL_TITLE,
    COL_FORMAT2,
    COL_LN_VOLUME,
    COL_LN_SEQ,
    COL_LN_TITLE,
    COL_NOTES,
];

/// One mapping record. Header strings are only spelled out here; the rest of
/// the crate goes through the typed fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Row {
    #[serde(rename = "Franchise (series)", default, deserialize_with = "cell")]
    pub franchise: String,
    #[serde(rename = "Content format 1", default, deserialize_with = "cell")]
    pub format1: String,
    #[serde(rename = "volume/season", default, deserialize_with = "cell")]
    pub volume: String,
    #[serde(rename = "sequence number", default, deserialize_with = "cell")]
    pub seq: String,
    #[serde(
        rename = "title (chapter, not official title, just like \"chapter 2\")",
        default,
        deserialize_with = "cell"
    )]
    pub title: String,
    #[serde(rename = "Content format 2", default, deserialize_with = "cell")]
    pub format2: String,
    #[serde(rename = "LN volume", default, deserialize_with = "cell")]
    pub ln_volume: String,
    #[serde(rename = "LN sequence number", default, deserialize_with = "cell")]
    pub ln_seq: String,
    #[serde(rename = "LN title", default, deserialize_with = "cell")]
    pub ln_title: String,
    #[serde(rename = "notes", default, deserialize_with = "cell")]
    pub notes: String,
}

impl Row {
    /// Label used in the series list; empty franchises are grouped under a
    /// fallback name.
    pub fn series_label(&self) -> &str {
        if self.franchise.is_empty() {
            UNKNOWN_SERIES
        } else {
            &self.franchise
        }
    }

    pub fn is_manga_entry(&self) -> bool {
        self.format1.to_lowercase() == "manga" && !self.seq.trim().is_empty()
    }

    /// Numeric sort key for `seq`. Decimal and `0x`/`0o`/`0b` integers are
    /// read; anything else, including infinities, sorts as 0.
    pub fn seq_key(&self) -> f64 {
        let text = self.seq.trim();
        let value = match radix_literal(text) {
            Some((digits, radix)) => u64::from_str_radix(digits, radix).map(|n| n as f64).ok(),
            None if text.chars().any(|ch| ch.is_ascii_digit()) => text.parse::<f64>().ok(),
            None => None,
        };
        value.filter(|value| value.is_finite()).unwrap_or(0.0)
    }

    pub fn ln_title(&self) -> Option<&str> {
        non_blank(&self.ln_title)
    }

    pub fn ln_volume(&self) -> Option<&str> {
        non_blank(&self.ln_volume)
    }

    pub fn ln_seq(&self) -> Option<&str> {
        non_blank(&self.ln_seq)
    }

    pub fn notes(&self) -> Option<&str> {
        non_blank(&self.notes)
    }
}

fn radix_literal(text: &str) -> Option<(&str, u32)> {
    let prefix = text.get(..2)?;
    let radix = match prefix {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    Some((&text[2..], radix))
}

fn non_blank(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Result of decoding one sheet download.
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    pub received: usize,
    pub rows: Vec<Row>,
    pub missing_columns: Vec<&'static str>,
}

/// Decodes the JSON body and keeps manga rows with a sequence number.
pub fn parse_sheet(body: &str) -> serde_json::Result<SheetData> {
    let records: Vec<serde_json::Map<String, Value>> = serde_json::from_str(body)?;
    let missing_columns = COLUMNS
        .iter()
        .copied()
        .filter(|column| !records.iter().any(|record| record.contains_key(*column)))
        .collect();

    let received = records.len();
    let mut rows = Vec::with_capacity(received);
    for record in records {
        let row: Row = serde_json::from_value(Value::Object(record))?;
        if row.is_manga_entry() {
            rows.push(row);
        }
    }

    Ok(SheetData {
        received,
        rows,
        missing_columns,
    })
}

fn cell<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(cell_text(value.unwrap_or(Value::Null)))
}

// Falsy cells (null, false, 0, "") read as blank.
fn cell_text(value: Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "true".to_string(),
        Value::Number(number) => match number.as_f64() {
            Some(value) if value == 0.0 => String::new(),
            Some(value) if number.is_f64() && value.fract() == 0.0 && value.abs() < 1e21 => {
                format!("{value:.0}")
            }
            _ => number.to_string(),
        },
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_manga_rows_with_sequence() {
        let body = r#"[
            {"Franchise (series)": "X", "Content format 1": "Manga", "sequence number": "1"},
            {"Franchise (series)": "X", "Content format 1": "MANGA", "sequence number": "2"},
            {"Franchise (series)": "X", "Content format 1": "Anime", "sequence number": "3"},
            {"Franchise (series)": "X", "Content format 1": "manga", "sequence number": ""},
            {"Franchise (series)": "X", "Content format 1": "manga", "sequence number": "  "},
            {"Franchise (series)": "X", "sequence number": "4"}
        ]"#;
        let sheet = parse_sheet(body).unwrap();
        assert_eq!(sheet.received, 6);
        assert_eq!(sheet.rows.len(), 2);
        for row in &sheet.rows {
            assert_eq!(row.format1.to_lowercase(), "manga");
            assert!(!row.seq.trim().is_empty());
        }
    }

    #[test]
    fn maps_literal_headers_to_fields() {
        let body = r#"[{
            "Franchise (series)": "Frieren",
            "Content format 1": "Manga",
            "volume/season": "Vol. 2",
            "sequence number": "12",
            "title (chapter, not official title, just like \"chapter 2\")": "chapter 12",
            "Content format 2": "Light Novel",
            "LN volume": "1",
            "LN sequence number": "4",
            "LN title": "Part 4",
            "notes": "partial adaptation",
            "Some other column": "ignored"
        }]"#;
        let sheet = parse_sheet(body).unwrap();
        let row = &sheet.rows[0];
        assert_eq!(row.franchise, "Frieren");
        assert_eq!(row.volume, "Vol. 2");
        assert_eq!(row.seq, "12");
        assert_eq!(row.title, "chapter 12");
        assert_eq!(row.format2, "Light Novel");
        assert_eq!(row.ln_volume(), Some("1"));
        assert_eq!(row.ln_seq(), Some("4"));
        assert_eq!(row.ln_title(), Some("Part 4"));
        assert_eq!(row.notes(), Some("partial adaptation"));
        assert!(sheet.missing_columns.is_empty());
    }

    #[test]
    fn normalizes_non_text_cells() {
        let body = r#"[{
            "Content format 1": "manga",
            "sequence number": 7,
            "volume/season": 0,
            "LN title": null,
            "notes": false
        }]"#;
        let sheet = parse_sheet(body).unwrap();
        let row = &sheet.rows[0];
        assert_eq!(row.seq, "7");
        assert_eq!(row.volume, "");
        assert_eq!(row.ln_title(), None);
        assert_eq!(row.notes(), None);
    }

    #[test]
    fn numeric_zero_sequence_is_dropped() {
        let body = r#"[{"Content format 1": "manga", "sequence number": 0}]"#;
        let sheet = parse_sheet(body).unwrap();
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn reports_headers_absent_from_every_record() {
        let body = r#"[
            {"Content format 1": "manga", "sequence number": "1", "LN title": "a"},
            {"Content format 1": "manga", "sequence number": "2"}
        ]"#;
        let sheet = parse_sheet(body).unwrap();
        assert!(sheet.missing_columns.contains(&COL_FRANCHISE));
        assert!(sheet.missing_columns.contains(&COL_NOTES));
        assert!(!sheet.missing_columns.contains(&COL_LN_TITLE));
        assert!(!sheet.missing_columns.contains(&COL_SEQ));
    }

    #[test]
    fn rejects_non_array_bodies() {
        assert!(parse_sheet(r#"{"error": "not found"}"#).is_err());
        assert!(parse_sheet("<html>").is_err());
        assert!(parse_sheet("[1, 2]").is_err());
    }

    #[test]
    fn seq_key_coerces_garbage_to_zero() {
        let row = |seq: &str| Row {
            seq: seq.to_string(),
            ..Row::default()
        };
        assert_eq!(row("12").seq_key(), 12.0);
        assert_eq!(row(" 3.5 ").seq_key(), 3.5);
        assert_eq!(row("12a").seq_key(), 0.0);
        assert_eq!(row("NaN").seq_key(), 0.0);
        assert_eq!(row("").seq_key(), 0.0);
        assert_eq!(row("inf").seq_key(), 0.0);
        assert_eq!(row("+Infinity").seq_key(), 0.0);
        assert_eq!(row("1e400").seq_key(), 0.0);
        assert_eq!(row("0x10").seq_key(), 16.0);
        assert_eq!(row("0b101").seq_key(), 5.0);
        assert_eq!(row("0xZZ").seq_key(), 0.0);
        assert_eq!(row("1e2").seq_key(), 100.0);
    }

    #[test]
    fn whole_float_cells_drop_the_fraction() {
        let body = r#"[{"Content format 1": "manga", "sequence number": 3.0, "LN volume": 2.5}]"#;
        let sheet = parse_sheet(body).unwrap();
        let row = &sheet.rows[0];
        assert_eq!(row.seq, "3");
        assert_eq!(row.ln_volume, "2.5");
    }

    #[test]
    fn series_label_falls_back_for_blank_franchise() {
        let row = Row::default();
        assert_eq!(row.series_label(), UNKNOWN_SERIES);
        let row = Row {
            franchise: "X".to_string(),
            ..Row::default()
        };
        assert_eq!(row.series_label(), "X");
    }
}
