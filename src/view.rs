use crate::sheet::Row;
use std::{cmp::Ordering, collections::HashMap};

/// Sorted, distinct series labels. The first entry is the default selection.
pub fn series_index(rows: &[Row]) -> Vec<String> {
    let mut series: Vec<String> = rows.iter().map(|row| row.series_label().to_string()).collect();
    series.sort();
    series.dedup();
    series
}

pub type TitleCounts = HashMap<String, usize>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterView {
    /// Indices into the loaded rows, in display order.
    pub visible: Vec<usize>,
    /// Rows in the current series before the search filter.
    pub series_total: usize,
    pub manga_counts: TitleCounts,
    pub ln_counts: TitleCounts,
}

impl ChapterView {
    pub fn manga_count(&self, row: &Row) -> usize {
        title_count(&self.manga_counts, &row.title)
    }

    pub fn ln_count(&self, row: &Row) -> usize {
        row.ln_title()
            .map(|title| title_count(&self.ln_counts, title))
            .unwrap_or(0)
    }
}

fn title_count(counts: &TitleCounts, title: &str) -> usize {
    counts.get(title).copied().unwrap_or(0)
}

/// Series filter, numeric sort, duplicate counts, then the search filter.
/// Counts are taken before searching so badges describe the whole series.
pub fn filter_chapters(rows: &[Row], series: Option<&str>, search: &str) -> ChapterView {
    let Some(series) = series else {
        return ChapterView::default();
    };

    // Raw franchise comparison; the fallback label never matches a blank one.
    let mut scoped: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.franchise == series)
        .map(|(index, _)| index)
        .collect();
    scoped.sort_by(|a, b| {
        rows[*a]
            .seq_key()
            .partial_cmp(&rows[*b].seq_key())
            .unwrap_or(Ordering::Equal)
    });

    let mut manga_counts = TitleCounts::new();
    let mut ln_counts = TitleCounts::new();
    for index in &scoped {
        let row = &rows[*index];
        *manga_counts.entry(row.title.clone()).or_insert(0) += 1;
        if let Some(title) = row.ln_title() {
            *ln_counts.entry(title.to_string()).or_insert(0) += 1;
        }
    }

    let series_total = scoped.len();
    let term = search.trim().to_lowercase();
    if !term.is_empty() {
        scoped.retain(|index| row_matches(&rows[*index], &term));
    }

    ChapterView {
        visible: scoped,
        series_total,
        manga_counts,
        ln_counts,
    }
}

fn row_matches(row: &Row, term: &str) -> bool {
    row.seq.to_lowercase().contains(term)
        || row.title.to_lowercase().contains(term)
        || row.ln_title.to_lowercase().contains(term)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(franchise: &str, seq: &str, title: &str) -> Row {
        Row {
            franchise: franchise.to_string(),
            format1: "Manga".to_string(),
            seq: seq.to_string(),
            title: title.to_string(),
            ..Row::default()
        }
    }

    fn titles<'a>(rows: &'a [Row], view: &ChapterView) -> Vec<&'a str> {
        view.visible.iter().map(|index| rows[*index].title.as_str()).collect()
    }

    #[test]
    fn series_index_is_sorted_and_distinct() {
        let rows = vec![
            row("b", "1", ""),
            row("a", "1", ""),
            row("b", "2", ""),
            row("", "3", ""),
            row("A", "4", ""),
        ];
        let series = series_index(&rows);
        assert_eq!(series, vec!["A", "Unknown series", "a", "b"]);
    }

    #[test]
    fn series_index_of_nothing_is_empty() {
        assert!(series_index(&[]).is_empty());
        assert_eq!(filter_chapters(&[], None, ""), ChapterView::default());
    }

    #[test]
    fn sorts_by_numeric_sequence() {
        let rows = vec![row("X", "2", "Ch2"), row("X", "1", "Ch1")];
        let view = filter_chapters(&rows, Some("X"), "");
        assert_eq!(titles(&rows, &view), vec!["Ch1", "Ch2"]);

        let rows = vec![row("X", "10", "ten"), row("X", "9", "nine"), row("X", "9.5", "half")];
        let view = filter_chapters(&rows, Some("X"), "");
        assert_eq!(titles(&rows, &view), vec!["nine", "half", "ten"]);
    }

    #[test]
    fn sort_is_stable_and_treats_garbage_as_zero() {
        let rows = vec![
            row("X", "3", "first three"),
            row("X", "extra", "junk"),
            row("X", "3", "second three"),
            row("X", "0", "zero"),
            row("X", "1", "one"),
        ];
        let view = filter_chapters(&rows, Some("X"), "");
        assert_eq!(
            titles(&rows, &view),
            vec!["junk", "zero", "one", "first three", "second three"]
        );
        let keys: Vec<f64> = view.visible.iter().map(|i| rows[*i].seq_key()).collect();
        assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn infinite_sequence_sorts_as_zero() {
        let rows = vec![row("X", "inf", "a"), row("X", "1", "b")];
        let view = filter_chapters(&rows, Some("X"), "");
        assert_eq!(titles(&rows, &view), vec!["a", "b"]);
    }

    #[test]
    fn filters_by_exact_series() {
        let rows = vec![row("X", "1", "a"), row("x", "2", "b"), row("Y", "3", "c")];
        let view = filter_chapters(&rows, Some("X"), "");
        assert_eq!(titles(&rows, &view), vec!["a"]);
        let view = filter_chapters(&rows, Some("Z"), "");
        assert!(view.visible.is_empty());
    }

    #[test]
    fn unknown_series_label_does_not_match_blank_franchise() {
        let rows = vec![row("", "1", "orphan")];
        assert_eq!(series_index(&rows), vec!["Unknown series"]);
        let view = filter_chapters(&rows, Some("Unknown series"), "");
        assert!(view.visible.is_empty());
    }

    #[test]
    fn counts_duplicate_titles_within_series() {
        let rows = vec![
            row("X", "1", "Ch1"),
            row("X", "2", "Ch1"),
            row("X", "3", "Ch3"),
            row("Y", "1", "Ch1"),
        ];
        let view = filter_chapters(&rows, Some("X"), "");
        assert_eq!(view.manga_counts.get("Ch1"), Some(&2));
        assert_eq!(view.manga_counts.get("Ch3"), Some(&1));
        assert_eq!(view.series_total, 3);
    }

    #[test]
    fn blank_manga_titles_count_as_the_same_title() {
        let rows = vec![row("X", "1", ""), row("X", "2", ""), row("X", "3", " ")];
        let view = filter_chapters(&rows, Some("X"), "");
        assert_eq!(view.manga_count(&rows[0]), 2);
        assert_eq!(view.manga_count(&rows[1]), 2);
        assert_eq!(view.manga_count(&rows[2]), 1);
    }

    #[test]
    fn search_keeps_counts_from_whole_series() {
        let rows = vec![row("X", "1", "Ch1"), row("X", "2", "Ch1"), row("X", "3", "Other")];
        let unfiltered = filter_chapters(&rows, Some("X"), "");
        let searched = filter_chapters(&rows, Some("X"), "  CH1 ");
        assert_eq!(titles(&rows, &searched), vec!["Ch1", "Ch1"]);
        assert_eq!(searched.manga_counts, unfiltered.manga_counts);
        assert_eq!(searched.series_total, 3);

        let narrowed = filter_chapters(&rows, Some("X"), "2");
        assert_eq!(narrowed.visible, vec![1]);
        assert_eq!(narrowed.manga_count(&rows[1]), 2);
    }

    #[test]
    fn search_matches_sequence_and_ln_title() {
        let mut with_ln = row("X", "4", "chapter 4");
        with_ln.ln_title = "The Journey Begins".to_string();
        let rows = vec![row("X", "14", "chapter 14"), with_ln];
        let view = filter_chapters(&rows, Some("X"), "journey");
        assert_eq!(view.visible, vec![1]);
        let view = filter_chapters(&rows, Some("X"), "14");
        assert_eq!(view.visible, vec![0]);
        let view = filter_chapters(&rows, Some("X"), "nothing like this");
        assert!(view.visible.is_empty());
    }

    #[test]
    fn missing_ln_title_has_no_count() {
        let mut first = row("X", "1", "a");
        first.ln_title = "Part 1".to_string();
        let mut second = row("X", "2", "b");
        second.ln_title = "Part 1".to_string();
        let third = row("X", "3", "c");
        let rows = vec![first, second, third];
        let view = filter_chapters(&rows, Some("X"), "");
        assert_eq!(view.ln_counts.len(), 1);
        assert_eq!(view.ln_count(&rows[0]), 2);
        assert_eq!(view.ln_count(&rows[2]), 0);
    }

    #[test]
    fn filtering_is_idempotent() {
        let rows = vec![row("X", "2", "b"), row("X", "1", "a"), row("X", "1", "a")];
        let first = filter_chapters(&rows, Some("X"), "a");
        let second = filter_chapters(&rows, Some("X"), "a");
        assert_eq!(first, second);
    }
}
