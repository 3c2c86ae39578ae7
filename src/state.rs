use crate::{
    sheet::Row,
    view::{self, ChapterView},
};

/// Everything the table and detail panel are drawn from. Rows are fixed once
/// loaded; only the series, search term and selection move.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    rows: Vec<Row>,
    series: Vec<String>,
    current_series: Option<String>,
    search: String,
    selected: Option<usize>,
    view: ChapterView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    SelectSeries(String),
    Search(String),
    /// Select a loaded row by its index in [`ViewState::rows`].
    SelectRow(usize),
}

impl ViewState {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let series = view::series_index(&rows);
        let current_series = series.first().cloned();
        let mut state = Self {
            rows,
            series,
            current_series,
            ..Self::default()
        };
        state.refresh();
        state
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn series(&self) -> &[String] {
        &self.series
    }

    pub fn current_series(&self) -> Option<&str> {
        self.current_series.as_deref()
    }

    pub fn current_series_index(&self) -> Option<usize> {
        let current = self.current_series.as_deref()?;
        self.series.iter().position(|name| name == current)
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn view(&self) -> &ChapterView {
        &self.view
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = (usize, &Row)> + '_ {
        self.view.visible.iter().map(|index| (*index, &self.rows[*index]))
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.selected.and_then(|index| self.rows.get(index))
    }

    pub fn title(&self) -> String {
        match self.current_series.as_deref() {
            Some(series) => format!("{series} – Chapters"),
            None => "Chapters".to_string(),
        }
    }

    fn refresh(&mut self) {
        self.view = view::filter_chapters(&self.rows, self.current_series.as_deref(), &self.search);
        self.selected = None;
    }
}

/// Applies one user event. Series and search changes re-run the filter and
/// drop the selection; selecting a row only touches the selection.
pub fn reduce(mut state: ViewState, event: ViewEvent) -> ViewState {
    match event {
        ViewEvent::SelectSeries(series) => {
            state.current_series = Some(series);
            state.refresh();
        }
        ViewEvent::Search(term) => {
            state.search = term;
            state.refresh();
        }
        ViewEvent::SelectRow(index) => {
            if state.view.visible.contains(&index) {
                state.selected = Some(index);
            }
        }
    }
    state
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

    fn sample() -> ViewState {
        ViewState::from_rows(vec![
            row("Y", "1", "y1"),
            row("X", "2", "Ch2"),
            row("X", "1", "Ch1"),
        ])
    }

    #[test]
    fn defaults_to_first_series() {
        let state = sample();
        assert_eq!(state.series(), ["X".to_string(), "Y".to_string()]);
        assert_eq!(state.current_series(), Some("X"));
        assert_eq!(state.current_series_index(), Some(0));
        assert_eq!(state.title(), "X – Chapters");
        let titles: Vec<&str> = state.visible_rows().map(|(_, row)| row.title.as_str()).collect();
        assert_eq!(titles, vec!["Ch1", "Ch2"]);
    }

    #[test]
    fn empty_rows_leave_series_unset() {
        let state = ViewState::from_rows(Vec::new());
        assert!(state.series().is_empty());
        assert_eq!(state.current_series(), None);
        assert_eq!(state.title(), "Chapters");
        assert_eq!(state.visible_rows().count(), 0);
    }

    #[test]
    fn selecting_a_new_row_replaces_the_old_one() {
        let state = sample();
        let state = reduce(state, ViewEvent::SelectRow(2));
        assert_eq!(state.selected(), Some(2));
        let state = reduce(state, ViewEvent::SelectRow(1));
        assert_eq!(state.selected(), Some(1));
        assert_eq!(state.selected_row().map(|row| row.title.as_str()), Some("Ch2"));
    }

    #[test]
    fn rows_outside_the_view_cannot_be_selected() {
        let state = reduce(sample(), ViewEvent::SelectRow(0));
        assert_eq!(state.selected(), None);
        let state = reduce(state, ViewEvent::SelectRow(99));
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn series_change_clears_selection() {
        let state = reduce(sample(), ViewEvent::SelectRow(2));
        let state = reduce(state, ViewEvent::SelectSeries("Y".to_string()));
        assert_eq!(state.selected(), None);
        assert_eq!(state.title(), "Y – Chapters");
        assert_eq!(state.view().visible, vec![0]);
    }

    #[test]
    fn search_change_clears_selection_and_keeps_term() {
        let state = reduce(sample(), ViewEvent::SelectRow(2));
        let state = reduce(state, ViewEvent::Search("ch2".to_string()));
        assert_eq!(state.selected(), None);
        assert_eq!(state.search(), "ch2");
        assert_eq!(state.view().visible, vec![1]);
        assert_eq!(state.view().series_total, 2);
    }

    #[test]
    fn same_event_twice_gives_same_view() {
        let once = reduce(sample(), ViewEvent::Search("ch".to_string()));
        let twice = reduce(once.clone(), ViewEvent::Search("ch".to_string()));
        assert_eq!(once, twice);
    }
}
