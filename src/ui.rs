use crate::{
    app::{log_level_label, App, Focus, InputMode, LoadPhase, LogLevel, ToastLevel},
    render::{self, ChapterLine, DetailPanel, TableLine},
};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Cell, Clear, List, ListItem, ListState, Padding, Paragraph,
        Row, Table, TableState, Wrap,
    },
};
use std::{
    io,
    time::{Duration, Instant},
};

const SERIES_PANEL_WIDTH: u16 = 28;
const DETAIL_PANEL_WIDTH: u16 = 44;

#[derive(Clone)]
struct Theme {
    accent: Color,
    accent_soft: Color,
    border: Color,
    text: Color,
    muted: Color,
    success: Color,
    warning: Color,
    error: Color,
    ln_accent: Color,
    header_bg: Color,
    log_bg: Color,
}

impl Theme {
    fn new() -> Self {
        Self {
            accent: Color::Rgb(120, 190, 255),
            accent_soft: Color::Rgb(70, 110, 160),
            border: Color::Rgb(65, 75, 90),
            text: Color::Rgb(220, 230, 240),
            muted: Color::Rgb(135, 145, 155),
            success: Color::Rgb(120, 220, 140),
            warning: Color::Rgb(230, 200, 120),
            error: Color::Rgb(235, 100, 95),
            ln_accent: Color::Rgb(190, 150, 240),
            header_bg: Color::Rgb(22, 28, 36),
            log_bg: Color::Rgb(16, 20, 26),
        }
    }

    fn block(&self, title: String) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.border))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.accent)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn panel(&self, title: &str) -> Block<'static> {
        self.block(title.to_string()).padding(Padding {
            left: 1,
            right: 1,
            top: 1,
            bottom: 0,
        })
    }

    fn panel_dense(&self, title: String) -> Block<'static> {
        self.block(title).padding(Padding {
            left: 0,
            right: 1,
            top: 1,
            bottom: 0,
        })
    }

    fn manga_badge(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(self.warning)
            .add_modifier(Modifier::BOLD)
    }

    fn ln_badge(&self) -> Style {
        Style::default()
            .fg(self.ln_accent)
            .add_modifier(Modifier::BOLD | Modifier::ITALIC)
    }
}

pub fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut App) -> Result<()> {
    app.start_load();
    loop {
        app.tick();
        app.poll_load();
        app.clamp_cursor();
        terminal.draw(|frame| draw(frame, app))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key);
                }
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }
    match app.input_mode {
        InputMode::Search => handle_search_mode(app, key),
        InputMode::Normal => handle_normal_mode(app, key),
    }
}

fn handle_search_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Esc => app.leave_search(),
        KeyCode::Backspace => app.pop_search_char(),
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL)
                || key.modifiers.contains(KeyModifiers::ALT)
            {
                return;
            }
            app.push_search_char(c);
        }
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.should_quit = true,
        KeyCode::Char('/') => app.enter_search(),
        KeyCode::Char('x') | KeyCode::Char('X') => app.clear_search(),
        KeyCode::Char('y') | KeyCode::Char('Y') => app.copy_detail_to_clipboard(),
        KeyCode::Tab | KeyCode::BackTab => app.cycle_focus(),
        KeyCode::Left | KeyCode::Char('[') => app.select_series_offset(-1),
        KeyCode::Right | KeyCode::Char(']') => app.select_series_offset(1),
        KeyCode::PageUp => app.scroll_log_up(3),
        KeyCode::PageDown => app.scroll_log_down(3),
        _ => match app.focus {
            Focus::Series => handle_series_mode(app, key),
            Focus::Chapters => handle_chapters_mode(app, key),
        },
    }
}

fn handle_series_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K') => app.select_series_offset(-1),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J') => app.select_series_offset(1),
        KeyCode::Enter => app.cycle_focus(),
        _ => {}
    }
}

fn handle_chapters_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K') => app.move_cursor(-1),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J') => app.move_cursor(1),
        KeyCode::Home => app.move_cursor(isize::MIN),
        KeyCode::End => app.cursor_to_end(),
        KeyCode::Enter | KeyCode::Char(' ') => app.select_cursor_row(),
        _ => {}
    }
}

fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.size();
    let theme = Theme::new();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(12)])
        .split(area);

    let view = app.view.view();
    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                "ChapterMap",
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(app.view.title(), Style::default().fg(theme.text)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Showing: ", Style::default().fg(theme.muted)),
            Span::styled(view.visible.len().to_string(), Style::default().fg(theme.text)),
            Span::styled(" of ", Style::default().fg(theme.muted)),
            Span::styled(view.series_total.to_string(), Style::default().fg(theme.text)),
            Span::raw("   "),
            Span::styled("Series: ", Style::default().fg(theme.muted)),
            Span::styled(
                app.view.series().len().to_string(),
                Style::default().fg(theme.text),
            ),
        ]),
    ])
    .style(Style::default().bg(theme.header_bg))
    .alignment(Alignment::Center);
    frame.render_widget(header, chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(SERIES_PANEL_WIDTH),
            Constraint::Min(30),
            Constraint::Length(DETAIL_PANEL_WIDTH),
        ])
        .split(chunks[1]);

    draw_series(frame, app, &theme, body_chunks[0]);
    draw_chapters(frame, app, &theme, body_chunks[1]);

    let details_block = theme.panel("Details");
    let details_inner = details_block.inner(body_chunks[2]);
    let details = Paragraph::new(build_details(app, &theme, details_inner.width as usize))
        .style(Style::default().fg(theme.text))
        .block(details_block)
        .wrap(Wrap { trim: false });
    frame.render_widget(details, body_chunks[2]);

    let footer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Length(7)])
        .split(chunks[2]);

    let status_block = theme.panel("Status");
    let status_inner = status_block.inner(footer_chunks[0]);
    let footer = Paragraph::new(vec![
        Line::from(status_bar_line(app, status_inner.width)),
        search_line(app, &theme),
    ])
    .style(Style::default().fg(theme.text))
    .block(status_block);
    frame.render_widget(footer, footer_chunks[0]);

    let log_area = footer_chunks[1];
    let log_block = theme.panel("Log").style(Style::default().bg(theme.log_bg));
    let log_inner = log_block.inner(log_area);
    let log = Paragraph::new(build_log_lines(app, &theme, log_inner.height as usize))
        .style(Style::default().fg(theme.text).bg(theme.log_bg))
        .block(log_block);
    frame.render_widget(log, log_area);

    draw_toast(frame, app, &theme, chunks[1]);
}

fn draw_series(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let series = app.view.series();
    if series.is_empty() {
        let empty = Paragraph::new("No series.")
            .style(Style::default().fg(theme.muted))
            .block(theme.panel("Series"))
            .alignment(Alignment::Center);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem<'static>> = series
        .iter()
        .map(|name| ListItem::new(Line::from(name.clone())))
        .collect();
    let focused = app.focus == Focus::Series;
    let highlight_style = if focused {
        Style::default()
            .bg(theme.accent_soft)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
    };
    let list = List::new(items)
        .block(theme.panel("Series"))
        .style(Style::default().fg(theme.text))
        .highlight_style(highlight_style)
        .highlight_symbol(if focused { ">" } else { " " });
    let mut state = ListState::default();
    state.select(app.view.current_series_index());
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_chapters(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let block = theme.panel_dense(app.view.title());
    let placeholder = match app.phase {
        LoadPhase::Unloaded | LoadPhase::Loading => Some("Loading data…"),
        LoadPhase::LoadFailed => Some("No data loaded."),
        LoadPhase::Loaded => None,
    };
    if let Some(message) = placeholder {
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(theme.muted))
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let lines = render::table_lines(&app.view);
    let mut rows = Vec::with_capacity(lines.len());
    for line in &lines {
        match line {
            TableLine::Empty(message) => {
                let paragraph = Paragraph::new(*message)
                    .style(Style::default().fg(theme.muted))
                    .block(block)
                    .alignment(Alignment::Center);
                frame.render_widget(paragraph, area);
                return;
            }
            TableLine::Chapter(chapter) => rows.push(chapter_row(chapter, theme)),
        }
    }

    let focused = app.focus == Focus::Chapters;
    let header = Row::new(render::TABLE_HEADERS.iter().map(|label| Cell::from(*label)))
        .style(Style::default().fg(theme.text).add_modifier(Modifier::BOLD));
    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(9),
            Constraint::Min(14),
            Constraint::Length(7),
            Constraint::Length(6),
            Constraint::Min(14),
            Constraint::Length(1),
        ],
    )
    .header(header)
    .column_spacing(1)
    .block(block)
    .highlight_style(if focused {
        Style::default()
            .bg(theme.accent_soft)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    })
    .highlight_symbol(if focused { ">" } else { " " });

    let mut state = TableState::default();
    state.select(Some(app.cursor));
    frame.render_stateful_widget(table, area, &mut state);
}

fn chapter_row(chapter: &ChapterLine, theme: &Theme) -> Row<'static> {
    let muted = |value: &str| {
        if value == render::PLACEHOLDER {
            Style::default().fg(theme.muted)
        } else {
            Style::default().fg(theme.text)
        }
    };
    let mut title = vec![Span::raw(chapter.title.clone())];
    if let Some(count) = chapter.title_badge {
        title.push(Span::raw(" "));
        title.push(Span::styled(render::badge_label(count), theme.manga_badge()));
    }
    let mut ln_title = vec![Span::styled(chapter.ln_title.clone(), muted(&chapter.ln_title))];
    if let Some(count) = chapter.ln_badge {
        ln_title.push(Span::raw(" "));
        ln_title.push(Span::styled(render::badge_label(count), theme.ln_badge()));
    }
    let marker = if chapter.selected {
        Cell::from("●").style(Style::default().fg(theme.success))
    } else {
        Cell::from(" ")
    };

    let row = Row::new(vec![
        Cell::from(chapter.seq.clone()),
        Cell::from(chapter.volume.clone()),
        Cell::from(Line::from(title)),
        Cell::from(chapter.format.clone()),
        Cell::from(chapter.ln_volume.clone()).style(muted(&chapter.ln_volume)),
        Cell::from(Line::from(ln_title)),
        marker,
    ]);
    if chapter.selected {
        row.style(Style::default().add_modifier(Modifier::BOLD))
    } else {
        row
    }
}

fn status_bar_line(app: &App, width: u16) -> String {
    let width = width as usize;
    let left = format!("Status: {}", app.status);
    let right = app.hint().to_string();

    if width == 0 {
        return String::new();
    }

    let left_len = left.chars().count();
    let right_len = right.chars().count();
    if left_len + right_len + 1 > width {
        let available = width.saturating_sub(left_len + 1);
        let trimmed_right: String = right.chars().take(available).collect();
        return format!("{left} {trimmed_right}");
    }

    let spaces = width - left_len - right_len;
    format!("{left}{}{right}", " ".repeat(spaces))
}

fn search_line(app: &App, theme: &Theme) -> Line<'static> {
    let editing = app.input_mode == InputMode::Search;
    let term = app.view.search().to_string();
    let mut spans = vec![Span::styled(
        "Search: ",
        Style::default().fg(if editing { theme.accent } else { theme.muted }),
    )];
    if term.is_empty() && !editing {
        spans.push(Span::styled(
            "press / to filter by number or title",
            Style::default().fg(theme.muted),
        ));
    } else {
        spans.push(Span::styled(term, Style::default().fg(theme.text)));
    }
    if editing {
        spans.push(Span::styled(
            "_",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::SLOW_BLINK),
        ));
    }
    Line::from(spans)
}

fn build_log_lines(app: &App, theme: &Theme, height: usize) -> Vec<Line<'static>> {
    if app.logs.is_empty() {
        return vec![Line::from(Span::styled(
            "Nothing logged yet.",
            Style::default().fg(theme.muted),
        ))];
    }

    // Newest entries sit at the bottom; scrolling walks back from there.
    let hidden_below = app.log_scroll.min(app.logs.len().saturating_sub(height));
    let end = app.logs.len() - hidden_below;
    let start = end.saturating_sub(height);

    app.logs[start..end]
        .iter()
        .map(|entry| {
            let color = match entry.level {
                LogLevel::Info => theme.muted,
                LogLevel::Warn => theme.warning,
                LogLevel::Error => theme.error,
            };
            Line::from(vec![
                Span::styled(
                    format!("{:<5}", log_level_label(entry.level)),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(entry.message.clone(), Style::default().fg(theme.text)),
            ])
        })
        .collect()
}

fn render_toast(
    frame: &mut Frame<'_>,
    theme: &Theme,
    body_area: Rect,
    message: &str,
    level: ToastLevel,
) {
    let mut message = message.to_string();
    let max_width = body_area.width.saturating_sub(4).max(24);
    let max_text = max_width.saturating_sub(4) as usize;
    if message.chars().count() > max_text {
        message = message.chars().take(max_text.saturating_sub(3)).collect();
        message.push_str("...");
    }
    let width = (message.chars().count() as u16 + 4).clamp(24, max_width);
    let height = 3u16;
    let x = body_area.x + (body_area.width.saturating_sub(width)) / 2;
    let y = body_area.y + 1;
    let toast_area = Rect::new(x, y, width, height).intersection(frame.size());

    let border = match level {
        ToastLevel::Info => theme.accent,
        ToastLevel::Warn => theme.warning,
        ToastLevel::Error => theme.error,
    };

    frame.render_widget(Clear, toast_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme.header_bg));
    let content = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center);
    frame.render_widget(content, toast_area);
}

fn draw_toast(frame: &mut Frame<'_>, app: &App, theme: &Theme, body_area: Rect) {
    let Some(toast) = app.toast.as_ref() else {
        return;
    };
    if toast.expires_at <= Instant::now() {
        return;
    }

    render_toast(frame, theme, body_area, &toast.message, toast.level);
}

fn wrap_text(value: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return Vec::new();
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in value.split_whitespace() {
        let word_len = word.chars().count();
        if word_len > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(max_width) {
                lines.push(chunk.iter().collect());
            }
            continue;
        }
        let next_len = if current.is_empty() {
            word_len
        } else {
            current.chars().count() + 1 + word_len
        };
        if next_len > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

fn push_wrapped_kv(
    lines: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    label_style: Style,
    value_style: Style,
    max_width: usize,
) {
    if max_width == 0 {
        return;
    }

    let label_text = format!("{label}: ");
    let label_len = label_text.chars().count();

    if max_width <= label_len + 1 {
        lines.push(Line::from(Span::styled(label_text, label_style)));
        for part in wrap_text(value, max_width) {
            lines.push(Line::from(Span::styled(part, value_style)));
        }
        return;
    }

    let wrapped = wrap_text(value, max_width.saturating_sub(label_len));
    let mut parts = wrapped.into_iter();
    lines.push(Line::from(vec![
        Span::styled(label_text, label_style),
        Span::styled(parts.next().unwrap_or_default(), value_style),
    ]));

    let indent = " ".repeat(label_len);
    for part in parts {
        lines.push(Line::from(vec![
            Span::raw(indent.clone()),
            Span::styled(part, value_style),
        ]));
    }
}

fn push_heading(lines: &mut Vec<Line<'static>>, title: &str, theme: &Theme) {
    if !lines.is_empty() {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        title.to_string(),
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )));
}

fn build_details(app: &App, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let DetailPanel::Chapter(detail) = render::detail_panel(&app.view) else {
        return vec![Line::from(Span::styled(
            render::SELECT_PROMPT,
            Style::default().fg(theme.muted),
        ))];
    };

    let mut lines = Vec::new();
    let label_style = Style::default().fg(theme.muted);
    let value_style = Style::default().fg(theme.text);
    let muted_style = Style::default().fg(theme.muted);

    push_wrapped_kv(&mut lines, "Series", &detail.series, label_style, value_style, width);

    push_heading(&mut lines, "Manga", theme);
    push_wrapped_kv(&mut lines, "Volume", &detail.volume, label_style, value_style, width);
    push_wrapped_kv(&mut lines, "Number", &detail.seq, label_style, value_style, width);
    push_wrapped_kv(&mut lines, "Title", &detail.title, label_style, value_style, width);

    push_heading(&mut lines, "Light novel", theme);
    match &detail.ln {
        Some(ln) => {
            push_wrapped_kv(&mut lines, "Volume", &ln.volume, label_style, value_style, width);
            push_wrapped_kv(&mut lines, "Number", &ln.seq, label_style, value_style, width);
            push_wrapped_kv(&mut lines, "Title", &ln.title, label_style, value_style, width);
        }
        None => {
            for part in wrap_text(render::NO_LN_MAPPING, width) {
                lines.push(Line::from(Span::styled(part, muted_style)));
            }
        }
    }

    push_heading(&mut lines, "Info", theme);
    push_wrapped_kv(&mut lines, "Format", &detail.formats, label_style, value_style, width);
    let duplicate_style = if detail.duplicates.iter().any(|line| line != render::NO_DUPLICATES) {
        Style::default().fg(theme.warning)
    } else {
        muted_style
    };
    for line in &detail.duplicates {
        for part in wrap_text(line, width) {
            lines.push(Line::from(Span::styled(part, duplicate_style)));
        }
    }
    let notes_style = if detail.notes == render::NO_NOTES {
        muted_style
    } else {
        value_style
    };
    push_wrapped_kv(&mut lines, "Notes", &detail.notes, label_style, notes_style, width);

    lines
}
