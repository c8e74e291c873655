mod text_input;

use std::io::{self, Stdout};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::{Frame, Terminal};
use sqlgrid_core::connection::ConnectionError;
use sqlgrid_core::grid::GridState;
use sqlgrid_core::query_executor::{QueryBackend, QueryError};
use sqlgrid_core::session::Session;
use thiserror::Error;
use tokio::runtime::Runtime;

use crate::text_input::TextInput;

const PAGE_ROWS: usize = 10;
const MAX_COLUMN_WIDTH: u16 = 40;
const QUERY_PLACEHOLDER: &str = "Enter your SQL query here...";
const FILTER_PLACEHOLDER: &str = "Filter results...";

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// A blocking error message; while one is shown nothing else takes input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDialog {
    pub title: String,
    pub message: String,
}

impl ErrorDialog {
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn connection_failed(error: &ConnectionError) -> Self {
        Self::new(
            "Database Connection Error",
            format!("Failed to connect to the database: {error}"),
        )
    }

    #[must_use]
    pub fn query_failed(error: &QueryError) -> Self {
        match error {
            QueryError::EmptyQuery => Self::new("Query Error", "Please enter a valid SQL query."),
            QueryError::NotConnected | QueryError::Backend(_) => Self::new(
                "Query Execution Error",
                format!("Failed to execute the query: {error}"),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Query,
    Filter,
    Results,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Self::Query => Self::Filter,
            Self::Filter => Self::Results,
            Self::Results => Self::Query,
        }
    }

    fn previous(self) -> Self {
        match self {
            Self::Query => Self::Results,
            Self::Filter => Self::Query,
            Self::Results => Self::Filter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Insert(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GridMove {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    ToggleHelp,
    Dismiss,
    NextFocus,
    PreviousFocus,
    Execute,
    Edit(Edit),
    Move(GridMove),
}

struct TuiApp<'a, B: QueryBackend> {
    runtime: &'a Runtime,
    session: &'a mut Session<B>,
    focus: Focus,
    query: TextInput,
    filter: TextInput,
    cursor_row: usize,
    column_offset: usize,
    dialog: Option<ErrorDialog>,
    show_help: bool,
    should_quit: bool,
    status_line: String,
}

impl<'a, B: QueryBackend> TuiApp<'a, B> {
    fn new(
        runtime: &'a Runtime,
        session: &'a mut Session<B>,
        startup_dialog: Option<ErrorDialog>,
    ) -> Self {
        let status_line = if session.connection_status().is_connected {
            "Type a query and press Enter or F5 to execute".to_string()
        } else {
            "Not connected: queries will fail".to_string()
        };

        Self {
            runtime,
            session,
            focus: Focus::Query,
            query: TextInput::default(),
            filter: TextInput::default(),
            cursor_row: 0,
            column_offset: 0,
            dialog: startup_dialog,
            show_help: false,
            should_quit: false,
            status_line,
        }
    }

    fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::Quit => self.should_quit = true,
            Msg::ToggleHelp => self.show_help = !self.show_help,
            Msg::Dismiss => {
                if self.dialog.take().is_none() {
                    self.show_help = false;
                }
            }
            Msg::NextFocus => self.focus = self.focus.next(),
            Msg::PreviousFocus => self.focus = self.focus.previous(),
            Msg::Execute => self.execute(),
            Msg::Edit(edit) => self.edit(edit),
            Msg::Move(movement) => self.move_cursor(movement),
        }
    }

    fn execute(&mut self) {
        let sql = self.query.text().to_string();
        match self.runtime.block_on(self.session.execute(&sql)) {
            Ok(summary) => {
                self.filter = TextInput::default();
                self.cursor_row = 0;
                self.column_offset = 0;
                self.status_line = format!(
                    "{} rows, {} columns in {} ms",
                    summary.rows_fetched,
                    summary.columns,
                    summary.elapsed.as_millis()
                );
            }
            Err(error) => {
                tracing::warn!(%error, "execute failed");
                self.status_line = "Query failed; previous results kept".to_string();
                self.dialog = Some(ErrorDialog::query_failed(&error));
            }
        }
    }

    fn edit(&mut self, edit: Edit) {
        let input = match self.focus {
            Focus::Query => &mut self.query,
            Focus::Filter => &mut self.filter,
            Focus::Results => return,
        };

        let changed = match edit {
            Edit::Insert(ch) => {
                input.insert(ch);
                true
            }
            Edit::Backspace => input.backspace(),
            Edit::Delete => input.delete(),
            Edit::Left => {
                input.move_left();
                false
            }
            Edit::Right => {
                input.move_right();
                false
            }
            Edit::Home => {
                input.move_home();
                false
            }
            Edit::End => {
                input.move_end();
                false
            }
        };

        if changed && self.focus == Focus::Filter {
            self.apply_filter();
        }
    }

    fn apply_filter(&mut self) {
        self.session.set_filter(self.filter.text());
        let grid = self.session.grid();
        self.cursor_row = self
            .cursor_row
            .min(grid.visible_count().saturating_sub(1));
        self.status_line = format!(
            "Showing {} of {} rows",
            grid.visible_count(),
            grid.total_rows()
        );
    }

    fn move_cursor(&mut self, movement: GridMove) {
        let grid = self.session.grid();
        let last_row = grid.visible_count().saturating_sub(1);
        let last_column = grid.column_count().saturating_sub(1);

        match movement {
            GridMove::Up => self.cursor_row = self.cursor_row.saturating_sub(1),
            GridMove::Down => self.cursor_row = (self.cursor_row + 1).min(last_row),
            GridMove::PageUp => self.cursor_row = self.cursor_row.saturating_sub(PAGE_ROWS),
            GridMove::PageDown => self.cursor_row = (self.cursor_row + PAGE_ROWS).min(last_row),
            GridMove::First => self.cursor_row = 0,
            GridMove::Last => self.cursor_row = last_row,
            GridMove::Left => self.column_offset = self.column_offset.saturating_sub(1),
            GridMove::Right => self.column_offset = (self.column_offset + 1).min(last_column),
        }
    }

    fn connection_label(&self) -> String {
        let status = self.session.connection_status();
        match (status.target, status.last_latency) {
            (Some(target), Some(latency)) => {
                format!("{target} (connected, {} ms)", latency.as_millis())
            }
            (Some(target), None) => format!("{target} (connected)"),
            (None, _) => "not connected".to_string(),
        }
    }
}

/// Runs the interface until the user quits. `startup_dialog` is shown first,
/// typically to report a failed startup connection.
pub fn run<B: QueryBackend>(
    runtime: &Runtime,
    session: &mut Session<B>,
    startup_dialog: Option<ErrorDialog>,
) -> Result<(), TuiError> {
    let mut terminal = setup_terminal()?;
    let mut app = TuiApp::new(runtime, session, startup_dialog);
    let run_result = run_loop(&mut terminal, &mut app);
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop<B: QueryBackend>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut TuiApp<'_, B>,
) -> Result<(), TuiError> {
    while !app.should_quit {
        terminal.draw(|frame| render(frame, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                if let Some(message) = map_key_event(key, app.focus, app.dialog.is_some()) {
                    app.handle(message);
                }
            }
        }
    }

    Ok(())
}

fn render<B: QueryBackend>(frame: &mut Frame<'_>, app: &TuiApp<'_, B>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " Database Query ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(app.connection_label()),
        Span::raw(" | F1: help"),
    ]));
    frame.render_widget(header, chunks[0]);

    render_input(
        frame,
        chunks[1],
        "SQL Query",
        &app.query,
        QUERY_PLACEHOLDER,
        app.focus == Focus::Query && app.dialog.is_none(),
    );

    let button = Paragraph::new(Line::from(Span::styled(
        "[ Execute Query ]  Enter / F5 / Ctrl+E",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Left);
    frame.render_widget(button, chunks[2]);

    render_input(
        frame,
        chunks[3],
        "Filter",
        &app.filter,
        FILTER_PLACEHOLDER,
        app.focus == Focus::Filter && app.dialog.is_none(),
    );

    render_results(frame, chunks[4], app);

    let status = Paragraph::new(Line::from(format!(" {}", app.status_line)))
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(status, chunks[5]);

    if app.show_help {
        render_help_popup(frame);
    }
    if let Some(dialog) = &app.dialog {
        render_error_dialog(frame, dialog);
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn render_input(
    frame: &mut Frame<'_>,
    area: Rect,
    title: &str,
    input: &TextInput,
    placeholder: &str,
    focused: bool,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .border_style(focus_style(focused));

    let inner_width = area.width.saturating_sub(2);
    let before_cursor = to_u16(Span::raw(input.text_before_cursor()).width());
    let scroll = before_cursor.saturating_sub(inner_width.saturating_sub(1));

    let paragraph = if input.text().is_empty() {
        Paragraph::new(Span::styled(
            placeholder.to_string(),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Paragraph::new(input.text().to_string()).scroll((0, scroll))
    };
    frame.render_widget(paragraph.block(block), area);

    if focused {
        frame.set_cursor_position((area.x + 1 + before_cursor - scroll, area.y + 1));
    }
}

fn render_results<B: QueryBackend>(frame: &mut Frame<'_>, area: Rect, app: &TuiApp<'_, B>) {
    let grid = app.session.grid();
    let title = if grid.is_filtered() {
        format!("Results ({} of {})", grid.visible_count(), grid.total_rows())
    } else {
        format!("Results ({})", grid.total_rows())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(focus_style(app.focus == Focus::Results && app.dialog.is_none()));

    let placeholder = match grid.state() {
        GridState::Empty => Some("No query executed yet"),
        GridState::Populated if grid.column_count() == 0 => {
            Some("Statement executed; it returned no columns")
        }
        GridState::Populated => None,
    };
    if let Some(text) = placeholder {
        let paragraph = Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray)))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let visible_limit = usize::from(area.height.saturating_sub(3)).max(1);
    let window_start = (app.cursor_row + 1).saturating_sub(visible_limit);
    let window = grid.window(window_start, visible_limit);
    let offset = app.column_offset.min(grid.column_count().saturating_sub(1));

    let widths = grid
        .columns()
        .iter()
        .enumerate()
        .skip(offset)
        .map(|(index, column)| {
            let widest_cell = window
                .iter()
                .map(|cells| Span::raw(cells[index]).width())
                .max()
                .unwrap_or(0);
            let width = to_u16(widest_cell.max(Span::raw(column.as_str()).width()));
            Constraint::Length(width.clamp(1, MAX_COLUMN_WIDTH))
        })
        .collect::<Vec<_>>();

    let header = Row::new(
        grid.columns()
            .iter()
            .skip(offset)
            .map(|column| Cell::from(column.as_str())),
    )
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );
    let rows = window
        .iter()
        .map(|cells| Row::new(cells.iter().skip(offset).map(|cell| Cell::from(*cell))));

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(2)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    if !window.is_empty() {
        state.select(Some(app.cursor_row - window_start));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_error_dialog(frame: &mut Frame<'_>, dialog: &ErrorDialog) {
    let area = centered_rect(60, 30, frame.area());
    frame.render_widget(Clear, area);
    let body = Paragraph::new(vec![
        Line::from(dialog.message.as_str()),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter or Esc to close",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .wrap(Wrap { trim: false })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(dialog.title.as_str())
            .border_style(Style::default().fg(Color::Red)),
    );
    frame.render_widget(body, area);
}

fn render_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("Keys"),
        Line::from("Tab / Shift+Tab: move between query, filter and results"),
        Line::from("Enter (query), F5, Ctrl+E: execute query"),
        Line::from("Typing in the filter narrows the rows immediately"),
        Line::from("Results: arrows or hjkl, PageUp/PageDown, g/G"),
        Line::from("F1 or Esc: close this help"),
        Line::from("Ctrl+C / Ctrl+Q: quit"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn to_u16(width: usize) -> u16 {
    u16::try_from(width).unwrap_or(u16::MAX)
}

fn map_key_event(key: KeyEvent, focus: Focus, dialog_open: bool) -> Option<Msg> {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c' | 'q'))
    {
        return Some(Msg::Quit);
    }
    if dialog_open {
        return matches!(key.code, KeyCode::Enter | KeyCode::Esc).then_some(Msg::Dismiss);
    }

    match (key.modifiers, key.code) {
        (_, KeyCode::F(1)) => return Some(Msg::ToggleHelp),
        (_, KeyCode::F(5)) | (KeyModifiers::CONTROL, KeyCode::Char('e')) => {
            return Some(Msg::Execute)
        }
        (_, KeyCode::Esc) => return Some(Msg::Dismiss),
        (_, KeyCode::Tab) => return Some(Msg::NextFocus),
        (_, KeyCode::BackTab) => return Some(Msg::PreviousFocus),
        _ => {}
    }

    match focus {
        Focus::Query | Focus::Filter => map_edit_key(key, focus),
        Focus::Results => map_grid_key(key),
    }
}

fn map_edit_key(key: KeyEvent, focus: Focus) -> Option<Msg> {
    let edit = match key.code {
        KeyCode::Enter if focus == Focus::Query => return Some(Msg::Execute),
        KeyCode::Enter => return Some(Msg::NextFocus),
        KeyCode::Char(ch)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            Edit::Insert(ch)
        }
        KeyCode::Backspace => Edit::Backspace,
        KeyCode::Delete => Edit::Delete,
        KeyCode::Left => Edit::Left,
        KeyCode::Right => Edit::Right,
        KeyCode::Home => Edit::Home,
        KeyCode::End => Edit::End,
        _ => return None,
    };
    Some(Msg::Edit(edit))
}

fn map_grid_key(key: KeyEvent) -> Option<Msg> {
    let movement = match key.code {
        KeyCode::Up | KeyCode::Char('k') => GridMove::Up,
        KeyCode::Down | KeyCode::Char('j') => GridMove::Down,
        KeyCode::Left | KeyCode::Char('h') => GridMove::Left,
        KeyCode::Right | KeyCode::Char('l') => GridMove::Right,
        KeyCode::PageUp => GridMove::PageUp,
        KeyCode::PageDown => GridMove::PageDown,
        KeyCode::Home | KeyCode::Char('g') => GridMove::First,
        KeyCode::End | KeyCode::Char('G') => GridMove::Last,
        _ => return None,
    };
    Some(Msg::Move(movement))
}
