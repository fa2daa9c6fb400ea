use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::api::{MutationGateway, RecordSource, Resource};
use crate::display::Render;
use crate::query::Queryable;
use crate::stats::Aggregate;
use crate::view::{QueryView, ToastKind, ViewState};

const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Search,
    ConfirmDelete(i64),
}

struct AppState<R> {
    view: QueryView<R>,
    selected: usize,
    scroll_offset: u16,
    mode: Mode,
}

impl<R: Render + Queryable + Aggregate + Resource> AppState<R> {
    fn new(view: QueryView<R>) -> Self {
        Self {
            view,
            selected: 0,
            scroll_offset: 0,
            mode: Mode::Normal,
        }
    }

    fn current(&self) -> Option<&R> {
        self.view.visible().get(self.selected).copied()
    }

    fn next(&mut self) {
        let len = self.view.visible().len();
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    /// Keep the cursor inside the visible subset after it shrinks.
    fn clamp(&mut self) {
        let len = self.view.visible().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
            self.scroll_offset = 0;
        }
    }

    fn cycle(&mut self, slot: usize) {
        if let Some(field) = R::CATEGORIES.get(slot) {
            self.view.cycle_category(field);
            self.selected = 0;
        }
    }

    /// Apply one key press. Returns true when the browser should exit.
    fn handle_key<G>(&mut self, gateway: &G, code: KeyCode) -> bool
    where
        G: RecordSource<R> + MutationGateway<R>,
    {
        match self.mode {
            Mode::Search => match code {
                KeyCode::Enter | KeyCode::Esc => self.mode = Mode::Normal,
                KeyCode::Backspace => {
                    let mut term = self.view.criteria().search.clone();
                    term.pop();
                    self.view.set_search(term);
                }
                KeyCode::Char(c) => {
                    let term = format!("{}{}", self.view.criteria().search, c);
                    self.view.set_search(term);
                    self.selected = 0;
                }
                _ => {}
            },
            Mode::ConfirmDelete(id) => {
                let answer = matches!(code, KeyCode::Char('y') | KeyCode::Char('Y'));
                self.mode = Mode::Normal;
                let outcome = self.view.delete(gateway, id, &|_: &str| answer);
                debug!(id, ?outcome, "delete from browser");
            }
            Mode::Normal => match code {
                KeyCode::Char('q') | KeyCode::Esc => return true,
                KeyCode::Down | KeyCode::Char('j') => self.next(),
                KeyCode::Up | KeyCode::Char('k') => self.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => {
                    self.scroll_offset = self.scroll_offset.saturating_add(3)
                }
                KeyCode::Char('K') | KeyCode::PageUp => {
                    self.scroll_offset = self.scroll_offset.saturating_sub(3)
                }
                KeyCode::Char('/') => self.mode = Mode::Search,
                KeyCode::Char('s') => self.cycle(0),
                KeyCode::Char('t') => self.cycle(1),
                KeyCode::Char('c') => {
                    self.view.clear_filters();
                    self.selected = 0;
                }
                KeyCode::Char('r') => {
                    self.view.reload(gateway);
                    let toast = match self.view.state() {
                        ViewState::Ready => Some((ToastKind::Info, "Refreshed".to_string())),
                        ViewState::Failed(message) => {
                            Some((ToastKind::Error, format!("Error: {}", message)))
                        }
                        _ => None,
                    };
                    if let Some((kind, message)) = toast {
                        self.view.notify(kind, message);
                    }
                }
                KeyCode::Char('d') => {
                    if let Some(id) = self.current().map(Queryable::id) {
                        self.mode = Mode::ConfirmDelete(id);
                    }
                }
                _ => {}
            },
        }
        self.clamp();
        false
    }
}

pub fn run_browse<R, G>(gateway: &G) -> Result<()>
where
    R: Render + Queryable + Aggregate + Resource,
    G: RecordSource<R> + MutationGateway<R>,
{
    let mut state = AppState::new(QueryView::open(gateway));

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, gateway);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    state.view.close();
    result
}

fn run_loop<R, G>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState<R>,
    gateway: &G,
) -> Result<()>
where
    R: Render + Queryable + Aggregate + Resource,
    G: RecordSource<R> + MutationGateway<R>,
{
    let mut list_state = ListState::default();

    loop {
        state.view.expire_toast(Instant::now());
        list_state.select(Some(state.selected));
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        // Poll so toasts expire without a key press
        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if state.handle_key(gateway, key.code) {
                break;
            }
        }
    }
    Ok(())
}

fn draw<R>(frame: &mut Frame, state: &AppState<R>, list_state: &mut ListState)
where
    R: Render + Queryable + Aggregate + Resource,
{
    let view = &state.view;
    let visible = view.visible();

    let mut summary: Vec<Line> = view
        .stats()
        .to_string()
        .lines()
        .map(|l| Line::from(l.to_string()))
        .collect();
    let filters = if view.criteria().is_empty() {
        "no filters".to_string()
    } else {
        let mut active: Vec<String> = R::CATEGORIES
            .iter()
            .map(|field| format!("{}={}", field, view.criteria().selected(field)))
            .collect();
        active.insert(0, format!("search=\"{}\"", view.criteria().search));
        active.join(" ")
    };
    summary.push(Line::from(Span::styled(
        format!(
            "Showing {} of {} {}  ({})",
            visible.len(),
            view.records().len(),
            R::NOUN,
            filters
        ),
        Style::default().fg(Color::DarkGray),
    )));

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(summary.len() as u16 + 2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let header = Paragraph::new(Text::from(summary))
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", R::LABEL)));
    frame.render_widget(header, rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);

    // Left panel: visible records
    let items: Vec<ListItem> = visible
        .iter()
        .map(|record| ListItem::new(record.label()))
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {} ({}) ",
            R::NOUN,
            visible.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail
    let detail = match view.state() {
        ViewState::Failed(message) => Text::from(Line::from(Span::styled(
            format!("Failed to load {}: {}  (r to retry)", R::NOUN, message),
            Style::default().fg(Color::Red),
        ))),
        ViewState::Loading => Text::raw("Loading..."),
        _ => match visible.get(state.selected) {
            Some(record) => Text::from(
                record
                    .detail()
                    .into_iter()
                    .map(Line::from)
                    .collect::<Vec<_>>(),
            ),
            None => Text::raw(format!("No {} to show", R::NOUN)),
        },
    };
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail_widget, chunks[1]);

    frame.render_widget(footer(state), rows[2]);
}

fn footer<R>(state: &AppState<R>) -> Paragraph<'static>
where
    R: Render + Queryable + Aggregate + Resource,
{
    match state.mode {
        Mode::Search => Paragraph::new(format!(" Search: {}_  (Enter to finish)", state.view.criteria().search)),
        Mode::ConfirmDelete(id) => Paragraph::new(format!(
            " Delete {} #{}? This action cannot be undone. (y/n)",
            R::LABEL.to_lowercase(),
            id
        ))
        .style(Style::default().fg(Color::Yellow)),
        Mode::Normal => match state.view.toast(Instant::now()) {
            Some(toast) => {
                let color = match toast.kind {
                    ToastKind::Success => Color::Green,
                    ToastKind::Error => Color::Red,
                    ToastKind::Info => Color::Cyan,
                };
                Paragraph::new(format!(" {}", toast.message)).style(Style::default().fg(color))
            }
            None => Paragraph::new(
                " j/k:navigate  J/K:scroll  /:search  s/t:cycle filters  c:clear  r:refresh  d:delete  q:quit",
            )
            .style(Style::default().fg(Color::DarkGray)),
        },
    }
}
