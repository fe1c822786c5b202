// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tubedex_app::{
    ALL_CATEGORIES, AppCommand, AppState, CardFetchState, CardTracker, Channel, ChannelId,
    ChannelView, Prediction, PredictionPhase, PredictionSlot, ViewMode, derive_view, summary_rows,
};

const GRID_COLUMNS: usize = 2;
const GRID_CARD_HEIGHT: usize = 7;
const LIST_CARD_HEIGHT: usize = 5;
const SUMMARY_PANEL_WIDTH: u16 = 26;
const CHROME_ROWS: u16 = 6;

const CARD_FETCH_ERROR: &str = "Could not fetch channel data.";
const PREDICTION_ERROR: &str = "Sorry, Gemini couldn't generate a prediction. Please try again.";

/// Seam between the UI loop and the outside world. The `spawn_*`
/// defaults run synchronously and post the result on the internal
/// channel; the real runtime overrides them with worker threads.
pub trait AppRuntime {
    fn fetch_latest_upload(&mut self, channel: &Channel) -> Result<Option<String>>;
    fn predict_next_upload(&mut self, channel: &Channel) -> Result<Prediction>;

    fn spawn_latest_upload(&mut self, channel: &Channel, tx: Sender<InternalEvent>) -> Result<()> {
        let outcome = self
            .fetch_latest_upload(channel)
            .map_err(|error| error.to_string());
        tx.send(InternalEvent::CardFetch {
            id: channel.id.clone(),
            outcome,
        })
        .map_err(|_| anyhow::anyhow!("internal event channel closed"))?;
        Ok(())
    }

    fn spawn_prediction(
        &mut self,
        request_id: u64,
        channel: &Channel,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let outcome = self
            .predict_next_upload(channel)
            .map_err(|error| error.to_string());
        tx.send(InternalEvent::Prediction {
            request_id,
            outcome,
        })
        .map_err(|_| anyhow::anyhow!("internal event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    CardFetch {
        id: ChannelId,
        outcome: Result<Option<String>, String>,
    },
    Prediction {
        request_id: u64,
        outcome: Result<Prediction, String>,
    },
}

#[derive(Debug, Default)]
struct ViewData {
    view: ChannelView,
    cards: CardTracker,
    prediction: PredictionSlot,
    cursor: usize,
    scroll: usize,
    viewport_rows: usize,
    search_editing: bool,
    category_picker_visible: bool,
    category_cursor: usize,
    help_visible: bool,
    status_token: u64,
    dirty: bool,
}

pub fn run_app<R: AppRuntime>(
    channels: &[Channel],
    state: &mut AppState,
    runtime: &mut R,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut rng = StdRng::from_entropy();
    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    refresh_view(channels, state, &mut view_data, &mut rng);

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);
        if view_data.dirty {
            refresh_view(channels, state, &mut view_data, &mut rng);
        }

        let size = terminal.size().context("terminal size")?;
        view_data.viewport_rows = usize::from(size.height.saturating_sub(CHROME_ROWS));
        ensure_cursor_visible(state, &mut view_data);
        trigger_visible_fetches(state, runtime, &mut view_data, &internal_tx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn refresh_view<G: Rng>(
    channels: &[Channel],
    state: &AppState,
    view_data: &mut ViewData,
    rng: &mut G,
) {
    view_data.view = derive_view(channels, state, rng);
    let len = view_data.view.displayed.len();
    if len == 0 {
        view_data.cursor = 0;
        view_data.scroll = 0;
    } else if view_data.cursor >= len {
        view_data.cursor = len - 1;
    }
    if view_data.scroll >= len {
        view_data.scroll = 0;
    }
    if view_data.category_cursor >= view_data.view.categories.len() {
        view_data.category_cursor = 0;
    }
    view_data.dirty = false;
}

const fn columns_for(mode: ViewMode) -> usize {
    match mode {
        ViewMode::Grid => GRID_COLUMNS,
        ViewMode::List => 1,
    }
}

const fn card_height_for(mode: ViewMode) -> usize {
    match mode {
        ViewMode::Grid => GRID_CARD_HEIGHT,
        ViewMode::List => LIST_CARD_HEIGHT,
    }
}

fn visible_capacity(viewport_rows: usize, mode: ViewMode) -> usize {
    let rows = (viewport_rows / card_height_for(mode)).max(1);
    rows * columns_for(mode)
}

fn ensure_cursor_visible(state: &AppState, view_data: &mut ViewData) {
    let columns = columns_for(state.view_mode);
    let capacity = visible_capacity(view_data.viewport_rows, state.view_mode);

    if view_data.cursor < view_data.scroll {
        view_data.scroll = view_data.cursor - view_data.cursor % columns;
    }
    while view_data.cursor >= view_data.scroll + capacity {
        view_data.scroll += columns;
    }
}

fn visible_range(state: &AppState, view_data: &ViewData) -> std::ops::Range<usize> {
    let capacity = visible_capacity(view_data.viewport_rows, state.view_mode);
    let start = view_data.scroll.min(view_data.view.displayed.len());
    let end = (start + capacity).min(view_data.view.displayed.len());
    start..end
}

/// Starts a latest-upload lookup for every card that just became
/// visible. `CardTracker::begin` guarantees at most one lookup per
/// card lifetime, so calling this every tick is safe.
fn trigger_visible_fetches<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let range = visible_range(state, view_data);
    let pending: Vec<Channel> = view_data.view.displayed[range]
        .iter()
        .filter(|channel| view_data.cards.state(&channel.id).is_none())
        .cloned()
        .collect();

    for channel in pending {
        if view_data.cards.begin(&channel.id)
            && let Err(error) = runtime.spawn_latest_upload(&channel, internal_tx.clone())
        {
            view_data.cards.fail(&channel.id, error.to_string());
        }
    }
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::CardFetch { id, outcome } => match outcome {
                Ok(title) => {
                    view_data.cards.resolve(&id, title);
                }
                Err(_) => {
                    view_data.cards.fail(&id, CARD_FETCH_ERROR);
                }
            },
            InternalEvent::Prediction {
                request_id,
                outcome,
            } => match outcome {
                Ok(prediction) => {
                    view_data.prediction.complete(request_id, prediction);
                }
                Err(_) => {
                    view_data.prediction.fail(request_id, PREDICTION_ERROR);
                }
            },
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.prediction.is_open() {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter
        ) {
            view_data.prediction.close();
        }
        return false;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.category_picker_visible {
        handle_category_picker_key(state, view_data, key);
        return false;
    }

    if view_data.search_editing {
        handle_search_key(state, view_data, key);
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('/') => view_data.search_editing = true,
        KeyCode::Char('j') | KeyCode::Down => {
            move_cursor(view_data, columns_for(state.view_mode) as isize);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            move_cursor(view_data, -(columns_for(state.view_mode) as isize));
        }
        KeyCode::Char('h') | KeyCode::Left => move_cursor(view_data, -1),
        KeyCode::Char('l') | KeyCode::Right => move_cursor(view_data, 1),
        KeyCode::PageDown => {
            let page = visible_capacity(view_data.viewport_rows, state.view_mode) as isize;
            move_cursor(view_data, page);
        }
        KeyCode::PageUp => {
            let page = visible_capacity(view_data.viewport_rows, state.view_mode) as isize;
            move_cursor(view_data, -page);
        }
        KeyCode::Char('g') | KeyCode::Home => view_data.cursor = 0,
        KeyCode::Char('G') | KeyCode::End => {
            view_data.cursor = view_data.view.displayed.len().saturating_sub(1);
        }
        KeyCode::Char('s') => {
            let next = state.sort_mode.next();
            state.dispatch(AppCommand::SetSortMode(next));
            view_data.dirty = true;
            emit_status(state, view_data, internal_tx, format!("sort: {}", next.label()));
        }
        KeyCode::Char('c') => {
            view_data.category_cursor = view_data
                .view
                .categories
                .iter()
                .position(|category| *category == state.selected_category)
                .unwrap_or(0);
            view_data.category_picker_visible = true;
        }
        KeyCode::Char('v') => {
            state.dispatch(AppCommand::SetViewMode(state.view_mode.toggled()));
            view_data.scroll = 0;
        }
        KeyCode::Char('S') => {
            state.dispatch(AppCommand::ToggleSummary);
        }
        KeyCode::Char('x') => remove_selected(state, view_data, internal_tx),
        KeyCode::Char('r') => {
            state.dispatch(AppCommand::Randomize);
            view_data.dirty = true;
            view_data.cursor = 0;
            view_data.scroll = 0;
            emit_status(
                state,
                view_data,
                internal_tx,
                "shuffled; removed channels restored",
            );
        }
        KeyCode::Char('p') | KeyCode::Enter => open_prediction(runtime, view_data, internal_tx),
        KeyCode::Char('?') => view_data.help_visible = true,
        _ => {}
    }
    false
}

fn handle_search_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => view_data.search_editing = false,
        KeyCode::Backspace => {
            let mut term = state.search_term.clone();
            term.pop();
            state.dispatch(AppCommand::SetSearchTerm(term));
            view_data.dirty = true;
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let mut term = state.search_term.clone();
            term.push(ch);
            state.dispatch(AppCommand::SetSearchTerm(term));
            view_data.dirty = true;
        }
        _ => {}
    }
}

fn handle_category_picker_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => view_data.category_picker_visible = false,
        KeyCode::Char('j') | KeyCode::Down => {
            if view_data.category_cursor + 1 < view_data.view.categories.len() {
                view_data.category_cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.category_cursor = view_data.category_cursor.saturating_sub(1);
        }
        KeyCode::Enter => {
            if let Some(category) = view_data.view.categories.get(view_data.category_cursor) {
                state.dispatch(AppCommand::SelectCategory(category.clone()));
                view_data.dirty = true;
                view_data.cursor = 0;
                view_data.scroll = 0;
            }
            view_data.category_picker_visible = false;
        }
        _ => {}
    }
}

fn move_cursor(view_data: &mut ViewData, delta: isize) {
    let len = view_data.view.displayed.len();
    if len == 0 {
        return;
    }
    let next = view_data.cursor as isize + delta;
    view_data.cursor = next.clamp(0, len as isize - 1) as usize;
}

fn remove_selected(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(channel) = view_data.view.displayed.get(view_data.cursor).cloned() else {
        return;
    };
    state.dispatch(AppCommand::RemoveChannel(channel.id.clone()));
    // A restored channel starts a fresh card lifetime.
    view_data.cards.forget(&channel.id);
    view_data.dirty = true;
    emit_status(
        state,
        view_data,
        internal_tx,
        format!("removed {}", channel.title),
    );
}

fn open_prediction<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(channel) = view_data.view.displayed.get(view_data.cursor).cloned() else {
        return;
    };
    let request_id = view_data.prediction.open(channel.clone());
    if let Err(error) = runtime.spawn_prediction(request_id, &channel, internal_tx.clone()) {
        view_data.prediction.fail(request_id, error.to_string());
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(state, view_data))
        .block(Block::default().title("tubedex").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let body = if state.summary_visible {
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SUMMARY_PANEL_WIDTH), Constraint::Min(1)])
            .split(layout[1]);
        let summary = Paragraph::new(summary_panel_text(view_data)).block(
            Block::default()
                .title("Category Summary")
                .borders(Borders::ALL),
        );
        frame.render_widget(summary, split[0]);
        split[1]
    } else {
        layout[1]
    };

    if view_data.view.displayed.is_empty() {
        let empty = Paragraph::new(empty_state_text())
            .block(Block::default().title(heading_text(state, view_data)).borders(Borders::ALL));
        frame.render_widget(empty, body);
    } else {
        render_cards(frame, body, state, view_data);
    }

    let status = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if view_data.category_picker_visible {
        let area = centered_rect(40, 60, frame.area());
        frame.render_widget(Clear, area);
        let picker = Paragraph::new(category_picker_text(view_data))
            .block(Block::default().title("category").borders(Borders::ALL));
        frame.render_widget(picker, area);
    }

    if let Some(active) = view_data.prediction.active() {
        let area = centered_rect(60, 50, frame.area());
        frame.render_widget(Clear, area);
        let modal = Paragraph::new(prediction_overlay_text(&active.phase))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(format!("Prediction for: {}", active.channel.title))
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Cyan)),
            );
        frame.render_widget(modal, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_cards(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let outer = Block::default()
        .title(heading_text(state, view_data))
        .borders(Borders::ALL);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let columns = columns_for(state.view_mode);
    let card_height = card_height_for(state.view_mode) as u16;
    let rows = (usize::from(inner.height) / usize::from(card_height.max(1))).max(1);

    let row_rects = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(card_height); rows])
        .split(inner);

    let mut index = view_data.scroll;
    for row_rect in row_rects.iter() {
        let column_rects = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![
                Constraint::Percentage((100 / columns) as u16);
                columns
            ])
            .split(*row_rect);

        for column_rect in column_rects.iter() {
            let Some(channel) = view_data.view.displayed.get(index) else {
                return;
            };
            render_card(frame, *column_rect, channel, view_data, index);
            index += 1;
        }
    }
}

fn render_card(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    channel: &Channel,
    view_data: &ViewData,
    index: usize,
) {
    let selected = index == view_data.cursor;
    let style = if selected {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let card = Paragraph::new(card_text(channel, view_data.cards.state(&channel.id)))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(channel.title.clone())
                .borders(Borders::ALL)
                .style(style),
        );
    frame.render_widget(card, area);
}

fn card_text(channel: &Channel, fetch_state: Option<&CardFetchState>) -> String {
    let description = if channel.description.is_empty() {
        "No description available.".to_owned()
    } else {
        channel.description.clone()
    };
    let mut lines = vec![
        format!("{} | {}", channel.category, channel.url()),
        description,
    ];
    let latest = latest_upload_line(fetch_state);
    if !latest.is_empty() {
        lines.push(String::new());
        lines.push(latest);
    }
    lines.join("\n")
}

fn latest_upload_line(fetch_state: Option<&CardFetchState>) -> String {
    match fetch_state {
        None => String::new(),
        Some(CardFetchState::Loading) => "Loading latest video...".to_owned(),
        // An unknown latest upload renders nothing, same as idle.
        Some(CardFetchState::Resolved(None)) => String::new(),
        Some(CardFetchState::Resolved(Some(title))) => format!("Latest Upload: {title}"),
        Some(CardFetchState::Failed(message)) => message.clone(),
    }
}

fn header_text(state: &AppState, view_data: &ViewData) -> String {
    let search = if view_data.search_editing {
        format!("{}_", state.search_term)
    } else if state.search_term.is_empty() {
        "Find a channel...".to_owned()
    } else {
        state.search_term.clone()
    };
    format!(
        "find: {search} | sort: {} | category: {} | view: {}",
        state.sort_mode.label(),
        state.selected_category,
        state.view_mode.as_str(),
    )
}

fn heading_text(state: &AppState, view_data: &ViewData) -> String {
    let heading = if state.selected_category == ALL_CATEGORIES {
        "All Channels"
    } else {
        &state.selected_category
    };
    format!(
        "{heading} ({} results)",
        view_data.view.displayed.len()
    )
}

fn summary_panel_text(view_data: &ViewData) -> String {
    summary_rows(&view_data.view.counts)
        .into_iter()
        .map(|(category, count)| format!("{category:<18} {count:>3}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn category_picker_text(view_data: &ViewData) -> String {
    view_data
        .view
        .categories
        .iter()
        .enumerate()
        .map(|(index, category)| {
            let marker = if index == view_data.category_cursor {
                "→"
            } else {
                " "
            };
            let count = if category == ALL_CATEGORIES {
                view_data.view.counts.values().sum::<usize>()
            } else {
                view_data.view.counts.get(category).copied().unwrap_or(0)
            };
            format!("{marker} {category:<18} {count:>3}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn prediction_overlay_text(phase: &PredictionPhase) -> String {
    match phase {
        PredictionPhase::Loading => "Gemini is predicting the next upload...".to_owned(),
        PredictionPhase::Failed(message) => format!("Prediction Failed\n\n{message}"),
        PredictionPhase::Resolved(prediction) => format!(
            "Predicted Next Upload\n\n{}\n\n{}",
            prediction.title, prediction.description
        ),
    }
}

fn empty_state_text() -> &'static str {
    "No Channels Found\n\nTry adjusting your search or filters."
}

fn status_text(state: &AppState) -> String {
    let default = "j/k/h/l move | / find | s sort | c category | v view | S summary | x remove | p predict | r shuffle | ? help | q quit";
    match &state.status_line {
        Some(status) => format!("{status} | {default}"),
        None => default.to_owned(),
    }
}

fn help_overlay_text() -> &'static str {
    "\
navigation
  j/k/h/l, arrows   move between cards
  PgUp / PgDn       move a page of cards
  g / G, Home/End   first / last card

browsing
  /                 edit the search term (enter/esc to stop)
  s                 cycle sort: Title (A-Z), Title (Z-A), Random
  c                 pick a category (picking one cancels Random sort)
  v                 toggle grid / list view
  S                 toggle the category summary panel

channels
  x                 remove the selected channel for this session
  p / enter         predict the selected channel's next upload
  r                 shuffle everything and restore removed channels

other
  ?                 toggle this help
  q, ctrl+q         quit"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
