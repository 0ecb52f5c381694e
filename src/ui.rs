use std::io::{self, Stdout};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::apod::{DatasetService, FetchError, Item};
use crate::dates::{format_day, parse_day, DateRange};
use crate::gallery::Gallery;
use crate::keys::{KeyRouter, Overlay};
use crate::render::{self, Body, Card, PageControl, Pagination, Thumbnail};
use crate::viewer::{rect_contains, Dismissal, Media, Viewer, ViewerAction};

const GRID_COLUMNS: usize = 3;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_FAVORITE: Color = Color::Rgb(243, 139, 168);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);
const COLOR_DISABLED: Color = Color::Rgb(88, 91, 112);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const PREV_LABEL: &str = "← Prev";
const NEXT_LABEL: &str = "Next →";

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Builds the argv for the external player, substituting `%URL%` or
/// appending the URL when the template has no placeholder.
fn player_args(command: &[String], url: &str) -> Option<(String, Vec<String>)> {
    let (program, rest) = command.split_first()?;
    let mut args: Vec<String> = rest.iter().map(|arg| arg.replace("%URL%", url)).collect();
    if !rest.iter().any(|arg| arg.contains("%URL%")) {
        args.push(url.to_string());
    }
    Some((program.clone(), args))
}

fn launch_player(command: &[String], url: &str) -> Result<()> {
    let (program, args) =
        player_args(command, url).context("player: video_command is empty")?;
    Command::new(&program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("player: launch {program}"))?;
    Ok(())
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        if self.last_tick.elapsed() >= Duration::from_millis(100) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = Instant::now();
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum DateField {
    Start,
    End,
}

impl DateField {
    fn label(self) -> &'static str {
        match self {
            DateField::Start => "Start date",
            DateField::End => "End date",
        }
    }
}

struct DateInput {
    field: DateField,
    buffer: String,
}

enum AsyncResponse {
    Items {
        request_id: u64,
        result: Result<Vec<Item>, FetchError>,
    },
    ImageProbe {
        url: String,
        result: Result<(), FetchError>,
    },
}

#[derive(Default)]
struct HitAreas {
    cards: Vec<Rect>,
    prev: Option<Rect>,
    next: Option<Rect>,
    viewer: Option<Rect>,
}

pub struct Options {
    pub dataset: Arc<dyn DatasetService>,
    pub gallery: Gallery,
    pub dates: DateRange,
    pub player_command: Vec<String>,
    pub status_message: String,
    pub fetch_on_start: bool,
}

pub struct Model {
    dataset: Arc<dyn DatasetService>,
    gallery: Gallery,
    dates: DateRange,
    player_command: Vec<String>,
    keys: KeyRouter,
    viewer: Option<Viewer>,
    page_picker: Option<usize>,
    date_input: Option<DateInput>,
    selected: usize,
    status_message: String,
    spinner: Spinner,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    request_id: u64,
    pending_fetch: Option<u64>,
    fetch_on_start: bool,
    needs_redraw: bool,
    hits: HitAreas,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            dataset: opts.dataset,
            gallery: opts.gallery,
            dates: opts.dates,
            player_command: opts.player_command,
            keys: KeyRouter::default(),
            viewer: None,
            page_picker: None,
            date_input: None,
            selected: 0,
            status_message: opts.status_message,
            spinner: Spinner::new(),
            response_tx,
            response_rx,
            request_id: 0,
            pending_fetch: None,
            fetch_on_start: opts.fetch_on_start,
            needs_redraw: true,
            hits: HitAreas::default(),
        }
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        if self.fetch_on_start {
            self.trigger_fetch();
        }
        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                            }
                        }
                        self.mark_dirty();
                    }
                    Event::Mouse(mouse) => {
                        if let Err(err) = self.handle_mouse(mouse) {
                            self.status_message = format!("Error: {}", err);
                        }
                        self.mark_dirty();
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.gallery.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Items { request_id, result } => {
                if self.pending_fetch != Some(request_id) {
                    tracing::debug!(request_id, "Dropping stale fetch response");
                    return;
                }
                self.pending_fetch = None;
                match result {
                    Ok(items) => {
                        self.gallery.ingest(items);
                        self.selected = 0;
                        self.sync_status();
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "Fetch failed");
                        self.gallery.fail(err.to_string());
                        self.status_message = "Press g to try again.".to_string();
                    }
                }
            }
            AsyncResponse::ImageProbe { url, result } => {
                if let Err(err) = result {
                    tracing::warn!(url = %url, error = %err, "Image probe failed");
                    if let Some(viewer) = self.viewer.as_mut() {
                        viewer.image_failed(&url);
                    }
                }
            }
        }
    }

    fn sync_status(&mut self) {
        if let Some(status) = render::project(&self.gallery).status {
            self.status_message = status;
        } else {
            self.status_message.clear();
        }
    }

    fn trigger_fetch(&mut self) {
        if !self.gallery.begin_fetch() {
            self.status_message = "Already loading images...".to_string();
            return;
        }
        self.request_id += 1;
        let request_id = self.request_id;
        self.pending_fetch = Some(request_id);

        let start = self.dates.start();
        let end = self.dates.end();
        self.status_message = format!(
            "Loading images for {} to {}",
            format_day(start),
            format_day(end)
        );

        let service = self.dataset.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.fetch_range(Some(start), Some(end));
            let _ = tx.send(AsyncResponse::Items { request_id, result });
        });
    }

    fn probe_image(&self, url: String) {
        let service = self.dataset.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.probe_image(&url);
            let _ = tx.send(AsyncResponse::ImageProbe { url, result });
        });
    }

    fn selected_item(&self) -> Option<Item> {
        self.gallery.page_items().get(self.selected).cloned()
    }

    fn clamp_selection(&mut self) {
        let len = self.gallery.page_items().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        match self.keys.active() {
            Some(Overlay::Viewer) => {
                self.handle_viewer_key(code);
                return Ok(false);
            }
            Some(Overlay::PagePicker) => {
                self.handle_page_picker_key(code);
                return Ok(false);
            }
            Some(Overlay::DateInput) => {
                self.handle_date_input_key(code);
                return Ok(false);
            }
            None => {}
        }

        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('g') | KeyCode::Char('r') => self.trigger_fetch(),
            KeyCode::Char('s') => self.open_date_input(DateField::Start),
            KeyCode::Char('e') => self.open_date_input(DateField::End),
            KeyCode::Char('c') => {
                self.gallery.set_category(self.gallery.category().next());
                self.after_filter_change();
            }
            KeyCode::Char('C') => {
                self.gallery.set_category(self.gallery.category().previous());
                self.after_filter_change();
            }
            KeyCode::Char('v') => {
                self.gallery.set_favorites_only(!self.gallery.favorites_only());
                self.after_filter_change();
            }
            KeyCode::Char('f') => self.toggle_selected_favorite(),
            KeyCode::Left | KeyCode::Char('h') => self.move_selection(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-(GRID_COLUMNS as i32)),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(GRID_COLUMNS as i32),
            KeyCode::Enter => self.open_viewer(),
            KeyCode::Char('n') | KeyCode::PageDown => self.apply_page_control(PageControl::Next),
            KeyCode::Char('p') | KeyCode::PageUp => self.apply_page_control(PageControl::Prev),
            KeyCode::Char('P') => self.open_page_picker(),
            _ => {}
        }
        Ok(false)
    }

    fn after_filter_change(&mut self) {
        self.selected = 0;
        self.sync_status();
    }

    fn move_selection(&mut self, delta: i32) {
        let len = self.gallery.page_items().len();
        if len == 0 {
            return;
        }
        let next = self.selected as i32 + delta;
        if (0..len as i32).contains(&next) {
            self.selected = next as usize;
        }
    }

    fn toggle_selected_favorite(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };
        let favorited = self.gallery.toggle_favorite(&item);
        self.clamp_selection();
        self.sync_status();
        let label = item.date.as_deref().unwrap_or("item");
        self.status_message = if favorited {
            format!("Added {label} to favorites.")
        } else {
            format!("Removed {label} from favorites.")
        };
    }

    fn apply_page_control(&mut self, control: PageControl) {
        if self.gallery.empty_state().is_some() || self.gallery.is_loading() {
            return;
        }
        let target = control.target(self.gallery.current_page());
        if self.gallery.set_page(target) {
            self.selected = 0;
        }
    }

    fn open_viewer(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };
        let viewer = Viewer::open(item, &mut self.keys);
        if let Some(url) = viewer.pending_image() {
            self.probe_image(url.to_string());
        }
        self.viewer = Some(viewer);
    }

    fn close_viewer(&mut self, reason: Dismissal) {
        if let Some(viewer) = self.viewer.take() {
            viewer.dismiss(reason, &mut self.keys);
        }
        self.hits.viewer = None;
    }

    fn handle_viewer_key(&mut self, code: KeyCode) {
        let Some(viewer) = self.viewer.as_ref() else {
            self.keys.release(Overlay::Viewer);
            return;
        };
        match viewer.handle_key(code) {
            ViewerAction::None => {}
            ViewerAction::Dismiss(reason) => self.close_viewer(reason),
            ViewerAction::OpenLink(url) => match webbrowser::open(&url) {
                Ok(_) => self.status_message = "Opened in your browser.".to_string(),
                Err(err) => {
                    self.status_message = format!("Failed to open browser: {err} (URL: {url})")
                }
            },
            ViewerAction::Play(url) => match launch_player(&self.player_command, &url) {
                Ok(()) => self.status_message = "Launched video player.".to_string(),
                Err(err) => {
                    tracing::warn!(error = ?err, "Player launch failed");
                    self.status_message = format!("Failed to launch player: {err}");
                }
            },
            ViewerAction::Scroll(delta) => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.scroll_by(delta);
                }
            }
        }
    }

    fn open_page_picker(&mut self) {
        if self.gallery.empty_state().is_some() || self.gallery.is_loading() {
            return;
        }
        self.page_picker = Some(self.gallery.current_page() - 1);
        self.keys.grab(Overlay::PagePicker);
    }

    fn close_page_picker(&mut self) {
        self.page_picker = None;
        self.keys.release(Overlay::PagePicker);
    }

    fn handle_page_picker_key(&mut self, code: KeyCode) {
        let Some(index) = self.page_picker else {
            self.close_page_picker();
            return;
        };
        let last = self.gallery.total_pages().saturating_sub(1);
        match code {
            KeyCode::Esc | KeyCode::Char('q') => self.close_page_picker(),
            KeyCode::Down | KeyCode::Char('j') => self.page_picker = Some((index + 1).min(last)),
            KeyCode::Up | KeyCode::Char('k') => self.page_picker = Some(index.saturating_sub(1)),
            KeyCode::Enter => {
                self.close_page_picker();
                self.apply_page_control(PageControl::Select(index + 1));
            }
            _ => {}
        }
    }

    fn open_date_input(&mut self, field: DateField) {
        let current = match field {
            DateField::Start => self.dates.start(),
            DateField::End => self.dates.end(),
        };
        self.date_input = Some(DateInput {
            field,
            buffer: format_day(current),
        });
        self.keys.grab(Overlay::DateInput);
    }

    fn close_date_input(&mut self) {
        self.date_input = None;
        self.keys.release(Overlay::DateInput);
    }

    fn handle_date_input_key(&mut self, code: KeyCode) {
        let Some(input) = self.date_input.as_mut() else {
            self.close_date_input();
            return;
        };
        match code {
            KeyCode::Esc => self.close_date_input(),
            KeyCode::Backspace => {
                input.buffer.pop();
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() || ch == '-' => {
                if input.buffer.len() < 10 {
                    input.buffer.push(ch);
                }
            }
            KeyCode::Enter => {
                let field = input.field;
                let raw = input.buffer.clone();
                match parse_day(&raw) {
                    Some(day) => {
                        match field {
                            DateField::Start => self.dates.on_start_changed(day),
                            DateField::End => self.dates.set_end(day),
                        }
                        self.close_date_input();
                        self.status_message = format!(
                            "Range {} to {}. Press g to get images.",
                            format_day(self.dates.start()),
                            format_day(self.dates.end())
                        );
                    }
                    None => {
                        self.status_message = format!("Invalid date '{raw}' (use YYYY-MM-DD).");
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Result<()> {
        let (column, row) = (event.column, event.row);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {}
            MouseEventKind::ScrollDown => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.scroll_by(3);
                }
                return Ok(());
            }
            MouseEventKind::ScrollUp => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.scroll_by(-3);
                }
                return Ok(());
            }
            _ => return Ok(()),
        }

        if self.keys.active() == Some(Overlay::Viewer) {
            let action = match (self.viewer.as_ref(), self.hits.viewer) {
                (Some(viewer), Some(area)) => viewer.handle_click(column, row, area),
                _ => ViewerAction::None,
            };
            if let ViewerAction::Dismiss(reason) = action {
                self.close_viewer(reason);
            }
            return Ok(());
        }
        if self.keys.active().is_some() {
            return Ok(());
        }

        if self.hits.prev.is_some_and(|area| rect_contains(area, column, row)) {
            self.apply_page_control(PageControl::Prev);
            return Ok(());
        }
        if self.hits.next.is_some_and(|area| rect_contains(area, column, row)) {
            self.apply_page_control(PageControl::Next);
            return Ok(());
        }
        let hit = self
            .hits
            .cards
            .iter()
            .position(|area| rect_contains(*area, column, row));
        if let Some(index) = hit {
            self.selected = index;
            self.open_viewer();
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(full);

        self.draw_controls(frame, layout[0]);

        let status_text = if self.gallery.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
        } else {
            self.status_message.clone()
        };
        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[1]);

        let display = render::project(&self.gallery);
        self.hits.cards.clear();
        match &display.body {
            Body::Message(text) => draw_message(frame, layout[2], text, COLOR_TEXT_SECONDARY),
            Body::Error(text) => draw_message(frame, layout[2], text, COLOR_ERROR),
            Body::Cards(cards) => self.draw_grid(frame, layout[2], cards),
        }

        match &display.pagination {
            Some(pagination) => self.draw_pagination(frame, layout[3], pagination),
            None => {
                self.hits.prev = None;
                self.hits.next = None;
            }
        }

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[4]);

        if let Some(pagination) = &display.pagination {
            if self.page_picker.is_some() {
                self.draw_page_picker(frame, layout[2], pagination);
            }
        }
        if self.date_input.is_some() {
            self.draw_date_input(frame, layout[2]);
        }
        if self.viewer.is_some() {
            self.draw_viewer(frame, full);
        }
    }

    fn draw_controls(&self, frame: &mut Frame<'_>, area: Rect) {
        let label = Style::default().fg(COLOR_TEXT_SECONDARY);
        let value = Style::default()
            .fg(COLOR_TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD);
        let trigger = if self.gallery.is_loading() {
            Span::styled("[g] Get images (busy)", Style::default().fg(COLOR_DISABLED))
        } else {
            Span::styled(
                "[g] Get images",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
        };
        let line = Line::from(vec![
            Span::styled("Start ", label),
            Span::styled(format_day(self.dates.start()), value),
            Span::styled("  End ", label),
            Span::styled(format_day(self.dates.end()), value),
            Span::styled("  Category ", label),
            Span::styled(self.gallery.category().display_name(), value),
            Span::styled("  Favorites only ", label),
            Span::styled(if self.gallery.favorites_only() { "on" } else { "off" }, value),
            Span::raw("  "),
            trigger,
        ]);
        let controls = Paragraph::new(line).block(
            Block::default()
                .title(Span::styled(
                    "Astronomy Picture of the Day",
                    Style::default()
                        .fg(COLOR_ACCENT)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_BORDER_IDLE))
                .style(Style::default().bg(COLOR_PANEL_BG)),
        );
        frame.render_widget(controls, area);
    }

    fn draw_grid(&mut self, frame: &mut Frame<'_>, area: Rect, cards: &[Card]) {
        let rows = self.gallery.page_size().div_ceil(GRID_COLUMNS).max(1);
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
            .split(area);

        for (index, card) in cards.iter().enumerate() {
            let row = index / GRID_COLUMNS;
            let column = index % GRID_COLUMNS;
            let Some(row_area) = row_areas.get(row) else {
                break;
            };
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, GRID_COLUMNS as u32); GRID_COLUMNS])
                .split(*row_area);
            let cell = columns[column];
            self.hits.cards.push(cell);
            draw_card(frame, cell, card, index == self.selected);
        }
    }

    fn draw_pagination(&mut self, frame: &mut Frame<'_>, area: Rect, pagination: &Pagination) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(PREV_LABEL.width() as u16 + 2),
                Constraint::Min(0),
                Constraint::Length(NEXT_LABEL.width() as u16 + 2),
            ])
            .split(area);

        let enabled = Style::default()
            .fg(COLOR_ACCENT)
            .bg(COLOR_PANEL_BG)
            .add_modifier(Modifier::BOLD);
        let disabled = Style::default().fg(COLOR_DISABLED).bg(COLOR_PANEL_BG);

        let prev_style = if pagination.prev_enabled { enabled } else { disabled };
        let next_style = if pagination.next_enabled { enabled } else { disabled };
        frame.render_widget(
            Paragraph::new(PREV_LABEL).style(prev_style).alignment(Alignment::Center),
            chunks[0],
        );
        let selector = pagination
            .options
            .iter()
            .find(|option| option.selected)
            .map(|option| format!("{}  (P to choose)", option.label))
            .unwrap_or_default();
        frame.render_widget(
            Paragraph::new(selector)
                .style(Style::default().fg(COLOR_TEXT_PRIMARY).bg(COLOR_PANEL_BG))
                .alignment(Alignment::Center),
            chunks[1],
        );
        frame.render_widget(
            Paragraph::new(NEXT_LABEL).style(next_style).alignment(Alignment::Center),
            chunks[2],
        );

        self.hits.prev = pagination.prev_enabled.then_some(chunks[0]);
        self.hits.next = pagination.next_enabled.then_some(chunks[2]);
    }

    fn draw_page_picker(&self, frame: &mut Frame<'_>, area: Rect, pagination: &Pagination) {
        let popup_area = centered_rect(40, 60, area);
        frame.render_widget(Clear, popup_area);

        let items: Vec<ListItem> = pagination
            .options
            .iter()
            .map(|option| {
                ListItem::new(Line::from(Span::styled(
                    option.label.clone(),
                    Style::default().fg(COLOR_TEXT_PRIMARY).bg(COLOR_PANEL_BG),
                )))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .title(Span::styled(
                        "Select page",
                        Style::default()
                            .fg(COLOR_ACCENT)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(COLOR_ACCENT))
                    .style(Style::default().bg(COLOR_PANEL_BG)),
            )
            .highlight_style(
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .bg(COLOR_PANEL_SELECTED_BG)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");

        let mut state = ListState::default();
        state.select(self.page_picker);
        frame.render_stateful_widget(list, popup_area, &mut state);
    }

    fn draw_date_input(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(input) = self.date_input.as_ref() else {
            return;
        };
        let popup_area = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup_area);
        let bounds = self.dates.bounds();
        let lines = vec![
            Line::from(vec![
                Span::styled(
                    format!("{}: ", input.field.label()),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ),
                Span::styled(
                    format!("{}_", input.buffer),
                    Style::default()
                        .fg(COLOR_TEXT_PRIMARY)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::default(),
            Line::from(Span::styled(
                format!(
                    "Allowed: {} to {}",
                    format_day(bounds.min),
                    format_day(bounds.max)
                ),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
            Line::from(Span::styled(
                "Enter apply · Esc cancel",
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::ITALIC),
            )),
        ];
        let prompt = Paragraph::new(lines).block(
            Block::default()
                .title(Span::styled(
                    "Date range",
                    Style::default()
                        .fg(COLOR_ACCENT)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_ACCENT))
                .style(Style::default().bg(COLOR_PANEL_BG)),
        );
        frame.render_widget(prompt, popup_area);
    }

    fn draw_viewer(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let Some(viewer) = self.viewer.as_ref() else {
            return;
        };
        let popup_area = centered_rect(80, 80, area);
        frame.render_widget(Clear, popup_area);
        self.hits.viewer = Some(popup_area);

        let item = viewer.item();
        let link = Style::default().fg(COLOR_ACCENT);
        let muted = Style::default().fg(COLOR_TEXT_SECONDARY);
        let mut lines: Vec<Line<'static>> = match viewer.media() {
            Media::Embed { src, .. } => vec![
                Line::from(Span::styled("Video", muted)),
                Line::from(Span::styled(src.clone(), link)),
                Line::from(Span::styled("o open in browser · m play", muted)),
            ],
            Media::VideoLink { url } => vec![
                Line::from(Span::styled("Video content. Open in browser:", muted)),
                Line::from(Span::styled(url.clone(), link)),
            ],
            Media::Image { src, .. } => vec![
                Line::from(Span::styled("Image", muted)),
                Line::from(Span::styled(src.clone(), link)),
            ],
            Media::ImageFailed { link: fallback } => vec![
                Line::from(Span::styled(
                    "Image failed to load. Open the source:",
                    Style::default().fg(COLOR_ERROR),
                )),
                Line::from(Span::styled(fallback.clone(), link)),
            ],
            Media::Link { url } => vec![
                Line::from(Span::styled("Open source page:", muted)),
                Line::from(Span::styled(url.clone(), link)),
            ],
        };
        lines.push(Line::default());
        for paragraph in item.explanation.lines() {
            lines.push(Line::from(Span::styled(
                paragraph.to_string(),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )));
        }
        if let Some(copyright) = item.copyright.as_deref().map(str::trim) {
            if !copyright.is_empty() {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(format!("© {copyright}"), muted)));
            }
        }

        let title = format!(
            "{} — {}",
            if item.title.is_empty() { "APOD" } else { item.title.as_str() },
            item.date.as_deref().unwrap_or("")
        );
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(popup_area);

        let body = Paragraph::new(Text::from(lines))
            .block(
                Block::default()
                    .title(Span::styled(
                        title,
                        Style::default()
                            .fg(COLOR_ACCENT)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(COLOR_BORDER_FOCUSED))
                    .style(Style::default().bg(COLOR_PANEL_BG)),
            )
            .wrap(Wrap { trim: false })
            .scroll((viewer.scroll(), 0));
        frame.render_widget(body, chunks[0]);

        let instructions = Paragraph::new("j/k scroll · o open · m play video · x close · Esc cancel")
            .alignment(Alignment::Center)
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            );
        frame.render_widget(instructions, chunks[1]);
    }

    fn footer_text(&self) -> &'static str {
        match self.keys.active() {
            Some(Overlay::Viewer) => "Esc/x close · click outside to close",
            Some(Overlay::PagePicker) => "j/k move · Enter go · Esc close",
            Some(Overlay::DateInput) => "Type YYYY-MM-DD · Enter apply · Esc cancel",
            None => {
                "g get · s/e dates · c category · v favorites only · f favorite · Enter view · n/p page · q quit"
            }
        }
    }
}

fn draw_message(frame: &mut Frame<'_>, area: Rect, text: &str, color: Color) {
    let message = Paragraph::new(text.to_string())
        .style(Style::default().fg(color).bg(COLOR_BG))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::NONE));
    let inner = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Min(1),
            Constraint::Percentage(45),
        ])
        .split(area);
    frame.render_widget(message, inner[1]);
}

fn draw_card(frame: &mut Frame<'_>, area: Rect, card: &Card, selected: bool) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let (border, background) = if selected {
        (COLOR_BORDER_FOCUSED, COLOR_PANEL_SELECTED_BG)
    } else {
        (COLOR_BORDER_IDLE, COLOR_PANEL_BG)
    };

    let thumbnail = match &card.thumbnail {
        Thumbnail::Url(url) => Span::styled(
            truncate_to_width(url, inner_width),
            Style::default().fg(COLOR_ACCENT),
        ),
        Thumbnail::Placeholder(kind) => Span::styled(
            format!("[{}]", kind.label()),
            Style::default()
                .fg(COLOR_TEXT_SECONDARY)
                .add_modifier(Modifier::ITALIC),
        ),
    };
    let mut lines = vec![Line::from(thumbnail)];
    if card.play_marker {
        lines.push(Line::from(Span::styled(
            "▶ video",
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )));
    }
    lines.push(Line::from(if card.favorited {
        Span::styled("♥ favorite", Style::default().fg(COLOR_FAVORITE))
    } else {
        Span::styled("♡", Style::default().fg(COLOR_TEXT_SECONDARY))
    }));

    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(Span::styled(
                truncate_to_width(&card.caption, inner_width),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(background)),
    );
    frame.render_widget(widget, area);
}
