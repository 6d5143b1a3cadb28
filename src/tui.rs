#![allow(clippy::too_many_lines)]

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vsp_console::api::device::{DeviceFilter, DeviceStatus};
use vsp_console::api::ptz::{DEFAULT_SPEED, MAX_SPEED, MIN_SPEED, PtzAction, PtzCommand};
use vsp_console::api::{ApiClient, ApiError, DeviceApi, PtzApi, StreamApi};
use vsp_console::config::ConsoleConfig;
use vsp_console::notify::{ChannelNotifier, Notification, NotificationLevel, Notifier};
use vsp_console::player::{FlvEngineFactory, PlayerBinding, PlayerFailure, PreviewSize, VideoSurface};
use vsp_console::session::{StreamKind, VideoSessionManager, Window};

const UI_TICK: Duration = Duration::from_millis(33);
const NOTICE_HISTORY: usize = 32;
const SPEED_STEP: u8 = 10;
const TREE_WIDTH: u16 = 34;
const PTZ_WIDTH: u16 = 28;

const GLYPH_ACTIVE: &str = "▸";
const GLYPH_EXPANDED: &str = "▾";
const GLYPH_COLLAPSED: &str = "▸";
const GLYPH_BULLET: &str = "•";

const COLOR_TEXT: Color = Color::Rgb(220, 223, 228);
const COLOR_MUTED: Color = Color::Rgb(128, 134, 145);
const COLOR_BORDER: Color = Color::Rgb(70, 76, 88);
const COLOR_BORDER_ACTIVE: Color = Color::Rgb(97, 175, 239);
const COLOR_ACCENT: Color = Color::Rgb(198, 120, 221);
const COLOR_SUCCESS: Color = Color::Rgb(152, 195, 121);
const COLOR_WARNING: Color = Color::Rgb(229, 192, 123);
const COLOR_ERROR: Color = Color::Rgb(224, 108, 117);

type AppTerminal = Terminal<CrosstermBackend<io::Stdout>>;

pub async fn run_tui(config: ConsoleConfig, client: Arc<ApiClient>) -> Result<()> {
    let mut app = App::new(&config, client)?;
    let mut terminal = init_terminal()?;

    let run_result = run_loop(&mut terminal, &mut app).await;
    // Sessions are released before the terminal is handed back.
    app.shutdown().await;
    let restore_result = restore_terminal(&mut terminal);

    run_result?;
    restore_result?;
    Ok(())
}

async fn run_loop(terminal: &mut AppTerminal, app: &mut App) -> Result<()> {
    app.reload_devices();

    loop {
        app.poll_device_tree().await;
        app.drain_notifications();
        app.sync_players();
        app.reap_operations();

        terminal
            .draw(|frame| app.draw(frame))
            .context("failed drawing TUI frame")?;

        while event::poll(Duration::ZERO).context("failed to poll input")? {
            if let Event::Key(key) = event::read().context("failed reading input")? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_key(key) == AppCommand::Quit {
                    return Ok(());
                }
            }
        }

        tokio::time::sleep(UI_TICK).await;
    }
}

fn init_terminal() -> Result<AppTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed entering alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("failed creating terminal")
}

fn restore_terminal(terminal: &mut AppTerminal) -> Result<()> {
    disable_raw_mode().context("failed disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed leaving alternate screen")?;
    terminal.show_cursor().context("failed showing cursor")?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ChannelNode {
    channel_id: String,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DeviceNode {
    device_id: String,
    name: String,
    channels: Vec<ChannelNode>,
    expanded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TreeRow {
    Device(usize),
    Channel(usize, usize),
}

/// Rows currently visible, honouring collapsed devices.
fn visible_rows(devices: &[DeviceNode]) -> Vec<TreeRow> {
    let mut rows = Vec::new();
    for (device_idx, device) in devices.iter().enumerate() {
        rows.push(TreeRow::Device(device_idx));
        if device.expanded {
            rows.extend((0..device.channels.len()).map(|ch| TreeRow::Channel(device_idx, ch)));
        }
    }
    rows
}

/// Online devices with their `ON` channels. A device whose channel list
/// cannot be fetched is skipped.
async fn load_device_tree(
    devices: DeviceApi,
    notifier: Arc<dyn Notifier>,
) -> Result<Vec<DeviceNode>, ApiError> {
    let filter = DeviceFilter {
        status: Some(DeviceStatus::Online),
        ..DeviceFilter::default()
    };
    let online = devices.list(&filter).await?;

    let mut tree = Vec::with_capacity(online.len());
    for device in online.into_iter().filter(|device| device.is_online()) {
        let channels = match devices.channels(&device.device_id).await {
            Ok(channels) => channels,
            Err(err) => {
                warn!(device_id = %device.device_id, "failed loading channels: {err}");
                notifier.notify(Notification::warning(format!(
                    "Failed to load channels for {}",
                    device.device_name
                )));
                continue;
            }
        };
        tree.push(DeviceNode {
            name: device.device_name.clone(),
            device_id: device.device_id,
            channels: channels
                .iter()
                .filter(|channel| channel.is_on())
                .map(|channel| ChannelNode {
                    channel_id: channel.channel_id.clone(),
                    name: channel.display_name().to_owned(),
                })
                .collect(),
            expanded: true,
        });
    }
    Ok(tree)
}

struct WindowView {
    id: String,
    surface: Arc<VideoSurface>,
    player: PlayerBinding,
    failures: mpsc::UnboundedReceiver<PlayerFailure>,
}

struct App {
    manager: Arc<VideoSessionManager>,
    devices: DeviceApi,
    ptz: PtzApi,
    notifier: Arc<ChannelNotifier>,
    notifications: mpsc::UnboundedReceiver<Notification>,
    notices: VecDeque<Notification>,
    tree: Vec<DeviceNode>,
    cursor: usize,
    pending_tree: Option<JoinHandle<Result<Vec<DeviceNode>, ApiError>>>,
    operations: Vec<JoinHandle<()>>,
    views: Vec<WindowView>,
    ptz_speed: u8,
}

impl App {
    fn new(config: &ConsoleConfig, client: Arc<ApiClient>) -> Result<Self> {
        let (notifier, notifications) = ChannelNotifier::new();
        let notifier = Arc::new(notifier);
        let manager = VideoSessionManager::new(
            config.window_count,
            Arc::new(StreamApi::new(client.clone())),
            notifier.clone(),
            config.replace_policy,
        )
        .context("failed creating video session manager")?;

        let factory = Arc::new(
            FlvEngineFactory::new(config.request_timeout())
                .context("failed creating media client")?,
        );
        let views = manager
            .snapshot()
            .into_iter()
            .map(|window| {
                let surface = Arc::new(VideoSurface::new());
                let (player, failures) =
                    PlayerBinding::new(factory.clone(), surface.clone(), config.autoplay);
                WindowView {
                    id: window.id,
                    surface,
                    player,
                    failures,
                }
            })
            .collect();

        Ok(Self {
            manager: Arc::new(manager),
            devices: DeviceApi::new(client.clone()),
            ptz: PtzApi::new(client),
            notifier,
            notifications,
            notices: VecDeque::with_capacity(NOTICE_HISTORY),
            tree: Vec::new(),
            cursor: 0,
            pending_tree: None,
            operations: Vec::new(),
            views,
            ptz_speed: DEFAULT_SPEED,
        })
    }

    fn reload_devices(&mut self) {
        if self.pending_tree.is_some() {
            return;
        }
        let devices = self.devices.clone();
        let notifier: Arc<dyn Notifier> = self.notifier.clone();
        self.pending_tree = Some(tokio::spawn(load_device_tree(devices, notifier)));
        self.push_notice(Notification::info("Loading devices..."));
    }

    async fn poll_device_tree(&mut self) {
        let finished = self
            .pending_tree
            .as_ref()
            .is_some_and(JoinHandle::is_finished);
        if !finished {
            return;
        }
        let Some(handle) = self.pending_tree.take() else {
            return;
        };

        match handle.await {
            Ok(Ok(tree)) => {
                let channel_count: usize = tree.iter().map(|device| device.channels.len()).sum();
                info!(devices = tree.len(), channels = channel_count, "device tree loaded");
                self.tree = tree;
                self.cursor = self.cursor.min(visible_rows(&self.tree).len().saturating_sub(1));
                self.push_notice(Notification::info(format!(
                    "Loaded {} online device(s)",
                    self.tree.len()
                )));
            }
            Ok(Err(err)) => {
                warn!("failed loading device tree: {err}");
                self.push_notice(err.notification());
            }
            Err(err) => {
                warn!("device tree task failed: {err}");
                self.push_notice(Notification::error("Failed to load devices"));
            }
        }
    }

    fn drain_notifications(&mut self) {
        while let Ok(notification) = self.notifications.try_recv() {
            self.push_notice(notification);
        }
    }

    fn push_notice(&mut self, notification: Notification) {
        if self.notices.len() == NOTICE_HISTORY {
            self.notices.pop_front();
        }
        self.notices.push_back(notification);
    }

    fn sync_players(&mut self) {
        let windows = self.manager.snapshot();
        let mut failed = Vec::new();
        for (view, window) in self.views.iter_mut().zip(&windows) {
            view.player.set_source(window.media_source());
            while let Ok(failure) = view.failures.try_recv() {
                failed.push(Notification::error(format!(
                    "Window {}: {}",
                    view.id, failure.error
                )));
            }
        }
        for notice in failed {
            self.push_notice(notice);
        }
    }

    fn reap_operations(&mut self) {
        self.operations.retain(|handle| !handle.is_finished());
    }

    async fn shutdown(&mut self) {
        for operation in self.operations.drain(..) {
            let _ = operation.await;
        }
        let failures = self.manager.stop_all().await;
        if failures > 0 {
            warn!(failures, "some sessions could not be stopped on exit");
        }
        for view in &mut self.views {
            view.player.shutdown();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> AppCommand {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return AppCommand::Quit;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return AppCommand::Quit,
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down => {
                let last = visible_rows(&self.tree).len().saturating_sub(1);
                self.cursor = (self.cursor + 1).min(last);
            }
            KeyCode::Enter => self.activate_row(),
            KeyCode::Char(digit @ '1'..='9') => {
                let id = digit.to_string();
                if self.manager.select_window(&id).is_err() {
                    self.push_notice(Notification::warning(format!("No window {id}")));
                }
            }
            KeyCode::Tab => self.cycle_window(true),
            KeyCode::BackTab => self.cycle_window(false),
            KeyCode::Char('p') => self.play_active(),
            KeyCode::Char('x') => self.stop_active(),
            KeyCode::Char('r') => self.reload_devices(),
            KeyCode::Char('[') => self.ptz_speed = step_speed(self.ptz_speed, false),
            KeyCode::Char(']') => self.ptz_speed = step_speed(self.ptz_speed, true),
            KeyCode::Char(ch) => {
                if let Some(action) = ptz_action_for(ch) {
                    self.send_ptz(action);
                }
            }
            _ => {}
        }
        AppCommand::None
    }

    fn cycle_window(&mut self, forward: bool) {
        let windows = self.manager.snapshot();
        let active = self.manager.active_window().id;
        let current = windows
            .iter()
            .position(|window| window.id == active)
            .unwrap_or(0);
        let next = cycle_index(current, windows.len(), forward);
        if let Some(window) = windows.get(next) {
            let _ = self.manager.select_window(&window.id);
        }
    }

    fn activate_row(&mut self) {
        match visible_rows(&self.tree).get(self.cursor).copied() {
            Some(TreeRow::Device(idx)) => {
                if let Some(device) = self.tree.get_mut(idx) {
                    device.expanded = !device.expanded;
                }
            }
            Some(TreeRow::Channel(device_idx, channel_idx)) => {
                let device = &self.tree[device_idx];
                let channel = &device.channels[channel_idx];
                self.manager
                    .select_channel(device.device_id.clone(), channel.channel_id.clone());
                let notice = Notification::info(format!("Selected {}", channel.name));
                self.push_notice(notice);
            }
            None => {}
        }
    }

    fn play_active(&mut self) {
        // Captured now so a later window switch does not redirect the play.
        let window_id = self.manager.active_window().id;
        let manager = self.manager.clone();
        self.operations.push(tokio::spawn(async move {
            let _ = manager.play_window(&window_id, StreamKind::Live).await;
        }));
    }

    fn stop_active(&mut self) {
        let window_id = self.manager.active_window().id;
        let manager = self.manager.clone();
        self.operations.push(tokio::spawn(async move {
            let _ = manager.stop(&window_id).await;
        }));
    }

    fn send_ptz(&mut self, action: PtzAction) {
        let window = self.manager.active_window();
        let (Some(device_id), Some(channel_id)) = (window.device_id(), window.channel_id()) else {
            self.push_notice(Notification::warning("Play a stream in this window first"));
            return;
        };
        let command = PtzCommand::new(device_id, channel_id, action, Some(self.ptz_speed));
        let ptz = self.ptz.clone();
        let notifier = self.notifier.clone();
        self.operations.push(tokio::spawn(async move {
            if let Err(err) = ptz.control(&command).await {
                warn!(command = %command.command, "PTZ control failed: {err}");
                notifier.notify(err.notification());
            }
        }));
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(3)])
            .split(frame.area());
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(TREE_WIDTH),
                Constraint::Min(20),
                Constraint::Length(PTZ_WIDTH),
            ])
            .split(layout[0]);

        let active = self.manager.active_window();
        self.draw_tree(frame, columns[0]);
        self.draw_wall(frame, columns[1], &active.id);
        self.draw_ptz(frame, columns[2], &active);
        self.draw_status(frame, layout[1]);
    }

    fn draw_tree(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let selected = self.manager.selected_channel();
        let rows = visible_rows(&self.tree);
        let mut lines = Vec::with_capacity(rows.len().max(1));

        if self.tree.is_empty() {
            let hint = if self.pending_tree.is_some() {
                "Loading devices..."
            } else {
                "No online devices. Press r to reload."
            };
            lines.push(Line::from(Span::styled(hint, Style::default().fg(COLOR_MUTED))));
        }

        for (idx, row) in rows.iter().enumerate() {
            let marker = focus_marker(idx == self.cursor);
            let line = match *row {
                TreeRow::Device(device_idx) => {
                    let device = &self.tree[device_idx];
                    let glyph = if device.expanded {
                        GLYPH_EXPANDED
                    } else {
                        GLYPH_COLLAPSED
                    };
                    Line::from(vec![
                        Span::styled(format!("{marker}{glyph} "), Style::default().fg(COLOR_ACCENT)),
                        Span::styled(
                            device.name.clone(),
                            Style::default().fg(COLOR_TEXT).add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(
                            format!(" ({})", device.channels.len()),
                            Style::default().fg(COLOR_MUTED),
                        ),
                    ])
                }
                TreeRow::Channel(device_idx, channel_idx) => {
                    let device = &self.tree[device_idx];
                    let channel = &device.channels[channel_idx];
                    let is_selected = selected.as_ref().is_some_and(|sel| {
                        sel.device_id == device.device_id && sel.channel_id == channel.channel_id
                    });
                    let style = if is_selected {
                        Style::default().fg(COLOR_SUCCESS).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(COLOR_TEXT)
                    };
                    Line::from(vec![
                        Span::styled(format!("{marker}  {GLYPH_BULLET} "), Style::default().fg(COLOR_MUTED)),
                        Span::styled(channel.name.clone(), style),
                    ])
                }
            };
            lines.push(line);
        }

        // Keep the cursor row on screen.
        let visible = usize::from(area.height.saturating_sub(2)).max(1);
        let scroll = self.cursor.saturating_sub(visible - 1);
        let panel = Paragraph::new(lines)
            .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0))
            .block(panel_block("◉", "Devices", true));
        frame.render_widget(panel, area);
    }

    fn draw_wall(&self, frame: &mut ratatui::Frame<'_>, area: Rect, active_id: &str) {
        let windows = self.manager.snapshot();
        let (rows, cols) = compute_grid_dimensions(windows.len());
        let cells = build_grid_rects(area, rows, cols);

        for ((window, view), cell) in windows.iter().zip(&self.views).zip(cells) {
            let is_active = window.id == active_id;
            let inner = inner_cell(cell);
            view.surface.set_size(PreviewSize {
                cols: usize::from(inner.width).max(1),
                rows: usize::from(inner.height).max(1),
            });

            let snapshot = view.surface.snapshot();
            let loading = window.is_bound() && view.player.is_loading();
            let (state_text, state_color) = tile_state(window, loading, &snapshot.status);

            let border = if is_active {
                COLOR_BORDER_ACTIVE
            } else {
                COLOR_BORDER
            };
            let title = Line::from(vec![
                Span::styled(
                    format!(" {}{} ", focus_marker(is_active), window.id),
                    Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    window.title(),
                    Style::default().fg(COLOR_TEXT).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("  {state_text} "), Style::default().fg(state_color)),
            ]);

            let body = if window.is_bound() && !loading && !snapshot.frame_ascii.is_empty() {
                Paragraph::new(snapshot.frame_ascii).style(Style::default().fg(COLOR_TEXT))
            } else {
                Paragraph::new(Line::from(Span::styled(
                    state_text,
                    Style::default().fg(COLOR_MUTED),
                )))
            };
            frame.render_widget(
                body.block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(border)),
                ),
                cell,
            );
        }
    }

    fn draw_ptz(&self, frame: &mut ratatui::Frame<'_>, area: Rect, active: &Window) {
        let mut lines = vec![Line::from(vec![
            Span::styled("window ", Style::default().fg(COLOR_MUTED)),
            Span::styled(active.id.clone(), Style::default().fg(COLOR_TEXT).add_modifier(Modifier::BOLD)),
        ])];

        match &active.binding {
            Some(binding) => {
                lines.push(Line::from(Span::styled(
                    binding.label.clone(),
                    Style::default().fg(COLOR_TEXT),
                )));
                lines.push(Line::default());
                lines.push(Line::from(vec![
                    Span::styled("speed ", Style::default().fg(COLOR_MUTED)),
                    Span::styled(
                        format!("{:>3}", self.ptz_speed),
                        Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(format!(" / {MAX_SPEED}"), Style::default().fg(COLOR_MUTED)),
                ]));
                lines.push(Line::default());
                for (key, label) in [
                    ("w/s", "tilt up/down"),
                    ("a/d", "pan left/right"),
                    ("+/-", "zoom in/out"),
                    ("space", "stop"),
                    ("[/]", "speed"),
                ] {
                    lines.push(Line::from(vec![
                        Span::styled(
                            format!("[{key}]"),
                            Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(format!(" {label}"), Style::default().fg(COLOR_MUTED)),
                    ]));
                }
            }
            None => lines.push(Line::from(Span::styled(
                "Play a stream to use PTZ.",
                Style::default().fg(COLOR_MUTED),
            ))),
        }

        let panel = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(panel_block("✥", "PTZ", active.is_bound()));
        frame.render_widget(panel, area);
    }

    fn draw_status(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut spans = Vec::new();
        if let Some(notice) = self.notices.back() {
            spans.push(Span::styled(
                notice.text.clone(),
                Style::default()
                    .fg(level_color(notice.level))
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled("   ", Style::default()));
        }
        spans.extend(action_hint_spans(&[
            ("Enter", "Select"),
            ("1-9/Tab", "Window"),
            ("p", "Play"),
            ("x", "Stop"),
            ("r", "Reload"),
            ("q", "Quit"),
        ]));
        let footer = Paragraph::new(Line::from(spans)).block(panel_block("⌘", "Status", false));
        frame.render_widget(footer, area);
    }
}

fn tile_state(window: &Window, loading: bool, engine_status: &str) -> (String, Color) {
    if !window.is_bound() {
        return ("no video".to_owned(), COLOR_MUTED);
    }
    if loading {
        return ("loading...".to_owned(), COLOR_WARNING);
    }
    let color = if engine_status.starts_with("error") {
        COLOR_ERROR
    } else if engine_status == "playing" {
        COLOR_SUCCESS
    } else {
        COLOR_MUTED
    };
    (engine_status.to_owned(), color)
}

fn ptz_action_for(key: char) -> Option<PtzAction> {
    match key {
        'w' => Some(PtzAction::Up),
        's' => Some(PtzAction::Down),
        'a' => Some(PtzAction::Left),
        'd' => Some(PtzAction::Right),
        '+' | '=' => Some(PtzAction::ZoomIn),
        '-' => Some(PtzAction::ZoomOut),
        ' ' => Some(PtzAction::Stop),
        _ => None,
    }
}

fn cycle_index(current: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if forward {
        (current + 1) % len
    } else {
        (current + len - 1) % len
    }
}

fn step_speed(current: u8, up: bool) -> u8 {
    let next = if up {
        current.saturating_add(SPEED_STEP)
    } else {
        current.saturating_sub(SPEED_STEP)
    };
    next.clamp(MIN_SPEED, MAX_SPEED)
}

/// Near-square grid: columns first, then as many rows as needed.
fn compute_grid_dimensions(count: usize) -> (usize, usize) {
    let count = count.max(1);
    let mut cols = 1_usize;
    while cols * cols < count {
        cols += 1;
    }
    (count.div_ceil(cols), cols)
}

fn build_grid_rects(area: Rect, rows: usize, cols: usize) -> Vec<Rect> {
    let row_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Fill(1); rows.max(1)])
        .split(area);

    row_chunks
        .iter()
        .flat_map(|row| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Fill(1); cols.max(1)])
                .split(*row)
                .to_vec()
        })
        .collect()
}

fn inner_cell(cell: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(cell)
}

fn panel_block<'a>(glyph: &'a str, title: &'a str, focused: bool) -> Block<'a> {
    let border_color = if focused {
        COLOR_BORDER_ACTIVE
    } else {
        COLOR_BORDER
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Line::from(vec![
            Span::styled(
                format!(" {glyph} "),
                Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                title,
                Style::default().fg(COLOR_TEXT).add_modifier(Modifier::BOLD),
            ),
        ]))
}

fn action_hint_spans(hints: &[(&'static str, &'static str)]) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (idx, (key, label)) in hints.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled("  |  ", Style::default().fg(COLOR_BORDER)));
        }
        spans.push(Span::styled(
            format!("[{key}]"),
            Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!(" {label}"), Style::default().fg(COLOR_MUTED)));
    }
    spans
}

fn level_color(level: NotificationLevel) -> Color {
    match level {
        NotificationLevel::Success => COLOR_SUCCESS,
        NotificationLevel::Info => COLOR_TEXT,
        NotificationLevel::Warning => COLOR_WARNING,
        NotificationLevel::Error => COLOR_ERROR,
    }
}

fn focus_marker(focused: bool) -> &'static str {
    if focused { GLYPH_ACTIVE } else { " " }
}
