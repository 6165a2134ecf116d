use std::io::Stdout;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::style::{Color, Style};
use ratatui::Terminal;
use tracing::{debug, info};
use unicode_width::UnicodeWidthStr;

mod events;
mod logging;
mod overlay;
mod surface;

use events::{HostActions, HostEvent};
use overlay::{
    ChannelId, ChatOverlay, ChatSettings, FrameInput, FrameLayout, IncomingMessage, PlayerRef,
    Rgba, SelectionKey,
};
use surface::{Surface, TextMetrics};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const SETTINGS_PATH: &str = "overchat.json";
/// Rows at the bottom of the terminal reserved for the input and status.
const BOTTOM_ROWS: f32 = 2.0;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut debug_logging = false;
    for arg in &args[1..] {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("overchat {}", APP_VERSION);
                return Ok(());
            }
            "--debug" => debug_logging = true,
            unknown => {
                eprintln!("unknown argument: {}", unknown);
                std::process::exit(2);
            }
        }
    }

    let _log_guard = logging::init(debug_logging)?;
    let settings = load_settings(Path::new(SETTINGS_PATH))?;

    let mut terminal = setup_terminal()?;
    let result = run_demo(&mut terminal, settings);
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    crossterm::execute!(std::io::stdout(), EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(std::io::stdout())).context("create terminal")?;
    terminal.hide_cursor().ok();
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    crossterm::execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen).ok();
    disable_raw_mode().context("disable raw mode")?;
    terminal.show_cursor().context("show cursor")?;
    Ok(())
}

fn load_settings(path: &Path) -> Result<ChatSettings> {
    if !path.exists() {
        return Ok(ChatSettings::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read settings {}", path.display()))?;
    let mut settings: ChatSettings = serde_json::from_str(&raw)
        .with_context(|| format!("parse settings {}", path.display()))?;
    settings.sanitize();
    Ok(settings)
}

/// Cell-grid font: every display column is one unit, every row one unit.
struct TermMetrics;

impl TextMetrics for TermMetrics {
    fn text_width(&self, text: &str) -> f32 {
        UnicodeWidthStr::width(text) as f32
    }

    fn line_height(&self) -> f32 {
        1.0
    }
}

/// Draws overlay primitives into a ratatui cell buffer. Alpha is
/// approximated by dimming the color toward black, which reads well on a
/// dark terminal background.
struct TermSurface<'a> {
    buf: &'a mut Buffer,
    /// Saved (offset_x, offset_y, scale_x, scale_y) states.
    stack: Vec<(f32, f32, f32, f32)>,
}

impl<'a> TermSurface<'a> {
    fn new(buf: &'a mut Buffer) -> Self {
        Self {
            buf,
            stack: Vec::new(),
        }
    }

    fn state(&self) -> (f32, f32, f32, f32) {
        self.stack.last().copied().unwrap_or((0.0, 0.0, 1.0, 1.0))
    }

    fn map(&self, x: f32, y: f32) -> (i32, i32) {
        let (ox, oy, sx, sy) = self.state();
        ((ox + x * sx).round() as i32, (oy + y * sy).round() as i32)
    }

    fn dim(color: Rgba) -> Color {
        let a = color.a as u32;
        Color::Rgb(
            (color.r as u32 * a / 255) as u8,
            (color.g as u32 * a / 255) as u8,
            (color.b as u32 * a / 255) as u8,
        )
    }

    fn cell_in_bounds(&self, x: i32, y: i32) -> bool {
        let area = self.buf.area;
        x >= area.x as i32
            && y >= area.y as i32
            && x < (area.x + area.width) as i32
            && y < (area.y + area.height) as i32
    }
}

impl Surface for TermSurface<'_> {
    fn fill_rect(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Rgba) {
        if color.a == 0 {
            return;
        }
        let (cx1, cy1) = self.map(x1, y1);
        let (cx2, cy2) = self.map(x2, y2);
        let bg = Self::dim(color);
        for y in cy1..cy2 {
            for x in cx1..cx2 {
                if self.cell_in_bounds(x, y) {
                    self.buf[(x as u16, y as u16)].set_bg(bg);
                }
            }
        }
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Rgba, _shadow: bool) {
        if color.a == 0 {
            return;
        }
        let (cx, cy) = self.map(x, y);
        if cy < 0 || !self.cell_in_bounds(cx.max(0), cy) {
            return;
        }
        let area = self.buf.area;
        let max_width = (area.x + area.width) as i32 - cx;
        if max_width <= 0 {
            return;
        }
        self.buf.set_stringn(
            cx as u16,
            cy as u16,
            text,
            max_width as usize,
            Style::default().fg(Self::dim(color)),
        );
    }

    fn draw_head(&mut self, _player: &PlayerRef, x: f32, y: f32, _size: f32, tint: Rgba) {
        let (cx, cy) = self.map(x, y);
        if self.cell_in_bounds(cx, cy) {
            self.buf[(cx as u16, cy as u16)]
                .set_symbol("@")
                .set_fg(Self::dim(tint));
        }
    }

    fn push_translate(&mut self, dx: f32, dy: f32) {
        let (ox, oy, sx, sy) = self.state();
        self.stack.push((ox + dx * sx, oy + dy * sy, sx, sy));
    }

    fn push_scale(&mut self, fx: f32, fy: f32) {
        let (ox, oy, sx, sy) = self.state();
        self.stack.push((ox, oy, sx * fx, sy * fy));
    }

    fn pop(&mut self) {
        self.stack.pop();
    }
}

/// Host action sink for the demo: logs everything and keeps a fake
/// clipboard so copy can be observed in the status row.
struct DemoActions {
    clipboard: String,
    typing: bool,
}

impl HostActions for DemoActions {
    fn request_delete(&mut self, message: &overlay::SemanticMessage) {
        info!(
            channel = message.channel.as_str(),
            content = message.content.as_str(),
            "delete requested"
        );
    }

    fn copy_text(&mut self, text: &str) {
        self.clipboard = text.to_string();
        info!(len = text.len(), "copied to clipboard");
    }

    fn typing_started(&mut self) {
        self.typing = true;
        debug!("local typing started");
    }

    fn typing_stopped(&mut self) {
        self.typing = false;
        debug!("local typing stopped");
    }
}

/// Produce simulated chat traffic on a background thread, stamped with
/// the overlay tick the main loop publishes.
fn spawn_feeder(tx: Sender<HostEvent>, now: Arc<AtomicU64>) {
    std::thread::spawn(move || {
        let cast: [(&str, u64, &str); 4] = [
            ("local", 11, "aster"),
            ("local", 12, "brook"),
            ("party", 13, "cedar"),
            ("whisper", 14, "dahlia"),
        ];
        let lines = [
            "anyone up for the north gate run?",
            "gg",
            "gg",
            "selling 40 iron ingots, whisper me",
            "watch the east wall, creepers again",
            "brb",
            "that drop rate cannot be right",
        ];
        let mut step = 0usize;
        loop {
            std::thread::sleep(Duration::from_millis(700));
            let tick = now.load(Ordering::Relaxed);
            let (channel, id, name) = cast[step % cast.len()];
            let content = lines[step % lines.len()];
            if tx
                .send(HostEvent::Message(IncomingMessage {
                    channel: ChannelId::new(channel),
                    sender: Some(PlayerRef::new(id, name)),
                    content: content.to_string(),
                    tick,
                    background: if channel == "whisper" {
                        Some(Rgba::rgb(60, 20, 80))
                    } else {
                        None
                    },
                    mention: content.contains("whisper me"),
                    debug_info: Some(format!("seq={step}")),
                }))
                .is_err()
            {
                return;
            }
            if step % 9 == 3 {
                let _ = tx.send(HostEvent::TypingStarted(PlayerRef::new(12, "brook")));
            }
            if step % 9 == 6 {
                let _ = tx.send(HostEvent::TypingStopped(PlayerRef::new(12, "brook")));
            }
            if step % 13 == 10 {
                let _ = tx.send(HostEvent::PendingCount(2));
            }
            if step % 13 == 12 {
                let _ = tx.send(HostEvent::PendingCount(0));
            }
            step += 1;
        }
    });
}

struct DemoState {
    overlay: ChatOverlay,
    input: String,
    focused: bool,
    debug_hud: bool,
    mouse: Option<(f32, f32)>,
    should_quit: bool,
}

fn run_demo(terminal: &mut Terminal<CrosstermBackend<Stdout>>, settings: ChatSettings) -> Result<()> {
    let metrics = TermMetrics;
    let now = Arc::new(AtomicU64::new(0));
    let (tx, rx): (Sender<HostEvent>, Receiver<HostEvent>) = unbounded();
    spawn_feeder(tx, Arc::clone(&now));

    let mut actions = DemoActions {
        clipboard: String::new(),
        typing: false,
    };
    let mut state = DemoState {
        overlay: ChatOverlay::new(&metrics, settings),
        input: String::new(),
        focused: true,
        debug_hud: false,
        mouse: None,
        should_quit: false,
    };
    info!(version = APP_VERSION, "overlay demo started");

    while !state.should_quit {
        while let Ok(ev) = rx.try_recv() {
            state.overlay.handle_event(&metrics, ev);
        }
        state.overlay.tick(&mut actions);
        now.store(state.overlay.now_tick(), Ordering::Relaxed);

        terminal
            .draw(|f| {
                let area = f.area();
                let frame = frame_input(&state, area.width, area.height);
                let buf = f.buffer_mut();
                {
                    let mut surface = TermSurface::new(buf);
                    state.overlay.render(&mut surface, &metrics, &frame);
                }
                draw_bottom_rows(buf, &state, &actions);
            })
            .context("draw frame")?;

        if event::poll(Duration::from_millis(50)).context("poll input")? {
            handle_terminal_event(
                event::read().context("read input")?,
                terminal,
                &metrics,
                &mut state,
                &mut actions,
            );
        }
    }
    Ok(())
}

fn frame_input(state: &DemoState, width: u16, height: u16) -> FrameInput {
    FrameInput {
        width: width as f32,
        height: height as f32,
        bottom_margin: BOTTOM_ROWS,
        now_tick: state.overlay.now_tick(),
        focused: state.focused,
        debug: state.debug_hud,
        mouse: state.mouse,
    }
}

fn draw_bottom_rows(buf: &mut Buffer, state: &DemoState, actions: &DemoActions) {
    let area = buf.area;
    if area.height < 2 {
        return;
    }
    let input_y = area.y + area.height - 2;
    let status_y = area.y + area.height - 1;
    let prompt = format!("> {}", state.input);
    buf.set_stringn(
        area.x,
        input_y,
        &prompt,
        area.width as usize,
        Style::default().fg(Color::Rgb(220, 220, 220)),
    );
    let typing = if actions.typing { " [typing]" } else { "" };
    let clip = if actions.clipboard.is_empty() {
        String::new()
    } else {
        format!(" | clip: {}", truncate(&actions.clipboard, 24))
    };
    let status = format!(
        "Esc focus | click select | Del delete | Ctrl+C copy | PgUp/PgDn scroll | F3 debug | Ctrl+Q quit{typing}{clip}"
    );
    buf.set_stringn(
        area.x,
        status_y,
        &status,
        area.width as usize,
        Style::default().fg(Color::Rgb(130, 130, 130)),
    );
}

fn truncate(s: &str, n: usize) -> String {
    match s.char_indices().nth(n) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

fn handle_terminal_event(
    ev: Event,
    terminal: &Terminal<CrosstermBackend<Stdout>>,
    metrics: &TermMetrics,
    state: &mut DemoState,
    actions: &mut DemoActions,
) {
    let size = terminal
        .size()
        .map(|s| (s.width, s.height))
        .unwrap_or((80, 24));
    let frame = frame_input(state, size.0, size.1);
    match ev {
        Event::Key(key) if key.kind != KeyEventKind::Release => match key.code {
            KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                state.should_quit = true;
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                state
                    .overlay
                    .handle_selection_key(SelectionKey::Copy, actions);
            }
            KeyCode::Esc => {
                state.focused = !state.focused;
                if !state.focused {
                    state.overlay.on_close(actions);
                }
            }
            KeyCode::Delete => {
                state
                    .overlay
                    .handle_selection_key(SelectionKey::Delete, actions);
            }
            KeyCode::Enter => {
                if state.input.is_empty() {
                    state
                        .overlay
                        .handle_selection_key(SelectionKey::Confirm, actions);
                } else {
                    send_local_message(metrics, state, actions);
                }
            }
            KeyCode::Backspace => {
                state.input.pop();
                if state.input.is_empty() {
                    state.overlay.on_input_cleared(actions);
                }
            }
            KeyCode::PageUp => {
                let layout = layout_for(state, metrics, &frame);
                state.overlay.scroll(3, layout.viewport_lines);
            }
            KeyCode::PageDown => {
                let layout = layout_for(state, metrics, &frame);
                state.overlay.scroll(-3, layout.viewport_lines);
            }
            KeyCode::F(3) => state.debug_hud = !state.debug_hud,
            KeyCode::F(5) => state.overlay.shake_boost(1.0),
            KeyCode::Char(c) if state.focused => {
                state.input.push(c);
                state.overlay.on_text_input(state.input.len(), actions);
            }
            _ => {}
        },
        Event::Mouse(mouse) => {
            let pos = (mouse.column as f32, mouse.row as f32);
            match mouse.kind {
                MouseEventKind::Moved | MouseEventKind::Drag(_) => state.mouse = Some(pos),
                MouseEventKind::Down(MouseButton::Left) => {
                    state.mouse = Some(pos);
                    state
                        .overlay
                        .handle_click(metrics, &frame, pos.0, pos.1);
                }
                MouseEventKind::ScrollUp => {
                    let layout = layout_for(state, metrics, &frame);
                    state.overlay.scroll(1, layout.viewport_lines);
                }
                MouseEventKind::ScrollDown => {
                    let layout = layout_for(state, metrics, &frame);
                    state.overlay.scroll(-1, layout.viewport_lines);
                }
                _ => {}
            }
        }
        _ => {}
    }
}

fn layout_for(state: &DemoState, metrics: &TermMetrics, frame: &FrameInput) -> FrameLayout {
    state.overlay.layout(metrics, frame)
}

fn send_local_message(metrics: &TermMetrics, state: &mut DemoState, actions: &mut DemoActions) {
    let content = std::mem::take(&mut state.input);
    let tick = state.overlay.now_tick();
    state.overlay.add_message(
        metrics,
        IncomingMessage {
            channel: ChannelId::new("local"),
            sender: Some(PlayerRef::new(1, "you")),
            content,
            tick,
            background: None,
            mention: false,
            debug_info: None,
        },
    );
    state.overlay.on_input_cleared(actions);
}
