use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, trace};

use crate::events::{HostActions, HostEvent};
use crate::surface::{Surface, TextMetrics};

mod channel_bar;
mod render;
mod scrollback;
mod selection;
mod shake;
mod store;
#[cfg(test)]
mod tests;
mod types;

pub use channel_bar::{ChannelBar, ChannelTab, TAB_ICON_RESERVE, TAB_PADDING, TAB_SPACING};
pub use render::{line_opacity, repeat_badge_label, FrameInput, FrameLayout, LINE_INDENT};
pub use scrollback::ScrollbackController;
pub use selection::{SelectionKey, SelectionTracker};
pub use shake::ShakeEffect;
pub use store::LineMetadataStore;
pub use types::{
    ChannelId, ChatSettings, DisplayLine, IncomingMessage, LineId, MessageHandle, PlayerRef, Rgba,
    SemanticMessage,
};

const TYPE_TIMER_INCREMENT: u32 = 20;
const TYPE_TIMER_MAX: u32 = 120;
const TYPE_START_MIN_CHARS: usize = 4;

/// The chat overlay: message records, scrollback, selection, channel
/// tabs, and shake, glued to the host through `Surface`, `HostEvent`,
/// and `HostActions`.
pub struct ChatOverlay {
    pub settings: ChatSettings,
    pub(crate) store: LineMetadataStore,
    pub(crate) scrollback: ScrollbackController,
    pub(crate) selection: SelectionTracker,
    pub(crate) channel_bar: ChannelBar,
    pub(crate) shake: ShakeEffect,
    /// Players currently typing, as reported by the host.
    pub(crate) typing: Vec<PlayerRef>,
    pub(crate) typing_tracker: TypingTracker,
    pub(crate) hidden_channels: HashSet<ChannelId>,
    /// Lines of hidden channels, kept for restore in original order.
    pub(crate) hidden_lines: Vec<DisplayLine>,
    pub(crate) pending_count: usize,
    /// Host says its chat input row is not on screen.
    pub input_hidden: bool,
    /// Host says the whole overlay is toggled off.
    pub overlay_hidden: bool,
    tick: u64,
    next_line_id: u64,
    next_seq: u64,
}

impl ChatOverlay {
    pub fn new(metrics: &dyn TextMetrics, mut settings: ChatSettings) -> Self {
        settings.sanitize();
        let store = LineMetadataStore::new(&settings);
        let scrollback = ScrollbackController::new(settings.chat_size);
        let mut channel_bar = ChannelBar::new(&settings.channels);
        channel_bar.measure(metrics);
        Self {
            settings,
            store,
            scrollback,
            selection: SelectionTracker::new(),
            channel_bar,
            shake: ShakeEffect::new(),
            typing: Vec::new(),
            typing_tracker: TypingTracker::new(),
            hidden_channels: HashSet::new(),
            hidden_lines: Vec::new(),
            pending_count: 0,
            input_hidden: false,
            overlay_hidden: false,
            tick: 0,
            next_line_id: 0,
            next_seq: 0,
        }
    }

    pub fn now_tick(&self) -> u64 {
        self.tick
    }

    /// Full width the overlay occupies, text columns plus the icon gutter.
    pub fn display_width(&self) -> f32 {
        self.settings.chat_width + LINE_INDENT
    }

    pub fn store(&self) -> &LineMetadataStore {
        &self.store
    }

    pub fn scrollback(&self) -> &ScrollbackController {
        &self.scrollback
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    pub fn channel_bar(&self) -> &ChannelBar {
        &self.channel_bar
    }

    pub fn shake_boost(&mut self, delta: f32) {
        self.shake.boost(delta);
    }

    /// Advance one tick: shake decay, copy-flash countdown, typing timer.
    pub fn tick(&mut self, actions: &mut dyn HostActions) {
        self.tick += 1;
        self.shake.tick(1.0, self.settings.shake_force);
        self.selection.tick();
        self.typing_tracker.tick(actions);
    }

    /// Swap in reloaded settings, re-clamping capacities and rebuilding
    /// tab geometry. Records past the new capacity are evicted.
    pub fn apply_settings(&mut self, metrics: &dyn TextMetrics, mut settings: ChatSettings) {
        settings.sanitize();
        for evicted in self.scrollback.set_capacity(settings.chat_size) {
            self.store.unregister(evicted.id);
        }
        self.settings = settings;
        for (handle, lines) in self.store.configure(&self.settings) {
            self.remove_evicted(handle, &lines);
        }
        self.channel_bar.rebuild(&self.settings.channels);
        self.channel_bar.measure(metrics);
        self.hidden_channels
            .retain(|channel| self.settings.channels.contains(channel));
        self.prune_selection();
        info!(chat_size = self.settings.chat_size, "applied chat settings");
    }

    /// Drain one host event into overlay state.
    pub fn handle_event(&mut self, metrics: &dyn TextMetrics, event: HostEvent) {
        match event {
            HostEvent::Message(msg) => self.add_message(metrics, msg),
            HostEvent::TypingStarted(player) => {
                if !self.typing.contains(&player) {
                    self.typing.push(player);
                }
            }
            HostEvent::TypingStopped(player) => {
                self.typing.retain(|p| *p != player);
            }
            HostEvent::PendingCount(count) => self.pending_count = count,
            HostEvent::SettingsReloaded(settings) => self.apply_settings(metrics, settings),
        }
    }

    /// Accept a host-delivered message: dedupe redeliveries, wrap, and
    /// register the lines. A repeat of a recent identical message only
    /// bumps the existing record's counter.
    pub fn add_message(&mut self, metrics: &dyn TextMetrics, msg: IncomingMessage) {
        if self.store.is_recorded(msg.tick, &msg.content) {
            trace!(tick = msg.tick, "dropping redelivered message");
            return;
        }
        let channel = msg.channel.clone();
        let mention = msg.mention;
        let handle = self.store.insert(SemanticMessage {
            channel: msg.channel,
            sender: msg.sender,
            content: msg.content.clone(),
            created_tick: msg.tick,
            repeat_count: 1,
            background: msg.background,
            mention: msg.mention,
            debug_info: msg.debug_info,
        });

        let wrap_width = self.settings.chat_width - render::badge_reserve(metrics, &self.settings);
        let wrapped = render::wrap_text(metrics, &msg.content, wrap_width);
        let count = wrapped.len();
        let hidden = self.hidden_channels.contains(&channel);
        for (i, text) in wrapped.into_iter().enumerate() {
            let line = DisplayLine {
                id: self.alloc_line_id(),
                seq: self.alloc_seq(),
                text,
                first: i == 0,
                last: i + 1 == count,
                added_tick: msg.tick,
            };
            if self.store.register(line.id, handle, line.first, line.last, 0) {
                // Collapsed into an earlier record; nothing enters the
                // scrollback.
                return;
            }
            if hidden {
                self.hidden_lines.push(line);
            } else if let Some(evicted) = self.scrollback.insert(0, line) {
                self.store.unregister(evicted.id);
            }
        }

        if mention {
            self.channel_bar.mark_mentioned(&channel);
        } else if hidden || self.scrollback.scroll_offset() > 0 {
            self.channel_bar.mark_unread(&channel);
        }
        debug!(
            channel = channel.as_str(),
            lines = count,
            hidden,
            "message added"
        );
        for (handle, lines) in self.store.evict_overflow() {
            self.remove_evicted(handle, &lines);
        }
        self.prune_selection();
    }

    /// Scroll by `delta` lines (positive = older), given the viewport the
    /// renderer is using.
    pub fn scroll(&mut self, delta: i64, viewport_lines: usize) {
        self.scrollback.scroll_by(delta, viewport_lines);
    }

    pub fn reset_scroll(&mut self) {
        self.scrollback.reset_scroll();
    }

    /// Mouse click at raw surface coordinates: channel tabs first, then
    /// message selection.
    pub fn handle_click(&mut self, metrics: &dyn TextMetrics, frame: &FrameInput, x: f32, y: f32) {
        let layout = self.layout(metrics, frame);
        if frame.focused {
            let bar_height = self.channel_bar.height(metrics);
            let bar_y = layout.bottom_y
                - layout.viewport_lines as f32 * layout.line_height
                - bar_height
                - 1.0;
            let (lx, ly) = layout.to_local(x, y);
            if ly >= bar_y && ly < bar_y + bar_height {
                if let Some(channel) = self.channel_bar.on_click(lx) {
                    self.toggle_channel(&channel);
                }
                return;
            }
        }
        if !frame.focused || self.input_hidden || self.overlay_hidden {
            return;
        }
        if let Some(line) = self.hit_test(&layout, x, y) {
            if let Some(handle) = self.store.handle_of(line) {
                self.selection.toggle(handle);
            }
        }
    }

    pub fn toggle_channel(&mut self, channel: &ChannelId) {
        if self.hidden_channels.contains(channel) {
            self.show_channel(channel);
        } else {
            self.hide_channel(channel);
        }
    }

    /// Remove a channel's lines from view. The records stay stored so the
    /// channel can be restored intact.
    pub fn hide_channel(&mut self, channel: &ChannelId) {
        if !self.hidden_channels.insert(channel.clone()) {
            return;
        }
        let ids: HashSet<LineId> = (0..self.scrollback.total())
            .filter_map(|i| self.scrollback.line(i))
            .filter(|line| {
                self.store
                    .lookup(line.id)
                    .is_some_and(|msg| msg.channel == *channel)
            })
            .map(|line| line.id)
            .collect();
        let removed = self.scrollback.remove_ids(&ids);
        self.hidden_lines.extend(removed);
        info!(channel = channel.as_str(), "channel hidden");
    }

    /// Put a hidden channel's lines back, in original insertion order.
    pub fn show_channel(&mut self, channel: &ChannelId) {
        if !self.hidden_channels.remove(channel) {
            return;
        }
        let mut restored = Vec::new();
        let mut kept = Vec::new();
        for line in self.hidden_lines.drain(..) {
            let matches = self
                .store
                .lookup(line.id)
                .is_some_and(|msg| msg.channel == *channel);
            if matches {
                restored.push(line);
            } else {
                kept.push(line);
            }
        }
        self.hidden_lines = kept;
        for evicted in self.scrollback.restore(restored) {
            self.store.unregister(evicted.id);
        }
        self.channel_bar.mark_read(channel);
        info!(channel = channel.as_str(), "channel restored");
    }

    /// Chat screen closed: drop selection and scroll, end own typing.
    pub fn on_close(&mut self, actions: &mut dyn HostActions) {
        self.selection.clear();
        self.scrollback.reset_scroll();
        self.typing_tracker.stop(actions);
    }

    /// Own input changed; `input_len` is the current draft length.
    pub fn on_text_input(&mut self, input_len: usize, actions: &mut dyn HostActions) {
        self.typing_tracker.on_input(input_len, actions);
    }

    /// Own draft was cleared or sent.
    pub fn on_input_cleared(&mut self, actions: &mut dyn HostActions) {
        self.typing_tracker.stop(actions);
    }

    fn remove_evicted(&mut self, handle: MessageHandle, lines: &[LineId]) {
        let ids: HashSet<LineId> = lines.iter().copied().collect();
        self.scrollback.remove_ids(&ids);
        self.hidden_lines.retain(|line| !ids.contains(&line.id));
        self.selection.drop_if(handle);
    }

    fn prune_selection(&mut self) {
        if let Some(handle) = self.selection.selected() {
            if !self.store.is_managed(handle) {
                self.selection.clear();
            }
        }
    }

    fn alloc_line_id(&mut self) -> LineId {
        let id = LineId(self.next_line_id);
        self.next_line_id += 1;
        id
    }

    fn alloc_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// Tracks whether the local player counts as "typing", driven by input
/// activity. Sustained input starts the state; the timer running out,
/// clearing, or sending ends it.
pub(crate) struct TypingTracker {
    char_timer: u32,
    typing: bool,
}

impl TypingTracker {
    pub(crate) fn new() -> Self {
        Self {
            char_timer: 0,
            typing: false,
        }
    }

    pub(crate) fn is_typing(&self) -> bool {
        self.typing
    }

    pub(crate) fn on_input(&mut self, input_len: usize, actions: &mut dyn HostActions) {
        self.char_timer = (self.char_timer + TYPE_TIMER_INCREMENT).min(TYPE_TIMER_MAX);
        if !self.typing && self.char_timer > TYPE_TIMER_INCREMENT && input_len > TYPE_START_MIN_CHARS
        {
            self.typing = true;
            actions.typing_started();
        }
    }

    pub(crate) fn tick(&mut self, actions: &mut dyn HostActions) {
        if self.char_timer > 0 {
            self.char_timer -= 1;
            if self.char_timer == 0 {
                self.stop(actions);
            }
        }
    }

    pub(crate) fn stop(&mut self, actions: &mut dyn HostActions) {
        self.char_timer = 0;
        if self.typing {
            self.typing = false;
            actions.typing_stopped();
        }
    }
}
