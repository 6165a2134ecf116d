use serde::{Deserialize, Serialize};

/// Straight 8-bit RGBA color, the only color form the overlay hands to hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Scale the alpha channel by a 0..=1 factor.
    pub fn scale_alpha(self, factor: f32) -> Self {
        let a = (self.a as f32 * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// Linear blend toward `other` by `t` in 0..=1.
    pub fn blend_toward(self, other: Rgba, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

/// Named channel a message belongs to; tabs in the channel bar map 1:1.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Host-side identity of a message author, enough to draw a head icon.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlayerRef {
    pub id: u64,
    pub name: String,
}

impl PlayerRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Generational handle to a stored message. Copies compare by identity:
/// a recycled slot gets a bumped generation, so stale handles never
/// resolve to the new occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub(crate) slot: u32,
    pub(crate) gen: u32,
}

/// Opaque per-display-line identity handed out by the overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LineId(pub(crate) u64);

/// One wrapped visual row of a message as kept by the scrollback.
#[derive(Clone, Debug)]
pub struct DisplayLine {
    pub id: LineId,
    /// Global insertion sequence, used to restore hidden lines in order.
    pub(crate) seq: u64,
    pub text: String,
    pub first: bool,
    pub last: bool,
    pub added_tick: u64,
}

/// The semantic record behind one or more display lines.
#[derive(Clone, Debug)]
pub struct SemanticMessage {
    pub channel: ChannelId,
    pub sender: Option<PlayerRef>,
    pub content: String,
    pub created_tick: u64,
    pub repeat_count: u32,
    pub background: Option<Rgba>,
    pub mention: bool,
    pub debug_info: Option<String>,
}

/// A message as delivered by the host, before wrapping and registration.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub channel: ChannelId,
    pub sender: Option<PlayerRef>,
    pub content: String,
    pub tick: u64,
    pub background: Option<Rgba>,
    pub mention: bool,
    pub debug_info: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_chat_scale")]
    pub chat_scale: f32,
    #[serde(default = "default_chat_width")]
    pub chat_width: f32,
    #[serde(default = "default_chat_height")]
    pub chat_height: f32,
    #[serde(default = "default_chat_height_focused")]
    pub chat_height_focused: f32,
    #[serde(default = "default_chat_opacity")]
    pub chat_opacity: f32,
    #[serde(default = "default_background_opacity")]
    pub background_opacity: f32,
    #[serde(default)]
    pub line_spacing: f32,
    #[serde(default = "default_chat_size")]
    pub chat_size: usize,
    #[serde(default = "default_collapse_window_ticks")]
    pub collapse_window_ticks: u64,
    #[serde(default = "default_collapse_lookback")]
    pub collapse_lookback: usize,
    #[serde(default = "default_true")]
    pub show_heads: bool,
    #[serde(default = "default_true")]
    pub show_repeat_badges: bool,
    #[serde(default = "default_shake_force")]
    pub shake_force: f32,
    #[serde(default = "default_typing_suffix")]
    pub typing_suffix: String,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelId>,
}

fn default_chat_scale() -> f32 {
    1.0
}

fn default_chat_width() -> f32 {
    320.0
}

fn default_chat_height() -> f32 {
    90.0
}

fn default_chat_height_focused() -> f32 {
    180.0
}

fn default_chat_opacity() -> f32 {
    1.0
}

fn default_background_opacity() -> f32 {
    0.5
}

fn default_chat_size() -> usize {
    500
}

fn default_collapse_window_ticks() -> u64 {
    60
}

fn default_collapse_lookback() -> usize {
    9
}

fn default_true() -> bool {
    true
}

fn default_shake_force() -> f32 {
    1.0
}

fn default_typing_suffix() -> String {
    "typing...".to_string()
}

fn default_channels() -> Vec<ChannelId> {
    ["all", "local", "party", "whisper", "system"]
        .into_iter()
        .map(ChannelId::new)
        .collect()
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            chat_scale: default_chat_scale(),
            chat_width: default_chat_width(),
            chat_height: default_chat_height(),
            chat_height_focused: default_chat_height_focused(),
            chat_opacity: default_chat_opacity(),
            background_opacity: default_background_opacity(),
            line_spacing: 0.0,
            chat_size: default_chat_size(),
            collapse_window_ticks: default_collapse_window_ticks(),
            collapse_lookback: default_collapse_lookback(),
            show_heads: true,
            show_repeat_badges: true,
            shake_force: default_shake_force(),
            typing_suffix: default_typing_suffix(),
            channels: default_channels(),
        }
    }
}

impl ChatSettings {
    /// Clamp every field into its valid range. Hosts hand us arbitrary
    /// JSON, so apply this before using a loaded or reloaded value.
    pub fn sanitize(&mut self) {
        self.chat_scale = clamp_positive(self.chat_scale, 1.0);
        self.chat_width = clamp_positive(self.chat_width, default_chat_width());
        self.chat_height = clamp_positive(self.chat_height, default_chat_height());
        self.chat_height_focused =
            clamp_positive(self.chat_height_focused, default_chat_height_focused());
        self.chat_opacity = self.chat_opacity.clamp(0.0, 1.0);
        self.background_opacity = self.background_opacity.clamp(0.0, 1.0);
        self.line_spacing = self.line_spacing.clamp(0.0, 4.0);
        self.chat_size = self.chat_size.max(1);
        self.collapse_lookback = self.collapse_lookback.max(1);
        self.shake_force = self.shake_force.clamp(0.0, 16.0);
        if self.channels.is_empty() {
            self.channels = default_channels();
        }
    }
}

fn clamp_positive(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}
