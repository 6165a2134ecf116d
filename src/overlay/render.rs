use super::*;

/// Fixed left gutter reserved for head icons; text starts after it.
pub const LINE_INDENT: f32 = 8.0;
/// Horizontal inset of the whole overlay from the surface edge.
pub const CHAT_MARGIN_X: f32 = 4.0;
/// Ticks for a line to fade out completely while unfocused.
pub const FADE_TICKS: f32 = 200.0;
const HEAD_SIZE: f32 = 8.0;
const BADGE_CAP_LABEL: &str = "x999+";

const BADGE_GOLD: Rgba = Rgba::rgb(255, 170, 0);
const DEBUG_GRAY: Rgba = Rgba::rgb(170, 170, 170);
const HEAD_SHADOW: Rgba = Rgba::rgb(80, 80, 80);
const SCROLLBAR_BODY: Rgba = Rgba::rgb(51, 51, 170);
const SCROLLBAR_UNREAD: Rgba = Rgba::rgb(204, 51, 51);
const SCROLLBAR_EDGE: Rgba = Rgba::rgb(204, 204, 204);

/// Per-frame host state the overlay needs to lay itself out.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    pub width: f32,
    pub height: f32,
    /// Space below the chat body kept free for the host's input row.
    pub bottom_margin: f32,
    pub now_tick: u64,
    pub focused: bool,
    pub debug: bool,
    /// Mouse position in raw surface coordinates, if over the surface.
    pub mouse: Option<(f32, f32)>,
}

/// The resolved geometry of one frame. Hit-testing uses the exact same
/// numbers as drawing, so a click always lands on the row it hovers.
#[derive(Clone, Copy, Debug)]
pub struct FrameLayout {
    pub scale: f32,
    pub chat_width: f32,
    pub line_height: f32,
    /// Bottom edge of the chat body in scaled units.
    pub bottom_y: f32,
    pub viewport_lines: usize,
    /// Surface-space origin of the overlay, margin plus shake offset.
    pub origin: (f32, f32),
}

impl FrameLayout {
    pub fn compute(settings: &ChatSettings, metrics: &dyn TextMetrics, frame: &FrameInput) -> Self {
        let scale = settings.chat_scale.max(0.01);
        let line_height = (metrics.line_height() * (1.0 + settings.line_spacing)).max(0.01);
        let bottom_y = ((frame.height - frame.bottom_margin).max(0.0) / scale).floor();
        let chat_height = if frame.focused {
            settings.chat_height_focused
        } else {
            settings.chat_height
        };
        let viewport_lines = ((chat_height / line_height).floor() as usize).max(1);
        Self {
            scale,
            chat_width: settings.chat_width,
            line_height,
            bottom_y,
            viewport_lines,
            origin: (CHAT_MARGIN_X, 0.0),
        }
    }

    /// Raw surface coordinates -> overlay-local (scaled, origin removed).
    pub fn to_local(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.origin.0) / self.scale,
            (y - self.origin.1) / self.scale,
        )
    }

    /// Viewport row under a local y, counting 0 at the bottom row.
    pub fn row_at(&self, local_y: f32) -> Option<usize> {
        if local_y > self.bottom_y {
            return None;
        }
        let row = ((self.bottom_y - local_y) / self.line_height).floor();
        if row < 0.0 {
            return None;
        }
        let row = row as usize;
        (row < self.viewport_lines).then_some(row)
    }

    /// True when a local x falls inside the chat body columns.
    pub fn contains_x(&self, local_x: f32) -> bool {
        (0.0..LINE_INDENT + self.chat_width).contains(&local_x)
    }
}

/// Fade factor for a line of the given age: full while focused, otherwise
/// a quadratic ease-out reaching zero at `FADE_TICKS`.
pub fn line_opacity(age_ticks: f32, focused: bool) -> f32 {
    if focused {
        return 1.0;
    }
    let t = (1.0 - age_ticks / FADE_TICKS).clamp(0.0, 1.0);
    t * t
}

/// Label of the repeat badge, or None when the message never repeated.
pub fn repeat_badge_label(count: u32) -> Option<String> {
    if count <= 1 {
        None
    } else if count > 999 {
        Some(BADGE_CAP_LABEL.to_string())
    } else {
        Some(format!("x{count}"))
    }
}

/// Columns to keep free at the right edge so the widest possible badge
/// never overlaps wrapped text.
pub(crate) fn badge_reserve(metrics: &dyn TextMetrics, settings: &ChatSettings) -> f32 {
    if settings.show_repeat_badges {
        metrics.text_width(BADGE_CAP_LABEL)
    } else {
        0.0
    }
}

/// Greedy word wrap against measured widths. Words wider than the line
/// are hard-split by character.
pub(crate) fn wrap_text(metrics: &dyn TextMetrics, text: &str, max_width: f32) -> Vec<String> {
    let max_width = max_width.max(1.0);
    let mut out = Vec::new();
    for para in text.split('\n') {
        let mut line = String::new();
        for word in para.split_whitespace() {
            let joined = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if metrics.text_width(&joined) <= max_width {
                line = joined;
                continue;
            }
            if !line.is_empty() {
                out.push(std::mem::take(&mut line));
            }
            if metrics.text_width(word) <= max_width {
                line = word.to_string();
            } else {
                line = hard_split(metrics, word, max_width, &mut out);
            }
        }
        out.push(line);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn hard_split(
    metrics: &dyn TextMetrics,
    word: &str,
    max_width: f32,
    out: &mut Vec<String>,
) -> String {
    let mut piece = String::new();
    for ch in word.chars() {
        let mut probe = piece.clone();
        probe.push(ch);
        if !piece.is_empty() && metrics.text_width(&probe) > max_width {
            out.push(std::mem::take(&mut piece));
            piece.push(ch);
        } else {
            piece = probe;
        }
    }
    piece
}

impl ChatOverlay {
    /// Resolve this frame's geometry. The current shake offset is folded
    /// into the origin, so hit-testing and drawing share one transform.
    pub fn layout(&self, metrics: &dyn TextMetrics, frame: &FrameInput) -> FrameLayout {
        let mut layout = FrameLayout::compute(&self.settings, metrics, frame);
        let (shake_x, shake_y) = self.shake.offset();
        layout.origin = (CHAT_MARGIN_X + shake_x, shake_y);
        layout
    }

    /// Draw one frame. All output goes through `surface`; nothing here
    /// mutates overlay state.
    pub fn render(&self, surface: &mut dyn Surface, metrics: &dyn TextMetrics, frame: &FrameInput) {
        let layout = self.layout(metrics, frame);
        surface.push_translate(layout.origin.0, layout.origin.1);
        surface.push_scale(layout.scale, layout.scale);

        let hovered = frame
            .mouse
            .and_then(|(mx, my)| self.hit_test(&layout, mx, my))
            .and_then(|line| self.store.handle_of(line));

        let text_alpha = self.settings.chat_opacity * 0.9 + 0.1;
        let right_edge = LINE_INDENT + layout.chat_width;
        let mut rendered = 0usize;
        for (k, line) in self.scrollback.visible_window(layout.viewport_lines) {
            let Some(msg) = self.store.lookup(line.id) else {
                continue;
            };
            let age = frame.now_tick.saturating_sub(line.added_tick);
            let opacity = line_opacity(age as f32, frame.focused);
            if opacity <= 0.0 {
                continue;
            }
            rendered += 1;
            let y2 = layout.bottom_y - k as f32 * layout.line_height;
            let y1 = y2 - layout.line_height;

            let bg = msg.background.unwrap_or(Rgba::BLACK);
            surface.fill_rect(
                0.0,
                y1,
                right_edge,
                y2,
                bg.with_alpha(255)
                    .scale_alpha(opacity * self.settings.background_opacity),
            );

            if let Some(handle) = self.store.handle_of(line.id) {
                let mut highlight = 0u32;
                if hovered == Some(handle) {
                    highlight += 30;
                }
                if self.selection.selected() == Some(handle) {
                    highlight += 30;
                    if self.selection.copy_flash_active() {
                        highlight += 30;
                    }
                }
                if highlight > 0 {
                    surface.fill_rect(
                        0.0,
                        y1,
                        right_edge,
                        y2,
                        Rgba::WHITE.with_alpha(highlight.min(90) as u8),
                    );
                }
            }

            surface.draw_text(
                LINE_INDENT,
                y1,
                &line.text,
                Rgba::WHITE.scale_alpha(opacity * text_alpha),
                true,
            );

            if line.first {
                if self.settings.show_heads {
                    if let Some(sender) = &msg.sender {
                        surface.draw_head(
                            sender,
                            1.0,
                            y1 + 1.0,
                            HEAD_SIZE,
                            HEAD_SHADOW.scale_alpha(opacity),
                        );
                        surface.draw_head(sender, 0.0, y1, HEAD_SIZE, Rgba::WHITE.scale_alpha(opacity));
                    }
                }
                if self.settings.show_repeat_badges {
                    if let Some(label) = repeat_badge_label(msg.repeat_count) {
                        let w = metrics.text_width(&label);
                        surface.draw_text(
                            right_edge - w,
                            y1,
                            &label,
                            BADGE_GOLD.scale_alpha(opacity * text_alpha),
                            true,
                        );
                    }
                }
            }

            if line.last && frame.debug {
                if let Some(info) = &msg.debug_info {
                    surface.draw_text(
                        LINE_INDENT + metrics.text_width(&line.text) + 4.0,
                        y1,
                        info,
                        DEBUG_GRAY.scale_alpha(opacity * text_alpha),
                        false,
                    );
                }
            }
        }

        let total = self.scrollback.total();
        if frame.focused && total > 0 && total != rendered {
            self.render_scrollbar(surface, &layout, rendered, total);
        }

        let mut band_y = layout.bottom_y;
        if !self.typing.is_empty() {
            self.render_typing_band(surface, &layout, band_y);
            band_y += layout.line_height;
        }
        if self.pending_count > 0 {
            self.render_queue_banner(surface, &layout, band_y);
        }

        if frame.focused {
            let bar_y = layout.bottom_y
                - layout.viewport_lines as f32 * layout.line_height
                - self.channel_bar.height(metrics)
                - 1.0;
            let hover_x = frame.mouse.and_then(|(mx, my)| {
                let (lx, ly) = layout.to_local(mx, my);
                let height = self.channel_bar.height(metrics);
                (ly >= bar_y && ly < bar_y + height).then_some(lx)
            });
            self.channel_bar.render(
                surface,
                metrics,
                bar_y,
                &self.hidden_channels,
                hover_x,
                self.settings.chat_opacity,
            );
        }

        surface.pop();
        surface.pop();
    }

    fn render_scrollbar(
        &self,
        surface: &mut dyn Surface,
        layout: &FrameLayout,
        rendered: usize,
        total: usize,
    ) {
        let x = LINE_INDENT + layout.chat_width;
        let alpha = if self.scrollback.scroll_offset() > 0 {
            170
        } else {
            96
        };
        let rows = (rendered * rendered) as f32 / total as f32;
        let thumb_height = (rows * layout.line_height)
            .max(layout.line_height)
            .min(layout.viewport_lines as f32 * layout.line_height);
        let offset_rows = self.scrollback.scroll_offset() as f32 * rendered as f32 / total as f32;
        let thumb_bottom = layout.bottom_y - offset_rows * layout.line_height;
        let thumb_top = thumb_bottom - thumb_height;
        let body = if self.scrollback.has_unread() {
            SCROLLBAR_UNREAD
        } else {
            SCROLLBAR_BODY
        };
        surface.fill_rect(x, thumb_top, x + 2.0, thumb_bottom, body.with_alpha(alpha));
        surface.fill_rect(
            x + 2.0,
            thumb_top,
            x + 3.0,
            thumb_bottom,
            SCROLLBAR_EDGE.with_alpha(alpha),
        );
    }

    fn render_typing_band(&self, surface: &mut dyn Surface, layout: &FrameLayout, y: f32) {
        surface.fill_rect(
            0.0,
            y,
            LINE_INDENT + layout.chat_width,
            y + layout.line_height,
            Rgba::BLACK.scale_alpha(self.settings.background_opacity),
        );
        let mut x = 1.0;
        if self.settings.show_heads {
            for player in &self.typing {
                surface.draw_head(player, x, y + 1.0, HEAD_SIZE, Rgba::WHITE);
                x += HEAD_SIZE + 1.0;
            }
        }
        let names = self
            .typing
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let label = format!("{names} {}", self.settings.typing_suffix);
        surface.draw_text(
            x.max(LINE_INDENT),
            y,
            &label,
            DEBUG_GRAY.scale_alpha(self.settings.chat_opacity * 0.9 + 0.1),
            true,
        );
    }

    fn render_queue_banner(&self, surface: &mut dyn Surface, layout: &FrameLayout, y: f32) {
        let alpha = self.settings.chat_opacity * (128.0 / 255.0);
        surface.fill_rect(
            0.0,
            y,
            LINE_INDENT + layout.chat_width,
            y + layout.line_height,
            Rgba::BLACK.scale_alpha(alpha),
        );
        let plural = if self.pending_count == 1 { "" } else { "s" };
        surface.draw_text(
            LINE_INDENT,
            y,
            &format!("{} queued message{plural}", self.pending_count),
            Rgba::WHITE.scale_alpha(self.settings.chat_opacity),
            true,
        );
    }
}
