use super::*;

pub const TAB_PADDING: f32 = 2.0;
pub const TAB_SPACING: f32 = 2.0;
pub const TAB_ICON_RESERVE: f32 = 10.0;

const LABEL_IDLE: Rgba = Rgba::rgb(170, 170, 170);
const LABEL_HIDDEN_TINT: Rgba = Rgba::rgb(139, 0, 0);
const UNREAD_DOT: Rgba = Rgba::rgb(204, 204, 204);
const MENTION_DOT: Rgba = Rgba::rgb(255, 170, 0);
const TAB_BG: Rgba = Rgba::new(0, 0, 0, 110);

#[derive(Clone, Debug)]
pub struct ChannelTab {
    pub channel: ChannelId,
    pub x: f32,
    pub width: f32,
    pub unread: bool,
    pub mentioned: bool,
}

impl ChannelTab {
    fn contains(&self, x: f32) -> bool {
        x >= self.x && x < self.x + self.width
    }
}

/// Row of channel toggle tabs above the chat body. Tab geometry comes
/// from font measurement and is rebuilt whenever settings change.
pub struct ChannelBar {
    tabs: Vec<ChannelTab>,
}

impl ChannelBar {
    pub fn new(channels: &[ChannelId]) -> Self {
        let mut bar = Self { tabs: Vec::new() };
        bar.rebuild(channels);
        bar
    }

    /// Reset the tab list to `channels`, keeping unread state for tabs
    /// that survive. Geometry is stale until the next `measure`.
    pub fn rebuild(&mut self, channels: &[ChannelId]) {
        let old = std::mem::take(&mut self.tabs);
        self.tabs = channels
            .iter()
            .map(|channel| {
                let prev = old.iter().find(|t| t.channel == *channel);
                ChannelTab {
                    channel: channel.clone(),
                    x: 0.0,
                    width: 0.0,
                    unread: prev.is_some_and(|t| t.unread),
                    mentioned: prev.is_some_and(|t| t.mentioned),
                }
            })
            .collect();
    }

    /// Lay the tabs out left to right. Each tab is its label width plus
    /// padding on both sides plus room for the unread icon.
    pub fn measure(&mut self, metrics: &dyn TextMetrics) {
        let mut x = 0.0;
        for tab in &mut self.tabs {
            tab.x = x;
            tab.width =
                metrics.text_width(tab.channel.as_str()) + TAB_PADDING * 2.0 + TAB_ICON_RESERVE;
            x += tab.width + TAB_SPACING;
        }
    }

    pub fn tabs(&self) -> &[ChannelTab] {
        &self.tabs
    }

    pub fn height(&self, metrics: &dyn TextMetrics) -> f32 {
        metrics.line_height() + TAB_PADDING * 2.0
    }

    /// The channel of the tab under bar-local `x`, if any.
    pub fn on_click(&self, x: f32) -> Option<ChannelId> {
        self.tabs
            .iter()
            .find(|tab| tab.contains(x))
            .map(|tab| tab.channel.clone())
    }

    pub fn mark_unread(&mut self, channel: &ChannelId) {
        if let Some(tab) = self.tab_mut(channel) {
            tab.unread = true;
        }
    }

    pub fn mark_mentioned(&mut self, channel: &ChannelId) {
        if let Some(tab) = self.tab_mut(channel) {
            tab.unread = true;
            tab.mentioned = true;
        }
    }

    pub fn mark_read(&mut self, channel: &ChannelId) {
        if let Some(tab) = self.tab_mut(channel) {
            tab.unread = false;
            tab.mentioned = false;
        }
    }

    fn tab_mut(&mut self, channel: &ChannelId) -> Option<&mut ChannelTab> {
        self.tabs.iter_mut().find(|t| t.channel == *channel)
    }

    /// Draw the bar with its top edge at `y`, in bar-local x coordinates.
    pub fn render(
        &self,
        surface: &mut dyn Surface,
        metrics: &dyn TextMetrics,
        y: f32,
        hidden: &HashSet<ChannelId>,
        hover_x: Option<f32>,
        alpha: f32,
    ) {
        let height = self.height(metrics);
        for tab in &self.tabs {
            let hovered = hover_x.is_some_and(|x| tab.contains(x));
            surface.fill_rect(
                tab.x,
                y,
                tab.x + tab.width,
                y + height,
                TAB_BG.scale_alpha(alpha),
            );
            let mut label = if hovered { Rgba::WHITE } else { LABEL_IDLE };
            if hidden.contains(&tab.channel) {
                label = label.blend_toward(LABEL_HIDDEN_TINT, 0.6);
            }
            surface.draw_text(
                tab.x + TAB_PADDING,
                y + TAB_PADDING,
                tab.channel.as_str(),
                label.scale_alpha(alpha),
                false,
            );
            if tab.unread {
                let dot = if tab.mentioned { MENTION_DOT } else { UNREAD_DOT };
                let dot_x = tab.x + tab.width - TAB_ICON_RESERVE + 3.0;
                let dot_y = y + height / 2.0 - 2.0;
                surface.fill_rect(dot_x, dot_y, dot_x + 4.0, dot_y + 4.0, dot.scale_alpha(alpha));
            }
        }
    }
}
