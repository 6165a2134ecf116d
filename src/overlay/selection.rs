use super::*;

const COPY_FLASH_TICKS: u8 = 2;

/// Selection-related keys, already mapped from host key events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionKey {
    /// Ask the host to delete the selected message.
    Delete,
    /// Copy the selected message text.
    Copy,
    /// Confirm / close the selection without acting on it.
    Confirm,
}

/// Which message is selected, plus the short highlight flash after a copy.
pub struct SelectionTracker {
    selected: Option<MessageHandle>,
    copy_flash_ticks: u8,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self {
            selected: None,
            copy_flash_ticks: 0,
        }
    }

    pub fn selected(&self) -> Option<MessageHandle> {
        self.selected
    }

    pub fn copy_flash_active(&self) -> bool {
        self.copy_flash_ticks > 0
    }

    /// Select `handle`, or deselect when it is already selected.
    pub(crate) fn toggle(&mut self, handle: MessageHandle) {
        self.copy_flash_ticks = 0;
        if self.selected == Some(handle) {
            self.selected = None;
        } else {
            self.selected = Some(handle);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.selected = None;
        self.copy_flash_ticks = 0;
    }

    /// Drop the selection only when it points at `handle`.
    pub(crate) fn drop_if(&mut self, handle: MessageHandle) {
        if self.selected == Some(handle) {
            self.clear();
        }
    }

    pub(crate) fn flash(&mut self) {
        self.copy_flash_ticks = COPY_FLASH_TICKS;
    }

    pub(crate) fn tick(&mut self) {
        self.copy_flash_ticks = self.copy_flash_ticks.saturating_sub(1);
    }
}

impl ChatOverlay {
    /// The display line under raw surface coordinates, using the same
    /// geometry the renderer draws with.
    pub fn hit_test(&self, layout: &FrameLayout, x: f32, y: f32) -> Option<LineId> {
        let (lx, ly) = layout.to_local(x, y);
        if !layout.contains_x(lx) {
            return None;
        }
        let row = layout.row_at(ly)?;
        self.scrollback
            .line(row + self.scrollback.scroll_offset())
            .map(|line| line.id)
    }

    /// Act on a selection key. A selection must exist; everything else is
    /// a no-op. Delete issues exactly one request, then deselects.
    pub fn handle_selection_key(&mut self, key: SelectionKey, actions: &mut dyn HostActions) {
        let Some(handle) = self.selection.selected() else {
            return;
        };
        match key {
            SelectionKey::Delete => {
                if let Some(msg) = self.store.get(handle) {
                    info!(channel = msg.channel.as_str(), "requesting message deletion");
                    actions.request_delete(msg);
                }
                self.selection.clear();
            }
            SelectionKey::Copy => {
                if let Some(msg) = self.store.get(handle) {
                    actions.copy_text(&msg.content);
                    self.selection.flash();
                }
            }
            SelectionKey::Confirm => self.selection.clear(),
        }
    }
}
