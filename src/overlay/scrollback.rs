use super::*;

/// Ordered display lines plus the scroll position over them.
///
/// Index 0 is the newest line and the bottom visual row; rendering walks
/// upward from there. `scroll_offset` counts lines scrolled back into
/// history and is re-clamped after every mutation.
pub struct ScrollbackController {
    lines: VecDeque<DisplayLine>,
    scroll_offset: usize,
    capacity: usize,
    /// A line arrived while scrolled away from the bottom.
    unread: bool,
    /// Viewport size of the most recent scroll, bounding re-clamps after
    /// removals. Zero until the first scroll, when the offset is zero too.
    viewport_hint: usize,
}

impl ScrollbackController {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            scroll_offset: 0,
            capacity: capacity.max(1),
            unread: false,
            viewport_hint: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.lines.len()
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn has_unread(&self) -> bool {
        self.unread
    }

    pub fn line(&self, index: usize) -> Option<&DisplayLine> {
        self.lines.get(index)
    }

    /// The lines currently on screen, bottom row first, paired with their
    /// viewport row. Pure with respect to the stored offset.
    pub fn visible_window(&self, viewport_lines: usize) -> impl Iterator<Item = (usize, &DisplayLine)> {
        (0..viewport_lines).filter_map(move |k| {
            self.lines.get(k + self.scroll_offset).map(|line| (k, line))
        })
    }

    /// Insert at a visual index (0 = bottom). When scrolled back, the view
    /// stays anchored on the line it was showing. Returns the line pushed
    /// out of capacity, if any.
    pub fn insert(&mut self, index: usize, line: DisplayLine) -> Option<DisplayLine> {
        let index = index.min(self.lines.len());
        self.lines.insert(index, line);
        if self.scroll_offset > 0 && index <= self.scroll_offset {
            self.scroll_offset += 1;
            self.unread = true;
        }
        let evicted = if self.lines.len() > self.capacity {
            self.lines.pop_back()
        } else {
            None
        };
        self.clamp_scroll(None);
        evicted
    }

    /// Scroll by `delta` lines (positive = back into history), clamped to
    /// the available history given the viewport.
    pub fn scroll_by(&mut self, delta: i64, viewport_lines: usize) {
        self.viewport_hint = viewport_lines;
        let next = self.scroll_offset as i64 + delta;
        self.scroll_offset = next.max(0) as usize;
        self.clamp_scroll(Some(viewport_lines));
    }

    pub fn reset_scroll(&mut self) {
        self.scroll_offset = 0;
        self.unread = false;
    }

    /// Re-clamp the offset to `[0, total - viewport]`. Without an explicit
    /// viewport the most recent scroll's viewport bounds the offset.
    pub fn clamp_scroll(&mut self, viewport_lines: Option<usize>) {
        let viewport = viewport_lines.unwrap_or(self.viewport_hint);
        let max = if viewport > 0 {
            self.lines.len().saturating_sub(viewport)
        } else {
            self.lines.len()
        };
        self.scroll_offset = self.scroll_offset.min(max);
        if self.scroll_offset == 0 {
            self.unread = false;
        }
    }

    /// Shrink or grow the line capacity, returning lines truncated off the
    /// old end.
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<DisplayLine> {
        self.capacity = capacity.max(1);
        let mut evicted = Vec::new();
        while self.lines.len() > self.capacity {
            if let Some(line) = self.lines.pop_back() {
                evicted.push(line);
            }
        }
        self.clamp_scroll(None);
        evicted
    }

    /// Remove every line whose id is in `ids`, preserving order of the rest.
    pub fn remove_ids(&mut self, ids: &HashSet<LineId>) -> Vec<DisplayLine> {
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(self.lines.len());
        for line in self.lines.drain(..) {
            if ids.contains(&line.id) {
                removed.push(line);
            } else {
                kept.push_back(line);
            }
        }
        self.lines = kept;
        self.clamp_scroll(None);
        removed
    }

    /// Splice lines back in, slotting each by its insertion sequence so
    /// restored channels reappear in original order. Returns any lines
    /// truncated off the old end by the capacity.
    pub fn restore(&mut self, mut lines: Vec<DisplayLine>) -> Vec<DisplayLine> {
        // Newest (highest seq) belongs at the front.
        lines.sort_by_key(|line| line.seq);
        for line in lines {
            let index = self
                .lines
                .iter()
                .position(|existing| existing.seq < line.seq)
                .unwrap_or(self.lines.len());
            self.lines.insert(index, line);
        }
        let mut evicted = Vec::new();
        while self.lines.len() > self.capacity {
            if let Some(line) = self.lines.pop_back() {
                evicted.push(line);
            }
        }
        self.clamp_scroll(None);
        evicted
    }
}
