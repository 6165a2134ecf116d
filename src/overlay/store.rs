use super::*;

struct Slot {
    gen: u32,
    msg: Option<SemanticMessage>,
    lines: Vec<LineId>,
}

/// Arena of semantic message records plus the line -> message index.
///
/// Handles are generational: freeing a slot bumps its generation, so a
/// handle held across an eviction simply stops resolving instead of
/// aliasing whatever message reuses the slot.
pub struct LineMetadataStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Insertion order, oldest handle at the front.
    order: VecDeque<MessageHandle>,
    line_index: HashMap<LineId, MessageHandle>,
    /// (tick, content) pairs already accepted, used to drop host redeliveries.
    identity: HashSet<(u64, String)>,
    capacity: usize,
    collapse_window_ticks: u64,
    collapse_lookback: usize,
}

impl LineMetadataStore {
    pub fn new(settings: &ChatSettings) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: VecDeque::new(),
            line_index: HashMap::new(),
            identity: HashSet::new(),
            capacity: settings.chat_size.max(1),
            collapse_window_ticks: settings.collapse_window_ticks,
            collapse_lookback: settings.collapse_lookback.max(1),
        }
    }

    /// Apply reloaded settings. Any messages now past capacity are evicted
    /// and returned, oldest first, with every display line they own.
    pub fn configure(&mut self, settings: &ChatSettings) -> Vec<(MessageHandle, Vec<LineId>)> {
        self.capacity = settings.chat_size.max(1);
        self.collapse_window_ticks = settings.collapse_window_ticks;
        self.collapse_lookback = settings.collapse_lookback.max(1);
        self.evict_overflow()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when the host already delivered a message with this exact
    /// tick and content.
    pub fn is_recorded(&self, tick: u64, content: &str) -> bool {
        self.identity.contains(&(tick, content.to_string()))
    }

    pub fn insert(&mut self, msg: SemanticMessage) -> MessageHandle {
        self.identity.insert((msg.created_tick, msg.content.clone()));
        let slot = match self.free.pop() {
            Some(slot) => {
                let s = &mut self.slots[slot as usize];
                s.msg = Some(msg);
                s.lines.clear();
                slot
            }
            None => {
                self.slots.push(Slot {
                    gen: 0,
                    msg: Some(msg),
                    lines: Vec::new(),
                });
                (self.slots.len() - 1) as u32
            }
        };
        let handle = MessageHandle {
            slot,
            gen: self.slots[slot as usize].gen,
        };
        self.order.push_back(handle);
        handle
    }

    /// Record one display line of `handle`'s message.
    ///
    /// On the first line the store checks the recent record window for an
    /// identical message; when found it bumps that record's repeat count,
    /// discards the new record, and returns true so the caller cancels the
    /// insertion entirely.
    pub fn register(
        &mut self,
        line: LineId,
        handle: MessageHandle,
        is_first: bool,
        is_last: bool,
        insert_index: usize,
    ) -> bool {
        if !self.is_managed(handle) {
            return false;
        }
        if is_first {
            if let Some(existing) = self.find_collapse_target(handle) {
                if let Some(msg) = self.slots[existing.slot as usize].msg.as_mut() {
                    msg.repeat_count += 1;
                    debug!(
                        channel = msg.channel.as_str(),
                        repeat_count = msg.repeat_count,
                        "collapsed repeated message"
                    );
                }
                // Identity stays recorded so a host redelivery of the
                // collapsed copy is still dropped.
                self.free_message(handle, false);
                return true;
            }
        }
        self.slots[handle.slot as usize].lines.push(line);
        self.line_index.insert(line, handle);
        trace!(?line, ?handle, is_first, is_last, insert_index, "registered line");
        false
    }

    /// Forget one display line. Unknown lines are ignored. Removing the
    /// last line of a message retires the whole record.
    pub fn unregister(&mut self, line: LineId) {
        let Some(handle) = self.line_index.remove(&line) else {
            return;
        };
        let slot = &mut self.slots[handle.slot as usize];
        slot.lines.retain(|l| *l != line);
        if slot.lines.is_empty() {
            self.free_message(handle, true);
        }
    }

    pub fn lookup(&self, line: LineId) -> Option<&SemanticMessage> {
        let handle = self.line_index.get(&line)?;
        self.get(*handle)
    }

    pub fn handle_of(&self, line: LineId) -> Option<MessageHandle> {
        self.line_index.get(&line).copied()
    }

    pub fn get(&self, handle: MessageHandle) -> Option<&SemanticMessage> {
        let slot = self.slots.get(handle.slot as usize)?;
        if slot.gen != handle.gen {
            return None;
        }
        slot.msg.as_ref()
    }

    pub fn is_managed(&self, handle: MessageHandle) -> bool {
        self.slots
            .get(handle.slot as usize)
            .is_some_and(|slot| slot.gen == handle.gen && slot.msg.is_some())
    }

    /// Evict oldest messages until the record count fits the capacity.
    /// Each eviction removes the record and all of its lines atomically.
    pub fn evict_overflow(&mut self) -> Vec<(MessageHandle, Vec<LineId>)> {
        let mut evicted = Vec::new();
        while self.order.len() > self.capacity {
            let Some(handle) = self.order.front().copied() else {
                break;
            };
            let lines = self.slots[handle.slot as usize].lines.clone();
            for line in &lines {
                self.line_index.remove(line);
            }
            self.free_message(handle, true);
            debug!(?handle, lines = lines.len(), "evicted oldest message");
            evicted.push((handle, lines));
        }
        evicted
    }

    fn find_collapse_target(&self, handle: MessageHandle) -> Option<MessageHandle> {
        let incoming = self.get(handle)?;
        self.order
            .iter()
            .rev()
            .filter(|h| **h != handle)
            .take(self.collapse_lookback)
            .copied()
            .find(|h| {
                self.get(*h).is_some_and(|msg| {
                    msg.channel == incoming.channel
                        && msg.sender == incoming.sender
                        && msg.content == incoming.content
                        && incoming.created_tick.saturating_sub(msg.created_tick)
                            <= self.collapse_window_ticks
                })
            })
    }

    /// Retire a record. `drop_identity` is false only for collapse, where
    /// the (tick, content) entry must outlive the discarded record.
    fn free_message(&mut self, handle: MessageHandle, drop_identity: bool) {
        let slot = &mut self.slots[handle.slot as usize];
        if slot.gen != handle.gen {
            return;
        }
        if let Some(msg) = slot.msg.take() {
            if drop_identity {
                self.identity.remove(&(msg.created_tick, msg.content));
            }
        }
        slot.lines.clear();
        slot.gen = slot.gen.wrapping_add(1);
        if let Some(pos) = self.order.iter().position(|h| *h == handle) {
            self.order.remove(pos);
        }
        self.free.push(handle.slot);
    }
}
