use crate::overlay::{ChatSettings, IncomingMessage, PlayerRef, SemanticMessage};

/// Host -> overlay notifications, delivered over a crossbeam channel and
/// drained non-blockingly once per frame.
#[derive(Clone, Debug)]
pub enum HostEvent {
    Message(IncomingMessage),
    TypingStarted(PlayerRef),
    TypingStopped(PlayerRef),
    /// Number of outbound messages the host has queued but not resolved.
    PendingCount(usize),
    SettingsReloaded(ChatSettings),
}

/// Overlay -> host action sink. The overlay never performs deletion,
/// clipboard, or network work itself; it only requests it.
pub trait HostActions {
    fn request_delete(&mut self, message: &SemanticMessage);
    fn copy_text(&mut self, text: &str);
    fn typing_started(&mut self);
    fn typing_stopped(&mut self);
}
