use crate::overlay::{PlayerRef, Rgba};

/// Font measurement seam. The overlay wraps and lays out text purely in
/// these units; the host decides whether a unit is a pixel or a cell.
pub trait TextMetrics {
    /// Advance width of `text` in surface units.
    fn text_width(&self, text: &str) -> f32;
    /// Height of one unspaced text row in surface units.
    fn line_height(&self) -> f32;
}

/// Draw-primitive seam between the overlay and the host renderer.
///
/// Coordinates are in surface units after the current transform stack.
/// `push_translate`/`push_scale` nest; each must be balanced by `pop`.
pub trait Surface {
    fn fill_rect(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Rgba);
    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Rgba, shadow: bool);
    /// Draw a player's head icon in a `size` x `size` square, tinted.
    fn draw_head(&mut self, player: &PlayerRef, x: f32, y: f32, size: f32, tint: Rgba);
    fn push_translate(&mut self, dx: f32, dy: f32);
    fn push_scale(&mut self, sx: f32, sy: f32);
    fn pop(&mut self);
}
