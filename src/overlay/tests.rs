use super::*;

/// One unit per char, one unit per row. Keeps layout math exact.
struct FakeMetrics;

impl TextMetrics for FakeMetrics {
    fn text_width(&self, text: &str) -> f32 {
        text.chars().count() as f32
    }

    fn line_height(&self) -> f32 {
        1.0
    }
}

#[derive(Clone, Debug, PartialEq)]
enum DrawOp {
    Rect {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: Rgba,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        color: Rgba,
    },
    Head {
        x: f32,
        y: f32,
        tint: Rgba,
    },
}

#[derive(Default)]
struct RecordingSurface {
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    fn texts(&self) -> Vec<&DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Text { .. }))
            .collect()
    }

    fn has_text(&self, needle: &str) -> bool {
        self.ops.iter().any(|op| match op {
            DrawOp::Text { text, .. } => text.contains(needle),
            _ => false,
        })
    }
}

impl Surface for RecordingSurface {
    fn fill_rect(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Rgba) {
        self.ops.push(DrawOp::Rect { x1, y1, x2, y2, color });
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Rgba, _shadow: bool) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            color,
        });
    }

    fn draw_head(&mut self, _player: &PlayerRef, x: f32, y: f32, _size: f32, tint: Rgba) {
        self.ops.push(DrawOp::Head { x, y, tint });
    }

    fn push_translate(&mut self, _dx: f32, _dy: f32) {}

    fn push_scale(&mut self, _sx: f32, _sy: f32) {}

    fn pop(&mut self) {}
}

#[derive(Default)]
struct SinkActions {
    deletes: Vec<String>,
    copies: Vec<String>,
    typing_started: usize,
    typing_stopped: usize,
}

impl HostActions for SinkActions {
    fn request_delete(&mut self, message: &SemanticMessage) {
        self.deletes.push(message.content.clone());
    }

    fn copy_text(&mut self, text: &str) {
        self.copies.push(text.to_string());
    }

    fn typing_started(&mut self) {
        self.typing_started += 1;
    }

    fn typing_stopped(&mut self) {
        self.typing_stopped += 1;
    }
}

fn test_settings() -> ChatSettings {
    let mut settings = ChatSettings::default();
    settings.chat_width = 40.0;
    settings.chat_height = 10.0;
    settings.chat_height_focused = 10.0;
    settings.chat_size = 100;
    settings
}

fn overlay() -> ChatOverlay {
    ChatOverlay::new(&FakeMetrics, test_settings())
}

fn overlay_with(configure: impl FnOnce(&mut ChatSettings)) -> ChatOverlay {
    let mut settings = test_settings();
    configure(&mut settings);
    ChatOverlay::new(&FakeMetrics, settings)
}

fn msg(channel: &str, tick: u64, content: &str) -> IncomingMessage {
    IncomingMessage {
        channel: ChannelId::new(channel),
        sender: Some(PlayerRef::new(7, "sender")),
        content: content.to_string(),
        tick,
        background: None,
        mention: false,
        debug_info: None,
    }
}

fn add(ov: &mut ChatOverlay, channel: &str, tick: u64, content: &str) {
    ov.add_message(&FakeMetrics, msg(channel, tick, content));
}

fn frame(focused: bool) -> FrameInput {
    FrameInput {
        width: 80.0,
        height: 30.0,
        bottom_margin: 2.0,
        now_tick: 0,
        focused,
        debug: false,
        mouse: None,
    }
}

fn layout(ov: &ChatOverlay, frame: &FrameInput) -> FrameLayout {
    ov.layout(&FakeMetrics, frame)
}

#[test]
fn capacity_eviction_drops_oldest_messages() {
    let mut ov = overlay_with(|s| s.chat_size = 3);
    for (i, text) in ["m1", "m2", "m3", "m4", "m5"].iter().enumerate() {
        add(&mut ov, "local", i as u64 * 100, text);
    }

    assert_eq!(ov.store().len(), 3);
    assert!(!ov.store().is_empty());
    assert_eq!(ov.scrollback().total(), 3);
    let bottom = ov.scrollback.line(0).expect("bottom line");
    assert_eq!(bottom.text, "m5");
    let top = ov.scrollback.line(2).expect("top line");
    assert_eq!(top.text, "m3");
}

#[test]
fn repeat_collapse_bumps_counter_without_new_line() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "gg");
    let before = ov.scrollback.total();

    add(&mut ov, "local", 10, "gg");
    assert_eq!(ov.scrollback.total(), before);
    assert_eq!(ov.store.len(), 1);
    let line_id = ov.scrollback.line(0).expect("line").id;
    let record = ov.store.lookup(line_id).expect("record");
    assert_eq!(record.repeat_count, 2);

    add(&mut ov, "local", 20, "gg");
    let record = ov.store.lookup(line_id).expect("record");
    assert_eq!(record.repeat_count, 3);
}

#[test]
fn collapse_requires_matching_channel() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "gg");
    add(&mut ov, "party", 1, "gg");

    assert_eq!(ov.store.len(), 2);
    assert_eq!(ov.scrollback.total(), 2);
}

#[test]
fn collapse_window_expires() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "gg");
    add(&mut ov, "local", 100, "gg");

    assert_eq!(ov.store.len(), 2);
}

#[test]
fn collapse_lookback_is_bounded() {
    let mut ov = overlay_with(|s| s.collapse_lookback = 1);
    add(&mut ov, "local", 0, "gg");
    add(&mut ov, "local", 1, "something else");
    add(&mut ov, "local", 2, "gg");

    assert_eq!(ov.store.len(), 3);
}

#[test]
fn redelivered_message_is_dropped() {
    let mut ov = overlay();
    add(&mut ov, "local", 5, "hello there");
    add(&mut ov, "local", 5, "hello there");

    assert_eq!(ov.store.len(), 1);
    let line = ov.scrollback.line(0).expect("line");
    let record = ov.store.lookup(line.id).expect("record");
    assert_eq!(record.repeat_count, 1);
}

#[test]
fn repeat_badge_labels() {
    assert_eq!(repeat_badge_label(1), None);
    assert_eq!(repeat_badge_label(2).as_deref(), Some("x2"));
    assert_eq!(repeat_badge_label(999).as_deref(), Some("x999"));
    assert_eq!(repeat_badge_label(1000).as_deref(), Some("x999+"));
}

#[test]
fn opacity_fades_quadratically() {
    assert_eq!(line_opacity(0.0, false), 1.0);
    assert_eq!(line_opacity(200.0, false), 0.0);
    assert_eq!(line_opacity(500.0, false), 0.0);
    assert!((line_opacity(100.0, false) - 0.25).abs() < 1e-6);
    assert!(line_opacity(50.0, false) > line_opacity(150.0, false));
}

#[test]
fn focus_overrides_fade() {
    assert_eq!(line_opacity(1000.0, true), 1.0);
}

#[test]
fn scroll_clamps_to_history() {
    let mut ov = overlay();
    for i in 0..10 {
        add(&mut ov, "local", i * 100, &format!("line {i}"));
    }

    ov.scroll(100, 4);
    assert_eq!(ov.scrollback.scroll_offset(), 6);
    ov.scroll(-100, 4);
    assert_eq!(ov.scrollback.scroll_offset(), 0);
}

#[test]
fn scroll_is_zero_when_everything_fits() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "one");
    add(&mut ov, "local", 100, "two");

    ov.scroll(5, 4);
    assert_eq!(ov.scrollback.scroll_offset(), 0);
}

#[test]
fn insertion_while_scrolled_keeps_anchor_and_flags_unread() {
    let mut ov = overlay();
    for i in 0..10 {
        add(&mut ov, "local", i * 100, &format!("line {i}"));
    }
    ov.scroll(3, 4);
    assert_eq!(ov.scrollback.scroll_offset(), 3);

    add(&mut ov, "local", 2000, "newest");
    assert_eq!(ov.scrollback.scroll_offset(), 4);
    assert!(ov.scrollback.has_unread());

    ov.reset_scroll();
    assert!(!ov.scrollback.has_unread());
}

#[test]
fn offset_stays_in_bounds_after_channel_hide() {
    let mut ov = overlay();
    for i in 0..10 {
        add(&mut ov, "local", i * 100, &format!("keep {i}"));
        add(&mut ov, "party", i * 100 + 50, &format!("drop {i}"));
    }
    ov.scroll(100, 4);
    assert_eq!(ov.scrollback.scroll_offset(), 16);

    ov.hide_channel(&ChannelId::new("party"));
    assert_eq!(ov.scrollback.scroll_offset(), 6);
    assert!(ov.scrollback.visible_window(4).next().is_some());

    ov.hide_channel(&ChannelId::new("local"));
    assert_eq!(ov.scrollback.scroll_offset(), 0);
    assert!(!ov.scrollback.has_unread());
}

#[test]
fn offset_stays_in_bounds_after_capacity_eviction() {
    let mut ov = overlay();
    for i in 0..10 {
        add(&mut ov, "local", i * 100, &format!("line {i}"));
    }
    ov.scroll(100, 4);
    assert_eq!(ov.scrollback.scroll_offset(), 6);

    let mut smaller = test_settings();
    smaller.chat_size = 5;
    ov.handle_event(&FakeMetrics, HostEvent::SettingsReloaded(smaller));
    assert_eq!(ov.scrollback.scroll_offset(), 1);
    assert!(ov.scrollback.visible_window(4).next().is_some());
}

#[test]
fn redelivery_of_a_collapsed_message_stays_dropped() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "gg");
    add(&mut ov, "local", 10, "gg");
    // The host redelivers the exact copy that just collapsed.
    add(&mut ov, "local", 10, "gg");

    assert_eq!(ov.store.len(), 1);
    let line_id = ov.scrollback.line(0).expect("line").id;
    assert_eq!(ov.store.lookup(line_id).expect("record").repeat_count, 2);
}

#[test]
fn wrapping_marks_first_and_last_lines() {
    let mut ov = overlay_with(|s| s.chat_width = 10.0);
    // Badge reserve is width("x999+") = 5, leaving 5 columns.
    add(&mut ov, "local", 0, "aaaaa bbbbb");

    assert_eq!(ov.scrollback.total(), 2);
    let bottom = ov.scrollback.line(0).expect("bottom");
    assert_eq!(bottom.text, "bbbbb");
    assert!(!bottom.first);
    assert!(bottom.last);
    let top = ov.scrollback.line(1).expect("top");
    assert_eq!(top.text, "aaaaa");
    assert!(top.first);
    assert!(!top.last);
}

#[test]
fn badge_reserve_narrows_wrap_width() {
    let mut with_badges = overlay_with(|s| s.chat_width = 10.0);
    add(&mut with_badges, "local", 0, "aaaa bbbb");
    assert_eq!(with_badges.scrollback.total(), 2);

    let mut without = overlay_with(|s| {
        s.chat_width = 10.0;
        s.show_repeat_badges = false;
    });
    add(&mut without, "local", 0, "aaaa bbbb");
    assert_eq!(without.scrollback.total(), 1);
}

#[test]
fn overlong_words_are_hard_split() {
    let lines = super::render::wrap_text(&FakeMetrics, "abcdefg", 5.0);
    assert_eq!(lines, vec!["abcde".to_string(), "fg".to_string()]);
}

#[test]
fn every_line_resolves_to_its_message() {
    let mut ov = overlay_with(|s| s.chat_width = 10.0);
    add(&mut ov, "party", 3, "aaaaa bbbbb");

    for i in 0..ov.scrollback.total() {
        let line = ov.scrollback.line(i).expect("line");
        let record = ov.store.lookup(line.id).expect("record");
        assert_eq!(record.content, "aaaaa bbbbb");
        assert_eq!(record.channel, ChannelId::new("party"));
    }
}

#[test]
fn stale_handles_stop_resolving_after_eviction() {
    let mut ov = overlay_with(|s| s.chat_size = 1);
    add(&mut ov, "local", 0, "first");
    let line = ov.scrollback.line(0).expect("line");
    let handle = ov.store.handle_of(line.id).expect("handle");

    add(&mut ov, "local", 500, "second");
    assert!(!ov.store.is_managed(handle));
    assert!(ov.store.get(handle).is_none());
}

#[test]
fn hit_test_finds_the_hovered_row() {
    let mut ov = overlay();
    for (i, text) in ["m1", "m2", "m3", "m4"].iter().enumerate() {
        add(&mut ov, "local", i as u64 * 100, text);
    }
    let f = frame(true);
    let l = layout(&ov, &f);
    // bottom_y = (30 - 2) / 1 = 28; row 0 spans y in (27, 28].
    let bottom = ov.hit_test(&l, 10.0, 27.5).expect("bottom hit");
    assert_eq!(ov.store.lookup(bottom).expect("record").content, "m4");
    let above = ov.hit_test(&l, 10.0, 26.5).expect("row 1 hit");
    assert_eq!(ov.store.lookup(above).expect("record").content, "m3");

    assert!(ov.hit_test(&l, 10.0, 28.5).is_none());
    assert!(ov.hit_test(&l, 70.0, 27.5).is_none());
}

#[test]
fn hit_test_tracks_the_shake_offset() {
    let mut ov = overlay();
    let mut actions = SinkActions::default();
    add(&mut ov, "local", 0, "m1");
    ov.shake = ShakeEffect::with_seed(42);
    ov.shake_boost(2.0);
    ov.tick(&mut actions);
    let (sx, sy) = ov.shake.offset();

    let f = frame(true);
    let l = layout(&ov, &f);
    assert_eq!(l.origin, (4.0 + sx, sy));
    let hit = ov.hit_test(&l, 10.0 + sx, 27.5 + sy).expect("shaken hit");
    assert_eq!(ov.store.lookup(hit).expect("record").content, "m1");
}

#[test]
fn click_toggles_selection() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "m1");
    let f = frame(true);

    ov.handle_click(&FakeMetrics, &f, 10.0, 27.5);
    let line = ov.scrollback.line(0).expect("line");
    let handle = ov.store.handle_of(line.id).expect("handle");
    assert_eq!(ov.selection().selected(), Some(handle));

    ov.handle_click(&FakeMetrics, &f, 10.0, 27.5);
    assert_eq!(ov.selection.selected(), None);
}

#[test]
fn clicks_are_ignored_while_unfocused_or_hidden() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "m1");

    ov.handle_click(&FakeMetrics, &frame(false), 10.0, 27.5);
    assert_eq!(ov.selection.selected(), None);

    ov.input_hidden = true;
    ov.handle_click(&FakeMetrics, &frame(true), 10.0, 27.5);
    assert_eq!(ov.selection.selected(), None);

    ov.input_hidden = false;
    ov.overlay_hidden = true;
    ov.handle_click(&FakeMetrics, &frame(true), 10.0, 27.5);
    assert_eq!(ov.selection.selected(), None);
}

#[test]
fn selection_survives_unrelated_insertions() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "m1");
    let handle = ov
        .store
        .handle_of(ov.scrollback.line(0).expect("line").id)
        .expect("handle");
    ov.selection.toggle(handle);

    add(&mut ov, "local", 100, "m2");
    assert_eq!(ov.selection.selected(), Some(handle));
}

#[test]
fn selection_clears_when_its_message_is_evicted() {
    let mut ov = overlay_with(|s| s.chat_size = 2);
    add(&mut ov, "local", 0, "oldest");
    add(&mut ov, "local", 100, "middle");
    let oldest = ov
        .store
        .handle_of(ov.scrollback.line(1).expect("line").id)
        .expect("handle");
    ov.selection.toggle(oldest);

    add(&mut ov, "local", 200, "newest");
    assert_eq!(ov.selection.selected(), None);
}

#[test]
fn confirm_and_close_clear_selection() {
    let mut ov = overlay();
    let mut actions = SinkActions::default();
    add(&mut ov, "local", 0, "m1");
    let handle = ov
        .store
        .handle_of(ov.scrollback.line(0).expect("line").id)
        .expect("handle");

    ov.selection.toggle(handle);
    ov.handle_selection_key(SelectionKey::Confirm, &mut actions);
    assert_eq!(ov.selection.selected(), None);

    ov.selection.toggle(handle);
    ov.on_close(&mut actions);
    assert_eq!(ov.selection.selected(), None);
    assert!(actions.deletes.is_empty());
    assert!(actions.copies.is_empty());
}

#[test]
fn delete_requests_exactly_once_then_deselects() {
    let mut ov = overlay();
    let mut actions = SinkActions::default();
    add(&mut ov, "local", 0, "spam spam");
    let handle = ov
        .store
        .handle_of(ov.scrollback.line(0).expect("line").id)
        .expect("handle");
    ov.selection.toggle(handle);

    ov.handle_selection_key(SelectionKey::Delete, &mut actions);
    assert_eq!(actions.deletes, vec!["spam spam".to_string()]);
    assert_eq!(ov.selection.selected(), None);

    ov.handle_selection_key(SelectionKey::Delete, &mut actions);
    assert_eq!(actions.deletes.len(), 1);
}

#[test]
fn copy_flash_counts_down_and_restarts() {
    let mut ov = overlay();
    let mut actions = SinkActions::default();
    add(&mut ov, "local", 0, "copy me");
    let handle = ov
        .store
        .handle_of(ov.scrollback.line(0).expect("line").id)
        .expect("handle");
    ov.selection.toggle(handle);

    ov.handle_selection_key(SelectionKey::Copy, &mut actions);
    assert_eq!(actions.copies, vec!["copy me".to_string()]);
    assert!(ov.selection.copy_flash_active());

    ov.tick(&mut actions);
    assert!(ov.selection.copy_flash_active());
    ov.tick(&mut actions);
    assert!(!ov.selection.copy_flash_active());

    ov.handle_selection_key(SelectionKey::Copy, &mut actions);
    assert!(ov.selection.copy_flash_active());
    assert_eq!(actions.copies.len(), 2);
}

#[test]
fn settings_sanitize_clamps_ranges() {
    let mut settings = ChatSettings::default();
    settings.chat_size = 0;
    settings.chat_opacity = 7.0;
    settings.background_opacity = -1.0;
    settings.chat_scale = 0.0;
    settings.sanitize();

    assert_eq!(settings.chat_size, 1);
    assert_eq!(settings.chat_opacity, 1.0);
    assert_eq!(settings.background_opacity, 0.0);
    assert_eq!(settings.chat_scale, 1.0);
}

#[test]
fn settings_reload_shrinks_capacity() {
    let mut ov = overlay();
    for i in 0..6 {
        add(&mut ov, "local", i * 100, &format!("line {i}"));
    }
    let mut smaller = test_settings();
    smaller.chat_size = 2;
    ov.handle_event(&FakeMetrics, HostEvent::SettingsReloaded(smaller));

    assert_eq!(ov.store().capacity(), 2);
    assert_eq!(ov.store.len(), 2);
    assert_eq!(ov.scrollback.total(), 2);
    assert_eq!(ov.scrollback.line(0).expect("line").text, "line 5");
}

#[test]
fn hidden_channel_restores_in_original_order() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "one");
    add(&mut ov, "party", 100, "two");
    add(&mut ov, "local", 200, "three");

    ov.hide_channel(&ChannelId::new("party"));
    assert_eq!(ov.scrollback.total(), 2);
    assert_eq!(ov.scrollback.line(0).expect("line").text, "three");
    assert_eq!(ov.scrollback.line(1).expect("line").text, "one");

    ov.show_channel(&ChannelId::new("party"));
    assert_eq!(ov.scrollback.total(), 3);
    assert_eq!(ov.scrollback.line(0).expect("line").text, "three");
    assert_eq!(ov.scrollback.line(1).expect("line").text, "two");
    assert_eq!(ov.scrollback.line(2).expect("line").text, "one");
}

#[test]
fn messages_for_hidden_channels_stay_stored_and_flag_unread() {
    let mut ov = overlay();
    ov.hide_channel(&ChannelId::new("party"));
    add(&mut ov, "party", 0, "secret plans");

    assert_eq!(ov.scrollback.total(), 0);
    assert_eq!(ov.store.len(), 1);
    let tab = ov
        .channel_bar
        .tabs()
        .iter()
        .find(|t| t.channel == ChannelId::new("party"))
        .expect("party tab");
    assert!(tab.unread);

    ov.show_channel(&ChannelId::new("party"));
    assert_eq!(ov.scrollback.total(), 1);
    assert_eq!(ov.scrollback.line(0).expect("line").text, "secret plans");
}

#[test]
fn mention_marks_the_tab() {
    let mut ov = overlay();
    let mut m = msg("party", 0, "hey you");
    m.mention = true;
    ov.add_message(&FakeMetrics, m);

    let tab = ov
        .channel_bar()
        .tabs()
        .iter()
        .find(|t| t.channel == ChannelId::new("party"))
        .expect("party tab");
    assert!(tab.unread);
    assert!(tab.mentioned);
}

#[test]
fn channel_bar_measures_tabs_from_label_widths() {
    let mut bar = ChannelBar::new(&[ChannelId::new("all"), ChannelId::new("local")]);
    bar.measure(&FakeMetrics);

    let tabs = bar.tabs();
    // width = label + padding on both sides + icon reserve.
    assert_eq!(tabs[0].x, 0.0);
    assert_eq!(tabs[0].width, 3.0 + 4.0 + 10.0);
    assert_eq!(tabs[1].x, 17.0 + 2.0);
    assert_eq!(tabs[1].width, 5.0 + 4.0 + 10.0);

    assert_eq!(bar.on_click(5.0), Some(ChannelId::new("all")));
    assert_eq!(bar.on_click(18.0), None);
    assert_eq!(bar.on_click(20.0), Some(ChannelId::new("local")));
}

#[test]
fn display_width_includes_the_icon_gutter() {
    let ov = overlay();
    assert_eq!(ov.display_width(), 48.0);
}

#[test]
fn typing_starts_after_sustained_input_and_times_out() {
    let mut ov = overlay();
    let mut actions = SinkActions::default();

    ov.on_text_input(5, &mut actions);
    assert_eq!(actions.typing_started, 0);
    ov.on_text_input(6, &mut actions);
    assert_eq!(actions.typing_started, 1);
    assert!(ov.typing_tracker.is_typing());

    for _ in 0..40 {
        ov.tick(&mut actions);
    }
    assert_eq!(actions.typing_stopped, 1);
    assert!(!ov.typing_tracker.is_typing());
}

#[test]
fn short_drafts_never_count_as_typing() {
    let mut ov = overlay();
    let mut actions = SinkActions::default();
    ov.on_text_input(2, &mut actions);
    ov.on_text_input(3, &mut actions);
    ov.on_text_input(4, &mut actions);

    assert_eq!(actions.typing_started, 0);
}

#[test]
fn clearing_the_draft_ends_typing_immediately() {
    let mut ov = overlay();
    let mut actions = SinkActions::default();
    ov.on_text_input(5, &mut actions);
    ov.on_text_input(9, &mut actions);
    assert_eq!(actions.typing_started, 1);

    ov.on_input_cleared(&mut actions);
    assert_eq!(actions.typing_stopped, 1);
}

#[test]
fn shake_boost_is_capped_and_decays() {
    let mut shake = ShakeEffect::with_seed(42);
    shake.boost(5.0);
    assert_eq!(shake.power(), 2.0);

    shake.tick(1.0, 1.0);
    assert!((shake.power() - 1.0).abs() < 1e-4);
    let (x, y) = shake.offset();
    assert!(x.abs() <= shake.power());
    assert!(y.abs() <= shake.power());

    for _ in 0..20 {
        shake.tick(1.0, 1.0);
    }
    assert_eq!(shake.power(), 0.0);
    assert_eq!(shake.offset(), (0.0, 0.0));
}

#[test]
fn render_uses_message_background_color() {
    let mut ov = overlay();
    let mut m = msg("whisper", 0, "psst");
    m.background = Some(Rgba::rgb(10, 20, 30));
    ov.add_message(&FakeMetrics, m);

    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &frame(true));

    let bg = surface.ops.iter().find(|op| match op {
        DrawOp::Rect { color, .. } => (color.r, color.g, color.b) == (10, 20, 30),
        _ => false,
    });
    assert!(bg.is_some());
}

#[test]
fn fully_aged_lines_draw_nothing_while_unfocused() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "old news");

    let mut f = frame(false);
    f.now_tick = 300;
    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &f);
    assert!(surface.ops.is_empty());

    let mut focused = frame(true);
    focused.now_tick = 300;
    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &focused);
    assert!(surface.has_text("old news"));
}

#[test]
fn partially_aged_text_is_dimmed() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "fading");

    let mut f = frame(false);
    f.now_tick = 100;
    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &f);

    let alpha = surface
        .texts()
        .iter()
        .find_map(|op| match op {
            DrawOp::Text { text, color, .. } if text == "fading" => Some(color.a),
            _ => None,
        })
        .expect("fading text drawn");
    // opacity 0.25 at half the fade window, full chat opacity.
    assert_eq!(alpha, 64);
}

#[test]
fn repeat_badge_is_right_aligned() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "gg");
    add(&mut ov, "local", 10, "gg");

    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &frame(true));

    let badge = surface
        .texts()
        .iter()
        .find_map(|op| match op {
            DrawOp::Text { text, x, .. } if text == "x2" => Some(*x),
            _ => None,
        })
        .expect("badge drawn");
    // Right edge is LINE_INDENT + chat_width = 48, label is 2 wide.
    assert_eq!(badge, 46.0);
}

#[test]
fn scrollbar_appears_only_when_lines_overflow() {
    let right_edge = 48.0;
    let scrollbar_rects = |surface: &RecordingSurface| {
        surface
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Rect { x1, .. } if *x1 >= right_edge))
            .count()
    };

    // A single short channel keeps the tab row clear of the right edge.
    let mut ov = overlay_with(|s| s.channels = vec![ChannelId::new("all")]);
    for i in 0..3 {
        add(&mut ov, "local", i * 100, &format!("short {i}"));
    }
    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &frame(true));
    assert_eq!(scrollbar_rects(&surface), 0);

    for i in 3..15 {
        add(&mut ov, "local", i * 100, &format!("short {i}"));
    }
    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &frame(true));
    assert_eq!(scrollbar_rects(&surface), 2);
}

#[test]
fn typing_band_lists_active_typists() {
    let mut ov = overlay();
    ov.handle_event(
        &FakeMetrics,
        HostEvent::TypingStarted(PlayerRef::new(3, "brook")),
    );
    ov.handle_event(
        &FakeMetrics,
        HostEvent::TypingStarted(PlayerRef::new(4, "cedar")),
    );

    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &frame(true));
    assert!(surface.has_text("brook, cedar typing..."));

    ov.handle_event(
        &FakeMetrics,
        HostEvent::TypingStopped(PlayerRef::new(3, "brook")),
    );
    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &frame(true));
    assert!(surface.has_text("cedar typing..."));
    assert!(!surface.has_text("brook"));
}

#[test]
fn queue_banner_reflects_pending_count() {
    let mut ov = overlay();
    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &frame(true));
    assert!(!surface.has_text("queued"));

    ov.handle_event(&FakeMetrics, HostEvent::PendingCount(3));
    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &frame(true));
    assert!(surface.has_text("3 queued messages"));

    ov.handle_event(&FakeMetrics, HostEvent::PendingCount(0));
    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &frame(true));
    assert!(!surface.has_text("queued"));
}

#[test]
fn debug_annotation_renders_only_in_debug_mode() {
    let mut ov = overlay();
    let mut m = msg("local", 0, "checked");
    m.debug_info = Some("id=17".to_string());
    ov.add_message(&FakeMetrics, m);

    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &frame(true));
    assert!(!surface.has_text("id=17"));

    let mut f = frame(true);
    f.debug = true;
    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &f);
    assert!(surface.has_text("id=17"));
}

#[test]
fn head_icon_draws_shadow_then_fill() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "hi");

    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &frame(true));

    let heads: Vec<&DrawOp> = surface
        .ops
        .iter()
        .filter(|op| matches!(op, DrawOp::Head { .. }))
        .collect();
    assert_eq!(heads.len(), 2);
    match (heads[0], heads[1]) {
        (
            DrawOp::Head { x: x1, tint: t1, .. },
            DrawOp::Head { x: x2, tint: t2, .. },
        ) => {
            assert_eq!(*x1, x2 + 1.0);
            assert_eq!((t1.r, t1.g, t1.b), (80, 80, 80));
            assert_eq!((t2.r, t2.g, t2.b), (255, 255, 255));
        }
        _ => unreachable!(),
    }
}

#[test]
fn selected_message_gets_highlight_fill() {
    let mut ov = overlay();
    add(&mut ov, "local", 0, "pick me");
    let handle = ov
        .store
        .handle_of(ov.scrollback.line(0).expect("line").id)
        .expect("handle");
    ov.selection.toggle(handle);

    let mut surface = RecordingSurface::default();
    ov.render(&mut surface, &FakeMetrics, &frame(true));

    let highlight = surface.ops.iter().any(|op| match op {
        DrawOp::Rect { color, .. } => *color == Rgba::WHITE.with_alpha(30),
        _ => false,
    });
    assert!(highlight);
}
