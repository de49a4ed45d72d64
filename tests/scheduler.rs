//! End-to-end tick scenarios: admission ordering, ring bounds, purges,
//! backpressure, deferred overlay attach and the static-to-animated upgrade.

use chat_overlay::display::DELETED_MARKER;
use chat_overlay::texture::{TextureData, sheet_frames};
use chat_overlay::{ChatConfig, ChatMessage, ChatRenderer, ChatUser, GlyphRef};
use std::time::{Duration, Instant};

/// Small ring, small pool, no frame hold, oldest-first eviction.
fn test_config(slots: usize) -> ChatConfig {
    let mut config = ChatConfig::default();
    config.max_messages = slots;
    config.pool_capacity = 5;
    config.frame_hold_ticks = 0;
    config
}

fn renderer(slots: usize) -> ChatRenderer {
    ChatRenderer::new(test_config(slots))
}

/// A tick that comfortably meets the frame budget (100 fps vs 55 floor).
fn good_tick(r: &mut ChatRenderer) {
    r.tick(Instant::now(), Duration::from_millis(10));
}

/// A tick whose measured frame time blows the budget (~30 fps).
fn slow_tick(r: &mut ChatRenderer) {
    r.tick(Instant::now(), Duration::from_millis(33));
}

fn msg(user: &str, text: &str) -> ChatMessage {
    ChatMessage::new(ChatUser::new(user, user, "#ffffff"), text, vec![])
}

fn msg_with_glyphs(user: &str, text: &str, glyphs: Vec<GlyphRef>) -> ChatMessage {
    ChatMessage::new(ChatUser::new(user, user, "#ffffff"), text, glyphs)
}

fn pixels() -> TextureData {
    TextureData {
        width: 8,
        height: 8,
        pixels: vec![0xff; 8 * 8 * 4],
    }
}

fn slot_texts(r: &ChatRenderer) -> Vec<String> {
    r.ring()
        .slots()
        .iter()
        .filter_map(|s| s.message.as_ref().map(|m| m.text.clone()))
        .collect()
}

#[test]
fn test_lifo_admission_reorders_burst() {
    let mut r = renderer(2);
    let ingress = r.ingress();
    ingress.enqueue_message(msg("u", "A"));
    ingress.enqueue_message(msg("u", "B"));
    ingress.enqueue_message(msg("u", "C"));

    // Tick 1 admits C (most recent), tick 2 finishes staging it, tick 3
    // admits B. A is still queued: latest-first is the documented tie-break.
    for _ in 0..3 {
        good_tick(&mut r);
    }
    assert_eq!(slot_texts(&r), vec!["C", "B"]);
    assert_eq!(ingress.pending_messages(), 1);
}

#[test]
fn test_ring_never_exceeds_slot_count() {
    let mut r = renderer(2);
    let ingress = r.ingress();
    for i in 0..5 {
        ingress.enqueue_message(msg("u", &format!("m{i}")));
    }
    for _ in 0..20 {
        good_tick(&mut r);
    }
    assert_eq!(r.stats().admitted, 5);
    assert_eq!(r.ring().non_empty_count(), 2);
    assert_eq!(ingress.pending_messages(), 0);
}

#[test]
fn test_admission_with_empty_queue_is_noop() {
    let mut r = renderer(2);
    for _ in 0..5 {
        good_tick(&mut r);
    }
    assert_eq!(r.stats().admitted, 0);
    assert_eq!(r.ring().non_empty_count(), 0);
}

#[test]
fn test_backpressure_skips_admission_until_budget_met() {
    let mut r = renderer(2);
    let ingress = r.ingress();
    ingress.enqueue_message(msg("u", "late"));

    for _ in 0..4 {
        slow_tick(&mut r);
    }
    assert_eq!(r.stats().admitted, 0);
    assert_eq!(r.stats().skipped_ticks, 4);

    good_tick(&mut r);
    assert_eq!(r.stats().admitted, 1);
}

#[test]
fn test_purge_runs_even_under_backpressure() {
    let mut r = renderer(2);
    let ingress = r.ingress();
    ingress.enqueue_message(msg("troll", "spam"));
    good_tick(&mut r);
    good_tick(&mut r);

    ingress.request_purge("troll");
    slow_tick(&mut r);
    assert_eq!(slot_texts(&r), vec![DELETED_MARKER]);
    assert_eq!(r.stats().purged, 1);
}

#[test]
fn test_double_purge_same_tick_leaves_one_redaction() {
    let mut r = renderer(2);
    let ingress = r.ingress();
    ingress.enqueue_message(msg("troll", "spam"));
    good_tick(&mut r);
    good_tick(&mut r);

    ingress.request_purge("troll");
    ingress.request_purge("troll");
    good_tick(&mut r);

    let texts = slot_texts(&r);
    assert_eq!(texts, vec![DELETED_MARKER]);
    assert_eq!(r.ring().non_empty_count(), 1);
}

#[test]
fn test_purge_for_absent_user_is_silent_noop() {
    let mut r = renderer(2);
    let ingress = r.ingress();
    ingress.enqueue_message(msg("u", "hello"));
    good_tick(&mut r);
    good_tick(&mut r);

    ingress.request_purge("nobody");
    good_tick(&mut r);
    assert_eq!(r.stats().purged, 0);
    assert_eq!(slot_texts(&r), vec!["hello"]);
}

#[test]
fn test_cached_glyph_attaches_and_miss_defers() {
    let mut r = renderer(2);
    let ingress = r.ingress();
    r.cache()
        .insert("emote/hit", pixels(), Vec::new(), Duration::ZERO);

    ingress.enqueue_message(msg_with_glyphs(
        "u",
        "hi Kappa PogChamp",
        vec![
            GlyphRef::emote("emote/hit", 3, 8),
            GlyphRef::emote("emote/miss", 9, 17),
        ],
    ));
    good_tick(&mut r); // admission + step A
    good_tick(&mut r); // step B

    let slot = r.ring().slots().iter().find(|s| !s.is_empty()).unwrap();
    assert!(slot.rendered);
    assert_eq!(slot.overlays.len(), 1);
    assert_eq!(r.stats().cache_hits, 1);
    assert_eq!(r.stats().cache_misses, 1);

    // The missing texture arrives later and fans out to the visible slot.
    ingress.on_image_ready("emote/miss", pixels(), Vec::new(), Duration::ZERO);
    good_tick(&mut r);

    let slot = r.ring().slots().iter().find(|s| !s.is_empty()).unwrap();
    assert_eq!(slot.overlays.len(), 2);
}

#[test]
fn test_late_image_illuminates_older_messages_too() {
    let mut r = renderer(3);
    let ingress = r.ingress();
    // Two messages referencing the same uncached key.
    for text in ["one Kappa", "two Kappa"] {
        ingress.enqueue_message(msg_with_glyphs(
            "u",
            text,
            vec![GlyphRef::emote("emote/kappa", 4, 9)],
        ));
    }
    for _ in 0..4 {
        good_tick(&mut r);
    }
    assert_eq!(r.ring().overlay_count_for_key("emote/kappa"), 0);

    ingress.on_image_ready("emote/kappa", pixels(), Vec::new(), Duration::ZERO);
    good_tick(&mut r);
    // Fan-out is not limited to the most recent message.
    assert_eq!(r.ring().overlay_count_for_key("emote/kappa"), 2);
}

#[test]
fn test_static_to_animated_upgrade_reattaches_once() {
    let mut r = renderer(2);
    let ingress = r.ingress();
    r.cache()
        .insert("emote/party", pixels(), Vec::new(), Duration::ZERO);

    ingress.enqueue_message(msg_with_glyphs(
        "u",
        "party time",
        vec![GlyphRef::emote("emote/party", 0, 5)],
    ));
    good_tick(&mut r);
    good_tick(&mut r);
    assert_eq!(r.ring().overlay_count_for_key("emote/party"), 1);
    assert_eq!(r.pool().in_use(), 1);

    // The full 4-frame animation arrives for the same key: the stale static
    // overlay is detached and exactly one new sprite is attached.
    ingress.on_image_ready(
        "emote/party",
        pixels(),
        sheet_frames(4),
        Duration::from_millis(30),
    );
    good_tick(&mut r);

    assert_eq!(r.ring().overlay_count_for_key("emote/party"), 1);
    assert_eq!(r.pool().in_use(), 1);
    assert!(r.cache().get("emote/party").unwrap().is_animated());
}

#[test]
fn test_pool_exhaustion_drops_glyph_but_keeps_text() {
    let mut config = test_config(2);
    config.pool_capacity = 1;
    let mut r = ChatRenderer::new(config);
    let ingress = r.ingress();
    r.cache()
        .insert("emote/a", pixels(), Vec::new(), Duration::ZERO);
    r.cache()
        .insert("emote/b", pixels(), Vec::new(), Duration::ZERO);

    ingress.enqueue_message(msg_with_glyphs(
        "u",
        "AB",
        vec![
            GlyphRef::emote("emote/a", 0, 1),
            GlyphRef::emote("emote/b", 1, 2),
        ],
    ));
    good_tick(&mut r);
    good_tick(&mut r);

    let slot = r.ring().slots().iter().find(|s| !s.is_empty()).unwrap();
    assert!(slot.rendered);
    assert_eq!(slot.overlays.len(), 1);
    assert_eq!(r.stats().pool_exhausted, 1);
    assert_eq!(slot.message.as_ref().unwrap().text, "AB");
}

#[test]
fn test_purge_mid_staging_discards_stale_attach() {
    let mut r = renderer(2);
    let ingress = r.ingress();
    r.cache()
        .insert("emote/kappa", pixels(), Vec::new(), Duration::ZERO);

    ingress.enqueue_message(msg_with_glyphs(
        "troll",
        "gone soon Kappa",
        vec![GlyphRef::emote("emote/kappa", 10, 15)],
    ));
    good_tick(&mut r); // admitted, staging suspended

    ingress.request_purge("troll");
    good_tick(&mut r); // purge first, then staging sees a changed slot

    assert_eq!(r.stats().stale_attaches, 1);
    assert_eq!(slot_texts(&r), vec![DELETED_MARKER]);
    let slot = r.ring().slots().iter().find(|s| !s.is_empty()).unwrap();
    assert!(!slot.rendered);
    assert!(slot.overlays.is_empty());
    assert_eq!(r.pool().in_use(), 0);
}

#[test]
fn test_frame_hold_delays_next_admission() {
    let mut config = test_config(2);
    config.frame_hold_ticks = 2;
    let mut r = ChatRenderer::new(config);
    let ingress = r.ingress();
    ingress.enqueue_message(msg("u", "first"));
    ingress.enqueue_message(msg("u", "second"));

    good_tick(&mut r); // admit "second" (LIFO)
    good_tick(&mut r); // step B, hold starts
    good_tick(&mut r); // hold 2 -> 1
    good_tick(&mut r); // hold 1 -> 0
    assert_eq!(r.stats().admitted, 1);

    good_tick(&mut r); // hold over, admit "first"
    assert_eq!(r.stats().admitted, 2);
}

#[test]
fn test_newest_first_ordering_inserts_at_top() {
    let mut config = test_config(2);
    config.reverse_chat_order = true;
    let mut r = ChatRenderer::new(config);
    let ingress = r.ingress();
    ingress.enqueue_message(msg("u", "A"));
    ingress.enqueue_message(msg("u", "B"));
    for _ in 0..3 {
        good_tick(&mut r);
    }
    // B admitted first (LIFO), then A on top of it.
    assert_eq!(slot_texts(&r), vec!["A", "B"]);
}

#[test]
fn test_config_change_applies_on_next_tick() {
    let mut r = renderer(2);
    let ingress = r.ingress();
    ingress.enqueue_message(msg("u", "hello"));
    good_tick(&mut r);
    good_tick(&mut r);

    r.set_config(test_config(4));
    assert_eq!(r.ring().len(), 2);
    good_tick(&mut r);
    assert_eq!(r.ring().len(), 4);
    // Surviving content reflows into the grown ring.
    assert_eq!(slot_texts(&r), vec!["hello"]);
    assert!(r.bounds().height > 0.0);
}

#[test]
fn test_config_grow_keeps_newest_first_messages() {
    let mut config = test_config(2);
    config.reverse_chat_order = true;
    let mut r = ChatRenderer::new(config);
    let ingress = r.ingress();
    ingress.enqueue_message(msg("u", "A"));
    ingress.enqueue_message(msg("u", "B"));
    for _ in 0..4 {
        good_tick(&mut r);
    }
    assert_eq!(slot_texts(&r), vec!["A", "B"]);

    // Growing the ring adds empty slots at the eviction end; the next
    // admission must recycle one of those, not a live message.
    let mut grown = test_config(4);
    grown.reverse_chat_order = true;
    r.set_config(grown);
    ingress.enqueue_message(msg("u", "C"));
    good_tick(&mut r);

    assert_eq!(r.ring().len(), 4);
    assert_eq!(r.ring().non_empty_count(), 3);
    assert_eq!(slot_texts(&r), vec!["C", "A", "B"]);
}

#[test]
fn test_animation_advances_visible_sprites() {
    let mut r = renderer(2);
    let ingress = r.ingress();
    r.cache().insert(
        "emote/spin",
        pixels(),
        sheet_frames(16),
        Duration::from_millis(20),
    );

    ingress.enqueue_message(msg_with_glyphs(
        "u",
        "spin",
        vec![GlyphRef::emote("emote/spin", 0, 4)],
    ));
    good_tick(&mut r);
    good_tick(&mut r);

    let overlay_frame = |r: &ChatRenderer| {
        let slot = r.ring().slots().iter().find(|s| !s.is_empty()).unwrap();
        let handle = slot.overlays[0].handle;
        r.pool().get(handle).unwrap().frame_index
    };
    assert_eq!(overlay_frame(&r), 0);

    // Let the per-frame delay elapse; the next tick advances the sprite.
    std::thread::sleep(Duration::from_millis(30));
    good_tick(&mut r);
    assert!(overlay_frame(&r) > 0);
}
