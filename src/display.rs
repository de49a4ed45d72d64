//! Display ring: the fixed set of message slots and their pooled sprites.
//!
//! All mutation happens on the render thread. Slots own their overlay
//! handles; every path that replaces or redacts a slot's message returns the
//! handles to the pool first, so a sprite is never referenced by two slots.

use crate::config::ChatConfig;
use crate::layout;
use crate::message::{ChatMessage, GlyphKind, GlyphRef};
use crate::pool::{ObjectPool, PoolHandle};
use crate::texture::{FrameRect, TextureCache};
use tracing::{debug, warn};

/// Text shown in place of a purged message.
pub const DELETED_MARKER: &str = "<message deleted>";

/// One on-screen glyph instance, pooled and reused.
#[derive(Debug, Clone)]
pub struct GlyphSprite {
    /// Texture key currently displayed; empty while free.
    pub key: String,
    pub visible: bool,
    /// Sub-rectangle of the texture sheet currently shown.
    pub frame_rect: FrameRect,
    pub frame_index: usize,
    /// Position relative to the owning slot's origin.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for GlyphSprite {
    fn default() -> Self {
        Self {
            key: String::new(),
            visible: false,
            frame_rect: FrameRect::FULL,
            frame_index: 0,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

/// Pool reset callback: clear the displayed texture and hide the sprite.
pub fn reset_sprite(sprite: &mut GlyphSprite) {
    *sprite = GlyphSprite::default();
}

/// Convenience constructor for the sprite pool the ring expects.
pub fn sprite_pool(capacity: usize) -> ObjectPool<GlyphSprite> {
    ObjectPool::new(capacity, |_| GlyphSprite::default(), reset_sprite)
}

/// A slot-owned reference to a pooled sprite.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub handle: PoolHandle,
    pub key: String,
    /// Index into the message's glyph list, so fan-out updates don't attach
    /// the same occurrence twice.
    pub glyph_index: usize,
}

/// One of the ring's fixed display slots.
#[derive(Debug, Default)]
pub struct MessageSlot {
    pub message: Option<ChatMessage>,
    /// True once overlay staging finished for the current message.
    pub rendered: bool,
    pub overlays: Vec<Overlay>,
    /// Bumped on every content change; staging validates against it so a
    /// late attach for a replaced or purged message is discarded.
    pub generation: u64,
    /// Vertical offset assigned by the last reflow.
    pub y_offset: f32,
    /// Measured height assigned by the last reflow.
    pub height: f32,
}

impl MessageSlot {
    pub fn is_empty(&self) -> bool {
        self.message.is_none()
    }
}

/// Counters produced by an attach pass, folded into the scheduler's stats.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AttachOutcome {
    pub attached: usize,
    pub misses: usize,
    pub exhausted: usize,
}

impl AttachOutcome {
    fn merge(&mut self, other: AttachOutcome) {
        self.attached += other.attached;
        self.misses += other.misses;
        self.exhausted += other.exhausted;
    }
}

/// Fixed ring of message slots in display order (index 0 at the top).
#[derive(Debug)]
pub struct DisplayRing {
    slots: Vec<MessageSlot>,
}

impl DisplayRing {
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count).map(|_| MessageSlot::default()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[MessageSlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [MessageSlot] {
        &mut self.slots
    }

    pub fn slot(&self, idx: usize) -> Option<&MessageSlot> {
        self.slots.get(idx)
    }

    pub fn non_empty_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    /// Total overlays across slots for one texture key.
    pub fn overlay_count_for_key(&self, key: &str) -> usize {
        self.slots
            .iter()
            .flat_map(|s| &s.overlays)
            .filter(|o| o.key == key)
            .count()
    }

    /// Grow or shrink the slot set on a config change, releasing the sprites
    /// of any dropped slots first.
    ///
    /// Changes happen at the eviction end (front for newest-last ordering,
    /// back for newest-first), so shrinking drops the oldest messages and new
    /// empty slots are the next ones `admit` recycles.
    pub fn resize(
        &mut self,
        count: usize,
        reverse_order: bool,
        pool: &mut ObjectPool<GlyphSprite>,
    ) {
        while self.slots.len() > count {
            let removed = if reverse_order {
                self.slots.pop()
            } else {
                Some(self.slots.remove(0))
            };
            let Some(mut slot) = removed else { break };
            release_slot_overlays(&mut slot, pool);
        }
        while self.slots.len() < count {
            if reverse_order {
                self.slots.push(MessageSlot::default());
            } else {
                self.slots.insert(0, MessageSlot::default());
            }
        }
    }

    /// Move a queued message into the insertion slot.
    ///
    /// The eviction slot is recycled by rotation: with newest-last ordering
    /// the top slot moves to the bottom, with newest-first the bottom slot
    /// moves to the top. Its previous sprites go back to the pool before the
    /// new record is installed.
    pub fn admit(
        &mut self,
        message: ChatMessage,
        reverse_order: bool,
        pool: &mut ObjectPool<GlyphSprite>,
    ) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = if reverse_order {
            let mut slot = self.slots.pop()?;
            release_slot_overlays(&mut slot, pool);
            self.slots.insert(0, slot);
            0
        } else {
            let mut slot = self.slots.remove(0);
            release_slot_overlays(&mut slot, pool);
            self.slots.push(slot);
            self.slots.len() - 1
        };
        let slot = &mut self.slots[idx];
        slot.message = Some(message);
        slot.rendered = false;
        slot.generation += 1;
        Some(idx)
    }

    /// Redact every slot whose author matches `user_id`.
    ///
    /// Sprites are released, text is rewritten to the deletion marker (the
    /// author line is kept), glyphs are dropped and the slot is marked
    /// unrendered so no later image completion can re-illuminate it.
    /// Returns the number of slots touched.
    pub fn purge(&mut self, user_id: &str, pool: &mut ObjectPool<GlyphSprite>) -> usize {
        let mut touched = 0;
        for slot in &mut self.slots {
            let Some(message) = &mut slot.message else {
                continue;
            };
            if message.author.id != user_id {
                continue;
            }
            message.text = DELETED_MARKER.to_string();
            message.glyphs.clear();
            release_slot_overlays(slot, pool);
            slot.rendered = false;
            slot.generation += 1;
            touched += 1;
        }
        touched
    }

    /// Attach every resolvable glyph of the slot's message (badges before
    /// emotes). Cache misses are deferred, pool exhaustion skips the glyph.
    pub fn attach_overlays(
        &mut self,
        idx: usize,
        cache: &TextureCache,
        pool: &mut ObjectPool<GlyphSprite>,
        config: &ChatConfig,
    ) -> AttachOutcome {
        let mut outcome = AttachOutcome::default();
        let Some(slot) = self.slots.get_mut(idx) else {
            return outcome;
        };
        let Some(message) = slot.message.clone() else {
            return outcome;
        };
        let mut badge_ordinal = 0;
        for (glyph_index, glyph) in message.glyphs_in_overlay_order() {
            // Ordinals count every badge occurrence, attached or not, so a
            // re-run over a partially overlaid slot keeps gutter positions.
            let ordinal = badge_ordinal;
            if glyph.kind == GlyphKind::Badge {
                badge_ordinal += 1;
            }
            if slot.overlays.iter().any(|o| o.glyph_index == glyph_index) {
                continue;
            }
            outcome.merge(attach_one(slot, glyph_index, glyph, ordinal, cache, pool, config));
        }
        outcome
    }

    /// Fan-out attach after an image completion: every rendered slot whose
    /// message references `key` and has no overlay for that occurrence yet
    /// gets one. A late fetch can retroactively illuminate an older message.
    pub fn attach_by_key(
        &mut self,
        key: &str,
        cache: &TextureCache,
        pool: &mut ObjectPool<GlyphSprite>,
        config: &ChatConfig,
    ) -> AttachOutcome {
        let mut outcome = AttachOutcome::default();
        for slot in &mut self.slots {
            if !slot.rendered {
                continue;
            }
            let Some(message) = slot.message.clone() else {
                continue;
            };
            let mut badge_ordinal = 0;
            for (glyph_index, glyph) in message.glyphs_in_overlay_order() {
                let ordinal = badge_ordinal;
                if glyph.kind == GlyphKind::Badge {
                    badge_ordinal += 1;
                }
                if glyph.key != key {
                    continue;
                }
                if slot.overlays.iter().any(|o| o.glyph_index == glyph_index) {
                    continue;
                }
                outcome.merge(attach_one(slot, glyph_index, glyph, ordinal, cache, pool, config));
            }
        }
        outcome
    }

    /// Release every overlay of `key` across all slots. Used when a static
    /// entry is upgraded to animated and must be re-attached.
    pub fn detach_key(&mut self, key: &str, pool: &mut ObjectPool<GlyphSprite>) -> usize {
        let mut released = 0;
        for slot in &mut self.slots {
            slot.overlays.retain(|overlay| {
                if overlay.key == key {
                    pool.release(overlay.handle);
                    released += 1;
                    false
                } else {
                    true
                }
            });
        }
        released
    }

    /// Point every sprite showing `key` at the new animation frame.
    pub fn apply_frame_advance(
        &mut self,
        key: &str,
        frame_index: usize,
        cache: &TextureCache,
        pool: &mut ObjectPool<GlyphSprite>,
    ) {
        let Some(entry) = cache.get(key) else {
            return;
        };
        let Some(rect) = entry.frames.get(frame_index) else {
            return;
        };
        for slot in &self.slots {
            for overlay in &slot.overlays {
                if overlay.key != key {
                    continue;
                }
                if let Some(sprite) = pool.get_mut(overlay.handle) {
                    sprite.frame_index = frame_index;
                    sprite.frame_rect = *rect;
                }
            }
        }
    }

    /// Release all sprites owned by slot `idx`.
    pub fn release_overlays(&mut self, idx: usize, pool: &mut ObjectPool<GlyphSprite>) {
        if let Some(slot) = self.slots.get_mut(idx) {
            release_slot_overlays(slot, pool);
        }
    }
}

fn release_slot_overlays(slot: &mut MessageSlot, pool: &mut ObjectPool<GlyphSprite>) {
    for overlay in slot.overlays.drain(..) {
        pool.release(overlay.handle);
    }
}

/// Bind one glyph occurrence to a pooled sprite on `slot`.
fn attach_one(
    slot: &mut MessageSlot,
    glyph_index: usize,
    glyph: &GlyphRef,
    badge_ordinal: usize,
    cache: &TextureCache,
    pool: &mut ObjectPool<GlyphSprite>,
    config: &ChatConfig,
) -> AttachOutcome {
    let mut outcome = AttachOutcome::default();
    if glyph.key.is_empty() {
        debug!(glyph_index, "skipping malformed glyph with empty key");
        return outcome;
    }
    let Some(entry) = cache.get(&glyph.key) else {
        debug!(key = %glyph.key, "texture not cached yet, overlay deferred");
        outcome.misses += 1;
        return outcome;
    };
    let handle = match pool.acquire() {
        Ok(handle) => handle,
        Err(err) => {
            warn!(key = %glyph.key, %err, "sprite pool exhausted, glyph dropped");
            outcome.exhausted += 1;
            return outcome;
        }
    };
    let (x, y) = match glyph.kind {
        GlyphKind::Badge => layout::badge_position(badge_ordinal, config),
        GlyphKind::Emote => layout::glyph_position(glyph.start, config),
    };
    let size = layout::glyph_size(config);
    if let Some(sprite) = pool.get_mut(handle) {
        sprite.key = glyph.key.clone();
        sprite.visible = true;
        sprite.frame_rect = entry.frames[0];
        sprite.frame_index = 0;
        sprite.x = x;
        sprite.y = y;
        sprite.width = size;
        sprite.height = size;
    }
    slot.overlays.push(Overlay {
        handle,
        key: glyph.key.clone(),
        glyph_index,
    });
    outcome.attached += 1;
    outcome
}
