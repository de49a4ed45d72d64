//! The per-frame control loop.
//!
//! [`ChatRenderer::tick`] runs once per display frame, driven by whatever
//! fixed-rate source the host supplies. Phase order within a tick is strict:
//!
//! 1. apply a deferred configuration change
//! 2. drain purge requests (always, even on held or backpressured ticks)
//! 3. animation upkeep
//! 4. frame hold countdown
//! 5. backpressure check — under budget pressure no message is admitted and
//!    no new overlay work begins
//! 6. texture-ready completions (detach upgraded keys, fan-out attach)
//! 7. overlay staging step B for the message admitted on an earlier tick
//! 8. admission of exactly one queued message (step A), yielding until the
//!    next tick so the host can compute text metrics
//!
//! Only one message is ever mid-render; admission waits for staging to
//! finish. Nothing in here blocks on I/O and no phase can abort the tick.

use crate::animation::AnimationController;
use crate::config::ChatConfig;
use crate::display::{self, AttachOutcome, DisplayRing, GlyphSprite};
use crate::layout::{self, ContainerBounds};
use crate::pool::ObjectPool;
use crate::queue::ChatIngress;
use crate::texture::{InsertOutcome, TextureCache};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Observability counters for validating behavior under load.
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderStats {
    /// Messages moved into the ring.
    pub admitted: u64,
    /// Slots redacted by purge requests.
    pub purged: u64,
    /// Ticks where admission was skipped under frame-time pressure.
    pub skipped_ticks: u64,
    /// Glyphs attached from a warm cache.
    pub cache_hits: u64,
    /// Glyph lookups deferred to a later image completion.
    pub cache_misses: u64,
    /// Glyphs dropped because the sprite pool was exhausted.
    pub pool_exhausted: u64,
    /// Staging completions discarded because the slot changed underneath.
    pub stale_attaches: u64,
}

/// Overlay-staging state machine. `TextAttached` is the suspension point
/// between step A (text installed at admission) and step B (glyph overlays).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    TextAttached { slot: usize, generation: u64 },
}

/// The rendering consumer: owns the ring, the sprite pool and the staging
/// state, and pulls from the ingress queues once per tick.
pub struct ChatRenderer {
    config: ChatConfig,
    pending_config: Option<ChatConfig>,
    ring: DisplayRing,
    pool: ObjectPool<GlyphSprite>,
    animations: Arc<AnimationController>,
    ingress: Arc<ChatIngress>,
    stage: Stage,
    hold_ticks: u32,
    bounds: ContainerBounds,
    stats: RenderStats,
}

impl ChatRenderer {
    pub fn new(config: ChatConfig) -> Self {
        let animations = Arc::new(AnimationController::new());
        let cache = Arc::new(TextureCache::new(animations.clone()));
        let ingress = Arc::new(ChatIngress::new(cache));
        let ring = DisplayRing::new(config.max_messages);
        let pool = display::sprite_pool(config.pool_capacity);
        info!(
            slots = config.max_messages,
            pool = config.pool_capacity,
            "chat renderer initialized"
        );
        Self {
            config,
            pending_config: None,
            ring,
            pool,
            animations,
            ingress,
            stage: Stage::Idle,
            hold_ticks: 0,
            bounds: ContainerBounds::default(),
            stats: RenderStats::default(),
        }
    }

    /// The thread-safe surface producers push into.
    pub fn ingress(&self) -> Arc<ChatIngress> {
        self.ingress.clone()
    }

    pub fn cache(&self) -> Arc<TextureCache> {
        self.ingress.cache().clone()
    }

    pub fn ring(&self) -> &DisplayRing {
        &self.ring
    }

    pub fn pool(&self) -> &ObjectPool<GlyphSprite> {
        &self.pool
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn bounds(&self) -> ContainerBounds {
        self.bounds
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Stage a configuration change; it takes effect at the start of the
    /// next tick (full reflow plus pool revalidation).
    pub fn set_config(&mut self, config: ChatConfig) {
        self.pending_config = Some(config);
    }

    /// Run one frame. `frame_delta` is the measured time of the previous
    /// frame, used for the backpressure check.
    pub fn tick(&mut self, now: Instant, frame_delta: Duration) {
        if let Some(config) = self.pending_config.take() {
            self.apply_config(config);
        }

        // Purge before anything else so a just-deleted message can never be
        // visually reprocessed in the same tick.
        let mut purged = 0;
        for user_id in self.ingress.drain_purges() {
            purged += self.ring.purge(&user_id, &mut self.pool);
        }
        if purged > 0 {
            self.stats.purged += purged as u64;
            self.bounds = layout::reflow(self.ring.slots_mut(), &self.config);
        }

        // Animation upkeep runs even on held or backpressured ticks.
        let cache = self.ingress.cache().clone();
        for advance in self.animations.tick(now) {
            self.ring
                .apply_frame_advance(&advance.key, advance.frame_index, &cache, &mut self.pool);
        }

        if self.hold_ticks > 0 {
            self.hold_ticks -= 1;
            return;
        }

        // Backpressure: bound per-frame cost by trading display latency.
        let fps = 1.0 / frame_delta.as_secs_f32().max(f32::EPSILON);
        if fps < self.config.fps_floor() {
            self.stats.skipped_ticks += 1;
            return;
        }

        // Image completions since the last opportunity. An upgraded entry
        // detaches its stale static overlays before the fan-out re-attach.
        for ready in self.ingress.drain_ready() {
            if ready.outcome == InsertOutcome::UpgradedFromStatic {
                let released = self.ring.detach_key(&ready.key, &mut self.pool);
                debug!(key = %ready.key, released, "static entry upgraded to animated");
            }
            let outcome = self
                .ring
                .attach_by_key(&ready.key, &cache, &mut self.pool, &self.config);
            self.fold_attach(outcome);
        }

        match self.stage {
            Stage::TextAttached { slot, generation } => {
                self.stage = Stage::Idle;
                let live = self
                    .ring
                    .slot(slot)
                    .is_some_and(|s| s.generation == generation);
                if !live {
                    self.stats.stale_attaches += 1;
                    debug!(slot, "staging target changed mid-render, overlays discarded");
                    return;
                }
                let outcome = self
                    .ring
                    .attach_overlays(slot, &cache, &mut self.pool, &self.config);
                self.fold_attach(outcome);
                if let Some(s) = self.ring.slots_mut().get_mut(slot) {
                    s.rendered = true;
                }
                self.hold_ticks = self.config.frame_hold_ticks;
            }
            Stage::Idle => {
                let Some(message) = self.ingress.pop_message() else {
                    return;
                };
                let reverse = self.config.reverse_chat_order;
                if let Some(idx) = self.ring.admit(message, reverse, &mut self.pool) {
                    self.stats.admitted += 1;
                    // Step A: the styled author line is installed with the
                    // record; reflow now so geometry is consistent before
                    // any image is ready.
                    self.bounds = layout::reflow(self.ring.slots_mut(), &self.config);
                    if let Some(generation) = self.ring.slot(idx).map(|s| s.generation) {
                        self.stage = Stage::TextAttached {
                            slot: idx,
                            generation,
                        };
                    }
                }
            }
        }
    }

    fn fold_attach(&mut self, outcome: AttachOutcome) {
        self.stats.cache_hits += outcome.attached as u64;
        self.stats.cache_misses += outcome.misses as u64;
        self.stats.pool_exhausted += outcome.exhausted as u64;
    }

    fn apply_config(&mut self, config: ChatConfig) {
        let pool_changed = config.pool_capacity != self.config.pool_capacity;
        self.config = config;
        // Any in-flight staging refers to pre-change slot indices.
        self.stage = Stage::Idle;
        self.ring.resize(
            self.config.max_messages,
            self.config.reverse_chat_order,
            &mut self.pool,
        );
        if pool_changed {
            for idx in 0..self.ring.len() {
                self.ring.release_overlays(idx, &mut self.pool);
            }
            self.pool = display::sprite_pool(self.config.pool_capacity);
            let cache = self.ingress.cache().clone();
            for idx in 0..self.ring.len() {
                if self.ring.slot(idx).is_some_and(|s| s.rendered) {
                    let outcome = self
                        .ring
                        .attach_overlays(idx, &cache, &mut self.pool, &self.config);
                    self.fold_attach(outcome);
                }
            }
        }
        self.bounds = layout::reflow(self.ring.slots_mut(), &self.config);
        info!(
            slots = self.config.max_messages,
            pool = self.config.pool_capacity,
            "configuration applied"
        );
    }
}
