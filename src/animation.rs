//! Animation driver for multi-frame textures.
//!
//! Cache entries with more than one frame register here. The scheduler calls
//! [`AnimationController::tick`] once per display frame; entries whose delay
//! has elapsed advance their frame index and report the change so slots
//! showing that key can switch rectangles. Deadlines are tracked with
//! `Instant`, so delay accuracy does not depend on the tick rate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Registration handle returned by [`AnimationController::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimId(u64);

#[derive(Debug)]
struct AnimEntry {
    key: String,
    frame_count: usize,
    delay: Duration,
    frame_index: usize,
    next_due: Instant,
}

/// A frame-index change produced by a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameAdvance {
    pub key: String,
    pub frame_index: usize,
}

/// Shared driver for all animated cache entries.
///
/// Registration happens from the image-completion thread (via the cache's
/// insertion path) while ticking happens on the render thread, so the entry
/// table sits behind a mutex.
#[derive(Debug, Default)]
pub struct AnimationController {
    entries: Mutex<HashMap<u64, AnimEntry>>,
    next_id: AtomicU64,
}

/// Floor for per-frame delay so a zero-delay entry cannot spin the
/// catch-up loop.
const MIN_DELAY: Duration = Duration::from_millis(1);

impl AnimationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an animated texture. `frame_count` must be > 1.
    pub fn register(&self, key: &str, frame_count: usize, delay: Duration) -> AnimId {
        debug_assert!(frame_count > 1);
        let delay = delay.max(MIN_DELAY);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().unwrap().insert(
            id,
            AnimEntry {
                key: key.to_string(),
                frame_count,
                delay,
                frame_index: 0,
                next_due: Instant::now() + delay,
            },
        );
        AnimId(id)
    }

    /// Drop an entry's bookkeeping. Unknown ids are ignored, so callers on
    /// release/overwrite paths never have to check liveness first.
    pub fn unregister(&self, id: AnimId) {
        self.entries.lock().unwrap().remove(&id.0);
    }

    /// Advance every due entry and return the keys whose frame changed.
    pub fn tick(&self, now: Instant) -> Vec<FrameAdvance> {
        let mut entries = self.entries.lock().unwrap();
        let mut advanced = Vec::new();
        for entry in entries.values_mut() {
            if now < entry.next_due {
                continue;
            }
            // Catch up on missed deadlines without emitting intermediates.
            while now >= entry.next_due {
                entry.frame_index = (entry.frame_index + 1) % entry.frame_count;
                entry.next_due += entry.delay;
            }
            advanced.push(FrameAdvance {
                key: entry.key.clone(),
                frame_index: entry.frame_index,
            });
        }
        advanced
    }

    /// Current frame index for a registration, if still live.
    pub fn current_frame(&self, id: AnimId) -> Option<usize> {
        self.entries.lock().unwrap().get(&id.0).map(|e| e.frame_index)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advances_after_delay() {
        let driver = AnimationController::new();
        let start = Instant::now();
        let id = driver.register("emote/party", 4, Duration::from_millis(10));

        assert!(driver.tick(start).is_empty());

        let advances = driver.tick(start + Duration::from_millis(15));
        assert_eq!(advances.len(), 1);
        assert_eq!(advances[0].key, "emote/party");
        assert_eq!(advances[0].frame_index, 1);
        assert_eq!(driver.current_frame(id), Some(1));
    }

    #[test]
    fn test_wraps_around_frame_count() {
        let driver = AnimationController::new();
        let start = Instant::now();
        driver.register("emote/spin", 2, Duration::from_millis(10));

        // Two delays elapsed in one tick: 0 -> 1 -> 0, single notification.
        let advances = driver.tick(start + Duration::from_millis(25));
        assert_eq!(advances.len(), 1);
        assert_eq!(advances[0].frame_index, 0);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let driver = AnimationController::new();
        let id = driver.register("emote/x", 2, Duration::from_millis(10));
        driver.unregister(id);
        driver.unregister(id);
        assert!(driver.is_empty());
        assert_eq!(driver.current_frame(id), None);
    }

    #[test]
    fn test_zero_delay_is_clamped() {
        let driver = AnimationController::new();
        let start = Instant::now();
        driver.register("emote/fast", 3, Duration::ZERO);
        // Must terminate; index after catch-up is unspecified but valid.
        let advances = driver.tick(start + Duration::from_millis(5));
        assert_eq!(advances.len(), 1);
        assert!(advances[0].frame_index < 3);
    }
}
