//! Keyed texture cache with animation metadata.
//!
//! Entries are inserted by the image-download collaborator (any thread) and
//! read by the render thread. An insert always writes a full replacement
//! entry, never partial state; concurrent writers race last-writer-wins per
//! key. Entries with more than one frame are registered with the
//! [`AnimationController`]; overwriting a single-frame entry with a
//! multi-frame one is reported so the display ring can detach the stale
//! static overlays and re-attach against the richer entry.
//!
//! There is no eviction here. Bounding the cache is the downloader's
//! problem.

use crate::animation::{AnimId, AnimationController};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Decoded RGBA pixel data.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>, // RGBA
}

/// One animation frame's sub-rectangle inside the texture sheet, in
/// normalized [0, 1] coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FrameRect {
    /// The full-texture rectangle, used for static entries.
    pub const FULL: FrameRect = FrameRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };
}

/// A cached texture plus its animation bookkeeping.
#[derive(Debug, Clone)]
pub struct CachedTexture {
    pub data: Arc<TextureData>,
    /// One rect per animation frame; a single entry means "static".
    pub frames: Vec<FrameRect>,
    /// Delay between animation frames (meaningful iff animated).
    pub delay: Duration,
    /// Present iff `frames.len() > 1`.
    pub anim: Option<AnimId>,
}

impl CachedTexture {
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }
}

/// What an insert did to the keyed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No previous entry for this key.
    Inserted,
    /// Replaced a previous entry of the same shape.
    Replaced,
    /// Replaced a single-frame entry with a multi-frame one. The display
    /// ring must detach single-frame overlays of this key before the
    /// fan-out re-attach.
    UpgradedFromStatic,
}

/// Concurrent texture store shared by producers and the renderer.
#[derive(Debug)]
pub struct TextureCache {
    entries: RwLock<HashMap<String, CachedTexture>>,
    animations: Arc<AnimationController>,
}

impl TextureCache {
    pub fn new(animations: Arc<AnimationController>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            animations,
        }
    }

    /// Read-only lookup; no side effects. The clone is cheap — pixel data
    /// sits behind an `Arc`.
    pub fn get(&self, key: &str) -> Option<CachedTexture> {
        self.entries.read().unwrap().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Insert or overwrite the entry for `key` as one atomic replacement.
    ///
    /// An empty `frames` list is treated as a single full-texture frame.
    pub fn insert(
        &self,
        key: &str,
        data: TextureData,
        frames: Vec<FrameRect>,
        delay: Duration,
    ) -> InsertOutcome {
        let frames = if frames.is_empty() {
            vec![FrameRect::FULL]
        } else {
            frames
        };

        let new_len = frames.len();
        let anim = if frames.len() > 1 {
            Some(self.animations.register(key, frames.len(), delay))
        } else {
            None
        };

        let entry = CachedTexture {
            data: Arc::new(data),
            frames,
            delay,
            anim,
        };

        let previous = self.entries.write().unwrap().insert(key.to_string(), entry);
        match previous {
            None => InsertOutcome::Inserted,
            Some(old) => {
                if let Some(old_anim) = old.anim {
                    self.animations.unregister(old_anim);
                }
                if old.frames.len() == 1 && new_len > 1 {
                    InsertOutcome::UpgradedFromStatic
                } else {
                    InsertOutcome::Replaced
                }
            }
        }
    }
}

/// Decode downloaded image bytes into RGBA texture data.
///
/// Runs on the downloader's thread, never the render thread.
pub fn decode(bytes: &[u8]) -> crate::error::Result<TextureData> {
    let img = image::load_from_memory(bytes)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(TextureData {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

/// Evenly split a horizontal sprite sheet into `count` frame rects.
pub fn sheet_frames(count: usize) -> Vec<FrameRect> {
    if count <= 1 {
        return vec![FrameRect::FULL];
    }
    let step = 1.0 / count as f32;
    (0..count)
        .map(|i| FrameRect {
            x: i as f32 * step,
            y: 0.0,
            width: step,
            height: 1.0,
        })
        .collect()
}
