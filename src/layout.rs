//! Slot layout: vertical offsets, container bounds, glyph placement.
//!
//! Everything here is a pure function of the current slot contents and the
//! configuration. `reflow` runs whenever slot content changes and is
//! idempotent: a second call with unchanged state produces the same offsets.
//!
//! Text metrics are a deterministic wrap estimate (fixed advance width), not
//! a font rasterizer; the host's drawing layer owns real glyph metrics.

use crate::config::ChatConfig;
use crate::display::MessageSlot;

/// Line height of message text at scale 1.0.
pub const LINE_HEIGHT: f32 = 12.0;
/// Fixed character advance at scale 1.0.
const CHAR_WIDTH: f32 = 6.0;
/// Square edge of an overlaid glyph at scale 1.0.
const GLYPH_SIZE: f32 = 10.0;

/// Size of the enclosing background container after a reflow.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainerBounds {
    pub width: f32,
    pub height: f32,
}

/// Characters that fit on one wrapped line.
pub fn chars_per_line(config: &ChatConfig) -> usize {
    let advance = CHAR_WIDTH * config.chat_scale;
    ((config.chat_width / advance).floor() as usize).max(1)
}

/// Estimated height of one message line after wrapping.
pub fn measure_height(text: &str, config: &ChatConfig) -> f32 {
    let chars = text.chars().count().max(1);
    let lines = chars.div_ceil(chars_per_line(config));
    lines as f32 * LINE_HEIGHT * config.chat_scale
}

/// Recompute every slot's offset and the container bounds.
///
/// Walks slots in display order, accumulating a downward-growing offset:
/// slot 0 sits at y = 0 and later slots go negative, matching a top-anchored
/// overlay. Empty slots occupy no space.
pub fn reflow(slots: &mut [MessageSlot], config: &ChatConfig) -> ContainerBounds {
    let mut y = 0.0;
    let mut used = 0.0;
    let mut non_empty = 0;
    for slot in slots.iter_mut() {
        slot.y_offset = y;
        match &slot.message {
            Some(message) => {
                slot.height = measure_height(&message.display_line(), config);
                y -= slot.height + config.message_spacing;
                used += slot.height;
                non_empty += 1;
            }
            None => slot.height = 0.0,
        }
    }
    if non_empty == 0 {
        return ContainerBounds::default();
    }
    let spacing = config.message_spacing * (non_empty - 1) as f32;
    ContainerBounds {
        width: config.chat_width + config.background_padding * 2.0,
        height: used + spacing + config.background_padding * 2.0,
    }
}

/// Position of an emote glyph from its character offset in the text.
pub fn glyph_position(char_start: usize, config: &ChatConfig) -> (f32, f32) {
    let per_line = chars_per_line(config);
    let col = char_start % per_line;
    let row = char_start / per_line;
    (
        col as f32 * CHAR_WIDTH * config.chat_scale,
        -(row as f32 * LINE_HEIGHT * config.chat_scale),
    )
}

/// Badges sit in a gutter left of the author line, newest ordinal leftmost.
pub fn badge_position(ordinal: usize, config: &ChatConfig) -> (f32, f32) {
    let size = glyph_size(config);
    (-((ordinal + 1) as f32 * (size + 1.0)), 0.0)
}

/// Edge length of an overlaid glyph sprite.
pub fn glyph_size(config: &ChatConfig) -> f32 {
    GLYPH_SIZE * config.chat_scale
}
