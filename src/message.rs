//! Chat message records and the glyph references they carry.
//!
//! Records are built by the ingestion collaborator (IRC parsing is out of
//! scope) and are immutable once enqueued, except for the purge path which
//! rewrites the text to a redaction marker.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Mint a process-unique message id.
pub fn next_message_id() -> u64 {
    NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Author identity attached to every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    /// Stable user id (purge requests match on this).
    pub id: String,
    /// Name shown in the overlay.
    pub display_name: String,
    /// Author color as "#rrggbb".
    pub color: String,
}

impl ChatUser {
    pub fn new(id: &str, display_name: &str, color: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            color: color.to_string(),
        }
    }
}

/// Whether a glyph is a channel badge or an inline emote.
///
/// Badges are overlaid before emotes when a message is staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphKind {
    Badge,
    Emote,
}

/// One inline image occurrence inside a message.
#[derive(Debug, Clone)]
pub struct GlyphRef {
    /// Opaque texture key, resolved through the texture cache.
    pub key: String,
    pub kind: GlyphKind,
    /// Character range the glyph replaces in the raw text.
    pub start: usize,
    pub end: usize,
}

impl GlyphRef {
    pub fn badge(key: &str) -> Self {
        Self {
            key: key.to_string(),
            kind: GlyphKind::Badge,
            start: 0,
            end: 0,
        }
    }

    pub fn emote(key: &str, start: usize, end: usize) -> Self {
        Self {
            key: key.to_string(),
            kind: GlyphKind::Emote,
            start,
            end,
        }
    }
}

/// A parsed chat message, ready for admission into the display ring.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: u64,
    pub author: ChatUser,
    pub text: String,
    /// Glyph occurrences in text order.
    pub glyphs: Vec<GlyphRef>,
}

impl ChatMessage {
    pub fn new(author: ChatUser, text: &str, glyphs: Vec<GlyphRef>) -> Self {
        Self {
            id: next_message_id(),
            author,
            text: text.to_string(),
            glyphs,
        }
    }

    /// The styled line shown in a slot: author name prefix plus text.
    pub fn display_line(&self) -> String {
        if self.author.display_name.is_empty() {
            self.text.clone()
        } else {
            format!("{}: {}", self.author.display_name, self.text)
        }
    }

    /// Glyphs in overlay order: badges first, then emotes.
    pub fn glyphs_in_overlay_order(&self) -> impl Iterator<Item = (usize, &GlyphRef)> {
        let badges = self
            .glyphs
            .iter()
            .enumerate()
            .filter(|(_, g)| g.kind == GlyphKind::Badge);
        let emotes = self
            .glyphs
            .iter()
            .enumerate()
            .filter(|(_, g)| g.kind == GlyphKind::Emote);
        badges.chain(emotes)
    }
}
