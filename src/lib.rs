//! Chat overlay rendering pipeline.
//!
//! Renders a stream of chat messages with inline image glyphs (emotes and
//! badges) onto a fixed set of display slots under a per-frame time budget.
//! Producers (message parsing, image downloads) hand off through thread-safe
//! queues; a single consumer ticks once per display frame, admitting at most
//! one message, staging its overlays over two cooperative steps, and skipping
//! work entirely when the frame budget is missed.

pub mod animation;
pub mod config;
pub mod display;
pub mod error;
pub mod layout;
pub mod lists;
pub mod message;
pub mod pool;
pub mod queue;
pub mod scheduler;
pub mod texture;

pub use config::ChatConfig;
pub use error::{Error, Result};
pub use message::{ChatMessage, ChatUser, GlyphKind, GlyphRef};
pub use queue::ChatIngress;
pub use scheduler::{ChatRenderer, RenderStats};
