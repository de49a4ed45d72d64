//! Overlay configuration persistence.
//!
//! Display parameters (slot count, ordering, scale, spacing) and pipeline
//! tuning (pool capacity, frame hold, fps margin) as JSON at
//! `~/.local/share/chat-overlay/config.json`. Loaded once on startup; saved
//! on every change so the file is always current.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default config file path.
fn default_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chat-overlay")
        .join("config.json")
}

/// Persisted overlay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Number of display slots.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// Overall scale factor applied to text and glyph metrics.
    #[serde(default = "default_scale")]
    pub chat_scale: f32,
    /// Wrap width of a message line, pre-scale.
    #[serde(default = "default_width")]
    pub chat_width: f32,
    /// Vertical gap between messages.
    #[serde(default = "default_spacing")]
    pub message_spacing: f32,
    /// Padding added around the message block.
    #[serde(default = "default_padding")]
    pub background_padding: f32,
    /// false: newest message at the bottom (oldest slot evicted first);
    /// true: newest message at the top (last slot evicted first).
    #[serde(default)]
    pub reverse_chat_order: bool,
    /// Fixed sprite pool size shared by all slots.
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
    /// Ticks to hold off admission after a message finishes staging.
    #[serde(default = "default_frame_hold")]
    pub frame_hold_ticks: u32,
    /// Display refresh rate the backpressure check measures against.
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: f32,
    /// Admission is skipped while measured fps < refresh_rate - fps_margin.
    #[serde(default = "default_fps_margin")]
    pub fps_margin: f32,
    /// Message text color as "#rrggbb".
    #[serde(default = "default_text_color")]
    pub text_color: String,
    /// Background color as "#rrggbbaa".
    #[serde(default = "default_background_color")]
    pub background_color: String,
    /// Path the config was loaded from (not serialized).
    #[serde(skip)]
    path: PathBuf,
}

fn default_max_messages() -> usize { 20 }
fn default_scale() -> f32 { 1.0 }
fn default_width() -> f32 { 160.0 }
fn default_spacing() -> f32 { 1.5 }
fn default_padding() -> f32 { 4.0 }
fn default_pool_capacity() -> usize { 50 }
fn default_frame_hold() -> u32 { 3 }
fn default_refresh_rate() -> f32 { 60.0 }
fn default_fps_margin() -> f32 { 5.0 }
fn default_text_color() -> String { "#ffffff".into() }
fn default_background_color() -> String { "#00000060".into() }

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            chat_scale: default_scale(),
            chat_width: default_width(),
            message_spacing: default_spacing(),
            background_padding: default_padding(),
            reverse_chat_order: false,
            pool_capacity: default_pool_capacity(),
            frame_hold_ticks: default_frame_hold(),
            refresh_rate: default_refresh_rate(),
            fps_margin: default_fps_margin(),
            text_color: default_text_color(),
            background_color: default_background_color(),
            path: default_path(),
        }
    }
}

impl ChatConfig {
    /// Load from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let path = default_path();
        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        };
        config.path = path;
        config
    }

    /// Persist current config to disk.
    pub fn save(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = std::fs::write(&self.path, json);
        }
    }

    /// The minimum fps below which admission is skipped.
    pub fn fps_floor(&self) -> f32 {
        self.refresh_rate - self.fps_margin
    }
}
