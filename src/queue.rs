//! Cross-thread hand-off between producers and the render tick.
//!
//! Three queues feed the scheduler: a LIFO stack of parsed messages (the
//! most recently produced message is shown next — a documented tie-break,
//! not an accident), a FIFO of purge requests, and a FIFO of texture-ready
//! completions. Producers only ever push here or insert into the texture
//! cache; they never touch slots or the sprite pool.

use crate::message::ChatMessage;
use crate::texture::{FrameRect, InsertOutcome, TextureCache, TextureData};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A completed image download, recorded after its cache insert.
#[derive(Debug, Clone)]
pub struct TextureReady {
    pub key: String,
    pub outcome: InsertOutcome,
}

/// Thread-safe ingress surface handed to producer threads.
#[derive(Debug)]
pub struct ChatIngress {
    /// LIFO: renderer pops the newest message first.
    render_queue: Mutex<Vec<ChatMessage>>,
    purge_queue: Mutex<VecDeque<String>>,
    ready_queue: Mutex<VecDeque<TextureReady>>,
    cache: Arc<TextureCache>,
}

impl ChatIngress {
    pub fn new(cache: Arc<TextureCache>) -> Self {
        Self {
            render_queue: Mutex::new(Vec::new()),
            purge_queue: Mutex::new(VecDeque::new()),
            ready_queue: Mutex::new(VecDeque::new()),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<TextureCache> {
        &self.cache
    }

    /// Queue a parsed message for admission.
    pub fn enqueue_message(&self, message: ChatMessage) {
        self.render_queue.lock().unwrap().push(message);
    }

    /// Queue a moderation purge for every visible message by this user.
    pub fn request_purge(&self, user_id: &str) {
        self.purge_queue
            .lock()
            .unwrap()
            .push_back(user_id.to_string());
    }

    /// Image-download completion. Callable from any thread: inserts the full
    /// replacement entry into the cache, then queues the event for the next
    /// tick. Never touches slots synchronously.
    pub fn on_image_ready(
        &self,
        key: &str,
        data: TextureData,
        frames: Vec<FrameRect>,
        delay: Duration,
    ) {
        let outcome = self.cache.insert(key, data, frames, delay);
        self.ready_queue.lock().unwrap().push_back(TextureReady {
            key: key.to_string(),
            outcome,
        });
    }

    /// Pop the most recently enqueued message (LIFO).
    pub fn pop_message(&self) -> Option<ChatMessage> {
        self.render_queue.lock().unwrap().pop()
    }

    pub fn pending_messages(&self) -> usize {
        self.render_queue.lock().unwrap().len()
    }

    /// Take every pending purge request.
    pub fn drain_purges(&self) -> Vec<String> {
        self.purge_queue.lock().unwrap().drain(..).collect()
    }

    /// Take every pending texture-ready event.
    pub fn drain_ready(&self) -> Vec<TextureReady> {
        self.ready_queue.lock().unwrap().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationController;
    use crate::message::ChatUser;

    fn ingress() -> ChatIngress {
        let animations = Arc::new(AnimationController::new());
        ChatIngress::new(Arc::new(TextureCache::new(animations)))
    }

    fn msg(text: &str) -> ChatMessage {
        ChatMessage::new(ChatUser::new("1", "Alice", "#ff0000"), text, vec![])
    }

    #[test]
    fn test_pop_is_lifo() {
        let ingress = ingress();
        ingress.enqueue_message(msg("a"));
        ingress.enqueue_message(msg("b"));
        ingress.enqueue_message(msg("c"));
        assert_eq!(ingress.pop_message().unwrap().text, "c");
        assert_eq!(ingress.pop_message().unwrap().text, "b");
        assert_eq!(ingress.pop_message().unwrap().text, "a");
        assert!(ingress.pop_message().is_none());
    }

    #[test]
    fn test_drain_purges_preserves_all_requests() {
        let ingress = ingress();
        ingress.request_purge("u1");
        ingress.request_purge("u2");
        assert_eq!(ingress.drain_purges(), vec!["u1", "u2"]);
        assert!(ingress.drain_purges().is_empty());
    }

    #[test]
    fn test_on_image_ready_inserts_and_queues() {
        let ingress = ingress();
        let data = TextureData {
            width: 1,
            height: 1,
            pixels: vec![0; 4],
        };
        ingress.on_image_ready("emote/kappa", data, vec![], Duration::ZERO);

        assert!(ingress.cache().contains("emote/kappa"));
        let ready = ingress.drain_ready();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].key, "emote/kappa");
        assert_eq!(ready[0].outcome, InsertOutcome::Inserted);
    }
}
