//! Keyboard and pointer capture relayed to the backend.
//!
//! Host events come in as [`InputEvent`]s, whoever produces them; the relay
//! filters them, groups them into short time windows and hands each window to
//! an [`EventSink`]. Within a window discrete events keep their order and
//! pointer motion is summed into a single delta.

pub mod message;
pub mod sink;

use std::collections::HashSet;

use instant::Instant;

use crate::config::RelayConfig;

pub use message::{Batch, BatchEntry, Endpoint, GameKey, Message, MouseMove, Payload};
pub use sink::{EventSink, HttpSink, InputError};

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// `key` is the text the key produces; `repeat` marks auto-repeat.
    KeyDown { key: String, repeat: bool },
    KeyUp { key: String },
    /// Pointer button in DOM numbering.
    MouseDown(u16),
    MouseMove { dx: f64, dy: f64 },
    /// The pointer was captured (`true`) or released.
    PointerLock(bool),
}

pub struct InputRelay<S: EventSink> {
    sink: S,
    config: RelayConfig,
    held: HashSet<GameKey>,
    locked: bool,
    window_start: Option<Instant>,
    queue: Vec<Message>,
    motion: Option<MouseMove>,
}

impl<S: EventSink> InputRelay<S> {
    pub fn new(sink: S, config: RelayConfig) -> Self {
        Self {
            sink,
            config,
            held: HashSet::new(),
            locked: false,
            window_start: None,
            queue: Vec::new(),
            motion: None,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn pointer_locked(&self) -> bool {
        self.locked
    }

    /// Number of discrete events waiting in the open window.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// When the open window is due, if one is open.
    pub fn deadline(&self) -> Option<Instant> {
        self.window_start.map(|start| start + self.config.flush_interval)
    }

    pub fn on_event(&mut self, event: InputEvent, now: Instant) {
        self.poll(now);

        match event {
            InputEvent::KeyDown { key, repeat } => {
                let Some(key) = GameKey::from_key_text(&key) else {
                    return;
                };
                if repeat || !self.held.insert(key) {
                    return;
                }
                self.queue.push(Message::KeyDown(key));
            }
            InputEvent::KeyUp { key } => {
                let Some(key) = GameKey::from_key_text(&key) else {
                    return;
                };
                self.held.remove(&key);
                self.queue.push(Message::KeyUp(key));
            }
            InputEvent::MouseDown(button) => {
                if !self.locked {
                    return;
                }
                self.queue.push(Message::MouseDown(button));
            }
            InputEvent::MouseMove { dx, dy } => {
                if !self.locked {
                    return;
                }
                let motion = self.motion.get_or_insert_with(MouseMove::default);
                motion.mouse_move_x += dx;
                motion.mouse_move_y += dy;
            }
            InputEvent::PointerLock(locked) => {
                log::debug!("pointer lock {}", if locked { "acquired" } else { "released" });
                self.locked = locked;
                if !locked {
                    self.flush();
                }
                return;
            }
        }

        if self.window_start.is_none() {
            self.window_start = Some(now);
        }
        if self.queue.len() >= self.config.max_batch.max(1) {
            self.flush();
        }
    }

    /// Flushes the open window if its interval has elapsed. Returns whether
    /// anything was flushed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.flush();
                true
            }
            _ => false,
        }
    }

    /// Sends everything in the open window and closes it.
    pub fn flush(&mut self) {
        self.window_start = None;
        let queue = std::mem::take(&mut self.queue);
        let motion = self.motion.take();
        if queue.is_empty() && motion.is_none() {
            return;
        }
        log::trace!("flushing {} events (motion: {})", queue.len(), motion.is_some());

        if self.config.combined {
            let events = queue
                .into_iter()
                .map(BatchEntry::Discrete)
                .chain(motion.map(BatchEntry::Motion))
                .collect();
            self.sink
                .send(Endpoint::Combined, Payload::Batch(Batch { events }));
            return;
        }

        // Pointer buttons travel with the keys.
        for message in queue {
            self.sink.send(Endpoint::Key, Payload::Message(message));
        }
        if let Some(motion) = motion {
            self.sink.send(Endpoint::Mouse, Payload::Motion(motion));
        }
    }

    /// Tells the backend every block texture has settled.
    pub fn notify_textures_loaded(&mut self) {
        self.sink.send(Endpoint::TexturesLoaded, Payload::Empty {});
    }
}
