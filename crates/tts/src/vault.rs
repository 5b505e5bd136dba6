//! Holding area for clips synthesized during chat.
//!
//! The chat response carries only an id; the audio is fetched with a second
//! request. A clip can be claimed once. Unclaimed clips expire after the
//! configured TTL and are swept (and their files deleted) on every deposit.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::audio::AudioClip;

struct Held {
    deposited_at: Instant,
    clip: AudioClip,
}

/// In-process, single-claim store of reply audio keyed by a random id.
pub struct AudioVault {
    ttl: Duration,
    clips: Mutex<HashMap<Uuid, Held>>,
}

impl AudioVault {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            clips: Mutex::new(HashMap::new()),
        }
    }

    /// Store `clip` and return the id it can be claimed with.
    pub fn deposit(&self, clip: AudioClip) -> Uuid {
        let id = Uuid::new_v4();
        let now = Instant::now();
        let mut clips = self.clips.lock().unwrap_or_else(PoisonError::into_inner);

        let before = clips.len();
        clips.retain(|_, held| !self.is_expired(held, now));
        let swept = before - clips.len();
        if swept > 0 {
            tracing::debug!(swept, "Expired audio clips removed");
        }

        clips.insert(
            id,
            Held {
                deposited_at: now,
                clip,
            },
        );
        id
    }

    /// Take the clip stored under `id`. `None` if it was never deposited,
    /// has already been claimed, or has expired.
    pub fn claim(&self, id: Uuid) -> Option<AudioClip> {
        let held = self
            .clips
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)?;
        if self.is_expired(&held, Instant::now()) {
            return None;
        }
        Some(held.clip)
    }

    /// Number of clips currently held, expired or not.
    pub fn len(&self) -> usize {
        self.clips.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, held: &Held, now: Instant) -> bool {
        now.duration_since(held.deposited_at) >= self.ttl
    }
}
