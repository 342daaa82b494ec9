// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::trace;

/// Spaces MusicBrainz requests at least `min_interval` apart.
///
/// MusicBrainz allows one request per second for non-commercial use. Each
/// caller reserves the next free slot under the lock and sleeps outside it,
/// so the spacing holds across clones and concurrent callers.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn musicbrainz_default() -> Self {
        Self::new(Duration::from_secs(1))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next request may be sent.
    pub async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next_slot.map_or(now, |reserved| reserved.max(now));
            *next_slot = Some(slot + self.min_interval);
            slot
        };

        let now = Instant::now();
        if slot > now {
            trace!(target: "musicbrainz", wait = ?(slot - now), "rate limiting");
            sleep_until(slot).await;
        }
    }
}
