use crate::cache::{CacheEntry, CacheKey};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration as StdDuration;
use tokio::sync::oneshot;

/// Configuration for request deduplication
#[derive(Clone, Debug)]
pub struct DeduplicationConfig {
    /// How long a follower waits on the leading request before giving up
    pub request_timeout: Duration,
    /// Whether deduplication is enabled
    pub enabled: bool,
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::seconds(30),
            enabled: true,
        }
    }
}

type Waiter = oneshot::Sender<Result<CacheEntry>>;

/// A request in flight and the callers waiting on it.
struct Pending {
    token: u64,
    started: DateTime<Utc>,
    waiters: Vec<Waiter>,
}

/// Coalesces concurrent page resolutions for the same key.
///
/// The first caller for a key runs the fetch; callers arriving while it is in
/// flight wait for its result instead of hitting the network again. If the
/// leader is dropped or outlives the timeout, a waiter runs its own fetch.
pub struct RequestDeduplicator {
    pending: DashMap<CacheKey, Pending>,
    next_token: AtomicU64,
    config: DeduplicationConfig,
}

/// Unregisters the leading request when it finishes or is dropped mid-flight.
/// Dropping the waiters' senders wakes them so one can take over. Only the entry
/// this leader registered is touched; a newer leader for the same key (after
/// a clear) keeps its own.
struct LeaderGuard<'a> {
    pending: &'a DashMap<CacheKey, Pending>,
    key: &'a CacheKey,
    token: u64,
}

impl LeaderGuard<'_> {
    fn take(&self) -> Option<Pending> {
        self.pending
            .remove_if(self.key, |_, pending| pending.token == self.token)
            .map(|(_, pending)| pending)
    }

    fn finish(self, result: &Result<CacheEntry>) {
        if let Some(pending) = self.take() {
            log::debug!("Notifying {} waiters for key: {}", pending.waiters.len(), self.key);
            for waiter in pending.waiters {
                let _ = waiter.send(result.clone());
            }
        }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        self.take();
    }
}

impl RequestDeduplicator {
    pub fn new(config: DeduplicationConfig) -> Self {
        Self {
            pending: DashMap::new(),
            next_token: AtomicU64::new(0),
            config,
        }
    }

    /// Runs `fetch` unless an identical request is already in flight, in which
    /// case its result is awaited and returned instead.
    pub async fn execute<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<CacheEntry>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheEntry>>,
    {
        if !self.config.enabled {
            return fetch().await;
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        loop {
            self.cleanup_expired();

            let (leader, rx) = match self.pending.entry(key.clone()) {
                Entry::Occupied(mut occupied) => {
                    let (tx, rx) = oneshot::channel();
                    occupied.get_mut().waiters.push(tx);
                    (occupied.get().token, rx)
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(Pending {
                        token,
                        started: Utc::now(),
                        waiters: Vec::new(),
                    });
                    break;
                }
            };

            log::debug!("Request already pending for key: {}", key);
            let timeout = self
                .config
                .request_timeout
                .to_std()
                .unwrap_or(StdDuration::ZERO);

            match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(result)) => {
                    log::debug!("Received deduplicated result for key: {}", key);
                    return result;
                }
                Ok(Err(_)) => {
                    log::warn!("Leading request dropped for key: {}, taking over", key);
                }
                Err(_) => {
                    log::warn!("Request timeout for key: {}, taking over", key);
                    // Unregister the stuck leader so this caller can lead.
                    self.pending.remove_if(key, |_, pending| pending.token == leader);
                }
            }
        }

        log::debug!("Executing new request for key: {}", key);
        let guard = LeaderGuard {
            pending: &self.pending,
            key,
            token,
        };
        let result = fetch().await;
        guard.finish(&result);
        result
    }

    /// Forget requests that have been pending longer than the timeout.
    fn cleanup_expired(&self) {
        let now = Utc::now();
        self.pending.retain(|key, pending| {
            let expired = (now - pending.started) > self.config.request_timeout;
            if expired {
                log::debug!(
                    "Cleaning up expired request for key: {} with {} waiters",
                    key,
                    pending.waiters.len()
                );
            }
            !expired
        });
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Clear all pending requests
    pub fn clear(&self) {
        self.pending.clear();
        log::debug!("Request deduplicator cleared");
    }
}
