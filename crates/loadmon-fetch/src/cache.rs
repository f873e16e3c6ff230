//! Keyed fetch cache with in-flight deduplication.
//!
//! Per key the cache is a small state machine: Absent → Loading →
//! Ready | Error, with Error re-entering Loading on the next request.
//! All mutations go through one owned table behind a mutex; resolution
//! itself runs outside the lock. Each attempt carries a generation
//! number, so a result arriving after `invalidate` or after a newer
//! attempt has started is discarded rather than overwriting fresher
//! state.

use crate::error::FetchError;
use crate::Fetcher;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::time::{timeout, Duration};

#[derive(Debug, Clone)]
pub struct FetchCacheConfig {
    /// Upper bound on one resolution attempt, in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchCacheConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

/// Observable state of one cache key.
///
/// `Absent`, `Loading`, and `Error` are three distinct answers: "never
/// asked", "being resolved", and "resolution failed". Consumers render
/// them differently and must not conflate them.
#[derive(Debug)]
pub enum EntryState<T> {
    Absent,
    Loading,
    Ready(Arc<T>),
    Error(Arc<FetchError>),
}

impl<T> Clone for EntryState<T> {
    fn clone(&self) -> Self {
        match self {
            EntryState::Absent => EntryState::Absent,
            EntryState::Loading => EntryState::Loading,
            EntryState::Ready(v) => EntryState::Ready(v.clone()),
            EntryState::Error(e) => EntryState::Error(e.clone()),
        }
    }
}

enum Slot<T> {
    Loading,
    Ready(Arc<T>),
    Error(Arc<FetchError>),
}

struct Entry<T> {
    slot: Slot<T>,
    /// Generation of the attempt that owns this entry. A completing
    /// attempt may only publish its result while this still matches.
    attempt: u64,
    /// Completion signal for waiters; dropped (waking them) when the
    /// entry is invalidated.
    done_tx: watch::Sender<()>,
}

enum Action {
    Resolve(u64),
    Wait(watch::Receiver<()>),
}

/// Maps logical resource keys to cached values, guaranteeing at most one
/// concurrent resolution per key.
pub struct FetchCache<F: Fetcher> {
    fetcher: F,
    config: FetchCacheConfig,
    entries: Mutex<HashMap<String, Entry<F::Output>>>,
    attempts: AtomicU64,
}

impl<F: Fetcher> FetchCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_config(fetcher, FetchCacheConfig::default())
    }

    pub fn with_config(fetcher: F, config: FetchCacheConfig) -> Self {
        Self {
            fetcher,
            config,
            entries: Mutex::new(HashMap::new()),
            attempts: AtomicU64::new(0),
        }
    }

    /// The wrapped fetcher, e.g. to reach client configuration.
    pub fn fetcher_ref(&self) -> &F {
        &self.fetcher
    }

    /// Lock the entry table, recovering from a poisoned Mutex if necessary.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Entry<F::Output>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_attempt(&self) -> u64 {
        self.attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Non-blocking snapshot of the key's current state.
    pub fn snapshot(&self, key: &str) -> EntryState<F::Output> {
        let entries = self.lock_entries();
        match entries.get(key) {
            None => EntryState::Absent,
            Some(entry) => match &entry.slot {
                Slot::Loading => EntryState::Loading,
                Slot::Ready(v) => EntryState::Ready(v.clone()),
                Slot::Error(e) => EntryState::Error(e.clone()),
            },
        }
    }

    /// Returns the cached value for `key`, resolving it if necessary.
    ///
    /// Concurrent callers for the same key share one resolution: the
    /// first caller fetches, the rest wait on its completion and take
    /// its outcome, error included. A cached error is not sticky; a
    /// `get` issued after the failure starts a new attempt.
    pub async fn get(&self, key: &str) -> Result<Arc<F::Output>, Arc<FetchError>> {
        // Attempt this caller has joined as a waiter. If that same
        // attempt ends in Error, the error is this caller's answer;
        // retrying is reserved for gets that arrive after the
        // transition.
        let mut joined: Option<u64> = None;
        loop {
            let action = {
                let mut entries = self.lock_entries();
                match entries.get_mut(key) {
                    Some(entry) => match &entry.slot {
                        Slot::Ready(v) => return Ok(v.clone()),
                        Slot::Loading => {
                            joined = Some(entry.attempt);
                            Action::Wait(entry.done_tx.subscribe())
                        }
                        Slot::Error(e) => {
                            if joined == Some(entry.attempt) {
                                return Err(e.clone());
                            }
                            let attempt = self.next_attempt();
                            entry.slot = Slot::Loading;
                            entry.attempt = attempt;
                            Action::Resolve(attempt)
                        }
                    },
                    None => {
                        let attempt = self.next_attempt();
                        let (done_tx, _) = watch::channel(());
                        entries.insert(
                            key.to_string(),
                            Entry {
                                slot: Slot::Loading,
                                attempt,
                                done_tx,
                            },
                        );
                        Action::Resolve(attempt)
                    }
                }
            };

            match action {
                Action::Wait(mut done_rx) => {
                    // Err here means the entry was invalidated and its
                    // sender dropped; either way, re-inspect the state.
                    let _ = done_rx.changed().await;
                }
                Action::Resolve(attempt) => {
                    let result = self.resolve(key).await;
                    let mut entries = self.lock_entries();
                    match entries.get_mut(key) {
                        Some(entry) if entry.attempt == attempt => {
                            let outcome = match result {
                                Ok(value) => {
                                    let value = Arc::new(value);
                                    entry.slot = Slot::Ready(value.clone());
                                    Ok(value)
                                }
                                Err(error) => {
                                    let error = Arc::new(error);
                                    entry.slot = Slot::Error(error.clone());
                                    Err(error)
                                }
                            };
                            let _ = entry.done_tx.send(());
                            return outcome;
                        }
                        _ => {
                            // A newer attempt owns this key now; this
                            // result is stale. Loop and observe the
                            // current state instead.
                            tracing::debug!(key, attempt, "Discarding stale fetch result");
                        }
                    }
                }
            }
        }
    }

    async fn resolve(&self, key: &str) -> Result<F::Output, FetchError> {
        let secs = self.config.timeout_secs;
        match timeout(Duration::from_secs(secs), self.fetcher.fetch(key)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout { secs }),
        }
    }

    /// Forcibly resets one key to Absent. Waiters are woken and an
    /// in-flight resolution for the key, should it complete later, is
    /// discarded.
    pub fn invalidate(&self, key: &str) {
        self.lock_entries().remove(key);
    }

    /// Resets the whole cache, e.g. when the consumer's query context
    /// changed and all keys may be stale.
    pub fn invalidate_all(&self) {
        self.lock_entries().clear();
    }
}
