use crate::cache::{EntryState, FetchCache, FetchCacheConfig};
use crate::error::{FetchError, Result};
use crate::Fetcher;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{sleep, Duration};

/// Succeeds after a short delay, counting upstream calls.
struct SlowFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl Fetcher for SlowFetcher {
    type Output = String;

    async fn fetch(&self, key: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        sleep(Duration::from_millis(50)).await;
        Ok(format!("value-for-{key}"))
    }
}

/// Fails on the first call, succeeds afterwards.
struct FlakyFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl Fetcher for FlakyFetcher {
    type Output = String;

    async fn fetch(&self, key: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            Err(FetchError::Http {
                status: 500,
                body: "boom".to_string(),
            })
        } else {
            Ok(format!("value-for-{key}"))
        }
    }
}

#[tokio::test]
async fn concurrent_gets_share_one_upstream_call() {
    let cache = Arc::new(FetchCache::new(SlowFetcher {
        calls: AtomicUsize::new(0),
    }));

    let a = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("x").await })
    };
    let b = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("x").await })
    };

    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
    assert_eq!(*a, "value-for-x");
    assert!(Arc::ptr_eq(&a, &b), "both callers share the same result");
    assert_eq!(
        cache.fetcher_ref().calls.load(Ordering::SeqCst),
        1,
        "exactly one upstream resolution for the key"
    );

    let state = cache.snapshot("x");
    assert!(matches!(state, EntryState::Ready(_)));
}

#[tokio::test]
async fn concurrent_gets_share_one_upstream_call_on_failure() {
    /// Always rate-limited, after a short delay so that both callers
    /// join the same attempt.
    struct SlowFailingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for SlowFailingFetcher {
        type Output = String;

        async fn fetch(&self, _key: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(50)).await;
            Err(FetchError::RateLimited)
        }
    }

    let cache = Arc::new(FetchCache::new(SlowFailingFetcher {
        calls: AtomicUsize::new(0),
    }));

    let a = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("x").await })
    };
    let b = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("x").await })
    };

    let (a, b) = (a.await.unwrap().unwrap_err(), b.await.unwrap().unwrap_err());
    assert!(matches!(*a, FetchError::RateLimited));
    assert!(matches!(*b, FetchError::RateLimited));
    assert_eq!(
        cache.fetcher_ref().calls.load(Ordering::SeqCst),
        1,
        "a failed attempt is shared by the callers that joined it"
    );

    // A get issued after the Error transition does start a new attempt.
    cache.get("x").await.unwrap_err();
    assert_eq!(cache.fetcher_ref().calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn ready_entries_are_served_without_refetch() {
    let cache = FetchCache::new(SlowFetcher {
        calls: AtomicUsize::new(0),
    });

    cache.get("x").await.unwrap();
    cache.get("x").await.unwrap();

    assert_eq!(cache.fetcher_ref().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn distinct_keys_fetch_independently() {
    let cache = FetchCache::new(SlowFetcher {
        calls: AtomicUsize::new(0),
    });

    let x = cache.get("x").await.unwrap();
    let y = cache.get("y").await.unwrap();
    assert_eq!(*x, "value-for-x");
    assert_eq!(*y, "value-for-y");
    assert_eq!(cache.fetcher_ref().calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn error_is_cached_but_not_sticky() {
    let cache = FetchCache::new(FlakyFetcher {
        calls: AtomicUsize::new(0),
    });

    let err = cache.get("x").await.unwrap_err();
    assert!(err.is_generic_failure());
    assert!(matches!(cache.snapshot("x"), EntryState::Error(_)));

    // The next get re-enters Loading and issues a new attempt.
    let ok = cache.get("x").await.unwrap();
    assert_eq!(*ok, "value-for-x");
    assert_eq!(cache.fetcher_ref().calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rate_limited_is_distinguishable_from_generic_failure() {
    struct RateLimitedFetcher;

    #[async_trait]
    impl Fetcher for RateLimitedFetcher {
        type Output = String;

        async fn fetch(&self, _key: &str) -> Result<String> {
            Err(FetchError::RateLimited)
        }
    }

    let cache = FetchCache::new(RateLimitedFetcher);
    let err = cache.get("x").await.unwrap_err();
    assert!(matches!(*err, FetchError::RateLimited));
    assert!(!err.is_generic_failure());
}

#[tokio::test]
async fn snapshot_reports_three_distinct_non_ready_states() {
    let cache = FetchCache::new(FlakyFetcher {
        calls: AtomicUsize::new(0),
    });

    // Never requested: Absent, not Loading, not Error.
    assert!(matches!(cache.snapshot("x"), EntryState::Absent));

    cache.get("x").await.unwrap_err();
    assert!(matches!(cache.snapshot("x"), EntryState::Error(_)));

    cache.invalidate("x");
    assert!(matches!(cache.snapshot("x"), EntryState::Absent));
}

#[tokio::test]
async fn invalidate_mid_flight_discards_the_stale_result() {
    /// First call blocks on a gate and returns "stale"; later calls
    /// return "fresh" immediately.
    struct GatedFetcher {
        calls: AtomicUsize,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl Fetcher for GatedFetcher {
        type Output = String;

        async fn fetch(&self, _key: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                self.gate.notified().await;
                Ok("stale".to_string())
            } else {
                Ok("fresh".to_string())
            }
        }
    }

    let gate = Arc::new(Notify::new());
    let cache = Arc::new(FetchCache::new(GatedFetcher {
        calls: AtomicUsize::new(0),
        gate: gate.clone(),
    }));

    let first = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get("x").await })
    };

    // Let the first attempt start, then reset the key while it is
    // still in flight.
    sleep(Duration::from_millis(20)).await;
    cache.invalidate("x");
    assert!(matches!(cache.snapshot("x"), EntryState::Absent));
    gate.notify_one();

    // The stale "stale" result must never become visible; the caller
    // re-resolves and observes the fresh value.
    let result = first.await.unwrap().unwrap();
    assert_eq!(*result, "fresh");
    match cache.snapshot("x") {
        EntryState::Ready(v) => assert_eq!(*v, "fresh"),
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn resolution_is_bounded_by_the_configured_timeout() {
    struct StuckFetcher;

    #[async_trait]
    impl Fetcher for StuckFetcher {
        type Output = String;

        async fn fetch(&self, _key: &str) -> Result<String> {
            sleep(Duration::from_secs(3600)).await;
            Ok("never".to_string())
        }
    }

    let cache = FetchCache::with_config(StuckFetcher, FetchCacheConfig { timeout_secs: 2 });
    let err = cache.get("x").await.unwrap_err();
    assert!(matches!(*err, FetchError::Timeout { secs: 2 }));
}

#[tokio::test]
async fn invalidate_all_resets_every_key() {
    let cache = FetchCache::new(SlowFetcher {
        calls: AtomicUsize::new(0),
    });

    cache.get("x").await.unwrap();
    cache.get("y").await.unwrap();
    cache.invalidate_all();

    assert!(matches!(cache.snapshot("x"), EntryState::Absent));
    assert!(matches!(cache.snapshot("y"), EntryState::Absent));
}
