//! Client-side fetch layer: request deduplication, caching, and the
//! remote content-store client.
//!
//! [`cache::FetchCache`] guarantees at most one in-flight resolution per
//! key, exposes the per-key loading/ready/error state, and discards stale
//! results when a newer attempt has started. [`content::ContentStore`]
//! is the HTTP client it typically wraps, with HTTP 403 mapped to the
//! dedicated [`error::FetchError::RateLimited`] classification.

pub mod cache;
pub mod content;
pub mod error;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

/// Resolves a logical resource key to a value, asynchronously.
///
/// The cache owns the concurrency discipline; implementations only need
/// to perform one fetch. `Output` must be shareable because results are
/// handed out as `Arc`s to every waiting caller.
#[async_trait]
pub trait Fetcher: Send + Sync {
    type Output: Send + Sync + 'static;

    async fn fetch(&self, key: &str) -> error::Result<Self::Output>;
}
