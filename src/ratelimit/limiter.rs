//! Fixed-window counter.
//!
//! A window opens with the first request for a key and lasts `window_ms`. Requests
//! inside it increment the count until `limit`; after that they are denied until the
//! window has elapsed. Expired buckets are reset lazily on the next request.

use super::types::{RateLimitBucket, RateLimitResult};
use crate::clock::Clock;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

pub struct RateLimiter {
    buckets: DashMap<String, RateLimitBucket>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            buckets: DashMap::new(),
            clock,
        })
    }

    /// Counts a request against `key`.
    ///
    /// A denied request does not increment the count, so `count <= limit` holds for the
    /// whole window.
    pub fn check(&self, key: &str, limit: u32, window_ms: u64) -> RateLimitResult {
        let now = self.clock.now_ms();

        if limit == 0 {
            return RateLimitResult {
                allowed: false,
                limit,
                remaining: 0,
                retry_after_secs: Some(retry_after_secs(window_ms)),
            };
        }

        match self.buckets.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(RateLimitBucket {
                    count: 1,
                    window_start: now,
                });
                allowed(limit, 1)
            }
            Entry::Occupied(mut occupied) => {
                let bucket = occupied.get_mut();
                let elapsed = now.saturating_sub(bucket.window_start);

                if elapsed >= window_ms {
                    bucket.count = 1;
                    bucket.window_start = now;
                    return allowed(limit, 1);
                }

                if bucket.count >= limit {
                    let retry = retry_after_secs(window_ms - elapsed);
                    tracing::debug!("Rate limit hit for '{}', retry in {}s", key, retry);
                    return RateLimitResult {
                        allowed: false,
                        limit,
                        remaining: 0,
                        retry_after_secs: Some(retry),
                    };
                }

                bucket.count += 1;
                allowed(limit, bucket.count)
            }
        }
    }

    /// Drops every bucket, or only those whose key starts with `prefix`.
    pub fn reset(&self, prefix: Option<&str>) -> usize {
        let before = self.buckets.len();
        match prefix {
            None => self.buckets.clear(),
            Some(prefix) => self.buckets.retain(|key, _| !key.starts_with(prefix)),
        }
        let cleared = before.saturating_sub(self.buckets.len());

        tracing::info!("Reset {} rate limit buckets (prefix: {:?})", cleared, prefix);
        cleared
    }

    /// Removes buckets whose window ended at least `window_ms` ago.
    pub fn purge_expired(&self, window_ms: u64) -> usize {
        let now = self.clock.now_ms();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_sub(bucket.window_start) < window_ms);
        before.saturating_sub(self.buckets.len())
    }

    pub fn bucket(&self, key: &str) -> Option<RateLimitBucket> {
        self.buckets.get(key).map(|bucket| bucket.clone())
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

fn allowed(limit: u32, count: u32) -> RateLimitResult {
    RateLimitResult {
        allowed: true,
        limit,
        remaining: limit.saturating_sub(count),
        retry_after_secs: None,
    }
}

fn retry_after_secs(remaining_ms: u64) -> u64 {
    remaining_ms.div_ceil(1000).max(1)
}
