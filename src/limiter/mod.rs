mod bucket;

pub use bucket::Bucket;

use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::RateLimitConfig;

/// 进程内令牌桶限流器，每个客户端一个桶
///
/// 桶存放在分片 map 中，补充和扣减都在条目锁内完成：同一客户端的请求串行执行，
/// 不同分片的请求互不阻塞
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    config: RateLimitConfig,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config: config.clamp_idle_ttl(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// 返回 `true` 表示放行
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        // 清理必须在持有条目锁之前完成，否则 retain 会与其它分片锁死
        self.maybe_sweep(now);

        let max_tokens = self.config.max_tokens as f64;
        let allowed = match self.buckets.entry(key.to_string()) {
            Entry::Vacant(entry) => {
                trace!(key, "Creating rate limit bucket");
                entry.insert(Bucket::first_request(max_tokens, now));
                true
            }
            Entry::Occupied(mut entry) => {
                entry
                    .get_mut()
                    .try_acquire(max_tokens, self.config.refill_rate, now)
            }
        };

        if !allowed {
            debug!(key, "Rate limit exceeded");
        }
        allowed
    }

    /// 当前持有桶的客户端数量
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    fn maybe_sweep(&self, now: Instant) {
        // 已有其它请求在清理时直接跳过
        let Some(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if now.saturating_duration_since(*last_sweep) < self.config.sweep_interval {
            return;
        }
        *last_sweep = now;
        drop(last_sweep);

        let idle_ttl = self.config.idle_ttl;
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill()) < idle_ttl);
        let evicted = before.saturating_sub(self.buckets.len());
        if evicted > 0 {
            debug!(
                evicted,
                remaining = self.buckets.len(),
                "Evicted idle rate limit buckets"
            );
        }
    }
}
