use std::time::Instant;

/// 单个客户端的令牌桶
#[derive(Debug, Clone)]
pub struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    /// 首次请求直接放行，并扣除一个令牌
    pub fn first_request(max_tokens: f64, now: Instant) -> Self {
        Self {
            tokens: (max_tokens - 1.0).max(0.0),
            last_refill: now,
        }
    }

    /// 按整秒补充令牌后尝试取走一个
    ///
    /// 每次调用都会把 `last_refill` 更新为 `now`，不足一秒的部分直接丢弃
    pub fn try_acquire(&mut self, max_tokens: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed_secs = now.saturating_duration_since(self.last_refill).as_secs();
        self.tokens = (self.tokens + elapsed_secs as f64 * refill_rate).min(max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }
}
