use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

type Clock = Box<dyn Fn() -> Instant + Send + Sync>;

pub struct TokenBucketLimiter {
    rate: f64,
    capacity: f64,
    ttl: Duration,
    cleanup_interval: Duration,
    now: Clock,
    state: Mutex<LimiterState>,
}

struct LimiterState {
    buckets: HashMap<String, Bucket>,
    last_cleanup: Option<Instant>,
}

struct Bucket {
    tokens: f64,
    last: Instant,
    last_seen: Instant,
}

impl TokenBucketLimiter {
    pub fn new(rate: f64, burst: u32, ttl: Duration) -> Self {
        Self::with_clock(rate, burst, ttl, Box::new(Instant::now))
    }

    fn with_clock(rate: f64, burst: u32, ttl: Duration, now: Clock) -> Self {
        let rate = if rate <= 0.0 { 1.0 } else { rate };
        let burst = burst.max(1);
        let ttl = if ttl.is_zero() {
            Duration::from_secs(60)
        } else {
            ttl
        };

        Self {
            rate,
            capacity: f64::from(burst),
            ttl,
            cleanup_interval: ttl,
            now,
            state: Mutex::new(LimiterState {
                buckets: HashMap::new(),
                last_cleanup: None,
            }),
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        let now = (self.now)();
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        state.cleanup(now, self.ttl, self.cleanup_interval);

        match state.buckets.get_mut(key) {
            None => {
                state.buckets.insert(
                    key.to_string(),
                    Bucket {
                        tokens: self.capacity - 1.0,
                        last: now,
                        last_seen: now,
                    },
                );
                true
            }
            Some(bucket) => {
                if now > bucket.last {
                    let elapsed = now.duration_since(bucket.last).as_secs_f64();
                    bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.capacity);
                    bucket.last = now;
                }
                bucket.last_seen = now;

                if bucket.tokens < 1.0 {
                    return false;
                }
                bucket.tokens -= 1.0;
                true
            }
        }
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .buckets
            .len()
    }
}

impl LimiterState {
    fn cleanup(&mut self, now: Instant, ttl: Duration, interval: Duration) {
        let last = match self.last_cleanup {
            None => {
                self.last_cleanup = Some(now);
                return;
            }
            Some(last) => last,
        };

        if now.duration_since(last) < interval {
            return;
        }

        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_seen) <= ttl);
        self.last_cleanup = Some(now);
    }
}
