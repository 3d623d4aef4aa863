use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

const WINDOW_SECS: i64 = 60;

/// Counts failed admin-key attempts per client IP in fixed one-minute windows.
///
/// Once an IP reaches `max_failures` inside the current window it is locked out
/// of every admin endpoint, even with the right key, until the window ends.
pub struct FailedAttemptLimiter {
    failures: DashMap<IpAddr, (AtomicU32, AtomicI64)>,
    max_failures: u32,
}

impl FailedAttemptLimiter {
    pub fn new(max_failures: u32) -> Self {
        Self {
            failures: DashMap::new(),
            max_failures,
        }
    }

    /// Whether `ip` is locked out at `current_time`
    pub fn is_blocked(&self, ip: IpAddr, current_time: i64) -> bool {
        match self.failures.get(&ip) {
            Some(entry) => {
                let (count, window_start) = entry.value();
                current_time - window_start.load(Ordering::Relaxed) < WINDOW_SECS
                    && count.load(Ordering::Relaxed) >= self.max_failures
            }
            None => false,
        }
    }

    /// Record one failed attempt and return the failure count in the current window
    pub fn record_failure(&self, ip: IpAddr, current_time: i64) -> u32 {
        let entry = self
            .failures
            .entry(ip)
            .or_insert_with(|| (AtomicU32::new(0), AtomicI64::new(current_time)));

        let (count, window_start) = entry.value();

        if current_time - window_start.load(Ordering::Relaxed) >= WINDOW_SECS {
            window_start.store(current_time, Ordering::Relaxed);
            count.store(1, Ordering::Relaxed);
            return 1;
        }

        count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Drop entries whose window has ended
    pub fn cleanup_old_entries(&self, current_time: i64) {
        self.failures.retain(|_, (_, window_start)| {
            current_time - window_start.load(Ordering::Relaxed) < WINDOW_SECS
        });
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}
