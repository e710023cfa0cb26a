//! Windowed in-memory rate limiter.
//!
//! Bounds the rate of sensitive operations (login, contact form, public API)
//! per client identifier, independently per named context. State lives in
//! process memory only and is lost on restart; under a multi-instance
//! deployment each instance counts on its own, so the effective limit is
//! `max_attempts x instances`. A shared external store would be needed for
//! cross-instance correctness.
//!
//! `check` is a pure read and never mutates the store, so repeated polling is
//! cheap. An entry whose window has expired is *reported* as fresh but stays
//! in the map until the next `record` for that key or the periodic
//! `cleanup_old_entries` sweep removes it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ratelimit_blocked_total",
            "Checks answered not-allowed, per context."
        );
        describe_counter!(
            "ratelimit_swept_total",
            "Entries removed by the periodic cleanup sweep."
        );
    });
}

/// Budget for one named context. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window_ms: u64,
    /// When set, reaching `max_attempts` starts a hard block of this length.
    pub block_duration_ms: Option<u64>,
}

impl RateLimitConfig {
    /// Login attempts: 5 per 15 minutes, then a 30 minute block.
    pub const LOGIN: RateLimitConfig = RateLimitConfig {
        max_attempts: 5,
        window_ms: 15 * 60 * 1000,
        block_duration_ms: Some(30 * 60 * 1000),
    };

    /// Contact form submissions: 5 per hour, no block.
    pub const CONTACT: RateLimitConfig = RateLimitConfig {
        max_attempts: 5,
        window_ms: 60 * 60 * 1000,
        block_duration_ms: None,
    };

    /// Public API requests: 100 per minute, no block.
    pub const API: RateLimitConfig = RateLimitConfig {
        max_attempts: 100,
        window_ms: 60 * 1000,
        block_duration_ms: None,
    };

    /// The predefined context budgets, as (context name, config) pairs.
    pub fn predefined() -> [(&'static str, RateLimitConfig); 3] {
        [
            ("login", Self::LOGIN),
            ("contact", Self::CONTACT),
            ("api", Self::API),
        ]
    }
}

/// Per (identifier, context) counter state.
#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    first_attempt_ms: u64,
    blocked_until_ms: Option<u64>,
}

/// Answer to a `check` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    /// Seconds until the current window ends (ceil-rounded). Absent when the
    /// identifier has no live window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_in_secs: Option<u64>,
    /// Minutes until an active block lifts (ceil-rounded). Present only while
    /// blocked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_for_mins: Option<u64>,
}

impl RateLimitResult {
    fn fresh(config: &RateLimitConfig) -> Self {
        Self {
            allowed: true,
            remaining: config.max_attempts,
            reset_in_secs: None,
            blocked_for_mins: None,
        }
    }
}

/// In-memory store: context name -> identifier -> entry.
///
/// Shared via `Arc` in the app state rather than a process-global static, so
/// an external shared store can replace it without touching call sites.
#[derive(Debug, Default)]
pub struct RateLimiter {
    contexts: Mutex<HashMap<String, HashMap<String, RateLimitEntry>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        ensure_metrics_described();
        Self::default()
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Pure read: reports whether `identifier` may proceed in `context`.
    /// Never mutates the store; an expired window is reported as a full
    /// allowance without deleting the stale entry.
    pub fn check(&self, identifier: &str, context: &str, config: &RateLimitConfig) -> RateLimitResult {
        self.check_at(Self::now_ms(), identifier, context, config)
    }

    /// Records one attempt. A success deletes the entry outright (a
    /// successful login forgives prior failures); a failure creates,
    /// window-resets, or increments it, and arms the block once the count
    /// reaches the configured maximum.
    pub fn record(&self, identifier: &str, context: &str, config: &RateLimitConfig, success: bool) {
        self.record_at(Self::now_ms(), identifier, context, config, success);
    }

    /// Sweeps every predefined context and drops entries that are both
    /// outside their window and not currently blocked. Call this from a
    /// periodic task; the limiter owns no timer of its own.
    pub fn cleanup_old_entries(&self) {
        self.cleanup_at(Self::now_ms(), &RateLimitConfig::predefined());
    }

    // Time-parameterized variants. The public wrappers above feed in the wall
    // clock; tests feed in whatever instant they need.

    pub fn check_at(
        &self,
        now_ms: u64,
        identifier: &str,
        context: &str,
        config: &RateLimitConfig,
    ) -> RateLimitResult {
        let contexts = self.contexts.lock().expect("ratelimit mutex poisoned");
        let entry = match contexts.get(context).and_then(|m| m.get(identifier)) {
            Some(e) => *e,
            None => return RateLimitResult::fresh(config),
        };

        if let Some(until) = entry.blocked_until_ms {
            if until > now_ms {
                counter!("ratelimit_blocked_total", "context" => context.to_string()).increment(1);
                return RateLimitResult {
                    allowed: false,
                    remaining: 0,
                    reset_in_secs: None,
                    blocked_for_mins: Some(ceil_div(until - now_ms, 60_000)),
                };
            }
        }

        if now_ms.saturating_sub(entry.first_attempt_ms) > config.window_ms {
            // Window elapsed: would be allowed with a full budget. The entry
            // itself is left for `record` or the sweep to clear.
            return RateLimitResult::fresh(config);
        }

        let remaining = config.max_attempts.saturating_sub(entry.count);
        let window_end = entry.first_attempt_ms + config.window_ms;
        let allowed = remaining > 0;
        if !allowed {
            counter!("ratelimit_blocked_total", "context" => context.to_string()).increment(1);
        }
        RateLimitResult {
            allowed,
            remaining,
            reset_in_secs: Some(ceil_div(window_end.saturating_sub(now_ms), 1_000)),
            blocked_for_mins: None,
        }
    }

    pub fn record_at(
        &self,
        now_ms: u64,
        identifier: &str,
        context: &str,
        config: &RateLimitConfig,
        success: bool,
    ) {
        let mut contexts = self.contexts.lock().expect("ratelimit mutex poisoned");
        let store = contexts.entry(context.to_string()).or_default();

        if success {
            store.remove(identifier);
            return;
        }

        let entry = store
            .entry(identifier.to_string())
            .and_modify(|e| {
                let blocked = e.blocked_until_ms.is_some_and(|until| until > now_ms);
                if !blocked && now_ms.saturating_sub(e.first_attempt_ms) > config.window_ms {
                    // Stale window: same effect as a fresh entry. An active
                    // block outlives its window.
                    *e = RateLimitEntry {
                        count: 1,
                        first_attempt_ms: now_ms,
                        blocked_until_ms: None,
                    };
                } else {
                    e.count = e.count.saturating_add(1);
                }
            })
            .or_insert(RateLimitEntry {
                count: 1,
                first_attempt_ms: now_ms,
                blocked_until_ms: None,
            });

        if entry.count >= config.max_attempts {
            if let Some(block_ms) = config.block_duration_ms {
                entry.blocked_until_ms = Some(now_ms + block_ms);
            }
        }
    }

    pub fn cleanup_at(&self, now_ms: u64, configs: &[(&str, RateLimitConfig)]) {
        let mut contexts = self.contexts.lock().expect("ratelimit mutex poisoned");
        let mut swept = 0u64;
        for (name, config) in configs {
            if let Some(store) = contexts.get_mut(*name) {
                let before = store.len();
                store.retain(|_, e| {
                    let blocked = e.blocked_until_ms.is_some_and(|until| until > now_ms);
                    let in_window = now_ms.saturating_sub(e.first_attempt_ms) <= config.window_ms;
                    blocked || in_window
                });
                swept += (before - store.len()) as u64;
            }
        }
        if swept > 0 {
            counter!("ratelimit_swept_total").increment(swept);
        }
    }

    /// Number of live entries across all contexts (sweep diagnostics).
    pub fn entry_count(&self) -> usize {
        let contexts = self.contexts.lock().expect("ratelimit mutex poisoned");
        contexts.values().map(|m| m.len()).sum()
    }
}

fn ceil_div(value: u64, unit: u64) -> u64 {
    value.div_ceil(unit)
}
