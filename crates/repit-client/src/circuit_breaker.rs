// Circuit breaker guarding calls to each downstream service
// One breaker per service name, created on first use

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected
    Open,
    /// Trial requests allowed to test recovery
    HalfOpen,
}

const STATE_CLOSED: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_HALF_OPEN: u8 = 2;

impl CircuitState {
    fn from_u8(v: u8) -> Self {
        match v {
            STATE_OPEN => CircuitState::Open,
            STATE_HALF_OPEN => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failures within `failure_window` before opening
    pub failure_threshold: u32,
    /// Wait before moving from Open to HalfOpen
    pub reset_timeout: Duration,
    /// Successes in HalfOpen before closing
    pub success_threshold: u32,
    pub failure_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            success_threshold: 1,
            failure_window: Duration::from_secs(60),
        }
    }
}

/// Point-in-time counters for one breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitMetrics {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_timeouts: u64,
    /// Percent of recorded calls that succeeded, 0 before any call
    pub success_rate: f64,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub last_success_time: Option<DateTime<Utc>>,
}

fn current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn from_ms(ms: u64) -> Option<DateTime<Utc>> {
    (ms > 0)
        .then(|| DateTime::<Utc>::from_timestamp_millis(ms as i64))
        .flatten()
}

/// Lock-free circuit breaker
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: AtomicU8,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    last_failure_time_ms: AtomicU64,
    last_success_time_ms: AtomicU64,
    /// 0 while not open
    opened_at_ms: AtomicU64,
    total_requests: AtomicU64,
    total_failures: AtomicU64,
    total_timeouts: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(name: &str) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    pub fn with_config(name: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
            state: AtomicU8::new(STATE_CLOSED),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            last_failure_time_ms: AtomicU64::new(0),
            last_success_time_ms: AtomicU64::new(0),
            opened_at_ms: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_timeouts: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a call may proceed; moves Open to HalfOpen once the reset timeout passed
    pub fn allow_request(&self) -> bool {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let opened_at = self.opened_at_ms.load(Ordering::SeqCst);
                if opened_at > 0 {
                    let elapsed_ms = current_time_ms().saturating_sub(opened_at);
                    if elapsed_ms >= self.config.reset_timeout.as_millis() as u64 {
                        self.transition_to_half_open();
                        return true;
                    }
                }
                false
            }
        }
    }

    pub fn record_success(&self) {
        self.total_requests.fetch_add(1, Ordering::SeqCst);
        self.last_success_time_ms
            .store(current_time_ms(), Ordering::SeqCst);

        match self.state() {
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::SeqCst);
            }
            CircuitState::HalfOpen => {
                let count = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.config.success_threshold {
                    self.transition_to_closed();
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        self.total_requests.fetch_add(1, Ordering::SeqCst);
        self.total_failures.fetch_add(1, Ordering::SeqCst);
        let now_ms = current_time_ms();

        match self.state() {
            CircuitState::Closed => {
                let last_failure_ms = self.last_failure_time_ms.load(Ordering::SeqCst);
                if last_failure_ms > 0 && now_ms > last_failure_ms {
                    let elapsed = Duration::from_millis(now_ms - last_failure_ms);
                    if elapsed > self.config.failure_window {
                        self.failure_count.store(0, Ordering::SeqCst);
                    }
                }
                self.last_failure_time_ms.store(now_ms, Ordering::SeqCst);

                let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.config.failure_threshold {
                    self.transition_to_open();
                }
            }
            CircuitState::HalfOpen => {
                self.last_failure_time_ms.store(now_ms, Ordering::SeqCst);
                self.transition_to_open();
            }
            CircuitState::Open => {
                self.last_failure_time_ms.store(now_ms, Ordering::SeqCst);
            }
        }
    }

    /// A timeout counts as a failure and is tallied separately
    pub fn record_timeout(&self) {
        self.total_timeouts.fetch_add(1, Ordering::SeqCst);
        self.record_failure();
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> CircuitMetrics {
        let total_requests = self.total_requests.load(Ordering::SeqCst);
        let total_failures = self.total_failures.load(Ordering::SeqCst);
        let success_rate = if total_requests > 0 {
            (total_requests - total_failures) as f64 / total_requests as f64 * 100.0
        } else {
            0.0
        };

        CircuitMetrics {
            name: self.name.clone(),
            state: self.state(),
            failure_count: self.failure_count(),
            total_requests,
            total_failures,
            total_timeouts: self.total_timeouts.load(Ordering::SeqCst),
            success_rate,
            last_failure_time: from_ms(self.last_failure_time_ms.load(Ordering::SeqCst)),
            last_success_time: from_ms(self.last_success_time_ms.load(Ordering::SeqCst)),
        }
    }

    /// Close the breaker and clear every counter
    pub fn reset(&self) {
        self.transition_to_closed();
        self.last_failure_time_ms.store(0, Ordering::SeqCst);
        self.last_success_time_ms.store(0, Ordering::SeqCst);
        self.total_requests.store(0, Ordering::SeqCst);
        self.total_failures.store(0, Ordering::SeqCst);
        self.total_timeouts.store(0, Ordering::SeqCst);
    }

    fn transition_to_open(&self) {
        self.state.store(STATE_OPEN, Ordering::SeqCst);
        self.opened_at_ms.store(current_time_ms(), Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
        tracing::warn!(service = %self.name, "Circuit breaker opened");
    }

    fn transition_to_half_open(&self) {
        self.state.store(STATE_HALF_OPEN, Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
        tracing::info!(service = %self.name, "Circuit breaker half-open");
    }

    fn transition_to_closed(&self) {
        self.state.store(STATE_CLOSED, Ordering::SeqCst);
        self.opened_at_ms.store(0, Ordering::SeqCst);
        self.failure_count.store(0, Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
        tracing::info!(service = %self.name, "Circuit breaker closed");
    }
}

/// Named breakers sharing one configuration
pub struct CircuitBreakerManager {
    config: CircuitBreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerManager {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// Breaker for `name`, created on first request
    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.get(name) {
            return breaker.clone();
        }
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::with_config(name, self.config.clone())))
            .clone()
    }

    pub fn status(&self) -> BTreeMap<String, CircuitState> {
        self.breakers
            .iter()
            .map(|e| (e.key().clone(), e.value().state()))
            .collect()
    }

    pub fn metrics(&self) -> BTreeMap<String, CircuitMetrics> {
        self.breakers
            .iter()
            .map(|e| (e.key().clone(), e.value().metrics()))
            .collect()
    }

    /// Returns false when no breaker exists for `name`
    pub fn reset(&self, name: &str) -> bool {
        match self.breakers.get(name) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&self) {
        for breaker in self.breakers.iter() {
            breaker.reset();
        }
    }
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32) -> CircuitBreaker {
        CircuitBreaker::with_config(
            "student",
            CircuitBreakerConfig {
                failure_threshold,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_circuit_breaker_initial_state() {
        let cb = CircuitBreaker::new("student");
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow_request());
        assert_eq!(cb.metrics().success_rate, 0.0);
    }

    #[test]
    fn test_circuit_breaker_opens_after_failures() {
        let cb = breaker(3);
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());
    }

    #[test]
    fn test_success_resets_failures() {
        let cb = breaker(3);
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.failure_count(), 0);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_failures_outside_window_do_not_accumulate() {
        let cb = CircuitBreaker::with_config(
            "student",
            CircuitBreakerConfig {
                failure_threshold: 2,
                failure_window: Duration::from_millis(20),
                ..Default::default()
            },
        );
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(60));
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 1);

        // back-to-back failures stay inside the window
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_half_open_after_reset_timeout() {
        let cb = CircuitBreaker::with_config(
            "lesson",
            CircuitBreakerConfig {
                failure_threshold: 1,
                reset_timeout: Duration::ZERO,
                ..Default::default()
            },
        );
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        assert!(cb.allow_request());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_failure();
        assert!(cb.allow_request());
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_metrics_and_timeouts() {
        let cb = breaker(10);
        cb.record_success();
        cb.record_success();
        cb.record_success();
        cb.record_timeout();

        let m = cb.metrics();
        assert_eq!(m.total_requests, 4);
        assert_eq!(m.total_failures, 1);
        assert_eq!(m.total_timeouts, 1);
        assert_eq!(m.success_rate, 75.0);
        assert!(m.last_failure_time.is_some());
        assert!(m.last_success_time.is_some());

        cb.reset();
        let m = cb.metrics();
        assert_eq!(m.total_requests, 0);
        assert!(m.last_failure_time.is_none());
    }

    #[test]
    fn test_manager_lazy_breakers() {
        let manager = CircuitBreakerManager::default();
        assert!(manager.status().is_empty());

        let a = manager.get("student");
        let b = manager.get("student");
        assert!(Arc::ptr_eq(&a, &b));
        manager.get("lesson");
        assert_eq!(manager.status().len(), 2);

        for _ in 0..5 {
            a.record_failure();
        }
        assert_eq!(manager.status()["student"], CircuitState::Open);
        assert_eq!(manager.metrics()["student"].total_failures, 5);

        assert!(manager.reset("student"));
        assert!(!manager.reset("payment"));
        assert_eq!(manager.status()["student"], CircuitState::Closed);

        manager.get("lesson").record_failure();
        manager.reset_all();
        assert_eq!(manager.metrics()["lesson"].total_requests, 0);
    }
}
