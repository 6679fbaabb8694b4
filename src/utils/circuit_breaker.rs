use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Fails calls fast while the bus is unhealthy instead of letting every
// request wait out its own timeout.
//
// States:
// - Closed:   calls pass through, consecutive failures are counted
// - Open:     calls are rejected until `open_for` has elapsed
// - HalfOpen: calls pass through; enough successes close, one failure reopens
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding used by the metrics registry.
    pub fn as_gauge(&self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing
    pub open_for: Duration,
    /// Successes in half-open needed to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
            success_threshold: 3,
        }
    }
}

struct Tracker {
    state: CircuitState,
    failures: u32,
    successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    tracker: Arc<Mutex<Tracker>>,
    config: CircuitBreakerConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker is open")]
    CircuitOpen,
    #[error(transparent)]
    OperationFailed(E),
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            tracker: Arc::new(Mutex::new(Tracker {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                opened_at: None,
            })),
            config,
        }
    }

    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        self.admit().await?;

        match operation.await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(error) => {
                self.on_failure().await;
                Err(CircuitBreakerError::OperationFailed(error))
            }
        }
    }

    async fn admit<E>(&self) -> Result<(), CircuitBreakerError<E>> {
        let mut tracker = self.tracker.lock().await;

        if tracker.state == CircuitState::Open {
            let elapsed = tracker.opened_at.map(|at| at.elapsed());
            match elapsed {
                Some(elapsed) if elapsed >= self.config.open_for => {
                    tracing::info!("Circuit breaker half-open, probing");
                    tracker.state = CircuitState::HalfOpen;
                    tracker.successes = 0;
                }
                _ => return Err(CircuitBreakerError::CircuitOpen),
            }
        }

        Ok(())
    }

    async fn on_success(&self) {
        let mut tracker = self.tracker.lock().await;

        match tracker.state {
            CircuitState::HalfOpen => {
                tracker.successes += 1;
                if tracker.successes >= self.config.success_threshold {
                    tracing::info!(successes = tracker.successes, "Circuit breaker closed");
                    tracker.state = CircuitState::Closed;
                    tracker.failures = 0;
                    tracker.successes = 0;
                    tracker.opened_at = None;
                }
            }
            CircuitState::Closed => tracker.failures = 0,
            CircuitState::Open => {}
        }
    }

    async fn on_failure(&self) {
        let mut tracker = self.tracker.lock().await;
        tracker.failures += 1;

        match tracker.state {
            CircuitState::Closed if tracker.failures >= self.config.failure_threshold => {
                tracing::warn!(failures = tracker.failures, "Circuit breaker opened");
                tracker.state = CircuitState::Open;
                tracker.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                tracing::warn!("Probe failed, circuit breaker reopened");
                tracker.state = CircuitState::Open;
                tracker.opened_at = Some(Instant::now());
                tracker.successes = 0;
            }
            _ => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.tracker.lock().await.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(open_for: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            open_for,
            success_threshold: 1,
        })
    }

    #[tokio::test]
    async fn test_opens_after_consecutive_failures() {
        let cb = breaker(Duration::from_secs(60));

        for _ in 0..3 {
            let result = cb.call(async { Err::<(), _>("broker down") }).await;
            assert!(matches!(result, Err(CircuitBreakerError::OperationFailed(_))));
        }
        assert_eq!(cb.state().await, CircuitState::Open);

        let result = cb.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen)));
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let cb = breaker(Duration::from_secs(60));

        for _ in 0..2 {
            let _ = cb.call(async { Err::<(), _>("blip") }).await;
        }
        let _ = cb.call(async { Ok::<_, &str>(()) }).await;
        let _ = cb.call(async { Err::<(), _>("blip") }).await;

        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_probe_closes_circuit() {
        let cb = breaker(Duration::from_millis(50));

        for _ in 0..3 {
            let _ = cb.call(async { Err::<(), _>("broker down") }).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;

        let result = cb.call(async { Ok::<_, &str>(7) }).await;
        assert!(matches!(result, Ok(7)));
        assert_eq!(cb.state().await, CircuitState::Closed);
    }
}
