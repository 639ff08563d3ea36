// src/io/collector.rs
//
// Delivery client for the AquaWatch collector.
// A `CollectorTransport` seam separates the retry policy from the wire so
// the policy is testable without a live collector; `HttpCollector` is the
// production transport, POSTing readings as JSON.

use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::CollectorConfig;
use crate::io::error::IoError;
use crate::io::Reading;

// ============================================================================
// Transport Seam
// ============================================================================

/// Where readings are pushed. `HttpCollector` in production; scripted
/// transports in tests.
pub trait CollectorTransport {
    /// Push one reading to the ingestion endpoint. One attempt, no retries.
    fn submit(&self, reading: &Reading) -> Result<(), IoError>;

    /// Readiness probe, invoked once before ingestion starts.
    fn check_ready(&self) -> Result<(), IoError>;
}

// ============================================================================
// HTTP Transport
// ============================================================================

/// reqwest-backed transport for the collector HTTP API.
pub struct HttpCollector {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpCollector {
    /// Build a client with the configured fixed request timeout.
    pub fn new(config: &CollectorConfig) -> Result<Self, IoError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| IoError::connection(&config.base_url, e.to_string()))?;

        Ok(HttpCollector {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl CollectorTransport for HttpCollector {
    fn submit(&self, reading: &Reading) -> Result<(), IoError> {
        let url = format!("{}/sensor", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(reading)
            .send()
            .map_err(|e| IoError::connection(&url, e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            return Ok(());
        }

        let body = response.text().unwrap_or_default();
        Err(IoError::protocol(
            &url,
            format!("status {}: {}", status, body),
        ))
    }

    fn check_ready(&self) -> Result<(), IoError> {
        let url = format!("{}/ping", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| IoError::connection(&url, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(IoError::protocol(&url, format!("status {}", status)))
        }
    }
}

// ============================================================================
// Delivery Client
// ============================================================================

/// Bounded-retry delivery policy over any transport.
///
/// A fixed delay separates failed attempts; there is no backoff and no
/// jitter. There is one device and one destination, so the blocking sleep
/// is the whole concurrency story.
pub struct DeliveryClient<T: CollectorTransport> {
    transport: T,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<T: CollectorTransport> DeliveryClient<T> {
    pub fn new(transport: T, max_attempts: u32, retry_delay: Duration) -> Self {
        DeliveryClient {
            transport,
            max_attempts,
            retry_delay,
        }
    }

    /// Deliver one reading.
    ///
    /// Tries up to `max_attempts` times, sleeping the fixed delay between
    /// failed attempts (never after the last). All failure modes resolve to
    /// `false`; this never panics and never returns an error.
    pub fn deliver(&self, reading: &Reading) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.transport.submit(reading) {
                Ok(()) => {
                    debug!(
                        ph = reading.ph,
                        tds = reading.tds,
                        turbidity = reading.turbidity,
                        "reading delivered"
                    );
                    return true;
                }
                Err(e) => {
                    warn!(
                        attempt,
                        limit = self.max_attempts,
                        error = %e,
                        "delivery attempt failed"
                    );
                    if attempt < self.max_attempts {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        error!(
            attempts = self.max_attempts,
            "reading dropped after retry exhaustion"
        );
        false
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Instant;

    /// Transport that fails the first `fail_first` submissions, then accepts.
    struct ScriptedTransport {
        fail_first: u32,
        submissions: Cell<u32>,
    }

    impl ScriptedTransport {
        fn failing(fail_first: u32) -> Self {
            ScriptedTransport {
                fail_first,
                submissions: Cell::new(0),
            }
        }
    }

    impl CollectorTransport for ScriptedTransport {
        fn submit(&self, _reading: &Reading) -> Result<(), IoError> {
            let n = self.submissions.get() + 1;
            self.submissions.set(n);
            if n <= self.fail_first {
                Err(IoError::connection("http://collector/sensor", "refused"))
            } else {
                Ok(())
            }
        }

        fn check_ready(&self) -> Result<(), IoError> {
            Ok(())
        }
    }

    fn reading() -> Reading {
        Reading {
            ph: 7.0,
            tds: 100.0,
            turbidity: 1.0,
        }
    }

    #[test]
    fn test_first_attempt_success_skips_retries() {
        let client = DeliveryClient::new(ScriptedTransport::failing(0), 3, Duration::ZERO);
        assert!(client.deliver(&reading()));
        assert_eq!(client.transport.submissions.get(), 1);
    }

    #[test]
    fn test_retries_until_success() {
        let client = DeliveryClient::new(ScriptedTransport::failing(2), 3, Duration::ZERO);
        assert!(client.deliver(&reading()));
        assert_eq!(client.transport.submissions.get(), 3);
    }

    #[test]
    fn test_exhaustion_returns_failure_after_exact_attempts() {
        let client = DeliveryClient::new(ScriptedTransport::failing(u32::MAX), 3, Duration::ZERO);
        assert!(!client.deliver(&reading()));
        assert_eq!(client.transport.submissions.get(), 3);
    }

    #[test]
    fn test_fixed_delay_between_attempts_but_not_after_last() {
        let delay = Duration::from_millis(20);
        let client = DeliveryClient::new(ScriptedTransport::failing(u32::MAX), 3, delay);

        let start = Instant::now();
        assert!(!client.deliver(&reading()));
        let elapsed = start.elapsed();

        // Two inter-attempt delays, none after the third attempt.
        assert!(elapsed >= delay * 2, "elapsed {:?}", elapsed);
    }
}
