// src/worker.rs
//
// Ingestion supervisor: one sequential loop wiring the serial session, the
// line parser and the delivery client together. Tracks consecutive failures
// and trips a circuit breaker rather than spinning forever against a dead
// collector. There is no internal parallelism: polling, parsing and delivery
// happen strictly one at a time, and retry sleeps block the worker thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::config::{SupervisorConfig, WorkerConfig};
use crate::io::collector::{CollectorTransport, DeliveryClient, HttpCollector};
use crate::io::parser::parse_line;
use crate::io::serial::SerialSession;
use crate::io::IoError;

// ============================================================================
// Line Source Seam
// ============================================================================

/// Where the supervisor pulls raw lines from. `SerialSession` in production;
/// scripted sources in tests.
pub trait LineSource {
    /// Pull the next line if one is ready. `Ok(None)` means "nothing this
    /// cycle"; `Err` is an iteration fault (counted and cooled down).
    fn poll_line(&mut self) -> Result<Option<String>, IoError>;
}

impl LineSource for SerialSession {
    fn poll_line(&mut self) -> Result<Option<String>, IoError> {
        SerialSession::poll_line(self)
    }
}

// ============================================================================
// Failure Tracking
// ============================================================================

/// Consecutive-failure counter backing the circuit breaker.
/// Delivery failures and iteration faults both count; any delivery success
/// resets the streak.
struct FailureTracker {
    consecutive: u32,
    ceiling: u32,
}

impl FailureTracker {
    fn new(ceiling: u32) -> Self {
        FailureTracker {
            consecutive: 0,
            ceiling,
        }
    }

    fn record_failure(&mut self) {
        self.consecutive += 1;
    }

    fn record_success(&mut self) {
        self.consecutive = 0;
    }

    fn tripped(&self) -> bool {
        self.consecutive >= self.ceiling
    }
}

// ============================================================================
// Worker Loop
// ============================================================================

/// Why the ingestion loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Stop flag flipped by the interrupt handler.
    Interrupted,
    /// Consecutive-failure ceiling reached.
    BreakerTripped,
}

/// Run the steady-state loop over an already-connected line source.
///
/// Owns the source for the duration of the loop and drops it on return, so
/// the underlying handle is released exactly once on every exit path.
pub fn run_loop<S, T>(
    mut source: S,
    delivery: &DeliveryClient<T>,
    config: &SupervisorConfig,
    stop: &AtomicBool,
) -> WorkerExit
where
    S: LineSource,
    T: CollectorTransport,
{
    let mut failures = FailureTracker::new(config.failure_ceiling);
    let cooldown = config.fault_cooldown();

    loop {
        if stop.load(Ordering::Relaxed) {
            info!("interrupt received, stopping ingestion");
            return WorkerExit::Interrupted;
        }

        match source.poll_line() {
            Ok(None) => {}
            Ok(Some(line)) => {
                debug!(line = %line, "received line");
                match parse_line(&line) {
                    Some(reading) => {
                        if delivery.deliver(&reading) {
                            failures.record_success();
                        } else {
                            failures.record_failure();
                        }
                    }
                    // Parse rejection is not a delivery failure: the counter
                    // is untouched and the loop moves on.
                    None => debug!(line = %line, "line not parseable, skipping"),
                }
            }
            Err(e) => {
                // Anything that is not a delivery failure: count it, then
                // back off harder so a wedged device doesn't spin the loop.
                warn!(error = %e, "iteration fault");
                failures.record_failure();
                thread::sleep(cooldown);
            }
        }

        if failures.tripped() {
            error!(
                consecutive = failures.consecutive,
                "too many consecutive failures, stopping worker"
            );
            return WorkerExit::BreakerTripped;
        }
    }
}

/// Full worker lifecycle: collector readiness probe, serial acquisition,
/// steady-state loop. Startup failures return `Err`; a started worker always
/// ends with a `WorkerExit`.
pub fn run(config: &WorkerConfig, stop: Arc<AtomicBool>) -> Result<WorkerExit, IoError> {
    info!("starting ingestion worker");

    let transport = HttpCollector::new(&config.collector)?;
    match transport.check_ready() {
        Ok(()) => info!(url = %config.collector.base_url, "collector is ready"),
        Err(e) => {
            error!(error = %e, "collector readiness probe failed");
            return Err(e);
        }
    }

    let session = match SerialSession::connect(&config.serial) {
        Ok(session) => session,
        Err(e) => {
            error!(
                attempts = config.serial.connect_attempts,
                error = %e,
                "could not open the sensor device"
            );
            error!(
                "check that the sensor is attached at {}, that no other program holds \
                 the port, and that the port path is correct (`aquatap --list-ports` \
                 shows candidates)",
                config.serial.port
            );
            return Err(e);
        }
    };

    let delivery = DeliveryClient::new(
        transport,
        config.collector.max_attempts,
        config.collector.retry_delay(),
    );

    Ok(run_loop(session, &delivery, &config.supervisor, &stop))
}

// ============================================================================
// Tests
// ============================================================================
