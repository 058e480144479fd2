//! Best-effort notification port.
//!
//! Delivery is not part of the correctness contract: a failed
//! notification never rolls back a committed transition. The service
//! layer logs failures and moves on. The registry of live connections
//! behind an implementation belongs to the host process and is injected
//! here, never held as module-global state.

use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;

/// A notification could not be delivered.
#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Fire-and-forget notification sink.
pub trait Notifier: Send + Sync {
    /// Delivers one notification. Best effort; the caller logs and
    /// swallows errors.
    fn notify(&self, event_kind: &str, payload: &Value) -> Result<(), NotifyError>;
}

/// Notifier that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event_kind: &str, _payload: &Value) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Notifier that records deliveries in memory. A test double for hosts
/// wiring up the service layer.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(String, Value)>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded `(kind, payload)` pairs in delivery order.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder of the record lock panicked.
    #[must_use]
    pub fn delivered(&self) -> Vec<(String, Value)> {
        self.delivered.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event_kind: &str, payload: &Value) -> Result<(), NotifyError> {
        self.delivered
            .lock()
            .map_err(|_| NotifyError("recorder lock poisoned".to_owned()))?
            .push((event_kind.to_owned(), payload.clone()));
        Ok(())
    }
}

/// Notifier that always fails. Exercises the swallow-and-log path.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, event_kind: &str, _payload: &Value) -> Result<(), NotifyError> {
        Err(NotifyError(format!("refusing to deliver '{event_kind}'")))
    }
}
