// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Activity telemetry.
//
// The session reports one event per successful operation to an
// `ActivitySink`. Sink failures never reach the caller: the session logs them
// at `warn` and carries on. `record` is called inline on the async thread, so
// a sink that delivers somewhere slow should queue the event and return, as
// `ChannelSink` does.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use retouch_core::error::{Result, RetouchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::info;

/// Receiver for operation events.
///
/// Called from async code on the session's task. Implementations must not
/// block: no network or disk round-trips inside `record`.
pub trait ActivitySink: Send + Sync {
    /// Record one event. `metadata` is a JSON object.
    fn record(&self, event_type: &str, metadata: Value) -> Result<()>;
}

/// SHA-256 of `data` as lowercase hex, used to fingerprint produced samples.
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Emits each event as an `info!` line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ActivitySink for TracingSink {
    fn record(&self, event_type: &str, metadata: Value) -> Result<()> {
        info!(event = event_type, %metadata, "activity");
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ActivitySink for NullSink {
    fn record(&self, _event_type: &str, _metadata: Value) -> Result<()> {
        Ok(())
    }
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub event_type: String,
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

/// Keeps events in memory. Clones share the same log, so a caller can hand
/// one clone to a session and read events back through another.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<ActivityEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far, oldest first.
    pub fn events(&self) -> Vec<ActivityEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ActivitySink for MemorySink {
    fn record(&self, event_type: &str, metadata: Value) -> Result<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| RetouchError::Task("activity log lock poisoned".into()))?;
        events.push(ActivityEvent {
            event_type: event_type.to_string(),
            metadata,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}

/// Hands each event to an unbounded channel and returns at once. The
/// receiving end is drained by whatever task does the real delivery.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ActivityEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ActivityEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ActivitySink for ChannelSink {
    fn record(&self, event_type: &str, metadata: Value) -> Result<()> {
        self.sender
            .send(ActivityEvent {
                event_type: event_type.to_string(),
                metadata,
                timestamp: Utc::now(),
            })
            .map_err(|_| RetouchError::Task("activity receiver closed".into()))
    }
}
