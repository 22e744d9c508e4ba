//! Domain events
//!
//! Accepted transitions publish a [`StatusChanged`] event to an external sink
//! (WebSocket fan-out, notification delivery). Publication is fire-and-forget
//! after commit: a failing sink can never roll back a status change.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Emitted after a status change has committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChanged {
    pub task_id: i64,
    pub from: Option<String>,
    pub to: String,
    pub at: NaiveDateTime,
}

/// Destination for domain events
///
/// Implementors deliver to whatever transport the deployment uses. `publish`
/// is infallible from the engine's point of view; sinks handle their own
/// delivery failures.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: StatusChanged);
}

/// Sink that drops every event; the default when none is configured
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn publish(&self, _event: StatusChanged) {}
}
