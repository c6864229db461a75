//! Usage recording.
//!
//! Every terminal outcome — success, decline, or failure — produces exactly
//! one [`UsageRecord`] appended to the external [`UsageSink`]. The append is
//! fire-and-forget from the engine's perspective: the caller's response is
//! never blocked on it, and a failed append is logged but not propagated.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::UsageError;
use crate::request::{RequestKind, Tier};

/// One attempt's worth of usage, as written to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct UsageRecord {
    pub caller_id: Uuid,
    pub tier: Tier,
    pub credits_charged: i64,
    pub request_kind: RequestKind,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// Append-only usage log sink. Durability is the sink's concern.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn append(&self, record: UsageRecord) -> Result<(), UsageError>;
}

/// Writes usage records to the sink without blocking the caller.
pub struct UsageRecorder {
    sink: Arc<dyn UsageSink>,
}

impl UsageRecorder {
    pub fn new(sink: Arc<dyn UsageSink>) -> Self {
        Self { sink }
    }

    /// Record one terminal outcome. Spawns the sink write; append failures
    /// are logged at warn level and never reach the caller.
    pub fn record(
        &self,
        caller_id: Uuid,
        tier: Tier,
        credits_charged: i64,
        request_kind: RequestKind,
        success: bool,
    ) {
        let record = UsageRecord {
            caller_id,
            tier,
            credits_charged,
            request_kind,
            success,
            timestamp: Utc::now(),
        };
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(err) = sink.append(record).await {
                tracing::warn!(error = %err, "usage record append failed");
            }
        });
    }
}

/// Sink that emits each record as a JSON line through tracing.
///
/// Useful as a default when no durable sink is wired in.
#[derive(Default)]
pub struct LoggingSink;

#[async_trait]
impl UsageSink for LoggingSink {
    async fn append(&self, record: UsageRecord) -> Result<(), UsageError> {
        let json = serde_json::to_string(&record).map_err(|e| UsageError::Sink(e.to_string()))?;
        tracing::info!(usage = %json, "usage record");
        Ok(())
    }
}

/// Sink that captures records for test assertions.
pub struct RecordingSink {
    records: Arc<Mutex<Vec<UsageRecord>>>,
}

impl RecordingSink {
    /// Create a recording sink and a handle to the captured records.
    pub fn new() -> (Self, Arc<Mutex<Vec<UsageRecord>>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                records: Arc::clone(&records),
            },
            records,
        )
    }
}

#[async_trait]
impl UsageSink for RecordingSink {
    async fn append(&self, record: UsageRecord) -> Result<(), UsageError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recorder_appends_one_record() {
        let (sink, records) = RecordingSink::new();
        let recorder = UsageRecorder::new(Arc::new(sink));
        let caller = Uuid::new_v4();

        recorder.record(caller, Tier::Worker, 1, RequestKind::Chart, true);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let captured = records.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].caller_id, caller);
        assert_eq!(captured[0].tier, Tier::Worker);
        assert_eq!(captured[0].credits_charged, 1);
        assert!(captured[0].success);
    }

    #[tokio::test]
    async fn logging_sink_serializes() {
        let sink = LoggingSink;
        let record = UsageRecord {
            caller_id: Uuid::new_v4(),
            tier: Tier::Thinker,
            credits_charged: 5,
            request_kind: RequestKind::Analysis,
            success: true,
            timestamp: Utc::now(),
        };
        assert!(sink.append(record).await.is_ok());
    }
}
