//! Fire-and-forget hand-off of completed traces to the reporting agent.
//!
//! The tracer hands each completed trace to a [`TraceSink`] exactly once.
//! Batching, retry, and upload are the sink consumer's responsibility; the
//! tracer side must never block request completion, so the bundled channel
//! sink uses a bounded queue and drops on overflow rather than waiting.

use async_trait::async_trait;
use graphql_trace_proto::Trace;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::{debug, warn};

use crate::error::TracerError;

/// A completed trace plus the operation identifiers the reporting agent
/// needs to group it.
#[derive(Clone, Debug)]
pub struct TraceReport {
    pub operation_name: String,
    /// Normalized query signature/hash, computed upstream and carried
    /// through opaquely. Empty when the pipeline supplied none.
    pub signature: String,
    /// Raw query text, when the request carried one.
    pub query: Option<String>,
    pub trace: Trace,
}

/// Destination for completed traces. Each call carries an independent,
/// fully-owned report, so submissions for different requests may overlap
/// freely.
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn submit(&self, report: TraceReport);
}

/// Sink backed by a bounded tokio mpsc channel. The receiving half is the
/// reporting agent's worker loop.
#[derive(Clone, Debug)]
pub struct ChannelTraceSink {
    tx: Sender<TraceReport>,
}

impl ChannelTraceSink {
    /// Creates the sink and the receiver its consumer drains.
    pub fn pair(capacity: usize) -> (Self, Receiver<TraceReport>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ChannelTraceSink { tx }, rx)
    }

    /// Non-blocking submission, surfacing queue state to callers that want
    /// the signal instead of the log line.
    pub fn try_submit(&self, report: TraceReport) -> Result<(), TracerError> {
        self.tx.try_send(report).map_err(|err| match err {
            TrySendError::Full(_) => TracerError::SinkFull,
            TrySendError::Closed(_) => TracerError::SinkClosed,
        })
    }
}

#[async_trait]
impl TraceSink for ChannelTraceSink {
    async fn submit(&self, report: TraceReport) {
        let operation = report.operation_name.clone();
        match self.try_submit(report) {
            Ok(()) => debug!("Buffered trace for operation '{operation}'"),
            Err(TracerError::SinkFull) => {
                warn!("Trace sink queue full, dropping trace for operation '{operation}'");
            }
            Err(err) => debug!("Trace sink unavailable ({err}), dropping trace"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn report(name: &str) -> TraceReport {
        TraceReport {
            operation_name: name.to_string(),
            signature: String::new(),
            query: None,
            trace: Trace::default(),
        }
    }

    #[tokio::test]
    async fn test_submit_reaches_consumer() {
        let (sink, mut rx) = ChannelTraceSink::pair(4);
        sink.submit(report("GetHero")).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.operation_name, "GetHero");
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (sink, mut rx) = ChannelTraceSink::pair(1);
        sink.submit(report("first")).await;
        // Queue is full; this returns immediately and drops.
        sink.submit(report("second")).await;
        assert_eq!(rx.recv().await.unwrap().operation_name, "first");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_try_submit_reports_queue_state() {
        let (sink, rx) = ChannelTraceSink::pair(1);
        assert!(sink.try_submit(report("a")).is_ok());
        assert!(matches!(
            sink.try_submit(report("b")),
            Err(TracerError::SinkFull)
        ));
        drop(rx);
        assert!(matches!(
            sink.try_submit(report("c")),
            Err(TracerError::SinkClosed)
        ));
    }
}
