/// Best-effort publishing of aggregated records
use log::{error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::PublishError;
use crate::models::AggregatedRecord;
use crate::sink::influx::Sink;
use crate::sink::point::Point;

/// Hands aggregated records to a background writer
///
/// At most one point waits for the writer, so a slow database never stalls
/// notification handling; a record arriving while the slot is occupied is
/// dropped.
pub struct SinkPublisher {
    outbound: Option<mpsc::Sender<Point>>,
}

impl SinkPublisher {
    /// Publisher with no sink configured, every publish is a no-op
    pub fn disabled() -> Self {
        SinkPublisher { outbound: None }
    }

    /// Start the writer task for `sink`
    ///
    /// The task ends once the publisher is dropped and the queued point
    /// has been written.
    pub fn spawn<S: Sink + 'static>(sink: S) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(write_points(sink, rx));
        (SinkPublisher { outbound: Some(tx) }, handle)
    }

    pub fn is_enabled(&self) -> bool {
        self.outbound.is_some()
    }

    /// Queue `record` for writing under its own timestamp
    pub fn publish(&self, record: &AggregatedRecord) -> Result<(), PublishError> {
        let Some(outbound) = &self.outbound else {
            return Ok(());
        };

        let point = Point::from_record(record);
        outbound.try_send(point).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PublishError::Busy,
            mpsc::error::TrySendError::Closed(_) => PublishError::Closed,
        })
    }
}

async fn write_points<S: Sink>(sink: S, mut rx: mpsc::Receiver<Point>) {
    while let Some(point) = rx.recv().await {
        match sink.write_point(&point).await {
            Ok(()) => info!(
                "Stored {} point at {}: {}",
                point.measurement,
                point.timestamp(),
                point.to_line_protocol()
            ),
            Err(e) => error!(
                "Failed to store {} point at {}: {}",
                point.measurement,
                point.timestamp(),
                e
            ),
        }
    }
}
