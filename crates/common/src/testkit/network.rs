use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::sync::{Transport, TransportError};

/// In-memory transport: one end of a pair of crossed channels.
///
/// Dropping an end (or calling `close`) looks to the other end like a clean
/// remote hangup, which is exactly what sessions see when a WebSocket goes
/// away.
pub struct DuplexTransport {
    tx: Option<mpsc::Sender<Bytes>>,
    rx: mpsc::Receiver<Bytes>,
}

/// Two connected in-memory transports.
pub fn duplex_pair() -> (DuplexTransport, DuplexTransport) {
    let (left_tx, right_rx) = mpsc::channel(64);
    let (right_tx, left_rx) = mpsc::channel(64);
    (
        DuplexTransport {
            tx: Some(left_tx),
            rx: left_rx,
        },
        DuplexTransport {
            tx: Some(right_tx),
            rx: right_rx,
        },
    )
}

#[async_trait::async_trait]
impl Transport for DuplexTransport {
    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        match &self.tx {
            Some(tx) => tx.send(frame).await.map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }

    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // dropping our sender is what the other end observes
        self.tx.take();
        self.rx.close();
        Ok(())
    }
}

/// Poll a condition until it succeeds or the timeout elapses.
///
/// Transient `Err` results from the condition are treated like `Ok(false)`
/// and polled again; only the timeout fails the wait.
pub async fn eventually<F, Fut>(timeout: Duration, condition: F) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<bool>>,
{
    let start = std::time::Instant::now();
    let poll_interval = Duration::from_millis(20);

    loop {
        match condition().await {
            Ok(true) => {
                tracing::debug!("eventual condition met after {:?}", start.elapsed());
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => {
                tracing::debug!("eventual condition check error: {}", e);
            }
        }

        if start.elapsed() > timeout {
            return Err(anyhow::anyhow!(
                "condition not met within timeout ({:?})",
                timeout
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
