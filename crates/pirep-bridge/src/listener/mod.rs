//! UDP telemetry listener.
//!
//! One task owns the socket. Each datagram is decoded and handed to the
//! [`SampleHandler`] before the next one is read, so samples are applied in
//! arrival order. Receives are bounded by a short timeout so the loop can
//! notice cancellation between packets.

mod metrics;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::service::SampleOutcome;
use crate::telemetry::{self, TelemetrySample};

pub use metrics::{ListenerMetrics, MetricsSnapshot, NO_OUTCOME};

/// Largest datagram accepted.
pub const MAX_DATAGRAM_BYTES: usize = 64 * 1024;

/// How long a receive waits before checking for cancellation.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Consumer of decoded telemetry samples.
#[async_trait::async_trait]
pub trait SampleHandler: Send + Sync {
    /// Apply one sample.
    async fn handle_sample(&self, sample: &TelemetrySample) -> Result<SampleOutcome>;
}

/// Receives telemetry datagrams and forwards them to a [`SampleHandler`].
#[derive(Debug)]
pub struct DatagramListener {
    socket: UdpSocket,
    metrics: Arc<ListenerMetrics>,
    read_timeout: Duration,
    max_datagram_bytes: usize,
}

impl DatagramListener {
    /// Bind the telemetry socket.
    ///
    /// # Errors
    ///
    /// Returns `SocketBind` if the address can't be bound.
    pub async fn bind(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::SocketBind {
                addr: addr.to_string(),
                source,
            })?;

        Ok(Self {
            socket,
            metrics: Arc::new(ListenerMetrics::new()),
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_datagram_bytes: MAX_DATAGRAM_BYTES,
        })
    }

    /// Set the receive timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the receive buffer size.
    #[must_use]
    pub fn with_max_datagram_bytes(mut self, bytes: usize) -> Self {
        self.max_datagram_bytes = bytes.max(1);
        self
    }

    /// The bound address.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the socket can't report its address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Shared handle to the listener's metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<ListenerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Receive until `cancel` fires.
    ///
    /// Receive errors are logged and the loop carries on; cancellation is
    /// noticed at the latest one read timeout after it fires.
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok` once cancelled.
    pub async fn run<H>(&self, handler: &H, cancel: CancellationToken) -> Result<()>
    where
        H: SampleHandler + ?Sized,
    {
        info!(addr = ?self.socket.local_addr().ok(), "UDP listener started");

        let mut buffer = vec![0u8; self.max_datagram_bytes];
        while !cancel.is_cancelled() {
            let received =
                tokio::time::timeout(self.read_timeout, self.socket.recv_from(&mut buffer)).await;

            match received {
                Err(_elapsed) => {
                    trace!("UDP read tick");
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Error reading from UDP");
                }
                Ok(Ok((len, from))) => {
                    self.process(handler, &buffer[..len], from).await;
                }
            }
        }

        info!(packets = self.metrics.packets_any(), "UDP listener stopped");
        Ok(())
    }

    async fn process<H>(&self, handler: &H, payload: &[u8], from: SocketAddr)
    where
        H: SampleHandler + ?Sized,
    {
        self.metrics.record_packet(from);

        let sample = match telemetry::decode(payload) {
            Ok(sample) => sample,
            Err(e) => {
                self.metrics.record_decode_error(payload);
                debug!(error = %e, %from, len = payload.len(), "Failed to decode telemetry");
                return;
            }
        };
        self.metrics.record_sample(&sample);

        match handler.handle_sample(&sample).await {
            Ok(outcome) => self.metrics.record_outcome(&outcome),
            Err(e @ Error::ReadOnly { .. }) => {
                warn!(error = %e, "PIREP is read-only, skipping sample");
                self.metrics.record_failure(&e.to_string());
            }
            Err(e) => {
                warn!(error = %e, status = %sample.status, "Sample rejected");
                self.metrics.record_failure(&e.to_string());
            }
        }
    }
}
