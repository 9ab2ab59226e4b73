//! Channel construction shared by the store clients.

use std::time::Duration;

use anyhow::{Context, Result};
use tonic::transport::{Channel, Endpoint};
use tracing::info;

/// Timeouts applied to every store connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    /// Upper bound on establishing the TCP/HTTP2 connection
    pub connect: Duration,

    /// Upper bound on each individual call
    pub request: Duration,
}

impl ClientTimeouts {
    pub fn from_millis(connect_ms: u64, request_ms: u64) -> Self {
        Self {
            connect: Duration::from_millis(connect_ms),
            request: Duration::from_millis(request_ms),
        }
    }
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self::from_millis(2_000, 5_000)
    }
}

/// Connect eagerly to `addr` (e.g. "http://localhost:50061").
///
/// Fails if the address is malformed or nothing answers within
/// `timeouts.connect`.
pub async fn connect_channel(addr: &str, timeouts: &ClientTimeouts) -> Result<Channel> {
    info!("Connecting to store at {}", addr);

    let channel = Endpoint::from_shared(addr.to_string())
        .with_context(|| format!("Invalid store address {}", addr))?
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .connect()
        .await
        .with_context(|| format!("Connecting to store at {}", addr))?;

    Ok(channel)
}
