//! Byte link to the remote peer.

mod line;
mod serial;

pub use line::{LineTransport, SerialTransport};
pub use serial::{available_ports, open_serial};

use crate::error::TransportError;

/// Carries encoded boards to the peer and its replies back.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Writes `bytes` to the peer.
    async fn send(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Waits for the next line from the peer, without its terminator.
    ///
    /// Returns `Ok(None)` once the peer has closed the link.
    async fn read_line(&self) -> Result<Option<String>, TransportError>;
}
