//! Transport over any async byte stream: raw writes out, lines in.

use super::Transport;
use super::serial::open_serial;
use crate::error::{GameError, TransportError};
use crate::settings::PortSettings;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, WriteHalf};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_serial::SerialStream;
use tracing::{debug, instrument, warn};

/// Lines buffered between the reader task and [`Transport::read_line`].
const LINE_BUFFER: usize = 16;

/// Transport over an opened serial port.
pub type SerialTransport = LineTransport<WriteHalf<SerialStream>>;

/// Splits the inbound byte stream into lines on a background task.
///
/// The reader task is the only consumer of the inbound stream; lines are
/// queued in arrival order and handed out one at a time by `read_line`,
/// which can therefore be raced against a timeout without losing bytes.
pub struct LineTransport<W> {
    lines: Mutex<mpsc::Receiver<Result<String, TransportError>>>,
    writer: Mutex<W>,
    reader_task: JoinHandle<()>,
}

impl<W> LineTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a transport from separate read and write halves.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip_all)]
    pub fn new<R>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        let reader_task = tokio::spawn(pump_lines(reader, tx));
        Self {
            lines: Mutex::new(rx),
            writer: Mutex::new(writer),
            reader_task,
        }
    }
}

impl<S> LineTransport<WriteHalf<S>>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Creates a transport over a bidirectional stream.
    #[instrument(skip_all)]
    pub fn from_stream(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, writer)
    }
}

impl SerialTransport {
    /// Opens the port named by `settings` at its configured baud rate.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip(settings), fields(port = ?settings.port_name()))]
    pub fn open(settings: &PortSettings) -> Result<Self, GameError> {
        Ok(Self::from_stream(open_serial(settings)?))
    }
}

#[async_trait::async_trait]
impl<W> Transport for LineTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    async fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        debug!(message = %String::from_utf8_lossy(bytes).trim_end(), "Sent to peer");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read_line(&self) -> Result<Option<String>, TransportError> {
        let mut lines = self.lines.lock().await;
        match lines.recv().await {
            Some(Ok(line)) => {
                debug!(%line, "Received from peer");
                Ok(Some(line))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

impl<W> Drop for LineTransport<W> {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

async fn pump_lines<R>(reader: R, tx: mpsc::Sender<Result<String, TransportError>>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(Ok(line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("Inbound stream ended");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Inbound stream failed");
                // The receiver may already be gone; nothing else to report to.
                let _ = tx.send(Err(TransportError::from(e))).await;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_and_read_lines() {
        let (local, remote) = tokio::io::duplex(256);
        let transport = LineTransport::from_stream(local);
        let (mut remote_rx, mut remote_tx) = tokio::io::split(remote);

        transport.send(b"00 01 02 10 11 12 20 21 22 ").await.unwrap();
        let mut buf = vec![0u8; 27];
        tokio::io::AsyncReadExt::read_exact(&mut remote_rx, &mut buf)
            .await
            .unwrap();
        assert_eq!(&buf, b"00 01 02 10 11 12 20 21 22 ");

        remote_tx.write_all(b"11\r\n20\n").await.unwrap();
        assert_eq!(transport.read_line().await.unwrap(), Some("11".to_string()));
        assert_eq!(transport.read_line().await.unwrap(), Some("20".to_string()));
    }

    #[tokio::test]
    async fn test_read_line_reports_end_of_stream() {
        let (local, remote) = tokio::io::duplex(64);
        let transport = LineTransport::from_stream(local);
        drop(remote);
        assert_eq!(transport.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_requires_settings() {
        let result = SerialTransport::open(&PortSettings::new());
        assert!(matches!(result, Err(GameError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_open_missing_device_fails() {
        let settings = PortSettings::open("/nonexistent/tty-for-tests", 9600).unwrap();
        let result = SerialTransport::open(&settings);
        assert!(matches!(result, Err(GameError::Transport(_))));
    }
}
