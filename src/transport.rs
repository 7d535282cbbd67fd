//! Connection transport abstraction
//!
//! The registry never touches sockets directly. It drives connections through
//! [`Transport`], which exposes exactly what a broadcast round needs: a read
//! bounded by a deadline (used as the liveness probe), a write, and a close.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Result of a deadline-bounded read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Peer sent this many bytes
    Data(usize),
    /// Peer closed its side of the stream
    Eof,
    /// Nothing arrived before the deadline
    TimedOut,
}

/// Capability interface for a registered connection
pub trait Transport: Send + 'static {
    /// Read into `buf`, giving up after `deadline`
    fn read_with_deadline(
        &mut self,
        buf: &mut [u8],
        deadline: Duration,
    ) -> impl Future<Output = io::Result<ReadOutcome>> + Send;

    /// Write all of `data`
    fn write(&mut self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Shut the connection down
    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

/// Transport used for accepted and dialed TCP connections
pub type TcpTransport = StreamTransport<TcpStream>;

/// [`Transport`] over any async byte stream (`TcpStream`, `DuplexStream`, ...)
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
}

impl<S> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn read_with_deadline(
        &mut self,
        buf: &mut [u8],
        deadline: Duration,
    ) -> io::Result<ReadOutcome> {
        match tokio::time::timeout(deadline, self.stream.read(buf)).await {
            Ok(Ok(0)) => Ok(ReadOutcome::Eof),
            Ok(Ok(n)) => Ok(ReadOutcome::Data(n)),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(ReadOutcome::TimedOut),
        }
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::duplex;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_read_times_out_on_idle_peer() {
        let (local, _peer) = duplex(64);
        let mut transport = StreamTransport::new(local);
        let mut buf = [0u8; 1];

        let outcome = transport
            .read_with_deadline(&mut buf, Duration::from_millis(10))
            .await;

        assert_eq!(assert_ok!(outcome), ReadOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_read_sees_eof_when_peer_dropped() {
        let (local, peer) = duplex(64);
        drop(peer);
        let mut transport = StreamTransport::new(local);
        let mut buf = [0u8; 1];

        let outcome = transport
            .read_with_deadline(&mut buf, Duration::from_millis(10))
            .await;

        assert_eq!(assert_ok!(outcome), ReadOutcome::Eof);
    }

    #[tokio::test]
    async fn test_read_returns_peer_data() {
        let (local, mut peer) = duplex(64);
        peer.write_all(b"hi").await.unwrap();
        let mut transport = StreamTransport::new(local);
        let mut buf = [0u8; 1];

        let outcome = transport
            .read_with_deadline(&mut buf, Duration::from_millis(10))
            .await;

        assert_eq!(assert_ok!(outcome), ReadOutcome::Data(1));
        assert_eq!(&buf, b"h");
    }

    #[tokio::test]
    async fn test_write_reaches_peer() {
        let (local, mut peer) = duplex(64);
        let mut transport = StreamTransport::new(local);

        assert_ok!(transport.write(b"$GPRMC*00\n").await);

        let mut received = [0u8; 10];
        peer.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"$GPRMC*00\n");
    }

    #[tokio::test]
    async fn test_write_fails_after_peer_dropped() {
        let (local, peer) = duplex(64);
        drop(peer);
        let mut transport = StreamTransport::new(local);

        assert_err!(transport.write(b"data").await);
    }

    #[tokio::test]
    async fn test_close_signals_eof_to_peer() {
        let (local, mut peer) = duplex(64);
        let mut transport = StreamTransport::new(local);

        assert_ok!(transport.close().await);

        let mut buf = Vec::new();
        let n = peer.read_to_end(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }
}
