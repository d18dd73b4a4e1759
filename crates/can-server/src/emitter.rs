use std::future::Future;
use std::io;
use std::net::SocketAddr;

use canframe::FrameGenerator;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::sleep;
use tracing::{debug, info, trace};

use crate::config::Config;
use crate::error::ServerError;

/// Why a [`Emitter::serve`] run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Interrupted,
    ClientDisconnected,
    LimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub shutdown: Shutdown,
    pub frames_sent: u64,
    pub peer: Option<SocketAddr>,
}

/// Transport errors that mean the client went away mid-write.
pub fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::WriteZero
    )
}

/// Serves random frames to the first client that connects, and only that one.
pub struct Emitter {
    listener: TcpListener,
    config: Config,
}

impl Emitter {
    pub async fn bind(config: Config) -> Result<Self, ServerError> {
        config.validate()?;
        let listener = TcpListener::bind(config.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.addr,
                source,
            })?;
        info!("CAN mock server listening on {}", listener.local_addr()?);
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept one client and stream frames to it until `shutdown` resolves,
    /// the client disconnects, or the frame limit is reached.
    pub async fn serve<F>(self, shutdown: F) -> Result<Report, ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let (mut stream, peer) = tokio::select! {
            accepted = self.listener.accept() => accepted.map_err(ServerError::Accept)?,
            () = &mut shutdown => {
                info!("Server shutting down");
                return Ok(Report {
                    shutdown: Shutdown::Interrupted,
                    frames_sent: 0,
                    peer: None,
                });
            }
        };
        info!("Connection from {}", peer);

        let mut generator = FrameGenerator::new(self.config.ids.clone())?;
        let mut frames_sent = 0;
        let outcome = send_loop(
            &mut stream,
            &mut generator,
            &self.config,
            &mut frames_sent,
            &mut shutdown,
        )
        .await;

        // The peer may already be gone, so a failed shutdown is not an error.
        if let Err(e) = stream.shutdown().await {
            debug!("Closing connection to {}: {}", peer, e);
        }
        drop(stream);

        let reason = outcome?;
        match reason {
            Shutdown::Interrupted => info!("Server shutting down"),
            Shutdown::ClientDisconnected => info!("Client {} disconnected", peer),
            Shutdown::LimitReached => info!("Frame limit reached"),
        }
        Ok(Report {
            shutdown: reason,
            frames_sent,
            peer: Some(peer),
        })
    }
}

async fn send_loop<W, S>(
    stream: &mut W,
    generator: &mut FrameGenerator,
    config: &Config,
    frames_sent: &mut u64,
    shutdown: &mut S,
) -> Result<Shutdown, ServerError>
where
    W: AsyncWrite + Unpin,
    S: Future<Output = ()> + Unpin,
{
    loop {
        let frame = generator.next_frame();
        let record = frame.to_bytes()?;

        tokio::select! {
            written = stream.write_all(&record) => match written {
                Ok(()) => (),
                Err(e) if is_disconnect(&e) => {
                    debug!("Write failed: {}", e);
                    return Ok(Shutdown::ClientDisconnected);
                }
                Err(e) => return Err(e.into()),
            },
            () = &mut *shutdown => return Ok(Shutdown::Interrupted),
        }
        trace!("Sent {}", frame);

        *frames_sent += 1;
        if *frames_sent % config.progress_every == 0 {
            info!("Sent {} frames", frames_sent);
        }
        if config.max_frames == Some(*frames_sent) {
            return Ok(Shutdown::LimitReached);
        }

        tokio::select! {
            () = sleep(config.interval) => (),
            () = &mut *shutdown => return Ok(Shutdown::Interrupted),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use std::time::Duration;

    use canframe::{CanFrame, IdSelection, FRAME_SIZE};

    use super::*;

    /// Accepts `fail_after` writes, then fails every write with `kind`.
    struct FailingWriter {
        fail_after: usize,
        kind: io::ErrorKind,
        written: Vec<u8>,
        writes: usize,
    }

    impl FailingWriter {
        fn new(fail_after: usize, kind: io::ErrorKind) -> Self {
            Self {
                fail_after,
                kind,
                written: Vec::new(),
                writes: 0,
            }
        }
    }

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.writes == self.fail_after {
                return Poll::Ready(Err(io::Error::from(self.kind)));
            }
            self.writes += 1;
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    fn config(progress_every: u64, max_frames: Option<u64>) -> Config {
        Config {
            interval: Duration::ZERO,
            progress_every,
            max_frames,
            ..Config::default()
        }
    }

    async fn run(
        writer: &mut FailingWriter,
        config: &Config,
    ) -> (Result<Shutdown, ServerError>, u64) {
        let mut generator = FrameGenerator::new(IdSelection::default()).unwrap();
        let mut frames_sent = 0;
        let mut never = std::future::pending::<()>();
        let result = send_loop(writer, &mut generator, config, &mut frames_sent, &mut never).await;
        (result, frames_sent)
    }

    #[test]
    fn test_is_disconnect() {
        for kind in [
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::WriteZero,
        ] {
            assert!(is_disconnect(&io::Error::from(kind)));
        }
        assert!(!is_disconnect(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!is_disconnect(&io::Error::from(io::ErrorKind::TimedOut)));
    }

    #[tokio::test]
    async fn test_write_fault_propagates() {
        let mut writer = FailingWriter::new(3, io::ErrorKind::PermissionDenied);
        let (result, frames_sent) = run(&mut writer, &config(10, None)).await;
        match result {
            Err(ServerError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::PermissionDenied),
            other => panic!("expected an I/O error, got {:?}", other),
        }
        assert_eq!(frames_sent, 3);
        assert_eq!(writer.written.len(), 3 * FRAME_SIZE);
    }

    #[tokio::test]
    async fn test_broken_pipe_is_disconnect() {
        let mut writer = FailingWriter::new(2, io::ErrorKind::BrokenPipe);
        let (result, frames_sent) = run(&mut writer, &config(10, None)).await;
        assert!(matches!(result, Ok(Shutdown::ClientDisconnected)));
        assert_eq!(frames_sent, 2);
    }

    #[tokio::test]
    async fn test_progress_notice() {
        let logs = LogBuffer::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut writer = FailingWriter::new(usize::MAX, io::ErrorKind::Other);
        let (result, frames_sent) = run(&mut writer, &config(2, Some(5))).await;
        assert!(matches!(result, Ok(Shutdown::LimitReached)));
        assert_eq!(frames_sent, 5);

        let logs = logs.contents();
        assert!(logs.contains("Sent 2 frames"), "{}", logs);
        assert!(logs.contains("Sent 4 frames"), "{}", logs);
        assert!(!logs.contains("Sent 5 frames"), "{}", logs);

        let frames = writer
            .written
            .chunks(FRAME_SIZE)
            .map(|chunk| CanFrame::from_bytes(chunk.try_into().unwrap()).unwrap())
            .count();
        assert_eq!(frames, 5);
    }
}
