//! Replication channel - one ordered message pipe to one peer
//!
//! A reader task on the network runtime blocks on the stream and pushes decoded
//! messages into a bounded inbox. The tick thread owns everything else: it drains the
//! inbox without blocking and writes frames synchronously under a timeout. Any fault on
//! either side flips a shared `broken` flag; a broken channel never recovers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NetConfig;
use crate::error::{NetError, Result};
use crate::protocol::{encode_frame, read_frame, PeerMessage, FRAME_HEADER_LEN};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Message pipe to one remote peer
pub struct ReplicationChannel {
    rt: Arc<Runtime>,
    writer: Option<BoxedWriter>,
    inbox: mpsc::Receiver<PeerMessage>,
    broken: Arc<AtomicBool>,
    shutdown: Option<oneshot::Sender<()>>,
    reader: Option<JoinHandle<()>>,
    send_timeout: Duration,
    max_frame: usize,
    scratch: Vec<u8>,
    lost_reported: bool,
    peer: String,
}

impl std::fmt::Debug for ReplicationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicationChannel")
            .field("peer", &self.peer)
            .field("broken", &self.is_broken())
            .finish()
    }
}

impl ReplicationChannel {
    /// Wrap a read half and a write half of one stream
    ///
    /// The reader task is spawned on `rt`; the write half stays with the channel.
    pub fn from_io<R, W>(
        rt: Arc<Runtime>,
        reader: R,
        writer: W,
        config: &NetConfig,
        peer: impl Into<String>,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let peer = peer.into();
        let (tx, inbox) = mpsc::channel(config.inbox_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let broken = Arc::new(AtomicBool::new(false));

        let handle = rt.spawn(run_reader(
            reader,
            tx,
            shutdown_rx,
            Arc::clone(&broken),
            config.max_frame,
            peer.clone(),
        ));

        Self {
            rt,
            writer: Some(Box::new(writer)),
            inbox,
            broken,
            shutdown: Some(shutdown_tx),
            reader: Some(handle),
            send_timeout: config.send_timeout,
            max_frame: config.max_frame,
            scratch: Vec::with_capacity(4096),
            lost_reported: false,
            peer,
        }
    }

    /// Wrap an accepted or connected TCP stream
    pub fn from_tcp(rt: Arc<Runtime>, stream: TcpStream, config: &NetConfig) -> Self {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed for {}: {}", peer, e);
        }
        let (reader, writer) = stream.into_split();
        Self::from_io(rt, reader, writer, config, peer)
    }

    /// Two channels connected back to back through an in-memory stream
    pub fn in_memory_pair(rt: Arc<Runtime>, config: &NetConfig) -> (Self, Self) {
        let capacity = config.max_frame.saturating_add(FRAME_HEADER_LEN).max(4096);
        let (a, b) = tokio::io::duplex(capacity);
        let (a_read, a_write) = tokio::io::split(a);
        let (b_read, b_write) = tokio::io::split(b);
        (
            Self::from_io(Arc::clone(&rt), a_read, a_write, config, "memory-a"),
            Self::from_io(rt, b_read, b_write, config, "memory-b"),
        )
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    fn mark_broken(&self) {
        self.broken.store(true, Ordering::Release);
    }

    /// Serialize and write one message
    ///
    /// Blocks the calling thread for at most the configured send timeout. On any
    /// failure the channel is marked broken and the frame is not retried; a frame is
    /// either fully written or the stream is abandoned.
    pub fn send(&mut self, message: &PeerMessage) -> Result<()> {
        if self.is_broken() {
            return Err(NetError::Broken);
        }

        encode_frame(message, &mut self.scratch)?;
        let len = self.scratch.len() - FRAME_HEADER_LEN;
        if len > self.max_frame {
            return Err(NetError::FrameTooLarge {
                len,
                max: self.max_frame,
            });
        }

        let Some(writer) = self.writer.as_mut() else {
            return Err(NetError::Broken);
        };
        let frame = &self.scratch;
        let timeout = self.send_timeout;
        let result = self.rt.block_on(async {
            tokio::time::timeout(timeout, async {
                writer.write_all(frame).await?;
                writer.flush().await
            })
            .await
        });

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!("send to {} failed: {}", self.peer, e);
                self.mark_broken();
                Err(e.into())
            }
            Err(_) => {
                warn!("send to {} timed out after {:?}", self.peer, self.send_timeout);
                self.mark_broken();
                Err(NetError::SendTimeout)
            }
        }
    }

    /// Drain every message buffered so far without blocking
    ///
    /// Once the channel is broken, a single synthetic [`PeerMessage::ConnectionLost`]
    /// is appended after whatever was already delivered.
    pub fn receive_all(&mut self) -> Vec<PeerMessage> {
        let mut messages = Vec::new();
        loop {
            match self.inbox.try_recv() {
                Ok(message) => messages.push(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.mark_broken();
                    break;
                }
            }
        }

        if self.is_broken() && !self.lost_reported {
            self.lost_reported = true;
            messages.push(PeerMessage::ConnectionLost);
        }
        messages
    }

    /// Shut the stream down and stop the reader task
    ///
    /// Safe to call more than once. No `ConnectionLost` is reported for a channel
    /// closed locally.
    pub fn close(&mut self) {
        if self.shutdown.is_none() && self.writer.is_none() && self.reader.is_none() {
            return;
        }

        self.lost_reported = true;
        self.mark_broken();

        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(mut writer) = self.writer.take() {
            let timeout = self.send_timeout;
            let _ = self
                .rt
                .block_on(async { tokio::time::timeout(timeout, writer.shutdown()).await });
        }
        if let Some(handle) = self.reader.take() {
            handle.abort();
        }
        debug!("channel to {} closed", self.peer);
    }
}

impl Drop for ReplicationChannel {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_reader<R>(
    mut reader: R,
    tx: mpsc::Sender<PeerMessage>,
    mut shutdown: oneshot::Receiver<()>,
    broken: Arc<AtomicBool>,
    max_frame: usize,
    peer: String,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(4096);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            frame = read_frame(&mut reader, max_frame, &mut buf) => match frame {
                Ok(message) => {
                    if tx.send(message).await.is_err() {
                        break;
                    }
                }
                Err(NetError::Closed) => {
                    info!("peer {} closed the connection", peer);
                    broken.store(true, Ordering::Release);
                    break;
                }
                Err(e) => {
                    warn!("read from {} failed: {}", peer, e);
                    broken.store(true, Ordering::Release);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::build_runtime;
    use std::time::Instant;

    fn wait_for<F: FnMut() -> bool>(mut cond: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_messages_arrive_in_order() {
        let rt = build_runtime().unwrap();
        let config = NetConfig::default();
        let (mut a, mut b) = ReplicationChannel::in_memory_pair(rt, &config);

        for seat in [1u8, 2, 1] {
            a.send(&PeerMessage::AssignId { seat }).unwrap();
        }

        let mut got = Vec::new();
        assert!(wait_for(|| {
            got.extend(b.receive_all());
            got.len() >= 3
        }));
        assert_eq!(
            got,
            vec![
                PeerMessage::AssignId { seat: 1 },
                PeerMessage::AssignId { seat: 2 },
                PeerMessage::AssignId { seat: 1 },
            ]
        );
        assert!(!b.is_broken());
    }

    #[test]
    fn test_receive_all_is_non_blocking_when_empty() {
        let rt = build_runtime().unwrap();
        let (_a, mut b) = ReplicationChannel::in_memory_pair(rt, &NetConfig::default());
        assert!(b.receive_all().is_empty());
    }

    #[test]
    fn test_peer_close_marks_broken_and_reports_once() {
        let rt = build_runtime().unwrap();
        let (mut a, mut b) = ReplicationChannel::in_memory_pair(rt, &NetConfig::default());

        a.close();
        assert!(wait_for(|| b.is_broken()));

        assert_eq!(b.receive_all(), vec![PeerMessage::ConnectionLost]);
        assert!(b.receive_all().is_empty());
        assert!(matches!(
            b.send(&PeerMessage::AssignId { seat: 1 }),
            Err(NetError::Broken)
        ));
    }

    #[test]
    fn test_local_close_does_not_report_loss() {
        let rt = build_runtime().unwrap();
        let (mut a, _b) = ReplicationChannel::in_memory_pair(rt, &NetConfig::default());
        a.close();
        a.close();
        assert!(a.is_broken());
        assert!(a.receive_all().is_empty());
    }

    #[test]
    fn test_garbage_on_the_wire_breaks_channel() {
        let rt = build_runtime().unwrap();
        let config = NetConfig::default();
        let (raw, remote) = tokio::io::duplex(1024);
        let (r, w) = tokio::io::split(remote);
        let mut channel = ReplicationChannel::from_io(Arc::clone(&rt), r, w, &config, "raw");

        let (_raw_read, mut raw_write) = tokio::io::split(raw);
        rt.block_on(async {
            raw_write.write_all(&5u32.to_be_bytes()).await.unwrap();
            raw_write.write_all(b"nope!").await.unwrap();
        });

        assert!(wait_for(|| channel.is_broken()));
        assert_eq!(channel.receive_all(), vec![PeerMessage::ConnectionLost]);
    }
}
