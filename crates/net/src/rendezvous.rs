//! Rendezvous - getting peers connected
//!
//! The listening peer binds the configured port and accepts one connection per guest;
//! the connecting peer dials the host. Both run on the network runtime and hand raw
//! streams back to the tick thread, which wraps them into channels in [`Rendezvous::poll`].

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::channel::ReplicationChannel;
use crate::config::NetConfig;
use crate::error::Result;
use crate::protocol::PeerMessage;
use crate::types::SeatId;

/// Which side of the star this process is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

/// A freshly attached peer
#[derive(Debug)]
pub struct PeerConnection {
    /// Seat of the remote end (the host for a guest, the assigned seat for a host).
    pub peer_seat: SeatId,
    pub channel: ReplicationChannel,
}

type Incoming = std::io::Result<TcpStream>;

/// Pending listen or connect
pub struct Rendezvous {
    rt: Arc<Runtime>,
    config: NetConfig,
    role: Role,
    incoming: mpsc::UnboundedReceiver<Incoming>,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
    next_seat: u8,
    attached: u8,
}

impl Rendezvous {
    /// Bind the listening socket and start accepting guests in the background
    pub fn listen(rt: Arc<Runtime>, config: NetConfig) -> Result<Self> {
        let addr = config.bind_addr();
        let listener = rt.block_on(TcpListener::bind(addr.as_str()))?;
        let bound = listener.local_addr()?;
        info!("listening on {} for {} guest(s)", bound, config.guests());

        let (tx, incoming) = mpsc::unbounded_channel();
        let guests = config.guests();
        let task = rt.spawn(async move {
            for _ in 0..guests {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        info!("accepted guest from {}", addr);
                        if tx.send(Ok(stream)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("accept failed: {}", e);
                        let _ = tx.send(Err(e));
                        return;
                    }
                }
            }
        });

        Ok(Self {
            rt,
            config,
            role: Role::Host,
            incoming,
            task: Some(task),
            local_addr: Some(bound),
            next_seat: 1,
            attached: 0,
        })
    }

    /// Dial the host in the background
    pub fn connect(rt: Arc<Runtime>, config: NetConfig) -> Self {
        let addr = config.dial_addr();
        let (tx, incoming) = mpsc::unbounded_channel();
        let task = rt.spawn(async move {
            info!("connecting to {}", addr);
            let result = TcpStream::connect(addr.as_str()).await;
            if let Err(e) = &result {
                warn!("connect to {} failed: {}", addr, e);
            }
            let _ = tx.send(result);
        });

        Self {
            rt,
            config,
            role: Role::Guest,
            incoming,
            task: Some(task),
            local_addr: None,
            next_seat: 1,
            attached: 0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Bound address of the listening peer
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Peers still expected
    pub fn remaining(&self) -> u8 {
        let expected = match self.role {
            Role::Host => self.config.guests(),
            Role::Guest => 1,
        };
        expected.saturating_sub(self.attached)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Collect peers that finished connecting since the last call
    ///
    /// The host assigns each guest the next free seat and sends it `AssignId` before
    /// the channel is returned. An accept or connect failure is returned as an error.
    pub fn poll(&mut self) -> Result<Vec<PeerConnection>> {
        let mut attached = Vec::new();
        loop {
            let stream = match self.incoming.try_recv() {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return Err(e.into()),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };

            let mut channel = ReplicationChannel::from_tcp(Arc::clone(&self.rt), stream, &self.config);
            let peer_seat = match self.role {
                Role::Host => {
                    let seat = SeatId::new(self.next_seat).unwrap_or(SeatId::HOST);
                    self.next_seat += 1;
                    if let Err(e) = channel.send(&PeerMessage::AssignId { seat: seat.get() }) {
                        warn!("seat assignment to {} failed: {}", channel.peer(), e);
                    }
                    info!("{} joined as {}", channel.peer(), seat.label());
                    seat
                }
                Role::Guest => {
                    info!("connected to host {}", channel.peer());
                    SeatId::HOST
                }
            };

            self.attached += 1;
            attached.push(PeerConnection { peer_seat, channel });
        }
        Ok(attached)
    }
}

impl Drop for Rendezvous {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::build_runtime;
    use std::time::{Duration, Instant};

    fn poll_until(rendezvous: &mut Rendezvous, want: usize) -> Vec<PeerConnection> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut got = Vec::new();
        while got.len() < want && Instant::now() < deadline {
            got.extend(rendezvous.poll().unwrap());
            std::thread::sleep(Duration::from_millis(5));
        }
        got
    }

    #[test]
    fn test_host_assigns_seats_in_accept_order() {
        let rt = build_runtime().unwrap();
        let config = NetConfig::default()
            .with_host("127.0.0.1")
            .with_port(0)
            .with_players(3);
        let mut host = Rendezvous::listen(Arc::clone(&rt), config.clone()).unwrap();
        let port = host.local_addr().unwrap().port();
        assert_eq!(host.remaining(), 2);

        let mut guest1 = Rendezvous::connect(Arc::clone(&rt), config.clone().with_port(port));
        let mut g1 = poll_until(&mut guest1, 1);
        let h1 = poll_until(&mut host, 1);
        let mut guest2 = Rendezvous::connect(Arc::clone(&rt), config.with_port(port));
        let mut g2 = poll_until(&mut guest2, 1);
        let h2 = poll_until(&mut host, 1);

        assert_eq!(h1[0].peer_seat, SeatId::new(1).unwrap());
        assert_eq!(h2[0].peer_seat, SeatId::new(2).unwrap());
        assert!(host.is_complete());
        assert_eq!(g1[0].peer_seat, SeatId::HOST);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut first = Vec::new();
        let mut second = Vec::new();
        while (first.is_empty() || second.is_empty()) && Instant::now() < deadline {
            first.extend(g1[0].channel.receive_all());
            second.extend(g2[0].channel.receive_all());
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(first, vec![PeerMessage::AssignId { seat: 1 }]);
        assert_eq!(second, vec![PeerMessage::AssignId { seat: 2 }]);
    }

    #[test]
    fn test_connect_failure_surfaces_as_error() {
        let rt = build_runtime().unwrap();
        // Bind then drop to get a port with nothing listening.
        let port = {
            let spare = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            spare.local_addr().unwrap().port()
        };
        let config = NetConfig::default().with_host("127.0.0.1").with_port(port);
        let mut guest = Rendezvous::connect(rt, config);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut failed = false;
        while Instant::now() < deadline {
            match guest.poll() {
                Err(_) => {
                    failed = true;
                    break;
                }
                Ok(peers) => assert!(peers.is_empty()),
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(failed);
    }
}
