//! Datagram channel abstraction and its UDP implementation.
//!
//! The sender only ever needs two primitives from the network: send one
//! datagram, and poll for one datagram without blocking for long.  The
//! [`Channel`] trait captures exactly that.  [`Socket`] is a thin wrapper
//! around `tokio::net::UdpSocket` that speaks [`Datagram`] instead of raw
//! bytes; [`crate::simulator::Simulator`] is an in-process implementation
//! used for fault-injection testing.
//!
//! All protocol logic lives elsewhere; this module owns only byte I/O.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::config::POLL_INTERVAL;
use crate::packet::{Datagram, MAX_DATAGRAM_LEN};

/// Errors that can arise from channel operations.
///
/// Every variant is fatal to a transfer; routine losses and corruption are
/// not errors.
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("socket I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("could not resolve {0}")]
    Resolve(String),
}

/// An unreliable, datagram-oriented link to the receiver.
///
/// The link may drop, corrupt, delay, reorder, or duplicate datagrams.
#[allow(async_fn_in_trait)]
pub trait Channel {
    /// Transmit one datagram.  Fire-and-forget: success says nothing about
    /// delivery.
    async fn send(&mut self, datagram: &Datagram) -> Result<(), SocketError>;

    /// Return the next datagram that has arrived, or `None` if nothing shows
    /// up within a short bounded wait.
    ///
    /// Datagrams are returned as parsed; checksum validation is the caller's
    /// job.
    async fn receive(&mut self) -> Result<Option<Datagram>, SocketError>;

    /// Bound the wait of later [`receive`](Self::receive) calls.
    fn set_poll_interval(&mut self, poll_interval: Duration);
}

/// A UDP socket bound locally and aimed at a single peer.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    peer: SocketAddr,
    poll_interval: Duration,
    inner: UdpSocket,
}

impl Socket {
    /// Bind an ephemeral local port and aim it at `peer`.
    pub async fn open(peer: SocketAddr) -> Result<Self, SocketError> {
        let local: SocketAddr = if peer.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let inner = UdpSocket::bind(local).await?;
        let local_addr = inner.local_addr()?;
        log::debug!("[socket] bound {local_addr}, peer {peer}");
        Ok(Self {
            local_addr,
            peer,
            poll_interval: POLL_INTERVAL,
            inner,
        })
    }

    /// Resolve `host:port` and [`open`](Self::open) a socket to it.  IPv4
    /// addresses win over IPv6 ones when the name has both.
    pub async fn connect(host: &str, port: u16) -> Result<Self, SocketError> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port)).await?.collect();
        log::debug!("[socket] {host}:{port} resolved to {addrs:?}");
        let peer =
            pick_peer(&addrs).ok_or_else(|| SocketError::Resolve(format!("{host}:{port}")))?;
        Self::open(peer).await
    }

    /// Change how long [`Channel::receive`] waits before reporting `None`.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.set_poll_interval(poll_interval);
        self
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

/// First IPv4 address in `addrs`, else the first address of any family.
fn pick_peer(addrs: &[SocketAddr]) -> Option<SocketAddr> {
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}

impl Channel for Socket {
    async fn send(&mut self, datagram: &Datagram) -> Result<(), SocketError> {
        self.inner.send_to(&datagram.encode(), self.peer).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<Datagram>, SocketError> {
        // One spare byte so an oversized datagram shows up as a length
        // mismatch instead of being silently truncated to a valid size.
        let mut buf = [0u8; MAX_DATAGRAM_LEN + 1];
        let (n, addr) =
            match tokio::time::timeout(self.poll_interval, self.inner.recv_from(&mut buf)).await {
                Err(_elapsed) => return Ok(None),
                Ok(result) => result?,
            };

        if addr != self.peer {
            log::debug!("[socket] ignoring {n} bytes from stranger {addr}");
            return Ok(None);
        }
        match Datagram::decode(&buf[..n]) {
            Ok(d) => Ok(Some(d)),
            Err(e) => {
                log::debug!("[socket] discarding malformed datagram: {e}");
                Ok(None)
            }
        }
    }

    fn set_poll_interval(&mut self, poll_interval: Duration) {
        self.poll_interval = poll_interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_over_loopback() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_addr = peer.local_addr().unwrap();
        let mut sock = Socket::open(peer_addr)
            .await
            .unwrap()
            .with_poll_interval(Duration::from_millis(500));

        sock.send(&Datagram::data(1, b"ping")).await.unwrap();
        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        let (n, from) = peer.recv_from(&mut buf).await.unwrap();
        let got = Datagram::decode(&buf[..n]).unwrap();
        assert_eq!(got.payload(), b"ping");

        peer.send_to(&Datagram::ack(1).encode(), from).await.unwrap();
        let ack = sock.receive().await.unwrap().expect("ack should arrive");
        assert_eq!(ack.ack_num, 1);
        assert!(ack.validate_checksum());
    }

    #[tokio::test]
    async fn receive_times_out_with_none() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut sock = Socket::open(peer.local_addr().unwrap()).await.unwrap();
        assert!(sock.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_datagram_is_dropped() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut sock = Socket::open(peer.local_addr().unwrap())
            .await
            .unwrap()
            .with_poll_interval(Duration::from_millis(500));
        let local = ("127.0.0.1", sock.local_addr.port());

        peer.send_to(&[1, 2, 3], local).await.unwrap();
        assert!(sock.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn connect_resolves_localhost() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = peer.local_addr().unwrap().port();
        let sock = Socket::connect("127.0.0.1", port).await.unwrap();
        assert_eq!(sock.peer().port(), port);
    }

    #[test]
    fn ipv4_peer_preferred_over_ipv6() {
        let v6: SocketAddr = "[::1]:9000".parse().unwrap();
        let v4: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert_eq!(pick_peer(&[v6, v4]), Some(v4));
        assert_eq!(pick_peer(&[v6]), Some(v6));
        assert_eq!(pick_peer(&[]), None);
    }

    #[tokio::test(start_paused = true)]
    async fn receive_waits_for_configured_interval() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut sock = Socket::open(peer.local_addr().unwrap()).await.unwrap();
        sock.set_poll_interval(Duration::from_millis(40));

        let start = tokio::time::Instant::now();
        assert!(sock.receive().await.unwrap().is_none());
        assert_eq!(start.elapsed(), Duration::from_millis(40));
    }
}
