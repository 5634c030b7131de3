//! Go-Back-N send-side state machine.
//!
//! [`GbnSender`] reads an input stream in
//! [`MAX_PAYLOAD_LENGTH`](crate::config::MAX_PAYLOAD_LENGTH) chunks and
//! delivers it over an unreliable [`Channel`] with up to `window_size`
//! datagrams in flight.
//!
//! # Protocol contract
//!
//! - Sequence numbers start at [`INITIAL_SEQ`] and advance by one per
//!   datagram.  End of input is signalled by a zero-length terminal datagram
//!   that is sequenced, buffered and retransmitted like any other.
//! - ACKs are **cumulative**: `ack_num = K` acknowledges every sequence
//!   number ≤ `K`.  `base` only ever moves forward.
//! - One timer covers the oldest unacknowledged datagram.  On expiry the
//!   whole outstanding window is retransmitted (go back N).
//! - Datagrams failing checksum validation are dropped without touching
//!   any state.
//!
//! # Sequence-number layout
//!
//! ```text
//!   base            next_seq        base + window_size
//!     │                 │                 │
//!  ───┼─────────────────┼─────────────────┼──────▶ seq space
//!     │ <── in flight ─▶│ <── sendable ──▶│
//! ```
//!
//! The transfer is a single cooperative loop; see [`GbnSender::step`] for
//! the order of work inside one iteration.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::{ConfigError, SenderConfig, INITIAL_SEQ};
use crate::packet::Datagram;
use crate::socket::{Channel, SocketError};
use crate::state::Phase;
use crate::timer::RetransmitTimer;
use crate::window::SendWindow;

/// Errors that abort a transfer.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("invalid sender configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to read input: {0}")]
    Input(#[source] io::Error),
    #[error("channel failure: {0}")]
    Channel(#[from] SocketError),
}

/// Counters describing one transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Every datagram handed to the channel, retransmissions included.
    pub datagrams_sent: u64,
    pub retransmissions: u64,
    pub timeouts: u64,
    /// ACKs that passed checksum validation.
    pub acks_received: u64,
    pub corrupt_acks: u64,
    /// File bytes sent once (retransmissions not counted).
    pub payload_bytes: u64,
}

/// Go-Back-N sender for one transfer.
pub struct GbnSender<R, C> {
    input: R,
    channel: C,
    window: SendWindow,
    timer: RetransmitTimer,
    /// Oldest unacknowledged sequence number.
    base: u32,
    /// Sequence number for the next new datagram.
    next_seq: u32,
    phase: Phase,
    stats: TransferStats,
}

impl<R, C> GbnSender<R, C>
where
    R: AsyncRead + Unpin,
    C: Channel,
{
    /// Build a sender.  The channel's receive wait is set to
    /// `config.poll_interval`.
    pub fn new(config: SenderConfig, input: R, mut channel: C) -> Result<Self, TransferError> {
        config.validate()?;
        channel.set_poll_interval(config.poll_interval);
        Ok(Self {
            input,
            channel,
            window: SendWindow::new(config.window_size),
            timer: RetransmitTimer::new(config.timeout),
            base: INITIAL_SEQ,
            next_seq: INITIAL_SEQ,
            phase: Phase::Filling,
            stats: TransferStats::default(),
        })
    }

    /// Drive the transfer until the terminal datagram is acknowledged.
    ///
    /// There is no overall deadline: on a channel that never delivers, this
    /// retries forever.
    pub async fn run(&mut self) -> Result<TransferStats, TransferError> {
        log::info!(
            "[gbn] starting transfer: window={} timeout={:?}",
            self.window.capacity(),
            self.timer.duration()
        );
        while self.step().await? != Phase::Done {}
        log::info!(
            "[gbn] transfer complete: {} bytes in {} datagrams ({} retransmitted, {} timeouts, {} corrupt ACKs)",
            self.stats.payload_bytes,
            self.stats.datagrams_sent,
            self.stats.retransmissions,
            self.stats.timeouts,
            self.stats.corrupt_acks
        );
        Ok(self.stats.clone())
    }

    /// Run one iteration of the control loop:
    ///
    /// 1. admit one new datagram if the window has room,
    /// 2. poll the channel once and process any ACK,
    /// 3. retransmit the window if the timer expired.
    pub async fn step(&mut self) -> Result<Phase, TransferError> {
        if self.phase == Phase::Done {
            return Ok(Phase::Done);
        }

        self.admit().await?;

        if let Some(datagram) = self.channel.receive().await? {
            self.handle_ack(&datagram);
            if self.phase == Phase::Done {
                return Ok(Phase::Done);
            }
        }

        if self.timer.timeout() {
            self.retransmit_window().await?;
        }
        Ok(self.phase)
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn window_size(&self) -> usize {
        self.window.capacity()
    }

    /// Number of datagrams sent but not yet acknowledged.
    pub fn in_flight(&self) -> usize {
        (self.next_seq - self.base) as usize
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    fn can_admit(&self) -> bool {
        !self.phase.terminal_sent() && self.in_flight() < self.window.capacity()
    }

    /// Read the next chunk and send it as a new datagram.  A zero-length read
    /// produces the terminal datagram.
    async fn admit(&mut self) -> Result<(), TransferError> {
        if !self.can_admit() {
            return Ok(());
        }

        let mut datagram = Datagram {
            seq_num: self.next_seq,
            ..Datagram::default()
        };
        let n = read_chunk(&mut self.input, &mut datagram.payload)
            .await
            .map_err(TransferError::Input)?;
        datagram.payload_len = n as u16;
        datagram.checksum = datagram.compute_checksum();

        let terminal = datagram.is_terminal();
        self.send_new(datagram).await?;
        self.stats.payload_bytes += n as u64;

        if terminal {
            self.phase = Phase::Draining;
            log::debug!(
                "[gbn] end of input; terminal datagram is seq={}, now {}",
                self.next_seq - 1,
                self.phase
            );
        }
        Ok(())
    }

    /// Buffer, transmit and sequence a freshly built datagram.
    async fn send_new(&mut self, datagram: Datagram) -> Result<(), TransferError> {
        let seq = datagram.seq_num;
        self.window.put(seq, datagram);
        self.channel.send(self.window.get(seq)).await?;
        self.stats.datagrams_sent += 1;

        if self.base == self.next_seq {
            self.timer.start();
        }
        self.next_seq += 1;
        log::debug!(
            "[gbn] → DATA seq={} len={} in_flight={}",
            seq,
            self.window.get(seq).payload_len,
            self.in_flight()
        );
        Ok(())
    }

    /// Apply one received datagram as a cumulative ACK.
    fn handle_ack(&mut self, datagram: &Datagram) {
        if !datagram.validate_checksum() {
            self.stats.corrupt_acks += 1;
            log::debug!("[gbn] ← corrupt ACK discarded");
            return;
        }
        self.stats.acks_received += 1;

        let ack = datagram.ack_num;
        if ack >= self.next_seq {
            log::warn!(
                "[gbn] ← ACK ack={} for unsent data (next_seq={}); ignored",
                ack,
                self.next_seq
            );
            return;
        }
        // ack < next_seq, so this cannot overflow.
        let new_base = ack + 1;
        if new_base <= self.base {
            log::trace!("[gbn] ← stale ACK ack={} (base={})", ack, self.base);
            return;
        }

        self.base = new_base;
        log::debug!(
            "[gbn] ← ACK ack={} base={} in_flight={}",
            ack,
            self.base,
            self.in_flight()
        );

        if self.base == self.next_seq {
            self.timer.stop();
            if self.phase == Phase::Draining {
                self.phase = Phase::Done;
                log::debug!("[gbn] terminal datagram acknowledged, now {}", self.phase);
            }
        } else {
            self.timer.start();
        }
    }

    /// Retransmit every datagram in `[base, next_seq)`, oldest first.
    async fn retransmit_window(&mut self) -> Result<(), TransferError> {
        self.timer.start();
        self.stats.timeouts += 1;
        log::debug!(
            "[gbn] timeout: retransmitting seq {}..{} ({} datagram(s))",
            self.base,
            self.next_seq,
            self.in_flight()
        );
        for seq in self.base..self.next_seq {
            self.channel.send(self.window.get(seq)).await?;
            self.stats.datagrams_sent += 1;
            self.stats.retransmissions += 1;
        }
        Ok(())
    }
}

/// Fill `buf` from `input`, stopping early only at end of input.
async fn read_chunk<R: AsyncRead + Unpin>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = input.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
