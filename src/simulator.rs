//! In-process network simulator for deterministic testing.
//!
//! Real networks drop, reorder, duplicate and corrupt datagrams.  To exercise
//! the reliability mechanisms without depending on actual network
//! conditions, [`Simulator`] implements [`Channel`] by wiring the sender
//! straight into a [`GbnReceiver`] and applying a fault model to both
//! directions:
//!
//! | Fault       | Description                                          |
//! |-------------|------------------------------------------------------|
//! | Loss        | Drop a datagram with probability `loss_rate`.        |
//! | Corruption  | Flip one byte with probability `corrupt_rate`.       |
//! | Duplication | Deliver a datagram twice with `duplicate_rate`.      |
//! | Reordering  | Queue an ACK at a random position with `reorder_rate`.|
//!
//! On top of the random model, one-shot [`Fault`]s can be scripted against
//! a specific sequence or ACK number.  Randomness comes from a seeded
//! `StdRng`, so a failing run is reproducible from its seed.
//!
//! Every datagram the sender hands to [`Channel::send`] is recorded,
//! including ones the fault model then drops.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::POLL_INTERVAL;
use crate::gbn_receiver::GbnReceiver;
use crate::packet::Datagram;
use crate::socket::{Channel, SocketError};

/// Configuration for the random fault model.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub loss_rate: f64,
    pub corrupt_rate: f64,
    pub duplicate_rate: f64,
    pub reorder_rate: f64,
    pub seed: u64,
    /// Simulated wait when [`Channel::receive`] finds nothing queued.
    /// A [`GbnSender`](crate::GbnSender) replaces it with its own setting.
    pub poll_interval: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults by default: the simulator is a perfect channel.
        Self {
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            duplicate_rate: 0.0,
            reorder_rate: 0.0,
            seed: 0,
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// A scripted one-shot fault.  Each fires on the first matching datagram and
/// is then consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Lose the data datagram with this sequence number.
    DropData(u32),
    /// Deliver the data datagram with this sequence number with a bad checksum.
    CorruptData(u32),
    /// Lose the ACK carrying this acknowledgement number.
    DropAck(u32),
    /// Deliver the ACK carrying this acknowledgement number with a bad checksum.
    CorruptAck(u32),
}

#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    rng: StdRng,
    receiver: GbnReceiver,
    /// ACKs on their way back to the sender, front = next to arrive.
    acks: VecDeque<Datagram>,
    faults: Vec<Fault>,
    sent: Vec<Datagram>,
    /// Fail every send once this many have succeeded.
    fail_after: Option<usize>,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            receiver: GbnReceiver::new(),
            acks: VecDeque::new(),
            faults: Vec::new(),
            sent: Vec::new(),
            fail_after: None,
        }
    }

    /// A simulator that delivers everything intact and in order.
    pub fn perfect() -> Self {
        Self::new(SimulatorConfig::default())
    }

    /// Script a one-shot fault.
    pub fn inject(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    /// Make every send after the first `n` fail with a transport error.
    pub fn fail_sends_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Every datagram the sender transmitted, in order.
    pub fn sent(&self) -> &[Datagram] {
        &self.sent
    }

    /// Sequence numbers of [`sent`](Self::sent).
    pub fn sent_seqs(&self) -> Vec<u32> {
        self.sent.iter().map(|d| d.seq_num).collect()
    }

    pub fn receiver(&self) -> &GbnReceiver {
        &self.receiver
    }

    /// Scripted faults that have not fired yet.
    pub fn pending_faults(&self) -> &[Fault] {
        &self.faults
    }

    fn take_fault(&mut self, fault: Fault) -> bool {
        match self.faults.iter().position(|f| *f == fault) {
            Some(i) => {
                self.faults.remove(i);
                true
            }
            None => false,
        }
    }

    fn roll(&mut self, probability: f64) -> bool {
        probability > 0.0 && self.rng.random_bool(probability.min(1.0))
    }

    /// Flip one random byte of the encoded form.  Returns `None` when the
    /// damage leaves the datagram structurally unparseable, which the real
    /// socket layer would also discard.
    fn corrupt_random(&mut self, datagram: &Datagram) -> Option<Datagram> {
        let mut bytes = datagram.encode();
        let i = self.rng.random_range(0..bytes.len());
        let mask = self.rng.random_range(1..=u8::MAX);
        bytes[i] ^= mask;
        Datagram::decode(&bytes).ok()
    }

    /// Deterministic corruption that always survives parsing.
    fn corrupt_checksum(datagram: &Datagram) -> Datagram {
        let mut bad = datagram.clone();
        bad.checksum ^= 0x5a5a;
        bad
    }

    /// Apply the fault model to a datagram travelling sender → receiver.
    fn forward(&mut self, datagram: &Datagram) -> Option<Datagram> {
        let seq = datagram.seq_num;
        if self.take_fault(Fault::DropData(seq)) || self.roll(self.config.loss_rate) {
            log::trace!("[sim] lost DATA seq={seq}");
            return None;
        }
        if self.take_fault(Fault::CorruptData(seq)) {
            return Some(Self::corrupt_checksum(datagram));
        }
        if self.roll(self.config.corrupt_rate) {
            log::trace!("[sim] corrupted DATA seq={seq}");
            return self.corrupt_random(datagram);
        }
        Some(datagram.clone())
    }

    /// Apply the fault model to an ACK travelling receiver → sender and queue
    /// whatever survives.
    fn backward(&mut self, ack: Datagram) {
        let n = ack.ack_num;
        if self.take_fault(Fault::DropAck(n)) || self.roll(self.config.loss_rate) {
            log::trace!("[sim] lost ACK ack={n}");
            return;
        }
        let ack = if self.take_fault(Fault::CorruptAck(n)) {
            Self::corrupt_checksum(&ack)
        } else if self.roll(self.config.corrupt_rate) {
            match self.corrupt_random(&ack) {
                Some(bad) => bad,
                None => return,
            }
        } else {
            ack
        };

        let copies = if self.roll(self.config.duplicate_rate) { 2 } else { 1 };
        for _ in 0..copies {
            if !self.acks.is_empty() && self.roll(self.config.reorder_rate) {
                let at = self.rng.random_range(0..self.acks.len());
                self.acks.insert(at, ack.clone());
            } else {
                self.acks.push_back(ack.clone());
            }
        }
    }
}

impl Channel for Simulator {
    async fn send(&mut self, datagram: &Datagram) -> Result<(), SocketError> {
        if self.fail_after.is_some_and(|n| self.sent.len() >= n) {
            return Err(SocketError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated transport failure",
            )));
        }
        self.sent.push(datagram.clone());

        let Some(arriving) = self.forward(datagram) else {
            return Ok(());
        };
        let copies = if self.roll(self.config.duplicate_rate) { 2 } else { 1 };
        for _ in 0..copies {
            let ack = self.receiver.on_datagram(&arriving);
            self.backward(ack);
        }
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<Datagram>, SocketError> {
        match self.acks.pop_front() {
            Some(ack) => Ok(Some(ack)),
            None => {
                tokio::time::sleep(self.config.poll_interval).await;
                Ok(None)
            }
        }
    }

    fn set_poll_interval(&mut self, poll_interval: Duration) {
        self.config.poll_interval = poll_interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn perfect_channel_acks_every_datagram() {
        let mut sim = Simulator::perfect();
        sim.send(&Datagram::data(1, b"a")).await.unwrap();
        sim.send(&Datagram::data(2, b"b")).await.unwrap();

        assert_eq!(sim.receive().await.unwrap().unwrap().ack_num, 1);
        assert_eq!(sim.receive().await.unwrap().unwrap().ack_num, 2);
        assert!(sim.receive().await.unwrap().is_none());
        assert_eq!(sim.sent_seqs(), vec![1, 2]);
        assert_eq!(sim.receiver().data(), b"ab");
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_faults_fire_once() {
        let mut sim = Simulator::perfect()
            .inject(Fault::DropAck(1))
            .inject(Fault::CorruptData(2));

        sim.send(&Datagram::data(1, b"a")).await.unwrap();
        assert!(sim.receive().await.unwrap().is_none(), "ACK 1 dropped");

        sim.send(&Datagram::data(2, b"b")).await.unwrap();
        let ack = sim.receive().await.unwrap().unwrap();
        assert_eq!(ack.ack_num, 1, "corrupted seq 2 is re-ACKed as 1");

        sim.send(&Datagram::data(2, b"b")).await.unwrap();
        assert_eq!(sim.receive().await.unwrap().unwrap().ack_num, 2);
        assert!(sim.pending_faults().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn corrupt_ack_fails_validation() {
        let mut sim = Simulator::perfect().inject(Fault::CorruptAck(1));
        sim.send(&Datagram::data(1, b"a")).await.unwrap();
        let ack = sim.receive().await.unwrap().unwrap();
        assert_eq!(ack.ack_num, 1);
        assert!(!ack.validate_checksum());
    }

    #[tokio::test(start_paused = true)]
    async fn send_failure_is_reported() {
        let mut sim = Simulator::perfect().fail_sends_after(1);
        sim.send(&Datagram::data(1, b"a")).await.unwrap();
        let err = sim.send(&Datagram::data(2, b"b")).await.unwrap_err();
        assert!(matches!(err, SocketError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[tokio::test(start_paused = true)]
    async fn total_loss_delivers_nothing() {
        let mut sim = Simulator::new(SimulatorConfig {
            loss_rate: 1.0,
            ..SimulatorConfig::default()
        });
        for seq in 1..=5 {
            sim.send(&Datagram::data(seq, b"x")).await.unwrap();
        }
        assert!(sim.receive().await.unwrap().is_none());
        assert!(sim.receiver().data().is_empty());
        assert_eq!(sim.sent().len(), 5);
    }
}
