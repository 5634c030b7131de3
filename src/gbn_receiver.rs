//! Go-Back-N receive-side state machine.
//!
//! [`GbnReceiver`] is the peer the sender is written against:
//!
//! - Only **in-order** datagrams (seq == `expected_seq`) with a valid
//!   checksum are accepted.
//! - Out-of-order, duplicate, and corrupted datagrams are **discarded**.
//! - Every datagram, accepted or not, is answered with a **cumulative ACK**
//!   for the highest in-order sequence number received so far.
//! - A zero-length datagram marks end of file.
//!
//! This module only manages state; socket I/O is the caller's
//! responsibility.  The in-process [`crate::simulator::Simulator`] drives it
//! directly.

use crate::config::INITIAL_SEQ;
use crate::packet::Datagram;

#[derive(Debug)]
pub struct GbnReceiver {
    /// Next in-order sequence number.
    expected_seq: u32,
    /// Reassembled file contents.
    data: Vec<u8>,
    complete: bool,
}

impl Default for GbnReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl GbnReceiver {
    pub fn new() -> Self {
        Self {
            expected_seq: INITIAL_SEQ,
            data: Vec::new(),
            complete: false,
        }
    }

    /// Process one inbound datagram and return the ACK to send back.
    pub fn on_datagram(&mut self, datagram: &Datagram) -> Datagram {
        if self.accepts(datagram) {
            if datagram.is_terminal() {
                self.complete = true;
            } else {
                self.data.extend_from_slice(datagram.payload());
            }
            self.expected_seq += 1;
        }
        Datagram::ack(self.ack_number())
    }

    fn accepts(&self, datagram: &Datagram) -> bool {
        !self.complete && datagram.validate_checksum() && datagram.seq_num == self.expected_seq
    }

    /// Highest sequence number received in order (0 before the first one).
    pub fn ack_number(&self) -> u32 {
        self.expected_seq - 1
    }

    /// `true` once the terminal datagram has been accepted.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_in_order_and_acks_cumulatively() {
        let mut r = GbnReceiver::new();
        assert_eq!(r.on_datagram(&Datagram::data(1, b"ab")).ack_num, 1);
        assert_eq!(r.on_datagram(&Datagram::data(2, b"cd")).ack_num, 2);
        assert_eq!(r.data(), b"abcd");
        assert!(!r.is_complete());
    }

    #[test]
    fn discards_out_of_order() {
        let mut r = GbnReceiver::new();
        let ack = r.on_datagram(&Datagram::data(2, b"future"));
        assert_eq!(ack.ack_num, 0);
        assert!(ack.validate_checksum());
        assert!(r.data().is_empty());
    }

    #[test]
    fn duplicate_is_reacked_not_redelivered() {
        let mut r = GbnReceiver::new();
        r.on_datagram(&Datagram::data(1, b"x"));
        assert_eq!(r.on_datagram(&Datagram::data(1, b"x")).ack_num, 1);
        assert_eq!(r.data(), b"x");
    }

    #[test]
    fn corrupted_datagram_is_discarded() {
        let mut r = GbnReceiver::new();
        let mut d = Datagram::data(1, b"hello");
        d.payload[0] ^= 0x20;
        assert_eq!(r.on_datagram(&d).ack_num, 0);
        assert!(r.data().is_empty());
    }

    #[test]
    fn terminal_completes_transfer() {
        let mut r = GbnReceiver::new();
        r.on_datagram(&Datagram::data(1, b"last"));
        let ack = r.on_datagram(&Datagram::data(2, &[]));
        assert_eq!(ack.ack_num, 2);
        assert!(r.is_complete());

        // A retransmitted terminal is still acknowledged.
        assert_eq!(r.on_datagram(&Datagram::data(2, &[])).ack_num, 2);
        assert_eq!(r.into_data(), b"last");
    }
}
