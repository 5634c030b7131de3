//! Wire-format definitions for GBN datagrams.
//!
//! Every datagram exchanged between sender and receiver is a [`Datagram`],
//! whether it carries file data (sender → receiver) or a cumulative
//! acknowledgement (receiver → sender).  This module is responsible for:
//! - Defining the on-wire binary layout.
//! - Computing and validating the checksum.
//! - Serialising a [`Datagram`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Datagram`], returning errors
//!   for structurally malformed input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                    Acknowledgment Number                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Payload Length        |            Checksum           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                 Payload (payload_len bytes) ...               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 12 bytes.
//!
//! [`Datagram::decode`] deliberately does **not** verify the checksum: a
//! corrupted datagram still parses, and the caller decides what to do with it
//! via [`Datagram::validate_checksum`].

use thiserror::Error;

use crate::config::MAX_PAYLOAD_LENGTH;

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 12;

/// Largest datagram that can appear on the wire.
pub const MAX_DATAGRAM_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LENGTH;

// Byte offsets of each field within the serialised header.
const OFF_SEQ: usize = 0;
const OFF_ACK: usize = 4;
const OFF_PAYLOAD_LEN: usize = 8;
const OFF_CHECKSUM: usize = 10;

/// A complete protocol datagram.
///
/// The payload lives in a fixed-capacity inline buffer so that the send
/// window can hold a full set of datagrams without per-packet allocation.
/// Only the first `payload_len` bytes are meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Position of this datagram in the stream (first data datagram is 1).
    pub seq_num: u32,
    /// Cumulative acknowledgement: every sequence number ≤ this was received.
    pub ack_num: u32,
    /// Number of valid bytes in `payload`.  Zero marks the terminal datagram.
    pub payload_len: u16,
    /// Internet checksum over seq, ack, payload length and valid payload.
    pub checksum: u16,
    pub payload: [u8; MAX_PAYLOAD_LENGTH],
}

impl Default for Datagram {
    fn default() -> Self {
        Self {
            seq_num: 0,
            ack_num: 0,
            payload_len: 0,
            checksum: 0,
            payload: [0u8; MAX_PAYLOAD_LENGTH],
        }
    }
}

impl Datagram {
    /// Build a checksummed data datagram carrying `data`.
    ///
    /// An empty `data` slice yields the terminal (end-of-file) datagram.
    ///
    /// # Panics
    ///
    /// Panics if `data` is longer than [`MAX_PAYLOAD_LENGTH`].
    pub fn data(seq_num: u32, data: &[u8]) -> Self {
        assert!(
            data.len() <= MAX_PAYLOAD_LENGTH,
            "payload of {} bytes exceeds MAX_PAYLOAD_LENGTH",
            data.len()
        );
        let mut d = Self {
            seq_num,
            payload_len: data.len() as u16,
            ..Self::default()
        };
        d.payload[..data.len()].copy_from_slice(data);
        d.checksum = d.compute_checksum();
        d
    }

    /// Build a checksummed cumulative acknowledgement for `ack_num`.
    pub fn ack(ack_num: u32) -> Self {
        let mut d = Self {
            ack_num,
            ..Self::default()
        };
        d.checksum = d.compute_checksum();
        d
    }

    /// `true` for the end-of-file datagram (`payload_len == 0`).
    pub fn is_terminal(&self) -> bool {
        self.payload_len == 0
    }

    /// The valid portion of the payload buffer.
    ///
    /// A `payload_len` beyond the buffer capacity (only possible on a
    /// hand-built datagram) is clamped.
    pub fn payload(&self) -> &[u8] {
        let len = (self.payload_len as usize).min(MAX_PAYLOAD_LENGTH);
        &self.payload[..len]
    }

    /// Compute the checksum over every covered field.
    ///
    /// The stored `checksum` field is not part of the coverage, so this can be
    /// called on a datagram regardless of what that field currently holds.
    pub fn compute_checksum(&self) -> u16 {
        let payload = self.payload();
        let mut buf = Vec::with_capacity(10 + payload.len());
        buf.extend_from_slice(&self.seq_num.to_be_bytes());
        buf.extend_from_slice(&self.ack_num.to_be_bytes());
        buf.extend_from_slice(&self.payload_len.to_be_bytes());
        buf.extend_from_slice(payload);
        internet_checksum(&buf)
    }

    /// `true` when the stored checksum matches a fresh computation.
    pub fn validate_checksum(&self) -> bool {
        self.payload_len as usize <= MAX_PAYLOAD_LENGTH && self.compute_checksum() == self.checksum
    }

    /// Serialise this datagram into a newly allocated byte vector.
    ///
    /// The stored `checksum` is written as-is; it is never recomputed here, so
    /// a retransmission reproduces the original bytes exactly.
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.payload();
        let mut buf = vec![0u8; HEADER_LEN + payload.len()];

        buf[OFF_SEQ..OFF_SEQ + 4].copy_from_slice(&self.seq_num.to_be_bytes());
        buf[OFF_ACK..OFF_ACK + 4].copy_from_slice(&self.ack_num.to_be_bytes());
        buf[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 2]
            .copy_from_slice(&(payload.len() as u16).to_be_bytes());
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&self.checksum.to_be_bytes());
        buf[HEADER_LEN..].copy_from_slice(payload);

        buf
    }

    /// Parse a [`Datagram`] from a raw byte slice.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than [`HEADER_LEN`],
    /// - the `payload_len` field exceeds [`MAX_PAYLOAD_LENGTH`], or
    /// - the `payload_len` field disagrees with `buf.len()`.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::BufferTooShort(buf.len()));
        }

        let seq_num = u32::from_be_bytes([
            buf[OFF_SEQ],
            buf[OFF_SEQ + 1],
            buf[OFF_SEQ + 2],
            buf[OFF_SEQ + 3],
        ]);
        let ack_num = u32::from_be_bytes([
            buf[OFF_ACK],
            buf[OFF_ACK + 1],
            buf[OFF_ACK + 2],
            buf[OFF_ACK + 3],
        ]);
        let payload_len = u16::from_be_bytes([buf[OFF_PAYLOAD_LEN], buf[OFF_PAYLOAD_LEN + 1]]);
        let checksum = u16::from_be_bytes([buf[OFF_CHECKSUM], buf[OFF_CHECKSUM + 1]]);

        if payload_len as usize > MAX_PAYLOAD_LENGTH {
            return Err(PacketError::PayloadTooLong(payload_len));
        }
        if buf.len() != HEADER_LEN + payload_len as usize {
            return Err(PacketError::LengthMismatch {
                declared: payload_len,
                actual: buf.len() - HEADER_LEN,
            });
        }

        let mut d = Self {
            seq_num,
            ack_num,
            payload_len,
            checksum,
            ..Self::default()
        };
        d.payload[..payload_len as usize].copy_from_slice(&buf[HEADER_LEN..]);
        Ok(d)
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("buffer of {0} bytes is too short to contain a header")]
    BufferTooShort(usize),
    #[error("payload_len {0} exceeds the maximum payload length")]
    PayloadTooLong(u16),
    #[error("payload_len field says {declared} bytes but {actual} follow the header")]
    LengthMismatch { declared: u16, actual: usize },
}

/// Compute the Internet checksum (RFC 1071) over `data`.
///
/// Sum consecutive 16-bit big-endian words, fold the carry, return the
/// one's-complement.
fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);

    for chunk in &mut chunks {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    // Odd trailing byte — pad with a zero byte on the right.
    if let Some(&byte) = chunks.remainder().first() {
        sum += u32::from(byte) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_data_datagram_validates() {
        let d = Datagram::data(7, b"hello world");
        assert!(d.validate_checksum());
        assert_eq!(d.payload(), b"hello world");
        assert!(!d.is_terminal());
    }

    #[test]
    fn fresh_ack_validates() {
        let a = Datagram::ack(42);
        assert!(a.validate_checksum());
        assert_eq!(a.ack_num, 42);
        assert!(a.is_terminal(), "ACKs carry no payload");
    }

    #[test]
    fn mutating_any_covered_field_breaks_checksum() {
        let d = Datagram::data(3, b"abcdef");

        let mut m = d.clone();
        m.seq_num += 1;
        assert!(!m.validate_checksum(), "seq_num");

        let mut m = d.clone();
        m.ack_num ^= 0x8000_0000;
        assert!(!m.validate_checksum(), "ack_num");

        let mut m = d.clone();
        m.payload_len -= 1;
        assert!(!m.validate_checksum(), "payload_len");

        let mut m = d.clone();
        m.payload[2] ^= 0x01;
        assert!(!m.validate_checksum(), "payload byte");

        let mut m = d;
        m.checksum = m.checksum.wrapping_add(1);
        assert!(!m.validate_checksum(), "checksum");
    }

    #[test]
    fn bytes_past_payload_len_are_not_covered() {
        let mut d = Datagram::data(1, b"abc");
        d.payload[10] = 0xff;
        assert!(d.validate_checksum());
    }

    #[test]
    fn oversized_payload_len_never_validates() {
        let mut d = Datagram::ack(1);
        d.payload_len = MAX_PAYLOAD_LENGTH as u16 + 1;
        d.checksum = d.compute_checksum();
        assert!(!d.validate_checksum());
    }

    #[test]
    fn terminal_datagram_has_zero_length() {
        let t = Datagram::data(9, &[]);
        assert!(t.is_terminal());
        assert!(t.validate_checksum());
        assert_eq!(t.encode().len(), HEADER_LEN);
    }

    #[test]
    fn encode_decode_preserves_checksum() {
        let d = Datagram::data(0x0102_0304, b"payload");
        let bytes = d.encode();
        assert_eq!(&bytes[OFF_SEQ..OFF_SEQ + 4], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(bytes.len(), HEADER_LEN + 7);

        let back = Datagram::decode(&bytes).unwrap();
        assert_eq!(back, d);
        assert!(back.validate_checksum());
    }

    #[test]
    fn decode_does_not_reject_bad_checksum() {
        let mut bytes = Datagram::ack(5).encode();
        bytes[OFF_ACK + 3] ^= 0xff;
        let d = Datagram::decode(&bytes).expect("structurally valid");
        assert!(!d.validate_checksum());
    }

    #[test]
    fn decode_short_header_returns_error() {
        assert_eq!(
            Datagram::decode(&[0u8; HEADER_LEN - 1]),
            Err(PacketError::BufferTooShort(HEADER_LEN - 1))
        );
    }

    #[test]
    fn decode_truncated_payload_returns_error() {
        let mut bytes = Datagram::data(1, b"data").encode();
        bytes.pop();
        assert_eq!(
            Datagram::decode(&bytes),
            Err(PacketError::LengthMismatch {
                declared: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn decode_rejects_oversized_length_field() {
        let mut bytes = Datagram::ack(0).encode();
        bytes[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 2].copy_from_slice(&u16::MAX.to_be_bytes());
        assert_eq!(
            Datagram::decode(&bytes),
            Err(PacketError::PayloadTooLong(u16::MAX))
        );
    }

    #[test]
    fn internet_checksum_known_vector() {
        // RFC 1071 §3 example words: 0x0001 0xf203 0xf4f5 0xf6f7 → sum 0xddf2.
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(internet_checksum(&data), !0xddf2);
    }
}
