//! Transfer phase of the GBN sender.
//!
//! "Everything has been sent" and "everything has been acknowledged" are
//! tracked as one enum rather than two flags, so a transfer cannot be marked
//! acknowledged before its terminal datagram exists.
//!
//! ```text
//!  FILLING ──terminal datagram sent──▶ DRAINING ──terminal ACKed──▶ DONE
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Input still has data (or EOF has not been observed); new datagrams are
    /// admitted whenever the window has room.
    #[default]
    Filling,
    /// The terminal datagram has been sent; only ACK processing and
    /// retransmission remain.
    Draining,
    /// The terminal datagram has been acknowledged.
    Done,
}

impl Phase {
    /// `true` once the terminal datagram has been transmitted.
    pub fn terminal_sent(self) -> bool {
        !matches!(self, Self::Filling)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Filling => "filling",
            Self::Draining => "draining",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(Phase::Filling.to_string(), "filling");
        assert_eq!(Phase::Draining.to_string(), "draining");
        assert_eq!(Phase::Done.to_string(), "done");
    }
}
