//! Protocol constants and sender configuration.
//!
//! Every value here is fixed before the transfer begins; nothing is
//! negotiated over the wire, so the receiver must be built with the same
//! [`MAX_PAYLOAD_LENGTH`].

use std::time::Duration;

use thiserror::Error;

/// Default number of datagrams that may be outstanding at once.
pub const WINDOW_SIZE: usize = 10;

/// Payload capacity of one datagram, in bytes.
pub const MAX_PAYLOAD_LENGTH: usize = 1024;

/// Default retransmission timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(50);

/// Default UDP port of the receiver.
pub const DEFAULT_PORT: u16 = 12345;

/// Upper bound on how long a single channel poll may wait for an ACK.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Sequence number of the first datagram in a transfer.
pub const INITIAL_SEQ: u32 = 1;

/// Tunable parameters of a [`crate::gbn_sender::GbnSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    /// Go-Back-N window size N (≥ 1).
    pub window_size: usize,
    /// Retransmission timeout applied by the single timer.
    pub timeout: Duration,
    /// Bounded wait for each channel receive.
    pub poll_interval: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: POLL_INTERVAL,
        }
    }
}

impl SenderConfig {
    /// Default configuration with a different window size.
    pub fn with_window_size(window_size: usize) -> Self {
        Self {
            window_size,
            ..Self::default()
        }
    }

    /// Reject configurations the state machine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("window size must be at least 1")]
    ZeroWindow,
    #[error("retransmission timeout must be non-zero")]
    ZeroTimeout,
}
