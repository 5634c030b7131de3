//! `gbn-sender` — reliable file transfer over UDP using Go-Back-N.
//!
//! # Architecture
//!
//! ```text
//!  input file ──▶ GbnSender ──DATA──▶ Channel ──▶ receiver
//!                  │  ▲                  │
//!                  │  └──── ACK ◀────────┘
//!                  │
//!                  ├── SendWindow       (ring of unacked datagrams)
//!                  └── RetransmitTimer  (one timer for the oldest one)
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]        — wire format and checksum
//! - [`timer`]         — the single retransmission timer
//! - [`window`]        — fixed-capacity buffer of unacknowledged datagrams
//! - [`gbn_sender`]    — GBN send-side state machine and transfer loop
//! - [`state`]         — transfer phase enum
//! - [`config`]        — protocol constants and sender configuration
//! - [`socket`]        — `Channel` trait and its tokio UDP implementation
//! - [`gbn_receiver`]  — receive-side state the sender is written against
//! - [`simulator`]     — in-process lossy channel for testing

pub mod config;
pub mod gbn_receiver;
pub mod gbn_sender;
pub mod packet;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod timer;
pub mod window;

pub use config::SenderConfig;
pub use gbn_sender::{GbnSender, TransferError, TransferStats};
pub use packet::Datagram;
pub use socket::{Channel, Socket};
