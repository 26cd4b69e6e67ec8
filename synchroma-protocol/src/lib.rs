//! Frame-sync protocol for the Synchroma panel array
//!
//! This crate defines the UDP-based protocol spoken between panel nodes and
//! the controlling peer. The protocol is designed for minimum latency on a
//! single-hop LAN: one datagram carries one command, there are no sequence
//! numbers and no retransmission, and the only reply ever sent is the ping
//! response.
//!
//! # Datagram format
//!
//! ```text
//! ┌─────┬──────────────────┐
//! │ TAG │ PAYLOAD          │
//! │ 1B  │ fixed per tag    │
//! └─────┴──────────────────┘
//! ```
//!
//! | Tag | Command      | Total length | Payload                    |
//! |-----|--------------|--------------|----------------------------|
//! | 0   | PING         | 2            | seq                        |
//! | 1   | UPLOAD       | reserved     | -                          |
//! | 2   | PREPARE      | reserved     | -                          |
//! | 3   | START        | reserved     | -                          |
//! | 4   | STOP         | reserved     | -                          |
//! | 5   | RENDER_FRAME | 4            | frame id, big-endian u24   |
//!
//! A datagram with the wrong length for a known tag, or an unknown tag, is
//! dropped by the receiver: no reply, no state change.

#![no_std]
#![deny(unsafe_code)]

pub mod command;
pub mod reply;

pub use command::{Command, DecodeError, MAX_DATAGRAM_SIZE};
pub use reply::{PingReply, RoleFlag};
