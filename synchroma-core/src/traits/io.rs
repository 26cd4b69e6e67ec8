//! Datagram socket abstraction
//!
//! One UDP socket, best-effort in both directions. No connection state,
//! no retransmission.

/// A remote peer: IPv4 address and port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Peer {
    pub ip: [u8; 4],
    pub port: u16,
}

/// A datagram could not be handed to the network stack.
///
/// Best-effort protocol: callers log and move on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SendError;

/// Non-blocking datagram I/O on the sync protocol's UDP port
pub trait Datagrams {
    /// Receive at most one pending datagram into `buf`.
    ///
    /// Returns the sender and payload length, or `None` if nothing is
    /// queued. A datagram longer than `buf` is delivered truncated; the
    /// decoder rejects it by length.
    fn try_recv(&mut self, buf: &mut [u8]) -> Option<(Peer, usize)>;

    /// Send one datagram to `peer`
    fn send(&mut self, peer: Peer, payload: &[u8]) -> Result<(), SendError>;
}
