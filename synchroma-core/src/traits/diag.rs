//! Diagnostics sink
//!
//! Fire-and-forget observations. Every failure in the node surfaces here
//! and nowhere else; there is no interactive recovery path. The firmware
//! routes these to its logger, tests inspect or ignore them.

use synchroma_protocol::{Command, DecodeError};

use crate::formation::addr::NodeAddr;
use crate::formation::Role;
use crate::frame::FrameError;
use crate::traits::net::NetError;

/// Sink for diagnostic events. All methods default to no-ops.
pub trait Diagnostics {
    /// A formation cycle failed and will be restarted
    fn formation_failed(&mut self, _err: NetError) {}

    /// Formation completed; the node has this role and address
    fn role_assigned(&mut self, _role: Role, _addr: NodeAddr) {}

    /// A datagram was dropped (wrong length or unknown tag)
    fn datagram_dropped(&mut self, _err: DecodeError) {}

    /// A reserved command was received and ignored
    fn command_ignored(&mut self, _cmd: Command) {}

    /// A ping reply could not be handed to the network stack
    fn send_failed(&mut self, _err: crate::traits::io::SendError) {}

    /// A render command named a frame the store does not hold
    fn frame_rejected(&mut self, _err: FrameError) {}

    /// Fixed-interval status emission, independent of protocol traffic
    fn periodic_stats(&mut self) {}
}

/// No-op sink for callers that do not observe diagnostics
impl Diagnostics for () {}
