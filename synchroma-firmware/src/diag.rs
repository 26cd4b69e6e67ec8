//! Diagnostics routed to the serial logger

use log::{info, warn};

use synchroma_core::formation::addr::NodeAddr;
use synchroma_core::formation::Role;
use synchroma_core::frame::FrameError;
use synchroma_core::traits::{Diagnostics, NetError, SendError};
use synchroma_protocol::{Command, DecodeError};

/// Routes every diagnostic event to `log`; remembers the assigned role
/// and address so the periodic stats line has something to say.
pub struct LogSink {
    role: Option<Role>,
    addr: Option<NodeAddr>,
    datagrams_dropped: u32,
    sends_failed: u32,
}

impl LogSink {
    pub const fn new() -> Self {
        Self {
            role: None,
            addr: None,
            datagrams_dropped: 0,
            sends_failed: 0,
        }
    }
}

impl Diagnostics for LogSink {
    fn formation_failed(&mut self, err: NetError) {
        warn!("formation cycle failed: {:?}", err);
    }

    fn role_assigned(&mut self, role: Role, addr: NodeAddr) {
        let o = addr.octets();
        info!(
            "network up: {:?} at {}.{}.{}.{}",
            role, o[0], o[1], o[2], o[3]
        );
        self.role = Some(role);
        self.addr = Some(addr);
    }

    fn datagram_dropped(&mut self, err: DecodeError) {
        self.datagrams_dropped += 1;
        warn!("datagram dropped: {:?}", err);
    }

    fn command_ignored(&mut self, cmd: Command) {
        info!("command accepted but unhandled: {:?}", cmd);
    }

    fn send_failed(&mut self, _err: SendError) {
        self.sends_failed += 1;
        warn!("ping reply not sent");
    }

    fn frame_rejected(&mut self, err: FrameError) {
        warn!("render command rejected: {:?}", err);
    }

    fn periodic_stats(&mut self) {
        match (self.role, self.addr) {
            (Some(role), Some(addr)) => {
                let o = addr.octets();
                info!(
                    "stats: {:?} {}.{}.{}.{} dropped {} send-failures {}",
                    role, o[0], o[1], o[2], o[3], self.datagrams_dropped, self.sends_failed
                );
            }
            _ => info!("stats: forming"),
        }
    }
}
