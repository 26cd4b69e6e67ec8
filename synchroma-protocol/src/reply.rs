//! Ping reply encoding.
//!
//! The ping reply is the only datagram a node ever originates: 2 bytes,
//! sent unicast to the pinging peer. Byte 0 echoes the request sequence
//! number; byte 1 carries the node's network role so the test tool can
//! tell the access point apart from the stations.

/// Total datagram length of a ping reply
pub const PING_REPLY_SIZE: usize = 2;

/// Network role as encoded in a ping reply.
///
/// The encoding is fixed across the deployment: 0 for the access point,
/// 1 for stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RoleFlag {
    AccessPoint = 0,
    Station = 1,
}

impl RoleFlag {
    /// Decode a role flag byte, if valid
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(RoleFlag::AccessPoint),
            1 => Some(RoleFlag::Station),
            _ => None,
        }
    }
}

/// Reply to a [`crate::Command::Ping`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PingReply {
    /// Sequence number echoed from the request
    pub seq: u8,
    /// Role of the replying node
    pub role: RoleFlag,
}

impl PingReply {
    /// Encode this reply into its 2-byte wire form
    pub fn encode(&self) -> [u8; PING_REPLY_SIZE] {
        [self.seq, self.role as u8]
    }

    /// Decode a reply datagram (used by the host-side test tool)
    pub fn decode(datagram: &[u8]) -> Option<Self> {
        if datagram.len() != PING_REPLY_SIZE {
            return None;
        }
        Some(PingReply {
            seq: datagram[0],
            role: RoleFlag::from_byte(datagram[1])?,
        })
    }
}
