//! Deterministic address assignment
//!
//! Nodes boot in any order and there is no DHCP server, so every node
//! derives its own address from its MAC. The first octet is the shared
//! network id; the rest fold the six MAC octets down to three. The /8
//! netmask puts every derived address on one subnet, and the network id
//! alone names the gateway (the access point binds that same scheme).

/// IPv4 address in octet form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeAddr(pub [u8; 4]);

impl NodeAddr {
    pub fn octets(&self) -> [u8; 4] {
        self.0
    }
}

/// Static interface configuration used for both roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StaticAddr {
    pub addr: NodeAddr,
    pub netmask: NodeAddr,
    pub gateway: NodeAddr,
}

/// Derive the node's static address from its MAC and the network id.
///
/// Folding with xor instead of taking the low MAC octets keeps vendor
/// prefixes from colliding when panels ship from mixed batches.
pub fn derive(network_id: u8, mac: &[u8; 6]) -> StaticAddr {
    let addr = NodeAddr([
        network_id,
        mac[0] ^ mac[3],
        mac[1] ^ mac[4],
        mac[2] ^ mac[5],
    ]);

    StaticAddr {
        addr,
        netmask: NodeAddr([255, 0, 0, 0]),
        gateway: NodeAddr([network_id, 0, 0, 0]),
    }
}
