//! Network platform abstraction
//!
//! Wraps the platform's WiFi primitives: scan, join as station, create an
//! access point, tear down. Implementations block until the operation
//! resolves or a platform-level timeout fires; the formation runner treats
//! every error uniformly as a failed formation cycle.

use crate::formation::addr::StaticAddr;

/// A failed platform networking call.
///
/// The variants exist for logging; the formation runner reacts to all of
/// them the same way (restart the cycle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetError {
    /// Scan could not be started or did not complete
    ScanFailed,
    /// Static address or mode configuration was rejected
    ConfigFailed,
    /// Station connect failed or timed out
    JoinFailed,
    /// Access point could not be brought up
    CreateFailed,
    /// Socket could not be opened after the link came up
    SocketFailed,
}

/// Platform WiFi primitives used by the formation runner.
///
/// `join` and `create` include bringing the link up and configuring the
/// static address with DHCP disabled; on success the node is reachable at
/// the address it derived from its MAC.
pub trait NetworkPlatform {
    /// The node's hardware MAC address
    fn mac_address(&self) -> [u8; 6];

    /// Scan for the given network name. Returns whether it was seen.
    fn scan_for(&mut self, ssid: &str) -> Result<bool, NetError>;

    /// Join the network as a station with the given static address
    fn join(&mut self, ssid: &str, password: &str, addr: &StaticAddr) -> Result<(), NetError>;

    /// Create the network as the access point, bound to the given address
    /// (which doubles as the network's gateway), DHCP server disabled
    fn create(
        &mut self,
        ssid: &str,
        password: &str,
        channel: u8,
        max_stations: u8,
        addr: &StaticAddr,
    ) -> Result<(), NetError>;

    /// Open the UDP receive port and the TCP listen port
    fn open_ports(&mut self, udp_port: u16, tcp_port: u16) -> Result<(), NetError>;

    /// Tear the link down so the next cycle starts clean. Must not fail.
    fn shutdown(&mut self);
}
