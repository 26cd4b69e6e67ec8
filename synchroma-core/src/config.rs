//! Configuration type definitions
//!
//! All tunables live here: retry counts, delays, credentials, ports, and
//! sample-rate constants are configuration values, not protocol invariants.
//! The firmware constructs these once at boot; nothing in the core reads a
//! hidden global.

/// Network formation and socket configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkConfig {
    /// Network name every node scans for and, failing that, creates
    pub ssid: &'static str,
    /// WPA2 passphrase
    pub password: &'static str,
    /// Channel used when creating the network
    pub channel: u8,
    /// First address octet shared by every node on the panel network
    pub network_id: u8,
    /// Scan attempts before giving up and creating the network
    pub scan_attempts: u8,
    /// Delay between scan attempts, milliseconds
    pub scan_retry_delay_ms: u32,
    /// Delay before restarting a failed formation cycle, milliseconds
    pub formation_retry_delay_ms: u32,
    /// Maximum stations accepted when acting as the access point
    pub max_stations: u8,
    /// UDP port the sync protocol listens on
    pub udp_port: u16,
    /// TCP port opened at formation (accepted but unhandled)
    pub tcp_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ssid: "Synchroma 3000",
            password: "all-in-sync",
            channel: 1,
            network_id: 10,
            scan_attempts: 3,
            scan_retry_delay_ms: 2000,
            formation_retry_delay_ms: 2000,
            max_stations: 10,
            udp_port: 1972,
            tcp_port: 1972,
        }
    }
}

/// Frame-sync poll engine configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncConfig {
    /// Upper bound for the random delay before a ping reply, microseconds.
    ///
    /// Broadcast pings reach every node at once; replying after a random
    /// delay below this bound spreads the replies out in time.
    pub ping_jitter_bound_us: u32,
    /// Interval between periodic diagnostics emissions, milliseconds
    pub stats_interval_ms: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ping_jitter_bound_us: 1000,
            stats_interval_ms: 5000,
        }
    }
}

/// Panel output driver configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelConfig {
    /// Sample rate on the output lines, hertz. 10 MHz gives 100 ns per
    /// sample; each u16 sample is one parallel output word.
    pub sample_rate_hz: u32,
    /// Number of DMA buffers in the ring
    pub dma_buffers: usize,
    /// Samples per DMA buffer
    pub dma_buffer_len: usize,
    /// GPIO carrying output line 0 (serial frame data)
    pub data_pin: u8,
    /// GPIO carrying output line 1 (bit clock)
    pub clock_pin: u8,
    /// Re-emission period in the fixed-cadence mode, milliseconds
    pub refresh_period_ms: u32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 10_000_000,
            dma_buffers: 2,
            dma_buffer_len: 1024,
            data_pin: 4,
            clock_pin: 5,
            refresh_period_ms: 1000,
        }
    }
}
