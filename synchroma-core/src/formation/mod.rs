//! Network formation
//!
//! Establishes exactly one panel network and a role for this node. The
//! cycle: scan for the network name up to the configured number of
//! attempts; join it as a station if seen, otherwise create it as the
//! access point. Every node derives the same kind of static address from
//! its own MAC, so the network needs no DHCP in either direction.
//!
//! Formation never fails permanently. A platform error or a lost link
//! tears the cycle down and starts it over after a delay.

pub mod addr;
pub mod machine;
pub mod signal;

pub use machine::{Event, FormationMachine, State};

use synchroma_protocol::RoleFlag;

use crate::config::NetworkConfig;
use crate::traits::{Delay, Diagnostics, NetworkPlatform};
use addr::StaticAddr;

/// Network role held by a node once formation completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    Station,
    AccessPoint,
}

impl Role {
    /// Wire encoding used in ping replies
    pub fn flag(self) -> RoleFlag {
        match self {
            Role::AccessPoint => RoleFlag::AccessPoint,
            Role::Station => RoleFlag::Station,
        }
    }
}

/// Drives the formation state machine against a network platform
pub struct Formation {
    machine: FormationMachine,
    config: NetworkConfig,
}

impl Formation {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            machine: FormationMachine::new(config.scan_attempts),
            config,
        }
    }

    /// Tell the runner the established link was lost. The next
    /// [`Self::establish`] call starts from teardown.
    pub fn notify_link_lost(&mut self) {
        self.machine.step(Event::LinkLost);
    }

    /// Run formation cycles until the node is up, returning the assigned
    /// role and address. Blocks indefinitely; only returns on success.
    pub fn establish<P, D, G>(
        &mut self,
        platform: &mut P,
        delay: &mut D,
        diag: &mut G,
    ) -> (Role, StaticAddr)
    where
        P: NetworkPlatform,
        D: Delay,
        G: Diagnostics,
    {
        let cfg = &self.config;
        let static_addr = addr::derive(cfg.network_id, &platform.mac_address());

        loop {
            match self.machine.state() {
                State::Scanning { attempt } => {
                    if attempt > 0 {
                        delay.delay_ms(cfg.scan_retry_delay_ms);
                    }
                    let event = match platform.scan_for(cfg.ssid) {
                        Ok(true) => Event::NetworkFound,
                        Ok(false) => Event::NetworkMissed,
                        Err(err) => {
                            diag.formation_failed(err);
                            Event::PlatformFailed
                        }
                    };
                    self.machine.step(event);
                }

                State::Joining => {
                    let event = match platform.join(cfg.ssid, cfg.password, &static_addr) {
                        Ok(()) => Event::JoinSucceeded,
                        Err(err) => {
                            diag.formation_failed(err);
                            Event::JoinFailed
                        }
                    };
                    self.machine.step(event);
                }

                State::Creating => {
                    let event = match platform.create(
                        cfg.ssid,
                        cfg.password,
                        cfg.channel,
                        cfg.max_stations,
                        &static_addr,
                    ) {
                        Ok(()) => Event::CreateSucceeded,
                        Err(err) => {
                            diag.formation_failed(err);
                            Event::CreateFailed
                        }
                    };
                    self.machine.step(event);
                }

                State::Up(role) => match platform.open_ports(cfg.udp_port, cfg.tcp_port) {
                    Ok(()) => {
                        diag.role_assigned(role, static_addr.addr);
                        return (role, static_addr);
                    }
                    Err(err) => {
                        diag.formation_failed(err);
                        self.machine.step(Event::PlatformFailed);
                    }
                },

                State::Down => {
                    platform.shutdown();
                    delay.delay_ms(cfg.formation_retry_delay_ms);
                    self.machine.step(Event::Restart);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::NetError;

    struct NoDelay {
        total_ms: u32,
    }

    impl Delay for NoDelay {
        fn delay_us(&mut self, us: u32) {
            self.total_ms += us / 1000;
        }
    }

    /// Platform with scripted scan results and failure injection
    struct MockPlatform {
        scan_results: heapless::Vec<Result<bool, NetError>, 16>,
        scan_idx: usize,
        join_failures: u8,
        create_failures: u8,
        joined: Option<StaticAddr>,
        created: Option<StaticAddr>,
        ports: Option<(u16, u16)>,
        shutdowns: u8,
    }

    impl MockPlatform {
        fn new(scans: &[Result<bool, NetError>]) -> Self {
            Self {
                scan_results: heapless::Vec::from_slice(scans).unwrap(),
                scan_idx: 0,
                join_failures: 0,
                create_failures: 0,
                joined: None,
                created: None,
                ports: None,
                shutdowns: 0,
            }
        }
    }

    impl NetworkPlatform for MockPlatform {
        fn mac_address(&self) -> [u8; 6] {
            [0x24, 0x6F, 0x28, 0xAB, 0xCD, 0xEF]
        }

        fn scan_for(&mut self, _ssid: &str) -> Result<bool, NetError> {
            let result = self.scan_results[self.scan_idx.min(self.scan_results.len() - 1)];
            self.scan_idx += 1;
            result
        }

        fn join(&mut self, _ssid: &str, _pw: &str, addr: &StaticAddr) -> Result<(), NetError> {
            if self.join_failures > 0 {
                self.join_failures -= 1;
                return Err(NetError::JoinFailed);
            }
            self.joined = Some(*addr);
            Ok(())
        }

        fn create(
            &mut self,
            _ssid: &str,
            _pw: &str,
            _channel: u8,
            _max: u8,
            addr: &StaticAddr,
        ) -> Result<(), NetError> {
            if self.create_failures > 0 {
                self.create_failures -= 1;
                return Err(NetError::CreateFailed);
            }
            self.created = Some(*addr);
            Ok(())
        }

        fn open_ports(&mut self, udp: u16, tcp: u16) -> Result<(), NetError> {
            self.ports = Some((udp, tcp));
            Ok(())
        }

        fn shutdown(&mut self) {
            self.shutdowns += 1;
        }
    }

    fn establish(platform: &mut MockPlatform) -> (Role, StaticAddr) {
        let mut formation = Formation::new(NetworkConfig::default());
        let mut delay = NoDelay { total_ms: 0 };
        formation.establish(platform, &mut delay, &mut ())
    }

    #[test]
    fn test_network_found_yields_station() {
        let mut platform = MockPlatform::new(&[Ok(true)]);
        let (role, _) = establish(&mut platform);
        assert_eq!(role, Role::Station);
        assert!(platform.joined.is_some());
        assert_eq!(platform.ports, Some((1972, 1972)));
    }

    #[test]
    fn test_three_misses_yield_access_point() {
        let mut platform = MockPlatform::new(&[Ok(false)]);
        let (role, cfg) = establish(&mut platform);
        assert_eq!(role, Role::AccessPoint);
        assert_eq!(platform.scan_idx, 3);
        // AP binds the derived address as the gateway-side address
        assert_eq!(platform.created, Some(cfg));
        assert_eq!(cfg.addr.octets()[0], 10);
    }

    #[test]
    fn test_network_found_on_last_attempt() {
        let mut platform = MockPlatform::new(&[Ok(false), Ok(false), Ok(true)]);
        let (role, _) = establish(&mut platform);
        assert_eq!(role, Role::Station);
    }

    #[test]
    fn test_join_failure_restarts_whole_cycle() {
        let mut platform = MockPlatform::new(&[Ok(true)]);
        platform.join_failures = 1;
        let (role, _) = establish(&mut platform);
        // Second cycle scans again, finds the network, joins
        assert_eq!(role, Role::Station);
        assert_eq!(platform.shutdowns, 1);
        assert!(platform.scan_idx >= 2);
    }

    #[test]
    fn test_scan_error_is_not_fatal() {
        let mut platform = MockPlatform::new(&[Err(NetError::ScanFailed), Ok(true)]);
        let (role, _) = establish(&mut platform);
        assert_eq!(role, Role::Station);
        assert_eq!(platform.shutdowns, 1);
    }

    #[test]
    fn test_create_failure_retries_from_scan() {
        let mut platform = MockPlatform::new(&[Ok(false)]);
        platform.create_failures = 1;
        let (role, _) = establish(&mut platform);
        assert_eq!(role, Role::AccessPoint);
        // 3 misses, failed create, teardown, 3 more misses, create
        assert_eq!(platform.scan_idx, 6);
        assert_eq!(platform.shutdowns, 1);
    }
}
