//! esp-wifi network backend
//!
//! Implements the formation platform and the datagram socket over the
//! blocking esp-wifi stack plus smoltcp. The node runs the combined
//! ap-sta interface so one boot can end in either role; after formation
//! only the interface matching the assigned role is polled.

use esp_wifi::wifi::utils::{create_ap_sta_network_interface, ApStaInterface};
use esp_wifi::wifi::{
    AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, WifiApDevice,
    WifiController, WifiDevice, WifiStaDevice,
};
use esp_wifi::EspWifiController;
use log::warn;
use smoltcp::iface::{Interface, SocketHandle, SocketSet, SocketStorage};
use smoltcp::phy::Device;
use smoltcp::socket::{tcp, udp};
use smoltcp::time::Instant;
use smoltcp::wire::{HardwareAddress, IpAddress, IpCidr, IpEndpoint, Ipv4Address, Ipv4Cidr};
use static_cell::StaticCell;

use synchroma_core::formation::addr::{NodeAddr, StaticAddr};
use synchroma_core::formation::signal::LinkFlags;
use synchroma_core::formation::Role;
use synchroma_core::traits::{
    Clock, Datagrams, Delay, NetError, NetworkPlatform, Peer, SendError,
};

use crate::time::{HalDelay, Uptime};

/// Link events raised by the serve loop's watcher, consumed by the outer
/// formation loop
pub static LINK: LinkFlags = LinkFlags::new();

const SCAN_LIMIT: usize = 8;
const JOIN_TIMEOUT_MS: u64 = 10_000;
const JOIN_POLL_MS: u32 = 50;

// Socket plumbing lives for the whole boot; handles are created once and
// rebound on every formation cycle.
static SOCKET_STORAGE: StaticCell<[SocketStorage<'static>; 4]> = StaticCell::new();
static UDP_RX_META: StaticCell<[udp::PacketMetadata; 8]> = StaticCell::new();
static UDP_RX_DATA: StaticCell<[u8; 1024]> = StaticCell::new();
static UDP_TX_META: StaticCell<[udp::PacketMetadata; 8]> = StaticCell::new();
static UDP_TX_DATA: StaticCell<[u8; 1024]> = StaticCell::new();
static TCP_RX_DATA: StaticCell<[u8; 512]> = StaticCell::new();
static TCP_TX_DATA: StaticCell<[u8; 512]> = StaticCell::new();

/// Formation platform and socket owner for the esp-wifi stack
pub struct WifiPlatform<'d> {
    controller: WifiController<'d>,
    sta_iface: Interface,
    sta_device: WifiDevice<'d, WifiStaDevice>,
    ap_iface: Interface,
    ap_device: WifiDevice<'d, WifiApDevice>,
    sockets: SocketSet<'static>,
    udp_handle: Option<SocketHandle>,
    tcp_handle: Option<SocketHandle>,
    tcp_port: u16,
    clock: Uptime,
    delay: HalDelay,
}

impl<'d> WifiPlatform<'d> {
    pub fn new(
        init: &'d EspWifiController<'d>,
        wifi: esp_hal::peripherals::WIFI,
        clock: Uptime,
        delay: HalDelay,
    ) -> Self {
        let ApStaInterface {
            ap_interface,
            sta_interface,
            ap_device,
            sta_device,
            controller,
        } = create_ap_sta_network_interface(init, wifi).expect("wifi interface");

        let storage = SOCKET_STORAGE.init([SocketStorage::EMPTY; 4]);
        let sockets = SocketSet::new(&mut storage[..]);

        Self {
            controller,
            sta_iface: sta_interface,
            sta_device,
            ap_iface: ap_interface,
            ap_device,
            sockets,
            udp_handle: None,
            tcp_handle: None,
            tcp_port: 0,
            clock,
            delay,
        }
    }

    /// Borrow the station-side socket and the link watcher
    pub fn split_station(
        &mut self,
    ) -> Result<
        (
            NodeSocket<'_, WifiDevice<'d, WifiStaDevice>>,
            LinkWatch<'_, 'd>,
        ),
        NetError,
    > {
        let (udp, tcp) = match (self.udp_handle, self.tcp_handle) {
            (Some(u), Some(t)) => (u, t),
            _ => return Err(NetError::SocketFailed),
        };
        let socket = NodeSocket {
            iface: &mut self.sta_iface,
            device: &mut self.sta_device,
            sockets: &mut self.sockets,
            udp,
            tcp,
            tcp_port: self.tcp_port,
            clock: self.clock,
        };
        let watch = LinkWatch {
            controller: &mut self.controller,
            role: Role::Station,
        };
        Ok((socket, watch))
    }

    /// Borrow the access-point-side socket and the link watcher
    pub fn split_access_point(
        &mut self,
    ) -> Result<
        (
            NodeSocket<'_, WifiDevice<'d, WifiApDevice>>,
            LinkWatch<'_, 'd>,
        ),
        NetError,
    > {
        let (udp, tcp) = match (self.udp_handle, self.tcp_handle) {
            (Some(u), Some(t)) => (u, t),
            _ => return Err(NetError::SocketFailed),
        };
        let socket = NodeSocket {
            iface: &mut self.ap_iface,
            device: &mut self.ap_device,
            sockets: &mut self.sockets,
            udp,
            tcp,
            tcp_port: self.tcp_port,
            clock: self.clock,
        };
        let watch = LinkWatch {
            controller: &mut self.controller,
            role: Role::AccessPoint,
        };
        Ok((socket, watch))
    }

    fn ensure_started(&mut self) -> Result<(), NetError> {
        if !self.controller.is_started().unwrap_or(false) {
            self.controller
                .start()
                .map_err(|_| NetError::ConfigFailed)?;
        }
        Ok(())
    }
}

impl NetworkPlatform for WifiPlatform<'_> {
    fn mac_address(&self) -> [u8; 6] {
        match self.sta_iface.hardware_addr() {
            HardwareAddress::Ethernet(mac) => mac.0,
        }
    }

    fn scan_for(&mut self, ssid: &str) -> Result<bool, NetError> {
        if !self.controller.is_started().unwrap_or(false) {
            // A configuration must exist before the radio starts
            let blank = Configuration::Client(ClientConfiguration::default());
            self.controller
                .set_configuration(&blank)
                .map_err(|_| NetError::ConfigFailed)?;
            self.ensure_started()?;
        }

        let (found, _total) = self
            .controller
            .scan_n::<SCAN_LIMIT>()
            .map_err(|_| NetError::ScanFailed)?;
        Ok(found.iter().any(|ap| ap.ssid.as_str() == ssid))
    }

    fn join(&mut self, ssid: &str, password: &str, addr: &StaticAddr) -> Result<(), NetError> {
        let client = ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| NetError::ConfigFailed)?,
            password: password.try_into().map_err(|_| NetError::ConfigFailed)?,
            ..Default::default()
        };
        self.controller
            .set_configuration(&Configuration::Client(client))
            .map_err(|_| NetError::ConfigFailed)?;
        self.ensure_started()?;
        self.controller.connect().map_err(|_| NetError::JoinFailed)?;

        let deadline = self.clock.now_ms() + JOIN_TIMEOUT_MS;
        loop {
            match self.controller.is_connected() {
                Ok(true) => break,
                Ok(false) if self.clock.now_ms() < deadline => {
                    self.delay.delay_ms(JOIN_POLL_MS);
                }
                _ => return Err(NetError::JoinFailed),
            }
        }

        configure_addr(&mut self.sta_iface, addr);
        Ok(())
    }

    fn create(
        &mut self,
        ssid: &str,
        password: &str,
        channel: u8,
        max_stations: u8,
        addr: &StaticAddr,
    ) -> Result<(), NetError> {
        let ap = AccessPointConfiguration {
            ssid: ssid.try_into().map_err(|_| NetError::ConfigFailed)?,
            password: password.try_into().map_err(|_| NetError::ConfigFailed)?,
            channel,
            auth_method: AuthMethod::WPA2Personal,
            max_connections: max_stations as u16,
            ..Default::default()
        };
        self.controller
            .set_configuration(&Configuration::AccessPoint(ap))
            .map_err(|_| NetError::CreateFailed)?;
        self.ensure_started()?;

        // No DHCP server: every station derives its own address, and this
        // node binds the gateway-side one
        configure_addr(&mut self.ap_iface, addr);
        Ok(())
    }

    fn open_ports(&mut self, udp_port: u16, tcp_port: u16) -> Result<(), NetError> {
        self.tcp_port = tcp_port;

        let udp_handle = match self.udp_handle {
            Some(handle) => handle,
            None => {
                let rx = udp::PacketBuffer::new(
                    &mut UDP_RX_META.init([udp::PacketMetadata::EMPTY; 8])[..],
                    &mut UDP_RX_DATA.init([0; 1024])[..],
                );
                let tx = udp::PacketBuffer::new(
                    &mut UDP_TX_META.init([udp::PacketMetadata::EMPTY; 8])[..],
                    &mut UDP_TX_DATA.init([0; 1024])[..],
                );
                let handle = self.sockets.add(udp::Socket::new(rx, tx));
                self.udp_handle = Some(handle);
                handle
            }
        };
        let socket = self.sockets.get_mut::<udp::Socket>(udp_handle);
        if socket.is_open() {
            socket.close();
        }
        socket.bind(udp_port).map_err(|_| NetError::SocketFailed)?;

        let tcp_handle = match self.tcp_handle {
            Some(handle) => handle,
            None => {
                let rx = tcp::SocketBuffer::new(&mut TCP_RX_DATA.init([0; 512])[..]);
                let tx = tcp::SocketBuffer::new(&mut TCP_TX_DATA.init([0; 512])[..]);
                let handle = self.sockets.add(tcp::Socket::new(rx, tx));
                self.tcp_handle = Some(handle);
                handle
            }
        };
        let socket = self.sockets.get_mut::<tcp::Socket>(tcp_handle);
        socket.abort();
        socket.listen(tcp_port).map_err(|_| NetError::SocketFailed)?;

        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.udp_handle {
            self.sockets.get_mut::<udp::Socket>(handle).close();
        }
        if let Some(handle) = self.tcp_handle {
            self.sockets.get_mut::<tcp::Socket>(handle).abort();
        }
        if self.controller.stop().is_err() {
            warn!("wifi stop failed; retrying formation anyway");
        }
    }
}

/// Polls the established link and raises [`LINK`] events on loss
pub struct LinkWatch<'a, 'd> {
    controller: &'a mut WifiController<'d>,
    role: Role,
}

impl LinkWatch<'_, '_> {
    /// True while the role's link still stands. An access point has no
    /// upstream link to lose.
    pub fn link_is_up(&mut self) -> bool {
        match self.role {
            Role::AccessPoint => true,
            Role::Station => {
                let up = self.controller.is_connected().unwrap_or(false);
                if !up {
                    LINK.down.raise();
                }
                up
            }
        }
    }
}

/// One role's interface bound to the shared socket set
pub struct NodeSocket<'a, D: Device> {
    iface: &'a mut Interface,
    device: &'a mut D,
    sockets: &'a mut SocketSet<'static>,
    udp: SocketHandle,
    tcp: SocketHandle,
    tcp_port: u16,
    clock: Uptime,
}

impl<D: Device> NodeSocket<'_, D> {
    fn pump(&mut self) {
        let now = Instant::from_millis(self.clock.now_ms() as i64);
        self.iface.poll(now, &mut *self.device, self.sockets);

        // The TCP port is accepted but unhandled; re-arm the listener
        // whenever a peer's connection has run its course
        let tcp = self.sockets.get_mut::<tcp::Socket>(self.tcp);
        if !tcp.is_open() {
            let _ = tcp.listen(self.tcp_port);
        }
    }
}

impl<D: Device> Datagrams for NodeSocket<'_, D> {
    fn try_recv(&mut self, buf: &mut [u8]) -> Option<(Peer, usize)> {
        self.pump();
        let socket = self.sockets.get_mut::<udp::Socket>(self.udp);
        match socket.recv() {
            Ok((payload, meta)) => {
                let len = payload.len().min(buf.len());
                buf[..len].copy_from_slice(&payload[..len]);
                Some((peer_of(meta.endpoint), len))
            }
            Err(_) => None,
        }
    }

    fn send(&mut self, peer: Peer, payload: &[u8]) -> Result<(), SendError> {
        let endpoint = IpEndpoint::new(
            IpAddress::Ipv4(Ipv4Address::new(
                peer.ip[0], peer.ip[1], peer.ip[2], peer.ip[3],
            )),
            peer.port,
        );
        self.sockets
            .get_mut::<udp::Socket>(self.udp)
            .send_slice(payload, endpoint)
            .map_err(|_| SendError)?;
        self.pump();
        Ok(())
    }
}

fn peer_of(endpoint: IpEndpoint) -> Peer {
    let IpAddress::Ipv4(v4) = endpoint.addr;
    Peer {
        ip: v4.octets(),
        port: endpoint.port,
    }
}

fn configure_addr(iface: &mut Interface, addr: &StaticAddr) {
    let prefix = netmask_prefix(addr.netmask);
    iface.update_ip_addrs(|addrs| {
        addrs.clear();
        let _ = addrs.push(IpCidr::Ipv4(Ipv4Cidr::new(ipv4(addr.addr), prefix)));
    });
    let _ = iface.routes_mut().add_default_ipv4_route(ipv4(addr.gateway));
}

fn ipv4(addr: NodeAddr) -> Ipv4Address {
    let [a, b, c, d] = addr.octets();
    Ipv4Address::new(a, b, c, d)
}

fn netmask_prefix(mask: NodeAddr) -> u8 {
    u32::from_be_bytes(mask.octets()).count_ones() as u8
}
