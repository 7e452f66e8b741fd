use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

pub const SSDP_MCAST_V4: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub const SSDP_PORT: u16 = 1900;

/// Create a UDP socket for receiving SSDP multicast on port 1900.
/// Binds to 239.255.255.250:1900 (Unix convention -- kernel-level multicast
/// filtering). Sets SO_REUSEADDR + SO_REUSEPORT so it can coexist with other
/// UPnP daemons, then joins the group on `iface_addr`.
pub fn build_recv_socket(iface_addr: Ipv4Addr) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    let bind_addr: SocketAddr = SocketAddrV4::new(SSDP_MCAST_V4, SSDP_PORT).into();
    socket.bind(&bind_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_udp: std::net::UdpSocket = socket.into();
    let tokio_udp = UdpSocket::from_std(std_udp)?;
    tokio_udp.join_multicast_v4(SSDP_MCAST_V4, iface_addr)?;
    Ok(tokio_udp)
}

/// Create a general-purpose send socket for NOTIFY bursts, M-SEARCH probes
/// and unicast search responses. Bound to 0.0.0.0:0 -- the OS picks the
/// source port; destinations come from the send_to caller.
pub fn build_send_socket() -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    let bind_addr: SocketAddr = "0.0.0.0:0".parse().unwrap();
    socket.bind(&bind_addr.into())?;
    let std_udp: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_udp)
}

/// An interface entry: IPv4 address + netmask.
#[derive(Debug, Clone)]
pub struct IfaceV4 {
    pub addr: Ipv4Addr,
    pub mask: Ipv4Addr,
}

/// Enumerate non-loopback IPv4 interfaces. Returns an empty Vec if
/// enumeration fails (SSDP is then disabled, HTTP still works).
pub fn list_non_loopback_v4() -> Vec<IfaceV4> {
    use getifaddrs::InterfaceFlags;
    use std::net::IpAddr;

    let Ok(ifaces) = getifaddrs::getifaddrs() else {
        return vec![];
    };
    ifaces
        .filter(|i| !i.flags.contains(InterfaceFlags::LOOPBACK))
        .filter_map(|i| match i.address {
            IpAddr::V4(addr) => Some(IfaceV4 {
                addr,
                mask: match i.netmask {
                    Some(IpAddr::V4(mask)) => mask,
                    _ => Ipv4Addr::new(255, 255, 255, 0),
                },
            }),
            _ => None,
        })
        .collect()
}

/// The address renderers should reach this server on: the first non-loopback
/// IPv4 interface, falling back to localhost.
pub fn local_ipv4() -> Ipv4Addr {
    list_non_loopback_v4()
        .first()
        .map(|i| i.addr)
        .unwrap_or(Ipv4Addr::LOCALHOST)
}
