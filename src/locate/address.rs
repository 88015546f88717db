use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// Well-known public address used only to let the kernel pick a route. Nothing is sent.
const ROUTE_PROBE_TARGET: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 80);

/// Best-effort LAN address of this host, falling back to loopback.
///
/// Connecting a UDP socket performs route selection without exchanging packets,
/// so the socket's local address is the interface other devices can reach.
pub fn lan_ip() -> IpAddr {
    probe_local_ip(ROUTE_PROBE_TARGET).unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn probe_local_ip(target: SocketAddr) -> Option<IpAddr> {
    let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(bind_addr).ok()?;
    socket.connect(target).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    if ip.is_unspecified() {
        return None;
    }
    Some(ip)
}

/// Loopback URL for `path` on `port`.
pub fn local_url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{port}{path}")
}

/// LAN URL for `path`, or `None` if the LAN address is loopback.
pub fn lan_url(ip: IpAddr, port: u16, path: &str) -> Option<String> {
    if ip.is_loopback() {
        return None;
    }
    Some(format!("http://{}{path}", SocketAddr::new(ip, port)))
}
