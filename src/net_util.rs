//! Local address discovery.
//!
//! A viewer UI shows the machine's LAN addresses so the user can point the
//! phone-side producer at the right one. The probe uses a connected UDP
//! socket to learn which local interface routes outward; no packet is sent.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Best-effort list of local addresses a producer could connect to.
///
/// Falls back to the loopback address when no routable interface is found
/// (e.g. on an offline machine), so the result is never empty.
pub fn local_addresses() -> Vec<IpAddr> {
    let mut addrs = Vec::new();

    if let Ok(socket) = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)) {
        if socket.connect(("8.8.8.8", 80)).is_ok() {
            if let Ok(local) = socket.local_addr() {
                addrs.push(local.ip());
            }
        }
    }

    if addrs.is_empty() {
        addrs.push(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    addrs.sort();
    addrs.dedup();
    addrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_empty() {
        let addrs = local_addresses();
        assert!(!addrs.is_empty());
    }

    #[test]
    fn no_duplicates() {
        let addrs = local_addresses();
        let mut deduped = addrs.clone();
        deduped.dedup();
        assert_eq!(addrs, deduped);
    }
}
