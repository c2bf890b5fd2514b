//! Service configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::MAX_FRAME_LEN;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 5000;

/// Configuration for a [`VideoServer`](crate::VideoServer).
///
/// The defaults match the reference deployment: listen on all interfaces,
/// port 5000, drop producers that go silent for five seconds, and cap frames
/// at 5 MiB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind the listener to.
    pub host: IpAddr,

    /// Port to listen on. Port 0 asks the OS for an ephemeral port, which the
    /// bound address reported by the server reflects.
    pub port: u16,

    /// How long a read may sit without progress before the producer is
    /// considered dead and the connection dropped.
    pub read_timeout: Duration,

    /// Largest frame payload accepted from the wire.
    pub max_frame_len: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            read_timeout: Duration::from_secs(5),
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

impl ServerConfig {
    /// The socket address the listener binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = ServerConfig::default();
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.port, 5000);
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.max_frame_len, 5 * 1024 * 1024);
    }

    #[test]
    fn bind_addr_combines_host_and_port() {
        let config = ServerConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 6001,
            ..Default::default()
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:6001".parse::<SocketAddr>().unwrap());
    }
}
