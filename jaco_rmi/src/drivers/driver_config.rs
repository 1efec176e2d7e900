use serde::{Deserialize, Serialize};
use std::net::ToSocketAddrs;
use std::time::Duration;

/// ```rust,ignore
/// // Create a new configuration with a DNS name or IP address
/// let config = RobotClientConfig::new("127.0.0.1".to_string(), 9030, 2000);
///
/// // Validate the configuration
/// if let Err(e) = config.validate() {
///     println!("Configuration error: {}", e);
///     return;
/// }
///
/// // Every request/response round trip is bounded by `timeout()`
/// let client = RobotClient::connect(config).await?;
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RobotClientConfig {
    pub addr: String,
    pub port: u32,
    /// Upper bound for one request/response round trip, in milliseconds.
    pub timeout_ms: u64,
    /// Attempts made to open the TCP connection before giving up.
    pub connect_retries: u32,
}

impl RobotClientConfig {
    pub fn new(addr: String, port: u32, timeout_ms: u64) -> Self {
        Self {
            addr,
            port,
            timeout_ms,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.addr.is_empty() {
            return Err("Address cannot be empty.".to_string());
        }
        if self.port == 0 || self.port > u32::from(u16::MAX) {
            return Err("Port number must be between 1 and 65535.".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("Timeout must be greater than 0.".to_string());
        }
        if self.connect_retries == 0 {
            return Err("Connect retries must be greater than 0.".to_string());
        }
        Ok(())
    }

    /// Generates a connection URL from the address and port.
    pub fn connection_url(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Resolves the address to a `SocketAddr` if possible.
    ///
    /// Returns the resolved address as a `String`, or an error message if it cannot be resolved.
    pub fn resolve(&self) -> Result<String, String> {
        resolve_address(&self.addr, self.port)
    }
}

impl Default for RobotClientConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1".to_string(),
            port: 9030,
            timeout_ms: 2000,
            connect_retries: 3,
        }
    }
}

fn resolve_address(addr: &str, port: u32) -> Result<String, String> {
    let address_with_port = format!("{}:{}", addr, port);
    match address_with_port.to_socket_addrs() {
        Ok(mut iter) => match iter.next() {
            Some(socket_addr) => Ok(socket_addr.to_string()),
            None => Err("Could not resolve address".to_string()),
        },
        Err(_) => Err("Invalid address format".to_string()),
    }
}
