//! Network reachability checks run before any API traffic.

use crate::core::domain::model::{proxy_config::ProxyConfig, reboot_config::RebootConfig};
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{debug, info, warn};

const PING_TIMEOUT: Duration = Duration::from_secs(5);
const PORT_TIMEOUT: Duration = Duration::from_secs(1);

/// Sends one ICMP echo through the system `ping` utility.
///
/// Any failure, including a missing `ping` binary, counts as unreachable.
pub async fn is_host_reachable(hostname: &str) -> bool {
    let mut command = Command::new("ping");
    if cfg!(windows) {
        command.args(["-n", "1", hostname]);
    } else {
        command.args(["-c", "1", hostname]);
    }
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(PING_TIMEOUT, command.status()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => {
            debug!(host = hostname, error = %e, "ping could not be run");
            false
        }
        Err(_) => {
            debug!(host = hostname, "ping timed out");
            false
        }
    }
}

/// Returns true if a TCP connection to `host:port` is accepted within a second.
pub async fn is_port_listening(host: &str, port: u16) -> bool {
    match tokio::time::timeout(PORT_TIMEOUT, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "port not listening");
            false
        }
        Err(_) => false,
    }
}

/// Decides once whether the API is reached directly or through the SOCKS tunnel.
pub async fn resolve_proxy(config: &RebootConfig) -> ProxyConfig {
    if is_host_reachable(config.probe_host()).await {
        info!(host = config.probe_host(), "control network reachable, connecting directly");
        ProxyConfig::Direct
    } else {
        let proxy = ProxyConfig::Socks5 {
            host: config.proxy_host().to_string(),
            port: config.proxy_port(),
        };
        warn!(host = config.probe_host(), proxy = %proxy, "control network not reachable, routing through tunnel");
        proxy
    }
}
