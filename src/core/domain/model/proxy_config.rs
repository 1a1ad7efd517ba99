/// How the gateway client reaches the management API.
///
/// Decided once at startup by the reachability prober and never changed
/// for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyConfig {
    /// The control network is directly reachable.
    Direct,
    /// Route through a local SOCKS5 tunnel, resolving names on the proxy side.
    Socks5 { host: String, port: u16 },
}

impl ProxyConfig {
    /// The proxy URL handed to the HTTP client, if any.
    pub fn proxy_url(&self) -> Option<String> {
        match self {
            ProxyConfig::Direct => None,
            ProxyConfig::Socks5 { host, port } => Some(format!("socks5h://{}:{}", host, port)),
        }
    }

    /// The tunnel endpoint that must be listening for requests to work.
    pub fn tunnel(&self) -> Option<(&str, u16)> {
        match self {
            ProxyConfig::Direct => None,
            ProxyConfig::Socks5 { host, port } => Some((host.as_str(), *port)),
        }
    }
}

impl std::fmt::Display for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.proxy_url() {
            Some(url) => f.write_str(&url),
            None => f.write_str("direct"),
        }
    }
}
