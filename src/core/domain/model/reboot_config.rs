//! Immutable run configuration.
//!
//! Built once from command-line and environment input, then passed by
//! reference into every component.

use crate::core::domain::{
    error::{RebootError, RebootResult, ValidationError},
    value_object::{ApiUrl, validate_api_url, validate_username},
};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://srv-s2d16-22-01.cms/runcontrol/api/";
pub const DEFAULT_REGISTRY: &str = "lumipro";
pub const DEFAULT_PROXY_HOST: &str = "localhost";
pub const DEFAULT_PROXY_PORT: u16 = 10880;
pub const DEFAULT_PROBE_HOST: &str = "srv-s2d16-18-01";
pub const DEFAULT_JUMP_HOST: &str = "cmsusr";
pub const DEFAULT_PRIMARY_HOST: &str = "srv-s2d16-18-01";
pub const DEFAULT_SECONDARY_HOST: &str = "srv-s2d16-27-02";
pub const DEFAULT_SERVICES: &[&str] = &[
    "bril.central@srv-s2d16-18-01.service",
    "bril.central@srv-s2d16-27-01.service",
];

/// Request pacing for toggle calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub requests_per_second: NonZeroU32,
    pub burst_size: NonZeroU32,
}

/// The designated hosts that are restarted last, primary before secondary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPriority {
    pub primary: String,
    pub secondary: String,
}

impl Default for HostPriority {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_HOST.to_string(),
            secondary: DEFAULT_SECONDARY_HOST.to_string(),
        }
    }
}

/// Remote shell access settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSettings {
    pub jump_host: String,
    pub port: u16,
    pub timeout: Duration,
}

/// Everything a run needs to know, frozen at startup.
#[derive(Debug, Clone)]
pub struct RebootConfig {
    api_url: ApiUrl,
    registry: String,
    proxy_host: String,
    proxy_port: u16,
    probe_host: String,
    ssh: SshSettings,
    priority: HostPriority,
    services: Vec<String>,
    settle_delay: Duration,
    output_dir: PathBuf,
    request_timeout: Duration,
    rate_limit: Option<RateLimitConfig>,
    username: Option<String>,
}

impl RebootConfig {
    /// Creates a new builder for RebootConfig
    pub fn builder() -> RebootConfigBuilder {
        RebootConfigBuilder::default()
    }

    pub fn api_url(&self) -> &ApiUrl {
        &self.api_url
    }

    /// Name of the registry listed by `running/<registry>`.
    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn proxy_host(&self) -> &str {
        &self.proxy_host
    }

    pub fn proxy_port(&self) -> u16 {
        self.proxy_port
    }

    /// Host pinged to decide between direct and tunnelled access.
    pub fn probe_host(&self) -> &str {
        &self.probe_host
    }

    pub fn ssh(&self) -> &SshSettings {
        &self.ssh
    }

    pub fn priority(&self) -> &HostPriority {
        &self.priority
    }

    /// Raw service descriptors, parsed when the restart phase runs.
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Fixed pause between the toggle and restart phases.
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Directory the audit JSON files are written to.
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn rate_limit(&self) -> Option<RateLimitConfig> {
        self.rate_limit
    }

    /// Username given up front, if any; otherwise it is prompted for.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

/// Builder for RebootConfig
#[derive(Debug, Default)]
pub struct RebootConfigBuilder {
    api_url: Option<String>,
    registry: Option<String>,
    proxy_host: Option<String>,
    proxy_port: Option<u16>,
    probe_host: Option<String>,
    jump_host: Option<String>,
    ssh_port: Option<u16>,
    ssh_timeout: Option<Duration>,
    primary_host: Option<String>,
    secondary_host: Option<String>,
    services: Option<Vec<String>>,
    settle_delay: Option<Duration>,
    output_dir: Option<PathBuf>,
    request_timeout: Option<Duration>,
    rate_limit: Option<(u32, u32)>,
    username: Option<String>,
}

impl RebootConfigBuilder {
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    pub fn proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy_host = Some(host.into());
        self.proxy_port = Some(port);
        self
    }

    pub fn probe_host(mut self, host: impl Into<String>) -> Self {
        self.probe_host = Some(host.into());
        self
    }

    pub fn jump_host(mut self, host: impl Into<String>) -> Self {
        self.jump_host = Some(host.into());
        self
    }

    pub fn ssh_port(mut self, port: u16) -> Self {
        self.ssh_port = Some(port);
        self
    }

    pub fn ssh_timeout(mut self, timeout: Duration) -> Self {
        self.ssh_timeout = Some(timeout);
        self
    }

    pub fn priority_hosts(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.primary_host = Some(primary.into());
        self.secondary_host = Some(secondary.into());
        self
    }

    pub fn services(mut self, services: Vec<String>) -> Self {
        self.services = Some(services);
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn rate_limit(mut self, requests_per_second: u32, burst_size: u32) -> Self {
        self.rate_limit = Some((requests_per_second, burst_size));
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn build(self) -> RebootResult<RebootConfig> {
        let raw_url = self.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        validate_api_url(&raw_url)?;
        let api_url = ApiUrl::new(&raw_url)?;

        let registry = non_empty("registry", self.registry, DEFAULT_REGISTRY)?;
        let proxy_host = non_empty("proxy_host", self.proxy_host, DEFAULT_PROXY_HOST)?;
        let probe_host = non_empty("probe_host", self.probe_host, DEFAULT_PROBE_HOST)?;
        let jump_host = non_empty("jump_host", self.jump_host, DEFAULT_JUMP_HOST)?;
        let primary = non_empty("primary_host", self.primary_host, DEFAULT_PRIMARY_HOST)?;
        let secondary = non_empty("secondary_host", self.secondary_host, DEFAULT_SECONDARY_HOST)?;

        if primary == secondary {
            return Err(ValidationError::ConstraintViolation(
                "Primary and secondary hosts must differ".to_string(),
            )
            .into());
        }

        let proxy_port = nonzero_port("proxy_port", self.proxy_port.unwrap_or(DEFAULT_PROXY_PORT))?;
        let ssh_port = nonzero_port("ssh_port", self.ssh_port.unwrap_or(22))?;

        let rate_limit = match self.rate_limit {
            None => None,
            Some((rps, burst)) => Some(RateLimitConfig {
                requests_per_second: NonZeroU32::new(rps).ok_or_else(|| {
                    RebootError::Configuration("Rate limit must be at least 1 request/s".to_string())
                })?,
                burst_size: NonZeroU32::new(burst).ok_or_else(|| {
                    RebootError::Configuration("Burst size must be at least 1".to_string())
                })?,
            }),
        };

        if let Some(username) = self.username.as_deref() {
            validate_username(username)?;
        }

        let services = self.services.unwrap_or_else(|| {
            DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect()
        });

        Ok(RebootConfig {
            api_url,
            registry,
            proxy_host,
            proxy_port,
            probe_host,
            ssh: SshSettings {
                jump_host,
                port: ssh_port,
                timeout: self.ssh_timeout.unwrap_or(Duration::from_secs(60)),
            },
            priority: HostPriority { primary, secondary },
            services,
            settle_delay: self.settle_delay.unwrap_or(Duration::from_secs(10)),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from(".")),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(30)),
            rate_limit,
            username: self.username,
        })
    }
}

fn non_empty(field: &str, value: Option<String>, default: &str) -> Result<String, ValidationError> {
    let value = value.unwrap_or_else(|| default.to_string());
    if value.trim().is_empty() {
        return Err(ValidationError::Field {
            field: field.to_string(),
            message: "Value cannot be empty".to_string(),
        });
    }
    Ok(value.trim().to_string())
}

fn nonzero_port(field: &str, port: u16) -> Result<u16, ValidationError> {
    if port == 0 {
        return Err(ValidationError::Field {
            field: field.to_string(),
            message: "Port cannot be 0".to_string(),
        });
    }
    Ok(port)
}
