//! Power-cycles run control applications around a restart of their
//! backing systemd services.
//!
//! A run goes through three phases:
//! - turn OFF every application currently ON,
//! - restart the configured services over SSH, one host at a time,
//! - turn the same applications back ON.
//!
//! # Examples
//!
//! ```no_run
//! use runcontrol_reboot::{
//!     AppSelection, Credentials, RebootConfig, RebootResult, RebootWorkflow, SshExecutor,
//! };
//!
//! #[tokio::main]
//! async fn main() -> RebootResult<()> {
//!     let config = RebootConfig::builder().registry("lumipro").build()?;
//!     let client = runcontrol_reboot::connect(&config).await?;
//!     let executor = SshExecutor::new(config.ssh().clone());
//!     let credentials = Credentials::new("jdoe", "secret")?;
//!
//!     let workflow = RebootWorkflow::new(&config, &client, &executor, &credentials);
//!     let summary = workflow.run(&AppSelection::Live, true).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

mod core;
mod runcontrol;


pub use crate::core::domain::{
    error::{RebootError, RebootResult, ValidationError},
    model::{
        application::{ApplicationRecord, ApplicationRegistry, ApplicationStates},
        power_direction::PowerDirection,
        proxy_config::ProxyConfig,
        reboot_config::{
            HostPriority, RateLimitConfig, RebootConfig, RebootConfigBuilder, SshSettings,
        },
        run_summary::{PhaseTally, RunSummary},
    },
    value_object::{ApiUrl, Credentials, FullPath, ServiceDescriptor, get_host},
};
pub use crate::core::infrastructure::{
    api_client::{ApiClient, ApiResponse},
    audit_store::{AuditStore, load_state_map},
    reachability::{is_host_reachable, is_port_listening, resolve_proxy},
    remote_shell::{RemoteExecutor, RestartOutput, RestartStage, SshExecutor},
    terminal_prompt::{CredentialSource, TerminalPrompt},
};
pub use crate::runcontrol::application::service::{
    reboot_workflow::{AppSelection, RebootWorkflow},
    restart_service::{RestartService, sort_services},
    state_resolver::StateResolver,
    toggle_service::{ToggleService, toggle_path},
};

/// Probes the control network once and builds the API client with the
/// resulting proxy settings. Connection failures are checked against the
/// configured tunnel endpoint whichever route was chosen.
///
/// # Errors
///
/// Returns `RebootError::Configuration` if the HTTP client cannot be built.
pub async fn connect(config: &RebootConfig) -> RebootResult<ApiClient> {
    let proxy = resolve_proxy(config).await;
    Ok(ApiClient::new(
        config.api_url().clone(),
        proxy,
        config.request_timeout(),
        config.rate_limit(),
    )?
    .with_tunnel_check(config.proxy_host(), config.proxy_port()))
}
