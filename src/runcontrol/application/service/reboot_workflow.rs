//! The power-cycle sequence: toggle off, restart services, toggle back on.

use crate::core::{
    domain::{
        error::{RebootError, RebootResult},
        model::{
            application::ApplicationStates, power_direction::PowerDirection,
            reboot_config::RebootConfig, run_summary::RunSummary,
        },
    },
    infrastructure::{
        api_client::ApiClient, audit_store::AuditStore, interrupt::until_ctrl_c,
        remote_shell::RemoteExecutor, terminal_prompt::CredentialSource,
    },
};
use crate::runcontrol::application::service::{
    restart_service::RestartService, state_resolver::StateResolver, toggle_service::ToggleService,
};
use tracing::{error, info};

/// Where the applications to toggle come from.
#[derive(Debug, Clone, PartialEq)]
pub enum AppSelection {
    /// Resolve live from the management API.
    Live,
    /// Use an operator-supplied mapping as is.
    Supplied(ApplicationStates),
}

/// Drives one reboot run against the configured components.
pub struct RebootWorkflow<'a> {
    config: &'a RebootConfig,
    client: &'a ApiClient,
    audit: AuditStore,
    executor: &'a dyn RemoteExecutor,
    credentials: &'a dyn CredentialSource,
}

impl<'a> RebootWorkflow<'a> {
    pub fn new(
        config: &'a RebootConfig,
        client: &'a ApiClient,
        executor: &'a dyn RemoteExecutor,
        credentials: &'a dyn CredentialSource,
    ) -> Self {
        Self {
            config,
            client,
            audit: AuditStore::new(config.output_dir()),
            executor,
            credentials,
        }
    }

    fn resolver(&self) -> StateResolver<'_> {
        StateResolver::new(self.client, &self.audit, self.config.registry())
    }

    /// Applications a toggle in `direction` should act on.
    ///
    /// A supplied mapping bypasses live resolution entirely.
    pub async fn select(
        &self,
        direction: PowerDirection,
        selection: &AppSelection,
    ) -> RebootResult<ApplicationStates> {
        match selection {
            AppSelection::Supplied(states) => Ok(states.clone()),
            AppSelection::Live => self.resolver().get_apps(direction.source_state()).await,
        }
    }

    /// Sends the toggle for every given application.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that stopped the walk (see [`ToggleService::execute`]).
    pub async fn toggle(
        &self,
        applications: &ApplicationStates,
        direction: PowerDirection,
    ) -> RebootResult<RunSummary> {
        if applications.is_empty() {
            info!("No applications to turn {}", direction);
            return Ok(RunSummary::default());
        }
        info!(count = applications.len(), "Turning applications {}", direction);
        ToggleService::new(self.client).execute(applications, direction).await
    }

    /// Turns off every application currently ON (or the supplied ones).
    pub async fn turn_off(&self, selection: &AppSelection) -> RebootResult<RunSummary> {
        let applications = self.select(PowerDirection::Off, selection).await?;
        self.toggle(&applications, PowerDirection::Off).await
    }

    /// Turns on every application currently OFF (or the supplied ones).
    pub async fn turn_on(&self, selection: &AppSelection) -> RebootResult<RunSummary> {
        let applications = self.select(PowerDirection::On, selection).await?;
        self.toggle(&applications, PowerDirection::On).await
    }

    /// Asks for credentials once, then restarts every configured service.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be obtained, including
    /// `RebootError::Cancelled` on Ctrl-C at the prompt. Individual restart
    /// failures are only counted in the summary.
    pub async fn restart_services(&self) -> RebootResult<RunSummary> {
        if self.config.services().is_empty() {
            info!("No services to restart");
            return Ok(RunSummary::default());
        }
        let credentials = until_ctrl_c("credential prompt", self.credentials.credentials()).await?;
        Ok(RestartService::new(self.executor, self.config.priority())
            .execute(self.config.services(), &credentials)
            .await)
    }

    /// Writes the state of every application to `runcontrol_apps.json` and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or the audit write fails, or
    /// `RebootError::Cancelled` on Ctrl-C.
    pub async fn show_apps(&self) -> RebootResult<ApplicationStates> {
        until_ctrl_c("application listing", self.resolver().snapshot_all()).await
    }

    /// Full sequence: off, settle, restart, settle, on.
    ///
    /// The ON phase targets exactly the applications selected for the OFF
    /// phase. Ctrl-C during a restart skips only that restart; anywhere else
    /// it ends the run.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error, `RebootError::Cancelled` on Ctrl-C
    /// outside a restart, and `RebootError::Aborted` when applications were
    /// selected but none of them could be turned off.
    pub async fn run(&self, selection: &AppSelection, restart: bool) -> RebootResult<RunSummary> {
        let mut summary = RunSummary::default();

        let applications = until_ctrl_c(
            "application selection",
            self.select(PowerDirection::Off, selection),
        )
        .await?;
        let off = until_ctrl_c("TurnOFF", self.toggle(&applications, PowerDirection::Off)).await?;
        if !applications.is_empty() && off.turned_off.succeeded == 0 {
            error!(failures = off.turned_off.failed, "No application could be turned off");
            return Err(RebootError::Aborted(format!(
                "none of {} applications could be turned off: {}",
                applications.len(),
                off.failures.join("; ")
            )));
        }
        summary.merge(off);

        if restart {
            self.settle().await?;
            summary.merge(self.restart_services().await?);
        }

        self.settle().await?;
        summary.merge(until_ctrl_c("TurnON", self.toggle(&applications, PowerDirection::On)).await?);

        info!(%summary, "Run finished");
        Ok(summary)
    }

    async fn settle(&self) -> RebootResult<()> {
        let delay = self.config.settle_delay();
        if delay.is_zero() {
            return Ok(());
        }
        info!(seconds = delay.as_secs(), "Waiting before next phase");
        until_ctrl_c("settle delay", async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }
}
