//! Live resolution of application states through the management API.

use crate::core::{
    domain::{
        error::{RebootError, RebootResult},
        model::application::{ApplicationRegistry, ApplicationStates},
    },
    infrastructure::{api_client::ApiClient, audit_store::AuditStore},
};
use tracing::info;

const STATES_ENDPOINT: &str = "states";

/// Resolves which applications are in a given state.
///
/// Every resolution is fresh: the registry is listed, its URIs are posted
/// to the states endpoint, and the result is filtered and written to the
/// audit directory.
pub struct StateResolver<'a> {
    client: &'a ApiClient,
    audit: &'a AuditStore,
    registry: &'a str,
}

impl<'a> StateResolver<'a> {
    pub fn new(client: &'a ApiClient, audit: &'a AuditStore, registry: &'a str) -> Self {
        Self {
            client,
            audit,
            registry,
        }
    }

    /// Lists the running application registry.
    ///
    /// # Errors
    ///
    /// Returns the gateway error, or `RebootError::Decode` if the body is not
    /// a registry mapping.
    pub async fn get_runcontrol_apps(&self) -> RebootResult<ApplicationRegistry> {
        let response = self.client.get(&format!("running/{}", self.registry)).await?;
        let registry: ApplicationRegistry = response.json()?;
        info!(registry = self.registry, count = registry.len(), "Fetched running applications");
        Ok(registry)
    }

    /// Fetches the current state of every registered application.
    ///
    /// # Errors
    ///
    /// Returns the first gateway or decode error of either request.
    pub async fn fetch_states(&self) -> RebootResult<ApplicationStates> {
        let registry = self.get_runcontrol_apps().await?;
        if registry.is_empty() {
            return Ok(ApplicationStates::default());
        }
        let response = self.client.post_uris(STATES_ENDPOINT, &registry).await?;
        response.json().map_err(|e| match e {
            RebootError::Decode(message) => {
                RebootError::Decode(format!("states endpoint: {}", message))
            }
            other => other,
        })
    }

    /// Returns the applications whose state equals `state` and records
    /// them in `<state>_apps.json`.
    ///
    /// # Errors
    ///
    /// Returns resolution errors as [`Self::fetch_states`] does, or
    /// `RebootError::Io` if the audit file cannot be written.
    pub async fn get_apps(&self, state: &str) -> RebootResult<ApplicationStates> {
        let filtered = self.fetch_states().await?.filter_by_state(state);
        info!(state, count = filtered.len(), "Resolved applications");
        self.audit.write_filtered(state, &filtered).await?;
        Ok(filtered)
    }

    /// Returns every application with its state, recorded in `runcontrol_apps.json`.
    pub async fn snapshot_all(&self) -> RebootResult<ApplicationStates> {
        let states = self.fetch_states().await?;
        self.audit.write_snapshot(&states).await?;
        Ok(states)
    }
}
