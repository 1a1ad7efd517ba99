//! Power toggles for run control applications.

use crate::core::{
    domain::{
        error::RebootResult,
        model::{
            application::ApplicationStates, power_direction::PowerDirection,
            run_summary::RunSummary,
        },
        value_object::FullPath,
    },
    infrastructure::api_client::ApiClient,
};
use tracing::{error, info, warn};

/// Builds the toggle endpoint path for one identifier, e.g.
/// `send/TurnOFF/lumipro/dip/global/X`.
pub fn toggle_path(identifier: &str, direction: PowerDirection) -> RebootResult<String> {
    let full_path = FullPath::parse(identifier)?;
    Ok(format!("send/{}{}", direction.action(), full_path.path()))
}

/// Sends one toggle request per application, strictly in sequence.
///
/// Individual failures are recorded and the walk continues; only a fatal
/// error (missing tunnel) stops it.
pub struct ToggleService<'a> {
    client: &'a ApiClient,
}

impl<'a> ToggleService<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Toggles every application in `direction`, in identifier order.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error (`RebootError::TunnelMissing`) and sends
    /// nothing after it. Malformed identifiers and non-fatal request failures
    /// are counted in the summary instead.
    pub async fn execute(
        &self,
        applications: &ApplicationStates,
        direction: PowerDirection,
    ) -> RebootResult<RunSummary> {
        let mut summary = RunSummary::default();

        for identifier in applications.identifiers() {
            let path = match toggle_path(identifier, direction) {
                Ok(path) => path,
                Err(e) => {
                    warn!(identifier, error = %e, "Skipping malformed identifier");
                    summary.record_toggle(direction, Err(format!("{}: {}", identifier, e)));
                    continue;
                }
            };

            match self.client.get(&path).await {
                Ok(_) => {
                    info!(identifier, "Turned {} successfully", direction);
                    summary.record_toggle(direction, Ok(()));
                }
                Err(e) if e.is_fatal() => {
                    error!(identifier, error = %e, "Aborting toggles");
                    return Err(e);
                }
                Err(e) => {
                    warn!(identifier, error = %e, "Toggle failed");
                    summary.record_toggle(direction, Err(format!("{}: {}", identifier, e)));
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{
        error::RebootError, model::proxy_config::ProxyConfig, value_object::ApiUrl,
    };
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, path_regex},
    };

    const X: &str = "http://cmsrc-lumi.cms:26000/urn:rcms-fm:fullpath=/lumipro/dip/global/X,group=G,owner=lumipro";
    const Y: &str = "http://cmsrc-lumi.cms:26000/urn:rcms-fm:fullpath=/lumipro/central/global/Y,group=BrilDAQFunctionManager,owner=lumipro";

    fn create_test_client(server_url: &str) -> ApiClient {
        let base_url = ApiUrl::new_unchecked(&format!("{}/runcontrol/api/", server_url));
        ApiClient::new(base_url, ProxyConfig::Direct, Duration::from_secs(5), None).unwrap()
    }

    fn apps(ids: &[&str]) -> ApplicationStates {
        ids.iter()
            .map(|id| (id.to_string(), "ON".to_string()))
            .collect()
    }

    #[test]
    fn test_toggle_path_uses_fullpath_segment() {
        assert_eq!(
            toggle_path(X, PowerDirection::Off).unwrap(),
            "send/TurnOFF/lumipro/dip/global/X"
        );
        assert_eq!(
            toggle_path(Y, PowerDirection::On).unwrap(),
            "send/TurnON/lumipro/central/global/Y"
        );
        assert!(toggle_path("no-fullpath-here", PowerDirection::On).is_err());
    }

    #[test]
    fn test_toggle_url_suffix() {
        let base = ApiUrl::new("http://srv-s2d16-22-01.cms/runcontrol/api/").unwrap();
        let url = base.endpoint(&toggle_path(X, PowerDirection::Off).unwrap());
        assert!(url.ends_with("/send/TurnOFF/lumipro/dip/global/X"));
    }

    #[tokio::test]
    async fn test_execute_sends_one_request_per_app() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/runcontrol/api/send/TurnOFF/lumipro/.+$"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/runcontrol/api/send/TurnON/.*$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let summary = ToggleService::new(&client)
            .execute(&apps(&[X, Y]), PowerDirection::Off)
            .await
            .unwrap();

        assert_eq!(summary.turned_off.succeeded, 2);
        assert!(summary.is_success());
    }

    #[tokio::test]
    async fn test_failures_are_counted_and_walk_continues() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/runcontrol/api/send/TurnON/lumipro/dip/global/X"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/runcontrol/api/send/TurnON/lumipro/central/global/Y"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let summary = ToggleService::new(&client)
            .execute(&apps(&[X, Y, "malformed"]), PowerDirection::On)
            .await
            .unwrap();

        assert_eq!(summary.turned_on.succeeded, 1);
        assert_eq!(summary.turned_on.failed, 2);
        assert_eq!(summary.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_tunnel_aborts_walk() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let tunnel_port = listener.local_addr().unwrap().port();
        drop(listener);

        let base_url = ApiUrl::new_unchecked("http://srv-s2d16-22-01.cms/runcontrol/api/");
        let proxy = ProxyConfig::Socks5 {
            host: "127.0.0.1".to_string(),
            port: tunnel_port,
        };
        let client = ApiClient::new(base_url, proxy, Duration::from_secs(5), None).unwrap();

        let result = ToggleService::new(&client)
            .execute(&apps(&[X, Y]), PowerDirection::Off)
            .await;
        assert!(matches!(result, Err(RebootError::TunnelMissing { .. })));
    }
}
