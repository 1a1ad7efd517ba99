//! Ordered, one-at-a-time restarts of remote services.

use crate::core::{
    domain::{
        error::{RebootError, RebootResult},
        model::{reboot_config::HostPriority, run_summary::RunSummary},
        value_object::{Credentials, ServiceDescriptor},
    },
    infrastructure::{
        interrupt::until_ctrl_c,
        remote_shell::{RemoteExecutor, RestartOutput},
    },
};
use tracing::{error, info, warn};

/// Orders services for restart: other hosts first, then the primary host,
/// then the secondary host. Relative order within each group is kept.
pub fn sort_services(
    services: Vec<ServiceDescriptor>,
    priority: &HostPriority,
) -> Vec<ServiceDescriptor> {
    let mut first = Vec::new();
    let mut second = Vec::new();
    let mut third = Vec::new();
    for service in services {
        if service.host() == priority.primary {
            second.push(service);
        } else if service.host() == priority.secondary {
            third.push(service);
        } else {
            first.push(service);
        }
    }
    first.extend(second);
    first.extend(third);
    first
}

/// Restarts services one at a time through a [`RemoteExecutor`].
///
/// A failed or interrupted restart is recorded and the next service is
/// attempted; the batch never stops early.
pub struct RestartService<'a> {
    executor: &'a dyn RemoteExecutor,
    priority: &'a HostPriority,
}

impl<'a> RestartService<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor, priority: &'a HostPriority) -> Self {
        Self { executor, priority }
    }

    /// Restarts every parsable service in priority order.
    ///
    /// Never fails as a whole: malformed descriptors, remote failures,
    /// non-zero exit statuses and Ctrl-C during one restart all end up as
    /// failures in the returned summary.
    pub async fn execute(&self, services: &[String], credentials: &Credentials) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut parsed = Vec::with_capacity(services.len());

        for raw in services {
            match ServiceDescriptor::parse(raw) {
                Ok(service) => parsed.push(service),
                Err(e) => {
                    warn!(service = %raw.trim(), error = %e, "Skipping malformed service");
                    summary.record_restart(Err(format!("{}: {}", raw.trim(), e)));
                }
            }
        }

        for service in sort_services(parsed, self.priority) {
            let outcome = until_ctrl_c(
                &format!("restart of {}", service),
                self.executor.restart(credentials, &service),
            )
            .await;
            summary.record_restart(report(&service, outcome));
        }

        summary
    }
}

fn report(service: &ServiceDescriptor, outcome: RebootResult<RestartOutput>) -> Result<(), String> {
    match outcome {
        Ok(output) => {
            if !output.stdout.trim().is_empty() {
                info!(%service, "{}", output.stdout.trim_end());
            }
            if !output.stderr.trim().is_empty() {
                warn!(%service, "{}", output.stderr.trim_end());
            }
            if output.succeeded() {
                info!(%service, "Service restarted");
                Ok(())
            } else {
                error!(%service, exit_status = output.exit_status, "Restart command failed");
                Err(format!("{}: exit status {}", service, output.exit_status))
            }
        }
        Err(RebootError::Cancelled(message)) => {
            warn!(%service, "Operation cancelled by user");
            Err(message)
        }
        Err(e) => {
            error!(%service, error = %e, "Restart failed");
            Err(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::infrastructure::remote_shell::MockRemoteExecutor;
    use mockall::Sequence;

    fn descriptors(raw: &[&str]) -> Vec<ServiceDescriptor> {
        raw.iter()
            .map(|s| ServiceDescriptor::parse(s).unwrap())
            .collect()
    }

    fn names(services: &[ServiceDescriptor]) -> Vec<&str> {
        services.iter().map(ServiceDescriptor::as_str).collect()
    }

    fn ok_output() -> RestartOutput {
        RestartOutput {
            exit_status: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    #[test]
    fn test_sort_is_stable_partition() {
        let priority = HostPriority::default();
        let sorted = sort_services(
            descriptors(&[
                "a@srv-s2d16-27-02.service",
                "b@srv-s2d16-18-01.service",
                "c@other-1.service",
                "d@srv-s2d16-27-02.service",
                "e@srv-s2d16-18-01.service",
                "f@other-2.service",
            ]),
            &priority,
        );

        assert_eq!(
            names(&sorted),
            vec![
                "c@other-1.service",
                "f@other-2.service",
                "b@srv-s2d16-18-01.service",
                "e@srv-s2d16-18-01.service",
                "a@srv-s2d16-27-02.service",
                "d@srv-s2d16-27-02.service",
            ]
        );
    }

    #[test]
    fn test_sort_keeps_default_services_order() {
        let sorted = sort_services(
            descriptors(&[
                "bril.central@srv-s2d16-18-01.service",
                "bril.central@srv-s2d16-27-01.service",
            ]),
            &HostPriority::default(),
        );
        // 27-01 is not a designated host, so it goes first.
        assert_eq!(
            names(&sorted),
            vec![
                "bril.central@srv-s2d16-27-01.service",
                "bril.central@srv-s2d16-18-01.service",
            ]
        );
    }

    #[tokio::test]
    async fn test_restarts_in_priority_order() {
        let mut executor = MockRemoteExecutor::new();
        let mut seq = Sequence::new();
        for expected in [
            "x@other.service",
            "y@srv-s2d16-18-01.service",
            "z@srv-s2d16-27-02.service",
        ] {
            executor
                .expect_restart()
                .withf(move |_, service| service.as_str() == expected)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(ok_output()));
        }

        let priority = HostPriority::default();
        let credentials = Credentials::new("jdoe", "secret").unwrap();
        let services = vec![
            "z@srv-s2d16-27-02.service".to_string(),
            "y@srv-s2d16-18-01.service".to_string(),
            "x@other.service".to_string(),
        ];

        let summary = RestartService::new(&executor, &priority)
            .execute(&services, &credentials)
            .await;
        assert_eq!(summary.restarts.succeeded, 3);
        assert!(summary.is_success());
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_batch() {
        let mut executor = MockRemoteExecutor::new();
        executor
            .expect_restart()
            .withf(|_, service| service.host() == "other")
            .times(1)
            .returning(|_, service| {
                Err(RebootError::RemoteShell {
                    service: service.to_string(),
                    stage: "jump host authentication".to_string(),
                    message: "denied".to_string(),
                })
            });
        executor
            .expect_restart()
            .withf(|_, service| service.host() == "srv-s2d16-18-01")
            .times(1)
            .returning(|_, _| {
                Ok(RestartOutput {
                    exit_status: 1,
                    stdout: String::new(),
                    stderr: "Job failed".to_string(),
                })
            });
        executor
            .expect_restart()
            .withf(|_, service| service.host() == "srv-s2d16-27-02")
            .times(1)
            .returning(|_, _| Ok(ok_output()));

        let priority = HostPriority::default();
        let credentials = Credentials::new("jdoe", "secret").unwrap();
        let services = vec![
            "a@other.service".to_string(),
            "b@srv-s2d16-18-01.service".to_string(),
            "c@srv-s2d16-27-02.service".to_string(),
            "no-host-here".to_string(),
        ];

        let summary = RestartService::new(&executor, &priority)
            .execute(&services, &credentials)
            .await;
        assert_eq!(summary.restarts.succeeded, 1);
        assert_eq!(summary.restarts.failed, 3);
        assert!(summary.failures.iter().any(|f| f.contains("exit status 1")));
        assert!(summary.failures.iter().any(|f| f.contains("no-host-here")));
    }

    #[test]
    fn test_cancelled_restart_is_a_failure() {
        let service = ServiceDescriptor::parse("bril.central@srv-s2d16-18-01.service").unwrap();
        let outcome = report(
            &service,
            Err(RebootError::Cancelled(
                "restart of bril.central@srv-s2d16-18-01.service cancelled by operator".to_string(),
            )),
        );
        assert_eq!(
            outcome,
            Err("restart of bril.central@srv-s2d16-18-01.service cancelled by operator".to_string())
        );
    }

    #[tokio::test]
    async fn test_cancelled_restart_does_not_stop_the_batch() {
        let mut executor = MockRemoteExecutor::new();
        executor
            .expect_restart()
            .withf(|_, service| service.host() == "other")
            .times(1)
            .returning(|_, service| {
                Err(RebootError::Cancelled(format!(
                    "restart of {} cancelled by operator",
                    service
                )))
            });
        executor
            .expect_restart()
            .withf(|_, service| service.host() == "srv-s2d16-18-01")
            .times(1)
            .returning(|_, _| Ok(ok_output()));

        let priority = HostPriority::default();
        let credentials = Credentials::new("jdoe", "secret").unwrap();
        let services = vec![
            "b@srv-s2d16-18-01.service".to_string(),
            "a@other.service".to_string(),
        ];

        let summary = RestartService::new(&executor, &priority)
            .execute(&services, &credentials)
            .await;
        assert_eq!(summary.restarts.succeeded, 1);
        assert_eq!(summary.restarts.failed, 1);
        assert!(summary.failures[0].contains("cancelled by operator"));
    }
}
