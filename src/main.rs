use clap::Parser;
use runcontrol_reboot::{
    AppSelection, ApplicationStates, RebootConfig, RebootError, RebootResult, RebootWorkflow,
    SshExecutor, TerminalPrompt, load_state_map,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Turns run control applications off, restarts their services, and turns them back on.
#[derive(Parser, Debug)]
#[command(name = "runcontrol-reboot", version, about)]
struct Args {
    /// Applications to toggle: inline JSON mapping or path to a JSON file
    #[arg(long)]
    apps: Option<String>,

    /// Services to restart: file with one unit@host per line, or a comma-separated list
    #[arg(long, env = "RUNCONTROL_SERVICES")]
    services: Option<String>,

    /// Write the state of every application to runcontrol_apps.json and exit
    #[arg(long)]
    show_apps: bool,

    /// Toggle off and back on without restarting services
    #[arg(long)]
    skip_restart: bool,

    /// Base URL of the run control management API
    #[arg(long, env = "RUNCONTROL_API_URL")]
    api_url: Option<String>,

    /// Application registry to operate on
    #[arg(long, env = "RUNCONTROL_REGISTRY")]
    registry: Option<String>,

    /// Local port of the SOCKS tunnel
    #[arg(long, env = "RUNCONTROL_PROXY_PORT")]
    proxy_port: Option<u16>,

    /// Host pinged to decide whether the tunnel is needed
    #[arg(long, env = "RUNCONTROL_PROBE_HOST")]
    probe_host: Option<String>,

    /// SSH jump host
    #[arg(long, env = "RUNCONTROL_JUMP_HOST")]
    jump_host: Option<String>,

    /// Host whose services restart after all others
    #[arg(long, env = "RUNCONTROL_PRIMARY_HOST")]
    primary_host: Option<String>,

    /// Host whose services restart last
    #[arg(long, env = "RUNCONTROL_SECONDARY_HOST")]
    secondary_host: Option<String>,

    /// Seconds to wait between phases
    #[arg(long, env = "RUNCONTROL_SETTLE_SECS")]
    settle_secs: Option<u64>,

    /// Directory for the JSON audit files
    #[arg(long, env = "RUNCONTROL_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// SSH username; asked interactively when absent
    #[arg(long, env = "RUNCONTROL_USERNAME")]
    username: Option<String>,

    /// Upper bound on management API requests per second
    #[arg(long, env = "RUNCONTROL_MAX_RPS")]
    max_rps: Option<u32>,
}

impl Args {
    fn config(&self) -> RebootResult<RebootConfig> {
        let mut builder = RebootConfig::builder();
        if let Some(url) = &self.api_url {
            builder = builder.api_url(url);
        }
        if let Some(registry) = &self.registry {
            builder = builder.registry(registry);
        }
        if let Some(port) = self.proxy_port {
            builder = builder.proxy("localhost", port);
        }
        if let Some(host) = &self.probe_host {
            builder = builder.probe_host(host);
        }
        if let Some(host) = &self.jump_host {
            builder = builder.jump_host(host);
        }
        if self.primary_host.is_some() || self.secondary_host.is_some() {
            let defaults = RebootConfig::builder().build()?;
            builder = builder.priority_hosts(
                self.primary_host
                    .clone()
                    .unwrap_or_else(|| defaults.priority().primary.clone()),
                self.secondary_host
                    .clone()
                    .unwrap_or_else(|| defaults.priority().secondary.clone()),
            );
        }
        if let Some(secs) = self.settle_secs {
            builder = builder.settle_delay(Duration::from_secs(secs));
        }
        if let Some(dir) = &self.output_dir {
            builder = builder.output_dir(dir);
        }
        if let Some(username) = &self.username {
            builder = builder.username(username);
        }
        if let Some(rps) = self.max_rps {
            builder = builder.rate_limit(rps, rps);
        }
        if let Some(services) = &self.services {
            builder = builder.services(parse_services(services)?);
        }
        builder.build()
    }
}

/// Reads service descriptors from a file when `raw` names one, otherwise
/// splits it on commas.
fn parse_services(raw: &str) -> RebootResult<Vec<String>> {
    let path = Path::new(raw);
    let text = if path.is_file() {
        std::fs::read_to_string(path)?
    } else {
        raw.replace(',', "\n")
    };
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

async fn selection(apps: Option<&str>) -> RebootResult<AppSelection> {
    let Some(raw) = apps else {
        return Ok(AppSelection::Live);
    };
    let path = Path::new(raw);
    let states = if path.is_file() {
        load_state_map(path).await?
    } else {
        ApplicationStates::from_json_str(raw)?
    };
    info!(count = states.len(), "Using supplied applications");
    Ok(AppSelection::Supplied(states))
}

async fn run(args: Args) -> RebootResult<bool> {
    let config = args.config()?;
    let client = runcontrol_reboot::connect(&config).await?;
    let executor = SshExecutor::new(config.ssh().clone());
    let prompt = TerminalPrompt::new(config.username().map(str::to_string));
    let workflow = RebootWorkflow::new(&config, &client, &executor, &prompt);

    if args.show_apps {
        let all = workflow.show_apps().await?;
        info!(count = all.len(), "Application states written");
        return Ok(true);
    }

    let selection = selection(args.apps.as_deref()).await?;
    let summary = workflow.run(&selection, !args.skip_restart).await?;
    for failure in &summary.failures {
        error!("{}", failure);
    }
    Ok(summary.is_success())
}

/// Time given to blocking work (an SSH session, a terminal prompt) after the run ends.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("runcontrol_reboot=info")),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start the async runtime");
            return ExitCode::from(2);
        }
    };

    let code = match runtime.block_on(run(Args::parse())) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e @ RebootError::TunnelMissing { .. }) => {
            error!("You are outside the control network and the SOCKS tunnel is not open: {}", e);
            ExitCode::from(2)
        }
        Err(RebootError::Cancelled(message)) => {
            error!("Run interrupted: {}", message);
            ExitCode::from(2)
        }
        Err(e) => {
            error!(error = %e, "Run aborted");
            ExitCode::from(2)
        }
    };
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const X: &str = "http://cmsrc-lumi.cms:26000/urn:rcms-fm:fullpath=/lumipro/dip/global/X,group=G,owner=lumipro";

    #[test]
    fn test_services_file_skips_blanks_and_comments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# restart order is computed").unwrap();
        writeln!(file, "  bril.central@srv-s2d16-18-01.service  ").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   # indented comment").unwrap();
        writeln!(file, "bril.central@srv-s2d16-27-01.service").unwrap();

        let services = parse_services(file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            services,
            vec![
                "bril.central@srv-s2d16-18-01.service",
                "bril.central@srv-s2d16-27-01.service",
            ]
        );
    }

    #[test]
    fn test_services_inline_comma_list() {
        let services =
            parse_services("a@srv-1.service, b@srv-2.service,,c@srv-3.service ").unwrap();
        assert_eq!(
            services,
            vec!["a@srv-1.service", "b@srv-2.service", "c@srv-3.service"]
        );
    }

    #[tokio::test]
    async fn test_no_apps_means_live_selection() {
        assert_eq!(selection(None).await.unwrap(), AppSelection::Live);
    }

    #[tokio::test]
    async fn test_apps_path_is_read_as_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"{}": "ON"}}"#, X).unwrap();

        match selection(file.path().to_str()).await.unwrap() {
            AppSelection::Supplied(states) => assert_eq!(states.get(X), Some("ON")),
            other => panic!("unexpected selection: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_apps_inline_json() {
        let raw = format!(r#"{{"{}": "OFF"}}"#, X);
        match selection(Some(&raw)).await.unwrap() {
            AppSelection::Supplied(states) => {
                assert_eq!(states.len(), 1);
                assert_eq!(states.get(X), Some("OFF"));
            }
            other => panic!("unexpected selection: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_apps_invalid_inline_json_is_rejected() {
        let result = selection(Some("not-a-file-nor-json")).await;
        assert!(matches!(result, Err(RebootError::Json(_))), "unexpected result: {:?}", result);
    }
}
