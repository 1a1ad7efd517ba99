//! Remote service restarts over SSH, through a jump host.
//!
//! A restart walks a fixed sequence of stages:
//! `Connect → JumpAuth → TargetAuth → SudoAuth → AwaitEof → Done`.
//! The jump session opens a `direct-tcpip` channel to the target, which is
//! bridged onto a loopback socket so a second session can run over it.

use crate::core::domain::{
    error::{RebootError, RebootResult},
    model::reboot_config::SshSettings,
    value_object::{Credentials, ServiceDescriptor},
};
use async_trait::async_trait;
use ssh2::{Channel, KeyboardInteractivePrompt, Prompt, Session};
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stages of one remote restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartStage {
    Connect,
    JumpAuth,
    TargetAuth,
    SudoAuth,
    AwaitEof,
    Done,
}

impl std::fmt::Display for RestartStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RestartStage::Connect => "connect",
            RestartStage::JumpAuth => "jump host authentication",
            RestartStage::TargetAuth => "target host authentication",
            RestartStage::SudoAuth => "sudo authentication",
            RestartStage::AwaitEof => "awaiting command completion",
            RestartStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Captured result of a remote restart command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartOutput {
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RestartOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_status == 0
    }
}

/// Runs the privileged restart of one service on its host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn restart(
        &self,
        credentials: &Credentials,
        service: &ServiceDescriptor,
    ) -> RebootResult<RestartOutput>;
}

/// [`RemoteExecutor`] backed by libssh2.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    settings: SshSettings,
}

impl SshExecutor {
    pub fn new(settings: SshSettings) -> Self {
        Self { settings }
    }

    /// The command run on the target host. The password is read from stdin.
    pub fn restart_command(service: &ServiceDescriptor) -> String {
        format!("sudo -S -p '' systemctl restart {}", service.as_str())
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn restart(
        &self,
        credentials: &Credentials,
        service: &ServiceDescriptor,
    ) -> RebootResult<RestartOutput> {
        let settings = self.settings.clone();
        let credentials = credentials.clone();
        let target = service.clone();

        tokio::task::spawn_blocking(move || restart_blocking(&settings, &credentials, &target))
            .await
            .map_err(|e| RebootError::RemoteShell {
                service: service.to_string(),
                stage: RestartStage::Connect.to_string(),
                message: format!("restart task failed: {}", e),
            })?
    }
}

struct PasswordPrompter<'a>(&'a str);

impl KeyboardInteractivePrompt for PasswordPrompter<'_> {
    fn prompt<'b>(&mut self, _username: &str, _instructions: &str, prompts: &[Prompt<'b>]) -> Vec<String> {
        prompts.iter().map(|_| self.0.to_string()).collect()
    }
}

fn restart_blocking(
    settings: &SshSettings,
    credentials: &Credentials,
    service: &ServiceDescriptor,
) -> RebootResult<RestartOutput> {
    let fail = |stage: RestartStage, message: String| RebootError::RemoteShell {
        service: service.to_string(),
        stage: stage.to_string(),
        message,
    };
    let timeout_ms = u32::try_from(settings.timeout.as_millis()).unwrap_or(u32::MAX);

    info!(jump = %settings.jump_host, host = service.host(), %service, "Restarting service");

    let tcp = connect_tcp(&settings.jump_host, settings.port, settings.timeout)
        .map_err(|e| fail(RestartStage::Connect, format!("{}: {}", settings.jump_host, e)))?;
    let jump = open_session(tcp, timeout_ms).map_err(|e| fail(RestartStage::Connect, e))?;
    authenticate(&jump, credentials).map_err(|e| fail(RestartStage::JumpAuth, e))?;
    debug!(jump = %settings.jump_host, "Authenticated on jump host");

    let channel = jump
        .channel_direct_tcpip(service.host(), settings.port, None)
        .map_err(|e| fail(RestartStage::TargetAuth, format!("tunnel to {}: {}", service.host(), e)))?;
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| fail(RestartStage::TargetAuth, format!("loopback bridge: {}", e)))?;
    let bridge_addr = listener
        .local_addr()
        .map_err(|e| fail(RestartStage::TargetAuth, format!("loopback bridge: {}", e)))?;
    let bridge = thread::spawn(move || pump(jump, channel, listener));

    let result = run_on_target(bridge_addr, timeout_ms, credentials, service, &fail);
    if result.is_err() {
        // Releases the bridge if the target session never connected to it.
        let _ = TcpStream::connect(bridge_addr);
    }

    if let Ok(Err(e)) = bridge.join() {
        debug!(error = %e, "Jump host bridge closed with error");
    }
    result
}

fn run_on_target(
    bridge_addr: std::net::SocketAddr,
    timeout_ms: u32,
    credentials: &Credentials,
    service: &ServiceDescriptor,
    fail: &dyn Fn(RestartStage, String) -> RebootError,
) -> RebootResult<RestartOutput> {
    let tcp = TcpStream::connect(bridge_addr)
        .map_err(|e| fail(RestartStage::TargetAuth, format!("loopback bridge: {}", e)))?;
    let target = open_session(tcp, timeout_ms).map_err(|e| fail(RestartStage::TargetAuth, e))?;
    authenticate(&target, credentials).map_err(|e| fail(RestartStage::TargetAuth, e))?;
    debug!(host = service.host(), "Authenticated on target host");

    let mut channel = target
        .channel_session()
        .map_err(|e| fail(RestartStage::SudoAuth, e.to_string()))?;
    channel
        .exec(&SshExecutor::restart_command(service))
        .map_err(|e| fail(RestartStage::SudoAuth, e.to_string()))?;
    channel
        .write_all(format!("{}\n", credentials.password()).as_bytes())
        .and_then(|_| channel.flush())
        .map_err(|e| fail(RestartStage::SudoAuth, e.to_string()))?;
    channel
        .send_eof()
        .map_err(|e| fail(RestartStage::SudoAuth, e.to_string()))?;

    let mut stdout = String::new();
    channel
        .read_to_string(&mut stdout)
        .map_err(|e| fail(RestartStage::AwaitEof, e.to_string()))?;
    let mut stderr = String::new();
    channel
        .stderr()
        .read_to_string(&mut stderr)
        .map_err(|e| fail(RestartStage::AwaitEof, e.to_string()))?;
    channel
        .wait_close()
        .map_err(|e| fail(RestartStage::AwaitEof, e.to_string()))?;
    let exit_status = channel
        .exit_status()
        .map_err(|e| fail(RestartStage::AwaitEof, e.to_string()))?;

    debug!(%service, stage = %RestartStage::Done, exit_status, "Remote command finished");
    Ok(RestartOutput {
        exit_status,
        stdout,
        stderr,
    })
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = io::Error::new(io::ErrorKind::NotFound, "host did not resolve");
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                return Ok(stream);
            }
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

fn open_session(tcp: TcpStream, timeout_ms: u32) -> Result<Session, String> {
    let mut session = Session::new().map_err(|e| format!("failed to create SSH session: {}", e))?;
    session.set_timeout(timeout_ms);
    session.set_tcp_stream(tcp);
    session.handshake().map_err(|e| format!("handshake failed: {}", e))?;
    Ok(session)
}

/// Password authentication, falling back to keyboard-interactive.
fn authenticate(session: &Session, credentials: &Credentials) -> Result<(), String> {
    let username = credentials.username();
    let methods = session
        .auth_methods(username)
        .map_err(|e| format!("cannot list auth methods: {}", e))?
        .to_string();

    if methods.contains("password") {
        match session.userauth_password(username, credentials.password()) {
            Ok(()) if session.authenticated() => return Ok(()),
            Ok(()) => {}
            Err(e) => debug!(error = %e, "password authentication rejected"),
        }
    }

    if methods.contains("keyboard-interactive") {
        let mut prompter = PasswordPrompter(credentials.password());
        match session.userauth_keyboard_interactive(username, &mut prompter) {
            Ok(()) if session.authenticated() => return Ok(()),
            Ok(()) => {}
            Err(e) => debug!(error = %e, "keyboard-interactive authentication rejected"),
        }
    }

    if session.authenticated() {
        Ok(())
    } else {
        Err(format!("authentication failed for {} (offered: {})", username, methods))
    }
}

/// Copies bytes between the loopback socket and the jump host channel until either side closes.
fn pump(session: Session, mut channel: Channel, listener: TcpListener) -> io::Result<()> {
    let (mut socket, _) = listener.accept()?;
    socket.set_nonblocking(true)?;
    session.set_blocking(false);

    let mut buf = [0u8; 16 * 1024];
    loop {
        let mut progressed = false;

        match socket.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                write_all_retrying(&mut channel, &buf[..n])?;
                progressed = true;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e),
        }

        match channel.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                write_all_retrying(&mut socket, &buf[..n])?;
                progressed = true;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e),
        }

        if channel.eof() {
            break;
        }
        if !progressed {
            thread::sleep(Duration::from_millis(5));
        }
    }

    session.set_blocking(true);
    if let Err(e) = channel.close() {
        warn!(error = %e, "Failed to close jump host channel");
    }
    Ok(())
}

fn write_all_retrying<W: Write>(writer: &mut W, mut data: &[u8]) -> io::Result<()> {
    while !data.is_empty() {
        match writer.write(data) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => data = &data[n..],
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(Duration::from_millis(1)),
            Err(e) => return Err(e),
        }
    }
    writer.flush().or_else(|e| {
        if e.kind() == io::ErrorKind::WouldBlock {
            Ok(())
        } else {
            Err(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_command_reads_password_from_stdin() {
        let service = ServiceDescriptor::parse("bril.central@srv-s2d16-18-01.service").unwrap();
        assert_eq!(
            SshExecutor::restart_command(&service),
            "sudo -S -p '' systemctl restart bril.central@srv-s2d16-18-01.service"
        );
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(RestartStage::JumpAuth.to_string(), "jump host authentication");
        assert_eq!(RestartStage::AwaitEof.to_string(), "awaiting command completion");
    }

    #[test]
    fn test_exit_status_decides_success() {
        let output = RestartOutput {
            exit_status: 0,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(output.succeeded());
        assert!(
            !RestartOutput {
                exit_status: 5,
                ..output
            }
            .succeeded()
        );
    }

    #[tokio::test]
    async fn test_unreachable_jump_host_fails_in_connect_stage() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let executor = SshExecutor::new(SshSettings {
            jump_host: "127.0.0.1".to_string(),
            port,
            timeout: Duration::from_secs(2),
        });
        let credentials = Credentials::new("jdoe", "secret").unwrap();
        let service = ServiceDescriptor::parse("bril.central@srv-s2d16-18-01.service").unwrap();

        let result = executor.restart(&credentials, &service).await;
        match result {
            Err(RebootError::RemoteShell { stage, service, .. }) => {
                assert_eq!(stage, "connect");
                assert_eq!(service, "bril.central@srv-s2d16-18-01.service");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
