//! Interactive credential entry.

use crate::core::domain::{
    error::{RebootError, RebootResult},
    value_object::Credentials,
};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};

/// Supplies the operator credentials used for every remote restart.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credentials(&self) -> RebootResult<Credentials>;
}

/// Already known credentials.
#[async_trait]
impl CredentialSource for Credentials {
    async fn credentials(&self) -> RebootResult<Credentials> {
        Ok(self.clone())
    }
}

/// Asks on the terminal; the password is read without echo.
#[derive(Debug, Default)]
pub struct TerminalPrompt {
    username: Option<String>,
}

impl TerminalPrompt {
    /// Skips the username question when one is already known.
    pub fn new(username: Option<String>) -> Self {
        Self { username }
    }
}

#[async_trait]
impl CredentialSource for TerminalPrompt {
    async fn credentials(&self) -> RebootResult<Credentials> {
        let known = self.username.clone();
        run_blocking(move || {
            let username = match known {
                Some(username) => username,
                None => {
                    print!("Please enter your username: ");
                    io::stdout().flush()?;
                    read_username(&mut io::stdin().lock())?
                }
            };
            let password = rpassword::prompt_password("Enter your jump host password: ")?;
            Ok(Credentials::new(username, password)?)
        })
        .await
    }
}

fn read_username<R: BufRead>(reader: &mut R) -> io::Result<String> {
    let mut input = String::new();
    reader.read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Runs terminal I/O on the blocking pool so the runtime keeps serving other tasks.
async fn run_blocking<T, F>(f: F) -> RebootResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> RebootResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RebootError::Io(io::Error::other(e)))?
}
