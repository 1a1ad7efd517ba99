//! Operator interrupts.
//!
//! Once tokio listens for SIGINT the default "terminate" action is gone for
//! the rest of the process, so every long wait must race the signal itself.

use crate::core::domain::error::{RebootError, RebootResult};
use std::future::Future;
use std::io;
use tracing::warn;

/// Runs `work` until it finishes or `signal` fires.
///
/// # Errors
///
/// Returns `RebootError::Cancelled` naming `what` when the signal fires first.
/// If the signal cannot be listened for, `work` runs to completion.
pub async fn until_interrupted<T, W, S>(what: &str, work: W, signal: S) -> RebootResult<T>
where
    W: Future<Output = RebootResult<T>>,
    S: Future<Output = io::Result<()>>,
{
    tokio::pin!(work);
    tokio::select! {
        result = &mut work => result,
        outcome = signal => match outcome {
            Ok(()) => {
                warn!("{} interrupted by operator", what);
                Err(RebootError::Cancelled(format!("{} cancelled by operator", what)))
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for Ctrl-C");
                work.await
            }
        },
    }
}

/// [`until_interrupted`] on Ctrl-C.
pub async fn until_ctrl_c<T, W>(what: &str, work: W) -> RebootResult<T>
where
    W: Future<Output = RebootResult<T>>,
{
    until_interrupted(what, work, tokio::signal::ctrl_c()).await
}
