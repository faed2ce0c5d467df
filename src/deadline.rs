//! Deadline-bounded execution of asynchronous work.
//!
//! The operation runs on its own task. When the deadline passes first the
//! caller gets [`PipelineError::Timeout`] and stops waiting, but the task is
//! left running: whatever it was mutating may still change afterwards.
//! Work handed to this module must therefore only own state that nobody else
//! reads after a timeout is reported.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::PipelineError;

/// Race `operation` against a timer of length `deadline`.
///
/// # Errors
///
/// Returns the operation's own error if it fails first,
/// [`PipelineError::Timeout`] if the deadline passes first, or
/// [`PipelineError::Task`] if the operation panics.
pub async fn run_with_deadline<F, T>(deadline: Duration, operation: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(operation);

    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(PipelineError::Task(join_err.to_string())),
        Err(_) => {
            // Dropping the handle detaches the task; it keeps running.
            debug!(?deadline, "Deadline elapsed, no longer waiting on operation");
            Err(PipelineError::Timeout(deadline))
        }
    }
}
