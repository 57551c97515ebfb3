//! One-shot delayed follow-ups.
//!
//! A follow-up fires after a wall-clock delay on whatever runtime worker
//! is free. By then its identity may have authenticated, disconnected, or
//! reconnected. There is no cancellation channel, so every follow-up body
//! MUST re-check current state before acting.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;

/// Runs `body` once, `delay` from now, on the current Tokio runtime.
///
/// `label` names the follow-up in trace output. Returns `false`, and
/// drops `body` unrun, when called from a thread with no Tokio runtime;
/// host hooks may be invoked from such threads.
pub fn schedule<F>(label: &'static str, delay: Duration, body: F) -> bool
where
    F: Future<Output = ()> + Send + 'static,
{
    let Ok(handle) = Handle::try_current() else {
        tracing::warn!(task = label, "no Tokio runtime on this thread, delayed task dropped");
        return false;
    };
    tracing::trace!(task = label, delay_ms = delay.as_millis() as u64, "delayed task scheduled");
    handle.spawn(async move {
        tokio::time::sleep(delay).await;
        tracing::trace!(task = label, "delayed task firing");
        body.await;
    });
    true
}
