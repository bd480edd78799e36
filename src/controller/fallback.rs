//! Last-resort handling for defects
//!
//! Expected failures are already notices by the time they leave a
//! dispatcher. A panic inside a dispatched future is not expected: [`guard`]
//! catches it, logs it and turns it into a [`CrashReport`] whose only
//! recovery is reloading the view.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// What the user can do after a crash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Rebuild the view from scratch
    Reload,
}

/// A caught panic
#[derive(Debug)]
pub struct CrashReport {
    pub error: anyhow::Error,
    pub recovery: Recovery,
}

impl CrashReport {
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Poll `future` to completion, converting a panic into a [`CrashReport`]
pub async fn guard<F, T>(future: F) -> Result<T, CrashReport>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(value) => Ok(value),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(panic = %message, "unexpected panic in dispatched task");
            Err(CrashReport {
                error: anyhow::anyhow!("Something went wrong: {}", message),
                recovery: Recovery::Reload,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_passes_values_through() {
        let value = guard(async { 41 + 1 }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_guard_catches_panic() {
        let report = guard(async {
            if true {
                panic!("selection out of sync");
            }
        })
        .await
        .unwrap_err();
        assert_eq!(report.recovery, Recovery::Reload);
        assert_eq!(report.message(), "Something went wrong: selection out of sync");
    }

    #[tokio::test]
    async fn test_guard_reports_formatted_panic() {
        let id = "e7";
        let report = guard(async move {
            panic!("missing row {}", id);
        })
        .await
        .unwrap_err();
        assert!(report.message().ends_with("missing row e7"));
    }
}
