use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// Cancellation scope of one scheduler run, carrying the reason it was stopped.
///
/// Derived from a parent token, so cancelling the parent stops the run too
/// (without a reason attached).
#[derive(Debug, Clone)]
pub struct StopSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl StopSignal {
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            reason: Arc::new(OnceLock::new()),
        }
    }

    /// Cancels the scope. Only the first reason is kept.
    pub fn cancel(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
