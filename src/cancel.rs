//! Cancellation token shared between a caller and an in-flight call.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Cloneable cancellation handle. Clones observe the same signal; an optional deadline
/// fires the token without anyone calling [`CancelToken::cancel`].
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    deadline: Option<Instant>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        CancelToken {
            tx: Arc::new(tx),
            deadline: None,
        }
    }

    /// Token that is cancelled once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        let mut token = Self::new();
        token.deadline = Some(Instant::now() + timeout);
        token
    }

    /// A clone of this token that additionally fires at `timeout` from now.
    /// The earlier deadline wins.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let at = Instant::now() + timeout;
        CancelToken {
            tx: self.tx.clone(),
            deadline: Some(self.deadline.map_or(at, |d| d.min(at))),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the token is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let signalled = async {
            // The sender lives in `self`, so `wait_for` only returns once the flag flips.
            let _ = rx.wait_for(|cancelled| *cancelled).await;
        };
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = signalled => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => signalled.await,
        }
    }
}
