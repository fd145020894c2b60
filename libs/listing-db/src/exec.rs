use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{DbError, Result};

/// Bounds one database round-trip by a timeout and a shutdown token.
#[derive(Clone, Debug, Default)]
pub struct ExecGuard {
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl ExecGuard {
    pub fn new(timeout: Option<Duration>, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }

    /// No timeout, never cancelled.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn run<T, E, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        DbError: From<E>,
    {
        let bounded = async {
            match self.timeout {
                Some(t) => match tokio::time::timeout(t, fut).await {
                    Ok(res) => res.map_err(DbError::from),
                    Err(_) => Err(DbError::Timeout(t)),
                },
                None => fut.await.map_err(DbError::from),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DbError::Cancelled),
            res = bounded => res,
        }
    }
}
