//! # StoreHandle
//!
//! Lazily-initialized shared access to the persistence layer.
//!
//! The first caller to need the store pays the connection cost; concurrent
//! callers during establishment wait on that same in-flight attempt. One
//! establishment round makes a bounded number of attempts with exponential
//! backoff, then fails fast with `ServiceUnavailable` so request handling
//! never hangs. A detached reconnect loop can keep retrying in the
//! background, best-effort, independent of request traffic.
//!
//! The handle is passed to every engine via constructor injection; tests
//! swap in a fake `StoreConnector`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::{AppError, Result};
use crate::traits::Repos;

/// Opens a connection to the persistence layer and hands back its
/// repositories. Implementations must be safe to call repeatedly.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Repos>;
}

/// Bounds one establishment round.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Shared, lazily-connected store handle.
pub struct StoreHandle {
    connector: Arc<dyn StoreConnector>,
    policy: RetryPolicy,
    repos: OnceCell<Arc<Repos>>,
}

impl StoreHandle {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self::with_policy(connector, RetryPolicy::default())
    }

    pub fn with_policy(connector: Arc<dyn StoreConnector>, policy: RetryPolicy) -> Self {
        Self {
            connector,
            policy,
            repos: OnceCell::new(),
        }
    }

    /// Returns the connected repositories, connecting on first use.
    ///
    /// Single-flight: while one caller is establishing, others await the same
    /// attempt. A failed round leaves the cell empty so the next caller
    /// retries from scratch.
    pub async fn repos(&self) -> Result<Arc<Repos>> {
        self.repos
            .get_or_try_init(|| self.establish())
            .await
            .cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.repos.initialized()
    }

    async fn establish(&self) -> Result<Arc<Repos>> {
        let mut delay = self.policy.base_delay;
        let mut last_err = AppError::ServiceUnavailable("no connection attempt made".to_string());
        for attempt in 1..=self.policy.max_attempts {
            match self.connector.connect().await {
                Ok(repos) => {
                    tracing::info!(attempt, "store connection established");
                    return Ok(Arc::new(repos));
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "store connection attempt failed");
                    last_err = err;
                }
            }
            if attempt < self.policy.max_attempts {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(self.policy.max_delay);
            }
        }
        Err(AppError::ServiceUnavailable(format!(
            "store unreachable after {} attempts: {last_err}",
            self.policy.max_attempts
        )))
    }

    /// Detached best-effort reconnect loop. Runs until the handle is
    /// connected; never blocks request handling.
    pub fn spawn_reconnect(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let handle = Arc::clone(self);
        tokio::spawn(async move {
            let mut delay = handle.policy.base_delay;
            loop {
                if handle.repos().await.is_ok() {
                    break;
                }
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(handle.policy.max_delay);
            }
        })
    }
}
