pub mod snapshot;

pub use snapshot::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{AccountInfo, AccountSnapshot, Deal, OpenPosition};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("platform data unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read platform export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse platform export: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read-only view of the trading platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn account(&self) -> Result<AccountInfo, SourceError>;
    async fn open_positions(&self) -> Result<Vec<OpenPosition>, SourceError>;
    /// Deals executed in `[from, to]`.
    async fn deals(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Deal>, SourceError>;
}

/// Samples account figures and open positions together.
pub async fn load_snapshot<S>(source: &S, now: DateTime<Utc>) -> Result<AccountSnapshot, SourceError>
where
    S: AccountSource + ?Sized,
{
    let account = source.account().await?;
    let positions = source.open_positions().await?;
    Ok(AccountSnapshot::new(account, positions, now))
}
