use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{AccountSource, SourceError};
use crate::types::{AccountInfo, Deal, OpenPosition};

/// Document written by the platform-side exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformExport {
    pub account: AccountInfo,
    #[serde(default)]
    pub positions: Vec<OpenPosition>,
    #[serde(default)]
    pub deals: Vec<Deal>,
}

/// Reads account state from a JSON file the platform bridge keeps current.
///
/// The file is re-read on every call so the agent always sees the latest
/// export.
#[derive(Debug, Clone)]
pub struct SnapshotFileSource {
    path: PathBuf,
}

impl SnapshotFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<PlatformExport, SourceError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let export: PlatformExport = serde_json::from_str(&raw)?;
        debug!(
            "Loaded platform export {}: {} positions, {} deals",
            self.path.display(),
            export.positions.len(),
            export.deals.len()
        );
        Ok(export)
    }
}

#[async_trait]
impl AccountSource for SnapshotFileSource {
    async fn account(&self) -> Result<AccountInfo, SourceError> {
        Ok(self.load().await?.account)
    }

    async fn open_positions(&self) -> Result<Vec<OpenPosition>, SourceError> {
        Ok(self.load().await?.positions)
    }

    async fn deals(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Deal>, SourceError> {
        let deals = self.load().await?.deals;
        Ok(deals
            .into_iter()
            .filter(|d| {
                let at = d.utc_time();
                at >= from && at <= to
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    const EXPORT: &str = r#"{
        "account": {
            "login": 778812,
            "company": "Example Markets",
            "currency": "EUR",
            "balance": 1279.19,
            "equity": 1264.19,
            "margin": 120
        },
        "positions": [
            {"ticket": 9, "symbol": "XAUUSD", "direction": "Long", "volume": 0.02, "profit": -15}
        ],
        "deals": [
            {"ticket": 1, "time": "2025-07-30T08:00:00Z", "kind": "balance", "profit": 1000},
            {"ticket": 2, "time": "2025-08-01T15:30:00Z", "kind": "buy", "symbol": "EURUSD", "profit": 54.29},
            {"ticket": 3, "time": "2025-08-04T09:00:00Z", "kind": "sell", "symbol": "EURUSD", "profit": 224.90}
        ]
    }"#;

    fn temp_file(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("reporter-export-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_reads_export() {
        let path = temp_file(EXPORT);
        let source = SnapshotFileSource::new(&path);

        let account = source.account().await.unwrap();
        assert_eq!(account.currency, "EUR");
        assert_eq!(account.balance, dec!(1279.19));

        let snapshot = crate::source::load_snapshot(&source, Utc::now()).await.unwrap();
        assert_eq!(snapshot.floating_pnl(), dec!(-15));

        let from = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 8, 31, 0, 0, 0).unwrap();
        let deals = source.deals(from, to).await.unwrap();
        assert_eq!(deals.len(), 2);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let source = SnapshotFileSource::new("/nonexistent/reporter/export.json");
        assert!(matches!(source.account().await, Err(SourceError::Io(_))));
    }

    #[tokio::test]
    async fn test_malformed_export_is_an_error() {
        let path = temp_file("{\"account\": ");
        let source = SnapshotFileSource::new(&path);
        assert!(matches!(
            source.deals(DateTime::<Utc>::MIN_UTC, Utc::now()).await,
            Err(SourceError::Parse(_))
        ));
        std::fs::remove_file(path).ok();
    }
}
