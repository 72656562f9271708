use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::report::TableWindows;

/// Longest accepted report interval, cooldown or refresh age: 31 days.
pub const MAX_PERIOD_SECS: u64 = 31 * 24 * 60 * 60;
const MAX_PERIOD_MINS: u64 = MAX_PERIOD_SECS / 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub general: GeneralSettings,
    pub logging: LoggingSettings,
    pub notifications: NotificationSettings,
    pub reports: ReportSettings,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.general.tick_secs == 0 {
            errors.push("general.tick_secs must be > 0".to_string());
        }
        if self.general.tick_secs > 3600 {
            errors.push("general.tick_secs must be at most 3600".to_string());
        }
        if self.general.ledger_refresh_secs == 0 || self.general.ledger_refresh_secs > MAX_PERIOD_SECS {
            errors.push(format!(
                "general.ledger_refresh_secs must be between 1 and {}",
                MAX_PERIOD_SECS
            ));
        }
        if self.general.snapshot_path.trim().is_empty() {
            errors.push("general.snapshot_path must not be empty".to_string());
        }

        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            errors.push(format!(
                "logging.level '{}' must be one of trace, debug, info, warn, error",
                self.logging.level
            ));
        }

        if self.notifications.timeout_secs == 0 || self.notifications.timeout_secs > 60 {
            errors.push("notifications.timeout_secs must be between 1 and 60".to_string());
        }
        if self.notifications.retry_cooldown_secs > MAX_PERIOD_SECS {
            errors.push(format!(
                "notifications.retry_cooldown_secs must be at most {}",
                MAX_PERIOD_SECS
            ));
        }
        if !self.notifications.api_base.starts_with("http") {
            errors.push("notifications.api_base must be an http(s) URL".to_string());
        }

        for (name, mins) in [
            ("detailed_interval_mins", self.reports.detailed_interval_mins),
            ("summary_interval_mins", self.reports.summary_interval_mins),
        ] {
            if mins > MAX_PERIOD_MINS {
                errors.push(format!("reports.{} must be at most {}", name, MAX_PERIOD_MINS));
            }
        }

        let windows = &self.reports;
        if windows.daily_rows == 0 || windows.weekly_rows == 0 || windows.monthly_rows == 0 {
            errors.push("reports.*_rows must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Name shown in report headers.
    pub account_label: String,
    pub tick_secs: u64,
    pub ledger_refresh_secs: u64,
    /// JSON export maintained by the platform bridge.
    pub snapshot_path: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            account_label: "Trading Account".to_string(),
            tick_secs: 1,
            ledger_refresh_secs: 60,
            snapshot_path: "account_export.json".to_string(),
        }
    }
}

impl GeneralSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn ledger_max_age(&self) -> chrono::Duration {
        seconds(self.ledger_refresh_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub enabled: bool,
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    pub timeout_secs: u64,
    /// Wait before re-attempting a report whose delivery failed.
    pub retry_cooldown_secs: u64,
    pub send_lifecycle_messages: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: crate::notifications::TELEGRAM_API.to_string(),
            timeout_secs: 10,
            retry_cooldown_secs: 60,
            send_lifecycle_messages: true,
        }
    }
}

impl NotificationSettings {
    pub fn has_credentials(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_cooldown(&self) -> chrono::Duration {
        seconds(self.retry_cooldown_secs)
    }
}

/// Saturates instead of overflowing; `validate` keeps real values far below.
fn seconds(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or_else(chrono::Duration::max_value)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Minutes between detailed reports; 0 disables them.
    pub detailed_interval_mins: u64,
    /// Minutes between summary reports; 0 disables them.
    pub summary_interval_mins: u64,
    pub daily_rows: usize,
    pub weekly_rows: usize,
    pub monthly_rows: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            detailed_interval_mins: 60,
            summary_interval_mins: 15,
            daily_rows: 10,
            weekly_rows: 8,
            monthly_rows: 6,
        }
    }
}

impl ReportSettings {
    pub fn windows(&self) -> TableWindows {
        TableWindows {
            daily: self.daily_rows,
            weekly: self.weekly_rows,
            monthly: self.monthly_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.notifications.has_credentials());
        assert_eq!(config.reports.windows(), TableWindows::default());
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = AgentConfig::default();
        config.general.tick_secs = 0;
        config.logging.level = "loud".to_string();
        config.reports.weekly_rows = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[1].contains("loud"));
    }

    #[test]
    fn test_oversized_periods_are_rejected() {
        let mut config = AgentConfig::default();
        config.reports.summary_interval_mins = 200_000_000_000;
        config.notifications.retry_cooldown_secs = u64::MAX;
        config.general.ledger_refresh_secs = MAX_PERIOD_SECS + 1;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("summary_interval_mins")));
        assert!(errors.iter().any(|e| e.contains("retry_cooldown_secs")));

        config.reports.summary_interval_mins = MAX_PERIOD_SECS / 60;
        config.notifications.retry_cooldown_secs = MAX_PERIOD_SECS;
        config.general.ledger_refresh_secs = MAX_PERIOD_SECS;
        assert!(config.validate().is_ok());
        assert_eq!(config.notifications.retry_cooldown(), chrono::Duration::days(31));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AgentConfig = toml::from_str(
            r#"
            [notifications]
            bot_token = "123:abc"
            chat_id = "-1001"

            [reports]
            summary_interval_mins = 5
            "#,
        )
        .unwrap();

        assert!(config.notifications.has_credentials());
        assert_eq!(config.reports.summary_interval_mins, 5);
        assert_eq!(config.reports.detailed_interval_mins, 60);
        assert_eq!(config.general.ledger_refresh_secs, 60);
    }
}
