use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::Direction;

/// Live account scalars as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub login: u64,
    #[serde(default)]
    pub company: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub balance: Decimal,
    pub equity: Decimal,
    #[serde(default)]
    pub credit: Decimal,
    #[serde(default)]
    pub margin: Decimal,
    /// Platform-reported margin level in percent; zero when no margin is used.
    #[serde(default)]
    pub margin_level: Decimal,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl AccountInfo {
    pub fn free_margin(&self) -> Decimal {
        self.equity - self.margin
    }

    /// Margin level, derived from equity and margin when the platform omits it.
    pub fn effective_margin_level(&self) -> Option<Decimal> {
        if !self.margin_level.is_zero() {
            Some(self.margin_level)
        } else if self.margin > Decimal::ZERO {
            Some(self.equity / self.margin * dec!(100))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    #[serde(default)]
    pub ticket: u64,
    pub symbol: String,
    pub direction: Direction,
    #[serde(default)]
    pub volume: Decimal,
    #[serde(default)]
    pub open_price: Decimal,
    #[serde(default)]
    pub profit: Decimal,
    #[serde(default)]
    pub swap: Decimal,
}

impl OpenPosition {
    pub fn floating(&self) -> Decimal {
        self.profit + self.swap
    }
}

/// Account figures and open positions sampled at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub taken_at: DateTime<Utc>,
    pub account: AccountInfo,
    pub positions: Vec<OpenPosition>,
}

impl AccountSnapshot {
    pub fn new(account: AccountInfo, positions: Vec<OpenPosition>, taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            account,
            positions,
        }
    }

    /// Unrealized P&L across all open positions.
    pub fn floating_pnl(&self) -> Decimal {
        self.positions.iter().map(|p| p.floating()).sum()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> AccountInfo {
        AccountInfo {
            login: 5001,
            company: "Demo Broker".to_string(),
            currency: "USD".to_string(),
            balance: dec!(1000),
            equity: dec!(980),
            credit: Decimal::ZERO,
            margin: dec!(200),
            margin_level: Decimal::ZERO,
        }
    }

    #[test]
    fn test_floating_pnl_sums_positions() {
        let positions = vec![
            OpenPosition {
                ticket: 1,
                symbol: "XAUUSD".to_string(),
                direction: Direction::Long,
                volume: dec!(0.01),
                open_price: dec!(2400),
                profit: dec!(-25),
                swap: dec!(-1),
            },
            OpenPosition {
                ticket: 2,
                symbol: "EURUSD".to_string(),
                direction: Direction::Short,
                volume: dec!(0.10),
                open_price: dec!(1.09),
                profit: dec!(6),
                swap: Decimal::ZERO,
            },
        ];
        let snapshot = AccountSnapshot::new(account(), positions, Utc::now());
        assert_eq!(snapshot.floating_pnl(), dec!(-20));
        assert_eq!(snapshot.position_count(), 2);
    }

    #[test]
    fn test_margin_level_derived_when_missing() {
        let info = account();
        assert_eq!(info.free_margin(), dec!(780));
        assert_eq!(info.effective_margin_level(), Some(dec!(490)));

        let idle = AccountInfo { margin: Decimal::ZERO, ..account() };
        assert_eq!(idle.effective_margin_level(), None);
    }
}
