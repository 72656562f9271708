use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a platform-recorded deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealKind {
    Buy,
    Sell,
    Balance,
    Credit,
    Charge,
    Correction,
    Bonus,
    #[serde(other)]
    Other,
}

impl DealKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealKind::Buy => "buy",
            DealKind::Sell => "sell",
            DealKind::Balance => "balance",
            DealKind::Credit => "credit",
            DealKind::Charge => "charge",
            DealKind::Correction => "correction",
            DealKind::Bonus => "bonus",
            DealKind::Other => "other",
        }
    }

    /// Buy/sell executions become ledger entries.
    pub fn is_trade(&self) -> bool {
        matches!(self, DealKind::Buy | DealKind::Sell)
    }

    /// Deposits, withdrawals and other account-level cash movements.
    pub fn is_cash_flow(&self) -> bool {
        matches!(
            self,
            DealKind::Balance
                | DealKind::Credit
                | DealKind::Charge
                | DealKind::Correction
                | DealKind::Bonus
        )
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            DealKind::Buy => Some(Direction::Long),
            DealKind::Sell => Some(Direction::Short),
            _ => None,
        }
    }
}

impl fmt::Display for DealKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the platform deal log.
///
/// Numeric fields the platform leaves out are read as zero, so a deal with
/// no profit still takes part in the balance chain with zero effect.
/// `time` keeps the offset the platform stamped it with; calendar keys are
/// taken from that local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(default)]
    pub ticket: u64,
    pub time: DateTime<FixedOffset>,
    pub kind: DealKind,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub volume: Decimal,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub profit: Decimal,
    #[serde(default)]
    pub swap: Decimal,
    #[serde(default)]
    pub commission: Decimal,
}

impl Deal {
    /// Cash effect of the deal on balance and equity.
    pub fn net(&self) -> Decimal {
        self.profit + self.swap + self.commission
    }

    pub fn utc_time(&self) -> DateTime<Utc> {
        self.time.with_timezone(&Utc)
    }

    /// Whether the deal moves the balance chain at all.
    pub fn affects_balance(&self) -> bool {
        self.kind.is_trade() || self.kind.is_cash_flow()
    }
}
