use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Drawdown figures accumulated over the lifetime of the process.
///
/// `current_dd_pct` is floating P&L relative to balance, not equity relative
/// to peak. Reports have always shown it this way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownState {
    pub started_at: DateTime<Utc>,
    pub start_equity: Decimal,
    pub peak_equity: Decimal,
    pub current_dd_pct: Decimal,
    /// Most negative `current_dd_pct` observed.
    pub max_current_dd_pct: Decimal,
    /// Largest gap between peak equity and equity, in account currency.
    pub max_dd_abs: Decimal,
}

impl DrawdownState {
    pub fn new(started_at: DateTime<Utc>, start_equity: Decimal) -> Self {
        Self {
            started_at,
            start_equity,
            peak_equity: start_equity,
            current_dd_pct: Decimal::ZERO,
            max_current_dd_pct: Decimal::ZERO,
            max_dd_abs: Decimal::ZERO,
        }
    }

    /// Folds one observation into the state; figures only ever get worse.
    pub fn update(self, equity: Decimal, balance: Decimal, floating: Decimal) -> Self {
        let peak_equity = self.peak_equity.max(equity);
        let current_dd_pct = current_drawdown_pct(floating, balance);

        Self {
            peak_equity,
            current_dd_pct,
            max_current_dd_pct: self.max_current_dd_pct.min(current_dd_pct),
            max_dd_abs: self.max_dd_abs.max(peak_equity - equity),
            ..self
        }
    }

    /// Equity change since the agent started, in percent of starting equity.
    pub fn growth_pct(&self, equity: Decimal) -> Option<Decimal> {
        if self.start_equity > Decimal::ZERO {
            Some((equity - self.start_equity) / self.start_equity * dec!(100))
        } else {
            None
        }
    }

    /// Absolute drawdown as a share of peak equity.
    pub fn max_dd_abs_pct(&self) -> Option<Decimal> {
        if self.peak_equity > Decimal::ZERO {
            Some(self.max_dd_abs / self.peak_equity * dec!(100))
        } else {
            None
        }
    }
}

/// Floating P&L as a percentage of balance; zero for a non-positive balance.
pub fn current_drawdown_pct(floating: Decimal, balance: Decimal) -> Decimal {
    if balance > Decimal::ZERO {
        floating / balance * dec!(100)
    } else {
        Decimal::ZERO
    }
}
