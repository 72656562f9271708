use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ledger::{ClosedTrade, Granularity, PeriodKey};

/// Aggregated trading results for one calendar period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarBucket {
    pub key: PeriodKey,
    pub trades: u64,
    pub wins: u64,
    pub gross_profit: Decimal,
    pub swap: Decimal,
    pub commission: Decimal,
    pub net_profit: Decimal,
    /// Balance before the first trade of the period; basis for `return_pct`.
    pub opening_balance: Decimal,
}

impl CalendarBucket {
    pub fn new(key: PeriodKey, opening_balance: Decimal) -> Self {
        Self {
            key,
            trades: 0,
            wins: 0,
            gross_profit: Decimal::ZERO,
            swap: Decimal::ZERO,
            commission: Decimal::ZERO,
            net_profit: Decimal::ZERO,
            opening_balance,
        }
    }

    pub fn add_trade(&mut self, trade: &ClosedTrade) {
        self.trades += 1;
        if trade.is_win() {
            self.wins += 1;
        }
        self.gross_profit += trade.profit;
        self.swap += trade.swap;
        self.commission += trade.commission;
        self.net_profit += trade.net_profit;
    }

    /// Net profit relative to the opening balance; `None` when undefined.
    pub fn return_pct(&self) -> Option<Decimal> {
        if self.trades == 0 || self.opening_balance.is_zero() {
            None
        } else {
            Some(self.net_profit / self.opening_balance * dec!(100))
        }
    }

    pub fn win_rate(&self) -> Option<Decimal> {
        if self.trades == 0 {
            None
        } else {
            Some(Decimal::from(self.wins) / Decimal::from(self.trades) * dec!(100))
        }
    }
}

/// Groups trades by calendar period in first-seen order.
///
/// For a chronological ledger first-seen order is chronological order.
pub fn bucketize(trades: &[ClosedTrade], granularity: Granularity) -> Vec<CalendarBucket> {
    let mut buckets: Vec<CalendarBucket> = Vec::new();
    let mut index: HashMap<PeriodKey, usize> = HashMap::new();

    for trade in trades {
        let key = trade.key(granularity);
        let slot = *index.entry(key).or_insert_with(|| {
            buckets.push(CalendarBucket::new(key, trade.balance_before));
            buckets.len() - 1
        });
        buckets[slot].add_trade(trade);
    }

    buckets
}

/// The most recent `n` buckets, oldest first.
pub fn recent(buckets: &[CalendarBucket], n: usize) -> &[CalendarBucket] {
    let skip = buckets.len().saturating_sub(n);
    &buckets[skip..]
}

/// Totals over an arbitrary slice of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub label: String,
    pub trades: u64,
    pub wins: u64,
    pub gross_profit: Decimal,
    pub swap: Decimal,
    pub commission: Decimal,
    pub net_profit: Decimal,
    pub return_pct: Option<Decimal>,
    pub win_rate: Option<Decimal>,
}

impl PeriodStats {
    pub fn from_trades<'a, I>(label: &str, trades: I) -> Self
    where
        I: IntoIterator<Item = &'a ClosedTrade>,
    {
        let mut bucket: Option<CalendarBucket> = None;
        for trade in trades {
            bucket
                .get_or_insert_with(|| CalendarBucket::new(trade.day, trade.balance_before))
                .add_trade(trade);
        }

        match bucket {
            Some(b) => Self {
                label: label.to_string(),
                trades: b.trades,
                wins: b.wins,
                gross_profit: b.gross_profit,
                swap: b.swap,
                commission: b.commission,
                net_profit: b.net_profit,
                return_pct: b.return_pct(),
                win_rate: b.win_rate(),
            },
            None => Self::empty(label),
        }
    }

    pub fn empty(label: &str) -> Self {
        Self {
            label: label.to_string(),
            trades: 0,
            wins: 0,
            gross_profit: Decimal::ZERO,
            swap: Decimal::ZERO,
            commission: Decimal::ZERO,
            net_profit: Decimal::ZERO,
            return_pct: None,
            win_rate: None,
        }
    }
}

/// Today, this week, this month and all-time figures relative to `today`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub today: PeriodStats,
    pub this_week: PeriodStats,
    pub this_month: PeriodStats,
    pub all_time: PeriodStats,
}

impl PerformanceSummary {
    pub fn calculate(trades: &[ClosedTrade], today: NaiveDate) -> Self {
        let in_period = |granularity: Granularity| {
            let key = PeriodKey::containing(granularity, today);
            trades.iter().filter(move |t| t.key(granularity) == key)
        };

        Self {
            today: PeriodStats::from_trades("Today", in_period(Granularity::Day)),
            this_week: PeriodStats::from_trades("This Week", in_period(Granularity::Week)),
            this_month: PeriodStats::from_trades("This Month", in_period(Granularity::Month)),
            all_time: PeriodStats::from_trades("All Time", trades),
        }
    }

    pub fn rows(&self) -> [&PeriodStats; 4] {
        [&self.today, &self.this_week, &self.this_month, &self.all_time]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::rebuild_ledger;
    use crate::ledger::tests::deal;
    use crate::types::DealKind;
    use chrono::{TimeZone, Utc};

    fn example_ledger() -> Vec<ClosedTrade> {
        let deals = vec![
            deal(1, "2025-07-30T08:00:00Z", DealKind::Balance, dec!(1000)),
            deal(2, "2025-08-01T15:30:00Z", DealKind::Buy, dec!(54.29)),
            deal(3, "2025-08-04T09:00:00Z", DealKind::Sell, dec!(224.90)),
        ];
        let now = Utc.with_ymd_and_hms(2025, 8, 5, 0, 0, 0).unwrap();
        rebuild_ledger(&deals, dec!(1279.19), dec!(1279.19), now).trades
    }

    fn busy_ledger() -> Vec<ClosedTrade> {
        let mut deals = vec![deal(1, "2025-01-02T08:00:00Z", DealKind::Balance, dec!(10000))];
        let mut ticket = 2;
        for day in 0..120i64 {
            let time = Utc.with_ymd_and_hms(2025, 1, 3, 10, 0, 0).unwrap() + chrono::Duration::days(day);
            let profit = Decimal::from((day % 7) - 3) * dec!(12.5);
            let stamp = time.to_rfc3339();
            deals.push(deal(ticket, &stamp, DealKind::Buy, profit));
            ticket += 1;
            if day % 3 == 0 {
                deals.push(deal(ticket, &stamp, DealKind::Sell, dec!(4.25)));
                ticket += 1;
            }
        }
        let balance = deals.iter().map(|d| d.net()).sum();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        rebuild_ledger(&deals, balance, balance, now).trades
    }

    #[test]
    fn test_daily_example() {
        let trades = example_ledger();
        let daily = bucketize(&trades, Granularity::Day);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].key.label(), "2025-08-01");
        assert_eq!(daily[1].key.label(), "2025-08-04");
        assert_eq!(daily[0].trades, 1);
        assert_eq!(daily[1].trades, 1);
        assert_eq!(daily[0].return_pct(), Some(dec!(5.429)));

        let second = daily[1].return_pct().unwrap().round_dp(2);
        assert_eq!(second, dec!(21.33));
    }

    #[test]
    fn test_weekly_and_monthly_example() {
        let trades = example_ledger();

        // Friday and the following Monday fall in different Monday-anchored weeks.
        let weekly = bucketize(&trades, Granularity::Week);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].key.label(), "2025-07-28 - 2025-08-03");

        let monthly = bucketize(&trades, Granularity::Month);
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].trades, 2);
        assert_eq!(monthly[0].net_profit, dec!(279.19));
        assert_eq!(monthly[0].opening_balance, dec!(1000));
    }

    #[test]
    fn test_buckets_partition_ledger() {
        let trades = busy_ledger();
        let total: Decimal = trades.iter().map(|t| t.net_profit).sum();

        for granularity in Granularity::all() {
            let buckets = bucketize(&trades, granularity);
            let count: u64 = buckets.iter().map(|b| b.trades).sum();
            let net: Decimal = buckets.iter().map(|b| b.net_profit).sum();
            assert_eq!(count as usize, trades.len(), "{} count", granularity);
            assert_eq!(net, total, "{} net", granularity);

            for pair in buckets.windows(2) {
                assert!(pair[0].key.start < pair[1].key.start);
            }
        }
    }

    #[test]
    fn test_recent_window() {
        let trades = busy_ledger();
        let daily = bucketize(&trades, Granularity::Day);
        let window = recent(&daily, 10);
        assert_eq!(window.len(), 10);
        assert_eq!(window.last(), daily.last());
        assert!(window[0].key.start < window[9].key.start);

        let monthly = bucketize(&trades, Granularity::Month);
        assert_eq!(monthly.len(), 5);
        assert_eq!(recent(&monthly, 6).len(), 5);
    }

    #[test]
    fn test_return_pct_undefined_for_zero_balance() {
        let key = PeriodKey::day(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap());
        let empty = CalendarBucket::new(key, dec!(1000));
        assert_eq!(empty.return_pct(), None);
        assert_eq!(empty.win_rate(), None);

        let mut trades = example_ledger();
        trades[0].balance_before = Decimal::ZERO;
        let daily = bucketize(&trades[..1], Granularity::Day);
        assert_eq!(daily[0].return_pct(), None);
    }

    #[test]
    fn test_performance_summary() {
        let trades = example_ledger();
        let summary = PerformanceSummary::calculate(&trades, NaiveDate::from_ymd_opt(2025, 8, 4).unwrap());

        assert_eq!(summary.today.trades, 1);
        assert_eq!(summary.today.net_profit, dec!(224.90));
        assert_eq!(summary.this_week.trades, 1);
        assert_eq!(summary.this_month.trades, 2);
        assert_eq!(summary.this_month.win_rate, Some(dec!(100)));
        assert_eq!(summary.all_time.return_pct, Some(dec!(27.919)));

        let quiet = PerformanceSummary::calculate(&trades, NaiveDate::from_ymd_opt(2025, 9, 2).unwrap());
        assert_eq!(quiet.today, PeriodStats::empty("Today"));
        assert_eq!(quiet.this_month.trades, 0);
        assert_eq!(quiet.all_time.trades, 2);
    }
}
