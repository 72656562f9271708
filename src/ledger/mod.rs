pub mod period;

pub use period::*;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Deal, Direction};

/// A buy/sell deal placed in the account's balance history.
///
/// `time` is in platform time; `day`, `week` and `month` follow its local date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub ticket: u64,
    pub time: DateTime<FixedOffset>,
    pub symbol: String,
    pub direction: Direction,
    pub volume: Decimal,
    pub price: Decimal,
    pub profit: Decimal,
    pub swap: Decimal,
    pub commission: Decimal,
    pub net_profit: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub equity_before: Decimal,
    pub equity_after: Decimal,
    pub day: PeriodKey,
    pub week: PeriodKey,
    pub month: PeriodKey,
}

impl ClosedTrade {
    pub fn key(&self, granularity: Granularity) -> PeriodKey {
        match granularity {
            Granularity::Day => self.day,
            Granularity::Week => self.week,
            Granularity::Month => self.month,
        }
    }

    pub fn is_win(&self) -> bool {
        self.net_profit > Decimal::ZERO
    }
}

/// Chronological record of every closed trade, rebuilt as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceLedger {
    pub trades: Vec<ClosedTrade>,
    pub rebuilt_at: Option<DateTime<Utc>>,
}

impl PerformanceLedger {
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn last(&self) -> Option<&ClosedTrade> {
        self.trades.last()
    }

    /// Offset of the platform clock, taken from the newest trade; UTC when empty.
    pub fn platform_offset(&self) -> FixedOffset {
        self.last().map(|t| *t.time.offset()).unwrap_or_else(|| Utc.fix())
    }

    /// Calendar date on the platform clock at `now`.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.platform_offset()).date_naive()
    }

    /// True when the ledger was never built or is older than `max_age`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.rebuilt_at {
            Some(at) => now - at >= max_age,
            None => true,
        }
    }
}

/// Replays the platform deal log into a chronological ledger.
///
/// The log only tells us where the account ends up, so the balance and
/// equity before the oldest deal are recovered first by walking backwards
/// from the current figures, then the log is replayed forwards from that
/// baseline. Cash flows move the running totals without producing entries;
/// deals of unknown kind are skipped in both passes.
pub fn rebuild_ledger(
    deals: &[Deal],
    current_balance: Decimal,
    current_equity: Decimal,
    now: DateTime<Utc>,
) -> PerformanceLedger {
    let mut ordered: Vec<&Deal> = deals.iter().filter(|d| d.affects_balance()).collect();
    ordered.sort_by(|a, b| a.time.cmp(&b.time).then(a.ticket.cmp(&b.ticket)));

    let mut balance = current_balance;
    let mut equity = current_equity;
    for deal in ordered.iter().rev() {
        let net = deal.net();
        balance -= net;
        equity -= net;
    }

    debug!(
        "Ledger baseline before {} deals: balance={:.2}, equity={:.2}",
        ordered.len(),
        balance,
        equity
    );

    let mut trades = Vec::new();
    for deal in ordered {
        let net = deal.net();
        if let Some(direction) = deal.kind.direction() {
            let date = deal.time.date_naive();
            trades.push(ClosedTrade {
                ticket: deal.ticket,
                time: deal.time,
                symbol: deal.symbol.clone(),
                direction,
                volume: deal.volume,
                price: deal.price,
                profit: deal.profit,
                swap: deal.swap,
                commission: deal.commission,
                net_profit: net,
                balance_before: balance,
                balance_after: balance + net,
                equity_before: equity,
                equity_after: equity + net,
                day: PeriodKey::day(date),
                week: PeriodKey::week(date),
                month: PeriodKey::month(date),
            });
        }
        balance += net;
        equity += net;
    }

    PerformanceLedger {
        trades,
        rebuilt_at: Some(now),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::DealKind;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    pub(crate) fn deal(ticket: u64, at: &str, kind: DealKind, profit: Decimal) -> Deal {
        Deal {
            ticket,
            time: DateTime::parse_from_rfc3339(at).unwrap(),
            kind,
            symbol: if kind.is_trade() { "EURUSD".to_string() } else { String::new() },
            volume: if kind.is_trade() { dec!(0.10) } else { Decimal::ZERO },
            price: if kind.is_trade() { dec!(1.1) } else { Decimal::ZERO },
            profit,
            swap: Decimal::ZERO,
            commission: Decimal::ZERO,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_log_gives_empty_ledger() {
        let ledger = rebuild_ledger(&[], dec!(1000), dec!(1000), now());
        assert!(ledger.is_empty());
        assert_eq!(ledger.rebuilt_at, Some(now()));
    }

    #[test]
    fn test_backward_then_forward_pass() {
        // Deposit 1000, two trades; current balance 1279.19
        let deals = vec![
            deal(3, "2025-08-04T09:00:00Z", DealKind::Sell, dec!(224.90)),
            deal(1, "2025-07-31T08:00:00Z", DealKind::Balance, dec!(1000)),
            deal(2, "2025-08-01T15:30:00Z", DealKind::Buy, dec!(54.29)),
        ];
        let ledger = rebuild_ledger(&deals, dec!(1279.19), dec!(1279.19), now());

        assert_eq!(ledger.len(), 2);
        let first = &ledger.trades[0];
        assert_eq!(first.ticket, 2);
        assert_eq!(first.balance_before, dec!(1000));
        assert_eq!(first.balance_after, dec!(1054.29));
        let second = &ledger.trades[1];
        assert_eq!(second.balance_before, dec!(1054.29));
        assert_eq!(second.balance_after, dec!(1279.19));
        assert_eq!(second.direction, Direction::Short);
    }

    #[test]
    fn test_chain_invariants_hold() {
        let mut deals = vec![
            deal(1, "2025-06-02T08:00:00Z", DealKind::Balance, dec!(5000)),
            deal(2, "2025-06-03T10:00:00Z", DealKind::Buy, dec!(-120.55)),
            deal(3, "2025-06-03T11:00:00Z", DealKind::Sell, dec!(310)),
            deal(4, "2025-06-20T11:00:00Z", DealKind::Balance, dec!(-1000)),
            deal(5, "2025-06-20T11:00:00Z", DealKind::Charge, dec!(-15)),
            deal(6, "2025-07-01T09:00:00Z", DealKind::Buy, Decimal::ZERO),
            deal(7, "2025-07-02T09:00:00Z", DealKind::Sell, dec!(42.42)),
        ];
        deals[2].swap = dec!(-3.10);
        deals[2].commission = dec!(-2.00);
        deals.reverse();

        // Equity differs from balance by the floating P&L of open positions.
        let ledger = rebuild_ledger(&deals, dec!(4211.77), dec!(4190.00), now());

        assert_eq!(ledger.len(), 4);
        for pair in ledger.trades.windows(2) {
            assert!(pair[0].time <= pair[1].time);
        }
        for trade in &ledger.trades {
            assert_eq!(trade.balance_after - trade.balance_before, trade.net_profit);
            assert_eq!(trade.equity_after - trade.equity_before, trade.net_profit);
        }
        assert_eq!(ledger.trades[0].balance_before, dec!(5000));
        assert_eq!(ledger.trades[0].equity_before, dec!(4978.23));
        assert_eq!(ledger.trades[1].net_profit, dec!(304.90));
        // withdrawal and charge between trades compound additively
        assert_eq!(ledger.trades[2].balance_before, dec!(4169.35));
        assert_eq!(ledger.trades[2].net_profit, Decimal::ZERO);
        assert_eq!(ledger.last().unwrap().balance_after, dec!(4211.77));
    }

    #[test]
    fn test_unknown_deals_do_not_move_balance() {
        let deals = vec![
            deal(1, "2025-08-01T10:00:00Z", DealKind::Buy, dec!(10)),
            deal(2, "2025-08-01T11:00:00Z", DealKind::Other, dec!(99)),
        ];
        let ledger = rebuild_ledger(&deals, dec!(110), dec!(110), now());
        assert_eq!(ledger.trades[0].balance_before, dec!(100));
    }

    #[test]
    fn test_calendar_keys() {
        let deals = vec![deal(1, "2025-08-03T23:10:00Z", DealKind::Sell, dec!(1))];
        let ledger = rebuild_ledger(&deals, dec!(1), dec!(1), now());
        let trade = &ledger.trades[0];
        assert_eq!(trade.day.label(), "2025-08-03");
        assert_eq!(trade.week.label(), "2025-07-28 - 2025-08-03");
        assert_eq!(trade.month.label(), "2025-08-01 - 2025-08-31");
        assert_eq!(
            trade.key(Granularity::Week).start,
            NaiveDate::from_ymd_opt(2025, 7, 28).unwrap()
        );
    }

    #[test]
    fn test_calendar_keys_follow_platform_time() {
        // Monday 01:00 on a UTC+3 server is still Sunday in UTC.
        let deals = vec![
            deal(1, "2025-08-03T20:00:00+03:00", DealKind::Buy, dec!(2)),
            deal(2, "2025-08-04T01:00:00+03:00", DealKind::Sell, dec!(3)),
        ];
        let ledger = rebuild_ledger(&deals, dec!(5), dec!(5), now());

        let monday = &ledger.trades[1];
        assert_eq!(monday.day.label(), "2025-08-04");
        assert_eq!(monday.week.start, NaiveDate::from_ymd_opt(2025, 8, 4).unwrap());
        assert_eq!(ledger.trades[0].week.label(), "2025-07-28 - 2025-08-03");

        assert_eq!(ledger.platform_offset().local_minus_utc(), 3 * 3600);
        let late_sunday_utc = Utc.with_ymd_and_hms(2025, 8, 3, 22, 30, 0).unwrap();
        assert_eq!(
            ledger.local_date(late_sunday_utc),
            NaiveDate::from_ymd_opt(2025, 8, 4).unwrap()
        );
    }

    #[test]
    fn test_staleness() {
        let mut ledger = PerformanceLedger::default();
        assert!(ledger.is_stale(now(), Duration::seconds(60)));
        ledger.rebuilt_at = Some(now());
        assert!(!ledger.is_stale(now() + Duration::seconds(30), Duration::seconds(60)));
        assert!(ledger.is_stale(now() + Duration::seconds(60), Duration::seconds(60)));
    }
}
