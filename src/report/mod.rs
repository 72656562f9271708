pub mod format;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analytics::{bucketize, recent, PerformanceSummary};
use crate::ledger::{Granularity, PerformanceLedger};
use crate::risk::DrawdownState;
use crate::types::AccountSnapshot;
use format::{bucket_table, escape_markdown, money, pct, plain_pct, signed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Detailed,
    Summary,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Detailed => "detailed",
            ReportKind::Summary => "summary",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How many of the most recent periods each table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableWindows {
    pub daily: usize,
    pub weekly: usize,
    pub monthly: usize,
}

impl Default for TableWindows {
    fn default() -> Self {
        Self {
            daily: 10,
            weekly: 8,
            monthly: 6,
        }
    }
}

impl TableWindows {
    pub fn rows_for(&self, granularity: Granularity) -> usize {
        match granularity {
            Granularity::Day => self.daily,
            Granularity::Week => self.weekly,
            Granularity::Month => self.monthly,
        }
    }
}

/// Presentation inputs that are not part of the account data.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub label: String,
    pub now: DateTime<Utc>,
    pub windows: TableWindows,
}

/// Builds the message text for one report.
pub fn compose_report(
    ledger: &PerformanceLedger,
    drawdown: &DrawdownState,
    snapshot: &AccountSnapshot,
    kind: ReportKind,
    ctx: &ReportContext,
) -> String {
    let text = match kind {
        ReportKind::Detailed => DetailedReport {
            ledger,
            drawdown,
            snapshot,
            ctx,
        }
        .to_string(),
        ReportKind::Summary => SummaryReport {
            ledger,
            snapshot,
            ctx,
        }
        .to_string(),
    };
    text.trim_end().to_string()
}

fn write_header(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    snapshot: &AccountSnapshot,
    ctx: &ReportContext,
) -> fmt::Result {
    let account = &snapshot.account;
    writeln!(f, "*{}: {}*", title, escape_markdown(&ctx.label))?;
    if !account.company.is_empty() {
        writeln!(
            f,
            "{} | #{} | {}",
            escape_markdown(&account.company),
            account.login,
            escape_markdown(&account.currency)
        )?;
    }
    writeln!(f, "_{}_", snapshot.taken_at.format("%Y-%m-%d %H:%M UTC"))
}

/// Full account figures, drawdown, costs and the three period tables.
struct DetailedReport<'a> {
    ledger: &'a PerformanceLedger,
    drawdown: &'a DrawdownState,
    snapshot: &'a AccountSnapshot,
    ctx: &'a ReportContext,
}

impl fmt::Display for DetailedReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let account = &self.snapshot.account;
        let drawdown = self.drawdown;
        write_header(f, "Account Report", self.snapshot, self.ctx)?;

        writeln!(f, "\n*Account*")?;
        writeln!(f, "Balance: {} {}", money(account.balance), account.currency)?;
        writeln!(f, "Equity: {} {}", money(account.equity), account.currency)?;
        writeln!(f, "Credit: {}", money(account.credit))?;
        writeln!(f, "Margin: {}", money(account.margin))?;
        writeln!(f, "Free Margin: {}", money(account.free_margin()))?;
        writeln!(f, "Margin Level: {}", plain_pct(account.effective_margin_level()))?;
        writeln!(
            f,
            "Floating P/L: {} ({} open)",
            signed(self.snapshot.floating_pnl()),
            self.snapshot.position_count()
        )?;

        writeln!(f, "\n*Drawdown*")?;
        writeln!(f, "Current DD: {}", pct(Some(drawdown.current_dd_pct)))?;
        writeln!(f, "Worst DD: {}", pct(Some(drawdown.max_current_dd_pct)))?;
        writeln!(
            f,
            "Max DD: {} ({} of peak)",
            money(drawdown.max_dd_abs),
            plain_pct(drawdown.max_dd_abs_pct())
        )?;
        writeln!(f, "Peak Equity: {}", money(drawdown.peak_equity))?;
        writeln!(
            f,
            "Since {}: {}",
            drawdown.started_at.format("%Y-%m-%d %H:%M"),
            pct(drawdown.growth_pct(account.equity))
        )?;

        let today = self.ledger.local_date(self.ctx.now);
        let all_time = PerformanceSummary::calculate(&self.ledger.trades, today).all_time;
        writeln!(f, "\n*Costs ({} trades)*", all_time.trades)?;
        writeln!(f, "Gross Profit: {}", signed(all_time.gross_profit))?;
        writeln!(f, "Swap: {}", signed(all_time.swap))?;
        writeln!(f, "Commission: {}", signed(all_time.commission))?;
        writeln!(f, "Net Profit: {}", signed(all_time.net_profit))?;

        for granularity in Granularity::all() {
            let buckets = bucketize(&self.ledger.trades, granularity);
            let rows = self.ctx.windows.rows_for(granularity);
            writeln!(f, "\n*{} (last {})*", granularity, rows)?;
            writeln!(f, "{}", bucket_table(granularity, recent(&buckets, rows)))?;
        }
        Ok(())
    }
}

/// Balance, equity and floating P&L plus the four period aggregates.
struct SummaryReport<'a> {
    ledger: &'a PerformanceLedger,
    snapshot: &'a AccountSnapshot,
    ctx: &'a ReportContext,
}

impl fmt::Display for SummaryReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let account = &self.snapshot.account;
        write_header(f, "Summary", self.snapshot, self.ctx)?;

        writeln!(f, "\nBalance: {} {}", money(account.balance), account.currency)?;
        writeln!(f, "Equity: {} {}", money(account.equity), account.currency)?;
        writeln!(f, "Floating P/L: {}", signed(self.snapshot.floating_pnl()))?;

        let today = self.ledger.local_date(self.ctx.now);
        let summary = PerformanceSummary::calculate(&self.ledger.trades, today);
        for stats in summary.rows() {
            writeln!(
                f,
                "\n*{}*: {} trades | {} | {} | win {}",
                stats.label,
                stats.trades,
                signed(stats.net_profit),
                pct(stats.return_pct),
                plain_pct(stats.win_rate)
            )?;
        }
        Ok(())
    }
}

/// Sent once when the agent comes up.
pub fn startup_message(label: &str, snapshot: &AccountSnapshot, trades: usize) -> String {
    let account = &snapshot.account;
    format!(
        "*Reporter started: {}*\nBalance: {} {}\nEquity: {}\nClosed trades in history: {}",
        escape_markdown(label),
        money(account.balance),
        account.currency,
        money(account.equity),
        trades
    )
}

/// Best-effort farewell sent on shutdown.
pub fn shutdown_message(label: &str, drawdown: &DrawdownState, now: DateTime<Utc>, reports_sent: u64) -> String {
    let uptime = now - drawdown.started_at;
    format!(
        "*Reporter stopped: {}*\nUptime: {}h {}m\nReports sent: {}\nWorst DD: {}",
        escape_markdown(label),
        uptime.num_hours(),
        uptime.num_minutes() % 60,
        reports_sent,
        pct(Some(drawdown.max_current_dd_pct.min(Decimal::ZERO)))
    )
}
