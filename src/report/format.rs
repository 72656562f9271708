use rust_decimal::{Decimal, RoundingStrategy};

use crate::analytics::CalendarBucket;
use crate::ledger::Granularity;

/// Escapes characters that carry meaning in Telegram's legacy Markdown.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

pub fn money(value: Decimal) -> String {
    format!("{:.2}", round(value, 2))
}

/// Money with an explicit sign, e.g. `+54.29` or `-3.10`.
pub fn signed(value: Decimal) -> String {
    let value = round(value, 2);
    if value > Decimal::ZERO {
        format!("+{:.2}", value)
    } else {
        format!("{:.2}", value)
    }
}

pub fn pct(value: Option<Decimal>) -> String {
    match value.map(|v| round(v, 2)) {
        Some(v) if v > Decimal::ZERO => format!("+{:.2}%", v),
        Some(v) => format!("{:.2}%", v),
        None => "n/a".to_string(),
    }
}

pub fn plain_pct(value: Option<Decimal>) -> String {
    match value {
        Some(v) => format!("{:.1}%", round(v, 1)),
        None => "n/a".to_string(),
    }
}

fn period_header(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Day => "Date",
        Granularity::Week => "Week",
        Granularity::Month => "Month",
    }
}

/// Renders buckets as a fixed-width table inside a Markdown code block.
///
/// Columns: period, trades, gross profit, swap, commission, net profit and
/// return on the period's opening balance.
pub fn bucket_table(granularity: Granularity, buckets: &[CalendarBucket]) -> String {
    let mut out = String::from("```\n");
    out.push_str(&format!(
        "{:<11} {:>3} {:>9} {:>7} {:>7} {:>9} {:>7}\n",
        period_header(granularity),
        "N",
        "Gross",
        "Swap",
        "Comm",
        "Net",
        "%"
    ));

    if buckets.is_empty() {
        out.push_str("no closed trades\n");
    }

    for bucket in buckets {
        let label = match granularity {
            Granularity::Day => bucket.key.label(),
            _ => bucket.key.short_label(),
        };
        out.push_str(&format!(
            "{:<11} {:>3} {:>9} {:>7} {:>7} {:>9} {:>7}\n",
            label,
            bucket.trades,
            signed(bucket.gross_profit),
            signed(bucket.swap),
            signed(bucket.commission),
            signed(bucket.net_profit),
            pct(bucket.return_pct())
        ));
    }

    out.push_str("```");
    out
}
