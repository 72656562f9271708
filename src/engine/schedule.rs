use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::report::ReportKind;

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    pub interval: Option<Duration>,
    /// Earliest time of the first send when nothing has been sent yet.
    pub first_due: DateTime<Utc>,
    pub last_sent: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub sent: u64,
    pub failures: u64,
}

/// `None` for 0 (disabled) or a value chrono cannot represent.
fn interval_from_mins(mins: u64) -> Option<Duration> {
    if mins == 0 {
        return None;
    }
    i64::try_from(mins).ok().and_then(Duration::try_minutes)
}

impl ScheduleEntry {
    fn new(interval: Option<Duration>, first_due: DateTime<Utc>) -> Self {
        Self {
            interval,
            first_due,
            last_sent: None,
            last_failure: None,
            sent: 0,
            failures: 0,
        }
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        let interval = self.interval?;
        match self.last_sent {
            Some(at) => at.checked_add_signed(interval),
            None => Some(self.first_due),
        }
    }
}

/// Tracks when each report kind was last delivered.
///
/// A failed delivery leaves `last_sent` untouched, so the report stays due;
/// it is re-attempted once `retry_cooldown` has passed since the failure.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSchedule {
    detailed: ScheduleEntry,
    summary: ScheduleEntry,
    retry_cooldown: Duration,
}

impl ReportSchedule {
    /// The detailed report is due immediately; the summary one interval in.
    pub fn new(
        detailed_interval_mins: u64,
        summary_interval_mins: u64,
        retry_cooldown: Duration,
        started_at: DateTime<Utc>,
    ) -> Self {
        let detailed = interval_from_mins(detailed_interval_mins);
        let summary = interval_from_mins(summary_interval_mins);
        // an interval that overflows the calendar can never come due
        let summary = summary.filter(|i| started_at.checked_add_signed(*i).is_some());
        let summary_first = summary
            .and_then(|i| started_at.checked_add_signed(i))
            .unwrap_or(started_at);
        Self {
            detailed: ScheduleEntry::new(detailed, started_at),
            summary: ScheduleEntry::new(summary, summary_first),
            retry_cooldown,
        }
    }

    pub fn entry(&self, kind: ReportKind) -> &ScheduleEntry {
        match kind {
            ReportKind::Detailed => &self.detailed,
            ReportKind::Summary => &self.summary,
        }
    }

    fn entry_mut(&mut self, kind: ReportKind) -> &mut ScheduleEntry {
        match kind {
            ReportKind::Detailed => &mut self.detailed,
            ReportKind::Summary => &mut self.summary,
        }
    }

    pub fn is_due(&self, kind: ReportKind, now: DateTime<Utc>) -> bool {
        let entry = self.entry(kind);
        let Some(due) = entry.next_due() else {
            return false;
        };
        if now < due {
            return false;
        }
        match entry.last_failure {
            Some(failed_at) => failed_at
                .checked_add_signed(self.retry_cooldown)
                .map_or(false, |retry_at| now >= retry_at),
            None => true,
        }
    }

    pub fn mark_sent(&mut self, kind: ReportKind, now: DateTime<Utc>) {
        let entry = self.entry_mut(kind);
        entry.last_sent = Some(now);
        entry.last_failure = None;
        entry.sent += 1;
    }

    pub fn mark_failed(&mut self, kind: ReportKind, now: DateTime<Utc>) {
        let entry = self.entry_mut(kind);
        entry.last_failure = Some(now);
        entry.failures += 1;
    }

    pub fn sent(&self, kind: ReportKind) -> u64 {
        self.entry(kind).sent
    }

    pub fn total_sent(&self) -> u64 {
        self.detailed.sent + self.summary.sent
    }
}
