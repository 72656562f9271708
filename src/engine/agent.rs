use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::ReportSchedule;
use crate::config::AgentConfig;
use crate::ledger::{rebuild_ledger, PerformanceLedger};
use crate::notifications::{deliver, MessageKind, NotificationLog, Notifier};
use crate::report::{compose_report, shutdown_message, startup_message, ReportContext, ReportKind};
use crate::risk::DrawdownState;
use crate::source::{load_snapshot, AccountSource, SourceError};
use crate::types::AccountSnapshot;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("account data unavailable: {0}")]
    Account(#[source] SourceError),

    #[error("deal history unavailable: {0}")]
    History(#[source] SourceError),
}

impl From<ReportKind> for MessageKind {
    fn from(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Detailed => MessageKind::Detailed,
            ReportKind::Summary => MessageKind::Summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerRefresh {
    Fresh,
    Rebuilt(usize),
    /// Rebuild failed; the previous ledger is still in use.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub ledger: LedgerRefresh,
    pub sent: Vec<ReportKind>,
    pub failed: Vec<ReportKind>,
}

/// Owns all reporting state and advances it one tick at a time.
pub struct ReportingAgent<S, N> {
    source: S,
    notifier: N,
    config: AgentConfig,
    ledger: PerformanceLedger,
    drawdown: Option<DrawdownState>,
    schedule: ReportSchedule,
    log: NotificationLog,
    snapshot: Option<AccountSnapshot>,
}

impl<S, N> ReportingAgent<S, N>
where
    S: AccountSource,
    N: Notifier,
{
    pub fn new(source: S, notifier: N, config: AgentConfig, now: DateTime<Utc>) -> Self {
        let schedule = ReportSchedule::new(
            config.reports.detailed_interval_mins,
            config.reports.summary_interval_mins,
            config.notifications.retry_cooldown(),
            now,
        );
        Self {
            source,
            notifier,
            config,
            ledger: PerformanceLedger::default(),
            drawdown: None,
            schedule,
            log: NotificationLog::default(),
            snapshot: None,
        }
    }

    pub fn ledger(&self) -> &PerformanceLedger {
        &self.ledger
    }

    pub fn drawdown(&self) -> Option<&DrawdownState> {
        self.drawdown.as_ref()
    }

    pub fn schedule(&self) -> &ReportSchedule {
        &self.schedule
    }

    pub fn notification_log(&self) -> &NotificationLog {
        &self.log
    }

    /// Whether reports are composed and sent at all.
    pub fn notifications_active(&self) -> bool {
        self.config.notifications.enabled && self.notifier.is_configured()
    }

    /// Samples the account, builds the ledger and seeds drawdown tracking.
    pub async fn prime(&mut self, now: DateTime<Utc>) -> Result<(), AgentError> {
        let snapshot = self.sample(now).await?;
        self.refresh_ledger(&snapshot, now).await?;
        self.update_drawdown(&snapshot, now);
        Ok(())
    }

    /// `prime` plus the startup message.
    pub async fn start(&mut self, now: DateTime<Utc>) -> Result<(), AgentError> {
        if !self.config.notifications.enabled {
            info!("Notifications disabled in configuration");
        } else if !self.notifier.is_configured() {
            warn!("Notification credentials missing; reports will not be sent. Set notifications.bot_token and notifications.chat_id");
        }

        self.prime(now).await?;

        if let Some(snapshot) = &self.snapshot {
            info!(
                "Reporting on {} (#{}, {}): balance={:.2}, equity={:.2}, {} closed trades",
                self.config.general.account_label,
                snapshot.account.login,
                snapshot.account.currency,
                snapshot.account.balance,
                snapshot.account.equity,
                self.ledger.len()
            );

            if self.notifications_active() && self.config.notifications.send_lifecycle_messages {
                let text = startup_message(&self.config.general.account_label, snapshot, self.ledger.len());
                deliver(&self.notifier, &mut self.log, MessageKind::Startup, &text, now).await;
            }
        }
        Ok(())
    }

    /// One scheduling step: sample, refresh if stale, track drawdown, send what is due.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, AgentError> {
        let snapshot = self.sample(now).await?;

        let ledger = if self.ledger.is_stale(now, self.config.general.ledger_max_age()) {
            match self.refresh_ledger(&snapshot, now).await {
                Ok(count) => LedgerRefresh::Rebuilt(count),
                Err(e) => LedgerRefresh::Failed(e.to_string()),
            }
        } else {
            LedgerRefresh::Fresh
        };

        self.update_drawdown(&snapshot, now);

        let mut outcome = TickOutcome {
            ledger,
            sent: Vec::new(),
            failed: Vec::new(),
        };

        for kind in [ReportKind::Detailed, ReportKind::Summary] {
            if !self.schedule.is_due(kind, now) {
                continue;
            }
            if !self.notifications_active() {
                debug!("{} report due but notifications are inactive", kind);
                continue;
            }

            let Some(text) = self.compose(kind, now) else {
                continue;
            };
            if deliver(&self.notifier, &mut self.log, kind.into(), &text, now).await {
                self.schedule.mark_sent(kind, now);
                outcome.sent.push(kind);
            } else {
                self.schedule.mark_failed(kind, now);
                outcome.failed.push(kind);
            }
        }

        Ok(outcome)
    }

    /// Report text from the latest sample, if one has been taken.
    pub fn compose(&self, kind: ReportKind, now: DateTime<Utc>) -> Option<String> {
        let snapshot = self.snapshot.as_ref()?;
        let drawdown = self.drawdown.as_ref()?;
        let ctx = ReportContext {
            label: self.config.general.account_label.clone(),
            now,
            windows: self.config.reports.windows(),
        };
        Some(compose_report(&self.ledger, drawdown, snapshot, kind, &ctx))
    }

    /// Sends an arbitrary message through the configured channel.
    pub async fn send_message(&mut self, kind: MessageKind, text: &str, now: DateTime<Utc>) -> bool {
        deliver(&self.notifier, &mut self.log, kind, text, now).await
    }

    /// Best-effort farewell; failures are only logged.
    pub async fn shutdown(&mut self, now: DateTime<Utc>) {
        info!(
            "Shutting down: {} detailed and {} summary reports sent, {} delivery failures",
            self.schedule.sent(ReportKind::Detailed),
            self.schedule.sent(ReportKind::Summary),
            self.log.failed()
        );

        if !(self.notifications_active() && self.config.notifications.send_lifecycle_messages) {
            return;
        }
        if let Some(drawdown) = &self.drawdown {
            let text = shutdown_message(
                &self.config.general.account_label,
                drawdown,
                now,
                self.schedule.total_sent(),
            );
            deliver(&self.notifier, &mut self.log, MessageKind::Shutdown, &text, now).await;
        }
    }

    async fn sample(&mut self, now: DateTime<Utc>) -> Result<AccountSnapshot, AgentError> {
        let snapshot = load_snapshot(&self.source, now).await.map_err(|e| {
            warn!("Failed to read account state: {}", e);
            AgentError::Account(e)
        })?;
        self.snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Replaces the ledger with a fresh replay; on error the old one stays.
    ///
    /// The whole log is requested. Platform clocks run ahead of ours, and the
    /// live balance already includes deals stamped after `now`.
    async fn refresh_ledger(&mut self, snapshot: &AccountSnapshot, now: DateTime<Utc>) -> Result<usize, AgentError> {
        let deals = self
            .source
            .deals(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)
            .await
            .map_err(|e| {
                warn!("Deal history unavailable, keeping previous ledger: {}", e);
                AgentError::History(e)
            })?;

        self.ledger = rebuild_ledger(&deals, snapshot.account.balance, snapshot.account.equity, now);
        debug!("Ledger rebuilt from {} deals: {} trades", deals.len(), self.ledger.len());
        Ok(self.ledger.len())
    }

    fn update_drawdown(&mut self, snapshot: &AccountSnapshot, now: DateTime<Utc>) {
        let account = &snapshot.account;
        let state = self
            .drawdown
            .unwrap_or_else(|| DrawdownState::new(now, account.equity));
        self.drawdown = Some(state.update(account.equity, account.balance, snapshot.floating_pnl()));
    }
}
