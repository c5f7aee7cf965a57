//! Participant side of the exchange.
//!
//! A participant reports its required add-ons once per session, waits for
//! the owner's verdict and resends once at the midpoint of the wait. A
//! verdict saying the owner lacks something we require, or no verdict at
//! all, ends with the participant leaving after a short grace period.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::core::{LeaveKind, Severity};
use crate::session::SyncConfig;
use crate::sync::{Action, RequiredSet, SyncMessage};
use crate::transport::TimerKey;

/// Terminal result of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Lists match, or nothing needed checking.
    Success,
    /// Mismatch or timeout.
    Failure,
    /// The owner does not run ModSync, so nothing was exchanged.
    Skipped,
}

/// Where the exchange stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangePhase {
    /// Not started.
    #[default]
    Idle,
    /// `CLIENT_MODS` sent, waiting for a verdict.
    AwaitingOwnerReply,
    /// Finished. No further transitions.
    Done(Outcome),
}

/// Per-session exchange bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct ExchangeState {
    /// Current phase.
    pub phase: ExchangePhase,
    /// When `CLIENT_MODS` was first sent.
    pub started_at: Option<Instant>,
    /// Whether the midpoint resend has gone out.
    pub retry_sent: bool,
    /// Whether gameplay started while the exchange or a removal was pending.
    pub gameplay_seen: bool,
    /// Whether a self-removal is scheduled.
    pub removal_pending: bool,
}

/// Requester role.
#[derive(Debug, Clone)]
pub struct Participant {
    name: String,
    required: RequiredSet,
    exchange: ExchangeState,
    exchange_timeout: Duration,
    self_removal_grace: Duration,
    leave_on_timeout: bool,
}

impl Participant {
    /// Create a participant named `name` requiring `required`.
    pub fn new(name: impl Into<String>, required: RequiredSet, config: &SyncConfig) -> Self {
        Self {
            name: name.into(),
            required,
            exchange: ExchangeState::default(),
            exchange_timeout: config.exchange_timeout,
            self_removal_grace: config.self_removal_grace,
            leave_on_timeout: config.leave_on_timeout,
        }
    }

    /// Local display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Locally required add-ons.
    pub fn required(&self) -> &RequiredSet {
        &self.required
    }

    /// Exchange bookkeeping.
    pub fn exchange(&self) -> &ExchangeState {
        &self.exchange
    }

    /// Current phase.
    pub fn phase(&self) -> ExchangePhase {
        self.exchange.phase
    }

    /// Begin the exchange. Skipped when the owner has not advertised
    /// ModSync.
    pub fn start(&mut self, now: Instant, owner_has_sync: bool) -> Vec<Action> {
        if self.exchange.phase != ExchangePhase::Idle {
            return Vec::new();
        }

        if !owner_has_sync {
            warn!("owner does not advertise ModSync, skipping the exchange");
            self.exchange.phase = ExchangePhase::Done(Outcome::Skipped);
            return vec![Action::notify(
                "Host doesn't have ModSync - skipping",
                Severity::Info,
            )];
        }

        if self.required.is_empty() {
            info!("no required add-ons, nothing to check");
            self.exchange.phase = ExchangePhase::Done(Outcome::Success);
            return vec![Action::notify(
                "ModSync done! No required mods to check.",
                Severity::Info,
            )];
        }

        info!(
            "reporting {} required add-on(s) to the owner",
            self.required.len()
        );
        self.exchange.phase = ExchangePhase::AwaitingOwnerReply;
        self.exchange.started_at = Some(now);
        self.exchange.retry_sent = false;

        vec![
            Action::Send(self.report()),
            Action::schedule(TimerKey::ExchangeRetry, self.exchange_timeout / 2),
            Action::schedule(TimerKey::ExchangeTimeout, self.exchange_timeout),
            Action::notify("Checking mods with host...", Severity::Info),
        ]
    }

    /// Handle a decoded message.
    pub fn on_message(&mut self, message: &SyncMessage) -> Vec<Action> {
        if message.name() != self.name {
            return Vec::new();
        }

        match message {
            SyncMessage::RequestMods { .. } => {
                debug!("owner requested our list");
                vec![Action::Send(self.report())]
            }
            SyncMessage::ModsMatch { .. } => self.on_match(),
            SyncMessage::ModsMismatch { missing, .. } => self.on_mismatch(missing),
            SyncMessage::ClientMods { .. } | SyncMessage::Test { .. } => Vec::new(),
        }
    }

    /// Handle an expired timer.
    pub fn on_timer(&mut self, key: &TimerKey, gameplay_active: bool) -> Vec<Action> {
        match key {
            TimerKey::ExchangeRetry => self.on_retry(gameplay_active),
            TimerKey::ExchangeTimeout => self.on_timeout(gameplay_active),
            TimerKey::SelfRemoval => self.on_self_removal(gameplay_active),
            _ => Vec::new(),
        }
    }

    /// Record that gameplay has started.
    pub fn note_gameplay_started(&mut self) {
        if self.exchange.phase == ExchangePhase::AwaitingOwnerReply || self.exchange.removal_pending
        {
            self.exchange.gameplay_seen = true;
        }
    }

    fn report(&self) -> SyncMessage {
        SyncMessage::ClientMods {
            name: self.name.clone(),
            entries: self.required.to_vec(),
        }
    }

    fn finish(&mut self, outcome: Outcome) -> Vec<Action> {
        self.exchange.phase = ExchangePhase::Done(outcome);
        vec![
            Action::Cancel(TimerKey::ExchangeRetry),
            Action::Cancel(TimerKey::ExchangeTimeout),
        ]
    }

    fn schedule_removal(&mut self, gameplay_active: bool) -> Action {
        self.exchange.removal_pending = true;
        if gameplay_active {
            self.exchange.gameplay_seen = true;
        }
        Action::schedule(TimerKey::SelfRemoval, self.self_removal_grace)
    }

    fn on_match(&mut self) -> Vec<Action> {
        if self.exchange.phase != ExchangePhase::AwaitingOwnerReply {
            debug!("ignoring verdict in phase {:?}", self.exchange.phase);
            return Vec::new();
        }

        info!("owner confirmed matching add-ons");
        let mut actions = self.finish(Outcome::Success);
        actions.push(Action::notify(
            "ModSync done! You have the correct mods.",
            Severity::Success,
        ));
        actions
    }

    fn on_mismatch(&mut self, missing: &[String]) -> Vec<Action> {
        if self.exchange.phase != ExchangePhase::AwaitingOwnerReply {
            debug!("ignoring verdict in phase {:?}", self.exchange.phase);
            return Vec::new();
        }

        let mut actions = self.finish(Outcome::Failure);

        // Ids we require ourselves can only be in the list because the owner
        // lacks them. Older peers send names instead of ids.
        let owner_lacks: Vec<&str> = self
            .required
            .iter()
            .filter(|d| missing.iter().any(|m| *m == d.id || *m == d.name))
            .map(|d| d.name.as_str())
            .collect();
        let we_lack: Vec<&str> = missing
            .iter()
            .filter(|m| !self.required.contains_id(m) && !self.required.contains_name(m))
            .map(String::as_str)
            .collect();

        if owner_lacks.is_empty() {
            warn!("missing add-ons required by the owner: {}", we_lack.join(", "));
            actions.push(Action::notify(
                format!("You are missing mods: {}", we_lack.join(", ")),
                Severity::Error,
            ));
            return actions;
        }

        warn!("owner lacks required add-ons: {}", owner_lacks.join(", "));
        let mut message = format!(
            "Mod sync failed: host is missing required mods: {}",
            owner_lacks.join(", ")
        );
        if !we_lack.is_empty() {
            message.push_str(&format!("; you are missing: {}", we_lack.join(", ")));
        }
        actions.push(Action::notify(message, Severity::Error));
        actions.push(self.schedule_removal(false));
        actions
    }

    fn on_retry(&mut self, gameplay_active: bool) -> Vec<Action> {
        if self.exchange.phase != ExchangePhase::AwaitingOwnerReply || self.exchange.retry_sent {
            return Vec::new();
        }
        if gameplay_active {
            debug!("skipping midpoint resend during gameplay");
            return Vec::new();
        }

        debug!("no verdict yet, resending list");
        self.exchange.retry_sent = true;
        vec![Action::Send(self.report())]
    }

    fn on_timeout(&mut self, gameplay_active: bool) -> Vec<Action> {
        if self.exchange.phase != ExchangePhase::AwaitingOwnerReply {
            return Vec::new();
        }

        warn!("owner did not answer within {:?}", self.exchange_timeout);
        let mut actions = self.finish(Outcome::Failure);
        actions.push(Action::notify(
            "Mod sync failed: no response from host",
            Severity::Error,
        ));
        if self.leave_on_timeout {
            actions.push(self.schedule_removal(gameplay_active));
        }
        actions
    }

    fn on_self_removal(&mut self, gameplay_active: bool) -> Vec<Action> {
        if !self.exchange.removal_pending {
            return Vec::new();
        }
        self.exchange.removal_pending = false;

        let kind = if self.exchange.gameplay_seen || gameplay_active {
            LeaveKind::ActiveGame
        } else {
            LeaveKind::Lobby
        };
        info!("leaving session ({kind:?})");
        vec![Action::Leave(kind)]
    }
}
