//! The per-participant protocol context.
//!
//! A [`SyncSession`] owns every piece of protocol state for one local
//! participant. The host drives it from its own loop:
//!
//! ```rust
//! use std::time::Instant;
//! use modsync::prelude::*;
//!
//! # struct Host;
//! # impl AddOnRegistry for Host { fn list_local_add_ons(&self) -> Vec<AddOnDescriptor> { Vec::new() } }
//! # impl SessionProvider for Host {
//! #     fn session_id(&self) -> Option<SessionId> { None }
//! #     fn role(&self) -> Role { Role::Unaffiliated }
//! #     fn local_name(&self) -> String { "Me".into() }
//! #     fn owner_name(&self) -> Option<String> { None }
//! #     fn gameplay_active(&self) -> bool { false }
//! #     fn leave(&mut self, _kind: LeaveKind) {}
//! # }
//! # impl ChatTransport for Host { fn send(&mut self, _line: &str) -> Result<(), TransportError> { Ok(()) } }
//! # impl Roster for Host {
//! #     fn current_participants(&self) -> Vec<String> { Vec::new() }
//! #     fn evict(&mut self, name: &str) -> Result<(), EvictError> { Err(EvictError::NotFound(name.into())) }
//! # }
//! # impl Notifier for Host { fn notify(&mut self, _message: &str, _severity: Severity) {} }
//! let mut host = Host;
//! let mut session = SyncSession::new(SyncConfig::default());
//!
//! // every frame
//! session.tick(Instant::now(), &mut host);
//!
//! // for every inbound chat line
//! let _ = session.on_receive("hello", Instant::now(), &mut host);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use log::{debug, info, warn};

use super::config::SyncConfig;
use crate::client::{ExchangePhase, Participant};
use crate::core::{
    DEBUG_LINE_PREFIX, DecodeError, HostEnvironment, Role, SessionId, Severity, ToggleError,
};
use crate::server::{Owner, ToggleOutcome};
use crate::sync::{Action, NameAnchors, RequiredSet, SyncMessage, decode, is_protocol_line};
use crate::transport::{Delivery, EchoGuard, Outbox, RetryOutcome, TimerKey, TimerQueue};

/// Role-specific state.
#[derive(Debug, Clone, Default)]
enum RoleState {
    #[default]
    Idle,
    Participant(Participant),
    Owner(Owner),
}

/// Snapshot of a session, for display and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Detected role.
    pub role: Role,
    /// Detected session identity.
    pub session_id: Option<SessionId>,
    /// Participant exchange phase, when participating.
    pub phase: Option<ExchangePhase>,
    /// Owner enforcement flag, when owning.
    pub enforcement: bool,
    /// Participants tracked by the owner.
    pub peers: usize,
    /// Whether gameplay is active.
    pub gameplay: bool,
    /// Lines waiting for the chat channel.
    pub pending_lines: usize,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role={}", self.role)?;
        if let Some(id) = self.session_id {
            write!(f, " session={id}")?;
        }
        match self.role {
            Role::Owner => write!(
                f,
                " enforcement={} peers={}",
                if self.enforcement { "on" } else { "off" },
                self.peers
            )?,
            Role::Participant => {
                if let Some(phase) = self.phase {
                    write!(f, " phase={phase:?}")?;
                }
            }
            Role::Unaffiliated => {}
        }
        if self.gameplay {
            f.write_str(" gameplay")?;
        }
        if self.pending_lines > 0 {
            write!(f, " pending={}", self.pending_lines)?;
        }
        Ok(())
    }
}

/// Protocol context for one local participant.
#[derive(Debug, Clone)]
pub struct SyncSession {
    config: SyncConfig,
    role: Role,
    session_id: Option<SessionId>,
    state: RoleState,
    timers: TimerQueue,
    outbox: Outbox,
    echo: EchoGuard,
    gameplay: bool,
    next_role_check: Option<Instant>,
    next_roster_poll: Option<Instant>,
}

impl SyncSession {
    /// Create an unaffiliated session. The first [`tick`](Self::tick)
    /// detects the role.
    pub fn new(config: SyncConfig) -> Self {
        let outbox = Outbox::new(config.send_max_retries);
        let echo = EchoGuard::new(config.echo_window);
        Self {
            config,
            role: Role::Unaffiliated,
            session_id: None,
            state: RoleState::Idle,
            timers: TimerQueue::new(),
            outbox,
            echo,
            gameplay: false,
            next_role_check: None,
            next_roster_poll: None,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Detected role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Participant state, when participating.
    pub fn participant(&self) -> Option<&Participant> {
        match &self.state {
            RoleState::Participant(p) => Some(p),
            _ => None,
        }
    }

    /// Owner state, when owning.
    pub fn owner(&self) -> Option<&Owner> {
        match &self.state {
            RoleState::Owner(o) => Some(o),
            _ => None,
        }
    }

    /// Armed deadlines.
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Current snapshot.
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            role: self.role,
            session_id: self.session_id,
            phase: self.participant().map(Participant::phase),
            enforcement: self.owner().is_some_and(Owner::enforcement_enabled),
            peers: self.owner().map_or(0, |o| o.peers().len()),
            gameplay: self.gameplay,
            pending_lines: self.outbox.pending_len(),
        }
    }

    /// Advance the session to `now`.
    ///
    /// Detects gameplay transitions, re-derives the role when due, polls the
    /// roster (owner) and fires expired timers.
    pub fn tick<E: HostEnvironment + ?Sized>(&mut self, now: Instant, env: &mut E) {
        let gameplay = env.gameplay_active();
        if gameplay && !self.gameplay {
            self.on_gameplay_started();
        } else if !gameplay && self.gameplay {
            self.on_gameplay_ended();
        }

        if self.next_role_check.is_none_or(|due| now >= due) {
            self.next_role_check = Some(now + self.config.role_check_interval);
            self.detect_role(now, env);
        }

        if self.gameplay {
            let expired = self
                .timers
                .poll_expired(now, TimerKey::fires_during_gameplay);
            self.fire(expired, now, env);
            return;
        }

        if matches!(self.state, RoleState::Owner(_))
            && self.next_roster_poll.is_none_or(|due| now >= due)
        {
            self.next_roster_poll = Some(now + self.config.roster_poll_interval);
            let roster = env.current_participants();
            if let RoleState::Owner(owner) = &mut self.state {
                let actions = owner.on_roster(&roster, now);
                self.apply(actions, now, env);
            }
        }

        let expired = self.timers.poll_expired(now, |_| true);
        self.fire(expired, now, env);
    }

    /// Handle one inbound chat line.
    ///
    /// Ordinary chat is ignored. A protocol line that cannot be decoded is
    /// logged, dropped and reported back.
    pub fn on_receive<E: HostEnvironment + ?Sized>(
        &mut self,
        line: &str,
        now: Instant,
        env: &mut E,
    ) -> Result<(), DecodeError> {
        if !is_protocol_line(line) {
            return Ok(());
        }
        if self.gameplay || env.gameplay_active() {
            debug!("gameplay active, dropping inbound line");
            return Ok(());
        }
        if self.echo.is_echo(line, now) {
            debug!("dropping echo of our own line");
            return Ok(());
        }

        let roster = env.current_participants();
        let owner = env.owner_name();
        let local = env.local_name();
        let anchors = NameAnchors {
            roster: &roster,
            owner: owner.as_deref(),
            local: Some(&local),
        };
        let decoded = decode(line, &anchors).inspect_err(|err| {
            warn!("dropping protocol line {line:?}: {err}");
        })?;
        debug!(
            "received {} for {:?} (anchored by {:?})",
            decoded.message.command().as_str(),
            decoded.message.name(),
            decoded.anchor
        );

        let actions = match (&decoded.message, &mut self.state) {
            (SyncMessage::Test { payload, .. }, _) => {
                vec![Action::notify(
                    format!("Chat test received: {payload}"),
                    Severity::Info,
                )]
            }
            (message, RoleState::Participant(p)) => p.on_message(message),
            (message, RoleState::Owner(o)) => o.on_message(message, now),
            (_, RoleState::Idle) => Vec::new(),
        };
        self.apply(actions, now, env);
        Ok(())
    }

    /// Flip owner enforcement.
    pub fn toggle_enforcement<E: HostEnvironment + ?Sized>(
        &mut self,
        now: Instant,
        env: &mut E,
    ) -> Result<ToggleOutcome, ToggleError> {
        if self.gameplay || env.gameplay_active() {
            return Err(ToggleError::GameplayActive);
        }
        let RoleState::Owner(owner) = &mut self.state else {
            return Err(ToggleError::NotOwner);
        };

        let (outcome, actions) = owner.toggle_enforcement(now);
        self.apply(actions, now, env);
        Ok(outcome)
    }

    /// Send a `TEST` line carrying `payload`.
    pub fn send_test<E: HostEnvironment + ?Sized>(
        &mut self,
        payload: &str,
        now: Instant,
        env: &mut E,
    ) -> Delivery {
        if self.gameplay || env.gameplay_active() {
            debug!("gameplay active, not sending test line");
            return Delivery::Dropped;
        }
        let message = SyncMessage::Test {
            name: env.local_name(),
            payload: payload.to_string(),
        };
        self.send_message(&message, now, env)
    }

    fn on_gameplay_started(&mut self) {
        info!("gameplay started, protocol frozen");
        self.gameplay = true;
        if let RoleState::Participant(p) = &mut self.state {
            p.note_gameplay_started();
        }
    }

    fn on_gameplay_ended(&mut self) {
        info!("gameplay ended, resetting");
        self.gameplay = false;
        self.teardown();
        self.role = Role::Unaffiliated;
        self.session_id = None;
        self.next_role_check = None;
    }

    fn teardown(&mut self) {
        self.timers.clear();
        self.outbox.clear();
        self.echo.clear();
        self.state = RoleState::Idle;
        self.next_roster_poll = None;
    }

    fn detect_role<E: HostEnvironment + ?Sized>(&mut self, now: Instant, env: &mut E) {
        let role = env.role();
        let session_id = env.session_id();
        if role == self.role && session_id == self.session_id {
            return;
        }

        info!(
            "role {} -> {role} (session {})",
            self.role,
            session_id.map_or_else(|| "none".to_string(), |id| id.to_string())
        );
        self.teardown();
        self.role = role;
        self.session_id = session_id;

        if self.gameplay {
            // restarted once gameplay ends
            return;
        }

        let actions = match role {
            Role::Unaffiliated => Vec::new(),
            Role::Participant => {
                let mut participant =
                    Participant::new(env.local_name(), self.required_set(env), &self.config);
                let actions = participant.start(now, env.owner_has_sync());
                self.state = RoleState::Participant(participant);
                actions
            }
            Role::Owner => {
                let mut owner = Owner::new(env.local_name(), self.required_set(env), &self.config);
                let actions = owner.start();
                self.state = RoleState::Owner(owner);
                actions
            }
        };
        self.apply(actions, now, env);
    }

    fn required_set<E: HostEnvironment + ?Sized>(&self, env: &E) -> RequiredSet {
        let local = env.list_local_add_ons();
        RequiredSet::from_descriptors(&local, &self.config.self_id)
    }

    fn fire<E: HostEnvironment + ?Sized>(&mut self, expired: Vec<TimerKey>, now: Instant, env: &mut E) {
        for key in expired {
            debug!("timer {key} fired");
            let actions = if key == TimerKey::SendRetry {
                self.retry_outbox(env)
            } else {
                let gameplay = self.gameplay;
                match &mut self.state {
                    RoleState::Participant(p) => p.on_timer(&key, gameplay),
                    RoleState::Owner(o) => o.on_timer(&key, now),
                    RoleState::Idle => Vec::new(),
                }
            };
            self.apply(actions, now, env);
        }
    }

    fn retry_outbox<E: HostEnvironment + ?Sized>(&mut self, env: &mut E) -> Vec<Action> {
        match self.outbox.retry(env) {
            RetryOutcome::Pending => vec![Action::schedule(
                TimerKey::SendRetry,
                self.config.send_retry_backoff,
            )],
            RetryOutcome::GaveUp { first: true, .. } => vec![Action::notify(
                "Chat error: unable to send ModSync messages",
                Severity::Warning,
            )],
            RetryOutcome::GaveUp { first: false, .. }
            | RetryOutcome::Flushed
            | RetryOutcome::Idle => Vec::new(),
        }
    }

    fn apply<E: HostEnvironment + ?Sized>(&mut self, actions: Vec<Action>, now: Instant, env: &mut E) {
        let mut queue = VecDeque::from(actions);

        while let Some(action) = queue.pop_front() {
            match action {
                Action::Send(message) => {
                    if self.gameplay {
                        debug!("gameplay active, dropping {}", message.command().as_str());
                        continue;
                    }
                    self.send_message(&message, now, env);
                }
                Action::Notify { message, severity } => {
                    debug!("notify [{severity:?}] {message}");
                    env.notify(&message, severity);
                }
                Action::Schedule { timer, after } => self.timers.schedule(timer, now, after),
                Action::Cancel(timer) => {
                    self.timers.cancel(&timer);
                }
                Action::CancelPeer(peer) => self.timers.cancel_peer(&peer),
                Action::Evict {
                    participant,
                    attempt,
                } => {
                    info!("evicting {participant} (attempt {attempt})");
                    let result = env.evict(&participant);
                    if let RoleState::Owner(owner) = &mut self.state {
                        queue.extend(owner.on_evict_result(&participant, attempt, result, now));
                    }
                }
                Action::Leave(kind) => {
                    info!("leaving session ({kind:?})");
                    env.leave(kind);
                }
                Action::Advertise => env.advertise_sync(),
            }
        }
    }

    fn send_message<E: HostEnvironment + ?Sized>(
        &mut self,
        message: &SyncMessage,
        now: Instant,
        env: &mut E,
    ) -> Delivery {
        let line = message.encode();
        debug!("sending {line}");
        self.echo.record(&line, now);
        let delivery = self.send_line(line, now, env);

        if self.config.debug_chat {
            let mirror = format!(
                "{DEBUG_LINE_PREFIX}{} for {}",
                message.command().as_str(),
                message.name()
            );
            self.send_line(mirror, now, env);
        }
        delivery
    }

    fn send_line<E: HostEnvironment + ?Sized>(&mut self, line: String, now: Instant, env: &mut E) -> Delivery {
        let delivery = self.outbox.send(env, line);
        if delivery == Delivery::Queued && !self.timers.is_armed(&TimerKey::SendRetry) {
            self.timers
                .schedule(TimerKey::SendRetry, now, self.config.send_retry_backoff);
        }
        delivery
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let status = SyncStatus {
            role: Role::Owner,
            session_id: Some(SessionId(0xabc)),
            phase: None,
            enforcement: true,
            peers: 2,
            gameplay: false,
            pending_lines: 0,
        };
        assert_eq!(
            status.to_string(),
            "role=owner session=0000000000000abc enforcement=on peers=2"
        );

        let status = SyncStatus {
            role: Role::Participant,
            session_id: None,
            phase: Some(ExchangePhase::AwaitingOwnerReply),
            enforcement: false,
            peers: 0,
            gameplay: true,
            pending_lines: 1,
        };
        assert_eq!(
            status.to_string(),
            "role=participant phase=AwaitingOwnerReply gameplay pending=1"
        );
    }

    #[test]
    fn test_new_session_is_unaffiliated() {
        let session = SyncSession::new(SyncConfig::default());
        let status = session.status();
        assert_eq!(status.role, Role::Unaffiliated);
        assert_eq!(status.to_string(), "role=unaffiliated");
        assert!(session.timers().is_empty());
    }
}
