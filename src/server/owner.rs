//! Owner side: responder and enforcer.
//!
//! The owner answers every `CLIENT_MODS` with a verdict, requests lists from
//! participants while enforcement is on, and evicts those that mismatch or
//! stay silent past their deadline.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::enforcement::{EnforcementState, ToggleOutcome};
use super::session::{PeerTable, RosterDiff};
use crate::core::{AddOnDescriptor, EvictError, Severity};
use crate::session::SyncConfig;
use crate::sync::{Action, RequiredSet, SyncMessage, compare};
use crate::transport::TimerKey;

/// Responder/enforcer role.
#[derive(Debug, Clone)]
pub struct Owner {
    name: String,
    required: RequiredSet,
    peers: PeerTable,
    enforcement: EnforcementState,
    self_id: String,
    peer_response_timeout: Duration,
    evict_retry_delay: Duration,
}

impl Owner {
    /// Create an owner named `name` requiring `required`. Enforcement starts off.
    pub fn new(name: impl Into<String>, required: RequiredSet, config: &SyncConfig) -> Self {
        Self {
            name: name.into(),
            required,
            peers: PeerTable::new(config.peer_response_timeout),
            enforcement: EnforcementState::new(config.toggle_cooldown),
            self_id: config.self_id.clone(),
            peer_response_timeout: config.peer_response_timeout,
            evict_retry_delay: config.evict_retry_delay,
        }
    }

    /// Local display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required add-ons of this session.
    pub fn required(&self) -> &RequiredSet {
        &self.required
    }

    /// Participant records.
    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    /// Whether enforcement is on.
    pub fn enforcement_enabled(&self) -> bool {
        self.enforcement.is_enabled()
    }

    /// Advertise ModSync and announce the session's requirements.
    pub fn start(&mut self) -> Vec<Action> {
        let mods = if self.required.is_empty() {
            "None".to_string()
        } else {
            self.required.display_names()
        };
        info!("owning session, required add-ons: {mods}");

        vec![
            Action::Advertise,
            Action::notify(format!("Created lobby with mods: {mods}"), Severity::Info),
            self.lock_notice(),
        ]
    }

    /// Reconcile with a roster snapshot.
    pub fn on_roster(&mut self, roster: &[String], now: Instant) -> Vec<Action> {
        let RosterDiff { joined, left } = self.peers.observe(roster, &self.name, now);
        let mut actions = Vec::new();

        for name in left {
            debug!("{name} left the session");
            actions.push(Action::CancelPeer(name));
        }

        for name in joined {
            debug!("{name} joined the session");
            let has_list = self
                .peers
                .get(&name)
                .is_some_and(|r| r.received_list.is_some());
            if self.enforcement.is_enabled() && !has_list {
                actions.extend(self.request(&name, now));
            }
        }

        actions
    }

    /// Handle a decoded message.
    pub fn on_message(&mut self, message: &SyncMessage, now: Instant) -> Vec<Action> {
        match message {
            SyncMessage::RequestMods { name } if *name != self.name => {
                debug!("{name} asked for the owner's list");
                vec![Action::Send(SyncMessage::ClientMods {
                    name: self.name.clone(),
                    entries: self.required.to_vec(),
                })]
            }
            SyncMessage::ClientMods { name, entries } if *name != self.name => {
                self.on_client_mods(name, entries, now)
            }
            _ => Vec::new(),
        }
    }

    /// Handle an expired timer.
    pub fn on_timer(&mut self, key: &TimerKey, now: Instant) -> Vec<Action> {
        match key {
            TimerKey::PeerRetry(name) => self.on_peer_retry(name),
            TimerKey::PeerDeadline(name) => self.on_peer_deadline(name, now),
            TimerKey::EvictRetry(name) => self.on_evict_retry(name),
            _ => Vec::new(),
        }
    }

    /// Feed back the result of an [`Action::Evict`].
    pub fn on_evict_result(
        &mut self,
        participant: &str,
        attempt: u32,
        result: Result<(), EvictError>,
        now: Instant,
    ) -> Vec<Action> {
        match result {
            Ok(()) => {
                info!("evicted {participant}");
                // a later join starts from a clean record
                self.peers.forget_evicted(participant, now);
                vec![Action::CancelPeer(participant.to_string())]
            }
            Err(err @ EvictError::NotFound(_)) if attempt <= 1 => {
                debug!("{err}, retrying in {:?}", self.evict_retry_delay);
                vec![Action::schedule(
                    TimerKey::EvictRetry(participant.to_string()),
                    self.evict_retry_delay,
                )]
            }
            Err(err) => {
                warn!("giving up on evicting {participant}: {err}");
                vec![Action::notify(
                    format!("Could not kick {participant}: {err}"),
                    Severity::Warning,
                )]
            }
        }
    }

    /// Flip enforcement, honouring the cooldown.
    pub fn toggle_enforcement(&mut self, now: Instant) -> (ToggleOutcome, Vec<Action>) {
        let outcome = self.enforcement.toggle(now);
        let mut actions = match outcome {
            ToggleOutcome::Enabled => self.on_enabled(now),
            ToggleOutcome::Disabled => self.on_disabled(),
            ToggleOutcome::Cooldown => return (outcome, Vec::new()),
        };
        info!("enforcement {outcome}");
        actions.push(self.lock_notice());
        (outcome, actions)
    }

    fn lock_notice(&self) -> Action {
        if self.enforcement.is_enabled() {
            Action::notify("Lobby lock enabled", Severity::Success)
        } else {
            Action::notify("Lobby lock disabled", Severity::Warning)
        }
    }

    fn request(&mut self, name: &str, now: Instant) -> Vec<Action> {
        let Some(record) = self.peers.get_mut(name) else {
            return Vec::new();
        };
        record.begin_request(now, self.peer_response_timeout);

        vec![
            Action::Send(SyncMessage::RequestMods {
                name: name.to_string(),
            }),
            Action::schedule(
                TimerKey::PeerRetry(name.to_string()),
                self.peer_response_timeout / 2,
            ),
            Action::schedule(
                TimerKey::PeerDeadline(name.to_string()),
                self.peer_response_timeout,
            ),
        ]
    }

    fn on_client_mods(
        &mut self,
        name: &str,
        entries: &[AddOnDescriptor],
        now: Instant,
    ) -> Vec<Action> {
        if self.peers.is_departed(name) {
            debug!("ignoring list from evicted {name}");
            return Vec::new();
        }
        let record = self.peers.ensure(name, now);
        record.received_list = Some(entries.to_vec());

        let mut actions = Vec::new();
        if record.clear_request() {
            actions.push(Action::Cancel(TimerKey::PeerRetry(name.to_string())));
            actions.push(Action::Cancel(TimerKey::PeerDeadline(name.to_string())));
        }

        if record.processed {
            debug!("duplicate list from {name}, already answered");
            return actions;
        }

        actions.extend(self.evaluate(name));
        actions
    }

    /// Judge the cached list of `name`, reply, and enforce.
    fn evaluate(&mut self, name: &str) -> Vec<Action> {
        let enforcing = self.enforcement.is_enabled();
        let Some(record) = self.peers.get_mut(name) else {
            return Vec::new();
        };
        let Some(list) = record.received_list.as_ref() else {
            return Vec::new();
        };

        let peer = RequiredSet::from_descriptors(list, &self.self_id);
        let comparison = compare(&self.required, &peer);
        record.processed = true;

        if comparison.is_match() {
            info!("{name} has matching add-ons");
            return vec![
                Action::Send(SyncMessage::ModsMatch {
                    name: name.to_string(),
                }),
                Action::notify(format!("{name} joined with required mods."), Severity::Success),
            ];
        }

        let detail = comparison.describe();
        warn!("{name} mismatched add-ons ({detail})");
        let mut actions = vec![Action::Send(SyncMessage::ModsMismatch {
            name: name.to_string(),
            missing: comparison.mismatched_ids(),
        })];

        if enforcing && !record.evicted {
            record.evicted = true;
            actions.push(Action::notify(
                format!("Kicking {name} for mismatched mods ({detail})"),
                Severity::Error,
            ));
            actions.push(Action::Evict {
                participant: name.to_string(),
                attempt: 1,
            });
        } else {
            actions.push(Action::notify(
                format!("{name} joined without required mods ({detail})"),
                Severity::Warning,
            ));
        }
        actions
    }

    fn on_peer_retry(&mut self, name: &str) -> Vec<Action> {
        let enforcing = self.enforcement.is_enabled();
        let Some(record) = self.peers.get_mut(name) else {
            return Vec::new();
        };
        if !enforcing || !record.is_awaiting() || record.retry_sent {
            return Vec::new();
        }

        debug!("no list from {name} yet, asking again");
        record.retry_sent = true;
        vec![Action::Send(SyncMessage::RequestMods {
            name: name.to_string(),
        })]
    }

    fn on_peer_deadline(&mut self, name: &str, now: Instant) -> Vec<Action> {
        let enforcing = self.enforcement.is_enabled();
        let Some(record) = self.peers.get_mut(name) else {
            return Vec::new();
        };
        if !record.response_deadline.is_some_and(|deadline| deadline <= now) {
            return Vec::new();
        }
        record.clear_request();

        if !enforcing || record.evicted {
            return Vec::new();
        }

        warn!("{name} did not report within {:?}", self.peer_response_timeout);
        record.evicted = true;
        vec![
            Action::notify(
                format!("{name} timed out - no ModSync response. Kicking."),
                Severity::Error,
            ),
            Action::Evict {
                participant: name.to_string(),
                attempt: 1,
            },
        ]
    }

    fn on_evict_retry(&mut self, name: &str) -> Vec<Action> {
        if !self.enforcement.is_enabled() || self.peers.get(name).is_none() {
            return Vec::new();
        }
        vec![Action::Evict {
            participant: name.to_string(),
            attempt: 2,
        }]
    }

    fn on_enabled(&mut self, now: Instant) -> Vec<Action> {
        let mut actions = Vec::new();

        for name in self.peers.names() {
            let Some(record) = self.peers.get_mut(&name) else {
                continue;
            };
            if record.evicted {
                continue;
            }
            record.processed = false;

            if record.received_list.is_some() {
                actions.extend(self.evaluate(&name));
            } else if record.in_roster {
                actions.extend(self.request(&name, now));
            }
        }

        actions
    }

    fn on_disabled(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        for record in self.peers.iter_mut() {
            record.clear_request();
            record.processed = false;
            actions.push(Action::CancelPeer(record.name.clone()));
        }
        actions
    }
}
