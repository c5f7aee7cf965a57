//! Session configuration.

use std::time::Duration;

use crate::core::{
    ECHO_WINDOW, EVICT_RETRY_DELAY, EXCHANGE_TIMEOUT, PEER_RESPONSE_TIMEOUT, ROLE_CHECK_INTERVAL,
    ROSTER_POLL_INTERVAL, SELF_ID, SELF_REMOVAL_GRACE, SEND_MAX_RETRIES, SEND_RETRY_BACKOFF,
    SyncError, TOGGLE_COOLDOWN,
};

/// Tunables for a [`SyncSession`](super::SyncSession).
///
/// The defaults are the values unmodified peers use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Id of the tool itself, excluded from every comparison.
    pub self_id: String,

    /// Participant wait for the owner's verdict. Resent once at the midpoint.
    pub exchange_timeout: Duration,

    /// Owner wait for `CLIENT_MODS`. Resent once at the midpoint.
    pub peer_response_timeout: Duration,

    /// Role and session re-detection period.
    pub role_check_interval: Duration,

    /// Owner roster polling period.
    pub roster_poll_interval: Duration,

    /// Delay before a participant removes itself.
    pub self_removal_grace: Duration,

    /// Delay before the single eviction retry.
    pub evict_retry_delay: Duration,

    /// Backoff while the chat channel is unavailable.
    pub send_retry_backoff: Duration,

    /// Resend attempts while the chat channel is unavailable.
    pub send_max_retries: u32,

    /// Window in which a repeated enforcement toggle is a no-op.
    pub toggle_cooldown: Duration,

    /// Window for recognizing our own lines looped back by the channel.
    pub echo_window: Duration,

    /// Whether a participant leaves after an exchange timeout.
    pub leave_on_timeout: bool,

    /// Mirror every protocol line with a visible `DEBUG: ...` chat line.
    pub debug_chat: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            self_id: SELF_ID.to_string(),
            exchange_timeout: EXCHANGE_TIMEOUT,
            peer_response_timeout: PEER_RESPONSE_TIMEOUT,
            role_check_interval: ROLE_CHECK_INTERVAL,
            roster_poll_interval: ROSTER_POLL_INTERVAL,
            self_removal_grace: SELF_REMOVAL_GRACE,
            evict_retry_delay: EVICT_RETRY_DELAY,
            send_retry_backoff: SEND_RETRY_BACKOFF,
            send_max_retries: SEND_MAX_RETRIES,
            toggle_cooldown: TOGGLE_COOLDOWN,
            echo_window: ECHO_WINDOW,
            leave_on_timeout: true,
            debug_chat: false,
        }
    }
}

impl SyncConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::new()
    }

    /// Check the configuration for values that would stall the protocol.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.self_id.trim().is_empty() {
            return Err(SyncError::Config("self_id must not be empty".into()));
        }
        let non_zero = [
            ("exchange_timeout", self.exchange_timeout),
            ("peer_response_timeout", self.peer_response_timeout),
            ("role_check_interval", self.role_check_interval),
            ("roster_poll_interval", self.roster_poll_interval),
            ("send_retry_backoff", self.send_retry_backoff),
        ];
        if let Some((field, _)) = non_zero.iter().find(|(_, value)| value.is_zero()) {
            return Err(SyncError::Config(format!("{field} must be non-zero")));
        }
        Ok(())
    }
}

/// Builder for [`SyncConfig`].
#[derive(Debug)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    /// Create a builder holding the defaults.
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
        }
    }

    /// Set the tool's own id.
    pub fn self_id(mut self, id: impl Into<String>) -> Self {
        self.config.self_id = id.into();
        self
    }

    /// Set the participant exchange timeout.
    pub fn exchange_timeout(mut self, timeout: Duration) -> Self {
        self.config.exchange_timeout = timeout;
        self
    }

    /// Set the owner's per-participant response timeout.
    pub fn peer_response_timeout(mut self, timeout: Duration) -> Self {
        self.config.peer_response_timeout = timeout;
        self
    }

    /// Set the role re-detection period.
    pub fn role_check_interval(mut self, interval: Duration) -> Self {
        self.config.role_check_interval = interval;
        self
    }

    /// Set the roster polling period.
    pub fn roster_poll_interval(mut self, interval: Duration) -> Self {
        self.config.roster_poll_interval = interval;
        self
    }

    /// Set the self-removal grace period.
    pub fn self_removal_grace(mut self, grace: Duration) -> Self {
        self.config.self_removal_grace = grace;
        self
    }

    /// Set the eviction retry delay.
    pub fn evict_retry_delay(mut self, delay: Duration) -> Self {
        self.config.evict_retry_delay = delay;
        self
    }

    /// Set the backoff and budget for unavailable-channel retries.
    pub fn send_retry(mut self, backoff: Duration, max_retries: u32) -> Self {
        self.config.send_retry_backoff = backoff;
        self.config.send_max_retries = max_retries;
        self
    }

    /// Set the enforcement toggle cooldown.
    pub fn toggle_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.toggle_cooldown = cooldown;
        self
    }

    /// Set the echo suppression window.
    pub fn echo_window(mut self, window: Duration) -> Self {
        self.config.echo_window = window;
        self
    }

    /// Leave the session after an exchange timeout.
    pub fn leave_on_timeout(mut self, enabled: bool) -> Self {
        self.config.leave_on_timeout = enabled;
        self
    }

    /// Mirror protocol lines in visible chat.
    pub fn debug_chat(mut self, enabled: bool) -> Self {
        self.config.debug_chat = enabled;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<SyncConfig, SyncError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
