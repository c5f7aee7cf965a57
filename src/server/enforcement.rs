//! Enforcement ("lobby lock") flag.

use std::fmt;
use std::time::{Duration, Instant};

/// Result of a local toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Enforcement is now on.
    Enabled,
    /// Enforcement is now off.
    Disabled,
    /// Ignored: the previous toggle was too recent.
    Cooldown,
}

impl fmt::Display for ToggleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToggleOutcome::Enabled => "enabled",
            ToggleOutcome::Disabled => "disabled",
            ToggleOutcome::Cooldown => "cooldown",
        })
    }
}

/// Whether non-compliant participants are evicted.
#[derive(Debug, Clone)]
pub struct EnforcementState {
    enabled: bool,
    last_toggle: Option<Instant>,
    cooldown: Duration,
}

impl EnforcementState {
    /// Create a disabled state with the given toggle cooldown.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            enabled: false,
            last_toggle: None,
            cooldown,
        }
    }

    /// Whether enforcement is on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flip the flag unless the last flip was within the cooldown.
    pub fn toggle(&mut self, now: Instant) -> ToggleOutcome {
        if let Some(last) = self.last_toggle {
            if now.saturating_duration_since(last) < self.cooldown {
                return ToggleOutcome::Cooldown;
            }
        }

        self.last_toggle = Some(now);
        self.enabled = !self.enabled;
        if self.enabled {
            ToggleOutcome::Enabled
        } else {
            ToggleOutcome::Disabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_with_cooldown() {
        let start = Instant::now();
        let mut state = EnforcementState::new(Duration::from_millis(500));
        assert!(!state.is_enabled());

        assert_eq!(state.toggle(start), ToggleOutcome::Enabled);
        assert_eq!(state.toggle(start + Duration::from_millis(200)), ToggleOutcome::Cooldown);
        assert!(state.is_enabled());

        assert_eq!(state.toggle(start + Duration::from_millis(600)), ToggleOutcome::Disabled);
        assert!(!state.is_enabled());
    }
}
