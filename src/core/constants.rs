//! Protocol constants for ModSync.
//!
//! Wire tokens MUST NOT be changed: unmodified peers match on them verbatim.

use std::time::Duration;

// =============================================================================
// IDENTITY
// =============================================================================

/// Identifier of the synchronization tool itself.
///
/// Always excluded from comparison on both sides.
pub const SELF_ID: &str = "com.magearena.modsync";

/// Display name of the synchronization tool.
pub const SELF_NAME: &str = "ModSync";

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Marker that distinguishes protocol lines from ordinary chat.
pub const PREFIX: &str = "[MODSYNC]";

/// Separator between command, name and payload fields.
pub const FIELD_SEPARATOR: char = ':';

/// Separator between descriptor entries in a `CLIENT_MODS` payload.
pub const ENTRY_SEPARATOR: char = ';';

/// Field separator used by older peers inside an entry (`id|name|scope`).
pub const LEGACY_ENTRY_FIELD_SEPARATOR: char = '|';

/// Separator between ids in a `MODS_MISMATCH` payload.
pub const MISSING_SEPARATOR: char = ',';

/// Result token carried by `MODS_MATCH`.
pub const MATCH_RESULT: &str = "SUCCESS";

/// Prefix of the human-readable mirror lines sent when `debug_chat` is on.
pub const DEBUG_LINE_PREFIX: &str = "DEBUG: ";

/// Leading segments accepted as "TLD-like" by the identifier heuristic.
pub const COMMON_TLDS: &[&str] = &[
    "com", "org", "net", "io", "dev", "me", "gg", "app", "xyz", "co", "de", "uk", "fr", "ru",
    "nl", "se", "jp", "cn", "us", "info", "tv", "moe",
];

/// Plausible length range for the middle segments of a descriptor id.
pub const ID_SEGMENT_LEN: std::ops::RangeInclusive<usize> = 2..=32;

// =============================================================================
// TIMING
// =============================================================================

/// Participant wait for the owner's verdict.
pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Owner wait for a participant's `CLIENT_MODS` after `REQUEST_MODS`.
pub const PEER_RESPONSE_TIMEOUT: Duration = Duration::from_secs(8);

/// Role re-detection period.
pub const ROLE_CHECK_INTERVAL: Duration = Duration::from_secs(2);

/// Roster polling period on the owner side.
pub const ROSTER_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Delay before a participant removes itself, so the notification is seen.
pub const SELF_REMOVAL_GRACE: Duration = Duration::from_secs(3);

/// Delay before the single eviction retry.
pub const EVICT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Fixed backoff while the chat channel is unavailable.
pub const SEND_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Resend attempts while the chat channel is unavailable.
pub const SEND_MAX_RETRIES: u32 = 5;

/// Window in which a repeated enforcement toggle is ignored.
pub const TOGGLE_COOLDOWN: Duration = Duration::from_millis(500);

/// Window in which an inbound copy of our own line is treated as an echo.
pub const ECHO_WINDOW: Duration = Duration::from_secs(2);
