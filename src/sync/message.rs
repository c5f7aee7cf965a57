//! Sync message types
//!
//! Wire format (one chat line):
//! ```text
//! [MODSYNC]REQUEST_MODS:<name>
//! [MODSYNC]CLIENT_MODS:<name>:<id>:<name>:<scope>;<id>:<name>:<scope>...
//! [MODSYNC]MODS_MATCH:<name>:SUCCESS
//! [MODSYNC]MODS_MISMATCH:<name>:<id>,<id>...
//! [MODSYNC]TEST:<name>:<payload>
//! ```
//!
//! Fields are neither escaped nor length-prefixed, so decoding needs the
//! anchoring logic in [`super::codec`].

use log::debug;

use crate::core::{
    AddOnDescriptor, ENTRY_SEPARATOR, FIELD_SEPARATOR, LEGACY_ENTRY_FIELD_SEPARATOR, MATCH_RESULT,
    MISSING_SEPARATOR, PREFIX, SyncScope,
};

/// Protocol command token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Owner asks a participant for its list.
    RequestMods,
    /// A member reports its required add-ons.
    ClientMods,
    /// Owner verdict: lists match.
    ModsMatch,
    /// Owner verdict: lists differ.
    ModsMismatch,
    /// Channel test line.
    Test,
}

impl Command {
    /// Wire token.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::RequestMods => "REQUEST_MODS",
            Command::ClientMods => "CLIENT_MODS",
            Command::ModsMatch => "MODS_MATCH",
            Command::ModsMismatch => "MODS_MISMATCH",
            Command::Test => "TEST",
        }
    }

    /// Parse a wire token.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "REQUEST_MODS" => Some(Command::RequestMods),
            "CLIENT_MODS" => Some(Command::ClientMods),
            "MODS_MATCH" => Some(Command::ModsMatch),
            "MODS_MISMATCH" => Some(Command::ModsMismatch),
            "TEST" => Some(Command::Test),
            _ => None,
        }
    }
}

/// A decoded or to-be-sent protocol message.
///
/// `name` is always the participant the message is about: the requested
/// participant for `REQUEST_MODS`, the reporter for `CLIENT_MODS`, the judged
/// participant for the verdicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMessage {
    /// `REQUEST_MODS:name`
    RequestMods {
        /// Participant asked to report.
        name: String,
    },
    /// `CLIENT_MODS:name:entries`
    ClientMods {
        /// Reporting member.
        name: String,
        /// Reported descriptors.
        entries: Vec<AddOnDescriptor>,
    },
    /// `MODS_MATCH:name:SUCCESS`
    ModsMatch {
        /// Judged participant.
        name: String,
    },
    /// `MODS_MISMATCH:name:missing`
    ModsMismatch {
        /// Judged participant.
        name: String,
        /// Ids present on only one side.
        missing: Vec<String>,
    },
    /// `TEST:name:payload`
    Test {
        /// Sender.
        name: String,
        /// Free text.
        payload: String,
    },
}

impl SyncMessage {
    /// Command of this message.
    pub fn command(&self) -> Command {
        match self {
            SyncMessage::RequestMods { .. } => Command::RequestMods,
            SyncMessage::ClientMods { .. } => Command::ClientMods,
            SyncMessage::ModsMatch { .. } => Command::ModsMatch,
            SyncMessage::ModsMismatch { .. } => Command::ModsMismatch,
            SyncMessage::Test { .. } => Command::Test,
        }
    }

    /// Participant name carried by the message.
    pub fn name(&self) -> &str {
        match self {
            SyncMessage::RequestMods { name }
            | SyncMessage::ClientMods { name, .. }
            | SyncMessage::ModsMatch { name }
            | SyncMessage::ModsMismatch { name, .. }
            | SyncMessage::Test { name, .. } => name,
        }
    }

    /// Encode to one chat line.
    pub fn encode(&self) -> String {
        let mut line = String::with_capacity(64);
        line.push_str(PREFIX);
        line.push_str(self.command().as_str());
        line.push(FIELD_SEPARATOR);
        line.push_str(self.name());

        match self {
            SyncMessage::RequestMods { .. } => {}
            SyncMessage::ClientMods { entries, .. } => {
                line.push(FIELD_SEPARATOR);
                line.push_str(&encode_entries(entries));
            }
            SyncMessage::ModsMatch { .. } => {
                line.push(FIELD_SEPARATOR);
                line.push_str(MATCH_RESULT);
            }
            SyncMessage::ModsMismatch { missing, .. } => {
                line.push(FIELD_SEPARATOR);
                let sep = MISSING_SEPARATOR.to_string();
                line.push_str(&missing.join(&sep));
            }
            SyncMessage::Test { payload, .. } => {
                line.push(FIELD_SEPARATOR);
                line.push_str(payload);
            }
        }

        line
    }
}

/// Encode one descriptor as `id:name:scope`.
pub fn encode_entry(descriptor: &AddOnDescriptor) -> String {
    format!(
        "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
        descriptor.id,
        descriptor.name,
        descriptor.scope.wire_token()
    )
}

/// Encode a descriptor list as `;`-joined entries.
pub fn encode_entries(entries: &[AddOnDescriptor]) -> String {
    let sep = ENTRY_SEPARATOR.to_string();
    entries
        .iter()
        .map(encode_entry)
        .collect::<Vec<_>>()
        .join(&sep)
}

/// Decode one entry.
///
/// The id is everything before the first separator, the scope everything
/// after the last one, the name whatever lies between (and may contain
/// either separator). Entries from older peers use `id|name|scope`; ids
/// contain neither separator, so whichever comes first picks the format.
pub fn decode_entry(entry: &str) -> Option<AddOnDescriptor> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }

    let separator = match (
        entry.find(FIELD_SEPARATOR),
        entry.find(LEGACY_ENTRY_FIELD_SEPARATOR),
    ) {
        (Some(field), Some(legacy)) if legacy < field => LEGACY_ENTRY_FIELD_SEPARATOR,
        (None, Some(_)) => LEGACY_ENTRY_FIELD_SEPARATOR,
        _ => FIELD_SEPARATOR,
    };
    let (id, rest) = entry.split_once(separator)?;
    let (name, scope) = rest.rsplit_once(separator)?;

    if id.is_empty() {
        return None;
    }

    Some(AddOnDescriptor::new(id, name, SyncScope::parse_lenient(scope)))
}

/// Decode a `;`-joined entry list, skipping malformed entries.
pub fn decode_entries(payload: &str) -> Vec<AddOnDescriptor> {
    payload
        .split(ENTRY_SEPARATOR)
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| {
            let decoded = decode_entry(entry);
            if decoded.is_none() {
                debug!("skipping malformed entry {entry:?}");
            }
            decoded
        })
        .collect()
}

/// Decode a `,`-joined missing list.
pub fn decode_missing(payload: &str) -> Vec<String> {
    payload
        .split(MISSING_SEPARATOR)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
