//! Inbound line decoding.
//!
//! The wire format has no escaping, and both display names and entry fields
//! may contain the `:` delimiter. The sender name is therefore recovered in
//! three tiers:
//!
//! 1. the current roster (authoritative, longest match wins);
//! 2. the owner's and the local participant's own names;
//! 3. a structural fallback per command, keyed on the shape of
//!    reverse-domain descriptor ids.
//!
//! A line no tier can anchor is dropped.

use crate::core::{COMMON_TLDS, DecodeError, FIELD_SEPARATOR, ID_SEGMENT_LEN, MATCH_RESULT, MISSING_SEPARATOR, PREFIX};

use super::message::{Command, SyncMessage, decode_entries, decode_missing};

/// Names the decoder may anchor on.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameAnchors<'a> {
    /// Current roster display names.
    pub roster: &'a [String],
    /// Owner's display name.
    pub owner: Option<&'a str>,
    /// Local participant's display name.
    pub local: Option<&'a str>,
}

impl<'a> NameAnchors<'a> {
    /// Anchors backed by a roster only.
    pub fn roster(roster: &'a [String]) -> Self {
        Self {
            roster,
            owner: None,
            local: None,
        }
    }
}

/// Which tier located the sender name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Matched a roster name.
    Roster,
    /// Matched the owner's or our own name.
    OwnName,
    /// Located by message structure.
    Structural,
}

/// A successfully decoded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The message.
    pub message: SyncMessage,
    /// How the name was anchored.
    pub anchor: Anchor,
}

/// Cheap check for the protocol prefix. Ordinary chat fails it.
pub fn is_protocol_line(line: &str) -> bool {
    line.trim_start().starts_with(PREFIX)
}

/// Decode one chat line.
pub fn decode(line: &str, anchors: &NameAnchors<'_>) -> Result<Decoded, DecodeError> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    let body = line.strip_prefix(PREFIX).ok_or(DecodeError::MissingPrefix)?;

    let (token, remainder) = body.split_once(FIELD_SEPARATOR).ok_or(DecodeError::MissingField {
        command: "?",
        field: "command separator",
    })?;
    let command =
        Command::parse(token).ok_or_else(|| DecodeError::UnknownCommand(token.to_string()))?;

    let (name, rest, anchor) = resolve_name(command, remainder, anchors)?;
    let name = name.to_string();

    let message = match command {
        Command::RequestMods => SyncMessage::RequestMods { name },
        Command::ClientMods => SyncMessage::ClientMods {
            name,
            entries: decode_entries(rest),
        },
        Command::ModsMatch => {
            let result = rest.trim();
            if result.is_empty() {
                return Err(DecodeError::MissingField {
                    command: command.as_str(),
                    field: "result",
                });
            }
            if result != MATCH_RESULT {
                return Err(DecodeError::UnexpectedResult(result.to_string()));
            }
            SyncMessage::ModsMatch { name }
        }
        Command::ModsMismatch => SyncMessage::ModsMismatch {
            name,
            missing: decode_missing(rest),
        },
        Command::Test => SyncMessage::Test {
            name,
            payload: rest.to_string(),
        },
    };

    Ok(Decoded { message, anchor })
}

/// Split `remainder` into `(name, rest, anchor)`.
fn resolve_name<'r>(
    command: Command,
    remainder: &'r str,
    anchors: &NameAnchors<'_>,
) -> Result<(&'r str, &'r str, Anchor), DecodeError> {
    let roster = anchors.roster.iter().map(String::as_str);
    if let Some((name, rest)) = longest_anchor(remainder, roster) {
        return Ok((name, rest, Anchor::Roster));
    }

    let own = anchors.owner.into_iter().chain(anchors.local);
    if let Some((name, rest)) = longest_anchor(remainder, own) {
        return Ok((name, rest, Anchor::OwnName));
    }

    if let Some((name, rest)) = structural_split(command, remainder) {
        return Ok((name, rest, Anchor::Structural));
    }

    Err(DecodeError::Unanchored {
        command: command.as_str(),
        remainder: remainder.to_string(),
    })
}

/// Longest candidate that is the whole remainder or a prefix followed by `:`.
fn longest_anchor<'r, 'n>(
    remainder: &'r str,
    candidates: impl Iterator<Item = &'n str>,
) -> Option<(&'r str, &'r str)> {
    candidates
        .filter(|name| !name.is_empty())
        .filter_map(|name| split_at_name(remainder, name).map(|rest| (name.len(), rest)))
        .max_by_key(|(len, _)| *len)
        .map(|(len, rest)| (&remainder[..len], rest))
}

fn split_at_name<'r>(remainder: &'r str, name: &str) -> Option<&'r str> {
    if remainder == name {
        return Some("");
    }
    remainder
        .strip_prefix(name)
        .and_then(|after| after.strip_prefix(FIELD_SEPARATOR))
}

fn structural_split(command: Command, remainder: &str) -> Option<(&str, &str)> {
    let split = match command {
        Command::RequestMods => Some((remainder, "")),
        Command::ClientMods => first_segment_where(remainder, looks_like_descriptor_id)
            .or_else(|| remainder.strip_suffix(FIELD_SEPARATOR).map(|name| (name, ""))),
        Command::ModsMatch => remainder.rsplit_once(FIELD_SEPARATOR),
        Command::ModsMismatch => first_segment_where(remainder, |segment| {
            segment
                .split(MISSING_SEPARATOR)
                .next()
                .is_some_and(looks_like_descriptor_id)
        })
        .or_else(|| remainder.rsplit_once(FIELD_SEPARATOR)),
        Command::Test => Some(remainder.split_once(FIELD_SEPARATOR).unwrap_or(("", remainder))),
    };

    // Only TEST tolerates an anonymous sender (older peers sent `TEST:payload`).
    split.filter(|(name, _)| command == Command::Test || !name.trim().is_empty())
}

/// Split before the first `:`-segment (not the first one) matching `pred`.
fn first_segment_where(remainder: &str, pred: impl Fn(&str) -> bool) -> Option<(&str, &str)> {
    let mut offset = 0;
    for (index, segment) in remainder.split(FIELD_SEPARATOR).enumerate() {
        if index > 0 && pred(segment) {
            // `offset` points at the segment start; the separator precedes it.
            return Some((&remainder[..offset - 1], &remainder[offset..]));
        }
        offset += segment.len() + FIELD_SEPARATOR.len_utf8();
    }
    None
}

/// Whether `segment` has the shape of a reverse-domain descriptor id.
///
/// Needs at least three non-empty `.`-separated parts of `[A-Za-z0-9_-]`,
/// and either a TLD-like first part or plausibly sized second and third parts.
pub fn looks_like_descriptor_id(segment: &str) -> bool {
    let segment = segment.trim();
    let parts: Vec<&str> = segment.split('.').collect();
    if parts.len() < 3 {
        return false;
    }

    let well_formed = parts.iter().all(|part| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    });
    if !well_formed {
        return false;
    }

    let first = parts[0].to_ascii_lowercase();
    let tld_like = COMMON_TLDS.contains(&first.as_str());
    let plausible_middle =
        ID_SEGMENT_LEN.contains(&parts[1].len()) && ID_SEGMENT_LEN.contains(&parts[2].len());

    tld_like || plausible_middle
}
