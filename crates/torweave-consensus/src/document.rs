//! Consensus document parser.
//!
//! The document is line-oriented:
//!
//! ```text
//! valid-after 2024-05-01 12:00:00
//! r nick1 <40-hex-fingerprint> 10.0.1.1 9001 2500
//! s Exit Fast Running Valid
//! p accept 80,443,8000-8999
//! ...
//! bandwidth-weights Wed=7000 Weg=... Wmm=...
//! ```
//!
//! One `r`/`s` pair per relay, optionally followed by a `p` exit-policy
//! summary; registry index follows document order. The
//! `bandwidth-weights` line closes the document and must carry every stored
//! modifier key. Unknown flag names and unknown weight keys are tolerated
//! (newer documents grow both), but unknown weight values still feed the
//! running maximum.

use crate::error::{ConsensusError, Result};
use crate::fingerprint::Fingerprint;
use crate::flags::RelayFlags;
use crate::relay::{ExitPolicy, PortRange, Relay};
use crate::weights::WeightModTable;
use std::collections::HashMap;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::{debug, info};

/// A structurally valid document has at least a valid-after line, one
/// `r`/`s` pair, and the bandwidth-weights line.
pub(crate) const MIN_DOCUMENT_LINES: usize = 4;

/// Everything extracted from one document.
pub(crate) struct ParsedDocument {
    pub valid_after: String,
    pub relays: Vec<Relay>,
    pub fingerprint_map: HashMap<Fingerprint, usize>,
    pub weight_mods: WeightModTable,
    pub max_modifier: u64,
}

pub(crate) fn parse_document(path: &Path) -> Result<ParsedDocument> {
    let file_name = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|_| ConsensusError::OpenFile {
        file: file_name.clone(),
    })?;

    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < MIN_DOCUMENT_LINES {
        return Err(ConsensusError::InsufficientFile { file: file_name });
    }

    let invalid = |line: &str| ConsensusError::InvalidFormat {
        file: file_name.clone(),
        line: line.to_string(),
    };

    let valid_after = parse_valid_after(lines[0]).ok_or_else(|| invalid(lines[0]))?;

    let mut relays: Vec<Relay> = Vec::new();
    let mut fingerprint_map: HashMap<Fingerprint, usize> = HashMap::new();
    let mut parsed_weights: Option<(WeightModTable, u64)> = None;

    let mut idx = 1;
    while idx < lines.len() {
        let line = lines[idx];
        if line.starts_with("r ") {
            let mut relay = parse_status_entry(line).ok_or_else(|| invalid(line))?;

            // Every status entry is followed by its flag line.
            let flag_line = *lines.get(idx + 1).ok_or_else(|| invalid(line))?;
            relay.flags = parse_flag_line(flag_line).ok_or_else(|| invalid(flag_line))?;

            // A repeated fingerprint is a format violation, not an overwrite.
            if fingerprint_map.contains_key(&relay.fingerprint) {
                return Err(invalid(line));
            }
            idx += 2;

            // Exits usually carry a policy summary; the line is optional.
            if let Some(&policy_line) = lines.get(idx) {
                if policy_line.starts_with("p ") {
                    relay.exit_policy =
                        parse_policy_line(policy_line).ok_or_else(|| invalid(policy_line))?;
                    idx += 1;
                }
            }

            fingerprint_map.insert(relay.fingerprint, relays.len());
            relays.push(relay);
        } else if line.starts_with("bandwidth-weights") {
            // The weights line closes the document.
            if let Some(trailing) = lines.get(idx + 1) {
                return Err(invalid(trailing));
            }
            parsed_weights = Some(parse_bandwidth_weights(line).ok_or_else(|| invalid(line))?);
            idx += 1;
        } else {
            return Err(invalid(line));
        }
    }

    let Some((weight_mods, max_modifier)) = parsed_weights else {
        return Err(ConsensusError::InsufficientFile { file: file_name });
    };
    if relays.is_empty() {
        return Err(ConsensusError::InsufficientFile { file: file_name });
    }

    info!(
        relays = relays.len(),
        valid_after = %valid_after,
        "parsed consensus document"
    );
    Ok(ParsedDocument {
        valid_after,
        relays,
        fingerprint_map,
        weight_mods,
        max_modifier,
    })
}

/// `valid-after YYYY-MM-DD HH:MM:SS`
fn parse_valid_after(line: &str) -> Option<String> {
    let mut tokens = line.split_ascii_whitespace();
    if tokens.next()? != "valid-after" {
        return None;
    }
    let date = tokens.next()?;
    let time = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    if !shaped(date, b'-', &[4, 7], 10) || !shaped(time, b':', &[2, 5], 8) {
        return None;
    }
    Some(format!("{date} {time}"))
}

/// Digits everywhere except `sep` at the given positions.
fn shaped(s: &str, sep: u8, sep_at: &[usize], len: usize) -> bool {
    if s.len() != len || !s.is_ascii() {
        return false;
    }
    s.bytes().enumerate().all(|(i, b)| {
        if sep_at.contains(&i) {
            b == sep
        } else {
            b.is_ascii_digit()
        }
    })
}

/// `r <nickname> <fingerprint> <ipv4> <orport> <bandwidth>`
fn parse_status_entry(line: &str) -> Option<Relay> {
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
    let [_, nickname, fingerprint, address, or_port, bandwidth] = tokens.as_slice() else {
        return None;
    };

    Some(Relay {
        nickname: (*nickname).to_string(),
        fingerprint: Fingerprint::from_hex(fingerprint).ok()?,
        address: address.parse::<Ipv4Addr>().ok()?,
        or_port: or_port.parse::<u16>().ok()?,
        bandwidth: bandwidth.parse::<u64>().ok()?,
        flags: RelayFlags::NONE,
        exit_policy: ExitPolicy::default(),
        family: Vec::new(),
        platform: String::new(),
        country: String::new(),
    })
}

/// `s <Flag> [<Flag> ...]`
fn parse_flag_line(line: &str) -> Option<RelayFlags> {
    let mut tokens = line.split_ascii_whitespace();
    if tokens.next()? != "s" {
        return None;
    }
    let mut flags = RelayFlags::NONE;
    for name in tokens {
        match RelayFlags::from_name(name) {
            Some(flag) => flags |= flag,
            None => debug!(flag = name, "skipping unknown relay flag"),
        }
    }
    Some(flags)
}

/// `p accept|reject <port-or-range>[,<port-or-range>...]`
fn parse_policy_line(line: &str) -> Option<ExitPolicy> {
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
    let [_, polarity, list] = tokens.as_slice() else {
        return None;
    };

    let mut ranges = Vec::new();
    for entry in list.split(',') {
        let range = match entry.split_once('-') {
            Some((lo, hi)) => {
                PortRange::new(lo.parse::<u16>().ok()?, hi.parse::<u16>().ok()?)?
            }
            None => PortRange::single(entry.parse::<u16>().ok()?),
        };
        ranges.push(range);
    }

    match *polarity {
        "accept" => Some(ExitPolicy::accepting(ranges)),
        "reject" => Some(ExitPolicy::rejecting(ranges)),
        _ => None,
    }
}

/// `bandwidth-weights Wed=N Weg=N ...`
///
/// Returns the table and the maximum value seen across every `K=V` token on
/// the line, including keys the table does not store.
fn parse_bandwidth_weights(line: &str) -> Option<(WeightModTable, u64)> {
    let mut tokens = line.split_ascii_whitespace();
    if tokens.next()? != "bandwidth-weights" {
        return None;
    }

    let mut table = WeightModTable::default();
    let mut max_modifier = 0u64;
    let mut stored = 0u16;

    for token in tokens {
        let (key, value) = token.split_once('=')?;
        let value: u64 = value.parse().ok()?;
        max_modifier = max_modifier.max(value);
        if table.set(key, value) {
            let position = WeightModTable::KEYS.iter().position(|k| *k == key)?;
            stored |= 1 << position;
        }
    }

    // Every stored modifier must be declared.
    if stored != (1 << WeightModTable::KEYS.len()) - 1 {
        return None;
    }
    Some((table, max_modifier))
}
