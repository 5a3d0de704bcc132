//! Bandwidth-weight modifier table.

use crate::flags::RelayFlags;
use crate::relay::RelayRole;
use serde::{Deserialize, Serialize};

/// Scale of the modifier values in a document: a modifier of 10 000 means
/// "count the full bandwidth".
pub const WEIGHT_SCALE: u64 = 10_000;

/// The named bandwidth-weight modifiers from a consensus document.
///
/// Field naming follows the weight letters: position (e = exit, g = guard/
/// entry, m = middle) then flag combination (d = both guard and exit,
/// g = guard only, e = exit only, m = neither).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeightModTable {
    // exit position
    pub wed: u64,
    pub weg: u64,
    pub wee: u64,
    pub wem: u64,
    // entry position
    pub wgd: u64,
    pub wgg: u64,
    pub wgm: u64,
    // middle position
    pub wmd: u64,
    pub wmg: u64,
    pub wme: u64,
    pub wmm: u64,
}

impl WeightModTable {
    /// The modifier for a relay with `flags` considered for `role`.
    ///
    /// Only the GUARD and EXIT bits participate in dispatch. Every (role,
    /// masked-flags) combination maps to a stored value except one: an
    /// exit-flagged relay without the guard flag carries no entry weight,
    /// which is a fixed zero rather than a table entry.
    pub fn modifier(&self, role: RelayRole, flags: RelayFlags) -> u64 {
        let masked = flags & (RelayFlags::GUARD | RelayFlags::EXIT);
        let guard = masked.contains(RelayFlags::GUARD);
        let exit = masked.contains(RelayFlags::EXIT);

        match role {
            RelayRole::Exit => match (guard, exit) {
                (true, true) => self.wed,
                (true, false) => self.weg,
                (false, true) => self.wee,
                (false, false) => self.wem,
            },
            RelayRole::Entry => match (guard, exit) {
                (true, true) => self.wgd,
                (true, false) => self.wgg,
                (false, true) => 0,
                (false, false) => self.wgm,
            },
            RelayRole::Middle => match (guard, exit) {
                (true, true) => self.wmd,
                (true, false) => self.wmg,
                (false, true) => self.wme,
                (false, false) => self.wmm,
            },
        }
    }

    /// Store a value by its document key (`Wed`, `Wgg`, ...). Returns false
    /// for keys outside the table.
    pub(crate) fn set(&mut self, key: &str, value: u64) -> bool {
        let slot = match key {
            "Wed" => &mut self.wed,
            "Weg" => &mut self.weg,
            "Wee" => &mut self.wee,
            "Wem" => &mut self.wem,
            "Wgd" => &mut self.wgd,
            "Wgg" => &mut self.wgg,
            "Wgm" => &mut self.wgm,
            "Wmd" => &mut self.wmd,
            "Wmg" => &mut self.wmg,
            "Wme" => &mut self.wme,
            "Wmm" => &mut self.wmm,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Document keys of every stored modifier, in document order.
    pub(crate) const KEYS: [&'static str; 11] = [
        "Wed", "Weg", "Wee", "Wem", "Wgd", "Wgg", "Wgm", "Wmd", "Wmg", "Wme", "Wmm",
    ];
}
