// Index newtypes shared by the server's connection table and roster.
//
// `SlotId` names a connection for its whole life (assigned at accept time,
// never reused). `RosterIndex` is the position of a combatant in the roster,
// which is also the number players type when choosing a target.

use std::fmt;

/// Server-assigned connection identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

/// Position of a combatant in the roster. Stable once assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RosterIndex(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for RosterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
