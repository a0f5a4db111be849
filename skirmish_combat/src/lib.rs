// skirmish_combat: combat actors for Skirmish battles.
//
// Pure, synchronous game rules with no I/O: the server's turn controller
// calls into this crate and applies the results.
//
// Module overview:
// - `archetype.rs`:  `Archetype` tag (Mage, Orc, Halfling), class-name
//                    parsing with a default fallback, starting profiles.
// - `action.rs`:     `ActionKind` (the 0/1/2 menu) and `ActionOutcome`.
// - `combatant.rs`:  `Combatant`: stats, attack bonus, protection flag,
//                    inventory, and the per-archetype ability rules.
//
// All randomness comes from a caller-supplied `skirmish_prng::DiceRng`.

pub mod action;
pub mod archetype;
pub mod combatant;

pub use action::{ActionKind, ActionOutcome};
pub use archetype::{Archetype, ArchetypeProfile, UnknownArchetype};
pub use combatant::{AttackBonus, Combatant};
