// Character archetypes and their starting profiles.
//
// An archetype is a tag on a `Combatant`, not a separate type. Starting stats
// live in a data table (`ArchetypeProfile`) so creating a combatant is the
// same code path for every class; only the ability rules in `combatant.rs`
// branch on the tag.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Playable character classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Archetype {
    Mage,
    Orc,
    Halfling,
}

/// Returned when a class name matches no archetype.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown class: {0:?}")]
pub struct UnknownArchetype(pub String);

/// Starting stats for an archetype.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchetypeProfile {
    pub max_health: u32,
    pub max_mana: u32,
    pub base_attack: u32,
    pub starting_items: &'static [&'static str],
}

impl Archetype {
    /// Class assigned when a player's input names no known archetype.
    pub const DEFAULT: Archetype = Archetype::Halfling;

    pub const ALL: [Archetype; 3] = [Archetype::Mage, Archetype::Orc, Archetype::Halfling];

    pub fn name(self) -> &'static str {
        match self {
            Archetype::Mage => "Mage",
            Archetype::Orc => "Orc",
            Archetype::Halfling => "Halfling",
        }
    }

    pub fn profile(self) -> ArchetypeProfile {
        match self {
            Archetype::Mage => ArchetypeProfile {
                max_health: 65,
                max_mana: 100,
                base_attack: 10,
                starting_items: &["Magical Herbs"],
            },
            Archetype::Orc => ArchetypeProfile {
                max_health: 90,
                max_mana: 10,
                base_attack: 15,
                starting_items: &["Rope"],
            },
            Archetype::Halfling => ArchetypeProfile {
                max_health: 85,
                max_mana: 15,
                base_attack: 10,
                starting_items: &["Halfling Pipe", "Apple Pie"],
            },
        }
    }

    /// Resolve a class token, falling back to `DEFAULT` for anything unknown
    /// or missing.
    pub fn resolve(token: Option<&str>) -> Archetype {
        token
            .and_then(|t| t.parse().ok())
            .unwrap_or(Archetype::DEFAULT)
    }
}

impl FromStr for Archetype {
    type Err = UnknownArchetype;

    /// Case-insensitive match on the class name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Archetype::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownArchetype(s.to_string()))
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_classes_any_case() {
        assert_eq!("Mage".parse(), Ok(Archetype::Mage));
        assert_eq!("orc".parse(), Ok(Archetype::Orc));
        assert_eq!("HALFLING".parse(), Ok(Archetype::Halfling));
    }

    #[test]
    fn unknown_class_is_error_but_resolves_to_default() {
        assert_eq!(
            "Unknown".parse::<Archetype>(),
            Err(UnknownArchetype("Unknown".into()))
        );
        assert_eq!(Archetype::resolve(Some("Unknown")), Archetype::Halfling);
        assert_eq!(Archetype::resolve(None), Archetype::Halfling);
    }

    #[test]
    fn profiles_match_class_table() {
        assert_eq!(Archetype::Mage.profile().max_health, 65);
        assert_eq!(Archetype::Orc.profile().base_attack, 15);
        assert_eq!(Archetype::Halfling.profile().starting_items.len(), 2);
    }
}
