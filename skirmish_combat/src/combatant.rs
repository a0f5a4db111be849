// A player's in-battle entity and its ability rules.
//
// `Combatant` is the single type for every archetype (see `archetype.rs`).
// The three abilities branch on the archetype tag and return an
// `ActionOutcome`; they may change the actor's own state (mana, attack bonus,
// protection flag) but never touch the target. Applying damage and healing
// is the caller's job, so the turn controller stays the only place where one
// combatant affects another.
//
// Invariants:
// - `health` stays in `[0, max_health]`; health 0 means dead, permanently.
// - `mana` stays in `[0, max_mana]`.
// - inventory counts are always > 0 (an item at 0 is removed).

use std::collections::BTreeMap;

use skirmish_prng::DiceRng;

use crate::action::{ActionKind, ActionOutcome};
use crate::archetype::Archetype;

/// Chance (percent) that a Mage's basic attack raises a ward for the next
/// incoming hit.
const MAGE_WARD_CHANCE: u32 = 10;

/// Temporary percentage bonus on basic-attack damage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttackBonus {
    pub percent: u32,
    pub turns_left: u32,
}

#[derive(Clone, Debug)]
pub struct Combatant {
    name: String,
    archetype: Archetype,
    health: u32,
    max_health: u32,
    mana: u32,
    max_mana: u32,
    base_attack: u32,
    bonus: AttackBonus,
    next_attack_protected: bool,
    inventory: BTreeMap<String, u32>,
    /// Position of this player's connection slot, fixed at registration.
    slot_position: Option<usize>,
}

impl Combatant {
    /// Create a combatant with its archetype's starting profile.
    pub fn new(name: impl Into<String>, archetype: Archetype) -> Self {
        let profile = archetype.profile();
        let mut combatant = Self::with_stats(
            name,
            archetype,
            profile.max_health,
            profile.max_mana,
            profile.base_attack,
        );
        for item in profile.starting_items {
            combatant.add_item(item);
        }
        combatant
    }

    /// Create a combatant with explicit stats and an empty inventory.
    /// Starts at full health and mana.
    pub fn with_stats(
        name: impl Into<String>,
        archetype: Archetype,
        max_health: u32,
        max_mana: u32,
        base_attack: u32,
    ) -> Self {
        Self {
            name: name.into(),
            archetype,
            health: max_health,
            max_health,
            mana: max_mana,
            max_mana,
            base_attack,
            bonus: AttackBonus::default(),
            next_attack_protected: false,
            inventory: BTreeMap::new(),
            slot_position: None,
        }
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    pub fn class_name(&self) -> &'static str {
        self.archetype.name()
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn mana(&self) -> u32 {
        self.mana
    }

    pub fn max_mana(&self) -> u32 {
        self.max_mana
    }

    pub fn gain_mana(&mut self, amount: u32) {
        self.mana = self.mana.saturating_add(amount).min(self.max_mana);
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Knock the combatant out regardless of health (used on disconnect).
    pub fn set_dead(&mut self) {
        self.health = 0;
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }

    pub fn gain_health(&mut self, amount: u32) {
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }

    pub fn slot_position(&self) -> Option<usize> {
        self.slot_position
    }

    pub fn set_slot_position(&mut self, position: usize) {
        self.slot_position = Some(position);
    }

    // -----------------------------------------------------------------------
    // Protection and attack bonus
    // -----------------------------------------------------------------------

    pub fn is_next_attack_protected(&self) -> bool {
        self.next_attack_protected
    }

    pub fn set_next_attack_protected(&mut self, protected: bool) {
        self.next_attack_protected = protected;
    }

    /// Notice shown when this combatant's protection absorbs a hit. Orcs have
    /// no protection of their own, so they produce none.
    pub fn protection_notice(&self) -> Option<String> {
        match self.archetype {
            Archetype::Mage => Some(format!("{} blocks the attack with a Aegis Veil!", self.name)),
            Archetype::Halfling => Some(format!("{} dodges the attack!", self.name)),
            Archetype::Orc => None,
        }
    }

    pub fn attack_bonus(&self) -> AttackBonus {
        self.bonus
    }

    pub fn set_attack_bonus(&mut self, percent: u32, turns_left: u32) {
        self.bonus = AttackBonus {
            percent,
            turns_left,
        };
    }

    /// Age the attack bonus by one resolved action.
    ///
    /// A positive bonus keeps its percentage and loses one turn, stopping at
    /// zero turns: running out of turns does not clear it. Only a bonus whose
    /// percentage is 0 is reset to `(0, 0)`.
    pub fn decay_attack_bonus(&mut self) {
        if self.bonus.percent == 0 {
            self.bonus = AttackBonus::default();
        } else {
            self.bonus.turns_left = self.bonus.turns_left.saturating_sub(1);
        }
    }

    /// Basic-attack damage including the current bonus percentage.
    pub fn attack_damage(&self) -> u32 {
        self.base_attack + self.base_attack * self.bonus.percent / 100
    }

    // -----------------------------------------------------------------------
    // Abilities
    // -----------------------------------------------------------------------

    pub fn perform(&mut self, kind: ActionKind, rng: &mut DiceRng) -> ActionOutcome {
        match kind {
            ActionKind::Attack => self.attack(rng),
            ActionKind::CastSpell => self.cast_spell(rng),
            ActionKind::SpecialMove => self.special_move(rng),
        }
    }

    pub fn attack(&mut self, rng: &mut DiceRng) -> ActionOutcome {
        let damage = self.attack_damage();
        let flavor = match self.archetype {
            Archetype::Mage => {
                if rng.percent_chance(MAGE_WARD_CHANCE) {
                    self.next_attack_protected = true;
                }
                "attacks with wisdom!"
            }
            Archetype::Orc => "attacks aggressively!",
            Archetype::Halfling => "attacks with courage!",
        };
        ActionOutcome::hit(
            format!("{} {flavor} Causes {damage} of damage.", self.name),
            damage,
        )
    }

    pub fn cast_spell(&mut self, rng: &mut DiceRng) -> ActionOutcome {
        let cost = match self.archetype {
            Archetype::Mage => 30,
            Archetype::Orc => 5,
            Archetype::Halfling => 10,
        };
        if self.mana < cost {
            return ActionOutcome::error("Mana is not sufficient!");
        }
        self.mana -= cost;
        let mana = self.mana;

        match self.archetype {
            Archetype::Mage => {
                let damage = 25;
                ActionOutcome::hit(
                    format!(
                        "{} uses Inherited Spell! Causes {damage} of damage! Mana left: {mana}",
                        self.name
                    ),
                    damage,
                )
            }
            Archetype::Orc => {
                let (damage, heal) = (10, 5);
                ActionOutcome {
                    heal,
                    ..ActionOutcome::hit(
                        format!(
                            "{} uses Bloody Frenzy! Causes {damage} of damage and heals {heal}! Mana left: {mana}",
                            self.name
                        ),
                        damage,
                    )
                }
            }
            Archetype::Halfling => {
                let bonus = rng.roll_inclusive(150, 349);
                self.set_attack_bonus(bonus, 1);
                ActionOutcome::hit(
                    format!(
                        "{} uses Unexpected Luck! Next attack with a bonus of {bonus}%! Mana left: {mana}",
                        self.name
                    ),
                    0,
                )
            }
        }
    }

    pub fn special_move(&mut self, rng: &mut DiceRng) -> ActionOutcome {
        match self.archetype {
            Archetype::Mage => {
                let (damage, heal) = (5, 15);
                ActionOutcome {
                    heal,
                    ..ActionOutcome::hit(
                        format!(
                            "{} uses Divine Magic! Causes {damage} of damage and heals {heal}!",
                            self.name
                        ),
                        damage,
                    )
                }
            }
            Archetype::Orc => {
                let damage = 25;
                let bonus = rng.roll_inclusive(25, 99);
                self.set_attack_bonus(bonus, 1);
                ActionOutcome::hit(
                    format!(
                        "{} uses Brutal Force! Causes {damage} of damage and bonus of {bonus}% in next attack!",
                        self.name
                    ),
                    damage,
                )
            }
            Archetype::Halfling => {
                let damage = 15;
                self.next_attack_protected = true;
                ActionOutcome::hit(
                    format!(
                        "{} uses Traveler's Trick! Causes {damage} of damage and guarantees dodge in next turn!",
                        self.name
                    ),
                    damage,
                )
            }
        }
    }

    // -----------------------------------------------------------------------
    // Inventory
    // -----------------------------------------------------------------------

    pub fn add_item(&mut self, item: &str) {
        *self.inventory.entry(item.to_string()).or_insert(0) += 1;
    }

    /// Remove one of `item`. Returns false if it wasn't carried.
    pub fn remove_item(&mut self, item: &str) -> bool {
        match self.inventory.get_mut(item) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    self.inventory.remove(item);
                }
                true
            }
            None => false,
        }
    }

    /// Consume one of `item`, returning the narrative line for it.
    pub fn use_item(&mut self, item: &str) -> String {
        if self.remove_item(item) {
            format!("{} used {item}!", self.name)
        } else {
            format!("{} does not have {item} in inventory!", self.name)
        }
    }

    pub fn item_count(&self, item: &str) -> u32 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    /// `(item, count)` pairs in item-name order.
    pub fn inventory(&self) -> Vec<(String, u32)> {
        self.inventory
            .iter()
            .map(|(item, count)| (item.clone(), *count))
            .collect()
    }

    /// Multi-line inventory listing.
    pub fn inventory_listing(&self) -> String {
        let mut out = String::from("Inventory:\n");
        for (item, count) in &self.inventory {
            out.push_str(&format!("- {item}: {count}\n"));
        }
        out
    }
}
