// Turn controller: turn order and action resolution over the roster.
//
// The controller owns the roster once the battle starts (the session moves
// it out of `SharedState`), the wrapping turn cursor, and the dice. It never
// touches sockets: the battle loop asks it who acts, hands it the chosen
// action code and target, and broadcasts whatever it reports.
//
// `resolve` is the only place one combatant affects another. The attacker's
// ability computes an `ActionOutcome`; the controller then applies it:
// protection on the target absorbs the whole hit (and is spent), otherwise
// damage is subtracted; the attacker's bonus ages by one action; healing
// goes to the attacker. Error outcomes change nothing here.
//
// The cursor always points at a roster index whether or not that combatant
// is alive. Skipping the dead and the disconnected is the battle loop's job.

use skirmish_combat::{ActionKind, ActionOutcome, Combatant};
use skirmish_prng::DiceRng;
use skirmish_protocol::{RosterEntry, RosterIndex};

/// Description carried by the error outcome for an unknown action code.
pub const INVALID_ACTION_TYPE: &str = "Invalid action type.";

pub struct TurnController {
    roster: Vec<Combatant>,
    cursor: usize,
    rng: DiceRng,
}

impl TurnController {
    pub fn new(roster: Vec<Combatant>, rng: DiceRng) -> Self {
        Self {
            roster,
            cursor: 0,
            rng,
        }
    }

    pub fn current_index(&self) -> RosterIndex {
        RosterIndex(self.cursor)
    }

    pub fn current(&self) -> Option<&Combatant> {
        self.roster.get(self.cursor)
    }

    /// Move the cursor to the next roster index, wrapping.
    pub fn advance(&mut self) {
        if !self.roster.is_empty() {
            self.cursor = (self.cursor + 1) % self.roster.len();
        }
    }

    pub fn roster(&self) -> &[Combatant] {
        &self.roster
    }

    pub fn combatant(&self, index: RosterIndex) -> Option<&Combatant> {
        self.roster.get(index.0)
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Apply action `code` from `attacker` to `target`.
    ///
    /// Unknown codes and out-of-range indices produce an error outcome and
    /// leave every combatant untouched, as does an ability that fails (not
    /// enough mana).
    pub fn resolve(
        &mut self,
        attacker: RosterIndex,
        code: i64,
        target: RosterIndex,
    ) -> ActionOutcome {
        let Some(kind) = ActionKind::from_code(code) else {
            return ActionOutcome::error(INVALID_ACTION_TYPE);
        };
        if attacker.0 >= self.roster.len() || target.0 >= self.roster.len() {
            return ActionOutcome::error(INVALID_ACTION_TYPE);
        }

        let mut outcome = self.roster[attacker.0].perform(kind, &mut self.rng);
        if outcome.is_error {
            return outcome;
        }

        let defender = &mut self.roster[target.0];
        if defender.is_next_attack_protected() {
            outcome.blocked = defender.protection_notice();
            defender.set_next_attack_protected(false);
        } else {
            defender.take_damage(outcome.damage);
        }

        let actor = &mut self.roster[attacker.0];
        actor.decay_attack_bonus();
        if outcome.heal > 0 {
            actor.gain_health(outcome.heal);
        }
        outcome
    }

    /// True when at most one combatant is still alive.
    pub fn is_battle_over(&self) -> bool {
        self.alive_count() <= 1
    }

    pub fn alive_count(&self) -> usize {
        self.roster.iter().filter(|c| c.is_alive()).count()
    }

    /// The only living combatant, if exactly one remains.
    pub fn survivor(&self) -> Option<&Combatant> {
        let mut alive = self.roster.iter().filter(|c| c.is_alive());
        match (alive.next(), alive.next()) {
            (Some(last), None) => Some(last),
            _ => None,
        }
    }

    /// Knock out a combatant whose player disconnected.
    pub fn mark_dead(&mut self, index: RosterIndex) {
        if let Some(combatant) = self.roster.get_mut(index.0) {
            combatant.set_dead();
        }
    }

    /// A target must exist, be alive, and not be the attacker.
    pub fn is_valid_target(&self, attacker: RosterIndex, target: RosterIndex) -> bool {
        target != attacker && self.roster.get(target.0).is_some_and(Combatant::is_alive)
    }

    /// Every living combatant other than `attacker`, in roster order.
    pub fn target_candidates(&self, attacker: RosterIndex) -> Vec<RosterEntry> {
        self.entries()
            .filter(|e| e.alive && e.index != attacker)
            .collect()
    }

    /// Whole roster, dead included, for the status block.
    pub fn status_entries(&self) -> Vec<RosterEntry> {
        self.entries().collect()
    }

    fn entries(&self) -> impl Iterator<Item = RosterEntry> + '_ {
        self.roster.iter().enumerate().map(|(i, c)| RosterEntry {
            index: RosterIndex(i),
            name: c.name().to_string(),
            health: c.health(),
            alive: c.is_alive(),
        })
    }
}
