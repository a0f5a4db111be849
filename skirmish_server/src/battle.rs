// Battle loop: one blocking request/response exchange per turn.
//
// Each iteration asks the turn controller whose turn it is. A dead actor is
// skipped without any I/O. A living actor whose slot has closed (a failed
// broadcast closes slots too) is handled as a departure. Otherwise the actor
// is prompted for an action code, then for a target from the list of other
// living combatants; bad input gets a notice and the same question again.
// The resolved outcome goes to everyone, followed by the status block, and
// the cursor advances. An error outcome (not enough mana) keeps the turn
// with the same actor.
//
// Sockets are in blocking mode for the whole battle, and reads go straight
// to the actor's stream with no lock held. A read or write failure is a
// departure: the slot is closed, the combatant is knocked out, and everyone
// is told. If the failure was caused by a session shutdown (which closes
// every socket), the loop just stops.

use std::net::TcpStream;
use std::sync::Arc;

use skirmish_combat::ActionKind;
use skirmish_protocol::{LineError, RosterIndex, read_line, text, write_line};
use tracing::{debug, info};

use crate::session::SessionContext;
use crate::turn::TurnController;

/// How the battle loop ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BattleEnd {
    /// At most one combatant left standing.
    Finished { survivor: Option<String> },
    /// The session was shut down mid-battle.
    Stopped,
}

/// Drive turns until one combatant remains or the session stops.
pub fn run_battle(ctx: &SessionContext, turns: &mut TurnController) -> BattleEnd {
    info!(combatants = turns.len(), "battle started");

    while ctx.is_running() && !turns.is_battle_over() {
        let actor = turns.current_index();
        match seat_of(ctx, turns, actor) {
            Seat::Empty => {}
            Seat::Abandoned if !ctx.is_running() => break,
            Seat::Abandoned => {
                debug!(%actor, "slot closed before the actor's turn");
                depart(ctx, turns, actor);
            }
            Seat::Taken(stream) => match play_turn(ctx, turns, actor, &stream) {
                Ok(()) => {}
                Err(_) if !ctx.is_running() => break,
                Err(e) => {
                    debug!(%actor, error = %e, "lost player during battle");
                    depart(ctx, turns, actor);
                }
            },
        }
        turns.advance();
    }

    if !ctx.is_running() {
        info!("battle interrupted by shutdown");
        return BattleEnd::Stopped;
    }

    let survivor = turns.survivor().map(|c| c.name().to_string());
    if let Some(name) = &survivor {
        ctx.broadcast(&text::last_standing(name));
    }
    ctx.broadcast(text::BATTLE_OVER);
    let closed = ctx.lock().connections.close_all();
    ctx.stop();
    info!(survivor = survivor.as_deref().unwrap_or("none"), closed, "battle over");
    BattleEnd::Finished { survivor }
}

/// Where the current actor stands at the head of its turn.
enum Seat {
    /// Dead; nothing to do.
    Empty,
    /// Alive, but its connection is gone.
    Abandoned,
    Taken(Arc<TcpStream>),
}

fn seat_of(ctx: &SessionContext, turns: &TurnController, actor: RosterIndex) -> Seat {
    let Some(combatant) = turns.combatant(actor).filter(|c| c.is_alive()) else {
        return Seat::Empty;
    };
    let stream = combatant
        .slot_position()
        .and_then(|position| ctx.lock().connections.stream_at(position));
    match stream {
        Some(stream) => Seat::Taken(stream),
        None => Seat::Abandoned,
    }
}

/// Run one actor's turn to a resolved, non-error outcome.
fn play_turn(
    ctx: &SessionContext,
    turns: &mut TurnController,
    actor: RosterIndex,
    stream: &TcpStream,
) -> Result<(), LineError> {
    loop {
        let code = ask_action(stream)?;
        let target = ask_target(turns, actor, stream)?;

        let outcome = turns.resolve(actor, code, target);
        let attacker = turns.combatant(actor).map(|c| c.name()).unwrap_or_default();
        let defender = turns.combatant(target).map(|c| c.name()).unwrap_or_default();
        if outcome.is_error {
            ctx.broadcast(&text::action_error(&outcome.description));
        } else {
            ctx.broadcast(&text::action_result(attacker, defender, &outcome.description));
            if let Some(notice) = &outcome.blocked {
                ctx.broadcast(notice);
            }
        }
        ctx.broadcast(&text::status_block(&turns.status_entries()));

        if !outcome.is_error {
            return Ok(());
        }
        debug!(%actor, reason = %outcome.description, "action failed, same actor again");
    }
}

fn ask_action(stream: &TcpStream) -> Result<i64, LineError> {
    loop {
        let reply = exchange(stream, &text::action_prompt())?;
        match reply.trim().parse::<i64>() {
            Ok(code) if ActionKind::from_code(code).is_some() => return Ok(code),
            _ => write_line(&mut &*stream, text::INVALID_ACTION)?,
        }
    }
}

fn ask_target(
    turns: &TurnController,
    actor: RosterIndex,
    stream: &TcpStream,
) -> Result<RosterIndex, LineError> {
    loop {
        let listing = text::target_listing(&turns.target_candidates(actor));
        let reply = exchange(stream, &listing)?;
        match reply.trim().parse::<usize>().map(RosterIndex) {
            Ok(target) if turns.is_valid_target(actor, target) => return Ok(target),
            _ => write_line(&mut &*stream, text::INVALID_TARGET)?,
        }
    }
}

/// Send a prompt and block for the reply line.
fn exchange(stream: &TcpStream, prompt: &str) -> Result<String, LineError> {
    write_line(&mut &*stream, prompt)?;
    read_line(&mut &*stream)
}

/// Remove a player who dropped mid-battle.
fn depart(ctx: &SessionContext, turns: &mut TurnController, actor: RosterIndex) {
    let Some(combatant) = turns.combatant(actor) else {
        return;
    };
    let name = combatant.name().to_string();
    if let Some(position) = combatant.slot_position() {
        ctx.lock().connections.close_at(position);
    }
    turns.mark_dead(actor);
    info!(%actor, %name, "player disconnected during battle");
    ctx.broadcast(&text::battle_departure(&name));
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Write};
    use std::thread;

    use skirmish_combat::{Archetype, Combatant};
    use skirmish_prng::DiceRng;

    use super::*;
    use crate::config::ArenaConfig;
    use crate::connection::tests::tcp_pair;

    struct Player {
        writer: TcpStream,
        reader: BufReader<TcpStream>,
    }

    impl Player {
        fn line(&mut self) -> String {
            read_line(&mut self.reader).unwrap()
        }

        /// Read until a prompt line arrives; returns everything read.
        fn until_prompt(&mut self) -> Vec<String> {
            let mut lines = Vec::new();
            loop {
                let line = self.line();
                let done = line.starts_with(text::INPUT_MARKER);
                lines.push(line);
                if done {
                    return lines;
                }
            }
        }

        fn say(&mut self, line: &str) {
            writeln!(self.writer, "{line}").unwrap();
        }
    }

    /// Session with one blocking slot per combatant, positions assigned.
    fn arena(mut roster: Vec<Combatant>) -> (Arc<SessionContext>, TurnController, Vec<Player>) {
        let ctx = SessionContext::new(ArenaConfig::default());
        let mut players = Vec::new();
        for (position, combatant) in roster.iter_mut().enumerate() {
            let (client, server) = tcp_pair();
            ctx.lock().connections.admit(server);
            combatant.set_slot_position(position);
            players.push(Player {
                reader: BufReader::new(client.try_clone().unwrap()),
                writer: client,
            });
        }
        (ctx, TurnController::new(roster, DiceRng::new(7)), players)
    }

    #[test]
    fn one_hit_battle_to_the_end() {
        let roster = vec![
            Combatant::with_stats("Grom", Archetype::Orc, 90, 10, 100),
            Combatant::with_stats("Bilbo", Archetype::Halfling, 50, 15, 10),
        ];
        let (ctx, mut turns, mut players) = arena(roster);
        let ctx_battle = Arc::clone(&ctx);
        let battle = thread::spawn(move || run_battle(&ctx_battle, &mut turns));

        let grom = &mut players[0];
        assert_eq!(grom.until_prompt(), vec![text::action_prompt()]);
        grom.say("9");
        assert_eq!(grom.line(), text::INVALID_ACTION);
        grom.until_prompt();
        grom.say("0");
        let listing = grom.until_prompt();
        assert_eq!(listing[0], "Choose target:");
        assert_eq!(listing[1], "1: Bilbo (HP: 50, Alive)");
        grom.say("0");
        assert_eq!(grom.line(), text::INVALID_TARGET);
        grom.until_prompt();
        grom.say("1");

        assert_eq!(
            battle.join().unwrap(),
            BattleEnd::Finished {
                survivor: Some("Grom".into())
            }
        );
        assert!(!ctx.is_running());
        assert_eq!(ctx.open_count(), 0);

        let bilbo = &mut players[1];
        assert_eq!(
            bilbo.line(),
            "Grom used action on Bilbo. Grom attacks aggressively! Causes 100 of damage."
        );
        assert_eq!(bilbo.line(), "");
        assert_eq!(bilbo.line(), "==== Status after this turn ====");
        assert_eq!(bilbo.line(), "0: Grom (HP: 90, Alive)");
        assert_eq!(bilbo.line(), "1: Bilbo (HP: 0, Dead)");
        let rest: Vec<String> = std::iter::from_fn(|| read_line(&mut bilbo.reader).ok()).collect();
        let tail = &rest[rest.len() - 2..];
        assert_eq!(tail[0], text::last_standing("Grom"));
        assert_eq!(tail[1], text::BATTLE_OVER);
    }

    #[test]
    fn failed_spell_keeps_the_turn() {
        let roster = vec![
            Combatant::with_stats("Gandalf", Archetype::Mage, 65, 0, 10),
            Combatant::with_stats("Grom", Archetype::Orc, 90, 10, 15),
        ];
        let (ctx, mut turns, mut players) = arena(roster);
        let ctx_battle = Arc::clone(&ctx);
        let battle = thread::spawn(move || {
            let end = run_battle(&ctx_battle, &mut turns);
            (end, turns)
        });

        let gandalf = &mut players[0];
        gandalf.until_prompt();
        gandalf.say("1");
        gandalf.until_prompt();
        gandalf.say("1");
        let after = gandalf.until_prompt();
        assert!(after.contains(&"Error: Mana is not sufficient!".to_string()));
        assert_eq!(after.last().unwrap(), &text::action_prompt());

        ctx.shutdown(None);
        let (end, turns) = battle.join().unwrap();
        assert_eq!(end, BattleEnd::Stopped);
        assert_eq!(turns.current_index(), RosterIndex(0));
        assert_eq!(turns.combatant(RosterIndex(1)).unwrap().health(), 90);
    }

    #[test]
    fn disconnect_during_target_selection() {
        let roster = vec![
            Combatant::with_stats("A", Archetype::Orc, 80, 10, 10),
            Combatant::with_stats("B", Archetype::Orc, 60, 10, 10),
            Combatant::with_stats("C", Archetype::Orc, 40, 10, 10),
        ];
        let (ctx, mut turns, mut players) = arena(roster);
        let ctx_battle = Arc::clone(&ctx);
        let battle = thread::spawn(move || {
            let end = run_battle(&ctx_battle, &mut turns);
            (end, turns)
        });

        let mut a = players.remove(0);
        a.until_prompt();
        a.say("0");
        let listing = a.until_prompt();
        assert_eq!(listing.len(), 4, "header, two targets, prompt");
        drop(a);

        let b = &mut players[0];
        assert_eq!(b.line(), "A disconnected and is out!");
        assert_eq!(b.line(), text::action_prompt(), "turn passes to B");
        let c = &mut players[1];
        assert_eq!(c.line(), "A disconnected and is out!");

        ctx.shutdown(None);
        let (end, turns) = battle.join().unwrap();
        assert_eq!(end, BattleEnd::Stopped);
        assert!(!turns.combatant(RosterIndex(0)).unwrap().is_alive());
        assert_eq!(turns.current_index(), RosterIndex(1));
        assert_eq!(turns.alive_count(), 2);
    }

    #[test]
    fn closed_slot_counts_as_departure() {
        let roster = vec![
            Combatant::with_stats("A", Archetype::Orc, 80, 10, 10),
            Combatant::with_stats("B", Archetype::Orc, 60, 10, 10),
            Combatant::with_stats("C", Archetype::Orc, 40, 10, 10),
        ];
        let (ctx, mut turns, mut players) = arena(roster);
        ctx.lock().connections.close_at(0);
        let ctx_battle = Arc::clone(&ctx);
        let battle = thread::spawn(move || {
            let end = run_battle(&ctx_battle, &mut turns);
            (end, turns)
        });

        assert_eq!(players[1].line(), "A disconnected and is out!");
        assert_eq!(players[1].line(), text::action_prompt());
        assert_eq!(players[2].line(), "A disconnected and is out!");
        ctx.shutdown(None);
        let (_, turns) = battle.join().unwrap();
        assert!(!turns.combatant(RosterIndex(0)).unwrap().is_alive());
        assert_eq!(turns.current_index(), RosterIndex(1));
    }

    #[test]
    fn battle_ends_when_only_one_open_slot_remains() {
        let roster = vec![
            Combatant::with_stats("A", Archetype::Orc, 80, 10, 10),
            Combatant::with_stats("B", Archetype::Orc, 60, 10, 10),
            Combatant::with_stats("C", Archetype::Orc, 40, 10, 10),
        ];
        let (ctx, mut turns, mut players) = arena(roster);
        {
            let mut state = ctx.lock();
            state.connections.close_at(0);
            state.connections.close_at(1);
        }
        let ctx_battle = Arc::clone(&ctx);
        let battle = thread::spawn(move || run_battle(&ctx_battle, &mut turns));

        assert_eq!(
            battle.join().unwrap(),
            BattleEnd::Finished {
                survivor: Some("C".into())
            }
        );
        let c = &mut players[2];
        assert_eq!(c.line(), "A disconnected and is out!");
        assert_eq!(c.line(), "B disconnected and is out!");
        assert_eq!(c.line(), text::last_standing("C"));
        assert_eq!(c.line(), text::BATTLE_OVER);
    }
}
