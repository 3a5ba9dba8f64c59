/* ************************************************************************
*   File: action.rs                                       Part of TideMUD *
*  Usage: Per-actor delayed actions with faculty-scoped interruption      *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

/*
 * Actions are temporally delayed operations bound to a single actor:
 * preparing a spell, swinging an axe, a delayed say.  An actor holds at
 * most one action per occupied faculty; starting a new action whose
 * faculty mask overlaps an outstanding one interrupts the old action
 * first.
 *
 * Ordering note: within one pulse, actors are visited in registry order,
 * not by remaining delay.  Two different actors whose actions come due on
 * the same pulse may fire in either order.  Call sites here only ever keep
 * one action in flight per actor, so nothing depends on cross-actor
 * ordering; code that stacks actions must not either.
 */

use std::any::Any;
use std::collections::HashMap;

use log::warn;

use crate::db::DB;
use crate::depot::DepotId;
use crate::hooks::HOOK_CHAR_FROM_GAME;
use crate::structs::{Faculty, Subject};
use crate::Game;

pub type ActionFn = fn(&mut Game, &mut DB, DepotId, Option<Box<dyn Any>>, Faculty, &str);

pub struct Action {
    delay: i32,
    faculties: Faculty,
    on_complete: Option<ActionFn>,
    on_interrupt: Option<ActionFn>,
    data: Option<Box<dyn Any>>,
    arg: String,
}

/// Registry of in-flight actions, keyed by actor.  No empty lists are
/// retained: an actor disappears from the registry when its last action
/// completes or is interrupted.
pub struct ActionScheduler {
    actors: HashMap<DepotId, Vec<Action>>,
}

impl ActionScheduler {
    pub fn new() -> ActionScheduler {
        ActionScheduler {
            actors: HashMap::new(),
        }
    }

    pub fn has_actions(&self, chid: DepotId) -> bool {
        self.actors.contains_key(&chid)
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    fn attach(&mut self, chid: DepotId, action: Action) {
        self.actors.entry(chid).or_default().push(action);
    }

    /* pull out every action whose faculties intersect the mask */
    fn detach_overlapping(&mut self, chid: DepotId, faculties: Faculty) -> Vec<Action> {
        let mut removed = vec![];
        if let Some(list) = self.actors.get_mut(&chid) {
            let mut i = 0;
            while i < list.len() {
                if list[i].faculties.intersects(faculties) {
                    removed.push(list.remove(i));
                } else {
                    i += 1;
                }
            }
            if list.is_empty() {
                self.actors.remove(&chid);
            }
        }
        removed
    }

    /* count down every action; pull out the ones that came due */
    fn advance(&mut self, time: i32) -> Vec<(DepotId, Action)> {
        let mut due = vec![];
        let actor_ids: Vec<DepotId> = self.actors.keys().copied().collect();
        for chid in actor_ids {
            let list = self.actors.get_mut(&chid).unwrap();
            let mut i = 0;
            while i < list.len() {
                list[i].delay -= time;
                if list[i].delay <= 0 {
                    due.push((chid, list.remove(i)));
                } else {
                    i += 1;
                }
            }
            if list.is_empty() {
                self.actors.remove(&chid);
            }
        }
        due
    }
}

pub fn init_actions(game: &mut Game) {
    game.hooks.add(HOOK_CHAR_FROM_GAME, action_teardown);
}

/* an actor leaving the world takes its outstanding actions with it */
fn action_teardown(game: &mut Game, db: &mut DB, subject: Subject) {
    if let Subject::Char(chid) = subject {
        interrupt_action(game, db, chid, Faculty::all());
    }
}

/// Interrupt every action of `chid` whose faculties intersect the mask,
/// running each one's interruption callback.  Interrupting an actor with
/// no actions is a no-op.
pub fn interrupt_action(game: &mut Game, db: &mut DB, chid: DepotId, faculties: Faculty) {
    for action in game.actions.detach_overlapping(chid, faculties) {
        if let Some(on_interrupt) = action.on_interrupt {
            on_interrupt(game, db, chid, action.data, action.faculties, &action.arg);
        }
    }
}

/// Start a new action for `chid`, interrupting anything that occupies one
/// of the requested faculties first.
pub fn start_action(
    game: &mut Game,
    db: &mut DB,
    chid: DepotId,
    delay: i32,
    faculties: Faculty,
    on_complete: Option<ActionFn>,
    on_interrupt: Option<ActionFn>,
    data: Option<Box<dyn Any>>,
    arg: &str,
) {
    interrupt_action(game, db, chid, faculties);
    game.actions.attach(
        chid,
        Action {
            delay,
            faculties,
            on_complete,
            on_interrupt,
            data,
            arg: arg.to_string(),
        },
    );
}

/// Let the registry know `time` pulses have gone by.  Due actions are
/// detached before their completion callbacks run, so a callback that
/// starts another action never sees its predecessor in the registry.
pub fn pulse_actions(game: &mut Game, db: &mut DB, time: i32) {
    for (chid, action) in game.actions.advance(time) {
        if !db.chars.contains(chid) {
            warn!("pulse_actions: discarding due action for vanished actor {:?}", chid);
            continue;
        }
        if let Some(on_complete) = action.on_complete {
            on_complete(game, db, chid, action.data, action.faculties, &action.arg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::run_hooks;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Trace = Rc<RefCell<Vec<String>>>;

    fn trace_data(trace: &Trace) -> Option<Box<dyn Any>> {
        Some(Box::new(trace.clone()))
    }

    fn log_complete(
        _game: &mut Game,
        _db: &mut DB,
        _chid: DepotId,
        data: Option<Box<dyn Any>>,
        _faculties: Faculty,
        arg: &str,
    ) {
        if let Some(trace) = data.and_then(|b| b.downcast::<Trace>().ok()) {
            trace.borrow_mut().push(format!("{} complete", arg));
        }
    }

    fn log_interrupt(
        _game: &mut Game,
        _db: &mut DB,
        _chid: DepotId,
        data: Option<Box<dyn Any>>,
        _faculties: Faculty,
        arg: &str,
    ) {
        if let Some(trace) = data.and_then(|b| b.downcast::<Trace>().ok()) {
            trace.borrow_mut().push(format!("{} interrupted", arg));
        }
    }

    #[test]
    fn overlapping_start_interrupts_before_expiry() {
        let (mut game, mut db) = crate::test_context();
        let chid = db.create_char("Edda", "edda");
        let trace: Trace = Rc::new(RefCell::new(vec![]));

        start_action(
            &mut game,
            &mut db,
            chid,
            3,
            Faculty::MENTAL,
            Some(log_complete),
            Some(log_interrupt),
            trace_data(&trace),
            "first",
        );
        pulse_actions(&mut game, &mut db, 1);
        assert!(trace.borrow().is_empty());

        start_action(
            &mut game,
            &mut db,
            chid,
            2,
            Faculty::MENTAL,
            Some(log_complete),
            Some(log_interrupt),
            trace_data(&trace),
            "second",
        );
        assert_eq!(*trace.borrow(), vec!["first interrupted"]);

        pulse_actions(&mut game, &mut db, 1);
        pulse_actions(&mut game, &mut db, 1);
        assert_eq!(*trace.borrow(), vec!["first interrupted", "second complete"]);
        assert!(!game.actions.has_actions(chid));
    }

    #[test]
    fn disjoint_faculties_do_not_interrupt() {
        let (mut game, mut db) = crate::test_context();
        let chid = db.create_char("Edda", "edda");
        let trace: Trace = Rc::new(RefCell::new(vec![]));

        start_action(
            &mut game,
            &mut db,
            chid,
            2,
            Faculty::MENTAL,
            Some(log_complete),
            Some(log_interrupt),
            trace_data(&trace),
            "think",
        );
        start_action(
            &mut game,
            &mut db,
            chid,
            2,
            Faculty::FEET,
            Some(log_complete),
            Some(log_interrupt),
            trace_data(&trace),
            "march",
        );
        pulse_actions(&mut game, &mut db, 2);
        let done = trace.borrow();
        assert_eq!(done.len(), 2);
        assert!(done.contains(&"think complete".to_string()));
        assert!(done.contains(&"march complete".to_string()));
    }

    #[test]
    fn ticking_one_actor_never_touches_another() {
        let (mut game, mut db) = crate::test_context();
        let quick = db.create_char("Quick", "a");
        let slow = db.create_char("Slow", "b");
        let trace: Trace = Rc::new(RefCell::new(vec![]));

        start_action(
            &mut game,
            &mut db,
            quick,
            2,
            Faculty::MENTAL,
            Some(log_complete),
            None,
            trace_data(&trace),
            "quick",
        );
        start_action(
            &mut game,
            &mut db,
            slow,
            5,
            Faculty::MENTAL,
            Some(log_complete),
            None,
            trace_data(&trace),
            "slow",
        );
        pulse_actions(&mut game, &mut db, 2);
        assert_eq!(*trace.borrow(), vec!["quick complete"]);
        assert!(game.actions.has_actions(slow));
        assert!(!game.actions.has_actions(quick));
    }

    #[test]
    fn interrupting_an_idle_actor_is_a_noop() {
        let (mut game, mut db) = crate::test_context();
        let chid = db.create_char("Edda", "edda");
        interrupt_action(&mut game, &mut db, chid, Faculty::all());
        assert_eq!(game.actions.actor_count(), 0);
    }

    #[test]
    fn teardown_hook_interrupts_everything() {
        let (mut game, mut db) = crate::test_context();
        let chid = db.create_char("Edda", "edda");
        let trace: Trace = Rc::new(RefCell::new(vec![]));

        start_action(
            &mut game,
            &mut db,
            chid,
            10,
            Faculty::MENTAL,
            Some(log_complete),
            Some(log_interrupt),
            trace_data(&trace),
            "doomed",
        );
        run_hooks(&mut game, &mut db, HOOK_CHAR_FROM_GAME, Subject::Char(chid));
        assert_eq!(*trace.borrow(), vec!["doomed interrupted"]);
        assert!(!game.actions.has_actions(chid));
    }
}
