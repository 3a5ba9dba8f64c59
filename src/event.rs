/* ************************************************************************
*   File: event.rs                                        Part of TideMUD *
*  Usage: Delayed and recurring callbacks with bulk cancellation          *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

/*
 * Events are temporally delayed callbacks that, unlike actions, are not
 * scoped to one-per-actor: anything may own any number of events, and an
 * event need not be owned at all.  A quest that opens in five minutes, a
 * scheduled reboot, the autosave cycle.
 *
 * A delay of zero means "deferred immediate": the event goes to the back
 * of the queue and sits out the pass that is already underway, so a
 * callback that schedules another zero-delay event can never cascade
 * within a single pulse.
 *
 * Teardown notifications for characters, objects and rooms are subscribed
 * to at startup; an entity leaving the world silently cancels every event
 * it owns or is referenced by, so no callback can fire against it later.
 */

use std::any::Any;
use std::collections::VecDeque;

use crate::db::DB;
use crate::hooks::{HOOK_CHAR_FROM_GAME, HOOK_OBJ_FROM_GAME, HOOK_ROOM_FROM_GAME};
use crate::structs::Subject;
use crate::Game;

pub type EventFn = fn(&mut Game, &mut DB, Subject, Option<&mut dyn Any>, &str);
pub type InvolveFn = fn(Subject, Option<&dyn Any>) -> bool;

pub struct Event {
    owner: Subject,
    on_complete: EventFn,
    check_involvement: Option<InvolveFn>,
    delay: i32,
    original_delay: i32,
    data: Option<Box<dyn Any>>,
    arg: String,
    recurring: bool,
    /* zero-delay events sit out the pass already underway */
    deferred: bool,
}

impl Event {
    fn involves(&self, subject: Subject) -> bool {
        if subject != Subject::None && self.owner == subject {
            return true;
        }
        match self.check_involvement {
            Some(check) => check(subject, self.data.as_deref()),
            None => false,
        }
    }
}

pub struct EventScheduler {
    events: VecDeque<Event>,
    /* subjects cancelled during the pulse currently running */
    cancelled: Vec<Subject>,
}

impl EventScheduler {
    pub fn new() -> EventScheduler {
        EventScheduler {
            events: VecDeque::new(),
            cancelled: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn insert(&mut self, event: Event) {
        if event.deferred {
            self.events.push_back(event);
        } else {
            self.events.push_front(event);
        }
    }

    /// Remove, without running any callback, every event owned by
    /// `subject` or whose involvement predicate claims it.  Cancelling a
    /// subject with no events is a no-op.
    pub fn cancel_involving(&mut self, subject: Subject) {
        self.cancelled.push(subject);
        self.events.retain(|ev| !ev.involves(subject));
    }

    /* count down every pending event; pull out the ones that came due */
    fn advance(&mut self, time: i32) -> Vec<Event> {
        self.cancelled.clear();
        let mut due = vec![];
        for _ in 0..self.events.len() {
            let mut event = self.events.pop_front().unwrap();
            if event.deferred {
                event.deferred = false;
                self.events.push_back(event);
                continue;
            }
            event.delay -= time;
            if event.delay <= 0 {
                due.push(event);
            } else {
                self.events.push_back(event);
            }
        }
        due
    }

    fn was_cancelled(&self, event: &Event) -> bool {
        self.cancelled.iter().any(|s| event.involves(*s))
    }
}

pub fn init_events(game: &mut Game) {
    game.hooks.add(HOOK_CHAR_FROM_GAME, event_teardown);
    game.hooks.add(HOOK_OBJ_FROM_GAME, event_teardown);
    game.hooks.add(HOOK_ROOM_FROM_GAME, event_teardown);
}

fn event_teardown(game: &mut Game, _db: &mut DB, subject: Subject) {
    game.events.cancel_involving(subject);
}

/// Queue a new event.  `delay` is in pulses; zero defers to the next pass.
/// Recurring events re-arm to `delay` each time they fire.
pub fn start_event(
    game: &mut Game,
    owner: Subject,
    delay: i32,
    on_complete: EventFn,
    check_involvement: Option<InvolveFn>,
    data: Option<Box<dyn Any>>,
    arg: &str,
    recurring: bool,
) {
    let deferred = delay <= 0;
    game.events.insert(Event {
        owner,
        on_complete,
        check_involvement,
        delay: delay.max(0),
        original_delay: delay.max(0),
        data,
        arg: arg.to_string(),
        recurring,
        deferred,
    });
}

/// Let the registry know `time` pulses have gone by.  Due events are
/// detached before their callbacks run; a recurring event is reinserted
/// with its original delay afterwards, unless its subject was cancelled
/// from inside the callback.
pub fn pulse_events(game: &mut Game, db: &mut DB, time: i32) {
    for mut event in game.events.advance(time) {
        (event.on_complete)(game, db, event.owner, event.data.as_deref_mut(), &event.arg);
        if event.recurring && !game.events.was_cancelled(&event) {
            event.delay = event.original_delay;
            game.events.insert(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Count = Rc<RefCell<i32>>;

    fn bump(
        _game: &mut Game,
        _db: &mut DB,
        _owner: Subject,
        data: Option<&mut dyn Any>,
        _arg: &str,
    ) {
        if let Some(count) = data.and_then(|d| d.downcast_mut::<Count>()) {
            *count.borrow_mut() += 1;
        }
    }

    fn bump_then_chain_immediate(
        game: &mut Game,
        _db: &mut DB,
        _owner: Subject,
        data: Option<&mut dyn Any>,
        _arg: &str,
    ) {
        if let Some(count) = data.and_then(|d| d.downcast_mut::<Count>()) {
            *count.borrow_mut() += 1;
            let chained = count.clone();
            start_event(
                game,
                Subject::None,
                0,
                bump,
                None,
                Some(Box::new(chained)),
                "",
                false,
            );
        }
    }

    fn cancel_own_owner(
        game: &mut Game,
        _db: &mut DB,
        owner: Subject,
        data: Option<&mut dyn Any>,
        _arg: &str,
    ) {
        if let Some(count) = data.and_then(|d| d.downcast_mut::<Count>()) {
            *count.borrow_mut() += 1;
        }
        game.events.cancel_involving(owner);
    }

    struct ObjRef(crate::depot::DepotId);

    fn involves_obj(subject: Subject, data: Option<&dyn Any>) -> bool {
        match (subject, data.and_then(|d| d.downcast_ref::<ObjRef>())) {
            (Subject::Obj(id), Some(r)) => id == r.0,
            _ => false,
        }
    }

    #[test]
    fn one_shot_event_fires_once_after_delay() {
        let (mut game, mut db) = crate::test_context();
        let count: Count = Rc::new(RefCell::new(0));
        start_event(
            &mut game,
            Subject::None,
            3,
            bump,
            None,
            Some(Box::new(count.clone())),
            "",
            false,
        );
        pulse_events(&mut game, &mut db, 1);
        pulse_events(&mut game, &mut db, 1);
        assert_eq!(*count.borrow(), 0);
        pulse_events(&mut game, &mut db, 1);
        assert_eq!(*count.borrow(), 1);
        assert!(game.events.is_empty());
    }

    #[test]
    fn recurring_event_rearms_to_original_delay() {
        let (mut game, mut db) = crate::test_context();
        let count: Count = Rc::new(RefCell::new(0));
        start_event(
            &mut game,
            Subject::None,
            3,
            bump,
            None,
            Some(Box::new(count.clone())),
            "",
            true,
        );
        /* any split of increments summing to the delay fires it */
        pulse_events(&mut game, &mut db, 1);
        pulse_events(&mut game, &mut db, 2);
        assert_eq!(*count.borrow(), 1);
        /* remaining delay is back to exactly 3 */
        pulse_events(&mut game, &mut db, 2);
        assert_eq!(*count.borrow(), 1);
        pulse_events(&mut game, &mut db, 1);
        assert_eq!(*count.borrow(), 2);
        assert_eq!(game.events.len(), 1);
    }

    #[test]
    fn zero_delay_event_never_fires_in_the_pass_that_made_it() {
        let (mut game, mut db) = crate::test_context();
        let count: Count = Rc::new(RefCell::new(0));
        start_event(
            &mut game,
            Subject::None,
            1,
            bump_then_chain_immediate,
            None,
            Some(Box::new(count.clone())),
            "",
            false,
        );
        pulse_events(&mut game, &mut db, 1);
        /* the parent fired, the chained zero-delay event did not */
        assert_eq!(*count.borrow(), 1);
        assert_eq!(game.events.len(), 1);
        pulse_events(&mut game, &mut db, 1);
        pulse_events(&mut game, &mut db, 1);
        assert_eq!(*count.borrow(), 2);
        assert!(game.events.is_empty());
    }

    #[test]
    fn cancellation_by_involvement_reaches_referenced_subjects() {
        let (mut game, mut db) = crate::test_context();
        let owner = db.create_char("Ystra", "ystra");
        let obj = db.objs.push(crate::structs::ObjData::new("lantern", "A lantern."));
        let count: Count = Rc::new(RefCell::new(0));

        /* the event is owned by a character but its data references an
         * object; cancelling the object must still remove it */
        start_event(
            &mut game,
            Subject::Char(owner),
            5,
            bump,
            Some(involves_obj),
            Some(Box::new(ObjRef(obj))),
            "",
            false,
        );
        game.events.cancel_involving(Subject::Obj(obj));
        assert!(game.events.is_empty());
        for _ in 0..10 {
            pulse_events(&mut game, &mut db, 1);
        }
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn cancellation_by_owner_runs_no_callbacks() {
        let (mut game, mut db) = crate::test_context();
        let owner = db.create_char("Ystra", "ystra");
        let count: Count = Rc::new(RefCell::new(0));
        start_event(
            &mut game,
            Subject::Char(owner),
            2,
            bump,
            None,
            Some(Box::new(count.clone())),
            "",
            false,
        );
        game.events.cancel_involving(Subject::Char(owner));
        pulse_events(&mut game, &mut db, 5);
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn recurring_event_cancelled_from_its_own_callback_stays_gone() {
        let (mut game, mut db) = crate::test_context();
        let owner = db.create_char("Ystra", "ystra");
        let count: Count = Rc::new(RefCell::new(0));
        start_event(
            &mut game,
            Subject::Char(owner),
            1,
            cancel_own_owner,
            None,
            Some(Box::new(count.clone())),
            "",
            true,
        );
        pulse_events(&mut game, &mut db, 1);
        assert_eq!(*count.borrow(), 1);
        assert!(game.events.is_empty());
        pulse_events(&mut game, &mut db, 1);
        assert_eq!(*count.borrow(), 1);
    }
}
