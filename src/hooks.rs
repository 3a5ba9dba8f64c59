/* ************************************************************************
*   File: hooks.rs                                        Part of TideMUD *
*  Usage: Named hooks for cross-module notification                      *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

use std::collections::HashMap;

use crate::db::DB;
use crate::structs::Subject;
use crate::Game;

/* the three teardown notifications every entity kind fires */
pub const HOOK_CHAR_FROM_GAME: &str = "char_from_game";
pub const HOOK_OBJ_FROM_GAME: &str = "obj_from_game";
pub const HOOK_ROOM_FROM_GAME: &str = "room_from_game";

pub type HookFn = fn(&mut Game, &mut DB, Subject);

/// Registry of named hooks.  Modules attach plain functions at startup;
/// anyone may run a hook by name without knowing who is listening.
pub struct HookTable {
    table: HashMap<&'static str, Vec<HookFn>>,
}

impl HookTable {
    pub fn new() -> HookTable {
        HookTable {
            table: HashMap::new(),
        }
    }

    pub fn add(&mut self, name: &'static str, hook: HookFn) {
        self.table.entry(name).or_default().push(hook);
    }

    fn fns(&self, name: &str) -> Vec<HookFn> {
        self.table.get(name).cloned().unwrap_or_default()
    }
}

/// Run every hook attached to `name`.  The function list is copied out
/// first so hooks are free to touch the game context, including the hook
/// table itself.
pub fn run_hooks(game: &mut Game, db: &mut DB, name: &str, subject: Subject) {
    for hook in game.hooks.fns(name) {
        hook(game, db, subject);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_hook_is_a_noop() {
        let (mut game, mut db) = crate::test_context();
        run_hooks(&mut game, &mut db, "no_such_hook", Subject::None);
    }

    #[test]
    fn hooks_run_in_registration_order() {
        let (mut game, mut db) = crate::test_context();
        fn first(game: &mut Game, _db: &mut DB, _s: Subject) {
            game.last_desc += 1;
        }
        fn second(game: &mut Game, _db: &mut DB, _s: Subject) {
            game.last_desc *= 10;
        }
        game.hooks.add("order_check", first);
        game.hooks.add("order_check", second);
        run_hooks(&mut game, &mut db, "order_check", Subject::None);
        assert_eq!(game.last_desc, 10);
    }
}
