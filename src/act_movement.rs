/* ************************************************************************
*   File: act_movement.rs                                 Part of TideMUD *
*  Usage: Moving characters between rooms                                 *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

use log::warn;

use crate::act_informative::look_at_room;
use crate::action::interrupt_action;
use crate::db::DB;
use crate::depot::DepotId;
use crate::structs::{Faculty, DIR_NAMES};
use crate::{send_to_char, send_to_room, Game};

pub fn do_move(game: &mut Game, db: &mut DB, chid: DepotId, _argument: &str, subcmd: i32) {
    let dir = subcmd as usize;
    let room_id = match db.ch(chid).in_room {
        Some(r) => r,
        None => {
            send_to_char(game, db, chid, "You cannot go anywhere from here.\r\n");
            return;
        }
    };
    let to_vnum = match db.room(room_id).exits[dir] {
        Some(v) => v,
        None => {
            send_to_char(game, db, chid, "You cannot go that way.\r\n");
            return;
        }
    };
    let to_room = match db.room_by_vnum(to_vnum) {
        Some(r) => r,
        None => {
            warn!(
                "do_move: exit {} of room {} points at missing room {}",
                DIR_NAMES[dir],
                db.room(room_id).vnum,
                to_vnum
            );
            send_to_char(game, db, chid, "That way lies only mist.\r\n");
            return;
        }
    };

    /* walking off breaks concentration */
    interrupt_action(game, db, chid, Faculty::all());

    let name = db.ch(chid).name.clone();
    send_to_room(
        game,
        db,
        room_id,
        Some(chid),
        &format!("{} leaves {}.\r\n", name, DIR_NAMES[dir]),
    );
    db.char_from_room(chid);
    db.char_to_room(chid, to_room);
    send_to_room(
        game,
        db,
        to_room,
        Some(chid),
        &format!("{} has arrived.\r\n", name),
    );
    look_at_room(game, db, chid);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::START_ROOM;
    use crate::structs::{NORTH, SOUTH, UP};

    #[test]
    fn movement_follows_exits_both_ways() {
        let (mut game, mut db) = crate::test_context();
        db.boot_world();
        let chid = db.create_char("Brine", "maris");
        let start = db.room_by_vnum(START_ROOM).unwrap();
        db.char_to_room(chid, start);

        do_move(&mut game, &mut db, chid, "", NORTH as i32);
        assert_eq!(db.ch(chid).in_room, db.room_by_vnum(3002));
        do_move(&mut game, &mut db, chid, "", SOUTH as i32);
        assert_eq!(db.ch(chid).in_room, Some(start));
    }

    #[test]
    fn missing_exits_move_no_one() {
        let (mut game, mut db) = crate::test_context();
        db.boot_world();
        let chid = db.create_char("Brine", "maris");
        let start = db.room_by_vnum(START_ROOM).unwrap();
        db.char_to_room(chid, start);

        do_move(&mut game, &mut db, chid, "", UP as i32);
        assert_eq!(db.ch(chid).in_room, Some(start));
    }

    #[test]
    fn moving_interrupts_outstanding_actions() {
        let (mut game, mut db) = crate::test_context();
        db.boot_world();
        let chid = db.create_char("Brine", "maris");
        let start = db.room_by_vnum(START_ROOM).unwrap();
        db.char_to_room(chid, start);

        crate::action::start_action(
            &mut game, &mut db, chid, 50, Faculty::SPEECH, None, None, None, "",
        );
        assert!(game.actions.has_actions(chid));
        do_move(&mut game, &mut db, chid, "", NORTH as i32);
        assert!(!game.actions.has_actions(chid));
    }
}
