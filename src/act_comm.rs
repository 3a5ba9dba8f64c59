/* ************************************************************************
*   File: act_comm.rs                                     Part of TideMUD *
*  Usage: Player communication commands                                   *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

use std::any::Any;

use crate::action::start_action;
use crate::config::seconds;
use crate::db::DB;
use crate::depot::DepotId;
use crate::structs::Faculty;
use crate::{send_to_char, send_to_room, Game};

pub fn do_say(game: &mut Game, db: &mut DB, chid: DepotId, argument: &str, _subcmd: i32) {
    let message = argument.trim();
    if message.is_empty() {
        send_to_char(game, db, chid, "Say what?\r\n");
        return;
    }
    let room_id = match db.ch(chid).in_room {
        Some(r) => r,
        None => {
            send_to_char(game, db, chid, "There is no one here to listen.\r\n");
            return;
        }
    };
    send_to_char(game, db, chid, &format!("You say, '{}'\r\n", message));
    let name = db.ch(chid).name.clone();
    send_to_room(
        game,
        db,
        room_id,
        Some(chid),
        &format!("{} says, '{}'\r\n", name, message),
    );
}

/* completion and interruption for the delayed say below */
fn dsay_complete(
    game: &mut Game,
    db: &mut DB,
    chid: DepotId,
    _data: Option<Box<dyn Any>>,
    _faculties: Faculty,
    arg: &str,
) {
    do_say(game, db, chid, arg, 0);
}

fn dsay_interrupt(
    game: &mut Game,
    db: &mut DB,
    chid: DepotId,
    _data: Option<Box<dyn Any>>,
    _faculties: Faculty,
    _arg: &str,
) {
    send_to_char(game, db, chid, "Your delayed say was interrupted.\r\n");
}

/// Say something, three seconds from now.  Occupies speech until then.
pub fn do_dsay(game: &mut Game, db: &mut DB, chid: DepotId, argument: &str, _subcmd: i32) {
    let message = argument.trim();
    if message.is_empty() {
        send_to_char(game, db, chid, "Delay-say what?\r\n");
        return;
    }
    send_to_char(game, db, chid, "You start a delayed say.\r\n");
    start_action(
        game,
        db,
        chid,
        seconds(3),
        Faculty::SPEECH,
        Some(dsay_complete),
        Some(dsay_interrupt),
        None,
        message,
    );
}
