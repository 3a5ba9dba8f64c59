/* ************************************************************************
*   File: act_other.rs                                    Part of TideMUD *
*  Usage: Quitting, self-description, and pager controls                  *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

use log::error;

use crate::db::DB;
use crate::depot::DepotId;
use crate::modify::{page_back, page_continue, TextEditor};
use crate::structs::MAX_DESC_LENGTH;
use crate::{send_to_char, send_to_room, Game};

pub fn do_quit(game: &mut Game, db: &mut DB, chid: DepotId, _argument: &str, _subcmd: i32) {
    if let Err(e) = db.save_player(db.ch(chid)) {
        error!("saving {} on quit: {}", db.ch(chid).name, e);
    }
    let name = db.ch(chid).name.clone();
    send_to_char(game, db, chid, "Goodbye.  The tide will bring you back.\r\n");
    if let Some(room_id) = db.ch(chid).in_room {
        send_to_room(
            game,
            db,
            room_id,
            Some(chid),
            &format!("{} has left the game.\r\n", name),
        );
    }
    let d_id = db.ch(chid).desc;
    /* queued; the reap runs after this tick's iteration is done */
    db.extract_char(chid);
    if let Some(d_id) = d_id {
        game.desc_mut(d_id).pop_input_handler();
    }
}

fn describe_commit(game: &mut Game, db: &mut DB, d_id: DepotId, text: String) {
    let chid = match game.desc(d_id).character {
        Some(c) => c,
        None => return,
    };
    db.ch_mut(chid).description = text;
    send_to_char(game, db, chid, "Description set.\r\n");
}

pub fn do_describe(game: &mut Game, db: &mut DB, chid: DepotId, _argument: &str, _subcmd: i32) {
    let d_id = match db.ch(chid).desc {
        Some(d) => d,
        None => return,
    };
    let desc = game.desc_mut(d_id);
    desc.write_to_output(
        "Describe yourself to the world.  End with '@' on a line by itself.\r\n",
    );
    desc.push_input_handler(Box::new(TextEditor::new(MAX_DESC_LENGTH, describe_commit)));
}

pub fn do_more(game: &mut Game, db: &mut DB, chid: DepotId, _argument: &str, _subcmd: i32) {
    if let Some(d_id) = db.ch(chid).desc {
        page_continue(game.desc_mut(d_id));
    }
}

pub fn do_back(game: &mut Game, db: &mut DB, chid: DepotId, _argument: &str, _subcmd: i32) {
    if let Some(d_id) = db.ch(chid).desc {
        page_back(game.desc_mut(d_id));
    }
}
