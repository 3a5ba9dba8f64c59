/* ************************************************************************
*   File: act_informative.rs                              Part of TideMUD *
*  Usage: Commands that show the player the world                         *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

use crate::db::DB;
use crate::depot::DepotId;
use crate::modify::page_string;
use crate::structs::{DIR_NAMES, NUM_DIRS};
use crate::{send_to_char, Game};

pub fn look_at_room(game: &mut Game, db: &mut DB, chid: DepotId) {
    let room_id = match db.ch(chid).in_room {
        Some(r) => r,
        None => {
            send_to_char(game, db, chid, "You are floating in a grey nothing.\r\n");
            return;
        }
    };
    let room = db.room(room_id);
    let mut out = format!("{}\r\n{}", room.name, room.description);

    let mut exits = String::new();
    for dir in 0..NUM_DIRS {
        if room.exits[dir].is_some() {
            if !exits.is_empty() {
                exits.push(' ');
            }
            exits.push_str(DIR_NAMES[dir]);
        }
    }
    if exits.is_empty() {
        out.push_str("[ Exits: none ]\r\n");
    } else {
        out.push_str(&format!("[ Exits: {} ]\r\n", exits));
    }

    for &oid in &room.objs {
        if let Some(obj) = db.objs.try_get(oid) {
            out.push_str(&format!("{}\r\n", obj.rdesc));
        }
    }
    for &other in &room.chars {
        if other == chid {
            continue;
        }
        if let Some(ch) = db.chars.try_get(other) {
            out.push_str(&format!("{} is here.\r\n", ch.name));
        }
    }
    send_to_char(game, db, chid, &out);
}

pub fn do_look(game: &mut Game, db: &mut DB, chid: DepotId, argument: &str, _subcmd: i32) {
    let target = argument.trim();
    if target.is_empty() {
        look_at_room(game, db, chid);
        return;
    }
    if target.eq_ignore_ascii_case("self") || target.eq_ignore_ascii_case("me") {
        let text = if db.ch(chid).description.is_empty() {
            "You see nothing special about yourself.\r\n".to_string()
        } else {
            db.ch(chid).description.replace('\n', "\r\n")
        };
        send_to_char(game, db, chid, &text);
        return;
    }
    let room_id = match db.ch(chid).in_room {
        Some(r) => r,
        None => {
            send_to_char(game, db, chid, "You do not see that here.\r\n");
            return;
        }
    };
    let found = db
        .room(room_id)
        .chars
        .iter()
        .copied()
        .find(|&c| c != chid && db.ch(c).name.eq_ignore_ascii_case(target));
    match found {
        Some(other) => {
            let text = if db.ch(other).description.is_empty() {
                format!("You see nothing special about {}.\r\n", db.ch(other).name)
            } else {
                db.ch(other).description.replace('\n', "\r\n")
            };
            send_to_char(game, db, chid, &text);
        }
        None => send_to_char(game, db, chid, "You do not see that here.\r\n"),
    }
}

pub fn do_who(game: &mut Game, db: &mut DB, chid: DepotId, _argument: &str, _subcmd: i32) {
    let mut out = format!(
        "Visitors ashore (up since {}):\r\n",
        game.boot_time.format("%a %b %e %H:%M:%S %Y")
    );
    let mut count = 0;
    for desc in game.descriptors.iter() {
        let other = match desc.character {
            Some(c) => c,
            None => continue,
        };
        if let Some(ch) = db.chars.try_get(other) {
            out.push_str(&format!("  {:<12} [{}]\r\n", ch.name, desc.host));
            count += 1;
        }
    }
    out.push_str(&format!("\r\n{} visible player{}.\r\n", count, if count == 1 { "" } else { "s" }));

    /* long listings go through the pager */
    if let Some(d_id) = db.ch(chid).desc {
        page_string(game.desc_mut(d_id), &out);
    }
}
