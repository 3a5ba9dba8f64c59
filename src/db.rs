/* ************************************************************************
*   File: db.rs                                           Part of TideMUD *
*  Usage: World bootstrapping, entity registries, account/player files    *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::info;

use crate::config::START_ROOM;
use crate::depot::{Depot, DepotId};
use crate::hooks::{run_hooks, HOOK_CHAR_FROM_GAME, HOOK_OBJ_FROM_GAME, HOOK_ROOM_FROM_GAME};
use crate::structs::{CharData, ObjData, RoomData, Sex, Subject, EAST, NORTH, SOUTH, WEST};
use crate::Game;

/// One login account.  Owns a password digest and the names of the
/// characters created under it.
#[derive(Clone)]
pub struct AccountData {
    pub name: Rc<str>,
    pub passwd: [u8; 16],
    pub characters: Vec<String>,
}

pub struct DB {
    pub chars: Depot<CharData>,
    pub objs: Depot<ObjData>,
    pub rooms: Depot<RoomData>,
    room_vnums: HashMap<u32, DepotId>,
    /* entities queued for removal; reaped once per tick, never inline */
    chars_to_extract: Vec<DepotId>,
    objs_to_extract: Vec<DepotId>,
    rooms_to_extract: Vec<DepotId>,
    pub lib_dir: PathBuf,
}

impl DB {
    pub fn new<P: AsRef<Path>>(lib_dir: P) -> DB {
        DB {
            chars: Depot::new(),
            objs: Depot::new(),
            rooms: Depot::new(),
            room_vnums: HashMap::new(),
            chars_to_extract: vec![],
            objs_to_extract: vec![],
            rooms_to_extract: vec![],
            lib_dir: lib_dir.as_ref().to_path_buf(),
        }
    }

    pub fn ch(&self, chid: DepotId) -> &CharData {
        self.chars.get(chid)
    }

    pub fn ch_mut(&mut self, chid: DepotId) -> &mut CharData {
        self.chars.get_mut(chid)
    }

    pub fn room(&self, room_id: DepotId) -> &RoomData {
        self.rooms.get(room_id)
    }

    pub fn room_mut(&mut self, room_id: DepotId) -> &mut RoomData {
        self.rooms.get_mut(room_id)
    }

    pub fn room_by_vnum(&self, vnum: u32) -> Option<DepotId> {
        self.room_vnums.get(&vnum).copied()
    }

    fn add_room(&mut self, room: RoomData) -> DepotId {
        let vnum = room.vnum;
        let id = self.rooms.push(room);
        self.room_vnums.insert(vnum, id);
        id
    }

    fn link(&mut self, from: u32, dir: usize, to: u32) {
        let from_id = self.room_by_vnum(from).unwrap();
        self.rooms.get_mut(from_id).exits[dir] = Some(to);
    }

    /// Build the built-in starter world.
    pub fn boot_world(&mut self) {
        info!("Booting world.");
        self.add_room(RoomData::new(
            START_ROOM,
            "The Tidewater Commons",
            "Salt-bleached cobblestones ring a dry fountain.  A jetty lies to\r\n\
             the north and the chandlery's door stands open to the east.\r\n",
        ));
        self.add_room(RoomData::new(
            3002,
            "A Windswept Jetty",
            "Planks groan underfoot.  Grey water slaps the pilings below, and\r\n\
             the commons is back to the south.\r\n",
        ));
        self.add_room(RoomData::new(
            3003,
            "The Chandlery",
            "Coils of rope and jars of lamp oil crowd the shelves.  The\r\n\
             commons lies west.\r\n",
        ));
        self.link(START_ROOM, NORTH, 3002);
        self.link(3002, SOUTH, START_ROOM);
        self.link(START_ROOM, EAST, 3003);
        self.link(3003, WEST, START_ROOM);

        let bench = self
            .objs
            .push(ObjData::new("bench", "A driftwood bench sits by the fountain."));
        self.obj_to_room(bench, self.room_by_vnum(START_ROOM).unwrap());
        let lantern = self
            .objs
            .push(ObjData::new("lantern", "A brass lantern hangs from a hook."));
        self.obj_to_room(lantern, self.room_by_vnum(3003).unwrap());

        info!("Booted {} rooms and {} objects.", self.rooms.len(), self.objs.len());
    }

    pub fn create_char(&mut self, name: &str, account: &str) -> DepotId {
        self.chars.push(CharData::new(name, account))
    }

    pub fn char_to_room(&mut self, chid: DepotId, room_id: DepotId) {
        self.chars.get_mut(chid).in_room = Some(room_id);
        self.rooms.get_mut(room_id).chars.push(chid);
    }

    pub fn char_from_room(&mut self, chid: DepotId) {
        if let Some(room_id) = self.chars.get_mut(chid).in_room.take() {
            if let Some(room) = self.rooms.try_get_mut(room_id) {
                room.chars.retain(|&c| c != chid);
            }
        }
    }

    pub fn obj_to_room(&mut self, oid: DepotId, room_id: DepotId) {
        self.objs.get_mut(oid).in_room = Some(room_id);
        self.rooms.get_mut(room_id).objs.push(oid);
    }

    pub fn obj_from_room(&mut self, oid: DepotId) {
        if let Some(room_id) = self.objs.get_mut(oid).in_room.take() {
            if let Some(room) = self.rooms.try_get_mut(room_id) {
                room.objs.retain(|&o| o != oid);
            }
        }
    }

    /* mark for removal; the reap happens in extract_pending */
    pub fn extract_char(&mut self, chid: DepotId) {
        if !self.chars_to_extract.contains(&chid) {
            self.chars_to_extract.push(chid);
        }
    }

    pub fn extract_obj(&mut self, oid: DepotId) {
        if !self.objs_to_extract.contains(&oid) {
            self.objs_to_extract.push(oid);
        }
    }

    pub fn extract_room(&mut self, room_id: DepotId) {
        if !self.rooms_to_extract.contains(&room_id) {
            self.rooms_to_extract.push(room_id);
        }
    }
}

/// Reap everything queued for removal.  Runs after all per-tick iteration
/// is done, so nothing is ever pulled out of a collection mid-walk.  Each
/// departing entity fires its teardown hook while it is still resolvable.
pub fn extract_pending(game: &mut Game, db: &mut DB) {
    while let Some(chid) = db.chars_to_extract.pop() {
        if !db.chars.contains(chid) {
            continue;
        }
        run_hooks(game, db, HOOK_CHAR_FROM_GAME, Subject::Char(chid));
        db.char_from_room(chid);
        if let Some(d_id) = db.chars.get(chid).desc {
            if let Some(desc) = game.descriptors.try_get_mut(d_id) {
                desc.character = None;
            }
        }
        let ch = db.chars.take(chid).unwrap();
        info!("{} has left the game.", ch.name);
    }

    while let Some(oid) = db.objs_to_extract.pop() {
        if !db.objs.contains(oid) {
            continue;
        }
        run_hooks(game, db, HOOK_OBJ_FROM_GAME, Subject::Obj(oid));
        db.obj_from_room(oid);
        db.objs.take(oid);
    }

    while let Some(room_id) = db.rooms_to_extract.pop() {
        if !db.rooms.contains(room_id) {
            continue;
        }
        run_hooks(game, db, HOOK_ROOM_FROM_GAME, Subject::Room(room_id));
        /* anyone still standing there washes back to the start room */
        let stranded: Vec<DepotId> = db.rooms.get(room_id).chars.clone();
        let start = db.room_by_vnum(START_ROOM);
        for chid in stranded {
            db.char_from_room(chid);
            if let Some(start_id) = start {
                db.char_to_room(chid, start_id);
            }
        }
        for oid in db.rooms.get(room_id).objs.clone() {
            db.objs.get_mut(oid).in_room = None;
        }
        let vnum = db.rooms.get(room_id).vnum;
        db.room_vnums.remove(&vnum);
        db.rooms.take(room_id);
    }
}

/* ******************************************************************
*  account and player files                                         *
****************************************************************** */

fn hex_encode(bytes: &[u8; 16]) -> String {
    let mut s = String::with_capacity(32);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

fn hex_decode(s: &str) -> Option<[u8; 16]> {
    if s.len() != 32 {
        return None;
    }
    let mut out = [0u8; 16];
    for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
        let hi = (chunk[0] as char).to_digit(16)?;
        let lo = (chunk[1] as char).to_digit(16)?;
        out[i] = (hi * 16 + lo) as u8;
    }
    Some(out)
}

impl DB {
    fn account_path(&self, name: &str) -> PathBuf {
        self.lib_dir
            .join("accounts")
            .join(format!("{}.acct", name.to_lowercase()))
    }

    fn player_path(&self, name: &str) -> PathBuf {
        self.lib_dir
            .join("players")
            .join(format!("{}.pfile", name.to_lowercase()))
    }

    pub fn account_exists(&self, name: &str) -> bool {
        self.account_path(name).exists()
    }

    /* the very first character made on a fresh install gets admin */
    pub fn any_players(&self) -> bool {
        match fs::read_dir(self.lib_dir.join("players")) {
            Ok(mut entries) => entries.next().is_some(),
            Err(_) => false,
        }
    }

    pub fn save_account(&self, account: &AccountData) -> io::Result<()> {
        fs::create_dir_all(self.lib_dir.join("accounts"))?;
        let mut out = String::new();
        out.push_str(&format!("name: {}\n", account.name));
        out.push_str(&format!("passwd: {}\n", hex_encode(&account.passwd)));
        out.push_str(&format!("chars: {}\n", account.characters.join(" ")));
        fs::write(self.account_path(&account.name), out)
    }

    pub fn load_account(&self, name: &str) -> io::Result<Option<AccountData>> {
        let path = self.account_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        let mut acct_name = None;
        let mut passwd = None;
        let mut characters = vec![];
        for line in text.lines() {
            match line.split_once(": ") {
                Some(("name", v)) => acct_name = Some(v.to_string()),
                Some(("passwd", v)) => passwd = hex_decode(v),
                Some(("chars", v)) => {
                    characters = v.split_whitespace().map(|s| s.to_string()).collect()
                }
                _ => {}
            }
        }
        match (acct_name, passwd) {
            (Some(n), Some(p)) => Ok(Some(AccountData {
                name: Rc::from(n.as_str()),
                passwd: p,
                characters,
            })),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed account file for {}", name),
            )),
        }
    }

    pub fn player_exists(&self, name: &str) -> bool {
        self.player_path(name).exists()
    }

    pub fn save_player(&self, ch: &CharData) -> io::Result<()> {
        fs::create_dir_all(self.lib_dir.join("players"))?;
        let mut out = String::new();
        out.push_str(&format!("name: {}\n", ch.name));
        out.push_str(&format!("account: {}\n", ch.account));
        out.push_str(&format!("sex: {}\n", ch.sex.letter()));
        out.push_str(&format!("level: {}\n", ch.level));
        out.push_str("description:\n");
        out.push_str(&ch.description);
        if !ch.description.is_empty() && !ch.description.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("~\n");
        fs::write(self.player_path(&ch.name), out)
    }

    /// Load a saved character by name.  The returned record is not yet in
    /// the world; callers push it into the registry and place it.
    pub fn load_player(&self, name: &str) -> io::Result<Option<CharData>> {
        let path = self.player_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        let mut ch = CharData::new(name, "");
        let mut in_description = false;
        let mut description = String::new();
        for line in text.lines() {
            if in_description {
                if line == "~" {
                    in_description = false;
                } else {
                    description.push_str(line);
                    description.push('\n');
                }
                continue;
            }
            match line.split_once(':') {
                Some(("name", v)) => ch.name = Rc::from(v.trim()),
                Some(("account", v)) => ch.account = Rc::from(v.trim()),
                Some(("sex", v)) => {
                    ch.sex = v
                        .trim()
                        .chars()
                        .next()
                        .and_then(Sex::from_letter)
                        .unwrap_or(Sex::Neutral)
                }
                Some(("level", v)) => ch.level = v.trim().parse().unwrap_or(1),
                Some(("description", _)) => in_description = true,
                _ => {}
            }
        }
        ch.description = description;
        Ok(Some(ch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::LVL_ADMIN;

    #[test]
    fn account_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let db = DB::new(dir.path());
        let account = AccountData {
            name: Rc::from("Maris"),
            passwd: [7; 16],
            characters: vec!["Brine".to_string(), "Kelp".to_string()],
        };
        db.save_account(&account).unwrap();
        let loaded = db.load_account("maris").unwrap().unwrap();
        assert_eq!(&*loaded.name, "Maris");
        assert_eq!(loaded.passwd, [7; 16]);
        assert_eq!(loaded.characters, vec!["Brine", "Kelp"]);
    }

    #[test]
    fn player_file_round_trips_multiline_description() {
        let dir = tempfile::tempdir().unwrap();
        let db = DB::new(dir.path());
        let mut ch = CharData::new("Brine", "maris");
        ch.sex = Sex::Female;
        ch.level = LVL_ADMIN;
        ch.description = "Weathered hands.\nA squint that never leaves.\n".to_string();
        db.save_player(&ch).unwrap();
        let loaded = db.load_player("brine").unwrap().unwrap();
        assert_eq!(&*loaded.name, "Brine");
        assert_eq!(&*loaded.account, "maris");
        assert_eq!(loaded.sex, Sex::Female);
        assert_eq!(loaded.level, LVL_ADMIN);
        assert_eq!(loaded.description, ch.description);
    }

    #[test]
    fn loading_a_missing_player_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = DB::new(dir.path());
        assert!(db.load_player("nobody").unwrap().is_none());
    }

    #[test]
    fn extraction_is_deferred_until_the_reap() {
        let (mut game, mut db) = crate::test_context();
        db.boot_world();
        let chid = db.create_char("Brine", "maris");
        let start = db.room_by_vnum(START_ROOM).unwrap();
        db.char_to_room(chid, start);

        db.extract_char(chid);
        /* still present until the dedicated reap step */
        assert!(db.chars.contains(chid));
        extract_pending(&mut game, &mut db);
        assert!(!db.chars.contains(chid));
        assert!(db.room(start).chars.is_empty());
    }

    #[test]
    fn extracting_a_room_strands_no_one() {
        let (mut game, mut db) = crate::test_context();
        db.boot_world();
        let chid = db.create_char("Brine", "maris");
        let jetty = db.room_by_vnum(3002).unwrap();
        db.char_to_room(chid, jetty);

        db.extract_room(jetty);
        extract_pending(&mut game, &mut db);
        assert!(!db.rooms.contains(jetty));
        assert!(db.room_by_vnum(3002).is_none());
        let start = db.room_by_vnum(START_ROOM).unwrap();
        assert_eq!(db.ch(chid).in_room, Some(start));
    }
}
