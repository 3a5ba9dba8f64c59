/* ************************************************************************
*   File: interpreter.rs                                  Part of TideMUD *
*  Usage: Input-handler stack, login sequence, command dispatch           *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

use std::rc::Rc;

use hmac::Hmac;
use log::{error, info, warn};
use regex::Regex;
use sha2::Sha256;

use crate::act_comm::{do_dsay, do_say};
use crate::act_informative::{do_look, do_who, look_at_room};
use crate::act_movement::do_move;
use crate::act_other::{do_back, do_describe, do_more, do_quit};
use crate::act_wizard::{do_copyover, do_shutdown};
use crate::alias::{do_alias, perform_alias};
use crate::config::{MAX_BAD_PWS, MOTD, START_ROOM};
use crate::db::{AccountData, DB};
use crate::depot::{DepotId, HasId};
use crate::structs::{
    CharData, Sex, DOWN, EAST, LVL_ADMIN, MAX_NAME_LENGTH, MAX_PWD_LENGTH, NORTH, SOUTH, UP, WEST,
};
use crate::{send_to_char, send_to_room, Game};

/* ******************************************************************
*  the input-handler stack                                          *
****************************************************************** */

/// One interaction mode for a connection.  Whatever sits on top of the
/// stack interprets the next decoded line and renders the prompt.
pub trait InputHandler {
    fn on_input(&mut self, game: &mut Game, db: &mut DB, d_id: DepotId, input: &str);
    fn prompt(&self, game: &Game, db: &DB, d_id: DepotId) -> String;
}

/// Stack mutations requested while a handler is running.  They are queued
/// on the connection and applied once the handler returns, so a frame can
/// ask to replace or pop itself mid-call.
pub enum StackOp {
    Push(Box<dyn InputHandler>),
    Replace(Box<dyn InputHandler>),
    Pop,
}

/// Feed one decoded line to the connection's current handler.  The top
/// frame is detached for the duration of the call; afterwards the queued
/// stack operations are applied and an emptied stack closes the
/// connection, since nothing is left to consume its input.
pub fn dispatch_input(game: &mut Game, db: &mut DB, d_id: DepotId, input: &str, aliased: bool) {
    let desc = game.desc_mut(d_id);
    desc.input_aliased = aliased;
    let mut handler = match desc.input_stack.pop() {
        Some(h) => h,
        None => {
            error!(
                "dispatch_input: descriptor {} has an empty handler stack",
                desc.desc_num
            );
            desc.closed = true;
            return;
        }
    };
    handler.on_input(game, db, d_id, input);
    let desc = game.desc_mut(d_id);
    desc.input_stack.push(handler);
    desc.apply_stack_ops();
    if desc.input_stack.is_empty() {
        desc.closed = true;
    }
    desc.bust_prompt = true;
}

/* ******************************************************************
*  name and password helpers                                        *
****************************************************************** */

const RESERVED_NAMES: [&str; 6] = ["new", "quit", "who", "self", "all", "someone"];

pub fn valid_name(name: &str) -> bool {
    if name.len() < 2 || name.len() > MAX_NAME_LENGTH {
        return false;
    }
    if RESERVED_NAMES.contains(&name.to_lowercase().as_str()) {
        return false;
    }
    Regex::new(r"^[A-Za-z]+$").unwrap().is_match(name)
}

fn capitalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => lower,
    }
}

pub fn hash_password(password: &str, salt_name: &str) -> [u8; 16] {
    let mut digest = [0u8; 16];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(
        password.as_bytes(),
        salt_name.to_lowercase().as_bytes(),
        4,
        &mut digest,
    )
    .expect("Error while hashing password");
    digest
}

/* ******************************************************************
*  login and creation handlers                                      *
****************************************************************** */

/// The single frame every new connection starts with.
pub struct LoginNameHandler;

impl InputHandler for LoginNameHandler {
    fn on_input(&mut self, game: &mut Game, db: &mut DB, d_id: DepotId, input: &str) {
        let name = input.trim();
        let desc = game.desc_mut(d_id);
        if name.is_empty() {
            desc.closed = true;
            return;
        }
        if desc.lookup_pending() {
            desc.write_to_output("Still looking up your address, one moment please.\r\n");
            return;
        }
        if !valid_name(name) {
            desc.write_to_output("Invalid name, please try another.\r\n");
            return;
        }
        let name = capitalize(name);
        info!("{} is trying to connect from [{}].", name, desc.host);
        match db.load_account(&name) {
            Ok(Some(account)) => {
                let desc = game.desc_mut(d_id);
                desc.account = Some(account);
                desc.echo_off();
                desc.replace_input_handler(Box::new(PasswordHandler));
            }
            Ok(None) => {
                game.desc_mut(d_id)
                    .replace_input_handler(Box::new(NameConfirmHandler { name }));
            }
            Err(e) => {
                error!("loading account {}: {}", name, e);
                let desc = game.desc_mut(d_id);
                desc.write_to_output("Your account could not be read.  Try again later.\r\n");
                desc.closed = true;
            }
        }
    }

    fn prompt(&self, _game: &Game, _db: &DB, _d_id: DepotId) -> String {
        "By what name do you wish to be known? ".to_string()
    }
}

struct NameConfirmHandler {
    name: String,
}

impl InputHandler for NameConfirmHandler {
    fn on_input(&mut self, game: &mut Game, _db: &mut DB, d_id: DepotId, input: &str) {
        let desc = game.desc_mut(d_id);
        match input.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('y') => {
                desc.write_to_output("New account.\r\n");
                desc.echo_off();
                desc.replace_input_handler(Box::new(NewPasswordHandler {
                    name: self.name.clone(),
                }));
            }
            Some('n') => {
                desc.write_to_output("Okay, what IS it, then? ");
                desc.replace_input_handler(Box::new(LoginNameHandler));
            }
            _ => {
                desc.write_to_output("Please type Yes or No.\r\n");
            }
        }
    }

    fn prompt(&self, _game: &Game, _db: &DB, _d_id: DepotId) -> String {
        format!("Did I get that right, {} (Y/N)? ", self.name)
    }
}

/* password for an account that already exists */
struct PasswordHandler;

impl InputHandler for PasswordHandler {
    fn on_input(&mut self, game: &mut Game, _db: &mut DB, d_id: DepotId, input: &str) {
        let desc = game.desc_mut(d_id);
        desc.echo_on();
        desc.write_to_output("\r\n");
        if input.is_empty() {
            desc.closed = true;
            return;
        }
        let (acct_name, acct_passwd) = {
            let account = desc.account.as_ref().unwrap();
            (account.name.clone(), account.passwd)
        };
        if hash_password(input, &acct_name) != acct_passwd {
            warn!("Bad PW: {} [{}]", acct_name, desc.host);
            desc.bad_pws += 1;
            if desc.bad_pws >= MAX_BAD_PWS {
                desc.write_to_output("Wrong password... disconnecting.\r\n");
                desc.closed = true;
            } else {
                desc.write_to_output("Wrong password.\r\n");
                desc.echo_off();
            }
            return;
        }
        desc.bad_pws = 0;
        desc.write_to_output(MOTD);
        desc.replace_input_handler(Box::new(AccountMenuHandler));
        info!("{} [{}] has connected.", acct_name, desc.host);
    }

    fn prompt(&self, _game: &Game, _db: &DB, _d_id: DepotId) -> String {
        "Password: ".to_string()
    }
}

struct NewPasswordHandler {
    name: String,
}

impl InputHandler for NewPasswordHandler {
    fn on_input(&mut self, game: &mut Game, _db: &mut DB, d_id: DepotId, input: &str) {
        let desc = game.desc_mut(d_id);
        if input.len() < 3
            || input.len() > MAX_PWD_LENGTH
            || input.eq_ignore_ascii_case(&self.name)
        {
            desc.write_to_output("\r\nIllegal password.\r\n");
            return;
        }
        desc.write_to_output("\r\n");
        desc.replace_input_handler(Box::new(VerifyPasswordHandler {
            name: self.name.clone(),
            passwd: hash_password(input, &self.name),
        }));
    }

    fn prompt(&self, _game: &Game, _db: &DB, _d_id: DepotId) -> String {
        format!("Give me a password for {}: ", self.name)
    }
}

struct VerifyPasswordHandler {
    name: String,
    passwd: [u8; 16],
}

impl InputHandler for VerifyPasswordHandler {
    fn on_input(&mut self, game: &mut Game, db: &mut DB, d_id: DepotId, input: &str) {
        if hash_password(input, &self.name) != self.passwd {
            let desc = game.desc_mut(d_id);
            desc.write_to_output("\r\nPasswords don't match... start over.\r\n");
            desc.replace_input_handler(Box::new(NewPasswordHandler {
                name: self.name.clone(),
            }));
            return;
        }
        let account = AccountData {
            name: Rc::from(self.name.as_str()),
            passwd: self.passwd,
            characters: vec![],
        };
        if let Err(e) = db.save_account(&account) {
            error!("saving new account {}: {}", account.name, e);
        }
        info!("New account {} created.", account.name);
        let desc = game.desc_mut(d_id);
        desc.account = Some(account);
        desc.echo_on();
        desc.write_to_output(MOTD);
        desc.replace_input_handler(Box::new(AccountMenuHandler));
    }

    fn prompt(&self, _game: &Game, _db: &DB, _d_id: DepotId) -> String {
        "Please retype password: ".to_string()
    }
}

pub struct AccountMenuHandler;

impl InputHandler for AccountMenuHandler {
    fn on_input(&mut self, game: &mut Game, db: &mut DB, d_id: DepotId, input: &str) {
        let choice = input.trim();
        match choice.to_lowercase().as_str() {
            "" => {}
            "q" | "quit" => {
                let desc = game.desc_mut(d_id);
                desc.write_to_output("Fair winds.\r\n");
                desc.pop_input_handler();
            }
            "n" | "new" => {
                game.desc_mut(d_id)
                    .push_input_handler(Box::new(CharNameHandler));
            }
            _ => {
                let owned = game
                    .desc(d_id)
                    .account
                    .as_ref()
                    .map(|a| {
                        a.characters
                            .iter()
                            .any(|c| c.eq_ignore_ascii_case(choice))
                    })
                    .unwrap_or(false);
                if !owned {
                    game.desc_mut(d_id)
                        .write_to_output("No character by that name on this account.\r\n");
                    return;
                }
                let name = capitalize(choice);
                /* already in the world?  take the body over */
                let existing = db
                    .chars
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(&name))
                    .map(|c| c.id());
                if let Some(existing) = existing {
                    if let Some(old_d) = db.ch(existing).desc {
                        if let Some(old_desc) = game.descriptors.try_get_mut(old_d) {
                            old_desc
                                .write_to_output("This connection has been taken over.\r\n");
                            old_desc.character = None;
                            old_desc.closed = true;
                        }
                    }
                    let desc = game.desc_mut(d_id);
                    desc.character = Some(existing);
                    desc.write_to_output("You take over a body already in use.\r\n");
                    db.ch_mut(existing).desc = Some(d_id);
                    info!("{} has reconnected.", name);
                    desc.push_input_handler(Box::new(PlayingHandler));
                    return;
                }
                match db.load_player(&name) {
                    Ok(Some(ch)) => {
                        let chid = db.chars.push(ch);
                        enter_game(game, db, d_id, chid);
                    }
                    Ok(None) => {
                        error!("account {} lists missing player {}", choice, name);
                        game.desc_mut(d_id)
                            .write_to_output("Your character file is missing!\r\n");
                    }
                    Err(e) => {
                        error!("loading player {}: {}", name, e);
                        game.desc_mut(d_id)
                            .write_to_output("Your character file could not be read.\r\n");
                    }
                }
            }
        }
    }

    fn prompt(&self, game: &Game, _db: &DB, d_id: DepotId) -> String {
        let desc = game.desc(d_id);
        let account = desc.account.as_ref();
        let mut out = String::from("\r\n");
        if let Some(a) = account {
            out.push_str(&format!("--- Account: {} ---\r\n", a.name));
            if a.characters.is_empty() {
                out.push_str("You have no characters yet.\r\n");
            } else {
                for c in &a.characters {
                    out.push_str(&format!("  {}\r\n", c));
                }
            }
        }
        out.push_str("Enter a character name to play, NEW to create one, or QUIT to leave: ");
        out
    }
}

struct CharNameHandler;

impl InputHandler for CharNameHandler {
    fn on_input(&mut self, game: &mut Game, db: &mut DB, d_id: DepotId, input: &str) {
        let name = input.trim();
        let desc = game.desc_mut(d_id);
        if name.is_empty() {
            /* changed their mind; back to the menu */
            desc.pop_input_handler();
            return;
        }
        if !valid_name(name) {
            desc.write_to_output("Invalid name, please try another.\r\n");
            return;
        }
        let name = capitalize(name);
        if db.player_exists(&name) {
            desc.write_to_output("That name is already taken.\r\n");
            return;
        }
        desc.replace_input_handler(Box::new(CharSexHandler { name }));
    }

    fn prompt(&self, _game: &Game, _db: &DB, _d_id: DepotId) -> String {
        "What shall the character be called (or return to go back)? ".to_string()
    }
}

struct CharSexHandler {
    name: String,
}

impl InputHandler for CharSexHandler {
    fn on_input(&mut self, game: &mut Game, db: &mut DB, d_id: DepotId, input: &str) {
        let sex = match input.trim().chars().next().and_then(Sex::from_letter) {
            Some(s) => s,
            None => {
                game.desc_mut(d_id)
                    .write_to_output("That is not a sex.  Try again (M/F/N).\r\n");
                return;
            }
        };
        let account_name = game
            .desc(d_id)
            .account
            .as_ref()
            .map(|a| a.name.clone())
            .unwrap();
        let mut ch = CharData::new(&self.name, &account_name);
        ch.sex = sex;
        /* the first character on a fresh install runs the place */
        if !db.any_players() {
            ch.level = LVL_ADMIN;
        }
        if let Err(e) = db.save_player(&ch) {
            error!("saving new player {}: {}", ch.name, e);
        }
        let chid = db.chars.push(ch);

        let desc = game.desc_mut(d_id);
        if let Some(account) = desc.account.as_mut() {
            account.characters.push(self.name.clone());
            let snapshot = account.clone();
            if let Err(e) = db.save_account(&snapshot) {
                error!("saving account {}: {}", snapshot.name, e);
            }
        }
        info!("New player: {} has entered the game.", self.name);
        /* this creation frame is done with; playing goes on above the menu */
        game.desc_mut(d_id).pop_input_handler();
        enter_game(game, db, d_id, chid);
    }

    fn prompt(&self, _game: &Game, _db: &DB, _d_id: DepotId) -> String {
        "What is the character's sex (M/F/N)? ".to_string()
    }
}

pub struct PlayingHandler;

impl InputHandler for PlayingHandler {
    fn on_input(&mut self, game: &mut Game, db: &mut DB, d_id: DepotId, input: &str) {
        let chid = match game.desc(d_id).character {
            Some(c) => c,
            None => {
                error!("playing descriptor {} has no character", game.desc(d_id).desc_num);
                game.desc_mut(d_id).closed = true;
                return;
            }
        };
        let aliased = game.desc(d_id).input_aliased;
        if !aliased && perform_alias(game, db, d_id, input) {
            return;
        }
        command_interpreter(game, db, chid, input);
    }

    fn prompt(&self, game: &Game, _db: &DB, d_id: DepotId) -> String {
        let desc = game.desc(d_id);
        if desc.total_pages > 0 && desc.curr_page < desc.total_pages {
            format!("[ MORE / BACK ({}/{}) ] ", desc.curr_page, desc.total_pages)
        } else {
            "> ".to_string()
        }
    }
}

/// Place a loaded or freshly created character into the world behind this
/// connection and push the playing mode.
pub fn enter_game(game: &mut Game, db: &mut DB, d_id: DepotId, chid: DepotId) {
    let room_id = match db.room_by_vnum(START_ROOM) {
        Some(r) => r,
        None => {
            error!("enter_game: start room {} does not exist", START_ROOM);
            game.desc_mut(d_id).closed = true;
            return;
        }
    };
    game.desc_mut(d_id).character = Some(chid);
    db.ch_mut(chid).desc = Some(d_id);
    db.char_to_room(chid, room_id);
    let name = db.ch(chid).name.clone();
    send_to_room(
        game,
        db,
        room_id,
        Some(chid),
        &format!("{} has entered the game.\r\n", name),
    );
    info!("{} has entered the game.", name);
    look_at_room(game, db, chid);
    game.desc_mut(d_id)
        .push_input_handler(Box::new(PlayingHandler));
}

/* ******************************************************************
*  command dispatch                                                 *
****************************************************************** */

pub type Command = fn(game: &mut Game, db: &mut DB, chid: DepotId, argument: &str, subcmd: i32);

pub struct CommandInfo {
    pub command: &'static str,
    pub command_pointer: Command,
    pub minimum_level: u8,
    pub subcmd: i32,
}

/* directions must come first so that "n" finds north before anything else */
pub const CMD_INFO: &[CommandInfo] = &[
    CommandInfo {
        command: "north",
        command_pointer: do_move,
        minimum_level: 0,
        subcmd: NORTH as i32,
    },
    CommandInfo {
        command: "east",
        command_pointer: do_move,
        minimum_level: 0,
        subcmd: EAST as i32,
    },
    CommandInfo {
        command: "south",
        command_pointer: do_move,
        minimum_level: 0,
        subcmd: SOUTH as i32,
    },
    CommandInfo {
        command: "west",
        command_pointer: do_move,
        minimum_level: 0,
        subcmd: WEST as i32,
    },
    CommandInfo {
        command: "up",
        command_pointer: do_move,
        minimum_level: 0,
        subcmd: UP as i32,
    },
    CommandInfo {
        command: "down",
        command_pointer: do_move,
        minimum_level: 0,
        subcmd: DOWN as i32,
    },
    /* now, the main list */
    CommandInfo {
        command: "alias",
        command_pointer: do_alias,
        minimum_level: 0,
        subcmd: 0,
    },
    CommandInfo {
        command: "back",
        command_pointer: do_back,
        minimum_level: 0,
        subcmd: 0,
    },
    CommandInfo {
        command: "copyover",
        command_pointer: do_copyover,
        minimum_level: LVL_ADMIN,
        subcmd: 0,
    },
    CommandInfo {
        command: "describe",
        command_pointer: do_describe,
        minimum_level: 0,
        subcmd: 0,
    },
    CommandInfo {
        command: "dsay",
        command_pointer: do_dsay,
        minimum_level: 0,
        subcmd: 0,
    },
    CommandInfo {
        command: "look",
        command_pointer: do_look,
        minimum_level: 0,
        subcmd: 0,
    },
    CommandInfo {
        command: "more",
        command_pointer: do_more,
        minimum_level: 0,
        subcmd: 0,
    },
    CommandInfo {
        command: "quit",
        command_pointer: do_quit,
        minimum_level: 0,
        subcmd: 0,
    },
    CommandInfo {
        command: "say",
        command_pointer: do_say,
        minimum_level: 0,
        subcmd: 0,
    },
    CommandInfo {
        command: "shutdown",
        command_pointer: do_shutdown,
        minimum_level: LVL_ADMIN,
        subcmd: 0,
    },
    CommandInfo {
        command: "who",
        command_pointer: do_who,
        minimum_level: 0,
        subcmd: 0,
    },
];

pub fn is_abbrev(abbrev: &str, word: &str) -> bool {
    !abbrev.is_empty() && word.to_lowercase().starts_with(&abbrev.to_lowercase())
}

pub fn command_interpreter(game: &mut Game, db: &mut DB, chid: DepotId, argument: &str) {
    let argument = argument.trim();
    if argument.is_empty() {
        return;
    }
    let (cmd_word, rest) = match argument.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (argument, ""),
    };
    let level = db.ch(chid).level;
    let cmd = CMD_INFO
        .iter()
        .find(|info| level >= info.minimum_level && is_abbrev(cmd_word, info.command));
    match cmd {
        Some(info) => (info.command_pointer)(game, db, chid, rest, info.subcmd),
        None => send_to_char(game, db, chid, "Huh?!?\r\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullHandler;

    impl InputHandler for NullHandler {
        fn on_input(&mut self, _game: &mut Game, _db: &mut DB, _d_id: DepotId, _input: &str) {}
        fn prompt(&self, _game: &Game, _db: &DB, _d_id: DepotId) -> String {
            "".to_string()
        }
    }

    /* swap the login frame for an inert one so dispatch has no side effects */
    fn pin_null_frame(game: &mut Game, d_id: DepotId) {
        let desc = game.desc_mut(d_id);
        desc.input_stack.clear();
        desc.input_stack.push(Box::new(NullHandler));
    }

    #[test]
    fn pushing_then_popping_returns_to_the_initial_frame() {
        let (mut game, mut db) = crate::test_context();
        let d_id = game.add_detached_descriptor();
        pin_null_frame(&mut game, d_id);
        assert_eq!(game.desc(d_id).input_stack.len(), 1);

        for _ in 0..3 {
            game.desc_mut(d_id).push_input_handler(Box::new(NullHandler));
            dispatch_input(&mut game, &mut db, d_id, "", false);
        }
        assert_eq!(game.desc(d_id).input_stack.len(), 4);
        for _ in 0..3 {
            game.desc_mut(d_id).pop_input_handler();
            dispatch_input(&mut game, &mut db, d_id, "", false);
        }
        assert_eq!(game.desc(d_id).input_stack.len(), 1);
        assert!(!game.desc(d_id).closed);
    }

    #[test]
    fn popping_the_last_frame_closes_the_connection() {
        let (mut game, mut db) = crate::test_context();
        let d_id = game.add_detached_descriptor();
        pin_null_frame(&mut game, d_id);
        game.desc_mut(d_id).pop_input_handler();
        dispatch_input(&mut game, &mut db, d_id, "", false);
        assert!(game.desc(d_id).input_stack.is_empty());
        assert!(game.desc(d_id).closed);
    }

    #[test]
    fn name_vetting() {
        assert!(valid_name("Maris"));
        assert!(!valid_name("x"));
        assert!(!valid_name("waytoolongofaname"));
        assert!(!valid_name("sea salt"));
        assert!(!valid_name("quit"));
        assert!(!valid_name("h4ck"));
    }

    #[test]
    fn abbreviations_match_prefixes_only() {
        assert!(is_abbrev("n", "north"));
        assert!(is_abbrev("nor", "north"));
        assert!(!is_abbrev("x", "north"));
        assert!(!is_abbrev("", "north"));
    }

    #[test]
    fn full_handshake_reaches_the_game() {
        let dir = tempfile::tempdir().unwrap();
        let (mut game, _) = crate::test_context();
        let mut db = DB::new(dir.path());
        db.boot_world();
        let d_id = game.add_detached_descriptor();

        dispatch_input(&mut game, &mut db, d_id, "maris", false);
        dispatch_input(&mut game, &mut db, d_id, "y", false);
        dispatch_input(&mut game, &mut db, d_id, "seasalt", false);
        dispatch_input(&mut game, &mut db, d_id, "seasalt", false);
        /* at the account menu now; the account file exists */
        assert!(db.account_exists("Maris"));

        dispatch_input(&mut game, &mut db, d_id, "new", false);
        dispatch_input(&mut game, &mut db, d_id, "brine", false);
        dispatch_input(&mut game, &mut db, d_id, "f", false);

        let chid = game.desc(d_id).character.expect("character attached");
        assert_eq!(&*db.ch(chid).name, "Brine");
        assert_eq!(db.ch(chid).sex, Sex::Female);
        /* first player on a fresh install gets the keys */
        assert_eq!(db.ch(chid).level, LVL_ADMIN);
        assert!(db.ch(chid).in_room.is_some());
        assert!(db.player_exists("Brine"));

        /* menu beneath, playing on top */
        assert_eq!(game.desc(d_id).input_stack.len(), 2);
    }

    #[test]
    fn wrong_password_three_times_disconnects() {
        let dir = tempfile::tempdir().unwrap();
        let (mut game, _) = crate::test_context();
        let mut db = DB::new(dir.path());
        db.boot_world();
        let account = AccountData {
            name: Rc::from("Maris"),
            passwd: hash_password("rightone", "Maris"),
            characters: vec![],
        };
        db.save_account(&account).unwrap();

        let d_id = game.add_detached_descriptor();
        dispatch_input(&mut game, &mut db, d_id, "maris", false);
        for _ in 0..3 {
            dispatch_input(&mut game, &mut db, d_id, "wrongone", false);
        }
        assert!(game.desc(d_id).closed);
    }

    #[test]
    fn unknown_commands_get_a_shrug() {
        let dir = tempfile::tempdir().unwrap();
        let (mut game, _) = crate::test_context();
        let mut db = DB::new(dir.path());
        db.boot_world();
        let d_id = game.add_detached_descriptor();
        let chid = db.create_char("Brine", "maris");
        game.desc_mut(d_id).character = Some(chid);
        db.ch_mut(chid).desc = Some(d_id);

        command_interpreter(&mut game, &mut db, chid, "warble");
        assert!(game.desc(d_id).output_string().contains("Huh?!?"));
    }
}
