/* ************************************************************************
*   File: alias.rs                                        Part of TideMUD *
*  Usage: Per-connection command aliases                                  *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

/*
 * Aliases are a feature module: all state lives in an auxiliary slot on
 * the connection, and expansions are fed back through the connection's
 * queued-command list, so they travel the same pipeline as typed input.
 * Queued commands carry an aliased flag that stops a second expansion.
 */

use std::any::Any;
use std::collections::HashMap;

use crate::auxiliary::AuxTarget;
use crate::db::DB;
use crate::depot::DepotId;
use crate::{send_to_char, Game};

pub const ALIAS_AUX: &str = "aliases";

#[derive(Default)]
pub struct AliasData {
    aliases: HashMap<String, String>,
}

fn alias_ctor() -> Box<dyn Any> {
    Box::new(AliasData::default())
}

pub fn init_aliases(game: &mut Game) {
    game.aux_registry.install(ALIAS_AUX, AuxTarget::SOCKET, alias_ctor);
}

/// Expand `line` if its first word is aliased on this connection.  The
/// expansion's `;`-separated commands are queued, flagged aliased, and the
/// caller stops interpreting the typed line.  Returns false untouched.
pub fn perform_alias(game: &mut Game, _db: &mut DB, d_id: DepotId, line: &str) -> bool {
    let word = match line.split_whitespace().next() {
        Some(w) => w,
        None => return false,
    };
    let expansion = match game
        .desc(d_id)
        .aux
        .get::<AliasData>(ALIAS_AUX)
        .and_then(|a| a.aliases.get(word))
    {
        Some(e) => e.clone(),
        None => return false,
    };
    let desc = game.desc_mut(d_id);
    for cmd in expansion.split(';') {
        let cmd = cmd.trim();
        if !cmd.is_empty() {
            desc.queue_command(cmd, true);
        }
    }
    true
}

pub fn do_alias(game: &mut Game, db: &mut DB, chid: DepotId, argument: &str, _subcmd: i32) {
    let d_id = match db.ch(chid).desc {
        Some(d) => d,
        None => return,
    };
    let mut words = argument.splitn(2, char::is_whitespace);
    let word = words.next().unwrap_or("").trim();
    let expansion = words.next().unwrap_or("").trim();

    if word.is_empty() {
        let listing = match game.desc(d_id).aux.get::<AliasData>(ALIAS_AUX) {
            Some(data) if !data.aliases.is_empty() => {
                let mut out = String::from("Currently defined aliases:\r\n");
                let mut entries: Vec<_> = data.aliases.iter().collect();
                entries.sort();
                for (w, e) in entries {
                    out.push_str(&format!("  {:<12} {}\r\n", w, e));
                }
                out
            }
            _ => "You have no aliases defined.\r\n".to_string(),
        };
        send_to_char(game, db, chid, &listing);
        return;
    }

    let data = match game
        .desc_mut(d_id)
        .aux
        .get_mut::<AliasData>(ALIAS_AUX)
    {
        Some(d) => d,
        None => return,
    };
    if expansion.is_empty() {
        let msg = if data.aliases.remove(word).is_some() {
            format!("Alias '{}' removed.\r\n", word)
        } else {
            format!("No such alias '{}'.\r\n", word)
        };
        send_to_char(game, db, chid, &msg);
    } else {
        data.aliases
            .insert(word.to_string(), expansion.to_string());
        send_to_char(game, db, chid, &format!("Alias '{}' set.\r\n", word));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_queues_each_command_flagged_aliased() {
        let (mut game, mut db) = crate::test_context();
        let d_id = game.add_detached_descriptor();
        game.desc_mut(d_id)
            .aux
            .get_mut::<AliasData>(ALIAS_AUX)
            .unwrap()
            .aliases
            .insert("greet".to_string(), "say hello; say welcome ashore".to_string());

        assert!(perform_alias(&mut game, &mut db, d_id, "greet"));
        let desc = game.desc_mut(d_id);
        let first = desc.dequeue_command().unwrap();
        let second = desc.dequeue_command().unwrap();
        assert_eq!(first.text, "say hello");
        assert!(first.aliased);
        assert_eq!(second.text, "say welcome ashore");
        assert!(second.aliased);
        assert!(desc.dequeue_command().is_none());
    }

    #[test]
    fn unaliased_input_is_left_alone() {
        let (mut game, mut db) = crate::test_context();
        let d_id = game.add_detached_descriptor();
        assert!(!perform_alias(&mut game, &mut db, d_id, "look"));
        assert!(game.desc_mut(d_id).dequeue_command().is_none());
    }
}
