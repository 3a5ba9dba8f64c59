/* ************************************************************************
*   File: act_wizard.rs                                   Part of TideMUD *
*  Usage: Administrative commands                                         *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

use log::{error, info};

use crate::db::DB;
use crate::depot::DepotId;
use crate::{send_to_char, Game};

pub fn do_shutdown(game: &mut Game, db: &mut DB, chid: DepotId, _argument: &str, _subcmd: i32) {
    info!("(GC) Shutdown by {}.", db.ch(chid).name);
    send_to_char(game, db, chid, "Shutting down.\r\n");
    for d_id in game.descriptors.ids() {
        game.desc_mut(d_id)
            .write_to_output("The world fades out around you.\r\n");
    }
    game.shutdown = true;
}

/// Re-exec the server in place, carrying every playing connection's open
/// descriptor across.  Only returns if the handoff could not be staged or
/// the exec itself failed.
pub fn do_copyover(game: &mut Game, db: &mut DB, chid: DepotId, _argument: &str, _subcmd: i32) {
    info!("(GC) Copyover by {}.", db.ch(chid).name);
    let err = game.perform_copyover(db);
    /* still here, so it went wrong */
    error!("Copyover failed: {}", err);
    send_to_char(game, db, chid, "Copyover FAILED!\r\n");
}
