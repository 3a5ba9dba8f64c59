/* ************************************************************************
*   File: config.rs                                       Part of TideMUD *
*  Usage: Tunable constants for server operation                          *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

/* GAME OPERATION OPTIONS */

/*
 * This is the default port on which the game runs if no port is given on
 * the command line.
 */
pub const DFLT_PORT: u16 = 4000;

/* ticks per second for the central game loop */
pub const PULSES_PER_SEC: u32 = 10;

/* microseconds per tick, derived */
pub const OPT_USEC: u32 = 1_000_000 / PULSES_PER_SEC;

/* number of pulses in n seconds, for scheduler delays */
pub const fn seconds(n: i32) -> i32 {
    n * PULSES_PER_SEC as i32
}

/* default directory holding accounts, players and the copyover file */
pub const DFLT_DIR: &str = "lib";

/* copyover handoff file, relative to the data directory */
pub const COPYOVER_FILE: &str = "copyover.dat";

/*
 * What file to log messages to.  None means log only to stdout, which is
 * the default; a file appender is added alongside when a path is given.
 */
pub const LOGNAME: Option<&str> = None;

/* maximum number of players allowed before the game turns people away */
pub const MAX_PLAYING: usize = 300;

/* maximum number of password attempts before disconnection */
pub const MAX_BAD_PWS: u8 = 3;

/* idle checks run every this many seconds ... */
pub const IDLE_CHECK_SECS: i32 = 15;

/* ... and a connection stuck at a login prompt is cut after this many */
pub const IDLE_LOGIN_CHECKS: u8 = 8;

/* minutes between autosaves of everyone online */
pub const AUTOSAVE_MINS: i32 = 5;

/* minutes between usage log lines */
pub const USAGE_MINS: i32 = 5;

/* BUFFER LIMITS */

/* max length per decoded line of input */
pub const MAX_INPUT_LENGTH: usize = 256;

/* cap on the raw, not-yet-split input accumulator */
pub const MAX_RAW_INPUT_LENGTH: usize = 1024;

/* cap on the per-tick output accumulator */
pub const MAX_OUTPUT: usize = 8192;

/* lines shown per page by the pager */
pub const NUM_LINES_PER_PAGE: usize = 21;

/* ROOM NUMBERS */

/* virtual number of the room where characters enter the game */
pub const START_ROOM: u32 = 3001;

/* TEXT */

pub const GREETING: &str = "\r\n\
                        T I D E M U D\r\n\
\r\n\
           The tide carries all manner of things ashore.\r\n\
\r\n";

pub const MOTD: &str = "\r\n\
Welcome to TideMUD.  Be kind to one another; the sea is unkind enough.\r\n\
\r\n";

pub const FULL_MSG: &str = "Sorry, the game is full right now... please try again later!\r\n";

pub const OVERFLOW_MSG: &str = "\r\n!!!! Input Overflow !!!!\r\n";
