/* ************************************************************************
*   File: main.rs                                         Part of TideMUD *
*  Usage: Communication, socket handling, main(), central game loop       *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */
use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use std::{env, fs, io, process, thread};

use chrono::{DateTime, Local};
use log::{debug, error, info, warn, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::Appender;
use log4rs::config::Root;
use log4rs::encode::pattern::PatternEncoder;
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::action::{init_actions, pulse_actions, ActionScheduler};
use crate::alias::init_aliases;
use crate::auxiliary::{AuxTarget, AuxiliaryData, AuxiliaryRegistry};
use crate::compress::CompressState;
use crate::config::*;
use crate::db::{extract_pending, AccountData, DB};
use crate::depot::{Depot, DepotId, HasId};
use crate::event::{init_events, pulse_events, start_event, EventScheduler};
use crate::hooks::HookTable;
use crate::interpreter::{
    dispatch_input, enter_game, AccountMenuHandler, InputHandler, LoginNameHandler, StackOp,
};
use crate::structs::Subject;
use crate::telnet::{
    COMPRESS_WILL, COMPRESS_WILL2, DO, DONT, IAC, SB, SE, TELOPT_COMPRESS, TELOPT_COMPRESS2,
    TELOPT_ECHO, WILL, WONT,
};

mod act_comm;
mod act_informative;
mod act_movement;
mod act_other;
mod act_wizard;
mod action;
mod alias;
mod auxiliary;
mod compress;
mod config;
mod db;
mod depot;
mod event;
mod hooks;
mod interpreter;
mod modify;
mod structs;
mod telnet;

/// One decoded or injected command, waiting its turn.  Aliased entries
/// are exempt from a second round of alias expansion.
pub struct QueuedCommand {
    pub text: String,
    pub aliased: bool,
}

pub struct DescriptorData {
    id: DepotId,
    stream: Option<TcpStream>,
    pub host: Rc<str>,
    /* pending reverse-DNS result, published by the lookup thread */
    lookup: Option<Arc<OnceLock<String>>>,
    pub desc_num: usize,
    idle_tics: u8,
    pub bad_pws: u8,
    /* raw bytes off the wire, not yet split into lines */
    inbuf: Vec<u8>,
    command_queue: VecDeque<QueuedCommand>,
    next_command: Option<QueuedCommand>,
    /* accumulated output, flushed once per tick */
    pub output: Vec<u8>,
    /* post-compression bytes the kernel would not take yet */
    pending_out: Vec<u8>,
    pub bust_prompt: bool,
    /* pager state: the cached block and where the reader is in it */
    pub page_text: Option<Rc<str>>,
    pub curr_page: usize,
    pub total_pages: usize,
    compress: CompressState,
    pub aux: AuxiliaryData,
    pub account: Option<AccountData>,
    pub character: Option<DepotId>,
    /* innermost mode on top; empty means nothing can read our input */
    pub input_stack: Vec<Box<dyn InputHandler>>,
    pending_ops: Vec<StackOp>,
    pub input_aliased: bool,
    /* marked here, reaped in recycle_sockets, never torn down inline */
    pub closed: bool,
}

impl HasId for DescriptorData {
    fn id(&self) -> DepotId {
        self.id
    }

    fn set_id(&mut self, id: DepotId) {
        self.id = id;
    }
}

impl DescriptorData {
    fn new(stream: Option<TcpStream>, host: &str, aux: AuxiliaryData) -> DescriptorData {
        DescriptorData {
            id: DepotId::default(),
            stream,
            host: Rc::from(host),
            lookup: None,
            desc_num: 0,
            idle_tics: 0,
            bad_pws: 0,
            inbuf: vec![],
            command_queue: VecDeque::new(),
            next_command: None,
            output: vec![],
            pending_out: vec![],
            bust_prompt: true,
            page_text: None,
            curr_page: 0,
            total_pages: 0,
            compress: CompressState::new(),
            aux,
            account: None,
            character: None,
            input_stack: vec![Box::new(LoginNameHandler)],
            pending_ops: vec![],
            input_aliased: false,
            closed: false,
        }
    }

    #[cfg(test)]
    pub fn detached() -> DescriptorData {
        DescriptorData::new(
            None,
            "localhost",
            AuxiliaryData::instantiate(&AuxiliaryRegistry::new(), AuxTarget::SOCKET),
        )
    }

    #[cfg(test)]
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).to_string()
    }

    #[cfg(test)]
    pub fn pending_stack_ops(&self) -> usize {
        self.pending_ops.len()
    }

    pub fn lookup_pending(&self) -> bool {
        self.lookup.is_some()
    }

    /// Append text to the per-tick output accumulator.  Overflowing the
    /// cap drops the write and logs; the connection stays up.
    pub fn write_to_output(&mut self, txt: &str) -> usize {
        self.write_raw(txt.as_bytes())
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> usize {
        if self.output.len() + bytes.len() > MAX_OUTPUT {
            error!("write_to_output: output overflow on {}", self.host);
            return 0;
        }
        self.output.extend_from_slice(bytes);
        bytes.len()
    }

    /* telnet-level echo suppression, for password entry */
    pub fn echo_off(&mut self) {
        self.write_raw(&[IAC, WILL, TELOPT_ECHO]);
    }

    pub fn echo_on(&mut self) {
        self.write_raw(&[IAC, WONT, TELOPT_ECHO]);
    }

    /// Inject a command as if it had been typed; drained ahead of raw
    /// input, one per tick, through the same dispatch pipeline.
    pub fn queue_command(&mut self, text: &str, aliased: bool) {
        self.command_queue.push_back(QueuedCommand {
            text: text.to_string(),
            aliased,
        });
    }

    pub fn dequeue_command(&mut self) -> Option<QueuedCommand> {
        self.command_queue.pop_front()
    }

    /* stack transitions are queued while a handler runs */
    pub fn push_input_handler(&mut self, handler: Box<dyn InputHandler>) {
        self.pending_ops.push(StackOp::Push(handler));
    }

    pub fn replace_input_handler(&mut self, handler: Box<dyn InputHandler>) {
        self.pending_ops.push(StackOp::Replace(handler));
    }

    pub fn pop_input_handler(&mut self) {
        self.pending_ops.push(StackOp::Pop);
    }

    pub fn apply_stack_ops(&mut self) {
        for op in std::mem::take(&mut self.pending_ops) {
            match op {
                StackOp::Push(handler) => self.input_stack.push(handler),
                StackOp::Replace(handler) => {
                    self.input_stack.pop();
                    self.input_stack.push(handler);
                }
                StackOp::Pop => {
                    self.input_stack.pop();
                }
            }
        }
    }

    fn flush_queues(&mut self) {
        self.output.clear();
        self.pending_out.clear();
        self.inbuf.clear();
        self.command_queue.clear();
    }
}

/// The one top-level server context: the connection registry, both
/// schedulers, the hook table and the auxiliary registry all live here
/// and are threaded through everything else explicitly.
pub struct Game {
    mother_desc: Option<TcpListener>,
    pub descriptors: Depot<DescriptorData>,
    pub actions: ActionScheduler,
    pub events: EventScheduler,
    pub hooks: HookTable,
    pub aux_registry: AuxiliaryRegistry,
    pub last_desc: usize,
    pub shutdown: bool,
    pub boot_time: DateTime<Local>,
    port: u16,
}

impl Game {
    fn new(port: u16) -> Game {
        Game {
            mother_desc: None,
            descriptors: Depot::new(),
            actions: ActionScheduler::new(),
            events: EventScheduler::new(),
            hooks: HookTable::new(),
            aux_registry: AuxiliaryRegistry::new(),
            last_desc: 0,
            shutdown: false,
            boot_time: Local::now(),
            port,
        }
    }

    pub fn desc(&self, d_id: DepotId) -> &DescriptorData {
        self.descriptors.get(d_id)
    }

    pub fn desc_mut(&mut self, d_id: DepotId) -> &mut DescriptorData {
        self.descriptors.get_mut(d_id)
    }

    #[cfg(test)]
    pub fn add_detached_descriptor(&mut self) -> DepotId {
        let aux = AuxiliaryData::instantiate(&self.aux_registry, AuxTarget::SOCKET);
        self.descriptors.push(DescriptorData::new(None, "localhost", aux))
    }
}

/* ******************************************************************
*  main game loop and related stuff                                 *
****************************************************************** */

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let mut port = DFLT_PORT;
    let mut copyover_fd: Option<RawFd> = None;
    let mut pos = 1;

    if pos < args.len() && args[pos] == "-copyover" {
        if pos + 2 >= args.len() {
            eprintln!("SYSERR: -copyover requires a control descriptor and a port.");
            return ExitCode::FAILURE;
        }
        match (args[pos + 1].parse::<RawFd>(), args[pos + 2].parse::<u16>()) {
            (Ok(fd), Ok(p)) => {
                copyover_fd = Some(fd);
                port = p;
            }
            _ => {
                eprintln!(
                    "SYSERR: bad -copyover arguments '{} {}'.",
                    args[pos + 1],
                    args[pos + 2]
                );
                return ExitCode::FAILURE;
            }
        }
        pos += 3;
    } else if pos < args.len() {
        match args[pos].parse::<u16>() {
            Ok(p) if p > 1024 => {
                port = p;
                pos += 1;
            }
            _ => {
                eprintln!("SYSERR: illegal port number '{}'.", args[pos]);
                return ExitCode::FAILURE;
            }
        }
    }
    if pos < args.len() {
        eprintln!("Usage: {} [-copyover <fd> <port>] [port]", args[0]);
        return ExitCode::FAILURE;
    }

    setup_log(LOGNAME);
    info!("TideMUD starting.");

    let mut game = Game::new(port);
    let mut db = DB::new(DFLT_DIR);

    info!("Initializing action handler.");
    init_actions(&mut game);
    info!("Initializing event handler.");
    init_events(&mut game);
    info!("Initializing aliases.");
    init_aliases(&mut game);

    db.boot_world();

    match copyover_fd {
        Some(fd) => {
            info!("Resuming on inherited descriptor {}.", fd);
            let listener = unsafe { TcpListener::from_raw_fd(fd) };
            if let Err(e) = listener.set_nonblocking(true) {
                error!("SYSERR: inherited descriptor is unusable: {}", e);
                return ExitCode::FAILURE;
            }
            game.mother_desc = Some(listener);
            copyover_recover(&mut game, &mut db);
        }
        None => {
            info!("Opening mother connection.");
            game.mother_desc = Some(init_socket(port));
        }
    }
    info!("Running game on port {}.", port);

    /* standing heartbeat work rides the event scheduler */
    start_event(
        &mut game,
        Subject::None,
        seconds(60 * AUTOSAVE_MINS),
        autosave_event,
        None,
        None,
        "",
        true,
    );
    start_event(
        &mut game,
        Subject::None,
        seconds(60 * USAGE_MINS),
        usage_event,
        None,
        None,
        "",
        true,
    );

    info!("Entering game loop.");
    game.game_loop(&mut db);

    /* orderly shutdown: save everyone, then drop the sockets */
    for d_id in game.descriptors.ids() {
        if let Some(chid) = game.desc(d_id).character {
            if let Some(ch) = db.chars.try_get(chid) {
                if let Err(e) = db.save_player(ch) {
                    error!("saving {} at shutdown: {}", ch.name, e);
                }
            }
        }
        game.desc_mut(d_id).closed = true;
    }
    info!("Closing all sockets.");
    game.recycle_sockets(&mut db);
    game.mother_desc = None;

    info!("Normal termination of game.");
    ExitCode::SUCCESS
}

/*
 * init_socket sets up the mother descriptor - creates the socket, binds
 * it, and listens.  Failure here is fatal.
 */
fn init_socket(port: u16) -> TcpListener {
    let listener = TcpListener::bind(("0.0.0.0", port)).unwrap_or_else(|error| {
        error!("SYSERR: Error creating socket: {}", error);
        process::exit(1);
    });
    listener
        .set_nonblocking(true)
        .expect("setting mother descriptor non-blocking");
    listener
}

fn setup_log(logfile: Option<&str>) {
    let stdout = ConsoleAppender::builder().build();
    let mut config_builder = log4rs::config::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)));
    let mut root_builder = Root::builder().appender("stdout");

    if let Some(path) = logfile {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d} - {m}{n}")))
            .build(path)
            .unwrap();
        config_builder = config_builder.appender(Appender::builder().build("file", Box::new(file)));
        root_builder = root_builder.appender("file");
    }
    let config = config_builder
        .build(root_builder.build(LevelFilter::Info))
        .unwrap();
    log4rs::init_config(config).unwrap();
}

/* sleep this long, or not at all: overruns are never compensated for */
fn pacing_sleep(elapsed: Duration, tick: Duration) -> Option<Duration> {
    if elapsed < tick {
        Some(tick - elapsed)
    } else {
        None
    }
}

enum PeekStatus {
    Idle,
    Ready,
    Gone,
}

impl Game {
    /*
     * The central loop.  Each pass: accept, read, decode one line per
     * connection, dispatch, run the schedulers, flush, pace, reap.
     */
    fn game_loop(&mut self, db: &mut DB) {
        let opt_time = Duration::from_micros(OPT_USEC as u64);
        let sig_shutdown = Arc::new(AtomicBool::new(false));
        for sig in [SIGINT, SIGTERM] {
            if let Err(e) = signal_hook::flag::register(sig, Arc::clone(&sig_shutdown)) {
                error!("registering signal handler: {}", e);
            }
        }

        let mut pulse: u128 = 0;

        while !self.shutdown {
            if sig_shutdown.load(Ordering::Relaxed) {
                info!("Signal received: beginning orderly shutdown.");
                self.shutdown = true;
                continue;
            }
            let tick_start = Instant::now();

            /* if there are new connections waiting, accept them */
            if let Some(listener) = self.mother_desc.as_ref() {
                match listener.accept() {
                    Ok((stream, addr)) => self.new_descriptor(stream, addr),
                    Err(e) if e.kind() == ErrorKind::WouldBlock => (),
                    Err(e) => error!("SYSERR: could not accept client: {}", e),
                }
            }

            /* adopt any hostname the lookup thread has published */
            for d_id in self.descriptors.ids() {
                let desc = self.desc_mut(d_id);
                if let Some(found) = desc.lookup.as_ref().and_then(|l| l.get()).cloned() {
                    desc.host = Rc::from(found.as_str());
                    desc.lookup = None;
                }
            }

            /* pull waiting bytes off every readable connection */
            let mut peek_buf = [0u8; 1];
            for d_id in self.descriptors.ids() {
                if self.desc(d_id).closed {
                    continue;
                }
                let status = match self.desc(d_id).stream.as_ref() {
                    None => PeekStatus::Idle,
                    Some(s) => match s.peek(&mut peek_buf) {
                        Ok(0) => PeekStatus::Gone,
                        Ok(_) => PeekStatus::Ready,
                        Err(e) if e.kind() == ErrorKind::WouldBlock => PeekStatus::Idle,
                        Err(e) => {
                            error!("peek on {}: {}", self.desc(d_id).host, e);
                            PeekStatus::Gone
                        }
                    },
                };
                match status {
                    PeekStatus::Idle => {}
                    PeekStatus::Gone => self.desc_mut(d_id).closed = true,
                    PeekStatus::Ready => {
                        if !self.process_input(d_id) {
                            self.desc_mut(d_id).closed = true;
                        }
                    }
                }
            }

            /* decode and dispatch at most one command per connection */
            for d_id in self.descriptors.ids() {
                if self.desc(d_id).closed {
                    continue;
                }
                self.next_cmd_from_buffer(d_id);
                if let Some(cmd) = self.desc_mut(d_id).next_command.take() {
                    self.desc_mut(d_id).idle_tics = 0;
                    dispatch_input(self, db, d_id, &cmd.text, cmd.aliased);
                }
            }

            /* schedulers tick, then the deferred teardown queue drains */
            pulse += 1;
            self.heartbeat(db, pulse);

            /* send what accumulated this tick */
            for d_id in self.descriptors.ids() {
                let wants_flush = {
                    let desc = self.desc(d_id);
                    !desc.closed
                        && (desc.bust_prompt
                            || !desc.output.is_empty()
                            || !desc.pending_out.is_empty())
                };
                if wants_flush && !process_output(self, db, d_id) {
                    self.desc_mut(d_id).closed = true;
                }
            }

            /* best-effort pacing: sleep out the remainder, never catch up */
            if let Some(remainder) = pacing_sleep(tick_start.elapsed(), opt_time) {
                thread::sleep(remainder);
            }

            /* reap connections marked closed */
            self.recycle_sockets(db);

            /* roll pulse over after 10 hours */
            if pulse >= (10 * 60 * 60 * PULSES_PER_SEC as u128) {
                pulse = 0;
            }
        }
    }

    fn heartbeat(&mut self, db: &mut DB, pulse: u128) {
        pulse_actions(self, db, 1);
        pulse_events(self, db, 1);

        if pulse % (seconds(IDLE_CHECK_SECS) as u128) == 0 {
            self.check_idle_logins();
        }

        /* every pulse: entities queued for removal leave for good */
        extract_pending(self, db);
    }

    /* people parked at a login prompt do not get to sit there forever */
    fn check_idle_logins(&mut self) {
        for d_id in self.descriptors.ids() {
            let desc = self.desc_mut(d_id);
            if desc.character.is_some() || desc.closed {
                continue;
            }
            desc.idle_tics += 1;
            if desc.idle_tics > IDLE_LOGIN_CHECKS {
                desc.write_to_output("\r\nIdle timeout.  Try again later.\r\n");
                desc.closed = true;
                info!("Idle timeout for connection from [{}].", desc.host);
            }
        }
    }

    fn new_descriptor(&mut self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nonblocking(true) {
            error!("SYSERR: could not set new client non-blocking: {}", e);
            return;
        }

        /* make sure we have room */
        if self.descriptors.len() >= MAX_PLAYING {
            let mut stream = stream;
            let _ = stream.write_all(FULL_MSG.as_bytes());
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }

        let ip = addr.ip();
        let aux = AuxiliaryData::instantiate(&self.aux_registry, AuxTarget::SOCKET);
        let mut desc = DescriptorData::new(Some(stream), &ip.to_string(), aux);

        /* resolve the hostname off-thread; the result is published into
         * the OnceLock and adopted by the main loop when it appears */
        if !ip.is_loopback() {
            let slot: Arc<OnceLock<String>> = Arc::new(OnceLock::new());
            desc.lookup = Some(Arc::clone(&slot));
            thread::spawn(move || {
                let name = dns_lookup::lookup_addr(&ip).unwrap_or_else(|_| ip.to_string());
                let _ = slot.set(name);
            });
        }

        self.last_desc += 1;
        if self.last_desc == 1000 {
            self.last_desc = 1;
        }
        desc.desc_num = self.last_desc;

        /* offer both compression flavors, then the banner */
        desc.write_raw(&COMPRESS_WILL2);
        desc.write_raw(&COMPRESS_WILL);
        desc.write_to_output(GREETING);

        info!("New connection from [{}].  Waking up.", desc.host);
        self.descriptors.push(desc);
    }

    /*
     * Pull whatever the socket has for us into the raw accumulator.
     * Returns false when the connection should be closed: end-of-file,
     * a hard read error, or an overflowing client.
     */
    fn process_input(&mut self, d_id: DepotId) -> bool {
        let desc = self.desc_mut(d_id);
        let mut buf = [0u8; 4096];
        loop {
            if desc.inbuf.len() >= MAX_RAW_INPUT_LENGTH {
                warn!("process_input: input overflow from {}", desc.host);
                if let Some(stream) = desc.stream.as_mut() {
                    let _ = stream.write_all(OVERFLOW_MSG.as_bytes());
                }
                return false;
            }
            match desc.stream.as_mut().unwrap().read(&mut buf) {
                Ok(0) => return false, /* EOF */
                Ok(n) => {
                    desc.inbuf.extend_from_slice(&buf[..n]);
                    if matches!(desc.inbuf.last(), Some(b'\n') | Some(b'\r')) {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    error!("process_input: read from {}: {}", desc.host, e);
                    return false;
                }
            }
        }
        true
    }

    /*
     * Cut one command out of the raw accumulator, stripping in-band
     * telnet negotiation on the way.  Injected commands drain first.
     */
    fn next_cmd_from_buffer(&mut self, d_id: DepotId) {
        let desc = self.desc_mut(d_id);
        if desc.next_command.is_some() {
            return;
        }
        if let Some(queued) = desc.dequeue_command() {
            desc.next_command = Some(queued);
            return;
        }
        let nl = match desc.inbuf.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(p) => p,
            None => return,
        };

        let mut cmd = String::new();
        let mut compress_reqs: Vec<(bool, u8)> = vec![];
        let mut i = 0;
        while i < nl {
            let b = desc.inbuf[i];
            if b != IAC {
                if (b' '..=b'~').contains(&b) && cmd.len() < MAX_INPUT_LENGTH {
                    cmd.push(b as char);
                }
                i += 1;
                continue;
            }
            if i + 1 >= nl {
                i = nl;
                break;
            }
            let verb = desc.inbuf[i + 1];
            match verb {
                DO | DONT | WILL | WONT => {
                    if i + 2 < nl {
                        let opt = desc.inbuf[i + 2];
                        if opt == TELOPT_COMPRESS || opt == TELOPT_COMPRESS2 {
                            if verb == DO {
                                compress_reqs.push((true, opt));
                            } else if verb == DONT {
                                compress_reqs.push((false, opt));
                            }
                        }
                        /* any other option is tolerated and dropped */
                        i += 3;
                    } else {
                        i = nl;
                    }
                }
                SB => {
                    /* swallow the subnegotiation through IAC SE */
                    let mut j = i + 2;
                    while j + 1 < nl && !(desc.inbuf[j] == IAC && desc.inbuf[j + 1] == SE) {
                        j += 1;
                    }
                    i = if j + 1 < nl { j + 2 } else { nl };
                }
                _ => i += 2,
            }
        }

        /* consume the line and its trailing newline run */
        let mut end = nl;
        while end < desc.inbuf.len() && (desc.inbuf[end] == b'\n' || desc.inbuf[end] == b'\r') {
            end += 1;
        }
        desc.inbuf.drain(..end);
        desc.next_command = Some(QueuedCommand {
            text: cmd,
            aliased: false,
        });

        for (start, opt) in compress_reqs {
            if start {
                self.start_compression(d_id, opt);
            } else {
                self.end_compression(d_id);
            }
        }
    }

    fn start_compression(&mut self, d_id: DepotId, opt: u8) {
        let desc = self.desc_mut(d_id);
        if let Some(announce) = desc.compress.start(opt) {
            /* the announcement itself goes out uncompressed */
            desc.pending_out.extend_from_slice(&announce);
            info!(
                "MCCP{} enabled for [{}].",
                if opt == TELOPT_COMPRESS2 { 2 } else { 1 },
                desc.host
            );
        }
    }

    fn end_compression(&mut self, d_id: DepotId) {
        let desc = self.desc_mut(d_id);
        if let Some(tail) = desc.compress.end() {
            desc.pending_out.extend_from_slice(&tail);
            info!("MCCP disabled for [{}].", desc.host);
        }
    }

    /*
     * Reap connections marked closed.  A playing character stays in the
     * world, linkdead; one that never finished logging in is extracted.
     */
    fn recycle_sockets(&mut self, db: &mut DB) {
        for d_id in self.descriptors.ids() {
            if !self.desc(d_id).closed {
                continue;
            }
            let mut desc = self.descriptors.take(d_id).unwrap();
            if let Some(chid) = desc.character.take() {
                let in_world = db.chars.try_get(chid).map(|c| c.in_room.is_some());
                match in_world {
                    Some(true) => {
                        db.ch_mut(chid).desc = None;
                        info!("Closing link to {}.", db.ch(chid).name);
                    }
                    Some(false) => {
                        db.ch_mut(chid).desc = None;
                        db.extract_char(chid);
                    }
                    None => {}
                }
            }
            if let Some(mut stream) = desc.stream.take() {
                if let Some(tail) = desc.compress.end() {
                    let _ = stream.write_all(&tail);
                }
                let _ = stream.shutdown(Shutdown::Both);
            }
            desc.flush_queues();
            info!("Closing connection from [{}].", desc.host);
        }
    }
}

/* ******************************************************************
*  output                                                           *
****************************************************************** */

pub fn send_to_char(game: &mut Game, db: &DB, chid: DepotId, txt: &str) {
    if let Some(d_id) = db.chars.try_get(chid).and_then(|c| c.desc) {
        if let Some(desc) = game.descriptors.try_get_mut(d_id) {
            desc.write_to_output(txt);
        }
    }
}

pub fn send_to_room(game: &mut Game, db: &DB, room_id: DepotId, skip: Option<DepotId>, txt: &str) {
    let occupants = match db.rooms.try_get(room_id) {
        Some(room) => room.chars.clone(),
        None => return,
    };
    for chid in occupants {
        if Some(chid) == skip {
            continue;
        }
        send_to_char(game, db, chid, txt);
    }
}

/*
 * Send the tick's accumulated output, the prompt if one is owed, and
 * anything the kernel refused last time.  Returns false on a write
 * error, which closes only this connection.
 */
fn process_output(game: &mut Game, db: &DB, d_id: DepotId) -> bool {
    let prompt: Option<String> = {
        let desc = game.desc(d_id);
        if desc.bust_prompt {
            desc.input_stack.last().map(|h| h.prompt(game, db, d_id))
        } else {
            None
        }
    };

    let desc = game.desc_mut(d_id);
    let mut out = std::mem::take(&mut desc.output);
    if let Some(p) = prompt {
        out.extend_from_slice(p.as_bytes());
        desc.bust_prompt = false;
    }
    if out.is_empty() && desc.pending_out.is_empty() {
        return true;
    }

    let bytes = if out.is_empty() {
        out
    } else if desc.compress.is_active() {
        match desc.compress.process(&out) {
            Ok(b) => b,
            Err(e) => {
                error!("compressing output for {}: {}", desc.host, e);
                return false;
            }
        }
    } else {
        out
    };
    desc.pending_out.extend_from_slice(&bytes);

    let mut pending = std::mem::take(&mut desc.pending_out);
    let stream = match desc.stream.as_mut() {
        Some(s) => s,
        None => return true,
    };
    match write_to_descriptor(stream, &pending) {
        Ok(n) => {
            if n < pending.len() {
                /* socket buffer full; try the rest next tick */
                desc.pending_out = pending.split_off(n);
            }
            true
        }
        Err(e) => {
            error!("write to {}: {}", desc.host, e);
            false
        }
    }
}

/*
 * write_to_descriptor pushes bytes at the kernel until they are all
 * taken, the socket buffer fills, or an error comes back.
 */
fn write_to_descriptor(stream: &mut TcpStream, bytes: &[u8]) -> io::Result<usize> {
    let mut written = 0;
    while written < bytes.len() {
        match stream.write(&bytes[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) => return Err(e),
        }
    }
    Ok(written)
}

/* ******************************************************************
*  standing heartbeat events                                        *
****************************************************************** */

fn autosave_event(
    game: &mut Game,
    db: &mut DB,
    _owner: Subject,
    _data: Option<&mut dyn std::any::Any>,
    _arg: &str,
) {
    let mut saved = 0;
    let chids: Vec<DepotId> = game.descriptors.iter().filter_map(|d| d.character).collect();
    for chid in chids {
        if let Some(ch) = db.chars.try_get(chid) {
            match db.save_player(ch) {
                Ok(()) => saved += 1,
                Err(e) => error!("autosave of {}: {}", ch.name, e),
            }
        }
    }
    debug!("Autosaved {} players.", saved);
}

fn usage_event(
    game: &mut Game,
    _db: &mut DB,
    _owner: Subject,
    _data: Option<&mut dyn std::any::Any>,
    _arg: &str,
) {
    let connected = game.descriptors.len();
    let playing = game.descriptors.iter().filter(|d| d.character.is_some()).count();
    info!(
        "nusage: {} sockets connected, {} sockets playing",
        connected, playing
    );
}

/* ******************************************************************
*  copyover: live upgrade without dropping connections              *
****************************************************************** */

fn clear_cloexec(fd: RawFd) -> io::Result<()> {
    /* the descriptor must survive the coming exec */
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFD);
        if flags == -1 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

fn format_copyover_record(fd: RawFd, account: &str, character: &str, host: &str) -> String {
    format!("{} {} {} {}\n", fd, account, character, host)
}

fn parse_copyover_record(line: &str) -> Option<(RawFd, String, String, String)> {
    let mut parts = line.split_whitespace();
    let fd = parts.next()?.parse::<RawFd>().ok()?;
    let account = parts.next()?.to_string();
    let character = parts.next()?.to_string();
    let host = parts.next()?.to_string();
    Some((fd, account, character, host))
}

impl Game {
    /*
     * Stage the handoff file, save everyone, clear close-on-exec on the
     * descriptors making the trip, and re-exec ourselves.  Only returns
     * on failure.
     */
    pub fn perform_copyover(&mut self, db: &mut DB) -> io::Error {
        let path = db.lib_dir.join(COPYOVER_FILE);
        let mut records = String::new();
        let mut carried: Vec<DepotId> = vec![];

        for d_id in self.descriptors.ids() {
            let desc = self.desc(d_id);
            if desc.closed || desc.stream.is_none() {
                continue;
            }
            let (account, chid) = match (desc.account.as_ref(), desc.character) {
                (Some(a), Some(c)) => (a.name.clone(), c),
                _ => continue,
            };
            let ch = match db.chars.try_get(chid) {
                Some(c) => c,
                None => continue,
            };
            let fd = desc.stream.as_ref().unwrap().as_raw_fd();
            records.push_str(&format_copyover_record(fd, &account, &ch.name, &desc.host));
            if let Err(e) = db.save_player(ch) {
                error!("saving {} for copyover: {}", ch.name, e);
            }
            carried.push(d_id);
        }
        records.push_str("-1\n");

        if let Err(e) = fs::write(&path, records) {
            return e;
        }

        for d_id in self.descriptors.ids() {
            let carried_over = carried.contains(&d_id);
            let desc = self.desc_mut(d_id);
            /* wind the compressor down before the stream changes hands */
            let tail = desc.compress.end();
            if let Some(stream) = desc.stream.as_mut() {
                if let Some(tail) = tail {
                    let _ = stream.write_all(&tail);
                }
                let msg: &[u8] = if carried_over {
                    b"\r\nTime stops for a moment as the world is remade.\r\n"
                } else {
                    b"\r\nThe world is being remade; please reconnect in a minute.\r\n"
                };
                let _ = stream.write_all(msg);
                if carried_over {
                    if let Err(e) = clear_cloexec(stream.as_raw_fd()) {
                        error!("clearing close-on-exec for {}: {}", desc.host, e);
                    }
                }
            }
        }

        let control = match self.mother_desc.as_ref() {
            Some(listener) => {
                let fd = listener.as_raw_fd();
                if let Err(e) = clear_cloexec(fd) {
                    return e;
                }
                fd
            }
            None => return io::Error::new(ErrorKind::Other, "no listening descriptor"),
        };

        let exe = match env::current_exe() {
            Ok(p) => p,
            Err(e) => return e,
        };
        info!("Copyover: re-executing {}.", exe.display());
        process::Command::new(exe)
            .arg("-copyover")
            .arg(control.to_string())
            .arg(self.port.to_string())
            .exec()
    }
}

/*
 * Rebuild connections from the handoff file left by perform_copyover.
 * A missing file on a flagged restart is fatal; a bad record only costs
 * that one connection.
 */
fn copyover_recover(game: &mut Game, db: &mut DB) {
    info!("Copyover recovery initiated.");
    let path = db.lib_dir.join(COPYOVER_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) => {
            error!("SYSERR: copyover file {} unreadable: {}", path.display(), e);
            eprintln!("SYSERR: copyover file {} unreadable: {}", path.display(), e);
            process::exit(1);
        }
    };
    if let Err(e) = fs::remove_file(&path) {
        error!("removing copyover file: {}", e);
    }

    for line in text.lines() {
        if line.trim() == "-1" {
            break;
        }
        let (fd, account_name, char_name, host) = match parse_copyover_record(line) {
            Some(rec) => rec,
            None => {
                warn!("copyover_recover: malformed record '{}'", line);
                continue;
            }
        };
        let mut stream = unsafe { TcpStream::from_raw_fd(fd) };
        if stream.set_nonblocking(true).is_err() {
            continue;
        }
        let _ = stream.write_all(b"\r\nThe world settles back into place.\r\n");

        let account = match db.load_account(&account_name) {
            Ok(Some(a)) => a,
            _ => {
                error!("copyover_recover: account {} unloadable", account_name);
                let _ = stream.write_all(b"Your account could not be recovered.\r\n");
                continue;
            }
        };
        let ch = match db.load_player(&char_name) {
            Ok(Some(c)) => c,
            _ => {
                error!("copyover_recover: player {} unloadable", char_name);
                let _ = stream.write_all(b"Your character could not be recovered.\r\n");
                continue;
            }
        };

        let aux = AuxiliaryData::instantiate(&game.aux_registry, AuxTarget::SOCKET);
        let mut desc = DescriptorData::new(Some(stream), &host, aux);
        game.last_desc += 1;
        desc.desc_num = game.last_desc;
        desc.account = Some(account);
        /* the menu sits beneath playing, same as a normal login */
        desc.input_stack.clear();
        desc.input_stack.push(Box::new(AccountMenuHandler));
        let d_id = game.descriptors.push(desc);

        let chid = db.chars.push(ch);
        enter_game(game, db, d_id, chid);
        game.desc_mut(d_id).apply_stack_ops();
        info!("Copyover: reattached {} [{}].", char_name, host);
    }
    info!("Copyover recovery complete.");
}

#[cfg(test)]
pub fn test_context() -> (Game, DB) {
    let mut game = Game::new(DFLT_PORT);
    init_actions(&mut game);
    init_events(&mut game);
    init_aliases(&mut game);
    let db = DB::new("lib");
    (game, db)
}
