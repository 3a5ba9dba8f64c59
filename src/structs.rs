use std::rc::Rc;

use bitflags::bitflags;

use crate::depot::{DepotId, HasId};

/* admin commands are gated on this level */
pub const LVL_ADMIN: u8 = 100;
pub const LVL_MORTAL: u8 = 1;

pub const MAX_NAME_LENGTH: usize = 12;
pub const MAX_PWD_LENGTH: usize = 30;
pub const MAX_DESC_LENGTH: usize = 2048;

bitflags! {
    /// Which of an actor's faculties an action occupies.  Two actions whose
    /// masks intersect are mutually exclusive; starting the second
    /// interrupts the first.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct Faculty: u32 {
        const MENTAL = 1 << 0;
        const SPEECH = 1 << 1;
        const HANDS  = 1 << 2;
        const FEET   = 1 << 3;
    }
}

/// Opaque identity of something that can own or be referenced by scheduled
/// work.  Used for teardown notification and bulk event cancellation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Subject {
    Char(DepotId),
    Obj(DepotId),
    Room(DepotId),
    None,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sex {
    Neutral,
    Male,
    Female,
}

impl Sex {
    pub fn from_letter(c: char) -> Option<Sex> {
        match c.to_ascii_lowercase() {
            'm' => Some(Sex::Male),
            'f' => Some(Sex::Female),
            'n' => Some(Sex::Neutral),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Sex::Male => 'M',
            Sex::Female => 'F',
            Sex::Neutral => 'N',
        }
    }
}

/* exit directions, indexes into RoomData.exits */
pub const NORTH: usize = 0;
pub const EAST: usize = 1;
pub const SOUTH: usize = 2;
pub const WEST: usize = 3;
pub const UP: usize = 4;
pub const DOWN: usize = 5;
pub const NUM_DIRS: usize = 6;

pub const DIR_NAMES: [&str; NUM_DIRS] = ["north", "east", "south", "west", "up", "down"];

pub struct CharData {
    id: DepotId,
    pub name: Rc<str>,
    pub account: Rc<str>,
    pub sex: Sex,
    pub level: u8,
    pub description: String,
    pub in_room: Option<DepotId>,
    /* the attached connection, while one exists */
    pub desc: Option<DepotId>,
}

impl HasId for CharData {
    fn id(&self) -> DepotId {
        self.id
    }
    fn set_id(&mut self, id: DepotId) {
        self.id = id;
    }
}

impl CharData {
    pub fn new(name: &str, account: &str) -> CharData {
        CharData {
            id: DepotId::default(),
            name: Rc::from(name),
            account: Rc::from(account),
            sex: Sex::Neutral,
            level: LVL_MORTAL,
            description: String::new(),
            in_room: None,
            desc: None,
        }
    }

}

pub struct ObjData {
    id: DepotId,
    pub name: Rc<str>,
    /* how the object shows up in a room */
    pub rdesc: Rc<str>,
    pub in_room: Option<DepotId>,
}

impl HasId for ObjData {
    fn id(&self) -> DepotId {
        self.id
    }
    fn set_id(&mut self, id: DepotId) {
        self.id = id;
    }
}

impl ObjData {
    pub fn new(name: &str, rdesc: &str) -> ObjData {
        ObjData {
            id: DepotId::default(),
            name: Rc::from(name),
            rdesc: Rc::from(rdesc),
            in_room: None,
        }
    }
}

pub struct RoomData {
    id: DepotId,
    pub vnum: u32,
    pub name: Rc<str>,
    pub description: Rc<str>,
    pub exits: [Option<u32>; NUM_DIRS],
    pub chars: Vec<DepotId>,
    pub objs: Vec<DepotId>,
}

impl HasId for RoomData {
    fn id(&self) -> DepotId {
        self.id
    }
    fn set_id(&mut self, id: DepotId) {
        self.id = id;
    }
}

impl RoomData {
    pub fn new(vnum: u32, name: &str, description: &str) -> RoomData {
        RoomData {
            id: DepotId::default(),
            vnum,
            name: Rc::from(name),
            description: Rc::from(description),
            exits: [None; NUM_DIRS],
            chars: vec![],
            objs: vec![],
        }
    }
}
