/* ************************************************************************
*   File: auxiliary.rs                                    Part of TideMUD *
*  Usage: Typed extension slots hung off core entities                    *
*                                                                         *
*  All rights reserved.  See license.doc for complete information.        *
************************************************************************ */

use std::any::Any;
use std::collections::HashMap;

use bitflags::bitflags;

bitflags! {
    /// Which entity kinds an auxiliary slot is installed on.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct AuxTarget: u32 {
        const SOCKET = 1 << 0;
        const CHAR   = 1 << 1;
        const ROOM   = 1 << 2;
        const OBJ    = 1 << 3;
    }
}

type AuxCtor = fn() -> Box<dyn Any>;

/// Feature modules install named slot constructors here at startup.  Core
/// entities instantiate every slot registered for their kind when they are
/// created, so the core never needs to know what the modules store.
pub struct AuxiliaryRegistry {
    installers: Vec<(&'static str, AuxTarget, AuxCtor)>,
}

impl AuxiliaryRegistry {
    pub fn new() -> AuxiliaryRegistry {
        AuxiliaryRegistry { installers: vec![] }
    }

    pub fn install(&mut self, name: &'static str, targets: AuxTarget, ctor: AuxCtor) {
        self.installers.push((name, targets, ctor));
    }
}

/// The keyed slot table carried by one entity.
pub struct AuxiliaryData {
    slots: HashMap<&'static str, Box<dyn Any>>,
}

impl AuxiliaryData {
    pub fn instantiate(registry: &AuxiliaryRegistry, target: AuxTarget) -> AuxiliaryData {
        let mut slots = HashMap::new();
        for (name, targets, ctor) in &registry.installers {
            if targets.intersects(target) {
                slots.insert(*name, ctor());
            }
        }
        AuxiliaryData { slots }
    }

    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        self.slots.get(name).and_then(|b| b.downcast_ref::<T>())
    }

    pub fn get_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.slots.get_mut(name).and_then(|b| b.downcast_mut::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Notepad {
        text: String,
    }

    fn notepad_ctor() -> Box<dyn Any> {
        Box::new(Notepad::default())
    }

    #[test]
    fn slots_only_appear_on_registered_targets() {
        let mut registry = AuxiliaryRegistry::new();
        registry.install("notepad", AuxTarget::SOCKET, notepad_ctor);
        let on_socket = AuxiliaryData::instantiate(&registry, AuxTarget::SOCKET);
        let on_char = AuxiliaryData::instantiate(&registry, AuxTarget::CHAR);
        assert!(on_socket.get::<Notepad>("notepad").is_some());
        assert!(on_char.get::<Notepad>("notepad").is_none());
    }

    #[test]
    fn typed_access_survives_mutation() {
        let mut registry = AuxiliaryRegistry::new();
        registry.install("notepad", AuxTarget::CHAR, notepad_ctor);
        let mut aux = AuxiliaryData::instantiate(&registry, AuxTarget::CHAR);
        aux.get_mut::<Notepad>("notepad").unwrap().text = "remember the milk".to_string();
        assert_eq!(aux.get::<Notepad>("notepad").unwrap().text, "remember the milk");
    }

    #[test]
    fn wrong_type_request_is_none() {
        let mut registry = AuxiliaryRegistry::new();
        registry.install("notepad", AuxTarget::CHAR, notepad_ctor);
        let aux = AuxiliaryData::instantiate(&registry, AuxTarget::CHAR);
        assert!(aux.get::<String>("notepad").is_none());
    }
}
