use core::any::TypeId;

use vc_utils::hash::{HashMap, HashSet};

use crate::descriptor::TypeDescriptor;

/// Identity of one compilation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GuardKey {
    /// The concrete type itself.
    Origin(TypeId),
    /// The ordered type arguments, used for generic parameter slots.
    Arguments(Box<[TypeId]>),
}

impl GuardKey {
    #[inline]
    pub fn origin(tp: &TypeDescriptor) -> Self {
        Self::Origin(tp.origin().id())
    }

    #[inline]
    pub fn arguments(tp: &TypeDescriptor) -> Self {
        Self::Arguments(tp.argument_ids())
    }
}

/// Targets already compiled, or being compiled, in one top-level compilation.
///
/// An entry is reserved before the target's body is compiled, so a target
/// reached again through a cycle resolves to the reserved name. Entries are
/// never removed. A guard is never shared between two top-level compilations.
#[derive(Debug, Default)]
pub struct RecursionGuard {
    entries: HashMap<GuardKey, Box<str>>,
    names: HashSet<Box<str>>,
}

impl RecursionGuard {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// The procedure name reserved for `key`.
    pub fn lookup(&self, key: &GuardKey) -> Option<&str> {
        let name = self.entries.get(key)?;
        log::trace!("recursion guard hit: {key:?} -> `{name}`");
        Some(name)
    }

    /// Reserves `name` for `key` and returns the name actually reserved.
    ///
    /// A name already taken by another key gets a numeric suffix.
    pub fn reserve(&mut self, key: GuardKey, name: &str) -> Box<str> {
        let mut reserved: Box<str> = name.into();
        let mut suffix = 2usize;
        while self.names.contains(&reserved) {
            reserved = format!("{name}_{suffix}").into_boxed_str();
            suffix += 1;
        }
        if *reserved != *name {
            log::warn!("procedure name `{name}` is taken, using `{reserved}` for {key:?}");
        }

        log::trace!("recursion guard reserve: {key:?} -> `{reserved}`");
        self.names.insert(reserved.clone());
        self.entries.insert(key, reserved.clone());
        reserved
    }

    #[inline]
    pub fn contains(&self, key: &GuardKey) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use core::any::TypeId;

    use super::{GuardKey, RecursionGuard};

    #[test]
    fn reserve_then_lookup() {
        let mut guard = RecursionGuard::new();
        let key = GuardKey::Origin(TypeId::of::<u8>());
        assert_eq!(guard.lookup(&key), None);

        assert_eq!(&*guard.reserve(key.clone(), "_load_A_record_u8"), "_load_A_record_u8");
        assert_eq!(guard.lookup(&key), Some("_load_A_record_u8"));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn taken_names_get_a_suffix() {
        let mut guard = RecursionGuard::new();
        let a = GuardKey::Origin(TypeId::of::<u8>());
        let b = GuardKey::Origin(TypeId::of::<u16>());
        let c = GuardKey::Arguments(Box::new([TypeId::of::<u8>()]));

        guard.reserve(a, "_load_A_record_Foo");
        assert_eq!(&*guard.reserve(b, "_load_A_record_Foo"), "_load_A_record_Foo_2");
        assert_eq!(&*guard.reserve(c.clone(), "_load_A_record_Foo"), "_load_A_record_Foo_3");
        assert!(guard.contains(&c));
    }
}
