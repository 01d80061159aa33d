use core::any::TypeId;
use core::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use vc_utils::TypeIdMap;

use crate::error::CodegenError;

type Slot<T> = Arc<OnceLock<Result<Arc<T>, CodegenError>>>;

/// Compiled converters keyed by root type, compiled at most once each.
///
/// Concurrent first uses of one type wait for a single compilation. Failures
/// are kept like successes, since compiling again fails the same way.
/// Entries are never evicted.
pub struct CompiledCell<T>(RwLock<TypeIdMap<Slot<T>>>);

impl<T> CompiledCell<T> {
    #[inline]
    pub const fn new() -> Self {
        Self(RwLock::new(TypeIdMap::new()))
    }

    /// Returns the converter of `type_id`, running `compile` if there is none yet.
    ///
    /// `compile` runs outside of the map lock, so other types can be
    /// looked up or compiled meanwhile.
    pub fn get_or_compile<F>(&self, type_id: TypeId, compile: F) -> Result<Arc<T>, CodegenError>
    where
        F: FnOnce() -> Result<T, CodegenError>,
    {
        let slot = self.slot(type_id);
        slot.get_or_init(|| compile().map(Arc::new)).clone()
    }

    #[inline(never)]
    fn slot(&self, type_id: TypeId) -> Slot<T> {
        let cached = self
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .cloned();
        match cached {
            Some(slot) => {
                log::trace!("compiled cache hit: {type_id:?}");
                slot
            }
            None => self
                .0
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .get_or_insert(type_id, || Arc::new(OnceLock::new()))
                .clone(),
        }
    }

    /// Number of types compiled or being compiled.
    pub fn len(&self) -> usize {
        self.0.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every compiled converter.
    pub fn clear(&mut self) {
        *self.0.get_mut().unwrap_or_else(PoisonError::into_inner) = TypeIdMap::new();
    }
}

impl<T> Default for CompiledCell<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CompiledCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledCell")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use core::any::TypeId;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use super::CompiledCell;
    use crate::error::CodegenError;

    #[test]
    fn compiles_once_under_contention() {
        let cell = Arc::new(CompiledCell::<String>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let runs = Arc::clone(&runs);
                thread::spawn(move || {
                    cell.get_or_compile(TypeId::of::<u32>(), || {
                        runs.fetch_add(1, Ordering::SeqCst);
                        Ok("u32".to_owned())
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(*handle.join().unwrap().unwrap(), "u32");
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cell.len(), 1);
    }

    #[test]
    fn failures_are_cached() {
        let mut cell = CompiledCell::<String>::new();
        let err = CodegenError::DuplicateProcedure { name: "x".into() };

        let first = cell.get_or_compile(TypeId::of::<u8>(), || Err(err.clone()));
        let second = cell.get_or_compile(TypeId::of::<u8>(), || Ok("late".to_owned()));
        assert_eq!(first.unwrap_err(), err);
        assert_eq!(second.unwrap_err(), err);

        cell.clear();
        assert!(cell.is_empty());
        let third = cell.get_or_compile(TypeId::of::<u8>(), || Ok("fresh".to_owned()));
        assert_eq!(*third.unwrap(), "fresh");
    }
}
