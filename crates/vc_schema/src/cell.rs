//! Containers for static storage of type information.
//!
//! - [`NonGenericTypeInfoCell`]: a plain [`OnceLock`], for non-generic types.
//! - [`GenericTypeInfoCell`] / [`GenericTypePathCell`]: a `static` inside a
//!   generic function is shared by every instantiation, so these cells key
//!   their entries by [`TypeId`] behind a [`RwLock`].
//!
//! Entries are leaked once and live for the rest of the process.

use core::any::{Any, TypeId};
use std::sync::{OnceLock, PoisonError, RwLock};

use vc_utils::TypeIdMap;

use crate::TypeInfo;

mod sealed {
    use crate::TypeInfo;

    pub trait TypedProperty: 'static {}

    impl TypedProperty for String {}
    impl TypedProperty for TypeInfo {}
}

use sealed::TypedProperty;

// -----------------------------------------------------------------------------
// NonGenericTypeCell

/// Container for static storage of non-generic type information.
///
/// See [`NonGenericTypeInfoCell`].
pub struct NonGenericTypeCell<T: TypedProperty>(OnceLock<T>);

/// Container for static storage of a non-generic [`TypeInfo`].
///
/// There is no `NonGenericTypePathCell`, a string literal does the job.
pub type NonGenericTypeInfoCell = NonGenericTypeCell<TypeInfo>;

impl<T: TypedProperty> NonGenericTypeCell<T> {
    /// Create an empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Returns the stored value, initializing it with `f` on first access.
    #[inline]
    pub fn get_or_init<F>(&self, f: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.0.get_or_init(f)
    }
}

// -----------------------------------------------------------------------------
// GenericTypeCell

/// Container for static storage of type information with generics.
///
/// See [`GenericTypeInfoCell`] and [`GenericTypePathCell`].
pub struct GenericTypeCell<T: TypedProperty>(RwLock<TypeIdMap<&'static T>>);

/// Container for static storage of a generic type's [`TypeInfo`].
pub type GenericTypeInfoCell = GenericTypeCell<TypeInfo>;

/// Container for static storage of a generic type's path strings.
pub type GenericTypePathCell = GenericTypeCell<String>;

impl<T: TypedProperty> GenericTypeCell<T> {
    /// Create an empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self(RwLock::new(TypeIdMap::new()))
    }

    /// Returns the value stored for `G`, generating it with `f` if absent.
    ///
    /// `f` runs outside of the lock, so it may itself query other cells
    /// (a record whose fields mention the record itself does exactly that).
    #[inline(always)]
    pub fn get_or_insert<G: Any + ?Sized>(&self, f: impl FnOnce() -> T) -> &T {
        self.get_or_insert_by_type_id(TypeId::of::<G>(), f)
    }

    // Separate to reduce code compilation times
    #[inline(never)]
    fn get_or_insert_by_type_id(&self, type_id: TypeId, f: impl FnOnce() -> T) -> &T {
        match self.get_by_type_id(type_id) {
            Some(info) => info,
            None => self.insert_by_type_id(type_id, f()),
        }
    }

    #[inline(never)]
    fn get_by_type_id(&self, type_id: TypeId) -> Option<&T> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .copied()
    }

    #[inline(never)]
    fn insert_by_type_id(&self, type_id: TypeId, value: T) -> &T {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(type_id, || Box::leak(Box::new(value)))
    }
}

// -----------------------------------------------------------------------------
// concat

/// Concatenate string slices into one [`String`] with a single allocation.
///
/// ```
/// let s = vc_schema::concat(&["Option", "<", "i32", ">"]);
/// assert_eq!(s, "Option<i32>");
/// assert_eq!(s.capacity(), 11);
/// ```
#[inline(never)]
pub fn concat(arr: &[&str]) -> String {
    let len = arr.iter().map(|item| item.len()).sum();
    let mut res = String::with_capacity(len);
    for &item in arr {
        res.push_str(item);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::{GenericTypePathCell, concat};

    fn name_of<T: 'static>(cell: &'static GenericTypePathCell, label: &str) -> &'static str {
        cell.get_or_insert::<T>(|| concat(&[label, "!"]))
    }

    #[test]
    fn generic_cell_is_keyed_by_type() {
        static CELL: GenericTypePathCell = GenericTypePathCell::new();

        let a = name_of::<u8>(&CELL, "u8");
        let b = name_of::<u16>(&CELL, "u16");
        // The second label is ignored, the entry already exists.
        let c = name_of::<u8>(&CELL, "other");

        assert_eq!(a, "u8!");
        assert_eq!(b, "u16!");
        assert!(core::ptr::eq(a, c));
    }
}
