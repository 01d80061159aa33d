use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};

// -----------------------------------------------------------------------------
// TypePath

/// Static names of a type.
///
/// The names are stable across compiler versions, unlike
/// [`core::any::type_name`], and none of them starts with `::`. Generated
/// procedures are named after [`type_name`](TypePath::type_name), error
/// messages quote [`type_path`](TypePath::type_path).
///
/// Generic types build their strings once per instantiation through a
/// [`GenericTypePathCell`](crate::GenericTypePathCell):
///
/// ```
/// use vc_schema::{TypePath, GenericTypePathCell, concat};
///
/// struct Tagged<T>(T);
///
/// impl<T: TypePath> TypePath for Tagged<T> {
///     fn type_path() -> &'static str {
///         static CELL: GenericTypePathCell = GenericTypePathCell::new();
///         CELL.get_or_insert::<Self>(|| concat(&["app::Tagged<", T::type_path(), ">"]))
///     }
///     fn type_name() -> &'static str {
///         static CELL: GenericTypePathCell = GenericTypePathCell::new();
///         CELL.get_or_insert::<Self>(|| concat(&["Tagged<", T::type_name(), ">"]))
///     }
///     fn type_ident() -> &'static str { "Tagged" }
///     fn module_path() -> Option<&'static str> { Some("app") }
/// }
///
/// assert_eq!(<Tagged<u8>>::type_name(), "Tagged<u8>");
/// assert_eq!(<Tagged<u8>>::type_path(), "app::Tagged<u8>");
/// ```
pub trait TypePath: 'static {
    /// Fully qualified path with generics.
    ///
    /// For `Option<Vec<usize>>`, this is `"core::option::Option<alloc::vec::Vec<usize>>"`.
    fn type_path() -> &'static str;

    /// Short, pretty-print path.
    ///
    /// For `Option<Vec<usize>>`, this is `"Option<Vec<usize>>"`.
    fn type_name() -> &'static str;

    /// Short name without generics.
    ///
    /// For `Option<Vec<usize>>`, this is `"Option"`.
    fn type_ident() -> &'static str;

    /// Module path where the type is defined, `None` for primitives.
    fn module_path() -> Option<&'static str> {
        None
    }
}

// -----------------------------------------------------------------------------
// Type

/// A [`TypeId`] together with the [`TypePath`] accessors of its type.
///
/// Two `Type`s are equal when their ids are, which is what the recursion
/// guard keys on.
///
/// ```
/// use vc_schema::Type;
///
/// let ty = Type::of::<String>();
/// assert!(ty.is::<String>());
/// assert_eq!(ty.path(), "alloc::string::String");
/// assert_eq!(ty.name(), "String");
/// ```
#[derive(Clone, Copy)]
pub struct Type {
    type_id: TypeId,
    type_path: fn() -> &'static str,
    type_name: fn() -> &'static str,
    type_ident: fn() -> &'static str,
    module_path: fn() -> Option<&'static str>,
}

impl Type {
    #[inline]
    pub const fn of<T: TypePath + ?Sized>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_path: T::type_path,
            type_name: T::type_name,
            type_ident: T::type_ident,
            module_path: T::module_path,
        }
    }

    #[inline(always)]
    pub const fn id(&self) -> TypeId {
        self.type_id
    }

    /// See [`TypePath::type_path`].
    #[inline(always)]
    pub fn path(&self) -> &'static str {
        (self.type_path)()
    }

    /// See [`TypePath::type_name`].
    #[inline(always)]
    pub fn name(&self) -> &'static str {
        (self.type_name)()
    }

    /// See [`TypePath::type_ident`].
    #[inline(always)]
    pub fn ident(&self) -> &'static str {
        (self.type_ident)()
    }

    /// See [`TypePath::module_path`].
    #[inline(always)]
    pub fn module_path(&self) -> Option<&'static str> {
        (self.module_path)()
    }

    /// Returns `true` if this is `T`.
    #[inline]
    pub fn is<T: TypePath + ?Sized>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for Type {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for Type {}

impl Hash for Type {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
