use core::fmt;

use crate::{Type, TypeInfo, Typed};

// -----------------------------------------------------------------------------
// TypeParamInfo

/// A generic type parameter together with the concrete type bound to it.
#[derive(Clone, Copy)]
pub struct TypeParamInfo {
    name: &'static str,
    ty: Type,
    type_info: fn() -> &'static TypeInfo,
}

impl TypeParamInfo {
    /// Describes parameter `name` instantiated with `T`.
    #[inline]
    pub fn new<T: Typed>(name: &'static str) -> Self {
        Self {
            name,
            ty: Type::of::<T>(),
            type_info: T::type_info,
        }
    }

    /// The parameter name as written in the definition, e.g. `"T"`.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The concrete type bound to this parameter.
    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// The concrete type's [`TypeInfo`].
    #[inline]
    pub fn type_info(&self) -> &'static TypeInfo {
        (self.type_info)()
    }
}

impl fmt::Debug for TypeParamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.ty.path())
    }
}

// -----------------------------------------------------------------------------
// Generics

/// The type arguments of a generic type, in declaration order.
///
/// ```
/// use vc_schema::Typed;
///
/// let generics = <Option<u8>>::type_info().generics();
/// assert_eq!(generics.len(), 1);
/// assert!(generics.get(0).unwrap().ty().is::<u8>());
/// ```
#[derive(Clone, Default)]
pub struct Generics(Box<[TypeParamInfo]>);

impl Generics {
    /// No type arguments.
    #[inline]
    pub fn new() -> Self {
        Self(Box::new([]))
    }

    /// Builds generics from the given parameters.
    pub fn from_params(params: &[TypeParamInfo]) -> Self {
        Self(params.into())
    }

    /// Shorthand for a single parameter `T`.
    pub fn of<T: Typed>(name: &'static str) -> Self {
        Self(Box::new([TypeParamInfo::new::<T>(name)]))
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&TypeParamInfo> {
        self.0.get(index)
    }

    /// Finds a parameter by its name.
    pub fn get_named(&self, name: &str) -> Option<&TypeParamInfo> {
        self.0.iter().find(|param| param.name == name)
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, TypeParamInfo> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The concrete types in order, e.g. `[i32, String]` for `Pair<i32, String>`.
    pub fn types(&self) -> impl ExactSizeIterator<Item = Type> + '_ {
        self.0.iter().map(|param| param.ty)
    }
}

impl fmt::Debug for Generics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}
