use core::any::Any;
use core::fmt;

use crate::error::downcast;
use crate::{SchemaError, Type, Typed};

// -----------------------------------------------------------------------------
// Scalar

/// The JSON-facing category of a scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
    Char,
    Str,
}

impl ScalarKind {
    /// Lower-case name used in generated helper names, e.g. `as_int`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::Char => "char",
            Self::Str => "str",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// An owned scalar in its widest representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(String),
}

impl Scalar {
    #[inline]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::Int(_) => ScalarKind::Int,
            Self::UInt(_) => ScalarKind::UInt,
            Self::Float(_) => ScalarKind::Float,
            Self::Char(_) => ScalarKind::Char,
            Self::Str(_) => ScalarKind::Str,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => fmt::Display::fmt(v, f),
            Self::Int(v) => fmt::Display::fmt(v, f),
            Self::UInt(v) => fmt::Display::fmt(v, f),
            Self::Float(v) => fmt::Display::fmt(v, f),
            Self::Char(v) => write!(f, "{v:?}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// A type that converts to and from a [`Scalar`].
///
/// Implemented for `bool`, the integer and float primitives, `char` and `String`.
pub trait ScalarValue: Typed + Sized {
    const KIND: ScalarKind;

    fn from_scalar(scalar: Scalar) -> Result<Self, SchemaError>;

    fn to_scalar(&self) -> Scalar;
}

// -----------------------------------------------------------------------------
// ScalarInfo

/// Type information of a [`ScalarValue`].
#[derive(Clone)]
pub struct ScalarInfo {
    ty: Type,
    kind: ScalarKind,
    from_scalar: fn(Scalar) -> Result<Box<dyn Any>, SchemaError>,
    to_scalar: fn(&dyn Any) -> Result<Scalar, SchemaError>,
}

fn scalar_from<T: ScalarValue>(scalar: Scalar) -> Result<Box<dyn Any>, SchemaError> {
    Ok(Box::new(T::from_scalar(scalar)?))
}

fn scalar_to<T: ScalarValue>(value: &dyn Any) -> Result<Scalar, SchemaError> {
    Ok(downcast::<T>(value)?.to_scalar())
}

impl ScalarInfo {
    pub fn new<T: ScalarValue>() -> Self {
        Self {
            ty: Type::of::<T>(),
            kind: T::KIND,
            from_scalar: scalar_from::<T>,
            to_scalar: scalar_to::<T>,
        }
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    #[inline]
    pub fn from_scalar(&self, scalar: Scalar) -> Result<Box<dyn Any>, SchemaError> {
        (self.from_scalar)(scalar)
    }

    #[inline]
    pub fn to_scalar(&self, value: &dyn Any) -> Result<Scalar, SchemaError> {
        (self.to_scalar)(value)
    }
}

impl fmt::Debug for ScalarInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarInfo")
            .field("ty", &self.ty)
            .field("kind", &self.kind)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// OpaqueInfo

/// Type information of a type with no inspectable structure.
///
/// Converting an opaque type requires a user-registered hook.
#[derive(Clone, Debug)]
pub struct OpaqueInfo {
    ty: Type,
}

impl OpaqueInfo {
    pub fn new<T: Typed>() -> Self {
        Self { ty: Type::of::<T>() }
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }
}
