use core::fmt;

use thiserror::Error;

use crate::{BoxedInfo, ListInfo, MapInfo, OptionalInfo, TupleInfo};
use crate::{DynamicInfo, Generics, OpaqueInfo, RecordInfo, ScalarInfo, Type, UnionInfo};

// -----------------------------------------------------------------------------
// TypeKind

/// The structural category of a [`TypeInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Record,
    Union,
    Tuple,
    List,
    Map,
    Optional,
    Boxed,
    Scalar,
    Dynamic,
    Opaque,
}

impl TypeKind {
    /// Lower-case name, used in generated procedure names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Union => "union",
            Self::Tuple => "tuple",
            Self::List => "list",
            Self::Map => "map",
            Self::Optional => "optional",
            Self::Boxed => "boxed",
            Self::Scalar => "scalar",
            Self::Dynamic => "dynamic",
            Self::Opaque => "opaque",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when a [`TypeInfo`] is not the expected [`TypeKind`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("type kind mismatch: expected {expected}, received {received}")]
pub struct TypeKindError {
    pub expected: TypeKind,
    pub received: TypeKind,
}

// -----------------------------------------------------------------------------
// TypeInfo

/// Compile-time type information, obtained through [`Typed::type_info`].
///
/// [`Typed::type_info`]: crate::Typed::type_info
#[derive(Debug, Clone)]
pub enum TypeInfo {
    Record(RecordInfo),
    Union(UnionInfo),
    Tuple(TupleInfo),
    List(ListInfo),
    Map(MapInfo),
    Optional(OptionalInfo),
    Boxed(BoxedInfo),
    Scalar(ScalarInfo),
    Dynamic(DynamicInfo),
    Opaque(OpaqueInfo),
}

macro_rules! impl_cast_method {
    ($name:ident : $kind:ident => $info:ident) => {
        /// Convert to the specific type information.
        pub const fn $name(&self) -> Result<&$info, TypeKindError> {
            match self {
                Self::$kind(info) => Ok(info),
                _ => Err(TypeKindError {
                    expected: TypeKind::$kind,
                    received: self.kind(),
                }),
            }
        }
    };
}

static NO_GENERICS: std::sync::LazyLock<Generics> = std::sync::LazyLock::new(Generics::new);

impl TypeInfo {
    impl_cast_method!(as_record: Record => RecordInfo);
    impl_cast_method!(as_union: Union => UnionInfo);
    impl_cast_method!(as_tuple: Tuple => TupleInfo);
    impl_cast_method!(as_list: List => ListInfo);
    impl_cast_method!(as_map: Map => MapInfo);
    impl_cast_method!(as_optional: Optional => OptionalInfo);
    impl_cast_method!(as_boxed: Boxed => BoxedInfo);
    impl_cast_method!(as_scalar: Scalar => ScalarInfo);
    impl_cast_method!(as_dynamic: Dynamic => DynamicInfo);
    impl_cast_method!(as_opaque: Opaque => OpaqueInfo);

    /// Returns the underlying [`Type`].
    pub fn ty(&self) -> &Type {
        match self {
            Self::Record(info) => info.ty(),
            Self::Union(info) => info.ty(),
            Self::Tuple(info) => info.ty(),
            Self::List(info) => info.ty(),
            Self::Map(info) => info.ty(),
            Self::Optional(info) => info.ty(),
            Self::Boxed(info) => info.ty(),
            Self::Scalar(info) => info.ty(),
            Self::Dynamic(info) => info.ty(),
            Self::Opaque(info) => info.ty(),
        }
    }

    pub const fn kind(&self) -> TypeKind {
        match self {
            Self::Record(_) => TypeKind::Record,
            Self::Union(_) => TypeKind::Union,
            Self::Tuple(_) => TypeKind::Tuple,
            Self::List(_) => TypeKind::List,
            Self::Map(_) => TypeKind::Map,
            Self::Optional(_) => TypeKind::Optional,
            Self::Boxed(_) => TypeKind::Boxed,
            Self::Scalar(_) => TypeKind::Scalar,
            Self::Dynamic(_) => TypeKind::Dynamic,
            Self::Opaque(_) => TypeKind::Opaque,
        }
    }

    /// The type arguments. Empty for scalars, dynamic and opaque types.
    pub fn generics(&self) -> &Generics {
        match self {
            Self::Record(info) => info.generics(),
            Self::Union(info) => info.generics(),
            Self::Tuple(info) => info.generics(),
            Self::List(info) => info.generics(),
            Self::Map(info) => info.generics(),
            Self::Optional(info) => info.generics(),
            Self::Boxed(info) => info.generics(),
            Self::Scalar(_) | Self::Dynamic(_) | Self::Opaque(_) => &*NO_GENERICS,
        }
    }

    #[inline]
    pub fn type_id(&self) -> core::any::TypeId {
        self.ty().id()
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.ty().path()
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.ty().name()
    }

    #[inline]
    pub fn type_ident(&self) -> &'static str {
        self.ty().ident()
    }
}
