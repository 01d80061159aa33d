use core::any::Any;

use crate::error::unbox;
use crate::{SchemaError, TypePath, Typed};

// -----------------------------------------------------------------------------
// Union

/// An enum whose variants each wrap one value, converted untagged: the
/// serialized form is the form of the active variant's value.
///
/// Implemented by [`#[derive(Schema)]`](crate::derive::Schema) for enums of
/// newtype variants. Variant indices follow declaration order and match
/// [`UnionInfo::variant_at`].
///
/// [`UnionInfo::variant_at`]: crate::UnionInfo::variant_at
pub trait Union: Typed + Sized {
    /// Builds the variant [`VariantValue::index`] around its value.
    fn from_variant(variant: VariantValue) -> Result<Self, SchemaError>;

    /// The index of the active variant and a borrow of its value.
    fn variant(&self) -> (usize, &dyn Any);
}

// -----------------------------------------------------------------------------
// VariantValue

/// The type-erased value handed to [`Union::from_variant`].
///
/// ```
/// use vc_schema::{SchemaError, VariantValue};
///
/// let variant = VariantValue::new("Shape", 1, Box::new(2.5_f64));
/// assert_eq!(variant.index(), 1);
/// assert_eq!(variant.take::<f64>().unwrap(), 2.5);
///
/// let variant = VariantValue::new("Shape", 4, Box::new(()));
/// assert_eq!(variant.unknown(), SchemaError::NoVariant { owner: "Shape", index: 4 });
/// ```
pub struct VariantValue {
    owner: &'static str,
    index: usize,
    value: Box<dyn Any>,
}

impl VariantValue {
    /// Wraps the value of variant `index` of the union named `owner`.
    #[inline]
    pub fn new(owner: &'static str, index: usize, value: Box<dyn Any>) -> Self {
        Self {
            owner,
            index,
            value,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Takes the value, which must be a `T`.
    pub fn take<T: TypePath>(self) -> Result<T, SchemaError> {
        unbox::<T>(self.value).map_err(|_| SchemaError::FieldType {
            owner: self.owner,
            index: self.index,
            expected: T::type_path(),
        })
    }

    /// The error for an index past the last variant.
    #[inline]
    pub fn unknown(&self) -> SchemaError {
        SchemaError::NoVariant {
            owner: self.owner,
            index: self.index,
        }
    }
}
