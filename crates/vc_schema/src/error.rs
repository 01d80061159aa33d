use core::any::Any;

use thiserror::Error;

use crate::TypePath;

/// Failure while building or inspecting a value through its [`TypeInfo`].
///
/// These errors mean the erased value handed to a schema function does not
/// belong to the described type, or a scalar does not fit it.
///
/// [`TypeInfo`]: crate::TypeInfo
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("`{owner}` expected a value for field #{index}, but none was supplied")]
    MissingValue { owner: &'static str, index: usize },
    #[error("`{owner}` received {supplied} field values, expected {expected}")]
    ExtraValues {
        owner: &'static str,
        supplied: usize,
        expected: usize,
    },
    #[error("`{owner}` field #{index} is not a `{expected}`")]
    FieldType {
        owner: &'static str,
        index: usize,
        expected: &'static str,
    },
    #[error("value is not a `{expected}`")]
    ValueType { expected: &'static str },
    #[error("scalar {value} does not fit in `{ty}`")]
    OutOfRange { ty: &'static str, value: String },
    #[error("`{ty}` cannot be built from a {received} scalar")]
    ScalarKind { ty: &'static str, received: &'static str },
    #[error("`{owner}` has no variant #{index}")]
    NoVariant { owner: &'static str, index: usize },
}

#[inline]
pub(crate) fn downcast<T: TypePath>(value: &dyn Any) -> Result<&T, SchemaError> {
    value.downcast_ref::<T>().ok_or(SchemaError::ValueType {
        expected: T::type_path(),
    })
}

#[inline]
pub(crate) fn unbox<T: TypePath>(value: Box<dyn Any>) -> Result<T, SchemaError> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| SchemaError::ValueType {
            expected: T::type_path(),
        })
}
