use core::any::Any;

use crate::error::unbox;
use crate::{SchemaError, TypePath, Typed};

// -----------------------------------------------------------------------------
// Record

/// A struct with named fields that can be assembled from, and read through,
/// type-erased field values.
///
/// Implemented by [`#[derive(Schema)]`](crate::derive::Schema). Field indices
/// follow declaration order and match [`RecordInfo::field_at`].
///
/// [`RecordInfo::field_at`]: crate::RecordInfo::field_at
pub trait Record: Typed + Sized {
    /// Builds the record, taking one value per field in declaration order.
    fn from_fields(fields: &mut FieldValues) -> Result<Self, SchemaError>;

    /// Borrows the field at `index`.
    fn field_at(&self, index: usize) -> Option<&dyn Any>;
}

// -----------------------------------------------------------------------------
// FieldValues

/// Type-erased field values handed to [`Record::from_fields`].
///
/// ```
/// use core::any::Any;
/// use vc_schema::FieldValues;
///
/// let mut values: Vec<Box<dyn Any>> = Vec::new();
/// values.push(Box::new(1_i32));
/// values.push(Box::new(String::from("a")));
/// let mut fields = FieldValues::new("Pair", values);
///
/// assert_eq!(fields.take::<i32>().unwrap(), 1);
/// assert_eq!(fields.take::<String>().unwrap(), "a");
/// assert!(fields.finish().is_ok());
/// ```
pub struct FieldValues {
    owner: &'static str,
    values: std::vec::IntoIter<Box<dyn Any>>,
    supplied: usize,
    taken: usize,
}

impl FieldValues {
    /// Wraps the values for the record named `owner`.
    pub fn new(owner: &'static str, values: Vec<Box<dyn Any>>) -> Self {
        Self {
            owner,
            supplied: values.len(),
            values: values.into_iter(),
            taken: 0,
        }
    }

    /// Takes the next value, which must be a `T`.
    pub fn take<T: TypePath>(&mut self) -> Result<T, SchemaError> {
        let index = self.taken;
        self.taken += 1;
        let value = self.values.next().ok_or(SchemaError::MissingValue {
            owner: self.owner,
            index,
        })?;
        unbox::<T>(value).map_err(|_| SchemaError::FieldType {
            owner: self.owner,
            index,
            expected: T::type_path(),
        })
    }

    /// Fails if values are left over.
    pub fn finish(self) -> Result<(), SchemaError> {
        if self.taken < self.supplied {
            return Err(SchemaError::ExtraValues {
                owner: self.owner,
                supplied: self.supplied,
                expected: self.taken,
            });
        }
        Ok(())
    }

    /// The number of values not yet taken.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}
