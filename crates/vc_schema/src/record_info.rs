use core::any::Any;
use core::fmt;

use crate::error::downcast;
use crate::{FieldValues, Generics, Record, SchemaError, Type, TypeInfo, Typed};

// -----------------------------------------------------------------------------
// NamedField

/// A named field of a record.
#[derive(Clone, Copy)]
pub struct NamedField {
    name: &'static str,
    key: &'static str,
    ty: Type,
    type_info: fn() -> &'static TypeInfo,
    default: Option<fn() -> Box<dyn Any>>,
    generic_param: Option<usize>,
}

impl NamedField {
    /// A field `name` of type `T`, serialized under the same key.
    #[inline]
    pub fn new<T: Typed>(name: &'static str) -> Self {
        Self {
            name,
            key: name,
            ty: Type::of::<T>(),
            type_info: T::type_info,
            default: None,
            generic_param: None,
        }
    }

    /// Serialize this field under `key` instead of its name.
    #[inline]
    pub fn with_key(mut self, key: &'static str) -> Self {
        self.key = key;
        self
    }

    /// Value used when the key is absent from the input.
    #[inline]
    pub fn with_default(mut self, default: fn() -> Box<dyn Any>) -> Self {
        self.default = Some(default);
        self
    }

    /// Marks the field as declared with the record's type parameter `index`.
    #[inline]
    pub fn with_generic_param(mut self, index: usize) -> Self {
        self.generic_param = Some(index);
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The serialized key.
    #[inline]
    pub fn key(&self) -> &'static str {
        self.key
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn type_info(&self) -> &'static TypeInfo {
        (self.type_info)()
    }

    #[inline]
    pub fn default_value(&self) -> Option<Box<dyn Any>> {
        self.default.map(|f| f())
    }

    /// The default factory, if the field declares one.
    #[inline]
    pub fn default_fn(&self) -> Option<fn() -> Box<dyn Any>> {
        self.default
    }

    #[inline]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Index of the type parameter this field was declared with, if any.
    ///
    /// For `struct Pair<A, B> { first: A, second: B, label: String }`,
    /// `second` returns `Some(1)` and `label` returns `None`.
    #[inline]
    pub fn generic_param(&self) -> Option<usize> {
        self.generic_param
    }
}

impl fmt::Debug for NamedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedField")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("ty", &self.ty)
            .field("has_default", &self.has_default())
            .field("generic_param", &self.generic_param)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// RecordInfo

/// Type information of a [`Record`].
#[derive(Clone)]
pub struct RecordInfo {
    ty: Type,
    generics: Generics,
    fields: Box<[NamedField]>,
    positional: bool,
    construct: fn(FieldValues) -> Result<Box<dyn Any>, SchemaError>,
    field_ref: fn(&dyn Any, usize) -> Result<Option<&dyn Any>, SchemaError>,
}

fn construct<T: Record>(mut values: FieldValues) -> Result<Box<dyn Any>, SchemaError> {
    let record = T::from_fields(&mut values)?;
    values.finish()?;
    Ok(Box::new(record))
}

fn field_ref<T: Record>(value: &dyn Any, index: usize) -> Result<Option<&dyn Any>, SchemaError> {
    Ok(downcast::<T>(value)?.field_at(index))
}

impl RecordInfo {
    /// Creates the info of record `T` with the given fields.
    pub fn new<T: Record>(fields: &[NamedField]) -> Self {
        Self {
            ty: Type::of::<T>(),
            generics: Generics::new(),
            fields: fields.into(),
            positional: false,
            construct: construct::<T>,
            field_ref: field_ref::<T>,
        }
    }

    /// Attaches the type arguments of a generic record.
    #[inline]
    pub fn with_generics(mut self, generics: Generics) -> Self {
        self.generics = generics;
        self
    }

    /// Serializes the record as a sequence of its field values, in
    /// declaration order, instead of a mapping.
    #[inline]
    pub fn with_positional(mut self) -> Self {
        self.positional = true;
        self
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn generics(&self) -> &Generics {
        &self.generics
    }

    #[inline]
    pub fn is_positional(&self) -> bool {
        self.positional
    }

    /// The number of leading fields a positional input must supply: every
    /// field up to the last one without a default.
    pub fn required_len(&self) -> usize {
        self.fields
            .iter()
            .rposition(|field| !field.has_default())
            .map_or(0, |last| last + 1)
    }

    /// Returns `true` if the record is declared with type parameters.
    #[inline]
    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    /// Finds a field by its Rust name.
    pub fn field(&self, name: &str) -> Option<&NamedField> {
        self.fields.iter().find(|field| field.name == name)
    }

    #[inline]
    pub fn field_at(&self, index: usize) -> Option<&NamedField> {
        self.fields.get(index)
    }

    /// Returns the index of the field serialized under `key`.
    pub fn index_of_key(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.key == key)
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, NamedField> {
        self.fields.iter()
    }

    #[inline]
    pub fn field_len(&self) -> usize {
        self.fields.len()
    }

    /// Builds a record from one value per field, in declaration order.
    #[inline]
    pub fn construct(&self, values: Vec<Box<dyn Any>>) -> Result<Box<dyn Any>, SchemaError> {
        (self.construct)(FieldValues::new(self.ty.name(), values))
    }

    /// Borrows field `index` of `record`, which must be of this type.
    #[inline]
    pub fn get_field<'a>(
        &self,
        record: &'a dyn Any,
        index: usize,
    ) -> Result<Option<&'a dyn Any>, SchemaError> {
        (self.field_ref)(record, index)
    }
}

impl fmt::Debug for RecordInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordInfo")
            .field("ty", &self.ty)
            .field("generics", &self.generics)
            .field("fields", &self.fields)
            .field("positional", &self.positional)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::Typed;
    use crate::derive::Schema;

    #[derive(Schema)]
    #[schema(positional)]
    struct Version {
        major: u32,
        #[schema(default)]
        minor: u32,
        patch: u32,
        #[schema(default)]
        pre: Option<String>,
    }

    #[derive(Schema)]
    struct Settings {
        #[schema(default)]
        verbose: bool,
    }

    #[test]
    fn required_len_stops_at_the_last_field_without_default() {
        let info = Version::type_info().as_record().unwrap();
        assert!(info.is_positional());
        assert_eq!(info.field_len(), 4);
        assert_eq!(info.required_len(), 3);

        let info = Settings::type_info().as_record().unwrap();
        assert!(!info.is_positional());
        assert_eq!(info.required_len(), 0);
    }
}
