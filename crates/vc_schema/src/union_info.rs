use core::any::Any;
use core::fmt;

use crate::error::downcast;
use crate::{Generics, SchemaError, Type, TypeInfo, Typed, Union, VariantValue};

// -----------------------------------------------------------------------------
// UnionVariant

/// A variant of a union, named after the enum variant.
#[derive(Clone, Copy)]
pub struct UnionVariant {
    name: &'static str,
    ty: Type,
    type_info: fn() -> &'static TypeInfo,
}

impl UnionVariant {
    /// A variant `name` wrapping a `T`.
    #[inline]
    pub fn new<T: Typed>(name: &'static str) -> Self {
        Self {
            name,
            ty: Type::of::<T>(),
            type_info: T::type_info,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type of the wrapped value.
    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn type_info(&self) -> &'static TypeInfo {
        (self.type_info)()
    }
}

impl fmt::Debug for UnionVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.ty.path())
    }
}

// -----------------------------------------------------------------------------
// UnionInfo

/// Type information of a [`Union`].
#[derive(Clone)]
pub struct UnionInfo {
    ty: Type,
    generics: Generics,
    variants: Box<[UnionVariant]>,
    wrap: fn(usize, Box<dyn Any>) -> Result<Box<dyn Any>, SchemaError>,
    active: fn(&dyn Any) -> Result<(usize, &dyn Any), SchemaError>,
}

fn wrap<T: Union>(index: usize, value: Box<dyn Any>) -> Result<Box<dyn Any>, SchemaError> {
    let variant = VariantValue::new(T::type_path(), index, value);
    Ok(Box::new(T::from_variant(variant)?))
}

fn active<T: Union>(value: &dyn Any) -> Result<(usize, &dyn Any), SchemaError> {
    Ok(downcast::<T>(value)?.variant())
}

impl UnionInfo {
    /// Creates the info of union `T` with the given variants.
    pub fn new<T: Union>(variants: &[UnionVariant]) -> Self {
        Self {
            ty: Type::of::<T>(),
            generics: Generics::new(),
            variants: variants.into(),
            wrap: wrap::<T>,
            active: active::<T>,
        }
    }

    /// Attaches the type arguments of a generic union.
    #[inline]
    pub fn with_generics(mut self, generics: Generics) -> Self {
        self.generics = generics;
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
    pub fn variant_at(&self, index: usize) -> Option<&UnionVariant> {
        self.variants.get(index)
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, UnionVariant> {
        self.variants.iter()
    }

    #[inline]
    pub fn variant_len(&self) -> usize {
        self.variants.len()
    }

    /// Builds the union from the value of variant `index`.
    #[inline]
    pub fn wrap(&self, index: usize, value: Box<dyn Any>) -> Result<Box<dyn Any>, SchemaError> {
        (self.wrap)(index, value)
    }

    /// The active variant of `union`, which must be of this type.
    #[inline]
    pub fn active<'a>(&self, union: &'a dyn Any) -> Result<(usize, &'a dyn Any), SchemaError> {
        (self.active)(union)
    }
}

impl fmt::Debug for UnionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionInfo")
            .field("ty", &self.ty)
            .field("generics", &self.generics)
            .field("variants", &self.variants)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::derive::Schema;
    use crate::{SchemaError, TypeKind, Typed};

    #[derive(Schema, Debug, PartialEq)]
    enum Occupation {
        Title(String),
        Roles(Vec<String>),
    }

    #[test]
    fn variants_wrap_and_unwrap() {
        let info = Occupation::type_info();
        assert_eq!(info.kind(), TypeKind::Union);

        let union = info.as_union().unwrap();
        assert_eq!(union.variant_len(), 2);
        assert_eq!(union.variant_at(1).unwrap().name(), "Roles");
        assert!(union.variant_at(1).unwrap().ty().is::<Vec<String>>());

        let value = union.wrap(0, Box::new(String::from("chef"))).unwrap();
        let value = value.downcast_ref::<Occupation>().unwrap();
        assert_eq!(value, &Occupation::Title("chef".into()));

        let (index, inner) = union.active(value).unwrap();
        assert_eq!(index, 0);
        assert_eq!(inner.downcast_ref::<String>().map(String::as_str), Some("chef"));
    }

    #[test]
    fn wrong_variant_values_are_rejected() {
        let union = Occupation::type_info().as_union().unwrap();
        let err = union.wrap(1, Box::new(3_u8)).unwrap_err();
        assert!(matches!(err, SchemaError::FieldType { index: 1, .. }));

        let err = union.wrap(2, Box::new(3_u8)).unwrap_err();
        assert!(matches!(err, SchemaError::NoVariant { index: 2, .. }));
    }
}
