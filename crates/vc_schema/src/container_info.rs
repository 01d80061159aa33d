use core::any::Any;
use core::fmt;

use crate::error::{downcast, unbox};
use crate::{Generics, SchemaError, Type, TypeInfo, TypeParamInfo, Typed};

type Construct<A> = fn(A) -> Result<Box<dyn Any>, SchemaError>;

macro_rules! impl_common_fn {
    () => {
        #[inline]
        pub fn ty(&self) -> &Type {
            &self.ty
        }

        #[inline]
        pub fn generics(&self) -> &Generics {
            &self.generics
        }
    };
}

macro_rules! impl_debug {
    ($info:ident) => {
        impl fmt::Debug for $info {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($info))
                    .field("ty", &self.ty)
                    .field("generics", &self.generics)
                    .finish()
            }
        }
    };
}

// -----------------------------------------------------------------------------
// Tuple

/// Tuples that can be assembled from type-erased elements.
pub(crate) trait TupleValue: Typed + Sized {
    fn generics() -> Generics;
    fn from_elements(elements: Vec<Box<dyn Any>>) -> Result<Self, SchemaError>;
    fn element_ref(&self, index: usize) -> Option<&dyn Any>;
}

/// Type information of a tuple. The element types are its [`Generics`].
#[derive(Clone)]
pub struct TupleInfo {
    ty: Type,
    generics: Generics,
    construct: Construct<Vec<Box<dyn Any>>>,
    element_ref: fn(&dyn Any, usize) -> Result<Option<&dyn Any>, SchemaError>,
}

fn construct_tuple<T: TupleValue>(elements: Vec<Box<dyn Any>>) -> Result<Box<dyn Any>, SchemaError> {
    Ok(Box::new(T::from_elements(elements)?))
}

fn tuple_element<T: TupleValue>(
    value: &dyn Any,
    index: usize,
) -> Result<Option<&dyn Any>, SchemaError> {
    Ok(downcast::<T>(value)?.element_ref(index))
}

impl TupleInfo {
    pub(crate) fn new<T: TupleValue>() -> Self {
        Self {
            ty: Type::of::<T>(),
            generics: T::generics(),
            construct: construct_tuple::<T>,
            element_ref: tuple_element::<T>,
        }
    }

    impl_common_fn!();

    #[inline]
    pub fn element_at(&self, index: usize) -> Option<&TypeParamInfo> {
        self.generics.get(index)
    }

    #[inline]
    pub fn element_len(&self) -> usize {
        self.generics.len()
    }

    /// Builds a tuple from exactly [`element_len`](Self::element_len) values.
    #[inline]
    pub fn construct(&self, elements: Vec<Box<dyn Any>>) -> Result<Box<dyn Any>, SchemaError> {
        (self.construct)(elements)
    }

    #[inline]
    pub fn get_element<'a>(
        &self,
        tuple: &'a dyn Any,
        index: usize,
    ) -> Result<Option<&'a dyn Any>, SchemaError> {
        (self.element_ref)(tuple, index)
    }
}

impl_debug!(TupleInfo);

// -----------------------------------------------------------------------------
// List

/// Type information of a growable sequence such as `Vec<T>`.
#[derive(Clone)]
pub struct ListInfo {
    ty: Type,
    generics: Generics,
    item: TypeParamInfo,
    from_items: Construct<Vec<Box<dyn Any>>>,
    items: fn(&dyn Any) -> Result<Vec<&dyn Any>, SchemaError>,
}

fn list_from_items<L, T>(items: Vec<Box<dyn Any>>) -> Result<Box<dyn Any>, SchemaError>
where
    L: Typed + FromIterator<T>,
    T: Typed,
{
    let list = items
        .into_iter()
        .map(unbox::<T>)
        .collect::<Result<L, _>>()?;
    Ok(Box::new(list))
}

fn list_items<L, T>(value: &dyn Any) -> Result<Vec<&dyn Any>, SchemaError>
where
    L: Typed,
    for<'a> &'a L: IntoIterator<Item = &'a T>,
    T: Typed,
{
    Ok(downcast::<L>(value)?
        .into_iter()
        .map(|item| item as &dyn Any)
        .collect())
}

impl ListInfo {
    /// Describes list `L` holding items of type `T`.
    pub fn new<L, T>() -> Self
    where
        L: Typed + FromIterator<T>,
        for<'a> &'a L: IntoIterator<Item = &'a T>,
        T: Typed,
    {
        Self {
            ty: Type::of::<L>(),
            generics: Generics::of::<T>("T"),
            item: TypeParamInfo::new::<T>("T"),
            from_items: list_from_items::<L, T>,
            items: list_items::<L, T>,
        }
    }

    impl_common_fn!();

    #[inline]
    pub fn item(&self) -> &TypeParamInfo {
        &self.item
    }

    #[inline]
    pub fn item_info(&self) -> &'static TypeInfo {
        self.item.type_info()
    }

    #[inline]
    pub fn from_items(&self, items: Vec<Box<dyn Any>>) -> Result<Box<dyn Any>, SchemaError> {
        (self.from_items)(items)
    }

    #[inline]
    pub fn items<'a>(&self, list: &'a dyn Any) -> Result<Vec<&'a dyn Any>, SchemaError> {
        (self.items)(list)
    }
}

impl_debug!(ListInfo);

// -----------------------------------------------------------------------------
// Map

/// Type information of a key-value map such as `HashMap<K, V>`.
#[derive(Clone)]
pub struct MapInfo {
    ty: Type,
    generics: Generics,
    key: TypeParamInfo,
    value: TypeParamInfo,
    ordered: bool,
    from_entries: Construct<Vec<(Box<dyn Any>, Box<dyn Any>)>>,
    entries: fn(&dyn Any) -> Result<Vec<(&dyn Any, &dyn Any)>, SchemaError>,
}

fn map_from_entries<M, K, V>(
    entries: Vec<(Box<dyn Any>, Box<dyn Any>)>,
) -> Result<Box<dyn Any>, SchemaError>
where
    M: Typed + FromIterator<(K, V)>,
    K: Typed,
    V: Typed,
{
    let map = entries
        .into_iter()
        .map(|(k, v)| -> Result<(K, V), SchemaError> { Ok((unbox::<K>(k)?, unbox::<V>(v)?)) })
        .collect::<Result<M, _>>()?;
    Ok(Box::new(map))
}

fn map_entries<M, K, V>(value: &dyn Any) -> Result<Vec<(&dyn Any, &dyn Any)>, SchemaError>
where
    M: Typed,
    for<'a> &'a M: IntoIterator<Item = (&'a K, &'a V)>,
    K: Typed,
    V: Typed,
{
    Ok(downcast::<M>(value)?
        .into_iter()
        .map(|(k, v)| (k as &dyn Any, v as &dyn Any))
        .collect())
}

impl MapInfo {
    /// Describes map `M` from `K` to `V`.
    pub fn new<M, K, V>() -> Self
    where
        M: Typed + FromIterator<(K, V)>,
        for<'a> &'a M: IntoIterator<Item = (&'a K, &'a V)>,
        K: Typed,
        V: Typed,
    {
        let key = TypeParamInfo::new::<K>("K");
        let value = TypeParamInfo::new::<V>("V");
        Self {
            ty: Type::of::<M>(),
            generics: Generics::from_params(&[key, value]),
            key,
            value,
            ordered: false,
            from_entries: map_from_entries::<M, K, V>,
            entries: map_entries::<M, K, V>,
        }
    }

    /// Marks the iteration order of `M` as deterministic, e.g. sorted by key.
    #[inline]
    pub fn with_ordered_entries(mut self) -> Self {
        self.ordered = true;
        self
    }

    impl_common_fn!();

    /// Returns `true` if [`entries`](Self::entries) yields a deterministic order.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    #[inline]
    pub fn key(&self) -> &TypeParamInfo {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &TypeParamInfo {
        &self.value
    }

    #[inline]
    pub fn from_entries(
        &self,
        entries: Vec<(Box<dyn Any>, Box<dyn Any>)>,
    ) -> Result<Box<dyn Any>, SchemaError> {
        (self.from_entries)(entries)
    }

    #[inline]
    pub fn entries<'a>(&self, map: &'a dyn Any) -> Result<Vec<(&'a dyn Any, &'a dyn Any)>, SchemaError> {
        (self.entries)(map)
    }
}

impl_debug!(MapInfo);

// -----------------------------------------------------------------------------
// Optional

/// Type information of `Option<T>`.
#[derive(Clone)]
pub struct OptionalInfo {
    ty: Type,
    generics: Generics,
    inner: TypeParamInfo,
    some: Construct<Box<dyn Any>>,
    none: fn() -> Box<dyn Any>,
    get: fn(&dyn Any) -> Result<Option<&dyn Any>, SchemaError>,
}

fn option_some<T: Typed>(value: Box<dyn Any>) -> Result<Box<dyn Any>, SchemaError> {
    Ok(Box::new(Some(unbox::<T>(value)?)))
}

fn option_none<T: Typed>() -> Box<dyn Any> {
    Box::new(None::<T>)
}

fn option_get<T: Typed>(value: &dyn Any) -> Result<Option<&dyn Any>, SchemaError> {
    Ok(downcast::<Option<T>>(value)?
        .as_ref()
        .map(|inner| inner as &dyn Any))
}

impl OptionalInfo {
    pub fn new<T: Typed>() -> Self {
        Self {
            ty: Type::of::<Option<T>>(),
            generics: Generics::of::<T>("T"),
            inner: TypeParamInfo::new::<T>("T"),
            some: option_some::<T>,
            none: option_none::<T>,
            get: option_get::<T>,
        }
    }

    impl_common_fn!();

    #[inline]
    pub fn inner(&self) -> &TypeParamInfo {
        &self.inner
    }

    #[inline]
    pub fn some(&self, value: Box<dyn Any>) -> Result<Box<dyn Any>, SchemaError> {
        (self.some)(value)
    }

    #[inline]
    pub fn none(&self) -> Box<dyn Any> {
        (self.none)()
    }

    /// Borrows the contained value, `Ok(None)` for `None`.
    #[inline]
    pub fn get<'a>(&self, option: &'a dyn Any) -> Result<Option<&'a dyn Any>, SchemaError> {
        (self.get)(option)
    }
}

impl_debug!(OptionalInfo);

// -----------------------------------------------------------------------------
// Boxed

/// Type information of `Box<T>`, the usual indirection of recursive records.
#[derive(Clone)]
pub struct BoxedInfo {
    ty: Type,
    generics: Generics,
    inner: TypeParamInfo,
    wrap: Construct<Box<dyn Any>>,
    get: fn(&dyn Any) -> Result<&dyn Any, SchemaError>,
}

fn box_wrap<T: Typed>(value: Box<dyn Any>) -> Result<Box<dyn Any>, SchemaError> {
    let inner: Box<T> = value.downcast::<T>().map_err(|_| SchemaError::ValueType {
        expected: T::type_path(),
    })?;
    Ok(Box::new(inner))
}

fn box_get<T: Typed>(value: &dyn Any) -> Result<&dyn Any, SchemaError> {
    let boxed: &Box<T> = downcast::<Box<T>>(value)?;
    Ok(&**boxed as &dyn Any)
}

impl BoxedInfo {
    pub fn new<T: Typed>() -> Self {
        Self {
            ty: Type::of::<Box<T>>(),
            generics: Generics::of::<T>("T"),
            inner: TypeParamInfo::new::<T>("T"),
            wrap: box_wrap::<T>,
            get: box_get::<T>,
        }
    }

    impl_common_fn!();

    #[inline]
    pub fn inner(&self) -> &TypeParamInfo {
        &self.inner
    }

    /// Moves an erased `T` into a `Box<T>`.
    #[inline]
    pub fn wrap(&self, value: Box<dyn Any>) -> Result<Box<dyn Any>, SchemaError> {
        (self.wrap)(value)
    }

    #[inline]
    pub fn get<'a>(&self, boxed: &'a dyn Any) -> Result<&'a dyn Any, SchemaError> {
        (self.get)(boxed)
    }
}

impl_debug!(BoxedInfo);
