use crate::{NonGenericTypeInfoCell, ScalarInfo, TypeInfo, TypePath, Typed};
use crate::{Scalar, ScalarKind, ScalarValue, SchemaError};

fn out_of_range<T: TypePath>(value: impl ToString) -> SchemaError {
    SchemaError::OutOfRange {
        ty: T::type_path(),
        value: value.to_string(),
    }
}

fn wrong_kind<T: TypePath>(scalar: &Scalar) -> SchemaError {
    SchemaError::ScalarKind {
        ty: T::type_path(),
        received: scalar.kind().as_str(),
    }
}

macro_rules! impl_scalar_type {
    ($ty:ty, $path:expr, $name:expr, $module:expr) => {
        impl TypePath for $ty {
            #[inline]
            fn type_path() -> &'static str {
                $path
            }
            #[inline]
            fn type_name() -> &'static str {
                $name
            }
            #[inline]
            fn type_ident() -> &'static str {
                $name
            }
            #[inline]
            fn module_path() -> Option<&'static str> {
                $module
            }
        }

        impl Typed for $ty {
            fn type_info() -> &'static TypeInfo {
                static CELL: NonGenericTypeInfoCell = NonGenericTypeInfoCell::new();
                CELL.get_or_init(|| TypeInfo::Scalar(ScalarInfo::new::<Self>()))
            }
        }
    };
    ($ty:ident) => {
        impl_scalar_type!($ty, stringify!($ty), stringify!($ty), None);
    };
}

macro_rules! impl_signed {
    ($($ty:ident),*) => {$(
        impl_scalar_type!($ty);

        impl ScalarValue for $ty {
            const KIND: ScalarKind = ScalarKind::Int;

            fn from_scalar(scalar: Scalar) -> Result<Self, SchemaError> {
                match scalar {
                    Scalar::Int(v) => <$ty>::try_from(v).map_err(|_| out_of_range::<Self>(v)),
                    Scalar::UInt(v) => <$ty>::try_from(v).map_err(|_| out_of_range::<Self>(v)),
                    other => Err(wrong_kind::<Self>(&other)),
                }
            }

            #[inline]
            fn to_scalar(&self) -> Scalar {
                Scalar::Int(*self as i64)
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($ty:ident),*) => {$(
        impl_scalar_type!($ty);

        impl ScalarValue for $ty {
            const KIND: ScalarKind = ScalarKind::UInt;

            fn from_scalar(scalar: Scalar) -> Result<Self, SchemaError> {
                match scalar {
                    Scalar::Int(v) => <$ty>::try_from(v).map_err(|_| out_of_range::<Self>(v)),
                    Scalar::UInt(v) => <$ty>::try_from(v).map_err(|_| out_of_range::<Self>(v)),
                    other => Err(wrong_kind::<Self>(&other)),
                }
            }

            #[inline]
            fn to_scalar(&self) -> Scalar {
                Scalar::UInt(*self as u64)
            }
        }
    )*};
}

macro_rules! impl_float {
    ($($ty:ident),*) => {$(
        impl_scalar_type!($ty);

        impl ScalarValue for $ty {
            const KIND: ScalarKind = ScalarKind::Float;

            fn from_scalar(scalar: Scalar) -> Result<Self, SchemaError> {
                let wide = match scalar {
                    Scalar::Float(v) => v,
                    Scalar::Int(v) => v as f64,
                    Scalar::UInt(v) => v as f64,
                    other => return Err(wrong_kind::<Self>(&other)),
                };
                let narrow = wide as $ty;
                // A finite value only turns infinite when it overflows the type.
                if wide.is_finite() && !narrow.is_finite() {
                    return Err(out_of_range::<Self>(wide));
                }
                Ok(narrow)
            }

            #[inline]
            fn to_scalar(&self) -> Scalar {
                Scalar::Float(f64::from(*self))
            }
        }
    )*};
}

impl_signed!(i8, i16, i32, i64, isize);
impl_unsigned!(u8, u16, u32, u64, usize);
impl_float!(f32, f64);

impl_scalar_type!(bool);

impl ScalarValue for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn from_scalar(scalar: Scalar) -> Result<Self, SchemaError> {
        match scalar {
            Scalar::Bool(v) => Ok(v),
            other => Err(wrong_kind::<Self>(&other)),
        }
    }

    #[inline]
    fn to_scalar(&self) -> Scalar {
        Scalar::Bool(*self)
    }
}

impl_scalar_type!(char);

impl ScalarValue for char {
    const KIND: ScalarKind = ScalarKind::Char;

    fn from_scalar(scalar: Scalar) -> Result<Self, SchemaError> {
        match scalar {
            Scalar::Char(v) => Ok(v),
            Scalar::Str(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(out_of_range::<Self>(format!("{s:?}"))),
                }
            }
            other => Err(wrong_kind::<Self>(&other)),
        }
    }

    #[inline]
    fn to_scalar(&self) -> Scalar {
        Scalar::Char(*self)
    }
}

impl_scalar_type!(
    String,
    "alloc::string::String",
    "String",
    Some("alloc::string")
);

impl ScalarValue for String {
    const KIND: ScalarKind = ScalarKind::Str;

    fn from_scalar(scalar: Scalar) -> Result<Self, SchemaError> {
        match scalar {
            Scalar::Str(v) => Ok(v),
            Scalar::Char(c) => Ok(c.to_string()),
            other => Err(wrong_kind::<Self>(&other)),
        }
    }

    #[inline]
    fn to_scalar(&self) -> Scalar {
        Scalar::Str(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Scalar, ScalarKind, SchemaError, Typed};

    #[test]
    fn integer_range_is_checked() {
        let info = u8::type_info().as_scalar().unwrap();
        assert_eq!(info.kind(), ScalarKind::UInt);

        let value = info.from_scalar(Scalar::Int(200)).unwrap();
        assert_eq!(value.downcast_ref::<u8>(), Some(&200));

        let err = info.from_scalar(Scalar::Int(-1)).unwrap_err();
        assert!(matches!(err, SchemaError::OutOfRange { ty: "u8", .. }));
    }

    #[test]
    fn float_overflow_is_rejected() {
        let info = f32::type_info().as_scalar().unwrap();
        let err = info.from_scalar(Scalar::Float(1e300)).unwrap_err();
        assert!(matches!(err, SchemaError::OutOfRange { ty: "f32", .. }));

        let value = info.from_scalar(Scalar::Float(0.5)).unwrap();
        assert_eq!(value.downcast_ref::<f32>(), Some(&0.5));
        let value = info.from_scalar(Scalar::Int(-3)).unwrap();
        assert_eq!(value.downcast_ref::<f32>(), Some(&-3.0));

        let info = f64::type_info().as_scalar().unwrap();
        let value = info.from_scalar(Scalar::Float(1e300)).unwrap();
        assert_eq!(value.downcast_ref::<f64>(), Some(&1e300));
    }

    #[test]
    fn string_round_trips_through_scalar() {
        let info = String::type_info().as_scalar().unwrap();
        let value = info.from_scalar(Scalar::Str("hi".into())).unwrap();
        assert_eq!(info.to_scalar(&*value).unwrap(), Scalar::Str("hi".into()));

        let err = info.from_scalar(Scalar::Bool(true)).unwrap_err();
        assert!(matches!(err, SchemaError::ScalarKind { received: "bool", .. }));
    }

    #[test]
    fn char_accepts_single_character_strings() {
        let info = char::type_info().as_scalar().unwrap();
        let value = info.from_scalar(Scalar::Str("x".into())).unwrap();
        assert_eq!(value.downcast_ref::<char>(), Some(&'x'));
        assert!(info.from_scalar(Scalar::Str("xy".into())).is_err());
    }
}
