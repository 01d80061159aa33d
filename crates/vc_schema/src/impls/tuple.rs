use core::any::Any;

use crate::container_info::TupleValue;
use crate::{FieldValues, Generics, SchemaError, TupleInfo, TypeInfo, TypeParamInfo};
use crate::{GenericTypeInfoCell, GenericTypePathCell, TypePath, Typed};

fn tuple_path(parts: &[&str]) -> String {
    match parts {
        [single] => crate::concat(&["(", single, ",)"]),
        _ => crate::concat(&["(", &parts.join(", "), ")"]),
    }
}

macro_rules! impl_tuple {
    ($($index:tt : $ty:ident),+) => {
        impl<$($ty: TypePath),+> TypePath for ($($ty,)+) {
            fn type_path() -> &'static str {
                static CELL: GenericTypePathCell = GenericTypePathCell::new();
                CELL.get_or_insert::<Self>(|| tuple_path(&[$($ty::type_path()),+]))
            }

            fn type_name() -> &'static str {
                static CELL: GenericTypePathCell = GenericTypePathCell::new();
                CELL.get_or_insert::<Self>(|| tuple_path(&[$($ty::type_name()),+]))
            }

            fn type_ident() -> &'static str {
                static CELL: GenericTypePathCell = GenericTypePathCell::new();
                CELL.get_or_insert::<Self>(|| tuple_path(&[$($ty::type_ident()),+]))
            }
        }

        impl<$($ty: Typed),+> Typed for ($($ty,)+) {
            fn type_info() -> &'static TypeInfo {
                static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
                CELL.get_or_insert::<Self>(|| TypeInfo::Tuple(TupleInfo::new::<Self>()))
            }
        }

        impl<$($ty: Typed),+> TupleValue for ($($ty,)+) {
            fn generics() -> Generics {
                Generics::from_params(&[$(TypeParamInfo::new::<$ty>(stringify!($ty))),+])
            }

            fn from_elements(elements: Vec<Box<dyn Any>>) -> Result<Self, SchemaError> {
                let mut values = FieldValues::new(Self::type_name(), elements);
                let tuple = ($(values.take::<$ty>()?,)+);
                values.finish()?;
                Ok(tuple)
            }

            fn element_ref(&self, index: usize) -> Option<&dyn Any> {
                match index {
                    $($index => Some(&self.$index as &dyn Any),)+
                    _ => None,
                }
            }
        }
    };
}

impl_tuple!(0: P0);
impl_tuple!(0: P0, 1: P1);
impl_tuple!(0: P0, 1: P1, 2: P2);
impl_tuple!(0: P0, 1: P1, 2: P2, 3: P3);
impl_tuple!(0: P0, 1: P1, 2: P2, 3: P3, 4: P4);
impl_tuple!(0: P0, 1: P1, 2: P2, 3: P3, 4: P4, 5: P5);

#[cfg(test)]
mod tests {
    use core::any::Any;

    use crate::{SchemaError, TypePath, Typed};

    fn boxed<T: Any>(value: T) -> Box<dyn Any> {
        Box::new(value)
    }

    #[test]
    fn tuple_names() {
        assert_eq!(<(i32,)>::type_name(), "(i32,)");
        assert_eq!(<(i32, String)>::type_name(), "(i32, String)");
    }

    #[test]
    fn tuple_construct_checks_arity() {
        let info = <(i32, bool)>::type_info().as_tuple().unwrap();
        assert_eq!(info.element_len(), 2);

        let values = vec![boxed(1_i32), boxed(true)];
        let tuple = info.construct(values).unwrap();
        assert_eq!(tuple.downcast_ref::<(i32, bool)>(), Some(&(1, true)));
        assert_eq!(
            info.get_element(&*tuple, 1).unwrap().unwrap().downcast_ref::<bool>(),
            Some(&true)
        );

        let short = vec![boxed(1_i32)];
        assert!(matches!(
            info.construct(short),
            Err(SchemaError::MissingValue { index: 1, .. })
        ));
    }
}
