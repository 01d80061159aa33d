use core::hash::Hash;
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::{BoxedInfo, ListInfo, MapInfo, OptionalInfo, TypeInfo};
use crate::{GenericTypeInfoCell, GenericTypePathCell, TypePath, Typed, concat};

macro_rules! impl_unary_type_path {
    ($ty:ident, $module:literal) => {
        impl<T: TypePath> TypePath for $ty<T> {
            fn type_path() -> &'static str {
                static CELL: GenericTypePathCell = GenericTypePathCell::new();
                CELL.get_or_insert::<Self>(|| {
                    concat(&[$module, "::", stringify!($ty), "<", T::type_path(), ">"])
                })
            }

            fn type_name() -> &'static str {
                static CELL: GenericTypePathCell = GenericTypePathCell::new();
                CELL.get_or_insert::<Self>(|| {
                    concat(&[stringify!($ty), "<", T::type_name(), ">"])
                })
            }

            #[inline]
            fn type_ident() -> &'static str {
                stringify!($ty)
            }

            #[inline]
            fn module_path() -> Option<&'static str> {
                Some($module)
            }
        }
    };
}

macro_rules! impl_binary_type_path {
    ($ty:ident, $module:literal) => {
        impl<K: TypePath, V: TypePath> TypePath for $ty<K, V> {
            fn type_path() -> &'static str {
                static CELL: GenericTypePathCell = GenericTypePathCell::new();
                CELL.get_or_insert::<Self>(|| {
                    concat(&[
                        $module,
                        "::",
                        stringify!($ty),
                        "<",
                        K::type_path(),
                        ", ",
                        V::type_path(),
                        ">",
                    ])
                })
            }

            fn type_name() -> &'static str {
                static CELL: GenericTypePathCell = GenericTypePathCell::new();
                CELL.get_or_insert::<Self>(|| {
                    concat(&[stringify!($ty), "<", K::type_name(), ", ", V::type_name(), ">"])
                })
            }

            #[inline]
            fn type_ident() -> &'static str {
                stringify!($ty)
            }

            #[inline]
            fn module_path() -> Option<&'static str> {
                Some($module)
            }
        }
    };
}

impl_unary_type_path!(Option, "core::option");
impl_unary_type_path!(Box, "alloc::boxed");
impl_unary_type_path!(Vec, "alloc::vec");
impl_unary_type_path!(VecDeque, "alloc::collections::vec_deque");
impl_binary_type_path!(HashMap, "std::collections::hash_map");
impl_binary_type_path!(BTreeMap, "alloc::collections::btree_map");

impl<T: Typed> Typed for Option<T> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| TypeInfo::Optional(OptionalInfo::new::<T>()))
    }
}

impl<T: Typed> Typed for Box<T> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| TypeInfo::Boxed(BoxedInfo::new::<T>()))
    }
}

impl<T: Typed> Typed for Vec<T> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| TypeInfo::List(ListInfo::new::<Self, T>()))
    }
}

impl<T: Typed> Typed for VecDeque<T> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| TypeInfo::List(ListInfo::new::<Self, T>()))
    }
}

impl<K: Typed + Eq + Hash, V: Typed> Typed for HashMap<K, V> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| TypeInfo::Map(MapInfo::new::<Self, K, V>()))
    }
}

impl<K: Typed + Ord, V: Typed> Typed for BTreeMap<K, V> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeInfo::Map(MapInfo::new::<Self, K, V>().with_ordered_entries())
        })
    }
}

#[cfg(test)]
mod tests {
    use core::any::Any;
    use std::collections::{BTreeMap, HashMap};

    use crate::{TypePath, Typed};

    fn boxed<T: Any>(value: T) -> Box<dyn Any> {
        Box::new(value)
    }

    #[test]
    fn container_paths() {
        assert_eq!(<Option<Vec<u8>>>::type_path(), "core::option::Option<alloc::vec::Vec<u8>>");
        assert_eq!(<Option<Vec<u8>>>::type_name(), "Option<Vec<u8>>");
        assert_eq!(<BTreeMap<String, i32>>::type_name(), "BTreeMap<String, i32>");
    }

    #[test]
    fn list_builds_and_iterates() {
        let info = <Vec<i32>>::type_info().as_list().unwrap();
        let items = vec![boxed(1_i32), boxed(2_i32)];
        let list = info.from_items(items).unwrap();
        assert_eq!(list.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2]));

        let borrowed = info.items(&*list).unwrap();
        assert_eq!(borrowed[1].downcast_ref::<i32>(), Some(&2));

        let wrong = vec![boxed("x")];
        assert!(info.from_items(wrong).is_err());
    }

    #[test]
    fn optional_and_boxed() {
        let option = <Option<u8>>::type_info().as_optional().unwrap();
        let some = option.some(Box::new(7_u8)).unwrap();
        assert_eq!(option.get(&*some).unwrap().unwrap().downcast_ref::<u8>(), Some(&7));
        assert!(option.get(&*option.none()).unwrap().is_none());

        let boxed = <Box<u8>>::type_info().as_boxed().unwrap();
        let value = boxed.wrap(Box::new(3_u8)).unwrap();
        assert_eq!(value.downcast_ref::<Box<u8>>().map(|b| **b), Some(3));
        assert_eq!(boxed.get(&*value).unwrap().downcast_ref::<u8>(), Some(&3));
    }

    #[test]
    fn map_entries() {
        let info = <BTreeMap<String, i32>>::type_info().as_map().unwrap();
        let entries = vec![(boxed(String::from("a")), boxed(1_i32))];
        let map = info.from_entries(entries).unwrap();
        let pairs = info.entries(&*map).unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(info.is_ordered());
        assert!(!<HashMap<String, i32>>::type_info().as_map().unwrap().is_ordered());
        assert_eq!(pairs[0].0.downcast_ref::<String>().map(String::as_str), Some("a"));
    }
}
