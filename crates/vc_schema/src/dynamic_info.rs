use core::any::Any;
use core::fmt;

use serde_json::Value;

use crate::error::downcast;
use crate::{SchemaError, Type, Typed};

/// Type information of a type that keeps its part of the tree unconverted.
///
/// Loading clones the tree into the value and dumping clones it back out.
/// Nothing is compiled for the contents.
#[derive(Clone)]
pub struct DynamicInfo {
    ty: Type,
    from_tree: fn(&Value) -> Box<dyn Any>,
    to_tree: fn(&dyn Any) -> Result<Value, SchemaError>,
}

fn tree_from<T: Typed + From<Value>>(tree: &Value) -> Box<dyn Any> {
    Box::new(T::from(tree.clone()))
}

fn tree_to<T: Typed + Clone + Into<Value>>(value: &dyn Any) -> Result<Value, SchemaError> {
    Ok(downcast::<T>(value)?.clone().into())
}

impl DynamicInfo {
    pub fn new<T: Typed + Clone + From<Value> + Into<Value>>() -> Self {
        Self {
            ty: Type::of::<T>(),
            from_tree: tree_from::<T>,
            to_tree: tree_to::<T>,
        }
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn from_tree(&self, tree: &Value) -> Box<dyn Any> {
        (self.from_tree)(tree)
    }

    #[inline]
    pub fn to_tree(&self, value: &dyn Any) -> Result<Value, SchemaError> {
        (self.to_tree)(value)
    }
}

impl fmt::Debug for DynamicInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicInfo").field("ty", &self.ty).finish()
    }
}
