//! Static type introspection for the `vc_wizard` conversion engine.
//!
//! A type describes itself through [`Typed`], which returns a process-wide
//! [`TypeInfo`]. Besides names and nested types, every `TypeInfo` carries
//! monomorphized function pointers that build and inspect values of the type
//! behind `Box<dyn Any>` / `&dyn Any`, so a converter compiled at run time can
//! produce real Rust values without knowing the type statically.
//!
//! Records opt in with [`#[derive(Schema)]`](derive::Schema):
//!
//! ```
//! use vc_schema::{derive::Schema, Typed};
//!
//! #[derive(Schema)]
//! struct Point {
//!     x: i32,
//!     #[schema(rename = "yPos")]
//!     y: i32,
//! }
//!
//! let info = Point::type_info().as_record().unwrap();
//! assert_eq!(info.field_len(), 2);
//! assert_eq!(info.field_at(1).unwrap().key(), "yPos");
//! ```

// Allows the derive output (which names `::vc_schema`) inside this crate's own tests.
extern crate self as vc_schema;

// -----------------------------------------------------------------------------
// Modules

mod cell;
mod container_info;
mod dynamic_info;
mod error;
mod generics;
mod record;
mod record_info;
mod scalar_info;
mod type_info;
mod type_path;
mod typed;
mod union;
mod union_info;

pub mod impls;

// -----------------------------------------------------------------------------
// Exports

pub use cell::{GenericTypeInfoCell, GenericTypePathCell, NonGenericTypeInfoCell, concat};
pub use container_info::{BoxedInfo, ListInfo, MapInfo, OptionalInfo, TupleInfo};
pub use dynamic_info::DynamicInfo;
pub use error::SchemaError;
pub use generics::{Generics, TypeParamInfo};
pub use record::{FieldValues, Record};
pub use record_info::{NamedField, RecordInfo};
pub use scalar_info::{OpaqueInfo, Scalar, ScalarInfo, ScalarKind, ScalarValue};
pub use type_info::{TypeInfo, TypeKind, TypeKindError};
pub use type_path::{Type, TypePath};
pub use typed::Typed;
pub use union::{Union, VariantValue};
pub use union_info::{UnionInfo, UnionVariant};

pub use vc_schema_derive as derive;
