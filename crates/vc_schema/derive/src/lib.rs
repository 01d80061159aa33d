//! Derive macro for `vc_schema`.
//!
//! See [`Schema`].
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

static SCHEMA_ATTRIBUTE_NAME: &str = "schema";

// -----------------------------------------------------------------------------
// Modules

mod attributes;
mod derive_data;
mod impls;
mod path;

// -----------------------------------------------------------------------------
// Macros

/// # Schema Derivation
///
/// `#[derive(Schema)]` implements `TypePath`, `Typed` and `Record` for a
/// struct with named fields, or `TypePath`, `Typed` and `Union` for an enum
/// of newtype variants, so the `vc_wizard` engine can compile loaders and
/// dumpers for it.
///
/// ```rust, ignore
/// #[derive(Schema)]
/// struct Node {
///     value: i32,
///     next: Option<Box<Node>>,
/// }
/// ```
///
/// ## Type Attributes
///
/// `#[schema(type_path = "my_crate::foo::Node")]` overrides the module path
/// collected by `module_path!()`. Generics are appended automatically.
///
/// `#[schema(positional)]` serializes a struct as a sequence of its field
/// values instead of a mapping. Trailing fields with a default may be left
/// out of the input.
///
/// ## Enums
///
/// Every variant wraps exactly one value. The serialized form is the form
/// of the active variant's value, with no tag; loading tries the variants
/// in declaration order and keeps the first that converts.
///
/// ```rust, ignore
/// #[derive(Schema)]
/// enum Occupation {
///     Title(String),
///     Roles(Vec<String>),
/// }
/// ```
///
/// ## Field Attributes
///
/// - `#[schema(rename = "key")]`: serialized key of the field.
/// - `#[schema(default)]`: use `Default::default()` when the key is absent.
/// - `#[schema(default = "path::to::func")]`: call `func()` when the key is absent.
///
/// ## Generics
///
/// Every type parameter gets a `Typed` bound. Fields declared directly with
/// a type parameter (`first: A`) are marked so the engine compiles them per
/// instantiation.
///
/// Lifetime and const parameters are not supported.
#[proc_macro_derive(Schema, attributes(schema))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match derive_data::SchemaStruct::from_input(&ast) {
        Ok(data) => impls::impl_schema(&data).into(),
        Err(err) => err.into_compile_error().into(),
    }
}
