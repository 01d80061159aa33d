//! Compiles converters between records and JSON trees, once per type.
//!
//! Given the [`TypeInfo`](vc_schema::TypeInfo) of a root type, the compiler
//! walks its field graph and emits one procedure per record or tuple type it
//! meets, in an intermediate form with a readable listing. The procedures are
//! then materialized into closure chains that call each other by index.
//!
//! - [`ProcedureBuilder`]: accumulates, merges and materializes procedures.
//! - [`BuildContext`]: the state of one top-level compilation.
//! - [`RecursionGuard`]: targets already reserved, so cycles terminate.
//! - [`RecursiveSafe`]: wraps a field compiler into a call-returning one.
//! - [`TypeDescriptor`]: what a field compiler is asked to convert.
//!
//! ```
//! use serde_json::json;
//! use vc_codegen::{Hooks, Options, compile_dump, compile_load};
//! use vc_schema::Typed;
//!
//! let info = <Option<(u8, String)> as Typed>::type_info();
//! let loader = compile_load(info, Options::new(), &Hooks::new()).unwrap();
//! let value = loader.load_as::<Option<(u8, String)>>(&json!([7, "seven"])).unwrap();
//! assert_eq!(value, Some((7, "seven".to_owned())));
//!
//! let dumper = compile_dump(info, Options::new(), &Hooks::new()).unwrap();
//! assert_eq!(dumper.dump(&value).unwrap(), json!([7, "seven"]));
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

mod builder;
mod cache;
mod compile;
mod context;
mod descriptor;
mod error;
mod guard;
mod hooks;
mod ir;
mod materialize;
mod options;
mod wrapper;

pub mod leaf;

// -----------------------------------------------------------------------------
// Top-level exports

pub use builder::{ProcedureBuilder, ProcedureDef, ProcedureScope};
pub use cache::CompiledCell;
pub use compile::{compile_dump, compile_load, compile_procedures};
pub use context::BuildContext;
pub use descriptor::TypeDescriptor;
pub use error::{CodegenError, ConversionError, ConversionErrorKind, FieldPath, PathSegment};
pub use guard::{GuardKey, RecursionGuard};
pub use hooks::{DumpHook, Hooks, LoadHook};
pub use ir::{Binding, CallExpr, Direction, Expr, Locals, Operand, Sentinel, Signature, Stmt};
pub use materialize::{CompiledUnit, DumpCallable, Dumper, LoadCallable, Loader};
pub use options::Options;
pub use wrapper::{
    ClassContextCompiler, FieldCompiler, GuardMode, PlainCompiler, RecursiveSafe,
    RecursiveSafeBuilder, WrapperSet,
};
