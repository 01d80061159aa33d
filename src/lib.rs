//! Converters between Rust records and JSON trees, compiled at run time.
//!
//! A type opts in with [`#[derive(Schema)]`](schema::derive::Schema). The
//! first conversion of a root type compiles one loader or dumper for its
//! whole field graph, recursive records included, and caches it in the
//! [`Codec`] for the rest of the process.
//!
//! ```
//! use vc_wizard::schema::derive::Schema;
//!
//! #[derive(Schema, Debug, PartialEq)]
//! struct Node {
//!     value: i64,
//!     next: Option<Box<Node>>,
//! }
//!
//! let node: Node = vc_wizard::from_json(r#"{"value": 1, "next": {"value": 2}}"#).unwrap();
//! assert_eq!(node.next.as_ref().map(|next| next.value), Some(2));
//!
//! let text = vc_wizard::to_json(&node).unwrap();
//! assert_eq!(text, r#"{"value":1,"next":{"value":2,"next":null}}"#);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

mod codec;
mod error;

pub use codec::{Codec, dump, from_json, load, to_json};
pub use error::Error;

pub use vc_codegen as codegen;
pub use vc_schema as schema;
pub use vc_utils as utils;

pub use vc_codegen::{Hooks, Options};
