//! Implementations of [`TypePath`](crate::TypePath) and [`Typed`](crate::Typed)
//! for primitives, strings, tuples, the standard containers and
//! `serde_json::Value`.

mod container;
mod dynamic;
mod scalar;
mod tuple;
