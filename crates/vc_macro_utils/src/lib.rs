//! Provide some tools for proc-macro crates.
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro crate")]

// -----------------------------------------------------------------------------
// Modules

mod manifest;

pub mod full_path;

// -----------------------------------------------------------------------------
// Exports

pub use manifest::Manifest;
