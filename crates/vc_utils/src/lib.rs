//! Shared containers for the `vc_wizard` crates.
//!
//! - [`hash`]: hash maps and sets built on *hashbrown* with fixed, seed-stable hashing.
//! - [`TypeIdMap`]: a map keyed by [`TypeId`](core::any::TypeId), used for per-type caches.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// Modules

mod typeid_map;

pub mod hash;

// -----------------------------------------------------------------------------
// Top-level exports

pub use typeid_map::TypeIdMap;
