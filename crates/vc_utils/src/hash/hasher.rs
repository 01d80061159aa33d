//! Hash states with no per-process randomness.
//!
//! Generated procedure names must not depend on the run, so every container
//! of this crate hashes with one of these two states.

use core::hash::{BuildHasher, Hasher};

use foldhash::fast::{FixedState, FoldHasher};

// -----------------------------------------------------------------------------
// FixedHashState

const SEED: u64 = 0x5BD1_E995_5BD1_E995;

/// `foldhash` hasher seeded with a constant.
pub type FixedHasher = FoldHasher<'static>;

/// General purpose hash state whose results only depend on the input.
///
/// ```
/// use core::hash::BuildHasher;
/// use vc_utils::hash::FixedHashState;
///
/// assert_eq!(FixedHashState.hash_one("load_Node"), FixedHashState.hash_one("load_Node"));
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct FixedHashState;

impl BuildHasher for FixedHashState {
    type Hasher = FixedHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        const STATE: FixedState = FixedState::with_seed(SEED);
        STATE.build_hasher()
    }
}

// -----------------------------------------------------------------------------
// TypeIdHashState

/// Hasher for keys that are hashes already.
///
/// A [`TypeId`](core::any::TypeId) feeds a single `u64`, which becomes the
/// hash as is. Any other input is folded byte by byte.
#[derive(Copy, Clone, Default, Debug)]
pub struct TypeIdHasher(u64);

impl Hasher for TypeIdHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0 = bytes
            .iter()
            .fold(self.0, |hash, byte| hash.rotate_left(8) ^ u64::from(*byte));
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }
}

/// Hash state of [`TypeIdMap`](crate::TypeIdMap).
///
/// ```
/// use core::hash::BuildHasher;
/// use vc_utils::hash::TypeIdHashState;
///
/// assert_eq!(TypeIdHashState.hash_one(7_u64), 7);
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct TypeIdHashState;

impl BuildHasher for TypeIdHashState {
    type Hasher = TypeIdHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        TypeIdHasher(0)
    }
}

#[cfg(test)]
mod tests {
    use core::any::TypeId;
    use core::hash::BuildHasher;

    use super::{FixedHashState, TypeIdHashState};

    #[test]
    fn type_ids_hash_apart() {
        let a = TypeIdHashState.hash_one(TypeId::of::<u8>());
        let b = TypeIdHashState.hash_one(TypeId::of::<u16>());
        assert_ne!(a, b);
    }

    #[test]
    fn fixed_state_is_stable() {
        let a = FixedHashState.hash_one(("Pair", 2_usize));
        let b = FixedHashState.hash_one(("Pair", 2_usize));
        assert_eq!(a, b);
    }
}
