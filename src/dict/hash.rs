//! Seeded hash functions for dict keys.
//!
//! The reference type descriptor supplies a hash function seeded process-wide
//! so that two processes (or two runs) never agree on bucket placement by
//! accident. We follow the donor codebase's own convention for this
//! (`patch::init`/`pact::init` seeding a module-level SipHash key from
//! `rand::thread_rng()` behind a `std::sync::Once`) rather than hashing with
//! an unseeded function.

use std::sync::OnceLock;

use siphasher::sip128::Hasher128;
use siphasher::sip128::SipHasher24;

static HASH_SEED: OnceLock<[u8; 16]> = OnceLock::new();

fn seed() -> &'static [u8; 16] {
    HASH_SEED.get_or_init(|| {
        let mut seed = [0u8; 16];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut seed);
        seed
    })
}

/// Sets the process-wide hash seed. Must be called before the first hash is
/// computed to take effect; later calls are ignored once the seed has been
/// established (matching the reference's "settable at startup" contract).
pub fn set_hash_function_seed(seed_bytes: [u8; 16]) {
    let _ = HASH_SEED.set(seed_bytes);
}

/// Supplies the `hashFunction(key) -> u64` callback of the reference type
/// descriptor. Implementations MUST be deterministic for a given process
/// seed and MUST NOT depend on any table state.
pub trait KeyHasher<K: ?Sized> {
    fn hash(&self, key: &K) -> u64;
}

/// Case-sensitive SipHash-2-4 over the key's byte representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseSensitiveHasher;

impl<K: AsRef<[u8]> + ?Sized> KeyHasher<K> for CaseSensitiveHasher {
    fn hash(&self, key: &K) -> u64 {
        let mut hasher = SipHasher24::new_with_key(seed());
        hasher.write(key.as_ref());
        hasher.finish128().h1
    }
}

/// Case-insensitive SipHash-2-4: the key's ASCII-lowercased bytes are hashed
/// instead of the raw bytes, so keys differing only in ASCII case collide to
/// the same bucket and compare equal under a caller-supplied
/// case-insensitive `Eq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitiveHasher;

impl<K: AsRef<[u8]> + ?Sized> KeyHasher<K> for CaseInsensitiveHasher {
    fn hash(&self, key: &K) -> u64 {
        let mut hasher = SipHasher24::new_with_key(seed());
        for byte in key.as_ref() {
            hasher.write_u8(byte.to_ascii_lowercase());
        }
        hasher.finish128().h1
    }
}

use std::hash::Hasher as _;
