#![doc = include_str!("../README.md")]

mod dict;

pub use dict::{
    disable_resize, enable_resize, set_hash_function_seed, AddRaw, CaseInsensitiveHasher,
    CaseSensitiveHasher, Dict, DictError, DictStats, KeyHasher, SafeIter, UnlinkedEntry,
    UnsafeIter,
};
