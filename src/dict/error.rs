//! Error types surfaced by [`Dict`](super::Dict)'s public operations.
//!
//! Mirrors the donor codebase's manual `enum` + hand-written `Display` +
//! `std::error::Error` style (see `repo/pile.rs`'s `OpenError`/`InsertError`)
//! rather than reaching for a derive-macro error crate the donor itself does
//! not use for this kind of small, local error.

use std::collections::TryReserveError;
use std::fmt;

/// Errors returned by [`Dict::add`](super::Dict::add),
/// [`Dict::find`](super::Dict::find), [`Dict::delete`](super::Dict::delete)
/// and friends.
#[derive(Debug)]
pub enum DictError {
    /// `add` was called with a key that is already present.
    KeyExists,
    /// `find`/`delete`/`unlink` was called with a key that is not present.
    NotFound,
    /// `try_expand` could not allocate the new bucket array.
    AllocationFailure(TryReserveError),
    /// `expand`/`resize` was called with an argument that violates the
    /// contract (smaller than `used`, or requested while already rehashing).
    InvalidArgument(&'static str),
}

impl fmt::Display for DictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictError::KeyExists => write!(f, "key already exists"),
            DictError::NotFound => write!(f, "key not found"),
            DictError::AllocationFailure(err) => write!(f, "allocation failure: {}", err),
            DictError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for DictError {}

impl From<TryReserveError> for DictError {
    fn from(err: TryReserveError) -> Self {
        DictError::AllocationFailure(err)
    }
}
