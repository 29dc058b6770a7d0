//! Unique object identifiers.
//!
//! Every object managed by the [`Runtime`](crate::Runtime) is addressed by a
//! [`Uid`]. Identifiers are minted by a [`UidAllocator`], increase
//! monotonically and are never handed out twice, so a stale `Uid` can only
//! ever fail a lookup; it can never alias a newer object.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for an object in the registry.
///
/// `Uid`s are plain values: copying one never extends the lifetime of the
/// object it names. After the object is destroyed, lookups with its `Uid`
/// report "not found" forever.
///
/// The raw value `0` is reserved as [`Uid::INVALID`] and is used wherever an
/// API needs to express "no object" (for example the creator of a top-level
/// object).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(u64);

impl Uid {
    /// The reserved "none" identifier.
    pub const INVALID: Uid = Uid(0);

    /// Returns `true` unless this is [`Uid::INVALID`].
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Convert the Uid to a raw u64 value.
    ///
    /// This is useful for interop with external systems that need a numeric ID.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Create a Uid from a raw u64 value.
    ///
    /// Note: This does not check if the Uid exists in any registry.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            write!(f, "#invalid")
        }
    }
}

/// Issues unique, monotonically increasing [`Uid`]s.
///
/// Each allocator owns an independent counter space. Two allocators may hand
/// out equal raw values, so `Uid`s from different allocators must never be
/// compared for meaning.
#[derive(Debug, Clone)]
pub struct UidAllocator {
    next: u64,
}

impl UidAllocator {
    /// Create an allocator whose first identifier is `#1`.
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Mint a fresh identifier.
    pub fn allocate(&mut self) -> Uid {
        let id = Uid(self.next);
        self.next += 1;
        id
    }

    /// The identifier the next call to [`allocate`](Self::allocate) will return.
    pub const fn peek(&self) -> Uid {
        Uid(self.next)
    }
}

impl Default for UidAllocator {
    fn default() -> Self {
        Self::new()
    }
}
