//! # Sync Tags
//!
//! Per-field counters that let a receiver tell a fresh unreliable update
//! from a stale, duplicated or reordered one.
//!
//! ```text
//! sent:      [0] [1] [2] [3] [4]
//! received:  [0] [2] [1] [4] [3]
//! applied:   [0] [2]  x  [4]  x     (x = not newer, discarded)
//! ```
//!
//! Tags are `i32` and are never expected to wrap within one session; the
//! counter wraps silently if it ever does and ordering breaks from then on.

use bytemuck::{Pod, Zeroable};

/// Monotonic per-field sequence number.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct SyncTag(pub i32);

impl SyncTag {
    /// Returns true if `self` was allocated after `other`.
    #[inline]
    #[must_use]
    pub const fn is_newer_than(self, other: Self) -> bool {
        self.0 > other.0
    }
}

/// Hands out strictly increasing tags for one replicated field.
#[derive(Clone, Debug, Default)]
pub struct SyncTagAllocator {
    next: i32,
}

impl SyncTagAllocator {
    /// Creates an allocator whose first tag is 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Returns the next tag.
    pub fn allocate(&mut self) -> SyncTag {
        let tag = SyncTag(self.next);
        self.next = self.next.wrapping_add(1);
        tag
    }

    /// Tag the next call to [`Self::allocate`] will return.
    #[must_use]
    pub const fn peek(&self) -> SyncTag {
        SyncTag(self.next)
    }
}

/// Receiver-side record of the newest tag applied for one field.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncTagGate {
    last_applied: Option<SyncTag>,
}

impl SyncTagGate {
    /// Creates a gate that accepts any first tag.
    #[must_use]
    pub const fn new() -> Self {
        Self { last_applied: None }
    }

    /// Accepts `tag` if it is newer than everything applied so far.
    ///
    /// Returns false (and changes nothing) for stale or duplicate tags.
    pub fn admit(&mut self, tag: SyncTag) -> bool {
        match self.last_applied {
            Some(last) if !tag.is_newer_than(last) => false,
            _ => {
                self.last_applied = Some(tag);
                true
            }
        }
    }

    /// Newest tag applied, if any.
    #[must_use]
    pub const fn last_applied(&self) -> Option<SyncTag> {
        self.last_applied
    }
}
