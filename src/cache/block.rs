use crate::address;

use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, Serialize)]
pub enum Status {
    #[default]
    INVALID = 0,
    VALID,
    /// Valid and dirty, only reachable in write-back caches.
    MODIFIED,
}

/// Metadata of a single cache way.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Line {
    pub tag: address,
    pub status: Status,
    /// LRU ordinal, 0 is the most recently used way of the set.
    pub recency: usize,
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Line")
            .field("tag", &format_args!("{:#x}", self.tag))
            .field("status", &self.status)
            .field("recency", &self.recency)
            .finish()
    }
}

impl Line {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole line with a freshly filled block.
    #[inline]
    pub fn allocate(&mut self, tag: address, modified: bool) {
        *self = Self {
            tag,
            status: if modified {
                Status::MODIFIED
            } else {
                Status::VALID
            },
            recency: 0,
        };
    }

    #[inline]
    pub fn set_modified(&mut self) {
        debug_assert!(self.is_valid(), "only valid lines can be modified");
        self.status = Status::MODIFIED;
    }

    #[inline]
    pub fn invalidate(&mut self) {
        self.status = Status::INVALID;
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self.status, Status::VALID | Status::MODIFIED)
    }

    #[inline]
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.status == Status::MODIFIED
    }

    #[inline]
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.status == Status::INVALID
    }
}
