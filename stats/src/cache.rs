use super::mem::AccessKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::IntoEnumIterator;

#[derive(
    Debug,
    strum::EnumIter,
    strum::Display,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum RequestStatus {
    HIT = 0,
    MISS,
}

pub type CacheCsvRow = ((AccessKind, RequestStatus), u64);

/// Cumulative access counters of a single cache level.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Cache {
    pub accesses: HashMap<(AccessKind, RequestStatus), u64>,
}

impl Cache {
    pub fn flatten(self) -> Vec<CacheCsvRow> {
        let mut flattened: Vec<_> = self.accesses.into_iter().collect();
        flattened.sort_by_key(|(access, _)| *access);
        flattened
    }
}

impl std::ops::AddAssign for Cache {
    fn add_assign(&mut self, other: Self) {
        for (k, v) in other.accesses {
            *self.accesses.entry(k).or_insert(0) += v;
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        let mut accesses = HashMap::new();
        for access_kind in AccessKind::iter() {
            for status in RequestStatus::iter() {
                accesses.insert((access_kind, status), 0);
            }
        }
        Self { accesses }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut accesses: Vec<_> = self
            .accesses
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|((access_kind, status), count)| (format!("{access_kind:?}[{status:?}]"), count))
            .collect();
        accesses.sort_by_key(|(key, _)| key.clone());

        let mut out = f.debug_struct("CacheStats");
        for (key, count) in accesses {
            out.field(&key, count);
        }
        out.finish_non_exhaustive()
    }
}

impl Cache {
    #[inline]
    pub fn inc(&mut self, kind: impl Into<AccessKind>, status: RequestStatus, count: u64) {
        *self.accesses.entry((kind.into(), status)).or_insert(0) += count;
    }

    #[must_use]
    pub fn count(&self, kind: AccessKind, status: RequestStatus) -> u64 {
        self.accesses.get(&(kind, status)).copied().unwrap_or(0)
    }

    /// Number of accesses of the given kind, hits and misses.
    #[must_use]
    pub fn accesses_of(&self, kind: AccessKind) -> u64 {
        RequestStatus::iter()
            .map(|status| self.count(kind, status))
            .sum()
    }

    #[must_use]
    pub fn total_accesses(&self) -> u64 {
        self.accesses.values().sum()
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.total(RequestStatus::HIT)
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.total(RequestStatus::MISS)
    }

    fn total(&self, status: RequestStatus) -> u64 {
        self.accesses
            .iter()
            .filter(|((_, s), _)| *s == status)
            .map(|(_, count)| count)
            .sum()
    }

    /// Fraction of accesses that hit.
    ///
    /// `None` if the level was never accessed.
    #[must_use]
    pub fn hit_rate(&self) -> Option<f64> {
        super::ratio(self.hits(), self.total_accesses())
    }

    #[must_use]
    pub fn miss_rate(&self) -> Option<f64> {
        super::ratio(self.misses(), self.total_accesses())
    }
}
