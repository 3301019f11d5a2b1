use crate::config;

use serde::{Deserialize, Serialize};

/// Width of an address in bits.
pub const ADDRESS_BITS: u32 = 32;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{what} must be a power of two (got {value})")]
    NotPowerOfTwo { what: &'static str, value: usize },
    #[error("associativity {associativity} exceeds the number of blocks ({num_blocks})")]
    AssociativityExceedsBlocks {
        associativity: usize,
        num_blocks: usize,
    },
    #[error("{size} bytes per way exceed the 32 bit address space")]
    AddressSpaceExceeded { size: usize },
    #[error("unsupported write policy combination {write_policy:?} with {write_allocate_policy:?}")]
    UnsupportedWritePolicy {
        write_policy: WritePolicy,
        write_allocate_policy: WriteAllocatePolicy,
    },
}

/// Cache write-allocate policy.
///
/// `WRITE_ALLOCATE` installs the written block without requesting it from
/// the next level, `FETCH_ON_WRITE` additionally fetches the block with a
/// read. See Jouppi, Norman P. "Cache write policies and performance".
/// ISCA 93.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum WriteAllocatePolicy {
    NO_WRITE_ALLOCATE, // N
    WRITE_ALLOCATE,    // W
    FETCH_ON_WRITE,    // F
}

/// A cache write policy.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum WritePolicy {
    WRITE_BACK,    // B
    WRITE_THROUGH, // T
}

impl WritePolicy {
    /// The write-allocate policy a cache with this write policy uses by default.
    #[must_use]
    pub fn default_write_allocate_policy(self) -> WriteAllocatePolicy {
        match self {
            WritePolicy::WRITE_BACK => WriteAllocatePolicy::WRITE_ALLOCATE,
            WritePolicy::WRITE_THROUGH => WriteAllocatePolicy::NO_WRITE_ALLOCATE,
        }
    }
}

/// A cache replacement policy
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum ReplacementPolicy {
    #[default]
    LRU, // L
}

/// Geometry of a set-associative cache.
///
/// Derived once from the cache size, block size and associativity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Geometry {
    /// Total cache size in bytes.
    pub size: usize,
    /// Block (line) size in bytes.
    pub block_size: usize,
    /// Ways per set.
    pub associativity: usize,
    pub num_blocks: usize,
    pub num_sets: usize,
    pub offset_bits: u32,
    /// Zero for a fully associative cache.
    pub index_bits: u32,
    pub tag_bits: u32,
}

impl Geometry {
    pub fn new(size: usize, block_size: usize, associativity: usize) -> Result<Self, Error> {
        for (what, value) in [
            ("cache size", size),
            ("block size", block_size),
            ("associativity", associativity),
        ] {
            if !value.is_power_of_two() {
                return Err(Error::NotPowerOfTwo { what, value });
            }
        }

        let num_blocks = size / block_size;
        if associativity > num_blocks {
            return Err(Error::AssociativityExceedsBlocks {
                associativity,
                num_blocks,
            });
        }
        let num_sets = num_blocks / associativity;
        let offset_bits = block_size.ilog2();
        let index_bits = num_sets.ilog2();
        if offset_bits + index_bits > ADDRESS_BITS {
            return Err(Error::AddressSpaceExceeded {
                size: size / associativity,
            });
        }

        Ok(Self {
            size,
            block_size,
            associativity,
            num_blocks,
            num_sets,
            offset_bits,
            index_bits,
            tag_bits: ADDRESS_BITS - index_bits - offset_bits,
        })
    }

    #[must_use]
    pub fn is_fully_associative(&self) -> bool {
        self.num_sets == 1
    }

    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.num_sets * self.associativity
    }
}

/// Immutable configuration of a single cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub geometry: Geometry,

    /// Cache write policy.
    pub write_policy: WritePolicy,

    /// Cache write allocate policy.
    pub write_allocate_policy: WriteAllocatePolicy,

    /// Cache replacement policy.
    pub replacement_policy: ReplacementPolicy,
}

impl Config {
    pub fn new(
        geometry: Geometry,
        write_policy: WritePolicy,
        write_allocate_policy: WriteAllocatePolicy,
        replacement_policy: ReplacementPolicy,
    ) -> Result<Self, Error> {
        use {WriteAllocatePolicy as WA, WritePolicy as W};
        match (write_policy, write_allocate_policy) {
            (W::WRITE_THROUGH, WA::NO_WRITE_ALLOCATE)
            | (W::WRITE_BACK, WA::WRITE_ALLOCATE | WA::FETCH_ON_WRITE) => {}
            _ => {
                return Err(Error::UnsupportedWritePolicy {
                    write_policy,
                    write_allocate_policy,
                })
            }
        }
        Ok(Self {
            geometry,
            write_policy,
            write_allocate_policy,
            replacement_policy,
        })
    }

    #[must_use]
    pub fn is_write_back(&self) -> bool {
        self.write_policy == WritePolicy::WRITE_BACK
    }
}

impl TryFrom<&config::Cache> for Config {
    type Error = Error;

    fn try_from(config: &config::Cache) -> Result<Self, Self::Error> {
        let geometry = Geometry::new(config.size, config.block_size, config.associativity)?;
        Self::new(
            geometry,
            config.write_policy,
            config.write_allocate_policy(),
            config.replacement_policy,
        )
    }
}
