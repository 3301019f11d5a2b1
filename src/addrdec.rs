use crate::{address, cache::config::Geometry};

use serde::Serialize;

/// Mask with the lowest `bits` bits set.
///
/// Saturates to all ones for `bits >= 32`.
#[inline]
#[must_use]
pub fn mask(bits: u32) -> address {
    1u32.checked_shl(bits).map_or(address::MAX, |bit| bit - 1)
}

/// An address split into its tag, set index and block offset.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DecodedAddress {
    pub tag: address,
    pub index: usize,
    pub offset: address,
}

impl std::fmt::Display for DecodedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tag={:#x} index={:#x} offset={:#x}",
            self.tag, self.index, self.offset
        )
    }
}

pub trait AddressTranslation: std::fmt::Debug {
    /// Compute cache line tag for an address.
    #[must_use]
    fn tag(&self, addr: address) -> address;

    /// Compute set index for an address.
    #[must_use]
    fn set_index(&self, addr: address) -> usize;

    /// Compute the byte offset within the block.
    #[must_use]
    fn offset(&self, addr: address) -> address;

    /// Reassemble an address from its parts.
    #[must_use]
    fn compose(&self, decoded: &DecodedAddress) -> address;

    #[must_use]
    fn decode(&self, addr: address) -> DecodedAddress {
        DecodedAddress {
            tag: self.tag(addr),
            index: self.set_index(addr),
            offset: self.offset(addr),
        }
    }

    /// Compute block address for an address.
    ///
    /// The default implementation clears the offset bits.
    #[must_use]
    fn block_addr(&self, addr: address) -> address {
        addr & !mask(self.offset_bits())
    }

    #[must_use]
    fn offset_bits(&self) -> u32;
}

impl AddressTranslation for Geometry {
    #[inline]
    fn tag(&self, addr: address) -> address {
        // a tag of zero width when index and offset cover all 32 bits
        addr.checked_shr(self.index_bits + self.offset_bits)
            .unwrap_or(0)
    }

    #[inline]
    fn set_index(&self, addr: address) -> usize {
        if self.index_bits == 0 {
            // fully associative
            return 0;
        }
        ((addr >> self.offset_bits) & mask(self.index_bits)) as usize
    }

    #[inline]
    fn offset(&self, addr: address) -> address {
        addr & mask(self.offset_bits)
    }

    #[inline]
    fn compose(&self, decoded: &DecodedAddress) -> address {
        let tag = decoded
            .tag
            .checked_shl(self.index_bits + self.offset_bits)
            .unwrap_or(0);
        let index = (decoded.index as address)
            .checked_shl(self.offset_bits)
            .unwrap_or(0);
        tag | index | decoded.offset
    }

    #[inline]
    fn offset_bits(&self) -> u32 {
        self.offset_bits
    }
}
