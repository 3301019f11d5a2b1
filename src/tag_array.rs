use crate::addrdec::{AddressTranslation, DecodedAddress};
use crate::cache::{self, block::Line, config::Geometry, config::ReplacementPolicy};
use crate::address;

use serde::Serialize;

#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
pub struct EvictedBlockInfo {
    pub block_addr: address,
    pub modified: bool,
}

/// Read-only projection of a single way for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LineDump {
    pub set: usize,
    pub way: usize,
    pub valid: bool,
    pub tag: address,
    pub recency: usize,
    pub dirty: bool,
}

/// Tag array.
///
/// Stores `num_sets x associativity` lines, way `w` of set `s` lives at
/// index `s * associativity + w`.
#[derive(Debug, Clone)]
pub struct TagArray {
    pub lines: Vec<Line>,
    geometry: Geometry,
    replacement_policy: ReplacementPolicy,
}

impl TagArray {
    #[must_use]
    pub fn new(geometry: Geometry, replacement_policy: ReplacementPolicy) -> Self {
        let lines = (0..geometry.total_lines()).map(|_| Line::new()).collect();
        Self {
            lines,
            geometry,
            replacement_policy,
        }
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[inline]
    #[must_use]
    pub fn set(&self, set_index: usize) -> &[Line] {
        let assoc = self.geometry.associativity;
        &self.lines[set_index * assoc..(set_index + 1) * assoc]
    }

    #[inline]
    fn set_mut(&mut self, set_index: usize) -> &mut [Line] {
        let assoc = self.geometry.associativity;
        &mut self.lines[set_index * assoc..(set_index + 1) * assoc]
    }

    /// Splits a cache index into set index and way.
    #[inline]
    #[must_use]
    pub fn set_and_way(&self, cache_index: usize) -> (usize, usize) {
        (
            cache_index / self.geometry.associativity,
            cache_index % self.geometry.associativity,
        )
    }

    /// Finds the way holding `tag` in the given set.
    ///
    /// Ways are scanned in ascending order.
    #[must_use]
    pub fn locate(&self, set_index: usize, tag: address) -> Option<usize> {
        self.set(set_index)
            .iter()
            .position(|line| line.is_valid() && line.tag == tag)
    }

    /// Selects the way to replace in the given set.
    ///
    /// The lowest invalid way wins, otherwise the replacement policy decides.
    #[must_use]
    pub fn victim(&self, set_index: usize) -> usize {
        let lines = self.set(set_index);
        if let Some(invalid) = lines.iter().position(Line::is_invalid) {
            return invalid;
        }
        match self.replacement_policy {
            ReplacementPolicy::LRU => {
                let mut victim = 0;
                for (way, line) in lines.iter().enumerate() {
                    if line.recency > lines[victim].recency {
                        victim = way;
                    }
                }
                victim
            }
        }
    }

    /// Marks a way as the most recently used of its set.
    ///
    /// Every other valid way that was more recent than `way` ages by one.
    /// An invalid way counts as older than all valid ways.
    pub fn touch(&mut self, set_index: usize, way: usize) {
        let lines = self.set_mut(set_index);
        let current = if lines[way].is_valid() {
            lines[way].recency
        } else {
            usize::MAX
        };
        for (other, line) in lines.iter_mut().enumerate() {
            if other != way && line.is_valid() && line.recency < current {
                line.recency += 1;
            }
        }
        lines[way].recency = 0;
    }

    /// Probes the tag array
    ///
    /// # Returns
    /// The cache index of the hit line, or of the replacement candidate on a miss.
    #[must_use]
    pub fn probe(&self, addr: address) -> (usize, cache::RequestStatus) {
        let DecodedAddress { tag, index, .. } = self.geometry.decode(addr);
        let base = index * self.geometry.associativity;

        log::trace!(
            "tag_array::probe({:#x}) set_idx = {}, tag = {:#x}, assoc = {}",
            addr,
            index,
            tag,
            self.geometry.associativity,
        );

        if let Some(way) = self.locate(index, tag) {
            return (base + way, cache::RequestStatus::HIT);
        }
        let way = self.victim(index);
        log::trace!(
            "tag_array::probe({:#x}) => miss, victim way {} ({})",
            addr,
            way,
            self.lines[base + way],
        );
        (base + way, cache::RequestStatus::MISS)
    }

    /// Records a hit on the line at `cache_index`.
    #[inline]
    pub fn hit(&mut self, cache_index: usize) {
        let (set_index, way) = self.set_and_way(cache_index);
        self.touch(set_index, way);
    }

    /// Installs the block of `addr` at `cache_index`.
    ///
    /// # Returns
    /// The evicted block, if the replaced line was valid.
    pub fn fill(
        &mut self,
        cache_index: usize,
        addr: address,
        modified: bool,
    ) -> Option<EvictedBlockInfo> {
        let (set_index, way) = self.set_and_way(cache_index);
        let tag = self.geometry.tag(addr);
        debug_assert_eq!(set_index, self.geometry.set_index(addr));
        debug_assert_eq!(self.locate(set_index, tag), None, "duplicate tag in set");

        let line = &self.lines[cache_index];
        let evicted = line.is_valid().then(|| EvictedBlockInfo {
            block_addr: self.geometry.compose(&DecodedAddress {
                tag: line.tag,
                index: set_index,
                offset: 0,
            }),
            modified: line.is_modified(),
        });

        log::trace!(
            "tag_array::fill(cache={}, tag={:#x}, modified={}) evicted={:?}",
            cache_index,
            tag,
            modified,
            evicted,
        );

        self.touch(set_index, way);
        self.lines[cache_index].allocate(tag, modified);
        evicted
    }

    /// Marks every dirty line clean.
    ///
    /// # Returns
    /// The block addresses of the lines that were dirty.
    pub fn flush(&mut self) -> Vec<address> {
        let mut flushed = Vec::new();
        for cache_index in 0..self.lines.len() {
            if self.lines[cache_index].is_modified() {
                let (set_index, _) = self.set_and_way(cache_index);
                let line = &mut self.lines[cache_index];
                flushed.push(self.geometry.compose(&DecodedAddress {
                    tag: line.tag,
                    index: set_index,
                    offset: 0,
                }));
                line.status = cache::block::Status::VALID;
            }
        }
        flushed
    }

    /// Invalidates all tags stored in this array.
    ///
    /// This effectively resets the tag array.
    pub fn invalidate(&mut self) {
        for line in &mut self.lines {
            *line = Line::new();
        }
    }

    /// The maximum number of tags this array can hold.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn num_used_lines(&self) -> usize {
        self.lines.iter().filter(|line| line.is_valid()).count()
    }

    #[must_use]
    pub fn num_dirty(&self) -> usize {
        self.lines.iter().filter(|line| line.is_modified()).count()
    }

    /// One row per (set, way).
    pub fn dump(&self) -> impl Iterator<Item = LineDump> + '_ {
        self.lines.iter().enumerate().map(|(cache_index, line)| {
            let (set, way) = self.set_and_way(cache_index);
            LineDump {
                set,
                way,
                valid: line.is_valid(),
                tag: line.tag,
                recency: line.recency,
                dirty: line.is_modified(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{EvictedBlockInfo, TagArray};
    use crate::cache::{
        config::{Error, Geometry, ReplacementPolicy},
        RequestStatus,
    };

    fn recencies(tag_array: &TagArray, set_index: usize) -> Vec<Option<usize>> {
        tag_array
            .set(set_index)
            .iter()
            .map(|line| line.is_valid().then_some(line.recency))
            .collect()
    }

    #[test]
    fn test_cold_set_fills_lowest_invalid_way() -> Result<(), Error> {
        let mut tag_array = TagArray::new(Geometry::new(16, 4, 4)?, ReplacementPolicy::LRU);
        for (i, addr) in [0x00, 0x10, 0x20].into_iter().enumerate() {
            let (cache_index, status) = tag_array.probe(addr);
            assert_eq!(status, RequestStatus::MISS);
            assert_eq!(cache_index, i);
            assert_eq!(tag_array.fill(cache_index, addr, false), None);
        }
        assert_eq!(recencies(&tag_array, 0), vec![Some(2), Some(1), Some(0), None]);
        assert_eq!(tag_array.num_used_lines(), 3);
        Ok(())
    }

    #[test]
    fn test_touch_keeps_permutation() -> Result<(), Error> {
        let mut tag_array = TagArray::new(Geometry::new(16, 4, 4)?, ReplacementPolicy::LRU);
        for addr in [0x00, 0x10, 0x20, 0x30] {
            let (cache_index, _) = tag_array.probe(addr);
            tag_array.fill(cache_index, addr, false);
        }
        assert_eq!(
            recencies(&tag_array, 0),
            vec![Some(3), Some(2), Some(1), Some(0)]
        );

        tag_array.touch(0, 1);
        assert_eq!(
            recencies(&tag_array, 0),
            vec![Some(3), Some(0), Some(2), Some(1)]
        );

        // touching the most recent way changes nothing
        tag_array.touch(0, 1);
        assert_eq!(
            recencies(&tag_array, 0),
            vec![Some(3), Some(0), Some(2), Some(1)]
        );
        assert_eq!(tag_array.victim(0), 0);
        Ok(())
    }

    #[test]
    fn test_victim_is_least_recently_used() -> Result<(), Error> {
        let mut tag_array = TagArray::new(Geometry::new(8, 4, 2)?, ReplacementPolicy::LRU);
        for addr in [0x0, 0x4] {
            let (cache_index, _) = tag_array.probe(addr);
            tag_array.fill(cache_index, addr, false);
        }
        let (cache_index, status) = tag_array.probe(0x0);
        assert_eq!(status, RequestStatus::HIT);
        tag_array.hit(cache_index);

        // way 1 holds 0x4, which is now the least recently used
        let (cache_index, status) = tag_array.probe(0x8);
        assert_eq!((cache_index, status), (1, RequestStatus::MISS));
        assert_eq!(
            tag_array.fill(cache_index, 0x8, false),
            Some(EvictedBlockInfo {
                block_addr: 0x4,
                modified: false,
            })
        );
        assert_eq!(tag_array.locate(0, 0x0), Some(0));
        assert_eq!(tag_array.locate(0, 0x2), Some(1));
        assert_eq!(tag_array.locate(0, 0x1), None);
        Ok(())
    }

    #[test]
    fn test_evicted_block_address() -> Result<(), Error> {
        // 4 sets, 2 ways, 16 byte blocks
        let mut tag_array = TagArray::new(Geometry::new(128, 16, 2)?, ReplacementPolicy::LRU);
        let addrs = [0xFFFF_FF3C, 0x0000_0035, 0x1234_5638];
        for addr in addrs {
            let (cache_index, _) = tag_array.probe(addr);
            tag_array.fill(cache_index, addr, true);
        }
        // all three map to set 3, the first one was evicted
        let (_, status) = tag_array.probe(addrs[0]);
        assert_eq!(status, RequestStatus::MISS);
        assert_eq!(tag_array.num_dirty(), 2);
        assert_eq!(tag_array.flush(), vec![0x1234_5630, 0x0000_0030]);
        assert_eq!(tag_array.num_dirty(), 0);
        assert_eq!(tag_array.num_used_lines(), 2);
        Ok(())
    }

    #[test]
    fn test_dump_and_invalidate() -> Result<(), Error> {
        let mut tag_array = TagArray::new(Geometry::new(16, 4, 2)?, ReplacementPolicy::LRU);
        let (cache_index, _) = tag_array.probe(0x1C);
        tag_array.fill(cache_index, 0x1C, true);

        let dump: Vec<_> = tag_array.dump().collect();
        assert_eq!(dump.len(), tag_array.size());
        let valid: Vec<_> = dump.iter().filter(|row| row.valid).collect();
        assert_eq!(valid.len(), 1);
        assert_eq!((valid[0].set, valid[0].way), (1, 0));
        assert_eq!(valid[0].tag, 0x1C >> 3);
        assert!(valid[0].dirty);

        tag_array.invalidate();
        assert_eq!(tag_array.num_used_lines(), 0);
        Ok(())
    }
}
