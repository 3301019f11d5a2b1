use crate::{address, addrdec::AddressTranslation, cache, config, tag_array};
use cache::config::{WriteAllocatePolicy, WritePolicy};
use cache::event::{Event, Events};
use stats::mem::AccessKind;

/// Set-associative cache.
///
/// A single cache type covers every supported policy combination, the
/// write and write-allocate policies select the hit and miss handlers.
/// The cache does not know its next level: requests for the next level are
/// returned as events and routed by the [`MemorySystem`](crate::MemorySystem).
#[derive(Debug, Clone)]
pub struct Cache {
    pub name: String,
    pub cache_config: cache::Config,
    pub tag_array: tag_array::TagArray,
    pub stats: stats::Cache,
}

impl Cache {
    #[must_use]
    pub fn new(name: impl Into<String>, cache_config: cache::Config) -> Self {
        let tag_array =
            tag_array::TagArray::new(cache_config.geometry, cache_config.replacement_policy);
        Self {
            name: name.into(),
            cache_config,
            tag_array,
            stats: stats::Cache::default(),
        }
    }

    pub fn from_config(config: &config::Cache) -> Result<Self, cache::config::Error> {
        let cache_config = cache::Config::try_from(config)?;
        Ok(Self::new(config.name.clone(), cache_config))
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> &cache::config::Geometry {
        &self.cache_config.geometry
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.stats.hits()
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.stats.misses()
    }

    #[must_use]
    pub fn accesses(&self) -> u64 {
        self.stats.total_accesses()
    }

    /// Data read of `addr`.
    pub fn read(&mut self, addr: address, events: &mut Events) -> cache::RequestStatus {
        self.access(addr, AccessKind::DATA_ACC_R, events)
    }

    /// Data write of `addr`.
    pub fn write(&mut self, addr: address, events: &mut Events) -> cache::RequestStatus {
        self.access(addr, AccessKind::DATA_ACC_W, events)
    }

    /// Accesses the cache.
    ///
    /// Requests for the next level are appended to `events` in the order
    /// they must be applied.
    pub fn access(
        &mut self,
        addr: address,
        kind: AccessKind,
        events: &mut Events,
    ) -> cache::RequestStatus {
        let is_write = kind.is_write();
        let (cache_index, probe_status) = self.tag_array.probe(addr);

        log::debug!(
            "{}::access({:#x}, {}, block = {:#x}) => {:?}",
            self.name,
            addr,
            kind,
            self.geometry().block_addr(addr),
            probe_status,
        );

        match (is_write, probe_status) {
            (false, cache::RequestStatus::HIT) => self.read_hit(cache_index),
            (false, cache::RequestStatus::MISS) => self.read_miss(addr, cache_index, events),
            (true, cache::RequestStatus::HIT) => self.write_hit(addr, cache_index, events),
            (true, cache::RequestStatus::MISS) => self.write_miss(addr, cache_index, events),
        }

        self.stats.inc(kind, probe_status, 1);
        probe_status
    }

    fn read_hit(&mut self, cache_index: usize) {
        // update LRU state
        self.tag_array.hit(cache_index);
    }

    /// Evicts the line at `cache_index` and installs the block of `addr`.
    ///
    /// A dirty victim is written back before the new block is installed.
    fn allocate(&mut self, addr: address, cache_index: usize, modified: bool, events: &mut Events) {
        let evicted = self.tag_array.fill(cache_index, addr, modified);
        if let Some(evicted_block) = evicted.filter(|evicted| evicted.modified) {
            debug_assert!(self.cache_config.is_write_back());
            log::debug!(
                "{}: evicted dirty block {:#x}",
                self.name,
                evicted_block.block_addr
            );
            events.push(Event::WriteBackRequestSent { evicted_block });
        }
    }

    fn read_miss(&mut self, addr: address, cache_index: usize, events: &mut Events) {
        self.allocate(addr, cache_index, false, events);
        events.push(Event::ReadRequestSent { addr });
    }

    fn write_hit(&mut self, addr: address, cache_index: usize, events: &mut Events) {
        let func = match self.cache_config.write_policy {
            WritePolicy::WRITE_BACK => Self::write_hit_write_back,
            WritePolicy::WRITE_THROUGH => Self::write_hit_write_through,
        };
        (func)(self, addr, cache_index, events);
    }

    /// Write-back hit: mark block as modified.
    fn write_hit_write_back(&mut self, _addr: address, cache_index: usize, _events: &mut Events) {
        self.tag_array.hit(cache_index);
        self.tag_array.lines[cache_index].set_modified();
    }

    /// Write-through hit: send the write to the next level, the block stays clean.
    fn write_hit_write_through(&mut self, addr: address, cache_index: usize, events: &mut Events) {
        self.tag_array.hit(cache_index);
        events.push(Event::WriteRequestSent { addr });
    }

    fn write_miss(&mut self, addr: address, cache_index: usize, events: &mut Events) {
        let func = match self.cache_config.write_allocate_policy {
            WriteAllocatePolicy::NO_WRITE_ALLOCATE => Self::write_miss_no_write_allocate,
            WriteAllocatePolicy::WRITE_ALLOCATE => Self::write_miss_write_allocate,
            WriteAllocatePolicy::FETCH_ON_WRITE => Self::write_miss_fetch_on_write,
        };
        (func)(self, addr, cache_index, events);
    }

    /// No write allocate: nothing is installed, the write goes to the next level.
    fn write_miss_no_write_allocate(
        &mut self,
        addr: address,
        _cache_index: usize,
        events: &mut Events,
    ) {
        log::debug!("{}: write miss, no write allocate", self.name);
        events.push(Event::WriteRequestSent { addr });
    }

    /// Write allocate: the written block is installed dirty without a fetch.
    fn write_miss_write_allocate(&mut self, addr: address, cache_index: usize, events: &mut Events) {
        self.allocate(addr, cache_index, true, events);
    }

    /// Fetch on write: like write allocate, but the block is also fetched.
    fn write_miss_fetch_on_write(&mut self, addr: address, cache_index: usize, events: &mut Events) {
        self.allocate(addr, cache_index, true, events);
        events.push(Event::ReadRequestSent { addr });
    }

    /// Writes back all dirty lines, leaving them clean and resident.
    ///
    /// # Returns
    /// The number of dirty lines flushed.
    pub fn flush(&mut self, events: &mut Vec<Event>) -> usize {
        let flushed = self.tag_array.flush();
        let num_flushed = flushed.len();
        events.extend(flushed.into_iter().map(|block_addr| Event::WriteBackRequestSent {
            evicted_block: tag_array::EvictedBlockInfo {
                block_addr,
                modified: true,
            },
        }));
        num_flushed
    }

    /// Invalidates all lines, counters are kept.
    pub fn invalidate(&mut self) {
        self.tag_array.invalidate();
    }

    /// Read-only view of every line, one row per (set, way).
    pub fn lines(&self) -> impl Iterator<Item = tag_array::LineDump> + '_ {
        self.tag_array.dump()
    }
}

#[cfg(test)]
mod tests {
    use super::Cache;
    use crate::cache::{
        self,
        config::{Error, Geometry, ReplacementPolicy, WriteAllocatePolicy, WritePolicy},
        event::{self, Event, Events},
        RequestStatus,
    };
    use crate::tag_array::EvictedBlockInfo;
    use stats::mem::AccessKind;

    fn cache(
        size: usize,
        block_size: usize,
        associativity: usize,
        write_policy: WritePolicy,
    ) -> Result<Cache, Error> {
        let config = cache::Config::new(
            Geometry::new(size, block_size, associativity)?,
            write_policy,
            write_policy.default_write_allocate_policy(),
            ReplacementPolicy::LRU,
        )?;
        Ok(Cache::new("test", config))
    }

    fn resident_tags(cache: &Cache) -> Vec<u32> {
        let mut tags: Vec<_> = cache
            .lines()
            .filter(|line| line.valid)
            .map(|line| line.tag)
            .collect();
        tags.sort_unstable();
        tags
    }

    #[test]
    fn test_lru_scenario() -> Result<(), Error> {
        crate::testing::init_logging();
        // one set, two ways, four byte blocks
        let mut cache = cache(8, 4, 2, WritePolicy::WRITE_THROUGH)?;
        let (a, b, c) = (0x100, 0x200, 0x300);
        let mut events = Events::new();
        let statuses: Vec<_> = [a, b, a, c]
            .into_iter()
            .map(|addr| cache.read(addr, &mut events))
            .collect();
        utils::diff::assert_eq!(
            have: statuses,
            want: vec![
                RequestStatus::MISS,
                RequestStatus::MISS,
                RequestStatus::HIT,
                RequestStatus::MISS,
            ]
        );
        assert_eq!(resident_tags(&cache), vec![a >> 2, c >> 2]);
        assert_eq!((cache.hits(), cache.misses()), (1, 3));
        // write-through caches never write back
        assert!(event::was_writeback_sent(&events).is_none());
        Ok(())
    }

    #[test]
    fn test_read_miss_fetches_block() -> Result<(), Error> {
        let mut cache = cache(64, 16, 1, WritePolicy::WRITE_BACK)?;
        let mut events = Events::new();
        assert_eq!(cache.read(0x1234, &mut events), RequestStatus::MISS);
        assert_eq!(events.as_slice(), &[Event::ReadRequestSent { addr: 0x1234 }]);

        events.clear();
        assert_eq!(cache.read(0x123C, &mut events), RequestStatus::HIT);
        assert!(events.is_empty());
        Ok(())
    }

    #[test]
    fn test_write_back_dirty_victim() -> Result<(), Error> {
        // one set, one way
        let mut cache = cache(4, 4, 1, WritePolicy::WRITE_BACK)?;
        let (x, y) = (0x40, 0x80);
        let mut events = Events::new();

        assert_eq!(cache.write(x, &mut events), RequestStatus::MISS);
        // write allocate without fetch
        assert!(events.is_empty());

        assert_eq!(cache.write(y, &mut events), RequestStatus::MISS);
        assert_eq!(
            events.as_slice(),
            &[Event::WriteBackRequestSent {
                evicted_block: EvictedBlockInfo {
                    block_addr: x,
                    modified: true
                }
            }]
        );
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.tag_array.num_dirty(), 1);
        Ok(())
    }

    #[test]
    fn test_read_miss_writes_back_before_fetch() -> Result<(), Error> {
        let mut cache = cache(4, 4, 1, WritePolicy::WRITE_BACK)?;
        let mut events = Events::new();
        cache.write(0x10, &mut events);
        cache.read(0x20, &mut events);
        utils::diff::assert_eq!(
            have: events.into_vec(),
            want: vec![
                Event::WriteBackRequestSent {
                    evicted_block: EvictedBlockInfo {
                        block_addr: 0x10,
                        modified: true
                    }
                },
                Event::ReadRequestSent { addr: 0x20 },
            ]
        );
        // the fetched block is clean
        assert_eq!(cache.tag_array.num_dirty(), 0);
        Ok(())
    }

    #[test]
    fn test_clean_victim_is_dropped() -> Result<(), Error> {
        let mut cache = cache(4, 4, 1, WritePolicy::WRITE_BACK)?;
        let mut events = Events::new();
        cache.read(0x10, &mut events);
        events.clear();
        cache.read(0x20, &mut events);
        assert_eq!(events.as_slice(), &[Event::ReadRequestSent { addr: 0x20 }]);
        Ok(())
    }

    #[test]
    fn test_write_hit_write_back_marks_dirty() -> Result<(), Error> {
        let mut cache = cache(64, 4, 2, WritePolicy::WRITE_BACK)?;
        let mut events = Events::new();
        cache.read(0x8, &mut events);
        events.clear();
        assert_eq!(cache.write(0x9, &mut events), RequestStatus::HIT);
        assert!(events.is_empty());
        assert_eq!(cache.tag_array.num_dirty(), 1);
        Ok(())
    }

    #[test]
    fn test_write_hit_write_through_forwards() -> Result<(), Error> {
        let mut cache = cache(64, 4, 2, WritePolicy::WRITE_THROUGH)?;
        let mut events = Events::new();
        cache.read(0x8, &mut events);
        events.clear();
        assert_eq!(cache.write(0x9, &mut events), RequestStatus::HIT);
        assert_eq!(events.as_slice(), &[Event::WriteRequestSent { addr: 0x9 }]);
        assert_eq!(cache.tag_array.num_dirty(), 0);
        Ok(())
    }

    #[test]
    fn test_no_write_allocate() -> Result<(), Error> {
        let mut cache = cache(64, 4, 2, WritePolicy::WRITE_THROUGH)?;
        let mut events = Events::new();
        assert_eq!(cache.write(0xABC0, &mut events), RequestStatus::MISS);
        assert!(event::was_write_sent(&events));
        assert_eq!(cache.tag_array.num_used_lines(), 0);

        assert_eq!(cache.read(0xABC0, &mut events), RequestStatus::MISS);
        assert_eq!(cache.misses(), 2);
        Ok(())
    }

    #[test]
    fn test_fetch_on_write() -> Result<(), Error> {
        let config = cache::Config::new(
            Geometry::new(4, 4, 1)?,
            WritePolicy::WRITE_BACK,
            WriteAllocatePolicy::FETCH_ON_WRITE,
            ReplacementPolicy::LRU,
        )?;
        let mut cache = Cache::new("fetch-on-write", config);
        let mut events = Events::new();
        cache.write(0x10, &mut events);
        assert_eq!(events.as_slice(), &[Event::ReadRequestSent { addr: 0x10 }]);

        events.clear();
        cache.write(0x20, &mut events);
        assert_eq!(
            event::was_writeback_sent(&events).map(|evicted| evicted.block_addr),
            Some(0x10)
        );
        assert!(event::was_read_sent(&events));
        Ok(())
    }

    #[test]
    fn test_flush() -> Result<(), Error> {
        let mut cache = cache(64, 4, 4, WritePolicy::WRITE_BACK)?;
        let mut events = Events::new();
        for addr in [0x0, 0x4, 0x8] {
            cache.write(addr, &mut events);
        }
        cache.read(0xC, &mut events);

        let mut flushed = Vec::new();
        assert_eq!(cache.flush(&mut flushed), 3);
        let addrs: Vec<_> = flushed.iter().map(|event| event.request()).collect();
        assert_eq!(
            addrs,
            vec![
                (0x0, AccessKind::WRBK_ACC),
                (0x4, AccessKind::WRBK_ACC),
                (0x8, AccessKind::WRBK_ACC)
            ]
        );
        assert_eq!(cache.tag_array.num_dirty(), 0);
        assert_eq!(cache.tag_array.num_used_lines(), 4);
        Ok(())
    }

    #[test]
    fn test_counters_per_kind() -> Result<(), Error> {
        let mut cache = cache(64, 4, 2, WritePolicy::WRITE_BACK)?;
        let mut events = Events::new();
        cache.access(0x0, AccessKind::INST_ACC_R, &mut events);
        cache.access(0x0, AccessKind::INST_ACC_R, &mut events);
        cache.access(0x40, AccessKind::WRBK_ACC, &mut events);
        assert_eq!(
            cache
                .stats
                .count(AccessKind::INST_ACC_R, RequestStatus::HIT),
            1
        );
        assert_eq!(cache.stats.accesses_of(AccessKind::WRBK_ACC), 1);
        assert_eq!(cache.accesses(), 3);
        assert_eq!(cache.hits() + cache.misses(), cache.accesses());
        Ok(())
    }
}
