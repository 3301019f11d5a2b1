use crate::{address, cache, config};
use cache::{Cache, Event, Events, RequestStatus};
use stats::mem::AccessKind;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Kind of a trace reference.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
)]
pub enum ReferenceKind {
    DataRead,
    DataWrite,
    InstructionFetch,
}

impl ReferenceKind {
    #[must_use]
    pub fn access_kind(self) -> AccessKind {
        match self {
            ReferenceKind::DataRead => AccessKind::DATA_ACC_R,
            ReferenceKind::DataWrite => AccessKind::DATA_ACC_W,
            ReferenceKind::InstructionFetch => AccessKind::INST_ACC_R,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("instruction fetch of {addr:#x} without an instruction cache")]
    NoInstructionCache { addr: address },
}

/// A hierarchy of caches.
///
/// All levels live in a single arena and refer to their next level by
/// position, so a level shared by several upper levels sees the traffic
/// of all of them. Requests a level sends downstream are applied to the
/// next level before the reference that caused them returns.
#[derive(Debug, Clone)]
pub struct MemorySystem {
    levels: Vec<Cache>,
    next: Vec<Option<usize>>,
    names: IndexMap<String, usize>,
    instruction_cache: Option<usize>,
    data_cache: usize,
}

impl MemorySystem {
    pub fn new(config: &config::Hierarchy) -> Result<Self, config::Error> {
        let next = config.next_levels()?;
        let levels = config
            .levels
            .iter()
            .map(|level| {
                Cache::from_config(level).map_err(|source| config::Error::InvalidCache {
                    name: level.name.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let names: IndexMap<String, usize> = levels
            .iter()
            .enumerate()
            .map(|(i, level)| (level.name.clone(), i))
            .collect();

        let lookup = |role: &'static str, name: &str| {
            names
                .get(name)
                .copied()
                .ok_or_else(|| config::Error::UnknownTopLevel {
                    role,
                    name: name.to_string(),
                })
        };
        let instruction_cache = config
            .instruction_cache
            .as_deref()
            .map(|name| lookup("instruction", name))
            .transpose()?;
        let data_cache = lookup("data", &config.data_cache)?;

        for (level, next) in levels.iter().zip(next.iter()) {
            log::debug!(
                "{}: {:?} {} {} -> {}",
                level.name,
                level.geometry(),
                level.cache_config.write_policy,
                level.cache_config.write_allocate_policy,
                next.map_or("memory", |next| levels[next].name.as_str()),
            );
        }

        Ok(Self {
            levels,
            next,
            names,
            instruction_cache,
            data_cache,
        })
    }

    /// Routes a single trace reference to the first level serving it.
    pub fn dispatch(&mut self, kind: ReferenceKind, addr: address) -> Result<RequestStatus, Error> {
        let level = match kind {
            ReferenceKind::InstructionFetch => self
                .instruction_cache
                .ok_or(Error::NoInstructionCache { addr })?,
            ReferenceKind::DataRead | ReferenceKind::DataWrite => self.data_cache,
        };
        Ok(self.access(level, addr, kind.access_kind()))
    }

    /// Accesses the level at position `level` and applies all resulting
    /// downstream traffic.
    fn access(&mut self, level: usize, addr: address, kind: AccessKind) -> RequestStatus {
        let mut events = Events::new();
        let status = self.levels[level].access(addr, kind, &mut events);
        self.forward(level, events);
        status
    }

    fn forward(&mut self, level: usize, events: impl IntoIterator<Item = Event>) {
        for event in events {
            let (addr, kind) = event.request();
            match self.next[level] {
                Some(next) => {
                    self.access(next, addr, kind);
                }
                None => log::trace!(
                    "{}: {} of {:#x} leaves the hierarchy",
                    self.levels[level].name,
                    kind,
                    addr
                ),
            }
        }
    }

    /// Writes back the dirty lines of every level.
    ///
    /// Upper levels are flushed first so their write-backs reach the lower
    /// levels before those are flushed.
    ///
    /// # Returns
    /// The number of lines flushed across all levels.
    pub fn flush(&mut self) -> usize {
        let mut order: Vec<usize> = (0..self.levels.len()).collect();
        order.sort_by_key(|&level| std::cmp::Reverse(self.depth_below(level)));

        let mut num_flushed = 0;
        for level in order {
            let mut events = Vec::new();
            num_flushed += self.levels[level].flush(&mut events);
            self.forward(level, events);
        }
        log::debug!("flushed {num_flushed} dirty lines");
        num_flushed
    }

    /// Number of levels below `level`.
    fn depth_below(&self, mut level: usize) -> usize {
        let mut depth = 0;
        while let Some(next) = self.next[level] {
            depth += 1;
            level = next;
        }
        depth
    }

    #[must_use]
    pub fn level(&self, name: &str) -> Option<&Cache> {
        self.names.get(name).map(|&level| &self.levels[level])
    }

    #[must_use]
    pub fn levels(&self) -> &[Cache] {
        &self.levels
    }

    #[must_use]
    pub fn instruction_cache(&self) -> Option<&Cache> {
        self.instruction_cache.map(|level| &self.levels[level])
    }

    #[must_use]
    pub fn data_cache(&self) -> &Cache {
        &self.levels[self.data_cache]
    }

    /// The level below the cache called `name`.
    #[must_use]
    pub fn next_level(&self, name: &str) -> Option<&Cache> {
        let level = *self.names.get(name)?;
        self.next[level].map(|next| &self.levels[next])
    }
}
