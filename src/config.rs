use crate::cache::config::{ReplacementPolicy, WriteAllocatePolicy, WritePolicy};

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid cache {name:?}")]
    InvalidCache {
        name: String,
        source: crate::cache::config::Error,
    },
    #[error("duplicate cache level {0:?}")]
    DuplicateLevel(String),
    #[error("{name:?} uses unknown cache level {next:?} as its next level")]
    UnknownLevel { name: String, next: String },
    #[error("unknown {role} cache {name:?}")]
    UnknownTopLevel { role: &'static str, name: String },
    #[error("cycle in next-level chain: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },
    #[error(transparent)]
    Open(#[from] utils::fs::Error),
    #[error("failed to parse hierarchy config")]
    Parse(#[from] serde_yaml::Error),
}

fn default_write_policy() -> WritePolicy {
    WritePolicy::WRITE_BACK
}

/// Description of a single cache level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cache {
    pub name: String,
    /// Total size in bytes.
    pub size: usize,
    /// Block size in bytes.
    pub block_size: usize,
    pub associativity: usize,
    #[serde(default = "default_write_policy")]
    pub write_policy: WritePolicy,
    /// Defaults to the natural policy of the write policy.
    #[serde(default)]
    pub write_allocate_policy: Option<WriteAllocatePolicy>,
    #[serde(default)]
    pub replacement_policy: ReplacementPolicy,
    /// Name of the next level, `None` for the last level.
    #[serde(default)]
    pub next: Option<String>,
}

impl Cache {
    #[must_use]
    pub fn write_allocate_policy(&self) -> WriteAllocatePolicy {
        self.write_allocate_policy
            .unwrap_or_else(|| self.write_policy.default_write_allocate_policy())
    }
}

/// Latencies used for the average memory access time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Latency {
    /// L1 hit time.
    pub l1_hit_time: f64,
    /// L2 hit time, unused without a second level.
    pub l2_hit_time: f64,
    /// Penalty of a miss in the last level.
    pub memory_penalty: f64,
}

impl Default for Latency {
    fn default() -> Self {
        Self {
            l1_hit_time: 1.0,
            l2_hit_time: 10.0,
            memory_penalty: 100.0,
        }
    }
}

/// A complete cache hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hierarchy {
    pub levels: Vec<Cache>,
    /// Level serving instruction fetches.
    #[serde(default)]
    pub instruction_cache: Option<String>,
    /// Level serving data reads and writes.
    pub data_cache: String,
    #[serde(default)]
    pub latency: Latency,
}

impl Default for Hierarchy {
    /// Split 8 KiB L1 caches over a unified 64 KiB L2.
    fn default() -> Self {
        let l1 = |name: &str, write_policy| Cache {
            name: name.to_string(),
            size: 8 * 1024,
            block_size: 32,
            associativity: 2,
            write_policy,
            write_allocate_policy: None,
            replacement_policy: ReplacementPolicy::LRU,
            next: Some("l2".to_string()),
        };
        Self {
            levels: vec![
                l1("l1i", WritePolicy::WRITE_THROUGH),
                l1("l1d", WritePolicy::WRITE_BACK),
                Cache {
                    name: "l2".to_string(),
                    size: 64 * 1024,
                    block_size: 32,
                    associativity: 8,
                    write_policy: WritePolicy::WRITE_BACK,
                    write_allocate_policy: None,
                    replacement_policy: ReplacementPolicy::LRU,
                    next: None,
                },
            ],
            instruction_cache: Some("l1i".to_string()),
            data_cache: "l1d".to_string(),
            latency: Latency::default(),
        }
    }
}

impl Hierarchy {
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, Error> {
        Ok(serde_yaml::from_reader(reader)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let reader = utils::fs::open_readable(path)?;
        let config = Self::from_reader(reader)?;
        log::debug!("loaded hierarchy with {} levels", config.levels.len());
        Ok(config)
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.levels.iter().position(|level| level.name == name)
    }

    #[must_use]
    pub fn level(&self, name: &str) -> Option<&Cache> {
        self.levels.iter().find(|level| level.name == name)
    }

    pub fn level_mut(&mut self, name: &str) -> Option<&mut Cache> {
        self.levels.iter_mut().find(|level| level.name == name)
    }

    /// Resolves the `next` links of all levels to level positions.
    ///
    /// Fails for duplicate or unknown names and for cyclic chains.
    pub fn next_levels(&self) -> Result<Vec<Option<usize>>, Error> {
        for (i, level) in self.levels.iter().enumerate() {
            if self.levels[..i].iter().any(|other| other.name == level.name) {
                return Err(Error::DuplicateLevel(level.name.clone()));
            }
        }

        let next = self
            .levels
            .iter()
            .map(|level| {
                level
                    .next
                    .as_deref()
                    .map(|next| {
                        self.position(next).ok_or_else(|| Error::UnknownLevel {
                            name: level.name.clone(),
                            next: next.to_string(),
                        })
                    })
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;

        for start in 0..next.len() {
            let mut chain = vec![start];
            let mut current = start;
            while let Some(following) = next[current] {
                if let Some(pos) = chain.iter().position(|&level| level == following) {
                    let chain = chain[pos..]
                        .iter()
                        .chain(std::iter::once(&following))
                        .map(|&level| self.levels[level].name.clone())
                        .collect();
                    return Err(Error::Cycle { chain });
                }
                chain.push(following);
                current = following;
            }
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Hierarchy, Latency};
    use crate::cache::config::{WriteAllocatePolicy, WritePolicy};
    use color_eyre::eyre;

    const TWO_LEVEL: &str = r"
levels:
  - name: l1i
    size: 1024
    block_size: 16
    associativity: 1
    write_policy: WRITE_THROUGH
    next: l2
  - name: l1d
    size: 1024
    block_size: 16
    associativity: 2
    write_allocate_policy: FETCH_ON_WRITE
    next: l2
  - name: l2
    size: 16384
    block_size: 16
    associativity: 4
instruction_cache: l1i
data_cache: l1d
latency:
  l2_hit_time: 12.0
";

    #[test]
    fn test_parse_hierarchy() -> eyre::Result<()> {
        let config = Hierarchy::from_reader(TWO_LEVEL.as_bytes())?;
        assert_eq!(config.levels.len(), 3);
        let l1i = config.level("l1i").unwrap();
        assert_eq!(l1i.write_policy, WritePolicy::WRITE_THROUGH);
        assert_eq!(
            l1i.write_allocate_policy(),
            WriteAllocatePolicy::NO_WRITE_ALLOCATE
        );
        let l1d = config.level("l1d").unwrap();
        assert_eq!(l1d.write_policy, WritePolicy::WRITE_BACK);
        assert_eq!(
            l1d.write_allocate_policy(),
            WriteAllocatePolicy::FETCH_ON_WRITE
        );
        assert_eq!(config.level("l2").unwrap().next, None);
        utils::diff::assert_eq!(
            have: config.latency,
            want: Latency {
                l2_hit_time: 12.0,
                ..Latency::default()
            }
        );
        assert_eq!(config.next_levels()?, vec![Some(2), Some(2), None]);
        Ok(())
    }

    #[test]
    fn test_default_hierarchy_is_valid() -> eyre::Result<()> {
        let config = Hierarchy::default();
        assert_eq!(config.next_levels()?, vec![Some(2), Some(2), None]);
        Ok(())
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = Hierarchy::from_reader("levels: []\ndata_cache: l1d\nfoo: 1\n".as_bytes());
        assert!(matches!(err, Err(Error::Parse(_))));
    }

    #[test]
    fn test_unknown_next_level() {
        let mut config = Hierarchy::default();
        config.level_mut("l1d").unwrap().next = Some("l3".to_string());
        assert!(matches!(
            config.next_levels(),
            Err(Error::UnknownLevel { name, next }) if name == "l1d" && next == "l3"
        ));
    }

    #[test]
    fn test_duplicate_level() {
        let mut config = Hierarchy::default();
        config.levels[0].name = "l2".to_string();
        assert!(matches!(
            config.next_levels(),
            Err(Error::DuplicateLevel(name)) if name == "l2"
        ));
    }

    #[test]
    fn test_cycle() {
        let mut config = Hierarchy::default();
        config.level_mut("l2").unwrap().next = Some("l1d".to_string());
        let err = config.next_levels().unwrap_err();
        assert_eq!(err.to_string(), "cycle in next-level chain: l2 -> l1d -> l2");

        config.level_mut("l2").unwrap().next = Some("l2".to_string());
        assert!(matches!(
            config.next_levels(),
            Err(Error::Cycle { chain }) if chain == vec!["l2".to_string(), "l2".to_string()]
        ));
    }
}
