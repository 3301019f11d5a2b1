//! Human and machine readable reports of a simulation run.

use crate::{
    cache::{
        config::{WriteAllocatePolicy, WritePolicy},
        Cache, RequestStatus,
    },
    config::Latency,
    trace::Summary,
    MemorySystem,
};
use stats::mem::AccessKind;

use console::style;
use serde::Serialize;
use std::io::Write;
use strum::IntoEnumIterator;

/// Hits and misses of one kind of access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindCount {
    pub kind: AccessKind,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelReport {
    pub name: String,
    pub size: usize,
    pub block_size: usize,
    pub associativity: usize,
    pub num_blocks: usize,
    pub num_sets: usize,
    pub offset_bits: u32,
    pub index_bits: u32,
    pub tag_bits: u32,
    pub write_policy: WritePolicy,
    pub write_allocate_policy: WriteAllocatePolicy,
    pub accesses: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: Option<f64>,
    /// Only kinds that were seen.
    pub counts: Vec<KindCount>,
}

impl From<&Cache> for LevelReport {
    fn from(cache: &Cache) -> Self {
        let geometry = cache.geometry();
        let counts = AccessKind::iter()
            .map(|kind| KindCount {
                kind,
                hits: cache.stats.count(kind, RequestStatus::HIT),
                misses: cache.stats.count(kind, RequestStatus::MISS),
            })
            .filter(|count| count.hits + count.misses > 0)
            .collect();
        Self {
            name: cache.name.clone(),
            size: geometry.size,
            block_size: geometry.block_size,
            associativity: geometry.associativity,
            num_blocks: geometry.num_blocks,
            num_sets: geometry.num_sets,
            offset_bits: geometry.offset_bits,
            index_bits: geometry.index_bits,
            tag_bits: geometry.tag_bits,
            write_policy: cache.cache_config.write_policy,
            write_allocate_policy: cache.cache_config.write_allocate_policy,
            accesses: cache.accesses(),
            hits: cache.hits(),
            misses: cache.misses(),
            hit_rate: cache.stats.hit_rate(),
            counts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub references: usize,
    pub skipped: usize,
    pub levels: Vec<LevelReport>,
    pub amat: Option<f64>,
}

impl Report {
    #[must_use]
    pub fn new(system: &MemorySystem, latency: &Latency, summary: Summary) -> Self {
        Self {
            references: summary.references,
            skipped: summary.skipped,
            levels: system.levels().iter().map(LevelReport::from).collect(),
            amat: amat(system, latency),
        }
    }
}

/// Average memory access time of the hierarchy.
///
/// Uses the two level formula when the data cache has a next level.
/// `None` when the first level saw no accesses, or the second level
/// saw none.
#[must_use]
pub fn amat(system: &MemorySystem, latency: &Latency) -> Option<f64> {
    let instruction = system.instruction_cache().map(|cache| &cache.stats);
    let data = system.data_cache();
    match system.next_level(&data.name) {
        Some(l2) => stats::amat::two_level(
            instruction,
            &data.stats,
            &l2.stats,
            latency.l1_hit_time,
            latency.l2_hit_time,
            latency.memory_penalty,
        ),
        None => stats::amat::single_level(
            instruction,
            &data.stats,
            latency.l1_hit_time,
            latency.memory_penalty,
        ),
    }
}

fn percent(rate: Option<f64>) -> String {
    rate.map_or_else(|| "-".to_string(), |rate| format!("{:.2}%", rate * 100.0))
}

pub fn write_text(report: &Report, mut writer: impl Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "{} references, {} lines skipped",
        report.references, report.skipped
    )?;
    for level in &report.levels {
        writeln!(writer)?;
        writeln!(
            writer,
            "{} {} ({} byte blocks, {}-way, {} / {})",
            style(&level.name).bold().cyan(),
            human_bytes::human_bytes(level.size as f64),
            level.block_size,
            level.associativity,
            level.write_policy,
            level.write_allocate_policy,
        )?;
        writeln!(
            writer,
            "  blocks={} sets={} tag bits={} index bits={} offset bits={}",
            level.num_blocks, level.num_sets, level.tag_bits, level.index_bits, level.offset_bits
        )?;
        writeln!(
            writer,
            "  accesses={} hits={} misses={} hit rate={}",
            level.accesses,
            level.hits,
            level.misses,
            percent(level.hit_rate)
        )?;
        for count in &level.counts {
            writeln!(
                writer,
                "  {:<12} hits={:<10} misses={}",
                count.kind.to_string(),
                count.hits,
                count.misses
            )?;
        }
    }
    writeln!(writer)?;
    match report.amat {
        Some(amat) => writeln!(writer, "{} {amat:.4}", style("AMAT").bold())?,
        None => writeln!(writer, "{} -", style("AMAT").bold())?,
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct CountRow<'a> {
    level: &'a str,
    kind: AccessKind,
    status: RequestStatus,
    count: u64,
}

/// One row per level, access kind and outcome.
pub fn write_csv(system: &MemorySystem, writer: impl Write) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for cache in system.levels() {
        for ((kind, status), count) in cache.stats.clone().flatten() {
            writer.serialize(CountRow {
                level: &cache.name,
                kind,
                status,
                count,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json(report: &Report, writer: impl Write) -> Result<(), serde_json::Error> {
    serde_json::to_writer_pretty(writer, report)
}

/// Prints every line of a cache as a table.
pub fn write_lines(cache: &Cache, mut writer: impl Write) -> std::io::Result<()> {
    writeln!(writer, "{}", style(&cache.name).bold().cyan())?;
    writeln!(
        writer,
        "{:>6} {:>4} {:>5} {:>10} {:>7} {:>5}",
        "set", "way", "valid", "tag", "recency", "dirty"
    )?;
    for line in cache.lines() {
        writeln!(
            writer,
            "{:>6} {:>4} {:>5} {:>#10x} {:>7} {:>5}",
            line.set, line.way, line.valid, line.tag, line.recency, line.dirty
        )?;
    }
    Ok(())
}

/// Results of one associativity in a sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub associativity: usize,
    pub instruction_accesses: Option<u64>,
    pub instruction_misses: Option<u64>,
    pub instruction_hit_rate: Option<f64>,
    pub data_accesses: u64,
    pub data_misses: u64,
    pub data_hit_rate: Option<f64>,
    pub l2_accesses: Option<u64>,
    pub l2_misses: Option<u64>,
    pub l2_hit_rate: Option<f64>,
    pub amat: Option<f64>,
}

impl SweepRow {
    #[must_use]
    pub fn new(associativity: usize, system: &MemorySystem, latency: &Latency) -> Self {
        let instruction = system.instruction_cache();
        let data = system.data_cache();
        let l2 = system.next_level(&data.name);
        Self {
            associativity,
            instruction_accesses: instruction.map(Cache::accesses),
            instruction_misses: instruction.map(Cache::misses),
            instruction_hit_rate: instruction.and_then(|cache| cache.stats.hit_rate()),
            data_accesses: data.accesses(),
            data_misses: data.misses(),
            data_hit_rate: data.stats.hit_rate(),
            l2_accesses: l2.map(Cache::accesses),
            l2_misses: l2.map(Cache::misses),
            l2_hit_rate: l2.and_then(|cache| cache.stats.hit_rate()),
            amat: amat(system, latency),
        }
    }
}
