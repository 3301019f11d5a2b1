//! Average memory access time.
//!
//! All times are in the same (arbitrary) unit, usually cycles.

use super::Cache;

/// Combined miss rate of a split first level.
///
/// `(misses_i + misses_d) / (accesses_i + accesses_d)`, where a missing
/// instruction cache contributes nothing.
#[must_use]
pub fn combined_miss_rate(instruction: Option<&Cache>, data: &Cache) -> Option<f64> {
    let (misses, accesses) = instruction
        .into_iter()
        .chain(std::iter::once(data))
        .fold((0, 0), |(misses, accesses), stats| {
            (misses + stats.misses(), accesses + stats.total_accesses())
        });
    super::ratio(misses, accesses)
}

/// `hit_time + miss_rate * miss_penalty`.
#[must_use]
pub fn amat(hit_time: f64, miss_rate: f64, miss_penalty: f64) -> f64 {
    hit_time + miss_rate * miss_penalty
}

/// AMAT of a split first level backed directly by memory.
#[must_use]
pub fn single_level(
    instruction: Option<&Cache>,
    data: &Cache,
    hit_time: f64,
    miss_penalty: f64,
) -> Option<f64> {
    let miss_rate = combined_miss_rate(instruction, data)?;
    Some(amat(hit_time, miss_rate, miss_penalty))
}

/// AMAT of a split first level backed by a second level.
///
/// The first level miss penalty is itself the AMAT of the second level.
#[must_use]
pub fn two_level(
    instruction: Option<&Cache>,
    data: &Cache,
    l2: &Cache,
    l1_hit_time: f64,
    l2_hit_time: f64,
    l2_miss_penalty: f64,
) -> Option<f64> {
    let l1_miss_rate = combined_miss_rate(instruction, data)?;
    let l2_miss_rate = l2.miss_rate()?;
    let l1_miss_penalty = amat(l2_hit_time, l2_miss_rate, l2_miss_penalty);
    Some(amat(l1_hit_time, l1_miss_rate, l1_miss_penalty))
}
