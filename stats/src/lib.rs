#![allow(non_camel_case_types, clippy::upper_case_acronyms)]

pub mod amat;
pub mod cache;
pub mod mem;

pub use cache::Cache;
pub use mem::AccessKind;

/// Ratio of `part` over `total`, `None` for an empty total.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn ratio(part: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(part as f64 / total as f64)
    }
}
