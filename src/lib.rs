#![allow(
    clippy::upper_case_acronyms,
    non_camel_case_types,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

pub mod addrdec;
pub mod cache;
pub mod config;
pub mod memory_system;
pub mod report;
pub mod tag_array;
pub mod trace;

#[cfg(test)]
pub mod testing;

pub use memory_system::MemorySystem;

/// Addresses are unsigned 32 bit.
pub type address = u32;
