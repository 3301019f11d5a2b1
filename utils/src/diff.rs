//! Structural assertions with a readable diff on failure.
//!
//! ```
//! utils::diff::assert_eq!(have: vec![1, 2], want: vec![1, 2]);
//! ```

pub use similar_asserts;
pub use similar_asserts::assert_eq;
