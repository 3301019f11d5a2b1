use serde::{Deserialize, Serialize};

/// Kind of a request arriving at a cache level.
///
/// Top level caches see the references of the trace (`INST_ACC_R`,
/// `DATA_ACC_R`, `DATA_ACC_W`), lower levels see the traffic generated
/// by the level above them.
#[derive(
    Debug,
    strum::EnumIter,
    strum::Display,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub enum AccessKind {
    INST_ACC_R,
    DATA_ACC_R,
    DATA_ACC_W,
    /// Block fetch issued by an upper level on a miss.
    FETCH_ACC_R,
    /// Write forwarded by an upper write-through level.
    WRITE_ACC_W,
    /// Dirty block written back by an upper write-back level.
    WRBK_ACC,
}

impl AccessKind {
    #[must_use]
    pub fn is_write(self) -> bool {
        match self {
            AccessKind::INST_ACC_R | AccessKind::DATA_ACC_R | AccessKind::FETCH_ACC_R => false,
            AccessKind::DATA_ACC_W | AccessKind::WRITE_ACC_W | AccessKind::WRBK_ACC => true,
        }
    }
}
