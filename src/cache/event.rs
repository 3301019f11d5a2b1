use crate::{address, tag_array};
use stats::mem::AccessKind;

/// Requests a single access sends to the next level.
///
/// At most a write-back followed by a fetch.
pub type Events = smallvec::SmallVec<[Event; 2]>;

#[must_use]
pub fn was_write_sent(events: &[Event]) -> bool {
    events
        .iter()
        .any(|event| matches!(event, Event::WriteRequestSent { .. }))
}

#[must_use]
pub fn was_writeback_sent(events: &[Event]) -> Option<&tag_array::EvictedBlockInfo> {
    events.iter().find_map(|event| match event {
        Event::WriteBackRequestSent { evicted_block } => Some(evicted_block),
        _ => None,
    })
}

#[must_use]
pub fn was_read_sent(events: &[Event]) -> bool {
    events
        .iter()
        .any(|event| matches!(event, Event::ReadRequestSent { .. }))
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Event {
    /// A dirty victim was evicted and must be written to the next level.
    WriteBackRequestSent {
        evicted_block: tag_array::EvictedBlockInfo,
    },
    /// The block is fetched from the next level.
    ReadRequestSent { addr: address },
    /// The write is passed on to the next level.
    WriteRequestSent { addr: address },
}

impl Event {
    /// The request this event issues to the next level.
    #[must_use]
    pub fn request(&self) -> (address, AccessKind) {
        match self {
            Event::WriteBackRequestSent { evicted_block } => {
                (evicted_block.block_addr, AccessKind::WRBK_ACC)
            }
            Event::ReadRequestSent { addr } => (*addr, AccessKind::FETCH_ACC_R),
            Event::WriteRequestSent { addr } => (*addr, AccessKind::WRITE_ACC_W),
        }
    }
}
