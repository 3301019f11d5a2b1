static LOGGER: std::sync::Once = std::sync::Once::new();

pub fn init_logging() {
    LOGGER.call_once(|| {
        env_logger::builder().is_test(true).init();
    });
}

/// Deterministic xorshift sequence covering the whole 32 bit range.
///
/// The sequence is followed by a few edge case addresses.
pub fn addresses(count: usize) -> impl Iterator<Item = crate::address> {
    let mut state: u32 = 0x9E37_79B9;
    std::iter::repeat_with(move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    })
    .take(count)
    .chain([0, 1, 0x7FFF_FFFF, 0x8000_0000, u32::MAX])
}
