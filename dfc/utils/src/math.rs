use std::cmp;

fn bits_helper(n: u64, i: u64) -> u64 {
    if n == 0 { i } else { bits_helper(n / 2, i + 1) }
}

/// Number of bits needed to represent a number.
pub fn bits_needed_for(n: u64) -> u64 {
    cmp::max(bits_helper(n.saturating_sub(1), 0), 1)
}

/// Number of bits needed to store the unsigned value `n` itself.
pub fn bits_to_store(n: u64) -> u64 {
    bits_needed_for(n.saturating_add(1))
}

/// `Some(log2(n))` when `n` is a power of two.
pub fn exact_log2(n: u64) -> Option<u32> {
    n.is_power_of_two().then(|| n.trailing_zeros())
}
