const GOLDEN_RATIO: u32 = 0x9e3779b9;

pub fn mix32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x21f0aaad);
    x ^= x >> 15;
    x = x.wrapping_mul(0x735a2d97);
    x ^= x >> 15;
    x
}

fn combine(h: u32, value: u32) -> u32 {
    mix32(h.wrapping_add(GOLDEN_RATIO).wrapping_add(value))
}

/// Hashes the UTF-8 bytes of `s`, then folds in the byte length.
pub fn hash_str(s: &str) -> u32 {
    let bytes = s.as_bytes();
    let h = bytes.iter().fold(0, |h, &b| combine(h, b as u32));
    combine(h, bytes.len() as u32)
}

pub fn settings_hash(seed: u32, settings_string: &str) -> u32 {
    hash_str(&format!("{seed}{settings_string}"))
}
