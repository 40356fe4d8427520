//! Names and IDs for per-test resources.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Nanosecond timestamp, unique enough to suffix resource names in one run.
pub fn unique_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_nanos();
    format!("{nanos}")
}

/// Random string of `n` lowercase ASCII letters.
pub fn rand_string(n: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    (0..n)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Fresh value for the `test-id` label.
pub fn new_test_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// First eight characters of an ID, for embedding in resource names.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
