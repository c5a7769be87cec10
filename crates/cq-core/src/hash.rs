//! Hash map aliases and the content hashes used by the detectors.
//!
//! Two kinds of hashing live here:
//!
//! - [`FxHashMap`] / [`FxHashSet`]: in-memory maps keyed by paths and window
//!   hashes. Fx is fast and not DoS-resistant, which is fine for local data.
//! - [`polynomial_hash`] / [`to_base36`]: the cheap window hash used to group
//!   clone candidates. It is deliberately weak; equal buckets are treated as
//!   equal code.
//!
//! Persisted criticism identities use SHA-256 instead, see
//! [`generate_criticism_id`](crate::generate_criticism_id).
//!
//! # Examples
//!
//! ```
//! use cq_core::{polynomial_hash, to_base36, FxHashMap};
//!
//! let mut buckets: FxHashMap<String, usize> = FxHashMap::default();
//! let key = to_base36(polynomial_hash("return xs.reduce((a,b)=>a+b,0);"));
//! *buckets.entry(key).or_default() += 1;
//! assert_eq!(buckets.len(), 1);
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}

/// Computes the 32-bit polynomial string hash `h = h * 31 + c`.
///
/// Arithmetic wraps on signed overflow and runs over UTF-16 code units, so
/// the value matches the classic `(h << 5) - h + charCode` string hash.
///
/// # Examples
///
/// ```
/// use cq_core::polynomial_hash;
///
/// assert_eq!(polynomial_hash(""), 0);
/// assert_eq!(polynomial_hash("a"), 97);
/// assert_eq!(polynomial_hash("ab"), 97 * 31 + 98);
/// ```
#[must_use]
pub fn polynomial_hash(text: &str) -> i32 {
    text.encode_utf16().fold(0_i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

/// Renders a signed integer in base 36 with lowercase digits.
///
/// Negative values keep a leading `-`.
///
/// # Examples
///
/// ```
/// use cq_core::to_base36;
///
/// assert_eq!(to_base36(0), "0");
/// assert_eq!(to_base36(35), "z");
/// assert_eq!(to_base36(36), "10");
/// assert_eq!(to_base36(-123), "-3f");
/// ```
#[must_use]
pub fn to_base36(value: i32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut magnitude = i64::from(value).unsigned_abs();
    if magnitude == 0 {
        return "0".to_owned();
    }

    let mut digits = Vec::with_capacity(8);
    while magnitude > 0 {
        // `magnitude % 36` is always < 36.
        #[allow(clippy::cast_possible_truncation)]
        let digit = (magnitude % 36) as usize;
        digits.push(DIGITS[digit]);
        magnitude /= 36;
    }
    if value < 0 {
        digits.push(b'-');
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
