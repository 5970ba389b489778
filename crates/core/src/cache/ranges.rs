//! Pure index arithmetic for Redis-style list ranges.
//!
//! Shared by in-process list implementations so LRANGE and LTRIM agree on
//! which elements a `[start, stop]` pair selects.

use std::ops::Range;

/// Resolves a Redis-style inclusive `[start, stop]` pair against a list of
/// `len` elements, returning the half-open range of selected indices.
///
/// Negative indices count from the end. Out-of-range bounds are clamped the
/// way Redis clamps them. Returns `None` when the selection is empty.
///
/// # Examples
///
/// ```
/// use usercache_core::cache::resolve_range;
///
/// assert_eq!(resolve_range(5, 0, -1), Some(0..5));
/// assert_eq!(resolve_range(5, 3, -1), Some(3..5));
/// assert_eq!(resolve_range(5, 5, -1), None);
/// ```
pub fn resolve_range(len: usize, start: i64, stop: i64) -> Option<Range<usize>> {
    if len == 0 {
        return None;
    }
    let len = len as i64;

    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if start >= len || stop < 0 || start > stop {
        return None;
    }

    Some(start as usize..(stop + 1) as usize)
}
