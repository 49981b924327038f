//! Unicode character cell width calculations.
//!
//! Line wrapping and held-line truncation work in terminal cells, not bytes,
//! so wide characters (CJK, emoji) never split a row unevenly.

use std::num::NonZeroUsize;
use std::sync::{LazyLock, Mutex};

use lru::LruCache;
use unicode_width::UnicodeWidthChar;

use crate::sync::lock_recover;

/// Minimum string length to cache (shorter strings have minimal overhead).
const CACHE_MIN_LEN: usize = 8;

const CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

static CELL_LEN_CACHE: LazyLock<Mutex<LruCache<String, usize>>> =
    LazyLock::new(|| Mutex::new(LruCache::new(CACHE_CAPACITY)));

/// Get the cell width of a single character.
///
/// Control characters (including `\n` and `\r`) have 0 width.
#[must_use]
pub fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

fn compute_cell_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Get the total cell width of a string (cached for longer strings).
#[must_use]
pub fn cell_len(text: &str) -> usize {
    if text.len() < CACHE_MIN_LEN {
        return compute_cell_width(text);
    }

    if let Some(&cached) = lock_recover(&CELL_LEN_CACHE).get(text) {
        return cached;
    }

    let width = compute_cell_width(text);
    lock_recover(&CELL_LEN_CACHE).put(text.to_string(), width);
    width
}

/// Split `text` so the head occupies at most `max_cells` cells.
///
/// Returns `(head, tail)`. A wide character that would straddle the limit
/// goes to the tail.
#[must_use]
pub fn chop_cells(text: &str, max_cells: usize) -> (&str, &str) {
    let mut width = 0;
    for (idx, c) in text.char_indices() {
        let w = char_width(c);
        if width + w > max_cells {
            return text.split_at(idx);
        }
        width += w;
    }
    (text, "")
}

/// Like [`chop_cells`], but always consumes at least one character when
/// `text` is non-empty so that wrapping loops progress on narrow windows.
#[must_use]
pub fn chop_cells_progressive(text: &str, max_cells: usize) -> (&str, &str) {
    let (head, tail) = chop_cells(text, max_cells);
    if head.is_empty() {
        match text.char_indices().nth(1) {
            Some((idx, _)) => text.split_at(idx),
            None => (text, ""),
        }
    } else {
        (head, tail)
    }
}

/// Truncate `text` to at most `max_cells` cells.
#[must_use]
pub fn truncate_cells(text: &str, max_cells: usize) -> &str {
    chop_cells(text, max_cells).0
}
