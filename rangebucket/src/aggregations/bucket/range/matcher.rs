//! Per-value range lookup over a [`RangeTable`].
//!
//! Ranges may overlap, so no single binary search finds every match.
//! Instead two searches bound a candidate window `[start, end]` that holds
//! every matching index (and possibly some non-matching ones), and a linear
//! scan of that window applies the exact `from <= v < to` test.

use super::table::RangeTable;
use crate::error::{precondition, Result};
use std::ops::RangeInclusive;

impl RangeTable {
    /// Smallest index window guaranteed to contain all ranges holding `value`.
    ///
    /// `None` means nothing can match.
    pub fn candidate_window(&self, value: f64) -> Result<Option<RangeInclusive<usize>>> {
        let ranges = self.ranges();
        let max_to = self.max_to();
        if value.is_nan() {
            return Ok(None);
        }

        // Find any index whose from <= value < max_to. Indices left of `lo`
        // have max_to <= value, indices at or right of `hi` have from > value.
        let (mut lo, mut hi) = (0, ranges.len());
        let mid = loop {
            if lo >= hi {
                return Ok(None);
            }
            let mid = lo + (hi - lo) / 2;
            if value < ranges[mid].from {
                hi = mid;
            } else if value >= max_to[mid] {
                lo = mid + 1;
            } else {
                break mid;
            }
        };

        // First index in [lo, mid] whose max_to exceeds value; max_to[mid] does.
        let start = lo + max_to[lo..=mid].partition_point(|&m| value >= m);
        // Last index in [mid, hi) whose from is <= value; ranges[mid] qualifies.
        let end = mid + ranges[mid..hi].partition_point(|r| r.from <= value) - 1;

        precondition!(
            start == 0 || value >= max_to[start - 1],
            "window start {} drops a candidate for {}",
            start,
            value
        );
        precondition!(
            end + 1 == ranges.len() || value < ranges[end + 1].from,
            "window end {} drops a candidate for {}",
            end,
            value
        );

        Ok(Some(start..=end))
    }

    /// Indices of every range containing `value`, ascending.
    pub fn matching(&self, value: f64) -> Result<Vec<usize>> {
        let Some(window) = self.candidate_window(value)? else {
            return Ok(Vec::new());
        };
        let ranges = self.ranges();
        Ok(window.filter(|&i| ranges[i].matches(value)).collect())
    }
}

/// Ranges already matched by the document being collected.
///
/// A range hit by several values of one document is only counted once. The
/// state must be empty whenever a new document starts.
#[derive(Debug, Clone)]
pub(crate) struct MatchState {
    matched: Vec<bool>,
    list: Vec<usize>,
}

impl MatchState {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            matched: vec![false; len],
            list: Vec::new(),
        }
    }

    /// Marks `ord` as matched; `false` if it already was.
    pub(crate) fn mark(&mut self, ord: usize) -> bool {
        if self.matched[ord] {
            return false;
        }
        self.matched[ord] = true;
        self.list.push(ord);
        true
    }

    /// O(1): `mark` is the only writer, so an empty list means an empty
    /// bitmap. Debug builds also scan the bitmap.
    pub(crate) fn is_clear(&self) -> bool {
        debug_assert!(
            !self.list.is_empty() || !self.matched.contains(&true),
            "matched bitmap set without a matching list entry"
        );
        self.list.is_empty()
    }

    pub(crate) fn reset(&mut self) {
        for ord in self.list.drain(..) {
            self.matched[ord] = false;
        }
    }
}
