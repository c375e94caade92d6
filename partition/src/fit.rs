//! 空闲区间的计算与选取

use crate::layout::Fit;

/// 一段连续的空闲字节
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub start: i64,
    pub size: i64,
}

/// Free gaps of `[lo, hi)` not covered by `used`, in ascending start order.
///
/// Empty gaps are dropped.
pub fn free_gaps(used: impl IntoIterator<Item = (i64, i64)>, lo: i64, hi: i64) -> Vec<Gap> {
    let mut used: Vec<_> = used.into_iter().collect();
    used.sort_unstable();

    let mut gaps = Vec::new();
    let mut cursor = lo;
    for (start, end) in used {
        if start > cursor {
            gaps.push(Gap {
                start: cursor,
                size: start - cursor,
            });
        }
        cursor = cursor.max(end);
    }
    if hi > cursor {
        gaps.push(Gap {
            start: cursor,
            size: hi - cursor,
        });
    }

    gaps
}

impl Fit {
    /// Picks the gap able to hold `size` bytes.
    /// Ties go to the gap with the lowest start offset.
    pub fn choose(self, gaps: &[Gap], size: i64) -> Option<Gap> {
        let mut fitting = gaps.iter().copied().filter(|gap| gap.size >= size);
        match self {
            Fit::First => fitting.next(),
            Fit::Best => fitting.reduce(|best, gap| if gap.size < best.size { gap } else { best }),
            Fit::Worst => fitting.reduce(|worst, gap| if gap.size > worst.size { gap } else { worst }),
        }
    }
}
