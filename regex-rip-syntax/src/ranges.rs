//! Sets of inclusive code-point intervals.
//!
//! A [`RangeSet`] is always kept canonical: its ranges are sorted, disjoint and
//! never touch (adjacent ranges are merged). Every consumer of a set relies on that.

use itertools::Itertools;
use std::fmt::{Display, Formatter};

/// The largest Unicode code point.
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

/// An inclusive interval `from..=to` of code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Range {
    pub from: u32,
    pub to: u32,
}

impl Range {
    pub fn new(from: u32, to: u32) -> Self {
        debug_assert!(from <= to, "range {from}..={to} is out of order");
        Self { from, to }
    }

    pub fn single(code_point: u32) -> Self {
        Self::new(code_point, code_point)
    }

    pub fn contains(&self, code_point: u32) -> bool {
        self.from <= code_point && code_point <= self.to
    }
}

/// Intersects two sorted, disjoint lists of ranges.
///
/// Walks both lists at once: overlapping ranges emit their common part, and whichever
/// range ends first is advanced.
pub fn intersect_ranges(a: &[Range], b: &[Range]) -> Vec<Range> {
    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        let (left, right) = (a[i], b[j]);
        let from = left.from.max(right.from);
        let to = left.to.min(right.to);
        if from <= to {
            result.push(Range { from, to });
        }

        if left.to < right.to {
            i += 1;
        } else {
            j += 1;
        }
    }

    result
}

/// A canonical set of code points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RangeSet {
    ranges: Vec<Range>,
}

impl RangeSet {
    /// Builds a set from arbitrary ranges, sorting and merging them.
    pub fn new(ranges: impl IntoIterator<Item = Range>) -> Self {
        let mut ranges: Vec<Range> = ranges
            .into_iter()
            .filter(|r| r.from <= r.to && r.from <= MAX_CODE_POINT)
            .map(|r| Range {
                from: r.from,
                to: r.to.min(MAX_CODE_POINT),
            })
            .collect();
        ranges.sort_unstable();

        let mut canonical: Vec<Range> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match canonical.last_mut() {
                Some(last) if range.from <= last.to.saturating_add(1) => {
                    last.to = last.to.max(range.to);
                }
                _ => canonical.push(range),
            }
        }

        Self { ranges: canonical }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Every code point, including surrogates.
    pub fn all() -> Self {
        Self::new([Range::new(0, MAX_CODE_POINT)])
    }

    /// Every code point that is a valid `char`.
    pub fn scalar_values() -> Self {
        Self::new([Range::new(0, 0xD7FF), Range::new(0xE000, MAX_CODE_POINT)])
    }

    pub fn range(from: char, to: char) -> Self {
        Self::new([Range::new(from as u32, to as u32)])
    }

    /// `\d`
    pub fn digit() -> Self {
        Self::range('0', '9')
    }

    /// `\w`
    pub fn word() -> Self {
        Self::new([
            Range::new('0' as u32, '9' as u32),
            Range::new('A' as u32, 'Z' as u32),
            Range::single('_' as u32),
            Range::new('a' as u32, 'z' as u32),
        ])
    }

    /// `\s`, the ECMAScript white space and line terminator characters.
    pub fn space() -> Self {
        Self::new([
            Range::new(0x09, 0x0D),
            Range::single(0x20),
            Range::single(0xA0),
            Range::single(0x1680),
            Range::new(0x2000, 0x200A),
            Range::new(0x2028, 0x2029),
            Range::single(0x202F),
            Range::single(0x205F),
            Range::single(0x3000),
            Range::single(0xFEFF),
        ])
    }

    /// `.`, anything but a line terminator.
    pub fn any_but_newline() -> Self {
        Self::new([
            Range::single(0x0A),
            Range::single(0x0D),
            Range::new(0x2028, 0x2029),
        ])
        .complement()
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, code_point: u32) -> bool {
        self.ranges
            .binary_search_by(|r| {
                if r.to < code_point {
                    std::cmp::Ordering::Less
                } else if r.from > code_point {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    pub fn intersect(&self, other: &RangeSet) -> RangeSet {
        // canonical inputs give a canonical output: pieces cut from one range are
        // separated by the gaps of the other set
        RangeSet {
            ranges: intersect_ranges(&self.ranges, &other.ranges),
        }
    }

    /// Whether some code point is in both sets.
    pub fn overlaps(&self, other: &RangeSet) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (left, right) = (self.ranges[i], other.ranges[j]);
            if left.from.max(right.from) <= left.to.min(right.to) {
                return true;
            }
            if left.to < right.to {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    pub fn union(&self, other: &RangeSet) -> RangeSet {
        RangeSet::new(self.ranges.iter().chain(&other.ranges).copied())
    }

    /// All code points in `0..=MAX_CODE_POINT` that are not in this set.
    pub fn complement(&self) -> RangeSet {
        let mut ranges = Vec::with_capacity(self.ranges.len() + 1);
        let mut next = 0u32;
        for range in &self.ranges {
            if range.from > next {
                ranges.push(Range::new(next, range.from - 1));
            }
            next = range.to.saturating_add(1);
        }
        if next <= MAX_CODE_POINT {
            ranges.push(Range::new(next, MAX_CODE_POINT));
        }
        RangeSet { ranges }
    }

    /// A representative character of this set, preferring `[0-9A-Z_a-z]` so that
    /// generated strings stay readable.
    pub fn pick_char(&self) -> Option<char> {
        if let Some(nice) = self.intersect(&RangeSet::word()).ranges.first() {
            return char::from_u32(nice.from);
        }

        self.ranges.iter().find_map(|r| {
            char::from_u32(r.from).or_else(|| {
                // `from` is a surrogate, the first scalar after them may still be inside
                (r.to >= 0xE000).then(|| char::from_u32(0xE000)).flatten()
            })
        })
    }
}

impl From<char> for RangeSet {
    fn from(value: char) -> Self {
        Self::range(value, value)
    }
}

impl From<Range> for RangeSet {
    fn from(value: Range) -> Self {
        Self::new([value])
    }
}

impl FromIterator<Range> for RangeSet {
    fn from_iter<T: IntoIterator<Item = Range>>(iter: T) -> Self {
        Self::new(iter)
    }
}

fn escape(code_point: u32) -> String {
    match char::from_u32(code_point) {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => c.to_string(),
        _ => format!("\\u{code_point:04x}"),
    }
}

impl Display for RangeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "[]");
        }

        let body = self
            .ranges
            .iter()
            .map(|r| {
                if r.from == r.to {
                    escape(r.from)
                } else {
                    format!("{}-{}", escape(r.from), escape(r.to))
                }
            })
            .join("");

        if body.len() > 1 {
            write!(f, "[{body}]")
        } else {
            write!(f, "{body}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn r(from: u32, to: u32) -> Range {
        Range::new(from, to)
    }

    #[test]
    fn intersect_literal_cases() {
        assert_eq!(intersect_ranges(&[r(0, 0xffff)], &[r(10, 11)]), vec![r(10, 11)]);
        assert!(intersect_ranges(&[r(0, 10)], &[r(15, 25)]).is_empty());
        assert_eq!(intersect_ranges(&[r(0, 20)], &[r(15, 25)]), vec![r(15, 20)]);
        assert_eq!(intersect_ranges(&[r(15, 25)], &[r(0, 20)]), vec![r(15, 20)]);
        assert_eq!(
            intersect_ranges(&[r(0, 47), r(49, 96)], &[r(48, 57)]),
            vec![r(49, 57)]
        );
        assert_eq!(
            intersect_ranges(&[r(10, 25)], &[r(0, 15), r(20, 30)]),
            vec![r(10, 15), r(20, 25)]
        );
    }

    #[test]
    fn intersect_laws() {
        let sets = [
            vec![r(0, 0)],
            vec![r(0, 47), r(49, 96)],
            vec![r(10, 25)],
            vec![r(0, 15), r(20, 30)],
            vec![r(5, 5), r(7, 7), r(9, 100)],
            vec![],
        ];

        for a in &sets {
            assert_eq!(&intersect_ranges(a, a), a);
            assert!(intersect_ranges(a, &[]).is_empty());
            for b in &sets {
                assert_eq!(intersect_ranges(a, b), intersect_ranges(b, a));
            }
        }
    }

    #[test]
    fn touching_boundaries() {
        assert_eq!(intersect_ranges(&[r(0, 10)], &[r(10, 20)]), vec![r(10, 10)]);
        assert!(intersect_ranges(&[r(0, 9)], &[r(10, 20)]).is_empty());
        assert_eq!(intersect_ranges(&[r(0, 100)], &[r(40, 60)]), vec![r(40, 60)]);
    }

    #[test]
    fn canonical_construction() {
        let set = RangeSet::new([r(20, 30), r(0, 5), r(6, 10), r(25, 40)]);
        assert_eq!(set.ranges(), &[r(0, 10), r(20, 40)]);
        assert!(RangeSet::new([]).is_empty());
    }

    #[test]
    fn inverted_ranges_are_dropped() {
        let inverted = Range { from: 5, to: 3 };
        assert!(RangeSet::new([inverted]).is_empty());
        assert_eq!(RangeSet::new([inverted, r(1, 1)]).ranges(), &[r(1, 1)]);
        assert!(!RangeSet::new([inverted]).contains(4));
    }

    #[test]
    fn complement_and_union() {
        let set = RangeSet::new([r(0, 9), r(20, 29)]);
        assert_eq!(
            set.complement().ranges(),
            &[r(10, 19), r(30, MAX_CODE_POINT)]
        );
        assert_eq!(set.complement().complement(), set);
        assert_eq!(RangeSet::all().complement(), RangeSet::empty());
        assert_eq!(set.union(&set.complement()), RangeSet::all());
    }

    #[test]
    fn overlaps_and_contains() {
        let digits = RangeSet::digit();
        assert!(digits.overlaps(&RangeSet::word()));
        assert!(!digits.overlaps(&RangeSet::range('a', 'z')));
        assert!(digits.contains('5' as u32));
        assert!(!digits.contains('a' as u32));
        assert!(RangeSet::word().contains('_' as u32));
        assert!(!RangeSet::any_but_newline().contains('\n' as u32));
        assert!(RangeSet::space().contains(0x3000));
    }

    #[test]
    fn picks_readable_characters() {
        assert_eq!(RangeSet::any_but_newline().pick_char(), Some('0'));
        assert_eq!(RangeSet::from(',').pick_char(), Some(','));
        assert_eq!(RangeSet::range('a', 'z').pick_char(), Some('a'));
        assert_eq!(
            RangeSet::new([r(0xD800, 0xE005)]).pick_char(),
            Some('\u{E000}')
        );
        assert_eq!(RangeSet::new([r(0xD800, 0xDFFF)]).pick_char(), None);
        assert_eq!(RangeSet::empty().pick_char(), None);
    }

    #[test]
    fn display() {
        assert_eq!(RangeSet::from('a').to_string(), "a");
        assert_eq!(RangeSet::digit().to_string(), "[0-9]");
        assert_eq!(RangeSet::from(',').to_string(), "[\\u002c]");
        assert_eq!(RangeSet::empty().to_string(), "[]");
    }
}
