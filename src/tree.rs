//! Lookup tree data model.
//!
//! A `LookupTree` is the build-time representation of one GSUB lookup: a
//! branching structure over glyph ids where each path spells out a glyph
//! sequence and the terminal entry carries the substitution to apply.
//! `forward` sub-trees continue matching at the next glyph, `reverse`
//! sub-trees continue at the previous glyph (backtrack context).

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tinyvec::TinyVec;

/// Half-open range of glyph ids `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphRange {
    pub start: u16,
    pub end: u16,
}

impl GlyphRange {
    pub fn new(start: u16, end: u16) -> GlyphRange {
        GlyphRange { start, end }
    }

    pub fn contains(self, glyph: u16) -> bool {
        glyph >= self.start && glyph < self.end
    }

    pub fn len(self) -> usize {
        usize::from(self.end.saturating_sub(self.start))
    }

    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    pub fn intersects(self, other: GlyphRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn iter(self) -> impl Iterator<Item = u16> {
        self.start..self.end
    }
}

/// The match produced by a completed lookup path.
///
/// `substitutions[k]` replaces the glyph at relative position `k` from the
/// match start; `None` leaves the glyph unchanged. For a ligature match the
/// consumed component positions are `None` and only position 0 receives the
/// ligature glyph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupResult {
    pub substitutions: TinyVec<[Option<u16>; 4]>,
    /// Number of input glyph positions the match consumes.
    pub length: usize,
    /// Rank of the subtable that produced this result within its lookup.
    pub index: usize,
    /// Rank within the subtable's own construction order.
    pub sub_index: usize,
    /// `[start, end)` offsets relative to the match start; negative values
    /// reach into backtrack context, values beyond `length` into lookahead.
    /// Every cell in this span must be repainted as one unit.
    pub context_range: (isize, isize),
}

impl LookupResult {
    /// Total order used for conflict resolution; lower wins.
    pub fn priority(&self) -> (usize, usize) {
        (self.index, self.sub_index)
    }
}

/// A node of a `LookupTree`. At least one field is always populated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LookupTreeEntry {
    pub lookup: Option<LookupResult>,
    pub forward: Option<Box<LookupTree>>,
    pub reverse: Option<Box<LookupTree>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RangeEntry {
    pub range: GlyphRange,
    pub entry: LookupTreeEntry,
}

/// Branching structure over glyph ids. Individual keys are unique; after
/// construction/merge the ranges do not overlap each other or any
/// individual key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LookupTree {
    pub individual: FxHashMap<u16, LookupTreeEntry>,
    pub range: Vec<RangeEntry>,
}

impl LookupTree {
    pub fn is_empty(&self) -> bool {
        self.individual.is_empty() && self.range.is_empty()
    }
}

/// Query-time form of a lookup tree: every range expanded to single-glyph
/// keys pointing at one shared entry. Read-only after construction.
pub type FlattenedLookupTree = FxHashMap<u16, Rc<FlattenedLookupTreeEntry>>;

#[derive(Debug, PartialEq)]
pub struct FlattenedLookupTreeEntry {
    pub lookup: Option<LookupResult>,
    pub forward: Option<FlattenedLookupTree>,
    pub reverse: Option<FlattenedLookupTree>,
}
