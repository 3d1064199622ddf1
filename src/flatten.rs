//! Range expansion of lookup trees for query-time matching.
//!
//! Trades memory for O(1) average-case traversal: every range `[a, b)`
//! becomes `b - a` map keys aliasing one shared entry. Acceptable for the
//! glyph counts of real fonts; arbitrarily large synthetic ranges would
//! expand proportionally.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::tree::{FlattenedLookupTree, FlattenedLookupTreeEntry, LookupTree, LookupTreeEntry};

pub fn flatten_tree(tree: &LookupTree) -> FlattenedLookupTree {
    let mut result = FxHashMap::default();
    for (&glyph, entry) in &tree.individual {
        result.insert(glyph, Rc::new(flatten_entry(entry)));
    }
    for range_entry in &tree.range {
        let shared = Rc::new(flatten_entry(&range_entry.entry));
        for glyph in range_entry.range.iter() {
            result.insert(glyph, Rc::clone(&shared));
        }
    }
    result
}

fn flatten_entry(entry: &LookupTreeEntry) -> FlattenedLookupTreeEntry {
    FlattenedLookupTreeEntry {
        lookup: entry.lookup.clone(),
        forward: entry.forward.as_deref().map(flatten_tree),
        reverse: entry.reverse.as_deref().map(flatten_tree),
    }
}
