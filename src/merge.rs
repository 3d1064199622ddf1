//! Priority-ordered merging of lookup trees.
//!
//! A lookup with several subtables (or several rules inside one subtable)
//! produces one tree per alternative; merging folds them into a single tree
//! whose ranges are pairwise disjoint and disjoint from every individual
//! key. Conflicts resolve to the lowest `(index, sub_index)`; ties keep the
//! first-declared entry, so list position is itself the priority order when
//! explicit ranks do not disambiguate.

use itertools::Itertools;

use crate::tree::{GlyphRange, LookupTree, LookupTreeEntry, RangeEntry};

pub fn merge_trees(trees: Vec<LookupTree>) -> LookupTree {
    let mut result = LookupTree::default();
    for tree in trees {
        for (glyph, entry) in tree
            .individual
            .into_iter()
            .sorted_by_key(|&(glyph, _)| glyph)
        {
            insert_individual(&mut result, glyph, entry);
        }
        for range_entry in tree.range {
            insert_range(&mut result, range_entry);
        }
    }
    result
}

// An entry with a terminal lookup outranks one without; two terminals
// compare by (index, sub_index). Equal priority keeps the incumbent.
fn wins(challenger: &LookupTreeEntry, incumbent: &LookupTreeEntry) -> bool {
    match (&challenger.lookup, &incumbent.lookup) {
        (Some(a), Some(b)) => a.priority() < b.priority(),
        (Some(_), None) => true,
        _ => false,
    }
}

fn insert_individual(result: &mut LookupTree, glyph: u16, entry: LookupTreeEntry) {
    if let Some(existing) = result.individual.get_mut(&glyph) {
        if wins(&entry, existing) {
            *existing = entry;
        }
        return;
    }
    if let Some(position) = result.range.iter().position(|re| re.range.contains(glyph)) {
        // Carve the key out of the range; the key holds whichever entry has
        // priority.
        let RangeEntry {
            range,
            entry: range_entry,
        } = result.range.remove(position);
        push_clipped(
            result,
            GlyphRange::new(range.start, glyph),
            range_entry.clone(),
        );
        push_clipped(
            result,
            GlyphRange::new(glyph + 1, range.end),
            range_entry.clone(),
        );
        let winner = if wins(&entry, &range_entry) {
            entry
        } else {
            range_entry
        };
        result.individual.insert(glyph, winner);
        return;
    }
    result.individual.insert(glyph, entry);
}

fn insert_range(result: &mut LookupTree, range_entry: RangeEntry) {
    let RangeEntry { range, entry } = range_entry;
    let mut fragments = vec![range];
    while let Some(fragment) = fragments.pop() {
        if fragment.is_empty() {
            continue;
        }
        // Existing individual keys fragment the incoming range around them.
        let carve = result
            .individual
            .keys()
            .copied()
            .filter(|&glyph| fragment.contains(glyph))
            .min();
        if let Some(glyph) = carve {
            let existing = result.individual.get_mut(&glyph).expect("carved key");
            if wins(&entry, existing) {
                *existing = entry.clone();
            }
            fragments.push(GlyphRange::new(fragment.start, glyph));
            fragments.push(GlyphRange::new(glyph + 1, fragment.end));
            continue;
        }
        if let Some(position) = result
            .range
            .iter()
            .position(|re| re.range.intersects(fragment))
        {
            let existing = result.range[position].clone();
            let overlap = GlyphRange::new(
                fragment.start.max(existing.range.start),
                fragment.end.min(existing.range.end),
            );
            if wins(&entry, &existing.entry) {
                // Incoming range claims the overlap; the incumbent keeps its
                // non-overlapping head and tail.
                result.range.remove(position);
                push_clipped(
                    result,
                    GlyphRange::new(existing.range.start, overlap.start),
                    existing.entry.clone(),
                );
                push_clipped(
                    result,
                    GlyphRange::new(overlap.end, existing.range.end),
                    existing.entry,
                );
                push_clipped(result, overlap, entry.clone());
            }
            fragments.push(GlyphRange::new(fragment.start, overlap.start));
            fragments.push(GlyphRange::new(overlap.end, fragment.end));
            continue;
        }
        push_clipped(result, fragment, entry.clone());
    }
}

// Width-one fragments become individual keys; wider fragments stay ranges.
fn push_clipped(result: &mut LookupTree, range: GlyphRange, entry: LookupTreeEntry) {
    if range.is_empty() {
        return;
    }
    if range.len() == 1 {
        result.individual.insert(range.start, entry);
    } else {
        result.range.push(RangeEntry { range, entry });
    }
}
