//! Sequence walking over flattened lookup trees.
//!
//! An explicit loop over an immutable structure plus a best-result-so-far;
//! no recursion, no suspension. Tie-break rule: no result loses to any
//! result, and between two results the lower `(index, sub_index)` wins.

use crate::tree::{FlattenedLookupTree, LookupResult};

/// Find the best substitution for the glyph run anchored at `start_index`.
/// `index` is the position of the next glyph to match; callers pass it
/// equal to `start_index` when walking from the root.
pub fn walk(
    tree: &FlattenedLookupTree,
    sequence: &[u16],
    start_index: usize,
    index: usize,
) -> Option<LookupResult> {
    let mut best: Option<LookupResult> = None;
    let mut current = tree;
    let mut index = index;
    loop {
        let glyph = match sequence.get(index) {
            Some(&glyph) => glyph,
            None => return best,
        };
        let entry = match current.get(&glyph) {
            Some(entry) => entry,
            None => return best,
        };
        fold_best(&mut best, entry.lookup.as_ref());
        if let Some(reverse) = &entry.reverse {
            walk_back(reverse, sequence, start_index, &mut best);
        }
        match &entry.forward {
            Some(forward) if index + 1 < sequence.len() => {
                current = forward;
                index += 1;
            }
            _ => return best,
        }
    }
}

// Backtrack context: walk toward the start of the sequence from the glyph
// before the match start, following reverse links while they exist.
fn walk_back(
    tree: &FlattenedLookupTree,
    sequence: &[u16],
    start_index: usize,
    best: &mut Option<LookupResult>,
) {
    let mut current = tree;
    let mut index = start_index;
    loop {
        if index == 0 {
            return;
        }
        index -= 1;
        let entry = match current.get(&sequence[index]) {
            Some(entry) => entry,
            None => return,
        };
        fold_best(best, entry.lookup.as_ref());
        match &entry.reverse {
            Some(reverse) => current = reverse,
            None => return,
        }
    }
}

fn fold_best(best: &mut Option<LookupResult>, candidate: Option<&LookupResult>) {
    if let Some(candidate) = candidate {
        let better = match best {
            Some(current) => candidate.priority() < current.priority(),
            None => true,
        };
        if better {
            *best = Some(candidate.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use rustc_hash::FxHashMap;

    use super::*;
    use crate::tree::FlattenedLookupTreeEntry;

    fn result(index: usize, sub_index: usize) -> LookupResult {
        LookupResult {
            substitutions: [Some(1)].into_iter().collect(),
            length: 1,
            index,
            sub_index,
            context_range: (0, 1),
        }
    }

    fn entry(
        lookup: Option<LookupResult>,
        forward: Option<FlattenedLookupTree>,
        reverse: Option<FlattenedLookupTree>,
    ) -> Rc<FlattenedLookupTreeEntry> {
        Rc::new(FlattenedLookupTreeEntry {
            lookup,
            forward,
            reverse,
        })
    }

    fn tree(entries: Vec<(u16, Rc<FlattenedLookupTreeEntry>)>) -> FlattenedLookupTree {
        let mut map = FxHashMap::default();
        for (glyph, e) in entries {
            map.insert(glyph, e);
        }
        map
    }

    #[test]
    fn no_match_returns_none() {
        let root = tree(vec![(5, entry(Some(result(0, 0)), None, None))]);
        assert_eq!(walk(&root, &[9], 0, 0), None);
    }

    #[test]
    fn deeper_lower_priority_result_wins() {
        // (2,0) at the first glyph, (1,3) one glyph further: lower tuple
        // must win even though it is found later
        let forward = tree(vec![(6, entry(Some(result(1, 3)), None, None))]);
        let root = tree(vec![(5, entry(Some(result(2, 0)), Some(forward), None))]);
        let best = walk(&root, &[5, 6], 0, 0).expect("match");
        assert_eq!(best.priority(), (1, 3));
    }

    #[test]
    fn earlier_lower_priority_result_survives_descent() {
        let forward = tree(vec![(6, entry(Some(result(2, 0)), None, None))]);
        let root = tree(vec![(5, entry(Some(result(1, 3)), Some(forward), None))]);
        let best = walk(&root, &[5, 6], 0, 0).expect("match");
        assert_eq!(best.priority(), (1, 3));
    }

    #[test]
    fn reverse_path_results_fold_into_best() {
        // backtrack match carries (1,3); the forward entry only (2,0)
        let reverse = tree(vec![(4, entry(Some(result(1, 3)), None, None))]);
        let root = tree(vec![(5, entry(Some(result(2, 0)), None, Some(reverse)))]);
        let best = walk(&root, &[4, 5], 1, 1).expect("match");
        assert_eq!(best.priority(), (1, 3));
    }

    #[test]
    fn reverse_walk_stops_at_sequence_start() {
        let reverse = tree(vec![(4, entry(Some(result(0, 0)), None, None))]);
        let root = tree(vec![(5, entry(None, None, Some(reverse)))]);
        // anchored at position 0 there is no backtrack glyph to match
        assert_eq!(walk(&root, &[5, 4], 0, 0), None);
    }

    #[test]
    fn partial_forward_match_keeps_best_so_far() {
        let forward = tree(vec![(6, entry(Some(result(0, 0)), None, None))]);
        let root = tree(vec![(5, entry(Some(result(3, 1)), Some(forward), None))]);
        // second glyph does not continue the path; the first entry's result
        // stands
        let best = walk(&root, &[5, 9], 0, 0).expect("match");
        assert_eq!(best.priority(), (3, 1));
    }
}
