//! Lookup tree construction from GSUB subtables.
//!
//! One builder per supported subtable format. Every builder consumes one
//! decoded subtable plus the font's full lookup list (needed to resolve
//! referenced substitution lookups) and produces one `LookupTree`. Rules
//! inside a subtable are built as separate trees and folded with the
//! merger, so conflict resolution is uniform everywhere.

use std::rc::Rc;

use log::warn;

use crate::layout::{ChainContextLookup, Coverage, GlyphKey, LigatureSubst, Lookup, SubstLookup};
use crate::merge;
use crate::tree::{LookupResult, LookupTree, LookupTreeEntry, RangeEntry};

type Substitutions = tinyvec::TinyVec<[Option<u16>; 4]>;

/// Build one tree per subtable of `lookup`, in subtable order.
///
/// Lookup types the engine cannot anchor matches on contribute no trees;
/// fonts routinely mix supported and unsupported constructs so this is not
/// an error.
pub fn build_lookup_trees(lookup: &Lookup, lookups: &[Lookup]) -> Vec<LookupTree> {
    match lookup.subtables {
        SubstLookup::ChainContextSubst(ref subtables) => subtables
            .iter()
            .enumerate()
            .map(|(index, subtable)| build_chain_context(subtable, lookups, index))
            .collect(),
        SubstLookup::LigatureSubst(ref subtables) => subtables
            .iter()
            .enumerate()
            .map(|(index, subtable)| build_ligature(subtable, index))
            .collect(),
        SubstLookup::SingleSubst(_) | SubstLookup::Unsupported => {
            warn!("skipping unsupported lookup type");
            Vec::new()
        }
    }
}

/// A chaining rule normalised to per-position glyph alternatives. The three
/// formats differ only in how this alphabet is derived.
struct Sequence<'a> {
    /// Alternatives per input position, position 0 first. Never empty for a
    /// well-formed rule.
    input: Vec<Vec<GlyphKey>>,
    lookahead: Vec<Vec<GlyphKey>>,
    /// Closest-to-match glyph first.
    backtrack: Vec<Vec<GlyphKey>>,
    lookup_records: &'a [(u16, u16)],
}

pub fn build_chain_context(
    subtable: &ChainContextLookup,
    lookups: &[Lookup],
    index: usize,
) -> LookupTree {
    match subtable {
        ChainContextLookup::Format1 {
            coverage,
            chainsubrulesets,
        } => {
            let mut trees = Vec::new();
            let mut sub_index = 0;
            for (cov_index, glyph) in coverage.glyphs().into_iter().enumerate() {
                let Some(Some(ruleset)) = chainsubrulesets.get(cov_index) else {
                    continue;
                };
                for rule in &ruleset.chainsubrules {
                    let mut input: Vec<Vec<GlyphKey>> = vec![vec![GlyphKey::Single(glyph)]];
                    input.extend(rule.input_sequence.iter().map(|&g| vec![GlyphKey::Single(g)]));
                    let sequence = Sequence {
                        input,
                        lookahead: singles(&rule.lookahead_sequence),
                        backtrack: singles(&rule.backtrack_sequence),
                        lookup_records: &rule.lookup_records,
                    };
                    trees.push(build_sequence(&sequence, lookups, index, sub_index));
                    sub_index += 1;
                }
            }
            merge::merge_trees(trees)
        }
        ChainContextLookup::Format2 {
            coverage,
            backtrack_classdef,
            input_classdef,
            lookahead_classdef,
            chainsubclasssets,
        } => {
            let mut trees = Vec::new();
            let mut sub_index = 0;
            for (class, set) in chainsubclasssets.iter().enumerate() {
                let Some(set) = set else { continue };
                let first = filter_covered(input_classdef.class_keys(class as u16), coverage);
                for rule in &set.chainsubclassrules {
                    let mut input: Vec<Vec<GlyphKey>> = vec![first.clone()];
                    input.extend(
                        rule.input_sequence
                            .iter()
                            .map(|&class| input_classdef.class_keys(class)),
                    );
                    let sequence = Sequence {
                        input,
                        lookahead: rule
                            .lookahead_sequence
                            .iter()
                            .map(|&class| lookahead_classdef.class_keys(class))
                            .collect(),
                        backtrack: rule
                            .backtrack_sequence
                            .iter()
                            .map(|&class| backtrack_classdef.class_keys(class))
                            .collect(),
                        lookup_records: &rule.lookup_records,
                    };
                    trees.push(build_sequence(&sequence, lookups, index, sub_index));
                    sub_index += 1;
                }
            }
            merge::merge_trees(trees)
        }
        ChainContextLookup::Format3 {
            backtrack_coverages,
            input_coverages,
            lookahead_coverages,
            lookup_records,
        } => {
            let sequence = Sequence {
                input: coverage_keys(input_coverages),
                lookahead: coverage_keys(lookahead_coverages),
                backtrack: coverage_keys(backtrack_coverages),
                lookup_records,
            };
            build_sequence(&sequence, lookups, index, 0)
        }
    }
}

fn singles(glyphs: &[u16]) -> Vec<Vec<GlyphKey>> {
    glyphs.iter().map(|&g| vec![GlyphKey::Single(g)]).collect()
}

fn coverage_keys(coverages: &[Rc<Coverage>]) -> Vec<Vec<GlyphKey>> {
    coverages.iter().map(|coverage| coverage.keys()).collect()
}

pub fn build_ligature(subtable: &LigatureSubst, index: usize) -> LookupTree {
    let mut trees = Vec::new();
    let mut sub_index = 0;
    for (cov_index, glyph) in subtable.coverage.glyphs().into_iter().enumerate() {
        let Some(set) = subtable.ligature_sets.get(cov_index) else {
            continue;
        };
        for ligature in &set.ligatures {
            let length = 1 + ligature.component_glyphs.len();
            let mut substitutions = Substitutions::default();
            substitutions.push(Some(ligature.ligature_glyph));
            for _ in &ligature.component_glyphs {
                substitutions.push(None);
            }
            let result = LookupResult {
                substitutions,
                length,
                index,
                sub_index,
                context_range: (0, length as isize),
            };
            // Chain from the last component back to the first glyph.
            let mut entry = LookupTreeEntry {
                lookup: Some(result),
                ..Default::default()
            };
            for &component in ligature.component_glyphs.iter().rev() {
                let mut tree = LookupTree::default();
                tree.individual.insert(component, entry);
                entry = LookupTreeEntry {
                    forward: Some(Box::new(tree)),
                    ..Default::default()
                };
            }
            let mut tree = LookupTree::default();
            tree.individual.insert(glyph, entry);
            trees.push(tree);
            sub_index += 1;
        }
    }
    merge::merge_trees(trees)
}

fn build_sequence(
    sequence: &Sequence<'_>,
    lookups: &[Lookup],
    index: usize,
    sub_index: usize,
) -> LookupTree {
    // Every position must offer at least one glyph or no path can complete.
    let positions = sequence
        .input
        .iter()
        .chain(&sequence.lookahead)
        .chain(&sequence.backtrack);
    if sequence.input.is_empty() || positions.into_iter().any(|alternatives| alternatives.is_empty())
    {
        return LookupTree::default();
    }
    build_forward(sequence, lookups, index, sub_index, 0, &Substitutions::default())
}

fn build_forward(
    sequence: &Sequence<'_>,
    lookups: &[Lookup],
    index: usize,
    sub_index: usize,
    position: usize,
    substitutions: &Substitutions,
) -> LookupTree {
    let input_len = sequence.input.len();
    let last = position + 1 == input_len + sequence.lookahead.len();
    let mut tree = LookupTree::default();
    if position < input_len && position_has_substitution(sequence.lookup_records, position) {
        // Substitution output is per-glyph, so ranges expand to singles.
        for key in &sequence.input[position] {
            for glyph in key.glyphs() {
                let mut substitutions = substitutions.clone();
                substitutions.push(substitution_for(
                    glyph,
                    position,
                    sequence.lookup_records,
                    lookups,
                ));
                let entry = entry_for(sequence, lookups, index, sub_index, position, last, substitutions);
                insert_key(&mut tree, GlyphKey::Single(glyph), entry);
            }
        }
    } else {
        // Pure context (or substitution-free input position): all
        // alternatives share one continuation.
        let mut substitutions = substitutions.clone();
        if position < input_len {
            substitutions.push(None);
        }
        let entry = entry_for(sequence, lookups, index, sub_index, position, last, substitutions);
        let alternatives = if position < input_len {
            &sequence.input[position]
        } else {
            &sequence.lookahead[position - input_len]
        };
        for &key in alternatives {
            insert_key(&mut tree, key, entry.clone());
        }
    }
    tree
}

fn entry_for(
    sequence: &Sequence<'_>,
    lookups: &[Lookup],
    index: usize,
    sub_index: usize,
    position: usize,
    last: bool,
    substitutions: Substitutions,
) -> LookupTreeEntry {
    if !last {
        return LookupTreeEntry {
            forward: Some(Box::new(build_forward(
                sequence,
                lookups,
                index,
                sub_index,
                position + 1,
                &substitutions,
            ))),
            ..Default::default()
        };
    }
    let result = LookupResult {
        substitutions,
        length: sequence.input.len(),
        index,
        sub_index,
        context_range: (
            -(sequence.backtrack.len() as isize),
            (sequence.input.len() + sequence.lookahead.len()) as isize,
        ),
    };
    if sequence.backtrack.is_empty() {
        LookupTreeEntry {
            lookup: Some(result),
            ..Default::default()
        }
    } else {
        LookupTreeEntry {
            reverse: Some(Box::new(build_backtrack(sequence, 0, &result))),
            ..Default::default()
        }
    }
}

// Backtrack context is matched from the glyph before the match start
// walking toward the start of the sequence; the terminal result sits on the
// deepest entry.
fn build_backtrack(sequence: &Sequence<'_>, depth: usize, result: &LookupResult) -> LookupTree {
    let last = depth + 1 == sequence.backtrack.len();
    let mut tree = LookupTree::default();
    for &key in &sequence.backtrack[depth] {
        let entry = if last {
            LookupTreeEntry {
                lookup: Some(result.clone()),
                ..Default::default()
            }
        } else {
            LookupTreeEntry {
                reverse: Some(Box::new(build_backtrack(sequence, depth + 1, result))),
                ..Default::default()
            }
        };
        insert_key(&mut tree, key, entry);
    }
    tree
}

fn insert_key(tree: &mut LookupTree, key: GlyphKey, entry: LookupTreeEntry) {
    match key {
        GlyphKey::Single(glyph) => {
            tree.individual.entry(glyph).or_insert(entry);
        }
        GlyphKey::Range(range) if range.len() == 1 => {
            tree.individual.entry(range.start).or_insert(entry);
        }
        GlyphKey::Range(range) if !range.is_empty() => {
            tree.range.push(RangeEntry { range, entry });
        }
        GlyphKey::Range(_) => {}
    }
}

fn position_has_substitution(lookup_records: &[(u16, u16)], position: usize) -> bool {
    lookup_records
        .iter()
        .any(|&(sequence_index, _)| usize::from(sequence_index) == position)
}

/// Resolve the replacement for `glyph` at input `position` by applying, in
/// record order, every referenced lookup's single substitutions to the
/// running glyph. Records referencing other lookup types contribute
/// nothing.
fn substitution_for(
    glyph: u16,
    position: usize,
    lookup_records: &[(u16, u16)],
    lookups: &[Lookup],
) -> Option<u16> {
    let mut current = glyph;
    let mut changed = false;
    for &(sequence_index, lookup_index) in lookup_records {
        if usize::from(sequence_index) != position {
            continue;
        }
        let Some(lookup) = lookups.get(usize::from(lookup_index)) else {
            continue;
        };
        let SubstLookup::SingleSubst(ref subtables) = lookup.subtables else {
            continue;
        };
        for subtable in subtables {
            if let Some(output) = subtable.apply_glyph(current) {
                current = output;
                changed = true;
                break;
            }
        }
    }
    changed.then_some(current)
}

/// Keep keys fully inside `coverage`; partially covered ranges degrade to
/// the covered singles.
fn filter_covered(keys: Vec<GlyphKey>, coverage: &Coverage) -> Vec<GlyphKey> {
    let mut result = Vec::new();
    for key in keys {
        if key.glyphs().all(|g| coverage.glyph_coverage_value(g).is_some()) {
            result.push(key);
        } else {
            for glyph in key.glyphs() {
                if coverage.glyph_coverage_value(glyph).is_some() {
                    result.push(GlyphKey::Single(glyph));
                }
            }
        }
    }
    result
}
