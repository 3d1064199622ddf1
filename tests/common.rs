//! Shared test fixtures: an in-memory font collaborator plus GSUB builders.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use fontliga::font::{FontCollection, FontSource};
use fontliga::layout::{
    ChainContextLookup, Coverage, FeatureRecord, FeatureTable, GsubTable, Ligature, LigatureSet,
    LigatureSubst, Lookup, SingleSubst, SubstLookup,
};
use fontliga::tag;

#[derive(Clone)]
pub struct TestFont {
    pub glyph_map: HashMap<char, u16>,
    pub gsub: Option<GsubTable>,
}

impl FontSource for TestFont {
    fn char_to_glyph_index(&self, ch: char) -> u16 {
        self.glyph_map.get(&ch).copied().unwrap_or(0)
    }

    fn gsub(&self) -> Option<&GsubTable> {
        self.gsub.as_ref()
    }
}

pub struct TestFaces {
    pub family: &'static str,
    pub fonts: Vec<TestFont>,
}

impl FontCollection for TestFaces {
    type Font = TestFont;

    fn variants(&self, family: &str) -> Vec<TestFont> {
        if family == self.family {
            self.fonts.clone()
        } else {
            Vec::new()
        }
    }
}

pub fn glyph_map(pairs: &[(char, u16)]) -> HashMap<char, u16> {
    pairs.iter().copied().collect()
}

pub fn coverage(glyphs: &[u16]) -> Rc<Coverage> {
    Rc::new(Coverage::Format1 {
        glyph_array: glyphs.to_vec(),
    })
}

fn coverage_list(sets: &[&[u16]]) -> Vec<Rc<Coverage>> {
    sets.iter().map(|set| coverage(set)).collect()
}

/// A single-subtable format 2 single substitution; `map` pairs are
/// (input glyph, output glyph).
pub fn single_subst_lookup(map: &[(u16, u16)]) -> Lookup {
    let mut sorted = map.to_vec();
    sorted.sort_by_key(|&(from, _)| from);
    Lookup {
        subtables: SubstLookup::SingleSubst(vec![SingleSubst::Format2 {
            coverage: coverage(&sorted.iter().map(|&(from, _)| from).collect::<Vec<_>>()),
            substitute_glyphs: sorted.iter().map(|&(_, to)| to).collect(),
        }]),
    }
}

/// A single-subtable format 3 chaining context lookup over coverage lists.
pub fn chain3_lookup(
    backtrack: &[&[u16]],
    input: &[&[u16]],
    lookahead: &[&[u16]],
    lookup_records: &[(u16, u16)],
) -> Lookup {
    Lookup {
        subtables: SubstLookup::ChainContextSubst(vec![ChainContextLookup::Format3 {
            backtrack_coverages: coverage_list(backtrack),
            input_coverages: coverage_list(input),
            lookahead_coverages: coverage_list(lookahead),
            lookup_records: lookup_records.to_vec(),
        }]),
    }
}

/// A single-subtable ligature lookup; each entry is the full component
/// sequence (first glyph included) and the ligature glyph replacing it.
pub fn liga_lookup(ligatures: &[(&[u16], u16)]) -> Lookup {
    let mut sets: BTreeMap<u16, Vec<Ligature>> = BTreeMap::new();
    for &(components, ligature_glyph) in ligatures {
        sets.entry(components[0]).or_default().push(Ligature {
            ligature_glyph,
            component_glyphs: components[1..].to_vec(),
        });
    }
    Lookup {
        subtables: SubstLookup::LigatureSubst(vec![LigatureSubst {
            coverage: coverage(&sets.keys().copied().collect::<Vec<_>>()),
            ligature_sets: sets
                .into_values()
                .map(|ligatures| LigatureSet { ligatures })
                .collect(),
        }]),
    }
}

/// A GSUB table whose contextual-alternates feature references
/// `calt_lookups` out of the full `lookups` list.
pub fn calt_gsub(calt_lookups: &[u16], lookups: Vec<Lookup>) -> GsubTable {
    GsubTable {
        features: vec![FeatureRecord {
            feature_tag: tag::CALT,
            feature_table: FeatureTable {
                lookup_indices: calt_lookups.to_vec(),
            },
        }],
        lookups,
    }
}
