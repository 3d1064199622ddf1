//! Decoded GSUB layout structures.
//!
//! > The Glyph Substitution (GSUB) table provides data for substition of glyphs for appropriate
//! > rendering of scripts, such as cursively-connecting forms in Arabic script, or for advanced
//! > typographic effects, such as ligatures.
//!
//! — <https://docs.microsoft.com/en-us/typography/opentype/spec/gsub>
//!
//! Binary font parsing happens in an external collaborator; this module only
//! models the already-decoded tables the engine consumes.

use std::rc::Rc;

use crate::tree::GlyphRange;

/// A set of glyphs enumerated from a coverage table or class definition:
/// either a single glyph id or a contiguous half-open range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlyphKey {
    Single(u16),
    Range(GlyphRange),
}

impl GlyphKey {
    pub fn glyphs(self) -> impl Iterator<Item = u16> {
        let range = match self {
            GlyphKey::Single(glyph) => GlyphRange::new(glyph, glyph + 1),
            GlyphKey::Range(range) => range,
        };
        range.iter()
    }
}

#[derive(Clone, Debug)]
pub enum Coverage {
    Format1 {
        /// Glyph ids in numerical order.
        glyph_array: Vec<u16>,
    },
    Format2 {
        coverage_range_array: Vec<CoverageRangeRecord>,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct CoverageRangeRecord {
    pub start_glyph: u16,
    /// Inclusive, as stored in the font.
    pub end_glyph: u16,
    pub start_coverage_index: u16,
}

impl Coverage {
    pub fn glyph_coverage_value(&self, glyph: u16) -> Option<u16> {
        match *self {
            Coverage::Format1 { ref glyph_array } => {
                // The glyph indices must be in numerical order for binary searching of the list.
                // https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#coverage-format-1
                if let Ok(index) = glyph_array.binary_search(&glyph) {
                    Some(index as u16)
                } else {
                    None
                }
            }
            Coverage::Format2 {
                ref coverage_range_array,
            } => {
                for coverage_range in coverage_range_array {
                    if (glyph >= coverage_range.start_glyph) && (glyph <= coverage_range.end_glyph)
                    {
                        return Some(
                            coverage_range.start_coverage_index
                                + (glyph - coverage_range.start_glyph),
                        );
                    }
                }
                None
            }
        }
    }

    /// Covered glyphs as singles/ranges, in coverage-index order.
    pub fn keys(&self) -> Vec<GlyphKey> {
        match self {
            Coverage::Format1 { glyph_array } => glyph_array
                .iter()
                .map(|&glyph| GlyphKey::Single(glyph))
                .collect(),
            Coverage::Format2 {
                coverage_range_array,
            } => coverage_range_array
                .iter()
                .map(|record| {
                    GlyphKey::Range(GlyphRange::new(record.start_glyph, record.end_glyph + 1))
                })
                .collect(),
        }
    }

    /// Every covered glyph individually, in coverage-index order.
    pub fn glyphs(&self) -> Vec<u16> {
        self.keys().iter().flat_map(|key| key.glyphs()).collect()
    }

    pub fn glyph_count(&self) -> usize {
        match self {
            Coverage::Format1 { glyph_array } => glyph_array.len(),
            Coverage::Format2 {
                coverage_range_array,
            } => coverage_range_array
                .iter()
                .fold(0, |acc, coverage_range_record| {
                    acc + (usize::from(coverage_range_record.end_glyph))
                        - (usize::from(coverage_range_record.start_glyph))
                        + 1
                }),
        }
    }
}

#[derive(Clone, Debug)]
pub enum ClassDef {
    Format1 {
        start_glyph: u16,
        class_value_array: Vec<u16>,
    },
    Format2 {
        class_range_array: Vec<ClassRangeRecord>,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct ClassRangeRecord {
    pub start_glyph: u16,
    /// Inclusive, as stored in the font.
    pub end_glyph: u16,
    pub class_value: u16,
}

impl ClassDef {
    pub fn glyph_class_value(&self, glyph: u16) -> u16 {
        match *self {
            ClassDef::Format1 {
                start_glyph,
                ref class_value_array,
            } => {
                if glyph >= start_glyph {
                    let index = usize::from(glyph - start_glyph);
                    class_value_array.get(index).copied().unwrap_or(0)
                } else {
                    0
                }
            }
            ClassDef::Format2 {
                ref class_range_array,
            } => {
                for class_range in class_range_array {
                    if (glyph >= class_range.start_glyph) && (glyph <= class_range.end_glyph) {
                        return class_range.class_value;
                    }
                }
                0
            }
        }
    }

    /// The glyphs assigned to `class`, as singles/ranges.
    ///
    /// Class 0 is the implicit complement of every assigned glyph and cannot
    /// be enumerated; it yields no keys.
    pub fn class_keys(&self, class: u16) -> Vec<GlyphKey> {
        if class == 0 {
            return Vec::new();
        }
        match self {
            ClassDef::Format1 {
                start_glyph,
                class_value_array,
            } => class_value_array
                .iter()
                .enumerate()
                .filter(|(_, &value)| value == class)
                .map(|(i, _)| GlyphKey::Single(start_glyph + i as u16))
                .collect(),
            ClassDef::Format2 { class_range_array } => class_range_array
                .iter()
                .filter(|record| record.class_value == class)
                .map(|record| {
                    GlyphKey::Range(GlyphRange::new(record.start_glyph, record.end_glyph + 1))
                })
                .collect(),
        }
    }
}

/// GSUB Lookup Type 1 Subtable Formats
#[derive(Clone, Debug)]
pub enum SingleSubst {
    Format1 {
        coverage: Rc<Coverage>,
        delta_glyph_id: i16,
    },
    Format2 {
        coverage: Rc<Coverage>,
        /// Substitutes, ordered by coverage index.
        substitute_glyphs: Vec<u16>,
    },
}

impl SingleSubst {
    pub fn apply_glyph(&self, glyph: u16) -> Option<u16> {
        match *self {
            SingleSubst::Format1 {
                ref coverage,
                delta_glyph_id,
            } => coverage
                .glyph_coverage_value(glyph)
                .map(|_| glyph.wrapping_add(delta_glyph_id as u16)),
            SingleSubst::Format2 {
                ref coverage,
                ref substitute_glyphs,
            } => coverage
                .glyph_coverage_value(glyph)
                .and_then(|index| substitute_glyphs.get(usize::from(index)).copied()),
        }
    }
}

/// GSUB Lookup Type 4 Subtable Format 1
#[derive(Clone, Debug)]
pub struct LigatureSubst {
    pub coverage: Rc<Coverage>,
    /// Ligature sets, ordered by coverage index of the first component.
    pub ligature_sets: Vec<LigatureSet>,
}

#[derive(Clone, Debug)]
pub struct LigatureSet {
    pub ligatures: Vec<Ligature>,
}

#[derive(Clone, Debug)]
pub struct Ligature {
    pub ligature_glyph: u16,
    /// Components after the first, in sequence order.
    pub component_glyphs: Vec<u16>,
}

/// GSUB Lookup Type 6 Subtable Formats
#[derive(Clone, Debug)]
pub enum ChainContextLookup {
    Format1 {
        coverage: Rc<Coverage>,
        /// Rule sets, ordered by coverage index; absent offsets decode to `None`.
        chainsubrulesets: Vec<Option<ChainSubRuleSet>>,
    },
    Format2 {
        coverage: Rc<Coverage>,
        backtrack_classdef: Rc<ClassDef>,
        input_classdef: Rc<ClassDef>,
        lookahead_classdef: Rc<ClassDef>,
        /// Rule sets, indexed by the class of the first input glyph.
        chainsubclasssets: Vec<Option<ChainSubClassSet>>,
    },
    Format3 {
        backtrack_coverages: Vec<Rc<Coverage>>,
        input_coverages: Vec<Rc<Coverage>>,
        lookahead_coverages: Vec<Rc<Coverage>>,
        lookup_records: Vec<(u16, u16)>,
    },
}

#[derive(Clone, Debug)]
pub struct ChainSubRuleSet {
    pub chainsubrules: Vec<ChainSubRule>,
}

#[derive(Clone, Debug)]
pub struct ChainSubRule {
    /// Closest glyph first.
    pub backtrack_sequence: Vec<u16>,
    /// Input glyphs after the first (the first is implied by coverage).
    pub input_sequence: Vec<u16>,
    pub lookahead_sequence: Vec<u16>,
    pub lookup_records: Vec<(u16, u16)>,
}

#[derive(Clone, Debug)]
pub struct ChainSubClassSet {
    pub chainsubclassrules: Vec<ChainSubClassRule>,
}

#[derive(Clone, Debug)]
pub struct ChainSubClassRule {
    pub backtrack_sequence: Vec<u16>,
    /// Input classes after the first (the first is implied by the set index).
    pub input_sequence: Vec<u16>,
    pub lookahead_sequence: Vec<u16>,
    pub lookup_records: Vec<(u16, u16)>,
}

/// Subtables of one GSUB lookup, by lookup type.
#[derive(Clone, Debug)]
pub enum SubstLookup {
    SingleSubst(Vec<SingleSubst>),
    LigatureSubst(Vec<LigatureSubst>),
    ChainContextSubst(Vec<ChainContextLookup>),
    /// A lookup type the engine does not build trees for.
    Unsupported,
}

#[derive(Clone, Debug)]
pub struct Lookup {
    pub subtables: SubstLookup,
}

#[derive(Clone, Debug)]
pub struct FeatureTable {
    pub lookup_indices: Vec<u16>,
}

#[derive(Clone, Debug)]
pub struct FeatureRecord {
    pub feature_tag: u32,
    pub feature_table: FeatureTable,
}

/// A decoded GSUB table: feature records plus the full lookup list.
#[derive(Clone, Debug, Default)]
pub struct GsubTable {
    pub features: Vec<FeatureRecord>,
    pub lookups: Vec<Lookup>,
}

impl GsubTable {
    pub fn find_feature(&self, feature_tag: u32) -> Option<&FeatureTable> {
        self.features
            .iter()
            .find(|record| record.feature_tag == feature_tag)
            .map(|record| &record.feature_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage2(ranges: &[(u16, u16, u16)]) -> Coverage {
        Coverage::Format2 {
            coverage_range_array: ranges
                .iter()
                .map(|&(start_glyph, end_glyph, start_coverage_index)| CoverageRangeRecord {
                    start_glyph,
                    end_glyph,
                    start_coverage_index,
                })
                .collect(),
        }
    }

    #[test]
    fn coverage_format1_lookup() {
        let coverage = Coverage::Format1 {
            glyph_array: vec![3, 7, 19],
        };
        assert_eq!(coverage.glyph_coverage_value(7), Some(1));
        assert_eq!(coverage.glyph_coverage_value(8), None);
        assert_eq!(coverage.glyph_count(), 3);
    }

    #[test]
    fn coverage_format2_lookup() {
        let coverage = coverage2(&[(10, 14, 0), (20, 21, 5)]);
        assert_eq!(coverage.glyph_coverage_value(12), Some(2));
        assert_eq!(coverage.glyph_coverage_value(21), Some(6));
        assert_eq!(coverage.glyph_coverage_value(15), None);
        assert_eq!(coverage.glyph_count(), 7);
        assert_eq!(
            coverage.keys(),
            vec![
                GlyphKey::Range(GlyphRange::new(10, 15)),
                GlyphKey::Range(GlyphRange::new(20, 22)),
            ]
        );
    }

    #[test]
    fn classdef_enumeration_skips_class_zero() {
        let classdef = ClassDef::Format2 {
            class_range_array: vec![
                ClassRangeRecord {
                    start_glyph: 5,
                    end_glyph: 9,
                    class_value: 1,
                },
                ClassRangeRecord {
                    start_glyph: 30,
                    end_glyph: 30,
                    class_value: 2,
                },
            ],
        };
        assert_eq!(classdef.glyph_class_value(6), 1);
        assert_eq!(classdef.glyph_class_value(100), 0);
        assert_eq!(
            classdef.class_keys(1),
            vec![GlyphKey::Range(GlyphRange::new(5, 10))]
        );
        assert!(classdef.class_keys(0).is_empty());
    }

    #[test]
    fn single_subst_delta_wraps() {
        let subst = SingleSubst::Format1 {
            coverage: Rc::new(Coverage::Format1 {
                glyph_array: vec![10],
            }),
            delta_glyph_id: -3,
        };
        assert_eq!(subst.apply_glyph(10), Some(7));
        assert_eq!(subst.apply_glyph(11), None);
    }
}
