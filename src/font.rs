//! Ligature engine font facade.
//!
//! A `Font` owns, per GSUB lookup referenced by the contextual-alternates
//! feature, a flattened lookup tree built once at load time, plus the
//! per-instance caches: a glyph → relevant-lookup reverse index, a
//! code-point → glyph-id map, and a bounded LRU cache of query results.
//!
//! A `Font` instance is single-threaded; trees are immutable after load and
//! the caches use interior mutability.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use itertools::Itertools;
use log::{debug, warn};
use lru::LruCache;
use rustc_hash::FxHashMap;

use crate::error::LoadError;
use crate::flatten;
use crate::layout::{GsubTable, SubstLookup};
use crate::merge;
use crate::processor;
use crate::tag;
use crate::tag::DisplayTag;
use crate::tree::FlattenedLookupTree;
use crate::walk;

/// Access to the already-parsed font the engine answers queries for.
pub trait FontSource {
    /// Map a character to the font's glyph id for it.
    fn char_to_glyph_index(&self, ch: char) -> u16;
    /// The decoded GSUB table, if the font has one.
    fn gsub(&self) -> Option<&GsubTable>;
}

/// Font discovery: resolve a family name to its loadable variants. Supplying
/// a different implementation is the injection point for tests and
/// alternate discovery backends.
pub trait FontCollection {
    type Font: FontSource;
    fn variants(&self, family: &str) -> Vec<Self::Font>;
}

#[derive(Clone, Copy, Debug)]
pub struct FontOptions {
    /// Maximum total characters retained across cached query strings;
    /// 0 disables result caching.
    pub cache_size: usize,
}

impl Default for FontOptions {
    fn default() -> FontOptions {
        FontOptions { cache_size: 0 }
    }
}

/// The immutable result of one ligature query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LigatureData {
    pub input_glyphs: Vec<u16>,
    /// Same length as the input; positions that were not substituted keep
    /// their input glyph.
    pub output_glyphs: Vec<u16>,
    /// Sorted, non-overlapping spans that must be rendered as one unit.
    pub context_ranges: Vec<Range<usize>>,
}

struct LookupCacheItem {
    tree: FlattenedLookupTree,
    /// Ligature-type lookups are matched scanning the sequence backward;
    /// all others forward.
    process_forward: bool,
}

pub struct Font<T: FontSource> {
    source: T,
    lookups: Vec<LookupCacheItem>,
    glyph_lookups: FxHashMap<u16, Vec<usize>>,
    glyph_cache: RefCell<FxHashMap<char, u16>>,
    result_cache: Option<RefCell<ResultCache>>,
}

/// Load the first variant the collection resolves for `family`.
pub fn load_font<C: FontCollection>(
    collection: &C,
    family: &str,
    options: FontOptions,
) -> Result<Font<C::Font>, LoadError> {
    let mut variants = collection.variants(family);
    if variants.is_empty() {
        return Err(LoadError::FontNotFound(family.to_owned()));
    }
    Ok(Font::new(variants.remove(0), options))
}

impl<T: FontSource> Font<T> {
    pub fn new(source: T, options: FontOptions) -> Font<T> {
        let mut lookups = Vec::new();
        let mut glyph_lookups: FxHashMap<u16, Vec<usize>> = FxHashMap::default();
        if let Some(gsub) = source.gsub() {
            if let Some(feature) = gsub.find_feature(tag::CALT) {
                for &lookup_index in &feature.lookup_indices {
                    let lookup = match gsub.lookups.get(usize::from(lookup_index)) {
                        Some(lookup) => lookup,
                        None => {
                            warn!("feature references missing lookup {}", lookup_index);
                            continue;
                        }
                    };
                    let trees = processor::build_lookup_trees(lookup, &gsub.lookups);
                    let tree = flatten::flatten_tree(&merge::merge_trees(trees));
                    if tree.is_empty() {
                        continue;
                    }
                    let process_forward =
                        !matches!(lookup.subtables, SubstLookup::LigatureSubst(_));
                    for &glyph in tree.keys() {
                        glyph_lookups.entry(glyph).or_default().push(lookups.len());
                    }
                    lookups.push(LookupCacheItem {
                        tree,
                        process_forward,
                    });
                }
            } else {
                debug!("font has no '{}' feature", DisplayTag(tag::CALT));
            }
        }
        let result_cache =
            (options.cache_size > 0).then(|| RefCell::new(ResultCache::new(options.cache_size)));
        Font {
            source,
            lookups,
            glyph_lookups,
            glyph_cache: RefCell::new(FxHashMap::default()),
            result_cache,
        }
    }

    pub fn source(&self) -> &T {
        &self.source
    }

    pub(crate) fn has_lookups(&self) -> bool {
        !self.lookups.is_empty()
    }

    pub(crate) fn glyph_index(&self, ch: char) -> u16 {
        if let Some(&glyph) = self.glyph_cache.borrow().get(&ch) {
            return glyph;
        }
        let glyph = self.source.char_to_glyph_index(ch);
        self.glyph_cache.borrow_mut().insert(ch, glyph);
        glyph
    }

    /// Substitute ligatures and contextual alternates in the glyph
    /// sequence mapped from `text`.
    pub fn find_ligatures(&self, text: &str) -> LigatureData {
        let input_glyphs: Vec<u16> = text.chars().map(|ch| self.glyph_index(ch)).collect();
        if self.lookups.is_empty() {
            return LigatureData {
                output_glyphs: input_glyphs.clone(),
                input_glyphs,
                context_ranges: Vec::new(),
            };
        }
        if let Some(cache) = &self.result_cache {
            if let Some(data) = cache.borrow_mut().get(text) {
                return (*data).clone();
            }
        }
        let mut output_glyphs = input_glyphs.clone();
        let context_ranges = self.find_internal(&mut output_glyphs);
        let data = LigatureData {
            input_glyphs,
            output_glyphs,
            context_ranges,
        };
        if let Some(cache) = &self.result_cache {
            cache.borrow_mut().put(text, Rc::new(data.clone()));
        }
        data
    }

    /// Only the spans that must be rendered as one unit.
    pub fn find_ligature_ranges(&self, text: &str) -> Vec<Range<usize>> {
        if self.lookups.is_empty() {
            return Vec::new();
        }
        self.find_ligatures(text).context_ranges
    }

    /// Substitute in place and return the merged context ranges.
    pub(crate) fn find_internal(&self, sequence: &mut [u16]) -> Vec<Range<usize>> {
        let mut ranges: Vec<Range<usize>> = Vec::new();
        let relevant: Vec<usize> = sequence
            .iter()
            .filter_map(|glyph| self.glyph_lookups.get(glyph))
            .flatten()
            .copied()
            .sorted()
            .dedup()
            .collect();
        for lookup_id in relevant {
            let item = &self.lookups[lookup_id];
            if item.process_forward {
                let mut i = 0;
                while i < sequence.len() {
                    i += self.apply_at(item, sequence, i, &mut ranges);
                }
            } else {
                // Consumed positions lie ahead of the anchor, so the
                // backward scan has nothing extra to skip.
                let mut i = sequence.len();
                while i > 0 {
                    i -= 1;
                    self.apply_at(item, sequence, i, &mut ranges);
                }
            }
        }
        ranges
    }

    // Apply the best match anchored at `i`; returns how far the forward
    // scan advances. A match whose substitutions change nothing records no
    // range and does not skip ahead.
    fn apply_at(
        &self,
        item: &LookupCacheItem,
        sequence: &mut [u16],
        i: usize,
        ranges: &mut Vec<Range<usize>>,
    ) -> usize {
        let result = match walk::walk(&item.tree, sequence, i, i) {
            Some(result) => result,
            None => return 1,
        };
        let changed = result
            .substitutions
            .iter()
            .enumerate()
            .any(|(offset, subst)| match subst {
                Some(glyph) => sequence.get(i + offset) != Some(glyph),
                None => false,
            });
        if !changed {
            return 1;
        }
        for (offset, subst) in result.substitutions.iter().enumerate() {
            if let (Some(glyph), Some(slot)) = (subst, sequence.get_mut(i + offset)) {
                *slot = *glyph;
            }
        }
        let start = (i as isize + result.context_range.0) as usize;
        let end = (i as isize + result.context_range.1) as usize;
        merge_range(ranges, start..end.min(sequence.len()));
        result.length.max(1)
    }
}

// Insert into a sorted, non-overlapping range list, absorbing overlapping
// and adjacent spans.
fn merge_range(ranges: &mut Vec<Range<usize>>, new: Range<usize>) {
    if new.start >= new.end {
        return;
    }
    let mut merged = new;
    let mut i = 0;
    while i < ranges.len() {
        let existing = ranges[i].clone();
        if existing.start <= merged.end && merged.start <= existing.end {
            merged.start = merged.start.min(existing.start);
            merged.end = merged.end.max(existing.end);
            ranges.remove(i);
        } else {
            i += 1;
        }
    }
    let position = ranges
        .iter()
        .position(|r| r.start > merged.start)
        .unwrap_or(ranges.len());
    ranges.insert(position, merged);
}

// Bounded by total cached characters rather than entry count; least
// recently used strings evicted first.
struct ResultCache {
    entries: LruCache<String, Rc<LigatureData>>,
    total_chars: usize,
    capacity: usize,
}

impl ResultCache {
    fn new(capacity: usize) -> ResultCache {
        ResultCache {
            entries: LruCache::unbounded(),
            total_chars: 0,
            capacity,
        }
    }

    fn get(&mut self, text: &str) -> Option<Rc<LigatureData>> {
        self.entries.get(text).cloned()
    }

    fn put(&mut self, text: &str, data: Rc<LigatureData>) {
        let cost = text.chars().count();
        if cost > self.capacity {
            return;
        }
        if self.entries.put(text.to_owned(), data).is_none() {
            self.total_chars += cost;
        }
        while self.total_chars > self.capacity {
            match self.entries.pop_lru() {
                Some((evicted, _)) => self.total_chars -= evicted.chars().count(),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(glyph: u16) -> Rc<LigatureData> {
        Rc::new(LigatureData {
            input_glyphs: vec![glyph],
            output_glyphs: vec![glyph],
            context_ranges: Vec::new(),
        })
    }

    #[test]
    fn merge_range_absorbs_overlap_and_adjacency() {
        let mut ranges = Vec::new();
        merge_range(&mut ranges, 5..7);
        merge_range(&mut ranges, 0..2);
        merge_range(&mut ranges, 7..9);
        assert_eq!(ranges, vec![0..2, 5..9]);
        merge_range(&mut ranges, 1..6);
        assert_eq!(ranges, vec![0..9]);
    }

    #[test]
    fn result_cache_evicts_least_recent_past_char_capacity() {
        let mut cache = ResultCache::new(8);
        cache.put("abcd", data(1));
        cache.put("efgh", data(2));
        assert!(cache.get("abcd").is_some());
        // "abcd" is now the most recent; inserting four more characters
        // must push out "efgh"
        cache.put("ijkl", data(3));
        assert!(cache.get("efgh").is_none());
        assert!(cache.get("abcd").is_some());
        assert!(cache.get("ijkl").is_some());
        assert_eq!(cache.total_chars, 8);
    }

    #[test]
    fn result_cache_rejects_oversized_entries() {
        let mut cache = ResultCache::new(3);
        cache.put("toolong", data(1));
        assert!(cache.get("toolong").is_none());
        assert_eq!(cache.total_chars, 0);
    }

    #[test]
    fn result_cache_replaces_same_key_without_double_counting() {
        let mut cache = ResultCache::new(4);
        cache.put("ab", data(1));
        cache.put("ab", data(2));
        assert_eq!(cache.total_chars, 2);
        assert_eq!(cache.get("ab").unwrap().input_glyphs, vec![2]);
    }
}
