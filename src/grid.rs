//! Fixed-width character grid integration.
//!
//! Adapts the engine to a terminal-style grid: each returned context range
//! is turned into a "ligature span" annotation, written on the range's
//! first cell. A renderer treating "first cell with span N > 0" as "draw
//! glyphs `[start, start + N)` as one shaped unit" needs nothing else.

use crate::font::{Font, FontSource};

/// Read/write access to one row of a character grid.
pub trait GridRow {
    fn width(&self) -> usize;
    /// The code point displayed in `col`.
    fn codepoint(&self, col: usize) -> char;
    /// Record that `col` starts a ligature spanning `len` cells; 0 marks a
    /// cell that does not start a ligature.
    fn set_ligature_span(&mut self, col: usize, len: usize);
}

impl<T: FontSource> Font<T> {
    /// Annotate `row` with ligature spans: the first cell of every context
    /// range receives the range's width, every other cell 0.
    pub fn mark_row<R: GridRow>(&self, row: &mut R) {
        let width = row.width();
        for col in 0..width {
            row.set_ligature_span(col, 0);
        }
        if width == 0 || !self.has_lookups() {
            return;
        }
        let mut glyphs = Vec::with_capacity(width);
        for col in 0..width {
            glyphs.push(self.glyph_index(row.codepoint(col)));
        }
        for range in self.find_internal(&mut glyphs) {
            if range.start < width {
                row.set_ligature_span(range.start, range.end.min(width) - range.start);
            }
        }
    }
}
