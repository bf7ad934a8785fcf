// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turn divisions into fixed and stretchable rows and columns.

use log::{debug, warn};

use crate::bitmap::Rect;
use crate::metadata::NinePatchMetadata;
use crate::{Result, TryVec};

/// One column or row of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start coordinate in the (trimmed) image.
    pub offset: u32,
    /// Extent in source pixels. Fixed spans keep it; stretch spans share
    /// the remaining space in proportion to it.
    pub size: u32,
    pub stretch: bool,
}

/// How to paint one cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFill {
    /// Nothing to draw.
    Transparent,
    /// Draw this part of the image, scaled to the cell.
    Bitmap(Rect),
    /// Fill with a single `0xAARRGGBB` colour.
    Solid(u32),
}

impl CellFill {
    /// Colour table entry for a cell with no visible pixels.
    pub const TRANSPARENT_COLOR: u32 = 0x0000_0000;
    /// Colour table entry for a cell that is not one flat colour.
    pub const NO_SINGLE_COLOR: u32 = 0x0000_0001;

    fn from_color(color: u32, rect: Rect) -> Self {
        match color {
            Self::TRANSPARENT_COLOR => Self::Transparent,
            Self::NO_SINGLE_COLOR => Self::Bitmap(rect),
            solid => Self::Solid(solid),
        }
    }
}

/// Columns, rows and optional per-cell fills of a nine-patch.
#[derive(Debug, Default)]
pub struct GridLayout {
    pub columns: TryVec<Span>,
    pub rows: TryVec<Span>,
    /// Row-major, one per cell. `None` when the colour table does not
    /// match the cell count; draw the whole image stretched instead.
    pub cell_fills: Option<TryVec<CellFill>>,
}

impl GridLayout {
    pub fn cell_count(&self) -> usize {
        self.columns.len() * self.rows.len()
    }

    /// Fill of the cell at (`row`, `column`), if fills were computed.
    pub fn cell_fill(&self, row: usize, column: usize) -> Option<CellFill> {
        if row >= self.rows.len() || column >= self.columns.len() {
            return None;
        }
        let fills = self.cell_fills.as_ref()?;
        fills.get(row * self.columns.len() + column).copied()
    }

    /// Source rectangle of the cell at (`row`, `column`).
    pub fn cell_rect(&self, row: usize, column: usize) -> Option<Rect> {
        let r = self.rows.get(row)?;
        let c = self.columns.get(column)?;
        Some(Rect::new(c.offset, r.offset, c.size, r.size))
    }
}

/// Lay out a grid for an image of `width` × `height`.
///
/// Metadata without a patch table yields a single fixed cell.
pub fn build_grid(metadata: &NinePatchMetadata, width: u32, height: u32) -> Result<GridLayout> {
    let columns = build_spans(metadata.x_divs(), width)?;
    let rows = build_spans(metadata.y_divs(), height)?;

    let colors = metadata.colors();
    let cells = columns.len() * rows.len();
    let cell_fills = if !colors.is_empty() && colors.len() == cells {
        let mut fills = TryVec::with_capacity(cells)?;
        let mut colors = colors.iter();
        for row in rows.iter() {
            for column in columns.iter() {
                let rect = Rect::new(column.offset, row.offset, column.size, row.size);
                // lengths were checked above
                let color = colors.next().copied().unwrap_or(CellFill::TRANSPARENT_COLOR);
                fills.push(CellFill::from_color(color, rect))?;
            }
        }
        Some(fills)
    } else {
        if !colors.is_empty() {
            warn!("{} colours for {} cells, ignoring the colour table", colors.len(), cells);
        }
        None
    };

    debug!("grid: {} columns, {} rows, fills: {}", columns.len(), rows.len(), cell_fills.is_some());
    Ok(GridLayout { columns, rows, cell_fills })
}

/// Spans along one axis of length `extent`.
///
/// Spans alternate fixed/stretch starting fixed. A division at 0 only
/// toggles the state. Whatever is left after the last division becomes a
/// trailing span, so the sizes always add up to `extent`.
pub fn build_spans(divs: &[u32], extent: u32) -> Result<TryVec<Span>> {
    let mut spans = TryVec::with_capacity(divs.len() + 1)?;
    let mut stretch = false;
    let mut last = 0u32;
    for &div in divs {
        if div == 0 {
            stretch = !stretch;
            continue;
        }
        let div = if div > extent {
            warn!("division {div} past extent {extent}, clamped");
            extent
        } else {
            div
        };
        spans.push(Span { offset: last, size: div.saturating_sub(last), stretch })?;
        last = last.max(div);
        stretch = !stretch;
    }
    if last < extent {
        spans.push(Span { offset: last, size: extent - last, stretch })?;
    }
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PatchTable;

    fn sizes(spans: &[Span]) -> std::vec::Vec<(u32, bool)> {
        spans.iter().map(|s| (s.size, s.stretch)).collect()
    }

    fn metadata(x: &[u32], y: &[u32], colors: &[u32]) -> NinePatchMetadata {
        let mut table = PatchTable::default();
        table.x_divs.extend_from_slice(x).unwrap();
        table.y_divs.extend_from_slice(y).unwrap();
        table.colors.extend_from_slice(colors).unwrap();
        NinePatchMetadata { patches: Some(table), ..Default::default() }
    }

    #[test]
    fn leading_zero_toggles() {
        let spans = build_spans(&[0, 10], 20).unwrap();
        assert_eq!(sizes(&spans), [(10, true), (10, false)]);
        assert_eq!(spans[1].offset, 10);
    }

    #[test]
    fn no_divisions() {
        let spans = build_spans(&[], 20).unwrap();
        assert_eq!(sizes(&spans), [(20, false)]);
        assert!(build_spans(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn three_by_three() {
        let spans = build_spans(&[4, 12], 20).unwrap();
        assert_eq!(sizes(&spans), [(4, false), (8, true), (8, false)]);
        assert_eq!(spans.iter().map(|s| s.offset).collect::<std::vec::Vec<_>>(), [0, 4, 12]);
    }

    #[test]
    fn ends_on_the_edge() {
        let spans = build_spans(&[0, 4, 5, 8], 8).unwrap();
        assert_eq!(sizes(&spans), [(4, true), (1, false), (3, true)]);
    }

    #[test]
    fn sizes_always_cover_extent() {
        let cases: &[&[u32]] = &[&[], &[0], &[0, 0], &[3], &[3, 3], &[5, 2, 9], &[1, 50], &[0, 7, 19, 20], &[20]];
        for divs in cases {
            let spans = build_spans(divs, 20).unwrap();
            assert_eq!(spans.iter().map(|s| s.size).sum::<u32>(), 20, "{divs:?}");
        }
    }

    #[test]
    fn idempotent() {
        let meta = metadata(&[2, 6], &[0, 3], &[]);
        let a = build_grid(&meta, 10, 9).unwrap();
        let b = build_grid(&meta, 10, 9).unwrap();
        assert_eq!(a.columns[..], b.columns[..]);
        assert_eq!(a.rows[..], b.rows[..]);
    }

    #[test]
    fn fills_row_major() {
        // 3 columns: 2 fixed, 4 stretch, 4 fixed; 2 rows: 3 stretch, 6 fixed
        let meta = metadata(&[2, 6], &[0, 3], &[1, 0, 1, 1, 0xFF00_FF00, 0]);
        let grid = build_grid(&meta, 10, 9).unwrap();
        assert_eq!(grid.cell_count(), 6);
        let fills = grid.cell_fills.as_ref().unwrap();
        assert_eq!(fills[0], CellFill::Bitmap(Rect::new(0, 0, 2, 3)));
        assert_eq!(fills[1], CellFill::Transparent);
        assert_eq!(fills[2], CellFill::Bitmap(Rect::new(6, 0, 4, 3)));
        assert_eq!(fills[3], CellFill::Bitmap(Rect::new(0, 3, 2, 6)));
        assert_eq!(fills[4], CellFill::Solid(0xFF00_FF00));
        assert_eq!(grid.cell_fill(1, 2), Some(CellFill::Transparent));
        assert_eq!(grid.cell_fill(2, 0), None);
        assert_eq!(grid.cell_rect(1, 1), Some(Rect::new(2, 3, 4, 6)));
    }

    #[test]
    fn mismatched_colors_are_ignored() {
        let meta = metadata(&[2, 6], &[0, 3], &[1, 1, 1, 1, 1]);
        let grid = build_grid(&meta, 10, 9).unwrap();
        assert!(grid.cell_fills.is_none());
        assert_eq!(grid.cell_fill(0, 0), None);
    }

    #[test]
    fn without_patch_table() {
        let grid = build_grid(&NinePatchMetadata::default(), 5, 7).unwrap();
        assert_eq!(sizes(&grid.columns), [(5, false)]);
        assert_eq!(sizes(&grid.rows), [(7, false)]);
        assert!(grid.cell_fills.is_none());
    }
}
