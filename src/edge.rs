// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconstruct the patch table from the 1-pixel marker border of a raw
//! nine-patch image.
//!
//! Top and left edges mark stretchable runs in black, bottom and right
//! edges mark the content area in black and the optical (layout) bounds in
//! red. Pixels of any other colour are not markers. Corners are never read.

use log::debug;

use crate::bitmap::{Bitmap, Rect};
use crate::metadata::{Insets, PatchTable};
use crate::{Error, Result, TryVec};

/// Opaque black: stretch run on the top/left edges, content on the
/// bottom/right edges.
pub const BLACK: u32 = 0xFF00_0000;
/// Fully transparent: no marker.
pub const TRANSPARENT: u32 = 0x0000_0000;
/// Opaque red: optical bounds.
pub const RED: u32 = 0xFFFF_0000;

/// Result of [`scan_border`].
#[derive(Debug)]
pub struct BorderScan {
    /// The image with the marker border cropped away.
    pub bitmap: Bitmap,
    pub patches: PatchTable,
    /// Present when any red run was found.
    pub layout_bounds: Option<Insets>,
}

/// Read divisions, padding and layout bounds off the border of `bitmap`.
///
/// Divisions and padding come out relative to the trimmed image. Markers
/// on opposite edges are not checked against each other.
pub fn scan_border(bitmap: &Bitmap) -> Result<BorderScan> {
    let (width, height) = (bitmap.width(), bitmap.height());
    if width < 3 || height < 3 {
        return Err(Error::UnsupportedImage("image too small to carry a nine-patch border"));
    }
    if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
        return Err(Error::UnsupportedImage("image too large for nine-patch insets"));
    }
    let (right, bottom) = (width - 1, height - 1);

    let x_divs = scan_divisions(width, |x| bitmap.pixel(x, 0))?;
    let y_divs = scan_divisions(height, |y| bitmap.pixel(0, y))?;

    let (bounds_left, bounds_right) = red_runs(width, |x| bitmap.pixel(x, bottom));
    let (bounds_top, bounds_bottom) = red_runs(height, |y| bitmap.pixel(right, y));
    let (pad_left, pad_right) = scan_padding(width, |x| bitmap.pixel(x, bottom));
    let (pad_top, pad_bottom) = scan_padding(height, |y| bitmap.pixel(right, y));

    let bounds = Insets::new(bounds_left, bounds_top, bounds_right, bounds_bottom);
    let layout_bounds = (!bounds.is_zero()).then_some(bounds);
    let padding = Insets::new(pad_left, pad_top, pad_right, pad_bottom);
    debug!("border scan: x_divs={:?} y_divs={:?} padding={padding:?} layout_bounds={layout_bounds:?}", &x_divs[..], &y_divs[..]);

    let bitmap = bitmap.crop(Rect::new(1, 1, width - 2, height - 2))?;

    Ok(BorderScan {
        bitmap,
        patches: PatchTable {
            x_divs,
            y_divs,
            padding,
            colors: TryVec::new(),
        },
        layout_bounds,
    })
}

/// Boundaries between transparent and black runs along x or y = 1..=extent-3.
///
/// Each boundary is recorded as `i - 1`, i.e. relative to the trimmed image.
/// A black run still open at the end closes at `extent - 2`.
fn scan_divisions(extent: u32, sample: impl Fn(u32) -> u32) -> Result<TryVec<u32>> {
    let mut divs = TryVec::new();
    let mut current = TRANSPARENT;
    for i in 1..extent - 2 {
        let px = sample(i);
        let flips = matches!((current, px), (TRANSPARENT, BLACK) | (BLACK, TRANSPARENT));
        if flips {
            divs.push(i - 1)?;
            current = px;
        }
    }
    if current == BLACK {
        divs.push(extent - 2)?;
    }
    Ok(divs)
}

/// First black run on a bottom or right edge, as (leading, trailing) insets.
///
/// Red pixels before the run are ignored; a red pixel after it ends the run
/// like a transparent one does.
fn scan_padding(extent: u32, sample: impl Fn(u32) -> u32) -> (i32, i32) {
    let mut current = TRANSPARENT;
    let (mut leading, mut trailing) = (0, 0);
    for i in 1..=extent - 2 {
        let px = sample(i);
        if current == TRANSPARENT {
            if px == BLACK {
                leading = i - 1;
                current = BLACK;
            }
        } else if px == TRANSPARENT || px == RED {
            trailing = extent - i - 1;
            break;
        }
    }
    // extent was checked to fit in i32
    (leading as i32, trailing as i32)
}

/// Lengths of the red runs touching either end of the edge interior.
fn red_runs(extent: u32, sample: impl Fn(u32) -> u32) -> (i32, i32) {
    let interior = 1..=extent - 2;
    let leading = interior.clone().take_while(|&i| sample(i) == RED).count();
    let trailing = interior.rev().take_while(|&i| sample(i) == RED).count();
    (leading as i32, trailing as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: u32 = 0xFFFF_FFFF;

    /// `.` transparent, `#` black, `r` red, anything else white.
    fn bitmap(rows: &[&str]) -> Bitmap {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let mut pixels = std::vec::Vec::new();
        for row in rows {
            assert_eq!(row.len() as u32, width);
            pixels.extend(row.chars().map(|c| match c {
                '.' => TRANSPARENT,
                '#' => BLACK,
                'r' => RED,
                _ => WHITE,
            }));
        }
        Bitmap::from_argb(width, height, pixels.into()).unwrap()
    }

    #[test]
    fn classic_nine_patch() {
        let scan = scan_border(&bitmap(&[
            "..##...",
            ".wwwww.",
            "#wwwww.",
            "#wwwww#",
            ".wwwww#",
            ".wwwww.",
            "..###..",
        ]))
        .unwrap();
        assert_eq!(scan.patches.x_divs[..], [1, 3]);
        assert_eq!(scan.patches.y_divs[..], [1, 3]);
        assert_eq!(scan.patches.padding, Insets::new(1, 2, 1, 1));
        assert!(scan.layout_bounds.is_none());
        assert!(scan.patches.colors.is_empty());
        assert_eq!((scan.bitmap.width(), scan.bitmap.height()), (5, 5));
        assert!(scan.bitmap.pixels().iter().all(|&p| p == WHITE));
    }

    #[test]
    fn run_open_at_the_end() {
        // the division scan stops before the last interior pixel
        let scan = scan_border(&bitmap(&[
            "...###.",
            ".wwwww.",
            ".wwwww.",
            ".wwwww.",
            ".......",
        ]))
        .unwrap();
        assert_eq!(scan.patches.x_divs[..], [2, 5]);
        assert!(scan.patches.y_divs.is_empty());
    }

    #[test]
    fn stretch_from_the_first_pixel() {
        let scan = scan_border(&bitmap(&[
            ".##....",
            "#wwwww.",
            "#wwwww.",
            "#wwwww.",
            "#wwwww.",
            "#wwwww.",
            ".......",
        ]))
        .unwrap();
        assert_eq!(scan.patches.x_divs[..], [0, 2]);
        assert_eq!(scan.patches.y_divs[..], [0, 5]);
    }

    #[test]
    fn unmarked_border() {
        let scan = scan_border(&bitmap(&[".....", ".www.", "....."])).unwrap();
        assert!(scan.patches.x_divs.is_empty());
        assert!(scan.patches.y_divs.is_empty());
        assert_eq!(scan.patches.padding, Insets::default());
        assert!(scan.layout_bounds.is_none());
        assert_eq!((scan.bitmap.width(), scan.bitmap.height()), (3, 1));
    }

    #[test]
    fn layout_bounds_and_padding() {
        let scan = scan_border(&bitmap(&[
            "........",
            ".wwwwwwr",
            ".wwwwww#",
            ".wwwwww#",
            ".wwwwww#",
            ".wwwwwwr",
            ".wwwwwwr",
            ".rr##.r.",
        ]))
        .unwrap();
        assert_eq!(scan.layout_bounds, Some(Insets::new(2, 1, 1, 2)));
        // bottom: red ignored before the run, transparent ends it
        // right: red ends the run
        assert_eq!(scan.patches.padding, Insets::new(2, 1, 2, 2));
    }

    #[test]
    fn other_colours_are_not_markers() {
        let scan = scan_border(&bitmap(&[
            ".#w#...",
            ".wwwww.",
            ".wwwww.",
        ]))
        .unwrap();
        assert_eq!(scan.patches.x_divs[..], [0, 3]);
    }

    #[test]
    fn too_small() {
        assert!(matches!(scan_border(&bitmap(&["..", ".."])), Err(Error::UnsupportedImage(_))));
    }
}
