// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Nine-patch metadata and the `npOl`, `npLb` and `npTc` payload formats.
//!
//! Insets, the outline radius and the divisions are big-endian. The legacy
//! offset fields of `npTc` are in platform byte order; real assets were
//! written that way, so they are read (and written) exactly so.

use byteorder::{BigEndian, NativeEndian, ReadBytesExt, WriteBytesExt};

use crate::bitmap::Rect;
use crate::{Error, Result, TryVec, be_i32, be_u32};

/// Edge insets in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Insets {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Insets {
    /// Size of an `npLb` payload.
    pub const PAYLOAD_SIZE: usize = 16;

    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub const fn is_zero(&self) -> bool {
        self.left == 0 && self.top == 0 && self.right == 0 && self.bottom == 0
    }

    /// Serialize as an `npLb` payload.
    pub fn to_payload(&self) -> Result<TryVec<u8>> {
        let mut out = std::vec::Vec::new();
        out.try_reserve_exact(Self::PAYLOAD_SIZE).map_err(|_| Error::OutOfMemory)?;
        write_insets_ltrb(&mut out, self)?;
        Ok(out.into())
    }
}

/// Rounded outline hint from an `npOl` chunk.
///
/// Parsed for completeness; the grid layout does not use it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Outline {
    pub insets: Insets,
    pub radius: f32,
    pub alpha: u32,
}

impl Outline {
    /// Size of an `npOl` payload.
    pub const PAYLOAD_SIZE: usize = 20;

    /// Serialize as an `npOl` payload.
    pub fn to_payload(&self) -> Result<TryVec<u8>> {
        let mut out = std::vec::Vec::new();
        out.try_reserve_exact(Self::PAYLOAD_SIZE).map_err(|_| Error::OutOfMemory)?;
        write_insets_ltrb(&mut out, &self.insets)?;
        out.write_f32::<BigEndian>(self.radius)?;
        out.write_u32::<BigEndian>(self.alpha)?;
        Ok(out.into())
    }
}

/// Stretch divisions, content padding and per-cell colours.
///
/// Comes from an `npTc` chunk, or is reconstructed from the marker border
/// of a raw asset.
#[derive(Debug, Default)]
pub struct PatchTable {
    /// Alternating fixed/stretch boundaries along x, starting fixed.
    pub x_divs: TryVec<u32>,
    /// Alternating fixed/stretch boundaries along y, starting fixed.
    pub y_divs: TryVec<u32>,
    /// Content-safe insets.
    pub padding: Insets,
    /// One entry per cell, row-major. Only honoured when the count matches
    /// the number of cells.
    pub colors: TryVec<u32>,
}

impl PatchTable {
    /// Fixed part of an `npTc` payload: four count bytes, two offsets,
    /// four padding values and one more offset.
    pub const HEADER_SIZE: usize = 4 + 4 + 4 + 16 + 4;

    /// Serialize as an `npTc` payload.
    ///
    /// The offset fields carry no meaning for readers and are written as 0.
    pub fn to_payload(&self) -> Result<TryVec<u8>> {
        let num_x_divs = u8::try_from(self.x_divs.len()).map_err(|_| Error::MalformedChunk("too many x divisions for npTc"))?;
        let num_y_divs = u8::try_from(self.y_divs.len()).map_err(|_| Error::MalformedChunk("too many y divisions for npTc"))?;
        let num_colors = u8::try_from(self.colors.len()).map_err(|_| Error::MalformedChunk("too many colors for npTc"))?;
        let total = Self::HEADER_SIZE + 4 * (self.x_divs.len() + self.y_divs.len() + self.colors.len());

        let mut out = std::vec::Vec::new();
        out.try_reserve_exact(total).map_err(|_| Error::OutOfMemory)?;
        out.write_u8(0)?;
        out.write_u8(num_x_divs)?;
        out.write_u8(num_y_divs)?;
        out.write_u8(num_colors)?;
        out.write_u32::<NativeEndian>(0)?;
        out.write_u32::<NativeEndian>(0)?;
        // left, right, top, bottom
        out.write_i32::<BigEndian>(self.padding.left)?;
        out.write_i32::<BigEndian>(self.padding.right)?;
        out.write_i32::<BigEndian>(self.padding.top)?;
        out.write_i32::<BigEndian>(self.padding.bottom)?;
        out.write_u32::<NativeEndian>(0)?;
        for &v in self.x_divs.iter().chain(self.y_divs.iter()).chain(self.colors.iter()) {
            out.write_u32::<BigEndian>(v)?;
        }
        debug_assert_eq!(out.len(), total);
        Ok(out.into())
    }
}

/// Everything known about one nine-patch asset.
///
/// Built up chunk by chunk during decoding; a repeated chunk replaces the
/// values of the earlier one.
#[derive(Debug, Default)]
pub struct NinePatchMetadata {
    pub outline: Option<Outline>,
    pub layout_bounds: Option<Insets>,
    pub patches: Option<PatchTable>,
    /// Bounds of the bitmap the divisions refer to (after border trimming).
    pub image_rect: Rect,
}

impl NinePatchMetadata {
    pub fn has_outline(&self) -> bool {
        self.outline.is_some()
    }

    pub fn has_layout_bounds(&self) -> bool {
        self.layout_bounds.is_some()
    }

    pub fn has_patches(&self) -> bool {
        self.patches.is_some()
    }

    pub fn x_divs(&self) -> &[u32] {
        match &self.patches {
            Some(p) => &p.x_divs[..],
            None => &[],
        }
    }

    pub fn y_divs(&self) -> &[u32] {
        match &self.patches {
            Some(p) => &p.y_divs[..],
            None => &[],
        }
    }

    pub fn colors(&self) -> &[u32] {
        match &self.patches {
            Some(p) => &p.colors[..],
            None => &[],
        }
    }

    /// Zero when no patch table has been read.
    pub fn padding(&self) -> Insets {
        self.patches.as_ref().map_or_else(Insets::default, |p| p.padding)
    }
}

fn write_insets_ltrb(out: &mut std::vec::Vec<u8>, insets: &Insets) -> Result<()> {
    out.write_i32::<BigEndian>(insets.left)?;
    out.write_i32::<BigEndian>(insets.top)?;
    out.write_i32::<BigEndian>(insets.right)?;
    out.write_i32::<BigEndian>(insets.bottom)?;
    Ok(())
}

fn read_insets_ltrb<T: ReadBytesExt>(src: &mut T) -> Result<Insets> {
    Ok(Insets {
        left: be_i32(src)?,
        top: be_i32(src)?,
        right: be_i32(src)?,
        bottom: be_i32(src)?,
    })
}

/// Parse an `npOl` payload.
pub fn read_outline(payload: &[u8]) -> Result<Outline> {
    if payload.len() < Outline::PAYLOAD_SIZE {
        return Err(Error::MalformedChunk("npOl payload too short"));
    }
    let src = &mut &payload[..];
    let insets = read_insets_ltrb(src)?;
    let radius = src.read_f32::<BigEndian>()?;
    let alpha = be_u32(src)?;
    Ok(Outline { insets, radius, alpha })
}

/// Parse an `npLb` payload.
pub fn read_layout_bounds(payload: &[u8]) -> Result<Insets> {
    if payload.len() < Insets::PAYLOAD_SIZE {
        return Err(Error::MalformedChunk("npLb payload too short"));
    }
    read_insets_ltrb(&mut &payload[..])
}

/// Parse an `npTc` payload.
pub fn read_patch_table(payload: &[u8]) -> Result<PatchTable> {
    if payload.len() < PatchTable::HEADER_SIZE {
        return Err(Error::MalformedChunk("npTc header too short"));
    }
    let src = &mut &payload[..];
    let _was_deserialized = src.read_u8()?;
    let num_x_divs = usize::from(src.read_u8()?);
    let num_y_divs = usize::from(src.read_u8()?);
    let num_colors = usize::from(src.read_u8()?);

    let implied = PatchTable::HEADER_SIZE + 4 * (num_x_divs + num_y_divs + num_colors);
    if payload.len() < implied {
        return Err(Error::MalformedChunk("npTc payload shorter than its counts"));
    }

    let _x_divs_offset = src.read_u32::<NativeEndian>()?;
    let _y_divs_offset = src.read_u32::<NativeEndian>()?;
    // Wire order is left, right, top, bottom.
    let left = be_i32(src)?;
    let right = be_i32(src)?;
    let top = be_i32(src)?;
    let bottom = be_i32(src)?;
    let _colors_offset = src.read_u32::<NativeEndian>()?;

    Ok(PatchTable {
        x_divs: read_u32_array(src, num_x_divs)?,
        y_divs: read_u32_array(src, num_y_divs)?,
        padding: Insets { left, top, right, bottom },
        colors: read_u32_array(src, num_colors)?,
    })
}

fn read_u32_array<T: ReadBytesExt>(src: &mut T, count: usize) -> Result<TryVec<u32>> {
    let mut values = TryVec::with_capacity(count)?;
    for _ in 0..count {
        values.push(be_u32(src)?)?;
    }
    Ok(values)
}
