// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded pixels as handed over by an external image decoder.

use crate::{Error, Result, ToUsize, TryVec};

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether `self` lies entirely within `width` × `height`.
    fn fits_in(&self, width: u32, height: u32) -> bool {
        self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height)
    }
}

/// A decoded image with one `0xAARRGGBB` sample per pixel, rows top to bottom.
#[derive(Debug)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: TryVec<u32>,
}

impl Bitmap {
    /// Wrap ARGB samples. `pixels.len()` must equal `width * height`.
    pub fn from_argb(width: u32, height: u32, pixels: TryVec<u32>) -> Result<Self> {
        let expected = pixel_count(width, height)?;
        if pixels.len() != expected {
            return Err(Error::UnsupportedImage("pixel count does not match dimensions"));
        }
        Ok(Self { width, height, pixels })
    }

    /// Convert tightly packed 8-bit RGBA bytes to ARGB samples.
    pub fn from_rgba8(width: u32, height: u32, rgba: &[u8]) -> Result<Self> {
        let expected = pixel_count(width, height)?;
        if rgba.len() != expected.checked_mul(4).ok_or(Error::UnsupportedImage("dimension overflow"))? {
            return Err(Error::UnsupportedImage("RGBA buffer does not match dimensions"));
        }
        let mut pixels = TryVec::with_capacity(expected)?;
        for px in rgba.chunks_exact(4) {
            let [r, g, b, a] = [px[0], px[1], px[2], px[3]];
            pixels.push(u32::from_be_bytes([a, r, g, b]))?;
        }
        Ok(Self { width, height, pixels })
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    /// All samples, row-major.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// The whole image as a rectangle at the origin.
    pub const fn rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Sample at `(x, y)`. Panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        debug_assert!(x < self.width && y < self.height);
        self.pixels[y.to_usize() * self.width.to_usize() + x.to_usize()]
    }

    /// Copy `rect` out into a new bitmap.
    pub fn crop(&self, rect: Rect) -> Result<Bitmap> {
        if !rect.fits_in(self.width, self.height) {
            return Err(Error::UnsupportedImage("crop rectangle outside bitmap"));
        }
        let mut pixels = TryVec::with_capacity(pixel_count(rect.width, rect.height)?)?;
        let stride = self.width.to_usize();
        for y in rect.y..rect.y + rect.height {
            let start = y.to_usize() * stride + rect.x.to_usize();
            pixels.extend_from_slice(&self.pixels[start..start + rect.width.to_usize()])?;
        }
        Ok(Bitmap { width: rect.width, height: rect.height, pixels })
    }
}

fn pixel_count(width: u32, height: u32) -> Result<usize> {
    width
        .to_usize()
        .checked_mul(height.to_usize())
        .ok_or(Error::UnsupportedImage("dimension overflow"))
}

/// Turns the PNG bytes into pixels.
///
/// Decompression and colour conversion are left to an image crate of the
/// caller's choosing. Closures `Fn(&[u8]) -> Result<Bitmap>` implement it.
pub trait BitmapDecoder {
    fn decode_bitmap(&self, data: &[u8]) -> Result<Bitmap>;
}

impl<F> BitmapDecoder for F
where
    F: Fn(&[u8]) -> Result<Bitmap>,
{
    fn decode_bitmap(&self, data: &[u8]) -> Result<Bitmap> {
        self(data)
    }
}
