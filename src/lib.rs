#![deny(unsafe_code)]
//! Decoder for nine-patch (`.9.png`) stretchable images.
//!
//! The stretch metadata either lives in `npTc`/`npLb`/`npOl` chunks of the
//! PNG (compiled assets), or is drawn as a 1-pixel marker border around the
//! image (source assets). Both are turned into the same
//! [`NinePatchMetadata`] and then into a grid of fixed and stretchable
//! [`Span`]s.
//!
//! Pixel decoding is not done here: supply a [`BitmapDecoder`] backed by
//! whichever PNG decoder you already use.
//!
//! ```no_run
//! use ninepatch_parse::{Bitmap, NinePatch, Result};
//!
//! fn decode_pixels(png: &[u8]) -> Result<Bitmap> {
//!     // Hand `png` to an image decoder and wrap its RGBA output.
//!     # let _ = png;
//!     Bitmap::from_rgba8(1, 1, &[0, 0, 0, 0])
//! }
//!
//! let bytes = std::fs::read("button.9.png")?;
//! let patch = NinePatch::decode(&bytes, &decode_pixels)?;
//! for column in patch.columns() {
//!     println!("{} px, stretch: {}", column.size, column.stretch);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use byteorder::ReadBytesExt;
use log::{debug, warn};
use std::io::Read;

mod bitmap;
mod chunks;
mod edge;
mod grid;
mod metadata;

pub use crate::bitmap::{Bitmap, BitmapDecoder, Rect};
pub use crate::chunks::{Chunk, ChunkType, FourCC, PNG_SIGNATURE, read_chunks};
pub use crate::edge::{BLACK, BorderScan, RED, TRANSPARENT, scan_border};
pub use crate::grid::{CellFill, GridLayout, Span, build_grid, build_spans};
pub use crate::metadata::{
    Insets, NinePatchMetadata, Outline, PatchTable, read_layout_bounds, read_outline, read_patch_table,
};

pub use enough::{Stop, StopReason, Unstoppable};

use crate::chunks::ChunkIter;

/// A trait to indicate a type can be infallibly converted to `usize`.
/// This should only be implemented for infallible conversions, so only unsigned types are valid.
pub(crate) trait ToUsize {
    fn to_usize(self) -> usize;
}

/// Statically verify that the given type can fit within a `usize`.
/// If the size won't fit on the given platform, this will fail at compile time, but if a type
/// which can fail `TryInto<usize>` is used, it may panic.
macro_rules! impl_to_usize_from {
    ( $from_type:ty ) => {
        impl ToUsize for $from_type {
            fn to_usize(self) -> usize {
                const _: () = assert!(std::mem::size_of::<$from_type>() <= std::mem::size_of::<usize>());
                self.try_into().ok().unwrap()
            }
        }
    };
}

impl_to_usize_from!(u32);

#[doc(hidden)]
pub type TryVec<T> = fallible_collections::TryVec<T>;

/// Describes decoder failures.
///
/// Every variant aborts the decode; no partially filled result is returned.
#[derive(Debug)]
pub enum Error {
    /// The input does not start with the PNG signature.
    MalformedContainer(&'static str),
    /// The stream ended inside a chunk.
    TruncatedStream,
    /// A nine-patch chunk is shorter than its format requires, or a table
    /// is too large to encode.
    MalformedChunk(&'static str),
    /// The pixels could not be decoded or cannot carry nine-patch data.
    UnsupportedImage(&'static str),
    /// Propagate underlying errors from `std::io`.
    Io(std::io::Error),
    /// Out of memory
    OutOfMemory,
    /// A configured limit was exceeded
    ResourceLimitExceeded(&'static str),
    /// Operation was stopped/cancelled
    Stopped(enough::StopReason),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::MalformedContainer(s) | Self::MalformedChunk(s) | Self::UnsupportedImage(s) | Self::ResourceLimitExceeded(s) => *s,
            Self::TruncatedStream => "EOF inside a chunk",
            Self::Io(err) => return err.fmt(f),
            Self::OutOfMemory => "OOM",
            Self::Stopped(reason) => return write!(f, "Stopped: {}", reason),
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::TruncatedStream,
            _ => Self::Io(err),
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        let kind = match err {
            Error::MalformedContainer(_) | Error::MalformedChunk(_) | Error::UnsupportedImage(_) => std::io::ErrorKind::InvalidData,
            Error::TruncatedStream => std::io::ErrorKind::UnexpectedEof,
            Error::Io(io_err) => return io_err,
            _ => std::io::ErrorKind::Other,
        };
        Self::new(kind, err)
    }
}

impl From<fallible_collections::TryReserveError> for Error {
    fn from(_: fallible_collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

impl From<enough::StopReason> for Error {
    fn from(reason: enough::StopReason) -> Self {
        Self::Stopped(reason)
    }
}

/// Result shorthand using our Error enum.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Limits and validation options for decoding
///
/// # Examples
///
/// ```rust
/// use ninepatch_parse::DecodeConfig;
///
/// // Default limits
/// let config = DecodeConfig::default();
///
/// // Tighter limits for untrusted input
/// let config = DecodeConfig::default()
///     .with_max_chunk_size(64 * 1024)
///     .with_total_megapixels_limit(16);
///
/// // No limits
/// let config = DecodeConfig::unlimited();
/// ```
#[derive(Debug, Clone)]
pub struct DecodeConfig {
    /// Largest payload accepted for a nine-patch chunk, in bytes.
    /// Other chunks are skipped without buffering and are not limited.
    /// Default: 16 MiB
    pub max_chunk_size: Option<u32>,

    /// Maximum size of the decoded bitmap.
    /// Default: 512 megapixels
    pub total_megapixels_limit: Option<u32>,

    /// Accept a stream that ends cleanly between chunks without `IEND`.
    /// Default: false
    pub lenient: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: Some(16 * 1024 * 1024),
            total_megapixels_limit: Some(512),
            lenient: false,
        }
    }
}

impl DecodeConfig {
    /// Create a configuration with no resource limits.
    pub fn unlimited() -> Self {
        Self {
            max_chunk_size: None,
            total_megapixels_limit: None,
            lenient: false,
        }
    }

    /// Set the largest accepted nine-patch chunk payload
    pub fn with_max_chunk_size(mut self, bytes: u32) -> Self {
        self.max_chunk_size = Some(bytes);
        self
    }

    /// Set the bitmap megapixel limit
    pub fn with_total_megapixels_limit(mut self, megapixels: u32) -> Self {
        self.total_megapixels_limit = Some(megapixels);
        self
    }

    /// Enable lenient parsing mode
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    fn validate_chunk_size(&self, length: u32) -> Result<()> {
        if let Some(limit) = self.max_chunk_size {
            if length > limit {
                return Err(Error::ResourceLimitExceeded("nine-patch chunk size limit exceeded"));
            }
        }
        Ok(())
    }

    fn validate_total_megapixels(&self, width: u32, height: u32) -> Result<()> {
        if let Some(limit) = self.total_megapixels_limit {
            let megapixels = (width as u64)
                .checked_mul(height as u64)
                .ok_or(Error::UnsupportedImage("dimension overflow"))?
                / 1_000_000;

            if megapixels > limit as u64 {
                return Err(Error::ResourceLimitExceeded("total megapixels limit exceeded"));
            }
        }
        Ok(())
    }
}

/// Read the signature and all chunks up to `IEND`, collecting nine-patch
/// metadata. Pixels are not touched.
pub fn read_metadata<T: Read>(src: &mut T) -> Result<NinePatchMetadata> {
    read_metadata_with_config(src, &DecodeConfig::default(), &Unstoppable)
}

/// [`read_metadata`] with limits and cancellation.
pub fn read_metadata_with_config<T: Read>(
    src: &mut T,
    config: &DecodeConfig,
    stop: &dyn Stop,
) -> Result<NinePatchMetadata> {
    chunks::read_signature(src)?;

    let mut meta = NinePatchMetadata::default();
    let mut iter = ChunkIter::new(src, config.lenient);

    while let Some(mut c) = iter.next_chunk()? {
        stop.check()?;

        match c.head.name {
            ChunkType::NinePatchOutline => {
                config.validate_chunk_size(c.head.length)?;
                let outline = read_outline(&c.read_payload()?)?;
                if meta.outline.replace(outline).is_some() {
                    warn!("repeated npOl chunk, keeping the last one");
                }
            },
            ChunkType::NinePatchLayoutBounds => {
                config.validate_chunk_size(c.head.length)?;
                let bounds = read_layout_bounds(&c.read_payload()?)?;
                if meta.layout_bounds.replace(bounds).is_some() {
                    warn!("repeated npLb chunk, keeping the last one");
                }
            },
            ChunkType::NinePatchTable => {
                config.validate_chunk_size(c.head.length)?;
                let table = read_patch_table(&c.read_payload()?)?;
                if meta.patches.replace(table).is_some() {
                    warn!("repeated npTc chunk, keeping the last one");
                }
            },
            _ => c.skip_payload()?,
        }

        c.finish()?;
    }

    Ok(meta)
}

/// A decoded nine-patch: metadata, the image without any marker border,
/// and the grid to draw it with.
#[derive(Debug)]
pub struct NinePatch {
    metadata: NinePatchMetadata,
    bitmap: Bitmap,
    grid: GridLayout,
}

impl NinePatch {
    /// Decode PNG bytes, using `decoder` for the pixels.
    pub fn decode<D: BitmapDecoder + ?Sized>(data: &[u8], decoder: &D) -> Result<Self> {
        Self::decode_with_config(data, decoder, &DecodeConfig::default(), &Unstoppable)
    }

    /// Decode PNG bytes with limits and cancellation.
    pub fn decode_with_config<D: BitmapDecoder + ?Sized>(
        data: &[u8],
        decoder: &D,
        config: &DecodeConfig,
        stop: &dyn Stop,
    ) -> Result<Self> {
        let metadata = read_metadata_with_config(&mut &data[..], config, stop)?;
        let bitmap = decoder.decode_bitmap(data)?;
        Self::assemble(metadata, bitmap, config, stop)
    }

    /// Decode PNG bytes whose pixels have already been decoded into `bitmap`.
    pub fn with_bitmap(data: &[u8], bitmap: Bitmap) -> Result<Self> {
        Self::with_bitmap_and_config(data, bitmap, &DecodeConfig::default(), &Unstoppable)
    }

    /// [`NinePatch::with_bitmap`] with limits and cancellation.
    pub fn with_bitmap_and_config(
        data: &[u8],
        bitmap: Bitmap,
        config: &DecodeConfig,
        stop: &dyn Stop,
    ) -> Result<Self> {
        let metadata = read_metadata_with_config(&mut &data[..], config, stop)?;
        Self::assemble(metadata, bitmap, config, stop)
    }

    /// Decode from a reader (reads all bytes, then decodes).
    pub fn from_reader<R: Read, D: BitmapDecoder + ?Sized>(reader: &mut R, decoder: &D) -> Result<Self> {
        Self::from_reader_with_config(reader, decoder, &DecodeConfig::default(), &Unstoppable)
    }

    /// Decode from a reader with limits and cancellation.
    pub fn from_reader_with_config<R: Read, D: BitmapDecoder + ?Sized>(
        reader: &mut R,
        decoder: &D,
        config: &DecodeConfig,
        stop: &dyn Stop,
    ) -> Result<Self> {
        let mut buf = std::vec::Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::decode_with_config(&buf, decoder, config, stop)
    }

    fn assemble(mut metadata: NinePatchMetadata, bitmap: Bitmap, config: &DecodeConfig, stop: &dyn Stop) -> Result<Self> {
        config.validate_total_megapixels(bitmap.width(), bitmap.height())?;

        let bitmap = if metadata.has_patches() {
            bitmap
        } else {
            stop.check()?;
            debug!("no npTc chunk, scanning the border of the {}x{} image", bitmap.width(), bitmap.height());
            let scan = scan_border(&bitmap)?;
            if scan.layout_bounds.is_some() {
                metadata.layout_bounds = scan.layout_bounds;
            }
            metadata.patches = Some(scan.patches);
            scan.bitmap
        };

        metadata.image_rect = bitmap.rect();
        let grid = build_grid(&metadata, bitmap.width(), bitmap.height())?;

        Ok(Self { metadata, bitmap, grid })
    }

    /// Decoded chunks, or the patch table read off the border.
    pub fn metadata(&self) -> &NinePatchMetadata {
        &self.metadata
    }

    /// The image to draw, marker border removed.
    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Columns, rows and cell fills.
    pub fn grid(&self) -> &GridLayout {
        &self.grid
    }

    /// Spans along x, left to right.
    pub fn columns(&self) -> &[Span] {
        &self.grid.columns
    }

    /// Spans along y, top to bottom.
    pub fn rows(&self) -> &[Span] {
        &self.grid.rows
    }

    /// Per-cell fills in row-major order, if the colour table matched.
    pub fn cell_fills(&self) -> Option<&[CellFill]> {
        self.grid.cell_fills.as_deref()
    }

    /// Insets of the content area.
    ///
    /// With `use_layout_bounds`, the image is laid out to its optical
    /// bounds, so each side shrinks by the layout-bounds inset.
    pub fn content_margin(&self, use_layout_bounds: bool) -> Insets {
        let padding = self.metadata.padding();
        match self.metadata.layout_bounds {
            Some(bounds) if use_layout_bounds => Insets::new(
                padding.left.saturating_sub(bounds.left),
                padding.top.saturating_sub(bounds.top),
                padding.right.saturating_sub(bounds.right),
                padding.bottom.saturating_sub(bounds.bottom),
            ),
            _ => padding,
        }
    }

    /// Layout bounds as outward offsets (negated insets), zero when absent.
    pub fn optical_insets(&self) -> Insets {
        self.metadata.layout_bounds.map_or_else(Insets::default, |b| {
            Insets::new(
                b.left.saturating_neg(),
                b.top.saturating_neg(),
                b.right.saturating_neg(),
                b.bottom.saturating_neg(),
            )
        })
    }

    /// Pixels of the cell at (`row`, `column`) when it is filled from the image.
    pub fn cell_bitmap(&self, row: usize, column: usize) -> Result<Option<Bitmap>> {
        match self.grid.cell_fill(row, column) {
            Some(CellFill::Bitmap(rect)) => self.bitmap.crop(rect).map(Some),
            _ => Ok(None),
        }
    }

    /// Take apart into metadata, trimmed bitmap and grid.
    pub fn into_parts(self) -> (NinePatchMetadata, Bitmap, GridLayout) {
        (self.metadata, self.bitmap, self.grid)
    }
}

/// Skip a number of bytes that we don't care to parse.
fn skip<T: Read>(src: &mut T, bytes: u64) -> Result<()> {
    std::io::copy(&mut src.take(bytes), &mut std::io::sink())?;
    Ok(())
}

fn be_i32<T: ReadBytesExt>(src: &mut T) -> Result<i32> {
    src.read_i32::<byteorder::BigEndian>().map_err(From::from)
}

fn be_u32<T: ReadBytesExt>(src: &mut T) -> Result<u32> {
    src.read_u32::<byteorder::BigEndian>().map_err(From::from)
}
