// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PNG chunk framing.
//!
//! A PNG datastream is the 8-byte signature followed by a sequence of
//! chunks, each `u32be length | [u8; 4] type | payload | u32be crc`.
//! The walk ends after the `IEND` chunk.

use log::debug;
use std::fmt;
use std::io::{Read, Take};

use crate::{Error, Result, TryVec, be_u32, skip};

/// The fixed leading bytes of every PNG datastream.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

macro_rules! chunk_database {
    ($($(#[$attr:meta])* $chunkenum:ident $chunktype:expr),*,) => {
        /// Chunk types this crate knows by name.
        #[derive(Clone, Copy, PartialEq, Eq)]
        pub enum ChunkType {
            $($(#[$attr])* $chunkenum),*,
            UnknownChunk(u32),
        }

        impl From<u32> for ChunkType {
            fn from(t: u32) -> ChunkType {
                use self::ChunkType::*;
                match t {
                    $($(#[$attr])* $chunktype => $chunkenum),*,
                    _ => UnknownChunk(t),
                }
            }
        }

        impl From<ChunkType> for u32 {
            fn from(b: ChunkType) -> u32 {
                use self::ChunkType::*;
                match b {
                    $($(#[$attr])* $chunkenum => $chunktype),*,
                    UnknownChunk(t) => t,
                }
            }
        }

        impl fmt::Debug for ChunkType {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let fourcc: FourCC = From::from(*self);
                fourcc.fmt(f)
            }
        }
    }
}

/// Four ASCII bytes naming a chunk.
#[derive(Default, PartialEq, Eq, Clone, Copy)]
pub struct FourCC {
    pub value: [u8; 4],
}

impl From<u32> for FourCC {
    fn from(number: u32) -> FourCC {
        FourCC { value: number.to_be_bytes() }
    }
}

impl From<ChunkType> for FourCC {
    fn from(t: ChunkType) -> FourCC {
        let t: u32 = t.into();
        From::from(t)
    }
}

impl From<[u8; 4]> for FourCC {
    fn from(value: [u8; 4]) -> FourCC {
        FourCC { value }
    }
}

impl From<FourCC> for ChunkType {
    fn from(fourcc: FourCC) -> ChunkType {
        ChunkType::from(u32::from_be_bytes(fourcc.value))
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.value) {
            Ok(s) => f.write_str(s),
            Err(_) => self.value.fmt(f),
        }
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl PartialEq<&[u8; 4]> for FourCC {
    fn eq(&self, other: &&[u8; 4]) -> bool {
        self.value.eq(*other)
    }
}

chunk_database!(
    ImageHeader         0x4948_4452, // "IHDR"
    Palette             0x504C_5445, // "PLTE"
    ImageData           0x4944_4154, // "IDAT"
    ImageEnd            0x4945_4E44, // "IEND"
    NinePatchOutline    0x6E70_4F6C, // "npOl"
    NinePatchLayoutBounds 0x6E70_4C62, // "npLb"
    NinePatchTable      0x6E70_5463, // "npTc"
);

/// Most bytes reserved for a payload before any of it has been read.
const MAX_PAYLOAD_RESERVE: u64 = 64 * 1024;

/// Length and type of one chunk.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkHeader {
    pub(crate) name: ChunkType,
    /// Declared payload length, excluding the header and the CRC.
    pub(crate) length: u32,
}

/// One chunk as returned by [`read_chunks`].
#[derive(Debug)]
pub struct Chunk {
    pub chunk_type: FourCC,
    pub payload: TryVec<u8>,
}

/// Check the 8-byte PNG signature at the start of `src`.
pub(crate) fn read_signature<T: Read>(src: &mut T) -> Result<()> {
    let mut signature = [0u8; 8];
    let mut filled = 0;
    while filled < signature.len() {
        match src.read(&mut signature[filled..])? {
            0 => return Err(Error::MalformedContainer("missing PNG signature")),
            n => filled += n,
        }
    }
    if signature != PNG_SIGNATURE {
        return Err(Error::MalformedContainer("bad PNG signature"));
    }
    Ok(())
}

/// Read the next chunk header, or `None` if the stream ends exactly before
/// it. A header cut short is `TruncatedStream`.
fn read_chunk_header<T: Read>(src: &mut T) -> Result<Option<ChunkHeader>> {
    let mut header = [0u8; 8];
    let mut filled = 0;
    while filled < header.len() {
        match src.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(Error::TruncatedStream),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {},
            Err(e) => return Err(e.into()),
        }
    }
    let src = &mut &header[..];
    let length = be_u32(src)?;
    let name = ChunkType::from(be_u32(src)?);
    Ok(Some(ChunkHeader { name, length }))
}

/// A chunk whose payload has not been consumed yet.
pub(crate) struct PngChunk<'a, T> {
    pub(crate) head: ChunkHeader,
    content: Take<&'a mut T>,
}

impl<T: Read> PngChunk<'_, T> {
    /// Read the whole payload, failing if the stream ends first.
    pub(crate) fn read_payload(&mut self) -> Result<TryVec<u8>> {
        // The declared length is untrusted; past this, grow as bytes arrive.
        let expected = self.content.limit().min(MAX_PAYLOAD_RESERVE);
        let mut vec = std::vec::Vec::new();
        vec.try_reserve_exact(usize::try_from(expected).map_err(|_| Error::OutOfMemory)?)
            .map_err(|_| Error::OutOfMemory)?;
        self.content.read_to_end(&mut vec)?;
        if self.content.limit() != 0 {
            return Err(Error::TruncatedStream);
        }
        Ok(vec.into())
    }

    /// Skip over the unread part of the payload.
    pub(crate) fn skip_payload(&mut self) -> Result<()> {
        let remain = self.content.limit();
        debug!("{:?} (skipped {remain} bytes)", self.head);
        skip(&mut self.content, remain)?;
        if self.content.limit() != 0 {
            return Err(Error::TruncatedStream);
        }
        Ok(())
    }

    /// Consume the trailing CRC. The checksum itself is not verified.
    pub(crate) fn finish(self) -> Result<()> {
        if self.content.limit() != 0 {
            return Err(Error::MalformedChunk("unread chunk payload"));
        }
        let src = self.content.into_inner();
        let _crc = be_u32(src)?;
        Ok(())
    }
}

/// Sequential reader over the chunks following the signature.
pub(crate) struct ChunkIter<'a, T> {
    src: &'a mut T,
    seen_end: bool,
    lenient: bool,
}

impl<T: Read> ChunkIter<'_, T> {
    pub(crate) fn new(src: &mut T, lenient: bool) -> ChunkIter<'_, T> {
        ChunkIter { src, seen_end: false, lenient }
    }

    /// The next chunk, or `None` once `IEND` has been returned.
    pub(crate) fn next_chunk(&mut self) -> Result<Option<PngChunk<'_, T>>> {
        if self.seen_end {
            return Ok(None);
        }
        let head = match read_chunk_header(self.src)? {
            Some(h) => h,
            None if self.lenient => {
                debug!("stream ended without IEND");
                self.seen_end = true;
                return Ok(None);
            },
            None => return Err(Error::TruncatedStream),
        };
        if head.name == ChunkType::ImageEnd {
            self.seen_end = true;
        }
        Ok(Some(PngChunk {
            head,
            content: self.src.take(u64::from(head.length)),
        }))
    }
}

/// Read every chunk through `IEND`, payloads included.
///
/// `src` must be positioned at the PNG signature.
pub fn read_chunks<T: Read>(src: &mut T) -> Result<TryVec<Chunk>> {
    read_signature(src)?;
    let mut chunks = TryVec::new();
    let mut iter = ChunkIter::new(src, false);
    while let Some(mut c) = iter.next_chunk()? {
        let payload = c.read_payload()?;
        let chunk_type = FourCC::from(c.head.name);
        c.finish()?;
        chunks.push(Chunk { chunk_type, payload })?;
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(out: &mut std::vec::Vec<u8>, name: &[u8; 4], payload: &[u8]) {
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(payload);
        out.extend_from_slice(&[0; 4]);
    }

    #[test]
    fn fourcc_display() {
        let t = ChunkType::from(u32::from_be_bytes(*b"npTc"));
        assert_eq!(t, ChunkType::NinePatchTable);
        assert_eq!(format!("{:?}", t), "npTc");
        assert_eq!(FourCC::from(ChunkType::ImageEnd), b"IEND");
        let unknown = ChunkType::from(FourCC::from(*b"tEXt"));
        assert_eq!(unknown, ChunkType::UnknownChunk(u32::from_be_bytes(*b"tEXt")));
    }

    #[test]
    fn walks_through_iend() {
        let mut data = PNG_SIGNATURE.to_vec();
        chunk(&mut data, b"IHDR", &[1; 13]);
        chunk(&mut data, b"tEXt", b"hello");
        chunk(&mut data, b"IEND", &[]);
        data.extend_from_slice(b"trailing garbage");
        let chunks = read_chunks(&mut data.as_slice()).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].chunk_type, b"tEXt");
        assert_eq!(chunks[1].payload[..], b"hello"[..]);
        assert_eq!(chunks[2].chunk_type, b"IEND");
        assert!(chunks[2].payload.is_empty());
    }

    #[test]
    fn short_signature() {
        let data = &PNG_SIGNATURE[..5];
        assert!(matches!(read_chunks(&mut &data[..]), Err(Error::MalformedContainer(_))));
    }

    #[test]
    fn payload_past_eof() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&100u32.to_be_bytes());
        data.extend_from_slice(b"tEXt");
        data.extend_from_slice(b"short");
        assert!(matches!(read_chunks(&mut data.as_slice()), Err(Error::TruncatedStream)));
    }

    #[test]
    fn declared_length_far_past_input() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&0xFFFF_FFF0u32.to_be_bytes());
        data.extend_from_slice(b"tEXt");
        data.extend_from_slice(b"abc");
        assert!(matches!(read_chunks(&mut data.as_slice()), Err(Error::TruncatedStream)));
    }

    #[test]
    fn missing_crc() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(b"IEND");
        data.extend_from_slice(&[0, 0]);
        assert!(matches!(read_chunks(&mut data.as_slice()), Err(Error::TruncatedStream)));
    }

    #[test]
    fn lenient_accepts_missing_iend() {
        let mut data = std::vec::Vec::new();
        chunk(&mut data, b"IHDR", &[0; 13]);
        let mut src = data.as_slice();
        let mut iter = ChunkIter::new(&mut src, true);
        let mut c = iter.next_chunk().unwrap().unwrap();
        c.skip_payload().unwrap();
        c.finish().unwrap();
        assert!(iter.next_chunk().unwrap().is_none());

        let mut src = data.as_slice();
        let mut iter = ChunkIter::new(&mut src, false);
        let mut c = iter.next_chunk().unwrap().unwrap();
        c.skip_payload().unwrap();
        c.finish().unwrap();
        assert!(matches!(iter.next_chunk(), Err(Error::TruncatedStream)));
    }

    #[test]
    fn lenient_rejects_a_torn_header() {
        for torn in [&[0u8, 0, 0][..], &[0, 0, 0, 4, b'n', b'p'][..]] {
            let mut src = torn;
            let mut iter = ChunkIter::new(&mut src, true);
            assert!(matches!(iter.next_chunk(), Err(Error::TruncatedStream)), "{torn:?}");
        }
    }
}
