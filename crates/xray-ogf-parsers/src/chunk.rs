// xray-ogf-parsers/src/chunk.rs
//! Generic chunk container
//!
//! Every OGF stream is a flat sequence of tagged, length-prefixed records.
//! A record payload may itself be a nested record sequence.
//!
//! ```text
//! ┌──────────┬──────────┬──────────────────────┐
//! │ id: u32  │ size: u32│ payload[size]        │  ← record
//! └──────────┴──────────┴──────────────────────┘
//!   bit 31 of id = compressed payload
//! ```
//!
//! [`ChunkReader`] is a bounded cursor over one container level. Sub-readers
//! handed out by [`ChunkReader::find_chunk`] can never read past the record
//! they were created for.
//!
//! [`ChunkWriter`] emits records through [`ChunkGuard`], which backpatches the
//! size field when dropped, so every opened record is closed on every path.

use std::ops::{Deref, DerefMut};

use byteorder::{ByteOrder, LittleEndian};
use smallvec::SmallVec;
use xray_ogf_core::{Vec2, Vec3};

use crate::traits::{ParseError, ParseResult};

/// Size of a record header (id + size)
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Id bit marking a compressed payload
pub const CHUNK_COMPRESSED: u32 = 0x8000_0000;

/// Bounded little-endian reader over one chunk container level
#[derive(Debug, Clone, Copy)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]` in the top-level stream
    base: u64,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, base: 0 }
    }

    fn sub(data: &'a [u8], base: u64) -> Self {
        Self { data, pos: 0, base }
    }

    /// Absolute offset of the cursor
    pub fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whole payload this reader is bounded to
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Fail when unread bytes remain in this bounded reader
    pub fn ensure_consumed(&self, context: &str) -> ParseResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ParseError::TrailingBytes {
                context: context.to_string(),
                remaining: self.remaining(),
            })
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(ParseError::UnexpectedEof {
                offset: self.offset(),
                requested: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn r_u8(&mut self) -> ParseResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn r_bool(&mut self) -> ParseResult<bool> {
        Ok(self.r_u8()? != 0)
    }

    pub fn r_u16(&mut self) -> ParseResult<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn r_i16(&mut self) -> ParseResult<i16> {
        Ok(LittleEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn r_u32(&mut self) -> ParseResult<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn r_f32(&mut self) -> ParseResult<f32> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn r_vec2(&mut self) -> ParseResult<Vec2> {
        Ok(Vec2::new(self.r_f32()?, self.r_f32()?))
    }

    pub fn r_vec3(&mut self) -> ParseResult<Vec3> {
        Ok(Vec3::new(self.r_f32()?, self.r_f32()?, self.r_f32()?))
    }

    /// 16-bit fixed point mapped onto `[min, max]`
    pub fn r_f32_q16(&mut self, min: f32, max: f32) -> ParseResult<f32> {
        Ok(dequantize_u16(self.r_u16()?, min, max))
    }

    /// Zero-terminated string
    pub fn r_sz(&mut self) -> ParseResult<String> {
        let rest = &self.data[self.pos..];
        let Some(end) = rest.iter().position(|&b| b == 0) else {
            return Err(ParseError::UnexpectedEof {
                offset: self.offset(),
                requested: rest.len() + 1,
                available: rest.len(),
            });
        };
        let s = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.pos += end + 1;
        Ok(s)
    }

    /// Walk every record of this container level from the start
    pub fn records(&self) -> ChunkRecords<'a> {
        ChunkRecords {
            data: self.data,
            pos: 0,
            base: self.base,
        }
    }

    /// Ids of every record in this container, in stream order
    pub fn chunk_ids(&self) -> ParseResult<Vec<u32>> {
        self.records().map(|r| r.map(|(id, _)| id)).collect()
    }

    /// Sub-reader for the first record with `id`, `None` when absent
    pub fn open_chunk(&self, id: u32) -> ParseResult<Option<ChunkReader<'a>>> {
        for record in self.records() {
            let (raw_id, reader) = record?;
            if raw_id & !CHUNK_COMPRESSED != id {
                continue;
            }
            if raw_id & CHUNK_COMPRESSED != 0 {
                return Err(ParseError::Unimplemented(format!(
                    "compressed chunk 0x{id:X} at offset {}",
                    reader.base
                )));
            }
            return Ok(Some(reader));
        }
        Ok(None)
    }

    /// Sub-reader for the first record with `id`, failing when absent
    pub fn find_chunk(&self, id: u32) -> ParseResult<ChunkReader<'a>> {
        self.open_chunk(id)?
            .ok_or_else(|| ParseError::missing_chunk(id, format!("container at offset {}", self.base)))
    }

    pub fn has_chunk(&self, id: u32) -> ParseResult<bool> {
        Ok(self.open_chunk(id)?.is_some())
    }

    /// Records numbered 0, 1, 2… until the first missing id
    pub fn sequence(&self) -> ParseResult<Vec<ChunkReader<'a>>> {
        let mut items = Vec::new();
        let mut id = 0u32;
        while let Some(reader) = self.open_chunk(id)? {
            items.push(reader);
            id += 1;
        }
        Ok(items)
    }
}

/// Iterator over the records of one container level
pub struct ChunkRecords<'a> {
    data: &'a [u8],
    pos: usize,
    base: u64,
}

impl<'a> Iterator for ChunkRecords<'a> {
    type Item = ParseResult<(u32, ChunkReader<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        let offset = self.base + self.pos as u64;
        let rest = &self.data[self.pos..];
        if rest.len() < CHUNK_HEADER_SIZE {
            self.pos = self.data.len();
            return Some(Err(ParseError::UnexpectedEof {
                offset,
                requested: CHUNK_HEADER_SIZE,
                available: rest.len(),
            }));
        }
        let id = LittleEndian::read_u32(&rest[0..4]);
        let size = LittleEndian::read_u32(&rest[4..8]);
        let available = rest.len() - CHUNK_HEADER_SIZE;
        if size as usize > available {
            self.pos = self.data.len();
            return Some(Err(ParseError::TruncatedChunk {
                chunk: id,
                offset,
                declared: size,
                available,
            }));
        }
        let start = self.pos + CHUNK_HEADER_SIZE;
        let end = start + size as usize;
        self.pos = end;
        Some(Ok((
            id,
            ChunkReader::sub(&self.data[start..end], self.base + start as u64),
        )))
    }
}

pub(crate) fn dequantize_u16(value: u16, min: f32, max: f32) -> f32 {
    f32::from(value) * (max - min) / 65535.0 + min
}

pub(crate) fn quantize_u16(value: f32, min: f32, max: f32) -> u16 {
    let clamped = value.clamp(min, max);
    ((clamped - min) * 65535.0 / (max - min)).round() as u16
}

/// Little-endian chunk stream writer
#[derive(Debug, Default)]
pub struct ChunkWriter {
    buf: Vec<u8>,
    /// Offsets of the size fields of currently open records
    open: SmallVec<[usize; 8]>,
}

impl ChunkWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a record; it is closed when the guard drops
    pub fn open_chunk(&mut self, id: u32) -> ChunkGuard<'_> {
        self.w_u32(id);
        self.open.push(self.buf.len());
        self.w_u32(0);
        ChunkGuard { writer: self }
    }

    /// Write a whole record through a closure
    pub fn chunk<F>(&mut self, id: u32, f: F) -> ParseResult<()>
    where
        F: FnOnce(&mut ChunkWriter) -> ParseResult<()>,
    {
        let mut guard = self.open_chunk(id);
        f(&mut *guard)
    }

    /// Write a record with a ready-made payload
    pub fn w_chunk(&mut self, id: u32, payload: &[u8]) {
        let mut guard = self.open_chunk(id);
        guard.w_bytes(payload);
    }

    fn close_chunk(&mut self) {
        if let Some(size_at) = self.open.pop() {
            let size = (self.buf.len() - size_at - 4) as u32;
            LittleEndian::write_u32(&mut self.buf[size_at..size_at + 4], size);
        }
    }

    /// Number of records still open
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn w_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn w_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn w_bool(&mut self, v: bool) {
        self.w_u8(u8::from(v));
    }

    pub fn w_u16(&mut self, v: u16) {
        let mut b = [0u8; 2];
        LittleEndian::write_u16(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn w_i16(&mut self, v: i16) {
        let mut b = [0u8; 2];
        LittleEndian::write_i16(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn w_u32(&mut self, v: u32) {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn w_f32(&mut self, v: f32) {
        let mut b = [0u8; 4];
        LittleEndian::write_f32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn w_vec2(&mut self, v: Vec2) {
        self.w_f32(v.x);
        self.w_f32(v.y);
    }

    pub fn w_vec3(&mut self, v: Vec3) {
        self.w_f32(v.x);
        self.w_f32(v.y);
        self.w_f32(v.z);
    }

    pub fn w_f32_q16(&mut self, v: f32, min: f32, max: f32) {
        self.w_u16(quantize_u16(v, min, max));
    }

    /// Zero-terminated string; anything after an embedded NUL is dropped
    pub fn w_sz(&mut self, s: &str) {
        let bytes = s.as_bytes();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        self.buf.extend_from_slice(&bytes[..end]);
        self.buf.push(0);
    }
}

/// Open record scope; closes the record on drop
pub struct ChunkGuard<'w> {
    writer: &'w mut ChunkWriter,
}

impl Deref for ChunkGuard<'_> {
    type Target = ChunkWriter;

    fn deref(&self) -> &ChunkWriter {
        self.writer
    }
}

impl DerefMut for ChunkGuard<'_> {
    fn deref_mut(&mut self) -> &mut ChunkWriter {
        self.writer
    }
}

impl Drop for ChunkGuard<'_> {
    fn drop(&mut self) {
        self.writer.close_chunk();
    }
}
