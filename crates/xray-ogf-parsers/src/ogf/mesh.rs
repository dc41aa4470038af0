// xray-ogf-parsers/src/ogf/mesh.rs
//! Vertex and index buffers

use serde::{Deserialize, Serialize};
use xray_ogf_core::{BoundingBox, Vec2, Vec3};

use crate::chunk::{ChunkReader, ChunkWriter};
use crate::traits::{ParseError, ParseResult};

/// On-disk vertex layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexFormat {
    /// Position, normal, texture coordinate
    Static,
    /// Static layout plus one bone index per vertex
    SkinnedOneLink,
}

impl VertexFormat {
    pub const STATIC_FVF: u32 = 0x112;
    pub const SKINNED_1L_FVF: u32 = 0x1207_1980;

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            Self::STATIC_FVF => Some(VertexFormat::Static),
            Self::SKINNED_1L_FVF => Some(VertexFormat::SkinnedOneLink),
            _ => None,
        }
    }

    pub fn to_u32(&self) -> u32 {
        match self {
            VertexFormat::Static => Self::STATIC_FVF,
            VertexFormat::SkinnedOneLink => Self::SKINNED_1L_FVF,
        }
    }

    /// Bytes per vertex on disk
    pub fn stride(&self) -> usize {
        match self {
            VertexFormat::Static => 32,
            VertexFormat::SkinnedOneLink => 36,
        }
    }
}

/// Owned vertex storage, one entry per vertex in every array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexBuffer {
    pub format: VertexFormat,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// Bone index per vertex (skinned formats only)
    pub bones: Vec<u32>,
}

impl VertexBuffer {
    pub fn new(format: VertexFormat) -> Self {
        Self {
            format,
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            bones: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn is_skinned(&self) -> bool {
        self.format == VertexFormat::SkinnedOneLink
    }

    pub fn push(&mut self, position: Vec3, normal: Vec3, uv: Vec2) {
        self.positions.push(position);
        self.normals.push(normal);
        self.uvs.push(uv);
    }

    pub fn push_skinned(&mut self, position: Vec3, normal: Vec3, uv: Vec2, bone: u32) {
        self.push(position, normal, uv);
        self.bones.push(bone);
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.positions)
    }

    /// Decode `u32 format, u32 count, count × vertex`
    pub fn read(r: &mut ChunkReader<'_>) -> ParseResult<Self> {
        let raw_format = r.r_u32()?;
        let format = VertexFormat::from_u32(raw_format)
            .ok_or_else(|| ParseError::Unimplemented(format!("vertex format 0x{raw_format:X}")))?;
        let count = r.r_u32()? as usize;
        let needed = count.checked_mul(format.stride()).unwrap_or(usize::MAX);
        if needed > r.remaining() {
            return Err(ParseError::UnexpectedEof {
                offset: r.offset(),
                requested: needed,
                available: r.remaining(),
            });
        }

        let mut vb = VertexBuffer::new(format);
        vb.positions.reserve(count);
        vb.normals.reserve(count);
        vb.uvs.reserve(count);
        for _ in 0..count {
            let position = r.r_vec3()?;
            let normal = r.r_vec3()?;
            let uv = r.r_vec2()?;
            match format {
                VertexFormat::Static => vb.push(position, normal, uv),
                VertexFormat::SkinnedOneLink => {
                    let bone = r.r_u32()?;
                    vb.push_skinned(position, normal, uv, bone);
                }
            }
        }
        Ok(vb)
    }

    pub fn write(&self, w: &mut ChunkWriter) -> ParseResult<()> {
        if self.normals.len() != self.len() || self.uvs.len() != self.len() {
            return Err(ParseError::CountMismatch {
                what: "vertex attributes",
                expected: self.len(),
                found: self.normals.len().min(self.uvs.len()),
            });
        }
        if self.is_skinned() && self.bones.len() != self.len() {
            return Err(ParseError::CountMismatch {
                what: "vertex bone links",
                expected: self.len(),
                found: self.bones.len(),
            });
        }
        w.w_u32(self.format.to_u32());
        w.w_u32(self.len() as u32);
        for i in 0..self.len() {
            w.w_vec3(self.positions[i]);
            w.w_vec3(self.normals[i]);
            w.w_vec2(self.uvs[i]);
            if self.is_skinned() {
                w.w_u32(self.bones[i]);
            }
        }
        Ok(())
    }

    /// Borrowed window `[offset, offset + count)`
    pub fn view(&self, offset: usize, count: usize) -> ParseResult<VertexView<'_>> {
        let end = offset.checked_add(count).filter(|&end| end <= self.len());
        match end {
            Some(_) => Ok(VertexView { buffer: self, offset, count }),
            None => Err(ParseError::InvalidStructure(format!(
                "vertex range {offset}+{count} exceeds pool of {} vertices",
                self.len()
            ))),
        }
    }
}

/// Reference into a shared vertex pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalVertexRef {
    pub pool: u32,
    pub offset: u32,
    pub count: u32,
}

impl ExternalVertexRef {
    pub fn read(r: &mut ChunkReader<'_>) -> ParseResult<Self> {
        Ok(Self {
            pool: r.r_u32()?,
            offset: r.r_u32()?,
            count: r.r_u32()?,
        })
    }

    pub fn write(&self, w: &mut ChunkWriter) {
        w.w_u32(self.pool);
        w.w_u32(self.offset);
        w.w_u32(self.count);
    }

    /// Bounds-checked view into `pools`
    pub fn resolve<'p>(&self, pools: &'p [VertexBuffer]) -> ParseResult<VertexView<'p>> {
        let pool = pools.get(self.pool as usize).ok_or_else(|| {
            ParseError::unresolved("vertex pool", self.pool.to_string(), format!("{} pools available", pools.len()))
        })?;
        pool.view(self.offset as usize, self.count as usize)
    }
}

/// Vertex data owned by the model or proxied into an external pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VertexSource {
    Owned(VertexBuffer),
    External(ExternalVertexRef),
}

impl VertexSource {
    /// Number of vertices, known for both forms
    pub fn len(&self) -> usize {
        match self {
            VertexSource::Owned(vb) => vb.len(),
            VertexSource::External(ext) => ext.count as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn owned(&self) -> Option<&VertexBuffer> {
        match self {
            VertexSource::Owned(vb) => Some(vb),
            VertexSource::External(_) => None,
        }
    }
}

/// Read-only window over a vertex buffer
#[derive(Debug, Clone, Copy)]
pub struct VertexView<'a> {
    buffer: &'a VertexBuffer,
    offset: usize,
    count: usize,
}

impl<'a> VertexView<'a> {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn format(&self) -> VertexFormat {
        self.buffer.format
    }

    pub fn positions(&self) -> &'a [Vec3] {
        &self.buffer.positions[self.offset..self.offset + self.count]
    }

    pub fn normals(&self) -> &'a [Vec3] {
        &self.buffer.normals[self.offset..self.offset + self.count]
    }

    pub fn uvs(&self) -> &'a [Vec2] {
        &self.buffer.uvs[self.offset..self.offset + self.count]
    }

    pub fn bones(&self) -> &'a [u32] {
        self.buffer
            .bones
            .get(self.offset..self.offset + self.count)
            .unwrap_or(&[])
    }

    /// Copy the window into owned storage
    pub fn to_owned_buffer(&self) -> VertexBuffer {
        VertexBuffer {
            format: self.buffer.format,
            positions: self.positions().to_vec(),
            normals: self.normals().to_vec(),
            uvs: self.uvs().to_vec(),
            bones: self.bones().to_vec(),
        }
    }
}

/// Triangle list, three indices per face
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBuffer(pub Vec<u16>);

impl IndexBuffer {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.0
    }

    pub fn triangle_count(&self) -> usize {
        self.0.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u16; 3]> + '_ {
        self.0.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Highest referenced vertex, `None` when empty
    pub fn max_index(&self) -> Option<u16> {
        self.0.iter().copied().max()
    }

    /// Decode `u32 count, count × u16`
    pub fn read(r: &mut ChunkReader<'_>) -> ParseResult<Self> {
        let count = r.r_u32()? as usize;
        if count % 3 != 0 {
            return Err(ParseError::InvalidStructure(format!(
                "index count {count} is not a multiple of 3"
            )));
        }
        let needed = count.checked_mul(2).unwrap_or(usize::MAX);
        if needed > r.remaining() {
            return Err(ParseError::UnexpectedEof {
                offset: r.offset(),
                requested: needed,
                available: r.remaining(),
            });
        }
        let mut indices = Vec::with_capacity(count);
        for _ in 0..count {
            indices.push(r.r_u16()?);
        }
        Ok(IndexBuffer(indices))
    }

    pub fn write(&self, w: &mut ChunkWriter) {
        w.w_u32(self.0.len() as u32);
        for &i in &self.0 {
            w.w_u16(i);
        }
    }
}

impl From<Vec<u16>> for IndexBuffer {
    fn from(v: Vec<u16>) -> Self {
        IndexBuffer(v)
    }
}
