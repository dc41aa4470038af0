// xray-ogf-parsers/src/ogf/lod.rs
//! Fixed progressive-mesh LOD
//!
//! The `LodData` chunk logs one vertex split per vertex above the base LOD.
//! Replaying the log against the full index buffer yields the base index
//! buffer usable when only the first `min_vertices` vertices are resident.
//!
//! ```text
//! LodData
//! ├── 0x1 header       u32 min_vertices, u32 min_indices
//! ├── 0x2 vert splits  (V - M) × { u16 vert, u8 new_tris, u8 fix_faces }
//! └── 0x3 fix faces    u32 n, n × u16 index-buffer slot
//! ```

use serde::{Deserialize, Serialize};

use super::chunks::{HOPPE_FIX_FACES, HOPPE_HEADER, HOPPE_VERT_SPLITS};
use super::mesh::IndexBuffer;
use crate::chunk::{ChunkReader, ChunkWriter};
use crate::traits::{ParseError, ParseResult};

/// One vertex-split record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VSplit {
    pub vert: u16,
    pub new_tris: u8,
    /// Number of fix-face slots this split consumes
    pub fix_faces: u8,
}

/// Decoded progressive LOD data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressiveLod {
    pub min_vertices: u32,
    pub min_indices: u32,
    pub vsplits: Vec<VSplit>,
    pub fix_faces: Vec<u16>,
    /// Reconstructed base-LOD index buffer
    pub base_indices: IndexBuffer,
}

impl ProgressiveLod {
    /// Validate the split log and reconstruct the base index buffer
    pub fn new(
        min_vertices: u32,
        min_indices: u32,
        vsplits: Vec<VSplit>,
        fix_faces: Vec<u16>,
        indices: &IndexBuffer,
        vertex_count: usize,
    ) -> ParseResult<Self> {
        let base_indices = replay(indices, min_vertices as usize, &vsplits, &fix_faces, vertex_count)?;
        Ok(Self {
            min_vertices,
            min_indices,
            vsplits,
            fix_faces,
            base_indices,
        })
    }

    /// Decode the nested `LodData` container
    pub fn read(r: &ChunkReader<'_>, indices: &IndexBuffer, vertex_count: usize) -> ParseResult<Self> {
        let mut header = r.find_chunk(HOPPE_HEADER)?;
        let min_vertices = header.r_u32()?;
        let min_indices = header.r_u32()?;
        header.ensure_consumed("LOD header")?;

        if min_vertices as usize > vertex_count {
            return Err(ParseError::InvalidStructure(format!(
                "LOD base of {min_vertices} vertices exceeds the {vertex_count} available"
            )));
        }

        let mut splits = r.find_chunk(HOPPE_VERT_SPLITS)?;
        let num_vsplits = vertex_count - min_vertices as usize;
        let mut vsplits = Vec::with_capacity(num_vsplits);
        for _ in 0..num_vsplits {
            vsplits.push(VSplit {
                vert: splits.r_u16()?,
                new_tris: splits.r_u8()?,
                fix_faces: splits.r_u8()?,
            });
        }
        splits.ensure_consumed("LOD vertex splits")?;

        let mut fixes = r.find_chunk(HOPPE_FIX_FACES)?;
        let count = fixes.r_u32()? as usize;
        let mut fix_faces = Vec::with_capacity(count.min(fixes.remaining() / 2));
        for _ in 0..count {
            fix_faces.push(fixes.r_u16()?);
        }
        fixes.ensure_consumed("LOD fix faces")?;

        tracing::debug!(
            min_vertices,
            vsplits = vsplits.len(),
            fix_faces = fix_faces.len(),
            "Loaded progressive LOD"
        );

        Self::new(min_vertices, min_indices, vsplits, fix_faces, indices, vertex_count)
    }

    /// Write the nested `LodData` payload
    pub fn write(&self, w: &mut ChunkWriter) {
        {
            let mut c = w.open_chunk(HOPPE_HEADER);
            c.w_u32(self.min_vertices);
            c.w_u32(self.min_indices);
        }
        {
            let mut c = w.open_chunk(HOPPE_VERT_SPLITS);
            for s in &self.vsplits {
                c.w_u16(s.vert);
                c.w_u8(s.new_tris);
                c.w_u8(s.fix_faces);
            }
        }
        let mut c = w.open_chunk(HOPPE_FIX_FACES);
        c.w_u32(self.fix_faces.len() as u32);
        for &f in &self.fix_faces {
            c.w_u16(f);
        }
    }

    /// Base LOD triangle count
    pub fn base_triangle_count(&self) -> usize {
        self.min_indices as usize / 3
    }
}

/// Replay vertex splits over `indices`, producing the base index buffer
///
/// Split `i` introduces vertex `min_vertices + i`; each fix-face slot it
/// consumes is pointed at the active vertex count at that moment.
pub fn replay(
    indices: &IndexBuffer,
    min_vertices: usize,
    vsplits: &[VSplit],
    fix_faces: &[u16],
    vertex_count: usize,
) -> ParseResult<IndexBuffer> {
    let expected_splits = vertex_count.checked_sub(min_vertices).ok_or_else(|| {
        ParseError::InvalidStructure(format!(
            "LOD base of {min_vertices} vertices exceeds the {vertex_count} available"
        ))
    })?;
    if vsplits.len() != expected_splits {
        return Err(ParseError::VertexCountMismatch {
            expected: vertex_count,
            found: min_vertices + vsplits.len(),
        });
    }
    if vertex_count > usize::from(u16::MAX) + 1 {
        return Err(ParseError::InvalidStructure(format!(
            "{vertex_count} vertices cannot be addressed by 16-bit indices"
        )));
    }

    let consumed: usize = vsplits.iter().map(|s| usize::from(s.fix_faces)).sum();
    if consumed != fix_faces.len() {
        return Err(ParseError::FixFaceMismatch {
            consumed,
            available: fix_faces.len(),
        });
    }

    let mut base = indices.0.clone();
    let mut fixes = fix_faces.iter();
    let mut active = min_vertices;
    for split in vsplits {
        for _ in 0..split.fix_faces {
            let Some(&slot) = fixes.next() else {
                return Err(ParseError::FixFaceMismatch {
                    consumed,
                    available: fix_faces.len(),
                });
            };
            let target = base.get_mut(usize::from(slot)).ok_or_else(|| {
                ParseError::InvalidStructure(format!(
                    "fix-face slot {slot} outside index buffer of {}",
                    indices.len()
                ))
            })?;
            *target = active as u16;
        }
        active += 1;
    }

    if active != vertex_count {
        return Err(ParseError::VertexCountMismatch {
            expected: vertex_count,
            found: active,
        });
    }
    Ok(IndexBuffer(base))
}
