// xray-ogf-parsers/src/ogf/encode.rs
//! OGF encoder
//!
//! Writes the chunk set the decoder expects for each model type. Motion
//! parameters are always stored inline as `S_SMPARAMS`, so a model decoded
//! from a sidecar configuration re-encodes as a self-contained file.

use super::chunks::{ModelType, OgfChunkId};
use super::motions::{write_motion_data, write_smparams};
use super::{Children, OgfModel, TextureRef, VertexSource};
use crate::chunk::ChunkWriter;
use crate::traits::{ParseError, ParseResult};

/// Encode a model tree into a complete OGF stream
pub fn encode(model: &OgfModel) -> ParseResult<Vec<u8>> {
    let mut w = ChunkWriter::new();
    encode_into(model, &mut w)?;
    tracing::debug!(model_type = %model.model_type, bytes = w.len(), "Encoded model");
    Ok(w.into_inner())
}

fn encode_into(model: &OgfModel, w: &mut ChunkWriter) -> ParseResult<()> {
    {
        let mut c = w.open_chunk(OgfChunkId::Header.to_u32());
        c.w_u8(model.version);
        c.w_u8(model.model_type.to_u8());
        c.w_u16(0);
    }
    write_render_visual(model, w);

    match model.model_type {
        ModelType::Normal | ModelType::SkeletonGeomStatic => write_visual(model, w)?,
        ModelType::Progressive | ModelType::SkeletonGeomPM => {
            write_visual(model, w)?;
            let lod = model
                .lod
                .as_ref()
                .ok_or_else(|| ParseError::missing_chunk(OgfChunkId::LodData.to_u32(), "progressive visual"))?;
            let mut c = w.open_chunk(OgfChunkId::LodData.to_u32());
            lod.write(&mut c);
        }
        ModelType::Hierarchy => write_children(model, w)?,
        ModelType::SkeletonAnimated => {
            write_children(model, w)?;
            let skeleton = model
                .skeleton
                .as_ref()
                .ok_or_else(|| ParseError::missing_chunk(OgfChunkId::BoneNames.to_u32(), "animated model"))?;
            {
                let mut c = w.open_chunk(OgfChunkId::BoneNames.to_u32());
                skeleton.write_bone_names(&mut c);
            }
            w.chunk(OgfChunkId::SmParams.to_u32(), |c| {
                write_smparams(c, skeleton, &model.motions)
            })?;
            w.chunk(OgfChunkId::Motions.to_u32(), |c| {
                write_motion_data(c, &model.motions, skeleton)
            })?;
        }
        ModelType::DetailPatch => {
            return Err(ParseError::Unimplemented("detail patch chunk".to_string()));
        }
        ModelType::Cached => {
            if !matches!(model.vertices, Some(VertexSource::Owned(_))) {
                return Err(ParseError::InvalidStructure(
                    "cached visual requires owned vertices".to_string(),
                ));
            }
            write_visual(model, w)?;
        }
        ModelType::Particle => {}
        ModelType::Progressive2 => {
            w.chunk(OgfChunkId::Lods.to_u32(), |c| {
                for (i, lod) in model.lods.iter().enumerate() {
                    c.chunk(i as u32, |c| encode_into(lod, c))?;
                }
                Ok(())
            })?;
        }
    }
    Ok(())
}

fn write_render_visual(model: &OgfModel, w: &mut ChunkWriter) {
    {
        let mut c = w.open_chunk(OgfChunkId::BBox.to_u32());
        c.w_vec3(model.bbox.min);
        c.w_vec3(model.bbox.max);
    }
    if let Some(sphere) = &model.bsphere {
        let mut c = w.open_chunk(OgfChunkId::BSphere.to_u32());
        c.w_vec3(sphere.center);
        c.w_f32(sphere.radius);
    }
    match &model.texture {
        Some(TextureRef::Indexed { texture, shader }) => {
            let mut c = w.open_chunk(OgfChunkId::TextureL.to_u32());
            c.w_u32(*texture);
            c.w_u32(*shader);
        }
        Some(TextureRef::Named { texture, shader }) => {
            let mut c = w.open_chunk(OgfChunkId::Texture.to_u32());
            c.w_sz(texture);
            c.w_sz(shader);
        }
        None => {}
    }
}

fn write_visual(model: &OgfModel, w: &mut ChunkWriter) -> ParseResult<()> {
    match &model.vertices {
        Some(VertexSource::Owned(vb)) => {
            w.chunk(OgfChunkId::Vertices.to_u32(), |c| vb.write(c))?;
        }
        Some(VertexSource::External(ext)) => {
            let mut c = w.open_chunk(OgfChunkId::VContainer.to_u32());
            ext.write(&mut c);
        }
        None => return Err(ParseError::missing_chunk(OgfChunkId::Vertices.to_u32(), "visual")),
    }
    let indices = model
        .indices
        .as_ref()
        .ok_or_else(|| ParseError::missing_chunk(OgfChunkId::Indices.to_u32(), "visual"))?;
    let mut c = w.open_chunk(OgfChunkId::Indices.to_u32());
    indices.write(&mut c);
    Ok(())
}

fn write_children(model: &OgfModel, w: &mut ChunkWriter) -> ParseResult<()> {
    match &model.children {
        Children::None => {
            return Err(ParseError::InvalidStructure(format!(
                "{} model has no child list",
                model.model_type
            )))
        }
        Children::Indices(ids) => {
            let mut c = w.open_chunk(OgfChunkId::ChildrenL.to_u32());
            c.w_u32(ids.len() as u32);
            for &id in ids {
                c.w_u32(id);
            }
        }
        Children::Inline(children) => {
            w.chunk(OgfChunkId::Children.to_u32(), |c| {
                for (i, child) in children.iter().enumerate() {
                    c.chunk(i as u32, |c| encode_into(child, c))?;
                }
                Ok(())
            })?;
        }
        Children::Files(files) => {
            let mut c = w.open_chunk(OgfChunkId::ChildRefs.to_u32());
            c.w_u32(files.len() as u32);
            for file in files {
                c.w_sz(&file.path);
            }
        }
    }
    Ok(())
}
