// xray-ogf-parsers/src/ogf/chunks.rs
//! OGF chunk ids, model types and format constants

use serde::{Deserialize, Serialize};

/// Only supported format version
pub const OGF_VERSION: u8 = 3;

/// Sample rate of inline bone motions
pub const MOTION_FPS: f32 = 30.0;

/// Motion target meaning "every partition"
pub const ALL_PARTITIONS: u16 = 0xFFFF;

/// Sub-chunks of `LodData`
pub const HOPPE_HEADER: u32 = 0x1;
pub const HOPPE_VERT_SPLITS: u32 = 0x2;
pub const HOPPE_FIX_FACES: u32 = 0x3;

/// Top-level chunk ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OgfChunkId {
    Header,
    Texture,
    TextureL,
    ChildRefs,
    BBox,
    Vertices,
    Indices,
    LodData,
    VContainer,
    BSphere,
    ChildrenL,
    BoneNames,
    Motions,
    DetailPatch,
    Lods,
    Children,
    SmParams,
    Unknown(u32),
}

impl OgfChunkId {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0x01 => OgfChunkId::Header,
            0x02 => OgfChunkId::Texture,
            0x03 => OgfChunkId::TextureL,
            0x05 => OgfChunkId::ChildRefs,
            0x06 => OgfChunkId::BBox,
            0x07 => OgfChunkId::Vertices,
            0x08 => OgfChunkId::Indices,
            0x09 => OgfChunkId::LodData,
            0x0A => OgfChunkId::VContainer,
            0x0B => OgfChunkId::BSphere,
            0x0C => OgfChunkId::ChildrenL,
            0x0D => OgfChunkId::BoneNames,
            0x0E => OgfChunkId::Motions,
            0x0F => OgfChunkId::DetailPatch,
            0x10 => OgfChunkId::Lods,
            0x11 => OgfChunkId::Children,
            0x12 => OgfChunkId::SmParams,
            other => OgfChunkId::Unknown(other),
        }
    }

    pub fn to_u32(&self) -> u32 {
        match self {
            OgfChunkId::Header => 0x01,
            OgfChunkId::Texture => 0x02,
            OgfChunkId::TextureL => 0x03,
            OgfChunkId::ChildRefs => 0x05,
            OgfChunkId::BBox => 0x06,
            OgfChunkId::Vertices => 0x07,
            OgfChunkId::Indices => 0x08,
            OgfChunkId::LodData => 0x09,
            OgfChunkId::VContainer => 0x0A,
            OgfChunkId::BSphere => 0x0B,
            OgfChunkId::ChildrenL => 0x0C,
            OgfChunkId::BoneNames => 0x0D,
            OgfChunkId::Motions => 0x0E,
            OgfChunkId::DetailPatch => 0x0F,
            OgfChunkId::Lods => 0x10,
            OgfChunkId::Children => 0x11,
            OgfChunkId::SmParams => 0x12,
            OgfChunkId::Unknown(v) => *v,
        }
    }

    /// Check if this chunk carries a child model list
    pub fn is_child_list(&self) -> bool {
        matches!(self, OgfChunkId::ChildrenL | OgfChunkId::Children | OgfChunkId::ChildRefs)
    }
}

/// Model-type tag stored in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    Normal,
    Hierarchy,
    /// Plain visual with one fixed progressive LOD
    Progressive,
    SkeletonGeomPM,
    SkeletonAnimated,
    DetailPatch,
    SkeletonGeomStatic,
    Cached,
    Particle,
    /// Chain of independently encoded LOD models
    Progressive2,
}

impl ModelType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => ModelType::Normal,
            1 => ModelType::Hierarchy,
            2 => ModelType::Progressive,
            3 => ModelType::SkeletonGeomPM,
            4 => ModelType::SkeletonAnimated,
            6 => ModelType::DetailPatch,
            7 => ModelType::SkeletonGeomStatic,
            8 => ModelType::Cached,
            9 => ModelType::Particle,
            10 => ModelType::Progressive2,
            _ => return None,
        })
    }

    pub fn to_u8(&self) -> u8 {
        match self {
            ModelType::Normal => 0,
            ModelType::Hierarchy => 1,
            ModelType::Progressive => 2,
            ModelType::SkeletonGeomPM => 3,
            ModelType::SkeletonAnimated => 4,
            ModelType::DetailPatch => 6,
            ModelType::SkeletonGeomStatic => 7,
            ModelType::Cached => 8,
            ModelType::Particle => 9,
            ModelType::Progressive2 => 10,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelType::Normal => "normal",
            ModelType::Hierarchy => "hierarchy",
            ModelType::Progressive => "progressive",
            ModelType::SkeletonGeomPM => "skeleton_geom_pm",
            ModelType::SkeletonAnimated => "skeleton_animated",
            ModelType::DetailPatch => "detail_patch",
            ModelType::SkeletonGeomStatic => "skeleton_geom_static",
            ModelType::Cached => "cached",
            ModelType::Particle => "particle",
            ModelType::Progressive2 => "progressive2",
        }
    }

    /// Types whose decode sequence includes a child list
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, ModelType::Hierarchy | ModelType::SkeletonAnimated)
    }

    pub fn is_skeletal(&self) -> bool {
        matches!(self, ModelType::SkeletonAnimated)
    }

    /// Types carrying fixed progressive LOD data
    pub fn is_progressive(&self) -> bool {
        matches!(self, ModelType::Progressive | ModelType::SkeletonGeomPM)
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
