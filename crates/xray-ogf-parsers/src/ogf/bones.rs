// xray-ogf-parsers/src/ogf/bones.rs
//! Skeleton, bones and partitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use xray_ogf_core::{Mat3, Obb, Vec3};

use crate::chunk::{ChunkReader, ChunkWriter};
use crate::traits::{ParseError, ParseResult};

/// Bind length assigned to bones whose source carries no bind pose
pub const DEFAULT_BIND_LENGTH: f32 = 0.5;

/// Single bone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    /// Bone name (unique within a skeleton)
    pub name: String,
    /// Parent name as stored; empty or equal to `name` for the root
    pub parent_name: String,
    /// Parent bone index, resolved by the skeleton builder
    pub parent_index: Option<usize>,
    pub bind_offset: Vec3,
    /// Bind rotation as XYZ Euler angles
    pub bind_rotate: Vec3,
    pub bind_length: f32,
    /// Collision box
    pub shape: Obb,
}

impl Bone {
    /// Bone with the default bind pose
    pub fn new(name: impl Into<String>, parent_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_name: parent_name.into(),
            parent_index: None,
            bind_offset: Vec3::ZERO,
            bind_rotate: Vec3::ZERO,
            bind_length: DEFAULT_BIND_LENGTH,
            shape: Obb::default(),
        }
    }

    /// Whether the stored parent reference marks this bone as the root
    pub fn is_root_reference(&self) -> bool {
        self.parent_name.is_empty() || self.parent_name == self.name
    }

    /// Decode `sz name, sz parent, obb`
    pub fn read(r: &mut ChunkReader<'_>) -> ParseResult<Self> {
        let mut bone = Bone::new(r.r_sz()?, r.r_sz()?);
        let mut rotate = [0.0f32; 9];
        for v in &mut rotate {
            *v = r.r_f32()?;
        }
        bone.shape = Obb {
            rotate: Mat3::from_flat(&rotate),
            translate: r.r_vec3()?,
            half_size: r.r_vec3()?,
        };
        Ok(bone)
    }

    pub fn write(&self, w: &mut ChunkWriter) {
        w.w_sz(&self.name);
        w.w_sz(&self.parent_name);
        for v in self.shape.rotate.to_flat() {
            w.w_f32(v);
        }
        w.w_vec3(self.shape.translate);
        w.w_vec3(self.shape.half_size);
    }
}

/// Named bone group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub name: String,
    /// Member bone indices
    pub bones: Vec<usize>,
}

/// Bone tree plus partitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    /// All bones in stream order
    pub bones: Vec<Bone>,
    /// Bone name to index mapping
    pub bone_map: HashMap<String, usize>,
    /// Root bone index
    pub root: usize,
    pub partitions: Vec<Partition>,
}

impl Skeleton {
    /// Build the bone tree from a flat, name-linked list
    pub fn build(mut bones: Vec<Bone>) -> ParseResult<Self> {
        let mut bone_map = HashMap::with_capacity(bones.len());
        for (idx, bone) in bones.iter().enumerate() {
            if bone_map.insert(bone.name.clone(), idx).is_some() {
                return Err(ParseError::DuplicateName {
                    kind: "bone",
                    name: bone.name.clone(),
                });
            }
        }

        let mut roots = Vec::new();
        for idx in 0..bones.len() {
            let bone = &bones[idx];
            if bone.is_root_reference() {
                roots.push(idx);
                bones[idx].parent_index = None;
                continue;
            }
            let parent = *bone_map.get(&bone.parent_name).ok_or_else(|| {
                ParseError::unresolved("bone", bone.parent_name.clone(), format!("parent of '{}'", bone.name))
            })?;
            bones[idx].parent_index = Some(parent);
        }

        if roots.len() != 1 {
            return Err(ParseError::RootCount { found: roots.len() });
        }

        // A chain longer than the bone count cannot reach the root.
        for (idx, bone) in bones.iter().enumerate() {
            let mut current = idx;
            let mut steps = 0;
            while let Some(parent) = bones[current].parent_index {
                steps += 1;
                if steps > bones.len() {
                    return Err(ParseError::BoneCycle { name: bone.name.clone() });
                }
                current = parent;
            }
        }

        Ok(Self {
            bones,
            bone_map,
            root: roots[0],
            partitions: Vec::new(),
        })
    }

    /// Get bone count
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Find bone by name
    pub fn find_bone(&self, name: &str) -> Option<&Bone> {
        self.bone_map.get(name).map(|&idx| &self.bones[idx])
    }

    /// Find bone index by name
    pub fn find_bone_index(&self, name: &str) -> Option<usize> {
        self.bone_map.get(name).copied()
    }

    pub fn root_bone(&self) -> Option<&Bone> {
        self.bones.get(self.root)
    }

    /// Get children of a bone
    pub fn children(&self, bone_index: usize) -> Vec<usize> {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent_index == Some(bone_index))
            .map(|(i, _)| i)
            .collect()
    }

    /// Get bone chain from a bone to root
    pub fn bone_chain_to_root(&self, bone_index: usize) -> Vec<usize> {
        let mut chain = vec![bone_index];
        let mut current = bone_index;

        while let Some(parent) = self.bones.get(current).and_then(|b| b.parent_index) {
            chain.push(parent);
            current = parent;
        }

        chain
    }

    /// Get all bone names
    pub fn bone_names(&self) -> Vec<&str> {
        self.bones.iter().map(|b| b.name.as_str()).collect()
    }

    /// Find partition and its index by name
    pub fn find_partition(&self, name: &str) -> Option<(usize, &Partition)> {
        self.partitions.iter().enumerate().find(|(_, p)| p.name == name)
    }

    pub fn partition(&self, id: usize) -> Option<&Partition> {
        self.partitions.get(id)
    }

    /// Partition from bone indices; every index must name a bone
    pub fn partition_from_ids(&self, name: String, ids: &[u32]) -> ParseResult<Partition> {
        let bones = ids
            .iter()
            .map(|&id| {
                let id = id as usize;
                if id < self.bones.len() {
                    Ok(id)
                } else {
                    Err(ParseError::unresolved("bone", id.to_string(), format!("partition '{name}'")))
                }
            })
            .collect::<ParseResult<Vec<_>>>()?;
        Ok(Partition { name, bones })
    }

    /// Partition from bone names; every name must resolve, at least one is required
    pub fn partition_from_names<'n>(
        &self,
        name: String,
        names: impl IntoIterator<Item = &'n str>,
    ) -> ParseResult<Partition> {
        let mut bones = Vec::new();
        for bone_name in names {
            let id = self.find_bone_index(bone_name).ok_or_else(|| {
                ParseError::unresolved("bone", bone_name, format!("partition '{name}'"))
            })?;
            bones.push(id);
        }
        if bones.is_empty() {
            return Err(ParseError::EmptyCollection {
                what: format!("partition '{name}'"),
            });
        }
        Ok(Partition { name, bones })
    }

    /// Write the `S_BONE_NAMES` payload
    pub fn write_bone_names(&self, w: &mut ChunkWriter) {
        w.w_u32(self.bones.len() as u32);
        for bone in &self.bones {
            bone.write(w);
        }
    }

    /// Write the partition table of `S_SMPARAMS`
    pub fn write_partitions(&self, w: &mut ChunkWriter) -> ParseResult<()> {
        w.w_u16(count_u16(self.partitions.len(), "partitions")?);
        for part in &self.partitions {
            w.w_sz(&part.name);
            w.w_u16(count_u16(part.bones.len(), "partition bones")?);
            for &id in &part.bones {
                w.w_u32(id as u32);
            }
        }
        Ok(())
    }
}

pub(crate) fn count_u16(count: usize, what: &str) -> ParseResult<u16> {
    u16::try_from(count)
        .map_err(|_| ParseError::InvalidStructure(format!("{count} {what} do not fit a 16-bit count")))
}
