// xray-ogf-parsers/src/ogf/motions.rs
//! Skeletal motions
//!
//! Motion parameters come either from the inline `S_SMPARAMS` chunk or from
//! a sidecar `.ltx` file next to the model. Both produce the same ordered
//! motion table; the `S_MOTIONS` chunk then supplies per-bone samples,
//! addressed by motion name.

use serde::{Deserialize, Serialize};
use xray_ogf_core::Vec3;

use super::bones::{count_u16, Skeleton};
use super::chunks::{ALL_PARTITIONS, MOTION_FPS};
use crate::chunk::{ChunkReader, ChunkWriter};
use crate::envelope::{Envelope, EnvelopeKind};
use crate::traits::{ConfigReader, ParseError, ParseResult};

const MOTION_TYPE_CYCLE: u8 = 0;
const MOTION_TYPE_FX: u8 = 1;
const QUAT_SCALE: f32 = 32767.0;

/// Sidecar value meaning "all partitions"
const NO_PARTITION: &str = "--none--";

const MOTION_KEYS: [&str; 8] = ["motion", "part", "bone", "speed", "power", "accrue", "falloff", "stop@end"];

/// Motion flag bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionFlags(pub u32);

impl MotionFlags {
    /// Single-bone effect motion, played once
    pub const FX: u32 = 0x1;
    pub const STOP_AT_END: u32 = 0x2;

    pub fn contains(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn set(&mut self, bit: u32, on: bool) {
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    pub fn is_fx(&self) -> bool {
        self.contains(Self::FX)
    }

    pub fn stop_at_end(&self) -> bool {
        self.contains(Self::STOP_AT_END)
    }
}

/// What a motion drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionTarget {
    Bone(u16),
    Partition(u16),
    AllPartitions,
}

impl MotionTarget {
    pub fn to_u16(&self) -> u16 {
        match self {
            MotionTarget::Bone(id) | MotionTarget::Partition(id) => *id,
            MotionTarget::AllPartitions => ALL_PARTITIONS,
        }
    }
}

/// Where the motion parameters were read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionSource {
    Inline,
    Sidecar(String),
}

/// Per-bone curves: translation x, y, z then rotation x, y, z
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneMotion {
    pub bone: String,
    pub envelopes: [Envelope; 6],
}

impl BoneMotion {
    pub fn new(bone: impl Into<String>) -> Self {
        Self {
            bone: bone.into(),
            envelopes: std::array::from_fn(|i| {
                Envelope::new(if i < 3 {
                    EnvelopeKind::Translation
                } else {
                    EnvelopeKind::Rotation
                })
            }),
        }
    }

    /// Append one sample at `time`
    pub fn insert_sample(&mut self, time: f32, translation: Vec3, rotation: Vec3) {
        let values = [
            translation.x,
            translation.y,
            translation.z,
            rotation.x,
            rotation.y,
            rotation.z,
        ];
        for (env, value) in self.envelopes.iter_mut().zip(values) {
            env.insert_key(time, value);
        }
    }

    /// Sample every curve at `time`
    pub fn evaluate(&self, time: f32) -> (Vec3, Vec3) {
        let v: [f32; 6] = std::array::from_fn(|i| self.envelopes[i].evaluate(time));
        (Vec3::new(v[0], v[1], v[2]), Vec3::new(v[3], v[4], v[5]))
    }

    pub fn rebuild(&mut self) {
        for env in &mut self.envelopes {
            env.rebuild();
        }
    }

    /// Decode `num_keys × { i16 qx, qy, qz, qw; vec3 t }`
    fn read(r: &mut ChunkReader<'_>, bone: &str, num_keys: usize) -> ParseResult<Self> {
        let mut motion = BoneMotion::new(bone);
        for i in 0..num_keys {
            let time = i as f32 / MOTION_FPS;
            let q = [r.r_i16()?, r.r_i16()?, r.r_i16()?, r.r_i16()?];
            let q = q.map(|c| f32::from(c) / QUAT_SCALE);
            let translation = r.r_vec3()?;
            motion.insert_sample(time, translation, quat_to_euler(q));
        }
        motion.rebuild();
        Ok(motion)
    }

    fn write(&self, w: &mut ChunkWriter, num_keys: usize) {
        for i in 0..num_keys {
            let (translation, rotation) = self.evaluate(i as f32 / MOTION_FPS);
            for c in euler_to_quat(rotation) {
                let scaled = (c * QUAT_SCALE).round().clamp(-QUAT_SCALE, QUAT_SCALE);
                w.w_i16(scaled as i16);
            }
            w.w_vec3(translation);
        }
    }
}

/// Named skeletal motion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub name: String,
    pub target: MotionTarget,
    pub flags: MotionFlags,
    pub speed: f32,
    pub power: f32,
    pub accrue: f32,
    pub falloff: f32,
    pub fps: f32,
    pub frame_start: i32,
    pub frame_end: i32,
    /// One entry per skeleton bone, in skeleton order
    pub bone_motions: Vec<BoneMotion>,
}

impl Motion {
    pub fn new(name: impl Into<String>, target: MotionTarget) -> Self {
        let mut flags = MotionFlags::default();
        flags.set(MotionFlags::FX, matches!(target, MotionTarget::Bone(_)));
        Self {
            name: name.into(),
            target,
            flags,
            speed: 1.0,
            power: 1.0,
            accrue: 2.0,
            falloff: 2.0,
            fps: MOTION_FPS,
            frame_start: 0,
            frame_end: 0,
            bone_motions: Vec::new(),
        }
    }

    pub fn frame_count(&self) -> usize {
        (self.frame_end - self.frame_start).max(0) as usize
    }

    /// Decode one `S_SMPARAMS` motion entry; returns the table slot
    fn read_params(r: &mut ChunkReader<'_>, skeleton: &Skeleton) -> ParseResult<(usize, Self)> {
        let name = r.r_sz()?;
        let is_fx = r.r_u8()? == MOTION_TYPE_FX;
        let bone_or_part = r.r_u16()?;
        let slot = usize::from(r.r_u16()?);

        let target = if is_fx {
            if usize::from(bone_or_part) >= skeleton.bone_count() {
                return Err(ParseError::unresolved("bone", bone_or_part.to_string(), format!("motion '{name}'")));
            }
            MotionTarget::Bone(bone_or_part)
        } else if bone_or_part == ALL_PARTITIONS {
            MotionTarget::AllPartitions
        } else {
            if usize::from(bone_or_part) >= skeleton.partitions.len() {
                return Err(ParseError::unresolved(
                    "partition",
                    bone_or_part.to_string(),
                    format!("motion '{name}'"),
                ));
            }
            MotionTarget::Partition(bone_or_part)
        };

        let mut motion = Motion::new(name, target);
        motion.speed = r.r_f32()?;
        motion.power = r.r_f32()?;
        motion.accrue = r.r_f32()?;
        motion.falloff = r.r_f32()?;
        motion.flags.set(MotionFlags::STOP_AT_END, r.r_bool()?);
        Ok((slot, motion))
    }

    fn write_params(&self, w: &mut ChunkWriter, slot: u16) {
        w.w_sz(&self.name);
        w.w_u8(if self.flags.is_fx() { MOTION_TYPE_FX } else { MOTION_TYPE_CYCLE });
        w.w_u16(self.target.to_u16());
        w.w_u16(slot);
        w.w_f32(self.speed);
        w.w_f32(self.power);
        w.w_f32(self.accrue);
        w.w_f32(self.falloff);
        w.w_bool(self.flags.stop_at_end());
    }

    /// Parameters from a sidecar motion section
    fn from_config(
        ini: &dyn ConfigReader,
        is_fx: bool,
        section: &str,
        name: &str,
        skeleton: &Skeleton,
    ) -> ParseResult<Self> {
        let required = |key: &str| {
            ini.string(section, key).ok_or_else(|| ParseError::MissingConfigValue {
                section: section.to_string(),
                key: key.to_string(),
            })
        };
        let required_float = |key: &str| {
            required(key)?.trim().parse::<f32>().map_err(|_| {
                ParseError::InvalidStructure(format!("[{section}] {key} is not a number"))
            })
        };

        let motion_name = required("motion")?;
        if !motion_name.eq_ignore_ascii_case(name) {
            return Err(ParseError::InvalidStructure(format!(
                "[{section}] motion = {motion_name} does not match entry '{name}'"
            )));
        }

        let target = if is_fx {
            let bone_name = required("bone")?;
            let id = skeleton
                .find_bone_index(bone_name)
                .ok_or_else(|| ParseError::unresolved("bone", bone_name, format!("motion '{name}'")))?;
            MotionTarget::Bone(id as u16)
        } else {
            let part_name = required("part")?;
            if part_name.contains(NO_PARTITION) {
                MotionTarget::AllPartitions
            } else {
                let (id, _) = skeleton
                    .find_partition(part_name)
                    .ok_or_else(|| ParseError::unresolved("partition", part_name, format!("motion '{name}'")))?;
                MotionTarget::Partition(id as u16)
            }
        };

        let mut motion = Motion::new(name, target);
        motion.speed = required_float("speed")?;
        motion.power = required_float("power")?;
        motion.accrue = required_float("accrue")?;
        motion.falloff = required_float("falloff")?;
        let stop_at_end = ini.bool(section, "stop@end").ok_or_else(|| ParseError::MissingConfigValue {
            section: section.to_string(),
            key: "stop@end".to_string(),
        })?;
        motion.flags.set(MotionFlags::STOP_AT_END, stop_at_end);

        for i in 0..ini.line_count(section) {
            if let Some((key, _)) = ini.read_line(section, i) {
                if !MOTION_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key)) {
                    tracing::warn!(section, key, "Ignoring unknown motion parameter");
                }
            }
        }
        Ok(motion)
    }
}

/// Decode `S_SMPARAMS`: partitions into `skeleton`, returns the motion table
pub fn read_smparams(r: &mut ChunkReader<'_>, skeleton: &mut Skeleton) -> ParseResult<Vec<Motion>> {
    let num_parts = r.r_u16()?;
    let mut partitions = Vec::with_capacity(usize::from(num_parts));
    for _ in 0..num_parts {
        let name = r.r_sz()?;
        let count = r.r_u16()?;
        let mut ids = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            ids.push(r.r_u32()?);
        }
        partitions.push(skeleton.partition_from_ids(name, &ids)?);
    }
    skeleton.partitions = partitions;

    let num_motions = usize::from(r.r_u16()?);
    let mut slots: Vec<Option<Motion>> = vec![None; num_motions];
    for _ in 0..num_motions {
        let (slot, motion) = Motion::read_params(r, skeleton)?;
        let entry = slots.get_mut(slot).ok_or(ParseError::MotionSlotOutOfRange {
            slot,
            count: num_motions,
        })?;
        if entry.is_some() {
            return Err(ParseError::DuplicateMotionSlot { slot });
        }
        *entry = Some(motion);
    }

    let missing: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_none())
        .map(|(i, _)| i)
        .collect();
    if !missing.is_empty() {
        return Err(ParseError::UnfilledMotionSlots { missing });
    }

    tracing::debug!(partitions = num_parts, motions = num_motions, "Loaded inline motion parameters");
    Ok(slots.into_iter().flatten().collect())
}

/// Encode `S_SMPARAMS`
pub fn write_smparams(w: &mut ChunkWriter, skeleton: &Skeleton, motions: &[Motion]) -> ParseResult<()> {
    skeleton.write_partitions(w)?;
    w.w_u16(count_u16(motions.len(), "motions")?);
    for (slot, motion) in motions.iter().enumerate() {
        motion.write_params(w, slot as u16);
    }
    Ok(())
}

/// Read partitions and motion definitions from a sidecar configuration
pub fn read_sidecar(ini: &dyn ConfigReader, skeleton: &mut Skeleton) -> ParseResult<Vec<Motion>> {
    let num_parts = ini.line_count("partition");
    if num_parts == 0 {
        return Err(ParseError::EmptyCollection {
            what: "partition section".to_string(),
        });
    }

    let mut partitions = Vec::with_capacity(num_parts);
    for i in 0..num_parts {
        let Some((part_name, _)) = ini.read_line("partition", i) else {
            break;
        };
        let bone_names = (0..ini.line_count(part_name)).filter_map(|j| ini.read_line(part_name, j).map(|(k, _)| k));
        partitions.push(skeleton.partition_from_names(part_name.to_string(), bone_names)?);
    }
    skeleton.partitions = partitions;

    let mut motions = Vec::new();
    read_motion_defs(ini, "cycle", false, skeleton, &mut motions)?;
    read_motion_defs(ini, "fx", true, skeleton, &mut motions)?;
    tracing::debug!(partitions = num_parts, motions = motions.len(), "Loaded sidecar motion definitions");
    Ok(motions)
}

fn read_motion_defs(
    ini: &dyn ConfigReader,
    category: &str,
    is_fx: bool,
    skeleton: &Skeleton,
    motions: &mut Vec<Motion>,
) -> ParseResult<()> {
    if !ini.section_exists(category) {
        return Err(ParseError::unresolved("section", category, "motion definitions"));
    }
    for i in 0..ini.line_count(category) {
        let Some((name, section)) = ini.read_line(category, i) else {
            break;
        };
        let section = if section.is_empty() { name } else { section };
        motions.push(Motion::from_config(ini, is_fx, section, name, skeleton)?);
    }
    Ok(())
}

/// Decode `S_MOTIONS` into the already resolved motion table
pub fn read_motion_data(r: &ChunkReader<'_>, motions: &mut [Motion], skeleton: &Skeleton) -> ParseResult<()> {
    let mut header = r.find_chunk(0)?;
    let count = header.r_u32()? as usize;
    header.ensure_consumed("motion count")?;
    if count != motions.len() {
        return Err(ParseError::CountMismatch {
            what: "motions",
            expected: motions.len(),
            found: count,
        });
    }

    let mut filled = vec![false; motions.len()];
    for id in 1..=count as u32 {
        let mut c = r.find_chunk(id)?;
        let name = c.r_sz()?;
        let idx = motions
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| ParseError::unresolved("motion", name.clone(), format!("motion data chunk {id}")))?;
        if filled[idx] {
            return Err(ParseError::DuplicateName { kind: "motion data", name });
        }
        filled[idx] = true;

        let num_keys = c.r_u32()?;
        let motion = &mut motions[idx];
        motion.frame_start = 0;
        motion.frame_end = (num_keys & i32::MAX as u32) as i32;
        motion.bone_motions = skeleton
            .bones
            .iter()
            .map(|bone| BoneMotion::read(&mut c, &bone.name, num_keys as usize))
            .collect::<ParseResult<Vec<_>>>()?;
        c.ensure_consumed("motion data")?;
        tracing::debug!(motion = %motion.name, keys = num_keys, "Loaded motion data");
    }
    Ok(())
}

/// Encode `S_MOTIONS`
pub fn write_motion_data(w: &mut ChunkWriter, motions: &[Motion], skeleton: &Skeleton) -> ParseResult<()> {
    {
        let mut c = w.open_chunk(0);
        c.w_u32(motions.len() as u32);
    }
    for (i, motion) in motions.iter().enumerate() {
        if motion.bone_motions.len() != skeleton.bone_count() {
            return Err(ParseError::CountMismatch {
                what: "bone motions",
                expected: skeleton.bone_count(),
                found: motion.bone_motions.len(),
            });
        }
        let num_keys = motion.frame_count();
        let mut c = w.open_chunk(i as u32 + 1);
        c.w_sz(&motion.name);
        c.w_u32(num_keys as u32);
        for bm in &motion.bone_motions {
            bm.write(&mut c, num_keys);
        }
    }
    Ok(())
}

/// Unit quaternion `[x, y, z, w]` to XYZ Euler angles
pub fn quat_to_euler(q: [f32; 4]) -> Vec3 {
    let norm = q.iter().map(|c| c * c).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return Vec3::ZERO;
    }
    let [x, y, z, w] = q.map(|c| c / norm);

    let rx = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
    let sin_y = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0);
    let ry = sin_y.asin();
    let rz = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
    Vec3::new(rx, ry, rz)
}

/// XYZ Euler angles to a unit quaternion `[x, y, z, w]`
pub fn euler_to_quat(r: Vec3) -> [f32; 4] {
    let (sx, cx) = (r.x * 0.5).sin_cos();
    let (sy, cy) = (r.y * 0.5).sin_cos();
    let (sz, cz) = (r.z * 0.5).sin_cos();
    [
        sx * cy * cz - cx * sy * sz,
        cx * sy * cz + sx * cy * sz,
        cx * cy * sz - sx * sy * cz,
        cx * cy * cz + sx * sy * sz,
    ]
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;
    use crate::ltx::LtxFile;
    use crate::ogf::bones::Bone;

    /// Wrap an angle into `(-PI, PI]`
    fn wrap_angle(a: f32) -> f32 {
        let wrapped = (a + PI).rem_euclid(2.0 * PI) - PI;
        if wrapped <= -PI { wrapped + 2.0 * PI } else { wrapped }
    }

    fn skeleton() -> Skeleton {
        Skeleton::build(vec![
            Bone::new("root", ""),
            Bone::new("spine", "root"),
            Bone::new("head", "spine"),
        ])
        .unwrap()
    }

    fn smparams(motions: &[(&str, u8, u16, u16)]) -> Vec<u8> {
        let mut w = ChunkWriter::new();
        w.w_u16(1);
        w.w_sz("body");
        w.w_u16(2);
        w.w_u32(1);
        w.w_u32(2);
        w.w_u16(motions.len() as u16);
        for &(name, ty, target, slot) in motions {
            w.w_sz(name);
            w.w_u8(ty);
            w.w_u16(target);
            w.w_u16(slot);
            for v in [1.0f32, 2.0, 3.0, 4.0] {
                w.w_f32(v);
            }
            w.w_u8(1);
        }
        w.into_inner()
    }

    #[test]
    fn test_smparams_slots() {
        let data = smparams(&[("idle", 0, 0xFFFF, 1), ("shoot", 1, 2, 0)]);
        let mut skel = skeleton();
        let mut r = ChunkReader::new(&data);
        let motions = read_smparams(&mut r, &mut skel).unwrap();
        assert!(r.is_empty());
        assert_eq!(skel.partitions[0].bones, vec![1, 2]);
        assert_eq!(motions[0].name, "shoot");
        assert_eq!(motions[0].target, MotionTarget::Bone(2));
        assert!(motions[0].flags.is_fx());
        assert_eq!(motions[1].target, MotionTarget::AllPartitions);
        assert!(motions[1].flags.stop_at_end());
        assert_eq!(motions[1].falloff, 4.0);
    }

    #[test]
    fn test_smparams_slot_errors() {
        let mut skel = skeleton();
        let dup = smparams(&[("a", 0, 0, 0), ("b", 0, 0, 0)]);
        assert!(matches!(
            read_smparams(&mut ChunkReader::new(&dup), &mut skel),
            Err(ParseError::DuplicateMotionSlot { slot: 0 })
        ));
        let out = smparams(&[("a", 0, 0, 2), ("b", 0, 0, 0)]);
        assert!(matches!(
            read_smparams(&mut ChunkReader::new(&out), &mut skel),
            Err(ParseError::MotionSlotOutOfRange { slot: 2, count: 2 })
        ));
        let bad_part = smparams(&[("a", 0, 3, 0)]);
        assert!(matches!(
            read_smparams(&mut ChunkReader::new(&bad_part), &mut skel),
            Err(ParseError::UnresolvedReference { kind: "partition", .. })
        ));
        let bad_bone = smparams(&[("a", 1, 9, 0)]);
        assert!(matches!(
            read_smparams(&mut ChunkReader::new(&bad_bone), &mut skel),
            Err(ParseError::UnresolvedReference { kind: "bone", .. })
        ));
    }

    #[test]
    fn test_smparams_roundtrip() {
        let data = smparams(&[("idle", 0, 0, 0), ("shoot", 1, 1, 1)]);
        let mut skel = skeleton();
        let motions = read_smparams(&mut ChunkReader::new(&data), &mut skel).unwrap();
        let mut w = ChunkWriter::new();
        write_smparams(&mut w, &skel, &motions).unwrap();
        assert_eq!(w.into_inner(), data);
    }

    const SIDECAR: &str = "
[partition]
upper
[upper]
spine
head
[cycle]
walk
run = run_section
[walk]
motion = walk
part = --none--
speed = 1
power = 1
accrue = 2
falloff = 2
stop@end = off
[run_section]
motion = RUN
part = upper
speed = 2
power = 1
accrue = 2
falloff = 2
stop@end = on
[fx]
nod
[nod]
motion = nod
bone = head
speed = 1
power = 3
accrue = 2
falloff = 2
stop@end = off
";

    #[test]
    fn test_sidecar_motions() {
        let ini = LtxFile::parse(SIDECAR).unwrap();
        let mut skel = skeleton();
        let motions = read_sidecar(&ini, &mut skel).unwrap();
        assert_eq!(skel.partitions.len(), 1);
        assert_eq!(skel.partitions[0].bones, vec![1, 2]);
        let names: Vec<&str> = motions.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["walk", "run", "nod"]);
        assert_eq!(motions[0].target, MotionTarget::AllPartitions);
        assert_eq!(motions[1].target, MotionTarget::Partition(0));
        assert!(motions[1].flags.stop_at_end());
        assert_eq!(motions[2].target, MotionTarget::Bone(2));
        assert!(motions[2].flags.is_fx());
        assert_eq!(motions[2].power, 3.0);
    }

    #[test]
    fn test_sidecar_unknown_bone() {
        let text = SIDECAR.replace("bone = head", "bone = tail");
        let ini = LtxFile::parse(&text).unwrap();
        let err = read_sidecar(&ini, &mut skeleton()).unwrap_err();
        assert!(matches!(err, ParseError::UnresolvedReference { kind: "bone", .. }));
    }

    #[test]
    fn test_sidecar_empty_partitions() {
        let ini = LtxFile::parse("[cycle]\n[fx]\n").unwrap();
        let err = read_sidecar(&ini, &mut skeleton()).unwrap_err();
        assert_eq!(err.kind(), crate::traits::ErrorKind::Consistency);
    }

    #[test]
    fn test_motion_data_roundtrip() {
        let skel = skeleton();
        let mut motion = Motion::new("idle", MotionTarget::AllPartitions);
        motion.frame_end = 3;
        for bone in &skel.bones {
            let mut bm = BoneMotion::new(bone.name.clone());
            for i in 0..3 {
                let t = i as f32 / MOTION_FPS;
                bm.insert_sample(t, Vec3::new(i as f32, 0.5, -1.0), Vec3::new(0.1 * i as f32, 0.2, -0.3));
            }
            motion.bone_motions.push(bm);
        }

        let mut w = ChunkWriter::new();
        write_motion_data(&mut w, std::slice::from_ref(&motion), &skel).unwrap();
        let data = w.into_inner();

        let mut table = vec![Motion::new("idle", MotionTarget::AllPartitions)];
        read_motion_data(&ChunkReader::new(&data), &mut table, &skel).unwrap();
        let back = &table[0];
        assert_eq!(back.frame_end, 3);
        assert_eq!(back.bone_motions.len(), 3);
        let (t, r) = back.bone_motions[2].evaluate(2.0 / MOTION_FPS);
        assert_eq!(t, Vec3::new(2.0, 0.5, -1.0));
        assert!((r.x - 0.2).abs() < 1e-3);
        assert!((r.y - 0.2).abs() < 1e-3);
        assert!((r.z + 0.3).abs() < 1e-3);
    }

    #[test]
    fn test_motion_data_unknown_name() {
        let skel = skeleton();
        let mut w = ChunkWriter::new();
        w.open_chunk(0).w_u32(1);
        {
            let mut c = w.open_chunk(1);
            c.w_sz("ghost");
            c.w_u32(0);
        }
        let data = w.into_inner();
        let mut table = vec![Motion::new("idle", MotionTarget::AllPartitions)];
        let err = read_motion_data(&ChunkReader::new(&data), &mut table, &skel).unwrap_err();
        assert!(matches!(err, ParseError::UnresolvedReference { kind: "motion", .. }));
    }

    #[test]
    fn test_motion_count_mismatch() {
        let mut w = ChunkWriter::new();
        w.open_chunk(0).w_u32(2);
        let data = w.into_inner();
        let mut table = vec![Motion::new("idle", MotionTarget::AllPartitions)];
        assert!(matches!(
            read_motion_data(&ChunkReader::new(&data), &mut table, &skeleton()),
            Err(ParseError::CountMismatch { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn test_quaternion_euler_inverse() {
        for r in [
            Vec3::ZERO,
            Vec3::new(0.3, -0.4, 1.2),
            Vec3::new(-2.5, 0.7, 3.0),
        ] {
            let back = quat_to_euler(euler_to_quat(r));
            assert!((wrap_angle(back.x - r.x)).abs() < 1e-4, "{r:?} -> {back:?}");
            assert!((wrap_angle(back.y - r.y)).abs() < 1e-4);
            assert!((wrap_angle(back.z - r.z)).abs() < 1e-4);
        }
        assert_eq!(quat_to_euler([0.0; 4]), Vec3::ZERO);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(PI) - PI).abs() < 1e-5);
        assert!((wrap_angle(0.5) - 0.5).abs() < 1e-6);
        assert!((wrap_angle(-0.5 - 2.0 * PI) + 0.5).abs() < 1e-5);
    }
}
