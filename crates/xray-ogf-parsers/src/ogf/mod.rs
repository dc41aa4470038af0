// xray-ogf-parsers/src/ogf/mod.rs
//! OGF (X-Ray engine model) codec
//!
//! OGF files store static meshes, skinned characters, skeletons, motions and
//! progressive-mesh LOD data. Every file is a chunk container; the header
//! chunk selects which other chunks make up the model.
//!
//! # Format Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      OGF v3 model                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HEADER        version = 3, model type, reserved = 0        │
//! │  BBOX          required for every type                      │
//! │  BSPHERE       optional                                     │
//! │  TEXTURE_L / TEXTURE                                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  VERTICES | VCONTAINER, INDICES         (visual types)      │
//! │  LODDATA                                (progressive fixed) │
//! │  CHILDREN | CHILDREN_L | CHILD_REFS     (hierarchical)      │
//! │  S_BONE_NAMES, S_SMPARAMS, S_MOTIONS    (animated)          │
//! │  LODS                                   (progressive chain) │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Child models inside `CHILDREN` and `LODS` are complete OGF streams
//! numbered 0, 1, 2…; the first missing number ends the list.

mod bones;
mod chunks;
mod encode;
mod lod;
mod mesh;
mod motions;

pub use bones::{Bone, Partition, Skeleton, DEFAULT_BIND_LENGTH};
pub use chunks::{ModelType, OgfChunkId, ALL_PARTITIONS, MOTION_FPS, OGF_VERSION};
pub use encode::encode;
pub use lod::{replay, ProgressiveLod, VSplit};
pub use mesh::{ExternalVertexRef, IndexBuffer, VertexBuffer, VertexFormat, VertexSource, VertexView};
pub use motions::{
    euler_to_quat, quat_to_euler, read_motion_data, read_sidecar, read_smparams, BoneMotion, Motion,
    MotionFlags, MotionSource, MotionTarget,
};

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use xray_ogf_core::{BoundingBox, BoundingSphere, Transform};

use crate::chunk::ChunkReader;
use crate::ltx::LtxFile;
use crate::traits::{
    DecodeOptions, Exportable, FileSystem, HumanReadable, ParseError, ParseResult, Parser,
};

/// Texture reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureRef {
    /// Texture and shader names
    Named { texture: String, shader: String },
    /// Indices into an external texture/shader table
    Indexed { texture: u32, shader: u32 },
}

/// Child reference by file path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildFile {
    /// Path relative to the parent model's folder
    pub path: String,
    /// Loaded model, `None` when loading was disabled or the file was skipped
    pub model: Option<OgfModel>,
}

/// Child list of a hierarchical model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Children {
    #[default]
    None,
    /// Complete child models stored in the stream
    Inline(Vec<OgfModel>),
    /// Indices into an external visual table
    Indices(Vec<u32>),
    /// Separate model files
    Files(Vec<ChildFile>),
}

impl Children {
    pub fn len(&self) -> usize {
        match self {
            Children::None => 0,
            Children::Inline(models) => models.len(),
            Children::Indices(ids) => ids.len(),
            Children::Files(files) => files.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Child models available in memory
    pub fn models(&self) -> Vec<&OgfModel> {
        match self {
            Children::Inline(models) => models.iter().collect(),
            Children::Files(files) => files.iter().filter_map(|f| f.model.as_ref()).collect(),
            Children::None | Children::Indices(_) => Vec::new(),
        }
    }

    fn models_mut(&mut self) -> Vec<&mut OgfModel> {
        match self {
            Children::Inline(models) => models.iter_mut().collect(),
            Children::Files(files) => files.iter_mut().filter_map(|f| f.model.as_mut()).collect(),
            Children::None | Children::Indices(_) => Vec::new(),
        }
    }
}

/// Decoded OGF model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OgfModel {
    pub version: u8,
    pub model_type: ModelType,
    pub bbox: BoundingBox,
    pub bsphere: Option<BoundingSphere>,
    pub texture: Option<TextureRef>,
    pub vertices: Option<VertexSource>,
    pub indices: Option<IndexBuffer>,
    pub lod: Option<ProgressiveLod>,
    pub children: Children,
    /// Progressive chain, finest first
    pub lods: Vec<OgfModel>,
    pub skeleton: Option<Skeleton>,
    /// Motion table in slot order
    pub motions: Vec<Motion>,
    pub motion_source: Option<MotionSource>,
    /// Local-to-parent placement; never stored in v3 streams
    pub transform: Option<Transform>,
    /// Source path, when decoded from a file
    pub path: Option<String>,
    /// Chunk ids present in the stream but not used by the model type
    pub unhandled_chunks: Vec<u32>,
}

impl OgfModel {
    /// Create empty model
    pub fn new(model_type: ModelType) -> Self {
        Self {
            version: OGF_VERSION,
            model_type,
            bbox: BoundingBox::ZERO,
            bsphere: None,
            texture: None,
            vertices: None,
            indices: None,
            lod: None,
            children: Children::None,
            lods: Vec::new(),
            skeleton: None,
            motions: Vec::new(),
            motion_source: None,
            transform: None,
            path: None,
            unhandled_chunks: Vec::new(),
        }
    }

    /// Number of vertices (owned or proxied)
    pub fn control_point_count(&self) -> usize {
        self.vertices.as_ref().map_or(0, VertexSource::len)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.as_ref().map_or(0, IndexBuffer::triangle_count)
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u16; 3]> + '_ {
        self.indices.iter().flat_map(IndexBuffer::triangles)
    }

    /// Owned vertex buffer, if the model is not proxied
    pub fn vertex_buffer(&self) -> Option<&VertexBuffer> {
        self.vertices.as_ref().and_then(VertexSource::owned)
    }

    /// Borrowed vertex window, resolving proxies against `pools`
    pub fn vertex_view<'a>(&'a self, pools: &'a [VertexBuffer]) -> ParseResult<Option<VertexView<'a>>> {
        match &self.vertices {
            None => Ok(None),
            Some(VertexSource::Owned(vb)) => vb.view(0, vb.len()).map(Some),
            Some(VertexSource::External(ext)) => ext.resolve(pools).map(Some),
        }
    }

    /// Replace every proxied vertex buffer in the tree with an owned copy
    pub fn resolve_external_geometry(&mut self, pools: &[VertexBuffer]) -> ParseResult<()> {
        if let Some(VertexSource::External(ext)) = &self.vertices {
            let owned = ext.resolve(pools)?.to_owned_buffer();
            self.vertices = Some(VertexSource::Owned(owned));
        }
        for child in self.children.models_mut() {
            child.resolve_external_geometry(pools)?;
        }
        for lod in &mut self.lods {
            lod.resolve_external_geometry(pools)?;
        }
        Ok(())
    }

    /// Whether an optional local-to-parent transform is attached
    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }

    /// Visit this model and every nested model depth-first
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a OgfModel, usize)) {
        self.walk_at(0, f);
    }

    fn walk_at<'a>(&'a self, depth: usize, f: &mut dyn FnMut(&'a OgfModel, usize)) {
        f(self, depth);
        for child in self.children.models() {
            child.walk_at(depth + 1, f);
        }
        for lod in &self.lods {
            lod.walk_at(depth + 1, f);
        }
    }

    pub fn find_motion(&self, name: &str) -> Option<&Motion> {
        self.motions.iter().find(|m| m.name == name)
    }
}

impl HumanReadable for OgfModel {
    fn to_readable_string(&self) -> String {
        let mut out = String::new();
        self.walk(&mut |model, depth| {
            let indent = "  ".repeat(depth);
            out.push_str(&format!(
                "{indent}{} v{}: {} vertices, {} triangles",
                model.model_type,
                model.version,
                model.control_point_count(),
                model.triangle_count()
            ));
            if let Some(VertexSource::External(ext)) = &model.vertices {
                out.push_str(&format!(" (pool {} @{})", ext.pool, ext.offset));
            }
            if let Some(texture) = &model.texture {
                match texture {
                    TextureRef::Named { texture, shader } => {
                        out.push_str(&format!(", texture '{texture}' shader '{shader}'"))
                    }
                    TextureRef::Indexed { texture, shader } => {
                        out.push_str(&format!(", texture #{texture} shader #{shader}"))
                    }
                }
            }
            out.push('\n');
            if let Some(lod) = &model.lod {
                out.push_str(&format!(
                    "{indent}  lod: {} base vertices, {} base triangles, {} splits\n",
                    lod.min_vertices,
                    lod.base_triangle_count(),
                    lod.vsplits.len()
                ));
            }
            if let Children::Indices(ids) = &model.children {
                out.push_str(&format!("{indent}  children by index: {ids:?}\n"));
            }
            if let Children::Files(files) = &model.children {
                for file in files.iter().filter(|f| f.model.is_none()) {
                    out.push_str(&format!("{indent}  child file (not loaded): {}\n", file.path));
                }
            }
            if let Some(skeleton) = &model.skeleton {
                out.push_str(&format!(
                    "{indent}  skeleton: {} bones, {} partitions, {} motions\n",
                    skeleton.bone_count(),
                    skeleton.partitions.len(),
                    model.motions.len()
                ));
            }
            if !model.unhandled_chunks.is_empty() {
                out.push_str(&format!("{indent}  unhandled chunks: {:X?}\n", model.unhandled_chunks));
            }
        });
        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Exportable for OgfModel {
    fn export_json(&self, pretty: bool) -> ParseResult<String> {
        let result = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        result.map_err(|e| ParseError::InvalidStructure(format!("JSON export failed: {e}")))
    }

    fn export_binary(&self) -> ParseResult<Vec<u8>> {
        encode(self)
    }
}

/// OGF decoder
///
/// The file system is only needed for sidecar motion files and child
/// references by path; in-memory streams decode without one.
pub struct OgfParser<'fs> {
    options: DecodeOptions,
    fs: Option<&'fs dyn FileSystem>,
}

impl<'fs> OgfParser<'fs> {
    pub fn new() -> Self {
        Self {
            options: DecodeOptions::default(),
            fs: None,
        }
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_file_system(mut self, fs: &'fs dyn FileSystem) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode a complete model stream
    pub fn decode(&self, data: &[u8], path: Option<&str>) -> ParseResult<OgfModel> {
        let what = path.unwrap_or("<memory>");
        crate::log_decode_start!("ogf", what);
        let start = std::time::Instant::now();

        let result = crate::logging::instrument_decode("ogf", || {
            self.decode_model(&ChunkReader::new(data), path, 0)
        });

        match &result {
            Ok(model) => {
                let mut count = 0usize;
                model.walk(&mut |_, _| count += 1);
                crate::log_decode_complete!("ogf", start.elapsed(), count);
            }
            Err(e) => {
                crate::log_decode_error!("ogf", e);
            }
        }
        result
    }

    fn decode_model(&self, r: &ChunkReader<'_>, path: Option<&str>, depth: u32) -> ParseResult<OgfModel> {
        if depth > self.options.max_nesting_depth {
            return Err(ParseError::NestingTooDeep { depth });
        }

        let mut ctx = ModelDecoder {
            parser: self,
            r: *r,
            path,
            depth,
            consumed: Vec::new(),
        };

        let mut header = ctx.find(OgfChunkId::Header)?;
        let version = header.r_u8()?;
        let tag = header.r_u8()?;
        let reserved = header.r_u16()?;
        header.ensure_consumed("header")?;
        if version != OGF_VERSION {
            return Err(ParseError::UnsupportedVersion { version: u32::from(version) });
        }
        let model_type = ModelType::from_u8(tag).ok_or(ParseError::UnknownModelType { tag })?;
        if reserved != 0 {
            return Err(ParseError::ReservedNotZero { found: reserved });
        }

        let mut model = OgfModel::new(model_type);
        model.version = version;
        model.path = path.map(str::to_string);
        tracing::debug!(model_type = %model_type, depth, "Decoding model");

        match model_type {
            ModelType::Normal => ctx.load_visual(&mut model)?,
            ModelType::Hierarchy => ctx.load_hierarchy_visual(&mut model)?,
            ModelType::Progressive => ctx.load_progressive_fixed_visual(&mut model)?,
            ModelType::SkeletonAnimated => ctx.load_kinematics(&mut model)?,
            ModelType::SkeletonGeomPM => {
                ctx.check_skinned_vertices()?;
                ctx.load_progressive_fixed_visual(&mut model)?;
            }
            ModelType::SkeletonGeomStatic => {
                ctx.check_skinned_vertices()?;
                ctx.load_visual(&mut model)?;
            }
            ModelType::DetailPatch => {
                ctx.load_render_visual(&mut model)?;
                ctx.find(OgfChunkId::DetailPatch)?;
                return Err(ParseError::Unimplemented("detail patch chunk".to_string()));
            }
            ModelType::Cached => ctx.load_cached(&mut model)?,
            ModelType::Particle => ctx.load_render_visual(&mut model)?,
            ModelType::Progressive2 => ctx.load_lods(&mut model)?,
        }

        model.unhandled_chunks = ctx.unhandled()?;
        if !model.unhandled_chunks.is_empty() {
            tracing::warn!(
                model_type = %model_type,
                chunks = ?model.unhandled_chunks,
                "Unhandled chunks"
            );
            if self.options.strict_chunks {
                return Err(ParseError::UnhandledChunks {
                    ids: model.unhandled_chunks,
                });
            }
        }
        Ok(model)
    }

    fn open_file(&self, path: &str) -> ParseResult<Option<Vec<u8>>> {
        let fs = self.fs.ok_or(ParseError::MissingCollaborator("file system"))?;
        Ok(fs.open_read(path))
    }
}

impl Default for OgfParser<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for OgfParser<'_> {
    type Output = OgfModel;

    fn extensions(&self) -> &[&str] {
        &["ogf"]
    }

    fn name(&self) -> &str {
        "OGF Model Parser"
    }

    fn supported_versions(&self) -> &[u32] {
        &[3]
    }

    fn parse_bytes(&self, data: &[u8], path: Option<&str>) -> ParseResult<OgfModel> {
        self.decode(data, path)
    }

    fn parse_file(&self, path: &Path) -> ParseResult<OgfModel> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let path_str = path.to_string_lossy();

        if self.options.use_memory_mapping && size >= self.options.memory_mapping_threshold {
            tracing::debug!(size, "Memory-mapping model file");
            // SAFETY: the map is read-only and dropped before this call returns.
            let mmap = unsafe { Mmap::map(&file)? };
            self.decode(&mmap, Some(&path_str))
        } else {
            let data = std::fs::read(path)?;
            self.decode(&data, Some(&path_str))
        }
    }
}

/// Per-model decode state
struct ModelDecoder<'p, 'fs, 'a> {
    parser: &'p OgfParser<'fs>,
    r: ChunkReader<'a>,
    path: Option<&'p str>,
    depth: u32,
    consumed: Vec<u32>,
}

impl<'p, 'fs, 'a> ModelDecoder<'p, 'fs, 'a> {
    fn mark(&mut self, id: OgfChunkId) {
        let raw = id.to_u32();
        if !self.consumed.contains(&raw) {
            self.consumed.push(raw);
        }
    }

    fn find(&mut self, id: OgfChunkId) -> ParseResult<ChunkReader<'a>> {
        let reader = self
            .r
            .find_chunk(id.to_u32())
            .map_err(|e| e.with_context(format!("{id:?} chunk")))?;
        self.mark(id);
        tracing::debug!(chunk = ?id, size = reader.len(), "Loading chunk");
        Ok(reader)
    }

    fn open(&mut self, id: OgfChunkId) -> ParseResult<Option<ChunkReader<'a>>> {
        let reader = self.r.open_chunk(id.to_u32())?;
        if let Some(reader) = &reader {
            self.mark(id);
            tracing::debug!(chunk = ?id, size = reader.len(), "Loading chunk");
        }
        Ok(reader)
    }

    fn unhandled(&self) -> ParseResult<Vec<u32>> {
        let mut ids = Vec::new();
        for id in self.r.chunk_ids()? {
            if !self.consumed.contains(&id) && !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn load_render_visual(&mut self, model: &mut OgfModel) -> ParseResult<()> {
        let mut r = self.find(OgfChunkId::BBox)?;
        model.bbox = BoundingBox::new(r.r_vec3()?, r.r_vec3()?);
        r.ensure_consumed("bbox")?;

        if let Some(mut r) = self.open(OgfChunkId::BSphere)? {
            model.bsphere = Some(BoundingSphere::new(r.r_vec3()?, r.r_f32()?));
            r.ensure_consumed("bsphere")?;
        }

        if let Some(mut r) = self.open(OgfChunkId::TextureL)? {
            model.texture = Some(TextureRef::Indexed {
                texture: r.r_u32()?,
                shader: r.r_u32()?,
            });
            r.ensure_consumed("texture indices")?;
        } else if let Some(mut r) = self.open(OgfChunkId::Texture)? {
            model.texture = Some(TextureRef::Named {
                texture: r.r_sz()?,
                shader: r.r_sz()?,
            });
            r.ensure_consumed("texture")?;
        }
        Ok(())
    }

    fn load_vertices(&mut self, model: &mut OgfModel) -> ParseResult<()> {
        let mut r = self.find(OgfChunkId::Vertices)?;
        let vb = VertexBuffer::read(&mut r)?;
        r.ensure_consumed("vertices")?;
        model.vertices = Some(VertexSource::Owned(vb));
        Ok(())
    }

    fn load_indices(&mut self, model: &mut OgfModel) -> ParseResult<()> {
        let mut r = self.find(OgfChunkId::Indices)?;
        let ib = IndexBuffer::read(&mut r)?;
        r.ensure_consumed("indices")?;

        if let (Some(max), Some(count)) = (ib.max_index(), model.vertices.as_ref().map(VertexSource::len)) {
            if usize::from(max) >= count {
                return Err(ParseError::InvalidStructure(format!(
                    "index {max} references past {count} vertices"
                )));
            }
        }
        model.indices = Some(ib);
        Ok(())
    }

    fn load_visual(&mut self, model: &mut OgfModel) -> ParseResult<()> {
        self.load_render_visual(model)?;
        if let Some(mut r) = self.open(OgfChunkId::VContainer)? {
            model.vertices = Some(VertexSource::External(ExternalVertexRef::read(&mut r)?));
            r.ensure_consumed("vertex container")?;
        } else {
            self.load_vertices(model)?;
        }
        self.load_indices(model)
    }

    fn load_cached(&mut self, model: &mut OgfModel) -> ParseResult<()> {
        self.load_render_visual(model)?;
        self.load_vertices(model)?;
        self.load_indices(model)
    }

    fn load_progressive_fixed_visual(&mut self, model: &mut OgfModel) -> ParseResult<()> {
        self.load_visual(model)?;
        let r = self.find(OgfChunkId::LodData)?;
        let vertex_count = match &model.vertices {
            Some(VertexSource::Owned(vb)) => vb.len(),
            _ => {
                return Err(ParseError::InvalidStructure(
                    "progressive LOD data requires owned vertices".to_string(),
                ))
            }
        };
        let indices = model.indices.as_ref().ok_or_else(|| {
            ParseError::missing_chunk(OgfChunkId::Indices.to_u32(), "progressive visual")
        })?;
        let lod = ProgressiveLod::read(&r, indices, vertex_count).map_err(|e| e.with_context("LOD data"))?;
        model.lod = Some(lod);
        Ok(())
    }

    /// Skinned geometry variants carry 1-link vertices
    fn check_skinned_vertices(&mut self) -> ParseResult<()> {
        let mut r = self.find(OgfChunkId::Vertices)?;
        let format = r.r_u32()?;
        if format != VertexFormat::SKINNED_1L_FVF {
            return Err(ParseError::InvalidStructure(format!(
                "skinned geometry expects vertex format 0x{:X}, found 0x{format:X}",
                VertexFormat::SKINNED_1L_FVF
            )));
        }
        Ok(())
    }

    fn load_hierarchy_visual(&mut self, model: &mut OgfModel) -> ParseResult<()> {
        self.load_render_visual(model)?;

        let forms = [OgfChunkId::ChildrenL, OgfChunkId::Children, OgfChunkId::ChildRefs];
        let mut present = Vec::new();
        for id in forms {
            if self.r.has_chunk(id.to_u32())? {
                present.push(id);
            }
        }
        if present.len() != 1 {
            return Err(ParseError::ConflictingChunks {
                context: "child list".to_string(),
                chunks: forms.iter().map(OgfChunkId::to_u32).collect(),
                found: present.len(),
            });
        }

        match present[0] {
            OgfChunkId::ChildrenL => {
                let mut r = self.find(OgfChunkId::ChildrenL)?;
                let count = r.r_u32()? as usize;
                let mut ids = Vec::with_capacity(count.min(r.remaining() / 4));
                for _ in 0..count {
                    ids.push(r.r_u32()?);
                }
                r.ensure_consumed("child indices")?;
                model.children = Children::Indices(ids);
            }
            OgfChunkId::Children => {
                let r = self.find(OgfChunkId::Children)?;
                let mut children = Vec::new();
                for (i, child) in r.sequence()?.iter().enumerate() {
                    let child = self
                        .parser
                        .decode_model(child, self.path, self.depth + 1)
                        .map_err(|e| e.with_context(format!("child {i}")))?;
                    children.push(child);
                }
                model.children = Children::Inline(children);
            }
            _ => {
                let mut r = self.find(OgfChunkId::ChildRefs)?;
                let count = r.r_u32()? as usize;
                let mut names = Vec::with_capacity(count.min(r.remaining()));
                for _ in 0..count {
                    names.push(r.r_sz()?);
                }
                r.ensure_consumed("child references")?;
                model.children = Children::Files(self.load_child_files(names)?);
            }
        }
        Ok(())
    }

    fn load_child_files(&self, names: Vec<String>) -> ParseResult<Vec<ChildFile>> {
        let options = &self.parser.options;
        let folder = self.path.map(|p| split_path(p).0).unwrap_or("");
        let mut files = Vec::with_capacity(names.len());
        for name in names {
            if !options.load_external_children {
                files.push(ChildFile { path: name, model: None });
                continue;
            }
            let full = format!("{folder}{name}");
            match self.parser.open_file(&full)? {
                Some(data) => {
                    let child = self
                        .parser
                        .decode_model(&ChunkReader::new(&data), Some(&full), self.depth + 1)
                        .map_err(|e| e.with_context(format!("child file {full}")))?;
                    files.push(ChildFile { path: name, model: Some(child) });
                }
                None if options.skip_missing_children => {
                    tracing::warn!(path = %full, "Skipping child model that cannot be opened");
                }
                None => {
                    return Err(ParseError::unresolved("child file", full, "child references"));
                }
            }
        }
        Ok(files)
    }

    fn load_kinematics(&mut self, model: &mut OgfModel) -> ParseResult<()> {
        self.load_hierarchy_visual(model)?;

        let mut r = self.find(OgfChunkId::BoneNames)?;
        let count = r.r_u32()? as usize;
        let mut bones = Vec::with_capacity(count.min(r.remaining() / 62));
        for _ in 0..count {
            bones.push(Bone::read(&mut r)?);
        }
        r.ensure_consumed("bone names")?;
        let mut skeleton = Skeleton::build(bones).map_err(|e| e.with_context("skeleton"))?;

        let mut motions = if let Some(mut r) = self.open(OgfChunkId::SmParams)? {
            let motions = read_smparams(&mut r, &mut skeleton)?;
            r.ensure_consumed("skeleton parameters")?;
            model.motion_source = Some(MotionSource::Inline);
            motions
        } else {
            let (ltx_path, ini) = self.load_sidecar()?;
            let motions = read_sidecar(&ini, &mut skeleton).map_err(|e| e.with_context(ltx_path.clone()))?;
            model.motion_source = Some(MotionSource::Sidecar(ltx_path));
            motions
        };

        let r = self.find(OgfChunkId::Motions)?;
        read_motion_data(&r, &mut motions, &skeleton).map_err(|e| e.with_context("motion data"))?;

        model.skeleton = Some(skeleton);
        model.motions = motions;
        Ok(())
    }

    fn load_sidecar(&self) -> ParseResult<(String, LtxFile)> {
        let path = self.path.ok_or_else(|| {
            ParseError::InvalidStructure("sidecar motion file needs the model path".to_string())
        })?;
        let (folder, stem) = split_path(path);
        let ltx_path = format!("{folder}{stem}.ltx");
        let data = self
            .parser
            .open_file(&ltx_path)?
            .ok_or_else(|| ParseError::unresolved("sidecar file", ltx_path.clone(), path))?;
        Ok((ltx_path, LtxFile::parse_bytes(&data)?))
    }

    fn load_lods(&mut self, model: &mut OgfModel) -> ParseResult<()> {
        self.load_render_visual(model)?;
        let r = self.find(OgfChunkId::Lods)?;
        for (i, lod) in r.sequence()?.iter().enumerate() {
            let lod = self
                .parser
                .decode_model(lod, self.path, self.depth + 1)
                .map_err(|e| e.with_context(format!("LOD {i}")))?;
            model.lods.push(lod);
        }
        Ok(())
    }
}

/// Split an engine path into folder (with trailing separator) and file stem
pub fn split_path(path: &str) -> (&str, &str) {
    let name_start = path.rfind(|c: char| c == '/' || c == '\\').map_or(0, |i| i + 1);
    let (folder, name) = path.split_at(name_start);
    let stem = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };
    (folder, stem)
}
