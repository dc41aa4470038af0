//! Integration tests for the OGF codec
//!
//! Streams are assembled with the crate's own `ChunkWriter`, so every test
//! also pins the on-disk layout the decoder expects.

use std::collections::HashMap;

use xray_ogf_core::{BoundingBox, Vec2, Vec3};
use xray_ogf_parsers::ogf::{ExternalVertexRef, IndexBuffer, MotionSource, MotionTarget, VertexFormat};
use xray_ogf_parsers::{
    encode, Bone, ChildFile, Children, ChunkReader, ChunkWriter, DecodeOptions, ErrorKind,
    Exportable, FileSystem, HumanReadable, ModelType, OgfModel, OgfParser, ParseError, Parser,
    TextureRef, VertexBuffer, VertexSource,
};

const HEADER: u32 = 0x01;
const TEXTURE: u32 = 0x02;
const CHILD_REFS: u32 = 0x05;
const BBOX: u32 = 0x06;
const VERTICES: u32 = 0x07;
const INDICES: u32 = 0x08;
const LODDATA: u32 = 0x09;
const VCONTAINER: u32 = 0x0A;
const CHILDREN_L: u32 = 0x0C;
const BONE_NAMES: u32 = 0x0D;
const MOTIONS: u32 = 0x0E;
const DPATCH: u32 = 0x0F;
const CHILDREN: u32 = 0x11;
const SMPARAMS: u32 = 0x12;

/// In-memory file table keyed by full path
#[derive(Default)]
struct TestFs {
    files: HashMap<String, Vec<u8>>,
}

impl TestFs {
    fn with(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.to_string(), data.into());
        self
    }
}

impl FileSystem for TestFs {
    fn resolve_path(&self, alias: &str, relative: &str) -> Option<String> {
        Some(format!("{alias}{relative}"))
    }

    fn open_read(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }
}

fn header(w: &mut ChunkWriter, version: u8, model_type: u8, reserved: u16) {
    let mut c = w.open_chunk(HEADER);
    c.w_u8(version);
    c.w_u8(model_type);
    c.w_u16(reserved);
}

fn bbox(w: &mut ChunkWriter) {
    let mut c = w.open_chunk(BBOX);
    c.w_vec3(Vec3::ZERO);
    c.w_vec3(Vec3::ONE);
}

fn static_vertices(w: &mut ChunkWriter, positions: &[Vec3]) {
    let mut c = w.open_chunk(VERTICES);
    c.w_u32(VertexFormat::STATIC_FVF);
    c.w_u32(positions.len() as u32);
    for &p in positions {
        c.w_vec3(p);
        c.w_vec3(Vec3::UP);
        c.w_vec2(Vec2::new(p.x, p.z));
    }
}

fn indices(w: &mut ChunkWriter, idx: &[u16]) {
    let mut c = w.open_chunk(INDICES);
    c.w_u32(idx.len() as u32);
    for &i in idx {
        c.w_u16(i);
    }
}

fn triangle_stream() -> Vec<u8> {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 0, 0);
    bbox(&mut w);
    {
        let mut c = w.open_chunk(TEXTURE);
        c.w_sz("wood");
        c.w_sz("default");
    }
    static_vertices(&mut w, &[Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)]);
    indices(&mut w, &[0, 1, 2]);
    w.into_inner()
}

fn triangle_model() -> OgfModel {
    OgfParser::new().decode(&triangle_stream(), None).unwrap()
}

fn quad_buffer() -> VertexBuffer {
    let mut vb = VertexBuffer::new(VertexFormat::Static);
    for p in [
        Vec3::ZERO,
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
    ] {
        vb.push(p, Vec3::UP, Vec2::ZERO);
    }
    vb
}

// ---------------------------------------------------------------------------
// Chunk container
// ---------------------------------------------------------------------------

#[test]
fn test_chunk_scan_in_order() {
    let mut w = ChunkWriter::new();
    w.w_chunk(0, &[0xAA]);
    w.w_chunk(1, &[]);
    w.w_chunk(2, &[1, 2, 3, 4]);
    let data = w.into_inner();

    let r = ChunkReader::new(&data);
    assert_eq!(r.chunk_ids().unwrap(), vec![0, 1, 2]);
    assert_eq!(r.sequence().unwrap().len(), 3);
    assert_eq!(r.find_chunk(2).unwrap().len(), 4);
    assert!(r.open_chunk(7).unwrap().is_none());
}

#[test]
fn test_truncated_chunk() {
    let mut data = Vec::new();
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&100u32.to_le_bytes());
    data.extend_from_slice(&[0; 4]);
    let err = ChunkReader::new(&data).chunk_ids().unwrap_err();
    assert!(matches!(err, ParseError::TruncatedChunk { chunk: 1, declared: 100, available: 4, .. }));
}

#[test]
fn test_compressed_chunk_rejected() {
    let mut w = ChunkWriter::new();
    w.w_chunk(HEADER | 0x8000_0000, &[3, 0, 0, 0]);
    let data = w.into_inner();
    let err = OgfParser::new().decode(&data, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unimplemented);
}

// ---------------------------------------------------------------------------
// Header and dispatch
// ---------------------------------------------------------------------------

#[test]
fn test_triangle_end_to_end() {
    let data = triangle_stream();
    let model = OgfParser::new().decode(&data, None).unwrap();

    assert_eq!(model.version, 3);
    assert_eq!(model.model_type, ModelType::Normal);
    assert_eq!(model.bbox, BoundingBox::new(Vec3::ZERO, Vec3::ONE));
    assert!(model.bsphere.is_none());
    assert_eq!(
        model.texture,
        Some(TextureRef::Named {
            texture: "wood".into(),
            shader: "default".into()
        })
    );
    assert_eq!(model.control_point_count(), 3);
    assert_eq!(model.triangle_count(), 1);
    assert_eq!(model.triangles().collect::<Vec<_>>(), vec![[0, 1, 2]]);
    assert!(model.unhandled_chunks.is_empty());
    assert!(model.children.is_empty());
    assert!(model.transform.is_none());

    let vb = model.vertex_buffer().unwrap();
    assert_eq!(vb.positions[1], Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(vb.uvs[2], Vec2::new(0.0, 1.0));

    // Encoding the decoded model reproduces the stream byte for byte.
    assert_eq!(encode(&model).unwrap(), data);
    assert_eq!(model.export_binary().unwrap(), data);
}

#[test]
fn test_untextured_triangle_survives_reencode() {
    let positions = [Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)];
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 0, 0);
    bbox(&mut w);
    {
        let mut c = w.open_chunk(TEXTURE);
        c.w_sz("");
        c.w_sz("");
    }
    static_vertices(&mut w, &positions);
    indices(&mut w, &[0, 1, 2]);
    let data = w.into_inner();

    let model = OgfParser::new().decode(&data, None).unwrap();
    assert!(matches!(&model.texture, Some(TextureRef::Named { texture, .. }) if texture.is_empty()));
    assert_eq!(model.control_point_count(), 3);
    assert_eq!(model.triangles().collect::<Vec<_>>(), vec![[0, 1, 2]]);
    assert_eq!(model.vertex_buffer().unwrap().positions, positions.to_vec());

    let again = OgfParser::new().decode(&encode(&model).unwrap(), None).unwrap();
    assert_eq!(again.vertex_buffer().unwrap().positions, positions.to_vec());
    assert_eq!(again.indices, model.indices);
    assert_eq!(again.texture, model.texture);
}

#[test]
fn test_header_errors() {
    let cases: [(u8, u8, u16); 3] = [(4, 0, 0), (3, 5, 0), (3, 0, 1)];
    let mut errors = Vec::new();
    for (version, model_type, reserved) in cases {
        let mut w = ChunkWriter::new();
        header(&mut w, version, model_type, reserved);
        bbox(&mut w);
        errors.push(OgfParser::new().decode(w.as_bytes(), None).unwrap_err());
    }
    assert!(matches!(errors[0], ParseError::UnsupportedVersion { version: 4 }));
    assert!(matches!(errors[1], ParseError::UnknownModelType { tag: 5 }));
    assert!(matches!(errors[2], ParseError::ReservedNotZero { found: 1 }));
    assert!(errors.iter().all(|e| e.kind() == ErrorKind::Structural));
}

#[test]
fn test_missing_header_and_bbox() {
    let err = OgfParser::new().decode(&[], None).unwrap_err();
    assert!(matches!(err.root_cause(), ParseError::MissingChunk { chunk: HEADER, .. }));

    let mut w = ChunkWriter::new();
    header(&mut w, 3, 9, 0);
    let err = OgfParser::new().decode(w.as_bytes(), None).unwrap_err();
    assert!(matches!(err.root_cause(), ParseError::MissingChunk { chunk: BBOX, .. }));
}

#[test]
fn test_particle_is_render_only() {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 9, 0);
    bbox(&mut w);
    let model = OgfParser::new().decode(w.as_bytes(), None).unwrap();
    assert_eq!(model.model_type, ModelType::Particle);
    assert!(model.vertices.is_none());
    assert_eq!(encode(&model).unwrap(), w.into_inner());
}

#[test]
fn test_detail_patch_unimplemented() {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 6, 0);
    bbox(&mut w);
    w.w_chunk(DPATCH, &[0; 16]);
    let err = OgfParser::new().decode(w.as_bytes(), None).unwrap_err();
    assert!(matches!(err, ParseError::Unimplemented(_)));
    assert_eq!(err.kind(), ErrorKind::Unimplemented);
}

#[test]
fn test_unhandled_chunks_reported() {
    let mut data = triangle_stream();
    let mut w = ChunkWriter::new();
    w.w_chunk(0x40, &[1, 2]);
    data.extend_from_slice(w.as_bytes());

    let model = OgfParser::new().decode(&data, None).unwrap();
    assert_eq!(model.unhandled_chunks, vec![0x40]);
    assert!(model.to_readable_string().contains("unhandled"));

    let strict = OgfParser::new().with_options(DecodeOptions {
        strict_chunks: true,
        ..Default::default()
    });
    let err = strict.decode(&data, None).unwrap_err();
    assert!(matches!(err, ParseError::UnhandledChunks { ref ids } if ids == &[0x40]));
}

#[test]
fn test_index_past_vertex_count() {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 0, 0);
    bbox(&mut w);
    static_vertices(&mut w, &[Vec3::ZERO, Vec3::ONE]);
    indices(&mut w, &[0, 1, 2]);
    let err = OgfParser::new().decode(w.as_bytes(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn test_trailing_bytes_in_fixed_chunk() {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 9, 0);
    w.w_chunk(BBOX, &[0; 28]);
    let err = OgfParser::new().decode(w.as_bytes(), None).unwrap_err();
    assert!(matches!(err, ParseError::TrailingBytes { remaining: 4, .. }));
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[test]
fn test_vertex_container_proxy() {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 0, 0);
    bbox(&mut w);
    {
        let mut c = w.open_chunk(VCONTAINER);
        c.w_u32(0);
        c.w_u32(1);
        c.w_u32(3);
    }
    indices(&mut w, &[0, 1, 2]);
    let data = w.into_inner();

    let mut model = OgfParser::new().decode(&data, None).unwrap();
    assert_eq!(
        model.vertices,
        Some(VertexSource::External(ExternalVertexRef { pool: 0, offset: 1, count: 3 }))
    );
    assert_eq!(encode(&model).unwrap(), data);

    let pools = vec![quad_buffer()];
    let view = model.vertex_view(&pools).unwrap().unwrap();
    assert_eq!(view.len(), 3);
    assert_eq!(view.positions()[0], Vec3::new(1.0, 0.0, 0.0));

    assert!(model.resolve_external_geometry(&[]).is_err());
    model.resolve_external_geometry(&pools).unwrap();
    let vb = model.vertex_buffer().unwrap();
    assert_eq!(vb.len(), 3);
    assert_eq!(vb.positions[2], Vec3::new(1.0, 0.0, 1.0));
}

#[test]
fn test_unknown_vertex_format() {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 0, 0);
    bbox(&mut w);
    {
        let mut c = w.open_chunk(VERTICES);
        c.w_u32(0x1234);
        c.w_u32(0);
    }
    indices(&mut w, &[]);
    let err = OgfParser::new().decode(w.as_bytes(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unimplemented);
}

#[test]
fn test_skinned_static_geometry() {
    let mut vb = VertexBuffer::new(VertexFormat::SkinnedOneLink);
    vb.push_skinned(Vec3::ZERO, Vec3::UP, Vec2::ZERO, 0);
    vb.push_skinned(Vec3::ONE, Vec3::UP, Vec2::ZERO, 1);
    vb.push_skinned(Vec3::UP, Vec3::UP, Vec2::ZERO, 1);
    let mut model = OgfModel::new(ModelType::SkeletonGeomStatic);
    model.vertices = Some(VertexSource::Owned(vb));
    model.indices = Some(IndexBuffer(vec![0, 1, 2]));

    let data = encode(&model).unwrap();
    let back = OgfParser::new().decode(&data, None).unwrap();
    assert_eq!(back, model);
    assert!(back.vertex_buffer().unwrap().is_skinned());

    // Same layout tagged as skinned geometry but carrying static vertices.
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 7, 0);
    bbox(&mut w);
    static_vertices(&mut w, &[Vec3::ZERO, Vec3::ONE, Vec3::UP]);
    indices(&mut w, &[0, 1, 2]);
    let err = OgfParser::new().decode(w.as_bytes(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

// ---------------------------------------------------------------------------
// Progressive LOD
// ---------------------------------------------------------------------------

fn progressive_stream(fix_faces: &[u16], split_fixes: &[u8]) -> Vec<u8> {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 2, 0);
    bbox(&mut w);
    static_vertices(
        &mut w,
        &[Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::ONE],
    );
    indices(&mut w, &[0, 1, 2, 2, 1, 3]);
    {
        let mut lod = w.open_chunk(LODDATA);
        {
            let mut c = lod.open_chunk(1);
            c.w_u32(4 - split_fixes.len() as u32);
            c.w_u32(3);
        }
        {
            let mut c = lod.open_chunk(2);
            for &fix in split_fixes {
                c.w_u16(0);
                c.w_u8(1);
                c.w_u8(fix);
            }
        }
        let mut c = lod.open_chunk(3);
        c.w_u32(fix_faces.len() as u32);
        for &f in fix_faces {
            c.w_u16(f);
        }
    }
    w.into_inner()
}

#[test]
fn test_progressive_fixed_visual() {
    let data = progressive_stream(&[3, 5], &[2, 0]);
    let model = OgfParser::new().decode(&data, None).unwrap();
    let lod = model.lod.as_ref().unwrap();
    assert_eq!(lod.min_vertices, 2);
    assert_eq!(lod.vsplits.len(), 2);
    // Split 0 runs with two active vertices and points both slots at vertex 2.
    assert_eq!(lod.base_indices.0, vec![0, 1, 2, 2, 1, 2]);
    assert_eq!(lod.base_triangle_count(), 1);
    assert!(model.to_readable_string().contains("lod"));

    assert_eq!(encode(&model).unwrap(), data);
}

#[test]
fn test_progressive_tamper_detection() {
    let err = OgfParser::new().decode(&progressive_stream(&[3], &[2, 0]), None).unwrap_err();
    assert!(matches!(err.root_cause(), ParseError::FixFaceMismatch { consumed: 2, available: 1 }));
    assert_eq!(err.kind(), ErrorKind::Consistency);

    let err = OgfParser::new().decode(&progressive_stream(&[3, 9], &[2, 0]), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn test_progressive_requires_owned_vertices() {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 2, 0);
    bbox(&mut w);
    {
        let mut c = w.open_chunk(VCONTAINER);
        c.w_u32(0);
        c.w_u32(0);
        c.w_u32(3);
    }
    indices(&mut w, &[0, 1, 2]);
    w.w_chunk(LODDATA, &[]);
    let err = OgfParser::new().decode(w.as_bytes(), None).unwrap_err();
    assert!(matches!(err, ParseError::InvalidStructure(_)));
}

#[test]
fn test_progressive_lod_chain() {
    let mut model = OgfModel::new(ModelType::Progressive2);
    model.lods = vec![triangle_model(), triangle_model()];
    let data = encode(&model).unwrap();
    let back = OgfParser::new().decode(&data, None).unwrap();
    assert_eq!(back.lods.len(), 2);
    let mut visited = 0;
    back.walk(&mut |_, _| visited += 1);
    assert_eq!(visited, 3);
    assert_eq!(back, model);
}

// ---------------------------------------------------------------------------
// Hierarchies
// ---------------------------------------------------------------------------

#[test]
fn test_hierarchy_child_forms_conflict() {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 1, 0);
    bbox(&mut w);
    w.w_chunk(CHILDREN_L, &0u32.to_le_bytes());
    w.w_chunk(CHILD_REFS, &0u32.to_le_bytes());
    let err = OgfParser::new().decode(w.as_bytes(), None).unwrap_err();
    assert!(matches!(err, ParseError::ConflictingChunks { found: 2, .. }));

    let mut w = ChunkWriter::new();
    header(&mut w, 3, 1, 0);
    bbox(&mut w);
    let err = OgfParser::new().decode(w.as_bytes(), None).unwrap_err();
    assert!(matches!(err, ParseError::ConflictingChunks { found: 0, .. }));
}

#[test]
fn test_hierarchy_indices() {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 1, 0);
    bbox(&mut w);
    {
        let mut c = w.open_chunk(CHILDREN_L);
        c.w_u32(3);
        for id in [4, 8, 15] {
            c.w_u32(id);
        }
    }
    let data = w.into_inner();
    let model = OgfParser::new().decode(&data, None).unwrap();
    assert_eq!(model.children, Children::Indices(vec![4, 8, 15]));
    assert_eq!(encode(&model).unwrap(), data);
}

#[test]
fn test_hierarchy_inline_children() {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 1, 0);
    bbox(&mut w);
    {
        let mut c = w.open_chunk(CHILDREN);
        c.w_chunk(0, &triangle_stream());
        c.w_chunk(1, &triangle_stream());
        // Numbering gap ends the list.
        c.w_chunk(3, &triangle_stream());
    }
    let model = OgfParser::new().decode(w.as_bytes(), None).unwrap();
    let children = model.children.models();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].triangle_count(), 1);
    assert!(model.to_readable_string().contains("  normal"));
}

#[test]
fn test_nesting_limit() {
    let mut inner = OgfModel::new(ModelType::Hierarchy);
    inner.children = Children::Inline(vec![triangle_model()]);
    let mut outer = OgfModel::new(ModelType::Hierarchy);
    outer.children = Children::Inline(vec![inner]);
    let data = encode(&outer).unwrap();

    assert!(OgfParser::new().decode(&data, None).is_ok());

    let shallow = OgfParser::new().with_options(DecodeOptions {
        max_nesting_depth: 1,
        ..Default::default()
    });
    let err = shallow.decode(&data, None).unwrap_err();
    assert!(matches!(err.root_cause(), ParseError::NestingTooDeep { depth: 2 }));
}

fn child_refs_stream(names: &[&str]) -> Vec<u8> {
    let mut w = ChunkWriter::new();
    header(&mut w, 3, 1, 0);
    bbox(&mut w);
    let mut c = w.open_chunk(CHILD_REFS);
    c.w_u32(names.len() as u32);
    for name in names {
        c.w_sz(name);
    }
    drop(c);
    w.into_inner()
}

#[test]
fn test_child_files() {
    let data = child_refs_stream(&["child.ogf", "missing.ogf"]);
    let fs = TestFs::default().with("meshes/child.ogf", triangle_stream());

    let model = OgfParser::new()
        .with_file_system(&fs)
        .decode(&data, Some("meshes/parent.ogf"))
        .unwrap();
    let Children::Files(files) = &model.children else {
        panic!("expected child files");
    };
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "child.ogf");
    assert_eq!(files[0].model.as_ref().unwrap().path.as_deref(), Some("meshes/child.ogf"));

    let err = OgfParser::new()
        .with_options(DecodeOptions {
            skip_missing_children: false,
            ..Default::default()
        })
        .with_file_system(&fs)
        .decode(&data, Some("meshes/parent.ogf"))
        .unwrap_err();
    assert!(matches!(err, ParseError::UnresolvedReference { kind: "child file", .. }));

    let err = OgfParser::new().decode(&data, Some("meshes/parent.ogf")).unwrap_err();
    assert!(matches!(err, ParseError::MissingCollaborator(_)));
}

#[test]
fn test_child_files_not_loaded() {
    let data = child_refs_stream(&["a.ogf", "b.ogf"]);
    let model = OgfParser::new()
        .with_options(DecodeOptions {
            load_external_children: false,
            ..Default::default()
        })
        .decode(&data, None)
        .unwrap();
    assert_eq!(
        model.children,
        Children::Files(vec![
            ChildFile { path: "a.ogf".into(), model: None },
            ChildFile { path: "b.ogf".into(), model: None },
        ])
    );
    assert_eq!(encode(&model).unwrap(), data);
}

// ---------------------------------------------------------------------------
// Skeletal models
// ---------------------------------------------------------------------------

fn skeletal_prefix(w: &mut ChunkWriter) {
    header(w, 3, 4, 0);
    bbox(w);
    w.w_chunk(CHILDREN_L, &0u32.to_le_bytes());
    let mut c = w.open_chunk(BONE_NAMES);
    c.w_u32(2);
    Bone::new("root", "").write(&mut c);
    Bone::new("spine", "root").write(&mut c);
}

fn write_samples(c: &mut ChunkWriter, name: &str, frames: &[([i16; 4], Vec3)]) {
    c.w_sz(name);
    c.w_u32(frames.len() as u32);
    // Same samples for both bones.
    for _ in 0..2 {
        for (q, t) in frames {
            for v in q {
                c.w_i16(*v);
            }
            c.w_vec3(*t);
        }
    }
}

fn motions_chunk(w: &mut ChunkWriter, order: [&str; 2]) {
    let mut m = w.open_chunk(MOTIONS);
    m.w_chunk(0, &2u32.to_le_bytes());
    for (i, name) in order.iter().enumerate() {
        let mut c = m.open_chunk(i as u32 + 1);
        if *name == "idle" {
            write_samples(
                &mut c,
                "idle",
                &[
                    ([0, 0, 0, 32767], Vec3::ZERO),
                    ([0, 0, 23170, 23170], Vec3::new(0.0, 1.0, 0.0)),
                ],
            );
        } else {
            write_samples(&mut c, name, &[([0, 0, 0, 32767], Vec3::ONE)]);
        }
    }
}

fn inline_skeletal_stream() -> Vec<u8> {
    let mut w = ChunkWriter::new();
    skeletal_prefix(&mut w);
    {
        let mut c = w.open_chunk(SMPARAMS);
        c.w_u16(1);
        c.w_sz("body");
        c.w_u16(2);
        c.w_u32(0);
        c.w_u32(1);

        c.w_u16(2);
        for (name, kind, target, slot) in [("idle", 0u8, 0u16, 1u16), ("shoot", 1, 1, 0)] {
            c.w_sz(name);
            c.w_u8(kind);
            c.w_u16(target);
            c.w_u16(slot);
            for v in [1.0f32, 1.0, 2.0, 2.0] {
                c.w_f32(v);
            }
            c.w_bool(kind == 1);
        }
    }
    motions_chunk(&mut w, ["idle", "shoot"]);
    w.into_inner()
}

#[test]
fn test_skeletal_inline_params() {
    let model = OgfParser::new().decode(&inline_skeletal_stream(), None).unwrap();
    assert_eq!(model.motion_source, Some(MotionSource::Inline));

    let skeleton = model.skeleton.as_ref().unwrap();
    assert_eq!(skeleton.bone_names(), vec!["root", "spine"]);
    assert_eq!(skeleton.bones[1].parent_index, Some(0));
    assert_eq!(skeleton.partitions[0].bones, vec![0, 1]);

    // Slots index the motion table directly.
    assert_eq!(model.motions[0].name, "shoot");
    assert_eq!(model.motions[0].target, MotionTarget::Bone(1));
    assert!(model.motions[0].flags.is_fx());
    assert!(model.motions[0].flags.stop_at_end());
    assert_eq!(model.motions[1].name, "idle");
    assert_eq!(model.motions[1].target, MotionTarget::Partition(0));

    let idle = model.find_motion("idle").unwrap();
    assert_eq!(idle.frame_end, 2);
    assert_eq!(idle.bone_motions.len(), 2);
    let (t, r) = idle.bone_motions[1].evaluate(1.0 / 30.0);
    assert_eq!(t, Vec3::new(0.0, 1.0, 0.0));
    assert!((r.z - std::f32::consts::FRAC_PI_2).abs() < 1e-3);
    assert!(r.x.abs() < 1e-3 && r.y.abs() < 1e-3);
}

#[test]
fn test_skeletal_reencode() {
    let model = OgfParser::new().decode(&inline_skeletal_stream(), None).unwrap();
    let data = encode(&model).unwrap();
    let back = OgfParser::new().decode(&data, None).unwrap();

    let names: Vec<_> = back.motions.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["shoot", "idle"]);
    assert_eq!(back.skeleton, model.skeleton);
    let (_, r) = back.motions[1].bone_motions[0].evaluate(1.0 / 30.0);
    assert!((r.z - std::f32::consts::FRAC_PI_2).abs() < 1e-3);
}

#[test]
fn test_skeletal_motion_slot_errors() {
    let build = |slots: [u16; 2]| {
        let mut w = ChunkWriter::new();
        skeletal_prefix(&mut w);
        {
            let mut c = w.open_chunk(SMPARAMS);
            c.w_u16(0);
            c.w_u16(2);
            for (name, slot) in [("a", slots[0]), ("b", slots[1])] {
                c.w_sz(name);
                c.w_u8(0);
                c.w_u16(0xFFFF);
                c.w_u16(slot);
                for _ in 0..4 {
                    c.w_f32(1.0);
                }
                c.w_bool(false);
            }
        }
        w.into_inner()
    };

    let err = OgfParser::new().decode(&build([0, 0]), None).unwrap_err();
    assert!(matches!(err, ParseError::DuplicateMotionSlot { slot: 0 }));
    assert_eq!(err.kind(), ErrorKind::Structural);
    let err = OgfParser::new().decode(&build([0, 2]), None).unwrap_err();
    assert!(matches!(err, ParseError::MotionSlotOutOfRange { slot: 2, count: 2 }));
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn test_skeletal_motion_count_mismatch() {
    let mut w = ChunkWriter::new();
    skeletal_prefix(&mut w);
    {
        let mut c = w.open_chunk(SMPARAMS);
        c.w_u16(0);
        c.w_u16(0);
    }
    w.open_chunk(MOTIONS).w_chunk(0, &1u32.to_le_bytes());
    let err = OgfParser::new().decode(w.as_bytes(), None).unwrap_err();
    assert!(matches!(err.root_cause(), ParseError::CountMismatch { expected: 0, found: 1, .. }));
    assert_eq!(err.kind(), ErrorKind::Structural);
}

const SIDECAR: &str = "\
[partition]
body

[body]
root
spine

[cycle]
idle

[fx]
shoot = shoot_fx

[idle]
motion = idle
part = body
speed = 1
power = 1
accrue = 2
falloff = 2
stop@end = off

[shoot_fx]
motion = SHOOT      ; case does not matter
bone = spine
speed = 2.5
power = 1
accrue = 2
falloff = 2
stop@end = on
";

fn sidecar_stream() -> Vec<u8> {
    let mut w = ChunkWriter::new();
    skeletal_prefix(&mut w);
    motions_chunk(&mut w, ["shoot", "idle"]);
    w.into_inner()
}

#[test]
fn test_skeletal_sidecar() {
    let fs = TestFs::default().with("meshes\\actor.ltx", SIDECAR);
    let model = OgfParser::new()
        .with_file_system(&fs)
        .decode(&sidecar_stream(), Some("meshes\\actor.ogf"))
        .unwrap();

    assert_eq!(model.motion_source, Some(MotionSource::Sidecar("meshes\\actor.ltx".into())));
    assert_eq!(model.motions.len(), 2);
    assert_eq!(model.motions[0].name, "idle");
    assert_eq!(model.motions[0].target, MotionTarget::Partition(0));
    assert_eq!(model.motions[0].frame_end, 2);
    assert_eq!(model.motions[1].name, "shoot");
    assert_eq!(model.motions[1].target, MotionTarget::Bone(1));
    assert_eq!(model.motions[1].speed, 2.5);
    assert!(model.motions[1].flags.stop_at_end());

    // Re-encoding stores parameters inline; no file system needed afterwards.
    let data = encode(&model).unwrap();
    assert!(ChunkReader::new(&data).has_chunk(SMPARAMS).unwrap());
    let back = OgfParser::new().decode(&data, None).unwrap();
    assert_eq!(back.motion_source, Some(MotionSource::Inline));
    assert_eq!(back.motions.len(), 2);
    assert_eq!(back.motions[1].speed, 2.5);
}

#[test]
fn test_skeletal_sidecar_missing() {
    let fs = TestFs::default();
    let err = OgfParser::new()
        .with_file_system(&fs)
        .decode(&sidecar_stream(), Some("meshes/actor.ogf"))
        .unwrap_err();
    assert!(matches!(err, ParseError::UnresolvedReference { kind: "sidecar file", .. }));

    let err = OgfParser::new().decode(&sidecar_stream(), Some("meshes/actor.ogf")).unwrap_err();
    assert!(matches!(err, ParseError::MissingCollaborator(_)));
}

#[test]
fn test_skeletal_sidecar_bad_motion_name() {
    let text = SIDECAR.replace("motion = idle", "motion = walk");
    let fs = TestFs::default().with("actor.ltx", text);
    let err = OgfParser::new()
        .with_file_system(&fs)
        .decode(&sidecar_stream(), Some("actor.ogf"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

// ---------------------------------------------------------------------------
// Output and files
// ---------------------------------------------------------------------------

#[test]
fn test_human_readable_outputs() {
    let model = triangle_model();
    let text = model.to_readable_string();
    assert!(text.contains("normal v3: 3 vertices, 1 triangles"));
    assert!(text.contains("texture 'wood'"));

    let json = model.to_json();
    assert_eq!(json["model_type"], "Normal");
    assert!(model.export_json(true).unwrap().contains('\n'));
    assert!(model.to_yaml().contains("model_type"));
}

#[test]
fn test_parse_file_memory_mapped() {
    let path = std::env::temp_dir().join(format!("xray_ogf_parse_file_{}.ogf", std::process::id()));
    std::fs::write(&path, triangle_stream()).unwrap();

    let mapped = OgfParser::new().with_options(DecodeOptions {
        memory_mapping_threshold: 0,
        ..Default::default()
    });
    let model = mapped.parse_file(&path).unwrap();
    assert_eq!(model.triangle_count(), 1);
    assert_eq!(model.path.as_deref(), Some(path.to_string_lossy().as_ref()));

    let read = OgfParser::new().parse_file(&path).unwrap();
    assert_eq!(read.control_point_count(), 3);
    assert!(mapped.can_parse(&path));

    std::fs::remove_file(&path).unwrap();
}
