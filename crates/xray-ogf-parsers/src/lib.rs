//! xray-ogf-parsers
//!
//! Codec for X-Ray engine OGF models and the chunk container they are built on.
//!
//! # Supported Formats
//!
//! | Format | Extension | Description |
//! |--------|-----------|-------------|
//! | OGF    | `.ogf`    | Static, progressive, hierarchical and skeletal models (v3) |
//! | LTX    | `.ltx`    | Text configuration (sidecar motion definitions) |
//!
//! # Example
//!
//! ```rust,ignore
//! use xray_ogf_parsers::{OgfParser, Parser, HumanReadable};
//!
//! let parser = OgfParser::new();
//! let model = parser.parse_file("meshes/stalker.ogf".as_ref())?;
//!
//! println!("{}", model.to_readable_string());
//! ```

pub mod chunk;
pub mod envelope;
pub mod logging;
pub mod ltx;
pub mod ogf;
pub mod traits;

// Re-export main types
pub use traits::{
    ConfigReader, DecodeOptions, ErrorKind, Exportable, FileSystem, HumanReadable, ParseError,
    ParseResult, Parser,
};

pub use chunk::{ChunkReader, ChunkWriter, CHUNK_COMPRESSED, CHUNK_HEADER_SIZE};
pub use envelope::{Behavior, Envelope, EnvelopeKind, Key, Shape};
pub use ltx::LtxFile;
pub use ogf::{
    encode, Bone, ChildFile, Children, ModelType, Motion, OgfModel, OgfParser, Partition,
    ProgressiveLod, Skeleton, TextureRef, VertexBuffer, VertexSource,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
