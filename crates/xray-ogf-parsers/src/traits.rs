// xray-ogf-parsers/src/traits.rs
//! Core traits defining the decoder interface.
//!
//! This module establishes:
//! - The error taxonomy shared by every decode and encode path
//! - Decode configuration
//! - The collaborator interfaces (file system, text configuration) that are
//!   injected into decode calls instead of being reached through globals
//! - The `Parser` trait implemented by the OGF parser

use std::io::Read;
use std::path::Path;

use thiserror::Error;

/// Errors that can occur during decode and encode operations
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected end of data at offset {offset}: requested {requested} bytes, available {available}")]
    UnexpectedEof {
        offset: u64,
        requested: usize,
        available: usize,
    },

    #[error("Missing required chunk 0x{chunk:X} ({context})")]
    MissingChunk { chunk: u32, context: String },

    #[error("Chunk 0x{chunk:X} at offset {offset} declares {declared} bytes, only {available} available")]
    TruncatedChunk {
        chunk: u32,
        offset: u64,
        declared: u32,
        available: usize,
    },

    #[error("{remaining} unread trailing bytes in {context}")]
    TrailingBytes { context: String, remaining: usize },

    #[error("Unknown model type: {tag}")]
    UnknownModelType { tag: u8 },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Reserved header field must be zero, found 0x{found:04X}")]
    ReservedNotZero { found: u16 },

    #[error("Conflicting chunks in {context}: expected exactly one of {chunks:X?}, found {found}")]
    ConflictingChunks {
        context: String,
        chunks: Vec<u32>,
        found: usize,
    },

    #[error("Unresolved {kind} reference '{name}' in {context}")]
    UnresolvedReference {
        kind: &'static str,
        name: String,
        context: String,
    },

    #[error("Duplicate {kind} '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Skeleton must have exactly one root bone, found {found}")]
    RootCount { found: usize },

    #[error("Bone '{name}' is part of a parent cycle")]
    BoneCycle { name: String },

    #[error("Motion slot {slot} is out of range (table has {count} slots)")]
    MotionSlotOutOfRange { slot: usize, count: usize },

    #[error("Motion slot {slot} is filled twice")]
    DuplicateMotionSlot { slot: usize },

    #[error("Motion slots left unfilled: {missing:?}")]
    UnfilledMotionSlots { missing: Vec<usize> },

    #[error("Count mismatch for {what}: expected {expected}, found {found}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("Missing configuration value [{section}] {key}")]
    MissingConfigValue { section: String, key: String },

    #[error("Unhandled chunks: {ids:X?}")]
    UnhandledChunks { ids: Vec<u32> },

    #[error("Nesting depth {depth} exceeds the configured limit")]
    NestingTooDeep { depth: u32 },

    #[error("Vertex count mismatch after LOD replay: expected {expected}, reached {found}")]
    VertexCountMismatch { expected: usize, found: usize },

    #[error("Fix-face table mismatch: vertex splits consume {consumed}, table holds {available}")]
    FixFaceMismatch { consumed: usize, available: usize },

    #[error("Empty {what}")]
    EmptyCollection { what: String },

    #[error("Unsupported feature: {0}")]
    Unimplemented(String),

    #[error("Nested error in {context}: {source}")]
    Nested {
        context: String,
        #[source]
        source: Box<ParseError>,
    },
}

/// Failure classes every error falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or drifted stream layout, unresolved references
    Structural,
    /// Internally inconsistent data that parsed cleanly
    Consistency,
    /// Recognised but unsupported content
    Unimplemented,
}

impl ParseError {
    /// Wrap this error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ParseError::Nested {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::Nested { source, .. } => source.kind(),
            ParseError::VertexCountMismatch { .. }
            | ParseError::FixFaceMismatch { .. }
            | ParseError::EmptyCollection { .. } => ErrorKind::Consistency,
            ParseError::Unimplemented(_) => ErrorKind::Unimplemented,
            _ => ErrorKind::Structural,
        }
    }

    /// Innermost error, skipping context wrappers
    pub fn root_cause(&self) -> &ParseError {
        match self {
            ParseError::Nested { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn missing_chunk(chunk: u32, context: impl Into<String>) -> Self {
        ParseError::MissingChunk {
            chunk,
            context: context.into(),
        }
    }

    pub(crate) fn unresolved(kind: &'static str, name: impl Into<String>, context: impl Into<String>) -> Self {
        ParseError::UnresolvedReference {
            kind,
            name: name.into(),
            context: context.into(),
        }
    }
}

/// Result type alias for decode and encode operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Configuration options for decoding
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Treat chunk ids the selected sequence did not consume as errors
    pub strict_chunks: bool,
    /// Maximum nesting depth for child and LOD models
    pub max_nesting_depth: u32,
    /// Whether to open child models referenced by file path
    pub load_external_children: bool,
    /// Whether a child file that cannot be opened is skipped instead of failing
    pub skip_missing_children: bool,
    /// Whether to use memory mapping for large files
    pub use_memory_mapping: bool,
    /// Minimum file size to enable memory mapping
    pub memory_mapping_threshold: u64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict_chunks: false,
            max_nesting_depth: 32,
            load_external_children: true,
            skip_missing_children: true,
            use_memory_mapping: true,
            memory_mapping_threshold: 10 * 1024 * 1024, // 10 MB
        }
    }
}

/// File-system collaborator
///
/// Paths are engine-style strings with `/` or `\` separators.
pub trait FileSystem {
    /// Resolve `relative` against the root registered for `alias`
    fn resolve_path(&self, alias: &str, relative: &str) -> Option<String>;

    /// Read a whole file, `None` when it cannot be opened
    fn open_read(&self, path: &str) -> Option<Vec<u8>>;
}

/// Section-oriented text configuration collaborator
pub trait ConfigReader {
    fn section_exists(&self, section: &str) -> bool;

    /// Number of key/value lines in a section (0 when absent)
    fn line_count(&self, section: &str) -> usize;

    /// Key and value of the line at `index`, in file order
    fn read_line(&self, section: &str, index: usize) -> Option<(&str, &str)>;

    fn string(&self, section: &str, key: &str) -> Option<&str>;

    fn float(&self, section: &str, key: &str) -> Option<f32> {
        self.string(section, key)?.trim().parse().ok()
    }

    fn bool(&self, section: &str, key: &str) -> Option<bool> {
        match self.string(section, key)?.trim().to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Some(true),
            "off" | "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

/// Core trait for file format parsers
pub trait Parser {
    /// The parsed output type
    type Output;

    /// Returns the file extensions this parser handles (e.g., ["ogf"])
    fn extensions(&self) -> &[&str];

    /// Returns a human-readable name for this parser
    fn name(&self) -> &str;

    /// Returns the format version(s) supported by this parser
    fn supported_versions(&self) -> &[u32] {
        &[]
    }

    /// Parse a complete in-memory buffer
    fn parse_bytes(&self, data: &[u8], path: Option<&str>) -> ParseResult<Self::Output>;

    /// Parse from a reader
    fn parse<R: Read>(&self, mut reader: R) -> ParseResult<Self::Output> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.parse_bytes(&data, None)
    }

    /// Parse from a file path
    fn parse_file(&self, path: &Path) -> ParseResult<Self::Output> {
        let data = std::fs::read(path)?;
        self.parse_bytes(&data, path.to_str())
    }

    /// Check if this parser can handle the given file
    fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                let ext_str = ext.to_string_lossy().to_lowercase();
                self.extensions().iter().any(|e| e.to_lowercase() == ext_str)
            })
            .unwrap_or(false)
    }
}

/// Trait for converting parsed data to human-readable formats
pub trait HumanReadable {
    /// Convert to a human-readable string representation
    fn to_readable_string(&self) -> String;

    /// Convert to formatted JSON
    fn to_json(&self) -> serde_json::Value;

    /// Convert to formatted YAML (falls back to the text form)
    fn to_yaml(&self) -> String {
        serde_yaml::to_string(&self.to_json()).unwrap_or_else(|_| self.to_readable_string())
    }
}

/// Trait for types that can be serialized to various output formats
pub trait Exportable {
    /// Export to JSON format
    fn export_json(&self, pretty: bool) -> ParseResult<String>;

    /// Export to binary format (for re-packing)
    fn export_binary(&self) -> ParseResult<Vec<u8>>;
}
