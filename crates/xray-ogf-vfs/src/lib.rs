//! X-Ray engine file systems
//!
//! Implements the decoder's `FileSystem` collaborator over:
//! - Folders on disk, addressed through `$alias$` prefixes
//! - An in-memory file table (tests, tooling, archives unpacked elsewhere)
//!
//! # Example
//! ```no_run
//! use xray_ogf_vfs::{FsConfig, NativeFileSystem};
//! use xray_ogf_parsers::{OgfParser, FileSystem};
//!
//! let config = FsConfig::load("fsgame.ltx".as_ref()).unwrap();
//! let fs = NativeFileSystem::from_config(".", &config).unwrap();
//!
//! let data = fs.open_read("$game_meshes$\\actors\\stalker.ogf").unwrap();
//! let model = OgfParser::new()
//!     .with_file_system(&fs)
//!     .decode(&data, Some("$game_meshes$\\actors\\stalker.ogf"))
//!     .unwrap();
//! ```

pub mod config;
pub mod mount;
pub mod path;

pub use config::{AliasDef, FsConfig};
pub use mount::{MemoryFileSystem, NativeFileSystem, VfsError, VfsResult};
