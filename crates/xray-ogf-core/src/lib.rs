//! Core geometry types for the OGF toolkit
//!
//! This crate provides the value types shared by the codec, the file-system
//! collaborators and the command-line front end.

pub mod types;

pub use types::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::types::*;
}
