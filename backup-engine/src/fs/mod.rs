//! Filesystem helpers: tree walking, glob resolution and metadata-preserving copies.

pub mod matcher;
pub mod metadata;
pub mod walker;
