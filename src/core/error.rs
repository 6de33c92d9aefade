//! Error types for the document engine

use thiserror::Error;

/// Main error type for the document engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("palette index {index} out of range ({len} colors)")]
    PaletteIndex { index: usize, len: usize },

    #[error("invalid tag range {start}..{end} for a palette of {len} colors")]
    TagRange {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("part index {index} out of range ({len} parts)")]
    PartIndex { index: usize, len: usize },

    #[error("no part with id {0:?} in the model")]
    UnknownPart(crate::document::PartId),

    #[error("part {part} references parent {parent}, which is not declared before it")]
    UnknownParent { part: usize, parent: usize },
}
