//! Plain load-input data delivered by an external importer.
//!
//! The parsing of on-disk formats is a collaborator's concern; the document
//! engine only consumes this fully-formed in-memory description. Parent
//! references are by position into earlier-declared parts.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;

use super::palette::Rgba;

/// A fully-formed model description ready to load
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelData {
    pub name: String,
    pub author: String,
    pub comments: String,
    /// Ordered palette groups; group order defines color indices
    pub palette: Vec<ColorGroup>,
    pub parts: Vec<PartData>,
}

/// One palette group: a run of colors under a shared tag string
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ColorGroup {
    /// Empty string for an untagged run
    pub tags: String,
    pub colors: Vec<Rgba>,
}

/// One model part: its cells, hierarchy, and transform
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PartData {
    /// Position of the parent among earlier-declared parts, if attached
    pub parent: Option<usize>,
    pub bone_name: String,
    pub base_point: Vec3,
    pub translation: Vec3,
    pub voxels: Vec<CellData>,
}

/// A single occupied cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellData {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Palette index
    pub color: usize,
}
