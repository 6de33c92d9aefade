//! Editable voxel document: model root, parts, palette, and sparse storage

pub mod action;
pub mod data;
pub mod grid;
pub mod model;
pub mod palette;
pub mod part;

pub use action::EditAction;
pub use data::{CellData, ColorGroup, ModelData, PartData};
pub use grid::{BLOCK_EDGE, VoxelGrid};
pub use model::{EditableModel, ModelMetadata, ModelState};
pub use palette::{Palette, Rgba, TagRange};
pub use part::{Part, PartId, VoxelEdit};
