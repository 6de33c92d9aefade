//! Reified edit commands for the document history.
//!
//! Each variant captures the "old" payload of one committed mutation.
//! Invoking it writes that payload back into the model state and returns the
//! variant carrying the displaced state, per [`Reversible`]. Actions touch
//! document state only - face meshes and bounds are reconciled afterwards
//! with an explicit `update_all`.

use crate::core::types::Vec3;
use crate::history::Reversible;

use super::model::{ModelMetadata, ModelState};
use super::palette::{Rgba, TagRange};
use super::part::{Part, PartId, VoxelEdit};

/// A recorded, self-inverting document edit
pub enum EditAction {
    /// Restore model metadata
    Metadata { metadata: ModelMetadata },
    /// Re-insert a removed part at its old index
    InsertPart { index: usize, part: Box<Part> },
    /// Remove the part at an index, capturing it on invoke
    RemovePart { index: usize },
    /// Restore a part's parent link
    PartParent {
        part: PartId,
        parent: Option<PartId>,
    },
    /// Restore a part's bone name
    PartBoneName { part: PartId, name: String },
    /// Restore a part's base point
    PartBasePoint { part: PartId, point: Vec3 },
    /// Restore a part's translation
    PartTranslation { part: PartId, translation: Vec3 },
    /// Replay one batch of voxel writes and removals.
    ///
    /// With `restore_old` set the batch replays old values in reverse
    /// application order (undo); otherwise new values in application order
    /// (redo).
    VoxelBatch {
        part: PartId,
        edits: Vec<VoxelEdit>,
        restore_old: bool,
    },
    /// Restore a single palette slot
    PaletteColor { index: usize, color: Rgba },
    /// Truncate the palette, capturing the removed tail on invoke
    PaletteTruncate { len: usize },
    /// Re-append truncated palette colors
    PaletteRestore { colors: Vec<Rgba> },
    /// Restore the stored tag-range list
    PaletteTags { ranges: Vec<TagRange> },
}

impl Reversible for EditAction {
    type Target = ModelState;

    fn invoke(self, state: &mut ModelState) -> EditAction {
        match self {
            EditAction::Metadata { metadata } => {
                let old = state.replace_metadata(metadata);
                EditAction::Metadata { metadata: old }
            }
            EditAction::InsertPart { index, part } => {
                state.insert_part_at(index, *part);
                EditAction::RemovePart { index }
            }
            EditAction::RemovePart { index } => {
                let part = state.remove_part_at(index);
                EditAction::InsertPart {
                    index,
                    part: Box::new(part),
                }
            }
            EditAction::PartParent { part, parent } => {
                let old = state.part_mut_by_id(part).replace_parent(parent);
                EditAction::PartParent { part, parent: old }
            }
            EditAction::PartBoneName { part, name } => {
                let old = state.part_mut_by_id(part).replace_bone_name(name);
                EditAction::PartBoneName { part, name: old }
            }
            EditAction::PartBasePoint { part, point } => {
                let old = state.part_mut_by_id(part).replace_base_point(point);
                EditAction::PartBasePoint { part, point: old }
            }
            EditAction::PartTranslation { part, translation } => {
                let old = state.part_mut_by_id(part).replace_translation(translation);
                EditAction::PartTranslation {
                    part,
                    translation: old,
                }
            }
            EditAction::VoxelBatch {
                part,
                edits,
                restore_old,
            } => {
                state.part_mut_by_id(part).apply_edits(&edits, restore_old);
                EditAction::VoxelBatch {
                    part,
                    edits,
                    restore_old: !restore_old,
                }
            }
            EditAction::PaletteColor { index, color } => {
                let old = state.palette.replace_color(index, color);
                EditAction::PaletteColor { index, color: old }
            }
            EditAction::PaletteTruncate { len } => {
                let tail = state.palette.truncate_colors(len);
                EditAction::PaletteRestore { colors: tail }
            }
            EditAction::PaletteRestore { colors } => {
                let len = state.palette.extend_colors(colors);
                EditAction::PaletteTruncate { len }
            }
            EditAction::PaletteTags { ranges } => {
                let old = state.palette.replace_ranges(ranges);
                EditAction::PaletteTags { ranges: old }
            }
        }
    }
}
