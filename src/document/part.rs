//! One rigid voxel piece of an editable model.
//!
//! A part owns a sparse cell grid of palette indices, an attachment to an
//! optional parent part, a transform (base point + translation), running
//! cell bounds, and the face mesh derived from cell occupancy. Field edits
//! record single-field inverses; voxel edits are buffered and committed as
//! one reversible batch.

use std::sync::Arc;

use crate::core::types::{IVec3, Vec3, Vec4};
use crate::history::History;
use crate::math::CellBounds;
use crate::mesh::{Face, FaceBufferFactory, FaceBuffers, dir};

use super::action::EditAction;
use super::data::PartData;
use super::grid::VoxelGrid;
use super::palette::Palette;

/// Stable handle identifying a part within its model.
///
/// Ids are allocated by the model and never reused, so a stale handle is
/// detected instead of silently resolving to a different part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PartId(pub(crate) u64);

/// One buffered voxel mutation: the cell, the value it held immediately
/// before the edit, and the value it was given. `None` marks absence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelEdit {
    pub cell: IVec3,
    pub old: Option<usize>,
    pub new: Option<usize>,
}

/// Neighbor offsets paired with the face direction they expose
const NEIGHBORS: [(IVec3, u32); 6] = [
    (IVec3::X, dir::POS_X),
    (IVec3::NEG_X, dir::NEG_X),
    (IVec3::Y, dir::POS_Y),
    (IVec3::NEG_Y, dir::NEG_Y),
    (IVec3::Z, dir::POS_Z),
    (IVec3::NEG_Z, dir::NEG_Z),
];

/// A rigid voxel piece: sparse cell grid, attachment data, and the face
/// mesh derived from cell occupancy
pub struct Part {
    id: PartId,
    grid: VoxelGrid<usize>,
    parent: Option<PartId>,
    bone_name: String,
    base_point: Vec3,
    translation: Vec3,
    /// None until the first cell has ever been added
    bounds: Option<CellBounds>,
    pending: Vec<VoxelEdit>,
    faces: FaceBuffers,
}

impl Part {
    pub(crate) fn new(id: PartId, factory: Arc<dyn FaceBufferFactory>) -> Self {
        Self {
            id,
            grid: VoxelGrid::new(),
            parent: None,
            bone_name: String::new(),
            base_point: Vec3::ZERO,
            translation: Vec3::ZERO,
            bounds: None,
            pending: Vec::new(),
            faces: FaceBuffers::new(factory),
        }
    }

    /// Stable id of this part
    pub fn id(&self) -> PartId {
        self.id
    }

    /// Parent part, if attached
    pub fn parent(&self) -> Option<PartId> {
        self.parent
    }

    /// Bone this part follows
    pub fn bone_name(&self) -> &str {
        &self.bone_name
    }

    /// Pivot of the part in model space
    pub fn base_point(&self) -> Vec3 {
        self.base_point
    }

    /// Offset applied on top of the base point
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    /// Cell bounds. None until a cell has ever been added.
    pub fn bounds(&self) -> Option<CellBounds> {
        self.bounds
    }

    /// The sparse cell grid
    pub fn grid(&self) -> &VoxelGrid<usize> {
        &self.grid
    }

    /// The derived face mesh
    pub fn faces(&self) -> &FaceBuffers {
        &self.faces
    }

    /// Attach to another part. Setting the current parent records nothing.
    pub fn set_parent(&mut self, parent: Option<PartId>, history: &mut History<EditAction>) {
        if self.parent != parent {
            history.record(
                "Change parent.",
                EditAction::PartParent {
                    part: self.id,
                    parent: self.parent,
                },
            );
            self.parent = parent;
        }
    }

    /// Rename the bone this part follows
    pub fn set_bone_name(&mut self, name: impl Into<String>, history: &mut History<EditAction>) {
        let name = name.into();
        if self.bone_name != name {
            let old = std::mem::replace(&mut self.bone_name, name);
            history.record(
                "Modify bone name.",
                EditAction::PartBoneName {
                    part: self.id,
                    name: old,
                },
            );
        }
    }

    /// Move the part's pivot
    pub fn set_base_point(&mut self, point: Vec3, history: &mut History<EditAction>) {
        if self.base_point != point {
            history.record(
                "Modify base point.",
                EditAction::PartBasePoint {
                    part: self.id,
                    point: self.base_point,
                },
            );
            self.base_point = point;
        }
    }

    /// Move the part
    pub fn set_translation(&mut self, translation: Vec3, history: &mut History<EditAction>) {
        if self.translation != translation {
            history.record(
                "Modify translation.",
                EditAction::PartTranslation {
                    part: self.id,
                    translation: self.translation,
                },
            );
            self.translation = translation;
        }
    }

    /// Write a cell, deferring geometry and history to a later flush
    pub fn add_voxel_unbuffered(&mut self, cell: IVec3, color: usize) {
        self.pending.push(VoxelEdit {
            cell,
            old: self.grid.get(cell),
            new: Some(color),
        });
        self.grid.insert(cell, color);
    }

    /// Clear a cell, deferring geometry and history to a later flush
    pub fn remove_voxel_unbuffered(&mut self, cell: IVec3) {
        self.pending.push(VoxelEdit {
            cell,
            old: self.grid.get(cell),
            new: None,
        });
        self.grid.remove(cell);
    }

    /// Commit all buffered voxel edits as one reversible action.
    ///
    /// An empty buffer records nothing.
    pub fn flush_pending_edits(&mut self, history: &mut History<EditAction>) {
        if self.pending.is_empty() {
            return;
        }
        let edits = std::mem::take(&mut self.pending);
        history.record(
            "Modify voxels.",
            EditAction::VoxelBatch {
                part: self.id,
                edits,
                restore_old: true,
            },
        );
    }

    /// Buffered edits not yet flushed
    pub fn pending_edits(&self) -> &[VoxelEdit] {
        &self.pending
    }

    /// Write a cell and update the derived mesh for it immediately
    pub fn add_voxel(&mut self, cell: IVec3, color: usize, palette: &Palette) {
        self.add_voxel_unbuffered(cell, color);
        self.update_voxel(cell, color, palette);
    }

    // Replays a recorded batch. Undo walks the edits backwards so a cell
    // touched twice in one batch lands on its earliest old value.
    pub(crate) fn apply_edits(&mut self, edits: &[VoxelEdit], restore_old: bool) {
        if restore_old {
            for edit in edits.iter().rev() {
                match edit.old {
                    Some(color) => self.grid.insert(edit.cell, color),
                    None => self.grid.remove(edit.cell),
                }
            }
        } else {
            for edit in edits {
                match edit.new {
                    Some(color) => self.grid.insert(edit.cell, color),
                    None => self.grid.remove(edit.cell),
                }
            }
        }
    }

    /// Grow the bounds for a newly written cell and emit its visible faces.
    ///
    /// A face is emitted only where the 6-connected neighbor is absent, so
    /// quads appear exactly at solid/empty boundaries. Faces of existing
    /// neighbors are never retired here; a removal or an occluded face needs
    /// [`Part::update_all`] to settle.
    pub fn update_voxel(&mut self, cell: IVec3, color: usize, palette: &Palette) {
        match &mut self.bounds {
            Some(bounds) => bounds.expand(cell),
            None => self.bounds = Some(CellBounds::point(cell)),
        }

        let rgba = palette.get(color);
        // Full opacity regardless of the stored alpha
        let face_color = Vec4::new(
            rgba.r as f32 / 255.0,
            rgba.g as f32 / 255.0,
            rgba.b as f32 / 255.0,
            1.0,
        );
        let center = cell.as_vec3();
        for (offset, code) in NEIGHBORS {
            if !self.grid.contains(cell + offset) {
                self.faces.push(Face::new(
                    center + offset.as_vec3() * 0.5,
                    code,
                    face_color,
                ));
            }
        }
    }

    /// Rebuild the whole face mesh and bounds from current occupancy.
    ///
    /// Used after bulk loads and undo/redo, where incremental tracking was
    /// bypassed.
    pub fn update_all(&mut self, palette: &Palette) {
        self.faces.clear();
        self.bounds = None;
        let cells: Vec<(IVec3, usize)> = self.grid.iter().collect();
        for (cell, color) in cells {
            self.update_voxel(cell, color, palette);
        }
    }

    /// Upload and draw this part's faces through the external buffers
    pub fn draw(&mut self) {
        self.faces.draw_all();
    }

    /// Replace contents from load data. Never recorded - a load is not a
    /// user edit.
    pub(crate) fn load_from_data(
        &mut self,
        data: &PartData,
        parent: Option<PartId>,
        palette: &Palette,
    ) {
        self.grid.clear();
        for cell in &data.voxels {
            self.grid
                .insert(IVec3::new(cell.x, cell.y, cell.z), cell.color);
        }
        self.update_all(palette);
        self.base_point = data.base_point;
        self.translation = data.translation;
        self.bone_name = data.bone_name.clone();
        self.parent = parent;
    }

    pub(crate) fn replace_parent(&mut self, parent: Option<PartId>) -> Option<PartId> {
        std::mem::replace(&mut self.parent, parent)
    }

    pub(crate) fn replace_bone_name(&mut self, name: String) -> String {
        std::mem::replace(&mut self.bone_name, name)
    }

    pub(crate) fn replace_base_point(&mut self, point: Vec3) -> Vec3 {
        std::mem::replace(&mut self.base_point, point)
    }

    pub(crate) fn replace_translation(&mut self, translation: Vec3) -> Vec3 {
        std::mem::replace(&mut self.translation, translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::data::ColorGroup;
    use crate::document::palette::Rgba;
    use crate::mesh::test_support::null_factory;

    fn part() -> Part {
        Part::new(PartId(0), null_factory())
    }

    fn palette() -> Palette {
        let mut palette = Palette::new();
        palette.load_groups(&[ColorGroup {
            tags: String::new(),
            colors: vec![
                Rgba::new(255, 0, 0, 128),
                Rgba::opaque(0, 255, 0),
                Rgba::opaque(0, 0, 255),
            ],
        }]);
        palette
    }

    fn face_at(part: &Part, position: Vec3) -> Option<&Face> {
        part.faces().faces().find(|f| f.position == position)
    }

    #[test]
    fn test_isolated_voxel_emits_six_faces() {
        let mut part = part();
        let palette = palette();

        part.add_voxel(IVec3::ZERO, 0, &palette);
        assert_eq!(part.faces().face_count(), 6);

        let dirs: Vec<u32> = part.faces().faces().map(|f| f.dir).collect();
        assert_eq!(dirs, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(
            face_at(&part, Vec3::new(0.5, 0.0, 0.0)).map(|f| f.dir),
            Some(dir::POS_X)
        );
    }

    #[test]
    fn test_face_color_forces_full_opacity() {
        let mut part = part();
        let palette = palette();

        // Palette slot 0 has alpha 128; faces are emitted opaque
        part.add_voxel(IVec3::ZERO, 0, &palette);
        for face in part.faces().faces() {
            assert_eq!(face.color, Vec4::new(1.0, 0.0, 0.0, 1.0));
        }
    }

    #[test]
    fn test_adjacent_pair_culls_shared_faces() {
        let mut part = part();
        let palette = palette();

        part.add_voxel_unbuffered(IVec3::new(0, 0, 0), 1);
        part.add_voxel_unbuffered(IVec3::new(1, 0, 0), 1);
        part.update_all(&palette);

        assert_eq!(part.faces().face_count(), 10);
        // No face at the shared boundary, from either side
        assert!(face_at(&part, Vec3::new(0.5, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_incremental_add_keeps_stale_faces_until_update_all() {
        let mut part = part();
        let palette = palette();

        part.add_voxel(IVec3::new(0, 0, 0), 1, &palette);
        part.add_voxel(IVec3::new(1, 0, 0), 1, &palette);

        // The second add emits 5 boundary faces; the first voxel's now
        // occluded +x face is only retired by a full rebuild
        assert_eq!(part.faces().face_count(), 11);
        part.update_all(&palette);
        assert_eq!(part.faces().face_count(), 10);
    }

    #[test]
    fn test_update_all_is_idempotent() {
        let mut part = part();
        let palette = palette();

        for cell in [
            IVec3::new(0, 0, 0),
            IVec3::new(1, 0, 0),
            IVec3::new(0, 1, 0),
            IVec3::new(-1, -1, -1),
        ] {
            part.add_voxel_unbuffered(cell, 2);
        }

        part.update_all(&palette);
        let first: Vec<Face> = part.faces().faces().copied().collect();
        part.update_all(&palette);
        let second: Vec<Face> = part.faces().faces().copied().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_bounds_track_added_cells() {
        let mut part = part();
        let palette = palette();
        assert_eq!(part.bounds(), None);

        part.add_voxel(IVec3::new(2, 3, 4), 0, &palette);
        let bounds = part.bounds().unwrap();
        assert_eq!(bounds.min, IVec3::new(2, 3, 4));
        assert_eq!(bounds.max, IVec3::new(2, 3, 4));

        part.add_voxel(IVec3::new(-1, 5, 4), 0, &palette);
        let bounds = part.bounds().unwrap();
        assert_eq!(bounds.min, IVec3::new(-1, 3, 4));
        assert_eq!(bounds.max, IVec3::new(2, 5, 4));
    }

    #[test]
    fn test_update_all_recomputes_bounds() {
        let mut part = part();
        let palette = palette();

        part.add_voxel(IVec3::new(0, 0, 0), 0, &palette);
        part.add_voxel(IVec3::new(9, 9, 9), 0, &palette);
        part.remove_voxel_unbuffered(IVec3::new(9, 9, 9));
        part.update_all(&palette);

        let bounds = part.bounds().unwrap();
        assert_eq!(bounds.min, IVec3::ZERO);
        assert_eq!(bounds.max, IVec3::ZERO);
    }

    #[test]
    fn test_pending_edits_capture_old_values() {
        let mut part = part();

        part.add_voxel_unbuffered(IVec3::ZERO, 1);
        part.add_voxel_unbuffered(IVec3::ZERO, 2);
        part.remove_voxel_unbuffered(IVec3::ZERO);

        let pending = part.pending_edits();
        assert_eq!(pending[0].old, None);
        assert_eq!(pending[0].new, Some(1));
        assert_eq!(pending[1].old, Some(1));
        assert_eq!(pending[1].new, Some(2));
        assert_eq!(pending[2].old, Some(2));
        assert_eq!(pending[2].new, None);
    }

    #[test]
    fn test_apply_edits_undoes_same_cell_batch_in_reverse() {
        let mut part = part();

        part.add_voxel_unbuffered(IVec3::ZERO, 1);
        part.add_voxel_unbuffered(IVec3::ZERO, 2);
        let edits: Vec<VoxelEdit> = part.pending_edits().to_vec();

        part.apply_edits(&edits, true);
        assert_eq!(part.grid().get(IVec3::ZERO), None);

        part.apply_edits(&edits, false);
        assert_eq!(part.grid().get(IVec3::ZERO), Some(2));
    }

    #[test]
    fn test_setters_skip_recording_when_unchanged() {
        let mut part = part();
        let mut history = History::new();

        part.set_translation(Vec3::ZERO, &mut history);
        part.set_bone_name("", &mut history);
        part.set_parent(None, &mut history);
        assert!(!history.can_undo());

        part.set_translation(Vec3::ONE, &mut history);
        assert!(history.can_undo());
        assert_eq!(history.undo_description(), Some("Modify translation."));
    }

    #[test]
    fn test_flush_empty_buffer_records_nothing() {
        let mut part = part();
        let mut history = History::new();

        part.flush_pending_edits(&mut history);
        assert!(!history.can_undo());

        part.add_voxel_unbuffered(IVec3::ZERO, 0);
        part.flush_pending_edits(&mut history);
        assert!(history.can_undo());
        assert!(part.pending_edits().is_empty());
    }
}
