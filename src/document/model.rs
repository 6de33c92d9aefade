//! The editable model document root.
//!
//! An [`EditableModel`] owns the document state (metadata, one shared
//! palette, the ordered part list) together with the history that every
//! recorded mutation flows through. Undo and redo act on the state through
//! reified [`EditAction`]s.

use std::sync::Arc;

use log::info;

use crate::core::error::Error;
use crate::core::types::{IVec3, Result, Vec3};
use crate::history::History;
use crate::math::Aabb;
use crate::mesh::FaceBufferFactory;

use super::action::EditAction;
use super::data::ModelData;
use super::palette::{Palette, Rgba};
use super::part::{Part, PartId};

/// Model metadata, compared structurally for change detection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelMetadata {
    pub name: String,
    pub author: String,
    pub comments: String,
}

/// Everything the history acts on: metadata, palette, and the ordered parts
pub struct ModelState {
    pub(crate) metadata: ModelMetadata,
    pub(crate) palette: Palette,
    pub(crate) parts: Vec<Part>,
    next_part_id: u64,
    factory: Arc<dyn FaceBufferFactory>,
}

impl ModelState {
    fn new(factory: Arc<dyn FaceBufferFactory>) -> Self {
        Self {
            metadata: ModelMetadata::default(),
            palette: Palette::new(),
            parts: Vec::new(),
            next_part_id: 0,
            factory,
        }
    }

    fn alloc_id(&mut self) -> PartId {
        let id = PartId(self.next_part_id);
        self.next_part_id += 1;
        id
    }

    pub(crate) fn replace_metadata(&mut self, metadata: ModelMetadata) -> ModelMetadata {
        std::mem::replace(&mut self.metadata, metadata)
    }

    pub(crate) fn insert_part_at(&mut self, index: usize, part: Part) {
        self.parts.insert(index, part);
    }

    pub(crate) fn remove_part_at(&mut self, index: usize) -> Part {
        self.parts.remove(index)
    }

    pub(crate) fn part_mut_by_id(&mut self, id: PartId) -> &mut Part {
        self.parts
            .iter_mut()
            .find(|p| p.id() == id)
            .expect("history action references a part that is not in the model")
    }
}

/// The document root: metadata, one shared palette, ordered parts, and the
/// undo/redo history every mutation is recorded into
pub struct EditableModel {
    state: ModelState,
    history: History<EditAction>,
}

impl EditableModel {
    /// Create an empty model whose parts batch faces through `factory`
    pub fn new(factory: Arc<dyn FaceBufferFactory>) -> Self {
        Self {
            state: ModelState::new(factory),
            history: History::new(),
        }
    }

    /// Model metadata
    pub fn metadata(&self) -> &ModelMetadata {
        &self.state.metadata
    }

    /// Replace metadata. Structurally equal metadata records nothing.
    pub fn set_metadata(&mut self, metadata: ModelMetadata) {
        if self.state.metadata != metadata {
            let old = std::mem::replace(&mut self.state.metadata, metadata);
            self.history
                .record("Edit model metadata.", EditAction::Metadata { metadata: old });
        }
    }

    /// The shared palette
    pub fn palette(&self) -> &Palette {
        &self.state.palette
    }

    /// Replace one palette color
    pub fn set_palette_color(&mut self, index: usize, color: Rgba) -> Result<()> {
        self.state.palette.set_color(index, color, &mut self.history)
    }

    /// Resize the palette
    pub fn resize_palette(&mut self, new_len: usize) {
        self.state.palette.resize(new_len, &mut self.history);
    }

    /// Overwrite palette tags over `start..end`
    pub fn set_palette_tag_range(
        &mut self,
        start: usize,
        end: usize,
        tag: impl Into<String>,
    ) -> Result<()> {
        self.state
            .palette
            .set_tag_range(start, end, tag, &mut self.history)
    }

    /// Number of parts
    pub fn part_count(&self) -> usize {
        self.state.parts.len()
    }

    /// Part by position
    pub fn part(&self, index: usize) -> Option<&Part> {
        self.state.parts.get(index)
    }

    /// Mutable part by position, for buffered voxel edits and queries
    pub fn part_mut(&mut self, index: usize) -> Option<&mut Part> {
        self.state.parts.get_mut(index)
    }

    /// Position of a part id, if it is in the model
    pub fn part_index(&self, id: PartId) -> Option<usize> {
        self.state.parts.iter().position(|p| p.id() == id)
    }

    /// Insert a new empty part at `index`
    pub fn insert_part(&mut self, index: usize) -> Result<()> {
        if index > self.state.parts.len() {
            return Err(Error::PartIndex {
                index,
                len: self.state.parts.len(),
            });
        }
        let id = self.state.alloc_id();
        let part = Part::new(id, self.state.factory.clone());
        self.history
            .record("Insert part.", EditAction::RemovePart { index });
        self.state.parts.insert(index, part);
        Ok(())
    }

    /// Remove the part at `index`.
    ///
    /// Parent links of other parts pointing at it are cleared first, each
    /// through the recording setter, so undoing the removal restores the
    /// links over the following undo steps.
    pub fn remove_part(&mut self, index: usize) -> Result<()> {
        if index >= self.state.parts.len() {
            return Err(Error::PartIndex {
                index,
                len: self.state.parts.len(),
            });
        }
        let removed = self.state.parts[index].id();
        for part in &mut self.state.parts {
            if part.parent() == Some(removed) {
                part.set_parent(None, &mut self.history);
            }
        }
        let part = self.state.parts.remove(index);
        self.history.record(
            "Remove part.",
            EditAction::InsertPart {
                index,
                part: Box::new(part),
            },
        );
        Ok(())
    }

    /// Attach the part at `index` to the part with id `parent`
    pub fn set_part_parent(&mut self, index: usize, parent: Option<PartId>) -> Result<()> {
        self.check_part_index(index)?;
        if let Some(id) = parent {
            if !self.state.parts.iter().any(|p| p.id() == id) {
                return Err(Error::UnknownPart(id));
            }
        }
        self.state.parts[index].set_parent(parent, &mut self.history);
        Ok(())
    }

    /// Rename the bone the part at `index` follows
    pub fn set_part_bone_name(&mut self, index: usize, name: impl Into<String>) -> Result<()> {
        self.check_part_index(index)?;
        self.state.parts[index].set_bone_name(name, &mut self.history);
        Ok(())
    }

    /// Move the pivot of the part at `index`
    pub fn set_part_base_point(&mut self, index: usize, point: Vec3) -> Result<()> {
        self.check_part_index(index)?;
        self.state.parts[index].set_base_point(point, &mut self.history);
        Ok(())
    }

    /// Move the part at `index`
    pub fn set_part_translation(&mut self, index: usize, translation: Vec3) -> Result<()> {
        self.check_part_index(index)?;
        self.state.parts[index].set_translation(translation, &mut self.history);
        Ok(())
    }

    /// Write one voxel into the part at `index` and update its mesh
    /// immediately
    pub fn add_voxel(&mut self, index: usize, cell: IVec3, color: usize) -> Result<()> {
        self.check_part_index(index)?;
        let ModelState { palette, parts, .. } = &mut self.state;
        parts[index].add_voxel(cell, color, palette);
        Ok(())
    }

    /// Commit the buffered voxel edits of the part at `index` as one
    /// undoable action
    pub fn flush_part_edits(&mut self, index: usize) -> Result<()> {
        self.check_part_index(index)?;
        self.state.parts[index].flush_pending_edits(&mut self.history);
        Ok(())
    }

    fn check_part_index(&self, index: usize) -> Result<()> {
        if index >= self.state.parts.len() {
            return Err(Error::PartIndex {
                index,
                len: self.state.parts.len(),
            });
        }
        Ok(())
    }

    /// Revert the most recent edit. No-op on empty history.
    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.state)
    }

    /// Re-apply the most recently undone edit. No-op on empty history.
    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.state)
    }

    /// The undo/redo history
    pub fn history(&self) -> &History<EditAction> {
        &self.history
    }

    /// Union of all parts' cell bounds.
    ///
    /// Parts that never held a voxel have no bounds and are skipped; with no
    /// parts, or none holding voxels, the bound degenerates to the origin.
    pub fn calculate_bound(&self) -> Aabb {
        let mut bound: Option<Aabb> = None;
        for part in &self.state.parts {
            if let Some(cells) = part.bounds() {
                let aabb = cells.to_aabb();
                bound = Some(match bound {
                    Some(b) => b.merged(&aabb),
                    None => aabb,
                });
            }
        }
        bound.unwrap_or(Aabb::point(Vec3::ZERO))
    }

    /// Rebuild every part's mesh and bounds from current occupancy.
    ///
    /// Needed after undo/redo of voxel edits and after bulk loads, where
    /// incremental face tracking was bypassed.
    pub fn update_all(&mut self) {
        let ModelState { palette, parts, .. } = &mut self.state;
        for part in parts {
            part.update_all(palette);
        }
    }

    /// Draw every part through the external buffers
    pub fn draw_all(&mut self) {
        for part in &mut self.state.parts {
            part.draw();
        }
    }

    /// Replace the whole document from load data.
    ///
    /// Parents resolve by position to earlier-declared parts. Loads are not
    /// user edits: both history stacks are cleared.
    pub fn load_from_data(&mut self, data: &ModelData) -> Result<()> {
        // Validate parent references before touching any state
        for (i, part) in data.parts.iter().enumerate() {
            if let Some(parent) = part.parent {
                if parent >= i {
                    return Err(Error::UnknownParent { part: i, parent });
                }
            }
        }

        self.state.metadata = ModelMetadata {
            name: data.name.clone(),
            author: data.author.clone(),
            comments: data.comments.clone(),
        };
        self.state.palette.load_groups(&data.palette);

        self.state.parts.clear();
        let mut ids = Vec::with_capacity(data.parts.len());
        for _ in &data.parts {
            let id = self.state.alloc_id();
            let factory = self.state.factory.clone();
            ids.push(id);
            self.state.parts.push(Part::new(id, factory));
        }
        let ModelState { palette, parts, .. } = &mut self.state;
        for (i, part) in data.parts.iter().enumerate() {
            let parent = part.parent.map(|p| ids[p]);
            parts[i].load_from_data(part, parent, palette);
        }

        self.history.clear();
        info!(
            "loaded model '{}': {} parts, {} colors",
            self.state.metadata.name,
            self.state.parts.len(),
            self.state.palette.len()
        );
        Ok(())
    }
}
