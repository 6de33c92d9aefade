//! Face primitives and the externally backed buffers they are batched into.
//!
//! The document engine decides which faces exist; the rendering backend owns
//! the actual vertex buffers. The backend injects a [`FaceBufferFactory`]
//! and [`FaceBuffers`] batches emitted faces into fixed-capacity pages,
//! uploading dirty pages when they are drawn.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::core::types::{Vec3, Vec4};

/// Faces per fixed-capacity buffer page
pub const PAGE_FACES: usize = 1024;

/// Face direction codes
pub mod dir {
    pub const POS_X: u32 = 0;
    pub const NEG_X: u32 = 1;
    pub const POS_Y: u32 = 2;
    pub const NEG_Y: u32 = 3;
    pub const POS_Z: u32 = 4;
    pub const NEG_Z: u32 = 5;
}

/// A single face quad - exactly 32 bytes of vertex data
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Face {
    /// Face center, offset half a cell from the cell center along `dir`
    pub position: Vec3,
    /// Direction code (see [`dir`])
    pub dir: u32,
    /// RGBA color, alpha always 1
    pub color: Vec4,
}

impl Face {
    /// Create a face quad
    pub fn new(position: Vec3, dir: u32, color: Vec4) -> Self {
        Self {
            position,
            dir,
            color,
        }
    }
}

/// Externally owned vertex buffer holding face data
pub trait FaceBuffer {
    /// Replace the buffer contents with `faces`
    fn upload(&mut self, faces: &[Face]);

    /// Draw the first `len` faces
    fn draw(&mut self, len: usize);
}

/// Backend hook creating face buffers on demand
pub trait FaceBufferFactory {
    /// Create a dynamic buffer with room for `capacity` faces
    fn create_dynamic(&self, capacity: usize) -> Box<dyn FaceBuffer>;
}

struct Page {
    buffer: Box<dyn FaceBuffer>,
    faces: Vec<Face>,
    dirty: bool,
}

/// Batches faces into fixed-capacity pages backed by factory-created buffers
pub struct FaceBuffers {
    factory: Arc<dyn FaceBufferFactory>,
    pages: Vec<Page>,
    empty_slots: usize,
}

impl FaceBuffers {
    /// Create an empty batcher allocating buffers through `factory`
    pub fn new(factory: Arc<dyn FaceBufferFactory>) -> Self {
        Self {
            factory,
            pages: Vec::new(),
            empty_slots: 0,
        }
    }

    fn new_page(&mut self) {
        let buffer = self.factory.create_dynamic(PAGE_FACES);
        self.pages.push(Page {
            buffer,
            faces: Vec::with_capacity(PAGE_FACES),
            dirty: false,
        });
        self.empty_slots += PAGE_FACES;
    }

    /// Append a face to the first page with room, allocating a page when all
    /// are full
    pub fn push(&mut self, face: Face) {
        if self.empty_slots == 0 {
            self.new_page();
        }
        for page in &mut self.pages {
            if page.faces.len() < PAGE_FACES {
                page.faces.push(face);
                page.dirty = true;
                self.empty_slots -= 1;
                return;
            }
        }
        unreachable!("a page with a free slot exists whenever empty_slots > 0");
    }

    /// Drop all faces, keeping allocated pages for reuse
    pub fn clear(&mut self) {
        for page in &mut self.pages {
            page.faces.clear();
            page.dirty = true;
        }
        self.empty_slots = self.pages.len() * PAGE_FACES;
    }

    /// Number of live faces
    pub fn face_count(&self) -> usize {
        self.pages.iter().map(|p| p.faces.len()).sum()
    }

    /// Iterate over all live faces in emission order
    pub fn faces(&self) -> impl Iterator<Item = &Face> {
        self.pages.iter().flat_map(|p| p.faces.iter())
    }

    /// Number of allocated pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Upload dirty pages, then draw every page's live range
    pub fn draw_all(&mut self) {
        for page in &mut self.pages {
            if page.dirty {
                page.buffer.upload(&page.faces);
                page.dirty = false;
            }
            page.buffer.draw(page.faces.len());
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    struct NullBuffer;

    impl FaceBuffer for NullBuffer {
        fn upload(&mut self, _faces: &[Face]) {}
        fn draw(&mut self, _len: usize) {}
    }

    struct NullFactory;

    impl FaceBufferFactory for NullFactory {
        fn create_dynamic(&self, _capacity: usize) -> Box<dyn FaceBuffer> {
            Box::new(NullBuffer)
        }
    }

    /// Factory whose buffers discard everything, for tests that only care
    /// about CPU-side face data
    pub(crate) fn null_factory() -> Arc<dyn FaceBufferFactory> {
        Arc::new(NullFactory)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Counts {
        created: usize,
        uploads: Vec<usize>,
        draws: Vec<usize>,
    }

    struct RecordingBuffer {
        counts: Arc<Mutex<Counts>>,
    }

    impl FaceBuffer for RecordingBuffer {
        fn upload(&mut self, faces: &[Face]) {
            self.counts.lock().unwrap().uploads.push(faces.len());
        }

        fn draw(&mut self, len: usize) {
            self.counts.lock().unwrap().draws.push(len);
        }
    }

    struct RecordingFactory {
        counts: Arc<Mutex<Counts>>,
    }

    impl FaceBufferFactory for RecordingFactory {
        fn create_dynamic(&self, _capacity: usize) -> Box<dyn FaceBuffer> {
            let counts = self.counts.clone();
            counts.lock().unwrap().created += 1;
            Box::new(RecordingBuffer { counts })
        }
    }

    fn recording() -> (Arc<Mutex<Counts>>, FaceBuffers) {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let factory = Arc::new(RecordingFactory {
            counts: counts.clone(),
        });
        (counts, FaceBuffers::new(factory))
    }

    fn face(i: usize) -> Face {
        Face::new(Vec3::splat(i as f32), dir::POS_X, Vec4::ONE)
    }

    #[test]
    fn test_size() {
        assert_eq!(std::mem::size_of::<Face>(), 32);
    }

    #[test]
    fn test_pages_allocated_on_demand() {
        let (counts, mut buffers) = recording();
        assert_eq!(buffers.page_count(), 0);

        for i in 0..PAGE_FACES {
            buffers.push(face(i));
        }
        assert_eq!(buffers.page_count(), 1);
        assert_eq!(buffers.face_count(), PAGE_FACES);

        buffers.push(face(PAGE_FACES));
        assert_eq!(buffers.page_count(), 2);
        assert_eq!(buffers.face_count(), PAGE_FACES + 1);
        assert_eq!(counts.lock().unwrap().created, 2);
    }

    #[test]
    fn test_clear_keeps_pages() {
        let (counts, mut buffers) = recording();
        for i in 0..PAGE_FACES + 1 {
            buffers.push(face(i));
        }

        buffers.clear();
        assert_eq!(buffers.face_count(), 0);
        assert_eq!(buffers.page_count(), 2);

        // Refilling reuses the existing pages
        for i in 0..PAGE_FACES {
            buffers.push(face(i));
        }
        assert_eq!(counts.lock().unwrap().created, 2);
    }

    #[test]
    fn test_faces_iterates_in_emission_order() {
        let (_counts, mut buffers) = recording();
        for i in 0..3 {
            buffers.push(face(i));
        }
        let positions: Vec<Vec3> = buffers.faces().map(|f| f.position).collect();
        assert_eq!(
            positions,
            vec![Vec3::splat(0.0), Vec3::splat(1.0), Vec3::splat(2.0)]
        );
    }

    #[test]
    fn test_draw_all_uploads_dirty_pages_once() {
        let (counts, mut buffers) = recording();
        buffers.push(face(0));
        buffers.push(face(1));

        buffers.draw_all();
        {
            let c = counts.lock().unwrap();
            assert_eq!(c.uploads, vec![2]);
            assert_eq!(c.draws, vec![2]);
        }

        // Unchanged pages draw without re-uploading
        buffers.draw_all();
        let c = counts.lock().unwrap();
        assert_eq!(c.uploads, vec![2]);
        assert_eq!(c.draws, vec![2, 2]);
    }
}
