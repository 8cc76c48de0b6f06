//! Scene container and the point sets it holds

use crate::error::Result;
use crate::point::Color;
use crate::surface::{GeometryHandle, MaterialHandle, RenderSurface};
use crate::transform::Transform3D;

/// Identifies an object attached to a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u64);

/// One or several materials bound to a point set
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialSlot {
    Single(MaterialHandle),
    Multiple(Vec<MaterialHandle>),
}

impl MaterialSlot {
    pub fn handles(&self) -> &[MaterialHandle] {
        match self {
            MaterialSlot::Single(handle) => std::slice::from_ref(handle),
            MaterialSlot::Multiple(handles) => handles,
        }
    }
}

/// A renderable point cloud whose buffers live on the device
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    pub geometry: GeometryHandle,
    pub materials: MaterialSlot,
    /// Model transform applied when drawing
    pub transform: Transform3D,
    pub point_count: usize,
    /// Where the point data was loaded from
    pub source: String,
}

impl PointSet {
    /// Release the geometry and every material on `surface`.
    ///
    /// All releases are attempted; the first failure is returned.
    pub fn dispose<S: RenderSurface + ?Sized>(self, surface: &mut S) -> Result<()> {
        let mut first_error = surface.release_geometry(self.geometry).err();
        for &material in self.materials.handles() {
            if let Err(e) = surface.release_material(material) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Mutable container of renderable objects
#[derive(Debug, Clone)]
pub struct Scene {
    pub background: Color,
    objects: Vec<(ObjectId, PointSet)>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            background: Color::BLACK,
            objects: Vec::new(),
            next_id: 0,
        }
    }

    /// Attach a point set and return its id
    pub fn add(&mut self, point_set: PointSet) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push((id, point_set));
        id
    }

    /// Detach an object, handing it back so its resources can be released
    pub fn remove(&mut self, id: ObjectId) -> Option<PointSet> {
        let index = self.objects.iter().position(|(oid, _)| *oid == id)?;
        Some(self.objects.remove(index).1)
    }

    pub fn get(&self, id: ObjectId) -> Option<&PointSet> {
        self.objects
            .iter()
            .find(|(oid, _)| *oid == id)
            .map(|(_, set)| set)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &PointSet)> {
        self.objects.iter().map(|(id, set)| (*id, set))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
