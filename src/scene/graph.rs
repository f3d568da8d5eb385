use std::collections::BTreeMap;
use std::sync::Arc;

use crate::foundation::core::{Mat4, Rgba};
use crate::foundation::error::{AfterimageError, AfterimageResult};
use crate::scene::material::Material;
use crate::scene::mesh::Mesh;

/// Stable, application-visible object identity.
///
/// Ids are never reused within one [`SceneGraph`], so caches keyed by them cannot alias a removed
/// object with a newly added one.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ObjectId(pub u32);

/// One drawable as seen during traversal, with its world transform materialized.
#[derive(Clone, Copy, Debug)]
pub struct DrawItem<'a> {
    /// Stable identity.
    pub id: ObjectId,
    /// Object-to-world transform.
    pub world: Mat4,
    /// Geometry.
    pub mesh: &'a Mesh,
    /// Surface description.
    pub material: &'a Material,
}

/// The scene contract the pipeline consumes.
pub trait Scene {
    /// Visit every visible drawable once, in a stable order.
    fn visit(&self, f: &mut dyn FnMut(DrawItem<'_>));

    /// Materialize the world transform of one object.
    fn world_transform(&self, id: ObjectId) -> Option<Mat4>;

    /// Return `true` while `id` is a member of the scene.
    fn contains(&self, id: ObjectId) -> bool;

    /// Counter bumped whenever objects are added or removed.
    fn membership_generation(&self) -> u64;

    /// Clear color behind all drawables.
    fn background(&self) -> Rgba {
        Rgba::new(0.0, 0.0, 0.0, 1.0)
    }
}

/// A node of the reference [`SceneGraph`].
#[derive(Clone, Debug)]
pub struct Node {
    /// Transform relative to the parent (or to world space for roots).
    pub local: Mat4,
    /// Optional parent.
    pub parent: Option<ObjectId>,
    /// Geometry; group nodes carry none.
    pub mesh: Option<Arc<Mesh>>,
    /// Surface description.
    pub material: Material,
    /// Hidden nodes (and their descendants) are skipped during traversal.
    pub visible: bool,
}

impl Node {
    /// A visible root drawable.
    pub fn drawable(mesh: Arc<Mesh>, material: Material, local: Mat4) -> Self {
        Self {
            local,
            parent: None,
            mesh: Some(mesh),
            material,
            visible: true,
        }
    }

    /// A visible root group with no geometry.
    pub fn group(local: Mat4) -> Self {
        Self {
            local,
            parent: None,
            mesh: None,
            material: Material::default(),
            visible: true,
        }
    }

    /// Attach the node under `parent`.
    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Minimal parented scene graph.
#[derive(Clone, Debug)]
pub struct SceneGraph {
    nodes: BTreeMap<ObjectId, Node>,
    next_id: u32,
    generation: u64,
    background: Rgba,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(Rgba::new(0.0, 0.0, 0.0, 1.0))
    }
}

impl SceneGraph {
    /// Create an empty scene with a clear color.
    pub fn new(background: Rgba) -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_id: 0,
            generation: 0,
            background,
        }
    }

    /// Insert a node; its parent (if any) must already exist.
    pub fn add(&mut self, node: Node) -> AfterimageResult<ObjectId> {
        if let Some(parent) = node.parent
            && !self.nodes.contains_key(&parent)
        {
            return Err(AfterimageError::config(format!(
                "parent {parent:?} is not in the scene"
            )));
        }
        if let Some(mesh) = &node.mesh {
            mesh.validate()?;
        }
        let id = ObjectId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| AfterimageError::resource("object id space exhausted"))?;
        self.nodes.insert(id, node);
        self.generation += 1;
        Ok(id)
    }

    /// Remove a node and all of its descendants. Returns the number of removed nodes.
    pub fn remove(&mut self, id: ObjectId) -> usize {
        if !self.nodes.contains_key(&id) {
            return 0;
        }
        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            let current = doomed[i];
            doomed.extend(
                self.nodes
                    .iter()
                    .filter(|(_, n)| n.parent == Some(current))
                    .map(|(&child, _)| child),
            );
            i += 1;
        }
        for d in &doomed {
            self.nodes.remove(d);
        }
        self.generation += 1;
        doomed.len()
    }

    /// Replace the local transform of a node.
    pub fn set_local(&mut self, id: ObjectId, local: Mat4) -> AfterimageResult<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| AfterimageError::config(format!("{id:?} is not in the scene")))?;
        node.local = local;
        Ok(())
    }

    /// Borrow a node.
    pub fn node(&self, id: ObjectId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutably borrow a node.
    ///
    /// Re-parenting through this reference is not checked for cycles; cycles are cut off during
    /// transform materialization.
    pub fn node_mut(&mut self, id: ObjectId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Number of nodes, including groups.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return `true` when the scene has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Change the clear color.
    pub fn set_background(&mut self, background: Rgba) {
        self.background = background;
    }

    fn effective_visibility(&self, id: ObjectId) -> bool {
        let mut cur = Some(id);
        let mut depth = 0usize;
        while let Some(c) = cur {
            let Some(node) = self.nodes.get(&c) else {
                return false;
            };
            if !node.visible {
                return false;
            }
            depth += 1;
            if depth > self.nodes.len() {
                return false;
            }
            cur = node.parent;
        }
        true
    }
}

impl Scene for SceneGraph {
    fn visit(&self, f: &mut dyn FnMut(DrawItem<'_>)) {
        for (&id, node) in &self.nodes {
            let Some(mesh) = node.mesh.as_deref() else {
                continue;
            };
            if !self.effective_visibility(id) {
                continue;
            }
            let Some(world) = self.world_transform(id) else {
                continue;
            };
            f(DrawItem {
                id,
                world,
                mesh,
                material: &node.material,
            });
        }
    }

    fn world_transform(&self, id: ObjectId) -> Option<Mat4> {
        let mut node = self.nodes.get(&id)?;
        let mut world = node.local;
        let mut depth = 0usize;
        while let Some(parent) = node.parent {
            depth += 1;
            if depth > self.nodes.len() {
                tracing::warn!(?id, "parent cycle while materializing world transform");
                return None;
            }
            node = self.nodes.get(&parent)?;
            world = node.local * world;
        }
        Some(world)
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn membership_generation(&self) -> u64 {
        self.generation
    }

    fn background(&self) -> Rgba {
        self.background
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/graph.rs"]
mod tests;
