use crate::{
    errors::PoseMeshResult,
    pose_mesh::{PoseMesh, PoseMeshData},
};
use blend_tree_core::collaborators::PoseSampler;
use indexmap::IndexMap;
use std::sync::Arc;

/// Pose meshes of one character model, by name.
#[derive(Clone, Debug, Default)]
pub struct PoseMeshDatabase {
    meshes: IndexMap<String, Arc<PoseMesh>>,
}

impl PoseMeshDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every mesh of `data` against one skeleton. Later meshes replace earlier ones with
    /// the same name.
    pub fn from_data(data: &[PoseMeshData], sampler: &mut dyn PoseSampler) -> PoseMeshResult<Self> {
        let mut database = Self::new();
        for mesh in data {
            database.insert(PoseMesh::new(mesh, sampler)?);
        }
        Ok(database)
    }

    /// Adds a mesh, returning the mesh it replaced.
    pub fn insert(&mut self, mesh: PoseMesh) -> Option<Arc<PoseMesh>> {
        self.meshes.insert(mesh.name().to_string(), Arc::new(mesh))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<PoseMesh>> {
        self.meshes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.meshes.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<PoseMesh>> {
        self.meshes.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<PoseMesh>)> {
        self.meshes.iter().map(|(name, mesh)| (name.as_str(), mesh))
    }
}
