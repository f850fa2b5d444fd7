use crate::{
    celestial::celestial_coordinates,
    database::PoseMeshDatabase,
    pose_mesh::{PoseMesh, TargetTriangle},
    utility::PoseMeshUtility,
};
use blend_tree_core::collaborators::ModelDriver;
use bevy::{
    log::warn,
    math::{Vec2, Vec3},
};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct PoseControl {
    mesh: Arc<PoseMesh>,
    priority: i32,
    target: Option<TargetTriangle>,
}

impl PoseControl {
    pub fn mesh(&self) -> &Arc<PoseMesh> {
        &self.mesh
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Triangle selected by the last update.
    pub fn target(&self) -> Option<&TargetTriangle> {
        self.target.as_ref()
    }
}

/// Aims a chain of pose meshes at a look direction.
///
/// Controls are evaluated by ascending priority. Each priority level takes as much of the
/// remaining azimuth and elevation as its meshes can reach and passes the rest on to the next
/// level, so a head mesh can turn as far as it can and leave the remainder to a torso mesh.
/// Controls sharing a priority all aim at the same remaining direction.
#[derive(Clone, Debug)]
pub struct PoseController {
    controls: Vec<PoseControl>,
    blend_time: f32,
}

impl Default for PoseController {
    fn default() -> Self {
        Self {
            controls: Vec::new(),
            blend_time: Self::DEFAULT_BLEND_TIME,
        }
    }
}

impl PoseController {
    pub const DEFAULT_BLEND_TIME: f32 = 0.3;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn blend_time(&self) -> f32 {
        self.blend_time
    }

    pub fn set_blend_time(&mut self, blend_time: f32) {
        self.blend_time = blend_time.max(0.);
    }

    pub fn add_pose_control(&mut self, mesh: Arc<PoseMesh>, priority: i32) {
        let index = self
            .controls
            .iter()
            .position(|control| control.priority > priority)
            .unwrap_or(self.controls.len());
        self.controls.insert(
            index,
            PoseControl {
                mesh,
                priority,
                target: None,
            },
        );
    }

    /// Adds a control for the mesh named `name`. Returns false if the database has no such
    /// mesh.
    pub fn add_pose_control_by_name(
        &mut self,
        database: &PoseMeshDatabase,
        name: &str,
        priority: i32,
    ) -> bool {
        match database.get(name) {
            Some(mesh) => {
                self.add_pose_control(mesh.clone(), priority);
                true
            }
            None => {
                warn!("Cannot find pose mesh {name:?}");
                false
            }
        }
    }

    pub fn pose_control(&self, name: &str) -> Option<&PoseControl> {
        self.controls
            .iter()
            .find(|control| control.mesh.name() == name)
    }

    pub fn pose_controls(&self) -> &[PoseControl] {
        &self.controls
    }

    pub fn pose_control_count(&self) -> usize {
        self.controls.len()
    }

    pub fn remove_pose_control(&mut self, name: &str) -> bool {
        let count = self.controls.len();
        self.controls.retain(|control| control.mesh.name() != name);
        self.controls.len() < count
    }

    /// Removes every control, returning how many there were.
    pub fn clear_pose_controls(&mut self) -> usize {
        let count = self.controls.len();
        self.controls.clear();
        count
    }

    /// Aims every control at `look_direction`, measured from the character's `forward`.
    pub fn update(&mut self, look_direction: Vec3, forward: Vec3, model: &mut dyn ModelDriver) {
        let (azimuth, elevation) = celestial_coordinates(look_direction, forward);
        let mut remaining = Vec2::new(azimuth, elevation);
        let mut level_target = remaining;
        let mut last_priority = None;

        for control in &mut self.controls {
            let target = if last_priority == Some(control.priority) {
                control
                    .mesh
                    .target_triangle(level_target.x, level_target.y)
            } else {
                level_target = remaining;
                let target = control.mesh.target_triangle(remaining.x, remaining.y);
                remaining -= target.position();
                last_priority = Some(control.priority);
                target
            };

            PoseMeshUtility::blend_poses(&control.mesh, model, &target, self.blend_time);
            control.target = Some(target);
        }
    }

    pub fn clear_all_poses(&mut self, model: &mut dyn ModelDriver) {
        for control in &mut self.controls {
            PoseMeshUtility::clear_poses(&control.mesh, model, self.blend_time);
            control.target = None;
        }
    }
}
