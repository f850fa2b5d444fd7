use crate::errors::{ConfigError, ConfigResult};
use blend_tree_core::{
    collaborators::PoseSampler,
    controller::{WalkRunController, walk_run::WalkRunConfig},
};
use blend_tree_pose_mesh::{database::PoseMeshDatabase, pose_mesh::PoseMeshData};
use serde::{Deserialize, Serialize};

/// Blending setup of one character model, usually stored as a `*.blend.ron` file next to the
/// model.
///
/// ```ron
/// (
///     walk_run: (
///         walk_speed: 1.3,
///         run_speed: 2.5,
///     ),
///     pose_meshes: [
///         (
///             name: "head",
///             effector_bone: "Bip01 Head",
///             root_bone: "Bip01",
///             animations: ["look_center", "look_left", "look_up"],
///             triangles: [(0, 1, 2)],
///         ),
///     ],
/// )
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub walk_run: WalkRunConfig,
    pub pose_meshes: Vec<PoseMeshData>,
}

impl BlendConfig {
    /// Parses and validates a configuration.
    pub fn from_ron_str(source: &str) -> ConfigResult<Self> {
        let config: Self = ron::de::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let WalkRunConfig {
            walk_speed,
            run_speed,
            ..
        } = self.walk_run;
        let finite = walk_speed.is_finite() && run_speed.is_finite();
        if !finite || walk_speed < 0. || run_speed <= 0. || walk_speed > run_speed {
            return Err(ConfigError::InvalidSpeeds {
                walk_speed,
                run_speed,
            });
        }

        for (i, mesh) in self.pose_meshes.iter().enumerate() {
            if self.pose_meshes[..i]
                .iter()
                .any(|other| other.name == mesh.name)
            {
                return Err(ConfigError::DuplicatePoseMesh(mesh.name.clone()));
            }
        }

        Ok(())
    }

    pub fn walk_run_controller(&self) -> WalkRunController {
        WalkRunController::from_config(&self.walk_run)
    }

    /// Samples every configured pose mesh on `sampler`.
    pub fn build_pose_meshes(
        &self,
        sampler: &mut dyn PoseSampler,
    ) -> ConfigResult<PoseMeshDatabase> {
        self.validate()?;
        Ok(PoseMeshDatabase::from_data(&self.pose_meshes, sampler)?)
    }
}
