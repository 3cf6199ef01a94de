use crate::camera::CameraConfig;
use crate::entity::Motion;
use crate::geometry::MeshKind;
use framestep_common::DirectionalLight;
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors from reading or validating a [`SceneConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("entity {index} references unknown material {name:?}")]
    UnknownMaterial { index: usize, name: String },
    #[error("duplicate material name {0:?}")]
    DuplicateMaterial(String),
}

/// A named material and the texture file it samples, relative to
/// `<asset_root>/Textures`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialConfig {
    pub name: String,
    pub texture: PathBuf,
}

/// One entity placed at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    pub mesh: MeshKind,
    pub material: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
    #[serde(default)]
    pub motion: Motion,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

/// Everything needed to build and run the scene.
///
/// Missing fields fall back to the built-in sample scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Directory holding `Textures/` and `Models/`.
    pub asset_root: PathBuf,
    pub clear_color: [f32; 4],
    pub camera: CameraConfig,
    pub light: DirectionalLight,
    pub light2: DirectionalLight,
    pub materials: Vec<MaterialConfig>,
    pub entities: Vec<EntityConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        let material = |name: &str, file: &str| MaterialConfig {
            name: name.into(),
            texture: PathBuf::from(file),
        };
        Self {
            title: "framestep".into(),
            width: 1280,
            height: 720,
            asset_root: PathBuf::from("assets"),
            clear_color: [0.4, 0.6, 0.75, 0.0],
            camera: CameraConfig::default(),
            light: DirectionalLight {
                ambient: Vec4::new(0.1, 0.1, 0.1, 1.0),
                diffuse: Vec4::new(0.0, 1.0, 0.0, 1.0),
                direction: Vec3::new(1.0, -1.0, 0.0),
            },
            light2: DirectionalLight {
                ambient: Vec4::new(0.1, 0.1, 0.1, 1.0),
                diffuse: Vec4::new(0.75, 0.5, 0.0, 1.0),
                direction: Vec3::new(0.0, 1.0, 1.0),
            },
            materials: vec![
                material("ice", "ice.jpg"),
                material("cobble", "cobble.jpg"),
                material("tiles", "tiles_med.tif"),
            ],
            entities: vec![
                EntityConfig {
                    mesh: MeshKind::Cone,
                    material: "ice".into(),
                    position: Vec3::new(3.0, 0.0, 0.0),
                    rotation: Vec3::ZERO,
                    scale: Vec3::ONE,
                    motion: Motion::Bob { axis: Vec3::Y },
                },
                EntityConfig {
                    mesh: MeshKind::Helix,
                    material: "tiles".into(),
                    position: Vec3::ZERO,
                    rotation: Vec3::ZERO,
                    scale: Vec3::ONE,
                    motion: Motion::Spin {
                        rate: Vec3::new(0.0, 1.0, 0.0),
                    },
                },
                EntityConfig {
                    mesh: MeshKind::Sphere,
                    material: "cobble".into(),
                    position: Vec3::new(-3.0, 0.0, 0.0),
                    rotation: Vec3::ZERO,
                    scale: Vec3::ONE,
                    motion: Motion::Spin {
                        rate: Vec3::new(-0.25, 0.0, 0.0),
                    },
                },
            ],
        }
    }
}

impl SceneConfig {
    /// Read a JSON config and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that material names are unique and every entity's material
    /// exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, m) in self.materials.iter().enumerate() {
            if self.materials[..i].iter().any(|other| other.name == m.name) {
                return Err(ConfigError::DuplicateMaterial(m.name.clone()));
            }
        }
        for (index, entity) in self.entities.iter().enumerate() {
            if self.material_index(&entity.material).is_none() {
                return Err(ConfigError::UnknownMaterial {
                    index,
                    name: entity.material.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn material_index(&self, name: &str) -> Option<usize> {
        self.materials.iter().position(|m| m.name == name)
    }

    pub fn texture_path(&self, material: &MaterialConfig) -> PathBuf {
        self.asset_root.join("Textures").join(&material.texture)
    }

    pub fn model_path(&self, file: &str) -> PathBuf {
        self.asset_root.join("Models").join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_sample_scene() {
        let config = SceneConfig::default();
        config.validate().unwrap();
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.entities.len(), 3);
        assert_eq!(config.entities[0].mesh, MeshKind::Cone);
        assert_eq!(config.entities[2].position, Vec3::new(-3.0, 0.0, 0.0));
        assert_eq!(config.light.diffuse, Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(config.light2.direction, Vec3::new(0.0, 1.0, 1.0));
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut config = SceneConfig::default();
        config.title = "saved".into();
        config.entities.truncate(1);
        config.save(tmp.path()).unwrap();

        let loaded = SceneConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SceneConfig =
            serde_json::from_str(r#"{ "width": 640, "camera": { "speed": 2.0 } }"#).unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 720);
        assert_eq!(config.camera.speed, 2.0);
        assert_eq!(config.camera.sensitivity, 0.001);
        assert_eq!(config.entities.len(), 3);
    }

    #[test]
    fn entity_fields_default() {
        let entity: EntityConfig =
            serde_json::from_str(r#"{ "mesh": "square", "material": "ice" }"#).unwrap();
        assert_eq!(entity.scale, Vec3::ONE);
        assert_eq!(entity.position, Vec3::ZERO);
        assert_eq!(entity.motion, Motion::Still);
    }

    #[test]
    fn motion_is_tagged_snake_case() {
        let json = serde_json::to_string(&Motion::Bob { axis: Vec3::Y }).unwrap();
        assert!(json.contains("bob"), "{json}");
    }

    #[test]
    fn unknown_material_is_rejected() {
        let mut config = SceneConfig::default();
        config.entities[1].material = "lava".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownMaterial { index: 1, .. })
        ));
    }

    #[test]
    fn duplicate_material_is_rejected() {
        let mut config = SceneConfig::default();
        let dup = config.materials[0].clone();
        config.materials.push(dup);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateMaterial(name)) if name == "ice"
        ));
    }

    #[test]
    fn unknown_mesh_fails_to_parse() {
        let err = serde_json::from_str::<EntityConfig>(r#"{ "mesh": "teapot", "material": "ice" }"#);
        assert!(err.is_err());
    }

    #[test]
    fn asset_paths_join_subdirectories() {
        let config = SceneConfig {
            asset_root: PathBuf::from("/data"),
            ..SceneConfig::default()
        };
        assert_eq!(
            config.texture_path(&config.materials[0]),
            PathBuf::from("/data/Textures/ice.jpg")
        );
        assert_eq!(
            config.model_path("cone.obj"),
            PathBuf::from("/data/Models/cone.obj")
        );
    }
}
