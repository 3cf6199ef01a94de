use crate::camera::Camera;
use crate::config::{ConfigError, SceneConfig};
use crate::entity::Entity;
use crate::error::SceneError;
use crate::geometry::MeshKind;
use crate::material::{Material, checkerboard};
use crate::mesh::{Mesh, MeshData};
use framestep_common::{MaterialHandle, MeshHandle, SamplerHandle, ShaderHandle};
use framestep_input::{Action, InputSnapshot};
use framestep_render::shader::names;
use framestep_render::{GraphicsDevice, RenderBackend, ShaderStage};

const FALLBACK_TEXTURE_SIZE: u32 = 64;
const FALLBACK_TEXTURE_CELLS: u32 = 8;

/// Whether the host should keep running frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    Quit,
}

/// Counters accumulated since load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub frames: u64,
    pub draw_calls: u64,
    pub view_recomputes: u64,
    pub world_recomputes: u64,
    /// Assets replaced by generated stand-ins at load.
    pub fallbacks: u32,
}

/// Owns the camera, the mesh and material tables and the entities, and runs
/// the update-then-draw frame loop against a [`RenderBackend`].
#[derive(Debug)]
pub struct SceneDriver {
    config: SceneConfig,
    camera: Camera,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    entities: Vec<Entity>,
    vertex_shader: ShaderHandle,
    pixel_shader: ShaderHandle,
    sampler: SamplerHandle,
    total_time: f32,
    frames: u64,
    draw_calls: u64,
    fallbacks: u32,
}

impl SceneDriver {
    /// Create shaders, textures, meshes and entities described by `config`.
    ///
    /// Textures and models that fail to load are replaced by a checkerboard
    /// and the procedural shape respectively.
    pub fn load<B: RenderBackend + ?Sized>(
        config: SceneConfig,
        backend: &mut B,
    ) -> Result<Self, SceneError> {
        config.validate()?;

        let vertex_shader = backend.create_shader(ShaderStage::Vertex)?;
        let pixel_shader = backend.create_shader(ShaderStage::Pixel)?;

        let mut camera = Camera::new(config.camera);
        camera.update_projection(config.width, config.height);

        for (name, light) in [(names::LIGHT, config.light), (names::LIGHT2, config.light2)] {
            if !backend.set_light(pixel_shader, name, light) {
                tracing::warn!(name, "pixel shader rejected light");
            }
        }

        let sampler = backend.create_sampler()?;
        let mut fallbacks = 0;

        let mut materials = Vec::with_capacity(config.materials.len());
        for material in &config.materials {
            let path = config.texture_path(material);
            let texture = match backend.load_texture(&path) {
                Ok(texture) => texture,
                Err(err) => {
                    tracing::warn!(
                        material = %material.name,
                        path = %path.display(),
                        %err,
                        "texture unavailable, using checkerboard"
                    );
                    fallbacks += 1;
                    backend.create_texture_rgba(
                        FALLBACK_TEXTURE_SIZE,
                        FALLBACK_TEXTURE_SIZE,
                        &checkerboard(FALLBACK_TEXTURE_SIZE, FALLBACK_TEXTURE_CELLS),
                    )?
                }
            };
            materials.push(Material::new(
                material.name.clone(),
                vertex_shader,
                pixel_shader,
                texture,
                sampler,
            ));
        }

        let mut meshes = Vec::with_capacity(MeshKind::ALL.len());
        for kind in MeshKind::ALL {
            let data = match kind.obj_file() {
                Some(file) => {
                    let path = config.model_path(file);
                    match MeshData::from_obj(&path) {
                        Ok(data) => data,
                        Err(err) => {
                            tracing::warn!(
                                mesh = kind.name(),
                                path = %path.display(),
                                %err,
                                "model unavailable, using procedural shape"
                            );
                            fallbacks += 1;
                            kind.procedural()?
                        }
                    }
                }
                None => kind.procedural()?,
            };
            meshes.push(Mesh::upload(kind.name(), &data, backend)?);
        }

        let mut entities = Vec::with_capacity(config.entities.len());
        for (index, entry) in config.entities.iter().enumerate() {
            let material = config.material_index(&entry.material).ok_or_else(|| {
                ConfigError::UnknownMaterial {
                    index,
                    name: entry.material.clone(),
                }
            })?;
            let mut entity = Entity::new(
                MeshHandle(entry.mesh.index() as u32),
                MaterialHandle(material as u32),
            )
            .with_motion(entry.motion);
            entity.move_by(entry.position.x, entry.position.y, entry.position.z);
            entity.rotate_by(entry.rotation.x, entry.rotation.y, entry.rotation.z);
            entity.scale_by(entry.scale.x, entry.scale.y, entry.scale.z);
            entities.push(entity);
        }

        tracing::info!(
            meshes = meshes.len(),
            materials = materials.len(),
            entities = entities.len(),
            fallbacks,
            "scene loaded"
        );

        Ok(Self {
            config,
            camera,
            meshes,
            materials,
            entities,
            vertex_shader,
            pixel_shader,
            sampler,
            total_time: 0.0,
            frames: 0,
            draw_calls: 0,
            fallbacks,
        })
    }

    /// Apply one frame of input and scripted motion.
    ///
    /// Mouse motion only turns the camera while the look button is held.
    pub fn update(&mut self, input: &InputSnapshot, dt: f32) -> FrameControl {
        if input.is_held(Action::Quit) {
            tracing::info!("quit requested");
            return FrameControl::Quit;
        }

        if input.look_held() {
            let delta = input.mouse_delta();
            if delta.x != 0.0 || delta.y != 0.0 {
                // Dragging pulls the scene along with the cursor.
                self.camera.mouse_look(-delta.x, -delta.y);
            }
        }
        self.camera.update(input, dt);

        self.total_time += dt;
        for entity in &mut self.entities {
            entity.apply_motion(dt, self.total_time);
        }
        FrameControl::Continue
    }

    /// Clear, draw every entity in container order, present.
    pub fn draw<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> Result<(), SceneError> {
        backend.clear(self.config.clear_color, 1.0);

        let view = self.camera.view();
        let projection = self.camera.projection();
        for entity in &mut self.entities {
            entity.calculate_world_matrix();

            let material = self
                .materials
                .get(entity.material().0 as usize)
                .ok_or(SceneError::MissingMaterial(entity.material()))?;
            let mesh = self
                .meshes
                .get(entity.mesh().0 as usize)
                .ok_or(SceneError::MissingMesh(entity.mesh()))?;

            entity.prepare_material(material, view, projection, backend)?;
            backend.draw_indexed(mesh.vertex_buffer(), mesh.index_buffer(), mesh.index_count())?;
            self.draw_calls += 1;
        }

        backend.present()?;
        self.frames += 1;
        tracing::trace!(frame = self.frames, "frame presented");
        Ok(())
    }

    /// Update, then draw unless the update asked to quit.
    pub fn frame<B: RenderBackend + ?Sized>(
        &mut self,
        input: &InputSnapshot,
        dt: f32,
        backend: &mut B,
    ) -> Result<FrameControl, SceneError> {
        let control = self.update(input, dt);
        if control == FrameControl::Continue {
            self.draw(backend)?;
        }
        Ok(control)
    }

    /// Forward a viewport change to the camera and the backend.
    pub fn on_resize<D: GraphicsDevice + ?Sized>(&mut self, width: u32, height: u32, device: &mut D) {
        self.camera.update_projection(width, height);
        device.resize(width.max(1), height.max(1));
    }

    /// Release every mesh buffer and material texture.
    pub fn teardown<D: GraphicsDevice + ?Sized>(self, device: &mut D) {
        let stats = self.stats();
        for mesh in self.meshes {
            mesh.release(device);
        }
        for material in self.materials {
            material.release(device);
        }
        tracing::info!(frames = stats.frames, draws = stats.draw_calls, "scene torn down");
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            frames: self.frames,
            draw_calls: self.draw_calls,
            view_recomputes: self.camera.view_recompute_count(),
            world_recomputes: self.entities.iter().map(Entity::world_recompute_count).sum(),
            fallbacks: self.fallbacks,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn shaders(&self) -> (ShaderHandle, ShaderHandle) {
        (self.vertex_shader, self.pixel_shader)
    }

    pub fn sampler(&self) -> SamplerHandle {
        self.sampler
    }

    pub fn total_time(&self) -> f32 {
        self.total_time
    }
}
