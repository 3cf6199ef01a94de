use crate::material::Material;
use framestep_common::{Cached, MaterialHandle, MeshHandle, ShaderHandle};
use framestep_render::shader::names;
use framestep_render::{RenderError, ShaderBindings};
use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Scripted per-frame motion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Motion {
    #[default]
    Still,
    /// Rotate by `rate * dt` each frame (radians per second, per axis).
    Spin { rate: Vec3 },
    /// Move by `axis * sin(total_time) * dt` each frame.
    Bob { axis: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TransformState {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
}

fn compose_world(state: &TransformState) -> Mat4 {
    let r = state.rotation;
    Mat4::from_translation(state.position)
        * Mat4::from_quat(Quat::from_euler(EulerRot::YXZ, r.y, r.x, r.z))
        * Mat4::from_scale(state.scale)
}

/// Turn a rejected shader write into an error so the stale staged value is
/// never committed.
fn bound(shader: ShaderHandle, name: &str, accepted: bool) -> Result<(), RenderError> {
    if accepted {
        Ok(())
    } else {
        Err(RenderError::UnboundVariable {
            shader,
            name: name.to_string(),
        })
    }
}

/// A drawable object: a transform plus a mesh and a material from the
/// scene's tables.
///
/// Rotation is Euler angles in radians with x = pitch, y = yaw, z = roll,
/// applied roll first, then pitch, then yaw.
#[derive(Debug, Clone)]
pub struct Entity {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    mesh: MeshHandle,
    material: MaterialHandle,
    motion: Motion,
    world: Cached<TransformState, Mat4>,
}

impl Entity {
    pub fn new(mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            mesh,
            material,
            motion: Motion::Still,
            world: Cached::new(Mat4::IDENTITY),
        }
    }

    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }

    pub fn move_by(&mut self, dx: f32, dy: f32, dz: f32) {
        self.position += Vec3::new(dx, dy, dz);
    }

    pub fn rotate_by(&mut self, dx: f32, dy: f32, dz: f32) {
        self.rotation += Vec3::new(dx, dy, dz);
    }

    pub fn scale_by(&mut self, sx: f32, sy: f32, sz: f32) {
        self.scale *= Vec3::new(sx, sy, sz);
    }

    /// Advance scripted motion by one frame.
    pub fn apply_motion(&mut self, dt: f32, total_time: f32) {
        match self.motion {
            Motion::Still => {}
            Motion::Spin { rate } => {
                let d = rate * dt;
                self.rotate_by(d.x, d.y, d.z);
            }
            Motion::Bob { axis } => {
                let d = axis * total_time.sin() * dt;
                self.move_by(d.x, d.y, d.z);
            }
        }
    }

    /// Rebuild the world matrix (`T * R * S`) if the transform changed since
    /// the last rebuild. Returns whether it was rebuilt.
    pub fn calculate_world_matrix(&mut self) -> bool {
        self.world.get_or_recompute(self.state(), compose_world)
    }

    /// Rebuild the world matrix unconditionally.
    pub fn force_world_matrix(&mut self) {
        self.world.force(self.state(), compose_world);
    }

    fn state(&self) -> TransformState {
        TransformState {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    /// Push world/view/projection to the material's vertex shader, bind its
    /// texture and sampler to the pixel shader, commit both and make them
    /// active. Must immediately precede the matching draw.
    pub fn prepare_material<B: ShaderBindings + ?Sized>(
        &self,
        material: &Material,
        view: Mat4,
        projection: Mat4,
        bindings: &mut B,
    ) -> Result<(), RenderError> {
        let vs = material.vertex_shader();
        let ps = material.pixel_shader();

        let world = *self.world.value();
        bound(vs, names::WORLD, bindings.set_matrix4x4(vs, names::WORLD, world))?;
        bound(vs, names::VIEW, bindings.set_matrix4x4(vs, names::VIEW, view))?;
        bound(
            vs,
            names::PROJECTION,
            bindings.set_matrix4x4(vs, names::PROJECTION, projection),
        )?;
        bindings.copy_all_buffer_data(vs)?;

        bound(
            ps,
            names::DIFFUSE_TEXTURE,
            bindings.set_texture(ps, names::DIFFUSE_TEXTURE, material.texture()),
        )?;
        bound(
            ps,
            names::SAMPLER,
            bindings.set_sampler(ps, names::SAMPLER, material.sampler()),
        )?;
        bindings.copy_all_buffer_data(ps)?;

        bindings.set_shader(vs)?;
        bindings.set_shader(ps)?;
        Ok(())
    }

    /// World matrix as of the last rebuild.
    pub fn world_matrix(&self) -> Mat4 {
        *self.world.value()
    }

    pub fn world_recompute_count(&self) -> u64 {
        self.world.recompute_count()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    pub fn material(&self) -> MaterialHandle {
        self.material
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }
}
