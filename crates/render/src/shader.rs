use crate::error::RenderError;
use framestep_common::{DirectionalLight, SamplerHandle, ShaderHandle, TextureHandle};
use glam::Mat4;

/// Pipeline stage a shader runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

/// Variable names exposed by the fixed shader pair.
pub mod names {
    pub const WORLD: &str = "world";
    pub const VIEW: &str = "view";
    pub const PROJECTION: &str = "projection";
    pub const LIGHT: &str = "light";
    pub const LIGHT2: &str = "light2";
    pub const DIFFUSE_TEXTURE: &str = "diffuseTexture";
    pub const SAMPLER: &str = "basicSampler";
}

/// The kind of value a named shader variable accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Matrix4x4,
    Light,
    Texture,
    Sampler,
}

impl ShaderStage {
    /// Look up a variable declared by this stage.
    pub fn variable(self, name: &str) -> Option<VariableKind> {
        match (self, name) {
            (Self::Vertex, names::WORLD | names::VIEW | names::PROJECTION) => {
                Some(VariableKind::Matrix4x4)
            }
            (Self::Pixel, names::LIGHT | names::LIGHT2) => Some(VariableKind::Light),
            (Self::Pixel, names::DIFFUSE_TEXTURE) => Some(VariableKind::Texture),
            (Self::Pixel, names::SAMPLER) => Some(VariableKind::Sampler),
            _ => None,
        }
    }
}

/// Every value either stage of the fixed pipeline can hold.
///
/// A vertex shader only ever writes the matrices, a pixel shader only the
/// lights and resources; the other fields stay at their defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantBlock {
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub light: DirectionalLight,
    pub light2: DirectionalLight,
    pub texture: Option<TextureHandle>,
    pub sampler: Option<SamplerHandle>,
}

impl Default for ConstantBlock {
    fn default() -> Self {
        Self {
            world: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            light: DirectionalLight::default(),
            light2: DirectionalLight::default(),
            texture: None,
            sampler: None,
        }
    }
}

/// Constants in effect for one draw: the committed block of the active
/// vertex shader merged with that of the active pixel shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawConstants {
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub light: DirectionalLight,
    pub light2: DirectionalLight,
    pub texture: Option<TextureHandle>,
    pub sampler: Option<SamplerHandle>,
}

#[derive(Debug, Clone)]
struct ShaderSlot {
    stage: ShaderStage,
    staged: ConstantBlock,
    committed: ConstantBlock,
}

/// Staging and commit bookkeeping for a set of shaders.
///
/// Writes land in a shader's staging block; `commit` copies staging into the
/// committed block; `activate` selects the shader for its stage. Draws read
/// only committed state.
#[derive(Debug, Clone, Default)]
pub struct ShaderTable {
    slots: Vec<ShaderSlot>,
    active_vertex: Option<ShaderHandle>,
    active_pixel: Option<ShaderHandle>,
}

impl ShaderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, stage: ShaderStage) -> ShaderHandle {
        let handle = ShaderHandle(self.slots.len() as u64);
        self.slots.push(ShaderSlot {
            stage,
            staged: ConstantBlock::default(),
            committed: ConstantBlock::default(),
        });
        handle
    }

    pub fn stage_of(&self, shader: ShaderHandle) -> Option<ShaderStage> {
        self.slot(shader).map(|s| s.stage)
    }

    fn slot(&self, shader: ShaderHandle) -> Option<&ShaderSlot> {
        self.slots.get(shader.0 as usize)
    }

    /// The staging block of `shader` if it declares `name` with `kind`.
    fn staged_for(
        &mut self,
        shader: ShaderHandle,
        name: &str,
        kind: VariableKind,
    ) -> Option<&mut ConstantBlock> {
        let slot = self.slots.get_mut(shader.0 as usize)?;
        if slot.stage.variable(name) != Some(kind) {
            tracing::warn!(?shader, name, ?kind, "shader has no such variable");
            return None;
        }
        Some(&mut slot.staged)
    }

    pub fn set_matrix(&mut self, shader: ShaderHandle, name: &str, value: Mat4) -> bool {
        let Some(block) = self.staged_for(shader, name, VariableKind::Matrix4x4) else {
            return false;
        };
        match name {
            names::WORLD => block.world = value,
            names::VIEW => block.view = value,
            _ => block.projection = value,
        }
        true
    }

    pub fn set_light(&mut self, shader: ShaderHandle, name: &str, light: DirectionalLight) -> bool {
        let Some(block) = self.staged_for(shader, name, VariableKind::Light) else {
            return false;
        };
        if name == names::LIGHT {
            block.light = light;
        } else {
            block.light2 = light;
        }
        true
    }

    pub fn set_texture(&mut self, shader: ShaderHandle, name: &str, texture: TextureHandle) -> bool {
        match self.staged_for(shader, name, VariableKind::Texture) {
            Some(block) => {
                block.texture = Some(texture);
                true
            }
            None => false,
        }
    }

    pub fn set_sampler(&mut self, shader: ShaderHandle, name: &str, sampler: SamplerHandle) -> bool {
        match self.staged_for(shader, name, VariableKind::Sampler) {
            Some(block) => {
                block.sampler = Some(sampler);
                true
            }
            None => false,
        }
    }

    pub fn commit(&mut self, shader: ShaderHandle) -> Result<(), RenderError> {
        let slot = self
            .slots
            .get_mut(shader.0 as usize)
            .ok_or(RenderError::UnknownShader(shader))?;
        slot.committed = slot.staged;
        Ok(())
    }

    pub fn activate(&mut self, shader: ShaderHandle) -> Result<ShaderStage, RenderError> {
        let stage = self
            .stage_of(shader)
            .ok_or(RenderError::UnknownShader(shader))?;
        match stage {
            ShaderStage::Vertex => self.active_vertex = Some(shader),
            ShaderStage::Pixel => self.active_pixel = Some(shader),
        }
        Ok(stage)
    }

    /// Committed constants of the currently active shader pair.
    pub fn bound_constants(&self) -> Result<DrawConstants, RenderError> {
        let vertex = self
            .active_vertex
            .and_then(|h| self.slot(h))
            .ok_or(RenderError::NoActiveShader(ShaderStage::Vertex))?;
        let pixel = self
            .active_pixel
            .and_then(|h| self.slot(h))
            .ok_or(RenderError::NoActiveShader(ShaderStage::Pixel))?;
        Ok(DrawConstants {
            world: vertex.committed.world,
            view: vertex.committed.view,
            projection: vertex.committed.projection,
            light: pixel.committed.light,
            light2: pixel.committed.light2,
            texture: pixel.committed.texture,
            sampler: pixel.committed.sampler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn stage_variables() {
        assert_eq!(
            ShaderStage::Vertex.variable("world"),
            Some(VariableKind::Matrix4x4)
        );
        assert_eq!(ShaderStage::Vertex.variable("light"), None);
        assert_eq!(ShaderStage::Pixel.variable("light2"), Some(VariableKind::Light));
        assert_eq!(
            ShaderStage::Pixel.variable("basicSampler"),
            Some(VariableKind::Sampler)
        );
        assert_eq!(ShaderStage::Pixel.variable("world"), None);
    }

    #[test]
    fn writes_are_invisible_until_commit() {
        let mut table = ShaderTable::new();
        let vs = table.create(ShaderStage::Vertex);
        let ps = table.create(ShaderStage::Pixel);
        table.activate(vs).unwrap();
        table.activate(ps).unwrap();

        let world = Mat4::from_translation(Vec3::X);
        assert!(table.set_matrix(vs, names::WORLD, world));
        assert_eq!(table.bound_constants().unwrap().world, Mat4::IDENTITY);

        table.commit(vs).unwrap();
        assert_eq!(table.bound_constants().unwrap().world, world);
    }

    #[test]
    fn wrong_kind_or_stage_is_rejected() {
        let mut table = ShaderTable::new();
        let vs = table.create(ShaderStage::Vertex);
        let ps = table.create(ShaderStage::Pixel);
        assert!(!table.set_light(vs, names::LIGHT, DirectionalLight::default()));
        assert!(!table.set_matrix(ps, names::WORLD, Mat4::IDENTITY));
        assert!(!table.set_matrix(vs, "nonexistent", Mat4::IDENTITY));
        assert!(!table.set_texture(ShaderHandle(99), names::DIFFUSE_TEXTURE, TextureHandle(0)));
    }

    #[test]
    fn draw_requires_both_stages() {
        let mut table = ShaderTable::new();
        let vs = table.create(ShaderStage::Vertex);
        table.activate(vs).unwrap();
        assert!(matches!(
            table.bound_constants(),
            Err(RenderError::NoActiveShader(ShaderStage::Pixel))
        ));
    }

    #[test]
    fn pixel_block_carries_resources() {
        let mut table = ShaderTable::new();
        let vs = table.create(ShaderStage::Vertex);
        let ps = table.create(ShaderStage::Pixel);
        table.set_texture(ps, names::DIFFUSE_TEXTURE, TextureHandle(4));
        table.set_sampler(ps, names::SAMPLER, SamplerHandle(2));
        table.commit(ps).unwrap();
        table.activate(vs).unwrap();
        table.activate(ps).unwrap();
        let bound = table.bound_constants().unwrap();
        assert_eq!(bound.texture, Some(TextureHandle(4)));
        assert_eq!(bound.sampler, Some(SamplerHandle(2)));
    }

    #[test]
    fn unknown_shader_commit_fails() {
        let mut table = ShaderTable::new();
        assert!(matches!(
            table.commit(ShaderHandle(3)),
            Err(RenderError::UnknownShader(_))
        ));
    }
}
