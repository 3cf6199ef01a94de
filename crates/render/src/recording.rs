use crate::backend::{GraphicsDevice, ShaderBindings};
use crate::error::RenderError;
use crate::shader::{DrawConstants, ShaderStage, ShaderTable};
use framestep_common::{
    BufferHandle, DirectionalLight, SamplerHandle, ShaderHandle, TextureHandle, Vertex,
};
use glam::Mat4;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// One call observed by the [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateVertexBuffer {
        buffer: BufferHandle,
        vertex_count: u32,
    },
    CreateIndexBuffer {
        buffer: BufferHandle,
        index_count: u32,
    },
    CreateShader {
        shader: ShaderHandle,
        stage: ShaderStage,
    },
    LoadTexture {
        texture: TextureHandle,
        path: PathBuf,
    },
    CreateTexture {
        texture: TextureHandle,
        width: u32,
        height: u32,
    },
    CreateSampler(SamplerHandle),
    ReleaseBuffer(BufferHandle),
    ReleaseTexture(TextureHandle),
    Commit(ShaderHandle),
    SetShader(ShaderHandle),
    Clear {
        color: [f32; 4],
        depth: f32,
    },
    DrawIndexed {
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        index_count: u32,
        constants: DrawConstants,
    },
    Present,
    Resize {
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, Copy)]
enum BufferKind {
    Vertex(u32),
    Index(u32),
}

/// In-memory backend that validates and logs every call.
///
/// Texture loads only check that the file exists; nothing is decoded. Used
/// by tests and by the headless CLI.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<Command>,
    shaders: ShaderTable,
    buffers: BTreeMap<BufferHandle, BufferKind>,
    textures: BTreeMap<TextureHandle, (u32, u32)>,
    samplers: u64,
    next_id: u64,
    frames_presented: u64,
    size: (u32, u32),
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width.max(1), height.max(1)),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Hand off the log and start a new one.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Draw calls in log order.
    pub fn draws(&self) -> impl Iterator<Item = (&BufferHandle, &u32, &DrawConstants)> {
        self.commands.iter().filter_map(|c| match c {
            Command::DrawIndexed {
                vertex_buffer,
                index_count,
                constants,
                ..
            } => Some((vertex_buffer, index_count, constants)),
            _ => None,
        })
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    fn next_handle(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Human-readable summary of the log, one line per frame.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Recording (frames={}, buffers={}, textures={}, samplers={}) ===",
            self.frames_presented,
            self.buffers.len(),
            self.textures.len(),
            self.samplers
        );
        let mut frame = 0u64;
        let mut draws = 0usize;
        for command in &self.commands {
            match command {
                Command::DrawIndexed {
                    index_count,
                    constants,
                    ..
                } => {
                    draws += 1;
                    let p = constants.world.w_axis;
                    let _ = writeln!(
                        out,
                        "  frame {frame} draw {draws}: {index_count} indices at ({:.2}, {:.2}, {:.2})",
                        p.x, p.y, p.z
                    );
                }
                Command::Present => {
                    frame += 1;
                    draws = 0;
                }
                _ => {}
            }
        }
        out
    }
}

impl GraphicsDevice for RecordingBackend {
    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferHandle, RenderError> {
        let buffer = BufferHandle(self.next_handle());
        let vertex_count = vertices.len() as u32;
        self.buffers.insert(buffer, BufferKind::Vertex(vertex_count));
        self.commands.push(Command::CreateVertexBuffer {
            buffer,
            vertex_count,
        });
        Ok(buffer)
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<BufferHandle, RenderError> {
        let buffer = BufferHandle(self.next_handle());
        let index_count = indices.len() as u32;
        self.buffers.insert(buffer, BufferKind::Index(index_count));
        self.commands.push(Command::CreateIndexBuffer {
            buffer,
            index_count,
        });
        Ok(buffer)
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderHandle, RenderError> {
        let shader = self.shaders.create(stage);
        self.commands.push(Command::CreateShader { shader, stage });
        Ok(shader)
    }

    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, RenderError> {
        if !path.is_file() {
            return Err(RenderError::AssetNotFound(path.to_path_buf()));
        }
        let texture = TextureHandle(self.next_handle());
        self.textures.insert(texture, (0, 0));
        self.commands.push(Command::LoadTexture {
            texture,
            path: path.to_path_buf(),
        });
        Ok(texture)
    }

    fn create_texture_rgba(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureHandle, RenderError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RenderError::TextureSize {
                expected,
                actual: pixels.len(),
            });
        }
        let texture = TextureHandle(self.next_handle());
        self.textures.insert(texture, (width, height));
        self.commands.push(Command::CreateTexture {
            texture,
            width,
            height,
        });
        Ok(texture)
    }

    fn create_sampler(&mut self) -> Result<SamplerHandle, RenderError> {
        let sampler = SamplerHandle(self.next_handle());
        self.samplers += 1;
        self.commands.push(Command::CreateSampler(sampler));
        Ok(sampler)
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.commands.push(Command::ReleaseBuffer(buffer));
        }
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            self.commands.push(Command::ReleaseTexture(texture));
        }
    }

    fn clear(&mut self, color: [f32; 4], depth: f32) {
        self.commands.push(Command::Clear { color, depth });
    }

    fn draw_indexed(
        &mut self,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        index_count: u32,
    ) -> Result<(), RenderError> {
        match self.buffers.get(&vertex_buffer) {
            Some(BufferKind::Vertex(_)) => {}
            _ => return Err(RenderError::UnknownBuffer(vertex_buffer)),
        }
        let available = match self.buffers.get(&index_buffer) {
            Some(BufferKind::Index(n)) => *n,
            _ => return Err(RenderError::UnknownBuffer(index_buffer)),
        };
        if index_count > available {
            return Err(RenderError::IndexRange {
                requested: index_count,
                available,
            });
        }
        let constants = self.shaders.bound_constants()?;
        self.commands.push(Command::DrawIndexed {
            vertex_buffer,
            index_buffer,
            index_count,
            constants,
        });
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.frames_presented += 1;
        self.commands.push(Command::Present);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
        self.commands.push(Command::Resize {
            width: self.size.0,
            height: self.size.1,
        });
    }
}

impl ShaderBindings for RecordingBackend {
    fn set_matrix4x4(&mut self, shader: ShaderHandle, name: &str, value: Mat4) -> bool {
        self.shaders.set_matrix(shader, name, value)
    }

    fn set_light(&mut self, shader: ShaderHandle, name: &str, light: DirectionalLight) -> bool {
        self.shaders.set_light(shader, name, light)
    }

    fn set_texture(&mut self, shader: ShaderHandle, name: &str, texture: TextureHandle) -> bool {
        self.textures.contains_key(&texture) && self.shaders.set_texture(shader, name, texture)
    }

    fn set_sampler(&mut self, shader: ShaderHandle, name: &str, sampler: SamplerHandle) -> bool {
        self.shaders.set_sampler(shader, name, sampler)
    }

    fn copy_all_buffer_data(&mut self, shader: ShaderHandle) -> Result<(), RenderError> {
        self.shaders.commit(shader)?;
        self.commands.push(Command::Commit(shader));
        Ok(())
    }

    fn set_shader(&mut self, shader: ShaderHandle) -> Result<(), RenderError> {
        self.shaders.activate(shader)?;
        self.commands.push(Command::SetShader(shader));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::names;
    use glam::Vec3;

    fn triangle(backend: &mut RecordingBackend) -> (BufferHandle, BufferHandle) {
        let v = backend
            .create_vertex_buffer(&[Vertex::default(); 3])
            .unwrap();
        let i = backend.create_index_buffer(&[0, 1, 2]).unwrap();
        (v, i)
    }

    fn bound_pair(backend: &mut RecordingBackend) -> (ShaderHandle, ShaderHandle) {
        let vs = backend.create_shader(ShaderStage::Vertex).unwrap();
        let ps = backend.create_shader(ShaderStage::Pixel).unwrap();
        backend.set_shader(vs).unwrap();
        backend.set_shader(ps).unwrap();
        (vs, ps)
    }

    #[test]
    fn draw_snapshots_committed_constants() {
        let mut backend = RecordingBackend::new(800, 600);
        let (v, i) = triangle(&mut backend);
        let (vs, _) = bound_pair(&mut backend);

        let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        backend.set_matrix4x4(vs, names::WORLD, world);
        backend.copy_all_buffer_data(vs).unwrap();
        backend.draw_indexed(v, i, 3).unwrap();

        backend.set_matrix4x4(vs, names::WORLD, Mat4::IDENTITY);
        backend.copy_all_buffer_data(vs).unwrap();
        backend.draw_indexed(v, i, 3).unwrap();

        let worlds: Vec<Mat4> = backend.draws().map(|(_, _, c)| c.world).collect();
        assert_eq!(worlds, vec![world, Mat4::IDENTITY]);
    }

    #[test]
    fn draw_validates_buffers() {
        let mut backend = RecordingBackend::new(800, 600);
        let (v, i) = triangle(&mut backend);
        bound_pair(&mut backend);

        assert!(matches!(
            backend.draw_indexed(i, i, 3),
            Err(RenderError::UnknownBuffer(_))
        ));
        assert!(matches!(
            backend.draw_indexed(v, i, 4),
            Err(RenderError::IndexRange {
                requested: 4,
                available: 3
            })
        ));
        backend.release_buffer(i);
        assert!(backend.draw_indexed(v, i, 3).is_err());
    }

    #[test]
    fn draw_without_shaders_fails() {
        let mut backend = RecordingBackend::new(800, 600);
        let (v, i) = triangle(&mut backend);
        assert!(matches!(
            backend.draw_indexed(v, i, 3),
            Err(RenderError::NoActiveShader(ShaderStage::Vertex))
        ));
    }

    #[test]
    fn missing_texture_file_is_an_error() {
        let mut backend = RecordingBackend::new(800, 600);
        let err = backend
            .load_texture(Path::new("/definitely/not/here.png"))
            .unwrap_err();
        assert!(matches!(err, RenderError::AssetNotFound(_)));
        assert!(err.to_string().contains("not/here.png"));
    }

    #[test]
    fn existing_texture_file_loads() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut backend = RecordingBackend::new(800, 600);
        let texture = backend.load_texture(tmp.path()).unwrap();
        assert_eq!(backend.live_textures(), 1);
        backend.release_texture(texture);
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn rgba_texture_size_is_checked() {
        let mut backend = RecordingBackend::new(800, 600);
        assert!(backend.create_texture_rgba(2, 2, &[0; 16]).is_ok());
        assert!(matches!(
            backend.create_texture_rgba(2, 2, &[0; 15]),
            Err(RenderError::TextureSize {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn unknown_texture_is_not_bound() {
        let mut backend = RecordingBackend::new(800, 600);
        let (_, ps) = bound_pair(&mut backend);
        assert!(!backend.set_texture(ps, names::DIFFUSE_TEXTURE, TextureHandle(77)));
    }

    #[test]
    fn resize_clamps_to_one() {
        let mut backend = RecordingBackend::new(0, 0);
        assert_eq!(backend.size(), (1, 1));
        backend.resize(1024, 0);
        assert_eq!(backend.size(), (1024, 1));
    }

    #[test]
    fn describe_lists_draws_per_frame() {
        let mut backend = RecordingBackend::new(800, 600);
        let (v, i) = triangle(&mut backend);
        bound_pair(&mut backend);
        backend.clear([0.0; 4], 1.0);
        backend.draw_indexed(v, i, 3).unwrap();
        backend.present().unwrap();

        let text = backend.describe();
        assert!(text.contains("frames=1"));
        assert!(text.contains("frame 0 draw 1: 3 indices"));
        assert_eq!(backend.frames_presented(), 1);
    }
}
