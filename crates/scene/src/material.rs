use framestep_common::{SamplerHandle, ShaderHandle, TextureHandle};
use framestep_render::GraphicsDevice;

/// A shader pair plus the texture and sampler it samples from.
///
/// Shaders and the sampler are shared across materials and owned by the
/// scene. The texture belongs to the material and is released with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    name: String,
    vertex_shader: ShaderHandle,
    pixel_shader: ShaderHandle,
    texture: TextureHandle,
    sampler: SamplerHandle,
}

impl Material {
    pub fn new(
        name: impl Into<String>,
        vertex_shader: ShaderHandle,
        pixel_shader: ShaderHandle,
        texture: TextureHandle,
        sampler: SamplerHandle,
    ) -> Self {
        Self {
            name: name.into(),
            vertex_shader,
            pixel_shader,
            texture,
            sampler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_shader(&self) -> ShaderHandle {
        self.vertex_shader
    }

    pub fn pixel_shader(&self) -> ShaderHandle {
        self.pixel_shader
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub fn sampler(&self) -> SamplerHandle {
        self.sampler
    }

    pub fn release<D: GraphicsDevice + ?Sized>(self, device: &mut D) {
        device.release_texture(self.texture);
    }
}

/// RGBA8 checkerboard substituted for textures that fail to load.
pub fn checkerboard(size: u32, cells: u32) -> Vec<u8> {
    const LIGHT: [u8; 4] = [200, 200, 200, 255];
    const DARK: [u8; 4] = [255, 0, 255, 255];
    let cell = (size / cells.max(1)).max(1);
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let texel = if ((x / cell) + (y / cell)) % 2 == 0 {
                LIGHT
            } else {
                DARK
            };
            pixels.extend_from_slice(&texel);
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use framestep_render::RecordingBackend;

    #[test]
    fn checkerboard_alternates() {
        let px = checkerboard(4, 2);
        assert_eq!(px.len(), 4 * 4 * 4);
        let at = |x: usize, y: usize| &px[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
        assert_eq!(at(0, 0), at(1, 1));
        assert_ne!(at(0, 0), at(2, 0));
        assert_ne!(at(0, 0), at(0, 2));
        assert_eq!(at(0, 0), at(3, 3));
    }

    #[test]
    fn release_frees_only_the_texture() {
        let mut backend = RecordingBackend::new(1, 1);
        let texture = backend.create_texture_rgba(1, 1, &[0; 4]).unwrap();
        let sampler = backend.create_sampler().unwrap();
        let material = Material::new(
            "ice",
            ShaderHandle(0),
            ShaderHandle(1),
            texture,
            sampler,
        );
        assert_eq!(material.name(), "ice");
        material.release(&mut backend);
        assert_eq!(backend.live_textures(), 0);
    }
}
