use crate::shaders;
use crate::texture::decode_rgba;
use bytemuck::{Pod, Zeroable};
use framestep_common::{
    BufferHandle, DirectionalLight, DirectionalLightRaw, SamplerHandle, ShaderHandle,
    TextureHandle, Vertex,
};
use framestep_render::{
    DrawConstants, GraphicsDevice, RenderError, ShaderBindings, ShaderStage, ShaderTable,
};
use glam::Mat4;
use std::collections::HashMap;
use std::path::Path;
use wgpu::util::DeviceExt;

/// Per-draw uniform block; mirrors `DrawConstants` in the WGSL.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GpuConstants {
    world: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    light: DirectionalLightRaw,
    light2: DirectionalLightRaw,
}

impl From<&DrawConstants> for GpuConstants {
    fn from(c: &DrawConstants) -> Self {
        Self {
            world: c.world.to_cols_array_2d(),
            view: c.view.to_cols_array_2d(),
            projection: c.projection.to_cols_array_2d(),
            light: c.light.to_raw(),
            light2: c.light2.to_raw(),
        }
    }
}

const CONSTANTS_SIZE: u64 = std::mem::size_of::<GpuConstants>() as u64;

/// Maximum draws recorded between `clear` and `present`.
pub const MAX_DRAWS_PER_FRAME: usize = 256;

fn aligned_stride(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferKind {
    Vertex,
    Index,
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    kind: BufferKind,
    len: u32,
}

struct PendingDraw {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    index_count: u32,
    constants: DrawConstants,
}

/// wgpu implementation of the render backend.
///
/// Draws are recorded with a snapshot of their constants and replayed in
/// one render pass at `present`. Each draw's constants occupy their own
/// slot of a uniform buffer bound at a dynamic offset.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    material_layout: wgpu::BindGroupLayout,
    constants_buffer: wgpu::Buffer,
    constants_bind_group: wgpu::BindGroup,
    constants_stride: u64,
    depth_view: wgpu::TextureView,
    shaders: ShaderTable,
    buffers: HashMap<BufferHandle, GpuBuffer>,
    textures: HashMap<TextureHandle, wgpu::TextureView>,
    samplers: HashMap<SamplerHandle, wgpu::Sampler>,
    material_groups: HashMap<(TextureHandle, SamplerHandle), wgpu::BindGroup>,
    default_texture: TextureHandle,
    default_sampler: SamplerHandle,
    next_id: u64,
    clear_color: wgpu::Color,
    clear_depth: f32,
    pending: Vec<PendingDraw>,
}

impl WgpuBackend {
    /// Build the pipeline for an already configured surface.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    ) -> Result<Self, RenderError> {
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let constants_stride = aligned_stride(CONSTANTS_SIZE, alignment);

        let constants_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw_constants"),
            size: constants_stride * MAX_DRAWS_PER_FRAME as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let constants_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_constants_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(CONSTANTS_SIZE),
                },
                count: None,
            }],
        });

        let constants_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_constants_bind_group"),
            layout: &constants_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &constants_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(CONSTANTS_SIZE),
                }),
            }],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&constants_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                        2 => Float32x2,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Cw,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let depth_view = Self::create_depth_texture(&device, config.width, config.height);

        let mut backend = Self {
            device,
            queue,
            surface,
            config,
            pipeline,
            material_layout,
            constants_buffer,
            constants_bind_group,
            constants_stride,
            depth_view,
            shaders: ShaderTable::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            samplers: HashMap::new(),
            material_groups: HashMap::new(),
            default_texture: TextureHandle(0),
            default_sampler: SamplerHandle(0),
            next_id: 0,
            clear_color: wgpu::Color::BLACK,
            clear_depth: 1.0,
            pending: Vec::new(),
        };
        backend.default_texture = backend.create_texture_rgba(1, 1, &[255; 4])?;
        backend.default_sampler = backend.create_sampler()?;

        tracing::info!(
            format = ?backend.config.format,
            stride = constants_stride,
            "wgpu backend ready"
        );
        Ok(backend)
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn next_handle(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }

    fn create_buffer(
        &mut self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
        kind: BufferKind,
        len: u32,
    ) -> BufferHandle {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            });
        let handle = BufferHandle(self.next_handle());
        self.buffers.insert(handle, GpuBuffer { buffer, kind, len });
        handle
    }

    fn buffer_len(&self, handle: BufferHandle, kind: BufferKind) -> Result<u32, RenderError> {
        match self.buffers.get(&handle) {
            Some(b) if b.kind == kind => Ok(b.len),
            _ => Err(RenderError::UnknownBuffer(handle)),
        }
    }

    /// Bind group for a texture/sampler pair, created on first use.
    fn material_group(
        &mut self,
        texture: Option<TextureHandle>,
        sampler: Option<SamplerHandle>,
    ) -> Result<(TextureHandle, SamplerHandle), RenderError> {
        let texture = texture.unwrap_or(self.default_texture);
        let sampler = sampler.unwrap_or(self.default_sampler);
        if self.material_groups.contains_key(&(texture, sampler)) {
            return Ok((texture, sampler));
        }
        let view = self
            .textures
            .get(&texture)
            .ok_or(RenderError::UnknownTexture(texture))?;
        let state = self
            .samplers
            .get(&sampler)
            .ok_or(RenderError::UnknownSampler(sampler))?;
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material_bind_group"),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(state),
                },
            ],
        });
        self.material_groups.insert((texture, sampler), group);
        Ok((texture, sampler))
    }

    fn render_pending(&mut self, target: &wgpu::TextureView) -> Result<(), RenderError> {
        let pending = std::mem::take(&mut self.pending);

        let stride = self.constants_stride as usize;
        let mut staging = vec![0u8; stride * pending.len().max(1)];
        for (slot, draw) in pending.iter().enumerate() {
            let raw = GpuConstants::from(&draw.constants);
            staging[slot * stride..slot * stride + CONSTANTS_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&raw));
        }
        if !pending.is_empty() {
            self.queue.write_buffer(&self.constants_buffer, 0, &staging);
        }

        let groups = resolve_groups(&pending, |texture, sampler| {
            self.material_group(texture, sampler)
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(&self.pipeline);
            for (slot, (draw, key)) in pending.iter().zip(&groups).enumerate() {
                let (Some(vb), Some(ib), Some(group)) = (
                    self.buffers.get(&draw.vertex_buffer),
                    self.buffers.get(&draw.index_buffer),
                    key.as_ref().and_then(|key| self.material_groups.get(key)),
                ) else {
                    tracing::warn!(slot, "draw references released resources, skipped");
                    continue;
                };
                let offset = (slot as u64 * self.constants_stride) as u32;
                pass.set_bind_group(0, &self.constants_bind_group, &[offset]);
                pass.set_bind_group(1, group, &[]);
                pass.set_vertex_buffer(0, vb.buffer.slice(..));
                pass.set_index_buffer(ib.buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

/// Material key per pending draw. A draw whose texture or sampler is gone
/// gets `None` and is skipped at replay instead of failing the frame.
fn resolve_groups<K>(
    pending: &[PendingDraw],
    mut resolve: impl FnMut(Option<TextureHandle>, Option<SamplerHandle>) -> Result<K, RenderError>,
) -> Vec<Option<K>> {
    pending
        .iter()
        .enumerate()
        .map(|(slot, draw)| {
            match resolve(draw.constants.texture, draw.constants.sampler) {
                Ok(key) => Some(key),
                Err(err) => {
                    tracing::warn!(slot, %err, "material unavailable, draw skipped");
                    None
                }
            }
        })
        .collect()
}

impl GraphicsDevice for WgpuBackend {
    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferHandle, RenderError> {
        Ok(self.create_buffer(
            "vertex_buffer",
            bytemuck::cast_slice(vertices),
            wgpu::BufferUsages::VERTEX,
            BufferKind::Vertex,
            vertices.len() as u32,
        ))
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<BufferHandle, RenderError> {
        Ok(self.create_buffer(
            "index_buffer",
            bytemuck::cast_slice(indices),
            wgpu::BufferUsages::INDEX,
            BufferKind::Index,
            indices.len() as u32,
        ))
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderHandle, RenderError> {
        Ok(self.shaders.create(stage))
    }

    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, RenderError> {
        let image = decode_rgba(path)?;
        self.create_texture_rgba(image.width, image.height, &image.pixels)
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
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("material_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );
        let handle = TextureHandle(self.next_handle());
        self.textures
            .insert(handle, texture.create_view(&wgpu::TextureViewDescriptor::default()));
        Ok(handle)
    }

    fn create_sampler(&mut self) -> Result<SamplerHandle, RenderError> {
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear_wrap_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let handle = SamplerHandle(self.next_handle());
        self.samplers.insert(handle, sampler);
        Ok(handle)
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if let Some(b) = self.buffers.remove(&buffer) {
            b.buffer.destroy();
        }
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            self.material_groups.retain(|(t, _), _| *t != texture);
        }
    }

    fn clear(&mut self, color: [f32; 4], depth: f32) {
        self.clear_color = wgpu::Color {
            r: f64::from(color[0]),
            g: f64::from(color[1]),
            b: f64::from(color[2]),
            a: f64::from(color[3]),
        };
        self.clear_depth = depth;
        self.pending.clear();
    }

    fn draw_indexed(
        &mut self,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        index_count: u32,
    ) -> Result<(), RenderError> {
        self.buffer_len(vertex_buffer, BufferKind::Vertex)?;
        let available = self.buffer_len(index_buffer, BufferKind::Index)?;
        if index_count > available {
            return Err(RenderError::IndexRange {
                requested: index_count,
                available,
            });
        }
        if self.pending.len() >= MAX_DRAWS_PER_FRAME {
            return Err(RenderError::FrameCapacity(MAX_DRAWS_PER_FRAME));
        }
        let constants = self.shaders.bound_constants()?;
        self.pending.push(PendingDraw {
            vertex_buffer,
            index_buffer,
            index_count,
            constants,
        });
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                self.pending.clear();
                tracing::debug!("surface reconfigured, frame skipped");
                return Ok(());
            }
            Err(e) => {
                self.pending.clear();
                return Err(RenderError::Surface(e.to_string()));
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.render_pending(&view)?;
        frame.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.depth_view =
            Self::create_depth_texture(&self.device, self.config.width, self.config.height);
        tracing::debug!(
            width = self.config.width,
            height = self.config.height,
            "surface resized"
        );
    }
}

impl ShaderBindings for WgpuBackend {
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
        self.samplers.contains_key(&sampler) && self.shaders.set_sampler(shader, name, sampler)
    }

    fn copy_all_buffer_data(&mut self, shader: ShaderHandle) -> Result<(), RenderError> {
        self.shaders.commit(shader)
    }

    fn set_shader(&mut self, shader: ShaderHandle) -> Result<(), RenderError> {
        self.shaders.activate(shader).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    #[test]
    fn constants_match_wgsl_layout() {
        // 3 mat4x4 + 2 lights of (vec4, vec4, vec3 padded to 16)
        assert_eq!(CONSTANTS_SIZE, 64 * 3 + 48 * 2);
    }

    fn pending_with_texture(texture: u64) -> PendingDraw {
        PendingDraw {
            vertex_buffer: BufferHandle(1),
            index_buffer: BufferHandle(2),
            index_count: 3,
            constants: DrawConstants {
                world: Mat4::IDENTITY,
                view: Mat4::IDENTITY,
                projection: Mat4::IDENTITY,
                light: DirectionalLight::default(),
                light2: DirectionalLight::default(),
                texture: Some(TextureHandle(texture)),
                sampler: Some(SamplerHandle(9)),
            },
        }
    }

    #[test]
    fn released_texture_skips_only_its_draw() {
        let pending = [
            pending_with_texture(5),
            pending_with_texture(6),
            pending_with_texture(5),
        ];
        let groups = resolve_groups(&pending, |texture, sampler| match texture {
            Some(TextureHandle(6)) => Err(RenderError::UnknownTexture(TextureHandle(6))),
            Some(t) => Ok((t, sampler)),
            None => Err(RenderError::NoActiveShader(framestep_render::ShaderStage::Pixel)),
        });
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0], Some((TextureHandle(5), Some(SamplerHandle(9)))));
        assert_eq!(groups[1], None);
        assert!(groups[2].is_some());
    }

    #[test]
    fn stride_rounds_up_to_alignment() {
        assert_eq!(aligned_stride(CONSTANTS_SIZE, 256), 512);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(1, 64), 64);
    }

    #[test]
    fn constants_are_column_major() {
        let constants = DrawConstants {
            world: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            light: DirectionalLight {
                ambient: Vec4::splat(0.1),
                diffuse: Vec4::ONE,
                direction: Vec3::new(1.0, -1.0, 0.0),
            },
            light2: DirectionalLight::default(),
            texture: None,
            sampler: None,
        };
        let raw = GpuConstants::from(&constants);
        assert_eq!(raw.world[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(raw.light.direction, [1.0, -1.0, 0.0]);
        let bytes = bytemuck::bytes_of(&raw);
        assert_eq!(bytes.len() as u64, CONSTANTS_SIZE);
    }
}
