//! wgpu renderer for text objects
//!
//! Owns the GPU half of the text pipeline: the atlas texture, one vertex
//! buffer per text object slot, and a shared uniform buffer of per-object
//! translates addressed with dynamic offsets. The CPU half lives in
//! [`glint_text::TextSystem`]; this type wraps it and forwards every text
//! and selection operation, so callers hold a single renderer.

use glint_text::{Dirty, TextHandle, TextSystem, TextSystemConfig, TextVertex};

use crate::shaders::TEXT_SHADER;

const fn align256(v: u64) -> u64 {
    (v + 255) & !255
}

const OBJECT_UNIFORM_SIZE: u64 = std::mem::size_of::<ObjectUniforms>() as u64;
const OBJECT_UNIFORM_STRIDE: u64 = align256(OBJECT_UNIFORM_SIZE);

/// Initial number of object slots the uniform buffer is sized for; it
/// doubles as the registry grows.
const INITIAL_SLOT_CAPACITY: usize = 64;

/// Error type for renderer operations
#[derive(Debug)]
pub enum RendererError {
    /// Font or text system construction failed
    Text(glint_text::TextError),
}

impl std::fmt::Display for RendererError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RendererError::Text(e) => write!(f, "Text system error: {}", e),
        }
    }
}

impl std::error::Error for RendererError {}

impl From<glint_text::TextError> for RendererError {
    fn from(e: glint_text::TextError) -> Self {
        RendererError::Text(e)
    }
}

/// Configuration for creating a [`TextRenderer`]
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Text system parameters (font bytes, pixel size, atlas size, ...)
    pub text: TextSystemConfig,
    /// Format of the render target the pipeline draws into
    pub texture_format: wgpu::TextureFormat,
    /// MSAA sample count of the render target
    pub sample_count: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            text: TextSystemConfig::default(),
            texture_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            sample_count: 1,
        }
    }
}

/// Per-frame uniforms shared by every object
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    mvp: [[f32; 4]; 4],
}

/// Per-object uniforms, one 256-aligned stride per registry slot
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniforms {
    translate: [f32; 2],
    _pad: [f32; 2],
}

/// GPU-resident geometry for one object slot
struct SlotGeometry {
    vertex_buffer: wgpu::Buffer,
    /// Allocated size of `vertex_buffer` in bytes
    capacity: u64,
    vertex_count: u32,
}

/// Draws [`glint_text`] objects with a single alpha-blended pipeline
pub struct TextRenderer {
    system: TextSystem,
    pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    /// Slots the object uniform buffer currently has room for
    object_capacity: usize,
    atlas_texture: wgpu::Texture,
    slots: Vec<Option<SlotGeometry>>,
}

impl TextRenderer {
    /// Create a renderer and its text system from font bytes. Fails when
    /// the font does not parse.
    pub fn new(device: &wgpu::Device, config: RendererConfig) -> Result<Self, RendererError> {
        let system = TextSystem::new(config.text.clone())?;
        Ok(Self::with_system(
            device,
            system,
            config.texture_format,
            config.sample_count,
        ))
    }

    /// Create a renderer around an existing text system.
    pub fn with_system(
        device: &wgpu::Device,
        system: TextSystem,
        texture_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Text Shader"),
            source: wgpu::ShaderSource::Wgsl(TEXT_SHADER.into()),
        });

        let (atlas_width, atlas_height) = system.atlas().dimensions();
        let atlas_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Glyph Atlas"),
            size: wgpu::Extent3d {
                width: atlas_width,
                height: atlas_height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let atlas_view = atlas_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let atlas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Glyph Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Text Globals Bind Group Layout"),
            entries: &[
                // MVP
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Atlas texture
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Atlas sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Text Object Bind Group Layout"),
            entries: &[
                // Per-object translate, addressed with a dynamic offset
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(OBJECT_UNIFORM_SIZE),
                    },
                    count: None,
                },
            ],
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Text Globals Buffer"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let object_capacity = INITIAL_SLOT_CAPACITY;
        let object_buffer = Self::create_object_buffer(device, object_capacity);

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Text Globals Bind Group"),
            layout: &globals_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&atlas_sampler),
                },
            ],
        });
        let object_bind_group = Self::create_object_bind_group(device, &object_layout, &object_buffer);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Text Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &object_layout],
            push_constant_ranges: &[],
        });

        // TextVertex layout (20 bytes total):
        //   position: [f32; 2] - 8 bytes, offset 0
        //   uv: [f32; 2]       - 8 bytes, offset 8
        //   color: [u8; 4]     - 4 bytes, offset 16
        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TextVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position: vec2<f32>
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 0,
                    shader_location: 0,
                },
                // uv: vec2<f32>
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 8,
                    shader_location: 1,
                },
                // color: vec4<f32> (unorm from packed bytes)
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Unorm8x4,
                    offset: 16,
                    shader_location: 2,
                },
            ],
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Text Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: std::slice::from_ref(&vertex_layout),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: texture_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: sample_count,
                ..Default::default()
            },
            multiview: None,
            cache: None,
        });

        Self {
            system,
            pipeline,
            globals_buffer,
            globals_bind_group,
            object_layout,
            object_buffer,
            object_bind_group,
            object_capacity,
            atlas_texture,
            slots: Vec::new(),
        }
    }

    fn create_object_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Text Object Uniform Buffer"),
            size: capacity as u64 * OBJECT_UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_object_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Text Object Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(OBJECT_UNIFORM_SIZE),
                }),
            }],
        })
    }

    // ----- Text object operations (forwarded to the text system) -----

    pub fn create_text(&mut self) -> TextHandle {
        self.system.create_text()
    }

    pub fn destroy_text(&mut self, handle: TextHandle) {
        if self.system.get(handle).is_some() {
            let slot = handle.index() as usize;
            if let Some(entry) = self.slots.get_mut(slot) {
                *entry = None;
            }
        }
        self.system.destroy_text(handle);
    }

    pub fn set_text(&mut self, handle: TextHandle, text: &str) {
        self.system.set_text(handle, text);
    }

    pub fn set_position(&mut self, handle: TextHandle, x: f32, baseline_y: f32) {
        self.system.set_position(handle, x, baseline_y);
    }

    pub fn set_color(&mut self, handle: TextHandle, rgba: [f32; 4]) {
        self.system.set_color(handle, rgba);
    }

    pub fn set_selectable(&mut self, handle: TextHandle, selectable: bool) {
        self.system.set_selectable(handle, selectable);
    }

    pub fn hit_test(&self, x: f32, y: f32) -> TextHandle {
        self.system.hit_test(x, y)
    }

    pub fn begin_selection(&mut self, handle: TextHandle, x: f32, y: f32) {
        self.system.begin_selection(handle, x, y);
    }

    pub fn update_selection(&mut self, handle: TextHandle, x: f32, y: f32) {
        self.system.update_selection(handle, x, y);
    }

    pub fn end_selection(&mut self, handle: TextHandle) {
        self.system.end_selection(handle);
    }

    pub fn selection_info(&self, handle: TextHandle) -> glint_text::SelectionInfo {
        self.system.selection_info(handle)
    }

    pub fn system(&self) -> &TextSystem {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut TextSystem {
        &mut self.system
    }

    // ----- Per-frame upload -----

    /// Rebuild dirty objects and push everything the GPU needs for the
    /// next draw: vertex buffers for rebuilt objects, per-object
    /// translates, and the atlas texture when new glyphs landed in it.
    pub fn update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.system.update();

        let slot_count = self.system.slot_count();
        if self.slots.len() < slot_count {
            self.slots.resize_with(slot_count, || None);
        }
        if self.object_capacity < slot_count {
            let mut capacity = self.object_capacity.max(1);
            while capacity < slot_count {
                capacity *= 2;
            }
            tracing::debug!(capacity, "growing text object uniform buffer");
            self.object_buffer = Self::create_object_buffer(device, capacity);
            self.object_bind_group =
                Self::create_object_bind_group(device, &self.object_layout, &self.object_buffer);
            self.object_capacity = capacity;
        }

        for (handle, obj) in self.system.objects_mut() {
            let slot = handle.index() as usize;

            let uniforms = ObjectUniforms {
                translate: [obj.x, obj.baseline_y],
                _pad: [0.0; 2],
            };
            queue.write_buffer(
                &self.object_buffer,
                slot as u64 * OBJECT_UNIFORM_STRIDE,
                bytemuck::bytes_of(&uniforms),
            );

            if obj.dirty != Dirty::NeedsUpload {
                continue;
            }
            let data: &[u8] = bytemuck::cast_slice(&obj.geometry.vertices);
            let needed = data.len() as u64;
            if needed == 0 {
                // Nothing to draw (whitespace-only or empty text).
                self.slots[slot] = None;
            } else {
                match self.slots[slot].take().filter(|g| g.capacity >= needed) {
                    Some(mut geom) => {
                        queue.write_buffer(&geom.vertex_buffer, 0, data);
                        geom.vertex_count = obj.geometry.vertices.len() as u32;
                        self.slots[slot] = Some(geom);
                    }
                    None => {
                        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                            label: Some("Text Vertex Buffer"),
                            size: needed,
                            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                            mapped_at_creation: false,
                        });
                        queue.write_buffer(&vertex_buffer, 0, data);
                        self.slots[slot] = Some(SlotGeometry {
                            vertex_buffer,
                            capacity: needed,
                            vertex_count: obj.geometry.vertices.len() as u32,
                        });
                    }
                }
            }
            obj.dirty = Dirty::Clean;
        }

        if self.system.atlas().is_dirty() {
            let atlas = self.system.atlas();
            let (width, height) = atlas.dimensions();
            queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &self.atlas_texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                atlas.pixels(),
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
            tracing::debug!(width, height, "glyph atlas uploaded");
            self.system.atlas_mut().mark_clean();
        }
    }

    // ----- Drawing -----

    /// Record draw calls for every live object into the pass. `mvp` maps
    /// pixel coordinates to clip space.
    pub fn draw(
        &self,
        queue: &wgpu::Queue,
        pass: &mut wgpu::RenderPass<'_>,
        mvp: [[f32; 4]; 4],
    ) {
        queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::bytes_of(&Globals { mvp }),
        );

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.globals_bind_group, &[]);
        for (handle, _) in self.system.objects() {
            let slot = handle.index() as usize;
            let Some(Some(geom)) = self.slots.get(slot) else {
                continue;
            };
            if geom.vertex_count == 0 {
                continue;
            }
            let offset = (slot as u64 * OBJECT_UNIFORM_STRIDE) as wgpu::DynamicOffset;
            pass.set_bind_group(1, &self.object_bind_group, &[offset]);
            pass.set_vertex_buffer(0, geom.vertex_buffer.slice(..));
            pass.draw(0..geom.vertex_count, 0..1);
        }
    }

    /// Drop every text object and GPU-side geometry. The pipeline, atlas
    /// texture, and font survive, so the renderer can be reused after.
    pub fn shutdown(&mut self) {
        self.system.clear();
        self.slots.clear();
    }
}
