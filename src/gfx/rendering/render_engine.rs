//! WGPU-based rendering engine for the campus map
//!
//! Draws the scene's objects in three passes over one render pass: opaque
//! surfaces, edge outlines, then translucent surfaces (marker halos) with depth
//! writes off. GPU buffers are created lazily per mesh and dropped when their
//! object leaves the scene. The UI overlay is recorded last through a callback.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cgmath::Matrix4;
use wgpu::util::DeviceExt;
use wgpu::TextureFormat;

use crate::error::RenderError;
use crate::gfx::{
    camera::camera_utils::{convert_matrix4_to_array, CameraUniform},
    resources::texture_resource::TextureResource,
    scene::{Material, Mesh, ObjectId, Scene},
};
use crate::options::WindowOptions;

use super::pipeline_manager::{DrawPass, PipelineManager};

/// Per-draw uniform: model matrix and flat material colours.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub emissive: [f32; 4],
}

impl DrawUniform {
    pub fn new(transform: &Matrix4<f32>, material: &Material) -> Self {
        let [r, g, b] = material.emissive;
        Self {
            model: convert_matrix4_to_array(*transform),
            color: material.base_color,
            emissive: [r, g, b, 0.0],
        }
    }
}

type MeshKey = (ObjectId, usize);

/// GPU copy of one [`Mesh`].
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    vertex_count: usize,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    format: TextureFormat,
    pub pipeline_manager: PipelineManager,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    draw_layout: wgpu::BindGroupLayout,
    meshes: HashMap<MeshKey, GpuMesh>,
    clear_color: wgpu::Color,
}

impl RenderEngine {
    /// Creates a render engine drawing into `window`.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        options: &WindowOptions,
    ) -> Result<RenderEngine, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using graphics adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .unwrap_or(TextureFormat::Bgra8Unorm);
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: present_mode(options.vsync),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture =
            TextureResource::create_depth_texture(&device, &config, "depth_texture");

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform"),
            contents: bytemuck::cast_slice(&[CameraUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_layout = uniform_layout(&device, "Camera Layout");
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });
        let draw_layout = uniform_layout(&device, "Draw Layout");

        let pipeline_manager = PipelineManager::new(
            &device,
            include_str!("shader.wgsl"),
            &[&camera_layout, &draw_layout],
            format,
            TextureResource::DEPTH_FORMAT,
        );

        let [r, g, b] = options.background;
        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            format,
            pipeline_manager,
            camera_buffer,
            camera_bind_group,
            draw_layout,
            meshes: HashMap::new(),
            clear_color: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
        })
    }

    /// Draws `scene`, then lets `ui_callback` record the overlay into the
    /// same encoder.
    pub fn render_frame<F>(&mut self, scene: &Scene, ui_callback: F) -> Result<(), RenderError>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated; reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("Timed out acquiring a frame; skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let draws = self.prepare(scene);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

            for pass in DrawPass::ORDER {
                let Some(pipeline) = self.pipeline_manager.get(pass) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);

                for key in draws.iter().filter(|(_, p)| *p == pass).map(|(k, _)| k) {
                    let Some(mesh) = self.meshes.get(key) else {
                        continue;
                    };
                    render_pass.set_bind_group(1, &mesh.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    render_pass
                        .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }
        }

        ui_callback(
            &self.device,
            &self.queue,
            &mut encoder,
            &surface_texture_view,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    /// Uploads missing meshes, refreshes per-draw uniforms and returns the
    /// visible draws. Buffers of removed objects are released.
    fn prepare(&mut self, scene: &Scene) -> Vec<(MeshKey, DrawPass)> {
        let mut live = HashSet::new();
        let mut draws = Vec::new();

        for (id, object) in scene.objects() {
            for (index, mesh) in object.meshes.iter().enumerate() {
                let key = (id, index);
                live.insert(key);
                if !object.visible || mesh.geometry.indices.is_empty() {
                    continue;
                }

                let stale = self
                    .meshes
                    .get(&key)
                    .map_or(true, |gpu| gpu.vertex_count != mesh.geometry.vertex_count());
                if stale {
                    let gpu = self.upload(&object.name, mesh);
                    self.meshes.insert(key, gpu);
                }

                if let Some(gpu) = self.meshes.get(&key) {
                    let uniform = DrawUniform::new(object.transform(), &mesh.material);
                    self.queue
                        .write_buffer(&gpu.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
                    draws.push((key, DrawPass::of(mesh)));
                }
            }
        }

        let before = self.meshes.len();
        self.meshes.retain(|key, _| live.contains(key));
        if self.meshes.len() != before {
            log::debug!("Released {} GPU meshes", before - self.meshes.len());
        }
        draws
    }

    fn upload(&self, name: &str, mesh: &Mesh) -> GpuMesh {
        let vertices = mesh.geometry.to_vertices();
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertices", name)),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Indices", name)),
                contents: bytemuck::cast_slice(&mesh.geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} Draw Uniform", name)),
            size: std::mem::size_of::<DrawUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Draw Bind Group", name)),
            layout: &self.draw_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.geometry.indices.len() as u32,
            vertex_count: mesh.geometry.vertex_count(),
            uniform_buffer,
            bind_group,
        }
    }

    /// Uploads the camera uniform for the next frame.
    pub fn update(&mut self, camera_uniform: CameraUniform) {
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[camera_uniform]));
    }

    /// Reconfigures the surface and recreates the depth buffer. Zero sizes
    /// (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    pub fn set_vsync(&mut self, enable: bool) {
        self.config.present_mode = present_mode(enable);
        self.surface.configure(&self.device, &self.config);
    }

    pub fn get_surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Number of meshes currently resident on the GPU.
    pub fn resident_meshes(&self) -> usize {
        self.meshes.len()
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{SquareMatrix, Vector3};

    #[test]
    fn draw_uniform_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<DrawUniform>(), 96);
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
    }

    #[test]
    fn draw_uniform_carries_translation_and_colour() {
        let transform = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
        let material = Material::from_rgb_hex(0x667eea, 0.35).with_emissive([0.1, 0.2, 0.3]);
        let uniform = DrawUniform::new(&transform, &material);
        assert_eq!(uniform.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(uniform.color[3], 0.35);
        assert_eq!(uniform.emissive, [0.1, 0.2, 0.3, 0.0]);

        let identity = DrawUniform::new(&Matrix4::identity(), &Material::default());
        assert_eq!(identity.model[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
