//! Render pipelines for the map's draw passes
//!
//! Every mesh is drawn by exactly one [`DrawPass`]. Each pass describes its
//! pipeline as a [`PipelineConfig`], and [`PipelineManager`] compiles all of
//! them up front against the surface format.

use std::collections::HashMap;

use wgpu::{
    BindGroupLayout, BlendState, ColorTargetState, ColorWrites, CompareFunction, DepthBiasState,
    DepthStencilState, Device, FragmentState, FrontFace, MultisampleState,
    PipelineCompilationOptions, PipelineLayoutDescriptor, PolygonMode, PrimitiveState,
    PrimitiveTopology, RenderPipeline, RenderPipelineDescriptor, ShaderModule,
    ShaderModuleDescriptor, ShaderSource, StencilState, TextureFormat, VertexState,
};

use crate::gfx::scene::{vertex::Vertex3D, Mesh, PrimitiveKind};

/// Which pass a mesh is drawn in. Passes run in [`DrawPass::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawPass {
    Opaque,
    Edges,
    /// Marker halos; blended over everything else without writing depth.
    Translucent,
}

impl DrawPass {
    pub const ORDER: [DrawPass; 3] = [DrawPass::Opaque, DrawPass::Edges, DrawPass::Translucent];

    pub fn of(mesh: &Mesh) -> Self {
        match mesh.kind {
            PrimitiveKind::EdgeLines => DrawPass::Edges,
            PrimitiveKind::Surface if mesh.material.is_translucent() => DrawPass::Translucent,
            PrimitiveKind::Surface => DrawPass::Opaque,
        }
    }

    /// Pipeline settings for this pass. OBJ exports do not agree on winding,
    /// so nothing is culled and the shader lights both faces.
    pub fn config(self) -> PipelineConfig {
        match self {
            DrawPass::Opaque => PipelineConfig::default().with_label("Surface Pipeline"),
            DrawPass::Translucent => PipelineConfig::default()
                .with_label("Translucent Pipeline")
                .with_blend(BlendState::ALPHA_BLENDING)
                .with_depth_write(false),
            DrawPass::Edges => PipelineConfig::default()
                .with_label("Edge Pipeline")
                .with_fragment_entry("fs_unlit")
                .with_blend(BlendState::ALPHA_BLENDING)
                .with_primitive_topology(PrimitiveTopology::LineList),
        }
    }
}

/// Settings that differ between the draw passes.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub label: &'static str,
    pub fragment_entry: &'static str,
    pub primitive_topology: PrimitiveTopology,
    pub blend: BlendState,
    pub depth_write: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Map Pipeline",
            fragment_entry: "fs_main",
            primitive_topology: PrimitiveTopology::TriangleList,
            blend: BlendState::REPLACE,
            depth_write: true,
        }
    }
}

impl PipelineConfig {
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn with_fragment_entry(mut self, entry: &'static str) -> Self {
        self.fragment_entry = entry;
        self
    }

    pub fn with_primitive_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.primitive_topology = topology;
        self
    }

    pub fn with_blend(mut self, blend: BlendState) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_depth_write(mut self, write: bool) -> Self {
        self.depth_write = write;
        self
    }
}

/// One compiled pipeline per [`DrawPass`], sharing a shader and layout.
pub struct PipelineManager {
    pipelines: HashMap<DrawPass, RenderPipeline>,
}

impl PipelineManager {
    /// Compiles `shader_source` and builds every pass for a colour target of
    /// `color_format` and a depth target of `depth_format`.
    pub fn new(
        device: &Device,
        shader_source: &str,
        bind_group_layouts: &[&BindGroupLayout],
        color_format: TextureFormat,
        depth_format: TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Map Shader"),
            source: ShaderSource::Wgsl(shader_source.into()),
        });
        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Map Pipeline Layout"),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        let pipelines = DrawPass::ORDER
            .into_iter()
            .map(|pass| {
                let pipeline = build_pipeline(
                    device,
                    &shader,
                    &layout,
                    &pass.config(),
                    color_format,
                    depth_format,
                );
                (pass, pipeline)
            })
            .collect();
        log::debug!("Built {} render pipelines", DrawPass::ORDER.len());

        Self { pipelines }
    }

    pub fn get(&self, pass: DrawPass) -> Option<&RenderPipeline> {
        self.pipelines.get(&pass)
    }
}

fn build_pipeline(
    device: &Device,
    shader: &ShaderModule,
    layout: &wgpu::PipelineLayout,
    config: &PipelineConfig,
    color_format: TextureFormat,
    depth_format: TextureFormat,
) -> RenderPipeline {
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(config.label),
        layout: Some(layout),
        vertex: VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex3D::desc()],
            compilation_options: PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: shader,
            entry_point: Some(config.fragment_entry),
            targets: &[Some(ColorTargetState {
                format: color_format,
                blend: Some(config.blend),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: PipelineCompilationOptions::default(),
        }),
        primitive: PrimitiveState {
            topology: config.primitive_topology,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: depth_format,
            depth_write_enabled: config.depth_write,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_box;
    use crate::gfx::scene::Material;

    #[test]
    fn meshes_sort_into_passes() {
        let geometry = generate_box([0.0; 3], [1.0; 3]);
        let halo = Mesh::surface(geometry.clone(), Material::new([0.4, 0.5, 0.9, 0.3]));
        let solid = Mesh::surface(geometry, Material::default());
        let edges = Mesh::edge_lines(vec![[0.0; 3], [1.0; 3]], [0.0, 0.0, 0.0, 0.8]);
        assert_eq!(DrawPass::of(&halo), DrawPass::Translucent);
        assert_eq!(DrawPass::of(&solid), DrawPass::Opaque);
        assert_eq!(DrawPass::of(&edges), DrawPass::Edges);
    }

    #[test]
    fn translucent_pass_runs_last_without_depth_writes() {
        assert_eq!(DrawPass::ORDER.last(), Some(&DrawPass::Translucent));
        let config = DrawPass::Translucent.config();
        assert!(!config.depth_write);
        assert_eq!(config.blend, BlendState::ALPHA_BLENDING);
        assert!(DrawPass::Opaque.config().depth_write);
    }

    #[test]
    fn edges_are_unlit_lines() {
        let config = DrawPass::Edges.config();
        assert_eq!(config.primitive_topology, PrimitiveTopology::LineList);
        assert_eq!(config.fragment_entry, "fs_unlit");
        assert_eq!(DrawPass::Opaque.config().fragment_entry, "fs_main");
    }
}
