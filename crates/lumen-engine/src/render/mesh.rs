use std::ops::Range;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::bridge::{self, WaitPolicy};
use crate::lifecycle::{ResourceStack, Slot, Stage};
use crate::resources::{create_shader_module, Geometry, POINT_COMPONENTS};

use super::{RenderCtx, RenderTarget};

/// Uniform block shared by the scene shader's vertex and fragment stages.
///
/// Layout matches the WGSL struct `{ color: vec4f, time: f32, aspect: f32 }`
/// padded to 32 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    pub color: [f32; 4],
    pub time: f32,
    pub aspect: f32,
    pub _pad: [f32; 2],
}

impl Default for SceneUniforms {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0, 1.0],
            time: 0.0,
            aspect: 1.0,
            _pad: [0.0; 2],
        }
    }
}

const POINT_STRIDE: u64 = (POINT_COMPONENTS * std::mem::size_of::<f32>()) as u64;

const POINT_ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x2, // position
    1 => Float32x3  // color
];

fn point_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: POINT_STRIDE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &POINT_ATTRS,
    }
}

/// Index range to draw for a mesh, or `None` when there is nothing to draw.
///
/// A mesh without indices issues no indexed draw call at all.
pub fn indexed_draw_range(vertex_count: u32, index_count: u32) -> Option<Range<u32>> {
    if vertex_count == 0 || index_count == 0 {
        None
    } else {
        Some(0..index_count)
    }
}

struct MeshResources {
    stack: ResourceStack,

    pipeline: Slot<wgpu::RenderPipeline>,
    vertex_buffer: Option<Slot<wgpu::Buffer>>,
    index_buffer: Option<Slot<wgpu::Buffer>>,
    uniform_buffer: Slot<wgpu::Buffer>,
    bind_group: Slot<wgpu::BindGroup>,

    surface_format: wgpu::TextureFormat,
    vertex_count: u32,
    index_count: u32,
}

/// Draws one indexed, per-vertex colored mesh with a uniform-driven shader.
///
/// The shader must expose `vs_main`/`fs_main`, read `@location(0) vec2f`
/// position and `@location(1) vec3f` color, and bind [`SceneUniforms`] at
/// `@group(0) @binding(0)`.
#[derive(Default)]
pub struct MeshRenderer {
    resources: Option<MeshResources>,
    uniforms: SceneUniforms,
}

impl MeshRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the color multiplied into every fragment.
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.uniforms.color = color;
    }

    /// Returns `true` once GPU resources exist.
    pub fn is_prepared(&self) -> bool {
        self.resources.is_some()
    }

    /// Creates the pipeline, buffers and bind group for `geometry`.
    ///
    /// Resources are created in dependency order: shader, bind group layout,
    /// pipeline layout, pipeline, buffers, bind group. Any previously
    /// prepared resources are released first. A shader or pipeline the device
    /// rejects is returned as an error.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        geometry: &Geometry,
        shader_source: &str,
    ) -> Result<()> {
        self.release();

        let vertex_count = geometry.vertex_count()?;
        let index_count = geometry.index_count()?;

        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = create_shader_module(device, "lumen scene shader", shader_source);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen scene bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<SceneUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen scene pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lumen scene pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[point_layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        // Zero-sized vertex/index buffers are skipped; nothing is drawn then.
        let vertex_buffer = (!geometry.points.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lumen scene vbo"),
                contents: bytemuck::cast_slice(&geometry.points),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        // create_buffer_init pads odd u16 counts to the copy alignment.
        let index_buffer = (!geometry.indices.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lumen scene ibo"),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lumen scene ubo"),
            contents: bytemuck::bytes_of(&self.uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen scene bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        if let Some(err) = bridge::pop_error_scope_sync(scope, &WaitPolicy::default())
            .context("failed to collect scene setup errors")?
        {
            anyhow::bail!("device rejected scene setup: {err}");
        }

        let mut stack = ResourceStack::new();
        stack.push(Stage::Shader, "scene shader", shader)?;
        stack.push(Stage::BindGroupLayout, "scene bgl", bind_group_layout)?;
        stack.push(Stage::PipelineLayout, "scene pipeline layout", pipeline_layout)?;
        let pipeline = stack.push(Stage::Pipeline, "scene pipeline", pipeline)?;
        let vertex_buffer = vertex_buffer
            .map(|b| stack.push(Stage::Buffer, "scene vbo", b))
            .transpose()?;
        let index_buffer = index_buffer
            .map(|b| stack.push(Stage::Buffer, "scene ibo", b))
            .transpose()?;
        let uniform_buffer = stack.push(Stage::Buffer, "scene ubo", uniform_buffer)?;
        let bind_group = stack.push(Stage::BindGroup, "scene bind group", bind_group)?;

        log::info!(
            "scene prepared: {} vertices, {} indices, {} GPU resources",
            vertex_count,
            index_count,
            stack.len()
        );

        self.resources = Some(MeshResources {
            stack,
            pipeline,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            bind_group,
            surface_format,
            vertex_count,
            index_count,
        });

        Ok(())
    }

    /// Records the mesh draw into `target`.
    ///
    /// The target is loaded, not cleared. Does nothing before [`prepare`](Self::prepare)
    /// or when the mesh has no indices.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        let Some(res) = self.resources.as_ref() else { return };

        if res.surface_format != ctx.surface_format {
            log::warn!(
                "scene pipeline targets {:?} but surface is {:?}; skipping draw",
                res.surface_format,
                ctx.surface_format
            );
            return;
        }

        let Some(range) = indexed_draw_range(res.vertex_count, res.index_count) else { return };

        let Some(pipeline) = res.stack.get(res.pipeline) else { return };
        let Some(bind_group) = res.stack.get(res.bind_group) else { return };
        let Some(uniform_buffer) = res.stack.get(res.uniform_buffer) else { return };
        let Some(vbo) = res.vertex_buffer.and_then(|s| res.stack.get(s)) else { return };
        let Some(ibo) = res.index_buffer.and_then(|s| res.stack.get(s)) else { return };

        self.uniforms.time = ctx.time.elapsed;
        self.uniforms.aspect = ctx.aspect_ratio();
        ctx.queue
            .write_buffer(uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lumen scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(range, 0, 0..1);
    }

    /// Releases GPU resources in reverse creation order.
    pub fn release(&mut self) {
        if let Some(mut res) = self.resources.take() {
            res.stack.release_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::parse_geometry;

    #[test]
    fn no_indices_means_no_indexed_draw() {
        let g = parse_geometry("[points]\n0 0 1 0 0\n1 0 0 1 0\n0 1 0 0 1\n[indices]\n").unwrap();
        assert_eq!(indexed_draw_range(g.vertex_count().unwrap(), g.index_count().unwrap()), None);
    }

    #[test]
    fn no_points_means_no_draw() {
        assert_eq!(indexed_draw_range(0, 3), None);
    }

    #[test]
    fn draws_every_index() {
        assert_eq!(indexed_draw_range(4, 6), Some(0..6));
    }

    #[test]
    fn uniform_block_is_wgsl_sized() {
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 32);
    }

    #[test]
    fn point_stride_covers_position_and_color() {
        assert_eq!(POINT_STRIDE, 20);
        assert_eq!(POINT_ATTRS[1].offset, 8);
    }
}
