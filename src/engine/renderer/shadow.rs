use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use wgpu::*;

use crate::engine::math::Frustum;
use crate::engine::renderer::scene::{
    uniform_bind_group_layout, FrameParams, GroundPlane, ObjectUniforms, SceneObject, SceneUniforms, UniformSlot,
};
use crate::engine::shaders::{SCENE_SHADER, SHADOW_VOLUME_SHADER, STENCIL_DIAGNOSTIC_SHADER};
use crate::engine::shadow_volume::ShadowVolumeVertex;
use crate::engine::stencil::*;
use crate::engine::vbo::MeshVertex;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct DiagnosticVertex {
    position: [f32; 2],
    color: [f32; 4],
}

impl DiagnosticVertex {
    fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<DiagnosticVertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &[
                VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: VertexFormat::Float32x2,
                },
                VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as BufferAddress,
                    shader_location: 1,
                    format: VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// One oversized triangle per stencil count, covering the whole viewport.
fn diagnostic_triangles() -> Vec<DiagnosticVertex> {
    (1..=MAX_DIAGNOSTIC_COUNT)
        .flat_map(|n| {
            let color = diagnostic_color(n);
            [[-1.0, -1.0], [3.0, -1.0], [-1.0, 3.0]].map(|position| DiagnosticVertex { position, color })
        })
        .collect()
}

/// Objects whose shadow volume has vertices to draw.
fn with_volume<T>(objects: &[T], vertex_count: impl Fn(&T) -> u32) -> Vec<&T> {
    objects.iter().filter(|&o| vertex_count(o) > 0).collect()
}

/// Per-frame switches of the shadow renderer.
#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    pub stencil_mode: StencilMode,
    pub display_mode: DisplayMode,
    pub clear_color: Color,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            stencil_mode: StencilMode::TwoSided,
            display_mode: DisplayMode::Shaded,
            clear_color: Color {
                r: 0.1,
                g: 0.12,
                b: 0.18,
                a: 1.0,
            },
        }
    }
}

/// Counters of the last rendered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub visible_objects: usize,
    pub volume_draws: usize,
    pub ground_vertices: u32,
}

/// Owns every pipeline of the Z-fail shadow technique and sequences the
/// passes of a frame.
pub struct ShadowRenderer {
    object_layout: BindGroupLayout,
    scene_uniforms: UniformSlot,
    geometry_pipeline: RenderPipeline,
    shadowed_pipeline: RenderPipeline,
    two_sided_pipelines: Vec<RenderPipeline>,
    two_pass_pipelines: Vec<RenderPipeline>,
    volume_debug_pipeline: RenderPipeline,
    diagnostic_pipeline: RenderPipeline,
    diagnostic_vertex_buffer: Buffer,
}

impl ShadowRenderer {
    pub fn new(device: &Device, surface_format: TextureFormat) -> Self {
        let scene_layout =
            uniform_bind_group_layout(device, "Scene Bind Group Layout", std::mem::size_of::<SceneUniforms>());
        let object_layout =
            uniform_bind_group_layout(device, "Object Bind Group Layout", std::mem::size_of::<ObjectUniforms>());
        let scene_uniforms =
            UniformSlot::new(device, &scene_layout, "Scene Uniforms", &SceneUniforms::zeroed());

        let scene_shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: ShaderSource::Wgsl(SCENE_SHADER.into()),
        });
        let volume_shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Shadow Volume Shader"),
            source: ShaderSource::Wgsl(SHADOW_VOLUME_SHADER.into()),
        });
        let diagnostic_shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Stencil Diagnostic Shader"),
            source: ShaderSource::Wgsl(STENCIL_DIAGNOSTIC_SHADER.into()),
        });

        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Shadow Scene Pipeline Layout"),
            bind_group_layouts: &[&scene_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let diagnostic_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Stencil Diagnostic Pipeline Layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        let opaque = ColorTargetState {
            format: surface_format,
            blend: Some(BlendState::REPLACE),
            write_mask: ColorWrites::ALL,
        };
        let blended = ColorTargetState {
            format: surface_format,
            blend: Some(shadow_blend()),
            write_mask: ColorWrites::ALL,
        };
        let masked = ColorTargetState {
            format: surface_format,
            blend: None,
            write_mask: ColorWrites::empty(),
        };

        let geometry_pipeline = Self::create_pipeline(
            device,
            "Geometry Pipeline",
            &layout,
            (&scene_shader, "fs_main"),
            MeshVertex::desc(),
            opaque,
            None,
            geometry_depth_stencil(),
        );
        let shadowed_pipeline = Self::create_pipeline(
            device,
            "Shadowed Geometry Pipeline",
            &layout,
            (&scene_shader, "fs_shadow"),
            MeshVertex::desc(),
            blended.clone(),
            None,
            shadowed_geometry_depth_stencil(),
        );

        let volume_pipelines = |mode: StencilMode| -> Vec<RenderPipeline> {
            stencil_volume_states(mode)
                .into_iter()
                .map(|draw| {
                    Self::create_pipeline(
                        device,
                        draw.label,
                        &layout,
                        (&volume_shader, "fs_main"),
                        ShadowVolumeVertex::desc(),
                        masked.clone(),
                        draw.cull_mode,
                        draw.depth_stencil,
                    )
                })
                .collect()
        };
        let two_sided_pipelines = volume_pipelines(StencilMode::TwoSided);
        let two_pass_pipelines = volume_pipelines(StencilMode::TwoPass);

        let volume_debug_pipeline = Self::create_pipeline(
            device,
            "Shadow Volume Debug Pipeline",
            &layout,
            (&volume_shader, "fs_debug"),
            ShadowVolumeVertex::desc(),
            blended.clone(),
            None,
            DepthStencilState {
                depth_write_enabled: false,
                ..geometry_depth_stencil()
            },
        );

        let diagnostic_pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Stencil Diagnostic Pipeline"),
            layout: Some(&diagnostic_layout),
            vertex: VertexState {
                module: &diagnostic_shader,
                entry_point: "vs_main",
                buffers: &[DiagnosticVertex::desc()],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &diagnostic_shader,
                entry_point: "fs_main",
                targets: &[Some(blended)],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: Self::create_primitive_state(None),
            depth_stencil: Some(diagnostic_depth_stencil()),
            multisample: MultisampleState::default(),
            multiview: None,
        });
        let diagnostic_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Stencil Diagnostic Vertex Buffer"),
            contents: bytemuck::cast_slice(&diagnostic_triangles()),
            usage: BufferUsages::VERTEX,
        });

        log::debug!(
            "shadow pipelines ready: {} two-sided, {} two-pass volume draws",
            two_sided_pipelines.len(),
            two_pass_pipelines.len()
        );

        Self {
            object_layout,
            scene_uniforms,
            geometry_pipeline,
            shadowed_pipeline,
            two_sided_pipelines,
            two_pass_pipelines,
            volume_debug_pipeline,
            diagnostic_pipeline,
            diagnostic_vertex_buffer,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn create_pipeline(
        device: &Device,
        label: &str,
        layout: &PipelineLayout,
        (module, fragment_entry): (&ShaderModule, &str),
        vertex_layout: VertexBufferLayout<'static>,
        target: ColorTargetState,
        cull_mode: Option<Face>,
        depth_stencil: DepthStencilState,
    ) -> RenderPipeline {
        device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: VertexState {
                module,
                entry_point: "vs_main",
                buffers: &[vertex_layout],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module,
                entry_point: fragment_entry,
                targets: &[Some(target)],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: Self::create_primitive_state(cull_mode),
            depth_stencil: Some(depth_stencil),
            multisample: MultisampleState::default(),
            multiview: None,
        })
    }

    fn create_primitive_state(cull_mode: Option<Face>) -> PrimitiveState {
        PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode,
            unclipped_depth: false,
            polygon_mode: PolygonMode::Fill,
            conservative: false,
        }
    }

    /// Layout of group 1, needed to create [`SceneObject`]s and the ground.
    pub fn object_layout(&self) -> &BindGroupLayout {
        &self.object_layout
    }

    fn volume_pipelines(&self, mode: StencilMode) -> &[RenderPipeline] {
        match mode {
            StencilMode::TwoSided => &self.two_sided_pipelines,
            StencilMode::TwoPass => &self.two_pass_pipelines,
        }
    }

    fn begin_pass<'e>(
        encoder: &'e mut CommandEncoder,
        label: &str,
        color_view: &'e TextureView,
        depth_view: &'e TextureView,
        color_load: LoadOp<Color>,
        depth_load: LoadOp<f32>,
        stencil_load: LoadOp<u32>,
    ) -> RenderPass<'e> {
        encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: Operations {
                    load: color_load,
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(Operations {
                    load: depth_load,
                    store: StoreOp::Store,
                }),
                stencil_ops: Some(Operations {
                    load: stencil_load,
                    store: StoreOp::Store,
                }),
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        })
    }

    /// Records one frame: geometry, stencil volumes, shadowed re-draw and,
    /// outside [`DisplayMode::Shaded`], a visualisation pass.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        color_view: &TextureView,
        depth_view: &TextureView,
        params: &FrameParams,
        objects: &[SceneObject],
        ground: Option<&GroundPlane>,
        options: &RenderOptions,
    ) -> Result<FrameStats, PassOrderError> {
        self.scene_uniforms.write(queue, &params.uniforms());

        let frustum = Frustum::from_view_proj(params.view_proj);
        let visible: Vec<&SceneObject> = objects.iter().filter(|o| o.is_visible(&frustum)).collect();
        let casters = with_volume(objects, |o| o.volume_vertex_count);
        let mut stats = FrameStats {
            visible_objects: visible.len(),
            ground_vertices: ground.map_or(0, |g| g.vertex_count),
            ..FrameStats::default()
        };

        let mut frame = ShadowFrame::new();

        frame.advance(ShadowPass::Geometry)?;
        {
            let mut pass = Self::begin_pass(
                encoder,
                "Geometry Pass",
                color_view,
                depth_view,
                LoadOp::Clear(options.clear_color),
                LoadOp::Clear(1.0),
                LoadOp::Clear(0),
            );
            pass.set_pipeline(&self.geometry_pipeline);
            self.draw_receivers(&mut pass, &visible, ground);
        }

        // Volumes are infinite, so even culled casters can shadow the view.
        frame.advance(ShadowPass::Stencil)?;
        {
            let mut pass = Self::begin_pass(
                encoder,
                "Stencil Pass",
                color_view,
                depth_view,
                LoadOp::Load,
                LoadOp::Load,
                LoadOp::Clear(0),
            );
            pass.set_stencil_reference(0);
            pass.set_bind_group(0, &self.scene_uniforms.bind_group, &[]);
            for pipeline in self.volume_pipelines(options.stencil_mode) {
                pass.set_pipeline(pipeline);
                for &object in &casters {
                    Self::draw_volume(&mut pass, object);
                }
                stats.volume_draws += casters.len();
            }
        }

        frame.advance(ShadowPass::ShadowedGeometry)?;
        {
            let mut pass = Self::begin_pass(
                encoder,
                "Shadowed Geometry Pass",
                color_view,
                depth_view,
                LoadOp::Load,
                LoadOp::Load,
                LoadOp::Load,
            );
            pass.set_pipeline(&self.shadowed_pipeline);
            pass.set_stencil_reference(0);
            self.draw_receivers(&mut pass, &visible, ground);
        }

        if options.display_mode != DisplayMode::Shaded {
            frame.advance(ShadowPass::PlaneVisualization)?;
            let mut pass = Self::begin_pass(
                encoder,
                "Shadow Visualization Pass",
                color_view,
                depth_view,
                LoadOp::Load,
                LoadOp::Load,
                LoadOp::Load,
            );
            match options.display_mode {
                DisplayMode::StencilCount => {
                    pass.set_pipeline(&self.diagnostic_pipeline);
                    pass.set_vertex_buffer(0, self.diagnostic_vertex_buffer.slice(..));
                    for n in 1..=MAX_DIAGNOSTIC_COUNT {
                        pass.set_stencil_reference(n);
                        let first = (n - 1) * 3;
                        pass.draw(first..first + 3, 0..1);
                    }
                }
                DisplayMode::ShadowVolumes => {
                    pass.set_pipeline(&self.volume_debug_pipeline);
                    pass.set_bind_group(0, &self.scene_uniforms.bind_group, &[]);
                    for &object in &casters {
                        Self::draw_volume(&mut pass, object);
                    }
                }
                DisplayMode::Shaded => {}
            }
        }

        frame.finish()?;
        log::trace!("shadow frame: {:?}", stats);
        Ok(stats)
    }

    fn draw_receivers<'a>(&'a self, pass: &mut RenderPass<'a>, visible: &[&'a SceneObject], ground: Option<&'a GroundPlane>) {
        pass.set_bind_group(0, &self.scene_uniforms.bind_group, &[]);
        if let Some(ground) = ground {
            ground.draw(pass);
        }
        for &object in visible {
            pass.set_bind_group(1, &object.uniforms.bind_group, &[]);
            object.mesh.draw(pass);
        }
    }

    fn draw_volume<'a>(pass: &mut RenderPass<'a>, object: &'a SceneObject) {
        pass.set_bind_group(1, &object.uniforms.bind_group, &[]);
        pass.set_vertex_buffer(0, object.volume.slice(..));
        pass.draw(0..object.volume_vertex_count, 0..1);
    }
}
