use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Vec3, Vec4};
use pollster::FutureExt;
use winit::{
    event::{MouseButton, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::PhysicalKey,
    window::{Fullscreen, Window},
};

use crate::camera::Camera;
use crate::engine::math::{rotation3_axis, rotation_x, rotation_y, Orientation, Plane};
use crate::engine::mesh::Mesh;
use crate::engine::renderer::shadow::{FrameStats, RenderOptions};
use crate::engine::renderer::{FrameParams, GroundPlane, SceneObject, ShadowRenderer, WgpuRenderer};
use crate::engine::shadow_volume::{ShadowVolumeCache, ShadowVolumeMesh};
use crate::engine::stencil::{DisplayMode, StencilMode};
use crate::game_loop::GameLoop;
use crate::input::{Command, InputState};
use crate::resource_path;
use crate::settings::Settings;

/// Extents at or above this are drawn as infinite volumes.
pub const MAX_SHADOW_EXTENT: f32 = 100.0;
pub const MIN_SHADOW_EXTENT: f32 = 1.0;
const EXTENT_SPEED: f32 = 20.0;
const ZOOM_SPEED: f32 = 1.5;
const ORBIT_SENSITIVITY: f32 = 0.005;
const LIGHT_SPEED: f32 = 0.6;

/// Everything the keyboard can change, kept apart from the GPU so it can
/// be driven without a window.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoState {
    pub display_mode: DisplayMode,
    pub stencil_mode: StencilMode,
    pub light_moving: bool,
    pub show_ground: bool,
    pub shadow_extent: f32,
    pub light_angle: f32,
    pub spin: f32,
}

impl Default for DemoState {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::Shaded,
            stencil_mode: StencilMode::TwoSided,
            light_moving: true,
            show_ground: true,
            shadow_extent: MAX_SHADOW_EXTENT,
            light_angle: 0.0,
            spin: 0.0,
        }
    }
}

impl DemoState {
    /// Applies a command; returns `false` when the demo should quit.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::CycleDisplayMode => self.display_mode = self.display_mode.next(),
            Command::ToggleLightMotion => self.light_moving = !self.light_moving,
            Command::ToggleGround => self.show_ground = !self.show_ground,
            Command::ToggleStencilMode => self.stencil_mode = self.stencil_mode.toggle(),
            Command::Quit => return false,
        }
        log::info!(
            "display {:?}, stencil {:?}, light moving {}, ground {}",
            self.display_mode,
            self.stencil_mode,
            self.light_moving,
            self.show_ground
        );
        true
    }

    pub fn step(&mut self, dt: f32, extent_axis: f32) {
        if self.light_moving {
            self.light_angle = (self.light_angle + LIGHT_SPEED * dt).rem_euclid(std::f32::consts::TAU);
        }
        self.spin = (self.spin + dt).rem_euclid(std::f32::consts::TAU);
        self.shadow_extent =
            (self.shadow_extent + extent_axis * EXTENT_SPEED * dt).clamp(MIN_SHADOW_EXTENT, MAX_SHADOW_EXTENT);
    }

    pub fn light_position(&self) -> Vec3 {
        let (s, c) = self.light_angle.sin_cos();
        Vec3::new(7.0 * c, 9.0, 7.0 * s)
    }

    /// Extent as the volume shader takes it: 0 extrudes to infinity.
    pub fn shader_extent(&self) -> f32 {
        if self.shadow_extent >= MAX_SHADOW_EXTENT {
            0.0
        } else {
            self.shadow_extent
        }
    }
}

/// Mesh, scale, placement and colour of one shadow caster.
struct Caster {
    mesh: Mesh,
    scale: f32,
    placement: Orientation,
    color: Vec4,
    spins: bool,
}

fn default_casters(settings: &Settings) -> Vec<Caster> {
    let mut casters = vec![
        Caster {
            mesh: Mesh::torus(1.2, 0.4, 32, 16),
            scale: 1.0,
            placement: Orientation::at(Vec3::new(0.0, 2.5, 0.0)),
            color: Vec4::new(0.85, 0.35, 0.3, 1.0),
            spins: true,
        },
        Caster {
            mesh: Mesh::cube(),
            scale: 1.0,
            placement: Orientation::at(Vec3::new(-4.0, 1.0, 2.0)).rotated(rotation3_axis(Vec3::Y, 0.6)),
            color: Vec4::new(0.3, 0.55, 0.85, 1.0),
            spins: false,
        },
        Caster {
            mesh: Mesh::icosahedron(),
            scale: 1.2,
            placement: Orientation::at(Vec3::new(3.5, 1.5, -2.5)).rotated(rotation3_axis(Vec3::new(1.0, 0.0, 1.0), 0.4)),
            color: Vec4::new(0.9, 0.8, 0.35, 1.0),
            spins: false,
        },
    ];

    if let Some(name) = &settings.mesh {
        let loaded = resource_path::find_mesh(name)
            .ok_or_else(|| format!("{} not found", name.display()))
            .and_then(|path| Mesh::load_obj(&path).map_err(|e| e.to_string()));
        match loaded {
            Ok(mesh) => casters.push(Caster {
                mesh,
                scale: 1.0,
                placement: Orientation::at(Vec3::new(0.0, 1.0, 5.0)),
                color: Vec4::new(0.7, 0.7, 0.75, 1.0),
                spins: false,
            }),
            Err(e) => log::error!("cannot load mesh {}: {}", name.display(), e),
        }
    }
    casters
}

pub struct App {
    pub window: Arc<Window>,
    pub renderer: WgpuRenderer,
    pub input: InputState,
    pub camera: Camera,
    pub state: DemoState,
    shadow_renderer: ShadowRenderer,
    objects: Vec<SceneObject>,
    spinning: Vec<(usize, Orientation)>,
    ground: GroundPlane,
    game_loop: GameLoop,
    last_frame: Instant,
    show_info: bool,
    info_timer: Duration,
    frames: u32,
    last_stats: FrameStats,
}

impl App {
    pub fn new(event_loop: &ActiveEventLoop, settings: &Settings) -> Result<Self, String> {
        let mut window_attributes = Window::default_attributes()
            .with_title("bizsdk shadow volumes")
            .with_inner_size(winit::dpi::LogicalSize::new(settings.width, settings.height))
            .with_resizable(settings.resizable);
        if settings.fullscreen {
            window_attributes = window_attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .map_err(|e| format!("Failed to create window: {:?}", e))?,
        );

        let renderer = WgpuRenderer::new(window.clone(), settings.vsync).block_on()?;
        let shadow_renderer = ShadowRenderer::new(&renderer.device, renderer.surface_config.format);

        let cache = ShadowVolumeCache::new(resource_path::cache_dir(&settings.cache));
        let mut objects = Vec::new();
        let mut spinning = Vec::new();
        for caster in default_casters(settings) {
            let volume_builder = ShadowVolumeMesh::new(&caster.mesh, caster.scale);
            let volume = match volume_builder.load_or_build(&cache) {
                Ok(volume) => volume,
                Err(e) => {
                    log::warn!("shadow volume cache unavailable for '{}': {}", caster.mesh.name(), e);
                    volume_builder.build()
                }
            };
            if caster.spins {
                spinning.push((objects.len(), caster.placement));
            }
            objects.push(SceneObject::new(
                &renderer.device,
                shadow_renderer.object_layout(),
                &caster.mesh,
                caster.scale,
                &volume,
                caster.placement.to_mat4(),
                caster.color,
            ));
        }
        log::info!("scene ready with {} shadow casters", objects.len());

        let camera = Camera::new();
        let ground = GroundPlane::new(
            &renderer.device,
            shadow_renderer.object_layout(),
            Plane::ground(0.0),
            camera.far,
        );

        Ok(Self {
            window,
            renderer,
            input: InputState::new(),
            camera,
            state: DemoState::default(),
            shadow_renderer,
            objects,
            spinning,
            ground,
            game_loop: GameLoop::default(),
            last_frame: Instant::now(),
            show_info: settings.showinfo,
            info_timer: Duration::ZERO,
            frames: 0,
            last_stats: FrameStats::default(),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.renderer.resize(new_size);
    }

    pub fn handle_input(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    if event.state.is_pressed() {
                        if !event.repeat {
                            self.input.handle_key_press(keycode);
                        }
                    } else {
                        self.input.handle_key_release(keycode);
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if *button == MouseButton::Left {
                    if state.is_pressed() {
                        self.input.handle_mouse_button_press();
                    } else {
                        self.input.handle_mouse_button_release();
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input.update_mouse_position(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.input.handle_wheel(*delta);
            }
            _ => {}
        }
    }

    /// Consumes queued input and advances the animation; returns `false`
    /// once the user asked to quit.
    pub fn update(&mut self) -> bool {
        for command in self.input.take_commands() {
            if !self.state.apply(command) {
                return false;
            }
        }

        let (dx, dy) = self.input.take_drag();
        self.camera.orbit(-dx * ORBIT_SENSITIVITY, dy * ORBIT_SENSITIVITY);
        let wheel = self.input.take_wheel();
        if wheel != 0.0 {
            self.camera.zoom(0.9f32.powf(wheel));
        }

        let extent_axis = InputState::axis(self.input.extent_down, self.input.extent_up);
        let zoom_axis = InputState::axis(self.input.zoom_in, self.input.zoom_out);
        let state = &mut self.state;
        let camera = &mut self.camera;
        self.game_loop.tick(|dt| {
            state.step(dt, extent_axis);
            if zoom_axis != 0.0 {
                camera.zoom(ZOOM_SPEED.powf(zoom_axis * dt));
            }
        });

        let spin = self.state.spin;
        for &(index, placement) in &self.spinning {
            if let Some(object) = self.objects.get_mut(index) {
                let transform = placement.to_mat4() * rotation_y(spin) * rotation_x(0.5 * spin);
                object.set_transform(&self.renderer.queue, transform);
            }
        }
        true
    }

    pub fn render(&mut self) {
        let Some(frame) = self.renderer.begin_frame() else {
            return;
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let aspect = self.renderer.aspect();
        let eye = self.camera.eye();
        let view_proj = self.camera.view_proj(aspect);
        if self.state.show_ground {
            self.ground
                .update(&self.renderer.queue, self.camera.inv_view_proj(aspect), eye);
        }

        let params = FrameParams {
            view_proj,
            eye,
            light_pos: self.state.light_position(),
            ambient: 0.25,
            shadow_extent: self.state.shader_extent(),
            shadow_alpha: 0.55,
        };
        let options = RenderOptions {
            stencil_mode: self.state.stencil_mode,
            display_mode: self.state.display_mode,
            ..RenderOptions::default()
        };

        let mut encoder = self
            .renderer
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Shadow Frame Encoder"),
            });
        let ground = self.state.show_ground.then_some(&self.ground);
        match self.shadow_renderer.render(
            &self.renderer.queue,
            &mut encoder,
            &view,
            self.renderer.depth_view(),
            &params,
            &self.objects,
            ground,
            &options,
        ) {
            Ok(stats) => self.last_stats = stats,
            Err(e) => log::error!("shadow frame aborted: {}", e),
        }
        self.renderer.queue.submit(std::iter::once(encoder.finish()));
        self.renderer.end_frame(frame);

        self.report_info();
    }

    fn report_info(&mut self) {
        let now = Instant::now();
        self.info_timer += now.duration_since(self.last_frame);
        self.last_frame = now;
        self.frames += 1;
        if !self.show_info || self.info_timer < Duration::from_secs(1) {
            return;
        }
        let fps = self.frames as f32 / self.info_timer.as_secs_f32();
        let title = format!(
            "bizsdk shadow volumes | {:.0} fps | {:?} | {:?} | {} visible, {} volume draws, ground {} verts",
            fps,
            self.state.display_mode,
            self.state.stencil_mode,
            self.last_stats.visible_objects,
            self.last_stats.volume_draws,
            self.last_stats.ground_vertices
        );
        self.window.set_title(&title);
        log::debug!("{}", title);
        self.info_timer = Duration::ZERO;
        self.frames = 0;
    }
}
