// Renderer module for Anilamp

use crate::error::{Error, Result};
use crate::math::Transform;
use crate::room;
use crate::scene::{DrawTarget, LightId, ModelId};
use crate::world::World;
use glam::{Mat4, Vec3};
use std::sync::Arc;
use std::time::Instant;
use wgpu::util::DeviceExt;
use wgpu::{Adapter, Buffer, RenderPipeline};
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_INSTANCES: usize = 256;

const BULB_COLOR: [f32; 3] = [1.0, 0.95, 0.7];
const BULB_SCALE: f32 = 0.3;
/// Cosine of the spotlight's half angle.
const SPOT_CUTOFF: f32 = 0.9;

const ORBIT_SPEED: f32 = 1.2;
const ZOOM_SPEED: f32 = 8.0;
const INTENSITY_STEP: f32 = 0.1;

pub struct Renderer {
    adapter: Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    window: Arc<winit::window::Window>,
    pipeline: RenderPipeline,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    instance_buffer: Buffer,
    instance_capacity: usize,
    uniform_buffer: Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    camera: OrbitCamera,
    lighting: Lighting,
    started: Instant,
    last_frame: Instant,
    keys_pressed: KeyboardState,
    shown_state: &'static str,
    world: World,
}

#[derive(Default)]
struct KeyboardState {
    w: bool,
    a: bool,
    s: bool,
    d: bool,
}

/// Camera circling the room's vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrbitCamera {
    target: Vec3,
    yaw: f32,
    distance: f32,
    height: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 6.0, -4.0),
            yaw: 0.0,
            distance: 24.0,
            height: 5.0,
        }
    }
}

impl OrbitCamera {
    const MIN_DISTANCE: f32 = 8.0;
    const MAX_DISTANCE: f32 = 40.0;

    fn eye(&self) -> Vec3 {
        self.target
            + Vec3::new(
                self.distance * self.yaw.sin(),
                self.height,
                self.distance * self.yaw.cos(),
            )
    }

    fn orbit(&mut self, radians: f32) {
        self.yaw = (self.yaw + radians).rem_euclid(std::f32::consts::TAU);
    }

    fn zoom(&mut self, amount: f32) {
        self.distance = (self.distance - amount).clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
    }

    fn view_proj(&self, aspect_ratio: f32) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        let projection = Mat4::perspective_rh(45.0_f32.to_radians(), aspect_ratio, 0.1, 100.0);
        projection * view
    }
}

/// The world light dimmer and the lamp's on/off switch.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Lighting {
    world_intensity: f32,
    spotlight_on: bool,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            world_intensity: 1.0,
            spotlight_on: true,
        }
    }
}

impl Lighting {
    fn adjust(&mut self, delta: f32) {
        self.world_intensity = (self.world_intensity + delta).clamp(0.0, 1.0);
        log::info!("world light intensity {:.1}", self.world_intensity);
    }

    fn toggle_spotlight(&mut self) {
        self.spotlight_on = !self.spotlight_on;
        log::info!("spotlight {}", if self.spotlight_on { "on" } else { "off" });
    }

    fn spot_intensity(&self) -> f32 {
        if self.spotlight_on {
            1.0
        } else {
            0.0
        }
    }

    /// A switched-off bulb still shows, just dimmer.
    fn bulb_glow(&self) -> f32 {
        if self.spotlight_on {
            1.0
        } else {
            0.5
        }
    }
}

// Define Vertex struct for vertex data
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

/// Per-instance model matrix and colour.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceRaw {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

impl InstanceRaw {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
    ];

    fn new(model: Mat4, color: [f32; 3], alpha: f32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: [color[0], color[1], color[2], alpha],
        }
    }

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// Uniform buffer structure shared by both shader stages
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    /// xyz position, w intensity.
    world_light: [f32; 4],
    /// xyz position, w intensity.
    spot_pos: [f32; 4],
    /// xyz direction, w cutoff cosine.
    spot_dir: [f32; 4],
}

impl Uniforms {
    fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0; 4],
            world_light: [0.0; 4],
            spot_pos: [0.0; 4],
            spot_dir: [0.0, -1.0, 0.0, SPOT_CUTOFF],
        }
    }
}

/// One frame's worth of cube instances collected from a scene traversal.
///
/// Transparent models are kept apart and appended after the opaque ones.
pub struct FrameBatch {
    opaque: Vec<InstanceRaw>,
    transparent: Vec<InstanceRaw>,
    spot_position: Vec3,
    spot_direction: Vec3,
    bulb_glow: f32,
}

impl FrameBatch {
    fn new(bulb_glow: f32) -> Self {
        Self {
            opaque: Vec::new(),
            transparent: Vec::new(),
            spot_position: Vec3::ZERO,
            spot_direction: Vec3::NEG_Y,
            bulb_glow,
        }
    }

    fn into_instances(mut self) -> Vec<InstanceRaw> {
        self.opaque.append(&mut self.transparent);
        self.opaque
    }
}

impl DrawTarget for FrameBatch {
    fn draw_model(&mut self, model: ModelId, world: Transform) {
        let material = room::material(model);
        let instance = InstanceRaw::new(world.matrix(), material.color, material.alpha);
        if material.is_transparent() {
            self.transparent.push(instance);
        } else {
            self.opaque.push(instance);
        }
    }

    fn set_light_position(&mut self, _light: LightId, position: Vec3) {
        self.spot_position = position;
    }

    fn set_light_direction(&mut self, _light: LightId, direction: Vec3) {
        let direction = direction.normalize_or_zero();
        if direction != Vec3::ZERO {
            self.spot_direction = direction;
        }
    }

    fn draw_light(&mut self, _light: LightId, world: Transform) {
        let model = world.matrix() * Mat4::from_scale(Vec3::splat(BULB_SCALE));
        let color = BULB_COLOR.map(|c| c * self.bulb_glow);
        self.opaque.push(InstanceRaw::new(model, color, 1.0));
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl Renderer {
    pub async fn new(event_loop: &EventLoop<()>, world: World) -> Result<Self> {
        // Create window with Arc for shared ownership
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("Anilamp")
                .with_inner_size(LogicalSize::new(1280.0, 800.0))
                .build(event_loop)?,
        );

        // Initialize wgpu
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        // Get surface from window
        let surface = instance.create_surface(window.clone())?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(Error::Adapter)?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Renderer Device"),
                    required_features: wgpu::Features::default(),
                    required_limits: wgpu::Limits::default(),
                },
                None, // Trace path
            )
            .await?;

        // Get surface capabilities
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        // Configure surface
        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        let depth_view = create_depth_view(&device, &surface_config);

        // Load shader
        let shader_code = include_str!("shader.wgsl");
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_code.into()),
        });

        // Define vertex buffer layout
        let vertex_buffer_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        };

        // Create bind group layout for uniforms
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // Create render pipeline
        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: "vs_main",
                buffers: &[vertex_buffer_layout, InstanceRaw::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        // Unit cube, one normal per face
        let vertices = [
            // Front face
            Vertex { position: [-0.5, -0.5,  0.5], normal: [0.0, 0.0, 1.0] },
            Vertex { position: [ 0.5, -0.5,  0.5], normal: [0.0, 0.0, 1.0] },
            Vertex { position: [ 0.5,  0.5,  0.5], normal: [0.0, 0.0, 1.0] },
            Vertex { position: [-0.5,  0.5,  0.5], normal: [0.0, 0.0, 1.0] },

            // Back face
            Vertex { position: [-0.5, -0.5, -0.5], normal: [0.0, 0.0, -1.0] },
            Vertex { position: [-0.5,  0.5, -0.5], normal: [0.0, 0.0, -1.0] },
            Vertex { position: [ 0.5,  0.5, -0.5], normal: [0.0, 0.0, -1.0] },
            Vertex { position: [ 0.5, -0.5, -0.5], normal: [0.0, 0.0, -1.0] },

            // Top face
            Vertex { position: [-0.5,  0.5, -0.5], normal: [0.0, 1.0, 0.0] },
            Vertex { position: [-0.5,  0.5,  0.5], normal: [0.0, 1.0, 0.0] },
            Vertex { position: [ 0.5,  0.5,  0.5], normal: [0.0, 1.0, 0.0] },
            Vertex { position: [ 0.5,  0.5, -0.5], normal: [0.0, 1.0, 0.0] },

            // Bottom face
            Vertex { position: [-0.5, -0.5, -0.5], normal: [0.0, -1.0, 0.0] },
            Vertex { position: [ 0.5, -0.5, -0.5], normal: [0.0, -1.0, 0.0] },
            Vertex { position: [ 0.5, -0.5,  0.5], normal: [0.0, -1.0, 0.0] },
            Vertex { position: [-0.5, -0.5,  0.5], normal: [0.0, -1.0, 0.0] },

            // Right face
            Vertex { position: [ 0.5, -0.5, -0.5], normal: [1.0, 0.0, 0.0] },
            Vertex { position: [ 0.5,  0.5, -0.5], normal: [1.0, 0.0, 0.0] },
            Vertex { position: [ 0.5,  0.5,  0.5], normal: [1.0, 0.0, 0.0] },
            Vertex { position: [ 0.5, -0.5,  0.5], normal: [1.0, 0.0, 0.0] },

            // Left face
            Vertex { position: [-0.5, -0.5, -0.5], normal: [-1.0, 0.0, 0.0] },
            Vertex { position: [-0.5, -0.5,  0.5], normal: [-1.0, 0.0, 0.0] },
            Vertex { position: [-0.5,  0.5,  0.5], normal: [-1.0, 0.0, 0.0] },
            Vertex { position: [-0.5,  0.5, -0.5], normal: [-1.0, 0.0, 0.0] },
        ];

        #[rustfmt::skip]
        let indices: &[u16] = &[
            0,  1,  2,  2,  3,  0,  // front
            4,  5,  6,  6,  7,  4,  // back
            8,  9,  10, 10, 11, 8,  // top
            12, 13, 14, 14, 15, 12, // bottom
            16, 17, 18, 18, 19, 16, // right
            20, 21, 22, 22, 23, 20, // left
        ];

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let instance_buffer = create_instance_buffer(&device, INITIAL_INSTANCES);

        // Create uniform buffer
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // Create bind group
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            adapter,
            device,
            queue,
            surface,
            surface_config,
            window,
            pipeline,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            instance_capacity: INITIAL_INSTANCES,
            uniform_buffer,
            uniform_bind_group,
            depth_view,
            camera: OrbitCamera::default(),
            lighting: Lighting::default(),
            started: Instant::now(),
            last_frame: Instant::now(),
            keys_pressed: KeyboardState::default(),
            shown_state: "",
            world,
        })
    }

    pub fn run(mut self, event_loop: EventLoop<()>) -> Result<()> {
        event_loop.run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent {
                    window_id,
                    event: WindowEvent::CloseRequested,
                } if window_id == self.window.id() => {
                    target.exit();
                }
                Event::WindowEvent {
                    event: WindowEvent::Resized(physical_size),
                    window_id,
                } if window_id == self.window.id() => {
                    self.resize(physical_size);
                }
                Event::AboutToWait => {
                    self.window.request_redraw();
                }
                Event::WindowEvent {
                    event: WindowEvent::RedrawRequested,
                    window_id,
                } if window_id == self.window.id() => match self.update_and_render() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        self.resize(self.window.inner_size());
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("out of GPU memory, exiting");
                        target.exit();
                    }
                    Err(err) => log::warn!("dropped frame: {err}"),
                },
                Event::WindowEvent {
                    event: WindowEvent::KeyboardInput { event, .. },
                    window_id,
                } if window_id == self.window.id() => {
                    self.handle_keyboard_input(event);
                }
                _ => {}
            }
        })?;
        Ok(())
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        let surface_caps = self.surface.get_capabilities(&self.adapter);
        self.surface_config.width = new_size.width;
        self.surface_config.height = new_size.height;
        self.surface_config.present_mode = surface_caps.present_modes[0];
        self.surface_config.alpha_mode = surface_caps.alpha_modes[0];
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    fn handle_keyboard_input(&mut self, event: KeyEvent) {
        let PhysicalKey::Code(keycode) = event.physical_key else {
            return;
        };
        let is_pressed = event.state == ElementState::Pressed;
        match keycode {
            KeyCode::KeyW => self.keys_pressed.w = is_pressed,
            KeyCode::KeyA => self.keys_pressed.a = is_pressed,
            KeyCode::KeyS => self.keys_pressed.s = is_pressed,
            KeyCode::KeyD => self.keys_pressed.d = is_pressed,
            _ if !is_pressed || event.repeat => {}
            KeyCode::Digit1 | KeyCode::KeyR => self.world.controls().request_random_pose(),
            KeyCode::Digit2 | KeyCode::KeyE => self.world.controls().request_reset(),
            KeyCode::Digit3 | KeyCode::Space => self.world.controls().request_jump(),
            KeyCode::KeyL => self.lighting.toggle_spotlight(),
            KeyCode::Equal | KeyCode::NumpadAdd => self.lighting.adjust(INTENSITY_STEP),
            KeyCode::Minus | KeyCode::NumpadSubtract => self.lighting.adjust(-INTENSITY_STEP),
            _ => {}
        }
    }

    fn update_camera(&mut self, dt: f32) {
        let keys = &self.keys_pressed;
        let orbit = (keys.d as i32 - keys.a as i32) as f32;
        let zoom = (keys.w as i32 - keys.s as i32) as f32;
        self.camera.orbit(orbit * ORBIT_SPEED * dt);
        self.camera.zoom(zoom * ZOOM_SPEED * dt);
    }

    fn update_and_render(&mut self) -> std::result::Result<(), wgpu::SurfaceError> {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.update_camera(dt);
        self.world.update(now);

        let label = self.world.animator().state().label();
        if label != self.shown_state {
            self.window.set_title(&format!("Anilamp ({label})"));
            self.shown_state = label;
        }

        let mut batch = FrameBatch::new(self.lighting.bulb_glow());
        self.world.draw(&mut batch);

        let aspect_ratio = self.surface_config.width as f32 / self.surface_config.height as f32;
        let seconds = now.saturating_duration_since(self.started).as_secs_f32();
        let light = self.world.layout().world_light_position(seconds);
        let eye = self.camera.eye();
        let uniforms = Uniforms {
            view_proj: self.camera.view_proj(aspect_ratio).to_cols_array_2d(),
            camera_pos: eye.extend(1.0).to_array(),
            world_light: light.extend(self.lighting.world_intensity).to_array(),
            spot_pos: batch.spot_position.extend(self.lighting.spot_intensity()).to_array(),
            spot_dir: batch.spot_direction.extend(SPOT_CUTOFF).to_array(),
        };
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let instances = batch.into_instances();
        self.upload_instances(&instances);
        self.render(instances.len() as u32)
    }

    fn upload_instances(&mut self, instances: &[InstanceRaw]) {
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buffer = create_instance_buffer(&self.device, self.instance_capacity);
            log::debug!("instance buffer grown to {}", self.instance_capacity);
        }
        self.queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(instances));
    }

    fn render(&mut self, instance_count: u32) -> std::result::Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.2,
                            b: 0.3,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..36, 0, 0..instance_count);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
