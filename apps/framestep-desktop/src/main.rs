use anyhow::{Context, Result};
use clap::Parser;
use framestep_input::{Action, InputState};
use framestep_render_wgpu::WgpuBackend;
use framestep_scene::{FrameControl, SceneConfig, SceneDriver};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "framestep-desktop", about = "Run the framestep sample scene in a window")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene description (JSON); the built-in sample scene when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding Textures/ and Models/
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Window title
    #[arg(long)]
    title: Option<String>,

    /// Initial client width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Initial client height in pixels
    #[arg(long)]
    height: Option<u32>,
}

impl Cli {
    fn scene_config(&self) -> Result<SceneConfig> {
        let mut config = match &self.config {
            Some(path) => SceneConfig::load(path)
                .with_context(|| format!("loading scene config {}", path.display()))?,
            None => SceneConfig::default(),
        };
        if let Some(assets) = &self.assets {
            config.asset_root = assets.clone();
        }
        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        Ok(config)
    }
}

fn key_action(key: KeyCode) -> Option<Action> {
    match key {
        KeyCode::KeyW => Some(Action::MoveForward),
        KeyCode::KeyS => Some(Action::MoveBackward),
        KeyCode::KeyA => Some(Action::StrafeLeft),
        KeyCode::KeyD => Some(Action::StrafeRight),
        KeyCode::Space => Some(Action::Ascend),
        KeyCode::KeyX => Some(Action::Descend),
        KeyCode::Escape => Some(Action::Quit),
        _ => None,
    }
}

/// Everything that exists only once the window and device are up.
struct Running {
    window: Arc<Window>,
    backend: WgpuBackend,
    driver: SceneDriver,
}

struct GpuApp {
    config: Option<SceneConfig>,
    running: Option<Running>,
    input: InputState,
    last_frame: Instant,
}

impl GpuApp {
    fn new(config: SceneConfig) -> Self {
        Self {
            config: Some(config),
            running: None,
            input: InputState::new(),
            last_frame: Instant::now(),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop, config: SceneConfig) -> Result<Running> {
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width.max(1), config.height.max(1)));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no compatible graphics adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("framestep_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            format = ?surface_format,
            "GPU initialized"
        );

        let mut backend = WgpuBackend::new(device, queue, surface, surface_config)?;
        let mut driver = SceneDriver::load(config, &mut backend)?;
        // The window manager may not honor the requested size.
        driver.on_resize(size.width, size.height, &mut backend);

        Ok(Running {
            window,
            backend,
            driver,
        })
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(running) = self.running.take() {
            let Running {
                mut backend,
                driver,
                ..
            } = running;
            driver.teardown(&mut backend);
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(config) = self.config.take() else {
            return;
        };
        match self.start(event_loop, config) {
            Ok(running) => {
                self.last_frame = Instant::now();
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(e) => {
                tracing::error!("startup failed: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(new_size) => {
                if let Some(running) = &mut self.running {
                    running
                        .driver
                        .on_resize(new_size.width, new_size.height, &mut running.backend);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                if let Some(action) = key_action(key) {
                    self.input.set(action, key_state == ElementState::Pressed);
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: btn_state,
                ..
            } => {
                self.input
                    .set_look_button(btn_state == ElementState::Pressed);
            }
            WindowEvent::Focused(false) => {
                self.input.clear();
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.last_frame).as_secs_f32().min(0.1);
                self.last_frame = now;

                let snapshot = self.input.snapshot();
                let Some(running) = &mut self.running else {
                    return;
                };
                match running.driver.frame(&snapshot, dt, &mut running.backend) {
                    Ok(FrameControl::Continue) => running.window.request_redraw(),
                    Ok(FrameControl::Quit) => self.shutdown(event_loop),
                    Err(e) => {
                        tracing::error!("frame failed: {e}");
                        self.shutdown(event_loop);
                    }
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.add_mouse_motion(delta.0 as f32, delta.1 as f32);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            running.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = cli.scene_config()?;
    tracing::info!(title = %config.title, "framestep-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_keys_map_to_actions() {
        assert_eq!(key_action(KeyCode::KeyW), Some(Action::MoveForward));
        assert_eq!(key_action(KeyCode::KeyX), Some(Action::Descend));
        assert_eq!(key_action(KeyCode::Escape), Some(Action::Quit));
        assert_eq!(key_action(KeyCode::KeyQ), None);
    }

    #[test]
    fn cli_overrides_scene_defaults() {
        let cli = Cli::parse_from([
            "framestep-desktop",
            "--width",
            "640",
            "--title",
            "demo",
            "--assets",
            "/tmp/assets",
        ]);
        let config = cli.scene_config().unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 720);
        assert_eq!(config.title, "demo");
        assert_eq!(config.asset_root, PathBuf::from("/tmp/assets"));
    }
}
