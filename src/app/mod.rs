mod input;
mod timing;

use crate::config::{self, ViewerConfig};
use crate::render::{GpuBackend, GpuError};
use crate::scene::{Scene, SourceRegistry};
use input::{wheel_angle, InputAction, InputState};
use timing::FrameTiming;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::error::EventLoopError;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

pub const USAGE: &str = "usage: seisview [DATASET.json] [--config CONFIG.json]";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Usage(String),
    #[error("event loop error: {0}")]
    EventLoop(#[from] EventLoopError),
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("renderer initialization failed: {0}")]
    Gpu(#[from] GpuError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppOptions {
    pub dataset: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl AppOptions {
    pub fn from_args<I>(args: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| AppError::Usage("--config needs a path".to_string()))?;
                    options.config = Some(PathBuf::from(path));
                }
                flag if flag.starts_with("--") => {
                    return Err(AppError::Usage(format!("unknown option {}", flag)));
                }
                _ if options.dataset.is_some() => {
                    return Err(AppError::Usage(format!("unexpected argument {}", arg)));
                }
                _ => options.dataset = Some(PathBuf::from(arg)),
            }
        }
        Ok(options)
    }
}

pub struct App {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    scene: Option<Scene<GpuBackend>>,
    sources: SourceRegistry,
    input: InputState,
    hover_enabled: bool,
    viewport: PhysicalSize<u32>,
    timing: FrameTiming,
    frame_interval: Duration,
    next_frame_time: Instant,
    dataset: Option<PathBuf>,
    failure: Option<AppError>,
}

impl App {
    fn new(config: ViewerConfig, dataset: Option<PathBuf>) -> Self {
        let frame_interval = Duration::from_millis(config.frame_interval_ms.max(1));
        Self {
            hover_enabled: config.hover_enabled,
            config,
            window: None,
            scene: None,
            sources: SourceRegistry::new(),
            input: InputState::default(),
            viewport: PhysicalSize::new(1280, 720),
            timing: FrameTiming::new("seisview".to_string()),
            frame_interval,
            next_frame_time: Instant::now(),
            dataset,
            failure: None,
        }
    }

    /// Creates the window and its renderer.
    fn open_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window_attrs = WindowAttributes::default()
            .with_title("seisview")
            .with_inner_size(self.viewport)
            .with_resizable(true);
        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let backend = GpuBackend::new(window.clone())?;
        self.viewport = window.inner_size();
        self.scene = Some(Scene::new(backend, &self.config));
        self.window = Some(window);
        Ok(())
    }

    fn load_dataset(&mut self, path: &Path) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let dataset = match config::load_dataset(path) {
            Ok(dataset) => dataset,
            Err(err) => {
                log::warn!("Failed to load dataset {}: {}", path.display(), err);
                return;
            }
        };
        for source in &dataset.sources {
            let loaded = self.sources.load(scene, source);
            log::info!("Source '{}': {} objects", source.name(), loaded);
        }
        log::info!(
            "Loaded {} sources ({} objects) from {}",
            self.sources.len(),
            scene.len(),
            path.display()
        );
        if scene.view_target().is_none() {
            log::info!("Dataset has no terrain; camera orbits the origin");
        }
    }

    fn pick_dataset() -> Option<PathBuf> {
        rfd::FileDialog::new()
            .add_filter("Dataset", &["json"])
            .pick_file()
    }

    fn apply_action(&mut self, action: InputAction, event_loop: &ActiveEventLoop) {
        if action == InputAction::Quit {
            event_loop.exit();
            return;
        }
        if action == InputAction::ToggleHover {
            self.hover_enabled = !self.hover_enabled;
            log::info!(
                "Hover picking {}",
                if self.hover_enabled { "on" } else { "off" }
            );
            return;
        }
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let camera = scene.camera_mut();
        match action {
            InputAction::TopView => camera.reset_to_top_view(),
            InputAction::BottomView => camera.reset_to_bottom_view(),
            InputAction::SideView(side) => camera.reset_to_side_view(side),
            _ => {}
        }
    }

    fn render(&mut self) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let frame_start = Instant::now();
        let width = self.viewport.width.max(1) as f32;
        let height = self.viewport.height.max(1) as f32;

        if self.hover_enabled {
            if let Some((x, y)) = self.input.cursor {
                scene.pick_at(x, y, width, height);
            }
        }
        let report = scene.draw(width, height);

        let render_ms = frame_start.elapsed().as_secs_f32() * 1000.0;
        self.timing.record_frame(&report, render_ms, scene.hovered());
        self.timing
            .update(self.window.as_ref().map(|w| w.as_ref()), frame_start);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.open_window(event_loop) {
            log::error!("{}", err);
            self.failure = Some(err);
            event_loop.exit();
            return;
        }

        let dataset = self.dataset.take().or_else(Self::pick_dataset);
        match dataset {
            Some(path) => self.load_dataset(&path),
            None => log::info!("No dataset selected"),
        }
        self.next_frame_time = Instant::now();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == winit::event::ElementState::Pressed;
                let action = self.input.handle_key(event.physical_key, pressed);
                self.apply_action(action, event_loop);
            }
            WindowEvent::Resized(new_size) => {
                self.viewport = new_size;
                if let Some(scene) = self.scene.as_mut() {
                    scene.backend_mut().resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let drag = self
                    .input
                    .handle_cursor(position.x as f32, position.y as f32);
                if let (Some((dx, dy)), Some(scene)) = (drag, self.scene.as_mut()) {
                    scene.camera_mut().orbit(dx, dy);
                }
            }
            WindowEvent::CursorLeft { .. } => self.input.cursor_left(),
            WindowEvent::MouseInput { state, button, .. } => {
                self.input.handle_button(button, state);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(scene) = self.scene.as_mut() {
                    scene.camera_mut().zoom(wheel_angle(delta));
                }
            }
            WindowEvent::RedrawRequested => self.render(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.frame_interval;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run(options: AppOptions) -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = match &options.config {
        Some(path) => match config::load_config(path) {
            Ok(config) => {
                log::info!("Using config {}", path.display());
                config
            }
            Err(err) => {
                log::warn!("Failed to load config {}: {}; using defaults", path.display(), err);
                ViewerConfig::default()
            }
        },
        None => ViewerConfig::default(),
    };

    log::info!("seisview starting");
    log::info!("   Drag to orbit, wheel to zoom, T/B/1-4 for views, H for hover, ESC to exit");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, options.dataset);
    event_loop.run_app(&mut app)?;
    if let Some(err) = app.failure.take() {
        return Err(err);
    }

    log::info!("seisview closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parses_dataset_and_config() {
        let options =
            AppOptions::from_args(args(&["data.json", "--config", "viewer.json"])).unwrap();
        assert_eq!(options.dataset, Some(PathBuf::from("data.json")));
        assert_eq!(options.config, Some(PathBuf::from("viewer.json")));
        assert_eq!(AppOptions::from_args(args(&[])).unwrap(), AppOptions::default());
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(
            AppOptions::from_args(args(&["--config"])),
            Err(AppError::Usage(_))
        ));
        assert!(matches!(
            AppOptions::from_args(args(&["--fast"])),
            Err(AppError::Usage(_))
        ));
        assert!(matches!(
            AppOptions::from_args(args(&["a.json", "b.json"])),
            Err(AppError::Usage(_))
        ));
    }
}
