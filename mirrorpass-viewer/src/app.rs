//! Window, input and frame loop.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use mirrorpass_gpu_shared::scene_format::SceneDescription;
use mirrorpass_render::{Camera, CameraMovement, FrameContext, Projection, RenderError, Scene};
use mirrorpass_wgpu::WGPUBackendState;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

/// Frame deltas above this are clamped so a stall does not teleport the camera.
const MAX_FRAME_DELTA: f32 = 0.1;

/// W/A/S/D state. Movement is applied once per frame, scaled by the delta.
#[derive(Debug, Default, Clone, Copy)]
struct MovementKeys {
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
}

impl MovementKeys {
    /// Returns false for keys that do not move the camera.
    fn handle_key(&mut self, code: KeyCode, pressed: bool) -> bool {
        match code {
            KeyCode::KeyW => self.forward = pressed,
            KeyCode::KeyS => self.backward = pressed,
            KeyCode::KeyA => self.left = pressed,
            KeyCode::KeyD => self.right = pressed,
            _ => return false,
        }
        true
    }

    fn held(&self) -> impl Iterator<Item = CameraMovement> {
        [
            (self.forward, CameraMovement::Forward),
            (self.backward, CameraMovement::Backward),
            (self.left, CameraMovement::Left),
            (self.right, CameraMovement::Right),
        ]
        .into_iter()
        .filter_map(|(held, movement)| held.then_some(movement))
    }
}

pub struct Viewer {
    description: SceneDescription,
    scene: Scene,
    camera: Camera,
    projection: Projection,
    window: Option<Arc<Window>>,
    backend: Option<WGPUBackendState>,
    keys: MovementKeys,
    /// Accumulated raw mouse motion, fed to the camera as a cursor position.
    cursor: (f64, f64),
    last_frame: Option<Instant>,
    error: Option<anyhow::Error>,
}

impl Viewer {
    /// Load every mesh and texture up front; failures abort before a window opens.
    pub fn new(description: SceneDescription) -> Result<Self, RenderError> {
        let scene = Scene::from_description(&description)?;

        let camera = Camera::from_description(&description.camera);
        let projection = Projection::from_description(
            &description.camera,
            description.window.width,
            description.window.height,
        );

        Ok(Self {
            description,
            scene,
            camera,
            projection,
            window: None,
            backend: None,
            keys: MovementKeys::default(),
            cursor: (0.0, 0.0),
            last_frame: None,
            error: None,
        })
    }

    /// The fatal error that stopped the loop, if any.
    pub fn into_result(self) -> anyhow::Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.description.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.description.window.width,
                self.description.window.height,
            ));
        let window = Arc::new(event_loop.create_window(attrs).context("creating window")?);

        let size = window.inner_size();
        let backend = WGPUBackendState::new(Arc::clone(&window), size.width, size.height, &self.scene)
            .context("initializing GPU backend")?;
        self.projection.resize(backend.width, backend.height);

        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Confined)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
        if let Err(err) = grabbed {
            log::warn!("Cursor capture unavailable: {err}");
        }
        window.set_cursor_visible(false);

        window.request_redraw();
        self.window = Some(window);
        self.backend = Some(backend);
        Ok(())
    }

    fn redraw(&mut self) -> anyhow::Result<()> {
        let now = Instant::now();
        let delta = self
            .last_frame
            .map(|last| now.duration_since(last).as_secs_f32().min(MAX_FRAME_DELTA))
            .unwrap_or(0.0);
        self.last_frame = Some(now);

        for movement in self.keys.held() {
            self.camera.advance(movement, delta);
        }

        let Some(backend) = &mut self.backend else {
            return Ok(());
        };
        let frame = FrameContext::new(
            &self.camera,
            &self.projection,
            &self.scene.lights,
            backend.width,
            backend.height,
        );
        backend
            .render_frame(&frame, &self.description.ssr, &self.description.composite)
            .context("rendering frame")?;

        if let Some(window) = &self.window {
            window.request_redraw();
        }
        Ok(())
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.backend.is_some() {
            return;
        }
        log::info!("Creating window and GPU backend");
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                if code == KeyCode::Escape && pressed {
                    log::info!("Escape pressed, exiting");
                    event_loop.exit();
                } else {
                    self.keys.handle_key(code, pressed);
                }
            }
            WindowEvent::Resized(size) => {
                let Some(backend) = &mut self.backend else {
                    return;
                };
                if size.width == 0 || size.height == 0 {
                    return;
                }
                let resized = backend
                    .resize(size.width, size.height)
                    .context("recreating render targets");
                match resized {
                    Ok(()) => self.projection.resize(size.width, size.height),
                    Err(err) => self.fail(event_loop, err),
                }
            }
            WindowEvent::Focused(false) => {
                self.keys = MovementKeys::default();
                self.camera.reset_cursor();
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.cursor.0 += dx;
            self.cursor.1 += dy;
            self.camera.rotate(self.cursor.0, self.cursor.1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wasd_maps_to_camera_movement() {
        let mut keys = MovementKeys::default();
        assert!(keys.handle_key(KeyCode::KeyW, true));
        assert!(keys.handle_key(KeyCode::KeyD, true));
        assert!(!keys.handle_key(KeyCode::KeyQ, true));
        let held: Vec<_> = keys.held().collect();
        assert_eq!(held, vec![CameraMovement::Forward, CameraMovement::Right]);

        keys.handle_key(KeyCode::KeyW, false);
        let held: Vec<_> = keys.held().collect();
        assert_eq!(held, vec![CameraMovement::Right]);
    }

    #[test]
    fn test_viewer_loads_builtin_only_scene() {
        let description =
            SceneDescription::from_toml_str(include_str!("../../scenes/showcase.toml")).unwrap();
        let viewer = Viewer::new(description).unwrap();
        assert_eq!(viewer.scene.objects().len(), 4);
        assert!(viewer.scene.objects().last().unwrap().reflective);
        assert!(viewer.into_result().is_ok());
    }

    #[test]
    fn test_missing_model_is_reported() {
        let mut description = SceneDescription::default();
        description.objects.truncate(1);
        assert!(matches!(
            Viewer::new(description),
            Err(RenderError::Mesh { .. })
        ));
    }
}
