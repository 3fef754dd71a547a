//! Fly camera (yaw/pitch mouse look, WASD translation) and perspective projection.

use glam::{Mat4, Vec2, Vec3};
use mirrorpass_gpu_shared::scene_format::CameraDescription;

const DEFAULT_YAW: f32 = -90.0;
const PITCH_LIMIT: f32 = 89.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    /// Degrees. -90 looks down -Z.
    yaw: f32,
    pitch: f32,
    /// Degrees per pixel of cursor motion.
    pub sensitivity: f32,
    /// World units per second.
    pub speed: f32,
    last_cursor: Option<Vec2>,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: 0.0,
            sensitivity: 0.1,
            speed: 2.0,
            last_cursor: None,
        };
        camera.update_vectors();
        camera
    }

    pub fn from_description(desc: &CameraDescription) -> Self {
        let mut camera = Self::new(Vec3::from(desc.position));
        camera.speed = desc.speed;
        camera.sensitivity = desc.sensitivity;
        camera
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Move `amount` world units along the camera's local axes.
    pub fn translate(&mut self, direction: CameraMovement, amount: f32) {
        let offset = match direction {
            CameraMovement::Forward => self.front * amount,
            CameraMovement::Backward => -self.front * amount,
            CameraMovement::Left => -self.right * amount,
            CameraMovement::Right => self.right * amount,
        };
        self.position += offset;
    }

    /// Move at `speed` for `delta_seconds`.
    pub fn advance(&mut self, direction: CameraMovement, delta_seconds: f32) {
        self.translate(direction, self.speed * delta_seconds);
    }

    /// Mouse look from an absolute cursor position. The first sample only
    /// records the position so the view does not jump when the cursor enters.
    pub fn rotate(&mut self, cursor_x: f64, cursor_y: f64) {
        let cursor = Vec2::new(cursor_x as f32, cursor_y as f32);
        let Some(last) = self.last_cursor.replace(cursor) else {
            return;
        };

        // Screen y grows downwards.
        let dx = (cursor.x - last.x) * self.sensitivity;
        let dy = (last.y - cursor.y) * self.sensitivity;

        self.yaw += dx;
        self.pitch = (self.pitch + dy).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    /// Forget the last cursor sample (e.g. after the cursor was released).
    pub fn reset_cursor(&mut self) {
        self.last_cursor = None;
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

/// Right-handed perspective projection with a 0..1 depth range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, fov_y_degrees: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y_radians: fov_y_degrees.to_radians(),
            aspect: aspect_ratio(width, height),
            near,
            far,
        }
    }

    pub fn from_description(desc: &CameraDescription, width: u32, height: u32) -> Self {
        Self::new(width, height, desc.fov_y_degrees, desc.near, desc.far)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, self.aspect, self.near, self.far)
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}
