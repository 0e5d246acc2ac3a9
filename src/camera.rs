//! First-person camera, perspective projection and the camera uniform.
//!
//! The camera does not move by itself: the backend owns the player and
//! pushes absolute poses through [`Camera::update`]. What the camera does own
//! is the orthonormal basis derived from that pose.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3};

/// wgpu's clip space has a depth range of `0..1` while cgmath builds
/// OpenGL-style matrices with `-1..1`.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Pitch is kept strictly inside ±90° so `front × WORLD_UP` never vanishes.
pub const PITCH_LIMIT_DEG: f32 = 89.9;

pub const WORLD_UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

/// Position plus a right-handed orthonormal basis.
///
/// The basis is only ever written as a whole by [`Camera::update`], so
/// `front`, `right` and `up` can never disagree with each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    position: Point3<f32>,
    front: Vector3<f32>,
    up: Vector3<f32>,
    right: Vector3<f32>,
    yaw: f32,
    pitch: f32,
}

impl Camera {
    pub fn new(x: f32, y: f32, z: f32, yaw_deg: f32, pitch_deg: f32) -> Self {
        let mut camera = Self {
            position: Point3::new(0.0, 0.0, 0.0),
            front: Vector3::unit_z(),
            up: WORLD_UP,
            right: -Vector3::unit_x(),
            yaw: 0.0,
            pitch: 0.0,
        };
        camera.update(x, y, z, yaw_deg, pitch_deg);
        camera
    }

    /// Sets the position and recomputes the basis from yaw and pitch (degrees).
    ///
    /// `right` is derived from the new `front` and `up` from the new `right`;
    /// swapping the two steps would leave `up` built from a stale vector.
    pub fn update(&mut self, x: f32, y: f32, z: f32, yaw_deg: f32, pitch_deg: f32) {
        let pitch_deg = pitch_deg.clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG);
        let (sin_yaw, cos_yaw) = yaw_deg.to_radians().sin_cos();
        let (sin_pitch, cos_pitch) = pitch_deg.to_radians().sin_cos();

        let front = Vector3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw).normalize();
        let right = front.cross(WORLD_UP).normalize();
        let up = right.cross(front).normalize();

        *self = Self {
            position: Point3::new(x, y, z),
            front,
            up,
            right,
            yaw: yaw_deg,
            pitch: pitch_deg,
        };
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    /// Yaw in degrees as last applied.
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in degrees after clamping.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.position + self.front, self.up)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0)
    }
}

/// Perspective parameters. The matrix is a pure function of these four
/// values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: aspect_ratio(width, height),
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

/// GPU-side copy of the composed view-projection matrix.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Matrix4<f32>> for CameraUniform {
    fn from(view_proj: Matrix4<f32>) -> Self {
        Self {
            view_proj: view_proj.into(),
        }
    }
}
