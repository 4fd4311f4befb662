use crate::config::CameraConfig;
use glam::{Mat4, Vec3};
use std::f32::consts::PI;

/// Polar angle limits, measured from +Y. The poles are excluded so the
/// look-at up vector never degenerates.
pub const PITCH_MIN: f32 = PI * 0.1 / 360.0;
pub const PITCH_MAX: f32 = PI * 359.9 / 360.0;

/// Wheel angle units per degree (eighths of a degree, 120 per notch).
const WHEEL_UNITS_PER_DEGREE: f32 = 8.0;
const WHEEL_DEGREES_PER_STEP: f32 = 15.0;
const ZOOM_PROPORTIONAL: f32 = 0.02;
const ZOOM_LINEAR_DIVISOR: f32 = 5.0;

/// Camera orbiting a target point at `arm_length`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    arm_length: f32,
    yaw: f32,
    pitch: f32,
    config: CameraConfig,
}

impl OrbitCamera {
    pub fn new(config: CameraConfig) -> Self {
        let mut camera = Self {
            arm_length: config.initial_arm,
            yaw: 0.0,
            pitch: PI / 2.0,
            config,
        };
        camera.set_arm_length(camera.config.initial_arm);
        camera
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn arm_length(&self) -> f32 {
        self.arm_length
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn set_arm_length(&mut self, arm_length: f32) {
        if arm_length.is_finite() {
            // An inverted range resolves to `arm_max`.
            self.arm_length = arm_length.max(self.config.arm_min).min(self.config.arm_max);
        }
    }

    pub fn adjust_arm_length(&mut self, delta: f32) {
        self.set_arm_length(self.arm_length + delta);
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        if yaw.is_finite() {
            self.yaw = yaw;
        }
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        if pitch.is_finite() {
            self.pitch = pitch.clamp(PITCH_MIN, PITCH_MAX);
        }
    }

    /// Mouse drag in pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.set_yaw(self.yaw + PI * dx / self.config.sensitivity_x);
        self.set_pitch(self.pitch - PI * dy / self.config.sensitivity_y);
    }

    /// Wheel rotation in eighths of a degree; positive zooms in. The step is
    /// proportional to the arm length but never smaller than a linear floor.
    pub fn zoom(&mut self, angle_delta: f32) {
        let da = angle_delta / WHEEL_DEGREES_PER_STEP / WHEEL_UNITS_PER_DEGREE
            * self.config.sensitivity_arm;
        let proportional = da * ZOOM_PROPORTIONAL * self.arm_length;
        let linear = da / ZOOM_LINEAR_DIVISOR;
        let step = if proportional.abs() >= linear.abs() {
            proportional
        } else {
            linear
        };
        self.adjust_arm_length(-step);
    }

    pub fn reset_to_top_view(&mut self) {
        self.yaw = 0.0;
        self.pitch = PITCH_MIN;
    }

    pub fn reset_to_bottom_view(&mut self) {
        self.pitch = PITCH_MAX;
    }

    /// Horizontal view from one of the four sides, `side` in `0..4`.
    pub fn reset_to_side_view(&mut self, side: u8) {
        self.yaw = PI * f32::from(side % 4) / 2.0;
        self.pitch = PI / 2.0;
    }

    /// Offset of the eye from the target.
    pub fn arm(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vec3::new(sin_pitch * cos_yaw, cos_pitch, sin_pitch * sin_yaw) * self.arm_length
    }

    pub fn eye(&self, target: Vec3) -> Vec3 {
        target + self.arm()
    }

    pub fn view_matrix(&self, eye: Vec3, target: Vec3) -> Mat4 {
        Mat4::look_at_rh(eye, target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        Mat4::perspective_rh(
            self.config.fov_deg.to_radians(),
            aspect,
            self.config.near,
            self.config.far,
        )
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
