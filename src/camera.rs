use glam::{Mat4, Vec3};

const MIN_DISTANCE: f32 = 2.0;
const MAX_DISTANCE: f32 = 200.0;
const PITCH_LIMIT: f32 = 1.5;

/// Orbits `target` at `distance`; projects with an infinite far plane so
/// shadow volumes extruded to `w = 0` are never clipped.
pub struct Camera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub fov_y: f32,
    pub near: f32,
    /// Distance the ground clipper reaches out to.
    pub far: f32,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            target: Vec3::new(0.0, 1.0, 0.0),
            yaw: 0.6,
            pitch: 0.45,
            distance: 14.0,
            fov_y: std::f32::consts::PI / 4.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + Vec3::new(sy * cp, sp, cy * cp) * self.distance
    }

    pub fn orbit(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw = (self.yaw + d_yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch + d_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn zoom(&mut self, factor: f32) {
        self.distance = (self.distance * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_infinite_rh(self.fov_y, aspect, self.near)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    pub fn inv_view_proj(&self, aspect: f32) -> Mat4 {
        self.view_proj(aspect).inverse()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
