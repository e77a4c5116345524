use glam::{Mat3, Mat4, Vec3, Vec4};

/// Plane `n·p + d = 0`. Points with a positive [`Plane::distance`] are on the
/// normal side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    equation: Vec4,
}

impl Plane {
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self { equation: normal.extend(d) }
    }

    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self::new(normal, -normal.dot(point))
    }

    /// The ground plane `y = height`, facing up.
    pub fn ground(height: f32) -> Self {
        Self::new(Vec3::Y, -height)
    }

    pub fn normal(&self) -> Vec3 {
        self.equation.truncate()
    }

    pub fn distance(&self, point: Vec3) -> f32 {
        self.equation.dot(point.extend(1.0))
    }

    /// Point where the line through `a` and `b` meets the plane:
    /// `a - diff * (dot(a, plane) / dot(diff, plane))`.
    ///
    /// The caller guarantees `a` and `b` lie on different sides, otherwise
    /// the denominator can vanish.
    pub fn intersect_segment(&self, a: Vec3, b: Vec3) -> Vec3 {
        let diff = b - a;
        let t = self.distance(a) / self.normal().dot(diff);
        a - diff * t
    }
}

#[derive(Clone, Copy)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the clip planes of a wgpu-style (0..1 depth) projection.
    pub fn from_view_proj(view_proj: Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        let plane = |v: Vec4| {
            let len = v.truncate().length();
            if len > f32::EPSILON {
                Plane { equation: v / len }
            } else {
                // far plane of an infinite projection, always passes
                Plane { equation: Vec4::new(0.0, 0.0, 0.0, 1.0) }
            }
        };

        Self {
            planes: [
                plane(r3 + r0),
                plane(r3 - r0),
                plane(r3 + r1),
                plane(r3 - r1),
                plane(r2),
                plane(r3 - r2),
            ],
        }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.distance(point) >= 0.0)
    }

    pub fn contains_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes.iter().all(|p| p.distance(center) >= -radius)
    }
}

pub fn rotation_x(angle: f32) -> Mat4 {
    Mat4::from_rotation_x(angle)
}

pub fn rotation_y(angle: f32) -> Mat4 {
    Mat4::from_rotation_y(angle)
}

pub fn rotation_z(angle: f32) -> Mat4 {
    Mat4::from_rotation_z(angle)
}

/// Rotation about an arbitrary axis. A zero axis yields the identity.
pub fn rotation_axis(axis: Vec3, angle: f32) -> Mat4 {
    Mat4::from_mat3(rotation3_axis(axis, angle))
}

pub fn rotation3_axis(axis: Vec3, angle: f32) -> Mat3 {
    match axis.try_normalize() {
        Some(axis) => Mat3::from_axis_angle(axis, angle),
        None => Mat3::IDENTITY,
    }
}

/// Placement of a mesh in the world: an origin and three basis axes.
#[derive(Clone, Copy, Debug)]
pub struct Orientation {
    pub origin: Vec3,
    pub axis: [Vec3; 3],
}

impl Orientation {
    pub fn at(origin: Vec3) -> Self {
        Self {
            origin,
            axis: [Vec3::X, Vec3::Y, Vec3::Z],
        }
    }

    pub fn rotated(mut self, rotation: Mat3) -> Self {
        self.axis = [
            rotation * self.axis[0],
            rotation * self.axis[1],
            rotation * self.axis[2],
        ];
        self
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols(
            self.axis[0].extend(0.0),
            self.axis[1].extend(0.0),
            self.axis[2].extend(0.0),
            self.origin.extend(1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_distance_is_signed() {
        let plane = Plane::ground(1.0);
        assert_eq!(plane.distance(Vec3::new(3.0, 4.0, -2.0)), 3.0);
        assert_eq!(plane.distance(Vec3::new(0.0, -1.0, 0.0)), -2.0);
    }

    #[test]
    fn segment_intersection_lands_on_plane() {
        let plane = Plane::from_point_normal(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 3.0, 0.0));
        let hit = plane.intersect_segment(Vec3::new(1.0, 5.0, 1.0), Vec3::new(1.0, -1.0, 1.0));
        assert!((hit - Vec3::new(1.0, 2.0, 1.0)).length() < 1e-6);
        assert!(plane.distance(hit).abs() < 1e-6);
    }

    #[test]
    fn rotation_about_zero_axis_is_identity() {
        assert_eq!(rotation_axis(Vec3::ZERO, 1.0), Mat4::IDENTITY);
        let r = rotation_axis(Vec3::Z * 2.0, std::f32::consts::FRAC_PI_2);
        assert!((r.transform_vector3(Vec3::X) - Vec3::Y).length() < 1e-6);
        assert!((rotation_z(std::f32::consts::FRAC_PI_2).transform_vector3(Vec3::X) - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn frustum_culls_points_behind_camera() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        let frustum = Frustum::from_view_proj(proj * view);
        assert!(frustum.contains_point(Vec3::ZERO));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 10.0)));
        assert!(frustum.contains_sphere(Vec3::new(0.0, 0.0, 5.5), 1.0));
    }

    #[test]
    fn orientation_matrix_translates_origin() {
        let o = Orientation::at(Vec3::new(1.0, 2.0, 3.0)).rotated(Mat3::from_rotation_y(0.3));
        assert!((o.to_mat4().transform_point3(Vec3::ZERO) - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }
}
