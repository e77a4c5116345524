//! Clips the view frustum against a ground half-space so the ground can be
//! drawn as a single convex polygon reaching out to the far plane.

use glam::{Mat4, Vec3, Vec4};

use crate::engine::math::Plane;

pub const MAX_VERTICES: usize = 5;

/// Relative `|w|` below which an unprojected far corner is treated as lying
/// at infinity (infinite-far projections).
const W_EPSILON: f32 = 1e-4;

/// Writes the visible part of `plane` into `out` and returns the vertex
/// count: 0 when the plane is not seen from above, otherwise 3, 4 or 5.
///
/// `inv_view_proj` maps wgpu clip space (depth 0..1) back to world space;
/// `far_distance` is measured along the view direction and may exceed the
/// projection's own far plane.
pub fn infinite_plane(
    plane: &Plane,
    inv_view_proj: Mat4,
    eye: Vec3,
    far_distance: f32,
    out: &mut [Vec3; MAX_VERTICES],
) -> usize {
    // Seen from below, or from inside the plane: nothing to draw.
    if !(plane.distance(eye) > 0.0) {
        return 0;
    }

    let corners = far_corners(inv_view_proj, eye, far_distance);
    let mut count = 0;
    let mut push = |p: Vec3| {
        out[count] = p;
        count += 1;
    };

    for vert in (1..MAX_VERTICES).rev() {
        let current = corners[vert];
        let next = corners[vert - 1];
        let current_above = plane.distance(current) > 0.0;
        let next_above = plane.distance(next) > 0.0;

        if !current_above {
            push(plane.intersect_segment(eye, current));
        }
        if current_above != next_above {
            push(plane.intersect_segment(current, next));
        }
    }

    debug_assert!(
        !matches!(count, 1 | 2),
        "frustum clip produced a degenerate polygon of {} vertices",
        count
    );

    if count >= 3 && polygon_normal(&out[..count]).dot(plane.normal()) < 0.0 {
        out[..count].reverse();
    }
    count
}

/// Four far-plane corners in world space, the first repeated at the end.
fn far_corners(inv_view_proj: Mat4, eye: Vec3, far_distance: f32) -> [Vec3; MAX_VERTICES] {
    let ray = |x: f32, y: f32| {
        let far = inv_view_proj * Vec4::new(x, y, 1.0, 1.0);
        if far.w.abs() > W_EPSILON * far.truncate().length() {
            far.truncate() / far.w - eye
        } else {
            // same ray through the near plane, whose w never vanishes
            let near = inv_view_proj * Vec4::new(x, y, 0.0, 1.0);
            near.truncate() / near.w - eye
        }
    };

    let forward = ray(0.0, 0.0).normalize_or_zero();
    let corner = |x: f32, y: f32| {
        let dir = ray(x, y);
        eye + dir * (far_distance / dir.dot(forward))
    };

    let first = corner(-1.0, -1.0);
    [first, corner(1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0), first]
}

/// Newell's method; unnormalised.
fn polygon_normal(points: &[Vec3]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        n += Vec3::new(
            (a.y - b.y) * (a.z + b.z),
            (a.z - b.z) * (a.x + b.x),
            (a.x - b.x) * (a.y + b.y),
        );
    }
    n
}

/// Owning result of [`infinite_plane`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InfinitePlanePolygon {
    vertices: [Vec3; MAX_VERTICES],
    len: usize,
}

impl InfinitePlanePolygon {
    pub fn compute(plane: &Plane, inv_view_proj: Mat4, eye: Vec3, far_distance: f32) -> Self {
        let mut vertices = [Vec3::ZERO; MAX_VERTICES];
        let len = infinite_plane(plane, inv_view_proj, eye, far_distance, &mut vertices);
        Self { vertices, len }
    }

    pub fn as_slice(&self) -> &[Vec3] {
        &self.vertices[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The polygon as a triangle list fanned around its first vertex.
    pub fn triangle_fan(&self) -> Vec<Vec3> {
        let v = self.as_slice();
        (1..v.len().saturating_sub(1))
            .flat_map(|i| [v[0], v[i], v[i + 1]])
            .collect()
    }
}
