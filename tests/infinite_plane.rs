use std::collections::BTreeSet;

use bizsdk::camera::Camera;
use bizsdk::engine::infinite_plane::{infinite_plane, InfinitePlanePolygon, MAX_VERTICES};
use bizsdk::engine::math::{rotation3_axis, Plane};
use glam::{Mat4, Vec3};

const FAR: f32 = 100.0;

fn inv_view_proj(eye: Vec3, forward: Vec3, up: Vec3) -> Mat4 {
    let view = Mat4::look_at_rh(eye, eye + forward, up);
    let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, FAR);
    (proj * view).inverse()
}

/// Forward and up of a camera pitched (negative looks down) and rolled.
fn orientation(pitch_deg: f32, roll_deg: f32) -> (Vec3, Vec3) {
    let pitch = pitch_deg.to_radians();
    let forward = Vec3::new(0.0, pitch.sin(), -pitch.cos());
    let up = Vec3::new(0.0, pitch.cos(), pitch.sin());
    (forward, rotation3_axis(forward, roll_deg.to_radians()) * up)
}

fn newell_normal(points: &[Vec3]) -> Vec3 {
    let origin = points[0];
    let mut n = Vec3::ZERO;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        n += (*a - origin).cross(b - origin);
    }
    n
}

/// Deterministic xorshift source for the randomized sweeps.
struct Xorshift(u64);

impl Xorshift {
    fn next_f32(&mut self) -> f32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }

    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    fn unit_vector(&mut self) -> Vec3 {
        loop {
            let v = Vec3::new(self.range(-1.0, 1.0), self.range(-1.0, 1.0), self.range(-1.0, 1.0));
            let len = v.length();
            if len > 0.1 && len <= 1.0 {
                return v / len;
            }
        }
    }
}

#[test]
fn vertex_count_stays_within_bounds_for_every_orientation() {
    let plane = Plane::ground(0.0);
    let eye = Vec3::new(0.0, 2.0, 0.0);
    let mut seen = BTreeSet::new();

    for pitch in (-85..=85).step_by(5) {
        for roll in (0..360).step_by(15) {
            let (forward, up) = orientation(pitch as f32 + 0.37, roll as f32 + 0.21);
            let mut out = [Vec3::ZERO; MAX_VERTICES];
            let n = infinite_plane(&plane, inv_view_proj(eye, forward, up), eye, FAR, &mut out);
            assert!(matches!(n, 0 | 3 | 4 | 5), "pitch {} roll {} gave {}", pitch, roll, n);
            seen.insert(n);

            for p in &out[..n] {
                assert!(
                    plane.distance(*p).abs() <= 1e-3 * p.length().max(1.0),
                    "vertex {:?} off the plane",
                    p
                );
            }
            if n >= 3 {
                assert!(newell_normal(&out[..n]).dot(plane.normal()) > 0.0);
            }
        }
    }
    assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![0, 3, 4, 5]);
}

#[test]
fn tilted_offset_planes_clip_to_convex_polygons() {
    const CLIP_FAR: f32 = 50.0;
    let mut rng = Xorshift(0x9e37_79b9_7f4a_7c15);
    let mut seen = BTreeSet::new();

    for sample in 0..2000 {
        let normal = loop {
            let n = rng.unit_vector();
            if n.abs().max_element() < 0.95 {
                break n;
            }
        };
        let point = Vec3::new(rng.range(-20.0, 20.0), rng.range(-20.0, 20.0), rng.range(-20.0, 20.0));
        let plane = Plane::from_point_normal(point, normal);

        let slide = rng.unit_vector() * rng.range(0.0, 10.0);
        let eye = point + (slide - normal * slide.dot(normal)) + normal * rng.range(0.2, 10.0);
        let (forward, up) = loop {
            let forward = rng.unit_vector();
            let up = rng.unit_vector();
            if forward.dot(up).abs() < 0.9 {
                break (forward, up);
            }
        };

        let mut out = [Vec3::ZERO; MAX_VERTICES];
        let n = infinite_plane(&plane, inv_view_proj(eye, forward, up), eye, CLIP_FAR, &mut out);
        assert!(matches!(n, 0 | 3 | 4 | 5), "sample {} gave {}", sample, n);
        seen.insert(n);

        for p in &out[..n] {
            assert!(
                plane.distance(*p).abs() <= 1e-3 * p.length().max(1.0),
                "sample {}: vertex {:?} off the plane",
                sample,
                p
            );
        }
        if n >= 3 {
            assert!(
                newell_normal(&out[..n]).dot(plane.normal()) > 0.0,
                "sample {}: polygon winds away from the plane normal",
                sample
            );
        }
    }
    assert!(seen.len() >= 3, "only saw counts {:?}", seen);
}

#[test]
fn eye_on_the_plane_draws_nothing() {
    let eye = Vec3::new(1.0, 0.0, 1.0);
    let (forward, up) = orientation(-30.0, 0.0);
    let polygon = InfinitePlanePolygon::compute(&Plane::ground(0.0), inv_view_proj(eye, forward, up), eye, FAR);
    assert!(polygon.is_empty());
    assert!(polygon.triangle_fan().is_empty());
}

#[test]
fn eye_below_the_plane_draws_nothing() {
    let eye = Vec3::new(0.0, -3.0, 0.0);
    let (forward, up) = orientation(60.0, 0.0);
    let polygon = InfinitePlanePolygon::compute(&Plane::ground(0.0), inv_view_proj(eye, forward, up), eye, FAR);
    assert_eq!(polygon.len(), 0);
}

#[test]
fn looking_up_from_above_draws_nothing() {
    let eye = Vec3::new(0.0, 3.0, 0.0);
    let (forward, up) = orientation(70.0, 0.0);
    let polygon = InfinitePlanePolygon::compute(&Plane::ground(0.0), inv_view_proj(eye, forward, up), eye, FAR);
    assert_eq!(polygon.len(), 0);
}

#[test]
fn raised_plane_is_clipped_at_its_own_height() {
    let plane = Plane::ground(1.5);
    let eye = Vec3::new(0.0, 4.0, 0.0);
    let (forward, up) = orientation(-20.0, 10.0);
    let polygon = InfinitePlanePolygon::compute(&plane, inv_view_proj(eye, forward, up), eye, FAR);
    assert!(!polygon.is_empty());
    assert!(polygon.as_slice().iter().all(|p| (p.y - 1.5).abs() < 1e-2));
    assert_eq!(polygon.triangle_fan().len(), (polygon.len() - 2) * 3);
}

#[test]
fn demo_camera_sees_the_ground() {
    let camera = Camera::new();
    let eye = camera.eye();
    let polygon = InfinitePlanePolygon::compute(&Plane::ground(0.0), camera.inv_view_proj(16.0 / 9.0), eye, camera.far);
    assert!(polygon.len() >= 3);
    for p in polygon.as_slice() {
        assert!(p.y.abs() < 1e-2 * p.length().max(1.0));
        // never further than the far distance along the view direction
        let forward = (camera.target - eye).normalize();
        assert!((*p - eye).dot(forward) <= camera.far * 1.001);
    }
}
