use cgmath::InnerSpace;
use serde::{Deserialize, Serialize};

use crate::math::{Aabb, Point3, Vector3};

const FOCUS_SECONDS: f64 = 0.35;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    Perspective,
    Orthographic,
}

impl Default for Projection {
    fn default() -> Self {
        Self::Perspective
    }
}

pub trait CameraRig {
    fn position(&self) -> Point3;
    fn projection(&self) -> Projection;
    /// Starts an animated move that frames `bounds`. A new request replaces
    /// one still in flight.
    fn focus_on(&mut self, bounds: Aabb);
    fn is_focusing(&self) -> bool;
}

#[derive(Clone, Copy, Debug)]
struct FocusTransition {
    from_target: Point3,
    to_target: Point3,
    from_distance: f64,
    to_distance: f64,
    elapsed: f64,
    duration: f64,
}

#[derive(Clone, Debug)]
pub struct OrbitCamera {
    position: Point3,
    target: Point3,
    projection: Projection,
    transition: Option<FocusTransition>,
}

impl OrbitCamera {
    pub fn new(position: Point3, target: Point3) -> Self {
        Self {
            position,
            target,
            projection: Projection::Perspective,
            transition: None,
        }
    }

    pub fn target(&self) -> Point3 {
        self.target
    }

    pub fn distance(&self) -> f64 {
        (self.target - self.position).magnitude()
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    pub fn update(&mut self, dt: f64) -> bool {
        let Some(transition) = self.transition else {
            return false;
        };
        let elapsed = transition.elapsed + dt.max(0.0);
        let t = if transition.duration <= 0.0 {
            1.0
        } else {
            (elapsed / transition.duration).clamp(0.0, 1.0)
        };
        let smooth = t * t * (3.0 - 2.0 * t);
        let forward = self.forward();
        let target = transition.from_target + (transition.to_target - transition.from_target) * smooth;
        let distance =
            transition.from_distance + (transition.to_distance - transition.from_distance) * smooth;
        self.target = target;
        self.position = target - forward * distance;
        if t >= 1.0 {
            self.transition = None;
        } else {
            self.transition = Some(FocusTransition {
                elapsed,
                ..transition
            });
        }
        true
    }

    fn forward(&self) -> Vector3 {
        let dir = self.target - self.position;
        if dir.magnitude() <= f64::EPSILON {
            Vector3::new(0.0, 0.0, -1.0)
        } else {
            dir.normalize()
        }
    }
}

impl CameraRig for OrbitCamera {
    fn position(&self) -> Point3 {
        self.position
    }

    fn projection(&self) -> Projection {
        self.projection
    }

    fn focus_on(&mut self, bounds: Aabb) {
        let radius = bounds.max_extent().max(1.0) * 0.5;
        self.transition = Some(FocusTransition {
            from_target: self.target,
            to_target: bounds.center(),
            from_distance: self.distance(),
            to_distance: (radius * 3.0).max(2.0),
            elapsed: 0.0,
            duration: FOCUS_SECONDS,
        });
    }

    fn is_focusing(&self) -> bool {
        self.transition.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::point;

    #[test]
    fn focus_settles_on_bounds_center() {
        let mut camera = OrbitCamera::new(point(0.0, -20.0, 0.0), point(0.0, 0.0, 0.0));
        let bounds = Aabb::from_points([point(4.0, 4.0, 0.0), point(6.0, 6.0, 2.0)]).unwrap();
        camera.focus_on(bounds);
        assert!(camera.is_focusing());

        let mut frames = 0;
        while camera.update(0.1) {
            frames += 1;
            assert!(frames < 100);
        }
        assert!(!camera.is_focusing());
        assert!((camera.target() - point(5.0, 5.0, 1.0)).magnitude() < 1.0e-9);
        assert!((camera.distance() - 3.0).abs() < 1.0e-9);
    }

    #[test]
    fn idle_camera_reports_no_change() {
        let mut camera = OrbitCamera::new(point(0.0, 0.0, 10.0), point(0.0, 0.0, 0.0));
        assert!(!camera.update(0.016));
    }
}
