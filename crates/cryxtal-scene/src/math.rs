use cgmath::{EuclideanSpace, InnerSpace, One, Rotation};
pub use cgmath::MetricSpace;

pub type Point3 = cgmath::Point3<f64>;
pub type Vector3 = cgmath::Vector3<f64>;
pub type Quaternion = cgmath::Quaternion<f64>;
pub type Matrix4 = cgmath::Matrix4<f64>;

pub fn point(x: f64, y: f64, z: f64) -> Point3 {
    Point3::new(x, y, z)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vector3,
}

impl Ray {
    pub fn new(origin: Point3, direction: Vector3) -> Option<Self> {
        let len = direction.magnitude();
        if !len.is_finite() || len <= f64::EPSILON {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / len,
        })
    }

    pub fn through(origin: Point3, target: Point3) -> Option<Self> {
        Self::new(origin, target - origin)
    }

    pub fn at(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.extend(p);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, p: Point3) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn center(&self) -> Point3 {
        self.min + (self.max - self.min) * 0.5
    }

    pub fn size(&self) -> Vector3 {
        self.max - self.min
    }

    pub fn max_extent(&self) -> f64 {
        let size = self.size();
        size.x.abs().max(size.y.abs()).max(size.z.abs())
    }

    pub fn corners(&self) -> [Point3; 8] {
        let (min, max) = (self.min, self.max);
        [
            Point3::new(min.x, min.y, min.z),
            Point3::new(max.x, min.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(min.x, max.y, min.z),
            Point3::new(min.x, min.y, max.z),
            Point3::new(max.x, min.y, max.z),
            Point3::new(max.x, max.y, max.z),
            Point3::new(min.x, max.y, max.z),
        ]
    }

    pub fn transformed(&self, matrix: &Matrix4) -> Self {
        let corners = self.corners().map(|c| transform_point(matrix, c));
        let mut bounds = Self {
            min: corners[0],
            max: corners[0],
        };
        for c in &corners[1..] {
            bounds.extend(*c);
        }
        bounds
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Point3,
    pub rotation: Quaternion,
    pub scale: Vector3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn at(position: Point3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn matrix(&self) -> Matrix4 {
        Matrix4::from_translation(self.position.to_vec())
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Turns the local +Z axis toward `target`. Leaves the rotation untouched
    /// when the target coincides with the position.
    pub fn look_at(&mut self, target: Point3) {
        if let Some(rotation) = look_rotation(target - self.position) {
            self.rotation = rotation;
        }
    }

    pub fn set_uniform_scale(&mut self, scale: f64) {
        self.scale = Vector3::new(scale, scale, scale);
    }

    pub fn forward(&self) -> Vector3 {
        self.rotation.rotate_vector(Vector3::unit_z())
    }
}

pub fn look_rotation(direction: Vector3) -> Option<Quaternion> {
    let len = direction.magnitude();
    if !len.is_finite() || len <= 1.0e-12 {
        return None;
    }
    Some(Quaternion::from_arc(
        Vector3::unit_z(),
        direction / len,
        Some(Vector3::unit_y()),
    ))
}

pub fn transform_point(matrix: &Matrix4, p: Point3) -> Point3 {
    let v = matrix * p.to_homogeneous();
    if v.w.abs() <= f64::EPSILON || (v.w - 1.0).abs() <= f64::EPSILON {
        Point3::new(v.x, v.y, v.z)
    } else {
        Point3::new(v.x / v.w, v.y / v.w, v.z / v.w)
    }
}

pub fn ray_intersect_triangle(ray: &Ray, a: Point3, b: Point3, c: Point3) -> Option<f64> {
    let eps = 1.0e-9;
    let edge1 = b - a;
    let edge2 = c - a;
    let pvec = ray.direction.cross(edge2);
    let det = edge1.dot(pvec);
    if det.abs() < eps {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.origin - a;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(edge1);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(qvec) * inv_det;
    if t > eps { Some(t) } else { None }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_triangle_front() {
        let ray = Ray::new(point(0.2, 0.2, 5.0), Vector3::new(0.0, 0.0, -1.0)).unwrap();
        let t = ray_intersect_triangle(
            &ray,
            point(0.0, 0.0, 0.0),
            point(1.0, 0.0, 0.0),
            point(0.0, 1.0, 0.0),
        );
        assert!((t.unwrap() - 5.0).abs() < 1.0e-12);
    }

    #[test]
    fn ray_misses_outside_triangle() {
        let ray = Ray::new(point(2.0, 2.0, 5.0), Vector3::new(0.0, 0.0, -1.0)).unwrap();
        let t = ray_intersect_triangle(
            &ray,
            point(0.0, 0.0, 0.0),
            point(1.0, 0.0, 0.0),
            point(0.0, 1.0, 0.0),
        );
        assert!(t.is_none());
    }

    #[test]
    fn zero_direction_is_not_a_ray() {
        assert!(Ray::new(point(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn look_at_turns_z_toward_target() {
        let mut transform = Transform::at(point(1.0, 0.0, 0.0));
        transform.look_at(point(1.0, 5.0, 0.0));
        let forward = transform.forward();
        assert!((forward - Vector3::unit_y()).magnitude() < 1.0e-9);
    }

    #[test]
    fn look_at_opposite_direction_uses_fallback_axis() {
        let mut transform = Transform::default();
        transform.look_at(point(0.0, 0.0, -2.0));
        assert!((transform.forward() + Vector3::unit_z()).magnitude() < 1.0e-9);
    }

    #[test]
    fn transformed_bounds_follow_translation_and_scale() {
        let bounds = Aabb::from_points([point(-1.0, -1.0, -1.0), point(1.0, 1.0, 1.0)]).unwrap();
        let mut transform = Transform::at(point(10.0, 0.0, 0.0));
        transform.set_uniform_scale(2.0);
        let moved = bounds.transformed(&transform.matrix());
        assert!((moved.min.x - 8.0).abs() < 1.0e-9);
        assert!((moved.max.x - 12.0).abs() < 1.0e-9);
        assert!((moved.max_extent() - 4.0).abs() < 1.0e-9);
    }

    #[test]
    fn rounding_to_two_decimals() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(2.999, 2), 3.0);
    }
}
