use serde::{Deserialize, Serialize};

use crate::math::{Aabb, Point3, point};

pub trait VertexSource {
    fn vertex_count(&self) -> usize;
    fn vertex_at(&self, index: usize) -> Option<Point3>;
}

#[derive(Clone, Debug, Default)]
pub struct Geometry {
    positions: Vec<Point3>,
    triangles: Vec<[usize; 3]>,
    needs_update: bool,
}

impl Geometry {
    pub fn new(positions: Vec<Point3>, triangles: Vec<[usize; 3]>) -> Self {
        Self {
            positions,
            triangles,
            needs_update: true,
        }
    }

    pub fn line(start: Point3, end: Point3) -> Self {
        Self::new(vec![start, end], Vec::new())
    }

    pub fn cuboid(width: f64, height: f64, depth: f64) -> Self {
        let (hx, hy, hz) = (width * 0.5, height * 0.5, depth * 0.5);
        let positions = vec![
            point(-hx, -hy, -hz),
            point(hx, -hy, -hz),
            point(hx, hy, -hz),
            point(-hx, hy, -hz),
            point(-hx, -hy, hz),
            point(hx, -hy, hz),
            point(hx, hy, hz),
            point(-hx, hy, hz),
        ];
        let triangles = vec![
            // -z
            [0, 2, 1],
            [0, 3, 2],
            // +z
            [4, 5, 6],
            [4, 6, 7],
            // -y
            [0, 1, 5],
            [0, 5, 4],
            // +y
            [3, 7, 6],
            [3, 6, 2],
            // -x
            [0, 4, 7],
            [0, 7, 3],
            // +x
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self::new(positions, triangles)
    }

    /// Cone with its apex at the origin and its base disc at `z = height`,
    /// so a node looking at a point has the apex on the node's position.
    pub fn cone(radius: f64, height: f64, segments: usize) -> Self {
        let segments = segments.max(3);
        let mut positions = Vec::with_capacity(segments + 2);
        positions.push(point(0.0, 0.0, 0.0));
        positions.push(point(0.0, 0.0, height));
        for i in 0..segments {
            let angle = i as f64 / segments as f64 * std::f64::consts::TAU;
            positions.push(point(radius * angle.cos(), radius * angle.sin(), height));
        }
        let mut triangles = Vec::with_capacity(segments * 2);
        for i in 0..segments {
            let a = 2 + i;
            let b = 2 + (i + 1) % segments;
            triangles.push([0, b, a]);
            triangles.push([1, a, b]);
        }
        Self::new(positions, triangles)
    }

    pub fn plane(width: f64, height: f64, z: f64) -> Self {
        let (hx, hy) = (width * 0.5, height * 0.5);
        Self::new(
            vec![
                point(-hx, -hy, z),
                point(hx, -hy, z),
                point(hx, hy, z),
                point(-hx, hy, z),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    pub fn positions(&self) -> &[Point3] {
        &self.positions
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    fn triangle(&self, face_index: usize) -> Option<[usize; 3]> {
        self.triangles.get(face_index).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn set_position(&mut self, index: usize, p: Point3) -> bool {
        match self.positions.get_mut(index) {
            Some(slot) => {
                *slot = p;
                self.needs_update = true;
                true
            }
            None => false,
        }
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn mark_uploaded(&mut self) {
        self.needs_update = false;
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().copied())
    }

    pub fn subset(&self, faces: impl IntoIterator<Item = usize>) -> Self {
        let triangles = faces
            .into_iter()
            .filter_map(|face| self.triangle(face))
            .collect();
        Self::new(self.positions.clone(), triangles)
    }
}

impl VertexSource for Geometry {
    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn vertex_at(&self, index: usize) -> Option<Point3> {
        self.positions.get(index).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Self = Self(0x000000);
    pub const WHITE: Self = Self(0xffffff);
}

#[derive(Clone, Debug, PartialEq)]
pub enum MaterialKind {
    Basic,
    DashedLine {
        width: f64,
        dash_size: f64,
        gap_size: f64,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: Color,
    pub opacity: f64,
    pub transparent: bool,
    pub depth_test: bool,
}

impl Material {
    pub fn basic(color: Color) -> Self {
        Self {
            kind: MaterialKind::Basic,
            color,
            opacity: 1.0,
            transparent: false,
            depth_test: true,
        }
    }

    pub fn dashed_line(color: Color, width: f64, dash_size: f64, gap_size: f64) -> Self {
        Self {
            kind: MaterialKind::DashedLine {
                width,
                dash_size,
                gap_size,
            },
            ..Self::basic(color)
        }
    }

    pub fn without_depth_test(mut self) -> Self {
        self.depth_test = false;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self.transparent = self.opacity < 1.0;
        self
    }

    pub fn set_line_width(&mut self, line_width: f64) {
        if let MaterialKind::DashedLine { width, .. } = &mut self.kind {
            *width = line_width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_spans_requested_size() {
        let geometry = Geometry::cuboid(1.0, 2.0, 6.0);
        let bounds = geometry.bounds().unwrap();
        assert!((bounds.size().z - 6.0).abs() < 1.0e-12);
        assert_eq!(geometry.triangles().len(), 12);
    }

    #[test]
    fn cone_apex_sits_on_origin() {
        let geometry = Geometry::cone(0.03, 0.1, 8);
        assert_eq!(geometry.vertex_at(0), Some(point(0.0, 0.0, 0.0)));
        let bounds = geometry.bounds().unwrap();
        assert!((bounds.max.z - 0.1).abs() < 1.0e-12);
        assert_eq!(geometry.triangles().len(), 16);
    }

    #[test]
    fn set_position_flags_upload() {
        let mut geometry = Geometry::line(point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0));
        geometry.mark_uploaded();
        assert!(!geometry.needs_update());
        assert!(geometry.set_position(1, point(2.0, 0.0, 0.0)));
        assert!(geometry.needs_update());
        assert!(!geometry.set_position(5, point(2.0, 0.0, 0.0)));
    }

    #[test]
    fn subset_keeps_listed_faces() {
        let geometry = Geometry::cuboid(1.0, 1.0, 1.0);
        let subset = geometry.subset([0, 1, 99]);
        assert_eq!(subset.triangles().len(), 2);
        assert_eq!(subset.vertex_count(), 8);
    }

    #[test]
    fn opacity_below_one_is_transparent() {
        let material = Material::basic(Color::WHITE).with_opacity(0.4);
        assert!(material.transparent);
    }
}
