use glam::Vec2;
use kurbo::{BezPath, Point};
use lottie_data::model::BezierPath;

/// Vertex data of an animatable bezier path. Tangents are stored relative to
/// their vertex, as in the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeData {
    pub closed: bool,
    pub vertices: Vec<Vec2>,
    pub in_tangents: Vec<Vec2>,
    pub out_tangents: Vec<Vec2>,
}

impl ShapeData {
    pub fn from_model(path: &BezierPath) -> Self {
        let to_vec = |pts: &[[f32; 2]]| pts.iter().map(|p| Vec2::new(p[0], p[1])).collect::<Vec<_>>();
        let vertices = to_vec(&path.v);
        let pad = |mut t: Vec<Vec2>| {
            t.resize(vertices.len(), Vec2::ZERO);
            t
        };
        Self {
            closed: path.c,
            in_tangents: pad(to_vec(&path.i)),
            out_tangents: pad(to_vec(&path.o)),
            vertices,
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex-wise blend of points and tangents. Paths with different vertex
    /// counts blend over the shorter one.
    pub fn interpolate_between(a: &ShapeData, b: &ShapeData, t: f32) -> ShapeData {
        if t <= 0.0 {
            return a.clone();
        }
        if t >= 1.0 {
            return b.clone();
        }
        let n = a.len().min(b.len());
        let blend = |xs: &[Vec2], ys: &[Vec2]| -> Vec<Vec2> {
            xs[..n]
                .iter()
                .zip(&ys[..n])
                .map(|(x, y)| x.lerp(*y, t))
                .collect()
        };
        ShapeData {
            closed: a.closed,
            vertices: blend(&a.vertices, &b.vertices),
            in_tangents: blend(&a.in_tangents, &b.in_tangents),
            out_tangents: blend(&a.out_tangents, &b.out_tangents),
        }
    }

    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        if self.vertices.is_empty() {
            return path;
        }
        let pt = |v: Vec2| Point::new(v.x as f64, v.y as f64);
        let n = self.vertices.len();
        path.move_to(pt(self.vertices[0]));
        let segments = if self.closed { n } else { n - 1 };
        for i in 0..segments {
            let from = i;
            let to = (i + 1) % n;
            let c1 = self.vertices[from] + self.out_tangents[from];
            let c2 = self.vertices[to] + self.in_tangents[to];
            if self.out_tangents[from] == Vec2::ZERO && self.in_tangents[to] == Vec2::ZERO {
                path.line_to(pt(self.vertices[to]));
            } else {
                path.curve_to(pt(c1), pt(c2), pt(self.vertices[to]));
            }
        }
        if self.closed {
            path.close_path();
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;

    fn square(size: f32) -> ShapeData {
        ShapeData {
            closed: true,
            vertices: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(size, 0.0),
                Vec2::new(size, size),
                Vec2::new(0.0, size),
            ],
            in_tangents: vec![Vec2::ZERO; 4],
            out_tangents: vec![Vec2::ZERO; 4],
        }
    }

    #[test]
    fn blends_vertices_and_tangents() {
        let mut a = square(10.0);
        let mut b = square(30.0);
        a.out_tangents[0] = Vec2::new(2.0, 0.0);
        b.out_tangents[0] = Vec2::new(6.0, 0.0);
        let mid = ShapeData::interpolate_between(&a, &b, 0.5);
        assert_eq!(mid.vertices[2], Vec2::new(20.0, 20.0));
        assert_eq!(mid.out_tangents[0], Vec2::new(4.0, 0.0));
    }

    #[test]
    fn closed_path_bounds() {
        let bounds = square(10.0).to_bez_path().bounding_box();
        assert_eq!((bounds.x1, bounds.y1), (10.0, 10.0));
    }

    #[test]
    fn model_tangents_are_padded() {
        let model = BezierPath {
            c: false,
            i: vec![],
            o: vec![],
            v: vec![[0.0, 0.0], [5.0, 5.0]],
        };
        let shape = ShapeData::from_model(&model);
        assert_eq!(shape.in_tangents.len(), 2);
        assert_eq!(shape.to_bez_path().elements().len(), 2);
    }
}
