use bevy::math::{Vec2, Vec3};

#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub p: Vec2,
    pub q: Vec2,
}

impl Edge {
    pub fn new(p: Vec2, q: Vec2) -> Self {
        Self { p, q }
    }

    pub fn closest_point_to(&self, v: Vec2) -> Vec2 {
        let pq = self.q - self.p;
        let pv = v - self.p;

        let length_squared = pq.length_squared();
        if length_squared == 0. {
            return self.p;
        }

        let t = pv.dot(pq) / length_squared;

        if t < 0. {
            self.p
        } else if t > 1. {
            self.q
        } else {
            self.p + pq * t
        }
    }
}

/// Whether `point` lies in the wedge spanned from `origin` by the rays towards `a` and `b`.
/// Points on either ray count as inside. Collinear rays span no wedge.
pub fn is_point_between_vectors(point: Vec2, origin: Vec2, a: Vec2, b: Vec2) -> bool {
    let a = a - origin;
    let b = b - origin;
    let p = point - origin;

    let span = a.perp_dot(b);
    if span == 0. {
        return false;
    }

    a.perp_dot(p) * span >= 0. && b.perp_dot(p) * -span >= 0.
}

/// Triangle containment as the intersection of the wedges at two of its corners.
pub fn triangle_contains(point: Vec2, [p, q, r]: [Vec2; 3]) -> bool {
    is_point_between_vectors(point, p, q, r) && is_point_between_vectors(point, q, r, p)
}

/// Barycentric coordinates of a fixed triangle, with the dot products precomputed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Barycentric2D {
    p: Vec2,
    v0: Vec2,
    v1: Vec2,
    d00: f32,
    d01: f32,
    d11: f32,
    /// `None` for triangles with (nearly) collinear vertices.
    inv_denom: Option<f32>,
}

impl Barycentric2D {
    pub fn new(p: Vec2, q: Vec2, r: Vec2) -> Self {
        let v0 = q - p;
        let v1 = r - p;

        let d00 = v0.dot(v0);
        let d01 = v0.dot(v1);
        let d11 = v1.dot(v1);

        let denom = d00 * d11 - d01 * d01;
        let scale = (d00 * d11).max(f32::MIN_POSITIVE);
        let inv_denom = (denom.abs() > scale * 1e-6).then(|| 1. / denom);

        Self {
            p,
            v0,
            v1,
            d00,
            d01,
            d11,
            inv_denom,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.inv_denom.is_none()
    }

    /// Weights of the three vertices for `v`. Negative components mean `v` is outside.
    pub fn coordinates(&self, v: Vec2) -> Option<Vec3> {
        let inv_denom = self.inv_denom?;
        let v2 = v - self.p;

        let d20 = v2.dot(self.v0);
        let d21 = v2.dot(self.v1);

        let y = (self.d11 * d20 - self.d01 * d21) * inv_denom;
        let z = (self.d00 * d21 - self.d01 * d20) * inv_denom;
        let x = 1. - y - z;

        Some(Vec3::new(x, y, z))
    }
}
