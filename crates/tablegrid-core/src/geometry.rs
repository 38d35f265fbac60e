//! Affine transforms and points in PDF page space.
//!
//! Coordinates are in PDF user space: origin at the bottom-left of the page,
//! y growing upwards. No flip to a top-left origin is performed anywhere in
//! the reconstruction pipeline; row ordering is derived by sorting y descending.

/// A point in page space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A 2D affine transformation matrix `[a, b, c, d, e, f]`.
///
/// Maps a point `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`, the same
/// convention PDF uses for the current transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ctm {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Ctm {
    fn default() -> Self {
        Self::identity()
    }
}

impl Ctm {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// Build a matrix from a 6-element array.
    pub fn from_array(m: [f64; 6]) -> Self {
        Self::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }

    /// The matrix as a 6-element array `[a, b, c, d, e, f]`.
    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Compose `self` with `m`: the result first applies `m`, then `self`.
    ///
    /// This is what a `cm` operator does to the current matrix: the
    /// scale/shear parts multiply and `m`'s translation is carried through
    /// `self` before `self`'s own translation is added.
    pub fn compose(&self, m: &Ctm) -> Ctm {
        Ctm {
            a: self.a * m.a + self.c * m.b,
            b: self.b * m.a + self.d * m.b,
            c: self.a * m.c + self.c * m.d,
            d: self.b * m.c + self.d * m.d,
            e: self.a * m.e + self.c * m.f + self.e,
            f: self.b * m.e + self.d * m.f + self.f,
        }
    }

    /// Map a point through this transform.
    pub fn apply(&self, p: Point) -> Point {
        Point {
            x: p.x * self.a + p.y * self.c + self.e,
            y: p.x * self.b + p.y * self.d + self.f,
        }
    }

    /// Translation part of the transform.
    pub fn translation(&self) -> Point {
        Point::new(self.e, self.f)
    }
}
