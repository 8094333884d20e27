//! One-dimensional cubic Hermite spline used to reshape noise into height curves.

/// A control point: input `t`, output `v`, and the curve's slope at `t`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SplinePoint {
    /// Input coordinate
    pub t: f64,
    /// Output value at `t`
    pub v: f64,
    /// Slope `dv/dt` at `t`
    pub tangent: f64,
}

impl SplinePoint {
    /// Creates a control point.
    pub const fn new(t: f64, v: f64, tangent: f64) -> Self {
        SplinePoint { t, v, tangent }
    }
}

/// Hermite-interpolated spline through control points sorted by `t`.
///
/// Outside the control range the curve is clamped to the endpoint values.
/// Monotonic output requires monotonic values and tangents small enough for
/// each segment (|m| ≤ 3·Δv/Δt); the terrain curve is authored that way.
#[derive(Clone, Debug, PartialEq)]
pub struct MonotonicSpline {
    points: Vec<SplinePoint>,
}

impl MonotonicSpline {
    /// Creates a spline, sorting the points by `t`.
    pub fn new(mut points: Vec<SplinePoint>) -> Self {
        points.sort_by(|a, b| a.t.total_cmp(&b.t));
        MonotonicSpline { points }
    }

    /// The control points, sorted by `t`.
    pub fn points(&self) -> &[SplinePoint] {
        &self.points
    }

    /// Evaluates the curve at `t`.
    pub fn eval(&self, t: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if t <= first.t {
            return first.v;
        }
        if t >= last.t {
            return last.v;
        }

        let segment = self
            .points
            .windows(2)
            .find(|pair| t <= pair[1].t)
            .unwrap_or(&self.points[self.points.len() - 2..]);
        let (p0, p1) = (segment[0], segment[1]);

        let h = p1.t - p0.t;
        if h <= f64::EPSILON {
            return p1.v;
        }
        let s = (t - p0.t) / h;
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        h00 * p0.v + h10 * h * p0.tangent + h01 * p1.v + h11 * h * p1.tangent
    }
}
