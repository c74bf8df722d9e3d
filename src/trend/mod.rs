// src/trend/mod.rs

use serde::Serialize;

/// Latency ceiling used for capacity projection, in milliseconds.
pub const LATENCY_THRESHOLD_MS: f64 = 5000.0;

/// Observations required before a trend fit is attempted.
pub const MIN_SAMPLES: usize = 3;

/// Sample count of the fitted curve handed to charting.
const CURVE_POINTS: usize = 100;
/// How far past the projected load the fitted curve extends.
const CURVE_OVERSHOOT: f64 = 10.0;

/// Coefficients below this are fit roundoff, not signal.
const COEFF_EPS: f64 = 1e-9;

/// Least-squares quadratic `p(x) = a·x² + b·x + c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quadratic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Quadratic {
    /// Fit the least-squares quadratic through `(xs, ys)`.
    ///
    /// Returns `None` with fewer than [`MIN_SAMPLES`] observations, on a
    /// length mismatch, or when the normal equations are singular (all x
    /// values identical, for instance).
    pub fn fit(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() != ys.len() || xs.len() < MIN_SAMPLES {
            return None;
        }

        // Power sums for the 3x3 normal equations.
        let mut s = [0.0f64; 5];
        let mut t = [0.0f64; 3];
        for (&x, &y) in xs.iter().zip(ys) {
            let x2 = x * x;
            s[0] += 1.0;
            s[1] += x;
            s[2] += x2;
            s[3] += x2 * x;
            s[4] += x2 * x2;
            t[0] += y;
            t[1] += y * x;
            t[2] += y * x2;
        }

        let mut m = [
            [s[4], s[3], s[2], t[2]],
            [s[3], s[2], s[1], t[1]],
            [s[2], s[1], s[0], t[0]],
        ];
        solve3(&mut m).map(|[a, b, c]| Self { a, b, c })
    }

    pub fn eval(&self, x: f64) -> f64 {
        (self.a * x + self.b) * x + self.c
    }

    /// Real roots of `p(x) = level`, ascending. Empty when the curve never
    /// reaches `level`.
    fn roots_at(&self, level: f64) -> Vec<f64> {
        let c = self.c - level;
        if self.a.abs() < COEFF_EPS {
            if self.b.abs() < COEFF_EPS {
                return Vec::new();
            }
            return vec![-c / self.b];
        }

        let disc = self.b * self.b - 4.0 * self.a * c;
        if disc < 0.0 {
            return Vec::new();
        }
        let sq = disc.sqrt();
        let mut roots = vec![
            (-self.b - sq) / (2.0 * self.a),
            (-self.b + sq) / (2.0 * self.a),
        ];
        roots.sort_by(f64::total_cmp);
        roots
    }
}

/// Solve a 3x3 system in augmented form via Gauss-Jordan with partial
/// pivoting. `None` on a singular system.
fn solve3(m: &mut [[f64; 4]; 3]) -> Option<[f64; 3]> {
    for col in 0..3 {
        let pivot = (col..3).max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);
        for row in 0..3 {
            if row != col {
                let f = m[row][col] / m[col][col];
                for k in col..4 {
                    m[row][k] -= f * m[col][k];
                }
            }
        }
    }
    Some([m[0][3] / m[0][0], m[1][3] / m[1][1], m[2][3] / m[2][2]])
}

/// Outcome of the capacity projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Load level at which the fitted trend reaches the threshold.
    Predicted(u64),
    /// The trend has no real crossing beyond the observed range.
    Unknown,
}

/// A fitted latency trend with its threshold crossing estimate.
#[derive(Debug, Clone, Serialize)]
pub struct TrendProjection {
    pub fit: Quadratic,
    pub projection: Projection,
    /// `(x, p(x))` samples spanning the observed range out past the
    /// projection, for charting. Empty when the projection is unknown.
    pub curve: Vec<(f64, f64)>,
}

/// Fit a quadratic latency trend and estimate the load at which it crosses
/// [`LATENCY_THRESHOLD_MS`].
///
/// Returns `None` when fewer than [`MIN_SAMPLES`] observations exist or the
/// fit is degenerate; callers fall back to plotting the raw series. A fit
/// whose roots all lie at or below the largest observed load is an
/// interpolation, not a capacity estimate, so those yield
/// [`Projection::Unknown`].
pub fn project(xs: &[f64], ys: &[f64]) -> Option<TrendProjection> {
    let fit = Quadratic::fit(xs, ys)?;

    let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let candidate = fit
        .roots_at(LATENCY_THRESHOLD_MS)
        .into_iter()
        .find(|r| r.is_finite() && *r > max_x);

    let trend = match candidate {
        Some(root) => {
            let predicted = root.trunc() as u64;
            let span_end = predicted as f64 + CURVE_OVERSHOOT;
            let step = (span_end - min_x) / (CURVE_POINTS - 1) as f64;
            let curve = (0..CURVE_POINTS)
                .map(|i| {
                    let x = min_x + step * i as f64;
                    (x, fit.eval(x))
                })
                .collect();
            TrendProjection {
                fit,
                projection: Projection::Predicted(predicted),
                curve,
            }
        }
        None => TrendProjection {
            fit,
            projection: Projection::Unknown,
            curve: Vec::new(),
        },
    };
    Some(trend)
}

#[cfg(test)]
mod tests {
    use super::*;

    const XS: &[f64] = &[10.0, 20.0, 30.0, 40.0];
    const YS: &[f64] = &[100.0, 250.0, 500.0, 900.0];

    fn assert_close(got: f64, want: f64) {
        assert!((got - want).abs() < 1e-6, "got {}, want {}", got, want);
    }

    #[test]
    fn fits_known_coefficients() {
        let q = Quadratic::fit(XS, YS).unwrap();
        assert_close(q.a, 0.625);
        assert_close(q.b, -4.75);
        assert_close(q.c, 87.5);
    }

    #[test]
    fn projects_threshold_crossing_beyond_observed_range() {
        let trend = project(XS, YS).unwrap();
        // Exact root of 0.625x² - 4.75x + 87.5 = 5000 is ~92.538.
        assert_eq!(trend.projection, Projection::Predicted(92));
    }

    #[test]
    fn curve_spans_observed_range_to_projection_overshoot() {
        let trend = project(XS, YS).unwrap();
        assert_eq!(trend.curve.len(), 100);
        assert_close(trend.curve[0].0, 10.0);
        assert_close(trend.curve[99].0, 102.0); // 92 + 10
        assert_close(trend.curve[0].1, trend.fit.eval(10.0));
        // x strictly increasing across the curve
        assert!(trend.curve.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn decreasing_trend_is_unknown() {
        // Linearly falling latency: the only threshold crossing sits far
        // below the observed range.
        let trend = project(&[10.0, 20.0, 30.0], &[100.0, 90.0, 80.0]).unwrap();
        assert_eq!(trend.projection, Projection::Unknown);
        assert!(trend.curve.is_empty());
    }

    #[test]
    fn flat_trend_is_unknown() {
        let trend = project(&[10.0, 20.0, 30.0], &[100.0, 100.0, 100.0]).unwrap();
        assert_eq!(trend.projection, Projection::Unknown);
    }

    #[test]
    fn curve_peaking_below_threshold_is_unknown() {
        // Concave-down parabola topping out around 200ms: no real roots.
        let xs = [10.0, 20.0, 30.0];
        let ys = [100.0, 200.0, 100.0];
        let trend = project(&xs, &ys).unwrap();
        assert_eq!(trend.projection, Projection::Unknown);
    }

    #[test]
    fn too_few_samples_skips_projection() {
        assert!(project(&[10.0, 20.0], &[100.0, 200.0]).is_none());
        assert!(project(&[], &[]).is_none());
    }

    #[test]
    fn degenerate_x_values_yield_no_fit() {
        assert!(Quadratic::fit(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(project(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn crossing_inside_observed_range_is_rejected() {
        // The fit crosses 5000 near x = 73, inside the observed range, and
        // both real roots sit at or below max(x): an interpolated crossing
        // is not a capacity estimate.
        let xs = [10.0, 50.0, 100.0];
        let ys = [100.0, 2500.0, 9000.0];
        let trend = project(&xs, &ys).unwrap();
        assert_eq!(trend.projection, Projection::Unknown);
    }

    #[test]
    fn eval_matches_horner_expansion() {
        let q = Quadratic {
            a: 2.0,
            b: -3.0,
            c: 1.0,
        };
        assert_close(q.eval(4.0), 2.0 * 16.0 - 12.0 + 1.0);
    }
}
