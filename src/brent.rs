//! Brent's derivative-free minimisation over a closed interval:
//! parabolic interpolation when it behaves, golden section steps when it does not.
pub const MAX_ITERATIONS: usize = 100;
const GOLDEN: f64 = 0.381_966_011_250_105_1;
// Absolute tolerance floor near zero.
const ZEPS: f64 = f64::EPSILON * 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrentResult {
    /// The arg-min found.
    pub x: f64,
    /// The value at `x`.
    pub fx: f64,
    /// Number of objective evaluations.
    pub evaluations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brent {
    pub lower: f64,
    pub upper: f64,
    /// Relative tolerance on the arg-min.
    pub accuracy: f64,
    pub max_iterations: usize,
}

impl Brent {
    /// If `lower > upper`, the interval collapses onto `upper`.
    pub fn new(lower: f64, upper: f64, accuracy: f64) -> Self {
        Self {
            lower: lower.min(upper),
            upper,
            accuracy,
            max_iterations: MAX_ITERATIONS,
        }
    }
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
    /// Minimise `f` starting from the golden section point of the interval.
    pub fn minimize<F, E>(&self, f: F) -> Result<BrentResult, E>
    where
        F: FnMut(f64) -> Result<f64, E>,
    {
        let start = self.lower + GOLDEN * (self.upper - self.lower);
        self.minimize_from(start, f)
    }
    /// Minimise `f` starting from `start`, clamped into the interval.
    /// The first error returned by `f` aborts the search.
    pub fn minimize_from<F, E>(&self, start: f64, mut f: F) -> Result<BrentResult, E>
    where
        F: FnMut(f64) -> Result<f64, E>,
    {
        let (mut a, mut b) = (self.lower, self.upper);
        let mut x = start.max(a).min(b);
        let (mut v, mut w) = (x, x);
        let (mut d, mut e) = (0f64, 0f64);
        let mut fx = f(x)?;
        let (mut fv, mut fw) = (fx, fx);
        let mut evaluations = 1;
        let mut converged = false;
        for _ in 0..self.max_iterations {
            let mid = 0.5 * (a + b);
            let tol = ZEPS + x.abs() * self.accuracy;
            let t2 = 2f64 * tol;
            if (x - mid).abs() <= t2 - 0.5 * (b - a) {
                converged = true;
                break;
            }
            let (mut p, mut q, mut r) = (0f64, 0f64, 0f64);
            if e.abs() > tol {
                r = (x - w) * (fx - fv);
                q = (x - v) * (fx - fw);
                p = (x - v) * q - (x - w) * r;
                q = 2f64 * (q - r);
                if q > 0f64 {
                    p = -p;
                } else {
                    q = -q;
                }
                r = e;
                e = d;
            }
            if p.abs() < (0.5 * q * r).abs() && p < q * (a - x) && p < q * (b - x) {
                d = p / q;
                let u = x + d;
                if u - a < t2 || b - u < t2 {
                    d = if x < mid { tol } else { -tol };
                }
            } else {
                e = if x < mid { b - x } else { a - x };
                d = GOLDEN * e;
            }
            let u = if d.abs() >= tol {
                x + d
            } else if d > 0f64 {
                x + tol
            } else {
                x - tol
            };
            let fu = f(u)?;
            evaluations += 1;
            if fu <= fx {
                if u < x {
                    b = x;
                } else {
                    a = x;
                }
                v = w;
                fv = fw;
                w = x;
                fw = fx;
                x = u;
                fx = fu;
            } else {
                if u < x {
                    a = u;
                } else {
                    b = u;
                }
                if fu <= fw || w == x {
                    v = w;
                    fv = fw;
                    w = u;
                    fw = fu;
                } else if fu <= fv || v == x || v == w {
                    v = u;
                    fv = fu;
                }
            }
        }
        Ok(BrentResult {
            x,
            fx,
            evaluations,
            converged,
        })
    }
}
