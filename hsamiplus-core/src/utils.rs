use crate::error::PreconditionError;

/// Rational approximation of the error function (Abramowitz & Stegun 7.1.26),
/// accurate to ~1.5e-7. The source only ever evaluates `erf` on non-negative
/// arguments; a negative one signals a upstream sign error and is fatal.
pub fn erf(x: f64) -> Result<f64, PreconditionError> {
    if x < 0.0 {
        return Err(PreconditionError::NegativeErfArgument(x));
    }
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    Ok(1.0 - poly * (-x * x).exp())
}

/// Round to `decimals` places using round-half-to-even, matching `numpy.round`.
/// Mass-balance residuals are rounded this way before being compared to the
/// 1e-9 cm tolerance, preserving `numpy.round`'s half-to-even semantics.
pub fn round_half_even(x: f64, decimals: i32) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let factor = 10f64.powi(decimals);
    let scaled = x * factor;
    let floor = scaled.floor();
    let diff = scaled - floor;
    let rounded = if (diff - 0.5).abs() < 1e-9 {
        if (floor as i64) % 2 == 0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        scaled.round()
    };
    rounded / factor
}

/// Round to 10 decimal places, the convention used for every mass-balance
/// residual returned by the bilan accountant.
pub fn round10(x: f64) -> f64 {
    round_half_even(x, 10)
}

/// Brent's root-finding method, used by the Green-Ampt solver in place of the
/// source's bounded minimisation of an absolute-value objective (see
/// DESIGN.md, "Numerical robustness"). `f` must have opposite signs at `a`
/// and `b`; if it doesn't (can happen at the saturated/degenerate edges of
/// the Green-Ampt bracket), the endpoint with the smaller |f| is returned
/// rather than panicking.
pub fn brent<F: Fn(f64) -> f64>(f: F, mut a: f64, mut b: f64, tol: f64, max_iter: usize) -> f64 {
    let mut fa = f(a);
    let mut fb = f(b);

    if fa.abs() < tol {
        return a;
    }
    if fb.abs() < tol {
        return b;
    }
    if fa * fb > 0.0 {
        return if fa.abs() < fb.abs() { a } else { b };
    }

    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut mflag = true;
    let mut s;

    for _ in 0..max_iter {
        if fb.abs() < tol || (b - a).abs() < tol {
            return b;
        }

        if fa != fc && fb != fc {
            // Inverse quadratic interpolation.
            s = a * fb * fc / ((fa - fb) * (fa - fc))
                + b * fa * fc / ((fb - fa) * (fb - fc))
                + c * fa * fb / ((fc - fa) * (fc - fb));
        } else {
            // Secant method.
            s = b - fb * (b - a) / (fb - fa);
        }

        let cond1 = (s < (3.0 * a + b) / 4.0 && s < b) || (s > (3.0 * a + b) / 4.0 && s > b);
        let bisect = (3.0 * a + b) / 4.0;
        let out_of_bounds = if a < b { s < a.min(bisect) || s > b.max(bisect) } else { s > a.max(bisect) || s < b.min(bisect) };
        let cond2 = mflag && (s - b).abs() >= (b - c).abs() / 2.0;
        let cond3 = !mflag && (s - b).abs() >= (c - d).abs() / 2.0;
        let cond4 = mflag && (b - c).abs() < tol;
        let cond5 = !mflag && (c - d).abs() < tol;

        if out_of_bounds || cond1 || cond2 || cond3 || cond4 || cond5 {
            s = (a + b) / 2.0;
            mflag = true;
        } else {
            mflag = false;
        }

        let fs = f(s);
        d = c;
        c = b;
        fc = fb;

        if fa * fs < 0.0 {
            b = s;
            fb = fs;
        } else {
            a = s;
            fa = fs;
        }

        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn erf_matches_known_values() {
        assert_approx_eq!(f64, erf(0.0).unwrap(), 0.0, epsilon = 1e-6);
        assert_approx_eq!(f64, erf(1.0).unwrap(), 0.8427007929497149, epsilon = 1e-6);
    }

    #[test]
    fn erf_rejects_negative_argument() {
        assert!(erf(-0.1).is_err());
    }

    #[test]
    fn round_half_even_rounds_ties_to_even() {
        assert_eq!(round_half_even(0.5, 0), 0.0);
        assert_eq!(round_half_even(1.5, 0), 2.0);
        assert_eq!(round_half_even(2.5, 0), 2.0);
    }

    #[test]
    fn round10_matches_round_half_even_at_ten_places() {
        assert_eq!(round10(1.0 / 3.0), round_half_even(1.0 / 3.0, 10));
    }

    #[test]
    fn brent_finds_root_of_a_simple_cubic() {
        let root = brent(|x| x * x * x - x - 2.0, 1.0, 2.0, 1e-10, 100);
        assert_approx_eq!(f64, root, 1.5213797068045676, epsilon = 1e-6);
    }

    #[test]
    fn brent_returns_best_endpoint_when_signs_do_not_bracket() {
        let root = brent(|x| x * x + 1.0, 0.0, 1.0, 1e-10, 50);
        assert!(root == 0.0 || root == 1.0);
    }
}
