//! Evaluate a polynomial with coefficients ordered by increasing order.

/// Evaluate a polynomial with coeffs ordered by increasing order (c[0] + [c1]*x + ...)
#[inline]
pub fn polyval(x: f64, c: &[f64]) -> f64 {
    // Horner's Method, one multiply-add per coefficient, starting from
    // the highest order coefficient.
    c.iter().rev().fold(0.0, |acc, &coef| x.mul_add(acc, coef))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_in_increasing_order() {
        let c = [1.0, 0.5, -0.2];
        for x in [-2.0, -1.0, 0.0, 1.0, 2.0_f64] {
            let expected = 1.0 + 0.5 * x - 0.2 * x * x;
            assert!((polyval(x, &c) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_polynomial_is_zero() {
        assert_eq!(polyval(3.0, &[]), 0.0);
    }
}
