/*!
 * Special functions on `f64` needed to evaluate log densities and their derivatives.
 *
 * These are plain numeric functions, the differentiable versions in
 * [functions](crate::functions) use them to compute values and partials.
 */

use std::f64::consts::PI;

// Lanczos approximation with g = 7 and 9 coefficients
const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];
// ln(sqrt(2π))
const LN_SQRT_2_PI: f64 = 0.918_938_533_204_672_8;

/**
 * The natural logarithm of the absolute value of the gamma function.
 *
 * Infinite at 0 and the negative integers, where the gamma function has poles.
 *
 * ```
 * use easy_rev::special::lgamma;
 * // Γ(5) = 4! = 24
 * assert!((lgamma(5.0) - 24.0_f64.ln()).abs() < 1e-12);
 * ```
 */
pub fn lgamma(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x.is_infinite() {
        return f64::INFINITY;
    }
    if x <= 0.0 && x == x.floor() {
        return f64::INFINITY;
    }
    // Γ(1) = Γ(2) = 1 exactly
    if x == 1.0 || x == 2.0 {
        return 0.0;
    }
    if x < 0.5 {
        // Γ(x)Γ(1 - x) = π / sin(πx)
        return (PI / (PI * x).sin().abs()).ln() - lgamma(1.0 - x);
    }
    let z = x - 1.0;
    let mut sum = LANCZOS_COEFFICIENTS[0];
    for (i, &coefficient) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
        sum += coefficient / (z + i as f64);
    }
    let t = z + LANCZOS_G + 0.5;
    LN_SQRT_2_PI + (z + 0.5) * t.ln() - t + sum.ln()
}

/**
 * The digamma function, the derivative of [lgamma].
 *
 * NaN at 0 and the negative integers.
 *
 * ```
 * use easy_rev::special::digamma;
 * // ψ(1) = -γ
 * assert!((digamma(1.0) + 0.577_215_664_901_532_9).abs() < 1e-12);
 * ```
 */
pub fn digamma(x: f64) -> f64 {
    if x.is_nan() || x == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return f64::INFINITY;
    }
    if x <= 0.0 {
        if x == x.floor() {
            return f64::NAN;
        }
        // ψ(1 - x) - ψ(x) = π / tan(πx)
        return digamma(1.0 - x) - PI / (PI * x).tan();
    }
    // ψ(x + 1) = ψ(x) + 1/x, shift up until the asymptotic series is accurate
    let mut x = x;
    let mut shift = 0.0;
    while x < 10.0 {
        shift -= 1.0 / x;
        x += 1.0;
    }
    let inverse = 1.0 / x;
    let inverse_squared = inverse * inverse;
    // ψ(x) ≈ ln(x) - 1/2x - Σ B_2k / (2k x^2k)
    let series = inverse_squared
        * (1.0 / 12.0
            - inverse_squared
                * (1.0 / 120.0
                    - inverse_squared
                        * (1.0 / 252.0
                            - inverse_squared * (1.0 / 240.0 - inverse_squared * (1.0 / 132.0)))));
    shift + x.ln() - 0.5 * inverse - series
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

    #[test]
    fn lgamma_of_factorials() {
        let mut factorial = 1.0_f64;
        for n in 1..20 {
            assert_abs_diff_eq!(lgamma(n as f64), factorial.ln(), epsilon = 1e-11);
            factorial *= n as f64;
        }
    }

    #[test]
    fn lgamma_of_halves() {
        // Γ(1/2) = √π
        assert_abs_diff_eq!(lgamma(0.5), PI.sqrt().ln(), epsilon = 1e-12);
        // Γ(-1/2) = -2√π
        assert_abs_diff_eq!(lgamma(-0.5), (2.0 * PI.sqrt()).ln(), epsilon = 1e-12);
        // Γ(3/2) = √π / 2
        assert_abs_diff_eq!(lgamma(1.5), (PI.sqrt() / 2.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn lgamma_poles() {
        assert_eq!(lgamma(0.0), f64::INFINITY);
        assert_eq!(lgamma(-3.0), f64::INFINITY);
        assert!(lgamma(f64::NAN).is_nan());
    }

    #[test]
    fn digamma_known_values() {
        assert_abs_diff_eq!(digamma(1.0), -EULER_MASCHERONI, epsilon = 1e-12);
        assert_abs_diff_eq!(
            digamma(0.5),
            -EULER_MASCHERONI - 2.0 * 2.0_f64.ln(),
            epsilon = 1e-12
        );
        // ψ(n) = H(n-1) - γ
        let harmonic: f64 = (1..10).map(|k| 1.0 / k as f64).sum();
        assert_abs_diff_eq!(digamma(10.0), harmonic - EULER_MASCHERONI, epsilon = 1e-12);
    }

    #[test]
    fn digamma_recurrence() {
        for &x in &[0.1, 0.75, 2.5, 7.25, 31.0, -0.5, -2.25] {
            assert_abs_diff_eq!(digamma(x + 1.0) - digamma(x), 1.0 / x, epsilon = 1e-10);
        }
    }

    #[test]
    fn digamma_is_derivative_of_lgamma() {
        let h = 1e-5;
        for &x in &[0.3, 1.7, 4.0, 12.5, 150.0] {
            let finite_difference = (lgamma(x + h) - lgamma(x - h)) / (2.0 * h);
            assert_abs_diff_eq!(digamma(x), finite_difference, epsilon = 1e-7);
        }
    }

    #[test]
    fn digamma_poles() {
        assert!(digamma(0.0).is_nan());
        assert!(digamma(-2.0).is_nan());
    }
}
