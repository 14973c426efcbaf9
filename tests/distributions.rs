extern crate easy_rev;

#[cfg(test)]
mod negative_binomial_tests {
    use approx::assert_abs_diff_eq;
    use easy_rev::differentiation::{Context, Var};
    use easy_rev::distributions::{neg_binomial_2_lpmf, POISSON_APPROXIMATION_PRECISION};
    use easy_rev::special::lgamma;

    /// The log probability of a single observation written out directly.
    fn log_probability(n: f64, mu: f64, phi: f64) -> f64 {
        lgamma(n + phi) - lgamma(n + 1.0) - lgamma(phi)
            + phi * (phi / (mu + phi)).ln()
            + n * (mu / (mu + phi)).ln()
    }

    /// The total log probability evaluated without recording anything.
    fn total(n: &[i64], mu: f64, phi: f64) -> f64 {
        neg_binomial_2_lpmf(n, &[Var::constant(mu)], &[Var::constant(phi)])
            .unwrap()
            .number
    }

    #[test]
    fn test_single_observation() {
        let context = Context::new();
        let mu = context.variable(10.0);
        let phi = context.variable(5.0);
        let y = neg_binomial_2_lpmf(&[6], &[mu], &[phi]).unwrap();
        assert_abs_diff_eq!(y.number, log_probability(6.0, 10.0, 5.0), epsilon = 1e-12);
        // a single node for the whole density, on top of the two leaves
        assert_eq!(context.len(), 3);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let context = Context::new();
        let n = [0, 3, 8, 17];
        let (location, precision) = (7.5, 2.25);
        let mu = context.variable(location);
        let phi = context.variable(precision);
        let y = neg_binomial_2_lpmf(&n, &[mu], &[phi]).unwrap();
        let derivatives = y.derivatives();

        let h = 1e-5;
        let d_mu = (total(&n, location + h, precision) - total(&n, location - h, precision)) / (2.0 * h);
        let d_phi = (total(&n, location, precision + h) - total(&n, location, precision - h)) / (2.0 * h);
        assert_abs_diff_eq!(derivatives[&mu], d_mu, epsilon = 1e-6);
        assert_abs_diff_eq!(derivatives[&phi], d_phi, epsilon = 1e-6);
    }

    #[test]
    fn test_broadcasting_parameters() {
        let context = Context::new();
        let mu = [context.variable(2.0), context.variable(9.0)];
        let phi = context.variable(3.0);
        let y = neg_binomial_2_lpmf(&[1, 4], &mu, &[phi]).unwrap();
        let expected = log_probability(1.0, 2.0, 3.0) + log_probability(4.0, 9.0, 3.0);
        assert_abs_diff_eq!(y.number, expected, epsilon = 1e-12);

        let derivatives = y.derivatives();
        // each location only sees its own observation
        assert_abs_diff_eq!(derivatives[&mu[0]], 1.0 / 2.0 - 4.0 / 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(derivatives[&mu[1]], 4.0 / 9.0 - 7.0 / 12.0, epsilon = 1e-12);

        // and a single count is reused for every location
        let z = neg_binomial_2_lpmf(&[4], &mu, &[phi]).unwrap();
        let expected = log_probability(4.0, 2.0, 3.0) + log_probability(4.0, 9.0, 3.0);
        assert_abs_diff_eq!(z.number, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_parameters() {
        let y = neg_binomial_2_lpmf(&[2], &[Var::constant(4.0)], &[Var::constant(1.5)]).unwrap();
        assert!(y.is_constant());
        assert_abs_diff_eq!(y.number, log_probability(2.0, 4.0, 1.5), epsilon = 1e-12);
    }

    #[test]
    fn test_empty_arguments() {
        let context = Context::new();
        let mu = context.variable(1.0);
        let phi = context.variable(1.0);
        let y = neg_binomial_2_lpmf(&[], &[mu], &[phi]).unwrap();
        assert_eq!(y.number, 0.0);
        assert!(y.is_constant());
        assert_eq!(neg_binomial_2_lpmf(&[1], &[], &[phi]).unwrap().number, 0.0);
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn test_large_precision_is_poisson() {
        let context = Context::new();
        let mu = context.variable(3.0);
        let phi = context.variable(POISSON_APPROXIMATION_PRECISION * 10.0);
        let y = neg_binomial_2_lpmf(&[2], &[mu], &[phi]).unwrap();
        // P(2 | 3) = 3^2 e^-3 / 2!
        let poisson = (9.0 * (-3.0_f64).exp() / 2.0).ln();
        assert_abs_diff_eq!(y.number, poisson, epsilon = 1e-12);
        // and the gradient approaches the Poisson one, n/mu - 1
        assert_abs_diff_eq!(y.derivatives()[&mu], 2.0 / 3.0 - 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_invalid_arguments() {
        let context = Context::new();
        let mu = context.variable(2.0);
        let phi = context.variable(1.0);

        let error = neg_binomial_2_lpmf(&[-1], &[mu], &[phi]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "neg_binomial_2_lpmf: Failures variable is -1, but must be nonnegative"
        );

        let error = neg_binomial_2_lpmf(&[1], &[context.variable(-1.5)], &[phi]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "neg_binomial_2_lpmf: Location parameter is -1.5, but must be positive finite"
        );

        let error = neg_binomial_2_lpmf(&[1], &[mu], &[context.variable(f64::INFINITY)]).unwrap_err();
        assert_eq!(error.argument, "Precision parameter");
        assert_eq!(error.constraint, "positive finite");

        let error = neg_binomial_2_lpmf(&[1], &[mu], &[context.variable(f64::NAN)]).unwrap_err();
        assert_eq!(error.value, "NaN");

        let error = neg_binomial_2_lpmf(&[1, 2, 3], &[mu, mu], &[phi]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "neg_binomial_2_lpmf: Location parameter is of size 2, but must be of size 1 or the same size as Failures variable (3)"
        );
    }

    #[test]
    fn test_errors_record_nothing() {
        let context = Context::new();
        let mu = context.variable(2.0);
        let phi = context.variable(-1.0);
        let before = context.len();
        assert!(neg_binomial_2_lpmf(&[1], &[mu], &[phi]).is_err());
        assert_eq!(context.len(), before);
    }
}

#[cfg(test)]
mod poisson_tests {
    use approx::assert_abs_diff_eq;
    use easy_rev::differentiation::Context;
    use easy_rev::distributions::poisson_lpmf;

    #[test]
    fn test_poisson() {
        let context = Context::new();
        let lambda = context.variable(2.0);
        let y = poisson_lpmf(&[0, 1, 2], &[lambda]).unwrap();
        // ln(e^-2) + ln(2 e^-2) + ln(4 e^-2 / 2)
        let expected = -6.0 + 2.0 * 2.0_f64.ln();
        assert_abs_diff_eq!(y.number, expected, epsilon = 1e-12);
        // Σ n/λ - 1
        assert_abs_diff_eq!(y.derivatives()[&lambda], 1.5 - 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_rate() {
        let context = Context::new();
        let lambda = context.variable(0.0);
        let y = poisson_lpmf(&[0], &[lambda]).unwrap();
        assert_eq!(y.number, 0.0);
        assert_eq!(y.derivatives()[&lambda], -1.0);
        let z = poisson_lpmf(&[0, 1], &[lambda]).unwrap();
        assert_eq!(z.number, f64::NEG_INFINITY);
        assert!(z.is_constant());
    }

    #[test]
    fn test_infinite_rate() {
        let context = Context::new();
        let lambda = context.variable(f64::INFINITY);
        let y = poisson_lpmf(&[3], &[lambda]).unwrap();
        assert_eq!(y.number, f64::NEG_INFINITY);
    }

    #[test]
    fn test_invalid_rate() {
        let context = Context::new();
        let error = poisson_lpmf(&[3], &[context.variable(-0.5)]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "poisson_lpmf: Rate parameter is -0.5, but must be nonnegative"
        );
        assert!(poisson_lpmf(&[-3], &[context.variable(0.5)]).is_err());
    }
}

#[cfg(test)]
mod categorical_tests {
    use approx::assert_abs_diff_eq;
    use easy_rev::differentiation::Context;
    use easy_rev::distributions::categorical_lpmf;

    #[test]
    fn test_categorical() {
        let context = Context::new();
        let theta = [
            context.variable(0.2),
            context.variable(0.3),
            context.variable(0.5),
        ];
        let y = categorical_lpmf(&[1, 3, 3], &theta).unwrap();
        let expected = 0.2_f64.ln() + 2.0 * 0.5_f64.ln();
        assert_abs_diff_eq!(y.number, expected, epsilon = 1e-12);
        let derivatives = y.derivatives();
        assert_abs_diff_eq!(derivatives[&theta[0]], 5.0, epsilon = 1e-12);
        assert_eq!(derivatives[&theta[1]], 0.0);
        assert_abs_diff_eq!(derivatives[&theta[2]], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_no_outcomes() {
        let context = Context::new();
        let theta = [context.variable(0.5), context.variable(0.5)];
        let y = categorical_lpmf(&[], &theta).unwrap();
        assert_eq!(y.number, 0.0);
        assert!(y.is_constant());
    }

    #[test]
    fn test_invalid_outcomes() {
        let context = Context::new();
        let theta = [
            context.variable(0.2),
            context.variable(0.3),
            context.variable(0.5),
        ];
        let error = categorical_lpmf(&[4], &theta).unwrap_err();
        assert_eq!(
            error.to_string(),
            "categorical_lpmf: Number of categories is 4, but must be in the interval [1, 3]"
        );
        assert!(categorical_lpmf(&[0], &theta).is_err());
    }

    #[test]
    fn test_invalid_simplex() {
        let context = Context::new();
        let theta = [context.variable(0.5), context.variable(0.6)];
        let error = categorical_lpmf(&[1], &theta).unwrap_err();
        assert_eq!(error.constraint, "a simplex summing to 1");
        let theta = [context.variable(-0.5), context.variable(1.5)];
        let error = categorical_lpmf(&[1], &theta).unwrap_err();
        assert_eq!(error.argument, "Probabilities parameter element 0");
        assert!(categorical_lpmf(&[1], &[]).is_err());
    }
}
