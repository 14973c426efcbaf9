/*!
Log probability mass functions of discrete distributions, differentiable with respect to
their parameters.

Each function checks its arguments, computes the total log probability of every observation
and the partial derivatives with respect to each parameter on plain `f64`s, then records a
single node on the parameters' Context holding the total and those partials. The terms in
between are never recorded, so the size of the graph does not grow with the number of
observations.

Parameters are given as slices which are broadcast against each other: a slice with a
single element is reused for every observation, any other slice must have one element per
observation.

# Example of a negative binomial gradient

```
use easy_rev::differentiation::Context;
use easy_rev::distributions::neg_binomial_2_lpmf;

let context = Context::new();
let mu = context.variable(4.0);
let phi = context.variable(2.5);
// three observations sharing the same location and precision
let log_probability = neg_binomial_2_lpmf(&[1, 3, 7], &[mu], &[phi]).unwrap();
assert!(log_probability.number < 0.0);
let derivatives = log_probability.derivatives();
// δ/δmu = Σ n/mu - (n + phi)/(mu + phi)
let expected: f64 = [1.0, 3.0, 7.0].iter().map(|n| n / 4.0 - (n + 2.5) / 6.5).sum();
assert!((derivatives[&mu] - expected).abs() < 1e-12);
```
 */

use crate::differentiation::{precomputed_gradients, Var};
use crate::errors::{
    check_bounded, check_consistent_sizes, check_nonnegative, check_positive_finite,
    check_simplex, DomainError,
};
use crate::special::{digamma, lgamma};

/**
 * Above this precision the negative binomial is numerically indistinguishable from, and
 * evaluated as, a Poisson with the same location.
 */
pub const POISSON_APPROXIMATION_PRECISION: f64 = 1e5;

fn multiply_log(a: f64, b: f64) -> f64 {
    if a == 0.0 && b == 0.0 {
        0.0
    } else {
        a * b.ln()
    }
}

fn poisson_term(n: f64, lambda: f64) -> f64 {
    if lambda == f64::INFINITY || (lambda == 0.0 && n != 0.0) {
        f64::NEG_INFINITY
    } else {
        multiply_log(n, lambda) - lambda - lgamma(n + 1.0)
    }
}

/**
 * The log probability of observing each number of failures `n` from a negative binomial
 * distribution with location `mu` and precision `phi`, which has mean `mu` and variance
 * `mu + mu^2 / phi`.
 *
 * Returns a constant 0 if any argument is empty.
 *
 * # Errors
 *
 * If a count is negative, a location or precision is not positive finite, or the sizes of
 * the arguments can't be broadcast together.
 */
#[track_caller]
pub fn neg_binomial_2_lpmf<'a>(n: &[i64], mu: &[Var<'a>], phi: &[Var<'a>]) -> Result<Var<'a>, DomainError> {
    const FUNCTION: &str = "neg_binomial_2_lpmf";
    if n.is_empty() || mu.is_empty() || phi.is_empty() {
        return Ok(Var::constant(0.0));
    }
    for &count in n {
        check_nonnegative(FUNCTION, "Failures variable", count)?;
    }
    for location in mu {
        check_positive_finite(FUNCTION, "Location parameter", location.number)?;
    }
    for precision in phi {
        check_positive_finite(FUNCTION, "Precision parameter", precision.number)?;
    }
    check_consistent_sizes(
        FUNCTION,
        &[
            ("Failures variable", n.len()),
            ("Location parameter", mu.len()),
            ("Precision parameter", phi.len()),
        ],
    )?;

    let size = n.len().max(mu.len()).max(phi.len());
    let mut log_probability = 0.0;
    let mut mu_partials = vec![0.0; mu.len()];
    let mut phi_partials = vec![0.0; phi.len()];
    for i in 0..size {
        let count = n[i % n.len()] as f64;
        let location = mu[i % mu.len()].number;
        let precision = phi[i % phi.len()].number;
        let count_plus_precision = count + precision;
        let log_location_plus_precision = (location + precision).ln();

        if precision > POISSON_APPROXIMATION_PRECISION {
            log_probability += poisson_term(count, location);
        } else {
            log_probability += multiply_log(precision, precision) - lgamma(precision)
                + multiply_log(count, location)
                + lgamma(count_plus_precision)
                - lgamma(count + 1.0)
                - count_plus_precision * log_location_plus_precision;
        }

        mu_partials[i % mu.len()] +=
            count / location - count_plus_precision / (location + precision);
        phi_partials[i % phi.len()] += 1.0 - count_plus_precision / (location + precision)
            + precision.ln()
            - log_location_plus_precision
            - digamma(precision)
            + digamma(count_plus_precision);
    }

    let operands: Vec<Var<'a>> = mu.iter().chain(phi).copied().collect();
    let partials: Vec<f64> = mu_partials.into_iter().chain(phi_partials).collect();
    Ok(precomputed_gradients(log_probability, &operands, &partials))
}

/**
 * The log probability of observing each count `n` from a Poisson distribution with rate
 * `lambda`.
 *
 * Returns a constant 0 if either argument is empty, and negative infinity if a rate is
 * infinite or is 0 for a nonzero count.
 *
 * # Errors
 *
 * If a count or rate is negative or NaN, or the sizes of the arguments can't be broadcast
 * together.
 */
#[track_caller]
pub fn poisson_lpmf<'a>(n: &[i64], lambda: &[Var<'a>]) -> Result<Var<'a>, DomainError> {
    const FUNCTION: &str = "poisson_lpmf";
    if n.is_empty() || lambda.is_empty() {
        return Ok(Var::constant(0.0));
    }
    for &count in n {
        check_nonnegative(FUNCTION, "Random variable", count)?;
    }
    for rate in lambda {
        check_nonnegative(FUNCTION, "Rate parameter", rate.number)?;
    }
    check_consistent_sizes(
        FUNCTION,
        &[("Random variable", n.len()), ("Rate parameter", lambda.len())],
    )?;

    let size = n.len().max(lambda.len());
    let mut log_probability = 0.0;
    let mut partials = vec![0.0; lambda.len()];
    for i in 0..size {
        let count = n[i % n.len()] as f64;
        let rate = lambda[i % lambda.len()].number;
        let term = poisson_term(count, rate);
        if term == f64::NEG_INFINITY {
            return Ok(Var::constant(f64::NEG_INFINITY));
        }
        log_probability += term;
        // δ/δλ (n ln(λ) - λ) = n/λ - 1
        partials[i % lambda.len()] += if count == 0.0 { -1.0 } else { count / rate - 1.0 };
    }
    Ok(precomputed_gradients(log_probability, lambda, &partials))
}

/**
 * The log probability of observing each outcome in `ns` from a categorical distribution
 * over `theta.len()` outcomes, where outcome `k` has probability `theta[k - 1]`. Outcomes
 * are numbered from 1.
 *
 * Returns a constant 0 if there are no outcomes.
 *
 * # Errors
 *
 * If theta is not a simplex or an outcome is not between 1 and `theta.len()`.
 */
#[track_caller]
pub fn categorical_lpmf<'a>(ns: &[usize], theta: &[Var<'a>]) -> Result<Var<'a>, DomainError> {
    const FUNCTION: &str = "categorical_lpmf";
    let probabilities: Vec<f64> = theta.iter().map(|p| p.number).collect();
    check_simplex(FUNCTION, "Probabilities parameter", &probabilities)?;
    for &outcome in ns {
        check_bounded(FUNCTION, "Number of categories", outcome, 1, theta.len())?;
    }
    if ns.is_empty() {
        return Ok(Var::constant(0.0));
    }

    let mut counts = vec![0.0; theta.len()];
    for &outcome in ns {
        counts[outcome - 1] += 1.0;
    }
    let log_probability = counts
        .iter()
        .zip(&probabilities)
        .filter(|(count, _)| **count > 0.0)
        .map(|(count, p)| count * p.ln())
        .sum();
    // δ/δθ_k (c_k ln(θ_k)) = c_k / θ_k
    let partials: Vec<f64> = counts
        .iter()
        .zip(&probabilities)
        .map(|(count, p)| if *count > 0.0 { count / p } else { 0.0 })
        .collect();
    Ok(precomputed_gradients(log_probability, theta, &partials))
}
