/*!
 * Error types for functions built on top of the differentiation core.
 *
 * The core itself has no recoverable errors: arenas grow as needed, NaN is propagated
 * rather than rejected, and misuse of a Context is a bug that panics. Functions which take
 * arguments with restricted domains, such as probability distributions, check them before
 * recording anything and return a [DomainError] describing the first violation.
 */

use std::fmt::Display;

use thiserror::Error;

/**
 * An argument was outside the domain of a function.
 *
 * ```
 * use easy_rev::errors::check_positive_finite;
 * let error = check_positive_finite("neg_binomial_2_lpmf", "Location parameter", -1.5).unwrap_err();
 * assert_eq!(
 *     error.to_string(),
 *     "neg_binomial_2_lpmf: Location parameter is -1.5, but must be positive finite"
 * );
 * ```
 */
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{function}: {argument} is {value}, but must be {constraint}")]
pub struct DomainError {
    pub function: &'static str,
    pub argument: String,
    pub value: String,
    pub constraint: String,
}

impl DomainError {
    pub fn new(
        function: &'static str,
        argument: impl Into<String>,
        value: impl Display,
        constraint: impl Into<String>,
    ) -> DomainError {
        DomainError {
            function,
            argument: argument.into(),
            value: value.to_string(),
            constraint: constraint.into(),
        }
    }
}

/**
 * Errors returned by the [algebra solver](crate::solver::algebra_solver).
 */
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SolverError {
    /// The solver took the maximum number of steps without converging.
    #[error("algebra_solver: max number of iterations: {steps} exceeded, the residual is {residual}")]
    MaxStepsExceeded { steps: usize, residual: f64 },

    /// The trust region collapsed before the residual was within tolerance.
    #[error("algebra_solver: the step size shrank below the relative tolerance, the residual is {residual}")]
    Stalled { residual: f64 },

    /// The system evaluated to a non finite number.
    #[error("algebra_solver: element {index} of the system is {value}, but must be finite")]
    NonFinite { index: usize, value: f64 },

    /// An argument had the wrong number of elements.
    #[error("algebra_solver: {argument} has {actual} elements, but must have {expected}")]
    DimensionMismatch {
        argument: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The Jacobian with respect to the unknowns could not be inverted at the solution.
    #[error("algebra_solver: the Jacobian of the system is singular at the solution")]
    Singular,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/**
 * Checks a number is finite and greater than 0.
 */
pub fn check_positive_finite(function: &'static str, argument: &str, x: f64) -> Result<(), DomainError> {
    if x.is_finite() && x > 0.0 {
        Ok(())
    } else {
        Err(DomainError::new(function, argument, x, "positive finite"))
    }
}

/**
 * Checks a number is not negative. NaN is rejected.
 */
pub fn check_nonnegative<T>(function: &'static str, argument: &str, x: T) -> Result<(), DomainError>
where
    T: PartialOrd + Default + Display,
{
    if x >= T::default() {
        Ok(())
    } else {
        Err(DomainError::new(function, argument, x, "nonnegative"))
    }
}

/**
 * Checks a number is neither infinite nor NaN.
 */
pub fn check_finite(function: &'static str, argument: &str, x: f64) -> Result<(), DomainError> {
    if x.is_finite() {
        Ok(())
    } else {
        Err(DomainError::new(function, argument, x, "finite"))
    }
}

/**
 * Checks a number is within `[low, high]` inclusive.
 */
pub fn check_bounded<T>(function: &'static str, argument: &str, x: T, low: T, high: T) -> Result<(), DomainError>
where
    T: PartialOrd + Display,
{
    if x >= low && x <= high {
        Ok(())
    } else {
        let constraint = format!("in the interval [{}, {}]", low, high);
        Err(DomainError::new(function, argument, x, constraint))
    }
}

/**
 * Checks a collection is not empty.
 */
pub fn check_nonzero_size(function: &'static str, argument: &str, size: usize) -> Result<(), DomainError> {
    if size > 0 {
        Ok(())
    } else {
        Err(DomainError::new(function, argument, "empty", "nonempty"))
    }
}

/**
 * Checks several named arguments can be broadcast together: each has either one element,
 * which is reused for every position, or the same number of elements as the longest.
 */
pub fn check_consistent_sizes(function: &'static str, sizes: &[(&str, usize)]) -> Result<(), DomainError> {
    let longest = sizes.iter().copied().max_by_key(|&(_, size)| size);
    if let Some((longest_argument, longest_size)) = longest {
        for &(argument, size) in sizes {
            if size != 1 && size != longest_size {
                let value = format!("of size {}", size);
                let constraint = format!(
                    "of size 1 or the same size as {} ({})",
                    longest_argument, longest_size
                );
                return Err(DomainError::new(function, argument, value, constraint));
            }
        }
    }
    Ok(())
}

/**
 * Checks the numbers form a simplex: they are not empty, none are negative, and they sum
 * to 1 within `1e-8`.
 */
pub fn check_simplex(function: &'static str, argument: &str, theta: &[f64]) -> Result<(), DomainError> {
    check_nonzero_size(function, argument, theta.len())?;
    for (i, &x) in theta.iter().enumerate() {
        if x.is_nan() || x < 0.0 {
            let element = format!("{} element {}", argument, i);
            return Err(DomainError::new(function, element, x, "nonnegative"));
        }
    }
    let total: f64 = theta.iter().sum();
    if (total - 1.0).abs() <= 1e-8 {
        Ok(())
    } else {
        let value = format!("a vector summing to {}", total);
        Err(DomainError::new(function, argument, value, "a simplex summing to 1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonnegative_counts() {
        assert!(check_nonnegative("f", "n", 0_i64).is_ok());
        let error = check_nonnegative("f", "n", -1_i64).unwrap_err();
        assert_eq!(error.to_string(), "f: n is -1, but must be nonnegative");
        assert!(check_nonnegative("f", "x", f64::NAN).is_err());
    }

    #[test]
    fn broadcasting_sizes() {
        assert!(check_consistent_sizes("f", &[("a", 3), ("b", 1), ("c", 3)]).is_ok());
        assert!(check_consistent_sizes("f", &[]).is_ok());
        let error = check_consistent_sizes("f", &[("a", 3), ("b", 2)]).unwrap_err();
        assert_eq!(error.argument, "b");
    }

    #[test]
    fn simplexes() {
        assert!(check_simplex("f", "theta", &[0.25, 0.25, 0.5]).is_ok());
        assert!(check_simplex("f", "theta", &[0.5, 0.6]).is_err());
        assert!(check_simplex("f", "theta", &[1.5, -0.5]).is_err());
        assert!(check_simplex("f", "theta", &[]).is_err());
    }

    #[test]
    fn bounded() {
        assert!(check_bounded("f", "n", 3, 1, 3).is_ok());
        let error = check_bounded("f", "n", 4, 1, 3).unwrap_err();
        assert_eq!(error.to_string(), "f: n is 4, but must be in the interval [1, 3]");
    }
}
