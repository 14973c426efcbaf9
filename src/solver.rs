/*!
 * An algebraic equation solver that is differentiable with respect to its parameters.
 *
 * [algebra_solver] finds `x` such that `f(x, y) = 0` with Powell's dogleg method. Every
 * evaluation of the system and its Jacobian happens inside a nested region of the Context,
 * so none of the many temporary nodes the iterations record are left on the tape, and the
 * graph the parameters `y` belong to is never modified. The solution is then recorded as a
 * single batched node whose backward rule applies the implicit function theorem,
 * `dx/dy = -J_x^-1 J_y`, with both Jacobians evaluated at the solution.
 *
 * ```
 * use easy_rev::differentiation::Context;
 * use easy_rev::solver::{algebra_solver, SolverConfig};
 * let context = Context::new();
 * let y = context.variable(9.0);
 * // x^2 - y = 0
 * let x = algebra_solver(
 *     &context,
 *     |x, y| vec![(x[0] * x[0]) - y[0]],
 *     &[1.0],
 *     &[y],
 *     &SolverConfig::default(),
 * ).unwrap();
 * assert!((x[0].number - 3.0).abs() < 1e-9);
 * // dx/dy = 1 / 2sqrt(y)
 * assert!((x[0].derivatives()[&y] - 1.0 / 6.0).abs() < 1e-9);
 * ```
 */

use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::differentiation::{context_of, jacobian, Adjoints, Context, NodeId, Var};
use crate::errors::{check_finite, check_nonnegative, check_nonzero_size, SolverError};
use crate::linear_algebra::{multiply, norm, solve, transpose};

/**
 * Settings for [algebra_solver].
 *
 * The solver has converged once every element of the system is within
 * `function_tolerance` of 0. It gives up if it takes `max_steps` steps without converging,
 * or if the trust region it steps within shrinks below `relative_tolerance` relative to
 * the size of the current guess, which happens when the system has no root near the guess.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    pub function_tolerance: f64,
    pub relative_tolerance: f64,
    pub max_steps: usize,
    pub initial_trust_radius: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            function_tolerance: 1e-10,
            relative_tolerance: 1e-10,
            max_steps: 200,
            initial_trust_radius: 1.0,
        }
    }
}

/**
 * The system and its Jacobians at one point.
 */
#[derive(Clone, Debug)]
struct Evaluation {
    values: Vec<f64>,
    // one row per output, one column per unknown
    jacobian_x: Vec<Vec<f64>>,
    // one row per output, one column per parameter
    jacobian_y: Vec<Vec<f64>>,
}

/**
 * Evaluates the system on fresh leaves for `x` and the parameter values inside a nested
 * region, so the Context is left exactly as it was.
 */
fn evaluate<'a, F>(context: &'a Context, f: &F, x: &[f64], y: &[f64]) -> Result<Evaluation, SolverError>
where
    F: Fn(&[Var<'a>], &[Var<'a>]) -> Vec<Var<'a>>,
{
    let unknowns = x.len();
    let inputs: Vec<f64> = x.iter().chain(y).copied().collect();
    let (values, rows) = jacobian(
        context,
        |inputs| f(&inputs[..unknowns], &inputs[unknowns..]),
        &inputs,
    );
    if values.len() != unknowns {
        return Err(SolverError::DimensionMismatch {
            argument: "System output",
            expected: unknowns,
            actual: values.len(),
        });
    }
    if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(SolverError::NonFinite { index, value });
    }
    let (jacobian_x, jacobian_y): (Vec<Vec<f64>>, Vec<Vec<f64>>) = rows
        .into_iter()
        .map(|mut row| {
            let parameters = row.split_off(unknowns);
            (row, parameters)
        })
        .unzip();
    Ok(Evaluation {
        values,
        jacobian_x,
        jacobian_y,
    })
}

fn squared_norm(x: &[f64]) -> f64 {
    x.iter().map(|x| x * x).sum()
}

fn max_abs(x: &[f64]) -> f64 {
    x.iter().fold(0.0, |largest: f64, x| largest.max(x.abs()))
}

/**
 * Chooses a step within the trust region `radius` towards the root of the linearisation of
 * the system: the Gauss-Newton step if it fits, otherwise the point where the path from the
 * steepest descent minimiser to the Gauss-Newton step leaves the region.
 */
fn dogleg_step(jacobian: &[Vec<f64>], values: &[f64], radius: f64) -> Vec<f64> {
    let negative_values: Vec<f64> = values.iter().map(|v| -v).collect();
    let gauss_newton = solve(jacobian, &negative_values);
    if let Some(step) = &gauss_newton {
        if norm(step) <= radius {
            return step.clone();
        }
    }
    // gradient of 0.5 |f|^2
    let gradient = multiply(&transpose(jacobian), values);
    let gradient_norm = norm(&gradient);
    if gradient_norm == 0.0 {
        return vec![0.0; values.len()];
    }
    let curvature = squared_norm(&multiply(jacobian, &gradient));
    let cauchy_scale = (gradient_norm * gradient_norm) / curvature;
    let cauchy_norm = cauchy_scale * gradient_norm;
    if cauchy_norm >= radius || !cauchy_norm.is_finite() {
        return gradient.iter().map(|g| -radius * g / gradient_norm).collect();
    }
    let cauchy: Vec<f64> = gradient.iter().map(|g| -cauchy_scale * g).collect();
    match gauss_newton {
        None => cauchy,
        Some(gauss_newton) => {
            // solve |cauchy + tau (gauss_newton - cauchy)| = radius for tau in [0, 1]
            let difference: Vec<f64> = gauss_newton
                .iter()
                .zip(&cauchy)
                .map(|(n, c)| n - c)
                .collect();
            let a = squared_norm(&difference);
            let b = 2.0 * cauchy.iter().zip(&difference).map(|(c, d)| c * d).sum::<f64>();
            let c = squared_norm(&cauchy) - radius * radius;
            let tau = (-b + (b * b - 4.0 * a * c).max(0.0).sqrt()) / (2.0 * a);
            cauchy
                .iter()
                .zip(&difference)
                .map(|(c, d)| c + tau * d)
                .collect()
        }
    }
}

/**
 * Solves `f(x, parameters) = 0` for `x`, starting from `x_guess`.
 *
 * The system must return one element per unknown and should only be built from the
 * unknowns and parameters it is given and constants. It is evaluated on new leaves every
 * time, never on the `parameters` themselves.
 *
 * The returned solution is recorded on the Context as a single node depending on every
 * non constant parameter. If every parameter is a constant the solution is returned as
 * constants instead.
 *
 * # Errors
 *
 * - [SolverError::Domain] if `x_guess` is empty, `x_guess` or a parameter is not finite,
 *   or a tolerance in the config is negative
 * - [SolverError::DimensionMismatch] if the system returns the wrong number of elements
 * - [SolverError::NonFinite] if the system is not finite at the guess
 * - [SolverError::MaxStepsExceeded] or [SolverError::Stalled] if the solver does not
 *   converge
 * - [SolverError::Singular] if the Jacobian with respect to `x` can't be inverted at the
 *   solution, so the derivatives with respect to the parameters are undefined
 *
 * # Panics
 *
 * If the parameters are recorded on a different Context.
 */
#[track_caller]
pub fn algebra_solver<'a, F>(
    context: &'a Context,
    f: F,
    x_guess: &[f64],
    parameters: &[Var<'a>],
    config: &SolverConfig,
) -> Result<Vec<Var<'a>>, SolverError>
where
    F: Fn(&[Var<'a>], &[Var<'a>]) -> Vec<Var<'a>>,
{
    const FUNCTION: &str = "algebra_solver";
    if let Some(history) = context_of(parameters) {
        assert!(
            std::ptr::eq(history, context),
            "Vars must be using the same Context"
        );
    }
    check_nonzero_size(FUNCTION, "initial guess", x_guess.len())?;
    for &x in x_guess {
        check_finite(FUNCTION, "initial guess", x)?;
    }
    for parameter in parameters {
        check_finite(FUNCTION, "parameter vector", parameter.number)?;
    }
    check_nonnegative(FUNCTION, "function_tolerance", config.function_tolerance)?;
    check_nonnegative(FUNCTION, "relative_tolerance", config.relative_tolerance)?;

    let y: Vec<f64> = parameters.iter().map(|p| p.number).collect();
    let mut x = x_guess.to_vec();
    let mut current = evaluate(context, &f, &x, &y)?;
    let mut radius = config.initial_trust_radius;
    for step in 0..=config.max_steps {
        let residual = max_abs(&current.values);
        debug!(
            "{}: step {} residual {} trust radius {}",
            FUNCTION, step, residual, radius
        );
        if residual <= config.function_tolerance {
            return implicit_solution(context, x, &current, parameters);
        }
        if step == config.max_steps {
            return Err(SolverError::MaxStepsExceeded {
                steps: config.max_steps,
                residual,
            });
        }

        let proposal = dogleg_step(&current.jacobian_x, &current.values, radius);
        let proposal_norm = norm(&proposal);
        let cost = 0.5 * squared_norm(&current.values);
        let linearised: Vec<f64> = current
            .values
            .iter()
            .zip(multiply(&current.jacobian_x, &proposal))
            .map(|(value, change)| value + change)
            .collect();
        let predicted = cost - 0.5 * squared_norm(&linearised);

        let trial_x: Vec<f64> = x.iter().zip(&proposal).map(|(x, p)| x + p).collect();
        let trial = match evaluate(context, &f, &trial_x, &y) {
            Ok(trial) => Some(trial),
            // stepping outside the domain of the system is treated as a bad step
            Err(SolverError::NonFinite { .. }) => None,
            Err(error) => return Err(error),
        };
        let ratio = match &trial {
            Some(trial) if predicted > 0.0 => {
                (cost - 0.5 * squared_norm(&trial.values)) / predicted
            }
            _ => 0.0,
        };

        if ratio < 0.25 {
            radius = 0.25 * proposal_norm;
        } else if ratio > 0.75 && proposal_norm >= 0.99 * radius {
            radius *= 2.0;
        }

        match trial {
            Some(trial) if ratio > 1e-4 => {
                x = trial_x;
                current = trial;
            }
            _ => {
                if radius <= config.relative_tolerance * (norm(&x) + config.relative_tolerance) {
                    return Err(SolverError::Stalled { residual });
                }
            }
        }
    }
    // the loop always returns by its last step
    Err(SolverError::MaxStepsExceeded {
        steps: config.max_steps,
        residual: max_abs(&current.values),
    })
}

/**
 * Records the solution as one node per unknown, sharing a backward closure which passes
 * the adjoints of the solution on to the parameters through `dx/dy = -J_x^-1 J_y`.
 */
fn implicit_solution<'a>(
    context: &'a Context,
    x: Vec<f64>,
    evaluation: &Evaluation,
    parameters: &[Var<'a>],
) -> Result<Vec<Var<'a>>, SolverError> {
    let inputs: Vec<(usize, NodeId)> = parameters
        .iter()
        .enumerate()
        .filter_map(|(k, parameter)| parameter.id().map(|id| (k, id)))
        .collect();
    if inputs.is_empty() {
        return Ok(x.into_iter().map(Var::constant).collect());
    }
    // one row per unknown, one column per parameter
    let mut sensitivities = vec![vec![0.0; parameters.len()]; x.len()];
    for &(k, _) in &inputs {
        let column: Vec<f64> = evaluation.jacobian_y.iter().map(|row| -row[k]).collect();
        let solved = solve(&evaluation.jacobian_x, &column).ok_or(SolverError::Singular)?;
        for (row, sensitivity) in sensitivities.iter_mut().zip(solved) {
            row[k] = sensitivity;
        }
    }
    Ok(context.make_vector_callback(&x, move |adjoints: &[f64], view: &mut Adjoints<'_>| {
        for &(k, id) in &inputs {
            let total: f64 = adjoints
                .iter()
                .zip(&sensitivities)
                .map(|(adjoint, row)| adjoint * row[k])
                .sum();
            view.accumulate(id, total);
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauss_newton_step_inside_the_region() {
        let jacobian = vec![vec![2.0, 0.0], vec![0.0, 4.0]];
        let step = dogleg_step(&jacobian, &[1.0, 2.0], 10.0);
        assert_eq!(step, vec![-0.5, -0.5]);
    }

    #[test]
    fn steepest_descent_step_to_the_boundary() {
        let jacobian = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let step = dogleg_step(&jacobian, &[-3.0, -4.0], 1.0);
        assert!((step[0] - 0.6).abs() < 1e-15);
        assert!((step[1] - 0.8).abs() < 1e-15);
    }

    #[test]
    fn dogleg_step_ends_on_the_boundary() {
        let jacobian = vec![vec![1.0, 0.0], vec![0.0, 10.0]];
        let values = [4.0, 20.0];
        let radius = 3.0;
        let step = dogleg_step(&jacobian, &values, radius);
        assert!((norm(&step) - radius).abs() < 1e-12);
    }

    #[test]
    fn zero_gradient_gives_no_step() {
        let jacobian = vec![vec![0.0]];
        assert_eq!(dogleg_step(&jacobian, &[1.0], 1.0), vec![0.0]);
    }
}
