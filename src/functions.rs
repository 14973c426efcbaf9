/*!
 * Differentiable elementary, special and vector functions on [Var]s.
 *
 * Each scalar function computes its value and the partial derivative with respect to each
 * operand from the forward values, then records a single node. Vector functions record one
 * [n-ary node](crate::differentiation::Context::make_node) or one
 * [batched callback](crate::differentiation::Context::make_vector_callback) for all of their
 * outputs, instead of a node per scalar operation.
 *
 * ```
 * use easy_rev::differentiation::Context;
 * use easy_rev::functions::{lgamma, log_sum_exp};
 * let context = Context::new();
 * let x = context.variable(3.0);
 * let y = context.variable(-1.0);
 * let z = lgamma(&x) + log_sum_exp(&x, &y);
 * let derivatives = z.derivatives();
 * // ψ(3) = 3/2 - γ
 * let digamma = 1.5 - 0.577_215_664_901_532_9;
 * let weight = 1.0 / (1.0 + (-4.0_f64).exp());
 * assert!((derivatives[&x] - (digamma + weight)).abs() < 1e-12);
 * assert!((derivatives[&y] - (1.0 - weight)).abs() < 1e-12);
 * ```
 */

use std::f64::consts::LN_10;

use crate::differentiation::{binary, context_of, precomputed_gradients, unary, Adjoints, NodeId, Var};
use crate::errors::{check_nonzero_size, DomainError};
use crate::special;

/**
 * The base 10 logarithm.
 */
pub fn log10<'a>(x: &Var<'a>) -> Var<'a> {
    // δ(log10(x)) / δx = 1 / (x ln(10))
    unary(x, x.number.log10(), 1.0 / (x.number * LN_10))
}

/**
 * The inverse square root, 1 / sqrt(x).
 */
pub fn inv_sqrt<'a>(x: &Var<'a>) -> Var<'a> {
    let inverse = 1.0 / x.number.sqrt();
    // δ(x^-0.5) / δx = -0.5 * x^-1.5
    unary(x, inverse, -0.5 * inverse / x.number)
}

/**
 * The absolute value. The derivative is taken to be 0 at 0, and NaN for NaN.
 */
pub fn abs<'a>(x: &Var<'a>) -> Var<'a> {
    let partial = if x.number > 0.0 {
        1.0
    } else if x.number < 0.0 {
        -1.0
    } else if x.number == 0.0 {
        0.0
    } else {
        f64::NAN
    };
    unary(x, x.number.abs(), partial)
}

/**
 * The natural logarithm of the absolute value of the gamma function.
 */
pub fn lgamma<'a>(x: &Var<'a>) -> Var<'a> {
    // δ(lgamma(x)) / δx = digamma(x)
    unary(x, special::lgamma(x.number), special::digamma(x.number))
}

/**
 * ln(1 + x), accurate for x near 0.
 */
pub fn log1p<'a>(x: &Var<'a>) -> Var<'a> {
    unary(x, x.number.ln_1p(), 1.0 / (1.0 + x.number))
}

/**
 * The inverse of the complementary log-log function, 1 - exp(-exp(x)).
 */
pub fn inv_cloglog<'a>(x: &Var<'a>) -> Var<'a> {
    // δ(1 - exp(-exp(x))) / δx = exp(x - exp(x))
    unary(
        x,
        1.0 - (-x.number.exp()).exp(),
        (x.number - x.number.exp()).exp(),
    )
}

/**
 * a * ln(b), taken to be 0 when both a and b are 0.
 */
#[track_caller]
pub fn multiply_log<'a>(a: &Var<'a>, b: &Var<'a>) -> Var<'a> {
    let number = if a.number == 0.0 && b.number == 0.0 {
        0.0
    } else {
        a.number * b.number.ln()
    };
    binary(
        a,
        // δ(a ln(b)) / δa = ln(b)
        b.number.ln(),
        b,
        // δ(a ln(b)) / δb = a / b
        a.number / b.number,
        number,
    )
}

/**
 * ln(exp(a) + exp(b)), computed without overflowing for large a or b.
 */
#[track_caller]
pub fn log_sum_exp<'a>(a: &Var<'a>, b: &Var<'a>) -> Var<'a> {
    let (x, y) = (a.number, b.number);
    let number = if x == f64::NEG_INFINITY {
        y
    } else if x == f64::INFINITY && y == f64::INFINITY {
        f64::INFINITY
    } else if x > y {
        x + (y - x).exp().ln_1p()
    } else {
        y + (x - y).exp().ln_1p()
    };
    // δ(log_sum_exp(a, b)) / δa = exp(a) / (exp(a) + exp(b))
    let weight = 1.0 / (1.0 + (y - x).exp());
    binary(a, weight, b, 1.0 - weight, number)
}

/**
 * x * 2^n, computed on the forward value only. The result does not depend on the graph.
 */
pub fn scalbn(x: &Var<'_>, n: i32) -> f64 {
    x.number * 2.0_f64.powi(n)
}

/**
 * Checks if the forward value of a var is a finite whole number.
 */
pub fn is_integer(x: &Var<'_>) -> bool {
    x.number.is_finite() && x.number == x.number.floor()
}

/**
 * The forward value of a var, detached from the graph.
 */
pub fn value_of(x: &Var<'_>) -> f64 {
    x.number
}

/**
 * The sum of the vars as a single node. The sum of no vars is a constant 0.
 */
#[track_caller]
pub fn sum<'a>(xs: &[Var<'a>]) -> Var<'a> {
    let total = xs.iter().map(|x| x.number).sum();
    precomputed_gradients(total, xs, &vec![1.0; xs.len()])
}

/**
 * The dot product of two equally long vectors as a single node.
 */
#[track_caller]
pub fn dot_product<'a>(a: &[Var<'a>], b: &[Var<'a>]) -> Result<Var<'a>, DomainError> {
    if a.len() != b.len() {
        return Err(DomainError::new(
            "dot_product",
            "Second vector",
            format!("of size {}", b.len()),
            format!("the same size as the first vector ({})", a.len()),
        ));
    }
    let number = a.iter().zip(b).map(|(x, y)| x.number * y.number).sum();
    let operands: Vec<Var<'a>> = a.iter().chain(b).copied().collect();
    // δ(a·b) / δa = b, δ(a·b) / δb = a
    let partials: Vec<f64> = b.iter().chain(a).map(|x| x.number).collect();
    Ok(precomputed_gradients(number, &operands, &partials))
}

fn log_sum_exp_numbers(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY || max == f64::INFINITY {
        return max;
    }
    max + xs.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}

/**
 * Records a vector function of the vars whose backward rule is a single closure, given the
 * ids of the non constant inputs and the adjoints of the outputs.
 */
#[track_caller]
fn vector_function<'a, F>(xs: &[Var<'a>], numbers: Vec<f64>, backward: F) -> Vec<Var<'a>>
where
    F: Fn(&[f64], usize) -> f64 + 'static,
{
    match context_of(xs) {
        None => numbers.into_iter().map(Var::constant).collect(),
        Some(context) => {
            let inputs: Vec<(usize, NodeId)> = xs
                .iter()
                .enumerate()
                .filter_map(|(j, x)| x.id().map(|id| (j, id)))
                .collect();
            context.make_vector_callback(&numbers, move |adjoints: &[f64], view: &mut Adjoints<'_>| {
                for &(j, id) in &inputs {
                    view.accumulate(id, backward(adjoints, j));
                }
            })
        }
    }
}

/**
 * The softmax of a nonempty vector, exp(x) / sum(exp(x)), recorded as one batched node.
 *
 * ```
 * use easy_rev::differentiation::Context;
 * use easy_rev::functions::softmax;
 * let context = Context::new();
 * let x = [context.variable(1.0), context.variable(1.0)];
 * let y = softmax(&x).unwrap();
 * assert!((y[0].number - 0.5).abs() < 1e-15);
 * // δy0 / δx0 = y0 (1 - y0)
 * assert!((y[0].derivatives()[&x[0]] - 0.25).abs() < 1e-15);
 * ```
 */
#[track_caller]
pub fn softmax<'a>(xs: &[Var<'a>]) -> Result<Vec<Var<'a>>, DomainError> {
    check_nonzero_size("softmax", "Vector", xs.len())?;
    let numbers: Vec<f64> = xs.iter().map(|x| x.number).collect();
    let normaliser = log_sum_exp_numbers(&numbers);
    let probabilities: Vec<f64> = numbers.iter().map(|x| (x - normaliser).exp()).collect();
    let weights = probabilities.clone();
    Ok(vector_function(xs, probabilities, move |adjoints, j| {
        // δy_i / δx_j = y_i ([i == j] - y_j)
        let weighted: f64 = adjoints.iter().zip(&weights).map(|(g, y)| g * y).sum();
        weights[j] * (adjoints[j] - weighted)
    }))
}

/**
 * The log of the softmax of a nonempty vector, x - log_sum_exp(x), recorded as one batched
 * node.
 */
#[track_caller]
pub fn log_softmax<'a>(xs: &[Var<'a>]) -> Result<Vec<Var<'a>>, DomainError> {
    check_nonzero_size("log_softmax", "Vector", xs.len())?;
    let numbers: Vec<f64> = xs.iter().map(|x| x.number).collect();
    let normaliser = log_sum_exp_numbers(&numbers);
    let probabilities: Vec<f64> = numbers.iter().map(|x| (x - normaliser).exp()).collect();
    let outputs = numbers.iter().map(|x| x - normaliser).collect();
    Ok(vector_function(xs, outputs, move |adjoints, j| {
        // δy_i / δx_j = [i == j] - softmax(x)_j
        let total: f64 = adjoints.iter().sum();
        adjoints[j] - probabilities[j] * total
    }))
}
