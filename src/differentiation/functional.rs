/*!
 * Gradients and Jacobians of whole functions, computed inside a nested region.
 */

use crate::differentiation::{Context, Var};

/**
 * Evaluates a scalar function at `x` and computes its gradient with a single reverse sweep,
 * returning the value and the derivative with respect to each input in order.
 *
 * The function is evaluated inside a nested region of the Context, so none of the nodes it
 * records remain once this returns and any graph already on the Context is left as it was.
 * The function should only be built from the inputs it is given and constants.
 *
 * ```
 * use easy_rev::differentiation::{Context, gradient};
 * use easy_rev::numeric::extra::Exp;
 * let context = Context::new();
 * // f(x, y) = x * e^y
 * let (value, gradient) = gradient(&context, |x| x[0] * x[1].exp(), &[3.0, 0.0]);
 * assert_eq!(value, 3.0);
 * assert_eq!(gradient, vec![1.0, 3.0]);
 * assert!(context.is_empty());
 * ```
 */
pub fn gradient<'a, F>(context: &'a Context, f: F, x: &[f64]) -> (f64, Vec<f64>)
where
    F: FnOnce(&[Var<'a>]) -> Var<'a>,
{
    context.nested(|region| {
        let inputs: Vec<Var<'a>> = x.iter().map(|&x| context.variable(x)).collect();
        let output = f(&inputs);
        context.seed_adjoint(&output, 1.0);
        region.run_reverse_pass();
        let derivatives = inputs
            .iter()
            .map(|input| context.read_adjoint(input))
            .collect();
        (output.number, derivatives)
    })
}

/**
 * Evaluates a vector function at `x` and computes its Jacobian with one reverse sweep per
 * output, returning the values and the Jacobian as one row of derivatives per output.
 *
 * Like [gradient], the function is evaluated inside a nested region of the Context.
 *
 * ```
 * use easy_rev::differentiation::{Context, jacobian};
 * let context = Context::new();
 * // f(x, y) = [x * y, x + 2y]
 * let (values, jacobian) = jacobian(
 *     &context,
 *     |x| vec![x[0] * x[1], x[0] + (x[1] * 2.0)],
 *     &[2.0, 5.0],
 * );
 * assert_eq!(values, vec![10.0, 12.0]);
 * assert_eq!(jacobian, vec![vec![5.0, 2.0], vec![1.0, 2.0]]);
 * ```
 */
pub fn jacobian<'a, F>(context: &'a Context, f: F, x: &[f64]) -> (Vec<f64>, Vec<Vec<f64>>)
where
    F: FnOnce(&[Var<'a>]) -> Vec<Var<'a>>,
{
    context.nested(|region| {
        let inputs: Vec<Var<'a>> = x.iter().map(|&x| context.variable(x)).collect();
        let outputs = f(&inputs);
        let values = outputs.iter().map(|output| output.number).collect();
        let rows = outputs
            .iter()
            .map(|output| {
                region.zero_adjoints();
                context.seed_adjoint(output, 1.0);
                region.run_reverse_pass();
                inputs
                    .iter()
                    .map(|input| context.read_adjoint(input))
                    .collect()
            })
            .collect();
        (values, rows)
    })
}
