/*!
 * If this is your first time using Easy Rev you should start with the
 * [differentiation](./differentiation/index.html) module, which explains how a
 * [Context](./differentiation/struct.Context.html) records a computation graph from
 * arithmetic on [Var](./differentiation/struct.Var.html)s and computes gradients from it.
 *
 * # Modules
 * - [Arena allocation](./arena/index.html) of graph nodes
 * - [Reverse mode automatic differentiation](./differentiation/index.html)
 * - [Differentiable functions](./functions/index.html) and
 * [distributions](./distributions/index.html) built on it
 * - A differentiable [algebraic equation solver](./solver/index.html) using nested regions
 */

pub mod arena;
pub mod differentiation;
pub mod numeric;

pub mod errors;
pub mod special;
pub mod functions;
pub mod distributions;
pub mod linear_algebra;
pub mod solver;
