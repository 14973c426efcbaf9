/*!
 * Reverse mode automatic differentiation.
 *
 * A [Context] records a computation graph while a function is evaluated on [Var]s, then
 * computes the derivatives of the function's output with respect to every input in a single
 * backward sweep over that graph.
 *
 * Every arithmetic operation on a Var is a side effect on its Context: it evaluates the
 * result, records a node holding the result and the local partial derivatives of the
 * operation with respect to its operands, and appends that node to the Context's tape.
 * Nodes can only refer to nodes that already exist, so the order the tape records them
 * in is always a valid topological order of the graph, and walking it backwards visits
 * every node after all the nodes that depend on it. The reverse sweep applies the chain
 * rule once per node in that order.
 *
 * Vars borrow the Context they were created from, so they can't outlive it, and the
 * Context is the only mutable state involved: there is no global tape. A Context is not
 * `Sync`, each thread that needs gradients creates its own.
 *
 * ```
 * use easy_rev::differentiation::Context;
 * let context = Context::new();
 * let x = context.variable(3.0);
 * let y = context.variable(5.0);
 * let z = (x * y) + x; // 18
 * let derivatives = z.derivatives();
 * assert_eq!(z.number, 18.0);
 * assert_eq!(derivatives[&x], 6.0); // dz/dx = y + 1
 * assert_eq!(derivatives[&y], 3.0); // dz/dy = x
 * ```
 *
 * Lower level, a Context also exposes the steps of the reverse sweep individually: seeding
 * adjoints, running the sweep down to an optional lower bound, and reading adjoints back.
 * Nested computations that need their own temporary graph (such as an embedded equation
 * solve) can [checkpoint](Context::checkpoint) the Context and
 * [roll back](Context::rollback_to) to it, or enter a [Region] which rolls back automatically
 * when dropped.
 *
 * For writing new differentiable functions, [Context::make_node] records a node with
 * precomputed partial derivatives, and [Context::make_vector_callback] records one backward
 * closure for a batch of outputs, so vector operations don't need a node per scalar
 * multiplication.
 */

use std::cell::RefCell;
use std::fmt;
use std::ops;

use log::trace;

use crate::arena::{Arena, ArenaConfig};

mod callback;
pub mod comparisons;
mod functional;
mod nested;
mod node;
mod tape;
mod var_operations;

pub use callback::Adjoints;
pub use functional::{gradient, jacobian};
pub use nested::{Checkpoint, Region};

use node::{Node, Rule};
use tape::Tape;

/**
 * The position of a node on its Context's tape, which is also the order it was created in.
 */
pub type Index = usize;

/**
 * A backward closure recorded by a callback node. It receives the adjoints of all of its
 * outputs and adds its contributions to its operands through the [Adjoints] view.
 */
type Callback = Box<dyn Fn(&[f64], &mut Adjoints<'_>)>;

/**
 * An execution context for reverse mode automatic differentiation: the tape of nodes
 * recorded so far and the arenas they are allocated from.
 *
 * [Var]s created from a Context borrow it, so the Context must outlive all of them.
 *
 * ```compile_fail
 * use easy_rev::differentiation::Context;
 * let x = {
 *     let context = Context::new();
 *     context.variable(1.0)
 * }; // context no longer in scope
 * ```
 */
pub struct Context {
    graph: RefCell<Graph>,
}

/**
 * The mutable state of a Context.
 */
struct Graph {
    nodes: Arena<Node>,
    // operand indexes and partials of nodes with more than two operands
    operands: Arena<Index>,
    scratch: Arena<f64>,
    tape: Tape,
    // closures can own heap data so they are kept outside of the arenas and dropped on
    // rollback like any other Vec element
    callbacks: Vec<Callback>,
    regions: Vec<Checkpoint>,
    // never reused, distinguishes a node from any node later recorded at the same index
    next_serial: u64,
}

impl Graph {
    fn new(config: ArenaConfig) -> Graph {
        Graph {
            nodes: Arena::new(config),
            operands: Arena::new(config),
            scratch: Arena::new(config),
            tape: Tape::default(),
            callbacks: Vec::new(),
            regions: Vec::new(),
            next_serial: 1,
        }
    }

    fn push(&mut self, number: f64, rule: Rule) -> (Index, u64) {
        let serial = self.next_serial;
        self.next_serial += 1;
        let slot = self.nodes.alloc(Node {
            number,
            adjoint: 0.0,
            serial,
            rule,
        });
        (self.tape.push(slot), serial)
    }

    #[inline]
    #[track_caller]
    fn node(&self, index: Index) -> &Node {
        self.nodes.get(self.tape.slot(index))
    }

    #[inline]
    #[track_caller]
    fn node_mut(&mut self, index: Index) -> &mut Node {
        self.nodes.get_mut(self.tape.slot(index))
    }

    fn is_live(&self, index: Index, serial: u64) -> bool {
        index < self.tape.len() && self.node(index).serial == serial
    }
}

impl Context {
    /**
     * Creates an empty Context with the default [ArenaConfig].
     */
    pub fn new() -> Context {
        Context::with_config(ArenaConfig::default())
    }

    /**
     * Creates an empty Context whose arenas allocate chunks sized by the config.
     */
    pub fn with_config(config: ArenaConfig) -> Context {
        Context {
            graph: RefCell::new(Graph::new(config)),
        }
    }

    /**
     * Creates a leaf node for an input of the function to differentiate.
     */
    pub fn variable(&self, x: f64) -> Var<'_> {
        self.push(x, Rule::Leaf)
    }

    /**
     * The number of nodes on the tape.
     */
    pub fn len(&self) -> usize {
        self.graph.borrow().tape.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /**
     * Drops every node, operand array and callback recorded so far, returning the Context
     * to the state it was created in while keeping the memory allocated for reuse.
     *
     * Every Var created from this Context before the reset must not be used afterwards,
     * except to call [reset](Var::reset) on it.
     *
     * # Panics
     *
     * If any nested [Region] is still open.
     */
    #[track_caller]
    pub fn reset(&self) {
        let mut graph = self.graph.borrow_mut();
        assert!(
            graph.regions.is_empty(),
            "Context cannot be reset while {} nested regions are open",
            graph.regions.len()
        );
        graph.nodes.reset();
        graph.operands.reset();
        graph.scratch.reset();
        graph.tape.truncate(0);
        graph.callbacks.clear();
        trace!("context reset");
    }

    fn push(&self, number: f64, rule: Rule) -> Var<'_> {
        let (index, serial) = self.graph.borrow_mut().push(number, rule);
        Var {
            number,
            history: Some(self),
            index,
            serial,
        }
    }

    /**
     * Returns the index of the var's node if it has one, checking it belongs to this Context.
     */
    #[inline]
    #[track_caller]
    fn tracked(&self, var: &Var<'_>) -> Option<Index> {
        match var.history {
            None => None,
            Some(history) => {
                assert!(
                    std::ptr::eq(history, self),
                    "Vars must be using the same Context"
                );
                debug_assert!(
                    self.graph.borrow().is_live(var.index, var.serial),
                    "Var {} was created inside a nested region or before a reset that has since been rolled back",
                    var.index
                );
                Some(var.index)
            }
        }
    }

    /**
     * Records a node with a single operand, where `partial` is the derivative of `number`
     * with respect to the operand's number. If the operand is a constant no node is
     * recorded and a constant is returned.
     */
    #[track_caller]
    pub fn make_unary<'a>(&'a self, number: f64, operand: &Var<'a>, partial: f64) -> Var<'a> {
        match self.tracked(operand) {
            None => Var::constant(number),
            Some(operand) => self.push(number, Rule::Unary { operand, partial }),
        }
    }

    /**
     * Records a node with two operands and the derivative of `number` with respect to each.
     * Constant operands are left out of the recorded node.
     */
    #[track_caller]
    pub fn make_binary<'a>(
        &'a self,
        number: f64,
        left: &Var<'a>,
        left_partial: f64,
        right: &Var<'a>,
        right_partial: f64,
    ) -> Var<'a> {
        match (self.tracked(left), self.tracked(right)) {
            (None, None) => Var::constant(number),
            (Some(operand), None) => self.push(
                number,
                Rule::Unary {
                    operand,
                    partial: left_partial,
                },
            ),
            (None, Some(operand)) => self.push(
                number,
                Rule::Unary {
                    operand,
                    partial: right_partial,
                },
            ),
            (Some(left), Some(right)) => self.push(
                number,
                Rule::Binary {
                    left,
                    left_partial,
                    right,
                    right_partial,
                },
            ),
        }
    }

    /**
     * Records a node with any number of operands and the derivative of `number` with respect
     * to each one, given in the same order. Constant operands are left out of the recorded
     * node. With more than two operands the indexes and partials are copied into this
     * Context's arenas.
     *
     * This is how functions that compute their own gradients (such as log densities) attach
     * them to the graph without recording every intermediate step.
     *
     * # Panics
     *
     * If the number of operands and partials differ.
     */
    #[track_caller]
    pub fn make_node<'a>(&'a self, number: f64, operands: &[Var<'a>], partials: &[f64]) -> Var<'a> {
        assert_eq!(
            operands.len(),
            partials.len(),
            "Every operand needs exactly one partial derivative"
        );
        let mut indexes = Vec::with_capacity(operands.len());
        let mut derivatives = Vec::with_capacity(operands.len());
        for (operand, partial) in operands.iter().zip(partials) {
            if let Some(index) = self.tracked(operand) {
                indexes.push(index);
                derivatives.push(*partial);
            }
        }
        match indexes.len() {
            0 => Var::constant(number),
            1 => self.push(
                number,
                Rule::Unary {
                    operand: indexes[0],
                    partial: derivatives[0],
                },
            ),
            2 => self.push(
                number,
                Rule::Binary {
                    left: indexes[0],
                    left_partial: derivatives[0],
                    right: indexes[1],
                    right_partial: derivatives[1],
                },
            ),
            _ => {
                let (index, serial) = {
                    let mut graph = self.graph.borrow_mut();
                    let operands = graph.operands.alloc_slice(&indexes);
                    let partials = graph.scratch.alloc_slice(&derivatives);
                    graph.push(number, Rule::Nary { operands, partials })
                };
                Var {
                    number,
                    history: Some(self),
                    index,
                    serial,
                }
            }
        }
    }

    /**
     * Records a node whose chain rule is an arbitrary closure. When the reverse sweep
     * reaches the node the closure is called with the node's adjoint, and adds its
     * contributions to whichever earlier nodes it captured the [NodeId]s of.
     *
     * ```
     * use easy_rev::differentiation::Context;
     * let context = Context::new();
     * let x = context.variable(3.0);
     * let id = x.id().unwrap();
     * // x^2 with a hand written derivative
     * let y = context.make_callback_node(9.0, move |adjoint, adjoints| {
     *     let x = adjoints.value(id);
     *     adjoints.accumulate(id, adjoint * 2.0 * x);
     * });
     * assert_eq!(y.derivatives()[&x], 6.0);
     * ```
     */
    pub fn make_callback_node<F>(&self, number: f64, callback: F) -> Var<'_>
    where
        F: Fn(f64, &mut Adjoints<'_>) + 'static,
    {
        let mut vars = self.make_vector_callback(&[number], move |adjoints: &[f64], view: &mut Adjoints<'_>| {
            callback(adjoints[0], view)
        });
        vars.remove(0)
    }

    /**
     * Records one node per number, all sharing a single backward closure. The closure runs
     * once, after every node that used any of the outputs has applied its chain rule, and
     * receives the adjoints of all the outputs in order.
     *
     * This batches vector operations into a single step of the reverse sweep instead of
     * one node per scalar operation.
     *
     * No nodes are recorded if there are no numbers.
     */
    pub fn make_vector_callback<F>(&self, numbers: &[f64], callback: F) -> Vec<Var<'_>>
    where
        F: Fn(&[f64], &mut Adjoints<'_>) + 'static,
    {
        if numbers.is_empty() {
            return Vec::new();
        }
        let mut graph = self.graph.borrow_mut();
        let callback_index = graph.callbacks.len();
        graph.callbacks.push(Box::new(callback));
        let mut vars = Vec::with_capacity(numbers.len());
        for (i, &number) in numbers.iter().enumerate() {
            // the first output is visited last by the reverse sweep, when every output's
            // adjoint is complete, so it carries the closure
            let rule = if i == 0 {
                Rule::Callback {
                    callback: callback_index,
                    outputs: numbers.len(),
                }
            } else {
                Rule::Output
            };
            let (index, serial) = graph.push(number, rule);
            vars.push(Var {
                number,
                history: Some(self),
                index,
                serial,
            });
        }
        vars
    }

    /**
     * Sets the adjoint of a var's node, typically to 1 for the output of a scalar function
     * before calling [run_reverse_pass](Context::run_reverse_pass). Seeding a constant
     * does nothing.
     */
    #[track_caller]
    pub fn seed_adjoint(&self, var: &Var<'_>, adjoint: f64) {
        if let Some(index) = self.tracked(var) {
            self.graph.borrow_mut().node_mut(index).adjoint = adjoint;
        }
    }

    /**
     * Reads the adjoint accumulated on a var's node. Constants always have an adjoint of 0.
     */
    #[track_caller]
    pub fn read_adjoint(&self, var: &Var<'_>) -> f64 {
        match self.tracked(var) {
            None => 0.0,
            Some(index) => self.graph.borrow().node(index).adjoint,
        }
    }

    /**
     * Reads the forward value recorded on a var's node.
     */
    #[track_caller]
    pub fn value(&self, var: &Var<'_>) -> f64 {
        match self.tracked(var) {
            None => var.number,
            Some(index) => self.graph.borrow().node(index).number,
        }
    }

    /**
     * Applies the chain rule of every node from the end of the tape down to the lower bound,
     * or the start of the tape if there isn't one, each exactly once.
     *
     * # Panics
     *
     * If the lower bound is a checkpoint that has been rolled back past.
     */
    #[track_caller]
    pub fn run_reverse_pass(&self, lower_bound: Option<Checkpoint>) {
        let mut graph = self.graph.borrow_mut();
        let lower = graph.lower_bound(lower_bound);
        trace!("reverse sweep over nodes {}..{}", lower, graph.tape.len());
        graph.reverse_sweep(lower);
    }

    /**
     * Sets the adjoint of every node from the lower bound, or the start of the tape if
     * there isn't one, to the end of the tape back to 0.
     */
    #[track_caller]
    pub fn zero_adjoints(&self, lower_bound: Option<Checkpoint>) {
        let mut graph = self.graph.borrow_mut();
        let lower = graph.lower_bound(lower_bound);
        graph.zero_adjoints(lower);
    }

    /**
     * Checks if a var refers to a node that is still on the tape, or is a constant. Vars
     * created inside a nested region that has been exited, or before a reset, are not live.
     */
    pub fn is_live(&self, var: &Var<'_>) -> bool {
        match var.history {
            None => true,
            Some(history) => {
                std::ptr::eq(history, self) && self.graph.borrow().is_live(var.index, var.serial)
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.graph.borrow();
        f.debug_struct("Context")
            .field("nodes", &graph.tape.len())
            .field("callbacks", &graph.callbacks.len())
            .field("depth", &graph.regions.len())
            .finish()
    }
}

/**
 * A handle to a number and the node recording how it was computed.
 *
 * Vars are cheap to copy and copying one never records anything. Arithmetic on Vars records
 * new nodes on the [Context] the Vars were created from. Constants, created with
 * [Var::constant] or by arithmetic on other constants, have no Context and are never recorded.
 *
 * Comparisons between Vars (and between Vars and `f64`s) only compare the numbers, never
 * record anything, and follow IEEE-754: any comparison involving NaN is false.
 */
#[derive(Clone, Copy)]
pub struct Var<'a> {
    /**
     * The forward value
     */
    pub number: f64,
    history: Option<&'a Context>,
    index: Index,
    serial: u64,
}

/**
 * Identifies a node of a Context without borrowing the Context, so callback closures can
 * capture the operands they need to accumulate adjoints into.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: Index,
    serial: u64,
}

impl NodeId {
    /**
     * The position of the node on the tape.
     */
    pub fn index(&self) -> Index {
        self.index
    }
}

impl<'a> Var<'a> {
    /**
     * Constants are not recorded on any Context, and have a derivative of 0 with respect to
     * everything.
     */
    #[inline]
    pub fn constant(c: f64) -> Var<'a> {
        Var {
            number: c,
            history: None,
            index: 0,
            serial: 0,
        }
    }

    /**
     * Creates a leaf node on the Context for an input of the function to differentiate.
     */
    pub fn variable(x: f64, history: &'a Context) -> Var<'a> {
        history.variable(x)
    }

    /**
     * The Context this var is recorded on, None for constants.
     */
    pub fn history(&self) -> Option<&'a Context> {
        self.history
    }

    pub fn is_constant(&self) -> bool {
        self.history.is_none()
    }

    /**
     * The position of this var's node on the tape, None for constants.
     */
    pub fn index(&self) -> Option<Index> {
        self.history.map(|_| self.index)
    }

    /**
     * The identifier of this var's node for capturing in a callback closure, None for
     * constants.
     */
    pub fn id(&self) -> Option<NodeId> {
        self.history.map(|_| NodeId {
            index: self.index,
            serial: self.serial,
        })
    }

    /**
     * The adjoint accumulated on this var's node so far, 0 for constants.
     */
    pub fn adjoint(&self) -> f64 {
        match self.history {
            None => 0.0,
            Some(history) => history.read_adjoint(self),
        }
    }

    /**
     * Performs a full reverse sweep from this var and returns the derivatives of it with
     * respect to every node on its Context.
     *
     * Every adjoint on the Context is zeroed first, then this var's adjoint is seeded with 1,
     * so calling this more than once (or on different outputs) gives independent results.
     *
     * # Panics
     *
     * If this var is a constant, as there is nothing to differentiate.
     */
    #[track_caller]
    pub fn derivatives(&self) -> Derivatives {
        let history = match self.history {
            None => panic!("Var is a constant and has no Context to find derivatives from"),
            Some(history) => history,
        };
        debug_assert!(
            history.is_live(self),
            "Var {} was created inside a nested region or before a reset that has since been rolled back",
            self.index
        );
        let mut graph = history.graph.borrow_mut();
        graph.zero_adjoints(0);
        graph.node_mut(self.index).adjoint = 1.0;
        trace!("reverse sweep over nodes 0..{}", graph.tape.len());
        graph.reverse_sweep(0);
        Derivatives {
            adjoints: graph.adjoints(0),
        }
    }

    /**
     * Records this var again as a new leaf on its Context, keeping its number. This is for
     * reusing a var after its Context has been [reset](Context::reset).
     */
    pub fn reset(&mut self) {
        if let Some(history) = self.history {
            *self = history.variable(self.number);
        }
    }

    /**
     * A convenience helper function which takes a Var by value and
     * calls [reset](Var::reset()) on it.
     */
    pub fn do_reset(mut x: Self) -> Self {
        x.reset();
        x
    }
}

impl<'a> fmt::Debug for Var<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("number", &self.number)
            .field("index", &self.index())
            .finish()
    }
}

/**
 * Checks if two vars can be used together, which is when they are recorded on the same
 * Context or at least one of them is a constant.
 */
pub(crate) fn same_context(a: &Var<'_>, b: &Var<'_>) -> bool {
    match (a.history, b.history) {
        (Some(context_a), Some(context_b)) => std::ptr::eq(context_a, context_b),
        _ => true,
    }
}

/**
 * Returns the Context shared by all of the vars, or None if they're all constants.
 *
 * # Panics
 *
 * If two vars are recorded on different Contexts.
 */
#[track_caller]
pub(crate) fn context_of<'a, 'v>(vars: impl IntoIterator<Item = &'v Var<'a>>) -> Option<&'a Context>
where
    'a: 'v,
{
    let mut context: Option<&'a Context> = None;
    for var in vars {
        match (context, var.history) {
            (Some(existing), Some(history)) => assert!(
                std::ptr::eq(existing, history),
                "Vars must be using the same Context"
            ),
            (None, Some(history)) => context = Some(history),
            _ => (),
        }
    }
    context
}

/**
 * Records `number` as a function of a single var, returning a constant if the var is one.
 */
#[track_caller]
#[inline]
pub(crate) fn unary<'a>(operand: &Var<'a>, number: f64, partial: f64) -> Var<'a> {
    match operand.history {
        None => Var::constant(number),
        Some(history) => history.make_unary(number, operand, partial),
    }
}

/**
 * Records `number` as a function of two vars, returning a constant if both are constants.
 */
#[track_caller]
#[inline]
pub(crate) fn binary<'a>(
    left: &Var<'a>,
    left_partial: f64,
    right: &Var<'a>,
    right_partial: f64,
    number: f64,
) -> Var<'a> {
    assert!(same_context(left, right), "Vars must be using the same Context");
    match left.history.or(right.history) {
        None => Var::constant(number),
        Some(history) => history.make_binary(number, left, left_partial, right, right_partial),
    }
}

/**
 * Records `number` as a function of any number of vars with precomputed partial derivatives,
 * in the same order as the operands. Returns a constant if every operand is a constant.
 *
 * This is [Context::make_node] for callers that don't have the Context at hand.
 *
 * ```
 * use easy_rev::differentiation::{Context, precomputed_gradients};
 * let context = Context::new();
 * let x = context.variable(2.0);
 * let y = context.variable(3.0);
 * let z = context.variable(4.0);
 * // x * y * z
 * let product = precomputed_gradients(24.0, &[x, y, z], &[12.0, 8.0, 6.0]);
 * let derivatives = product.derivatives();
 * assert_eq!(derivatives[&x], 12.0);
 * assert_eq!(derivatives[&z], 6.0);
 * ```
 */
#[track_caller]
pub fn precomputed_gradients<'a>(number: f64, operands: &[Var<'a>], partials: &[f64]) -> Var<'a> {
    match context_of(operands) {
        None => Var::constant(number),
        Some(history) => history.make_node(number, operands, partials),
    }
}

/**
 * The adjoints of every node on a Context after a reverse sweep, in tape order.
 *
 * Derivatives can be indexed by the Vars recorded on that Context to read the derivative
 * of the swept output with respect to each one. Indexing by a constant gives 0.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Derivatives {
    adjoints: Vec<f64>,
}

impl Derivatives {
    /**
     * The derivative with respect to a var, 0 for constants.
     */
    pub fn at(&self, input: &Var<'_>) -> f64 {
        self[input]
    }

    /**
     * The number of nodes the derivatives were computed for.
     */
    pub fn len(&self) -> usize {
        self.adjoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjoints.is_empty()
    }
}

impl<'a> ops::Index<&Var<'a>> for Derivatives {
    type Output = f64;
    #[track_caller]
    fn index(&self, input: &Var<'a>) -> &Self::Output {
        match input.history {
            None => &0.0,
            Some(_) => &self.adjoints[input.index],
        }
    }
}

impl From<Derivatives> for Vec<f64> {
    fn from(derivatives: Derivatives) -> Self {
        derivatives.adjoints
    }
}
