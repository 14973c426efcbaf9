/*!
 * Access to the adjoints of a Context for backward closures.
 */

use crate::arena::Arena;
use crate::differentiation::node::Node;
use crate::differentiation::tape::Tape;
use crate::differentiation::{Index, NodeId};

/**
 * A view of the adjoints of a Context during a reverse sweep, given to the backward closures
 * of [callback nodes](crate::differentiation::Context::make_callback_node).
 *
 * A closure may only accumulate into nodes recorded before the callback node it belongs to,
 * since every later node has already applied its chain rule by the time the closure runs.
 */
pub struct Adjoints<'g> {
    nodes: &'g mut Arena<Node>,
    tape: &'g Tape,
    current: Index,
}

impl<'g> Adjoints<'g> {
    pub(super) fn new(nodes: &'g mut Arena<Node>, tape: &'g Tape, current: Index) -> Adjoints<'g> {
        Adjoints {
            nodes,
            tape,
            current,
        }
    }

    /**
     * Adds to the adjoint of a node.
     *
     * # Panics
     *
     * If the node was recorded after the node whose chain rule is being applied.
     */
    #[track_caller]
    pub fn accumulate(&mut self, id: NodeId, amount: f64) {
        assert!(
            id.index < self.current,
            "Node {} can only accumulate into earlier nodes, not node {}",
            self.current,
            id.index
        );
        let node = self.nodes.get_mut(self.tape.slot(id.index));
        debug_assert_eq!(
            node.serial, id.serial,
            "Node {} was rolled back after its id was captured",
            id.index
        );
        node.adjoint += amount;
    }

    /**
     * The forward value of a node.
     */
    #[track_caller]
    pub fn value(&self, id: NodeId) -> f64 {
        self.nodes.get(self.tape.slot(id.index)).number
    }

    /**
     * The adjoint accumulated on a node so far.
     */
    #[track_caller]
    pub fn adjoint(&self, id: NodeId) -> f64 {
        self.nodes.get(self.tape.slot(id.index)).adjoint
    }

    /**
     * The index of the node whose chain rule is being applied.
     */
    pub fn current(&self) -> Index {
        self.current
    }

    #[inline]
    pub(super) fn add(&mut self, index: Index, amount: f64) {
        self.nodes.get_mut(self.tape.slot(index)).adjoint += amount;
    }

    /**
     * The adjoint of the node `offset` places after the current one.
     */
    #[inline]
    pub(super) fn own(&self, offset: usize) -> f64 {
        self.nodes.get(self.tape.slot(self.current + offset)).adjoint
    }
}
