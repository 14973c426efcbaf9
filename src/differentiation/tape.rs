/*!
 * The creation ordered record of nodes and the reverse sweep over it.
 */

use crate::arena::Slot;
use crate::differentiation::{Adjoints, Checkpoint, Context, Graph, Index};

/**
 * The nodes of a Context in the order they were recorded. Since a node can only refer to
 * nodes recorded before it, this order is a topological order of the graph.
 */
#[derive(Debug, Default)]
pub(super) struct Tape {
    slots: Vec<Slot>,
}

impl Tape {
    #[inline]
    pub(super) fn push(&mut self, slot: Slot) -> Index {
        self.slots.push(slot);
        self.slots.len() - 1
    }

    #[inline]
    #[track_caller]
    pub(super) fn slot(&self, index: Index) -> Slot {
        self.slots[index]
    }

    #[inline]
    pub(super) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(super) fn truncate(&mut self, len: usize) {
        self.slots.truncate(len);
    }
}

impl Graph {
    /**
     * Applies the chain rule of every node from the end of the tape down to and including
     * `lower`, highest index first.
     */
    pub(super) fn reverse_sweep(&mut self, lower: Index) {
        let Graph {
            nodes,
            operands,
            scratch,
            tape,
            callbacks,
            ..
        } = self;
        let mut outputs_buffer = Vec::new();
        for index in (lower..tape.len()).rev() {
            let node = *nodes.get(tape.slot(index));
            let mut adjoints = Adjoints::new(nodes, tape, index);
            node.apply_chain_rule(
                &mut adjoints,
                operands,
                scratch,
                callbacks,
                &mut outputs_buffer,
            );
        }
    }

    pub(super) fn zero_adjoints(&mut self, lower: Index) {
        for index in lower..self.tape.len() {
            self.node_mut(index).adjoint = 0.0;
        }
    }

    /**
     * Copies out the adjoints of every node from `lower` to the end of the tape.
     */
    pub(super) fn adjoints(&self, lower: Index) -> Vec<f64> {
        (lower..self.tape.len())
            .map(|index| self.node(index).adjoint)
            .collect()
    }

    /**
     * Converts an optional checkpoint into the tape index a sweep should stop at.
     */
    #[track_caller]
    pub(super) fn lower_bound(&self, checkpoint: Option<Checkpoint>) -> Index {
        match checkpoint {
            None => 0,
            Some(checkpoint) => {
                assert!(
                    self.is_valid(&checkpoint),
                    "Checkpoint of {} nodes has been rolled back past",
                    checkpoint.len()
                );
                checkpoint.len()
            }
        }
    }
}

impl Context {
    /**
     * Verifies that every node refers only to nodes recorded before it. This always holds
     * for graphs built through the public API, and is exposed for testing and debugging.
     *
     * Callback nodes are checked when their closures run instead, since the operands they
     * accumulate into are only known to the closure.
     */
    pub fn check_topological_order(&self) -> bool {
        let graph = self.graph.borrow();
        (0..graph.tape.len()).all(|index| graph.node(index).operands_precede(index, &graph.operands))
    }
}
