/*!
 * The vertices of the computation graph.
 */

use crate::arena::{Arena, Span};
use crate::differentiation::{Adjoints, Callback, Index};

/**
 * A node of the computation graph: the forward value computed when it was recorded, the
 * adjoint accumulated during a reverse sweep, and the rule for applying the chain rule to
 * its operands.
 *
 * Nodes are never modified after being recorded except for their adjoint.
 */
#[derive(Clone, Copy, Debug)]
pub(super) struct Node {
    pub(super) number: f64,
    pub(super) adjoint: f64,
    pub(super) serial: u64,
    pub(super) rule: Rule,
}

/**
 * How a node passes its adjoint on to its operands. Every operand index is smaller than
 * the index of the node holding the rule.
 */
#[derive(Clone, Copy, Debug)]
pub(super) enum Rule {
    /// An input, or the end of the graph
    Leaf,
    Unary {
        operand: Index,
        partial: f64,
    },
    Binary {
        left: Index,
        left_partial: f64,
        right: Index,
        right_partial: f64,
    },
    /// Operand indexes and partials live in the operand and scratch arenas
    Nary {
        operands: Span,
        partials: Span,
    },
    /// The first of `outputs` consecutive nodes which share one backward closure
    Callback {
        callback: usize,
        outputs: usize,
    },
    /// A later output of a callback, whose adjoint is read by the first output's closure
    Output,
}

impl Node {
    /**
     * Adds this node's adjoint, weighted by the partial derivatives recorded when the node
     * was created, onto the adjoints of its operands.
     */
    #[inline]
    pub(super) fn apply_chain_rule(
        &self,
        adjoints: &mut Adjoints<'_>,
        operand_arena: &Arena<Index>,
        scratch: &Arena<f64>,
        callbacks: &[Callback],
        outputs_buffer: &mut Vec<f64>,
    ) {
        match self.rule {
            Rule::Leaf | Rule::Output => (),
            Rule::Unary { operand, partial } => {
                adjoints.add(operand, self.adjoint * partial);
            }
            Rule::Binary {
                left,
                left_partial,
                right,
                right_partial,
            } => {
                adjoints.add(left, self.adjoint * left_partial);
                adjoints.add(right, self.adjoint * right_partial);
            }
            Rule::Nary { operands, partials } => {
                let operands = operand_arena.slice(operands);
                let partials = scratch.slice(partials);
                for (&operand, &partial) in operands.iter().zip(partials) {
                    adjoints.add(operand, self.adjoint * partial);
                }
            }
            Rule::Callback { callback, outputs } => {
                outputs_buffer.clear();
                outputs_buffer.extend((0..outputs).map(|i| adjoints.own(i)));
                (callbacks[callback])(outputs_buffer.as_slice(), adjoints);
            }
        }
    }

    /**
     * Checks every operand index recorded directly by this node is smaller than its own.
     */
    pub(super) fn operands_precede(&self, index: Index, operand_arena: &Arena<Index>) -> bool {
        match self.rule {
            Rule::Leaf | Rule::Output | Rule::Callback { .. } => true,
            Rule::Unary { operand, .. } => operand < index,
            Rule::Binary { left, right, .. } => left < index && right < index,
            Rule::Nary { operands, .. } => operand_arena
                .slice(operands)
                .iter()
                .all(|&operand| operand < index),
        }
    }
}
