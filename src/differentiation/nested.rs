/*!
 * Checkpoints and nested regions for sub-computations with their own temporary graph.
 */

use log::trace;

use crate::arena::ArenaMark;
use crate::differentiation::{Context, Graph};

/**
 * The state of a Context's tape and arenas at some point in time.
 *
 * Rolling back to a checkpoint discards every node recorded after it was taken, and the
 * memory those nodes used is reused by whatever is recorded next. A checkpoint is only valid
 * until the Context is rolled back to an earlier point than it.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    tape: usize,
    // the serial the next node would have been given when this was taken
    serial: u64,
    nodes: ArenaMark,
    operands: ArenaMark,
    scratch: ArenaMark,
    callbacks: usize,
}

impl Checkpoint {
    /**
     * The number of nodes that were on the tape when this checkpoint was taken.
     */
    pub fn len(&self) -> usize {
        self.tape
    }

    pub fn is_empty(&self) -> bool {
        self.tape == 0
    }
}

impl Graph {
    pub(super) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            tape: self.tape.len(),
            serial: self.next_serial,
            nodes: self.nodes.checkpoint(),
            operands: self.operands.checkpoint(),
            scratch: self.scratch.checkpoint(),
            callbacks: self.callbacks.len(),
        }
    }

    /**
     * A checkpoint is valid if every node that was on the tape when it was taken still is.
     */
    pub(super) fn is_valid(&self, checkpoint: &Checkpoint) -> bool {
        checkpoint.tape <= self.tape.len()
            && (checkpoint.tape == 0 || self.node(checkpoint.tape - 1).serial < checkpoint.serial)
    }

    #[track_caller]
    fn rollback(&mut self, checkpoint: Checkpoint) {
        assert!(
            self.is_valid(&checkpoint),
            "Checkpoint of {} nodes has already been rolled back past",
            checkpoint.tape
        );
        self.nodes.rollback(checkpoint.nodes);
        self.operands.rollback(checkpoint.operands);
        self.scratch.rollback(checkpoint.scratch);
        self.callbacks.truncate(checkpoint.callbacks);
        self.tape.truncate(checkpoint.tape);
    }
}

impl Context {
    /**
     * Captures the current state of the tape and arenas.
     */
    pub fn checkpoint(&self) -> Checkpoint {
        self.graph.borrow().checkpoint()
    }

    /**
     * Discards every node recorded since the checkpoint was taken. Vars created since then
     * must not be used afterwards.
     *
     * Nodes recorded before the checkpoint, including their values and adjoints, are left
     * exactly as they are.
     *
     * # Panics
     *
     * If the checkpoint was taken after a point the Context has since been rolled back to,
     * or if it would roll back past the entry of a nested [Region] which is still open.
     */
    #[track_caller]
    pub fn rollback_to(&self, checkpoint: Checkpoint) {
        let mut graph = self.graph.borrow_mut();
        if let Some(open) = graph.regions.last() {
            assert!(
                checkpoint.tape >= open.tape,
                "Cannot roll back to {} nodes, past the entry of an open nested region at {} nodes",
                checkpoint.tape,
                open.tape
            );
        }
        graph.rollback(checkpoint);
        trace!("rolled back to {} nodes", checkpoint.tape);
    }

    /**
     * Enters a nested region, which is rolled back to the current state of the Context
     * when the returned guard is dropped.
     *
     * Regions can be nested to any depth, and each one only ever rolls back to its own
     * entry. They must be exited in the reverse order they were entered in.
     *
     * ```
     * use easy_rev::differentiation::Context;
     * use easy_rev::numeric::extra::Sin;
     * let context = Context::new();
     * let x = context.variable(2.0);
     * let y = x * x;
     * {
     *     let region = context.enter_region();
     *     let inner = context.variable(y.number);
     *     let z = inner.sin() + inner;
     *     context.seed_adjoint(&z, 1.0);
     *     region.run_reverse_pass();
     *     assert_eq!(context.read_adjoint(&inner), y.number.cos() + 1.0);
     * } // every node recorded inside the region is discarded here
     * assert_eq!(context.len(), 2);
     * assert_eq!(y.derivatives()[&x], 4.0);
     * ```
     */
    pub fn enter_region(&self) -> Region<'_> {
        let mut graph = self.graph.borrow_mut();
        let entry = graph.checkpoint();
        graph.regions.push(entry);
        let depth = graph.regions.len();
        trace!("entered nested region {} at {} nodes", depth, entry.tape);
        Region {
            context: self,
            entry,
            depth,
        }
    }

    /**
     * Runs a closure inside a nested region, rolling the region back once the closure
     * returns. The closure must not return any Vars it created.
     */
    pub fn nested<R>(&self, f: impl FnOnce(&Region<'_>) -> R) -> R {
        let region = self.enter_region();
        let result = f(&region);
        drop(region);
        result
    }

    /**
     * The number of nested regions currently open.
     */
    pub fn depth(&self) -> usize {
        self.graph.borrow().regions.len()
    }

    #[track_caller]
    fn exit_region(&self, entry: Checkpoint, depth: usize) {
        let mut graph = self.graph.borrow_mut();
        let in_order = graph.regions.len() == depth && graph.regions.last() == Some(&entry);
        if !in_order {
            if std::thread::panicking() {
                // avoid a double panic while unwinding past several regions
                return;
            }
            panic!(
                "Nested region {} cannot be exited while {} regions are open, inner regions must be exited first",
                depth,
                graph.regions.len()
            );
        }
        graph.regions.pop();
        graph.rollback(entry);
        trace!("exited nested region {} back to {} nodes", depth, entry.tape);
    }
}

/**
 * A guard for a nested region of a Context, created by [Context::enter_region].
 *
 * Dropping the guard rolls the Context back to the state it was in when the region was
 * entered. Any Var created inside the region becomes invalid at that point: using it
 * afterwards is a bug, caught by assertions in debug builds only.
 */
#[derive(Debug)]
pub struct Region<'a> {
    context: &'a Context,
    entry: Checkpoint,
    depth: usize,
}

impl<'a> Region<'a> {
    /**
     * The Context this region is nested in.
     */
    pub fn context(&self) -> &'a Context {
        self.context
    }

    /**
     * The checkpoint this region rolls back to when exited.
     */
    pub fn entry(&self) -> Checkpoint {
        self.entry
    }

    /**
     * How many regions are open including this one.
     */
    pub fn depth(&self) -> usize {
        self.depth
    }

    /**
     * Applies the chain rule of every node recorded inside this region, leaving the
     * adjoints of nodes recorded before it untouched unless nodes inside the region
     * refer to them directly.
     */
    #[track_caller]
    pub fn run_reverse_pass(&self) {
        self.context.run_reverse_pass(Some(self.entry));
    }

    /**
     * Sets the adjoint of every node recorded inside this region back to 0.
     */
    #[track_caller]
    pub fn zero_adjoints(&self) {
        self.context.zero_adjoints(Some(self.entry));
    }

    /**
     * Exits the region, the same as dropping it.
     */
    pub fn exit(self) {}
}

impl<'a> Drop for Region<'a> {
    fn drop(&mut self) {
        self.context.exit_region(self.entry, self.depth);
    }
}
