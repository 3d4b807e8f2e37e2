//! The generic intra-procedural monotone worklist solver (spec §4.1).
//! Polymorphic over the analysis's fact representation; the solver
//! itself never inspects fact contents (design note: "Generic
//! analyses" — facts are opaque to the solver).

use std::collections::{HashSet, VecDeque};

use crate::cfg::{Cfg, NodeIndex};

/// Capability contract an analysis must provide to be solved by
/// [`solve`]. One trait covers both directions; `is_forward` picks which
/// predecessor/successor set the driver consults.
pub trait DataflowAnalysis {
    type Fact: Clone + PartialEq;

    fn is_forward(&self) -> bool;

    /// The fact assigned to nodes before any transfer has run.
    fn new_init_fact(&self) -> Self::Fact;

    /// The fact assigned to the boundary node (CFG entry for a forward
    /// analysis, exit for a backward one).
    fn new_boundary_fact(&self, cfg: &Cfg) -> Self::Fact;

    /// Joins `from` into `into`, returning whether `into` changed.
    fn meet_into(&self, from: &Self::Fact, into: &mut Self::Fact) -> bool;

    /// Computes this node's out-fact (in-fact, for a backward analysis)
    /// from its in-fact, mutating `out` in place and returning whether it
    /// changed.
    fn transfer_node(&self, node: NodeIndex, cfg: &Cfg, in_fact: &Self::Fact, out: &mut Self::Fact) -> bool;
}

/// Per-node in/out facts produced by a completed solve.
#[derive(Debug, Clone)]
pub struct DataflowResult<F> {
    pub in_facts: Vec<F>,
    pub out_facts: Vec<F>,
}

impl<F> DataflowResult<F> {
    pub fn in_fact(&self, n: NodeIndex) -> &F {
        &self.in_facts[n]
    }

    pub fn out_fact(&self, n: NodeIndex) -> &F {
        &self.out_facts[n]
    }
}

/// Runs `analysis` over `cfg` to a fixpoint. Work-list order does not
/// affect the final result (finite-height lattice, monotone transfer);
/// FIFO with a set-backed "in-queue" check avoids unbounded duplicate
/// entries (spec §5 "Ordering guarantees").
pub fn solve<A: DataflowAnalysis>(analysis: &A, cfg: &Cfg) -> DataflowResult<A::Fact> {
    if analysis.is_forward() {
        solve_forward(analysis, cfg)
    } else {
        solve_backward(analysis, cfg)
    }
}

fn solve_forward<A: DataflowAnalysis>(analysis: &A, cfg: &Cfg) -> DataflowResult<A::Fact> {
    let n = cfg.node_count();
    let mut in_facts: Vec<A::Fact> = (0..n).map(|_| analysis.new_init_fact()).collect();
    let mut out_facts: Vec<A::Fact> = (0..n).map(|_| analysis.new_init_fact()).collect();

    let boundary = analysis.new_boundary_fact(cfg);
    in_facts[cfg.entry] = boundary.clone();
    out_facts[cfg.entry] = boundary.clone();
    // The entry node itself never re-enters the work-list (spec §4.1:
    // "Worklist = all non-entry nodes"), so its transfer must run here,
    // once, seeded by the boundary fact — otherwise a real statement
    // occupying the entry node (as opposed to a synthetic no-op) would
    // never take effect.
    analysis.transfer_node(cfg.entry, cfg, &boundary, &mut out_facts[cfg.entry]);

    let mut queue: VecDeque<NodeIndex> = cfg.non_entry_nodes().collect();
    let mut queued: HashSet<NodeIndex> = queue.iter().copied().collect();

    while let Some(node) = queue.pop_front() {
        queued.remove(&node);

        let mut in_fact = analysis.new_init_fact();
        for &pred in cfg.in_edges(node) {
            analysis.meet_into(&out_facts[pred], &mut in_fact);
        }
        in_facts[node] = in_fact.clone();

        let changed = analysis.transfer_node(node, cfg, &in_fact, &mut out_facts[node]);
        if changed {
            for edge in cfg.out_edges(node) {
                if edge.target != cfg.entry && queued.insert(edge.target) {
                    queue.push_back(edge.target);
                }
            }
        }
    }

    DataflowResult { in_facts, out_facts }
}

fn solve_backward<A: DataflowAnalysis>(analysis: &A, cfg: &Cfg) -> DataflowResult<A::Fact> {
    let n = cfg.node_count();
    // For a backward analysis we still report results in the `in`/`out`
    // naming the rest of the crate expects (`in` = flow entering the
    // statement in forward program order), but the solver itself walks
    // successors -> predecessors.
    let mut out_facts: Vec<A::Fact> = (0..n).map(|_| analysis.new_init_fact()).collect();
    let mut in_facts: Vec<A::Fact> = (0..n).map(|_| analysis.new_init_fact()).collect();

    let exits: Vec<NodeIndex> = (0..n).filter(|&i| cfg.is_exit(i)).collect();
    let boundary = analysis.new_boundary_fact(cfg);
    for &e in &exits {
        out_facts[e] = boundary.clone();
        in_facts[e] = boundary.clone();
        // Mirror the forward solver's entry fix: exit nodes never re-enter
        // the work-list, so their transfer (e.g. a `Return`'s own uses)
        // must be applied here rather than skipped.
        analysis.transfer_node(e, cfg, &boundary, &mut in_facts[e]);
    }

    let mut queue: VecDeque<NodeIndex> = cfg.nodes().filter(|n| !exits.contains(n)).collect();
    let mut queued: HashSet<NodeIndex> = queue.iter().copied().collect();

    while let Some(node) = queue.pop_front() {
        queued.remove(&node);

        let mut out_fact = analysis.new_init_fact();
        for edge in cfg.out_edges(node) {
            analysis.meet_into(&in_facts[edge.target], &mut out_fact);
        }
        out_facts[node] = out_fact.clone();

        let changed = analysis.transfer_node(node, cfg, &out_fact, &mut in_facts[node]);
        if changed {
            for &pred in cfg.in_edges(node) {
                if !exits.contains(&pred) && queued.insert(pred) {
                    queue.push_back(pred);
                }
            }
        }
    }

    DataflowResult { in_facts, out_facts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{CfgBuilder, CfgEdgeKind};
    use crate::ir::Stmt;

    /// A trivial forward analysis counting reachable nodes: out = in + 1.
    struct CountingAnalysis;

    impl DataflowAnalysis for CountingAnalysis {
        type Fact = i32;

        fn is_forward(&self) -> bool {
            true
        }

        fn new_init_fact(&self) -> i32 {
            0
        }

        fn new_boundary_fact(&self, _cfg: &Cfg) -> i32 {
            0
        }

        fn meet_into(&self, from: &i32, into: &mut i32) -> bool {
            let joined = (*into).max(*from);
            let changed = joined != *into;
            *into = joined;
            changed
        }

        fn transfer_node(&self, _node: NodeIndex, _cfg: &Cfg, in_fact: &i32, out: &mut i32) -> bool {
            let new_out = in_fact + 1;
            let changed = new_out != *out;
            *out = new_out;
            changed
        }
    }

    #[test]
    fn forward_solve_is_monotone_along_a_chain() {
        let mut b = CfgBuilder::new();
        let n0 = b.push(Stmt::Nop);
        let n1 = b.push(Stmt::Nop);
        let n2 = b.push(Stmt::Nop);
        let mut cfg = b.finish(0, n0, vec![n2]);
        cfg.add_edge(n0, CfgEdgeKind::FallThrough, n1);
        cfg.add_edge(n1, CfgEdgeKind::FallThrough, n2);

        let result = solve(&CountingAnalysis, &cfg);
        assert_eq!(*result.out_fact(n0), 1);
        assert_eq!(*result.out_fact(n1), 2);
        assert_eq!(*result.out_fact(n2), 3);
    }

    #[test]
    fn solving_twice_is_idempotent() {
        let mut b = CfgBuilder::new();
        let n0 = b.push(Stmt::Nop);
        let n1 = b.push(Stmt::Nop);
        let mut cfg = b.finish(0, n0, vec![n1]);
        cfg.add_edge(n0, CfgEdgeKind::FallThrough, n1);

        let r1 = solve(&CountingAnalysis, &cfg);
        let r2 = solve(&CountingAnalysis, &cfg);
        assert_eq!(r1.out_facts.len(), r2.out_facts.len());
        for (a, b) in r1.out_facts.iter().zip(r2.out_facts.iter()) {
            assert_eq!(a, b);
        }
    }
}
