//! The CFG façade (spec §2 item 2, §3 "CFG/ICFG edges"): node iteration,
//! edge kinds, entry node, and the per-statement granularity the
//! intra-solver and dead-code detector both walk. This module is
//! "consumed, not specified" by the spec — we give it a concrete,
//! minimal shape so the rest of the crate has something real to run
//! over.

use crate::ir::{MethodId, Stmt};

pub type NodeIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgEdgeKind {
    FallThrough,
    IfTrue,
    IfFalse,
    SwitchCase(i32),
    SwitchDefault,
    Exceptional,
}

#[derive(Debug, Clone, Copy)]
pub struct CfgEdge {
    pub kind: CfgEdgeKind,
    pub target: NodeIndex,
}

/// A method's control-flow graph, with statements as nodes.
#[derive(Debug, Clone)]
pub struct Cfg {
    pub method: MethodId,
    pub stmts: Vec<Stmt>,
    pub entry: NodeIndex,
    pub exits: Vec<NodeIndex>,
    succs: Vec<Vec<CfgEdge>>,
    preds: Vec<Vec<NodeIndex>>,
}

impl Cfg {
    pub fn new(method: MethodId, stmts: Vec<Stmt>, entry: NodeIndex, exits: Vec<NodeIndex>) -> Self {
        let n = stmts.len();
        Self {
            method,
            stmts,
            entry,
            exits,
            succs: vec![Vec::new(); n],
            preds: vec![Vec::new(); n],
        }
    }

    pub fn node_count(&self) -> usize {
        self.stmts.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> {
        0..self.stmts.len()
    }

    /// All nodes except the entry, in index order — the solver's initial
    /// worklist (spec §4.1: "Worklist = all non-entry nodes").
    pub fn non_entry_nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes().filter(move |&n| n != self.entry)
    }

    pub fn stmt(&self, n: NodeIndex) -> &Stmt {
        &self.stmts[n]
    }

    pub fn out_edges(&self, n: NodeIndex) -> &[CfgEdge] {
        &self.succs[n]
    }

    pub fn in_edges(&self, n: NodeIndex) -> &[NodeIndex] {
        &self.preds[n]
    }

    pub fn add_edge(&mut self, from: NodeIndex, kind: CfgEdgeKind, to: NodeIndex) {
        self.succs[from].push(CfgEdge { kind, target: to });
        if !self.preds[to].contains(&from) {
            self.preds[to].push(from);
        }
    }

    pub fn is_exit(&self, n: NodeIndex) -> bool {
        self.exits.contains(&n)
    }
}

/// Incrementally assembles a [`Cfg`] while building a method body.
/// Grounded on the teacher's `ControlFlowGraph`/`BasicBlock` builder
/// (`smarthunt::graph::cfg`), generalized to statement-level nodes.
#[derive(Debug, Default)]
pub struct CfgBuilder {
    stmts: Vec<Stmt>,
}

impl CfgBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stmt: Stmt) -> NodeIndex {
        self.stmts.push(stmt);
        self.stmts.len() - 1
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn finish(self, method: MethodId, entry: NodeIndex, exits: Vec<NodeIndex>) -> Cfg {
        Cfg::new(method, self.stmts, entry, exits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, Operand, Stmt};

    #[test]
    fn linear_cfg_fall_through() {
        let mut b = CfgBuilder::new();
        let n0 = b.push(Stmt::IntConst { lhs: 0, value: 10 });
        let n1 = b.push(Stmt::Return { value: Some(0) });
        let mut cfg = b.finish(0, n0, vec![n1]);
        cfg.add_edge(n0, CfgEdgeKind::FallThrough, n1);

        assert_eq!(cfg.node_count(), 2);
        assert_eq!(cfg.out_edges(n0).len(), 1);
        assert_eq!(cfg.in_edges(n1), &[n0]);
        assert!(cfg.is_exit(n1));
    }

    #[test]
    fn branch_cfg_has_two_successors() {
        let mut b = CfgBuilder::new();
        let n_if = b.push(Stmt::If { cond_op: BinOp::Lt, left: Operand::Const(1), right: Operand::Const(2) });
        let n_true = b.push(Stmt::IntConst { lhs: 0, value: 1 });
        let n_false = b.push(Stmt::IntConst { lhs: 0, value: 2 });
        let n_exit = b.push(Stmt::Return { value: Some(0) });
        let mut cfg = b.finish(0, n_if, vec![n_exit]);
        cfg.add_edge(n_if, CfgEdgeKind::IfTrue, n_true);
        cfg.add_edge(n_if, CfgEdgeKind::IfFalse, n_false);
        cfg.add_edge(n_true, CfgEdgeKind::FallThrough, n_exit);
        cfg.add_edge(n_false, CfgEdgeKind::FallThrough, n_exit);

        assert_eq!(cfg.out_edges(n_if).len(), 2);
        assert_eq!(cfg.in_edges(n_exit).len(), 2);
    }
}
