//! The interprocedural CFG (spec §3 "ICFG edges", §4.4): a thin overlay
//! on top of per-method [`Cfg`]s and the [`CallGraph`], splicing a
//! `Call`/`Return` pair across each resolved call edge while keeping the
//! intraprocedural `CallToReturn` edge so non-transfer facts (anything
//! not touched by the callee) can skip the call entirely.

use std::collections::HashMap;

use crate::callgraph::CallGraph;
use crate::cfg::NodeIndex;
use crate::ir::{CallSiteId, MethodId, Program, Stmt};

/// A node in the interprocedural graph: a statement within a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IcfgNode {
    pub method: MethodId,
    pub node: NodeIndex,
}

/// The four edge kinds of spec §3: `Normal` edges stay within a method's
/// own intraprocedural CFG; `CallToReturn` skips a call site directly to
/// its local successor; `Call` enters a callee's entry; `Return` exits a
/// callee back to its caller's call-to-return successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcfgEdgeKind {
    Normal,
    CallToReturn,
    Call,
    Return,
}

#[derive(Debug, Clone, Copy)]
pub struct IcfgEdge {
    pub kind: IcfgEdgeKind,
    pub target: IcfgNode,
}

/// Looks up which method a call site belongs to, for ICFG `Return` edges
/// that must splice back into the right caller node. Built as a pre-pass
/// scan over every method (spec §4.4 refined-variant note: "populated as
/// a pre-pass over all methods").
#[derive(Debug, Default)]
struct CallSiteIndex {
    owner: HashMap<CallSiteId, (MethodId, NodeIndex)>,
}

impl CallSiteIndex {
    fn build(program: &Program, reachable: &CallGraph) -> Self {
        let mut owner = HashMap::new();
        for method_id in reachable.reachable_methods() {
            let method = program.method(method_id);
            for (node, stmt) in method.cfg.stmts.iter().enumerate() {
                if let Stmt::Invoke { site, .. } = stmt {
                    owner.insert(*site, (method_id, node));
                }
            }
        }
        Self { owner }
    }
}

/// The interprocedural CFG over every method the call graph has marked
/// reachable. Edges are computed on demand from the per-method [`Cfg`]s
/// and the [`CallGraph`] rather than materialized, since both grow
/// monotonically during an on-the-fly solve.
pub struct Icfg<'a> {
    program: &'a Program,
    call_graph: &'a CallGraph,
    call_sites: CallSiteIndex,
}

impl<'a> Icfg<'a> {
    pub fn new(program: &'a Program, call_graph: &'a CallGraph) -> Self {
        let call_sites = CallSiteIndex::build(program, call_graph);
        Self { program, call_graph, call_sites }
    }

    /// The entry node of every reachable method (spec §4.4: interprocedural
    /// boundary facts are seeded at each method entry, not just the global
    /// analysis entry point).
    pub fn entry_nodes(&self) -> impl Iterator<Item = IcfgNode> + '_ {
        self.call_graph
            .reachable_methods()
            .map(move |m| IcfgNode { method: m, node: self.program.method(m).cfg.entry })
    }

    /// The method a call site syntactically belongs to, and its node
    /// index within that method's CFG.
    pub fn site_owner(&self, site: CallSiteId) -> Option<(MethodId, NodeIndex)> {
        self.call_sites.owner.get(&site).copied()
    }

    /// The successor edges of `n` in the ICFG. A call-site node gets a
    /// `CallToReturn` edge to its local successor(s) plus a `Call` edge
    /// into each resolved callee's entry; every other node gets plain
    /// `Normal` edges mirroring its intraprocedural CFG successors. A
    /// `Return` statement gets a `Return` edge back to the
    /// call-to-return successor of each of its callers' call sites.
    pub fn out_edges(&self, n: IcfgNode) -> Vec<IcfgEdge> {
        let method = self.program.method(n.method);
        let cfg = &method.cfg;
        let stmt = cfg.stmt(n.node);

        if let Stmt::Invoke { site, .. } = stmt {
            let mut edges: Vec<IcfgEdge> = cfg
                .out_edges(n.node)
                .iter()
                .map(|e| IcfgEdge { kind: IcfgEdgeKind::CallToReturn, target: IcfgNode { method: n.method, node: e.target } })
                .collect();
            for edge in self.call_graph.edges_at_site(n.method, *site) {
                let callee_entry = self.program.method(edge.callee).cfg.entry;
                edges.push(IcfgEdge { kind: IcfgEdgeKind::Call, target: IcfgNode { method: edge.callee, node: callee_entry } });
            }
            return edges;
        }

        if matches!(stmt, Stmt::Return { .. }) {
            let mut edges = Vec::new();
            for caller_edge in self.call_graph.callers_of(n.method) {
                if let Some((caller_method, call_node)) = self.call_sites.owner.get(&caller_edge.site).copied() {
                    let caller_cfg = &self.program.method(caller_method).cfg;
                    for succ in caller_cfg.out_edges(call_node) {
                        edges.push(IcfgEdge { kind: IcfgEdgeKind::Return, target: IcfgNode { method: caller_method, node: succ.target } });
                    }
                }
            }
            return edges;
        }

        cfg.out_edges(n.node)
            .iter()
            .map(|e| IcfgEdge { kind: IcfgEdgeKind::Normal, target: IcfgNode { method: n.method, node: e.target } })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callgraph::{CallEdge, CallKind};
    use crate::cfg::{Cfg, CfgEdgeKind};
    use crate::ir::{InvokeExp, InvokeKind, MethodDef, MethodRef, Subsignature, Type, Var};

    fn leaf_method(id: MethodId, class: &str) -> MethodDef {
        let cfg = Cfg::new(id, vec![Stmt::Return { value: None }], 0, vec![0]);
        MethodDef {
            id,
            declaring_class: class.into(),
            subsig: Subsignature { name: "helper".into(), param_types: vec![] },
            is_static: true,
            is_abstract: false,
            params: vec![],
            this_var: None,
            vars: vec![Var { id: 0, name: "this".into(), ty: Type::Reference(class.into()) }],
            cfg,
        }
    }

    #[test]
    fn call_site_splices_to_callee_entry_and_back() {
        let mut program = Program::new();

        let call = InvokeExp {
            kind: InvokeKind::Static,
            method_ref: MethodRef { declaring_class: "Util".into(), subsig: Subsignature { name: "helper".into(), param_types: vec![] } },
            receiver: None,
            args: vec![],
        };
        let mut caller_cfg = Cfg::new(
            0,
            vec![Stmt::Invoke { lhs: None, call, site: 7 }, Stmt::Return { value: None }],
            0,
            vec![1],
        );
        caller_cfg.add_edge(0, CfgEdgeKind::FallThrough, 1);
        let mut caller = leaf_method(0, "Main");
        caller.cfg = caller_cfg;
        program.add_method(caller);
        program.add_method(leaf_method(1, "Util"));

        let mut cg = CallGraph::new();
        cg.add_reachable(0);
        cg.add_reachable(1);
        cg.add_edge(CallEdge { caller: 0, callee: 1, kind: CallKind::Static, site: 7 });

        let icfg = Icfg::new(&program, &cg);
        let call_node = IcfgNode { method: 0, node: 0 };
        let edges = icfg.out_edges(call_node);
        assert!(edges.iter().any(|e| matches!(e.kind, IcfgEdgeKind::CallToReturn) && e.target.node == 1));
        assert!(edges.iter().any(|e| matches!(e.kind, IcfgEdgeKind::Call) && e.target.method == 1));

        let return_node = IcfgNode { method: 1, node: 0 };
        let return_edges = icfg.out_edges(return_node);
        assert!(return_edges.iter().any(|e| matches!(e.kind, IcfgEdgeKind::Return) && e.target == IcfgNode { method: 0, node: 1 }));
    }
}
