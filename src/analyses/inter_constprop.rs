//! Interprocedural constant propagation (spec §4.4): the same lattice
//! and meet as the intra-procedural analysis, lifted onto the ICFG with
//! per-edge-kind transfer functions. A distinct solver from
//! [`crate::solver::solve`] — the generic intra-solver's
//! [`crate::solver::DataflowAnalysis`] trait has no notion of an
//! edge-kind-dependent transfer, which this analysis fundamentally needs
//! (`Call`, `CallToReturn`, and `Return` edges each compute a different
//! fact from their source's out-fact; design note "Generic analyses").
//!
//! Resolves the spec's open question in favor of a start-empty boundary
//! fact for every *callee* entry (fed entirely by its `Call` edges); only
//! the one designated analysis entry point — which has no caller to
//! supply a `Call` edge — still gets the intra-procedural NAC-parameter
//! boundary.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::analyses::constprop::ConstPropagation;
use crate::callgraph::CallGraph;
use crate::icfg::{Icfg, IcfgEdgeKind, IcfgNode};
use crate::ir::{MethodId, Program, Stmt};
use crate::lattice::{CPFact, Value};

#[derive(Debug, Default)]
pub struct InterResult {
    in_facts: HashMap<IcfgNode, CPFact>,
    out_facts: HashMap<IcfgNode, CPFact>,
}

impl InterResult {
    pub fn in_fact(&self, n: IcfgNode) -> CPFact {
        self.in_facts.get(&n).cloned().unwrap_or_default()
    }

    pub fn out_fact(&self, n: IcfgNode) -> CPFact {
        self.out_facts.get(&n).cloned().unwrap_or_default()
    }
}

pub struct InterConstPropagation;

impl InterConstPropagation {
    /// Solves interprocedural constant propagation over every method
    /// `call_graph` has marked reachable, seeded from `entry`.
    pub fn solve(program: &Program, call_graph: &CallGraph, entry: MethodId) -> InterResult {
        let icfg = Icfg::new(program, call_graph);
        let mut in_facts: HashMap<IcfgNode, CPFact> = HashMap::new();
        let mut out_facts: HashMap<IcfgNode, CPFact> = HashMap::new();

        for m in call_graph.reachable_methods() {
            let cfg = &program.method(m).cfg;
            for node in cfg.nodes() {
                let n = IcfgNode { method: m, node };
                in_facts.insert(n, CPFact::new());
                out_facts.insert(n, CPFact::new());
            }
        }

        let entry_def = program.method(entry);
        let entry_analysis = ConstPropagation::new(entry_def);
        let root = IcfgNode { method: entry, node: entry_def.cfg.entry };
        let root_boundary = entry_analysis.new_boundary_fact(&entry_def.cfg);
        in_facts.insert(root, root_boundary.clone());
        let mut root_out = CPFact::new();
        entry_analysis.transfer_node(root.node, &entry_def.cfg, &root_boundary, &mut root_out);
        out_facts.insert(root, root_out);

        let mut queue: VecDeque<IcfgNode> = VecDeque::new();
        let mut queued: HashSet<IcfgNode> = HashSet::new();
        queue.push_back(root);
        queued.insert(root);

        while let Some(n) = queue.pop_front() {
            queued.remove(&n);
            for edge in icfg.out_edges(n) {
                let contribution = edge_contribution(program, call_graph, &out_facts, n, edge.kind, edge.target);
                let target_in_changed = in_facts.entry(edge.target).or_default().meet_into(&contribution);
                if !target_in_changed {
                    continue;
                }
                let target_in = in_facts.get(&edge.target).cloned().unwrap_or_default();
                let new_out = node_transfer(program, edge.target, &target_in);
                let out_changed = out_facts.entry(edge.target).or_default().copy_from(&new_out);
                if out_changed && queued.insert(edge.target) {
                    queue.push_back(edge.target);
                }
            }
        }

        InterResult { in_facts, out_facts }
    }
}

/// Node transfer (spec §4.4 "Node transfer"): identity at call nodes (all
/// inter-method effect rides the `Call`/`Return` edges), the ordinary
/// intra-procedural transfer everywhere else.
fn node_transfer(program: &Program, n: IcfgNode, in_fact: &CPFact) -> CPFact {
    let method_def = program.method(n.method);
    let stmt = method_def.cfg.stmt(n.node);
    if matches!(stmt, Stmt::Invoke { .. }) {
        in_fact.clone()
    } else {
        let analysis = ConstPropagation::new(method_def);
        let mut out = CPFact::new();
        analysis.transfer_node(n.node, &method_def.cfg, in_fact, &mut out);
        out
    }
}

/// The value a method returns, joined over every `Return` statement at
/// its CFG's designated exits (spec §4.4 Return edge: "join over all
/// return variables of the callee's exit out-fact").
fn aggregate_return_value(program: &Program, out_facts: &HashMap<IcfgNode, CPFact>, method: MethodId) -> Value {
    let cfg = &program.method(method).cfg;
    let mut acc = Value::Undef;
    for &exit in &cfg.exits {
        if let Stmt::Return { value: Some(v) } = cfg.stmt(exit) {
            let fact = out_facts.get(&IcfgNode { method, node: exit }).cloned().unwrap_or_default();
            acc = acc.meet(fact.get(*v));
        }
    }
    acc
}

/// Edge transfer functions (spec §4.4).
fn edge_contribution(
    program: &Program,
    call_graph: &CallGraph,
    out_facts: &HashMap<IcfgNode, CPFact>,
    source: IcfgNode,
    kind: IcfgEdgeKind,
    target: IcfgNode,
) -> CPFact {
    let pred_out = out_facts.get(&source).cloned().unwrap_or_default();

    match kind {
        IcfgEdgeKind::Normal => pred_out,

        IcfgEdgeKind::CallToReturn => {
            let mut f = pred_out;
            if let Stmt::Invoke { lhs: Some(r), .. } = program.method(source.method).cfg.stmt(source.node) {
                f.update(*r, Value::Undef);
            }
            f
        }

        IcfgEdgeKind::Call => {
            let mut f = CPFact::new();
            if let Stmt::Invoke { call, .. } = program.method(source.method).cfg.stmt(source.node) {
                let callee_def = program.method(target.method);
                if call.args.len() != callee_def.params.len() {
                    log::warn!(
                        "{}",
                        crate::error::IrError::ArityMismatch {
                            callee: format!("{}.{}", callee_def.declaring_class, callee_def.subsig),
                            args: call.args.len(),
                            params: callee_def.params.len(),
                        }
                    );
                    return f;
                }
                for (&arg, &param) in call.args.iter().zip(callee_def.params.iter()) {
                    if callee_def.var(param).ty.is_narrow_integer() {
                        f.update(param, pred_out.get(arg));
                    }
                }
            }
            f
        }

        IcfgEdgeKind::Return => {
            let aggregate = aggregate_return_value(program, out_facts, source.method);
            let mut f = CPFact::new();
            let caller_cfg = &program.method(target.method).cfg;
            let callee_params = program.method(source.method).params.len();
            for &pred in caller_cfg.in_edges(target.node) {
                if let Stmt::Invoke { lhs: Some(r), site, call, .. } = caller_cfg.stmt(pred) {
                    if call.args.len() != callee_params {
                        continue;
                    }
                    if call_graph.edges_at_site(target.method, *site).any(|e| e.callee == source.method) {
                        f.update(*r, aggregate);
                    }
                }
            }
            f
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callgraph::{CallEdge, CallKind};
    use crate::cfg::{CfgBuilder, CfgEdgeKind};
    use crate::ir::{BinOp, InvokeExp, InvokeKind, MethodDef, MethodRef, Operand, Subsignature, Type, Var};

    fn var(id: crate::ir::VarId, name: &str) -> Var {
        Var { id, name: name.into(), ty: Type::Int }
    }

    /// `int add1(int p) { return p + 1; }` called as `r = add1(a)` where
    /// `a = 10` at the caller — `r` should fold to `CONST(11)`.
    #[test]
    fn call_and_return_edges_carry_a_constant_argument_back() {
        let mut program = Program::new();

        // callee: add1(p) { return p + 1; }
        let mut cb = CfgBuilder::new();
        let n_ret_val = cb.push(Stmt::Binary { lhs: 1, op: BinOp::Add, left: Operand::Var(0), right: Operand::Const(1) });
        let n_ret = cb.push(Stmt::Return { value: Some(1) });
        let mut callee_cfg = cb.finish(1, n_ret_val, vec![n_ret]);
        callee_cfg.add_edge(n_ret_val, CfgEdgeKind::FallThrough, n_ret);
        let callee = MethodDef {
            id: 1,
            declaring_class: "Util".into(),
            subsig: Subsignature { name: "add1".into(), param_types: vec!["int".into()] },
            is_static: true,
            is_abstract: false,
            params: vec![0],
            this_var: None,
            vars: vec![var(0, "p"), var(1, "t")],
            cfg: callee_cfg,
        };
        program.add_method(callee);

        // caller: main() { a = 10; r = add1(a); use(r); }
        let call = InvokeExp {
            kind: InvokeKind::Static,
            method_ref: MethodRef { declaring_class: "Util".into(), subsig: Subsignature { name: "add1".into(), param_types: vec!["int".into()] } },
            receiver: None,
            args: vec![0],
        };
        let mut mb = CfgBuilder::new();
        let n_a = mb.push(Stmt::IntConst { lhs: 0, value: 10 });
        let n_call = mb.push(Stmt::Invoke { lhs: Some(1), call, site: 7 });
        let n_use = mb.push(Stmt::Return { value: None });
        let mut caller_cfg = mb.finish(0, n_a, vec![n_use]);
        caller_cfg.add_edge(n_a, CfgEdgeKind::FallThrough, n_call);
        caller_cfg.add_edge(n_call, CfgEdgeKind::FallThrough, n_use);
        let caller = MethodDef {
            id: 0,
            declaring_class: "Main".into(),
            subsig: Subsignature { name: "main".into(), param_types: vec![] },
            is_static: true,
            is_abstract: false,
            params: vec![],
            this_var: None,
            vars: vec![var(0, "a"), var(1, "r")],
            cfg: caller_cfg,
        };
        program.add_method(caller);
        program.set_entry(0);

        let mut cg = CallGraph::new();
        cg.add_reachable(0);
        cg.add_reachable(1);
        cg.add_edge(CallEdge { caller: 0, callee: 1, kind: CallKind::Static, site: 7 });

        let result = InterConstPropagation::solve(&program, &cg, 0);
        let at_use = IcfgNode { method: 0, node: n_use };
        assert_eq!(result.in_fact(at_use).get(1), Value::Const(11));
    }

    /// Same shape as above but the call site passes two arguments to a
    /// one-parameter callee. Even with a call-graph edge already present
    /// (as CHA would build one, since it doesn't look at argument counts
    /// at all), the mismatched call must contribute nothing: `p` inside
    /// the callee stays `Undef` and `r` at the caller's use site never
    /// picks up the folded constant.
    #[test]
    fn arity_mismatched_call_contributes_no_facts_in_either_direction() {
        let mut program = Program::new();

        let mut cb = CfgBuilder::new();
        let n_ret_val = cb.push(Stmt::Binary { lhs: 1, op: BinOp::Add, left: Operand::Var(0), right: Operand::Const(1) });
        let n_ret = cb.push(Stmt::Return { value: Some(1) });
        let mut callee_cfg = cb.finish(1, n_ret_val, vec![n_ret]);
        callee_cfg.add_edge(n_ret_val, CfgEdgeKind::FallThrough, n_ret);
        let callee = MethodDef {
            id: 1,
            declaring_class: "Util".into(),
            subsig: Subsignature { name: "add1".into(), param_types: vec!["int".into()] },
            is_static: true,
            is_abstract: false,
            params: vec![0],
            this_var: None,
            vars: vec![var(0, "p"), var(1, "t")],
            cfg: callee_cfg,
        };
        program.add_method(callee);

        // caller: main() { a = 10; r = add1(a, a); use(r); } -- one arg too many.
        let call = InvokeExp {
            kind: InvokeKind::Static,
            method_ref: MethodRef { declaring_class: "Util".into(), subsig: Subsignature { name: "add1".into(), param_types: vec!["int".into()] } },
            receiver: None,
            args: vec![0, 0],
        };
        let mut mb = CfgBuilder::new();
        let n_a = mb.push(Stmt::IntConst { lhs: 0, value: 10 });
        let n_call = mb.push(Stmt::Invoke { lhs: Some(1), call, site: 7 });
        let n_use = mb.push(Stmt::Return { value: None });
        let mut caller_cfg = mb.finish(0, n_a, vec![n_use]);
        caller_cfg.add_edge(n_a, CfgEdgeKind::FallThrough, n_call);
        caller_cfg.add_edge(n_call, CfgEdgeKind::FallThrough, n_use);
        let caller = MethodDef {
            id: 0,
            declaring_class: "Main".into(),
            subsig: Subsignature { name: "main".into(), param_types: vec![] },
            is_static: true,
            is_abstract: false,
            params: vec![],
            this_var: None,
            vars: vec![var(0, "a"), var(1, "r")],
            cfg: caller_cfg,
        };
        program.add_method(caller);
        program.set_entry(0);

        let mut cg = CallGraph::new();
        cg.add_reachable(0);
        cg.add_reachable(1);
        cg.add_edge(CallEdge { caller: 0, callee: 1, kind: CallKind::Static, site: 7 });

        let result = InterConstPropagation::solve(&program, &cg, 0);
        let at_callee_entry = IcfgNode { method: 1, node: n_ret_val };
        assert_eq!(result.in_fact(at_callee_entry).get(0), Value::Undef);
        let at_use = IcfgNode { method: 0, node: n_use };
        assert_eq!(result.in_fact(at_use).get(1), Value::Undef);
    }
}
