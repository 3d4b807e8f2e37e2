//! Dead-code detection (spec §4.9): a client of the CFG plus the results
//! of constant propagation and live-variable analysis, not a
//! [`crate::solver::DataflowAnalysis`] itself — it is a one-shot forward
//! traversal honoring branch folding, plus a side-effect-free liveness
//! check.

use std::collections::HashSet;

use crate::analyses::constprop::ConstPropagation;
use crate::cfg::{Cfg, CfgEdgeKind, NodeIndex};
use crate::ir::{Stmt, VarId};
use crate::lattice::{CPFact, SetFact, Value};
use crate::solver::DataflowResult;

/// Statements judged dead, in ascending program-index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeadCode {
    pub dead: Vec<NodeIndex>,
}

/// Walks `cfg` forward from its entry, folding `If`/`Switch` guards under
/// the constant-propagation out-fact to prune statically-dead branches,
/// then additionally marks any reachable but unused, side-effect-free
/// assignment as dead (spec §4.9, §8 scenarios 2 and 3).
pub fn find_dead_code(cfg: &Cfg, cp_analysis: &ConstPropagation<'_>, cp: &DataflowResult<CPFact>, live: &DataflowResult<SetFact<VarId>>) -> DeadCode {
    let reachable = reachable_nodes(cfg, cp_analysis, cp);

    let mut dead: Vec<NodeIndex> = cfg.nodes().filter(|n| !reachable.contains(n)).collect();

    for node in reachable.iter().copied() {
        let stmt = cfg.stmt(node);
        let defs = stmt.defs();
        if defs.len() == 1 && stmt.is_side_effect_free() && !live.out_fact(node).contains(&defs[0]) {
            dead.push(node);
        }
    }

    dead.sort_unstable();
    dead.dedup();
    DeadCode { dead }
}

fn reachable_nodes(cfg: &Cfg, cp_analysis: &ConstPropagation<'_>, cp: &DataflowResult<CPFact>) -> HashSet<NodeIndex> {
    let mut visited = HashSet::new();
    let mut stack = vec![cfg.entry];

    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        let stmt = cfg.stmt(node);
        let out_fact = cp.out_fact(node);

        let targets: Vec<NodeIndex> = match stmt {
            Stmt::If { cond_op, left, right } => {
                let folded = cp_analysis.evaluate_binary(*cond_op, *left, *right, out_fact);
                match folded {
                    Value::Const(1) => cfg
                        .out_edges(node)
                        .iter()
                        .filter(|e| matches!(e.kind, CfgEdgeKind::IfTrue))
                        .map(|e| e.target)
                        .collect(),
                    Value::Const(_) => cfg
                        .out_edges(node)
                        .iter()
                        .filter(|e| matches!(e.kind, CfgEdgeKind::IfFalse))
                        .map(|e| e.target)
                        .collect(),
                    _ => cfg.out_edges(node).iter().map(|e| e.target).collect(),
                }
            }
            Stmt::Switch { var } => match out_fact.get(*var) {
                Value::Const(c) => {
                    let matching: Vec<NodeIndex> = cfg
                        .out_edges(node)
                        .iter()
                        .filter(|e| matches!(e.kind, CfgEdgeKind::SwitchCase(v) if v == c))
                        .map(|e| e.target)
                        .collect();
                    if matching.is_empty() {
                        cfg.out_edges(node)
                            .iter()
                            .filter(|e| matches!(e.kind, CfgEdgeKind::SwitchDefault))
                            .map(|e| e.target)
                            .collect()
                    } else {
                        matching
                    }
                }
                _ => cfg.out_edges(node).iter().map(|e| e.target).collect(),
            },
            _ => cfg.out_edges(node).iter().map(|e| e.target).collect(),
        };

        stack.extend(targets);
    }

    visited
}
