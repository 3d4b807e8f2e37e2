//! Live-variable analysis (spec §4.2): a backward may-analysis over
//! [`SetFact<VarId>`], used by dead-code detection to tell an unused
//! assignment from a live one.

use crate::cfg::{Cfg, NodeIndex};
use crate::ir::VarId;
use crate::lattice::SetFact;
use crate::solver::DataflowAnalysis;

/// `in = (out \ def(stmt)) ∪ use(stmt)`, variable-typed defs/uses only.
pub struct LiveVariables;

impl DataflowAnalysis for LiveVariables {
    type Fact = SetFact<VarId>;

    fn is_forward(&self) -> bool {
        false
    }

    fn new_init_fact(&self) -> Self::Fact {
        SetFact::new()
    }

    fn new_boundary_fact(&self, _cfg: &Cfg) -> Self::Fact {
        SetFact::new()
    }

    fn meet_into(&self, from: &Self::Fact, into: &mut Self::Fact) -> bool {
        into.union_with(from)
    }

    fn transfer_node(&self, node: NodeIndex, cfg: &Cfg, in_fact: &Self::Fact, out: &mut Self::Fact) -> bool {
        // `in_fact` here is the successor-joined fact the generic solver
        // calls `in` for a backward pass (see `solve_backward`'s naming
        // note); we still call it `out` in this transfer's own terms: the
        // set of variables live *after* this statement.
        let stmt = cfg.stmt(node);
        let mut new_in = in_fact.clone();
        for def in stmt.defs() {
            new_in.remove(&def);
        }
        for use_ in stmt.uses() {
            new_in.insert(use_);
        }
        out.copy_from(&new_in)
    }
}
