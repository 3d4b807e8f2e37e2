//! Intraprocedural constant propagation (spec §4.3): a forward analysis
//! over the three-point [`Value`] lattice, boundary = method parameters
//! bound to NAC ("unknown caller values").

use crate::cfg::{Cfg, NodeIndex};
use crate::ir::{BinOp, MethodDef, Operand, Stmt, VarId};
use crate::lattice::{CPFact, Value};
use crate::solver::DataflowAnalysis;

/// Intraprocedural constant propagation, scoped to one method. Only
/// narrow-integer-typed variables (spec §3) are tracked; every other
/// variable is simply never written into the fact and reads as UNDEF,
/// which callers must not mistake for "provably zero" — `evaluate`
/// returns NAC for anything this analysis doesn't model (field/array
/// loads, calls, casts, allocations).
pub struct ConstPropagation<'m> {
    method: &'m MethodDef,
}

impl<'m> ConstPropagation<'m> {
    pub fn new(method: &'m MethodDef) -> Self {
        Self { method }
    }

    fn is_int_var(&self, var: VarId) -> bool {
        self.method.var(var).ty.is_narrow_integer()
    }

    fn operand_value(&self, op: Operand, fact: &CPFact) -> Value {
        match op {
            Operand::Const(c) => Value::Const(c),
            Operand::Var(v) => fact.get(v),
        }
    }

    /// `evaluate(exp, fact)` (spec §4.3).
    pub fn evaluate_binary(&self, op: BinOp, left: Operand, right: Operand, fact: &CPFact) -> Value {
        let lv = self.operand_value(left, fact);
        let rv = self.operand_value(right, fact);

        if op.is_div_or_rem() {
            if let Operand::Const(0) = right {
                return Value::Undef;
            }
            if let Value::Const(0) = rv {
                return Value::Undef;
            }
        }

        match (lv, rv) {
            (Value::Const(a), Value::Const(b)) => Value::Const(fold(op, a, b)),
            (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
            _ => Value::Undef,
        }
    }
}

/// Two's-complement 32-bit folding; shift amounts are masked to 5 bits
/// (spec §4.3: "SHL/SHR/USHR mask shift amount by 31").
fn fold(op: BinOp, a: i32, b: i32) -> i32 {
    match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => a.wrapping_div(b),
        BinOp::Rem => a.wrapping_rem(b),
        BinOp::Eq => (a == b) as i32,
        BinOp::Ne => (a != b) as i32,
        BinOp::Lt => (a < b) as i32,
        BinOp::Le => (a <= b) as i32,
        BinOp::Gt => (a > b) as i32,
        BinOp::Ge => (a >= b) as i32,
        BinOp::And => a & b,
        BinOp::Or => a | b,
        BinOp::Xor => a ^ b,
        BinOp::Shl => a.wrapping_shl((b & 31) as u32),
        BinOp::Shr => a.wrapping_shr((b & 31) as u32),
        BinOp::UShr => ((a as u32).wrapping_shr((b & 31) as u32)) as i32,
    }
}

impl<'m> DataflowAnalysis for ConstPropagation<'m> {
    type Fact = CPFact;

    fn is_forward(&self) -> bool {
        true
    }

    fn new_init_fact(&self) -> Self::Fact {
        CPFact::new()
    }

    /// Parameters start at NAC: the intraprocedural path has no caller
    /// context to bind them to (spec §8 "Boundary behaviors").
    fn new_boundary_fact(&self, _cfg: &Cfg) -> Self::Fact {
        let mut fact = CPFact::new();
        for &p in &self.method.params {
            if self.is_int_var(p) {
                fact.update(p, Value::Nac);
            }
        }
        fact
    }

    fn meet_into(&self, from: &Self::Fact, into: &mut Self::Fact) -> bool {
        into.meet_into(from)
    }

    fn transfer_node(&self, node: NodeIndex, cfg: &Cfg, in_fact: &Self::Fact, out: &mut Self::Fact) -> bool {
        let stmt = cfg.stmt(node);
        let mut new_out = in_fact.clone();

        match stmt {
            Stmt::IntConst { lhs, value } if self.is_int_var(*lhs) => {
                new_out.update(*lhs, Value::Const(*value));
            }
            Stmt::Copy { lhs, rhs } if self.is_int_var(*lhs) => {
                new_out.update(*lhs, in_fact.get(*rhs));
            }
            Stmt::Binary { lhs, op, left, right } if self.is_int_var(*lhs) => {
                new_out.update(*lhs, self.evaluate_binary(*op, *left, *right, in_fact));
            }
            // Field access, array access, invocation, instance creation,
            // and cast are all unmodeled by the intra-procedural lattice
            // (spec §4.3): any of them conservatively yields NAC for an
            // integer-typed result.
            Stmt::LoadField { lhs, .. } | Stmt::LoadArray { lhs, .. } if self.is_int_var(*lhs) => {
                new_out.update(*lhs, Value::Nac);
            }
            Stmt::Invoke { lhs: Some(lhs), .. } if self.is_int_var(*lhs) => {
                new_out.update(*lhs, Value::Nac);
            }
            _ => {}
        }

        out.copy_from(&new_out)
    }
}
