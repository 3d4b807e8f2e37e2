//! The IR contract (spec §6): the minimal surface a front-end must expose
//! for the analyses in this crate to run. We do not specify how an IR is
//! produced from source — only the shape every method must expose: an
//! ordered statement list, parameter/return/`this` variables, and a
//! closed set of statement variants with an exhaustive visitor discipline
//! (design note: "Dynamic dispatch over statement kinds").

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a variable within its owning method.
pub type VarId = u32;

/// Global id of a method across the whole program.
pub type MethodId = u32;

/// Global id of an allocation site (`New` statement), used as the
/// identity component of an allocation-site-abstracted [`crate::pta::heap::Obj`].
pub type NewSiteId = u32;

/// Global id of a call site, used by call-site-sensitive context selectors.
pub type CallSiteId = u32;

/// A fully-qualified class (or interface) name.
pub type ClassName = String;

/// A field name, scoped to the declaring class in [`FieldRef`].
pub type FieldName = String;

/// Narrow integer types participate in constant propagation (spec §3);
/// everything else is ignored by that lattice but still flows through
/// pointer analysis as an opaque reference type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Byte,
    Short,
    Int,
    Char,
    Boolean,
    Reference(ClassName),
}

impl Type {
    pub fn is_narrow_integer(&self) -> bool {
        matches!(
            self,
            Type::Byte | Type::Short | Type::Int | Type::Char | Type::Boolean
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Var {
    pub id: VarId,
    pub name: String,
    pub ty: Type,
}

/// A method subsignature: name plus the (erased) parameter type names.
/// Two methods with the same subsignature in a subclass chain override
/// one another, per the dispatch rule in spec §4.6/§4.8.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subsignature {
    pub name: String,
    pub param_types: Vec<String>,
}

impl fmt::Display for Subsignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.param_types.join(","))
    }
}

/// A reference to a method, as carried by an `Invoke` statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub declaring_class: ClassName,
    pub subsig: Subsignature,
}

/// A field, qualified by its declaring class. `is_static` distinguishes
/// a static field (keyed by class+name, contextless) from an instance
/// field (keyed by the receiver object at the point of access).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub declaring_class: ClassName,
    pub name: FieldName,
    pub is_static: bool,
}

/// An operand to a binary/comparison/bitwise expression: either a
/// variable reference or an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Var(VarId),
    Const(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    UShr,
}

impl BinOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_div_or_rem(&self) -> bool {
        matches!(self, BinOp::Div | BinOp::Rem)
    }
}

/// Actual arguments of an invocation, in declaration order.
#[derive(Debug, Clone)]
pub struct InvokeExp {
    pub kind: InvokeKind,
    pub method_ref: MethodRef,
    /// Receiver variable; `None` for static calls.
    pub receiver: Option<VarId>,
    pub args: Vec<VarId>,
}

/// How the callee is resolved at this call site. Mirrors the call-kind
/// taxonomy used for call-graph edges (spec §3 "Call graph").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Static,
    Special,
    Virtual,
    Interface,
    Dynamic,
}

/// The closed set of statement variants the core observes (spec §6).
/// Exhaustive match is the discipline; no open inheritance hierarchy.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `x := new T @ site`
    New {
        lhs: VarId,
        site: NewSiteId,
        ty: ClassName,
    },
    /// `x := y`
    Copy { lhs: VarId, rhs: VarId },
    /// `x := literal`
    IntConst { lhs: VarId, value: i32 },
    /// `x := a op b`
    Binary {
        lhs: VarId,
        op: BinOp,
        left: Operand,
        right: Operand,
    },
    /// `x := (T) y` — may throw, so never side-effect-free for dead-code purposes.
    Cast { lhs: VarId, rhs: VarId, ty: ClassName },
    /// `x := C.f` / `x := y.f`
    LoadField { lhs: VarId, field: FieldRef, base: Option<VarId> },
    /// `C.f := y` / `x.f := y`
    StoreField { field: FieldRef, base: Option<VarId>, rhs: VarId },
    /// `x := a[i]`
    LoadArray { lhs: VarId, base: VarId, index: VarId },
    /// `a[i] := y`
    StoreArray { base: VarId, index: VarId, rhs: VarId },
    /// `r := m(a0, ...)`, `r` absent when the result is discarded.
    Invoke { lhs: Option<VarId>, call: InvokeExp, site: CallSiteId },
    /// Conditional branch; successors are distinguished by CFG edge kind
    /// (`IF_TRUE`/`IF_FALSE`), not encoded here.
    If { cond_op: BinOp, left: Operand, right: Operand },
    /// Multi-way branch on an integer-typed variable; case targets are
    /// CFG edges (`SWITCH_CASE(value)`/`SWITCH_DEFAULT`).
    Switch { var: VarId },
    Return { value: Option<VarId> },
    /// No-op placeholder, used for synthetic entry/exit nodes.
    Nop,
}

impl Stmt {
    /// Variables defined (written) by this statement.
    pub fn defs(&self) -> Vec<VarId> {
        match self {
            Stmt::New { lhs, .. }
            | Stmt::Copy { lhs, .. }
            | Stmt::IntConst { lhs, .. }
            | Stmt::Binary { lhs, .. }
            | Stmt::Cast { lhs, .. }
            | Stmt::LoadField { lhs, .. }
            | Stmt::LoadArray { lhs, .. } => vec![*lhs],
            Stmt::Invoke { lhs, .. } => lhs.iter().copied().collect(),
            _ => vec![],
        }
    }

    /// Variables used (read) by this statement.
    pub fn uses(&self) -> Vec<VarId> {
        fn operand_var(o: &Operand) -> Option<VarId> {
            match o {
                Operand::Var(v) => Some(*v),
                Operand::Const(_) => None,
            }
        }
        match self {
            Stmt::Copy { rhs, .. } => vec![*rhs],
            Stmt::Binary { left, right, .. } => {
                [operand_var(left), operand_var(right)].into_iter().flatten().collect()
            }
            Stmt::Cast { rhs, .. } => vec![*rhs],
            Stmt::LoadField { base, .. } => base.iter().copied().collect(),
            Stmt::StoreField { base, rhs, .. } => {
                let mut v: Vec<VarId> = base.iter().copied().collect();
                v.push(*rhs);
                v
            }
            Stmt::LoadArray { base, index, .. } => vec![*base, *index],
            Stmt::StoreArray { base, index, rhs } => vec![*base, *index, *rhs],
            Stmt::Invoke { call, .. } => {
                let mut v: Vec<VarId> = call.receiver.iter().copied().collect();
                v.extend(call.args.iter().copied());
                v
            }
            Stmt::If { left, right, .. } => {
                [operand_var(left), operand_var(right)].into_iter().flatten().collect()
            }
            Stmt::Switch { var } => vec![*var],
            Stmt::Return { value } => value.iter().copied().collect(),
            Stmt::New { .. } | Stmt::IntConst { .. } | Stmt::Nop => vec![],
        }
    }

    /// Whether evaluating this statement can have an externally visible
    /// effect beyond the assignment itself (spec §4.9: allocation, cast,
    /// field/array access, division/remainder are never side-effect-free).
    pub fn is_side_effect_free(&self) -> bool {
        match self {
            Stmt::New { .. }
            | Stmt::Cast { .. }
            | Stmt::LoadField { .. }
            | Stmt::StoreField { .. }
            | Stmt::LoadArray { .. }
            | Stmt::StoreArray { .. }
            | Stmt::Invoke { .. } => false,
            Stmt::Binary { op, .. } => !op.is_div_or_rem(),
            Stmt::Copy { .. } | Stmt::IntConst { .. } => true,
            Stmt::If { .. } | Stmt::Switch { .. } | Stmt::Return { .. } | Stmt::Nop => true,
        }
    }
}

/// A method definition: its variables and its statement-level CFG.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub id: MethodId,
    pub declaring_class: ClassName,
    pub subsig: Subsignature,
    pub is_static: bool,
    pub is_abstract: bool,
    pub params: Vec<VarId>,
    pub this_var: Option<VarId>,
    pub vars: Vec<Var>,
    pub cfg: crate::cfg::Cfg,
}

impl MethodDef {
    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id as usize]
    }

    pub fn method_ref(&self) -> MethodRef {
        MethodRef {
            declaring_class: self.declaring_class.clone(),
            subsig: self.subsig.clone(),
        }
    }
}

/// The whole analyzed program: every method reachable from any class,
/// plus the designated analysis entry point.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub methods: Vec<MethodDef>,
    entry: Option<MethodId>,
    by_ref: HashMap<(ClassName, Subsignature), MethodId>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_method(&mut self, method: MethodDef) {
        let key = (method.declaring_class.clone(), method.subsig.clone());
        self.by_ref.insert(key, method.id);
        self.methods.push(method);
    }

    pub fn set_entry(&mut self, id: MethodId) {
        self.entry = Some(id);
    }

    pub fn entry(&self) -> Option<MethodId> {
        self.entry
    }

    pub fn method(&self, id: MethodId) -> &MethodDef {
        &self.methods[id as usize]
    }

    pub fn resolve(&self, class: &str, subsig: &Subsignature) -> Option<MethodId> {
        self.by_ref.get(&(class.to_string(), subsig.clone())).copied()
    }
}

/// The class-hierarchy oracle (spec §6). Implementations typically wrap
/// a symbol table built by the front-end; this crate only consumes it.
pub trait ClassHierarchy {
    fn direct_subclasses_of(&self, class: &str) -> Vec<ClassName>;
    fn direct_subinterfaces_of(&self, iface: &str) -> Vec<ClassName>;
    fn direct_implementors_of(&self, iface: &str) -> Vec<ClassName>;
    fn declared_method(&self, class: &str, subsig: &Subsignature) -> Option<MethodId>;
    fn super_class(&self, class: &str) -> Option<ClassName>;
    fn is_abstract(&self, method: MethodId) -> bool;
    fn is_interface(&self, class: &str) -> bool;
}

/// Parses a `Class.method(paramType1,paramType2)` signature, as written
/// in `entry_method` and in taint rule files (spec §6 "method-signature").
/// The class/method split happens after stripping the parameter list, so
/// a fully-qualified class name containing dots (`com.foo.Bar.baz()`)
/// still splits on the *last* dot before the parens.
pub fn parse_method_signature(sig: &str) -> Option<(ClassName, Subsignature)> {
    let open = sig.find('(')?;
    let close = sig.rfind(')')?;
    if close < open {
        return None;
    }
    let head = &sig[..open];
    let (class, name) = head.rsplit_once('.')?;
    let params_str = &sig[open + 1..close];
    let param_types = if params_str.trim().is_empty() {
        Vec::new()
    } else {
        params_str.split(',').map(|s| s.trim().to_string()).collect()
    };
    Some((class.to_string(), Subsignature { name: name.to_string(), param_types }))
}
