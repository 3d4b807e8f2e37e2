//! Pointer identities the analysis tracks points-to sets for (spec §3
//! "Pointer", "CSVar", "CSObj"). A context-sensitive variable, a static
//! field, an instance field qualified by its receiver object, and an
//! array's (index-insensitive) element all have points-to sets; this
//! enum unifies them so the pointer-flow graph and solver need only one
//! node type.

use crate::ir::{FieldRef, MethodId, VarId};
use crate::pta::cs_manager::{CSObjId, CSVarId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pointer {
    /// A context-sensitive local variable.
    Var(CSVarId),
    /// `C.f`, contextless — static fields are not qualified by a
    /// receiver object or call context.
    StaticField(FieldRef),
    /// `o.f` for a concrete abstract object `o`.
    InstanceField(CSObjId, FieldRef),
    /// `o[*]`, the single element standing in for every index of `o`
    /// (spec §6: arrays are modeled index-insensitively).
    ArrayElem(CSObjId),
    /// The aggregate return value of a context-sensitive method: every
    /// `Return` statement's value flows in, every call-site's result
    /// variable flows out.
    Return(MethodId, crate::pta::context::Context),
}

impl Pointer {
    pub fn var(id: CSVarId) -> Self {
        Pointer::Var(id)
    }
}

/// `(method, var, context)` before canonicalization into a [`CSVarId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CSVarKey {
    pub method: MethodId,
    pub var: VarId,
    pub context: crate::pta::context::Context,
}

/// `(allocation site, heap context)` before canonicalization into a
/// [`CSObjId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CSObjKey {
    pub site: crate::ir::NewSiteId,
    pub context: crate::pta::context::Context,
}
