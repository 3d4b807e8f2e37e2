//! Canonicalization of context-qualified variables and objects (spec §3
//! "CSManager" invariant: "equal keys return the same pointer instance").
//! A bare `HashMap<Key, Id>` would satisfy that invariant on its own, but
//! centralizing it here keeps the key types out of the solver's hot path
//! and gives the taint overlay and report layer a single place to turn a
//! [`CSVarId`]/[`CSObjId`] back into something readable.

use std::collections::HashMap;

use crate::ir::NewSiteId;
use crate::pta::context::Context;
use crate::pta::pointer::{CSObjKey, CSVarKey};

pub type CSVarId = u32;
pub type CSObjId = u32;

#[derive(Debug, Default)]
pub struct CsManager {
    var_ids: HashMap<CSVarKey, CSVarId>,
    vars: Vec<CSVarKey>,
    obj_ids: HashMap<CSObjKey, CSObjId>,
    objs: Vec<CSObjKey>,
}

impl CsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical id for `key`, minting a new one the first
    /// time this exact key is seen.
    pub fn cs_var(&mut self, key: CSVarKey) -> CSVarId {
        if let Some(&id) = self.var_ids.get(&key) {
            return id;
        }
        let id = self.vars.len() as CSVarId;
        self.vars.push(key.clone());
        self.var_ids.insert(key, id);
        id
    }

    pub fn cs_obj(&mut self, key: CSObjKey) -> CSObjId {
        if let Some(&id) = self.obj_ids.get(&key) {
            return id;
        }
        let id = self.objs.len() as CSObjId;
        self.objs.push(key.clone());
        self.obj_ids.insert(key, id);
        id
    }

    pub fn var_key(&self, id: CSVarId) -> &CSVarKey {
        &self.vars[id as usize]
    }

    /// The canonical id for `key`, if that exact (method, var, context)
    /// has already been minted. Unlike [`CsManager::cs_var`] this never
    /// allocates — used by read-only result queries after the solve has
    /// finished.
    pub fn lookup_var(&self, key: &CSVarKey) -> Option<CSVarId> {
        self.var_ids.get(key).copied()
    }

    /// Every context-qualified instance of `(method, var)`, regardless of
    /// context — used by the taint overlay, which reports flows at
    /// method-and-variable granularity rather than a specific context
    /// (spec §4.10: sinks are scanned by call site, not by caller
    /// context).
    pub fn vars_for(&self, method: crate::ir::MethodId, var: crate::ir::VarId) -> Vec<CSVarId> {
        self.vars
            .iter()
            .enumerate()
            .filter(|(_, key)| key.method == method && key.var == var)
            .map(|(id, _)| id as CSVarId)
            .collect()
    }

    pub fn obj_key(&self, id: CSObjId) -> &CSObjKey {
        &self.objs[id as usize]
    }

    pub fn obj_alloc_site(&self, id: CSObjId) -> NewSiteId {
        self.objs[id as usize].site
    }

    pub fn obj_context(&self, id: CSObjId) -> &Context {
        &self.objs[id as usize].context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_canonicalize_to_the_same_id() {
        let mut man = CsManager::new();
        let key = CSVarKey { method: 0, var: 1, context: Context::empty() };
        let a = man.cs_var(key.clone());
        let b = man.cs_var(key);
        assert_eq!(a, b);
    }

    #[test]
    fn different_allocation_sites_yield_distinct_objects() {
        let mut man = CsManager::new();
        let a = man.cs_obj(CSObjKey { site: 3, context: Context::empty() });
        let b = man.cs_obj(CSObjKey { site: 4, context: Context::empty() });
        assert_ne!(a, b);
        assert_eq!(man.obj_alloc_site(a), 3);
        assert_eq!(man.obj_alloc_site(b), 4);
    }
}
