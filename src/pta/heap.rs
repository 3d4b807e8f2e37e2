//! Allocation-site abstraction (spec §3 "Obj"): every `New` statement in
//! the program is one abstract object, standing in for every instance it
//! creates at run time. [`HeapModel`] is the pre-pass that records each
//! site's declared type once, so the solver can look it up by
//! [`NewSiteId`] alone when dispatching a virtual call against a
//! concrete receiver object.

use std::collections::HashMap;

use crate::ir::{ClassName, NewSiteId, Program, Stmt};

#[derive(Debug, Default)]
pub struct HeapModel {
    site_type: HashMap<NewSiteId, ClassName>,
}

impl HeapModel {
    /// Scans every method in `program` once, recording each `New` site's
    /// declared type.
    pub fn build(program: &Program) -> Self {
        let mut site_type = HashMap::new();
        for method in &program.methods {
            for stmt in &method.cfg.stmts {
                if let Stmt::New { site, ty, .. } = stmt {
                    site_type.insert(*site, ty.clone());
                }
            }
        }
        Self { site_type }
    }

    pub fn type_of(&self, site: NewSiteId) -> Option<&ClassName> {
        self.site_type.get(&site)
    }

    /// One past the highest allocation-site id this program actually
    /// uses. The taint overlay mints its own synthetic sites (one per
    /// source call site) starting here, so a fabricated taint object can
    /// never collide with a real `New` site (spec §4.10: "a distinguished
    /// `Obj` whose allocation site is the fabricating call site").
    pub fn next_free_site(&self) -> NewSiteId {
        self.site_type.keys().copied().max().map_or(0, |m| m + 1)
    }
}
