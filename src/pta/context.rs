//! Context abstraction and selectors (spec §4.7): context-sensitive and
//! context-insensitive pointer analysis share one solver by parametrizing
//! over how a callee's context is derived at a call site, and how a
//! freshly allocated object's heap context is derived at its method's
//! context. Context-insensitive analysis is simply the selector that
//! always answers the empty context.

use crate::ir::{CallSiteId, NewSiteId};

/// One link in a context: either a call site (call-site sensitivity) or
/// an allocation site (object sensitivity). Mixing both in one type lets
/// every selector share the same [`Context`] representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextElem {
    CallSite(CallSiteId),
    Object(NewSiteId),
}

/// A bounded sequence of [`ContextElem`]s, most recent last. Two
/// `Context`s compare equal iff their element sequences are equal — this
/// is the equality the CS-manager canonicalizes pointers and objects on
/// (spec §3 "CSManager").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Context(Vec<ContextElem>);

impl Context {
    pub fn empty() -> Self {
        Context(Vec::new())
    }

    pub fn elems(&self) -> &[ContextElem] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `self` with `elem` appended, kept to at most `k` elements (the
    /// oldest is dropped first) — the standard k-limiting that keeps the
    /// context lattice finite.
    fn extended(&self, elem: ContextElem, k: usize) -> Context {
        if k == 0 {
            return Context::empty();
        }
        let mut v = self.0.clone();
        v.push(elem);
        let start = v.len().saturating_sub(k);
        Context(v[start..].to_vec())
    }
}

/// Selects contexts for callee methods and freshly allocated objects
/// (spec §4.7 "selectContext" / "selectHeapContext").
pub trait ContextSelector: Send + Sync {
    /// The context a call at `site` (from `caller_ctx`) runs its callee
    /// under. `receiver` is the allocation site and heap context of one
    /// concrete receiver object, when the call has one (absent for
    /// static calls, or when a selector that ignores receivers is used).
    fn select_for_call(
        &self,
        caller_ctx: &Context,
        site: CallSiteId,
        receiver: Option<(&Context, NewSiteId)>,
    ) -> Context;

    /// The heap context assigned to an object allocated at `site` while
    /// executing under `method_ctx`.
    fn select_heap_context(&self, method_ctx: &Context, site: NewSiteId) -> Context;
}

/// The degenerate selector: every context is empty. Running the shared
/// solver with this selector is exactly context-insensitive analysis
/// (spec §4.6 is §4.7 specialized to this selector).
pub struct ContextInsensitive;

impl ContextSelector for ContextInsensitive {
    fn select_for_call(&self, _: &Context, _: CallSiteId, _: Option<(&Context, NewSiteId)>) -> Context {
        Context::empty()
    }

    fn select_heap_context(&self, _: &Context, _: NewSiteId) -> Context {
        Context::empty()
    }
}

/// k-call-site sensitivity: a callee's context is the caller's call
/// string with this call site appended. Heap contexts are always empty
/// (spec §4.7 "2-call-site": "Heap context = empty").
pub struct KCallSite(pub usize);

impl ContextSelector for KCallSite {
    fn select_for_call(&self, caller_ctx: &Context, site: CallSiteId, _: Option<(&Context, NewSiteId)>) -> Context {
        caller_ctx.extended(ContextElem::CallSite(site), self.0)
    }

    fn select_heap_context(&self, _method_ctx: &Context, _site: NewSiteId) -> Context {
        Context::empty()
    }
}

/// k-object sensitivity: a virtual/interface call's callee context is the
/// receiver object's own context with its allocation site appended;
/// calls with no concrete receiver (static calls) run context-free. A new
/// object's heap context is just the last element of the allocating
/// method's own context, or empty when the method runs context-free
/// (spec §4.7 "2-object": "Heap context for a new object = last element
/// of the allocating method's context (or empty when unavailable)").
pub struct KObject(pub usize);

impl ContextSelector for KObject {
    fn select_for_call(&self, _: &Context, _: CallSiteId, receiver: Option<(&Context, NewSiteId)>) -> Context {
        match receiver {
            Some((recv_ctx, alloc_site)) => recv_ctx.extended(ContextElem::Object(alloc_site), self.0),
            None => Context::empty(),
        }
    }

    fn select_heap_context(&self, method_ctx: &Context, _site: NewSiteId) -> Context {
        match method_ctx.elems().last() {
            Some(&elem) => Context::empty().extended(elem, 1),
            None => Context::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_insensitive_always_empty() {
        let sel = ContextInsensitive;
        let ctx = sel.select_for_call(&Context::empty(), 5, Some((&Context::empty(), 1)));
        assert!(ctx.is_empty());
    }

    #[test]
    fn k_call_site_truncates_to_k() {
        let sel = KCallSite(1);
        let c1 = sel.select_for_call(&Context::empty(), 1, None);
        let c2 = sel.select_for_call(&c1, 2, None);
        assert_eq!(c2.elems(), &[ContextElem::CallSite(2)]);
    }

    #[test]
    fn k_object_extends_receiver_context() {
        let sel = KObject(2);
        let recv_ctx = Context::empty().extended(ContextElem::Object(7), 2);
        let ctx = sel.select_for_call(&Context::empty(), 0, Some((&recv_ctx, 9)));
        assert_eq!(ctx.elems(), &[ContextElem::Object(7), ContextElem::Object(9)]);
    }

    #[test]
    fn k_object_static_call_has_no_receiver_context() {
        let sel = KObject(2);
        let ctx = sel.select_for_call(&Context::empty(), 0, None);
        assert!(ctx.is_empty());
    }
}
