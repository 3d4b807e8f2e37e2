//! Class-hierarchy-based call-graph construction (spec §4.8).

use std::collections::{HashSet, VecDeque};

use crate::callgraph::{CallEdge, CallGraph, CallKind};
use crate::ir::{ClassHierarchy, InvokeKind, MethodId, Program, Stmt, Subsignature};

/// Resolves a single declared-method dispatch starting at `class`,
/// ascending the superclass chain until a *concrete* override of
/// `subsig` is found. A class that declares the subsignature abstract
/// blocks the search rather than falling through (spec §4.6 "Dispatch":
/// "if declared and not abstract, return it; else ascend").
pub(crate) fn resolve_declared(hierarchy: &dyn ClassHierarchy, class: &str, subsig: &Subsignature) -> Option<MethodId> {
    let mut cur = Some(class.to_string());
    while let Some(c) = cur {
        if let Some(m) = hierarchy.declared_method(&c, subsig) {
            if !hierarchy.is_abstract(m) {
                return Some(m);
            }
            return None;
        }
        cur = hierarchy.super_class(&c);
    }
    None
}

/// The transitive closure of `root`'s subclasses, plus (when `root` is
/// an interface) its subinterfaces and direct implementors, recursively.
fn class_closure(hierarchy: &dyn ClassHierarchy, root: &str) -> Vec<String> {
    let mut visited = HashSet::new();
    let mut stack = vec![root.to_string()];
    let mut result = Vec::new();

    while let Some(c) = stack.pop() {
        if !visited.insert(c.clone()) {
            continue;
        }
        for sub in hierarchy.direct_subclasses_of(&c) {
            stack.push(sub);
        }
        if hierarchy.is_interface(&c) {
            for sub in hierarchy.direct_subinterfaces_of(&c) {
                stack.push(sub);
            }
            for imp in hierarchy.direct_implementors_of(&c) {
                stack.push(imp);
            }
        }
        result.push(c);
    }
    result
}

/// Resolves the set of potential targets of an invoke statement given
/// its call kind (spec §4.8).
pub fn resolve_targets(
    hierarchy: &dyn ClassHierarchy,
    program: &Program,
    kind: InvokeKind,
    declaring_class: &str,
    subsig: &Subsignature,
) -> Vec<MethodId> {
    match kind {
        InvokeKind::Static => program.resolve(declaring_class, subsig).into_iter().collect(),
        InvokeKind::Special => resolve_declared(hierarchy, declaring_class, subsig).into_iter().collect(),
        InvokeKind::Virtual | InvokeKind::Interface => {
            let mut seen = HashSet::new();
            let mut targets = Vec::new();
            for class in class_closure(hierarchy, declaring_class) {
                if let Some(m) = resolve_declared(hierarchy, &class, subsig) {
                    if seen.insert(m) {
                        targets.push(m);
                    }
                }
            }
            targets
        }
        // Dynamic dispatch (e.g. reflection, function pointers) is opaque
        // to CHA; the on-the-fly PTA call graph handles it instead.
        InvokeKind::Dynamic => Vec::new(),
    }
}

fn call_kind_for(kind: InvokeKind) -> CallKind {
    match kind {
        InvokeKind::Static => CallKind::Static,
        InvokeKind::Special => CallKind::Special,
        InvokeKind::Virtual => CallKind::Virtual,
        InvokeKind::Interface => CallKind::Interface,
        InvokeKind::Dynamic => CallKind::Dynamic,
    }
}

/// Builds a whole-program call graph from `entry`, resolving every
/// invoke statement in every transitively reachable method via CHA.
pub fn build(entry: MethodId, hierarchy: &dyn ClassHierarchy, program: &Program) -> CallGraph {
    let mut cg = CallGraph::new();
    let mut worklist = VecDeque::new();

    cg.add_reachable(entry);
    worklist.push_back(entry);

    while let Some(caller) = worklist.pop_front() {
        let method = program.method(caller);
        for stmt in &method.cfg.stmts {
            let Stmt::Invoke { call, site, .. } = stmt else { continue };
            let targets = resolve_targets(
                hierarchy,
                program,
                call.kind,
                &call.method_ref.declaring_class,
                &call.method_ref.subsig,
            );
            for callee in targets {
                let edge = CallEdge { caller, callee, kind: call_kind_for(call.kind), site: *site };
                if cg.add_edge(edge) && cg.add_reachable(callee) {
                    worklist.push_back(callee);
                }
            }
        }
    }

    cg
}
