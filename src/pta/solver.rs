//! The Andersen-style, on-the-fly pointer-analysis solver (spec §4.5,
//! §4.6, §4.7). Context-sensitive and context-insensitive analysis are
//! the same code here, parametrized by a [`ContextSelector`]; running it
//! with [`super::context::ContextInsensitive`] *is* §4.6.
//!
//! Grounded on the teacher's Andersen driver shape (reachable-method
//! worklist, incremental flow-graph edges, on-the-fly call processing)
//! generalized from a whole-program single pass to a context-qualified
//! fixpoint over `(method, context)` pairs.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::callgraph::cha::resolve_declared;
use crate::callgraph::{CallEdge, CallGraph, CallKind};
use crate::ir::{CallSiteId, ClassHierarchy, FieldRef, InvokeKind, MethodId, Program, Subsignature, VarId};
use crate::pta::context::{Context, ContextSelector};
use crate::pta::cs_manager::{CSObjId, CSVarId, CsManager};
use crate::pta::heap::HeapModel;
use crate::pta::pfg::Pfg;
use crate::pta::pointer::{CSObjKey, CSVarKey, Pointer};

/// A `Virtual`/`Interface`/`Special` invoke whose receiver's points-to
/// set hasn't fully arrived yet: reprocessed every time that set gains a
/// new object (spec §4.7 "on-the-fly"). `fixed_callee` is set for
/// `Special` invokes, whose target doesn't depend on the receiver's
/// runtime type, only its identity (for context selection).
#[derive(Clone)]
struct PendingInvoke {
    caller: MethodId,
    caller_ctx: Context,
    site: CallSiteId,
    kind: InvokeKind,
    subsig: Subsignature,
    args: Vec<VarId>,
    lhs: Option<VarId>,
    fixed_callee: Option<MethodId>,
}

/// A field/array access awaiting its base/array var's points-to set.
#[derive(Clone)]
enum PendingAccess {
    LoadField { lhs: CSVarId, field: FieldRef },
    StoreField { field: FieldRef, rhs: CSVarId },
    LoadArray { lhs: CSVarId },
    StoreArray { rhs: CSVarId },
}

pub struct PtaResult {
    pts: HashMap<Pointer, HashSet<CSObjId>>,
    pub cs_manager: CsManager,
    /// Context-erased call graph, suitable for the rest of the pipeline
    /// (dead-code detection, reporting) which reasons at method
    /// granularity (spec §3 "Call graph").
    pub call_graph: CallGraph,
}

impl PtaResult {
    pub fn points_to(&self, p: &Pointer) -> HashSet<CSObjId> {
        self.pts.get(p).cloned().unwrap_or_default()
    }

    pub fn var_points_to(&self, method: MethodId, var: VarId, ctx: &Context) -> HashSet<CSObjId> {
        match self.cs_manager.lookup_var(&CSVarKey { method, var, context: ctx.clone() }) {
            Some(id) => self.points_to(&Pointer::Var(id)),
            None => HashSet::new(),
        }
    }
}

struct Solver<'a> {
    program: &'a Program,
    hierarchy: &'a dyn ClassHierarchy,
    selector: &'a dyn ContextSelector,
    heap: HeapModel,

    csman: CsManager,
    pfg: Pfg,
    pts: HashMap<Pointer, HashSet<CSObjId>>,
    worklist: VecDeque<(Pointer, CSObjId)>,

    cs_reachable: HashSet<(MethodId, Context)>,
    pending_invokes: HashMap<Pointer, Vec<PendingInvoke>>,
    pending_accesses: HashMap<Pointer, Vec<PendingAccess>>,

    call_graph: CallGraph,
    cs_call_edges: HashSet<(MethodId, Context, CallSiteId, MethodId, Context)>,
}

impl<'a> Solver<'a> {
    fn cs_var_id(&mut self, method: MethodId, var: VarId, ctx: &Context) -> CSVarId {
        self.csman.cs_var(CSVarKey { method, var, context: ctx.clone() })
    }

    fn cs_var_ptr(&mut self, method: MethodId, var: VarId, ctx: &Context) -> Pointer {
        Pointer::Var(self.cs_var_id(method, var, ctx))
    }

    /// Adds `obj` to `p`'s points-to set, enqueuing it for propagation if
    /// new. Returns whether it was new.
    fn add_pts(&mut self, p: Pointer, obj: CSObjId) -> bool {
        let is_new = self.pts.entry(p.clone()).or_default().insert(obj);
        if is_new {
            self.worklist.push_back((p, obj));
        }
        is_new
    }

    /// Adds a PFG edge, propagating the source's current points-to set
    /// across it immediately if the edge is new.
    fn add_edge(&mut self, from: Pointer, to: Pointer) {
        if !self.pfg.add_edge(from.clone(), to.clone()) {
            return;
        }
        let existing: Vec<CSObjId> = self.pts.get(&from).into_iter().flatten().copied().collect();
        for obj in existing {
            self.add_pts(to.clone(), obj);
        }
    }

    /// Marks `(method, ctx)` reachable, scanning its statements once to
    /// install static PFG edges, register dynamic field/array/invoke
    /// listeners on the relevant base variables, and seed `New` sites.
    fn process_method(&mut self, method_id: MethodId, ctx: Context) {
        if !self.cs_reachable.insert((method_id, ctx.clone())) {
            return;
        }
        self.call_graph.add_reachable(method_id);

        let method = self.program.method(method_id);
        for stmt in method.cfg.stmts.clone() {
            self.process_stmt(method_id, &ctx, &stmt);
        }
    }

    fn process_stmt(&mut self, method_id: MethodId, ctx: &Context, stmt: &crate::ir::Stmt) {
        use crate::ir::Stmt;

        match stmt {
            Stmt::New { lhs, site, .. } => {
                let heap_ctx = self.selector.select_heap_context(ctx, *site);
                let obj = self.csman.cs_obj(CSObjKey { site: *site, context: heap_ctx });
                let lhs_ptr = self.cs_var_ptr(method_id, *lhs, ctx);
                self.add_pts(lhs_ptr, obj);
            }
            Stmt::Copy { lhs, rhs } => {
                let from = self.cs_var_ptr(method_id, *rhs, ctx);
                let to = self.cs_var_ptr(method_id, *lhs, ctx);
                self.add_edge(from, to);
            }
            Stmt::LoadField { lhs, field, base: Some(base) } => {
                let lhs_id = self.cs_var_id(method_id, *lhs, ctx);
                let base_ptr = self.cs_var_ptr(method_id, *base, ctx);
                self.pending_accesses
                    .entry(base_ptr)
                    .or_default()
                    .push(PendingAccess::LoadField { lhs: lhs_id, field: field.clone() });
            }
            Stmt::LoadField { lhs, field, base: None } => {
                let lhs_ptr = self.cs_var_ptr(method_id, *lhs, ctx);
                self.add_edge(Pointer::StaticField(field.clone()), lhs_ptr);
            }
            Stmt::StoreField { field, base: Some(base), rhs } => {
                let rhs_id = self.cs_var_id(method_id, *rhs, ctx);
                let base_ptr = self.cs_var_ptr(method_id, *base, ctx);
                self.pending_accesses
                    .entry(base_ptr)
                    .or_default()
                    .push(PendingAccess::StoreField { field: field.clone(), rhs: rhs_id });
            }
            Stmt::StoreField { field, base: None, rhs } => {
                let rhs_ptr = self.cs_var_ptr(method_id, *rhs, ctx);
                self.add_edge(rhs_ptr, Pointer::StaticField(field.clone()));
            }
            Stmt::LoadArray { lhs, base, .. } => {
                let lhs_id = self.cs_var_id(method_id, *lhs, ctx);
                let base_ptr = self.cs_var_ptr(method_id, *base, ctx);
                self.pending_accesses.entry(base_ptr).or_default().push(PendingAccess::LoadArray { lhs: lhs_id });
            }
            Stmt::StoreArray { base, rhs, .. } => {
                let rhs_id = self.cs_var_id(method_id, *rhs, ctx);
                let base_ptr = self.cs_var_ptr(method_id, *base, ctx);
                self.pending_accesses.entry(base_ptr).or_default().push(PendingAccess::StoreArray { rhs: rhs_id });
            }
            Stmt::Return { value: Some(v) } => {
                let from = self.cs_var_ptr(method_id, *v, ctx);
                self.add_edge(from, Pointer::Return(method_id, ctx.clone()));
            }
            Stmt::Invoke { lhs, call, site } => match call.kind {
                InvokeKind::Static => {
                    match self.program.resolve(&call.method_ref.declaring_class, &call.method_ref.subsig) {
                        Some(callee) => {
                            self.wire_call(method_id, ctx, *site, CallKind::Static, callee, Context::empty(), &call.args, *lhs, None);
                        }
                        None => {
                            log::warn!(
                                "{}",
                                crate::error::IrError::MissingDispatchTarget(format!(
                                    "{}.{}",
                                    call.method_ref.declaring_class, call.method_ref.subsig
                                ))
                            );
                        }
                    }
                }
                InvokeKind::Special => {
                    let fixed_callee = resolve_declared(self.hierarchy, &call.method_ref.declaring_class, &call.method_ref.subsig);
                    match (fixed_callee, call.receiver) {
                        (Some(callee), Some(recv)) => {
                            let recv_ptr = self.cs_var_ptr(method_id, recv, ctx);
                            self.pending_invokes.entry(recv_ptr).or_default().push(PendingInvoke {
                                caller: method_id,
                                caller_ctx: ctx.clone(),
                                site: *site,
                                kind: InvokeKind::Special,
                                subsig: call.method_ref.subsig.clone(),
                                args: call.args.clone(),
                                lhs: *lhs,
                                fixed_callee: Some(callee),
                            });
                        }
                        (None, _) => {
                            log::warn!(
                                "{}",
                                crate::error::IrError::MissingDispatchTarget(format!(
                                    "{}.{}",
                                    call.method_ref.declaring_class, call.method_ref.subsig
                                ))
                            );
                        }
                        (Some(_), None) => {}
                    }
                }
                InvokeKind::Virtual | InvokeKind::Interface => {
                    let recv = call.receiver.expect("virtual/interface invoke has a receiver");
                    let recv_ptr = self.cs_var_ptr(method_id, recv, ctx);
                    self.pending_invokes.entry(recv_ptr).or_default().push(PendingInvoke {
                        caller: method_id,
                        caller_ctx: ctx.clone(),
                        site: *site,
                        kind: call.kind,
                        subsig: call.method_ref.subsig.clone(),
                        args: call.args.clone(),
                        lhs: *lhs,
                        fixed_callee: None,
                    });
                }
                InvokeKind::Dynamic => {}
            },
            _ => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn wire_call(
        &mut self,
        caller: MethodId,
        caller_ctx: &Context,
        site: CallSiteId,
        kind: CallKind,
        callee: MethodId,
        callee_ctx: Context,
        args: &[VarId],
        lhs: Option<VarId>,
        receiver_obj: Option<CSObjId>,
    ) {
        let key = (caller, caller_ctx.clone(), site, callee, callee_ctx.clone());
        if !self.cs_call_edges.insert(key) {
            return;
        }

        let callee_def = self.program.method(callee);
        if args.len() != callee_def.params.len() {
            log::warn!(
                "{}",
                crate::error::IrError::ArityMismatch {
                    callee: format!("{}.{}", callee_def.declaring_class, callee_def.subsig),
                    args: args.len(),
                    params: callee_def.params.len(),
                }
            );
            return;
        }

        self.call_graph.add_edge(CallEdge { caller, callee, kind, site });
        self.process_method(callee, callee_ctx.clone());

        let callee_def = self.program.method(callee);
        if let Some(obj) = receiver_obj {
            if let Some(this_var) = callee_def.this_var {
                let this_ptr = self.cs_var_ptr(callee, this_var, &callee_ctx);
                self.add_pts(this_ptr, obj);
            }
        }
        let params = callee_def.params.clone();
        for (arg, param) in args.iter().zip(params.iter()) {
            let from = self.cs_var_ptr(caller, *arg, caller_ctx);
            let to = self.cs_var_ptr(callee, *param, &callee_ctx);
            self.add_edge(from, to);
        }
        if let Some(lhs_var) = lhs {
            let to = self.cs_var_ptr(caller, lhs_var, caller_ctx);
            self.add_edge(Pointer::Return(callee, callee_ctx), to);
        }
    }

    fn dispatch_from_object(&mut self, invoke: &PendingInvoke, obj: CSObjId) {
        let site_alloc = self.csman.obj_alloc_site(obj);
        let recv_ctx = self.csman.obj_context(obj).clone();
        let callee_ctx = self
            .selector
            .select_for_call(&invoke.caller_ctx, invoke.site, Some((&recv_ctx, site_alloc)));

        let callee = match invoke.fixed_callee {
            Some(m) => Some(m),
            None => {
                let class = self.heap.type_of(site_alloc).cloned();
                class.and_then(|c| resolve_declared(self.hierarchy, &c, &invoke.subsig))
            }
        };
        let Some(callee) = callee else { return };

        let kind = match invoke.kind {
            InvokeKind::Virtual => CallKind::Virtual,
            InvokeKind::Interface => CallKind::Interface,
            InvokeKind::Special => CallKind::Special,
            _ => CallKind::Dynamic,
        };

        self.wire_call(invoke.caller, &invoke.caller_ctx, invoke.site, kind, callee, callee_ctx, &invoke.args, invoke.lhs, Some(obj));
    }

    fn run(&mut self, entry: MethodId) {
        self.process_method(entry, Context::empty());
        self.drain();
    }

    /// Runs the work-list to quiescence. Split out from [`Solver::run`] so
    /// the taint overlay (which injects fresh points-to facts after the
    /// initial solve) can re-drain the same queue rather than re-seeding
    /// the whole analysis (spec §4.10: a taint injection "trigger[s]
    /// another PTA work-list iteration").
    fn drain(&mut self) {
        while let Some((p, obj)) = self.worklist.pop_front() {
            let succs = self.pfg.succs(&p).to_vec();
            for succ in succs {
                self.add_pts(succ, obj);
            }

            if matches!(p, Pointer::Var(_)) {
                let accesses = self.pending_accesses.get(&p).cloned().unwrap_or_default();
                for access in accesses {
                    match access {
                        PendingAccess::LoadField { lhs, field } => {
                            self.add_edge(Pointer::InstanceField(obj, field), Pointer::Var(lhs));
                        }
                        PendingAccess::StoreField { field, rhs } => {
                            self.add_edge(Pointer::Var(rhs), Pointer::InstanceField(obj, field));
                        }
                        PendingAccess::LoadArray { lhs } => {
                            self.add_edge(Pointer::ArrayElem(obj), Pointer::Var(lhs));
                        }
                        PendingAccess::StoreArray { rhs } => {
                            self.add_edge(Pointer::Var(rhs), Pointer::ArrayElem(obj));
                        }
                    }
                }

                let invokes = self.pending_invokes.get(&p).cloned().unwrap_or_default();
                for invoke in &invokes {
                    self.dispatch_from_object(invoke, obj);
                }
            }
        }
    }
}

impl<'a> Solver<'a> {
    fn new(program: &'a Program, hierarchy: &'a dyn ClassHierarchy, selector: &'a dyn ContextSelector) -> Self {
        Solver {
            program,
            hierarchy,
            selector,
            heap: HeapModel::build(program),
            csman: CsManager::new(),
            pfg: Pfg::new(),
            pts: HashMap::new(),
            worklist: VecDeque::new(),
            cs_reachable: HashSet::new(),
            pending_invokes: HashMap::new(),
            pending_accesses: HashMap::new(),
            call_graph: CallGraph::new(),
            cs_call_edges: HashSet::new(),
        }
    }
}

/// Runs the pointer analysis to a fixpoint from `entry`, under `selector`.
pub fn solve(program: &Program, hierarchy: &dyn ClassHierarchy, entry: MethodId, selector: &dyn ContextSelector) -> PtaResult {
    let mut solver = Solver::new(program, hierarchy, selector);
    solver.run(entry);

    PtaResult { pts: solver.pts, cs_manager: solver.csman, call_graph: solver.call_graph }
}

/// A running pointer analysis kept alive past its initial fixpoint so a
/// client (the taint overlay) can inject further points-to facts and
/// re-drain the shared work-list, rather than re-running the whole
/// analysis from scratch (spec §4.10).
pub struct PtaEngine<'a> {
    solver: Solver<'a>,
}

impl<'a> PtaEngine<'a> {
    pub fn run(program: &'a Program, hierarchy: &'a dyn ClassHierarchy, entry: MethodId, selector: &'a dyn ContextSelector) -> Self {
        let mut solver = Solver::new(program, hierarchy, selector);
        solver.run(entry);
        PtaEngine { solver }
    }

    pub fn program(&self) -> &'a Program {
        self.solver.program
    }

    pub fn csman(&self) -> &CsManager {
        &self.solver.csman
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.solver.call_graph
    }

    pub fn points_to(&self, p: &Pointer) -> HashSet<CSObjId> {
        self.solver.pts.get(p).cloned().unwrap_or_default()
    }

    /// The canonical pointer for `(method, var)` under `ctx`, minting a
    /// fresh CS-id if this exact key was never reached by the solve (a
    /// taint source/sink named in config but never actually called has
    /// an empty points-to set forever, which is the correct answer).
    pub fn cs_var_ptr(&mut self, method: MethodId, var: VarId, ctx: &Context) -> Pointer {
        self.solver.cs_var_ptr(method, var, ctx)
    }

    /// Mints (or re-uses) the distinguished object for a taint fabricated
    /// at `site` with heap context `ctx` — always [`Context::empty`] in
    /// practice, since the overlay's flow map is contextless (spec §4.10).
    pub fn cs_obj(&mut self, site: crate::ir::NewSiteId, ctx: Context) -> CSObjId {
        self.solver.csman.cs_obj(CSObjKey { site, context: ctx })
    }

    pub fn next_free_site(&self) -> crate::ir::NewSiteId {
        self.solver.heap.next_free_site()
    }

    /// Adds `obj` to `p`'s points-to set and re-drains the work-list to a
    /// new fixpoint if it was actually new.
    pub fn inject(&mut self, p: Pointer, obj: CSObjId) -> bool {
        let is_new = self.solver.add_pts(p, obj);
        if is_new {
            self.solver.drain();
        }
        is_new
    }

    pub fn into_result(self) -> PtaResult {
        PtaResult { pts: self.solver.pts, cs_manager: self.solver.csman, call_graph: self.solver.call_graph }
    }
}
