//! Taint-tracking overlay on the context-sensitive pointer analysis
//! (spec §4.10). Sources fabricate a distinguished taint object at their
//! call site; transfers re-tag and re-inject a taint already present on
//! one pointer onto another; sinks are scanned for matching taints once
//! the combined (PTA + taint) fixpoint is reached.
//!
//! Grounded on the teacher's JSON rule-file pattern for configuring a
//! checker's sources/sinks (`smartcheck` detector rule files), adapted
//! from a single flat array to the three-array shape spec §6 describes.

use std::collections::HashMap;
use std::path::Path;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;
use crate::ir::{parse_method_signature, ClassName, InvokeExp, MethodId, Program, Stmt, Subsignature, VarId};
use crate::pta::{CSObjId, Context, Pointer, PtaEngine};

/// A call-site-relative slot a taint can live in: the receiver, a
/// positional argument, or the call's own result (spec §6: "from and to
/// are either non-negative argument indices, BASE, or RESULT").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaintSlot {
    Arg(u32),
    Base,
    Result,
}

impl Serialize for TaintSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TaintSlot::Arg(i) => serializer.serialize_i64(*i as i64),
            TaintSlot::Base => serializer.serialize_str("BASE"),
            TaintSlot::Result => serializer.serialize_str("RESULT"),
        }
    }
}

impl<'de> Deserialize<'de> for TaintSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Index(i64),
            Tag(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Index(i) if i >= 0 => Ok(TaintSlot::Arg(i as u32)),
            Repr::Index(i) => Err(D::Error::custom(format!("taint slot index must be non-negative, got {i}"))),
            Repr::Tag(s) if s.eq_ignore_ascii_case("base") => Ok(TaintSlot::Base),
            Repr::Tag(s) if s.eq_ignore_ascii_case("result") => Ok(TaintSlot::Result),
            Repr::Tag(s) => Err(D::Error::custom(format!("unknown taint slot '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRule {
    pub method_signature: String,
    pub return_type: String,
}

/// `param_index == -1` denotes the receiver/base (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkRule {
    pub method_signature: String,
    pub param_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRule {
    pub method_signature: String,
    pub from: TaintSlot,
    pub to: TaintSlot,
    #[serde(rename = "type")]
    pub ty: String,
}

/// The declarative taint rule document (spec §6 "Taint configuration
/// format"): three named arrays, sources/sinks/transfers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaintConfig {
    #[serde(default)]
    pub sources: Vec<SourceRule>,
    #[serde(default)]
    pub sinks: Vec<SinkRule>,
    #[serde(default)]
    pub transfers: Vec<TransferRule>,
}

impl TaintConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// A witnessed propagation of a tainted value from a source call to a
/// sink call's parameter (spec §6, GLOSSARY "Taint flow"). Ordered by
/// `(source_site, sink_site, param_index)` per spec §6's comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TaintFlow {
    pub source_site: crate::ir::CallSiteId,
    pub sink_site: crate::ir::CallSiteId,
    pub param_index: i32,
}

#[derive(Debug, Clone, Default)]
pub struct TaintResult {
    pub flows: Vec<TaintFlow>,
}

struct SourceSite {
    site: crate::ir::CallSiteId,
    method: MethodId,
    lhs: Option<VarId>,
    return_type: String,
}

struct SinkSite {
    site: crate::ir::CallSiteId,
    method: MethodId,
    sink_var: Option<VarId>,
    param_index: i32,
}

struct TransferSite {
    method: MethodId,
    from_var: Option<VarId>,
    to_var: Option<VarId>,
    ty: String,
}

fn slot_var(call: &InvokeExp, lhs: Option<VarId>, slot: TaintSlot) -> Option<VarId> {
    match slot {
        TaintSlot::Base => call.receiver,
        TaintSlot::Arg(i) => call.args.get(i as usize).copied(),
        TaintSlot::Result => lhs,
    }
}

fn signature_matches(call: &InvokeExp, target: &(ClassName, Subsignature)) -> bool {
    call.method_ref.declaring_class == target.0 && call.method_ref.subsig == target.1
}

fn collect_sites(program: &Program, reachable: impl Iterator<Item = MethodId>, rules: &TaintConfig) -> (Vec<SourceSite>, Vec<SinkSite>, Vec<TransferSite>) {
    let source_targets: Vec<(SourceRule, (ClassName, Subsignature))> =
        rules.sources.iter().filter_map(|r| parse_method_signature(&r.method_signature).map(|t| (r.clone(), t))).collect();
    let sink_targets: Vec<(SinkRule, (ClassName, Subsignature))> =
        rules.sinks.iter().filter_map(|r| parse_method_signature(&r.method_signature).map(|t| (r.clone(), t))).collect();
    let transfer_targets: Vec<(TransferRule, (ClassName, Subsignature))> =
        rules.transfers.iter().filter_map(|r| parse_method_signature(&r.method_signature).map(|t| (r.clone(), t))).collect();

    let mut sources = Vec::new();
    let mut sinks = Vec::new();
    let mut transfers = Vec::new();

    for method_id in reachable {
        let method = program.method(method_id);
        for stmt in &method.cfg.stmts {
            let Stmt::Invoke { lhs, call, site } = stmt else { continue };

            for (rule, target) in &source_targets {
                if signature_matches(call, target) {
                    sources.push(SourceSite { site: *site, method: method_id, lhs: *lhs, return_type: rule.return_type.clone() });
                }
            }
            for (rule, target) in &sink_targets {
                if signature_matches(call, target) {
                    let sink_var = if rule.param_index < 0 { call.receiver } else { call.args.get(rule.param_index as usize).copied() };
                    sinks.push(SinkSite { site: *site, method: method_id, sink_var, param_index: rule.param_index });
                }
            }
            for (rule, target) in &transfer_targets {
                if signature_matches(call, target) {
                    transfers.push(TransferSite {
                        method: method_id,
                        from_var: slot_var(call, *lhs, rule.from),
                        to_var: slot_var(call, *lhs, rule.to),
                        ty: rule.ty.clone(),
                    });
                }
            }
        }
    }

    (sources, sinks, transfers)
}

/// Runs the taint overlay to a combined fixpoint with `pta` (which must
/// already have completed its own initial solve), then scans every sink
/// pointer's points-to set for a matching taint.
pub fn run(pta: &mut PtaEngine, rules: &TaintConfig) -> TaintResult {
    let reachable: Vec<MethodId> = pta.call_graph().reachable_methods().collect();
    let (sources, sinks, transfers) = collect_sites(pta.program(), reachable.into_iter(), rules);

    // One synthetic allocation site per distinct source call site (spec
    // §4.10: "a distinguished Obj whose allocation site is the
    // fabricating call site"), disjoint from every real `New` site.
    let mut site_to_obj_site: HashMap<crate::ir::CallSiteId, crate::ir::NewSiteId> = HashMap::new();
    let mut next_site = pta.next_free_site();
    for src in &sources {
        site_to_obj_site.entry(src.site).or_insert_with(|| {
            let s = next_site;
            next_site += 1;
            s
        });
    }
    let obj_site_to_source: HashMap<crate::ir::NewSiteId, crate::ir::CallSiteId> = site_to_obj_site.iter().map(|(&site, &obj_site)| (obj_site, site)).collect();

    // Taint identity is keyed by source call site alone; the type label
    // is auxiliary metadata a later transfer may overwrite, never part
    // of a taint object's identity (object identity comes from the PTA's
    // own CSObj canonicalization over allocation site + heap context).
    let mut labels: HashMap<CSObjId, String> = HashMap::new();

    let mut changed = true;
    while changed {
        changed = false;

        for src in &sources {
            let Some(lhs) = src.lhs else { continue };
            let obj_site = site_to_obj_site[&src.site];
            let obj = pta.cs_obj(obj_site, Context::empty());
            labels.entry(obj).or_insert_with(|| src.return_type.clone());

            let cs_vars = pta.csman().vars_for(src.method, lhs);
            for cs_var in cs_vars {
                if pta.inject(Pointer::Var(cs_var), obj) {
                    changed = true;
                }
            }
        }

        for xfer in &transfers {
            let (Some(from_var), Some(to_var)) = (xfer.from_var, xfer.to_var) else { continue };

            let from_cs_vars = pta.csman().vars_for(xfer.method, from_var);
            for from_id in from_cs_vars {
                let ctx = pta.csman().var_key(from_id).context.clone();
                let tainted: Vec<CSObjId> = pta.points_to(&Pointer::Var(from_id)).into_iter().filter(|o| labels.contains_key(o)).collect();
                for obj in tainted {
                    labels.insert(obj, xfer.ty.clone());
                    let to_ptr = pta.cs_var_ptr(xfer.method, to_var, &ctx);
                    if pta.inject(to_ptr, obj) {
                        changed = true;
                    }
                }
            }
        }
    }

    let mut flows = Vec::new();
    for sink in &sinks {
        let Some(sink_var) = sink.sink_var else { continue };
        for cs_var in pta.csman().vars_for(sink.method, sink_var) {
            for obj in pta.points_to(&Pointer::Var(cs_var)) {
                if labels.contains_key(&obj) {
                    let obj_alloc_site = pta.csman().obj_alloc_site(obj);
                    if let Some(&source_site) = obj_site_to_source.get(&obj_alloc_site) {
                        flows.push(TaintFlow { source_site, sink_site: sink.site, param_index: sink.param_index });
                    }
                }
            }
        }
    }

    flows.sort();
    flows.dedup();
    TaintResult { flows }
}
