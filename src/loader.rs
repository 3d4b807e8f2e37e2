//! A reference JSON adapter for the IR contract and class-hierarchy
//! oracle (spec §6 "External interfaces"). The analyses in this crate
//! only ever consume [`Program`] and `dyn `[`ClassHierarchy`] — how
//! those are produced is explicitly out of scope ("the front-end that
//! produces IR; the class hierarchy oracle ... we specify only the
//! contracts these collaborators must satisfy; we do not specify their
//! construction"). This module is one concrete, minimal instantiation of
//! both contracts, so the `flowengine` binary has something real to run
//! against; it is not itself part of the specified core.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::cfg::{Cfg, CfgBuilder, CfgEdgeKind, NodeIndex};
use crate::error::ConfigError;
use crate::ir::{
    CallSiteId, ClassHierarchy, ClassName, FieldRef, InvokeExp, MethodDef, MethodId, MethodRef,
    NewSiteId, Operand, Program, Stmt, Subsignature, Var, VarId,
};

#[derive(Debug, Deserialize)]
enum InvokeKindDto {
    Static,
    Special,
    Virtual,
    Interface,
    Dynamic,
}

impl From<InvokeKindDto> for crate::ir::InvokeKind {
    fn from(d: InvokeKindDto) -> Self {
        use crate::ir::InvokeKind as K;
        match d {
            InvokeKindDto::Static => K::Static,
            InvokeKindDto::Special => K::Special,
            InvokeKindDto::Virtual => K::Virtual,
            InvokeKindDto::Interface => K::Interface,
            InvokeKindDto::Dynamic => K::Dynamic,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InvokeExpDto {
    kind: InvokeKindDto,
    declaring_class: ClassName,
    name: String,
    #[serde(default)]
    param_types: Vec<String>,
    #[serde(default)]
    receiver: Option<VarId>,
    #[serde(default)]
    args: Vec<VarId>,
}

impl From<InvokeExpDto> for InvokeExp {
    fn from(d: InvokeExpDto) -> Self {
        InvokeExp {
            kind: d.kind.into(),
            method_ref: MethodRef {
                declaring_class: d.declaring_class,
                subsig: Subsignature { name: d.name, param_types: d.param_types },
            },
            receiver: d.receiver,
            args: d.args,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op")]
enum StmtDto {
    New { lhs: VarId, site: NewSiteId, ty: ClassName },
    Copy { lhs: VarId, rhs: VarId },
    IntConst { lhs: VarId, value: i32 },
    Binary { lhs: VarId, op: crate::ir::BinOp, left: Operand, right: Operand },
    Cast { lhs: VarId, rhs: VarId, ty: ClassName },
    LoadField { lhs: VarId, field: FieldRef, #[serde(default)] base: Option<VarId> },
    StoreField { field: FieldRef, #[serde(default)] base: Option<VarId>, rhs: VarId },
    LoadArray { lhs: VarId, base: VarId, index: VarId },
    StoreArray { base: VarId, index: VarId, rhs: VarId },
    Invoke { #[serde(default)] lhs: Option<VarId>, call: InvokeExpDto, site: CallSiteId },
    If { cond_op: crate::ir::BinOp, left: Operand, right: Operand },
    Switch { var: VarId },
    Return { #[serde(default)] value: Option<VarId> },
    Nop,
}

impl From<StmtDto> for Stmt {
    fn from(d: StmtDto) -> Self {
        match d {
            StmtDto::New { lhs, site, ty } => Stmt::New { lhs, site, ty },
            StmtDto::Copy { lhs, rhs } => Stmt::Copy { lhs, rhs },
            StmtDto::IntConst { lhs, value } => Stmt::IntConst { lhs, value },
            StmtDto::Binary { lhs, op, left, right } => Stmt::Binary { lhs, op, left, right },
            StmtDto::Cast { lhs, rhs, ty } => Stmt::Cast { lhs, rhs, ty },
            StmtDto::LoadField { lhs, field, base } => Stmt::LoadField { lhs, field, base },
            StmtDto::StoreField { field, base, rhs } => Stmt::StoreField { field, base, rhs },
            StmtDto::LoadArray { lhs, base, index } => Stmt::LoadArray { lhs, base, index },
            StmtDto::StoreArray { base, index, rhs } => Stmt::StoreArray { base, index, rhs },
            StmtDto::Invoke { lhs, call, site } => Stmt::Invoke { lhs, call: call.into(), site },
            StmtDto::If { cond_op, left, right } => Stmt::If { cond_op, left, right },
            StmtDto::Switch { var } => Stmt::Switch { var },
            StmtDto::Return { value } => Stmt::Return { value },
            StmtDto::Nop => Stmt::Nop,
        }
    }
}

#[derive(Debug, Deserialize)]
enum CfgEdgeKindDto {
    FallThrough,
    IfTrue,
    IfFalse,
    SwitchCase(i32),
    SwitchDefault,
    Exceptional,
}

impl From<CfgEdgeKindDto> for CfgEdgeKind {
    fn from(d: CfgEdgeKindDto) -> Self {
        match d {
            CfgEdgeKindDto::FallThrough => CfgEdgeKind::FallThrough,
            CfgEdgeKindDto::IfTrue => CfgEdgeKind::IfTrue,
            CfgEdgeKindDto::IfFalse => CfgEdgeKind::IfFalse,
            CfgEdgeKindDto::SwitchCase(v) => CfgEdgeKind::SwitchCase(v),
            CfgEdgeKindDto::SwitchDefault => CfgEdgeKind::SwitchDefault,
            CfgEdgeKindDto::Exceptional => CfgEdgeKind::Exceptional,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CfgDto {
    stmts: Vec<StmtDto>,
    entry: NodeIndex,
    exits: Vec<NodeIndex>,
    #[serde(default)]
    edges: Vec<(NodeIndex, CfgEdgeKindDto, NodeIndex)>,
}

impl CfgDto {
    fn build(self, method: MethodId) -> Cfg {
        let mut builder = CfgBuilder::new();
        for stmt in self.stmts {
            builder.push(stmt.into());
        }
        let mut cfg = builder.finish(method, self.entry, self.exits);
        for (from, kind, to) in self.edges {
            cfg.add_edge(from, kind.into(), to);
        }
        cfg
    }
}

#[derive(Debug, Deserialize)]
struct MethodDefDto {
    declaring_class: ClassName,
    name: String,
    #[serde(default)]
    param_types: Vec<String>,
    #[serde(default)]
    is_static: bool,
    #[serde(default)]
    is_abstract: bool,
    #[serde(default)]
    params: Vec<VarId>,
    #[serde(default)]
    this_var: Option<VarId>,
    #[serde(default)]
    vars: Vec<Var>,
    cfg: CfgDto,
}

#[derive(Debug, Deserialize)]
struct ClassDto {
    name: ClassName,
    #[serde(default)]
    super_class: Option<ClassName>,
    #[serde(default)]
    is_interface: bool,
    /// Directly extended interfaces (if `self` is an interface) or
    /// directly implemented interfaces (if `self` is a class).
    #[serde(default)]
    interfaces: Vec<ClassName>,
}

/// The on-disk shape this loader reads: a program's methods plus the
/// class-hierarchy facts needed to resolve virtual/interface dispatch
/// (spec §6 "Class hierarchy oracle").
#[derive(Debug, Deserialize)]
struct ProgramFileDto {
    #[serde(default)]
    classes: Vec<ClassDto>,
    methods: Vec<MethodDefDto>,
}

/// A class hierarchy built once from a loaded [`ProgramFileDto`], plus
/// the abstractness of every loaded method (needed by
/// [`ClassHierarchy::is_abstract`], which the core dispatch algorithm
/// keys on method id rather than class+subsig).
pub struct JsonHierarchy {
    classes: HashMap<ClassName, ClassDto>,
    subclasses: HashMap<ClassName, Vec<ClassName>>,
    subinterfaces: HashMap<ClassName, Vec<ClassName>>,
    implementors: HashMap<ClassName, Vec<ClassName>>,
    declared: HashMap<(ClassName, Subsignature), MethodId>,
    abstract_methods: std::collections::HashSet<MethodId>,
}

impl ClassHierarchy for JsonHierarchy {
    fn direct_subclasses_of(&self, class: &str) -> Vec<ClassName> {
        self.subclasses.get(class).cloned().unwrap_or_default()
    }

    fn direct_subinterfaces_of(&self, iface: &str) -> Vec<ClassName> {
        self.subinterfaces.get(iface).cloned().unwrap_or_default()
    }

    fn direct_implementors_of(&self, iface: &str) -> Vec<ClassName> {
        self.implementors.get(iface).cloned().unwrap_or_default()
    }

    fn declared_method(&self, class: &str, subsig: &Subsignature) -> Option<MethodId> {
        self.declared.get(&(class.to_string(), subsig.clone())).copied()
    }

    fn super_class(&self, class: &str) -> Option<ClassName> {
        self.classes.get(class).and_then(|c| c.super_class.clone())
    }

    fn is_abstract(&self, method: MethodId) -> bool {
        self.abstract_methods.contains(&method)
    }

    fn is_interface(&self, class: &str) -> bool {
        self.classes.get(class).map(|c| c.is_interface).unwrap_or(false)
    }
}

/// Parses `path` as a combined program + class-hierarchy JSON document
/// and builds both a [`Program`] and a [`JsonHierarchy`] from it.
pub fn load_program_file(path: &Path) -> Result<(Program, JsonHierarchy), ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    load_program_str(&content)
}

pub fn load_program_str(content: &str) -> Result<(Program, JsonHierarchy), ConfigError> {
    let dto: ProgramFileDto = serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let mut program = Program::new();
    let mut declared = HashMap::new();
    let mut abstract_methods = std::collections::HashSet::new();

    for (id, m) in dto.methods.into_iter().enumerate() {
        let id = id as MethodId;
        let subsig = Subsignature { name: m.name, param_types: m.param_types };
        if m.is_abstract {
            abstract_methods.insert(id);
        }
        declared.insert((m.declaring_class.clone(), subsig.clone()), id);
        let method = MethodDef {
            id,
            declaring_class: m.declaring_class,
            subsig,
            is_static: m.is_static,
            is_abstract: m.is_abstract,
            params: m.params,
            this_var: m.this_var,
            vars: m.vars,
            cfg: m.cfg.build(id),
        };
        program.add_method(method);
    }

    let mut classes = HashMap::new();
    let mut subclasses: HashMap<ClassName, Vec<ClassName>> = HashMap::new();
    let mut subinterfaces: HashMap<ClassName, Vec<ClassName>> = HashMap::new();
    let mut implementors: HashMap<ClassName, Vec<ClassName>> = HashMap::new();

    for class in dto.classes {
        if let Some(sup) = &class.super_class {
            subclasses.entry(sup.clone()).or_default().push(class.name.clone());
        }
        for iface in &class.interfaces {
            if class.is_interface {
                subinterfaces.entry(iface.clone()).or_default().push(class.name.clone());
            } else {
                implementors.entry(iface.clone()).or_default().push(class.name.clone());
            }
        }
        classes.insert(class.name.clone(), class);
    }

    let hierarchy = JsonHierarchy { classes, subclasses, subinterfaces, implementors, declared, abstract_methods };
    Ok((program, hierarchy))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
      "classes": [
        {"name": "I", "is_interface": true},
        {"name": "A", "super_class": null, "interfaces": ["I"], "is_interface": false},
        {"name": "B", "super_class": "A", "interfaces": [], "is_interface": false}
      ],
      "methods": [
        {
          "declaring_class": "Main",
          "name": "main",
          "params": [],
          "is_static": true,
          "vars": [{"id": 0, "name": "a", "ty": "Int"}],
          "cfg": {
            "stmts": [
              {"op": "IntConst", "lhs": 0, "value": 10},
              {"op": "Return", "value": 0}
            ],
            "entry": 0,
            "exits": [1],
            "edges": [[0, "FallThrough", 1]]
          }
        }
      ]
    }
    "#;

    #[test]
    fn loads_a_program_and_resolves_it_by_signature() {
        let (program, hierarchy) = load_program_str(SAMPLE).unwrap();
        assert_eq!(program.methods.len(), 1);
        let id = program.resolve("Main", &Subsignature { name: "main".into(), param_types: vec![] }).unwrap();
        assert_eq!(program.method(id).cfg.node_count(), 2);
        assert_eq!(hierarchy.direct_implementors_of("I"), vec!["A".to_string()]);
        assert_eq!(hierarchy.direct_subclasses_of("A"), vec!["B".to_string()]);
        assert!(hierarchy.is_interface("I"));
        assert!(!hierarchy.is_interface("A"));
    }
}
