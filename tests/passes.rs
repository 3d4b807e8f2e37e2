//! Whole-pipeline integration tests: class-hierarchy dispatch, the
//! interprocedural constant-propagation lift, and dead-code detection,
//! all driven through the public `engine::run` entry point rather than
//! each module's own unit tests.

use flowengine::cfg::{CfgBuilder, CfgEdgeKind};
use flowengine::config::Config;
use flowengine::ir::{
    BinOp, ClassHierarchy, InvokeExp, InvokeKind, MethodDef, MethodId, MethodRef, Operand, Program, Stmt, Subsignature, Type, Var,
};
use flowengine::{engine, output};

struct EmptyHierarchy;

impl ClassHierarchy for EmptyHierarchy {
    fn direct_subclasses_of(&self, _: &str) -> Vec<String> {
        vec![]
    }
    fn direct_subinterfaces_of(&self, _: &str) -> Vec<String> {
        vec![]
    }
    fn direct_implementors_of(&self, _: &str) -> Vec<String> {
        vec![]
    }
    fn declared_method(&self, _: &str, _: &Subsignature) -> Option<MethodId> {
        None
    }
    fn super_class(&self, _: &str) -> Option<String> {
        None
    }
    fn is_abstract(&self, _: MethodId) -> bool {
        false
    }
    fn is_interface(&self, _: &str) -> bool {
        false
    }
}

/// `Shape` is abstract, `Circle`/`Square` override `area`; `Main.main`
/// dispatches through an interface-typed variable at a single call
/// site. Mirrors the dispatch scenario exercised at the CHA-unit level,
/// but run through the full pipeline so the call graph in the final
/// report is what gets checked.
struct ShapeHierarchy;

fn area_subsig() -> Subsignature {
    Subsignature { name: "area".into(), param_types: vec![] }
}

impl ClassHierarchy for ShapeHierarchy {
    fn direct_subclasses_of(&self, class: &str) -> Vec<String> {
        match class {
            "Shape" => vec!["Circle".into(), "Square".into()],
            _ => vec![],
        }
    }
    fn direct_subinterfaces_of(&self, _: &str) -> Vec<String> {
        vec![]
    }
    fn direct_implementors_of(&self, _: &str) -> Vec<String> {
        vec![]
    }
    fn declared_method(&self, class: &str, subsig: &Subsignature) -> Option<MethodId> {
        if *subsig != area_subsig() {
            return None;
        }
        match class {
            "Circle" => Some(1),
            "Square" => Some(2),
            _ => None,
        }
    }
    fn super_class(&self, class: &str) -> Option<String> {
        match class {
            "Circle" | "Square" => Some("Shape".into()),
            _ => None,
        }
    }
    fn is_abstract(&self, _: MethodId) -> bool {
        false
    }
    fn is_interface(&self, _: &str) -> bool {
        false
    }
}

fn leaf_area(id: MethodId, class: &str) -> MethodDef {
    let mut b = CfgBuilder::new();
    let n = b.push(Stmt::Return { value: Some(0) });
    let cfg = b.finish(id, n, vec![n]);
    MethodDef {
        id,
        declaring_class: class.into(),
        subsig: area_subsig(),
        is_static: false,
        is_abstract: false,
        params: vec![],
        this_var: Some(0),
        vars: vec![Var { id: 0, name: "this".into(), ty: Type::Reference(class.into()) }],
        cfg,
    }
}

#[test]
fn virtual_dispatch_reaches_every_concrete_override() {
    let mut program = Program::new();

    let circle_area = leaf_area(1, "Circle");
    let square_area = leaf_area(2, "Square");

    let call = InvokeExp {
        kind: InvokeKind::Virtual,
        method_ref: MethodRef { declaring_class: "Shape".into(), subsig: area_subsig() },
        receiver: Some(0),
        args: vec![],
    };
    let mut mb = CfgBuilder::new();
    let n_new = mb.push(Stmt::New { lhs: 0, site: 0, ty: "Circle".into() });
    let n_call = mb.push(Stmt::Invoke { lhs: Some(1), call, site: 5 });
    let n_ret = mb.push(Stmt::Return { value: None });
    let mut main_cfg = mb.finish(0, n_new, vec![n_ret]);
    main_cfg.add_edge(n_new, CfgEdgeKind::FallThrough, n_call);
    main_cfg.add_edge(n_call, CfgEdgeKind::FallThrough, n_ret);
    let main_method = MethodDef {
        id: 0,
        declaring_class: "Main".into(),
        subsig: Subsignature { name: "main".into(), param_types: vec![] },
        is_static: true,
        is_abstract: false,
        params: vec![],
        this_var: None,
        vars: vec![Var { id: 0, name: "s".into(), ty: Type::Reference("Shape".into()) }, Var { id: 1, name: "a".into(), ty: Type::Int }],
        cfg: main_cfg,
    };

    program.add_method(main_method);
    program.add_method(circle_area);
    program.add_method(square_area);
    program.set_entry(0);

    let mut config = Config::default();
    config.entry_method = "Main.main()".into();
    config.enable_pointer_analysis = false;

    let report = engine::run(&program, &ShapeHierarchy, &config).unwrap();
    let view = output::build_report(&program, &report);

    assert!(view.methods.contains_key("Circle.area()"));
    assert!(view.methods.contains_key("Square.area()"));
    assert!(view.call_graph.iter().any(|e| e.callee == "Circle.area()" && e.kind == "virtual"));
    assert!(view.call_graph.iter().any(|e| e.callee == "Square.area()" && e.kind == "virtual"));
}

/// `a = 5; if (a < 10) { x = 1; } else { x = 2; } y = x; return y;`
/// straight-line, no calls involved, so the intraprocedural constant
/// folder can resolve the guard and the else branch is reported dead.
#[test]
fn dead_branch_is_reported_for_the_entry_method() {
    let mut program = Program::new();

    let mut b = CfgBuilder::new();
    let n_a = b.push(Stmt::IntConst { lhs: 0, value: 5 });
    let n_if = b.push(Stmt::If { cond_op: BinOp::Lt, left: Operand::Var(0), right: Operand::Const(10) });
    let n_then = b.push(Stmt::IntConst { lhs: 1, value: 1 });
    let n_else = b.push(Stmt::IntConst { lhs: 1, value: 2 });
    let n_ret = b.push(Stmt::Return { value: Some(1) });
    let mut cfg = b.finish(0, n_a, vec![n_ret]);
    cfg.add_edge(n_a, CfgEdgeKind::FallThrough, n_if);
    cfg.add_edge(n_if, CfgEdgeKind::IfTrue, n_then);
    cfg.add_edge(n_if, CfgEdgeKind::IfFalse, n_else);
    cfg.add_edge(n_then, CfgEdgeKind::FallThrough, n_ret);
    cfg.add_edge(n_else, CfgEdgeKind::FallThrough, n_ret);

    program.add_method(MethodDef {
        id: 0,
        declaring_class: "Main".into(),
        subsig: Subsignature { name: "main".into(), param_types: vec![] },
        is_static: true,
        is_abstract: false,
        params: vec![],
        this_var: None,
        vars: vec![Var { id: 0, name: "a".into(), ty: Type::Int }, Var { id: 1, name: "x".into(), ty: Type::Int }],
        cfg,
    });
    program.set_entry(0);

    let mut config = Config::default();
    config.entry_method = "Main.main()".into();

    let report = engine::run(&program, &EmptyHierarchy, &config).unwrap();
    let view = output::build_report(&program, &report);

    let main_view = &view.methods["Main.main()"];
    assert!(main_view.dead_statements.contains(&n_else));
    assert!(!main_view.dead_statements.contains(&n_then));
}
