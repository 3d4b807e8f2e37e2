//! Taint-tracking overlay, exercised end to end through `engine::run`
//! with a `Config` pointing at an on-disk taint-rule file, the same way
//! the CLI binary wires the two together.

use std::io::Write;

use flowengine::cfg::{CfgBuilder, CfgEdgeKind};
use flowengine::config::Config;
use flowengine::ir::{
    ClassHierarchy, InvokeExp, InvokeKind, MethodDef, MethodId, MethodRef, Program, Stmt, Subsignature, Type, Var,
};
use flowengine::engine;

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

fn string_var(id: u32, name: &str) -> Var {
    Var { id, name: name.into(), ty: Type::Reference("String".into()) }
}

/// `req = HttpRequest.getParameter(); Db.execute(req);` — a source
/// flowing straight into a sink with no intervening transfer.
fn tainted_program() -> Program {
    let mut program = Program::new();

    let mut gb = CfgBuilder::new();
    let n_ret = gb.push(Stmt::Return { value: None });
    let get_param_cfg = gb.finish(0, n_ret, vec![n_ret]);
    program.add_method(MethodDef {
        id: 0,
        declaring_class: "HttpRequest".into(),
        subsig: Subsignature { name: "getParameter".into(), param_types: vec![] },
        is_static: true,
        is_abstract: false,
        params: vec![],
        this_var: None,
        vars: vec![],
        cfg: get_param_cfg,
    });

    let mut eb = CfgBuilder::new();
    let n_ret2 = eb.push(Stmt::Return { value: None });
    let execute_cfg = eb.finish(0, n_ret2, vec![n_ret2]);
    program.add_method(MethodDef {
        id: 1,
        declaring_class: "Db".into(),
        subsig: Subsignature { name: "execute".into(), param_types: vec!["String".into()] },
        is_static: true,
        is_abstract: false,
        params: vec![0],
        this_var: None,
        vars: vec![string_var(0, "query")],
        cfg: execute_cfg,
    });

    let get_call = InvokeExp {
        kind: InvokeKind::Static,
        method_ref: MethodRef { declaring_class: "HttpRequest".into(), subsig: Subsignature { name: "getParameter".into(), param_types: vec![] } },
        receiver: None,
        args: vec![],
    };
    let exec_call = InvokeExp {
        kind: InvokeKind::Static,
        method_ref: MethodRef { declaring_class: "Db".into(), subsig: Subsignature { name: "execute".into(), param_types: vec!["String".into()] } },
        receiver: None,
        args: vec![0],
    };

    let mut mb = CfgBuilder::new();
    let n_get = mb.push(Stmt::Invoke { lhs: Some(0), call: get_call, site: 1 });
    let n_exec = mb.push(Stmt::Invoke { lhs: None, call: exec_call, site: 2 });
    let n_exit = mb.push(Stmt::Return { value: None });
    let mut main_cfg = mb.finish(0, n_get, vec![n_exit]);
    main_cfg.add_edge(n_get, CfgEdgeKind::FallThrough, n_exec);
    main_cfg.add_edge(n_exec, CfgEdgeKind::FallThrough, n_exit);
    program.add_method(MethodDef {
        id: 2,
        declaring_class: "Main".into(),
        subsig: Subsignature { name: "main".into(), param_types: vec![] },
        is_static: true,
        is_abstract: false,
        params: vec![],
        this_var: None,
        vars: vec![string_var(0, "req")],
        cfg: main_cfg,
    });
    program.set_entry(2);

    program
}

#[test]
fn taint_config_on_disk_drives_a_flow_from_source_to_sink() {
    let mut rules_file = tempfile::NamedTempFile::new().unwrap();
    write!(
        rules_file,
        r#"{{
            "sources": [{{"method_signature": "HttpRequest.getParameter()", "return_type": "String"}}],
            "sinks": [{{"method_signature": "Db.execute(String)", "param_index": 0}}],
            "transfers": []
        }}"#
    )
    .unwrap();

    let program = tainted_program();
    let mut config = Config::default();
    config.entry_method = "Main.main()".into();
    config.enable_taint_tracking = true;
    config.taint_rules_file = Some(rules_file.path().to_path_buf());

    let report = engine::run(&program, &EmptyHierarchy, &config).unwrap();
    let taint = report.taint.expect("taint overlay should have run");
    assert_eq!(taint.flows.len(), 1);
    assert_eq!(taint.flows[0].source_site, 1);
    assert_eq!(taint.flows[0].sink_site, 2);
}

#[test]
fn enabling_taint_without_a_rules_file_fails_config_validation() {
    let mut config = Config::default();
    config.entry_method = "Main.main()".into();
    config.enable_taint_tracking = true;
    assert!(config.validate().is_err());
}
