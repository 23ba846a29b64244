use std::io::Write;
use std::sync::Arc;

use litfn_sema::{
    AnalysisConfig, InstanceTable, LiteralRef, RegisterPolicy, Session, SessionError, UnitId,
};

const EXTERNAL: &str = "extern int shared;\n\
                        int twice(int v) { return (int (int x)){ return x + shared; }(v); }";

const INTERNAL: &str = "static int hidden;\n\
                        int twice(int v) { return (int (int x)){ return x + hidden; }(v); }";

fn sources(count: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|index| {
            let source = if index % 2 == 0 { EXTERNAL } else { INTERNAL };
            (format!("unit{index}.c"), source.to_string())
        })
        .collect()
}

fn folds(session: &Session, sources: &[(String, String)]) -> Vec<Option<LiteralRef>> {
    session
        .check_sources(sources)
        .iter()
        .flat_map(|report| report.literals.iter().map(|literal| literal.folded_into))
        .collect()
}

#[test]
fn external_names_fold_across_units() {
    let session = Session::default();
    let first = session.check_source("a.c", EXTERNAL);
    let second = session.check_source("b.c", EXTERNAL);
    assert_eq!(first.unit, UnitId(0));
    assert_eq!(second.unit, UnitId(1));
    assert!(first.literals[0].folded_into.is_none());
    assert_eq!(
        second.literals[0].folded_into,
        Some(LiteralRef {
            unit: first.unit,
            literal: first.literals[0].id,
        })
    );
    assert_eq!(session.table().len(), 1);
}

#[test]
fn internal_names_never_fold_across_units() {
    let session = Session::default();
    let first = session.check_source("a.c", INTERNAL);
    let second = session.check_source("b.c", INTERNAL);
    assert!(first.literals[0].folded_into.is_none());
    assert!(second.literals[0].folded_into.is_none());
    assert_eq!(session.table().len(), 2);
}

#[test]
fn sessions_can_share_an_instance_table() {
    let table = Arc::new(InstanceTable::new());
    let left = Session::with_table(AnalysisConfig::default(), Arc::clone(&table));
    let right = Session::with_table(AnalysisConfig::default(), Arc::clone(&table));
    let first = left.check_source("a.c", EXTERNAL);
    let second = right.check_source("b.c", EXTERNAL);
    assert_ne!(first.unit, second.unit);
    assert!(second.literals[0].folded_into.is_some());
}

#[test]
fn parallel_checking_matches_sequential_order() {
    let inputs = sources(16);

    let sequential = Session::default();
    let expected: Vec<Option<LiteralRef>> = inputs
        .iter()
        .flat_map(|(path, source)| {
            sequential
                .check_source(path, source)
                .literals
                .into_iter()
                .map(|literal| literal.folded_into)
        })
        .collect();

    for _ in 0..4 {
        assert_eq!(folds(&Session::default(), &inputs), expected);
    }

    let reports = Session::default().check_sources(&inputs);
    let paths: Vec<&str> = reports.iter().map(|report| report.path.as_str()).collect();
    let expected_paths: Vec<&str> = inputs.iter().map(|(path, _)| path.as_str()).collect();
    assert_eq!(paths, expected_paths);
    let units: Vec<u32> = reports.iter().map(|report| report.unit.0).collect();
    assert_eq!(units, (0..16).collect::<Vec<_>>());
}

#[test]
fn parallel_checking_keeps_per_unit_diagnostics() {
    let inputs = vec![
        ("ok.c".to_string(), EXTERNAL.to_string()),
        (
            "bad.c".to_string(),
            "void f(void) { int i; (void (void)){ i = 1; }(); }".to_string(),
        ),
    ];
    let reports = Session::default().check_sources(&inputs);
    assert!(!reports[0].has_errors());
    assert!(reports[1].has_errors());
    assert!(reports[1]
        .diagnostics
        .iter()
        .all(|diag| diag.path == "bad.c"));
}

#[test]
fn check_file_reads_from_disk_and_reports_missing_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("unit.c");
    std::fs::write(&path, EXTERNAL).expect("write source");

    let session = Session::default();
    let report = session.check_file(&path).expect("check file");
    assert_eq!(report.path, path.display().to_string());
    assert_eq!(report.literals.len(), 1);

    let missing = dir.path().join("missing.c");
    let err = session.check_file(&missing).expect_err("missing file");
    assert!(matches!(err, SessionError::Io { .. }));
    assert!(err.to_string().contains("missing.c"));
}

#[test]
fn sessions_load_their_configuration() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "register_constant_policy = \"deny\"").expect("write config");
    let session = Session::from_config_file(file.path()).expect("session");
    assert_eq!(
        session.config().register_constant_policy,
        RegisterPolicy::Deny
    );

    let mut broken = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(broken, "register_constant_policy = 3").expect("write config");
    let err = Session::from_config_file(broken.path()).expect_err("bad config");
    assert!(matches!(err, SessionError::Config(_)));
}

#[test]
fn reports_serialize_to_json() {
    let report = Session::default().check_source(
        "t.c",
        "void f(void) { int i = 0; (void (void)){ i = 1; }(); }",
    );
    let json = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(json["path"], "t.c");
    assert_eq!(json["diagnostics"][0]["diagnostic"]["code"], "E4001");
    assert_eq!(json["references"][0]["usage"], "write");
    assert_eq!(json["literals"][0]["func_name"], "f.literal.1");
    assert_eq!(json["literals"][0]["valid"], false);
}

#[test]
fn deeply_nested_literals_are_cut_off_on_worker_threads() {
    let depth = 100;
    let deep = format!(
        "void f(void) {{ {} {} }}",
        "(void (void)){ ".repeat(depth),
        "}();".repeat(depth)
    );
    let inputs = vec![
        ("deep.c".to_string(), deep),
        ("ok.c".to_string(), EXTERNAL.to_string()),
    ];
    let reports = Session::default().check_sources(&inputs);
    let messages: Vec<&str> = reports[0]
        .diagnostics
        .iter()
        .map(|diag| diag.diagnostic.message.as_str())
        .collect();
    assert_eq!(messages, ["nesting is too deep"]);
    assert!(!reports[1].has_errors());
}
