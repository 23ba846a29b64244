use std::sync::Arc;

use litfn_base::{Diagnostic, DiagnosticKind, DiagnosticSeverity};
use litfn_sema::{
    AnalysisConfig, Analyzer, InstanceTable, RegisterPolicy, Session, UnitReport, Usage,
};
use litfn_sema::scope::{new_declaration, FrameKind};
use litfn_sema::{DeclKind, ScopeKind, Storage};
use litfn_syntax::ast::{Expr, ExternalDecl, LiteralFunctionExpr, Stmt};
use litfn_syntax::parse_unit;
use litfn_syntax::types::{BasicType, CType, QualType};

fn check(source: &str) -> UnitReport {
    Session::default().check_source("test.c", source)
}

fn check_with(config: AnalysisConfig, source: &str) -> UnitReport {
    Session::new(config).check_source("test.c", source)
}

fn diagnostics(report: &UnitReport) -> Vec<&Diagnostic> {
    report.diagnostics.iter().map(|diag| &diag.diagnostic).collect()
}

fn kinds(report: &UnitReport) -> Vec<DiagnosticKind> {
    diagnostics(report).iter().map(|diag| diag.kind).collect()
}

fn subjects(report: &UnitReport, kind: DiagnosticKind) -> Vec<String> {
    diagnostics(report)
        .into_iter()
        .filter(|diag| diag.kind == kind)
        .filter_map(|diag| diag.subject.clone())
        .collect()
}

fn assert_clean(report: &UnitReport) {
    assert!(
        report.diagnostics.is_empty(),
        "unexpected diagnostics: {:#?}",
        report.diagnostics
    );
}

#[test]
fn sizeof_of_enclosing_automatic_is_allowed() {
    let report = check(
        "void f(void) {\n\
             int i = 0;\n\
             (void (void)){ int j = sizeof(i); }();\n\
         }",
    );
    assert_clean(&report);
    assert_eq!(report.literals.len(), 1);
    assert!(report.literals[0].valid);
}

#[test]
fn writing_enclosing_automatic_is_an_illegal_capture() {
    let report = check(
        "void f(void) {\n\
             int i = 0;\n\
             (void (void)){ i = 1; }();\n\
         }",
    );
    assert_eq!(kinds(&report), [DiagnosticKind::IllegalCapture]);
    assert_eq!(subjects(&report, DiagnosticKind::IllegalCapture), ["i"]);
    assert!(!report.literals[0].valid);
    assert_eq!(report.diagnostics[0].diagnostic.span.start.line, 3);
}

#[test]
fn file_scope_objects_are_not_captures() {
    let report = check("int g;\nvoid f(void) { (void (void)){ g = 1; }(); }");
    assert_clean(&report);
}

#[test]
fn static_locals_of_the_literal_are_its_own() {
    let report = check(
        "void f(void) {\n\
             int i = 0;\n\
             (void (void)){ static int i = 0; i = 1; }();\n\
         }",
    );
    assert_clean(&report);
}

#[test]
fn return_type_tags_outlive_the_literal_and_parameter_tags_do_not() {
    let report = check(
        "void f(void) {\n\
             (struct X { int i; } (struct Y *y)){ struct X x = {}; return x; }(nullptr);\n\
             struct X x;\n\
             struct Y y;\n\
         }",
    );
    assert_eq!(kinds(&report), [DiagnosticKind::UndeclaredIdentifier]);
    assert_eq!(subjects(&report, DiagnosticKind::UndeclaredIdentifier), ["Y"]);
    assert_eq!(report.diagnostics[0].diagnostic.span.start.line, 4);
}

#[test]
fn variably_modified_types_cannot_be_referenced() {
    let report = check(
        "int f(int n) {\n\
             int ar[n];\n\
             (void ()){ typeof(ar) b; }();\n\
             return 0;\n\
         }",
    );
    assert_eq!(kinds(&report), [DiagnosticKind::IllegalCapture]);
    assert_eq!(subjects(&report, DiagnosticKind::IllegalCapture), ["ar"]);
}

#[test]
fn return_type_tags_are_not_visible_before_the_literal() {
    let report = check(
        "void f(void) {\n\
             struct Z early;\n\
             (struct Z { int a; } (void)){ struct Z z = {}; return z; }();\n\
             struct Z late;\n\
         }",
    );
    assert_eq!(kinds(&report), [DiagnosticKind::UndeclaredIdentifier]);
    assert_eq!(report.diagnostics[0].diagnostic.span.start.line, 2);
}

#[test]
fn constants_may_be_read_but_not_modified() {
    let report = check(
        "void f(void) {\n\
             constexpr int c = 3;\n\
             enum { K = 2 };\n\
             (int (void)){ return c + K; }();\n\
         }",
    );
    assert_clean(&report);

    let report = check(
        "void f(void) {\n\
             constexpr int c = 3;\n\
             (void (void)){ c = 1; }();\n\
             (void (void)){ const int *p = &c; }();\n\
         }",
    );
    assert_eq!(
        kinds(&report),
        [DiagnosticKind::IllegalCapture, DiagnosticKind::IllegalCapture]
    );
}

#[test]
fn const_automatic_objects_are_still_captures() {
    let report = check(
        "int seed(void);\n\
         void f(void) {\n\
             const int k = seed();\n\
             (int (void)){ return k; }();\n\
         }",
    );
    assert_eq!(subjects(&report, DiagnosticKind::IllegalCapture), ["k"]);
}

#[test]
fn function_designators_are_always_allowed() {
    let report = check(
        "int g(int);\n\
         static int h(void) { return 1; }\n\
         void f(void) {\n\
             int (*fp)(void) = h;\n\
             (int (void)){ return g(1) + h(); }();\n\
         }",
    );
    assert_clean(&report);

    let report = check(
        "void f(void) {\n\
             int (*fp)(void) = 0;\n\
             (int (void)){ return fp(); }();\n\
         }",
    );
    assert_eq!(subjects(&report, DiagnosticKind::IllegalCapture), ["fp"]);
}

#[test]
fn nested_literals_capture_from_the_outer_literal() {
    let report = check(
        "void f(void) {\n\
             (void (void)){\n\
                 int k = 1;\n\
                 (void (void)){ k = 2; }();\n\
                 k = 3;\n\
             }();\n\
         }",
    );
    assert_eq!(subjects(&report, DiagnosticKind::IllegalCapture), ["k"]);
    assert_eq!(report.literals.len(), 2);
    assert!(!report.literals[0].valid, "outer contains an invalid literal");
    assert!(!report.literals[1].valid);
    assert_eq!(report.literals[1].func_name, "f.literal.1.literal.2");
}

#[test]
fn labels_of_the_enclosing_function_are_invisible() {
    let report = check(
        "void f(void) {\n\
             out: ;\n\
             (void (void)){ goto out; }();\n\
             (void (void)){ again: goto again; }();\n\
         }",
    );
    assert_eq!(kinds(&report), [DiagnosticKind::UndefinedLabel]);
    let diag = &report.diagnostics[0].diagnostic;
    assert_eq!(diag.subject.as_deref(), Some("out"));
    assert_eq!(diag.labels.len(), 1);
    assert_eq!(diag.labels[0].span.start.line, 2);
}

#[test]
fn labels_inside_the_literal_are_invisible_to_the_function() {
    let report = check(
        "void f(void) {\n\
             (void (void)){ inner: ; }();\n\
             goto inner;\n\
             goto nowhere;\n\
         }",
    );
    assert_eq!(
        subjects(&report, DiagnosticKind::UndefinedLabel),
        ["inner", "nowhere"]
    );
    assert!(diagnostics(&report).iter().all(|diag| diag.labels.is_empty()));
}

#[test]
fn register_constants_follow_the_configured_policy() {
    let source = "void f(void) {\n\
                      register const int r = 4;\n\
                      (int (void)){ return r; }();\n\
                  }";

    let warned = check(source);
    assert_eq!(kinds(&warned), [DiagnosticKind::RegisterConstantCapture]);
    assert_eq!(
        warned.diagnostics[0].diagnostic.severity,
        DiagnosticSeverity::Warning
    );
    assert!(!warned.has_errors());
    assert!(warned.literals[0].valid);
    assert!(warned.literals[0].instance_key.is_none());

    let allowed = check_with(
        AnalysisConfig {
            register_constant_policy: RegisterPolicy::Allow,
            ..AnalysisConfig::default()
        },
        source,
    );
    assert_clean(&allowed);

    let denied = check_with(
        AnalysisConfig {
            register_constant_policy: RegisterPolicy::Deny,
            ..AnalysisConfig::default()
        },
        source,
    );
    assert_eq!(kinds(&denied), [DiagnosticKind::IllegalCapture]);
}

#[test]
fn register_constants_are_never_writable() {
    let report = check_with(
        AnalysisConfig {
            register_constant_policy: RegisterPolicy::Allow,
            ..AnalysisConfig::default()
        },
        "void f(void) {\n\
             register const int r = 4;\n\
             (void (void)){ r = 5; }();\n\
         }",
    );
    assert_eq!(kinds(&report), [DiagnosticKind::IllegalCapture]);
}

#[test]
fn variably_modified_typedefs_are_rejected() {
    let report = check(
        "void f(int n) {\n\
             typedef int row[n];\n\
             (void (void)){ row r; }();\n\
             (void (void)){ int k = sizeof(row); }();\n\
         }",
    );
    assert_eq!(subjects(&report, DiagnosticKind::IllegalCapture), ["row", "row"]);
}

#[test]
fn parameters_with_runtime_bounds_capture() {
    let report = check(
        "void f(int n) {\n\
             (void (int a[n])){ }(0);\n\
             (void (int m, int b[m])){ }(1, 0);\n\
         }",
    );
    assert_eq!(subjects(&report, DiagnosticKind::IllegalCapture), ["n"]);
}

#[test]
fn typedef_and_typeof_signatures_bind_parameters() {
    let report = check(
        "typedef int F(int x);\n\
         int h(int);\n\
         int g(void) {\n\
             int a = (F){ return x * 2; }(3);\n\
             return (typeof(h)){ return 1; }(a);\n\
         }",
    );
    assert_clean(&report);
    assert_eq!(report.literals.len(), 2);
    assert_eq!(report.literals[0].signature.params.len(), 1);
}

#[test]
fn func_name_is_distinct_per_literal() {
    let report = check(
        "void outer(void) {\n\
             const char *a = (const char *(void)){ return __func__; }();\n\
             const char *b = (const char *(void)){ return __func__; }();\n\
         }\n\
         int (*fp)(void) = (int (void)){ return 7; };",
    );
    assert_clean(&report);
    let names: Vec<&str> = report
        .literals
        .iter()
        .map(|literal| literal.func_name.as_str())
        .collect();
    assert_eq!(names, ["outer.literal.1", "outer.literal.2", ".literal.3"]);
    assert!(report.literals[0].uses_func_name);
    assert!(report.literals[0].instance_key.is_none());
    assert!(report.literals[1].folded_into.is_none());
}

#[test]
fn func_name_outside_functions_is_undeclared() {
    let report = check("const char *name = __func__;");
    assert_eq!(subjects(&report, DiagnosticKind::UndeclaredIdentifier), ["__func__"]);
}

#[test]
fn undeclared_identifiers_get_suggestions() {
    let report = check(
        "void f(void) {\n\
             int count = 0;\n\
             (int (void)){ return sizeof(coutn); }();\n\
         }",
    );
    let diag = &report.diagnostics[0].diagnostic;
    assert_eq!(diag.kind, DiagnosticKind::UndeclaredIdentifier);
    assert_eq!(diag.subject.as_deref(), Some("coutn"));
    assert_eq!(diag.labels[0].message, "did you mean `count`?");

    let quiet = check_with(
        AnalysisConfig {
            suggestions: false,
            ..AnalysisConfig::default()
        },
        "void f(void) { int count = 0; (int (void)){ return sizeof(coutn); }(); }",
    );
    assert!(quiet.diagnostics[0].diagnostic.labels.is_empty());
}

#[test]
fn usages_are_classified_by_context() {
    let report = check(
        "void f(void) {\n\
             int a[3] = { 1, 2, 3 };\n\
             struct S { int m; } s;\n\
             (void (void)){\n\
                 int r = a[0];\n\
                 int *p = a;\n\
                 a[1] = 2;\n\
                 s.m = 1;\n\
                 int q = s.m;\n\
                 int n = sizeof a;\n\
                 int *pp = &s.m;\n\
                 s.m++;\n\
             }();\n\
         }",
    );
    let usages = |name: &str| -> Vec<Usage> {
        report
            .references
            .iter()
            .filter(|reference| reference.name == name)
            .map(|reference| reference.usage)
            .collect()
    };
    assert_eq!(
        usages("a"),
        [
            Usage::Read,
            Usage::AddressOf,
            Usage::Write,
            Usage::SizeofOrTypeofOnly
        ]
    );
    assert_eq!(
        usages("s"),
        [Usage::Write, Usage::Read, Usage::AddressOf, Usage::Write]
    );
    assert!(report
        .references
        .iter()
        .filter(|reference| reference.name == "a" || reference.name == "s")
        .all(|reference| reference.crosses_boundary));
}

#[test]
fn literal_bodies_under_sizeof_and_typeof_are_still_checked() {
    let report = check(
        "void f(void) {\n\
             int i = 0;\n\
             int k = sizeof((int (void)){ i = 1; return i; }());\n\
             typeof((int (void)){ int *p = &i; return 0; }) *fp;\n\
             int n = sizeof((int (void)){ return sizeof i; }());\n\
         }",
    );
    assert_eq!(
        subjects(&report, DiagnosticKind::IllegalCapture),
        ["i", "i", "i"]
    );
    let usages: Vec<Usage> = report
        .references
        .iter()
        .filter(|reference| reference.name == "i" && reference.crosses_boundary)
        .map(|reference| reference.usage)
        .collect();
    assert_eq!(
        usages,
        [
            Usage::Write,
            Usage::Read,
            Usage::AddressOf,
            Usage::SizeofOrTypeofOnly
        ]
    );
    assert!(!report.literals[0].valid);
    assert!(!report.literals[1].valid);
    assert!(report.literals[2].valid);
}

#[test]
fn structurally_identical_literals_fold() {
    let report = check(
        "int g(int);\n\
         void f(void) {\n\
             int a = (int (int x)){ return g(x); }(1);\n\
             int b = (int (int y)){ return g(y); }(2);\n\
             int c = (int (int z)){ return g(z) + 1; }(3);\n\
         }",
    );
    assert_clean(&report);
    let first = &report.literals[0];
    assert!(first.folded_into.is_none());
    let folded = report.literals[1].folded_into.expect("second literal folds");
    assert_eq!(folded.literal, first.id);
    assert_eq!(folded.unit, report.unit);
    assert!(report.literals[2].folded_into.is_none());
}

#[test]
fn literals_with_their_own_static_objects_never_fold() {
    let report = check(
        "void f(void) {\n\
             int a = (int (void)){ static int n = 0; return ++n; }();\n\
             int b = (int (void)){ static int m = 0; return ++m; }();\n\
             int c = (int (void)){ static thread_local int t = 0; return ++t; }();\n\
             int d = (int (void)){ static thread_local int u = 0; return ++u; }();\n\
             int e = (int (void)){ return (int (void)){ static int k = 0; return ++k; }(); }();\n\
             int g = (int (void)){ return (int (void)){ static int j = 0; return ++j; }(); }();\n\
         }",
    );
    assert_clean(&report);
    assert_eq!(report.literals.len(), 8);
    assert!(report
        .literals
        .iter()
        .all(|literal| literal.instance_key.is_none() && literal.folded_into.is_none()));
}

#[test]
fn block_scope_externs_fold_by_name() {
    let report = check(
        "void f(void) {\n\
             (int (void)){ extern int left; return left; }();\n\
             (int (void)){ extern int right; return right; }();\n\
             (int (void)){ extern int left; return left; }();\n\
         }",
    );
    assert_clean(&report);
    assert!(report.literals[1].folded_into.is_none());
    assert_eq!(
        report.literals[2].folded_into.map(|target| target.literal),
        Some(report.literals[0].id)
    );
}

#[test]
fn literals_naming_different_declarations_do_not_fold() {
    let report = check(
        "static int s1;\n\
         static int s2;\n\
         void f(void) {\n\
             (int (void)){ return s1; }();\n\
             (int (void)){ return s2; }();\n\
             (int (void)){ return s1; }();\n\
         }",
    );
    assert_clean(&report);
    assert!(report.literals[1].folded_into.is_none());
    assert_eq!(
        report.literals[2].folded_into.map(|target| target.literal),
        Some(report.literals[0].id)
    );
}

#[test]
fn folding_can_be_disabled() {
    let report = check_with(
        AnalysisConfig {
            deduplicate: false,
            ..AnalysisConfig::default()
        },
        "void f(void) { (void (void)){ }(); (void (void)){ }(); }",
    );
    assert!(report.literals.iter().all(|literal| literal.folded_into.is_none()));
}

#[test]
fn invalid_literals_never_fold() {
    let report = check(
        "void f(void) {\n\
             int i = 0;\n\
             (void (void)){ i = 1; }();\n\
             (void (void)){ i = 1; }();\n\
             (static void (void)){ }();\n\
             (static void (void)){ }();\n\
         }",
    );
    assert!(report.literals.iter().all(|literal| literal.instance_key.is_none()));
    assert_eq!(
        subjects(&report, DiagnosticKind::UnsupportedSpecifier),
        ["static", "static"]
    );
}

fn first_literal(stmts: &[Stmt]) -> &LiteralFunctionExpr {
    for stmt in stmts {
        if let Stmt::Expr {
            expr: Expr::Call { callee, .. },
            ..
        } = stmt
        {
            if let Expr::LiteralFunction(literal) = callee.as_ref() {
                return literal;
            }
        }
    }
    panic!("no called literal function in {stmts:#?}");
}

#[test]
fn hosts_can_drive_scopes_themselves() {
    let (unit, _) = parse_unit(
        "host.c",
        "void h(void) { (void (void)){ i = 1; }(); (static void (void)){ int j = sizeof(i); }(); }",
    );
    let ExternalDecl::Function(def) = &unit.items[0] else {
        panic!("expected a function definition");
    };

    let mut analyzer = Analyzer::new(AnalysisConfig::default(), Arc::new(InstanceTable::new()));
    let tree = analyzer.scopes_mut();
    let file_scope = tree.file_scope();
    let frame = tree.push_frame(FrameKind::Function, tree.file_frame(), "host");
    let scope = tree.push_scope(file_scope, ScopeKind::Block, frame);
    tree.declare(
        scope,
        new_declaration(
            "i",
            QualType::new(CType::Basic(BasicType::Int)),
            DeclKind::Object,
            Storage::Automatic,
            Default::default(),
        ),
    );

    let write = first_literal(&def.body.stmts);
    let resolved = analyzer.analyze_literal(write, scope);
    assert!(!resolved.valid);
    assert_eq!(resolved.func_name, "host.literal.1");
    assert_eq!(
        analyzer.scopes().scope(resolved.param_scope).parent,
        Some(scope)
    );
    assert_eq!(
        analyzer.scopes().scope(resolved.body_scope).parent,
        Some(resolved.param_scope)
    );

    let specified = first_literal(&def.body.stmts[1..]);
    let resolved = analyzer.analyze_literal(specified, scope);
    assert!(!resolved.valid);

    let report = analyzer.finish();
    assert_eq!(
        kinds(&report),
        [
            DiagnosticKind::IllegalCapture,
            DiagnosticKind::UnsupportedSpecifier
        ]
    );
}
