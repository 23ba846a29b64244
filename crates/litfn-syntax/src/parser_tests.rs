use litfn_base::{file_diagnostics_have_errors, DiagnosticKind, FileDiagnostic};

use crate::ast::{
    Declaration, Expr, ExternalDecl, Initializer, IntrospectOperand, LiteralFunctionExpr, Stmt,
    StorageClass, TranslationUnit,
};
use crate::parse_unit;
use crate::types::{CType, TagBody};

fn parse(source: &str) -> TranslationUnit {
    let (unit, diags) = parse_unit("test.c", source);
    assert!(
        !file_diagnostics_have_errors(&diags),
        "unexpected diagnostics: {diags:#?}"
    );
    unit
}

fn parse_with_diags(source: &str) -> (TranslationUnit, Vec<FileDiagnostic>) {
    parse_unit("test.c", source)
}

fn body_of(unit: &TranslationUnit, index: usize) -> &[Stmt] {
    match &unit.items[index] {
        ExternalDecl::Function(def) => &def.body.stmts,
        other => panic!("expected a function definition, got {other:?}"),
    }
}

fn decl_of(stmt: &Stmt) -> &Declaration {
    match stmt {
        Stmt::Declaration(decl) => decl,
        other => panic!("expected a declaration, got {other:?}"),
    }
}

fn init_expr(stmt: &Stmt) -> &Expr {
    match &decl_of(stmt).declarators[0].init {
        Some(Initializer::Expr(expr)) => expr,
        other => panic!("expected an expression initializer, got {other:?}"),
    }
}

fn called_literal(expr: &Expr) -> &LiteralFunctionExpr {
    match expr {
        Expr::Call { callee, .. } => match callee.as_ref() {
            Expr::LiteralFunction(literal) => literal,
            other => panic!("expected a literal function callee, got {other:?}"),
        },
        other => panic!("expected a call, got {other:?}"),
    }
}

#[test]
fn parses_called_literal_function() {
    let unit = parse("int main(void) { int x = (int (int a)){ return a + 1; }(1); return x; }");
    let stmts = body_of(&unit, 0);
    let literal = called_literal(init_expr(&stmts[0]));
    assert_eq!(literal.params().len(), 1);
    assert_eq!(literal.params()[0].name.as_ref().map(|n| n.name.as_str()), Some("a"));
    assert_eq!(literal.return_type().to_string(), "int");
    assert!(literal.has_inline_signature());
    assert!(matches!(literal.body.stmts[0], Stmt::Return { .. }));
    assert_eq!(literal.tokens.first().map(|tok| tok.text.as_str()), Some("("));
    assert_eq!(literal.tokens.last().map(|tok| tok.text.as_str()), Some("}"));
}

#[test]
fn parses_compound_literal_for_object_types() {
    let unit = parse(
        "struct P { int x, y; };\n\
         int f(void) { struct P p = (struct P){ .x = 1, [0] = 2 }; int *q = (int[]){ 1, 2, }; return p.x + *q; }",
    );
    let stmts = body_of(&unit, 1);
    assert!(matches!(init_expr(&stmts[0]), Expr::CompoundLiteral { .. }));
    assert!(matches!(init_expr(&stmts[1]), Expr::CompoundLiteral { .. }));
}

#[test]
fn empty_parameter_lists_are_prototypes_without_parameters() {
    let unit = parse("void f(void) { (void ()){ }(); (void (void)){ }(); }");
    let stmts = body_of(&unit, 0);
    for stmt in stmts {
        let Stmt::Expr { expr, .. } = stmt else {
            panic!("expected expression statement");
        };
        assert!(called_literal(expr).params().is_empty());
    }
}

#[test]
fn declarators_compose_in_c_order() {
    let unit = parse("int (*fp)(int); int *arr[3]; int (*pa)[4]; char **argv;");
    let rendered: Vec<String> = unit
        .items
        .iter()
        .map(|item| match item {
            ExternalDecl::Declaration(decl) => decl.declarators[0].ty.to_string(),
            ExternalDecl::Function(_) => String::new(),
        })
        .collect();
    assert_eq!(
        rendered,
        ["int (*)(int)", "int *[3]", "int (*)[4]", "char **"]
    );
}

#[test]
fn typedef_names_start_declarations() {
    let unit = parse("typedef int T; void f(void) { T * x; T y = 2; }");
    let stmts = body_of(&unit, 1);
    assert_eq!(decl_of(&stmts[0]).declarators[0].ty.to_string(), "T *");
    assert_eq!(decl_of(&stmts[1]).declarators[0].name.name, "y");
}

#[test]
fn shadowed_typedef_name_is_an_ordinary_identifier() {
    let unit = parse("typedef int T; int f(int T) { return T * 2; }");
    let stmts = body_of(&unit, 1);
    let Stmt::Return {
        value: Some(Expr::Binary { .. }),
        ..
    } = &stmts[0]
    else {
        panic!("expected multiplication, got {:?}", stmts[0]);
    };
}

#[test]
fn literal_signature_can_come_from_a_typedef() {
    let unit = parse("typedef int F(int x); int g(void) { return (F){ return x * 2; }(3); }");
    let stmts = body_of(&unit, 1);
    let Stmt::Return {
        value: Some(expr), ..
    } = &stmts[0]
    else {
        panic!("expected return");
    };
    let literal = called_literal(expr);
    assert!(!literal.has_inline_signature());
    assert_eq!(literal.params()[0].name.as_ref().map(|n| n.name.as_str()), Some("x"));
}

#[test]
fn literal_signature_can_come_from_typeof() {
    let unit = parse(
        "int h(int);\n\
         void g(void) { int (*fp)(int) = h; (typeof(*fp)){ return 0; }; (typeof(h)){ return 1; }; }",
    );
    let stmts = body_of(&unit, 1);
    for stmt in &stmts[1..] {
        let Stmt::Expr { expr, .. } = stmt else {
            panic!("expected expression statement");
        };
        assert!(matches!(expr, Expr::LiteralFunction(_)), "got {expr:?}");
    }
}

#[test]
fn unsupported_specifiers_are_reported_and_body_is_still_parsed() {
    let (unit, diags) =
        parse_with_diags("void f(void) { (static inline int (void)){ return 1; }(); }");
    let subjects: Vec<Option<&str>> = diags
        .iter()
        .map(|diag| diag.diagnostic.subject.as_deref())
        .collect();
    assert_eq!(subjects, [Some("static"), Some("inline")]);
    assert!(diags
        .iter()
        .all(|diag| diag.diagnostic.kind == DiagnosticKind::UnsupportedSpecifier));
    let stmts = body_of(&unit, 0);
    let Stmt::Expr { expr, .. } = &stmts[0] else {
        panic!("expected expression statement");
    };
    let literal = called_literal(expr);
    assert!(literal.type_name.specifiers.has_storage(StorageClass::Static));
}

#[test]
fn storage_classes_on_compound_literals_are_accepted() {
    let (_, diags) = parse_with_diags("void f(void) { int *p = (static int[]){ 1, 2 }; }");
    assert!(diags.is_empty(), "{diags:?}");
}

#[test]
fn undeclared_type_name_is_a_type_category_error() {
    let (_, diags) = parse_with_diags("void f(void) { (mystery){ 1 }; }");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].diagnostic.kind, DiagnosticKind::TypeCategoryError);
    assert_eq!(diags[0].diagnostic.subject.as_deref(), Some("mystery"));
}

#[test]
fn missing_type_specifier_is_a_type_category_error() {
    let (_, diags) = parse_with_diags("void f(void) { (const){ 1 }; }");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].diagnostic.code, "E2002");
}

#[test]
fn tags_in_literal_type_names_keep_their_bodies() {
    let unit = parse(
        "void f(void) { (struct X { int i; } (struct Y *y)){ struct X x = {}; return x; }(nullptr); }",
    );
    let stmts = body_of(&unit, 0);
    let Stmt::Expr { expr, .. } = &stmts[0] else {
        panic!("expected expression statement");
    };
    let literal = called_literal(expr);
    let CType::Tag(ret_tag) = &literal.return_type().ty else {
        panic!("expected struct return type");
    };
    assert_eq!(ret_tag.name.as_ref().map(|n| n.name.as_str()), Some("X"));
    assert!(matches!(ret_tag.body, Some(TagBody::Members(ref members)) if members.len() == 1));
    assert_eq!(literal.params()[0].ty.to_string(), "struct Y *");
}

#[test]
fn sizeof_accepts_types_expressions_and_literals() {
    let unit = parse(
        "void f(int i) { int a = sizeof(int); int b = sizeof i; int c = sizeof((int){ 1 }); int d = sizeof (void (void)){ }; }",
    );
    let stmts = body_of(&unit, 0);
    let operands: Vec<&IntrospectOperand> = stmts
        .iter()
        .map(|stmt| match init_expr(stmt) {
            Expr::Introspect { operand, .. } => operand,
            other => panic!("expected sizeof, got {other:?}"),
        })
        .collect();
    assert!(matches!(operands[0], IntrospectOperand::Type(_)));
    assert!(matches!(operands[1], IntrospectOperand::Expr(_)));
    assert!(matches!(operands[2], IntrospectOperand::Expr(_)));
    assert!(
        matches!(operands[3], IntrospectOperand::Expr(expr) if matches!(expr.as_ref(), Expr::LiteralFunction(_)))
    );
}

#[test]
fn labels_and_gotos_parse_in_literal_bodies() {
    let unit = parse("void f(void) { out: (void (void)){ again: goto again; }(); goto out; }");
    let stmts = body_of(&unit, 0);
    let Stmt::Labeled { label, body, .. } = &stmts[0] else {
        panic!("expected labeled statement");
    };
    assert_eq!(label.name, "out");
    let Stmt::Expr { expr, .. } = body.as_ref() else {
        panic!("expected expression statement");
    };
    let literal = called_literal(expr);
    assert!(matches!(literal.body.stmts[0], Stmt::Labeled { .. }));
}

#[test]
fn literal_node_ids_are_distinct() {
    let unit = parse("void f(void) { (void (void)){ }(); (void (void)){ }(); }");
    let stmts = body_of(&unit, 0);
    let ids: Vec<_> = stmts
        .iter()
        .map(|stmt| match stmt {
            Stmt::Expr { expr, .. } => called_literal(expr).id,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_ne!(ids[0], ids[1]);
}

#[test]
fn recovers_after_syntax_errors() {
    let (unit, diags) = parse_with_diags("int f(void) { int x = ; return 0; }\nint g;");
    assert!(diags
        .iter()
        .any(|diag| diag.diagnostic.kind == DiagnosticKind::Syntax));
    assert_eq!(unit.items.len(), 2);
    assert!(body_of(&unit, 0)
        .iter()
        .any(|stmt| matches!(stmt, Stmt::Return { .. })));
}

#[test]
fn malformed_inputs_terminate() {
    for source in [
        "(",
        "int f(",
        "void f(void) { (void (void)){ ",
        "}}}}",
        "struct { int",
        "int x = (int)(;",
        "void f(void) { goto; case: default }",
        "typedef int T; T T T;",
        "[[",
        "enum E { A = , B }",
    ] {
        let _ = parse_unit("fuzz.c", source);
    }
}

#[test]
fn deep_nesting_is_cut_off_with_one_diagnostic() {
    let depth = 10_000;
    let source = format!(
        "int f(void) {{ return {}1{}; }}\nint g(void) {{ return 1{}; }}",
        "(".repeat(depth),
        ")".repeat(depth),
        " + 1".repeat(depth)
    );
    let (_, diags) = parse_with_diags(&source);
    let too_deep = diags
        .iter()
        .filter(|diag| diag.diagnostic.message == "nesting is too deep")
        .count();
    assert_eq!(too_deep, 1);

    let shallow = format!("int f(void) {{ return {}1{}; }}", "(".repeat(64), ")".repeat(64));
    parse(&shallow);
}

/// Parses on a thread with the default stack size, as rayon workers and test threads have.
fn messages_on_default_stack(source: String) -> Vec<String> {
    std::thread::spawn(move || {
        let (_, diags) = parse_unit("test.c", &source);
        diags
            .into_iter()
            .map(|diag| diag.diagnostic.message)
            .collect()
    })
    .join()
    .expect("parser thread")
}

#[test]
fn prefix_operators_and_declarators_are_cut_off() {
    let depth = 100_000;
    let inputs = [
        format!("int {}x;", "*".repeat(depth)),
        format!("int x{};", "[1]".repeat(depth)),
        format!("int x = {}1;", "-".repeat(depth)),
        format!("int x = {}1;", "!".repeat(depth)),
        format!("int x = {}1;", "sizeof ".repeat(depth)),
        format!("int x = {}1;", "1 ? 1 : ".repeat(depth)),
    ];
    for source in inputs {
        assert_eq!(messages_on_default_stack(source), ["nesting is too deep"]);
    }
}

#[test]
fn nested_literal_functions_report_nesting_once() {
    let nest = |depth: usize| {
        format!(
            "void f(void) {{ {} {} }}",
            "(void (void)){ ".repeat(depth),
            "}();".repeat(depth)
        )
    };
    assert_eq!(messages_on_default_stack(nest(100)), ["nesting is too deep"]);
    assert!(messages_on_default_stack(nest(8)).is_empty());
}
