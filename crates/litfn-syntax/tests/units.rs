use litfn_base::file_diagnostics_have_errors;
use litfn_syntax::ast::{Expr, ExternalDecl, Initializer, LiteralFunctionExpr, Stmt};
use litfn_syntax::parse_unit;
use litfn_syntax::types::{render_declaration, CType, QualType};

const UNIT: &str = "typedef int F(int x);\n\
                    int h(int, char *);\n\
                    void f(void) {\n\
                    (struct X { int i; } (struct Y *y)){ struct X x = {}; return x; }(nullptr);\n\
                    int a = (F){ return x; }(1);\n\
                    int b = (typeof(h)){ return 0; }(a, 0);\n\
                    (void (int n, int m[n])){ }(1, 0);\n\
                    }\n";

fn called_literal(expr: &Expr) -> Option<&LiteralFunctionExpr> {
    match expr {
        Expr::Call { callee, .. } => match callee.as_ref() {
            Expr::LiteralFunction(literal) => Some(literal),
            _ => None,
        },
        _ => None,
    }
}

fn literals(stmts: &[Stmt]) -> Vec<&LiteralFunctionExpr> {
    stmts
        .iter()
        .filter_map(|stmt| match stmt {
            Stmt::Expr { expr, .. } => called_literal(expr),
            Stmt::Declaration(decl) => match &decl.declarators.first()?.init {
                Some(Initializer::Expr(expr)) => called_literal(expr),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

#[test]
fn literal_signatures_render_as_written() {
    let (unit, diagnostics) = parse_unit("unit.c", UNIT);
    assert!(!file_diagnostics_have_errors(&diagnostics), "{diagnostics:#?}");
    let ExternalDecl::Function(def) = &unit.items[2] else {
        panic!("expected the definition of f");
    };
    let rendered = literals(&def.body.stmts)
        .iter()
        .map(|literal| {
            let ty = QualType::new(CType::Function(literal.signature.clone()));
            render_declaration(&ty, "")
        })
        .collect::<Vec<_>>()
        .join("\n");
    insta::assert_snapshot!(rendered, @r"
    struct X (struct Y *y)
    int (int x)
    int (int, char *)
    void (int n, int m[n])
    ");
}

#[test]
fn literal_tokens_cover_type_name_and_body() {
    let (unit, _) = parse_unit("unit.c", UNIT);
    let ExternalDecl::Function(def) = &unit.items[2] else {
        panic!("expected the definition of f");
    };
    let found = literals(&def.body.stmts);
    let texts: Vec<&str> = found[1]
        .tokens
        .iter()
        .map(|token| token.text.as_str())
        .collect();
    assert_eq!(texts, ["(", "F", ")", "{", "return", "x", ";", "}"]);
    assert!(!found[1].has_inline_signature());
    assert!(found[0].has_inline_signature());
}

#[test]
fn syntax_tree_serializes() {
    let (unit, _) = parse_unit("unit.c", "int g(void) { return (int (void)){ return 1; }(); }");
    let json = serde_json::to_value(&unit).expect("serialize unit");
    assert_eq!(json["path"], "unit.c");
    assert_eq!(json["items"].as_array().map(Vec::len), Some(1));
    let text = json.to_string();
    assert!(text.contains("LiteralFunction"), "{text}");
}
