#![no_main]
//! Fuzz target: lexer + parser.
//!
//! Invariants checked:
//! - Lexing and parsing never panic.
//! - Tokens come out in source order.
//! - Literal functions found by the parser carry a non-empty token range.

use libfuzzer_sys::fuzz_target;
use litfn_syntax::ast::{Expr, ExternalDecl, Initializer, Stmt};

fn check_expr(expr: &Expr) {
    if let Expr::LiteralFunction(literal) = expr {
        assert!(!literal.tokens.is_empty());
        assert_eq!(literal.tokens[0].text, "(");
    }
    if let Expr::Call { callee, .. } = expr {
        check_expr(callee);
    }
}

fn check_stmts(stmts: &[Stmt]) {
    for stmt in stmts {
        match stmt {
            Stmt::Expr { expr, .. } => check_expr(expr),
            Stmt::Declaration(decl) => {
                for declarator in &decl.declarators {
                    if let Some(Initializer::Expr(expr)) = &declarator.init {
                        check_expr(expr);
                    }
                }
            }
            Stmt::Block(block) => check_stmts(&block.stmts),
            _ => {}
        }
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }
    let src = String::from_utf8_lossy(data);

    let (tokens, _lex_diags) = litfn_syntax::lex(&src);
    let mut previous = None;
    for token in &tokens {
        if let Some(previous) = previous {
            assert!(previous <= token.span.start);
        }
        previous = Some(token.span.start);
    }

    let (unit, _parse_diags) = litfn_syntax::parse_unit("fuzz.c", &src);
    for item in &unit.items {
        if let ExternalDecl::Function(def) = item {
            check_stmts(&def.body.stmts);
        }
    }
});
