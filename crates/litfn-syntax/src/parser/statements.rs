use litfn_base::{DiagnosticKind, Span};

use super::{Binding, Parser};
use crate::ast::{Block, Expr, ForInit, Stmt};
use crate::lexer::TokenKind;
use crate::types::ParamDecl;

impl Parser {
    /// Function or literal body: parameters are visible inside the braces.
    pub(super) fn parse_body_with_params(&mut self, params: &[ParamDecl]) -> Block {
        self.env.push();
        for param in params {
            if let Some(name) = &param.name {
                self.env
                    .declare(&name.name, Binding::Ordinary(param.ty.clone()));
            }
        }
        let body = self.parse_block();
        self.env.pop();
        body
    }

    pub(super) fn parse_block(&mut self) -> Block {
        let start = self.peek_span();
        if !self.expect_symbol("{", "expected `{`") {
            return Block {
                stmts: Vec::new(),
                span: start,
            };
        }
        self.env.push();
        let mut stmts = Vec::new();
        while !self.check_symbol("}") && !self.is_at_end() {
            let before = self.pos;
            if let Some(stmt) = self.parse_statement() {
                stmts.push(stmt);
            }
            if self.pos == before {
                self.recover_to_statement_end();
                if self.pos == before {
                    break;
                }
            }
        }
        self.env.pop();
        self.expect_symbol("}", "expected `}` to close block");
        Block {
            stmts,
            span: self.span_from(start),
        }
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        if !self.enter() {
            return None;
        }
        let stmt = self.parse_statement_inner();
        self.leave();
        stmt
    }

    fn parse_statement_inner(&mut self) -> Option<Stmt> {
        self.skip_attributes();
        let start = self.peek_span();
        let tok = self.peek()?;

        if tok.is_punct("{") {
            return Some(Stmt::Block(self.parse_block()));
        }
        if tok.is_punct(";") {
            self.pos += 1;
            return Some(Stmt::Empty(start));
        }
        if tok.kind == TokenKind::Ident && self.check_symbol_at(1, ":") {
            let label = self.consume_ident()?;
            self.pos += 1;
            let body = if self.check_symbol("}") {
                Stmt::Empty(self.previous_span())
            } else {
                self.parse_statement()?
            };
            return Some(Stmt::Labeled {
                label,
                body: Box::new(body),
                span: self.span_from(start),
            });
        }
        if tok.kind == TokenKind::Keyword {
            let keyword = tok.text.clone();
            match keyword.as_str() {
                "if" => return self.parse_if(),
                "while" => {
                    self.pos += 1;
                    let cond = self.parse_paren_condition()?;
                    let body = self.parse_statement()?;
                    return Some(Stmt::While {
                        cond,
                        body: Box::new(body),
                        span: self.span_from(start),
                    });
                }
                "do" => {
                    self.pos += 1;
                    let body = self.parse_statement()?;
                    if !self.match_keyword("while") {
                        let span = self.peek_span();
                        self.emit_diag(DiagnosticKind::Syntax, "expected `while` after `do` body", span);
                        return None;
                    }
                    let cond = self.parse_paren_condition()?;
                    self.expect_symbol(";", "expected `;` after `do`/`while`");
                    return Some(Stmt::DoWhile {
                        body: Box::new(body),
                        cond,
                        span: self.span_from(start),
                    });
                }
                "for" => return self.parse_for(),
                "switch" => {
                    self.pos += 1;
                    let cond = self.parse_paren_condition()?;
                    let body = self.parse_statement()?;
                    return Some(Stmt::Switch {
                        cond,
                        body: Box::new(body),
                        span: self.span_from(start),
                    });
                }
                "case" => {
                    self.pos += 1;
                    let value = self.parse_conditional()?;
                    self.expect_symbol(":", "expected `:` after case value");
                    let body = self.parse_case_body(start)?;
                    return Some(Stmt::Case {
                        value,
                        body: Box::new(body),
                        span: self.span_from(start),
                    });
                }
                "default" => {
                    self.pos += 1;
                    self.expect_symbol(":", "expected `:` after `default`");
                    let body = self.parse_case_body(start)?;
                    return Some(Stmt::Default {
                        body: Box::new(body),
                        span: self.span_from(start),
                    });
                }
                "return" => {
                    self.pos += 1;
                    let value = if self.check_symbol(";") {
                        None
                    } else {
                        Some(self.parse_expr()?)
                    };
                    self.expect_symbol(";", "expected `;` after return");
                    return Some(Stmt::Return {
                        value,
                        span: self.span_from(start),
                    });
                }
                "break" | "continue" => {
                    self.pos += 1;
                    self.expect_symbol(";", "expected `;`");
                    let span = self.span_from(start);
                    return Some(if keyword == "break" {
                        Stmt::Break(span)
                    } else {
                        Stmt::Continue(span)
                    });
                }
                "goto" => {
                    self.pos += 1;
                    let Some(label) = self.consume_ident() else {
                        let span = self.peek_span();
                        self.emit_diag(DiagnosticKind::Syntax, "expected a label after `goto`", span);
                        return None;
                    };
                    self.expect_symbol(";", "expected `;` after goto");
                    return Some(Stmt::Goto {
                        label,
                        span: self.span_from(start),
                    });
                }
                _ => {}
            }
        }
        if self.starts_declaration() {
            let specifiers = self.parse_decl_specifiers()?;
            return Some(Stmt::Declaration(
                self.parse_declaration_rest(specifiers, start),
            ));
        }

        let expr = self.parse_expr()?;
        if !self.expect_symbol(";", "expected `;` after expression") {
            self.recover_to_statement_end();
        }
        Some(Stmt::Expr {
            expr,
            span: self.span_from(start),
        })
    }

    fn parse_case_body(&mut self, start: Span) -> Option<Stmt> {
        if self.check_symbol("}") {
            return Some(Stmt::Empty(start));
        }
        self.parse_statement()
    }

    fn parse_paren_condition(&mut self) -> Option<Expr> {
        self.expect_symbol("(", "expected `(`");
        let cond = self.parse_expr();
        self.expect_symbol(")", "expected `)`");
        cond
    }

    fn parse_if(&mut self) -> Option<Stmt> {
        let start = self.peek_span();
        self.pos += 1;
        let cond = self.parse_paren_condition()?;
        let then_branch = self.parse_statement()?;
        let else_branch = if self.match_keyword("else") {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Some(Stmt::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch,
            span: self.span_from(start),
        })
    }

    fn parse_for(&mut self) -> Option<Stmt> {
        let start = self.peek_span();
        self.pos += 1;
        self.expect_symbol("(", "expected `(` after `for`");
        self.env.push();
        let init = if self.consume_symbol(";") {
            None
        } else if self.starts_declaration() {
            let decl_start = self.peek_span();
            self.parse_decl_specifiers().map(|specifiers| {
                ForInit::Declaration(self.parse_declaration_rest(specifiers, decl_start))
            })
        } else {
            let expr = self.parse_expr();
            self.expect_symbol(";", "expected `;` in `for`");
            expr.map(ForInit::Expr)
        };
        let cond = if self.check_symbol(";") {
            None
        } else {
            self.parse_expr()
        };
        self.expect_symbol(";", "expected `;` in `for`");
        let step = if self.check_symbol(")") {
            None
        } else {
            self.parse_expr()
        };
        self.expect_symbol(")", "expected `)` after `for` clauses");
        let body = self.parse_statement();
        self.env.pop();
        Some(Stmt::For {
            init,
            cond,
            step,
            body: Box::new(body?),
            span: self.span_from(start),
        })
    }
}
