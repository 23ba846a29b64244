use litfn_base::{DiagnosticKind, Span, SpannedName};

use super::{Parser, LITERAL_NESTING_COST};
use crate::ast::{
    BinaryOp, DeclSpecifiers, Expr, IntrospectOp, IntrospectOperand, LiteralFunctionExpr, PostfixOp,
    TypeName, UnaryOp,
};
use crate::disambiguate::{
    classify, function_signature, type_category_error, unsupported_specifiers, Construct,
};
use crate::lexer::TokenKind;
use crate::types::{CType, FunctionType, QualType};

fn binary_op(text: &str) -> Option<(BinaryOp, u8)> {
    Some(match text {
        "*" => (BinaryOp::Mul, 10),
        "/" => (BinaryOp::Div, 10),
        "%" => (BinaryOp::Rem, 10),
        "+" => (BinaryOp::Add, 9),
        "-" => (BinaryOp::Sub, 9),
        "<<" => (BinaryOp::Shl, 8),
        ">>" => (BinaryOp::Shr, 8),
        "<" => (BinaryOp::Lt, 7),
        ">" => (BinaryOp::Gt, 7),
        "<=" => (BinaryOp::Le, 7),
        ">=" => (BinaryOp::Ge, 7),
        "==" => (BinaryOp::Eq, 6),
        "!=" => (BinaryOp::Ne, 6),
        "&" => (BinaryOp::BitAnd, 5),
        "^" => (BinaryOp::BitXor, 4),
        "|" => (BinaryOp::BitOr, 3),
        "&&" => (BinaryOp::And, 2),
        "||" => (BinaryOp::Or, 1),
        _ => return None,
    })
}

fn assign_op(text: &str) -> Option<Option<BinaryOp>> {
    Some(match text {
        "=" => None,
        "*=" => Some(BinaryOp::Mul),
        "/=" => Some(BinaryOp::Div),
        "%=" => Some(BinaryOp::Rem),
        "+=" => Some(BinaryOp::Add),
        "-=" => Some(BinaryOp::Sub),
        "<<=" => Some(BinaryOp::Shl),
        ">>=" => Some(BinaryOp::Shr),
        "&=" => Some(BinaryOp::BitAnd),
        "^=" => Some(BinaryOp::BitXor),
        "|=" => Some(BinaryOp::BitOr),
        _ => return None,
    })
}

/// Value of an integer constant; suffixes and digit separators are ignored.
fn parse_int_literal(text: &str) -> Option<u64> {
    let digits: String = text
        .chars()
        .filter(|ch| *ch != '\'')
        .collect::<String>()
        .trim_end_matches(['u', 'U', 'l', 'L', 'z', 'Z'])
        .to_string();
    let (radix, body) = if let Some(rest) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, rest)
    } else if let Some(rest) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        (2, rest)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits.as_str())
    };
    u64::from_str_radix(body, radix).ok()
}

fn is_float_literal(text: &str) -> bool {
    let hex = text.starts_with("0x") || text.starts_with("0X");
    text.contains('.') || (!hex && text.contains(['e', 'E'])) || (hex && text.contains(['p', 'P']))
}

impl Parser {
    pub(super) fn parse_expr(&mut self) -> Option<Expr> {
        let depth = self.depth;
        let expr = self.parse_comma_chain();
        self.depth = depth;
        expr
    }

    /// Each link of a left-nested chain counts as one nesting level.
    fn parse_comma_chain(&mut self) -> Option<Expr> {
        let mut expr = self.parse_assignment()?;
        while self.consume_symbol(",") {
            if !self.enter() {
                return None;
            }
            let right = self.parse_assignment()?;
            let span = expr.span().merge(right.span());
            expr = Expr::Comma {
                left: Box::new(expr),
                right: Box::new(right),
                span,
            };
        }
        Some(expr)
    }

    pub(super) fn parse_assignment(&mut self) -> Option<Expr> {
        if !self.enter() {
            return None;
        }
        let expr = self.parse_assignment_inner();
        self.leave();
        expr
    }

    fn parse_assignment_inner(&mut self) -> Option<Expr> {
        let target = self.parse_conditional()?;
        let op = self
            .peek()
            .filter(|tok| tok.kind == TokenKind::Punct)
            .and_then(|tok| assign_op(&tok.text));
        let Some(op) = op else {
            return Some(target);
        };
        self.pos += 1;
        let value = self.parse_assignment()?;
        let span = target.span().merge(value.span());
        Some(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
            span,
        })
    }

    pub(super) fn parse_conditional(&mut self) -> Option<Expr> {
        let cond = self.parse_binary(1)?;
        if !self.consume_symbol("?") {
            return Some(cond);
        }
        let depth = self.depth;
        let branches = self.parse_conditional_branches();
        self.depth = depth;
        let (then_expr, else_expr) = branches?;
        let span = cond.span().merge(else_expr.span());
        Some(Expr::Conditional {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
            span,
        })
    }

    /// `then : else` after the `?`. The else branch nests to the right, one level per link.
    fn parse_conditional_branches(&mut self) -> Option<(Expr, Expr)> {
        if !self.enter() {
            return None;
        }
        let then_expr = self.parse_expr()?;
        self.expect_symbol(":", "expected `:` in conditional expression");
        let else_expr = self.parse_conditional()?;
        Some((then_expr, else_expr))
    }

    fn parse_binary(&mut self, min_prec: u8) -> Option<Expr> {
        let depth = self.depth;
        let expr = self.parse_binary_chain(min_prec);
        self.depth = depth;
        expr
    }

    fn parse_binary_chain(&mut self, min_prec: u8) -> Option<Expr> {
        let mut left = self.parse_cast()?;
        loop {
            let Some((op, prec)) = self
                .peek()
                .filter(|tok| tok.kind == TokenKind::Punct)
                .and_then(|tok| binary_op(&tok.text))
            else {
                break;
            };
            if prec < min_prec {
                break;
            }
            if !self.enter() {
                return None;
            }
            self.pos += 1;
            let right = self.parse_binary(prec + 1)?;
            let span = left.span().merge(right.span());
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Some(left)
    }

    fn parse_cast(&mut self) -> Option<Expr> {
        if !self.enter() {
            return None;
        }
        let expr = self.parse_cast_or_unary();
        self.leave();
        expr
    }

    /// `( type-name )` followed by `{` or by a cast operand.
    fn parse_cast_or_unary(&mut self) -> Option<Expr> {
        if !self.check_symbol("(") {
            return self.parse_unary_inner();
        }
        let start_pos = self.pos;
        let type_name = if self.starts_type_name_at(self.pos + 1) {
            self.pos += 1;
            self.parse_type_name()
        } else if self.is_undeclared_type_name() {
            self.pos += 1;
            self.undeclared_type_name()
        } else {
            return self.parse_unary_inner();
        };
        let Some(type_name) = type_name else {
            self.pos = start_pos;
            return self.parse_unary_inner();
        };
        let start = self.tokens[start_pos].span;
        self.expect_symbol(")", "expected `)` after type name");
        if self.check_symbol("{") {
            let expr = self.parse_braced_after_type(type_name, start_pos)?;
            return self.parse_postfix(expr);
        }
        let operand = self.parse_cast()?;
        let span = start.merge(operand.span());
        Some(Expr::Cast {
            ty: Box::new(type_name),
            expr: Box::new(operand),
            span,
        })
    }

    /// `( name ) {` where `name` is not declared at all: treated as a type-name so the construct is
    /// reported instead of being misparsed as a parenthesized expression.
    fn is_undeclared_type_name(&self) -> bool {
        let Some(tok) = self.peek_at(1) else {
            return false;
        };
        tok.kind == TokenKind::Ident
            && self.env.lookup(&tok.text).is_none()
            && self.check_symbol_at(2, ")")
            && self.check_symbol_at(3, "{")
    }

    fn undeclared_type_name(&mut self) -> Option<TypeName> {
        let name = self.consume_ident()?;
        let ty = QualType::new(CType::Typedef {
            name: name.clone(),
            target: None,
        });
        Some(TypeName {
            specifiers: DeclSpecifiers {
                storage: Vec::new(),
                function: Vec::new(),
                base: ty.clone(),
                span: name.span,
            },
            ty,
            span: name.span,
        })
    }

    /// Resolves `( type-name ) {` by the category of the type and parses the braces accordingly.
    fn parse_braced_after_type(&mut self, type_name: TypeName, start_pos: usize) -> Option<Expr> {
        let start = self.tokens[start_pos].span;
        match classify(&type_name, &self.env) {
            Construct::LiteralFunction => {
                self.diagnostics.extend(unsupported_specifiers(&type_name));
                let signature =
                    function_signature(&type_name.ty, &self.env).unwrap_or_else(|| FunctionType {
                        ret: Box::new(QualType::error()),
                        params: Vec::new(),
                        variadic: false,
                    });
                if !self.enter_by(LITERAL_NESTING_COST) {
                    return None;
                }
                let id = self.fresh_node_id();
                let body = self.parse_body_with_params(&signature.params);
                self.leave_by(LITERAL_NESTING_COST);
                let tokens = self.tokens[start_pos..self.pos].to_vec();
                Some(Expr::LiteralFunction(Box::new(LiteralFunctionExpr {
                    id,
                    type_name,
                    signature,
                    body,
                    tokens,
                    span: self.span_from(start),
                })))
            }
            Construct::CompoundLiteral => {
                let init = self.parse_initializer()?;
                Some(Expr::CompoundLiteral {
                    ty: Box::new(type_name),
                    init: Box::new(init),
                    span: self.span_from(start),
                })
            }
            Construct::Ambiguous => {
                self.diagnostics.push(type_category_error(&type_name));
                self.skip_braces();
                Some(Expr::Error(self.span_from(start)))
            }
        }
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        if !self.enter() {
            return None;
        }
        let expr = self.parse_unary_inner();
        self.leave();
        expr
    }

    /// Prefix operators and `sizeof`; callers reaching it through [`Self::parse_cast`] are
    /// already counted.
    fn parse_unary_inner(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        let tok = self.peek()?;
        if tok.kind == TokenKind::Punct {
            let op = match tok.text.as_str() {
                "++" => Some(UnaryOp::PreInc),
                "--" => Some(UnaryOp::PreDec),
                "&" => Some(UnaryOp::AddrOf),
                "*" => Some(UnaryOp::Deref),
                "+" => Some(UnaryOp::Plus),
                "-" => Some(UnaryOp::Neg),
                "~" => Some(UnaryOp::BitNot),
                "!" => Some(UnaryOp::Not),
                _ => None,
            };
            if let Some(op) = op {
                self.pos += 1;
                let operand = if matches!(op, UnaryOp::PreInc | UnaryOp::PreDec) {
                    self.parse_unary()?
                } else {
                    self.parse_cast()?
                };
                let span = start.merge(operand.span());
                return Some(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                    span,
                });
            }
        }
        if tok.kind == TokenKind::Keyword {
            let op = match tok.text.as_str() {
                "sizeof" => Some(IntrospectOp::Sizeof),
                "alignof" | "_Alignof" => Some(IntrospectOp::Alignof),
                _ => None,
            };
            if let Some(op) = op {
                self.pos += 1;
                return self.parse_introspect(op, start);
            }
        }
        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    fn parse_introspect(&mut self, op: IntrospectOp, start: Span) -> Option<Expr> {
        if self.check_symbol("(") && self.starts_type_name_at(self.pos + 1) {
            let start_pos = self.pos;
            self.pos += 1;
            if let Some(type_name) = self.parse_type_name() {
                self.expect_symbol(")", "expected `)` after type name");
                if self.check_symbol("{") {
                    let literal = self.parse_braced_after_type(type_name, start_pos)?;
                    let operand = self.parse_postfix(literal)?;
                    let span = start.merge(operand.span());
                    return Some(Expr::Introspect {
                        op,
                        operand: IntrospectOperand::Expr(Box::new(operand)),
                        span,
                    });
                }
                return Some(Expr::Introspect {
                    op,
                    operand: IntrospectOperand::Type(Box::new(type_name)),
                    span: self.span_from(start),
                });
            }
            self.pos = start_pos;
        }
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span());
        Some(Expr::Introspect {
            op,
            operand: IntrospectOperand::Expr(Box::new(operand)),
            span,
        })
    }

    pub(super) fn parse_postfix(&mut self, expr: Expr) -> Option<Expr> {
        let depth = self.depth;
        let expr = self.parse_postfix_chain(expr);
        self.depth = depth;
        expr
    }

    fn parse_postfix_chain(&mut self, mut expr: Expr) -> Option<Expr> {
        loop {
            let continues = ["[", "(", ".", "->", "++", "--"]
                .iter()
                .any(|symbol| self.check_symbol(symbol));
            if continues && !self.enter() {
                return None;
            }
            if self.consume_symbol("[") {
                let index = self.parse_expr()?;
                self.expect_symbol("]", "expected `]` after index");
                let span = self.span_from(expr.span());
                expr = Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                    span,
                };
            } else if self.consume_symbol("(") {
                let mut args = Vec::new();
                if !self.check_symbol(")") {
                    loop {
                        args.push(self.parse_assignment()?);
                        if !self.consume_symbol(",") {
                            break;
                        }
                    }
                }
                self.expect_symbol(")", "expected `)` after arguments");
                let span = self.span_from(expr.span());
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    span,
                };
            } else if self.check_symbol(".") || self.check_symbol("->") {
                let arrow = self.check_symbol("->");
                self.pos += 1;
                let Some(field) = self.consume_ident() else {
                    let span = self.peek_span();
                    self.emit_diag(DiagnosticKind::Syntax, "expected member name", span);
                    return None;
                };
                let span = expr.span().merge(field.span);
                expr = Expr::Member {
                    base: Box::new(expr),
                    field,
                    arrow,
                    span,
                };
            } else if self.check_symbol("++") || self.check_symbol("--") {
                let op = if self.check_symbol("++") {
                    PostfixOp::Inc
                } else {
                    PostfixOp::Dec
                };
                self.pos += 1;
                let span = self.span_from(expr.span());
                expr = Expr::Postfix {
                    op,
                    operand: Box::new(expr),
                    span,
                };
            } else {
                return Some(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let tok = self.peek()?.clone();
        let span = tok.span;
        match tok.kind {
            TokenKind::Ident => {
                self.pos += 1;
                Some(Expr::Ident(SpannedName::new(tok.text, span)))
            }
            TokenKind::Number => {
                self.pos += 1;
                if is_float_literal(&tok.text) {
                    return Some(Expr::FloatLit {
                        text: tok.text,
                        span,
                    });
                }
                match parse_int_literal(&tok.text) {
                    Some(value) => Some(Expr::IntLit { value, span }),
                    None => {
                        self.emit_diag(
                            DiagnosticKind::Syntax,
                            format!("invalid integer constant `{}`", tok.text),
                            span,
                        );
                        Some(Expr::Error(span))
                    }
                }
            }
            TokenKind::Char => {
                self.pos += 1;
                Some(Expr::CharLit {
                    text: tok.text,
                    span,
                })
            }
            TokenKind::String => {
                self.pos += 1;
                let mut text = tok.text;
                let mut end = span;
                while let Some(next) = self.peek().filter(|next| next.kind == TokenKind::String) {
                    text.push_str(&next.text);
                    end = next.span;
                    self.pos += 1;
                }
                Some(Expr::StringLit {
                    text,
                    span: span.merge(end),
                })
            }
            TokenKind::Keyword => match tok.text.as_str() {
                "true" | "false" => {
                    self.pos += 1;
                    Some(Expr::Bool {
                        value: tok.text == "true",
                        span,
                    })
                }
                "nullptr" => {
                    self.pos += 1;
                    Some(Expr::Nullptr(span))
                }
                "__func__" => {
                    self.pos += 1;
                    Some(Expr::FuncName(span))
                }
                _ => {
                    self.emit_diag(
                        DiagnosticKind::Syntax,
                        format!("expected an expression, found `{}`", tok.text),
                        span,
                    );
                    None
                }
            },
            TokenKind::Punct if tok.text == "(" => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect_symbol(")", "expected `)`");
                Some(inner)
            }
            TokenKind::Punct => {
                self.emit_diag(
                    DiagnosticKind::Syntax,
                    format!("expected an expression, found `{}`", tok.text),
                    span,
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_int_literal;

    #[test]
    fn integer_constants_honor_radix_and_suffixes() {
        assert_eq!(parse_int_literal("42"), Some(42));
        assert_eq!(parse_int_literal("0x1Fu"), Some(31));
        assert_eq!(parse_int_literal("010"), Some(8));
        assert_eq!(parse_int_literal("0b101"), Some(5));
        assert_eq!(parse_int_literal("1'000ULL"), Some(1000));
        assert_eq!(parse_int_literal("0"), Some(0));
    }
}
