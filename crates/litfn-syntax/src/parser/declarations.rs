use litfn_base::{DiagnosticKind, Span, SpannedName};

use super::{Binding, Parser};
use crate::ast::{
    Declaration, DeclSpecifiers, Designator, ExternalDecl, FunctionDef, FunctionSpecifier,
    InitDeclarator, InitItem, Initializer, Spec, StorageClass, TypeName,
};
use crate::lexer::TokenKind;
use crate::syntax::{KEYWORDS_QUALIFIER, KEYWORDS_TYPE};
use crate::types::{
    ArrayLen, BasicType, CType, Enumerator, FunctionType, Member, ParamDecl, QualType, Qualifiers,
    TagBody, TagKind, TagSpec, TypeofOperand,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DeclaratorMode {
    Named,
    Abstract,
    Either,
}

enum Suffix {
    Array(ArrayLen),
    Function { params: Vec<ParamDecl>, variadic: bool },
}

#[derive(Default)]
struct DeclaratorParts {
    name: Option<SpannedName>,
    pointers: Vec<Qualifiers>,
    inner: Option<Box<DeclaratorParts>>,
    suffixes: Vec<Suffix>,
}

impl DeclaratorParts {
    fn apply(self, base: QualType) -> (Option<SpannedName>, QualType) {
        let mut ty = base;
        for quals in self.pointers {
            ty = QualType::with_quals(CType::Pointer(Box::new(ty)), quals);
        }
        for suffix in self.suffixes.into_iter().rev() {
            ty = match suffix {
                Suffix::Array(len) => QualType::new(CType::Array {
                    elem: Box::new(ty),
                    len,
                }),
                Suffix::Function { params, variadic } => QualType::new(CType::Function(FunctionType {
                    ret: Box::new(ty),
                    params,
                    variadic,
                })),
            };
        }
        match self.inner {
            Some(inner) => inner.apply(ty),
            None => (self.name, ty),
        }
    }
}

/// Accumulates basic type keywords in any order (`unsigned long int`, `long unsigned`, ...).
#[derive(Default)]
struct BasicSpecifiers {
    void: bool,
    bool_: bool,
    char_: bool,
    short: bool,
    int: bool,
    long: u8,
    float: bool,
    double: bool,
    signed: bool,
    unsigned: bool,
}

impl BasicSpecifiers {
    fn is_empty(&self) -> bool {
        !(self.void
            || self.bool_
            || self.char_
            || self.short
            || self.int
            || self.long > 0
            || self.float
            || self.double
            || self.signed
            || self.unsigned)
    }

    fn add(&mut self, keyword: &str) {
        match keyword {
            "void" => self.void = true,
            "bool" | "_Bool" => self.bool_ = true,
            "char" => self.char_ = true,
            "short" => self.short = true,
            "int" => self.int = true,
            "long" => self.long += 1,
            "float" => self.float = true,
            "double" => self.double = true,
            "signed" => self.signed = true,
            "unsigned" => self.unsigned = true,
            _ => {}
        }
    }

    fn finish(&self) -> Option<CType> {
        if self.void {
            return Some(CType::Void);
        }
        let basic = if self.bool_ {
            BasicType::Bool
        } else if self.char_ {
            if self.unsigned {
                BasicType::UnsignedChar
            } else if self.signed {
                BasicType::SignedChar
            } else {
                BasicType::Char
            }
        } else if self.float {
            BasicType::Float
        } else if self.double {
            if self.long > 0 {
                BasicType::LongDouble
            } else {
                BasicType::Double
            }
        } else if self.short {
            if self.unsigned {
                BasicType::UnsignedShort
            } else {
                BasicType::Short
            }
        } else if self.long >= 2 {
            if self.unsigned {
                BasicType::UnsignedLongLong
            } else {
                BasicType::LongLong
            }
        } else if self.long == 1 {
            if self.unsigned {
                BasicType::UnsignedLong
            } else {
                BasicType::Long
            }
        } else if self.int || self.signed || self.unsigned {
            if self.unsigned {
                BasicType::UnsignedInt
            } else {
                BasicType::Int
            }
        } else {
            return None;
        };
        Some(CType::Basic(basic))
    }
}

impl Parser {
    pub(super) fn parse_external_decl(&mut self) -> Option<ExternalDecl> {
        self.skip_attributes();
        let start = self.peek_span();
        let Some(specifiers) = self.parse_decl_specifiers() else {
            self.emit_diag(
                DiagnosticKind::Syntax,
                "expected a declaration or function definition",
                start,
            );
            self.recover_to_item();
            return None;
        };
        if self.consume_symbol(";") {
            return Some(ExternalDecl::Declaration(Declaration {
                specifiers,
                declarators: Vec::new(),
                span: self.span_from(start),
            }));
        }

        let parts = self.parse_declarator(DeclaratorMode::Named);
        let (name, ty) = parts.apply(specifiers.base.clone());
        if let (Some(name), CType::Function(signature)) = (&name, &ty.ty) {
            if self.check_symbol("{") {
                self.env.declare(&name.name, Binding::Ordinary(ty.clone()));
                let name = name.clone();
                let signature = signature.clone();
                let body = self.parse_body_with_params(&signature.params);
                return Some(ExternalDecl::Function(FunctionDef {
                    specifiers,
                    name,
                    signature,
                    body,
                    span: self.span_from(start),
                }));
            }
        }
        let declarators = self.parse_init_declarators(&specifiers, Some((name, ty)));
        Some(ExternalDecl::Declaration(Declaration {
            specifiers,
            declarators,
            span: self.span_from(start),
        }))
    }

    /// Declaration after its specifiers, inside a block.
    pub(super) fn parse_declaration_rest(
        &mut self,
        specifiers: DeclSpecifiers,
        start: Span,
    ) -> Declaration {
        if self.consume_symbol(";") {
            return Declaration {
                specifiers,
                declarators: Vec::new(),
                span: self.span_from(start),
            };
        }
        let declarators = self.parse_init_declarators(&specifiers, None);
        Declaration {
            specifiers,
            declarators,
            span: self.span_from(start),
        }
    }

    fn parse_init_declarators(
        &mut self,
        specifiers: &DeclSpecifiers,
        first: Option<(Option<SpannedName>, QualType)>,
    ) -> Vec<InitDeclarator> {
        let is_typedef = specifiers.has_storage(StorageClass::Typedef);
        let mut declarators = Vec::new();
        let mut pending = first;
        loop {
            let decl_start = self.peek_span();
            let (name, ty) = match pending.take() {
                Some(parsed) => parsed,
                None => self
                    .parse_declarator(DeclaratorMode::Named)
                    .apply(specifiers.base.clone()),
            };
            let Some(name) = name else {
                self.emit_diag(DiagnosticKind::Syntax, "expected a declarator name", decl_start);
                self.recover_to_statement_end();
                return declarators;
            };
            let binding = if is_typedef {
                Binding::Typedef(ty.clone())
            } else {
                Binding::Ordinary(ty.clone())
            };
            self.env.declare(&name.name, binding);
            self.skip_attributes();
            let init = if self.consume_symbol("=") {
                self.parse_initializer()
            } else {
                None
            };
            declarators.push(InitDeclarator {
                span: name.span.merge(self.previous_span()),
                name,
                ty,
                init,
            });
            if !self.consume_symbol(",") {
                break;
            }
        }
        if !self.expect_symbol(";", "expected `;` after declaration") {
            self.recover_to_statement_end();
        }
        declarators
    }

    pub(super) fn parse_initializer(&mut self) -> Option<Initializer> {
        if !self.enter() {
            return None;
        }
        let init = self.parse_initializer_inner();
        self.leave();
        init
    }

    fn parse_initializer_inner(&mut self) -> Option<Initializer> {
        if !self.check_symbol("{") {
            return self.parse_assignment().map(Initializer::Expr);
        }
        let start = self.peek_span();
        self.pos += 1;
        let mut items = Vec::new();
        while !self.check_symbol("}") && !self.is_at_end() {
            let item_start = self.pos;
            let mut designators = Vec::new();
            loop {
                if self.consume_symbol(".") {
                    match self.consume_ident() {
                        Some(field) => designators.push(Designator::Field(field)),
                        None => {
                            let span = self.peek_span();
                            self.emit_diag(DiagnosticKind::Syntax, "expected member name", span);
                        }
                    }
                } else if self.consume_symbol("[") {
                    if let Some(index) = self.parse_conditional() {
                        designators.push(Designator::Index(index));
                    }
                    self.expect_symbol("]", "expected `]` in designator");
                } else {
                    break;
                }
            }
            if !designators.is_empty() {
                self.expect_symbol("=", "expected `=` after designator");
            }
            if let Some(value) = self.parse_initializer() {
                items.push(InitItem { designators, value });
            }
            if !self.consume_symbol(",") {
                break;
            }
            if self.pos == item_start {
                break;
            }
        }
        if !self.expect_symbol("}", "expected `}` to close initializer list") {
            self.recover_to_statement_end();
        }
        Some(Initializer::List {
            items,
            span: self.span_from(start),
        })
    }

    /// Declaration specifiers; `None` when the current token cannot start them.
    pub(super) fn parse_decl_specifiers(&mut self) -> Option<DeclSpecifiers> {
        let start = self.peek_span();
        let begin = self.pos;
        let mut storage = Vec::new();
        let mut function = Vec::new();
        let mut quals = Qualifiers::default();
        let mut basic = BasicSpecifiers::default();
        let mut other: Option<CType> = None;

        loop {
            self.skip_attributes();
            let Some(tok) = self.peek() else {
                break;
            };
            let kind = tok.kind;
            let text = tok.text.clone();
            let span = tok.span;
            match kind {
                TokenKind::Keyword => {
                    if let Some(kind) = StorageClass::from_keyword(&text) {
                        self.pos += 1;
                        storage.push(Spec {
                            kind,
                            spelling: SpannedName::new(text, span),
                        });
                    } else if let Some(kind) = FunctionSpecifier::from_keyword(&text) {
                        self.pos += 1;
                        function.push(Spec {
                            kind,
                            spelling: SpannedName::new(text, span),
                        });
                    } else if KEYWORDS_QUALIFIER.contains(&text.as_str()) {
                        self.pos += 1;
                        quals.apply_keyword(&text);
                    } else if matches!(text.as_str(), "struct" | "union" | "enum") {
                        self.pos += 1;
                        let tag = self.parse_tag_specifier(&text, span);
                        self.set_other_type(&mut other, &basic, CType::Tag(tag), span);
                    } else if matches!(text.as_str(), "typeof" | "typeof_unqual" | "__typeof__") {
                        self.pos += 1;
                        let ty = self.parse_typeof(text == "typeof_unqual", span);
                        self.set_other_type(&mut other, &basic, ty, span);
                    } else if KEYWORDS_TYPE.contains(&text.as_str()) {
                        self.pos += 1;
                        if other.is_some() {
                            self.emit_diag(
                                DiagnosticKind::Syntax,
                                "conflicting type specifiers",
                                span,
                            );
                        }
                        basic.add(&text);
                    } else {
                        break;
                    }
                }
                TokenKind::Ident => {
                    if other.is_some() || !basic.is_empty() {
                        break;
                    }
                    let Some(target) = self.env_typedef(&text) else {
                        break;
                    };
                    self.pos += 1;
                    other = Some(CType::Typedef {
                        name: SpannedName::new(text, span),
                        target: Some(Box::new(target)),
                    });
                }
                _ => break,
            }
        }

        if self.pos == begin {
            return None;
        }
        let ty = other.or_else(|| basic.finish()).unwrap_or(CType::Error);
        Some(DeclSpecifiers {
            storage,
            function,
            base: QualType::with_quals(ty, quals),
            span: self.span_from(start),
        })
    }

    fn env_typedef(&self, name: &str) -> Option<QualType> {
        use crate::disambiguate::TypeEnv;
        self.env.typedef_type(name)
    }

    fn set_other_type(
        &mut self,
        other: &mut Option<CType>,
        basic: &BasicSpecifiers,
        ty: CType,
        span: Span,
    ) {
        if other.is_some() || !basic.is_empty() {
            self.emit_diag(DiagnosticKind::Syntax, "conflicting type specifiers", span);
            return;
        }
        *other = Some(ty);
    }

    fn parse_tag_specifier(&mut self, keyword: &str, start: Span) -> TagSpec {
        let kind = match keyword {
            "struct" => TagKind::Struct,
            "union" => TagKind::Union,
            _ => TagKind::Enum,
        };
        let id = self.fresh_node_id();
        self.skip_attributes();
        let name = self.consume_ident();
        if kind == TagKind::Enum && self.consume_symbol(":") {
            // Fixed underlying type; it does not affect scoping.
            let _ = self.parse_decl_specifiers();
        }
        let body = if self.check_symbol("{") && self.enter() {
            self.pos += 1;
            let body = match kind {
                TagKind::Enum => TagBody::Enumerators(self.parse_enumerators()),
                TagKind::Struct | TagKind::Union => TagBody::Members(self.parse_members()),
            };
            self.leave();
            Some(body)
        } else {
            None
        };
        if name.is_none() && body.is_none() {
            self.emit_diag(
                DiagnosticKind::Syntax,
                format!("expected a name or a body after `{keyword}`"),
                start,
            );
        }
        TagSpec {
            id,
            kind,
            name,
            body,
            span: self.span_from(start),
        }
    }

    fn parse_members(&mut self) -> Vec<Member> {
        let mut members = Vec::new();
        while !self.check_symbol("}") && !self.is_at_end() {
            let start = self.peek_span();
            let Some(specifiers) = self.parse_decl_specifiers() else {
                self.emit_diag(DiagnosticKind::Syntax, "expected a member declaration", start);
                self.recover_to_statement_end();
                continue;
            };
            if self.consume_symbol(";") {
                members.push(Member {
                    name: None,
                    ty: specifiers.base,
                    bit_width: None,
                    span: self.span_from(start),
                });
                continue;
            }
            loop {
                let member_start = self.peek_span();
                let (name, ty) = if self.check_symbol(":") {
                    (None, specifiers.base.clone())
                } else {
                    self.parse_declarator(DeclaratorMode::Named)
                        .apply(specifiers.base.clone())
                };
                let bit_width = if self.consume_symbol(":") {
                    self.parse_conditional()
                } else {
                    None
                };
                members.push(Member {
                    name,
                    ty,
                    bit_width,
                    span: self.span_from(member_start),
                });
                if !self.consume_symbol(",") {
                    break;
                }
            }
            if !self.expect_symbol(";", "expected `;` after member declaration") {
                self.recover_to_statement_end();
            }
        }
        self.expect_symbol("}", "expected `}` to close member list");
        members
    }

    fn parse_enumerators(&mut self) -> Vec<Enumerator> {
        let mut enumerators = Vec::new();
        while !self.check_symbol("}") && !self.is_at_end() {
            let Some(name) = self.consume_ident() else {
                let span = self.peek_span();
                self.emit_diag(DiagnosticKind::Syntax, "expected an enumerator name", span);
                self.recover_to_statement_end();
                break;
            };
            let value = if self.consume_symbol("=") {
                self.parse_conditional()
            } else {
                None
            };
            self.env.declare(
                &name.name,
                Binding::Ordinary(QualType::new(CType::Basic(BasicType::Int))),
            );
            enumerators.push(Enumerator { name, value });
            if !self.consume_symbol(",") {
                break;
            }
        }
        self.expect_symbol("}", "expected `}` to close enumerator list");
        enumerators
    }

    fn parse_typeof(&mut self, unqual: bool, start: Span) -> CType {
        if !self.enter() {
            return CType::Error;
        }
        let ty = self.parse_typeof_operand(unqual, start);
        self.leave();
        ty
    }

    fn parse_typeof_operand(&mut self, unqual: bool, start: Span) -> CType {
        if !self.expect_symbol("(", "expected `(` after `typeof`") {
            return CType::Error;
        }
        let operand = if self.starts_type_name_at(self.pos) {
            self.parse_type_name()
                .map(|type_name| TypeofOperand::Type(Box::new(type_name)))
        } else {
            self.parse_expr()
                .map(|expr| TypeofOperand::Expr(Box::new(expr)))
        };
        self.expect_symbol(")", "expected `)` to close `typeof`");
        match operand {
            Some(operand) => CType::Typeof {
                operand,
                unqual,
                span: self.span_from(start),
            },
            None => CType::Error,
        }
    }

    pub(super) fn parse_type_name(&mut self) -> Option<TypeName> {
        let start = self.peek_span();
        let specifiers = self.parse_decl_specifiers()?;
        let (_, ty) = self
            .parse_declarator(DeclaratorMode::Abstract)
            .apply(specifiers.base.clone());
        Some(TypeName {
            specifiers,
            ty,
            span: self.span_from(start),
        })
    }

    fn parse_declarator(&mut self, mode: DeclaratorMode) -> DeclaratorParts {
        if !self.enter() {
            return DeclaratorParts::default();
        }
        let parts = self.parse_declarator_parts(mode);
        self.leave();
        parts
    }

    /// Every pointer and suffix derivation counts as one nesting level, since the type built from
    /// them is as deep as the count.
    fn parse_declarator_parts(&mut self, mode: DeclaratorMode) -> DeclaratorParts {
        let depth = self.depth;
        let parts = self.parse_derivations(mode);
        self.depth = depth;
        parts
    }

    fn parse_derivations(&mut self, mode: DeclaratorMode) -> DeclaratorParts {
        let mut pointers = Vec::new();
        while self.check_symbol("*") {
            if !self.enter() {
                break;
            }
            self.pos += 1;
            let mut quals = Qualifiers::default();
            loop {
                self.skip_attributes();
                let Some(tok) = self.peek() else {
                    break;
                };
                if tok.kind == TokenKind::Keyword && quals.apply_keyword(&tok.text.clone()) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            pointers.push(quals);
        }

        let mut name = None;
        let mut inner = None;
        if mode != DeclaratorMode::Abstract && self.peek_ident().is_some() {
            name = self.consume_ident();
        } else if self.check_symbol("(") && self.is_nested_declarator(mode) {
            self.pos += 1;
            inner = Some(Box::new(self.parse_declarator(mode)));
            self.expect_symbol(")", "expected `)` in declarator");
        }
        self.skip_attributes();

        let mut suffixes = Vec::new();
        loop {
            let continues = (self.check_symbol("[") && !self.check_symbol_at(1, "["))
                || self.check_symbol("(");
            if !continues || !self.enter() {
                break;
            }
            if self.check_symbol("[") && !self.check_symbol_at(1, "[") {
                self.pos += 1;
                suffixes.push(Suffix::Array(self.parse_array_len()));
            } else if self.consume_symbol("(") {
                let (params, variadic) = self.parse_param_list();
                suffixes.push(Suffix::Function { params, variadic });
            } else {
                break;
            }
        }
        DeclaratorParts {
            name,
            pointers,
            inner,
            suffixes,
        }
    }

    /// At `(` inside a declarator: a parenthesized declarator rather than a parameter list.
    fn is_nested_declarator(&self, mode: DeclaratorMode) -> bool {
        let Some(next) = self.peek_at(1) else {
            return false;
        };
        if next.is_punct("*") || next.is_punct("(") {
            return true;
        }
        if next.is_punct("[") {
            return mode == DeclaratorMode::Abstract && !self.check_symbol_at(2, "[");
        }
        mode != DeclaratorMode::Abstract
            && next.kind == TokenKind::Ident
            && !self.env.is_typedef_name(&next.text)
    }

    fn parse_array_len(&mut self) -> ArrayLen {
        while let Some(tok) = self.peek() {
            let skip = tok.kind == TokenKind::Keyword
                && (tok.text == "static" || KEYWORDS_QUALIFIER.contains(&tok.text.as_str()));
            if !skip {
                break;
            }
            self.pos += 1;
        }
        if self.consume_symbol("]") {
            return ArrayLen::Unspecified;
        }
        if self.check_symbol("*") && self.check_symbol_at(1, "]") {
            self.pos += 2;
            return ArrayLen::Star;
        }
        let len = self.parse_assignment();
        if !self.expect_symbol("]", "expected `]` after array length") {
            self.recover_to_statement_end();
        }
        match len {
            Some(expr) => ArrayLen::Expr(Box::new(expr)),
            None => ArrayLen::Unspecified,
        }
    }

    /// Parameter list after its `(`. Parameters are visible to later parameters of the same list.
    fn parse_param_list(&mut self) -> (Vec<ParamDecl>, bool) {
        let mut params = Vec::new();
        let mut variadic = false;
        if self.consume_symbol(")") {
            return (params, false);
        }
        if self.check_keyword("void") && self.check_symbol_at(1, ")") {
            self.pos += 2;
            return (params, false);
        }
        self.env.push();
        loop {
            if self.consume_symbol("...") {
                variadic = true;
                break;
            }
            let start = self.peek_span();
            let Some(specifiers) = self.parse_decl_specifiers() else {
                self.emit_diag(DiagnosticKind::Syntax, "expected a parameter declaration", start);
                self.skip_to_param_end();
                if self.consume_symbol(",") {
                    continue;
                }
                break;
            };
            let is_register = specifiers.has_storage(StorageClass::Register);
            let (name, ty) = self
                .parse_declarator(DeclaratorMode::Either)
                .apply(specifiers.base.clone());
            if let Some(name) = &name {
                self.env.declare(&name.name, Binding::Ordinary(ty.clone()));
            }
            params.push(ParamDecl {
                name,
                ty,
                is_register,
                span: self.span_from(start),
            });
            if !self.consume_symbol(",") {
                break;
            }
        }
        self.env.pop();
        if !self.expect_symbol(")", "expected `)` to close parameter list") {
            self.skip_to_param_end();
            self.consume_symbol(")");
        }
        (params, variadic)
    }

    fn skip_to_param_end(&mut self) {
        let mut depth = 0usize;
        while let Some(tok) = self.peek() {
            if tok.is_punct("(") {
                depth += 1;
            } else if tok.is_punct(")") {
                if depth == 0 {
                    return;
                }
                depth -= 1;
            } else if (tok.is_punct(",") && depth == 0) || tok.is_punct(";") || tok.is_punct("{") {
                return;
            }
            self.pos += 1;
        }
    }
}
