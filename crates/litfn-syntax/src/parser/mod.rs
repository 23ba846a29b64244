mod declarations;
mod expressions;
mod statements;

use litfn_base::{Diagnostic, DiagnosticKind, FileDiagnostic, Position, Span, SpannedName};
use rustc_hash::FxHashMap;

use crate::ast::{ExternalDecl, NodeId, TranslationUnit};
use crate::disambiguate::TypeEnv;
use crate::lexer::{lex, Token, TokenKind};
use crate::syntax::is_declaration_keyword;
use crate::types::QualType;

/// Deepest expression, statement or declarator nesting the parser follows. The budget keeps the
/// parser and the walks over its tree within a 2 MiB thread stack.
const MAX_NESTING: u32 = 256;

/// Nesting levels charged for a literal function body, which the parser and the analyzer both
/// descend through many frames to reach.
const LITERAL_NESTING_COST: u32 = 8;

/// Lexes and parses one translation unit. Parsing always completes; problems are returned as
/// diagnostics next to a best-effort tree.
pub fn parse_unit(path: &str, source: &str) -> (TranslationUnit, Vec<FileDiagnostic>) {
    let (tokens, lex_diags) = lex(source);
    let mut parser = Parser::new(tokens);
    parser.diagnostics.extend(lex_diags);
    let items = parser.parse_translation_unit();
    let diagnostics = parser
        .diagnostics
        .into_iter()
        .map(|diagnostic| FileDiagnostic {
            path: path.to_string(),
            diagnostic,
        })
        .collect();
    (
        TranslationUnit {
            path: path.to_string(),
            items,
        },
        diagnostics,
    )
}

#[derive(Debug, Clone)]
enum Binding {
    Typedef(QualType),
    Ordinary(QualType),
}

/// Ordinary identifiers seen so far, enough to tell typedef names from other names and to answer
/// `typeof` questions during disambiguation.
#[derive(Debug, Default)]
struct ParseEnv {
    scopes: Vec<FxHashMap<String, Binding>>,
}

impl ParseEnv {
    fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn declare(&mut self, name: &str, binding: Binding) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), binding);
        }
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn is_typedef_name(&self, name: &str) -> bool {
        matches!(self.lookup(name), Some(Binding::Typedef(_)))
    }
}

impl TypeEnv for ParseEnv {
    fn typedef_type(&self, name: &str) -> Option<QualType> {
        match self.lookup(name)? {
            Binding::Typedef(ty) => Some(ty.clone()),
            Binding::Ordinary(_) => None,
        }
    }

    fn object_type(&self, name: &str) -> Option<QualType> {
        match self.lookup(name)? {
            Binding::Ordinary(ty) => Some(ty.clone()),
            Binding::Typedef(_) => None,
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    env: ParseEnv,
    next_node: u32,
    depth: u32,
    /// Set once the nesting limit abandons the input; later syntax errors are consequences of it.
    truncated: bool,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
            env: ParseEnv::new(),
            next_node: 0,
            depth: 0,
            truncated: false,
        }
    }

    fn parse_translation_unit(&mut self) -> Vec<ExternalDecl> {
        let mut items = Vec::new();
        while !self.is_at_end() {
            let start = self.pos;
            if self.consume_symbol(";") {
                continue;
            }
            if let Some(item) = self.parse_external_decl() {
                items.push(item);
            }
            if self.pos == start {
                self.recover_to_item();
            }
        }
        items
    }

    fn fresh_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn check_symbol(&self, symbol: &str) -> bool {
        self.peek().is_some_and(|tok| tok.is_punct(symbol))
    }

    fn check_symbol_at(&self, offset: usize, symbol: &str) -> bool {
        self.peek_at(offset).is_some_and(|tok| tok.is_punct(symbol))
    }

    fn consume_symbol(&mut self, symbol: &str) -> bool {
        if self.check_symbol(symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: &str, message: &str) -> bool {
        if self.consume_symbol(symbol) {
            return true;
        }
        let span = self.peek_span();
        self.emit_diag(DiagnosticKind::Syntax, message, span);
        false
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|tok| tok.is_keyword(keyword))
    }

    fn match_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek_ident(&self) -> Option<&str> {
        self.peek()
            .filter(|tok| tok.kind == TokenKind::Ident)
            .map(|tok| tok.text.as_str())
    }

    fn consume_ident(&mut self) -> Option<SpannedName> {
        let tok = self.peek().filter(|tok| tok.kind == TokenKind::Ident)?;
        let name = SpannedName::new(tok.text.clone(), tok.span);
        self.pos += 1;
        Some(name)
    }

    fn peek_span(&self) -> Span {
        match self.peek() {
            Some(tok) => tok.span,
            None => self.previous_span(),
        }
    }

    fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map(|tok| tok.span)
            .unwrap_or_else(|| Span::new(Position::new(1, 1), Position::new(1, 1)))
    }

    fn span_from(&self, start: Span) -> Span {
        start.merge(self.previous_span())
    }

    fn emit_diag(&mut self, kind: DiagnosticKind, message: impl Into<String>, span: Span) {
        if self.truncated && kind == DiagnosticKind::Syntax {
            return;
        }
        self.diagnostics.push(Diagnostic::new(kind, message, span));
    }

    /// Enters one nesting level. Past [`MAX_NESTING`] the rest of the input is abandoned with a
    /// single diagnostic.
    fn enter(&mut self) -> bool {
        self.enter_by(1)
    }

    fn enter_by(&mut self, levels: u32) -> bool {
        if self.depth + levels > MAX_NESTING {
            if !self.truncated {
                let span = self.peek_span();
                self.emit_diag(DiagnosticKind::Syntax, "nesting is too deep", span);
                self.truncated = true;
            }
            self.pos = self.tokens.len();
            return false;
        }
        self.depth += levels;
        true
    }

    fn leave(&mut self) {
        self.leave_by(1);
    }

    fn leave_by(&mut self, levels: u32) {
        self.depth = self.depth.saturating_sub(levels);
    }

    /// Whether the token at `index` can begin a type-name.
    fn starts_type_name_at(&self, index: usize) -> bool {
        let Some(tok) = self.tokens.get(index) else {
            return false;
        };
        match tok.kind {
            TokenKind::Keyword => is_declaration_keyword(&tok.text),
            TokenKind::Ident => self.env.is_typedef_name(&tok.text),
            _ => false,
        }
    }

    fn starts_declaration(&self) -> bool {
        if self.peek().is_some_and(|tok| tok.kind == TokenKind::Ident) && self.check_symbol_at(1, ":")
        {
            return false;
        }
        self.starts_type_name_at(self.pos)
    }

    /// Skips `[[ ... ]]` attribute specifiers.
    fn skip_attributes(&mut self) {
        while self.check_symbol("[") && self.check_symbol_at(1, "[") {
            self.pos += 2;
            let mut depth = 2usize;
            while let Some(tok) = self.peek() {
                if tok.is_punct("[") {
                    depth += 1;
                } else if tok.is_punct("]") {
                    depth -= 1;
                }
                self.pos += 1;
                if depth == 0 {
                    break;
                }
            }
        }
    }

    /// Skips a balanced `{ ... }` group starting at the current `{`.
    fn skip_braces(&mut self) {
        let mut depth = 0usize;
        while let Some(tok) = self.peek() {
            if tok.is_punct("{") {
                depth += 1;
            } else if tok.is_punct("}") {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    self.pos += 1;
                    return;
                }
            }
            self.pos += 1;
        }
    }

    /// Advances past the next `;` at the current nesting level, or up to a closing `}`.
    fn recover_to_statement_end(&mut self) {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(tok) = self.peek() {
            if tok.is_punct("(") || tok.is_punct("[") || tok.is_punct("{") {
                depth += 1;
            } else if tok.is_punct(")") || tok.is_punct("]") || tok.is_punct("}") {
                if depth == 0 {
                    if tok.is_punct("}") {
                        break;
                    }
                } else {
                    depth -= 1;
                }
            } else if tok.is_punct(";") && depth == 0 {
                self.pos += 1;
                return;
            }
            self.pos += 1;
        }
        if self.pos == start && !self.is_at_end() && !self.check_symbol("}") {
            self.pos += 1;
        }
    }

    fn recover_to_item(&mut self) {
        let start = self.pos;
        self.recover_to_statement_end();
        if self.pos == start && !self.is_at_end() {
            self.pos += 1;
        }
    }
}
