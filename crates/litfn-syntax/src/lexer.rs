use litfn_base::{Diagnostic, DiagnosticKind, Position, Span};
use serde::Serialize;

use crate::syntax::{is_keyword, PUNCTUATORS_1, PUNCTUATORS_2, PUNCTUATORS_3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Ident,
    Keyword,
    Number,
    Char,
    String,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == text
    }
}

struct Cursor {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
}

impl Cursor {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(offset, ch)| self.peek_at(offset) == Some(ch))
    }
}

/// Splits C source into tokens. Comments and preprocessor lines are dropped.
pub fn lex(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();
    let mut line_has_tokens = false;
    let mut last_line = 1;

    while let Some(ch) = cursor.peek() {
        if cursor.line != last_line {
            last_line = cursor.line;
            line_has_tokens = false;
        }
        if ch.is_whitespace() {
            cursor.bump();
            continue;
        }
        if cursor.starts_with("//") {
            while cursor.peek().is_some_and(|c| c != '\n') {
                cursor.bump();
            }
            continue;
        }
        if cursor.starts_with("/*") {
            let start = cursor.position();
            cursor.bump();
            cursor.bump();
            let mut closed = false;
            while cursor.peek().is_some() {
                if cursor.starts_with("*/") {
                    cursor.bump();
                    cursor.bump();
                    closed = true;
                    break;
                }
                cursor.bump();
            }
            if !closed {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Syntax,
                    "unterminated block comment",
                    Span::new(start, start),
                ));
            }
            continue;
        }
        if ch == '#' && !line_has_tokens {
            while cursor.peek().is_some_and(|c| c != '\n') {
                if cursor.starts_with("\\\n") {
                    cursor.bump();
                }
                cursor.bump();
            }
            continue;
        }

        line_has_tokens = true;
        let start = cursor.position();
        if ch.is_ascii_alphabetic() || ch == '_' {
            let mut text = String::new();
            while let Some(c) = cursor.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                text.push(c);
                cursor.bump();
            }
            if matches!(text.as_str(), "L" | "u" | "U" | "u8")
                && matches!(cursor.peek(), Some('"') | Some('\''))
            {
                let quote = cursor.peek().unwrap_or('"');
                let mut literal = text;
                lex_quoted(&mut cursor, quote, &mut literal, start, &mut diagnostics);
                let kind = if quote == '"' {
                    TokenKind::String
                } else {
                    TokenKind::Char
                };
                tokens.push(finish(kind, literal, start, &cursor));
                continue;
            }
            let kind = if is_keyword(&text) {
                TokenKind::Keyword
            } else {
                TokenKind::Ident
            };
            tokens.push(finish(kind, text, start, &cursor));
            continue;
        }
        if ch.is_ascii_digit() || (ch == '.' && cursor.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
        {
            let mut text = String::new();
            while let Some(c) = cursor.peek() {
                let exponent_sign = matches!(c, '+' | '-') && is_exponent_marker(&text);
                let separator = c == '\''
                    && cursor.peek_at(1).is_some_and(|next| next.is_ascii_alphanumeric());
                if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign || separator
                {
                    text.push(c);
                    cursor.bump();
                } else {
                    break;
                }
            }
            tokens.push(finish(TokenKind::Number, text, start, &cursor));
            continue;
        }
        if ch == '"' || ch == '\'' {
            let mut literal = String::new();
            lex_quoted(&mut cursor, ch, &mut literal, start, &mut diagnostics);
            let kind = if ch == '"' {
                TokenKind::String
            } else {
                TokenKind::Char
            };
            tokens.push(finish(kind, literal, start, &cursor));
            continue;
        }
        if let Some(punct) = PUNCTUATORS_3
            .iter()
            .chain(PUNCTUATORS_2.iter())
            .find(|punct| cursor.starts_with(punct))
        {
            for _ in 0..punct.chars().count() {
                cursor.bump();
            }
            tokens.push(finish(TokenKind::Punct, punct.to_string(), start, &cursor));
            continue;
        }
        if PUNCTUATORS_1.contains(&ch) {
            cursor.bump();
            tokens.push(finish(TokenKind::Punct, ch.to_string(), start, &cursor));
            continue;
        }
        cursor.bump();
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::Syntax,
            format!("unexpected character `{ch}`"),
            Span::new(start, start),
        ));
    }
    (tokens, diagnostics)
}

fn lex_quoted(
    cursor: &mut Cursor,
    quote: char,
    out: &mut String,
    start: Position,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(open) = cursor.bump() {
        out.push(open);
    }
    loop {
        match cursor.peek() {
            Some(c) if c == quote => {
                out.push(c);
                cursor.bump();
                return;
            }
            Some('\\') => {
                out.push('\\');
                cursor.bump();
                if let Some(escaped) = cursor.bump() {
                    out.push(escaped);
                }
            }
            Some('\n') | None => {
                let what = if quote == '"' { "string" } else { "character" };
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Syntax,
                    format!("unterminated {what} literal"),
                    Span::new(start, start),
                ));
                return;
            }
            Some(c) => {
                out.push(c);
                cursor.bump();
            }
        }
    }
}

fn finish(kind: TokenKind, text: String, start: Position, cursor: &Cursor) -> Token {
    let end = Position::new(cursor.line, cursor.column.saturating_sub(1).max(1));
    Token {
        kind,
        text,
        span: Span::new(start, end),
    }
}

fn is_exponent_marker(text: &str) -> bool {
    let hex = text.starts_with("0x") || text.starts_with("0X");
    match text.chars().last() {
        Some('e' | 'E') => !hex,
        Some('p' | 'P') => hex,
        _ => false,
    }
}
