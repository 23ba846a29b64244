#![deny(clippy::unwrap_used)]
//! C-subset surface for literal functions: lexer, syntax tree, type model, parser and the
//! compound-literal / literal-function classifier.

pub mod ast;
mod disambiguate;
mod lexer;
mod parser;
pub mod syntax;
pub mod types;

#[cfg(test)]
mod parser_tests;

pub use disambiguate::{
    classify, disambiguate, function_signature, type_category, type_category_error,
    unsupported_specifiers, Construct, TypeCategory, TypeEnv,
};
pub use lexer::{lex, Token, TokenKind};
pub use parser::parse_unit;
