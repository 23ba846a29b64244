//! Folding of structurally identical literal functions.
//!
//! Two literals share an instance when their token streams agree after every identifier bound
//! inside the literal is replaced by a positional placeholder and every identifier bound outside
//! it by a key naming the declaration. Literals never fold across different declarations, and
//! literals declaring `static` or `thread_local` objects of their own get no key at all.

use std::fmt::Write as _;

use litfn_base::Position;
use litfn_syntax::ast::NodeId;
use litfn_syntax::{Token, TokenKind};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::report::ResolvedLiteral;
use crate::scope::{DeclId, FrameId, ScopeTree, TagId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LiteralRef {
    pub unit: UnitId,
    pub literal: NodeId,
}

/// What an identifier token resolved to during analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Decl(DeclId),
    Tag(TagId),
}

#[derive(Debug, Default)]
struct TableInner {
    next_unit: u32,
    entries: FxHashMap<String, LiteralRef>,
}

/// Instances seen so far, shared by every unit of a session.
#[derive(Debug, Default)]
pub struct InstanceTable {
    inner: Mutex<TableInner>,
}

impl InstanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_unit(&self) -> UnitId {
        let mut inner = self.inner.lock();
        let id = UnitId(inner.next_unit);
        inner.next_unit += 1;
        id
    }

    /// Canonical instance for `key`. The first literal offered for a key becomes canonical.
    pub fn fold(&self, key: &str, literal: LiteralRef) -> LiteralRef {
        let mut inner = self.inner.lock();
        *inner.entries.entry(key.to_string()).or_insert(literal)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Offers each foldable literal to `table`, in order, and records where it was folded.
pub fn fold_literals(table: &InstanceTable, unit: UnitId, literals: &mut [ResolvedLiteral]) {
    for literal in literals.iter_mut() {
        let Some(key) = &literal.instance_key else {
            continue;
        };
        let this = LiteralRef {
            unit,
            literal: literal.id,
        };
        let canonical = table.fold(key, this);
        if canonical != this {
            debug!(
                unit = unit.0,
                literal = literal.id.0,
                into_unit = canonical.unit.0,
                into = canonical.literal.0,
                "folded literal function"
            );
            literal.folded_into = Some(canonical);
        }
    }
}

/// How a declaration's name identifies it outside the literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Linkage {
    None,
    File,
    Block,
}

/// Instance key of the literal whose tokens are `tokens` and whose frame is `frame`.
pub fn instance_key(
    tokens: &[Token],
    symbols: &FxHashMap<Position, Symbol>,
    tree: &ScopeTree,
    frame: FrameId,
    unit: UnitId,
) -> String {
    let mut placeholders: FxHashMap<Symbol, usize> = FxHashMap::default();
    let mut key = String::new();
    for token in tokens {
        if !key.is_empty() {
            key.push(' ');
        }
        let symbol = match token.kind {
            TokenKind::Ident => symbols.get(&token.span.start).copied(),
            _ => None,
        };
        let Some(symbol) = symbol else {
            key.push_str(&token.text);
            continue;
        };
        let (inside, linkage) = match symbol {
            Symbol::Decl(id) => {
                let decl = tree.decl(id);
                let linkage = match (decl.external_linkage, decl.scope == tree.file_scope()) {
                    (false, _) => Linkage::None,
                    (true, true) => Linkage::File,
                    (true, false) => Linkage::Block,
                };
                (tree.frame_within(decl.frame, frame), linkage)
            }
            Symbol::Tag(id) => (tree.frame_within(tree.tag(id).frame, frame), Linkage::None),
        };
        match (symbol, linkage) {
            (_, Linkage::File) => key.push_str(&token.text),
            // A block-scope `extern` may name a file-scope `static`, so its name only identifies
            // the object within this unit.
            (_, Linkage::Block) => {
                let _ = write!(key, "@{}.{}", unit.0, token.text);
            }
            _ if inside => {
                let next = placeholders.len();
                let index = *placeholders.entry(symbol).or_insert(next);
                let _ = write!(key, "${index}");
            }
            (Symbol::Decl(id), _) => {
                let _ = write!(key, "@{}.{}", unit.0, id.0);
            }
            (Symbol::Tag(id), _) => {
                let _ = write!(key, "@{}.t{}", unit.0, id.0);
            }
        }
    }
    key
}
