use litfn_base::{Span, SpannedName};
use serde::Serialize;

use crate::lexer::Token;
use crate::types::{FunctionType, ParamDecl, QualType};

/// Parser-assigned identity for nodes the analysis must recognise when they are reached more than
/// once (tag specifiers copied into several declarators, literal functions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationUnit {
    pub path: String,
    pub items: Vec<ExternalDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExternalDecl {
    Function(FunctionDef),
    Declaration(Declaration),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDef {
    pub specifiers: DeclSpecifiers,
    pub name: SpannedName,
    pub signature: FunctionType,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StorageClass {
    Auto,
    Constexpr,
    Extern,
    Register,
    Static,
    ThreadLocal,
    Typedef,
}

impl StorageClass {
    pub fn from_keyword(text: &str) -> Option<Self> {
        Some(match text {
            "auto" => StorageClass::Auto,
            "constexpr" => StorageClass::Constexpr,
            "extern" => StorageClass::Extern,
            "register" => StorageClass::Register,
            "static" => StorageClass::Static,
            "thread_local" | "_Thread_local" => StorageClass::ThreadLocal,
            "typedef" => StorageClass::Typedef,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FunctionSpecifier {
    Inline,
    Noreturn,
}

impl FunctionSpecifier {
    pub fn from_keyword(text: &str) -> Option<Self> {
        match text {
            "inline" => Some(FunctionSpecifier::Inline),
            "_Noreturn" => Some(FunctionSpecifier::Noreturn),
            _ => None,
        }
    }
}

/// A specifier keyword as spelled in the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spec<K> {
    pub kind: K,
    pub spelling: SpannedName,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclSpecifiers {
    pub storage: Vec<Spec<StorageClass>>,
    pub function: Vec<Spec<FunctionSpecifier>>,
    /// Type named by the type specifiers and qualifiers, before any declarator.
    pub base: QualType,
    pub span: Span,
}

impl DeclSpecifiers {
    pub fn has_storage(&self, class: StorageClass) -> bool {
        self.storage.iter().any(|spec| spec.kind == class)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub specifiers: DeclSpecifiers,
    pub declarators: Vec<InitDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitDeclarator {
    pub name: SpannedName,
    pub ty: QualType,
    pub init: Option<Initializer>,
    pub span: Span,
}

/// Parenthesized type-name: specifiers plus an abstract declarator. Parameter names are kept so a
/// literal function's body can refer to them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeName {
    pub specifiers: DeclSpecifiers,
    pub ty: QualType,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Initializer {
    Expr(Expr),
    List { items: Vec<InitItem>, span: Span },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitItem {
    pub designators: Vec<Designator>,
    pub value: Initializer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Designator {
    Field(SpannedName),
    Index(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ForInit {
    Declaration(Declaration),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    Declaration(Declaration),
    Expr {
        expr: Expr,
        span: Span,
    },
    Block(Block),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
        span: Span,
    },
    For {
        init: Option<ForInit>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
        span: Span,
    },
    Switch {
        cond: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    Case {
        value: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    Default {
        body: Box<Stmt>,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Break(Span),
    Continue(Span),
    Goto {
        label: SpannedName,
        span: Span,
    },
    Labeled {
        label: SpannedName,
        body: Box<Stmt>,
        span: Span,
    },
    Empty(Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Declaration(decl) => decl.span,
            Stmt::Block(block) => block.span,
            Stmt::Expr { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::Case { span, .. }
            | Stmt::Default { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Goto { span, .. }
            | Stmt::Labeled { span, .. } => *span,
            Stmt::Break(span) | Stmt::Continue(span) | Stmt::Empty(span) => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    BitNot,
    Deref,
    AddrOf,
    PreInc,
    PreDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostfixOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntrospectOp {
    Sizeof,
    Alignof,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IntrospectOperand {
    Expr(Box<Expr>),
    Type(Box<TypeName>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Ident(SpannedName),
    IntLit {
        value: u64,
        span: Span,
    },
    FloatLit {
        text: String,
        span: Span,
    },
    CharLit {
        text: String,
        span: Span,
    },
    StringLit {
        text: String,
        span: Span,
    },
    Bool {
        value: bool,
        span: Span,
    },
    Nullptr(Span),
    /// `__func__`
    FuncName(Span),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Postfix {
        op: PostfixOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    /// `target = value`, or `target op= value` when `op` is set.
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        span: Span,
    },
    Comma {
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Member {
        base: Box<Expr>,
        field: SpannedName,
        arrow: bool,
        span: Span,
    },
    Cast {
        ty: Box<TypeName>,
        expr: Box<Expr>,
        span: Span,
    },
    Introspect {
        op: IntrospectOp,
        operand: IntrospectOperand,
        span: Span,
    },
    CompoundLiteral {
        ty: Box<TypeName>,
        init: Box<Initializer>,
        span: Span,
    },
    LiteralFunction(Box<LiteralFunctionExpr>),
    Error(Span),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(name) => name.span,
            Expr::IntLit { span, .. }
            | Expr::FloatLit { span, .. }
            | Expr::CharLit { span, .. }
            | Expr::StringLit { span, .. }
            | Expr::Bool { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Postfix { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::Comma { span, .. }
            | Expr::Call { span, .. }
            | Expr::Index { span, .. }
            | Expr::Member { span, .. }
            | Expr::Cast { span, .. }
            | Expr::Introspect { span, .. }
            | Expr::CompoundLiteral { span, .. } => *span,
            Expr::Nullptr(span) | Expr::FuncName(span) | Expr::Error(span) => *span,
            Expr::LiteralFunction(literal) => literal.span,
        }
    }
}

/// `( function-type-name ) compound-statement`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiteralFunctionExpr {
    pub id: NodeId,
    /// The type-name as written, specifiers included.
    pub type_name: TypeName,
    /// Function type the type-name denotes, after looking through typedef names and `typeof`.
    pub signature: FunctionType,
    pub body: Block,
    /// Tokens from the opening parenthesis of the type-name to the closing brace of the body.
    pub tokens: Vec<Token>,
    pub span: Span,
}

impl LiteralFunctionExpr {
    pub fn return_type(&self) -> &QualType {
        &self.signature.ret
    }

    pub fn params(&self) -> &[ParamDecl] {
        &self.signature.params
    }

    /// Whether the signature was spelled out in place rather than named through a typedef or
    /// `typeof`.
    pub fn has_inline_signature(&self) -> bool {
        matches!(&self.type_name.ty.ty, crate::types::CType::Function(_))
    }
}
