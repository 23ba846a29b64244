use std::fmt;

use litfn_base::{Span, SpannedName};
use serde::Serialize;

use crate::ast::{Expr, NodeId, TypeName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_restrict: bool,
    pub is_atomic: bool,
}

impl Qualifiers {
    pub fn apply_keyword(&mut self, keyword: &str) -> bool {
        match keyword {
            "const" => self.is_const = true,
            "volatile" => self.is_volatile = true,
            "restrict" => self.is_restrict = true,
            "_Atomic" => self.is_atomic = true,
            _ => return false,
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        !(self.is_const || self.is_volatile || self.is_restrict || self.is_atomic)
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.is_const {
            parts.push("const");
        }
        if self.is_volatile {
            parts.push("volatile");
        }
        if self.is_restrict {
            parts.push("restrict");
        }
        if self.is_atomic {
            parts.push("_Atomic");
        }
        write!(f, "{}", parts.join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BasicType {
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
}

impl BasicType {
    pub fn spelling(self) -> &'static str {
        match self {
            BasicType::Bool => "bool",
            BasicType::Char => "char",
            BasicType::SignedChar => "signed char",
            BasicType::UnsignedChar => "unsigned char",
            BasicType::Short => "short",
            BasicType::UnsignedShort => "unsigned short",
            BasicType::Int => "int",
            BasicType::UnsignedInt => "unsigned int",
            BasicType::Long => "long",
            BasicType::UnsignedLong => "unsigned long",
            BasicType::LongLong => "long long",
            BasicType::UnsignedLongLong => "unsigned long long",
            BasicType::Float => "float",
            BasicType::Double => "double",
            BasicType::LongDouble => "long double",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TagKind {
    Struct,
    Union,
    Enum,
}

impl TagKind {
    pub fn keyword(self) -> &'static str {
        match self {
            TagKind::Struct => "struct",
            TagKind::Union => "union",
            TagKind::Enum => "enum",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub name: Option<SpannedName>,
    pub ty: QualType,
    pub bit_width: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enumerator {
    pub name: SpannedName,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TagBody {
    Members(Vec<Member>),
    Enumerators(Vec<Enumerator>),
}

/// `struct`/`union`/`enum` specifier. `body` is present only when the specifier defines the tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagSpec {
    pub id: NodeId,
    pub kind: TagKind,
    pub name: Option<SpannedName>,
    pub body: Option<TagBody>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ArrayLen {
    Unspecified,
    /// `[*]`
    Star,
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDecl {
    pub name: Option<SpannedName>,
    pub ty: QualType,
    pub is_register: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionType {
    pub ret: Box<QualType>,
    pub params: Vec<ParamDecl>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeofOperand {
    Expr(Box<Expr>),
    Type(Box<TypeName>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CType {
    Void,
    Basic(BasicType),
    Pointer(Box<QualType>),
    Array {
        elem: Box<QualType>,
        len: ArrayLen,
    },
    Function(FunctionType),
    Tag(TagSpec),
    /// Typedef name; `target` is the type it named where it was parsed, `None` when the name was
    /// not declared.
    Typedef {
        name: SpannedName,
        target: Option<Box<QualType>>,
    },
    Typeof {
        operand: TypeofOperand,
        unqual: bool,
        span: Span,
    },
    /// Missing or malformed type specifier.
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualType {
    pub ty: CType,
    pub quals: Qualifiers,
}

impl QualType {
    pub fn new(ty: CType) -> Self {
        Self {
            ty,
            quals: Qualifiers::default(),
        }
    }

    pub fn with_quals(ty: CType, quals: Qualifiers) -> Self {
        Self { ty, quals }
    }

    pub fn error() -> Self {
        Self::new(CType::Error)
    }

    /// Looks through typedef names that were resolved at parse time. Qualifiers of the outer name
    /// are merged into the result.
    pub fn strip_typedefs(&self) -> QualType {
        match &self.ty {
            CType::Typedef {
                target: Some(target),
                ..
            } => {
                let mut inner = target.strip_typedefs();
                inner.quals.is_const |= self.quals.is_const;
                inner.quals.is_volatile |= self.quals.is_volatile;
                inner.quals.is_restrict |= self.quals.is_restrict;
                inner.quals.is_atomic |= self.quals.is_atomic;
                inner
            }
            _ => self.clone(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.strip_typedefs().ty, CType::Array { .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(self.strip_typedefs().ty, CType::Function(_))
    }

    /// Parameter adjustment: arrays become pointers to their element type and functions become
    /// pointers to functions.
    pub fn adjust_parameter(&self) -> QualType {
        let stripped = self.strip_typedefs();
        match stripped.ty {
            CType::Array { elem, .. } => QualType::with_quals(CType::Pointer(elem), stripped.quals),
            CType::Function(_) => QualType::new(CType::Pointer(Box::new(stripped))),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for QualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render_declaration(self, ""))
    }
}

/// Renders `ty` as a C declaration of `name` (an empty name gives a type-name).
pub fn render_declaration(ty: &QualType, name: &str) -> String {
    let (base, declarator) = split_declarator(ty, name.to_string());
    let declarator = declarator.trim().to_string();
    if declarator.is_empty() {
        base
    } else {
        format!("{base} {declarator}")
    }
}

fn split_declarator(ty: &QualType, inner: String) -> (String, String) {
    match &ty.ty {
        CType::Pointer(pointee) => {
            let quals = if ty.quals.is_empty() {
                String::new()
            } else {
                format!(" {}", ty.quals)
            };
            let declarator = format!("*{}{}", quals.trim_start(), prefix_space(&quals, &inner));
            let needs_parens = matches!(pointee.ty, CType::Array { .. } | CType::Function(_));
            let declarator = if needs_parens {
                format!("({declarator})")
            } else {
                declarator
            };
            split_declarator(pointee, declarator)
        }
        CType::Array { elem, len } => {
            let len = match len {
                ArrayLen::Unspecified => String::new(),
                ArrayLen::Star => "*".to_string(),
                ArrayLen::Expr(expr) => render_expr_brief(expr),
            };
            split_declarator(elem, format!("{inner}[{len}]"))
        }
        CType::Function(function) => {
            let mut params: Vec<String> = function
                .params
                .iter()
                .map(|param| {
                    let name = param
                        .name
                        .as_ref()
                        .map(|name| name.name.as_str())
                        .unwrap_or("");
                    render_declaration(&param.ty, name)
                })
                .collect();
            if function.variadic {
                params.push("...".to_string());
            }
            if params.is_empty() {
                params.push("void".to_string());
            }
            split_declarator(&function.ret, format!("{inner}({})", params.join(", ")))
        }
        _ => {
            let base = base_spelling(ty);
            (base, inner)
        }
    }
}

fn prefix_space(quals: &str, inner: &str) -> String {
    if !quals.is_empty() && !inner.is_empty() {
        format!(" {inner}")
    } else {
        inner.to_string()
    }
}

fn base_spelling(ty: &QualType) -> String {
    let base = match &ty.ty {
        CType::Void => "void".to_string(),
        CType::Basic(basic) => basic.spelling().to_string(),
        CType::Tag(tag) => match &tag.name {
            Some(name) => format!("{} {}", tag.kind.keyword(), name.name),
            None => format!("{} <anonymous>", tag.kind.keyword()),
        },
        CType::Typedef { name, .. } => name.name.clone(),
        CType::Typeof { unqual, .. } => {
            if *unqual {
                "typeof_unqual(...)".to_string()
            } else {
                "typeof(...)".to_string()
            }
        }
        CType::Error => "<error>".to_string(),
        CType::Pointer(_) | CType::Array { .. } | CType::Function(_) => String::new(),
    };
    if ty.quals.is_empty() {
        base
    } else {
        format!("{} {base}", ty.quals)
    }
}

fn render_expr_brief(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.name.clone(),
        Expr::IntLit { value, .. } => value.to_string(),
        _ => "expr".to_string(),
    }
}
