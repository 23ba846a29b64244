//! Classification of `( type-name ) {` as a compound literal or a literal function.
//!
//! The decision is made once, from the category of the named type. Typedef names and `typeof`
//! are looked through with the help of a [`TypeEnv`], which the parser and the semantic scope tree
//! both provide.

use litfn_base::{Diagnostic, DiagnosticKind, SpannedName};
use serde::Serialize;

use crate::ast::{Expr, TypeName, UnaryOp};
use crate::types::{CType, FunctionType, QualType, TypeofOperand};

/// Ordinary-identifier view of the scope chain at the point of the type-name.
pub trait TypeEnv {
    /// Type named by `name` if it is a visible typedef name.
    fn typedef_type(&self, name: &str) -> Option<QualType>;
    /// Declared type of `name` if it is a visible object or function.
    fn object_type(&self, name: &str) -> Option<QualType>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeCategory {
    Function,
    Object,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Construct {
    CompoundLiteral,
    LiteralFunction,
    Ambiguous,
}

pub fn classify(type_name: &TypeName, env: &dyn TypeEnv) -> Construct {
    match type_category(&type_name.ty, env) {
        TypeCategory::Function => Construct::LiteralFunction,
        TypeCategory::Object => Construct::CompoundLiteral,
        TypeCategory::Unknown => Construct::Ambiguous,
    }
}

/// Classifies the type-name and checks the specifiers a literal function may not carry.
pub fn disambiguate(type_name: &TypeName, env: &dyn TypeEnv) -> Result<Construct, Vec<Diagnostic>> {
    match classify(type_name, env) {
        Construct::Ambiguous => Err(vec![type_category_error(type_name)]),
        Construct::LiteralFunction => {
            let diagnostics = unsupported_specifiers(type_name);
            if diagnostics.is_empty() {
                Ok(Construct::LiteralFunction)
            } else {
                Err(diagnostics)
            }
        }
        Construct::CompoundLiteral => Ok(Construct::CompoundLiteral),
    }
}

/// One diagnostic per storage-class or function specifier written on a literal function.
pub fn unsupported_specifiers(type_name: &TypeName) -> Vec<Diagnostic> {
    let storage = type_name
        .specifiers
        .storage
        .iter()
        .map(|spec| &spec.spelling);
    let function = type_name
        .specifiers
        .function
        .iter()
        .map(|spec| &spec.spelling);
    storage
        .chain(function)
        .map(|spelling| unsupported_specifier(spelling))
        .collect()
}

fn unsupported_specifier(spelling: &SpannedName) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::UnsupportedSpecifier,
        format!("`{}` is not allowed on a literal function", spelling.name),
        spelling.span,
    )
    .with_subject(spelling.name.clone())
}

pub fn type_category_error(type_name: &TypeName) -> Diagnostic {
    let diag = Diagnostic::new(
        DiagnosticKind::TypeCategoryError,
        "parenthesized type-name is neither a function type nor an object type",
        type_name.span,
    );
    match &type_name.ty.ty {
        CType::Typedef { name, target: None } => diag.with_subject(name.name.clone()),
        _ => diag,
    }
}

pub fn type_category(ty: &QualType, env: &dyn TypeEnv) -> TypeCategory {
    category_within(ty, env, LOOK_THROUGH_LIMIT)
}

/// Function type denoted by `ty`, looking through typedef names and `typeof`.
pub fn function_signature(ty: &QualType, env: &dyn TypeEnv) -> Option<FunctionType> {
    signature_within(ty, env, LOOK_THROUGH_LIMIT)
}

/// Typedef and `typeof` indirections followed before a type counts as malformed. Declarations
/// such as `typeof(x) x;` refer back to themselves through the environment.
const LOOK_THROUGH_LIMIT: u32 = 64;

fn category_within(ty: &QualType, env: &dyn TypeEnv, fuel: u32) -> TypeCategory {
    let Some(fuel) = fuel.checked_sub(1) else {
        return TypeCategory::Unknown;
    };
    match &ty.ty {
        CType::Function(_) => TypeCategory::Function,
        CType::Error => TypeCategory::Unknown,
        CType::Typedef { name, target } => match target {
            Some(target) => category_within(target, env, fuel),
            None => match env.typedef_type(&name.name) {
                Some(found) => category_within(&found, env, fuel),
                None => TypeCategory::Unknown,
            },
        },
        CType::Typeof { operand, .. } => match operand {
            TypeofOperand::Type(type_name) => category_within(&type_name.ty, env, fuel),
            TypeofOperand::Expr(expr) => expr_category(expr, env, fuel),
        },
        CType::Void | CType::Basic(_) | CType::Pointer(_) | CType::Array { .. } | CType::Tag(_) => {
            TypeCategory::Object
        }
    }
}

fn signature_within(ty: &QualType, env: &dyn TypeEnv, fuel: u32) -> Option<FunctionType> {
    let fuel = fuel.checked_sub(1)?;
    match &ty.ty {
        CType::Function(function) => Some(function.clone()),
        CType::Typedef { name, target } => match target {
            Some(target) => signature_within(target, env, fuel),
            None => signature_within(&env.typedef_type(&name.name)?, env, fuel),
        },
        CType::Typeof { operand, .. } => match operand {
            TypeofOperand::Type(type_name) => signature_within(&type_name.ty, env, fuel),
            TypeofOperand::Expr(expr) => {
                signature_within(&designator_type(expr, env, fuel)?, env, fuel)
            }
        },
        _ => None,
    }
}

fn expr_category(expr: &Expr, env: &dyn TypeEnv, fuel: u32) -> TypeCategory {
    match expr {
        Expr::LiteralFunction(_) => TypeCategory::Function,
        Expr::Ident(name) if env.object_type(&name.name).is_none() => TypeCategory::Unknown,
        Expr::Error(_) => TypeCategory::Unknown,
        _ => match designator_type(expr, env, fuel) {
            Some(ty) => category_within(&ty, env, fuel),
            None => TypeCategory::Object,
        },
    }
}

/// Type of an expression that may designate a function: an identifier or a chain of `*` applied
/// to one. Other expressions have object types.
fn designator_type(expr: &Expr, env: &dyn TypeEnv, fuel: u32) -> Option<QualType> {
    let fuel = fuel.checked_sub(1)?;
    match expr {
        Expr::Ident(name) => env.object_type(&name.name),
        Expr::LiteralFunction(literal) => Some(QualType::new(CType::Function(
            literal.signature.clone(),
        ))),
        Expr::Unary {
            op: UnaryOp::Deref,
            operand,
            ..
        } => {
            let inner = resolve_named(designator_type(operand, env, fuel)?, env, fuel)?;
            match inner.ty {
                CType::Pointer(pointee) => Some(*pointee),
                CType::Function(_) => Some(inner),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Looks through typedef names and `typeof` down to a structural type; `None` when the chain does
/// not end within `fuel` steps.
fn resolve_named(ty: QualType, env: &dyn TypeEnv, fuel: u32) -> Option<QualType> {
    let fuel = fuel.checked_sub(1)?;
    let next = match &ty.ty {
        CType::Typedef { target: None, name } => env.typedef_type(&name.name),
        CType::Typedef {
            target: Some(target),
            ..
        } => Some(target.as_ref().clone()),
        CType::Typeof {
            operand: TypeofOperand::Type(type_name),
            ..
        } => Some(type_name.ty.clone()),
        CType::Typeof {
            operand: TypeofOperand::Expr(expr),
            ..
        } => designator_type(expr, env, fuel),
        _ => None,
    };
    match next {
        Some(next) => resolve_named(next, env, fuel),
        None => Some(ty),
    }
}
