//! Which references may cross a literal-function boundary.
//!
//! Variably modified declarations are rejected before the table is consulted; the table only sees
//! declarations whose type carries no runtime bound.

use serde::{Deserialize, Serialize};

use crate::scope::{DeclKind, Declaration, Storage};

/// How an identifier occurrence uses its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Usage {
    Read,
    Write,
    AddressOf,
    SizeofOrTypeofOnly,
    Call,
}

impl Usage {
    pub const ALL: [Usage; 5] = [
        Usage::Read,
        Usage::Write,
        Usage::AddressOf,
        Usage::SizeofOrTypeofOnly,
        Usage::Call,
    ];

    pub fn describe(self) -> &'static str {
        match self {
            Usage::Read => "read",
            Usage::Write => "write",
            Usage::AddressOf => "address-of",
            Usage::SizeofOrTypeofOnly => "sizeof/typeof",
            Usage::Call => "call",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeclClass {
    FunctionDesignator,
    EnumConstant,
    /// Static or thread storage duration, file scope included.
    StaticObject,
    ConstexprObject,
    /// `register` object of `const`-qualified type.
    RegisterConstant,
    /// Any other automatic object, `const` ones included.
    AutomaticObject,
    Typedef,
}

impl DeclClass {
    pub const ALL: [DeclClass; 7] = [
        DeclClass::FunctionDesignator,
        DeclClass::EnumConstant,
        DeclClass::StaticObject,
        DeclClass::ConstexprObject,
        DeclClass::RegisterConstant,
        DeclClass::AutomaticObject,
        DeclClass::Typedef,
    ];

    pub fn of(decl: &Declaration) -> DeclClass {
        match decl.kind {
            DeclKind::Function => DeclClass::FunctionDesignator,
            DeclKind::EnumConstant => DeclClass::EnumConstant,
            DeclKind::Typedef => DeclClass::Typedef,
            DeclKind::Object => match decl.storage {
                Storage::Static | Storage::Thread | Storage::None => DeclClass::StaticObject,
                Storage::Automatic if decl.is_constexpr => DeclClass::ConstexprObject,
                Storage::Automatic if decl.is_register && decl.is_constant => {
                    DeclClass::RegisterConstant
                }
                Storage::Automatic => DeclClass::AutomaticObject,
            },
        }
    }
}

/// Treatment of `register` constants, whose eligibility is currently unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterPolicy {
    Allow,
    #[default]
    Warn,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Allow,
    /// Allowed, with a `RegisterConstantCapture` warning.
    Warn,
    Deny,
}

/// Capture rule table. Reads of constants are allowed, as long as they take no address.
pub fn verdict(class: DeclClass, usage: Usage, register_policy: RegisterPolicy) -> Verdict {
    use DeclClass as C;
    use Usage as U;
    match (class, usage) {
        (C::FunctionDesignator | C::EnumConstant | C::StaticObject | C::Typedef, _) => {
            Verdict::Allow
        }
        (_, U::SizeofOrTypeofOnly) => Verdict::Allow,
        (C::ConstexprObject, U::Read | U::Call) => Verdict::Allow,
        (C::RegisterConstant, U::Read | U::Call) => match register_policy {
            RegisterPolicy::Allow => Verdict::Allow,
            RegisterPolicy::Warn => Verdict::Warn,
            RegisterPolicy::Deny => Verdict::Deny,
        },
        (C::ConstexprObject | C::RegisterConstant, U::Write | U::AddressOf) => Verdict::Deny,
        (C::AutomaticObject, U::Read | U::Write | U::AddressOf | U::Call) => Verdict::Deny,
    }
}
