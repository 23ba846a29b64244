pub const KEYWORDS_STORAGE: &[&str] = &[
    "auto",
    "constexpr",
    "extern",
    "register",
    "static",
    "thread_local",
    "_Thread_local",
    "typedef",
];

pub const KEYWORDS_FUNCTION_SPECIFIER: &[&str] = &["inline", "_Noreturn"];

pub const KEYWORDS_QUALIFIER: &[&str] = &["const", "volatile", "restrict", "_Atomic"];

pub const KEYWORDS_TYPE: &[&str] = &[
    "void",
    "char",
    "short",
    "int",
    "long",
    "float",
    "double",
    "signed",
    "unsigned",
    "bool",
    "_Bool",
    "struct",
    "union",
    "enum",
    "typeof",
    "typeof_unqual",
    "__typeof__",
];

pub const KEYWORDS_STATEMENT: &[&str] = &[
    "if", "else", "while", "do", "for", "switch", "case", "default", "return", "break",
    "continue", "goto",
];

pub const KEYWORDS_EXPRESSION: &[&str] = &[
    "sizeof",
    "alignof",
    "_Alignof",
    "nullptr",
    "true",
    "false",
    "__func__",
];

pub const PUNCTUATORS_3: &[&str] = &["...", "<<=", ">>="];

pub const PUNCTUATORS_2: &[&str] = &[
    "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "*=", "/=", "%=", "+=",
    "-=", "&=", "^=", "|=", "##", "::",
];

pub const PUNCTUATORS_1: &[char] = &[
    '[', ']', '(', ')', '{', '}', '.', '&', '*', '+', '-', '~', '!', '/', '%', '<', '>', '^', '|',
    '?', ':', ';', '=', ',', '#',
];

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS_STORAGE.contains(&text)
        || KEYWORDS_FUNCTION_SPECIFIER.contains(&text)
        || KEYWORDS_QUALIFIER.contains(&text)
        || KEYWORDS_TYPE.contains(&text)
        || KEYWORDS_STATEMENT.contains(&text)
        || KEYWORDS_EXPRESSION.contains(&text)
}

/// Keywords that can begin declaration specifiers or a type-name.
pub fn is_declaration_keyword(text: &str) -> bool {
    KEYWORDS_STORAGE.contains(&text)
        || KEYWORDS_FUNCTION_SPECIFIER.contains(&text)
        || KEYWORDS_QUALIFIER.contains(&text)
        || KEYWORDS_TYPE.contains(&text)
}
