#![no_main]
//! Fuzz target: parse + scope construction + capture validation.
//!
//! Invariants checked:
//! - Analysis never panics, whatever the parser recovered.
//! - Without syntax errors, a literal reported valid has no scope or
//!   capture error inside its span.
//! - Folded literals point at a literal that was not itself folded.

use libfuzzer_sys::fuzz_target;
use litfn_base::DiagnosticKind;
use litfn_sema::Session;

fuzz_target!(|data: &[u8]| {
    if data.len() > 32 * 1024 {
        return;
    }
    let src = String::from_utf8_lossy(data);
    let session = Session::default();
    let first = session.check_source("fuzz.c", &src);
    let recovered = first
        .diagnostics
        .iter()
        .any(|diag| diag.diagnostic.kind == DiagnosticKind::Syntax);

    for literal in &first.literals {
        if literal.valid && !recovered {
            let inside = first.diagnostics.iter().any(|diag| {
                let start = diag.diagnostic.span.start;
                let semantic = matches!(
                    diag.diagnostic.kind,
                    DiagnosticKind::IllegalCapture
                        | DiagnosticKind::UndeclaredIdentifier
                        | DiagnosticKind::UndefinedLabel
                );
                semantic
                    && diag.diagnostic.is_error()
                    && literal.span.start <= start
                    && start <= literal.span.end
            });
            assert!(!inside, "valid literal with an error inside: {literal:?}");
        }
        if let Some(target) = literal.folded_into {
            let canonical = first
                .literal(target.literal)
                .expect("folded into a literal of this unit");
            assert!(canonical.folded_into.is_none());
        }
    }

    // A second unit with the same text folds onto the first.
    let second = session.check_source("fuzz2.c", &src);
    assert_eq!(first.literals.len(), second.literals.len());
});
