use crate::diagnostics::{Diagnostic, DiagnosticSeverity, Span};

// ANSI color codes
const RED: &str = "\x1b[1;31m";
const YELLOW: &str = "\x1b[1;33m";
const CYAN: &str = "\x1b[1;36m";
const DARK_GRAY: &str = "\x1b[90m";
const WHITE: &str = "\x1b[97m";
const ORANGE: &str = "\x1b[38;5;208m";
const RESET: &str = "\x1b[0m";

/// Renders diagnostics with source frames. `source` is the text the spans point into; frames are
/// skipped when it is not available.
pub fn render_diagnostics(
    path: &str,
    source: Option<&str>,
    diagnostics: &[Diagnostic],
    use_color: bool,
) -> String {
    let mut output = String::new();
    for (index, diagnostic) in diagnostics.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }
        output.push_str(&render_diagnostic_with_source(
            path, diagnostic, source, use_color,
        ));
    }
    output
}

/// One line per diagnostic, sorted by position: `path:line:col code severity message`.
pub fn render_diagnostic_summary(path: &str, diagnostics: &[Diagnostic]) -> String {
    let mut sorted: Vec<&Diagnostic> = diagnostics.iter().collect();
    sorted.sort_by_key(|diag| (diag.span.start, diag.code.clone()));
    sorted
        .iter()
        .map(|diag| {
            format!(
                "{}:{}:{} {} {} {}",
                path,
                diag.span.start.line,
                diag.span.start.column,
                diag.code,
                severity_label(diag.severity),
                diag.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn severity_label(severity: DiagnosticSeverity) -> &'static str {
    match severity {
        DiagnosticSeverity::Error => "error",
        DiagnosticSeverity::Warning => "warning",
    }
}

fn caret_color(severity: DiagnosticSeverity) -> &'static str {
    match severity {
        DiagnosticSeverity::Error => RED,
        DiagnosticSeverity::Warning => YELLOW,
    }
}

fn caret_message_color(severity: DiagnosticSeverity) -> &'static str {
    match severity {
        DiagnosticSeverity::Error => ORANGE,
        DiagnosticSeverity::Warning => YELLOW,
    }
}

fn render_diagnostic_with_source(
    path: &str,
    diagnostic: &Diagnostic,
    source: Option<&str>,
    use_color: bool,
) -> String {
    let mut output = String::new();
    let start = &diagnostic.span.start;
    let severity = severity_label(diagnostic.severity);
    if use_color {
        output.push_str(&format!(
            "{YELLOW}{severity}[{}]{RESET} {DARK_GRAY}{}:{}:{}{RESET}\n  {WHITE}{}{RESET}\n",
            diagnostic.code, path, start.line, start.column, diagnostic.message
        ));
    } else {
        output.push_str(&format!(
            "{severity}[{}] {}:{}:{}\n  {}\n",
            diagnostic.code, path, start.line, start.column, diagnostic.message
        ));
    }
    if let Some(source) = source {
        if let Some(frame) = render_source_frame(
            source,
            &diagnostic.span,
            diagnostic.subject.as_deref(),
            use_color,
            diagnostic.severity,
        ) {
            output.push_str(&frame);
        }
    }
    for label in &diagnostic.labels {
        let pos = &label.span.start;
        if use_color {
            output.push_str(&format!(
                "{CYAN}note{RESET}: {WHITE}{}{RESET} at {DARK_GRAY}{}:{}:{}{RESET}\n",
                label.message, path, pos.line, pos.column
            ));
        } else {
            output.push_str(&format!(
                "note: {} at {}:{}:{}\n",
                label.message, path, pos.line, pos.column
            ));
        }
        if let Some(source) = source {
            if let Some(frame) =
                render_source_frame(source, &label.span, None, use_color, diagnostic.severity)
            {
                output.push_str(&frame);
            }
        }
    }
    output.trim_end().to_string()
}

fn render_source_frame(
    source: &str,
    span: &Span,
    message: Option<&str>,
    use_color: bool,
    severity: DiagnosticSeverity,
) -> Option<String> {
    let line_index = span.start.line.checked_sub(1)?;
    let line = source.lines().nth(line_index)?;
    let line_no = span.start.line;
    let width = line_no.to_string().len();

    let mut output = String::new();
    if use_color {
        output.push_str(&format!("{DARK_GRAY}{:>width$} |{RESET}\n", ""));
        output.push_str(&format!("{DARK_GRAY}{line_no:>width$} |{RESET} {line}\n"));
    } else {
        output.push_str(&format!("{:>width$} |\n", ""));
        output.push_str(&format!("{line_no:>width$} | {line}\n"));
    }

    let line_len = line.chars().count();
    let start_col = span.start.column.clamp(1, line_len + 1);
    let mut end_col = if span.start.line == span.end.line {
        span.end.column
    } else {
        line_len
    };
    end_col = end_col.clamp(start_col, line_len.max(start_col));
    let caret_len = end_col - start_col + 1;

    let padding = " ".repeat(start_col - 1);
    let carets = "^".repeat(caret_len);
    let mut caret_line = if use_color {
        format!(
            "{DARK_GRAY}{:>width$} |{RESET} {padding}{}{carets}{RESET}",
            "",
            caret_color(severity)
        )
    } else {
        format!("{:>width$} | {padding}{carets}", "")
    };
    if let Some(message) = message {
        caret_line.push(' ');
        if use_color {
            caret_line.push_str(caret_message_color(severity));
            caret_line.push_str(message);
            caret_line.push_str(RESET);
        } else {
            caret_line.push_str(message);
        }
    }
    caret_line.push('\n');
    output.push_str(&caret_line);
    Some(output)
}
