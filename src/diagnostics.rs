//! Diagnostic message collection and pretty-printer.
//!
//! Grounded on `plotnik_lib::diagnostics`: a flat `Diagnostics` collection
//! of messages with a severity and a source range, plus a builder-style
//! [`DiagnosticsPrinter`] that renders them with `annotate-snippets` when
//! given the original source text, or falls back to one line per message
//! otherwise. Every effect this crate detects is a warning (§3, §7); the
//! severity field still exists for API symmetry with the teacher's
//! two-level `Severity`.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

use crate::host::Span;

/// Severity level of a diagnostic. The checker only ever emits
/// [`Severity::Warning`] (§3's effect table describes violations, never
/// hard errors); `Error` exists so a host embedding this crate alongside
/// its own diagnostics can reuse one `Diagnostics` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub severity: Severity,
    pub range: Span,
    pub message: String,
}

impl DiagnosticMessage {
    pub fn warning(range: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            range,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.severity, self.range.start, self.range.end, self.message
        )
    }
}

/// Collection of diagnostic messages produced by one `check_and_report`
/// call. Messages are kept in discovery order (§5 "Ordering").
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<DiagnosticMessage>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, msg: DiagnosticMessage) {
        self.messages.push(msg);
    }

    pub fn warn(&mut self, range: Span, message: impl Into<String>) {
        self.push(DiagnosticMessage::warning(range, message));
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[DiagnosticMessage] {
        &self.messages
    }

    pub fn printer<'d>(&'d self) -> DiagnosticsPrinter<'d> {
        DiagnosticsPrinter::new(self)
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticMessage;
    type IntoIter = std::slice::Iter<'a, DiagnosticMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

/// Builder-pattern printer for rendering a [`Diagnostics`] collection,
/// mirroring `plotnik_lib::diagnostics::DiagnosticsPrinter`.
pub struct DiagnosticsPrinter<'d> {
    diagnostics: &'d Diagnostics,
    source: Option<&'d str>,
    path: Option<&'d str>,
    colored: bool,
}

impl<'d> DiagnosticsPrinter<'d> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            source: None,
            path: None,
            colored: false,
        }
    }

    pub fn source(mut self, source: &'d str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn path(mut self, path: &'d str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        let Some(source) = self.source else {
            return self.format_plain(w);
        };
        if self.diagnostics.is_empty() {
            return Ok(());
        }

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in self.diagnostics.iter().enumerate() {
            let range = adjust_range(diag.range, source.len());
            let mut snippet = Snippet::source(source).line_start(1).annotation(
                AnnotationKind::Primary
                    .span(range)
                    .label(&diag.message),
            );
            if let Some(p) = self.path {
                snippet = snippet.path(p);
            }

            let level = match diag.severity {
                Severity::Warning => Level::WARNING,
                Severity::Error => Level::ERROR,
            };
            let report: Vec<Group> = vec![level.primary_title(&diag.message).element(snippet)];

            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{}", renderer.render(&report))?;
        }
        Ok(())
    }

    fn format_plain(&self, w: &mut impl Write) -> std::fmt::Result {
        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{diag}")?;
        }
        Ok(())
    }
}

fn adjust_range(range: Span, limit: usize) -> std::ops::Range<usize> {
    let start = range.start as usize;
    let end = range.end as usize;
    if start == end {
        return start..(start + 1).min(limit);
    }
    start..end
}
