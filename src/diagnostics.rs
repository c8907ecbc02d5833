//! Scoped warning and error collection.
//!
//! Validation problems are gathered rather than thrown so that one broken
//! country does not hide problems in its siblings. Scopes nest, and every
//! recorded entry carries the scope trail active at the time, which keeps
//! messages self-describing once the run is over.

use core::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Scope labels from outermost to innermost.
    pub scope_trail: Vec<String>,
    pub message: String,
}

/// An ordered collector of warnings and errors with push/pop scope nesting.
#[derive(Debug, Default)]
pub struct Diagnostics {
    scopes: Vec<String>,
    entries: Vec<Diagnostic>,
    halt: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self, label: impl Into<String>) {
        self.scopes.push(label.into());
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(!self.scopes.is_empty(), "unbalanced scope pop");
        self.scopes.pop();
    }

    /// Runs `f` inside a scope, guaranteeing the matching pop.
    pub fn scoped<R>(&mut self, label: impl Into<String>, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push_scope(label);
        let result = f(self);
        self.pop_scope();
        result
    }

    fn record(&mut self, severity: Severity, message: String) {
        self.entries.push(Diagnostic {
            severity,
            scope_trail: self.scopes.clone(),
            message,
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.record(Severity::Warning, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.record(Severity::Error, message.into());
    }

    /// Records an error and requests that processing stop at the next
    /// checkpoint.
    pub fn fatal(&mut self, message: impl Into<String>) {
        self.record(Severity::Error, message.into());
        self.halt = true;
    }

    pub fn has_error(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.severity == Severity::Error)
    }

    pub fn halt_requested(&self) -> bool {
        self.halt
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Appends another collector's entries, preserving their order. Used to
    /// fold per-country collectors back together.
    pub fn merge(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
        self.halt |= other.halt;
    }

    /// Renders one line per entry in insertion order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let tag = match entry.severity {
                Severity::Warning => "W",
                Severity::Error => "E",
            };
            let _ = write!(out, "{tag}: ");
            for scope in &entry.scope_trail {
                let _ = write!(out, "{scope}: ");
            }
            let _ = writeln!(out, "{}", entry.message);
        }
        out
    }
}
