// src/errors/diagnostic.rs
//! Structured diagnostic records and the shared sink.

use std::path::PathBuf;

use parking_lot::Mutex;

use super::keys::{ErrorKey, Severity};
use crate::frontend::Token;

/// A structured diagnostic with location, key, and arguments.
///
/// The consumer formats the message from the key and arguments; the core
/// never renders text.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub path: PathBuf,
    pub row: u32,
    pub column: u32,
    pub key: ErrorKey,
    pub args: Vec<String>,
}

impl Diagnostic {
    /// Build a diagnostic at a token's location.
    pub fn at(token: &Token, key: ErrorKey, args: Vec<String>) -> Self {
        Self {
            severity: key.severity(),
            path: token.file.path.clone(),
            row: token.row,
            column: token.column,
            key,
            args,
        }
    }

    /// Build a diagnostic with no source location (e.g. `no_entry_point`).
    pub fn flat(key: ErrorKey, args: Vec<String>) -> Self {
        Self {
            severity: key.severity(),
            path: PathBuf::new(),
            row: 0,
            column: 0,
            key,
            args,
        }
    }
}

/// Append-only diagnostic sink shared by the driver and its check tasks.
///
/// Concurrent writers are serialized by the mutex; insertion order is not
/// source order when checks run in parallel, so consumers wanting stable
/// output should use [`DiagnosticSink::sorted`].
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    logs: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.logs.lock().push(diagnostic);
    }

    /// Append an error keyed at a token.
    pub fn error(&self, token: &Token, key: ErrorKey) {
        self.push(Diagnostic::at(token, key, Vec::new()));
    }

    /// Append an error keyed at a token, with arguments.
    pub fn error_args(&self, token: &Token, key: ErrorKey, args: Vec<String>) {
        self.push(Diagnostic::at(token, key, args));
    }

    /// Append a warning keyed at a token.
    pub fn warn(&self, token: &Token, key: ErrorKey) {
        self.push(Diagnostic::at(token, key, Vec::new()));
    }

    /// Append a diagnostic without a source location.
    pub fn flat(&self, key: ErrorKey) {
        self.push(Diagnostic::flat(key, Vec::new()));
    }

    pub fn extend(&self, diagnostics: Vec<Diagnostic>) {
        self.logs.lock().extend(diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.logs.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.logs.lock().len()
    }

    /// Reports whether the sink holds at least one error-severity entry.
    pub fn has_errors(&self) -> bool {
        self.logs
            .lock()
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Drain the sink in insertion order.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.logs.lock())
    }

    /// Drain the sink sorted by `(path, row, column)`.
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut logs = self.take();
        logs.sort_by(|a, b| (&a.path, a.row, a.column).cmp(&(&b.path, b.row, b.column)));
        logs
    }
}
