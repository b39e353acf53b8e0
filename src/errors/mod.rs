// src/errors/mod.rs
//! Structured error reporting for the stoat compiler core.
//!
//! Non-fatal problems are accumulated as [`Diagnostic`] records in a shared
//! [`DiagnosticSink`]; only unrecoverable conditions surface as
//! [`FatalError`].

pub mod diagnostic;
pub mod keys;

pub use diagnostic::{Diagnostic, DiagnosticSink};
pub use keys::{ErrorKey, Severity};

use std::path::PathBuf;

use thiserror::Error;

/// Conditions that abort the enclosing phase.
///
/// These are distinct from accumulated diagnostics: an I/O failure while
/// importing a package cannot be recovered from, so the phase stops and the
/// caller decides what to do.
#[derive(Error, Debug)]
pub enum FatalError {
    #[error("cannot read source '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed import path '{path}'")]
    MalformedImport { path: String },
}
