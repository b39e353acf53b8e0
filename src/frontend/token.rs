// src/frontend/token.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A source file handle shared by every token lexed from it.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self { path: path.into() })
    }

    /// Directory containing the file; used to resolve relative imports.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// All token kinds in the stoat language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Placeholder for "no token"; never part of a token stream.
    Na,
    /// Identifier.
    Name,
    /// Value literal: string, rune, numeric, `true`, `false`, `nil`.
    Value,
    /// Operator, including `::` and the `...` spread.
    Operator,
    /// One of `( ) { } [ ]`.
    Brace,
    Comma,
    Semicolon,
    Colon,
    /// `var` keyword.
    Var,
    /// `const` keyword.
    Const,
    /// `ret` keyword.
    Ret,
    /// Primitive type keyword (`bool`, `rune`, `str`, `int8`..`uint64`,
    /// `float32`, `float64`).
    Type,
    /// `new` keyword.
    New,
}

/// A lexed token. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// 1-based source line.
    pub row: u32,
    /// 1-based byte column of the token's first byte.
    pub column: u32,
    pub file: Arc<SourceFile>,
}

impl Token {
    /// The "no token" placeholder used for synthesized locations.
    pub fn na() -> Self {
        Self {
            kind: TokenKind::Na,
            lexeme: String::new(),
            row: 0,
            column: 0,
            file: Arc::new(SourceFile::default()),
        }
    }

    /// Reports whether this token is an operator with the given lexeme.
    pub fn is_operator(&self, lexeme: &str) -> bool {
        self.kind == TokenKind::Operator && self.lexeme == lexeme
    }

    /// Reports whether this token is a brace with the given lexeme.
    pub fn is_brace(&self, lexeme: &str) -> bool {
        self.kind == TokenKind::Brace && self.lexeme == lexeme
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::na()
    }
}

/// Reports whether an identifier is an ignore identifier.
///
/// A leading `_` means "discard": such identifiers may be declared any
/// number of times but can never be read back.
pub fn is_ignore_ident(ident: &str) -> bool {
    ident.starts_with('_')
}
