// src/sema/value.rs
//
// The evaluator's output record.

use crate::frontend::ast::{DataType, TypeCode};
use crate::frontend::Token;

/// Result of evaluating an expression.
///
/// `lexeme` carries the literal text of constant numerics so later checks
/// can bit-fit them against narrower targets. A failed evaluation yields a
/// void-kinded record so the surrounding walk can continue.
#[derive(Debug, Clone, Default)]
pub struct Data {
    pub kind: DataType,
    /// Constant literal text, or the identifier for name expressions.
    pub lexeme: String,
    pub token: Token,
    pub lvalue: bool,
    pub mutable: bool,
    pub constant: bool,
    /// Set by the `...` spread postfix.
    pub variadiced: bool,
    /// True when the expression names a type declaration, not a value.
    pub decl: bool,
}

impl Data {
    /// Best-effort record for failed evaluations.
    pub fn void() -> Self {
        Self::default()
    }

    pub fn is_void(&self) -> bool {
        self.kind.code == TypeCode::Void && !self.kind.multi_typed
    }

    pub fn is_nil(&self) -> bool {
        self.kind.code == TypeCode::Nil
    }
}
