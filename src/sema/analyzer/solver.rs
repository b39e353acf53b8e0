// src/sema/analyzer/solver.rs
//
// Binary operator solver. The handler is selected by operand category in
// priority order: array, pointer, nil, rune, any, bool, string, float,
// signed, unsigned. Changing that order changes observable diagnostics.

use crate::errors::{DiagnosticSink, ErrorKey};
use crate::frontend::ast::{DataType, TypeCode};
use crate::frontend::Token;
use crate::sema::bits::{check_bit_uint, is_const_num};
use crate::sema::ty;
use crate::sema::value::Data;

pub(crate) struct Solver {
    pub left: Data,
    pub right: Data,
    pub operator: Token,
}

impl Solver {
    fn result(&self, kind: DataType) -> Data {
        Data {
            kind,
            token: self.operator.clone(),
            ..Data::default()
        }
    }

    fn bool_result(&self) -> Data {
        self.result(DataType::primitive(TypeCode::Bool))
    }

    fn void_result(&self) -> Data {
        self.result(DataType::void())
    }

    fn compatible(&self, ignore_any: bool) -> bool {
        ty::types_are_compatible(&self.left.kind, &self.right.kind, ignore_any)
    }

    /// Numeric handlers let a constant literal escape the compatibility
    /// check; the literal is bit-checked at the assignment boundary.
    fn const_escape(&self) -> bool {
        is_const_num(&self.left.lexeme) || is_const_num(&self.right.lexeme)
    }

    fn ptr(&self, sink: &DiagnosticSink) -> Data {
        let left = &self.left.kind;
        let right = &self.right.kind;
        let ok = left.lexeme == right.lexeme
            || (ty::is_single(left) && (left.code == TypeCode::Nil || left.code.is_integer()))
            || (ty::is_single(right) && (right.code == TypeCode::Nil || right.code.is_integer()));
        if !ok {
            sink.error(&self.operator, ErrorKey::IncompatibleType);
            return self.void_result();
        }
        match self.operator.lexeme.as_str() {
            "+" | "-" => {
                if ty::is_pointer(left) && ty::is_pointer(right) {
                    sink.error(&self.operator, ErrorKey::IncompatibleType);
                    return self.void_result();
                }
                if ty::is_pointer(left) {
                    self.result(left.clone())
                } else {
                    self.result(right.clone())
                }
            }
            "==" | "!=" => self.bool_result(),
            _ => {
                sink.error(&self.operator, ErrorKey::OperatorNotforPointer);
                self.void_result()
            }
        }
    }

    fn str(&self, sink: &DiagnosticSink) -> Data {
        if self.left.kind.code != self.right.kind.code {
            sink.error(&self.operator, ErrorKey::IncompatibleDatatype);
            return self.void_result();
        }
        match self.operator.lexeme.as_str() {
            "+" => self.result(DataType::primitive(TypeCode::Str)),
            "==" | "!=" => self.bool_result(),
            _ => {
                sink.error(&self.operator, ErrorKey::OperatorNotforString);
                self.void_result()
            }
        }
    }

    fn any(&self, sink: &DiagnosticSink) -> Data {
        match self.operator.lexeme.as_str() {
            "==" | "!=" => self.bool_result(),
            _ => {
                sink.error(&self.operator, ErrorKey::OperatorNotforAny);
                self.void_result()
            }
        }
    }

    fn bool(&self, sink: &DiagnosticSink) -> Data {
        if !self.compatible(true) {
            sink.error(&self.operator, ErrorKey::IncompatibleType);
            return self.void_result();
        }
        match self.operator.lexeme.as_str() {
            "==" | "!=" => self.bool_result(),
            _ => {
                sink.error(&self.operator, ErrorKey::OperatorNotforBool);
                self.void_result()
            }
        }
    }

    fn float(&self, sink: &DiagnosticSink) -> Data {
        if !self.compatible(true) && !self.const_escape() {
            sink.error(&self.operator, ErrorKey::IncompatibleType);
            return self.void_result();
        }
        match self.operator.lexeme.as_str() {
            "==" | "!=" | "<" | ">" | ">=" | "<=" => self.bool_result(),
            "+" | "-" | "*" | "/" => {
                let code = if self.left.kind.code == TypeCode::F64
                    || self.right.kind.code == TypeCode::F64
                {
                    TypeCode::F64
                } else {
                    TypeCode::F32
                };
                self.result(DataType::primitive(code))
            }
            _ => {
                sink.error(&self.operator, ErrorKey::OperatorNotforFloat);
                self.void_result()
            }
        }
    }

    /// The wider of the two operand types.
    fn greater_kind(&self) -> DataType {
        if self.right.kind.code.rank() > self.left.kind.code.rank() {
            self.right.kind.clone()
        } else {
            self.left.kind.clone()
        }
    }

    fn check_shift_operand(&self, sink: &DiagnosticSink) {
        if !self.right.kind.code.is_unsigned()
            && !(is_const_num(&self.right.lexeme) && check_bit_uint(&self.right.lexeme, 64))
        {
            sink.error(&self.right.token, ErrorKey::BitshiftMustUnsigned);
        }
    }

    fn signed(&self, sink: &DiagnosticSink) -> Data {
        // Shifts validate their right operand themselves; the operands do
        // not need a common type.
        if let ">>" | "<<" = self.operator.lexeme.as_str() {
            self.check_shift_operand(sink);
            return self.result(self.left.kind.clone());
        }
        if !self.compatible(true) && !self.const_escape() {
            sink.error(&self.operator, ErrorKey::IncompatibleType);
            return self.void_result();
        }
        match self.operator.lexeme.as_str() {
            "==" | "!=" | "<" | ">" | ">=" | "<=" => self.bool_result(),
            "+" | "-" | "*" | "/" | "%" | "&" | "|" | "^" => self.result(self.greater_kind()),
            _ => {
                sink.error(&self.operator, ErrorKey::OperatorNotforInt);
                self.void_result()
            }
        }
    }

    fn unsigned(&self, sink: &DiagnosticSink) -> Data {
        if let ">>" | "<<" = self.operator.lexeme.as_str() {
            self.check_shift_operand(sink);
            return self.result(self.left.kind.clone());
        }
        if !self.compatible(true) && !self.const_escape() {
            sink.error(&self.operator, ErrorKey::IncompatibleType);
            return self.void_result();
        }
        match self.operator.lexeme.as_str() {
            "==" | "!=" | "<" | ">" | ">=" | "<=" => self.bool_result(),
            "+" | "-" | "*" | "/" | "%" | "&" | "|" | "^" => self.result(self.greater_kind()),
            _ => {
                sink.error(&self.operator, ErrorKey::OperatorNotforUint);
                self.void_result()
            }
        }
    }

    fn rune(&self, sink: &DiagnosticSink) -> Data {
        if !self.compatible(true) {
            sink.error(&self.operator, ErrorKey::IncompatibleType);
            return self.void_result();
        }
        match self.operator.lexeme.as_str() {
            "==" | "!=" | ">" | "<" | ">=" | "<=" => self.bool_result(),
            "+" | "-" | "*" | "/" | "^" | "&" | "%" | "|" => {
                self.result(DataType::primitive(TypeCode::Rune))
            }
            _ => {
                sink.error(&self.operator, ErrorKey::OperatorNotforRune);
                self.void_result()
            }
        }
    }

    fn array(&self, sink: &DiagnosticSink) -> Data {
        if !self.compatible(true) {
            sink.error(&self.operator, ErrorKey::IncompatibleType);
            return self.void_result();
        }
        match self.operator.lexeme.as_str() {
            "==" | "!=" => self.bool_result(),
            _ => {
                sink.error(&self.operator, ErrorKey::OperatorNotforArray);
                self.void_result()
            }
        }
    }

    fn nil(&self, sink: &DiagnosticSink) -> Data {
        if !self.compatible(false) {
            sink.error(&self.operator, ErrorKey::IncompatibleType);
            return self.void_result();
        }
        match self.operator.lexeme.as_str() {
            "==" | "!=" => self.bool_result(),
            _ => {
                sink.error(&self.operator, ErrorKey::OperatorNotforNil);
                self.void_result()
            }
        }
    }

    fn logical(&self, sink: &DiagnosticSink) -> Data {
        if self.left.kind.code != TypeCode::Bool {
            sink.error(&self.left.token, ErrorKey::LogicalNotBool);
        }
        if self.right.kind.code != TypeCode::Bool {
            sink.error(&self.right.token, ErrorKey::LogicalNotBool);
        }
        self.bool_result()
    }

    pub(crate) fn solve(&self, sink: &DiagnosticSink) -> Data {
        match self.operator.lexeme.as_str() {
            "+" | "-" | "*" | "/" | "%" | ">>" | "<<" | "&" | "|" | "^" | "==" | "!=" | ">"
            | "<" | ">=" | "<=" => {}
            "&&" | "||" => return self.logical(sink),
            _ => {
                sink.error(&self.operator, ErrorKey::InvalidOperator);
                return self.void_result();
            }
        }
        let (lk, rk) = (&self.left.kind, &self.right.kind);
        if ty::is_array(lk) || ty::is_array(rk) {
            self.array(sink)
        } else if ty::is_pointer(lk) || ty::is_pointer(rk) {
            self.ptr(sink)
        } else if lk.code == TypeCode::Nil || rk.code == TypeCode::Nil {
            self.nil(sink)
        } else if lk.code == TypeCode::Rune || rk.code == TypeCode::Rune {
            self.rune(sink)
        } else if lk.code == TypeCode::Any || rk.code == TypeCode::Any {
            self.any(sink)
        } else if lk.code == TypeCode::Bool || rk.code == TypeCode::Bool {
            self.bool(sink)
        } else if lk.code == TypeCode::Str || rk.code == TypeCode::Str {
            self.str(sink)
        } else if lk.code.is_float() || rk.code.is_float() {
            self.float(sink)
        } else if lk.code.is_signed() || rk.code.is_signed() {
            self.signed(sink)
        } else if lk.code.is_unsigned() || rk.code.is_unsigned() {
            self.unsigned(sink)
        } else {
            self.void_result()
        }
    }
}
