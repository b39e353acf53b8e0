// src/sema/analyzer/assign.rs
//
// Deferred compatibility checks. The driver accumulates these while
// walking statements and runs them through a parallel fan-out once the
// walk completes; each check is a pure function of its owned inputs plus
// the read-only symbol table and the shared sink.

use crate::errors::{DiagnosticSink, ErrorKey};
use crate::frontend::ast::{DataType, TypeCode, TypeTag};
use crate::frontend::Token;
use crate::sema::bits::{bitsize, check_bit_float, check_bit_int, check_bit_uint, is_const_num};
use crate::sema::resolve::ready_type;
use crate::sema::scope::SymbolTable;
use crate::sema::ty;
use crate::sema::value::Data;

/// One deferred check.
#[derive(Debug)]
pub(crate) enum PendingCheck {
    /// Assignment-shaped: constness, literal bit-fit, then compatibility.
    Assign {
        constant: bool,
        target: DataType,
        value: Data,
        ignore_any: bool,
        token: Token,
    },
    /// Bare type compatibility (e.g. declared foreach key types).
    Compat {
        real: DataType,
        check: DataType,
        ignore_any: bool,
        token: Token,
    },
}

impl PendingCheck {
    pub(crate) fn assign(
        constant: bool,
        target: DataType,
        value: Data,
        ignore_any: bool,
        token: Token,
    ) -> Self {
        PendingCheck::Assign {
            constant,
            target,
            value,
            ignore_any,
            token,
        }
    }

    pub(crate) fn compat(real: DataType, check: DataType, ignore_any: bool, token: Token) -> Self {
        PendingCheck::Compat {
            real,
            check,
            ignore_any,
            token,
        }
    }

    pub(crate) fn run(self, table: &SymbolTable, sink: &DiagnosticSink) {
        match self {
            PendingCheck::Assign {
                constant,
                target,
                value,
                ignore_any,
                token,
            } => check_assign_type(constant, &target, &value, ignore_any, &token, table, sink),
            PendingCheck::Compat {
                real,
                check,
                ignore_any,
                token,
            } => check_type(&real, &check, ignore_any, &token, table, sink),
        }
    }
}

/// A constant source flowing into mutable storage must itself be declared
/// constant.
pub(crate) fn check_assign_const(
    constant: bool,
    target: &DataType,
    value: &Data,
    token: &Token,
    sink: &DiagnosticSink,
) {
    if ty::is_mut(target) && value.constant && !constant {
        sink.error(token, ErrorKey::ConstantAssigntoNonconstant);
    }
}

pub(crate) fn check_assign_type(
    constant: bool,
    target: &DataType,
    value: &Data,
    ignore_any: bool,
    token: &Token,
    table: &SymbolTable,
    sink: &DiagnosticSink,
) {
    check_assign_const(constant, target, value, token, sink);
    if ty::is_single(target) && is_const_num(&value.lexeme) {
        let bit = bitsize(target.code);
        if target.code.is_signed() {
            if !check_bit_int(&value.lexeme, bit) {
                sink.error(token, ErrorKey::IncompatibleDatatype);
            }
            return;
        }
        if target.code.is_float() {
            if !check_bit_float(&value.lexeme, bit) {
                sink.error(token, ErrorKey::IncompatibleDatatype);
            }
            return;
        }
        if target.code.is_unsigned() {
            if !check_bit_uint(&value.lexeme, bit) {
                sink.error(token, ErrorKey::IncompatibleDatatype);
            }
            return;
        }
    }
    check_type(target, &value.kind, ignore_any, token, table, sink);
}

/// General compatibility between a target ("real") and a source ("check")
/// type, after both are made ready.
pub(crate) fn check_type(
    real: &DataType,
    check: &DataType,
    ignore_any: bool,
    token: &Token,
    table: &SymbolTable,
    sink: &DiagnosticSink,
) {
    let (real, ok) = ready_type(table, real.clone(), true, sink);
    if !ok {
        return;
    }
    let (check, ok) = ready_type(table, check.clone(), true, sink);
    if !ok {
        return;
    }
    if !ignore_any && real.code == TypeCode::Any {
        return;
    }
    if real.multi_typed || check.multi_typed {
        check_multi_type(&real, &check, ignore_any, token, table, sink);
        return;
    }
    if ty::is_single(&real) && ty::is_single(&check) {
        if !ty::codes_are_compatible(check.code, real.code, ignore_any) {
            sink.error(token, ErrorKey::IncompatibleDatatype);
        }
        return;
    }
    if (ty::is_pointer(&real) || ty::is_array(&real) || ty::is_map(&real))
        && check.code == TypeCode::Nil
    {
        return;
    }
    if real.lexeme != check.lexeme {
        sink.error(token, ErrorKey::IncompatibleDatatype);
    }
}

/// Multi-typed on both sides: element-wise recursion.
fn check_multi_type(
    real: &DataType,
    check: &DataType,
    ignore_any: bool,
    token: &Token,
    table: &SymbolTable,
    sink: &DiagnosticSink,
) {
    if real.multi_typed != check.multi_typed {
        sink.error(token, ErrorKey::IncompatibleDatatype);
        return;
    }
    let (Some(TypeTag::Multi(real_types)), Some(TypeTag::Multi(check_types))) =
        (real.tag.as_deref(), check.tag.as_deref())
    else {
        sink.error(token, ErrorKey::IncompatibleDatatype);
        return;
    };
    if real_types.len() != check_types.len() {
        sink.error(token, ErrorKey::IncompatibleDatatype);
        return;
    }
    for (real_type, check_type_) in real_types.iter().zip(check_types.iter()) {
        check_type(real_type, check_type_, ignore_any, token, table, sink);
    }
}
