// src/sema/resolve.rs
//
// Type resolution: named types are resolved against the symbol table until
// no Name code remains, splicing the alias' `*`/`[]` prefix in front of the
// resolved lexeme. A visited set catches alias cycles; the cycle is
// reported once, at the first cycle-forming alias.

use rustc_hash::FxHashSet;

use crate::errors::{DiagnosticSink, ErrorKey};
use crate::frontend::ast::{DataType, TypeCode, TypeTag};
use crate::frontend::Token;
use crate::sema::scope::SymbolTable;
use crate::sema::ty;

/// Resolve a type until it is ready for comparison.
///
/// Returns the resolved type and whether resolution succeeded. When `err`
/// is set, failures emit `invalid_type_source`.
pub fn ready_type(
    table: &SymbolTable,
    dt: DataType,
    err: bool,
    sink: &DiagnosticSink,
) -> (DataType, bool) {
    let mut visited = FxHashSet::default();
    ready_type_inner(table, dt, err, sink, &mut visited)
}

fn ready_type_inner(
    table: &SymbolTable,
    mut dt: DataType,
    err: bool,
    sink: &DiagnosticSink,
    visited: &mut FxHashSet<String>,
) -> (DataType, bool) {
    if dt.lexeme.is_empty() {
        return (dt, true);
    }
    match dt.code {
        TypeCode::Name => {
            let ident = dt.token.lexeme.clone();
            let prefix_len = dt.lexeme.len() - ident.len();
            let prefix = dt.lexeme[..prefix_len].to_string();
            if let Some(alias) = table.find_type_alias(&ident) {
                // The visited set tracks the current alias chain only, so
                // one alias appearing twice in a signature is not a cycle.
                if !visited.insert(ident.clone()) {
                    if err {
                        sink.error(&dt.token, ErrorKey::InvalidTypeSource);
                    }
                    return (dt, false);
                }
                let mut resolved = alias.kind.clone();
                resolved.lexeme = format!("{prefix}{}", resolved.lexeme);
                let out = ready_type_inner(table, resolved, err, sink, visited);
                visited.remove(&ident);
                return out;
            }
            if let Some(decl) = table.find_struct(&ident) {
                dt.code = TypeCode::Struct;
                dt.tag = Some(Box::new(TypeTag::Decl(decl.ident.clone())));
                return (dt, true);
            }
            if let Some(decl) = table.find_enum(&ident) {
                dt.code = TypeCode::Enum;
                dt.tag = Some(Box::new(TypeTag::Decl(decl.ident.clone())));
                return (dt, true);
            }
            if let Some(decl) = table.find_trait(&ident) {
                dt.code = TypeCode::Trait;
                dt.tag = Some(Box::new(TypeTag::Decl(decl.ident.clone())));
                return (dt, true);
            }
            if err {
                sink.error(&dt.token, ErrorKey::InvalidTypeSource);
            }
            (dt, false)
        }
        TypeCode::Func => {
            let Some(tag) = dt.tag.take() else {
                return (dt, true);
            };
            let TypeTag::Func(mut sig) = *tag else {
                dt.tag = Some(tag);
                return (dt, true);
            };
            let mut ok = true;
            for param in &mut sig.params {
                let (kind, param_ok) =
                    ready_type_inner(table, param.kind.clone(), err, sink, visited);
                param.kind = kind;
                ok &= param_ok;
            }
            let (ret, ret_ok) = ready_type_inner(table, sig.ret.clone(), err, sink, visited);
            sig.ret = ret;
            ok &= ret_ok;
            dt.lexeme = sig.type_string();
            dt.tag = Some(Box::new(TypeTag::Func(sig)));
            (dt, ok)
        }
        TypeCode::Map => {
            let Some(tag) = dt.tag.take() else {
                return (dt, true);
            };
            let TypeTag::Map { key, value } = *tag else {
                dt.tag = Some(tag);
                return (dt, true);
            };
            let (key, key_ok) = ready_type_inner(table, key, err, sink, visited);
            let (value, value_ok) = ready_type_inner(table, value, err, sink, visited);
            let prefix_len = dt.lexeme.find("map[").unwrap_or(0);
            let prefix = &dt.lexeme[..prefix_len];
            dt.lexeme = format!("{prefix}map[{}]{}", key.lexeme, value.lexeme);
            dt.tag = Some(Box::new(TypeTag::Map { key, value }));
            (dt, key_ok && value_ok)
        }
        _ => (dt, true),
    }
}

/// Default value literal synthesized for a declaration without initializer.
pub fn default_value_of_type(t: &DataType) -> &'static str {
    if ty::is_pointer(t) || ty::is_array(t) || ty::is_map(t) {
        return "nil";
    }
    t.code.default_value()
}

/// Reject initializer types that cannot drive inference.
pub fn check_validity_for_auto_type(t: &DataType, err_token: &Token, sink: &DiagnosticSink) {
    match t.code {
        TypeCode::Nil => sink.error(err_token, ErrorKey::NilForAutotype),
        TypeCode::Void => sink.error(err_token, ErrorKey::VoidForAutotype),
        _ => {}
    }
}
